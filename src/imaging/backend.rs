//! Image codec backend trait and shared types.
//!
//! The [`ImageBackend`] trait is everything the tools need from a codec:
//! identify, inspect, decode to RGBA, encode RGBA, resize, and convert.
//! The chroma-key engine itself never sees a file; it receives the
//! [`PixelBuffer`] produced by [`ImageBackend::decode_rgba`] and hands the
//! result back to [`ImageBackend::encode_png`].
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image` crate.

use super::chromakey::PixelBuffer;
use super::params::{ConvertParams, ResizeParams};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },
    #[error("Failed to encode {}: {message}", .path.display())]
    Encode { path: PathBuf, message: String },
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// What a full decode reveals about an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    /// Container format, upper-case (`"PNG"`, `"JPEG"`, ...), if recognised.
    pub format: Option<String>,
    /// Decoded pixel layout, e.g. `"Rgb8"` or `"Rgba8"`.
    pub color_type: String,
    pub width: u32,
    pub height: u32,
    /// True when the image has an alpha channel and at least one pixel is
    /// not fully opaque.
    pub has_transparency: bool,
}

/// Trait for image codec backends.
pub trait ImageBackend: Sync {
    /// Get image dimensions without a full decode where possible.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Decode and describe an image.
    fn inspect(&self, path: &Path) -> Result<ImageInfo, BackendError>;

    /// Decode any supported image into an RGBA8 buffer.
    /// Sources without alpha come back fully opaque.
    fn decode_rgba(&self, path: &Path) -> Result<PixelBuffer, BackendError>;

    /// Encode an RGBA8 buffer as PNG.
    fn encode_png(&self, buffer: &PixelBuffer, path: &Path) -> Result<(), BackendError>;

    /// Resize to exact dimensions.
    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError>;

    /// Re-encode in another format. Returns the source format name, if known.
    fn convert(&self, params: &ConvertParams) -> Result<Option<String>, BackendError>;
}
