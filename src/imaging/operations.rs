//! High-level image operations.
//!
//! These functions combine calculations, the chroma-key engine, and backend
//! execution. They take already-validated paths and settings and return
//! serializable reports; path checks and defaults live in [`crate::tools`].

use super::backend::{BackendError, Dimensions, ImageBackend, ImageInfo};
use super::calculations::{ResizeRequest, ResizeRequestError, calculate_resize_dimensions};
use super::chromakey::{ChromaKey, ChromaKeyError, ChromaKeyStats};
use super::params::{ConvertParams, OutputFormat, Quality, Resample, ResizeParams};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperationError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    ChromaKey(#[from] ChromaKeyError),
    #[error(transparent)]
    Resize(#[from] ResizeRequestError),
}

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, OperationError>;

/// Outcome of keying one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChromaKeyReport {
    pub dimensions: Dimensions,
    pub stats: ChromaKeyStats,
}

/// Decode `source`, key out the background, and write a PNG to `output`.
///
/// The chroma key is validated by construction, so once decoding succeeds the
/// transform cannot fail.
pub fn chromakey_to_transparent(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    chroma: &ChromaKey,
) -> Result<ChromaKeyReport> {
    let mut buffer = backend.decode_rgba(source)?;
    tracing::debug!(
        source = %source.display(),
        width = buffer.width(),
        height = buffer.height(),
        key = %chroma.key(),
        tolerance = chroma.tolerance(),
        "keying image"
    );
    let stats = chroma.apply(&mut buffer);
    backend.encode_png(&buffer, output)?;

    Ok(ChromaKeyReport {
        dimensions: Dimensions {
            width: buffer.width(),
            height: buffer.height(),
        },
        stats,
    })
}

/// Outcome of a resize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResizeReport {
    pub original_dimensions: Dimensions,
    pub new_dimensions: Dimensions,
    pub resample: Resample,
}

/// Plan a resize without executing it.
pub fn plan_resize(
    source: &Path,
    output: &Path,
    original: Dimensions,
    request: &ResizeRequest,
    resample: Resample,
) -> Result<ResizeParams> {
    let (width, height) =
        calculate_resize_dimensions((original.width, original.height), request)?;
    Ok(ResizeParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        width,
        height,
        resample,
        format: OutputFormat::from_path(output),
    })
}

/// Resize `source` into `output`. The output format follows the output
/// extension, falling back to the source format.
pub fn resize_image(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    request: &ResizeRequest,
    resample: Resample,
) -> Result<ResizeReport> {
    let original = backend.identify(source)?;
    let params = plan_resize(source, output, original, request, resample)?;
    tracing::debug!(
        source = %source.display(),
        from = ?(original.width, original.height),
        to = ?(params.width, params.height),
        %resample,
        "resizing image"
    );
    backend.resize(&params)?;

    Ok(ResizeReport {
        original_dimensions: original,
        new_dimensions: Dimensions {
            width: params.width,
            height: params.height,
        },
        resample,
    })
}

/// Outcome of a format conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertReport {
    pub original_format: Option<String>,
    pub new_format: &'static str,
}

/// Re-encode `source` as `format` at `output`.
pub fn convert_format(
    backend: &impl ImageBackend,
    source: &Path,
    output: &Path,
    format: OutputFormat,
    quality: Quality,
) -> Result<ConvertReport> {
    tracing::debug!(
        source = %source.display(),
        format = format.name(),
        quality = quality.value(),
        "converting image"
    );
    let original_format = backend.convert(&ConvertParams {
        source: source.to_path_buf(),
        output: output.to_path_buf(),
        format,
        quality,
    })?;

    Ok(ConvertReport {
        original_format,
        new_format: format.name(),
    })
}

/// Describe an image.
pub fn image_metadata(backend: &impl ImageBackend, path: &Path) -> Result<ImageInfo> {
    Ok(backend.inspect(path)?)
}
