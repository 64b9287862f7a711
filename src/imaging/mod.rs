//! Image processing: chroma keying plus codec-backed transforms.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Chroma key** | [`ChromaKey`] (pure, rayon row sweep) |
//! | **Decode / encode** | `image` crate via [`RustBackend`] |
//! | **Resize** | `resize_exact` with nearest/bilinear/bicubic/Lanczos3 |
//! | **Convert** | `image` encoders, JPEG quality, alpha flattened for JPEG/BMP |
//! | **Metadata** | full decode + alpha scan |
//!
//! The module is split into:
//! - **Color**: [`Color`] and the `#RRGGBB` parser
//! - **Chroma key**: the keying engine over [`PixelBuffer`]s, no I/O
//! - **Calculations**: pure functions for dimension math and alpha flattening
//! - **Parameters**: data structures describing codec operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: high-level functions combining the above

pub mod backend;
mod calculations;
pub mod chromakey;
pub mod color;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, ImageInfo};
pub use calculations::{
    MAX_OUTPUT_PIXELS, ResizeRequest, ResizeRequestError, calculate_resize_dimensions,
};
pub use chromakey::{
    ChromaKey, ChromaKeyError, ChromaKeyStats, DEFAULT_TOLERANCE, PixelBuffer, ToleranceBand,
    color_distance,
};
pub use color::{Color, ParseColorError};
pub use operations::{
    ChromaKeyReport, ConvertReport, OperationError, ResizeReport, chromakey_to_transparent,
    convert_format, image_metadata, resize_image,
};
pub use params::{ConvertParams, OUTPUT_EXTENSIONS, OutputFormat, Quality, Resample, ResizeParams};
pub use rust_backend::RustBackend;
