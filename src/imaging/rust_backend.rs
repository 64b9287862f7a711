//! Pure Rust codec backend built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, WebP, GIF, BMP, TIFF) | `image::ImageReader` with content sniffing |
//! | Normalize to RGBA | `DynamicImage::into_rgba8` |
//! | Resize | `DynamicImage::resize_exact` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` with quality |
//! | Encode → PNG, WebP (lossless), GIF, BMP | `DynamicImage::write_to` |
//! | Flatten alpha for JPEG/BMP | [`flatten_pixel`](super::calculations::flatten_pixel) onto white |

use super::backend::{BackendError, Dimensions, ImageBackend, ImageInfo};
use super::calculations::flatten_pixel;
use super::chromakey::PixelBuffer;
use super::params::{ConvertParams, OutputFormat, Quality, ResizeParams, format_name};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use std::io::{BufWriter, Write};
use std::path::Path;

/// Background used when an output format cannot carry alpha.
const FLATTEN_BACKGROUND: [u8; 3] = [255, 255, 255];

/// `image`-crate backend. See the [module docs](self) for the crate mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk, sniffing the format from its content.
fn load_image(path: &Path) -> Result<(DynamicImage, Option<ImageFormat>), BackendError> {
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader.format();
    let img = reader.decode().map_err(|e| BackendError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    Ok((img, format))
}

/// True when any pixel's alpha is below the maximum for its bit depth.
fn has_partial_alpha(img: &DynamicImage) -> bool {
    if !img.color().has_alpha() {
        return false;
    }
    match img {
        DynamicImage::ImageRgba8(buf) => buf.pixels().any(|p| p[3] < u8::MAX),
        DynamicImage::ImageLumaA8(buf) => buf.pixels().any(|p| p[1] < u8::MAX),
        other => other.to_rgba16().pixels().any(|p| p[3] < u16::MAX),
    }
}

/// Composite any alpha onto an opaque background.
fn flatten(img: &DynamicImage, background: [u8; 3]) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        image::Rgb(flatten_pixel(rgba.get_pixel(x, y).0, background))
    })
}

/// Reduce an image to a layout every encoder for `format` accepts.
fn prepare_for(img: DynamicImage, format: OutputFormat) -> DynamicImage {
    match format {
        // PNG takes every layout, including 16-bit
        OutputFormat::Png => img,
        OutputFormat::Jpeg => DynamicImage::ImageRgb8(img.into_rgb8()),
        _ if img.color().has_alpha() => DynamicImage::ImageRgba8(img.into_rgba8()),
        _ => DynamicImage::ImageRgb8(img.into_rgb8()),
    }
}

/// Encode `img` to `path` in `format`. `quality` only affects JPEG.
fn save_image(
    img: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    quality: Quality,
) -> Result<(), BackendError> {
    let encode_err = |e: image::ImageError| BackendError::Encode {
        path: path.to_path_buf(),
        message: e.to_string(),
    };

    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    match format {
        OutputFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut writer, quality.value() as u8);
            img.write_with_encoder(encoder).map_err(encode_err)?;
        }
        other => img
            .write_to(&mut writer, other.image_format())
            .map_err(encode_err)?,
    }
    writer.flush()?;
    Ok(())
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| BackendError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Dimensions { width, height })
    }

    fn inspect(&self, path: &Path) -> Result<ImageInfo, BackendError> {
        let (img, format) = load_image(path)?;
        Ok(ImageInfo {
            format: format.map(format_name),
            color_type: format!("{:?}", img.color()),
            width: img.width(),
            height: img.height(),
            has_transparency: has_partial_alpha(&img),
        })
    }

    fn decode_rgba(&self, path: &Path) -> Result<PixelBuffer, BackendError> {
        let (img, _) = load_image(path)?;
        PixelBuffer::from_image(img.into_rgba8()).ok_or_else(|| BackendError::Decode {
            path: path.to_path_buf(),
            message: "image has no pixels".to_string(),
        })
    }

    fn encode_png(&self, buffer: &PixelBuffer, path: &Path) -> Result<(), BackendError> {
        let img = DynamicImage::ImageRgba8(buffer.clone().into_image());
        save_image(&img, path, OutputFormat::Png, Quality::new(100))
    }

    fn resize(&self, params: &ResizeParams) -> Result<(), BackendError> {
        let (img, source_format) = load_image(&params.source)?;
        let format = params
            .format
            .or_else(|| source_format.and_then(OutputFormat::from_image_format))
            .unwrap_or(OutputFormat::Png);

        let resized = img.resize_exact(params.width, params.height, params.resample.filter_type());
        save_image(
            &prepare_for(resized, format),
            &params.output,
            format,
            Quality::new(95),
        )
    }

    fn convert(&self, params: &ConvertParams) -> Result<Option<String>, BackendError> {
        let (img, source_format) = load_image(&params.source)?;
        let prepared = if params.format.keeps_alpha() {
            prepare_for(img, params.format)
        } else {
            DynamicImage::ImageRgb8(flatten(&img, FLATTEN_BACKGROUND))
        };
        save_image(&prepared, &params.output, params.format, params.quality)?;
        Ok(source_format.map(format_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::Resample;
    use image::{Rgba, RgbaImage};

    fn create_test_png(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        img.save(path).unwrap();
    }

    fn create_rgba_png(path: &Path, width: u32, height: u32, rgba: [u8; 4]) {
        RgbaImage::from_pixel(width, height, Rgba(rgba))
            .save(path)
            .unwrap();
    }

    #[test]
    fn identify_synthetic_png() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.png");
        create_test_png(&path, 200, 150);

        let dims = RustBackend::new().identify(&path).unwrap();
        assert_eq!(dims, Dimensions { width: 200, height: 150 });
    }

    #[test]
    fn identify_nonexistent_file_errors() {
        let result = RustBackend::new().identify(Path::new("/nonexistent/image.png"));
        assert!(result.is_err());
    }

    #[test]
    fn inspect_opaque_rgb_png() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("test.png");
        create_test_png(&path, 20, 10);

        let info = RustBackend::new().inspect(&path).unwrap();
        assert_eq!(info.format.as_deref(), Some("PNG"));
        assert_eq!(info.color_type, "Rgb8");
        assert_eq!((info.width, info.height), (20, 10));
        assert!(!info.has_transparency);
    }

    #[test]
    fn inspect_detects_partial_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("alpha.png");
        create_rgba_png(&path, 5, 5, [255, 0, 0, 128]);

        let info = RustBackend::new().inspect(&path).unwrap();
        assert_eq!(info.color_type, "Rgba8");
        assert!(info.has_transparency);
    }

    #[test]
    fn inspect_opaque_rgba_has_no_transparency() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("opaque.png");
        create_rgba_png(&path, 5, 5, [255, 0, 0, 255]);

        assert!(!RustBackend::new().inspect(&path).unwrap().has_transparency);
    }

    #[test]
    fn inspect_sniffs_format_from_content() {
        let tmp = tempfile::TempDir::new().unwrap();
        let png = tmp.path().join("real.png");
        create_test_png(&png, 4, 4);
        let misnamed = tmp.path().join("really-a-png.jpg");
        std::fs::copy(&png, &misnamed).unwrap();

        let info = RustBackend::new().inspect(&misnamed).unwrap();
        assert_eq!(info.format.as_deref(), Some("PNG"));
    }

    #[test]
    fn inspect_garbage_is_decode_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("garbage.png");
        std::fs::write(&path, b"definitely not an image").unwrap();

        let err = RustBackend::new().inspect(&path).unwrap_err();
        assert!(matches!(err, BackendError::Decode { .. }));
    }

    #[test]
    fn decode_rgb_source_is_opaque_rgba() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rgb.png");
        create_test_png(&path, 3, 2);

        let buf = RustBackend::new().decode_rgba(&path).unwrap();
        assert_eq!((buf.width(), buf.height()), (3, 2));
        assert_eq!(buf.as_raw().len(), 3 * 2 * 4);
        assert!(buf.as_raw().chunks_exact(4).all(|p| p[3] == 255));
        assert_eq!(buf.pixel(2, 1), [2, 1, 128, 255]);
    }

    #[test]
    fn encode_png_keeps_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out.png");
        let mut buf = PixelBuffer::filled(2, 2, [0, 255, 0, 0]).unwrap();
        buf.put_pixel(1, 1, [255, 0, 0, 200]);

        let backend = RustBackend::new();
        backend.encode_png(&buf, &path).unwrap();
        let decoded = backend.decode_rgba(&path).unwrap();
        assert_eq!(decoded, buf);
    }

    #[test]
    fn resize_to_exact_dimensions() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 400, 300);
        let output = tmp.path().join("resized.png");

        let backend = RustBackend::new();
        backend
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 200,
                height: 50,
                resample: Resample::Lanczos,
                format: Some(OutputFormat::Png),
            })
            .unwrap();

        let dims = backend.identify(&output).unwrap();
        assert_eq!(dims, Dimensions { width: 200, height: 50 });
    }

    #[test]
    fn resize_rgba_to_jpeg_drops_alpha() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_rgba_png(&source, 40, 40, [10, 20, 30, 100]);
        let output = tmp.path().join("resized.jpg");

        let backend = RustBackend::new();
        backend
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 20,
                height: 20,
                resample: Resample::Bilinear,
                format: Some(OutputFormat::Jpeg),
            })
            .unwrap();

        let info = backend.inspect(&output).unwrap();
        assert_eq!(info.format.as_deref(), Some("JPEG"));
        assert!(!info.has_transparency);
    }

    #[test]
    fn resize_without_format_uses_source_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 10, 10);
        let output = tmp.path().join("resized.out");

        let backend = RustBackend::new();
        backend
            .resize(&ResizeParams {
                source,
                output: output.clone(),
                width: 5,
                height: 5,
                resample: Resample::Nearest,
                format: None,
            })
            .unwrap();

        assert_eq!(backend.inspect(&output).unwrap().format.as_deref(), Some("PNG"));
    }

    #[test]
    fn convert_png_to_jpeg_reports_source_format() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_test_png(&source, 16, 16);
        let output = tmp.path().join("out.jpg");

        let original = RustBackend::new()
            .convert(&ConvertParams {
                source,
                output: output.clone(),
                format: OutputFormat::Jpeg,
                quality: Quality::new(95),
            })
            .unwrap();

        assert_eq!(original.as_deref(), Some("PNG"));
        assert!(std::fs::metadata(&output).unwrap().len() > 0);
    }

    #[test]
    fn convert_to_bmp_flattens_onto_white() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_rgba_png(&source, 2, 2, [0, 0, 255, 0]);
        let output = tmp.path().join("out.bmp");

        let backend = RustBackend::new();
        backend
            .convert(&ConvertParams {
                source,
                output: output.clone(),
                format: OutputFormat::Bmp,
                quality: Quality::new(95),
            })
            .unwrap();

        let buf = backend.decode_rgba(&output).unwrap();
        assert_eq!(buf.pixel(0, 0), [255, 255, 255, 255]);
    }

    #[test]
    fn convert_to_webp_and_gif() {
        let tmp = tempfile::TempDir::new().unwrap();
        let source = tmp.path().join("source.png");
        create_rgba_png(&source, 8, 8, [255, 0, 0, 128]);

        let backend = RustBackend::new();
        for (name, format) in [("out.webp", OutputFormat::WebP), ("out.gif", OutputFormat::Gif)] {
            let output = tmp.path().join(name);
            backend
                .convert(&ConvertParams {
                    source: source.clone(),
                    output: output.clone(),
                    format,
                    quality: Quality::new(80),
                })
                .unwrap();
            let info = backend.inspect(&output).unwrap();
            assert_eq!(info.format.as_deref(), Some(format.name()));
        }
    }

    #[test]
    fn flatten_only_touches_alpha_images() {
        let rgb = DynamicImage::ImageRgb8(RgbImage::from_pixel(1, 1, image::Rgb([1, 2, 3])));
        assert_eq!(flatten(&rgb, [255, 255, 255]).get_pixel(0, 0).0, [1, 2, 3]);

        let rgba = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 0])));
        assert_eq!(
            flatten(&rgba, [255, 255, 255]).get_pixel(0, 0).0,
            [255, 255, 255]
        );
    }
}
