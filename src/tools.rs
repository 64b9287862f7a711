//! Tool registry and dispatch.
//!
//! Each tool takes a JSON object of arguments and produces a JSON result
//! object. This module owns everything between the wire and the imaging
//! code: argument decoding, defaults from [`ToolsConfig`], input path checks,
//! output directory creation, and result shaping.
//!
//! | Tool | Arguments |
//! |---|---|
//! | `chromakey_to_transparent` | `input_path`, `output_path`, `key_color?`, `tolerance?` |
//! | `compress_png` | `input_path`, `output_path?`, `quality?` |
//! | `get_image_metadata` | `image_path` |
//! | `resize_image` | `input_path`, `output_path`, `width?`, `height?`, `scale?`, `maintain_aspect?`, `resample?` |
//! | `convert_format` | `input_path`, `output_path`, `quality?` |
//!
//! Omitted optional arguments take their value from the config.

use crate::compress::{CompressError, CompressOutcome, PngCompressor, Pngquant, reduction_percent};
use crate::config::ToolsConfig;
use crate::imaging::{
    self, ChromaKey, ChromaKeyError, Dimensions, ImageBackend, OUTPUT_EXTENSIONS, OperationError,
    OutputFormat, Quality, Resample, ResizeRequest, RustBackend,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("Input file not found: {}", .0.display())]
    InputNotFound(PathBuf),
    #[error("{0}")]
    InvalidParameter(String),
    #[error("Unsupported format: {extension}. Use: {supported}")]
    UnsupportedFormat {
        extension: String,
        supported: String,
    },
    #[error(transparent)]
    ChromaKey(#[from] ChromaKeyError),
    #[error(transparent)]
    Operation(#[from] OperationError),
    #[error(transparent)]
    Compress(#[from] CompressError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The tools this crate exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    ChromaKeyToTransparent,
    CompressPng,
    GetImageMetadata,
    ResizeImage,
    ConvertFormat,
}

impl Tool {
    pub const ALL: [Tool; 5] = [
        Tool::ChromaKeyToTransparent,
        Tool::CompressPng,
        Tool::GetImageMetadata,
        Tool::ResizeImage,
        Tool::ConvertFormat,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::ChromaKeyToTransparent => "chromakey_to_transparent",
            Tool::CompressPng => "compress_png",
            Tool::GetImageMetadata => "get_image_metadata",
            Tool::ResizeImage => "resize_image",
            Tool::ConvertFormat => "convert_format",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tool::ChromaKeyToTransparent => {
                "Convert a chroma-key (green screen) background to transparency. \
                 Pixels near the key color become transparent, with a graduated \
                 alpha edge out to three times the tolerance. Always writes PNG."
            }
            Tool::CompressPng => {
                "Compress a PNG with pngquant if it is installed; otherwise the \
                 file is left as is. Compresses in place unless output_path is given."
            }
            Tool::GetImageMetadata => {
                "Get format, pixel layout, dimensions, transparency and file size of an image."
            }
            Tool::ResizeImage => {
                "Resize an image by width, height, or scale factor. The output \
                 extension selects the format."
            }
            Tool::ConvertFormat => {
                "Convert an image between PNG, JPEG, WebP, GIF and BMP. The output \
                 extension selects the format; alpha is flattened onto white for JPEG and BMP."
            }
        }
    }

    /// JSON Schema for the tool's arguments.
    pub fn input_schema(self) -> Value {
        let path = |desc: &str| json!({ "type": "string", "description": desc });
        match self {
            Tool::ChromaKeyToTransparent => json!({
                "type": "object",
                "properties": {
                    "input_path": path("Path to input image"),
                    "output_path": path("Path to save the transparent PNG"),
                    "key_color": { "type": "string", "description": "Hex color of the background to remove", "default": "#00FF00" },
                    "tolerance": { "type": "number", "description": "Radius of the fully transparent zone (RGB distance)", "default": 70, "exclusiveMinimum": 0 }
                },
                "required": ["input_path", "output_path"]
            }),
            Tool::CompressPng => json!({
                "type": "object",
                "properties": {
                    "input_path": path("Path to PNG file"),
                    "output_path": path("Output path (default: overwrite input)"),
                    "quality": { "type": "integer", "description": "Quality level 1-100", "default": 80, "minimum": 1, "maximum": 100 }
                },
                "required": ["input_path"]
            }),
            Tool::GetImageMetadata => json!({
                "type": "object",
                "properties": {
                    "image_path": path("Path to image file")
                },
                "required": ["image_path"]
            }),
            Tool::ResizeImage => json!({
                "type": "object",
                "properties": {
                    "input_path": path("Path to input image"),
                    "output_path": path("Path to save resized image"),
                    "width": { "type": "integer", "description": "Target width in pixels", "minimum": 1 },
                    "height": { "type": "integer", "description": "Target height in pixels", "minimum": 1 },
                    "scale": { "type": "number", "description": "Scale factor, e.g. 0.5 for half size", "exclusiveMinimum": 0 },
                    "maintain_aspect": { "type": "boolean", "description": "Keep aspect ratio when only width or height is given", "default": true },
                    "resample": { "type": "string", "enum": ["nearest", "bilinear", "bicubic", "lanczos"], "default": "lanczos" }
                },
                "required": ["input_path", "output_path"]
            }),
            Tool::ConvertFormat => json!({
                "type": "object",
                "properties": {
                    "input_path": path("Path to input image"),
                    "output_path": path("Path to save converted image (extension determines format)"),
                    "quality": { "type": "integer", "description": "Quality for JPEG 1-100", "default": 95, "minimum": 1, "maximum": 100 }
                },
                "required": ["input_path", "output_path"]
            }),
        }
    }

    pub fn descriptor(self) -> ToolDescriptor {
        ToolDescriptor {
            name: self.name(),
            description: self.description(),
            input_schema: self.input_schema(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Tool {
    type Err = ToolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| ToolError::UnknownTool(s.to_string()))
    }
}

/// Name, description and argument schema, as listed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

// ============================================================================
// Arguments
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChromaKeyArgs {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub key_color: Option<String>,
    pub tolerance: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompressArgs {
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub quality: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetadataArgs {
    pub image_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResizeArgs {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scale: Option<f64>,
    pub maintain_aspect: Option<bool>,
    pub resample: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConvertArgs {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub quality: Option<u32>,
}

// ============================================================================
// Results
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChromaKeyResult {
    pub success: bool,
    pub output_path: PathBuf,
    pub dimensions: Dimensions,
    pub key_color: String,
    pub tolerance: f64,
    pub pixels_processed: u64,
    pub pixels_made_transparent: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompressResult {
    pub success: bool,
    pub compressed: bool,
    pub output_path: PathBuf,
    pub original_size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduction_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetadataResult {
    pub path: PathBuf,
    pub format: Option<String>,
    pub color_type: String,
    pub width: u32,
    pub height: u32,
    pub has_transparency: bool,
    pub file_size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResizeResult {
    pub success: bool,
    pub output_path: PathBuf,
    pub original_dimensions: Dimensions,
    pub new_dimensions: Dimensions,
    pub resample: Resample,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConvertResult {
    pub success: bool,
    pub output_path: PathBuf,
    pub original_format: Option<String>,
    pub new_format: &'static str,
    pub file_size_bytes: u64,
}

// ============================================================================
// Path handling
// ============================================================================

/// Make `path` absolute against the working directory.
fn absolute(path: &Path) -> Result<PathBuf, ToolError> {
    if path.as_os_str().is_empty() {
        return Err(ToolError::InvalidParameter("Path must not be empty".into()));
    }
    Ok(std::path::absolute(path)?)
}

/// Resolve an input path and require that it exists.
fn resolve_input(path: &Path) -> Result<PathBuf, ToolError> {
    let resolved = absolute(path)?;
    if !resolved.exists() {
        return Err(ToolError::InputNotFound(resolved));
    }
    Ok(resolved)
}

/// Resolve an output path and create its parent directory.
fn prepare_output(path: &Path) -> Result<PathBuf, ToolError> {
    let resolved = absolute(path)?;
    if let Some(parent) = resolved.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(resolved)
}

fn decode_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| ToolError::InvalidArguments(e.to_string()))
}

fn supported_extensions() -> String {
    let exts: Vec<&str> = OUTPUT_EXTENSIONS.iter().map(|(e, _)| *e).collect();
    format!("{exts:?}")
}

// ============================================================================
// Service
// ============================================================================

/// Runs tools against an image backend and a PNG compressor.
pub struct ToolService<B = RustBackend, C = Pngquant> {
    backend: B,
    compressor: C,
    config: ToolsConfig,
}

impl ToolService {
    /// Production service: `image`-crate backend, pngquant located on PATH.
    pub fn new(config: ToolsConfig) -> Self {
        let compressor = Pngquant::locate(&config.compress.binary);
        Self::with_parts(RustBackend::new(), compressor, config)
    }
}

impl<B: ImageBackend, C: PngCompressor> ToolService<B, C> {
    pub fn with_parts(backend: B, compressor: C, config: ToolsConfig) -> Self {
        Self {
            backend,
            compressor,
            config,
        }
    }

    pub fn config(&self) -> &ToolsConfig {
        &self.config
    }

    pub fn compressor_available(&self) -> bool {
        self.compressor.is_available()
    }

    /// Descriptors for every tool, in listing order.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        Tool::ALL.into_iter().map(Tool::descriptor).collect()
    }

    /// Run a tool by name with JSON arguments.
    pub fn call(&self, name: &str, arguments: Value) -> Result<Value, ToolError> {
        let tool: Tool = name.parse()?;
        let result = match tool {
            Tool::ChromaKeyToTransparent => {
                serde_json::to_value(self.chromakey_to_transparent(decode_args(arguments)?)?)?
            }
            Tool::CompressPng => serde_json::to_value(self.compress_png(decode_args(arguments)?)?)?,
            Tool::GetImageMetadata => {
                serde_json::to_value(self.get_image_metadata(decode_args(arguments)?)?)?
            }
            Tool::ResizeImage => serde_json::to_value(self.resize_image(decode_args(arguments)?)?)?,
            Tool::ConvertFormat => {
                serde_json::to_value(self.convert_format(decode_args(arguments)?)?)?
            }
        };
        tracing::info!(tool = %tool, "tool call succeeded");
        Ok(result)
    }

    pub fn chromakey_to_transparent(
        &self,
        args: ChromaKeyArgs,
    ) -> Result<ChromaKeyResult, ToolError> {
        let input = resolve_input(&args.input_path)?;
        let key_color = args
            .key_color
            .unwrap_or_else(|| self.config.chromakey.key_color.clone());
        let tolerance = args.tolerance.unwrap_or(self.config.chromakey.tolerance);
        let chroma = ChromaKey::from_hex(&key_color, tolerance)?;
        let output = prepare_output(&args.output_path)?;

        let report = imaging::chromakey_to_transparent(&self.backend, &input, &output, &chroma)?;

        Ok(ChromaKeyResult {
            success: true,
            output_path: output,
            dimensions: report.dimensions,
            key_color,
            tolerance,
            pixels_processed: report.stats.pixels_processed,
            pixels_made_transparent: report.stats.pixels_transparent,
        })
    }

    pub fn compress_png(&self, args: CompressArgs) -> Result<CompressResult, ToolError> {
        let input = resolve_input(&args.input_path)?;
        let quality = Quality::new(args.quality.unwrap_or(self.config.compress.quality));

        let target = match &args.output_path {
            Some(path) => {
                let output = prepare_output(path)?;
                if output != input {
                    std::fs::copy(&input, &output)?;
                }
                output
            }
            None => input,
        };

        let result = match self.compressor.compress_in_place(&target, quality)? {
            CompressOutcome::Ran {
                original_size,
                compressed_size,
            } => CompressResult {
                success: true,
                compressed: original_size != compressed_size,
                output_path: target,
                original_size,
                compressed_size: Some(compressed_size),
                reduction_percent: Some(reduction_percent(original_size, compressed_size)),
                reason: None,
            },
            CompressOutcome::Skipped {
                original_size,
                reason,
            } => CompressResult {
                success: true,
                compressed: false,
                output_path: target,
                original_size,
                compressed_size: None,
                reduction_percent: None,
                reason: Some(reason),
            },
        };
        Ok(result)
    }

    pub fn get_image_metadata(&self, args: MetadataArgs) -> Result<MetadataResult, ToolError> {
        let path = resolve_input(&args.image_path)?;
        let info = imaging::image_metadata(&self.backend, &path)?;
        let file_size_bytes = std::fs::metadata(&path)?.len();

        Ok(MetadataResult {
            path,
            format: info.format,
            color_type: info.color_type,
            width: info.width,
            height: info.height,
            has_transparency: info.has_transparency,
            file_size_bytes,
        })
    }

    pub fn resize_image(&self, args: ResizeArgs) -> Result<ResizeResult, ToolError> {
        let input = resolve_input(&args.input_path)?;
        let resample = match &args.resample {
            Some(name) => name
                .parse::<Resample>()
                .map_err(ToolError::InvalidParameter)?,
            None => self.config.resize.resample,
        };
        let request = ResizeRequest {
            width: args.width,
            height: args.height,
            scale: args.scale,
            maintain_aspect: args.maintain_aspect.unwrap_or(true),
        };
        if request.width.is_none() && request.height.is_none() && request.scale.is_none() {
            return Err(ToolError::InvalidParameter(
                "Specify width, height, or scale".into(),
            ));
        }
        let output = prepare_output(&args.output_path)?;

        let report = imaging::resize_image(&self.backend, &input, &output, &request, resample)?;

        Ok(ResizeResult {
            success: true,
            output_path: output,
            original_dimensions: report.original_dimensions,
            new_dimensions: report.new_dimensions,
            resample: report.resample,
        })
    }

    pub fn convert_format(&self, args: ConvertArgs) -> Result<ConvertResult, ToolError> {
        let input = resolve_input(&args.input_path)?;
        let format = OutputFormat::from_path(&args.output_path).ok_or_else(|| {
            let extension = args
                .output_path
                .extension()
                .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
                .unwrap_or_default();
            ToolError::UnsupportedFormat {
                extension,
                supported: supported_extensions(),
            }
        })?;
        let quality = Quality::new(args.quality.unwrap_or(self.config.convert.quality));
        let output = prepare_output(&args.output_path)?;

        let report = imaging::convert_format(&self.backend, &input, &output, format, quality)?;
        let file_size_bytes = std::fs::metadata(&output)?.len();

        Ok(ConvertResult {
            success: true,
            output_path: output,
            original_format: report.original_format,
            new_format: report.new_format,
            file_size_bytes,
        })
    }
}
