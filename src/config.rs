//! Tool configuration module.
//!
//! Handles loading, validating, and merging `chromakit.toml`. Every value has
//! a stock default; the file only needs the keys it wants to override, and a
//! missing file simply means "all defaults". Tool calls that omit an argument
//! fall back to the value configured here.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [chromakey]
//! key_color = "#00FF00"     # Background color to key out (#RRGGBB)
//! tolerance = 70.0          # Radius of the fully transparent zone (> 0)
//!
//! [resize]
//! resample = "lanczos"      # nearest | bilinear | bicubic | lanczos
//!
//! [convert]
//! quality = 95              # JPEG quality (1-100)
//!
//! [compress]
//! quality = 80              # pngquant target quality (1-100)
//! binary = "pngquant"       # Executable name or path
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Color, DEFAULT_TOLERANCE, Resample};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "chromakit.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `chromakit.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    /// Chroma-key defaults.
    pub chromakey: ChromaKeyConfig,
    /// Resize defaults.
    pub resize: ResizeConfig,
    /// Format conversion defaults.
    pub convert: ConvertConfig,
    /// PNG compression settings.
    pub compress: CompressConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
}

impl ToolsConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Color::from_hex(&self.chromakey.key_color).is_none() {
            return Err(ConfigError::Validation(format!(
                "chromakey.key_color must be #RRGGBB, got {:?}",
                self.chromakey.key_color
            )));
        }
        let t = self.chromakey.tolerance;
        if !(t.is_finite() && t > 0.0) {
            return Err(ConfigError::Validation(
                "chromakey.tolerance must be a positive number".into(),
            ));
        }
        if !(1..=100).contains(&self.convert.quality) {
            return Err(ConfigError::Validation(
                "convert.quality must be 1-100".into(),
            ));
        }
        if !(1..=100).contains(&self.compress.quality) {
            return Err(ConfigError::Validation(
                "compress.quality must be 1-100".into(),
            ));
        }
        if self.compress.binary.trim().is_empty() {
            return Err(ConfigError::Validation(
                "compress.binary must not be empty".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Chroma-key defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChromaKeyConfig {
    /// Hex color of the background to remove.
    pub key_color: String,
    /// Radius (RGB distance) of the fully transparent zone. The graduated
    /// edge extends to three times this value.
    pub tolerance: f64,
}

impl Default for ChromaKeyConfig {
    fn default() -> Self {
        Self {
            key_color: Color::default().to_string(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// Resize defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResizeConfig {
    pub resample: Resample,
}

/// Format conversion defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConvertConfig {
    /// Quality for lossy outputs (JPEG).
    pub quality: u32,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self { quality: 95 }
    }
}

/// PNG compression settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressConfig {
    /// Target quality; pngquant accepts down to 20 below this.
    pub quality: u32,
    /// pngquant executable name (searched on PATH) or path.
    pub binary: String,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            quality: 80,
            binary: crate::compress::DEFAULT_BINARY.to_string(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers for pixel sweeps.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(ToolsConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse config text, merge it over the stock defaults, and validate.
pub fn parse_config(content: &str) -> Result<ToolsConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let merged = merge_toml(stock_defaults_value(), overlay);
    let config: ToolsConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from a file.
///
/// A missing file yields the stock defaults; a present file must parse and
/// validate.
pub fn load_config(path: &Path) -> Result<ToolsConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(ToolsConfig::default());
    }
    let content = fs::read_to_string(path)?;
    let config = parse_config(&content)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Returns a fully-commented stock `chromakit.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# chromakit configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Tool calls that pass an explicit
# argument override these.
#
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Chroma key (green screen) removal
# ---------------------------------------------------------------------------
[chromakey]
# Background color to turn transparent, as #RRGGBB.
key_color = "#00FF00"

# Pixels closer than this (Euclidean RGB distance) to the key color become
# fully transparent. Between 1x and 3x this distance alpha ramps up linearly;
# beyond 3x pixels stay fully opaque.
tolerance = 70.0

# ---------------------------------------------------------------------------
# Resize
# ---------------------------------------------------------------------------
[resize]
# Resampling filter: nearest, bilinear, bicubic, lanczos.
resample = "lanczos"

# ---------------------------------------------------------------------------
# Format conversion
# ---------------------------------------------------------------------------
[convert]
# JPEG quality (1 = worst, 100 = best).
quality = 95

# ---------------------------------------------------------------------------
# Lossy PNG compression (requires pngquant; skipped when not installed)
# ---------------------------------------------------------------------------
[compress]
# Target quality. pngquant may go down to 20 below this.
quality = 80

# Executable name searched on PATH, or an absolute path.
binary = "pngquant"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers for pixel processing.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4
"##
}
