//! Lossy PNG compression through an external `pngquant` binary.
//!
//! The compressor is optional. [`Pngquant::locate`] searches `PATH` once and
//! the result is kept for the life of the value; the tool service builds one
//! at startup, so the lookup happens once per process. When the binary is
//! missing, compression degrades to a pass-through that reports why nothing
//! happened.
//!
//! ## Invocation
//!
//! ```text
//! pngquant --quality {q-20}-{q} --speed 1 --strip --force --output FILE FILE
//! ```
//!
//! Exit status 0 is success. 99 means pngquant could not reach the minimum
//! quality and left the file alone, which still counts as success. Any other
//! status leaves the file untouched and is reported as skipped.

use crate::imaging::Quality;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;

/// Default executable name searched on `PATH`.
pub const DEFAULT_BINARY: &str = "pngquant";

/// Width of the accepted quality window below the requested quality.
const QUALITY_SPREAD: u32 = 20;

/// pngquant's "quality too low to save" exit status.
const EXIT_QUALITY_TOO_LOW: i32 = 99;

#[derive(Error, Debug)]
pub enum CompressError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to run {binary}: {source}")]
    Spawn {
        binary: String,
        source: std::io::Error,
    },
}

/// What happened to a file handed to a compressor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressOutcome {
    /// The compressor ran. Sizes may be equal if it chose not to rewrite.
    Ran {
        original_size: u64,
        compressed_size: u64,
    },
    /// Nothing was done to the file.
    Skipped { original_size: u64, reason: String },
}

/// An in-place PNG compressor.
pub trait PngCompressor: Sync {
    /// Whether the compressor can run at all.
    fn is_available(&self) -> bool;

    /// Compress `path` in place.
    fn compress_in_place(
        &self,
        path: &Path,
        quality: Quality,
    ) -> Result<CompressOutcome, CompressError>;
}

/// `"{min}-{max}"` quality window for pngquant.
pub fn quality_range(quality: Quality) -> String {
    let max = quality.value();
    format!("{}-{}", max.saturating_sub(QUALITY_SPREAD), max)
}

fn pngquant_args(path: &Path, quality: Quality) -> Vec<OsString> {
    let range = quality_range(quality);
    let mut args: Vec<OsString> = ["--quality", range.as_str(), "--speed", "1"]
        .into_iter()
        .chain(["--strip", "--force", "--output"])
        .map(OsString::from)
        .collect();
    args.push(path.as_os_str().to_owned());
    args.push(path.as_os_str().to_owned());
    args
}

/// The pngquant command-line tool.
#[derive(Debug, Clone)]
pub struct Pngquant {
    name: String,
    binary: Option<PathBuf>,
}

impl Pngquant {
    /// Search `PATH` (or resolve a path) for `name`.
    pub fn locate(name: &str) -> Self {
        let binary = which::which(name).ok();
        match &binary {
            Some(path) => tracing::debug!(binary = %path.display(), "found png compressor"),
            None => tracing::warn!(binary = name, "png compressor not found, compression disabled"),
        }
        Self {
            name: name.to_string(),
            binary,
        }
    }

    /// Use an explicit binary, or none at all.
    pub fn with_binary(name: &str, binary: Option<PathBuf>) -> Self {
        Self {
            name: name.to_string(),
            binary,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl PngCompressor for Pngquant {
    fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    fn compress_in_place(
        &self,
        path: &Path,
        quality: Quality,
    ) -> Result<CompressOutcome, CompressError> {
        let original_size = std::fs::metadata(path)?.len();

        let Some(binary) = &self.binary else {
            return Ok(CompressOutcome::Skipped {
                original_size,
                reason: format!("{} not installed", self.name),
            });
        };

        let output = Command::new(binary)
            .args(pngquant_args(path, quality))
            .output()
            .map_err(|source| CompressError::Spawn {
                binary: binary.display().to_string(),
                source,
            })?;

        match output.status.code() {
            Some(0) | Some(EXIT_QUALITY_TOO_LOW) => {
                let compressed_size = std::fs::metadata(path)?.len();
                tracing::debug!(
                    path = %path.display(),
                    original_size,
                    compressed_size,
                    "png compressed"
                );
                Ok(CompressOutcome::Ran {
                    original_size,
                    compressed_size,
                })
            }
            code => {
                let reason = match code {
                    Some(c) => format!("{} exited with status {c}", self.name),
                    None => format!("{} was terminated by a signal", self.name),
                };
                tracing::warn!(
                    path = %path.display(),
                    stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                    "{reason}"
                );
                Ok(CompressOutcome::Skipped {
                    original_size,
                    reason,
                })
            }
        }
    }
}

/// Percentage saved, rounded to one decimal. Zero for empty originals.
pub fn reduction_percent(original_size: u64, compressed_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    let ratio = 1.0 - compressed_size as f64 / original_size as f64;
    (ratio * 1000.0).round() / 10.0
}
