//! CLI output formatting for tool results.
//!
//! Output is **path-first**: the header line names what was read and what was
//! written, with the details indented beneath it.
//!
//! # Output Format
//!
//! ```text
//! shot.jpg → shot.png
//!     Key: #00FF00 (tolerance 70)
//!     Size: 200x150
//!     Transparent: 26100 of 30000 pixels
//!
//! shot.png
//!     Compressed: 48213 → 12877 bytes (73.3% smaller)
//!
//! shot.png
//!     Format: PNG
//!     Color type: Rgba8
//!     Size: 200x150
//!     Transparency: yes
//!     File size: 12877 bytes
//!
//! shot.png → thumb.png
//!     Resized: 200x150 → 100x75 (lanczos)
//!
//! shot.png → shot.jpg
//!     Converted: PNG → JPEG (6120 bytes)
//! ```
//!
//! # Architecture
//!
//! Each tool has a `format_*` function (returns `Vec<String>`) for testability
//! and a `print_*` wrapper that writes to stdout. Format functions are pure.

use crate::imaging::Dimensions;
use crate::tools::{ChromaKeyResult, CompressResult, ConvertResult, MetadataResult, ResizeResult};
use std::path::Path;

// ============================================================================
// Shared helpers
// ============================================================================

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn size(d: &Dimensions) -> String {
    format!("{}x{}", d.width, d.height)
}

/// `source → output` header; just the source when they are the same file.
fn transfer_header(source: &Path, output: &Path) -> String {
    if source == output {
        source.display().to_string()
    } else {
        format!("{} → {}", source.display(), output.display())
    }
}

/// Print formatted lines to stdout.
fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

// ============================================================================
// Per-tool formatting
// ============================================================================

pub fn format_chromakey_output(source: &Path, result: &ChromaKeyResult) -> Vec<String> {
    vec![
        transfer_header(source, &result.output_path),
        format!(
            "{}Key: {} (tolerance {})",
            indent(1),
            result.key_color,
            result.tolerance
        ),
        format!("{}Size: {}", indent(1), size(&result.dimensions)),
        format!(
            "{}Transparent: {} of {} pixels",
            indent(1),
            result.pixels_made_transparent,
            result.pixels_processed
        ),
    ]
}

pub fn print_chromakey_output(source: &Path, result: &ChromaKeyResult) {
    print_lines(format_chromakey_output(source, result));
}

pub fn format_compress_output(source: &Path, result: &CompressResult) -> Vec<String> {
    let mut lines = vec![transfer_header(source, &result.output_path)];
    match (result.compressed_size, result.reduction_percent) {
        (Some(compressed), Some(percent)) if result.compressed => lines.push(format!(
            "{}Compressed: {} → {} bytes ({}% smaller)",
            indent(1),
            result.original_size,
            compressed,
            percent
        )),
        _ => {
            let reason = result.reason.as_deref().unwrap_or("already optimal");
            lines.push(format!("{}Not compressed: {}", indent(1), reason));
            lines.push(format!("{}Size: {} bytes", indent(1), result.original_size));
        }
    }
    lines
}

pub fn print_compress_output(source: &Path, result: &CompressResult) {
    print_lines(format_compress_output(source, result));
}

pub fn format_metadata_output(result: &MetadataResult) -> Vec<String> {
    vec![
        result.path.display().to_string(),
        format!(
            "{}Format: {}",
            indent(1),
            result.format.as_deref().unwrap_or("unknown")
        ),
        format!("{}Color type: {}", indent(1), result.color_type),
        format!("{}Size: {}x{}", indent(1), result.width, result.height),
        format!(
            "{}Transparency: {}",
            indent(1),
            if result.has_transparency { "yes" } else { "no" }
        ),
        format!("{}File size: {} bytes", indent(1), result.file_size_bytes),
    ]
}

pub fn print_metadata_output(result: &MetadataResult) {
    print_lines(format_metadata_output(result));
}

pub fn format_resize_output(source: &Path, result: &ResizeResult) -> Vec<String> {
    vec![
        transfer_header(source, &result.output_path),
        format!(
            "{}Resized: {} → {} ({})",
            indent(1),
            size(&result.original_dimensions),
            size(&result.new_dimensions),
            result.resample
        ),
    ]
}

pub fn print_resize_output(source: &Path, result: &ResizeResult) {
    print_lines(format_resize_output(source, result));
}

pub fn format_convert_output(source: &Path, result: &ConvertResult) -> Vec<String> {
    vec![
        transfer_header(source, &result.output_path),
        format!(
            "{}Converted: {} → {} ({} bytes)",
            indent(1),
            result.original_format.as_deref().unwrap_or("unknown"),
            result.new_format,
            result.file_size_bytes
        ),
    ]
}

pub fn print_convert_output(source: &Path, result: &ConvertResult) {
    print_lines(format_convert_output(source, result));
}
