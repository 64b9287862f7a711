//! Chroma-key to transparency.
//!
//! Every pixel gets a new alpha derived from its Euclidean RGB distance `d`
//! to the key color, using two radii derived from the tolerance:
//!
//! ```text
//!   d < inner            → alpha 0     (background)
//!   inner ≤ d < outer    → 0..255      (linear ramp, anti-aliased edge)
//!   d ≥ outer            → alpha 255   (foreground)
//!
//!   inner = tolerance, outer = 3 × tolerance
//! ```
//!
//! Only the alpha byte is written. RGB is never touched, and any alpha the
//! source already had is replaced, not combined: the key-derived value is
//! authoritative for every pixel.
//!
//! Distances are computed in `f64` and the ramp is rounded half away from zero
//! (`f64::round`), so a pixel exactly halfway through the band lands on 128.
//!
//! Pixels are independent of each other. [`ChromaKey::apply`] sweeps rows in
//! parallel with rayon; [`ChromaKey::apply_sequential`] is the single-threaded
//! reference and produces byte-identical output.

use super::color::Color;
use image::RgbaImage;
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

/// Default tolerance when none is configured.
pub const DEFAULT_TOLERANCE: f64 = 70.0;

/// Ratio between the outer and inner radius of the graduated band.
const OUTER_RADIUS_FACTOR: f64 = 3.0;

/// Rows handed to a single rayon task at minimum.
const MIN_ROWS_PER_TASK: usize = 16;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChromaKeyError {
    #[error("Invalid tolerance: {0} (must be a positive number)")]
    InvalidParameter(f64),
    #[error("Invalid hex color: {0}")]
    InvalidColor(String),
}

/// Row-major RGBA8 pixels. `data.len() == width * height * 4` always holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Wrap raw RGBA bytes. Returns `None` for zero dimensions or a length
    /// that does not match `width * height * 4`.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        let expected = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(4)?;
        (data.len() == expected).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Take over an `image` buffer. `None` when it has no pixels.
    pub fn from_image(img: RgbaImage) -> Option<Self> {
        let (width, height) = img.dimensions();
        Self::from_raw(width, height, img.into_raw())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_raw(&self) -> &[u8] {
        &self.data
    }

    pub fn into_raw(self) -> Vec<u8> {
        self.data
    }

    pub fn into_image(self) -> RgbaImage {
        RgbaImage::from_raw(self.width, self.height, self.data)
            .expect("PixelBuffer length matches its dimensions")
    }
}


/// The two radii derived from a tolerance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToleranceBand {
    pub inner: f64,
    pub outer: f64,
}

impl ToleranceBand {
    pub fn new(tolerance: f64) -> Result<Self, ChromaKeyError> {
        // NaN fails the comparison too
        if !(tolerance.is_finite() && tolerance > 0.0) {
            return Err(ChromaKeyError::InvalidParameter(tolerance));
        }
        Ok(Self {
            inner: tolerance,
            outer: tolerance * OUTER_RADIUS_FACTOR,
        })
    }

    /// Alpha for a pixel at distance `d` from the key.
    pub fn alpha_for_distance(&self, d: f64) -> u8 {
        if d < self.inner {
            0
        } else if d >= self.outer {
            255
        } else {
            let ramp = 255.0 * (d - self.inner) / (self.outer - self.inner);
            ramp.round().clamp(0.0, 255.0) as u8
        }
    }
}

/// Euclidean distance between two RGB triples.
pub fn color_distance(a: [u8; 3], b: [u8; 3]) -> f64 {
    // Max 3 × 255² = 195075, fits u32 comfortably
    let squared: u32 = a
        .iter()
        .zip(b.iter())
        .map(|(&x, &y)| {
            let diff = x.abs_diff(y) as u32;
            diff * diff
        })
        .sum();
    (squared as f64).sqrt()
}

/// Pixel counts gathered while keying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChromaKeyStats {
    pub pixels_processed: u64,
    /// Alpha 0 after keying.
    pub pixels_transparent: u64,
    /// Alpha strictly between 0 and 255 after keying.
    pub pixels_partial: u64,
}

impl ChromaKeyStats {
    fn merge(self, other: Self) -> Self {
        Self {
            pixels_processed: self.pixels_processed + other.pixels_processed,
            pixels_transparent: self.pixels_transparent + other.pixels_transparent,
            pixels_partial: self.pixels_partial + other.pixels_partial,
        }
    }
}

/// A validated key color + tolerance, ready to apply to any number of buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChromaKey {
    key: Color,
    band: ToleranceBand,
}

impl ChromaKey {
    pub fn new(key: Color, tolerance: f64) -> Result<Self, ChromaKeyError> {
        Ok(Self {
            key,
            band: ToleranceBand::new(tolerance)?,
        })
    }

    /// Parse the key color, then validate the tolerance.
    pub fn from_hex(key: &str, tolerance: f64) -> Result<Self, ChromaKeyError> {
        let color =
            Color::from_hex(key).ok_or_else(|| ChromaKeyError::InvalidColor(key.to_string()))?;
        Self::new(color, tolerance)
    }

    pub fn key(&self) -> Color {
        self.key
    }

    pub fn tolerance(&self) -> f64 {
        self.band.inner
    }

    pub fn band(&self) -> ToleranceBand {
        self.band
    }

    /// Alpha for a single RGB value.
    pub fn alpha_for(&self, rgb: [u8; 3]) -> u8 {
        self.band
            .alpha_for_distance(color_distance(rgb, self.key.to_array()))
    }

    /// Rewrite the alpha channel of `buffer` in place, sweeping rows in parallel.
    pub fn apply(&self, buffer: &mut PixelBuffer) -> ChromaKeyStats {
        let row_bytes = buffer.width as usize * 4;
        buffer
            .data
            .par_chunks_mut(row_bytes)
            .with_min_len(MIN_ROWS_PER_TASK)
            .map(|row| self.key_pixels(row))
            .reduce(ChromaKeyStats::default, ChromaKeyStats::merge)
    }

    /// Single-threaded equivalent of [`apply`](Self::apply).
    pub fn apply_sequential(&self, buffer: &mut PixelBuffer) -> ChromaKeyStats {
        self.key_pixels(&mut buffer.data)
    }

    fn key_pixels(&self, pixels: &mut [u8]) -> ChromaKeyStats {
        let mut stats = ChromaKeyStats::default();
        for px in pixels.chunks_exact_mut(4) {
            let alpha = self.alpha_for([px[0], px[1], px[2]]);
            px[3] = alpha;
            stats.pixels_processed += 1;
            match alpha {
                0 => stats.pixels_transparent += 1,
                255 => {}
                _ => stats.pixels_partial += 1,
            }
        }
        stats
    }
}

/// Key out `key` from `buffer` with the given tolerance.
///
/// Parameters are validated before any pixel is touched; on error the buffer
/// is dropped unmodified.
pub fn apply(
    mut buffer: PixelBuffer,
    key: Color,
    tolerance: f64,
) -> Result<PixelBuffer, ChromaKeyError> {
    let chroma = ChromaKey::new(key, tolerance)?;
    chroma.apply(&mut buffer);
    Ok(buffer)
}

/// Pixel-level access for tests.
#[cfg(test)]
impl PixelBuffer {
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Option<Self> {
        let count = (width as usize).checked_mul(height as usize)?;
        Self::from_raw(width, height, rgba.repeat(count))
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        assert!(x < self.width && y < self.height, "pixel ({x}, {y}) out of bounds");
        (y as usize * self.width as usize + x as usize) * 4
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.offset(x, y);
        [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ]
    }

    pub fn put_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.offset(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }
}
