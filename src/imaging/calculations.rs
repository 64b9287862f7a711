//! Pure calculation functions for resize dimensions and alpha flattening.
//!
//! All functions here are pure and testable without any I/O or images.

use thiserror::Error;

/// Largest resize output accepted, in pixels (1 GiB as RGBA8).
pub const MAX_OUTPUT_PIXELS: u64 = 1 << 28;

/// How the caller asked for the new size. At least one of `width`, `height`
/// or `scale` must be set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeRequest {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub scale: Option<f64>,
    pub maintain_aspect: bool,
}

impl Default for ResizeRequest {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            scale: None,
            maintain_aspect: true,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResizeRequestError {
    #[error("Specify width, height, or scale")]
    NothingSpecified,
    #[error("Scale must be a positive number, got {0}")]
    InvalidScale(f64),
    #[error("Resize would produce an empty image ({width}x{height})")]
    EmptyResult { width: u64, height: u64 },
    #[error("Resize would produce an image too large ({width}x{height}, limit {limit} pixels)", limit = MAX_OUTPUT_PIXELS)]
    TooLarge { width: u64, height: u64 },
}

/// Calculate output dimensions for a resize.
///
/// Priority: `scale` wins over explicit dimensions; both `width` and `height`
/// give an exact size; a single dimension keeps the aspect ratio when
/// `maintain_aspect` is set, otherwise the other edge stays as it was.
/// Fractional results are truncated.
///
/// # Examples
/// ```
/// # use chromakit::imaging::{ResizeRequest, calculate_resize_dimensions};
/// let half = ResizeRequest { scale: Some(0.5), ..Default::default() };
/// assert_eq!(calculate_resize_dimensions((200, 100), &half), Ok((100, 50)));
///
/// let by_width = ResizeRequest { width: Some(100), ..Default::default() };
/// assert_eq!(calculate_resize_dimensions((200, 100), &by_width), Ok((100, 50)));
/// ```
pub fn calculate_resize_dimensions(
    original: (u32, u32),
    request: &ResizeRequest,
) -> Result<(u32, u32), ResizeRequestError> {
    let (orig_w, orig_h) = original;

    let (w, h) = match (request.scale, request.width, request.height) {
        (Some(scale), _, _) => {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(ResizeRequestError::InvalidScale(scale));
            }
            (scaled(orig_w, scale), scaled(orig_h, scale))
        }
        (None, Some(w), Some(h)) => (w as u64, h as u64),
        (None, Some(w), None) => {
            let h = if request.maintain_aspect {
                scaled(orig_h, w as f64 / orig_w as f64)
            } else {
                orig_h as u64
            };
            (w as u64, h)
        }
        (None, None, Some(h)) => {
            let w = if request.maintain_aspect {
                scaled(orig_w, h as f64 / orig_h as f64)
            } else {
                orig_w as u64
            };
            (w, h as u64)
        }
        (None, None, None) => return Err(ResizeRequestError::NothingSpecified),
    };

    if w == 0 || h == 0 {
        return Err(ResizeRequestError::EmptyResult {
            width: w,
            height: h,
        });
    }
    if w.saturating_mul(h) > MAX_OUTPUT_PIXELS {
        return Err(ResizeRequestError::TooLarge {
            width: w,
            height: h,
        });
    }
    // Both edges are at least 1, so each is within the pixel cap and fits u32
    Ok((w as u32, h as u32))
}

/// `len × factor`, truncated. Saturates instead of wrapping.
fn scaled(len: u32, factor: f64) -> u64 {
    (len as f64 * factor) as u64
}

/// Composite one channel of a straight-alpha pixel over an opaque background.
///
/// `round((fg × a + bg × (255 − a)) / 255)`, computed in integers.
pub fn blend_channel(fg: u8, bg: u8, alpha: u8) -> u8 {
    let a = alpha as u32;
    let mixed = fg as u32 * a + bg as u32 * (255 - a);
    ((mixed + 127) / 255) as u8
}

/// Composite a whole RGBA pixel over an opaque RGB background.
pub fn flatten_pixel(rgba: [u8; 4], background: [u8; 3]) -> [u8; 3] {
    let [r, g, b, a] = rgba;
    [
        blend_channel(r, background[0], a),
        blend_channel(g, background[1], a),
        blend_channel(b, background[2], a),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(width: Option<u32>, height: Option<u32>, scale: Option<f64>) -> ResizeRequest {
        ResizeRequest {
            width,
            height,
            scale,
            maintain_aspect: true,
        }
    }

    // =========================================================================
    // calculate_resize_dimensions
    // =========================================================================

    #[test]
    fn width_only_keeps_aspect() {
        assert_eq!(
            calculate_resize_dimensions((200, 100), &req(Some(100), None, None)),
            Ok((100, 50))
        );
    }

    #[test]
    fn height_only_keeps_aspect() {
        assert_eq!(
            calculate_resize_dimensions((200, 100), &req(None, Some(25), None)),
            Ok((50, 25))
        );
    }

    #[test]
    fn single_dimension_without_aspect_keeps_other_edge() {
        let mut r = req(Some(100), None, None);
        r.maintain_aspect = false;
        assert_eq!(calculate_resize_dimensions((200, 80), &r), Ok((100, 80)));

        let mut r = req(None, Some(10), None);
        r.maintain_aspect = false;
        assert_eq!(calculate_resize_dimensions((200, 80), &r), Ok((200, 10)));
    }

    #[test]
    fn both_dimensions_are_exact() {
        assert_eq!(
            calculate_resize_dimensions((200, 100), &req(Some(30), Some(300), None)),
            Ok((30, 300))
        );
    }

    #[test]
    fn scale_takes_priority() {
        assert_eq!(
            calculate_resize_dimensions((100, 100), &req(Some(10), Some(10), Some(2.0))),
            Ok((200, 200))
        );
    }

    #[test]
    fn fractional_results_truncate() {
        // 333 × 0.5 = 166.5 → 166
        assert_eq!(
            calculate_resize_dimensions((333, 101), &req(None, None, Some(0.5))),
            Ok((166, 50))
        );
        // 100 × (33 / 64) = 51.5625 → 51
        assert_eq!(
            calculate_resize_dimensions((64, 100), &req(Some(33), None, None)),
            Ok((33, 51))
        );
    }

    #[test]
    fn nothing_specified_is_error() {
        assert_eq!(
            calculate_resize_dimensions((10, 10), &ResizeRequest::default()),
            Err(ResizeRequestError::NothingSpecified)
        );
    }

    #[test]
    fn non_positive_scale_is_error() {
        for s in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                calculate_resize_dimensions((10, 10), &req(None, None, Some(s))),
                Err(ResizeRequestError::InvalidScale(_))
            ));
        }
    }

    #[test]
    fn collapsing_to_zero_is_error() {
        assert_eq!(
            calculate_resize_dimensions((1000, 10), &req(Some(50), None, None)),
            Err(ResizeRequestError::EmptyResult {
                width: 50,
                height: 0
            })
        );
        assert!(calculate_resize_dimensions((10, 10), &req(Some(0), Some(5), None)).is_err());
    }

    #[test]
    fn huge_scale_is_rejected_not_saturated() {
        assert!(matches!(
            calculate_resize_dimensions((10, 10), &req(None, None, Some(1e12))),
            Err(ResizeRequestError::TooLarge { .. })
        ));
    }

    #[test]
    fn extreme_width_with_aspect_is_rejected() {
        // height follows the aspect ratio: 4e9 × 4e9
        assert!(matches!(
            calculate_resize_dimensions((1, 4_000_000_000), &req(Some(4_000_000_000), None, None)),
            Err(ResizeRequestError::TooLarge { .. })
        ));
    }

    #[test]
    fn explicit_dimensions_over_cap_rejected() {
        assert!(matches!(
            calculate_resize_dimensions((10, 10), &req(Some(100_000), Some(100_000), None)),
            Err(ResizeRequestError::TooLarge {
                width: 100_000,
                height: 100_000
            })
        ));
    }

    #[test]
    fn output_at_cap_is_accepted() {
        assert_eq!(
            calculate_resize_dimensions((1, 1), &req(Some(1 << 14), Some(1 << 14), None)),
            Ok((1 << 14, 1 << 14))
        );
    }

    // =========================================================================
    // Flattening
    // =========================================================================

    #[test]
    fn blend_extremes() {
        assert_eq!(blend_channel(200, 255, 255), 200);
        assert_eq!(blend_channel(200, 255, 0), 255);
    }

    #[test]
    fn blend_half_alpha_rounds() {
        // (255 × 128 + 255 × 127) / 255 = 255
        assert_eq!(blend_channel(255, 255, 128), 255);
        // (0 × 128 + 255 × 127) / 255 = 127
        assert_eq!(blend_channel(0, 255, 128), 127);
    }

    #[test]
    fn flatten_semi_transparent_red_on_white() {
        assert_eq!(flatten_pixel([255, 0, 0, 128], [255, 255, 255]), [255, 127, 127]);
    }

    #[test]
    fn flatten_transparent_becomes_background() {
        assert_eq!(flatten_pixel([0, 0, 255, 0], [255, 255, 255]), [255, 255, 255]);
    }
}
