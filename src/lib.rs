//! # chromakit
//!
//! Chroma-key background removal plus the small image tools that usually
//! travel with it: PNG compression, metadata, resizing and format conversion.
//!
//! # Chroma Keying
//!
//! Every pixel's RGB distance to the key color decides its new alpha:
//!
//! ```text
//! d <= tolerance          →  alpha 0      (background)
//! d >= 3 × tolerance      →  alpha 255    (subject)
//! in between              →  linear ramp  (soft edge)
//! ```
//!
//! RGB channels are never touched, and any existing alpha is overwritten.
//! Rows are independent, so the sweep runs in parallel with `rayon` and is
//! byte-for-byte identical to a sequential sweep.
//!
//! ```
//! use chromakit::imaging::{ChromaKey, Color, PixelBuffer};
//!
//! // green background pixel, red subject pixel
//! let mut buf = PixelBuffer::from_raw(2, 1, vec![0, 255, 0, 255, 255, 0, 0, 255]).unwrap();
//!
//! let key = ChromaKey::new(Color::new(0, 255, 0), 70.0).unwrap();
//! key.apply(&mut buf);
//!
//! assert_eq!(buf.as_raw(), &[0, 255, 0, 0, 255, 0, 0, 255]);
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Keying engine, `image`-crate backend, resize/convert/metadata operations |
//! | [`compress`] | Optional lossy PNG compression through an external `pngquant` |
//! | [`config`] | `chromakit.toml` loading, validation, and stock defaults |
//! | [`tools`] | Tool registry: JSON arguments in, JSON results out |
//! | [`server`] | Stdio JSON-RPC server exposing the tools to a tool host |
//! | [`output`] | CLI output formatting of tool results |
//!
//! # Design Decisions
//!
//! ## Validate Up Front
//!
//! A [`imaging::ChromaKey`] can only be built from a parsed color and a
//! finite, positive tolerance. Once one exists, applying it cannot fail, so
//! bad parameters are rejected before any pixel is read.
//!
//! ## Backend Trait
//!
//! Codec work sits behind [`imaging::ImageBackend`]. Operations and tools are
//! tested against a recording mock; only the backend's own tests touch real
//! encoders.
//!
//! ## Compression Is Optional
//!
//! `pngquant` is located once at startup. Without it, `compress_png` still
//! succeeds and reports that nothing was compressed.

pub mod compress;
pub mod config;
pub mod imaging;
pub mod output;
pub mod server;
pub mod tools;
