//! Key colors and the `#RRGGBB` parser.

use std::fmt;
use std::str::FromStr;

/// An opaque 8-bit RGB color. Key colors never carry alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a hex color: exactly six hex digits, case-insensitive, with an
    /// optional leading `#`.
    ///
    /// ```
    /// # use chromakit::imaging::Color;
    /// assert_eq!(Color::from_hex("#00FF00"), Some(Color::new(0, 255, 0)));
    /// assert_eq!(Color::from_hex("ff0000"), Some(Color::new(255, 0, 0)));
    /// assert_eq!(Color::from_hex("notacolor"), None);
    /// ```
    pub fn from_hex(input: &str) -> Option<Self> {
        let digits = input.strip_prefix('#').unwrap_or(input);
        if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        Some(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    pub fn to_array(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

impl Default for Color {
    /// Chroma green, `#00FF00`.
    fn default() -> Self {
        Self::new(0, 255, 0)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

/// Error returned when a string is not a `#RRGGBB` color.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid hex color: {0}")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s).ok_or_else(|| ParseColorError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_hash() {
        assert_eq!(Color::from_hex("#00FF00"), Some(Color::new(0, 255, 0)));
    }

    #[test]
    fn parses_without_hash() {
        assert_eq!(Color::from_hex("FF0000"), Some(Color::new(255, 0, 0)));
    }

    #[test]
    fn parses_lowercase_and_mixed_case() {
        assert_eq!(Color::from_hex("#0a0B0c"), Some(Color::new(10, 11, 12)));
    }

    #[test]
    fn rejects_wrong_length() {
        assert_eq!(Color::from_hex("#FFF"), None);
        assert_eq!(Color::from_hex("#00FF00FF"), None);
        assert_eq!(Color::from_hex(""), None);
        assert_eq!(Color::from_hex("#"), None);
    }

    #[test]
    fn rejects_non_hex_digits() {
        assert_eq!(Color::from_hex("notacolor"), None);
        assert_eq!(Color::from_hex("#GG0000"), None);
        assert_eq!(Color::from_hex("+12345"), None);
    }

    #[test]
    fn rejects_multibyte_input_without_panicking() {
        // Six bytes but not six characters
        assert_eq!(Color::from_hex("ééé"), None);
    }

    #[test]
    fn rejects_double_hash() {
        assert_eq!(Color::from_hex("##00FF00"), None);
    }

    #[test]
    fn display_is_uppercase_hex() {
        assert_eq!(Color::new(0, 255, 16).to_string(), "#00FF10");
    }

    #[test]
    fn from_str_reports_input() {
        let err = "nope".parse::<Color>().unwrap_err();
        assert_eq!(err.to_string(), "Invalid hex color: nope");
    }

    #[test]
    fn default_is_chroma_green() {
        assert_eq!(Color::default(), Color::new(0, 255, 0));
    }
}
