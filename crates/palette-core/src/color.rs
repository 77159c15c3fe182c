//! Color values and contrast math
//!
//! [`Color`] is a plain 8-bit RGBA value. Luminance and contrast follow the
//! WCAG 2.x definitions and are total over the whole color space; alpha is
//! ignored by both.
//!
//! # Usage
//!
//! ```rust
//! use palette_core::color::{contrast_ratio, Color};
//!
//! let ratio = contrast_ratio(Color::WHITE, Color::BLACK);
//! assert!((ratio - 21.0).abs() < 1e-9);
//!
//! let accent: Color = "#0078D4".parse().unwrap();
//! assert_eq!(accent.to_string(), "#0078D4");
//! ```

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Contrast ratio below which a candidate is flagged (WCAG AA, body text)
pub const MIN_CONTRAST_RATIO: f64 = 4.5;

/// Color string could not be parsed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid color string: {0:?}")]
pub struct ColorParseError(pub String);

/// An 8-bit RGBA color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
    /// Alpha channel (255 = opaque)
    pub a: u8,
}

impl Color {
    /// Opaque white
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    /// Opaque black
    pub const BLACK: Color = Color::rgb(0, 0, 0);

    /// Create an opaque color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Create a color with explicit alpha
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Whether alpha is 255
    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }

    /// `#AARRGGBB`, always with alpha first
    pub fn to_argb_string(&self) -> String {
        format!("#{:02X}{:02X}{:02X}{:02X}", self.a, self.r, self.g, self.b)
    }

    /// `#RRGGBB`, with alpha appended as `#RRGGBBAA` when not opaque
    pub fn to_css_string(&self) -> String {
        if self.is_opaque() {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }

    /// WCAG relative luminance of this color
    pub fn relative_luminance(&self) -> f64 {
        relative_luminance(*self)
    }

    /// WCAG contrast ratio against another color
    pub fn contrast_ratio(&self, other: Color) -> f64 {
        contrast_ratio(*self, other)
    }

    /// Linear blend toward `other`; `t` is clamped to [0, 1]
    pub fn blend(&self, other: Color, t: f64) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |from: u8, to: u8| -> u8 {
            let value = f64::from(from) + (f64::from(to) - f64::from(from)) * t;
            value.round().clamp(0.0, 255.0) as u8
        };
        Color {
            r: mix(self.r, other.r),
            g: mix(self.g, other.g),
            b: mix(self.b, other.b),
            a: self.a,
        }
    }
}

/// Relative luminance of a color
///
/// Each channel is linearized with the piecewise sRGB curve (breakpoint
/// 0.03928, exponent 2.4) before the weighted sum. Alpha is ignored.
pub fn relative_luminance(color: Color) -> f64 {
    fn channel(c: u8) -> f64 {
        let c = f64::from(c) / 255.0;
        if c <= 0.03928 {
            c / 12.92
        } else {
            ((c + 0.055) / 1.055).powf(2.4)
        }
    }
    0.2126 * channel(color.r) + 0.7152 * channel(color.g) + 0.0722 * channel(color.b)
}

/// Contrast ratio between two colors, in [1, 21]; symmetric
pub fn contrast_ratio(a: Color, b: Color) -> f64 {
    let la = relative_luminance(a);
    let lb = relative_luminance(b);
    let lighter = la.max(lb);
    let darker = la.min(lb);
    (lighter + 0.05) / (darker + 0.05)
}

impl FromStr for Color {
    type Err = ColorParseError;

    /// Accepts `#RGB`, `#ARGB`, `#RRGGBB` and `#AARRGGBB`; `#` is optional
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ColorParseError(s.to_string());
        let hex = s.trim();
        let hex = hex.strip_prefix('#').unwrap_or(hex);

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }

        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17).map_err(|_| err())
        };

        match hex.len() {
            3 => Ok(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            4 => Ok(Color::rgba(nibble(1)?, nibble(2)?, nibble(3)?, nibble(0)?)),
            6 => Ok(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Color::rgba(byte(2)?, byte(4)?, byte(6)?, byte(0)?)),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Color {
    /// Document form: `#RRGGBB` when opaque, `#AARRGGBB` otherwise
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_opaque() {
            write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            f.write_str(&self.to_argb_string())
        }
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
