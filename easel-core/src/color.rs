//! # Colors
//!
//! Scene colors are straight-alpha sRGB with eight bits per channel, which is what the persisted
//! descriptions carry. Parsing accepts the handful of CSS forms that show up in stored templates,
//! formatting always produces lowercase hex so that serialized scenes compare stably.

use std::str::FromStr;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("empty color string")]
    Empty,
    #[error("malformed hex color {0:?}")]
    BadHex(String),
    #[error("malformed functional color {0:?}")]
    BadFunction(String),
    #[error("unknown color name {0:?}")]
    UnknownName(String),
}

/// A straight (non-premultiplied) sRGB color.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}
impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
    #[must_use]
    pub fn is_opaque(&self) -> bool {
        self.a == 255
    }
    #[must_use]
    pub fn as_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
    /// `#rrggbb` for opaque colors, `#rrggbbaa` otherwise.
    #[must_use]
    pub fn to_hex(&self) -> String {
        if self.is_opaque() {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
    fn parse_hex(hex: &str) -> Result<Self, ColorParseError> {
        let bad = || ColorParseError::BadHex(hex.to_owned());
        if !hex.is_ascii() {
            return Err(bad());
        }
        let nibble = |idx: usize| -> Result<u8, ColorParseError> {
            u8::from_str_radix(&hex[idx..=idx], 16).map_err(|_| bad())
        };
        let byte = |idx: usize| -> Result<u8, ColorParseError> {
            u8::from_str_radix(&hex[idx..idx + 2], 16).map_err(|_| bad())
        };
        match hex.len() {
            // #rgb and #rgba expand each nibble.
            3 | 4 => {
                let mut channels = [255u8; 4];
                for (idx, channel) in channels.iter_mut().enumerate().take(hex.len()) {
                    *channel = nibble(idx)? * 17;
                }
                let [r, g, b, a] = channels;
                Ok(Self::rgba(r, g, b, a))
            }
            6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
            _ => Err(bad()),
        }
    }
    fn parse_function(source: &str, body: &str) -> Result<Self, ColorParseError> {
        let bad = || ColorParseError::BadFunction(source.to_owned());
        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        if parts.len() != 3 && parts.len() != 4 {
            return Err(bad());
        }
        let mut rgb = [0u8; 3];
        for (channel, part) in rgb.iter_mut().zip(&parts) {
            let value: f64 = part.parse().map_err(|_| bad())?;
            *channel = value.round().clamp(0.0, 255.0) as u8;
        }
        let alpha = match parts.get(3) {
            Some(part) => {
                let value: f64 = part.parse().map_err(|_| bad())?;
                (value.clamp(0.0, 1.0) * 255.0).round() as u8
            }
            None => 255,
        };
        Ok(Self::rgba(rgb[0], rgb[1], rgb[2], alpha))
    }
}
impl FromStr for Color {
    type Err = ColorParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ColorParseError::Empty);
        }
        if let Some(hex) = trimmed.strip_prefix('#') {
            return Self::parse_hex(hex);
        }
        let lower = trimmed.to_ascii_lowercase();
        if let Some(body) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return Self::parse_function(trimmed, body);
        }
        match lower.as_str() {
            "transparent" => Ok(Self::TRANSPARENT),
            "white" => Ok(Self::WHITE),
            "black" => Ok(Self::BLACK),
            "red" => Ok(Self::rgb(255, 0, 0)),
            "green" => Ok(Self::rgb(0, 128, 0)),
            "blue" => Ok(Self::rgb(0, 0, 255)),
            "gray" | "grey" => Ok(Self::rgb(128, 128, 128)),
            _ => Err(ColorParseError::UnknownName(trimmed.to_owned())),
        }
    }
}
impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}
impl serde::Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}
impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let string = String::deserialize(deserializer)?;
        string.parse().map_err(serde::de::Error::custom)
    }
}
impl From<image::Rgba<u8>> for Color {
    fn from(value: image::Rgba<u8>) -> Self {
        let [r, g, b, a] = value.0;
        Self::rgba(r, g, b, a)
    }
}
impl From<Color> for image::Rgba<u8> {
    fn from(value: Color) -> Self {
        image::Rgba(value.as_array())
    }
}
