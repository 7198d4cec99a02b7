//! HSVA colors
//!
//! Color parameters store hue, saturation, value and alpha as four floats in
//! `[0, 1]`. Conversion to RGB and hex only exists for display and for hex
//! input in the panel. The URL always carries the raw channels.

use libm::{floor, round};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static HEX_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^#?([a-f\d]{2})([a-f\d]{2})([a-f\d]{2})([a-f\d]{2})?$")
        .expect("hex pattern is valid")
});

/// An HSVA color with every channel in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub [f64; 4]);

impl Color {
    pub const fn new(hue: f64, saturation: f64, value: f64, alpha: f64) -> Self {
        Self([hue, saturation, value, alpha])
    }

    /// Opaque color
    pub const fn hsv(hue: f64, saturation: f64, value: f64) -> Self {
        Self::new(hue, saturation, value, 1.0)
    }

    pub fn hue(&self) -> f64 {
        self.0[0]
    }

    pub fn saturation(&self) -> f64 {
        self.0[1]
    }

    pub fn value(&self) -> f64 {
        self.0[2]
    }

    pub fn alpha(&self) -> f64 {
        self.0[3]
    }

    pub fn channels(&self) -> &[f64; 4] {
        &self.0
    }

    /// `#rrggbbaa` representation
    pub fn to_hex(&self) -> String {
        let [r, g, b] = hsv_to_rgb(self.hue(), self.saturation(), self.value());
        let a = round(self.alpha() * 255.0).clamp(0.0, 255.0) as u8;
        format!("#{:02x}{:02x}{:02x}{:02x}", r, g, b, a)
    }

    /// Parse `#rrggbb` or `#rrggbbaa` (the `#` is optional)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let captures = HEX_PATTERN.captures(hex.trim())?;
        let channel = |i: usize| {
            captures
                .get(i)
                .and_then(|m| u8::from_str_radix(m.as_str(), 16).ok())
        };

        let [h, s, v] = rgb_to_hsv(channel(1)?, channel(2)?, channel(3)?);
        let alpha = channel(4).map(|a| a as f64 / 255.0).unwrap_or(1.0);
        Some(Self::new(h, s, v, alpha))
    }
}

impl From<[f64; 4]> for Color {
    fn from(channels: [f64; 4]) -> Self {
        Self(channels)
    }
}

/// Converts HSV in `[0, 1]` to RGB in `[0, 255]`
pub fn hsv_to_rgb(hue: f64, saturation: f64, value: f64) -> [u8; 3] {
    let i = floor(hue * 6.0);
    let f = hue * 6.0 - i;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - f * saturation);
    let t = value * (1.0 - (1.0 - f) * saturation);

    let (red, green, blue) = match (i as i64).rem_euclid(6) {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };

    [to_byte(red), to_byte(green), to_byte(blue)]
}

/// Converts RGB in `[0, 255]` to HSV in `[0, 1]`
pub fn rgb_to_hsv(red: u8, green: u8, blue: u8) -> [f64; 3] {
    let (r, g, b) = (red as f64 / 255.0, green as f64 / 255.0, blue as f64 / 255.0);
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let d = max - min;

    let saturation = if max == 0.0 { 0.0 } else { d / max };
    let hue = if d == 0.0 {
        0.0
    } else if max == r {
        ((g - b) / d + if g < b { 6.0 } else { 0.0 }) / 6.0
    } else if max == g {
        ((b - r) / d + 2.0) / 6.0
    } else {
        ((r - g) / d + 4.0) / 6.0
    };

    [hue, saturation, max]
}

fn to_byte(channel: f64) -> u8 {
    round(channel * 255.0).clamp(0.0, 255.0) as u8
}
