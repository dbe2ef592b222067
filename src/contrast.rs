use lightningcss::values::color::{CssColor, SRGB};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which luminance model the contrast rule scores with.
///
/// `Perceptual` is the simplified `0.299r + 0.587g + 0.114b` weighting the
/// scanner has always used; `Wcag` is the gamma-corrected relative luminance
/// from WCAG 2.x.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContrastFormula {
    #[default]
    Perceptual,
    Wcag,
}

impl ContrastFormula {
    pub const fn as_str(self) -> &'static str {
        match self {
            ContrastFormula::Perceptual => "perceptual",
            ContrastFormula::Wcag => "wcag",
        }
    }

    pub fn ratio(self, hex1: &str, hex2: &str) -> f64 {
        match self {
            ContrastFormula::Perceptual => contrast_ratio(hex1, hex2),
            ContrastFormula::Wcag => {
                ratio_of(relative_luminance(hex1), relative_luminance(hex2))
            }
        }
    }
}

impl fmt::Display for ContrastFormula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContrastFormula {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "perceptual" => Ok(ContrastFormula::Perceptual),
            "wcag" => Ok(ContrastFormula::Wcag),
            other => Err(format!(
                "invalid contrast formula: {other} (expected perceptual|wcag)"
            )),
        }
    }
}

/// Converts a computed `rgb(r, g, b)` string into `#rrggbb`.
///
/// Returns `None` for `transparent` and for anything that is not the fixed
/// three-channel form, `rgba(...)` included.
pub fn rgb_to_hex(rgb: &str) -> Option<String> {
    let rgb = rgb.trim();
    if rgb.is_empty() || rgb == "transparent" {
        return None;
    }
    let inner = rgb.strip_prefix("rgb(")?.strip_suffix(')')?;
    let mut channels = [0u8; 3];
    let mut parts = inner.split(',');
    for channel in &mut channels {
        let part = parts.next()?.trim();
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        *channel = part.parse::<u8>().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    let [r, g, b] = channels;
    Some(format!("#{r:02x}{g:02x}{b:02x}"))
}

/// Perceptual brightness of a `#rrggbb` color in `[0, 1]`.
///
/// Unparseable channels count as 0.
pub fn luminance(hex: &str) -> f64 {
    let (r, g, b) = hex_channels(hex);
    0.299 * r + 0.587 * g + 0.114 * b
}

/// WCAG 2.x relative luminance of a `#rrggbb` color.
pub fn relative_luminance(hex: &str) -> f64 {
    let (r, g, b) = hex_channels(hex);
    0.2126 * linearize(r) + 0.7152 * linearize(g) + 0.0722 * linearize(b)
}

pub fn contrast_ratio(hex1: &str, hex2: &str) -> f64 {
    ratio_of(luminance(hex1), luminance(hex2))
}

fn ratio_of(l1: f64, l2: f64) -> f64 {
    let lighter = l1.max(l2);
    let darker = l1.min(l2);
    (lighter + 0.05) / (darker + 0.05)
}

fn linearize(value: f64) -> f64 {
    if value <= 0.03928 {
        value / 12.92
    } else {
        ((value + 0.055) / 1.055).powf(2.4)
    }
}

fn hex_channels(hex: &str) -> (f64, f64, f64) {
    let hex = hex.trim().trim_start_matches('#');
    let channel = |idx: usize| -> f64 {
        hex.get(idx..idx + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .map(|v| f64::from(v) / 255.0)
            .unwrap_or(0.0)
    };
    (channel(0), channel(2), channel(4))
}

/// Computed form a browser reports for a parsed color: `rgb(r, g, b)` when
/// opaque, `rgba(r, g, b, a)` otherwise. `None` for colors that only resolve
/// against context (`currentcolor`, system colors, `light-dark()`).
pub fn computed_color(color: &CssColor) -> Option<String> {
    let srgb = SRGB::try_from(color).ok()?;
    let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    Some(format_rgba(
        channel(srgb.r),
        channel(srgb.g),
        channel(srgb.b),
        f64::from(srgb.alpha),
    ))
}

fn format_rgba(r: u8, g: u8, b: u8, alpha: f64) -> String {
    if alpha.is_nan() || alpha >= 1.0 {
        return format!("rgb({r}, {g}, {b})");
    }
    let alpha = (alpha.max(0.0) * 100.0).round() / 100.0;
    format!("rgba({r}, {g}, {b}, {alpha})")
}
