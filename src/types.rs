use anyhow::Result;
use std::fmt;
use std::str::FromStr;

use crate::config::{
    DEFAULT_CLOCK_SIZE, DEFAULT_FACE_COLOR, DEFAULT_HANDS_COLOR, DEFAULT_OUTLINE_COLOR,
    MAX_CLOCK_SIZE, MIN_CLOCK_SIZE, PANEL_MARGIN,
};

pub const NONE_COLOR: &str = "none";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

/// A stored paint value: the `"none"` sentinel or a CSS color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockColor {
    None,
    Rgba(svgtypes::Color),
}

impl ClockColor {
    /// `#rrggbb` and opacity in `[0, 1]`, or `None` for the transparent sentinel.
    pub fn svg_paint(&self) -> Option<(String, f32)> {
        match self {
            ClockColor::None => None,
            ClockColor::Rgba(color) => Some((
                format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue),
                color.alpha as f32 / 255.0,
            )),
        }
    }
}

impl FromStr for ClockColor {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        let value = value.trim();
        if value == NONE_COLOR {
            return Ok(ClockColor::None);
        }
        if let Some(color) = parse_wide_hex(value) {
            return Ok(ClockColor::Rgba(color));
        }
        svgtypes::Color::from_str(value)
            .map(ClockColor::Rgba)
            .map_err(|err| anyhow::anyhow!("invalid color {value:?}: {err}"))
    }
}

/// GTK also writes `#rrrgggbbb` and `#rrrrggggbbbb`; keep the top 8 bits of each channel.
fn parse_wide_hex(value: &str) -> Option<svgtypes::Color> {
    let digits = value.strip_prefix('#')?;
    if !digits.bytes().all(|byte| byte.is_ascii_hexdigit()) {
        return None;
    }
    let width = match digits.len() {
        9 => 3,
        12 => 4,
        _ => return None,
    };
    let channel = |idx: usize| -> Option<u8> {
        let raw = u16::from_str_radix(&digits[idx * width..(idx + 1) * width], 16).ok()?;
        Some((raw >> (width * 4 - 8)) as u8)
    };
    Some(svgtypes::Color::new_rgb(channel(0)?, channel(1)?, channel(2)?))
}

impl fmt::Display for ClockColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockColor::None => f.write_str(NONE_COLOR),
            ClockColor::Rgba(color) if color.alpha == 255 => {
                write!(f, "#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
            }
            ClockColor::Rgba(color) => write!(
                f,
                "#{:02x}{:02x}{:02x}{:02x}",
                color.red, color.green, color.blue, color.alpha
            ),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockConfig {
    pub size: u32,
    pub hand_color: ClockColor,
    pub outline_color: ClockColor,
    pub face_color: ClockColor,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            size: DEFAULT_CLOCK_SIZE,
            hand_color: default_color(DEFAULT_HANDS_COLOR),
            outline_color: default_color(DEFAULT_OUTLINE_COLOR),
            face_color: default_color(DEFAULT_FACE_COLOR),
        }
    }
}

pub fn default_color(value: &str) -> ClockColor {
    value.parse().unwrap_or(ClockColor::None)
}

pub fn clamp_size(size: i64) -> u32 {
    size.clamp(MIN_CLOCK_SIZE as i64, MAX_CLOCK_SIZE as i64) as u32
}

/// The largest clock the host panel currently has room for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PanelConstraint {
    pub max_size: u32,
}

impl PanelConstraint {
    pub fn from_panel_size(panel_size: u32) -> Self {
        Self {
            max_size: panel_size.saturating_sub(PANEL_MARGIN).max(MIN_CLOCK_SIZE),
        }
    }
}

impl Default for PanelConstraint {
    fn default() -> Self {
        Self {
            max_size: MAX_CLOCK_SIZE,
        }
    }
}
