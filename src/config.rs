use std::time::Duration;

pub const IMAGE_SIZE: u32 = 100;
pub const X_CENTER: f64 = 50.0;
pub const Y_CENTER: f64 = 50.0;
pub const CLOCK_RADIUS: f64 = 37.0;
pub const HUB_RADIUS: f64 = 3.0;
pub const TICK_RADIUS: f64 = 2.0;
pub const TICK_INSET: f64 = 3.0;
pub const HOUR_HAND_LENGTH: f64 = 21.0;
pub const MINUTE_HAND_LENGTH: f64 = 31.0;

pub const OUTLINE_WIDTH: f64 = 4.0;
pub const HUB_WIDTH: f64 = 3.0;
pub const HAND_WIDTH: f64 = 6.0;

/// How often the wall clock is polled. Frames are only drawn on minute rollover.
pub const UPDATE_INTERVAL: Duration = Duration::from_secs(5);

pub const MIN_CLOCK_SIZE: u32 = 22;
pub const MAX_CLOCK_SIZE: u32 = 100;
pub const DEFAULT_CLOCK_SIZE: u32 = 28;
/// Space kept free between the clock and the panel edges.
pub const PANEL_MARGIN: u32 = 6;
pub const MAX_PANEL_SIZE: u32 = 512;

pub const DEFAULT_HANDS_COLOR: &str = "#000000";
pub const DEFAULT_OUTLINE_COLOR: &str = "#000000";
pub const DEFAULT_FACE_COLOR: &str = "#FFFFFF";

pub const APP_NAME: &str = "panel-clock";
pub const SOCKET_NAME: &str = "panel-clock.sock";
