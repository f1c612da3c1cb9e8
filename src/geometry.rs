use std::f64::consts::PI;

use crate::config::{CLOCK_RADIUS, TICK_INSET, X_CENTER, Y_CENTER};

pub const TICK_COUNT: usize = 12;

/// Endpoint of a hand drawn from the canvas center.
///
/// `position` is on the 60-unit dial where 0 is twelve o'clock. Trigonometric
/// angle 0 points at three o'clock, so the dial is turned back a quarter
/// (15 units) before converting to radians.
pub fn hand_endpoint(position: f64, length: f64) -> (i32, i32) {
    let adjusted = (position - 15.0).rem_euclid(60.0);
    let radians = adjusted * (PI * 2.0) / 60.0;
    (
        round_coord(X_CENTER + length * radians.cos()),
        round_coord(Y_CENTER + length * radians.sin()),
    )
}

/// Hour marks just inside the outer ring, starting at three o'clock and
/// running counter-clockwise on screen (y grows downward).
pub fn tick_marks() -> [(i32, i32); TICK_COUNT] {
    let radius = CLOCK_RADIUS - TICK_INSET;
    std::array::from_fn(|idx| {
        let angle = PI * 2.0 - (idx as f64 * (PI * 2.0) / TICK_COUNT as f64);
        (
            round_coord(X_CENTER + radius * angle.cos()),
            round_coord(Y_CENTER + radius * angle.sin()),
        )
    })
}

// Ties go to the even neighbour.
fn round_coord(value: f64) -> i32 {
    value.round_ties_even() as i32
}
