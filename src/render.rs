use anyhow::{Context, Result};
use resvg::usvg;
use std::fmt::Write as _;
use tiny_skia::{Pixmap, Transform};

use crate::config::{
    CLOCK_RADIUS, HAND_WIDTH, HOUR_HAND_LENGTH, HUB_RADIUS, HUB_WIDTH, IMAGE_SIZE,
    MINUTE_HAND_LENGTH, OUTLINE_WIDTH, TICK_RADIUS, X_CENTER, Y_CENTER,
};
use crate::geometry::{hand_endpoint, tick_marks};
use crate::types::{ClockColor, ClockConfig, ClockTime};

/// Produces a square frame of the clock for a given time.
pub trait Renderer {
    fn render(&mut self, time: ClockTime, config: &ClockConfig, size: u32) -> Result<Pixmap>;
}

#[derive(Default)]
pub struct SvgRenderer {
    options: usvg::Options<'static>,
}

impl Renderer for SvgRenderer {
    fn render(&mut self, time: ClockTime, config: &ClockConfig, size: u32) -> Result<Pixmap> {
        let document = clock_document(time, config);
        rasterize(&document, size, &self.options)
    }
}

/// Dial position of the hour hand, advancing between marks as minutes pass.
pub fn hour_position(time: ClockTime) -> f64 {
    let hour = if time.hour > 12 { time.hour - 12 } else { time.hour };
    hour as f64 * 5.0 + time.minute as f64 / 12.0
}

pub fn minute_position(time: ClockTime) -> f64 {
    time.minute as f64
}

pub fn clock_document(time: ClockTime, config: &ClockConfig) -> String {
    let mut svg = String::with_capacity(2048);
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{IMAGE_SIZE}" height="{IMAGE_SIZE}" viewBox="0 0 {IMAGE_SIZE} {IMAGE_SIZE}">"#
    );
    let _ = writeln!(
        svg,
        r#"<circle cx="{X_CENTER}" cy="{Y_CENTER}" r="{CLOCK_RADIUS}" {} {} stroke-width="{OUTLINE_WIDTH}"/>"#,
        paint_attr("fill", &config.face_color),
        paint_attr("stroke", &config.outline_color),
    );
    let _ = writeln!(
        svg,
        r#"<circle cx="{X_CENTER}" cy="{Y_CENTER}" r="{HUB_RADIUS}" fill="none" {} stroke-width="{HUB_WIDTH}"/>"#,
        paint_attr("stroke", &config.hand_color),
    );
    for (x, y) in tick_marks() {
        let _ = writeln!(
            svg,
            r#"<circle cx="{x}" cy="{y}" r="{TICK_RADIUS}" {}/>"#,
            paint_attr("fill", &config.outline_color),
        );
    }

    let hands = [
        hand_endpoint(hour_position(time), HOUR_HAND_LENGTH),
        hand_endpoint(minute_position(time), MINUTE_HAND_LENGTH),
    ];
    for (x, y) in hands {
        let _ = writeln!(
            svg,
            r#"<line x1="{X_CENTER}" y1="{Y_CENTER}" x2="{x}" y2="{y}" {} stroke-width="{HAND_WIDTH}"/>"#,
            paint_attr("stroke", &config.hand_color),
        );
    }
    svg.push_str("</svg>\n");
    svg
}

// The paint is always spelled out: an absent `fill` would fall back to black.
fn paint_attr(property: &str, color: &ClockColor) -> String {
    match color.svg_paint() {
        None => format!(r#"{property}="none""#),
        Some((hex, opacity)) => {
            format!(r#"{property}="{hex}" {property}-opacity="{opacity}""#)
        }
    }
}

/// Scales the 100-unit document onto a `size`×`size` pixmap.
pub fn rasterize(document: &str, size: u32, options: &usvg::Options) -> Result<Pixmap> {
    let tree = usvg::Tree::from_str(document, options).context("parse clock svg")?;
    let mut pixmap = Pixmap::new(size, size).context("create clock pixmap")?;
    let tree_size = tree.size();
    let scale_x = size as f32 / tree_size.width();
    let scale_y = size as f32 / tree_size.height();
    let transform = Transform::from_scale(scale_x, scale_y);
    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, transform, &mut pixmap_mut);
    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(hour: u32, minute: u32) -> ClockTime {
        ClockTime { hour, minute }
    }

    fn transparent_config() -> ClockConfig {
        ClockConfig {
            size: 100,
            hand_color: ClockColor::None,
            outline_color: ClockColor::None,
            face_color: ClockColor::None,
        }
    }

    #[test]
    fn hour_hand_advances_with_minutes() {
        assert_eq!(hour_position(time(3, 0)), 15.0);
        assert_eq!(hour_position(time(0, 30)), 2.5);
        assert_eq!(hour_position(time(15, 0)), 15.0);
        assert_eq!(hour_position(time(12, 0)), 60.0);
        assert_eq!(minute_position(time(7, 42)), 42.0);
    }

    #[test]
    fn three_oclock_hands() {
        let t = time(3, 0);
        assert_eq!(hand_endpoint(hour_position(t), HOUR_HAND_LENGTH), (71, 50));
        assert_eq!(hand_endpoint(minute_position(t), MINUTE_HAND_LENGTH), (50, 19));

        let document = clock_document(t, &ClockConfig::default());
        assert!(document.contains(r#"x2="71" y2="50""#));
        assert!(document.contains(r#"x2="50" y2="19""#));
    }

    #[test]
    fn half_past_midnight_hands() {
        let t = time(0, 30);
        assert_eq!(hand_endpoint(hour_position(t), HOUR_HAND_LENGTH), (55, 30));
        assert_eq!(hand_endpoint(minute_position(t), MINUTE_HAND_LENGTH), (50, 81));
    }

    #[test]
    fn document_lists_every_shape() {
        let document = clock_document(time(10, 10), &ClockConfig::default());
        assert_eq!(document.matches("<circle").count(), 14);
        assert_eq!(document.matches("<line").count(), 2);
        assert!(document.contains(r##"fill="#ffffff""##));
    }

    #[test]
    fn none_is_written_not_omitted() {
        let document = clock_document(time(4, 20), &transparent_config());
        assert!(!document.contains('#'));
        assert_eq!(document.matches(r#"stroke="none""#).count(), 4);
        assert_eq!(document.matches(r#"fill="none""#).count(), 14);
    }

    #[test]
    fn transparent_hands_show_the_face() {
        let mut config = transparent_config();
        config.face_color = "#ffffff".parse().unwrap();
        config.outline_color = "#000000".parse().unwrap();
        let mut renderer = SvgRenderer::default();
        let bare = renderer.render(time(6, 15), &config, 100).unwrap();

        // At 6:15 the minute hand covers (60..81, 50); (30, 50) is plain face.
        let face = bare.pixel(30, 50).unwrap();
        assert_eq!((face.red(), face.green(), face.blue(), face.alpha()), (255, 255, 255, 255));
        for x in [60, 70, 78] {
            assert_eq!(bare.pixel(x, 50).unwrap(), face, "hand pixel at ({x}, 50)");
        }

        config.hand_color = "#000000".parse().unwrap();
        let drawn = renderer.render(time(6, 15), &config, 100).unwrap();
        assert_ne!(drawn.pixel(70, 50).unwrap(), face);
    }

    #[test]
    fn visible_hands_cover_their_path() {
        let mut config = transparent_config();
        config.hand_color = "#000000".parse().unwrap();
        let mut renderer = SvgRenderer::default();
        let pixmap = renderer.render(time(6, 15), &config, 100).unwrap();
        // Minute hand runs from the center towards three o'clock.
        let pixel = pixmap.pixel(70, 50).unwrap();
        assert_eq!(pixel.alpha(), 255);
        // Nothing is painted in the empty upper-left quadrant.
        assert_eq!(pixmap.pixel(25, 25).unwrap().alpha(), 0);
    }

    #[test]
    fn rasterizes_at_requested_size() {
        let mut renderer = SvgRenderer::default();
        for size in [22, 37, 100] {
            let pixmap = renderer
                .render(time(9, 45), &ClockConfig::default(), size)
                .unwrap();
            assert_eq!((pixmap.width(), pixmap.height()), (size, size));
        }
    }
}
