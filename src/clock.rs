use anyhow::{Context, Result};
use chrono::Timelike;
use tiny_skia::Pixmap;

use crate::render::Renderer;
use crate::settings::{Settings, SettingsStore};
use crate::types::{ClockConfig, ClockTime, PanelConstraint};

/// Wall-clock reading, swappable so redraw decisions can be driven by hand.
pub trait TimeSource {
    fn now(&self) -> ClockTime;
}

pub struct LocalTime;

impl TimeSource for LocalTime {
    fn now(&self) -> ClockTime {
        let now = chrono::Local::now();
        ClockTime {
            hour: now.hour(),
            minute: now.minute(),
        }
    }
}

/// Where finished frames go. Each frame replaces the previous one.
pub trait DisplaySurface {
    /// Device pixels per logical pixel; frames are rasterized at this density.
    fn scale(&self) -> u32 {
        1
    }

    fn present(&mut self, frame: &Pixmap) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockState {
    Idle,
    Redrawing,
}

pub struct Clock<S, R, T> {
    settings: Settings<S>,
    renderer: R,
    time: T,
    config: ClockConfig,
    constraint: PanelConstraint,
    last_minute: Option<u32>,
    force_update: bool,
    state: ClockState,
}

impl<S: SettingsStore, R: Renderer, T: TimeSource> Clock<S, R, T> {
    pub fn new(mut settings: Settings<S>, renderer: R, time: T) -> Self {
        let config = settings.load();
        Self {
            settings,
            renderer,
            time,
            config,
            constraint: PanelConstraint::default(),
            last_minute: None,
            force_update: true,
            state: ClockState::Idle,
        }
    }

    pub fn config(&self) -> &ClockConfig {
        &self.config
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    #[cfg(test)]
    fn renderer(&self) -> &R {
        &self.renderer
    }

    #[cfg(test)]
    fn settings(&self) -> &Settings<S> {
        &self.settings
    }

    /// Pixel size of the next frame: the user's size, capped by the panel.
    pub fn render_size(&self) -> u32 {
        self.config.size.min(self.constraint.max_size)
    }

    /// Polls the clock and draws a frame on minute rollover or when forced.
    /// Returns whether a frame was pushed.
    pub fn update_time(&mut self, display: &mut dyn DisplaySurface) -> Result<bool> {
        let now = self.time.now();
        if !self.force_update && self.last_minute == Some(now.minute) {
            return Ok(false);
        }

        self.state = ClockState::Redrawing;
        let drawn = self.draw(now, display);
        self.state = ClockState::Idle;
        drawn?;

        self.last_minute = Some(now.minute);
        self.force_update = false;
        Ok(true)
    }

    fn draw(&mut self, now: ClockTime, display: &mut dyn DisplaySurface) -> Result<()> {
        let size = self.render_size() * display.scale().max(1);
        let frame = self
            .renderer
            .render(now, &self.config, size)
            .with_context(|| format!("render {:02}:{:02}", now.hour, now.minute))?;
        display.present(&frame).context("present clock frame")?;
        log::debug!("drew {:02}:{:02} at {size}px", now.hour, now.minute);
        Ok(())
    }

    /// Re-reads the stored preferences; the next poll redraws regardless of the minute.
    pub fn settings_changed(&mut self) {
        self.config = self.settings.load();
        self.force_update = true;
        log::info!(
            "settings changed: size {} (drawn at {}), hands {}, outline {}, face {}",
            self.config.size,
            self.render_size(),
            self.config.hand_color,
            self.config.outline_color,
            self.config.face_color
        );
    }

    /// Drops the current frame, e.g. after the output scale changed.
    pub fn invalidate(&mut self) {
        self.force_update = true;
    }

    pub fn panel_resized(&mut self, constraint: PanelConstraint) {
        self.constraint = constraint;
        if let Err(err) = self.settings.ensure_min_size() {
            log::warn!("could not correct clock size: {err:#}");
        }
        self.config = self.settings.validate_and_fix();
        self.force_update = true;
        log::info!(
            "panel allows {}px, drawing at {}px",
            constraint.max_size,
            self.render_size()
        );
    }
}
