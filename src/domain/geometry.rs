// Canvas geometry - zoom mapping, size bounds and drag delta correction
use serde::{Deserialize, Serialize};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 1.0;
pub const DEFAULT_ZOOM: f64 = 1.0;

pub const MIN_DISPLAY_PERCENT: i32 = 10;
pub const MAX_DISPLAY_PERCENT: i32 = 100;
pub const DISPLAY_STEP: i32 = 10;

pub const MIN_CARD_WIDTH: f64 = 380.0;
pub const MIN_CARD_HEIGHT: f64 = 270.0;
pub const MAX_CARD_WIDTH: f64 = 2000.0;
pub const MAX_CARD_HEIGHT: f64 = 2000.0;

/// Offset at which freshly cloned or transplanted cards are placed.
pub const SPAWN_POSITION: Position = Position { x: 50.0, y: 50.0 };

/// Top-left corner in unscaled dashboard units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Moves by a screen-space delta observed while the canvas is scaled by `zoom`.
    pub fn offset_by(self, delta: ScreenDelta, zoom: f64) -> Self {
        let (dx, dy) = scale_delta(delta, zoom);
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn clamped(self) -> Self {
        Self {
            width: clamp_finite(self.width, MIN_CARD_WIDTH, MAX_CARD_WIDTH),
            height: clamp_finite(self.height, MIN_CARD_HEIGHT, MAX_CARD_HEIGHT),
        }
    }
}

/// Pointer movement in screen pixels, as reported by the rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenDelta {
    pub dx: f64,
    pub dy: f64,
}

impl ScreenDelta {
    #[cfg(test)]
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }
}

pub fn clamp_zoom(zoom: f64) -> f64 {
    clamp_finite(zoom, MIN_ZOOM, MAX_ZOOM)
}

/// Maps a zoom factor in [0.5, 1.0] to the percent shown next to the zoom controls.
pub fn zoom_to_display_percent(zoom: f64) -> i32 {
    let percent = ((clamp_zoom(zoom) - MIN_ZOOM) / (MAX_ZOOM - MIN_ZOOM)) * 90.0 + 10.0;
    (percent.round() as i32).clamp(MIN_DISPLAY_PERCENT, MAX_DISPLAY_PERCENT)
}

pub fn display_percent_to_zoom(percent: i32) -> f64 {
    let percent = percent.clamp(MIN_DISPLAY_PERCENT, MAX_DISPLAY_PERCENT);
    ((percent - MIN_DISPLAY_PERCENT) as f64 / 90.0) * (MAX_ZOOM - MIN_ZOOM) + MIN_ZOOM
}

/// Clamps and rounds a zoom factor onto the nearest 10-point display step.
pub fn snap_zoom(zoom: f64) -> f64 {
    let percent = zoom_to_display_percent(zoom);
    let steps = (f64::from(percent) / f64::from(DISPLAY_STEP)).round() as i32;
    display_percent_to_zoom((steps * DISPLAY_STEP).clamp(MIN_DISPLAY_PERCENT, MAX_DISPLAY_PERCENT))
}

pub fn zoom_in(zoom: f64) -> f64 {
    step_zoom(zoom, DISPLAY_STEP)
}

pub fn zoom_out(zoom: f64) -> f64 {
    step_zoom(zoom, -DISPLAY_STEP)
}

fn step_zoom(zoom: f64, step: i32) -> f64 {
    let current = zoom_to_display_percent(zoom);
    let next = (current + step).clamp(MIN_DISPLAY_PERCENT, MAX_DISPLAY_PERCENT);
    display_percent_to_zoom(next)
}

/// The canvas is scaled with its origin at (0,0), so screen deltas shrink by `zoom`.
pub fn scale_delta(delta: ScreenDelta, zoom: f64) -> (f64, f64) {
    let zoom = clamp_zoom(zoom);
    (delta.dx / zoom, delta.dy / zoom)
}

fn clamp_finite(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.clamp(min, max)
}
