//! Screen ↔ canvas coordinate mapping.
//!
//! `x, y` is the screen-pixel offset of the canvas origin and `scale` the
//! zoom factor, so `screen = canvas * scale + offset`. The viewport lives for
//! one editing session and is never persisted.

use crate::model::Point;
use serde::{Deserialize, Serialize};

pub const MIN_SCALE: f32 = 0.1;
pub const MAX_SCALE: f32 = 5.0;
/// Scale change per keyboard/button zoom step.
pub const ZOOM_STEP: f32 = 0.1;
/// Scale change per unit of wheel `delta_y` with ctrl/cmd held.
pub const ZOOM_SENSITIVITY: f32 = 0.001;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
        }
    }
}

impl Viewport {
    pub fn screen_to_canvas(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.x) / self.scale,
            y: (screen.y - self.y) / self.scale,
        }
    }

    pub fn canvas_to_screen(&self, canvas: Point) -> Point {
        Point {
            x: canvas.x * self.scale + self.x,
            y: canvas.y * self.scale + self.y,
        }
    }

    /// Convert a screen-pixel distance to canvas units.
    pub fn screen_delta_to_canvas(&self, dx: f32, dy: f32) -> (f32, f32) {
        (dx / self.scale, dy / self.scale)
    }

    /// Pan by raw screen pixels; independent of scale.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    /// Set the scale, clamped to `[MIN_SCALE, MAX_SCALE]`.
    /// Non-finite values are ignored.
    pub fn set_scale(&mut self, scale: f32) {
        if scale.is_finite() {
            self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
        }
    }

    /// Ctrl/cmd + wheel zoom. Scrolling down (`delta_y > 0`) zooms out.
    pub fn zoom_by_wheel(&mut self, delta_y: f32, sensitivity: f32) {
        self.set_scale(self.scale - delta_y * sensitivity);
    }

    pub fn zoom_in(&mut self) {
        self.set_scale(self.scale + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_scale(self.scale - ZOOM_STEP);
    }

    pub fn reset_zoom(&mut self) {
        self.scale = 1.0;
    }

    /// Zoom level as shown in the zoom pill, e.g. `100`.
    pub fn zoom_percent(&self) -> u32 {
        (self.scale * 100.0).round() as u32
    }

    /// Canvas point currently under the centre of a `width × height` screen.
    pub fn center_in_canvas(&self, width: f32, height: f32) -> Point {
        self.screen_to_canvas(Point::new(width / 2.0, height / 2.0))
    }
}
