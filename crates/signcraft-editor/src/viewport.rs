//! View transform and render scheduling.
//!
//! The viewport maps canvas space to screen space: `screen = canvas * zoom + pan`.
//! It never touches the scene; zooming and panning only change what the host
//! draws and how pointer positions are mapped back.

use signcraft_core::config::EditorConfig;
use signcraft_core::geometry::{Bounds, Size};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
    /// Screen size of the drawing area.
    pub size: Size,
    min_zoom: f32,
    max_zoom: f32,
    step: f32,
    fit_padding: f32,
}

impl Viewport {
    pub fn new(size: Size, config: &EditorConfig) -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
            size,
            min_zoom: config.zoom_min,
            max_zoom: config.zoom_max,
            step: config.zoom_step,
            fit_padding: config.fit_padding,
        }
    }

    pub fn clamp(&self, zoom: f32) -> f32 {
        zoom.clamp(self.min_zoom, self.max_zoom)
    }

    // ─── Coordinate mapping ──────────────────────────────────────────────

    pub fn screen_to_canvas(&self, sx: f32, sy: f32) -> (f32, f32) {
        ((sx - self.pan_x) / self.zoom, (sy - self.pan_y) / self.zoom)
    }

    pub fn canvas_to_screen(&self, cx: f32, cy: f32) -> (f32, f32) {
        (cx * self.zoom + self.pan_x, cy * self.zoom + self.pan_y)
    }

    // ─── Zoom ────────────────────────────────────────────────────────────

    /// Set zoom keeping the canvas point under screen `(sx, sy)` fixed.
    /// Returns the applied (clamped) zoom.
    pub fn zoom_to_point(&mut self, sx: f32, sy: f32, zoom: f32) -> f32 {
        let (cx, cy) = self.screen_to_canvas(sx, sy);
        self.zoom = self.clamp(zoom);
        self.pan_x = sx - cx * self.zoom;
        self.pan_y = sy - cy * self.zoom;
        self.zoom
    }

    /// Wheel zoom toward the cursor: `zoom * 0.999^deltaY`.
    pub fn wheel(&mut self, sx: f32, sy: f32, delta_y: f32) -> f32 {
        let factor = 0.999_f32.powf(delta_y);
        self.zoom_to_point(sx, sy, self.zoom * factor)
    }

    pub fn zoom_in(&mut self) -> f32 {
        let (cx, cy) = (self.size.width / 2.0, self.size.height / 2.0);
        self.zoom_to_point(cx, cy, self.zoom * self.step)
    }

    pub fn zoom_out(&mut self) -> f32 {
        let (cx, cy) = (self.size.width / 2.0, self.size.height / 2.0);
        self.zoom_to_point(cx, cy, self.zoom / self.step)
    }

    /// Back to 1:1 with no pan.
    pub fn reset(&mut self) {
        self.zoom = 1.0;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    /// Zoom so `content` fills the view with padding, centered.
    /// Empty or degenerate content leaves the view alone.
    pub fn fit_to_content(&mut self, content: Bounds) -> bool {
        if content.width <= 0.0 || content.height <= 0.0 || self.size.is_empty() {
            return false;
        }
        let zoom = (self.size.width * self.fit_padding / content.width)
            .min(self.size.height * self.fit_padding / content.height);
        self.zoom = self.clamp(zoom);
        let (bx, by) = content.center();
        self.pan_x = self.size.width / 2.0 - bx * self.zoom;
        self.pan_y = self.size.height / 2.0 - by * self.zoom;
        true
    }

    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.pan_x += dx;
        self.pan_y += dy;
    }
}

// ─── Render scheduling ───────────────────────────────────────────────────

/// Trailing-edge debouncer driven by the host clock (milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Debouncer {
    delay_ms: u64,
    deadline: Option<u64>,
}

impl Debouncer {
    pub fn new(delay_ms: u64) -> Self {
        Self {
            delay_ms,
            deadline: None,
        }
    }

    /// (Re)arm; each call pushes the deadline back.
    pub fn schedule(&mut self, now_ms: u64) {
        self.deadline = Some(now_ms + self.delay_ms);
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fires once when the deadline has passed.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.deadline {
            Some(d) if now_ms >= d => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
