//! # Viewport System
//!
//! The "infinite canvas" mathematics: transforms between Canvas Space (the
//! graph's own logical coordinates) and Screen Space (pixels on the
//! rendering surface). The host application mutates the viewport from its
//! pan/zoom gestures; everything in this crate only reads it.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::math::Rect;

/// The smallest zoom the transform will report. Guards the division in
/// `screen_to_canvas` against a zero scale slipping in from the host.
pub const MIN_ZOOM: f32 = 0.01;

/// Camera state: how far the canvas is panned and how close we are looking.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Viewport {
    /// Scale factor. 1.0 = 100%, above 1.0 = zoomed in.
    pub zoom: f32,
    /// Pan translation in screen pixels.
    pub offset: Vec2,
    /// Size of the visible surface in pixels.
    pub size: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: Vec2::ZERO,
            size: Vec2::new(800.0, 600.0),
        }
    }
}

impl Viewport {
    pub fn new(zoom: f32, offset: Vec2, size: Vec2) -> Self {
        Self {
            zoom: zoom.max(MIN_ZOOM),
            offset,
            size,
        }
    }

    fn effective_zoom(&self) -> f32 {
        self.zoom.max(MIN_ZOOM)
    }

    /// Canvas -> Screen. `screen = canvas * zoom + offset`
    pub fn canvas_to_screen(&self, canvas_pos: Vec2) -> Vec2 {
        canvas_pos * self.effective_zoom() + self.offset
    }

    /// Screen -> Canvas. `canvas = (screen - offset) / zoom`
    pub fn screen_to_canvas(&self, screen_pos: Vec2) -> Vec2 {
        (screen_pos - self.offset) / self.effective_zoom()
    }

    /// Projects a canvas-space rect into screen space.
    pub fn rect_to_screen(&self, rect: Rect) -> Rect {
        Rect {
            min: self.canvas_to_screen(rect.min),
            max: self.canvas_to_screen(rect.max),
        }
    }

    /// The canvas-space region currently on screen.
    pub fn visible_canvas_rect(&self) -> Rect {
        Rect::from_corners(
            self.screen_to_canvas(Vec2::ZERO),
            self.screen_to_canvas(self.size),
        )
    }

    /// The screen-space rect `[0,0] x [W,H]` used for culling tests.
    pub fn screen_rect(&self) -> Rect {
        Rect {
            min: Vec2::ZERO,
            max: self.size,
        }
    }
}
