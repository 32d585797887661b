//! # Display List
//!
//! The immediate-mode renderer does not draw pixels. It outputs a list of
//! `DrawCommand`s — the "instruction set" the host application interprets
//! with whatever graphics API it owns. Commands are emitted back-to-front;
//! rendering them in order produces correct z-stacking.

use glam::{Vec2, Vec4};
use serde::{Deserialize, Serialize};

use crate::config::LodThresholds;
use crate::path::PathGeometry;

/// A single drawing primitive, in **Screen Space** (pixels).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum DrawCommand {
    /// A filled rounded rectangle with an optional stroke.
    Rect {
        /// Top-left position in screen pixels.
        pos: Vec2,
        /// Size in screen pixels.
        size: Vec2,
        /// Fill color (RGBA, 0.0 - 1.0).
        color: Vec4,
        /// Corner radius in pixels.
        corner_radius: f32,
        /// Border stroke width in pixels.
        stroke_width: f32,
        /// Border stroke color.
        stroke_color: Option<Vec4>,
        /// Dash run lengths for the border stroke; `None` = solid.
        stroke_dash: Option<Vec<f32>>,
    },
    /// A straight line segment.
    Line {
        start: Vec2,
        end: Vec2,
        color: Vec4,
        width: f32,
    },
    /// An arbitrary stroked (and optionally filled) path. Used for edges
    /// and markers.
    Path {
        path: PathGeometry,
        stroke_color: Vec4,
        stroke_width: f32,
        /// On/off dash run lengths in pixels; `None` = solid.
        dash: Option<Vec<f32>>,
        /// Fill color for closed paths (closed arrow markers).
        fill_color: Option<Vec4>,
    },
    /// Text to be laid out and rendered by the consumer.
    Text {
        /// Anchor position in screen pixels (centered horizontally on the
        /// anchor, baseline handling is up to the host).
        pos: Vec2,
        text: String,
        color: Vec4,
        /// Font size in pixels (approximate).
        size: f32,
    },
}

/// A list of draw commands representing the current frame.
pub type RenderList = Vec<DrawCommand>;

/// Zoom-dependent detail suppression, resolved once per frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LodFlags {
    /// Draw port dots.
    pub ports: bool,
    /// Draw node/edge labels.
    pub labels: bool,
    /// Full node chrome (borders, styling) vs. plain boxes.
    pub detailed: bool,
    /// Draw the background grid.
    pub grid: bool,
}

impl LodFlags {
    pub fn at_zoom(zoom: f32, thresholds: &LodThresholds) -> Self {
        Self {
            ports: zoom >= thresholds.ports,
            labels: zoom >= thresholds.labels,
            detailed: zoom >= thresholds.simplified,
            grid: zoom >= thresholds.grid,
        }
    }

    /// Everything on; used by the retained backend, which leaves LOD to
    /// the host's scene graph.
    pub fn full() -> Self {
        Self {
            ports: true,
            labels: true,
            detailed: true,
            grid: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lod_thresholds_stack() {
        let t = LodThresholds::default();
        let far = LodFlags::at_zoom(0.1, &t);
        assert!(!far.ports && !far.labels && !far.detailed && !far.grid);
        let mid = LodFlags::at_zoom(0.35, &t);
        assert!(!mid.ports && mid.labels && !mid.detailed && mid.grid);
        let near = LodFlags::at_zoom(1.0, &t);
        assert!(near.ports && near.labels && near.detailed && near.grid);
    }
}
