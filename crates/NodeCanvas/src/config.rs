//! # Configuration
//!
//! Flat settings struct consumed by the geometry model and both renderers.
//! All values are named numeric constants with sensible defaults; the host
//! loads/edits them however it likes (the struct is serde-friendly).

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::CanvasError;

/// Zoom thresholds below which detail is suppressed.
///
/// Each threshold compares against the viewport zoom: below `ports` the
/// port dots disappear, below `labels` text disappears, below `simplified`
/// nodes render as plain boxes without chrome.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct LodThresholds {
    pub ports: f32,
    pub labels: f32,
    pub simplified: f32,
    /// Below this zoom the background grid is skipped entirely.
    pub grid: f32,
}

impl Default for LodThresholds {
    fn default() -> Self {
        Self {
            ports: 0.4,
            labels: 0.3,
            simplified: 0.5,
            grid: 0.15,
        }
    }
}

/// Configuration parameters for the canvas core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CanvasConfig {
    /// Fallback node size when neither the node nor its type renderer
    /// supplies one.
    pub default_node_size: Vec2,
    /// Minimum size of an expanded group.
    pub group_min_size: Vec2,
    /// Height of a group's header strip; also the full height of a
    /// collapsed group.
    pub group_header_height: f32,
    /// Side length of the collapse button square inside the group header.
    pub group_collapse_button_size: f32,
    /// Diameter of a port dot in canvas units.
    pub port_size: f32,
    /// Hit radius around a port center in canvas units.
    pub port_hit_radius: f32,
    /// Spacing of the background grid in canvas units.
    pub grid_spacing: f32,
    /// Half-width of the clickable band around an edge, canvas units.
    pub edge_hit_width: f32,
    /// Extra screen-pixel margin added around an element's screen bounds
    /// before the viewport intersection test.
    pub cull_buffer: f32,
    /// Corner radius of regular nodes, canvas units.
    pub node_corner_radius: f32,
    /// Corner radius of group bodies, canvas units.
    pub group_corner_radius: f32,
    /// Side length of a resize handle square, canvas units.
    pub resize_handle_size: f32,
    /// Extra click tolerance around a resize handle, canvas units.
    pub resize_handle_tolerance: f32,
    /// Radius of an edge-endpoint handle for selected edges, canvas units.
    pub edge_endpoint_handle_radius: f32,
    /// Requested corner radius for smooth-step edges, canvas units.
    pub smooth_step_radius: f32,
    /// Length of arrow markers, canvas units.
    pub marker_size: f32,
    /// Font size used for node and edge labels at zoom 1.0.
    pub label_font_size: f32,
    /// Nodes whose smaller screen dimension falls below this pixel count
    /// get their clickable area shrunk toward the center.
    pub tiny_node_px: f32,
    /// Level-of-detail thresholds.
    #[serde(default)]
    pub lod: LodThresholds,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            default_node_size: Vec2::new(150.0, 80.0),
            group_min_size: Vec2::new(200.0, 120.0),
            group_header_height: 28.0,
            group_collapse_button_size: 16.0,
            port_size: 10.0,
            port_hit_radius: 8.0,
            grid_spacing: 100.0,
            edge_hit_width: 6.0,
            cull_buffer: 12.0,
            node_corner_radius: 5.0,
            group_corner_radius: 8.0,
            resize_handle_size: 8.0,
            resize_handle_tolerance: 3.0,
            edge_endpoint_handle_radius: 6.0,
            smooth_step_radius: 8.0,
            marker_size: 10.0,
            label_font_size: 14.0,
            tiny_node_px: 30.0,
            lod: LodThresholds::default(),
        }
    }
}

impl CanvasConfig {
    /// Sanity-checks the fields that must be strictly positive.
    ///
    /// Called by the service constructor; a bad config is a programming
    /// error on the host side and fails fast.
    pub fn validate(&self) -> Result<(), CanvasError> {
        if self.default_node_size.x <= 0.0 || self.default_node_size.y <= 0.0 {
            return Err(CanvasError::InvalidConfig("default_node_size must be positive"));
        }
        if self.group_min_size.x <= 0.0 || self.group_min_size.y <= 0.0 {
            return Err(CanvasError::InvalidConfig("group_min_size must be positive"));
        }
        if self.group_header_height <= 0.0 {
            return Err(CanvasError::InvalidConfig("group_header_height must be positive"));
        }
        if self.port_hit_radius <= 0.0 {
            return Err(CanvasError::InvalidConfig("port_hit_radius must be positive"));
        }
        if self.edge_hit_width <= 0.0 {
            return Err(CanvasError::InvalidConfig("edge_hit_width must be positive"));
        }
        if self.grid_spacing <= 0.0 {
            return Err(CanvasError::InvalidConfig("grid_spacing must be positive"));
        }
        Ok(())
    }
}
