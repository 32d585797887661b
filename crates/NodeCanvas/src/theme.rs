//! # Theme Resources
//!
//! The color set both renderers draw from. Colors are RGBA `Vec4`s in
//! `0.0..=1.0`, resolved by the host's styling layer; this crate treats
//! them as opaque values.
//!
//! Renderers cache values derived from the theme. The `generation` counter
//! is the cache key: the host bumps it whenever it swaps themes, and a
//! renderer rebuilds its cached styles when the generation it last saw
//! differs from the current one.

use glam::Vec4;
use serde::{Deserialize, Serialize};

/// Visual style for a node, also usable as a per-node override.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct NodeStyle {
    pub fill: Vec4,
    pub border: Vec4,
    pub text: Vec4,
}

impl Default for NodeStyle {
    fn default() -> Self {
        Self {
            fill: Vec4::new(0.15, 0.15, 0.15, 1.0),
            border: Vec4::new(0.5, 0.5, 0.5, 1.0),
            text: Vec4::new(1.0, 1.0, 1.0, 1.0),
        }
    }
}

/// Full theme: every color the core renders with.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Theme {
    pub background: Vec4,
    pub grid: Vec4,
    pub node: NodeStyle,
    pub node_selected_border: Vec4,
    pub group_fill: Vec4,
    pub group_border: Vec4,
    pub group_header: Vec4,
    pub group_text: Vec4,
    pub port_fill: Vec4,
    pub port_border: Vec4,
    pub edge: Vec4,
    pub edge_selected: Vec4,
    pub edge_label: Vec4,
    pub handle_fill: Vec4,
    pub handle_border: Vec4,
    /// Cache identity. Bump via [`Theme::touch`] after changing any color.
    #[serde(default)]
    pub generation: u64,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Vec4::new(0.1, 0.1, 0.1, 1.0),
            grid: Vec4::new(0.2, 0.2, 0.2, 1.0),
            node: NodeStyle::default(),
            node_selected_border: Vec4::new(0.95, 0.75, 0.2, 1.0),
            group_fill: Vec4::new(0.13, 0.13, 0.16, 0.6),
            group_border: Vec4::new(0.4, 0.4, 0.5, 1.0),
            group_header: Vec4::new(0.2, 0.2, 0.25, 1.0),
            group_text: Vec4::new(0.9, 0.9, 0.9, 1.0),
            port_fill: Vec4::new(0.7, 0.7, 0.7, 1.0),
            port_border: Vec4::new(0.0, 0.0, 0.0, 1.0),
            edge: Vec4::new(0.8, 0.8, 0.8, 1.0),
            edge_selected: Vec4::new(0.95, 0.75, 0.2, 1.0),
            edge_label: Vec4::new(0.85, 0.85, 0.85, 1.0),
            handle_fill: Vec4::new(1.0, 1.0, 1.0, 1.0),
            handle_border: Vec4::new(0.2, 0.2, 0.2, 1.0),
            generation: 0,
        }
    }
}

impl Theme {
    /// Marks the theme as changed so renderers drop their cached styles.
    pub fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }
}
