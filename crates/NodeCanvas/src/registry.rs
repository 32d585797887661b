//! # Renderer Registry
//!
//! Runtime dispatch from a node's type tag (the string returned by
//! `NodeData::node_type()`) to a custom renderer object. The registry is
//! consulted during geometry queries (preferred size) and during drawing
//! (direct-draw delegate); a lookup miss means the default rendering path.

use std::collections::HashMap;

use glam::Vec2;

use crate::error::CanvasError;
use crate::math::Rect;
use crate::model::EdgeKind;
use crate::path::PathGeometry;
use crate::render::{LodFlags, RenderList};
use crate::theme::NodeStyle;

/// Everything a custom node renderer needs to draw one node directly.
pub struct NodeDrawContext<'a> {
    /// Node bounds projected to screen space.
    pub screen_bounds: Rect,
    /// Current viewport zoom.
    pub zoom: f32,
    pub selected: bool,
    pub label: &'a str,
    /// Style already resolved override-then-theme.
    pub style: &'a NodeStyle,
    pub lod: LodFlags,
    /// Screen centers of input ports, in port order.
    pub input_ports: &'a [Vec2],
    /// Screen centers of output ports, in port order.
    pub output_ports: &'a [Vec2],
}

/// Capability interface for per-type node rendering.
///
/// All methods have defaults, so a renderer implements only what it needs:
/// a size-only renderer overrides `preferred_size`, a fully custom one also
/// overrides `draw_direct`.
pub trait NodeRenderer: Send + Sync {
    /// Preferred canvas-space size for nodes of this type, when the node
    /// carries no explicit size.
    fn preferred_size(&self) -> Option<Vec2> {
        None
    }

    /// Direct-drawing delegate. Emit commands for the node (box, label,
    /// ports) and return `true`, or return `false` to get the default
    /// rounded-rectangle rendering.
    fn draw_direct(&self, ctx: &NodeDrawContext<'_>, out: &mut RenderList) -> bool {
        let _ = (ctx, out);
        false
    }
}

/// Capability interface for per-edge path construction.
pub trait EdgeRenderer: Send + Sync {
    /// Replace the default path for an edge. Return `None` to keep the
    /// built-in shape for `kind`.
    fn build_path(&self, points: &[Vec2], kind: EdgeKind) -> Option<PathGeometry>;
}

/// Type-tag keyed registry of custom renderers.
#[derive(Default)]
pub struct RendererRegistry {
    nodes: HashMap<String, Box<dyn NodeRenderer>>,
    edges: HashMap<String, Box<dyn EdgeRenderer>>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node renderer under a type tag, replacing any previous
    /// registration for that tag.
    pub fn register_node(
        &mut self,
        type_tag: impl Into<String>,
        renderer: Box<dyn NodeRenderer>,
    ) -> Result<(), CanvasError> {
        let tag = type_tag.into();
        if tag.is_empty() {
            return Err(CanvasError::EmptyTypeTag);
        }
        self.nodes.insert(tag, renderer);
        Ok(())
    }

    /// Registers an edge renderer under a tag (see `Edge::renderer`).
    pub fn register_edge(
        &mut self,
        tag: impl Into<String>,
        renderer: Box<dyn EdgeRenderer>,
    ) -> Result<(), CanvasError> {
        let tag = tag.into();
        if tag.is_empty() {
            return Err(CanvasError::EmptyTypeTag);
        }
        self.edges.insert(tag, renderer);
        Ok(())
    }

    pub fn node_renderer(&self, type_tag: &str) -> Option<&dyn NodeRenderer> {
        self.nodes.get(type_tag).map(|r| r.as_ref())
    }

    pub fn edge_renderer(&self, tag: &str) -> Option<&dyn EdgeRenderer> {
        self.edges.get(tag).map(|r| r.as_ref())
    }

    /// Preferred size for a type tag, if a renderer supplies one.
    pub fn preferred_size(&self, type_tag: &str) -> Option<Vec2> {
        self.nodes.get(type_tag).and_then(|r| r.preferred_size())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Vec2);
    impl NodeRenderer for Fixed {
        fn preferred_size(&self) -> Option<Vec2> {
            Some(self.0)
        }
    }

    #[test]
    fn lookup_hits_and_misses() {
        let mut registry = RendererRegistry::new();
        registry
            .register_node("Math.Add", Box::new(Fixed(Vec2::new(120.0, 60.0))))
            .unwrap();
        assert_eq!(
            registry.preferred_size("Math.Add"),
            Some(Vec2::new(120.0, 60.0))
        );
        assert_eq!(registry.preferred_size("Unknown"), None);
    }

    #[test]
    fn empty_tag_is_rejected() {
        let mut registry = RendererRegistry::new();
        let err = registry.register_node("", Box::new(Fixed(Vec2::ONE)));
        assert!(err.is_err());
    }
}
