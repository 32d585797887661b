//! # Retained Visual Managers
//!
//! The retained backend keeps one persistent drawable per logical element
//! (node body, label, port, edge path, marker, handle) inside a host-owned
//! scene container, and mutates only what changed instead of redrawing
//! every frame.
//!
//! Ownership is recorded in dictionaries keyed by element id. Removal is
//! atomic: the dictionary entry and the container child go together, so a
//! visual can never leak with no remaining owner record.
//!
//! Visual coordinates are **canvas space**; the host's scene graph applies
//! the viewport transform when compositing.

use std::collections::{HashMap, HashSet};

use glam::{Vec2, Vec4};
use tracing::trace;

use crate::config::CanvasConfig;
use crate::geometry::GraphRenderModel;
use crate::math::Rect;
use crate::model::{
    Edge, EdgeId, EdgeStyle, GlowMode, GraphState, MarkerKind, Node, NodeData, NodeId,
    PortDirection,
};
use crate::painter::build_edge_geometry;
use crate::path::{self, PathGeometry};
use crate::registry::RendererRegistry;
use crate::theme::Theme;

/// Handle to a drawable owned by the host's scene container.
pub type VisualId = u64;

/// Platform drop-shadow parameters for `GlowMode::DropShadow`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowSpec {
    pub color: Vec4,
    pub radius: f32,
}

/// Description of one persistent drawable, in canvas space.
#[derive(Clone, Debug, PartialEq)]
pub enum VisualSpec {
    Rect {
        rect: Rect,
        fill: Vec4,
        corner_radius: f32,
        stroke_color: Option<Vec4>,
        stroke_width: f32,
        stroke_dash: Option<Vec<f32>>,
    },
    Path {
        path: PathGeometry,
        stroke_color: Vec4,
        stroke_width: f32,
        dash: Option<Vec<f32>>,
        fill_color: Option<Vec4>,
        shadow: Option<ShadowSpec>,
    },
    Text {
        pos: Vec2,
        text: String,
        color: Vec4,
        size: f32,
    },
}

/// The scene-graph primitive the host implements: add/update/remove
/// drawables by id. Add order is z-order (later = on top).
pub trait SceneContainer {
    fn add(&mut self, spec: VisualSpec) -> VisualId;
    fn update(&mut self, id: VisualId, spec: VisualSpec);
    fn remove(&mut self, id: VisualId);
}

/// Persistent visuals for one node.
#[derive(Debug)]
struct NodeVisual {
    body: VisualId,
    label: Option<VisualId>,
    ports: Vec<VisualId>,
}

/// Manager for node visuals, keyed by node id.
#[derive(Default)]
pub struct NodeVisualManager {
    visuals: HashMap<NodeId, NodeVisual>,
    prev_selection: HashSet<NodeId>,
}

impl NodeVisualManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn body_spec<T: NodeData>(
        node: &Node<T>,
        model: &GraphRenderModel<'_>,
        config: &CanvasConfig,
        theme: &Theme,
    ) -> VisualSpec {
        let bounds = model.node_bounds(node);
        let style = node.style.as_ref().unwrap_or(&theme.node);
        let group = node.is_group();
        let (stroke_color, stroke_width, stroke_dash) = if node.is_selected() {
            (theme.node_selected_border, 2.0, None)
        } else if group && !node.is_collapsed() {
            (theme.group_border, 1.0, Some(vec![6.0, 4.0]))
        } else {
            (style.border, 1.0, None)
        };
        VisualSpec::Rect {
            rect: bounds,
            fill: if group {
                if node.is_collapsed() {
                    theme.group_header
                } else {
                    theme.group_fill
                }
            } else {
                style.fill
            },
            corner_radius: if group {
                config.group_corner_radius
            } else {
                config.node_corner_radius
            },
            stroke_color: Some(stroke_color),
            stroke_width,
            stroke_dash,
        }
    }

    fn label_spec<T: NodeData>(
        node: &Node<T>,
        model: &GraphRenderModel<'_>,
        config: &CanvasConfig,
        theme: &Theme,
    ) -> Option<VisualSpec> {
        if node.label.is_empty() {
            return None;
        }
        let bounds = model.node_bounds(node);
        let style = node.style.as_ref().unwrap_or(&theme.node);
        let pos = if node.is_group() {
            model.group_header_rect(bounds).center()
        } else {
            bounds.center()
        };
        Some(VisualSpec::Text {
            pos,
            text: node.label.clone(),
            color: if node.is_group() {
                theme.group_text
            } else {
                style.text
            },
            size: config.label_font_size,
        })
    }

    fn port_specs<T: NodeData>(
        node: &Node<T>,
        model: &GraphRenderModel<'_>,
        config: &CanvasConfig,
        theme: &Theme,
    ) -> Vec<VisualSpec> {
        let half = Vec2::splat(config.port_size * 0.5);
        [PortDirection::Input, PortDirection::Output]
            .into_iter()
            .flat_map(|direction| model.port_positions(node, direction))
            .map(|center| VisualSpec::Rect {
                rect: Rect::new(center - half, half * 2.0),
                fill: theme.port_fill,
                corner_radius: config.port_size * 0.5,
                stroke_color: Some(theme.port_border),
                stroke_width: 1.0,
                stroke_dash: None,
            })
            .collect()
    }

    /// Creates or refreshes the visuals for one node.
    pub fn update_node<T: NodeData>(
        &mut self,
        node: &Node<T>,
        model: &GraphRenderModel<'_>,
        config: &CanvasConfig,
        theme: &Theme,
        scene: &mut dyn SceneContainer,
    ) {
        let body = Self::body_spec(node, model, config, theme);
        let label = Self::label_spec(node, model, config, theme);
        let ports = Self::port_specs(node, model, config, theme);

        match self.visuals.get_mut(&node.id) {
            Some(visual) => {
                scene.update(visual.body, body);
                match (visual.label, label) {
                    (Some(id), Some(spec)) => scene.update(id, spec),
                    (Some(id), None) => {
                        scene.remove(id);
                        visual.label = None;
                    }
                    (None, Some(spec)) => visual.label = Some(scene.add(spec)),
                    (None, None) => {}
                }
                // Port count changes are rare; rebuild the port visuals
                // wholesale when they happen.
                if visual.ports.len() != ports.len() {
                    for &id in &visual.ports {
                        scene.remove(id);
                    }
                    visual.ports = ports.into_iter().map(|spec| scene.add(spec)).collect();
                } else {
                    for (&id, spec) in visual.ports.iter().zip(ports) {
                        scene.update(id, spec);
                    }
                }
            }
            None => {
                let visual = NodeVisual {
                    body: scene.add(body),
                    label: label.map(|spec| scene.add(spec)),
                    ports: ports.into_iter().map(|spec| scene.add(spec)).collect(),
                };
                self.visuals.insert(node.id, visual);
            }
        }
    }

    /// Removes a node's visuals: dictionary entry and container children
    /// in one step.
    pub fn remove_node(&mut self, node_id: NodeId, scene: &mut dyn SceneContainer) {
        if let Some(visual) = self.visuals.remove(&node_id) {
            scene.remove(visual.body);
            if let Some(label) = visual.label {
                scene.remove(label);
            }
            for port in visual.ports {
                scene.remove(port);
            }
        }
        self.prev_selection.remove(&node_id);
    }

    /// Full sync: add missing, update present, drop removed/invisible.
    pub fn sync<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        model: &GraphRenderModel<'_>,
        config: &CanvasConfig,
        theme: &Theme,
        scene: &mut dyn SceneContainer,
    ) {
        let mut alive: HashSet<NodeId> = HashSet::new();
        for node in graph.nodes_in_draw_order() {
            if !model.is_node_visible(graph, node) {
                continue;
            }
            alive.insert(node.id);
            self.update_node(node, model, config, theme, scene);
        }
        let gone: Vec<NodeId> = self
            .visuals
            .keys()
            .filter(|id| !alive.contains(id))
            .copied()
            .collect();
        for id in gone {
            self.remove_node(id, scene);
        }
        trace!(nodes = self.visuals.len(), "node visuals synced");
    }

    /// Selection refresh: diffs against the previous selection set and
    /// touches only the visuals whose selection state flipped.
    pub fn refresh_selection<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        model: &GraphRenderModel<'_>,
        config: &CanvasConfig,
        theme: &Theme,
        scene: &mut dyn SceneContainer,
    ) {
        let current: HashSet<NodeId> = graph
            .nodes
            .iter()
            .filter(|(_, n)| n.is_selected())
            .map(|(id, _)| id)
            .collect();
        for &id in current.symmetric_difference(&self.prev_selection) {
            if let (Some(node), Some(visual)) = (graph.nodes.get(id), self.visuals.get(&id)) {
                scene.update(visual.body, Self::body_spec(node, model, config, theme));
            }
        }
        self.prev_selection = current;
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.visuals.contains_key(&node_id)
    }

    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }
}

/// Persistent visuals for one edge.
#[derive(Debug)]
struct EdgeVisual {
    /// Glow underlay when `GlowMode::BackgroundPath` is active.
    glow: Option<VisualId>,
    path: VisualId,
    marker_start: Option<VisualId>,
    marker_end: Option<VisualId>,
    label: Option<VisualId>,
}

/// Manager for edge visuals, keyed by edge id.
#[derive(Default)]
pub struct EdgeVisualManager {
    visuals: HashMap<EdgeId, EdgeVisual>,
}

/// All specs for one edge, computed in one place so create and update
/// paths cannot drift apart.
struct EdgeSpecs {
    glow: Option<VisualSpec>,
    path: VisualSpec,
    marker_start: Option<VisualSpec>,
    marker_end: Option<VisualSpec>,
    label: Option<VisualSpec>,
}

impl EdgeVisualManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn build_specs<T: NodeData>(
        graph: &GraphState<T>,
        edge: &Edge,
        model: &GraphRenderModel<'_>,
        config: &CanvasConfig,
        theme: &Theme,
        registry: Option<&RendererRegistry>,
    ) -> Option<EdgeSpecs> {
        let points = model.edge_points(graph, edge)?;
        let geometry = build_edge_geometry(edge, &points, config, registry);
        if geometry.is_empty() {
            return None;
        }

        let default_style = EdgeStyle::default();
        let style = edge.style.as_ref().unwrap_or(&default_style);
        let color = if edge.is_selected() {
            theme.edge_selected
        } else if edge.style.is_some() {
            style.color
        } else {
            theme.edge
        };
        let color = Vec4::new(color.x, color.y, color.z, color.w * style.opacity.clamp(0.0, 1.0));
        let width = style.width * if edge.is_selected() { 1.5 } else { 1.0 };
        let dash = style.dash.intervals();

        // Glow: either an extra background path behind the edge (default —
        // it avoids a known compositing bug between platform shadows and
        // markers) or a platform drop-shadow on the edge path itself.
        let mut shadow = None;
        let glow = match &style.glow {
            Some(glow) if glow.mode == GlowMode::BackgroundPath => Some(VisualSpec::Path {
                path: geometry.clone(),
                stroke_color: glow.color,
                stroke_width: width + glow.radius * 2.0,
                dash: None,
                fill_color: None,
                shadow: None,
            }),
            Some(glow) => {
                shadow = Some(ShadowSpec {
                    color: glow.color,
                    radius: glow.radius,
                });
                None
            }
            None => None,
        };

        let flat = geometry.flatten(8);
        let marker_spec = |kind: MarkerKind, tip: Vec2, direction: Vec2| {
            path::build_marker(tip, direction, config.marker_size, kind).map(|marker| {
                VisualSpec::Path {
                    path: marker,
                    stroke_color: color,
                    stroke_width: style.width,
                    dash: None,
                    fill_color: (kind == MarkerKind::ArrowClosed).then_some(color),
                    shadow: None,
                }
            })
        };
        let (marker_start, marker_end) = if flat.len() >= 2 {
            (
                marker_spec(edge.marker_start, points[0], flat[0] - flat[1]),
                marker_spec(
                    edge.marker_end,
                    *points.last().unwrap(),
                    flat[flat.len() - 1] - flat[flat.len() - 2],
                ),
            )
        } else {
            (None, None)
        };

        let label = edge.label.as_ref().and_then(|label| {
            GraphRenderModel::edge_label_anchor(&flat, label).map(|pos| VisualSpec::Text {
                pos,
                text: label.text.clone(),
                color: theme.edge_label,
                size: config.label_font_size,
            })
        });

        Some(EdgeSpecs {
            glow,
            path: VisualSpec::Path {
                path: geometry,
                stroke_color: color,
                stroke_width: width,
                dash,
                fill_color: None,
                shadow,
            },
            marker_start,
            marker_end,
            label,
        })
    }

    /// Creates or refreshes the visuals for one edge. An edge whose
    /// endpoints vanished (or whose path degenerated) is removed.
    pub fn update_edge<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        edge: &Edge,
        model: &GraphRenderModel<'_>,
        config: &CanvasConfig,
        theme: &Theme,
        registry: Option<&RendererRegistry>,
        scene: &mut dyn SceneContainer,
    ) {
        if !model.is_edge_renderable(graph, edge) {
            self.remove_edge(edge.id, scene);
            return;
        }
        let Some(specs) = Self::build_specs(graph, edge, model, config, theme, registry) else {
            self.remove_edge(edge.id, scene);
            return;
        };

        let sync_optional =
            |scene: &mut dyn SceneContainer, slot: &mut Option<VisualId>, spec: Option<VisualSpec>| {
                match (slot.as_ref(), spec) {
                    (Some(&id), Some(spec)) => scene.update(id, spec),
                    (Some(&id), None) => {
                        scene.remove(id);
                        *slot = None;
                    }
                    (None, Some(spec)) => *slot = Some(scene.add(spec)),
                    (None, None) => {}
                }
            };

        match self.visuals.get_mut(&edge.id) {
            Some(visual) => {
                sync_optional(scene, &mut visual.glow, specs.glow);
                scene.update(visual.path, specs.path);
                sync_optional(scene, &mut visual.marker_start, specs.marker_start);
                sync_optional(scene, &mut visual.marker_end, specs.marker_end);
                sync_optional(scene, &mut visual.label, specs.label);
            }
            None => {
                // Glow added before the path so it composites behind.
                let glow = specs.glow.map(|spec| scene.add(spec));
                let path = scene.add(specs.path);
                let visual = EdgeVisual {
                    glow,
                    path,
                    marker_start: specs.marker_start.map(|spec| scene.add(spec)),
                    marker_end: specs.marker_end.map(|spec| scene.add(spec)),
                    label: specs.label.map(|spec| scene.add(spec)),
                };
                self.visuals.insert(edge.id, visual);
            }
        }
    }

    /// Removes an edge's visuals atomically.
    pub fn remove_edge(&mut self, edge_id: EdgeId, scene: &mut dyn SceneContainer) {
        if let Some(visual) = self.visuals.remove(&edge_id) {
            for id in [visual.glow, visual.marker_start, visual.marker_end, visual.label]
                .into_iter()
                .flatten()
            {
                scene.remove(id);
            }
            scene.remove(visual.path);
        }
    }

    /// Full sync over all edges.
    pub fn sync<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        model: &GraphRenderModel<'_>,
        config: &CanvasConfig,
        theme: &Theme,
        registry: Option<&RendererRegistry>,
        scene: &mut dyn SceneContainer,
    ) {
        let mut alive: HashSet<EdgeId> = HashSet::new();
        for (edge_id, edge) in &graph.edges {
            if model.is_edge_renderable(graph, edge) {
                alive.insert(edge_id);
            }
            self.update_edge(graph, edge, model, config, theme, registry, scene);
        }
        let gone: Vec<EdgeId> = self
            .visuals
            .keys()
            .filter(|id| !alive.contains(id))
            .copied()
            .collect();
        for id in gone {
            self.remove_edge(id, scene);
        }
        trace!(edges = self.visuals.len(), "edge visuals synced");
    }

    pub fn contains(&self, edge_id: EdgeId) -> bool {
        self.visuals.contains_key(&edge_id)
    }

    pub fn len(&self) -> usize {
        self.visuals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visuals.is_empty()
    }
}

/// Manager for the eight resize handles of selected resizable nodes.
#[derive(Default)]
pub struct ResizeHandleVisualManager {
    visuals: HashMap<NodeId, Vec<VisualId>>,
}

impl ResizeHandleVisualManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle_specs(bounds: Rect, config: &CanvasConfig, theme: &Theme) -> Vec<VisualSpec> {
        let half = Vec2::splat(config.resize_handle_size * 0.5);
        GraphRenderModel::resize_handle_positions(bounds)
            .map(|(_, center)| VisualSpec::Rect {
                rect: Rect::new(center - half, half * 2.0),
                fill: theme.handle_fill,
                corner_radius: 1.0,
                stroke_color: Some(theme.handle_border),
                stroke_width: 1.0,
                stroke_dash: None,
            })
            .collect()
    }

    /// Shows (or repositions) the handle ring for a node.
    pub fn update_node<T: NodeData>(
        &mut self,
        node: &Node<T>,
        model: &GraphRenderModel<'_>,
        config: &CanvasConfig,
        theme: &Theme,
        scene: &mut dyn SceneContainer,
    ) {
        let specs = Self::handle_specs(model.node_bounds(node), config, theme);
        match self.visuals.get_mut(&node.id) {
            Some(ids) => {
                for (&id, spec) in ids.iter().zip(specs) {
                    scene.update(id, spec);
                }
            }
            None => {
                let ids = specs.into_iter().map(|spec| scene.add(spec)).collect();
                self.visuals.insert(node.id, ids);
            }
        }
    }

    /// Hides the handle ring for a node.
    pub fn remove_node(&mut self, node_id: NodeId, scene: &mut dyn SceneContainer) {
        if let Some(ids) = self.visuals.remove(&node_id) {
            for id in ids {
                scene.remove(id);
            }
        }
    }

    /// Shows handles for exactly the selected+resizable+visible nodes.
    pub fn sync<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        model: &GraphRenderModel<'_>,
        config: &CanvasConfig,
        theme: &Theme,
        scene: &mut dyn SceneContainer,
    ) {
        let mut alive: HashSet<NodeId> = HashSet::new();
        for (id, node) in &graph.nodes {
            if node.is_selected()
                && node.flags.contains(crate::model::NodeFlags::RESIZABLE)
                && model.is_node_visible(graph, node)
            {
                alive.insert(id);
                self.update_node(node, model, config, theme, scene);
            }
        }
        let gone: Vec<NodeId> = self
            .visuals
            .keys()
            .filter(|id| !alive.contains(id))
            .copied()
            .collect();
        for id in gone {
            self.remove_node(id, scene);
        }
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.visuals.contains_key(&node_id)
    }
}
