//! # Geometry Model
//!
//! The single source of truth for canvas-space geometry: node bounds, port
//! positions, edge endpoints and control points, group chrome, resize
//! handles, visibility and hit predicates. Pure computation, no rendering
//! side effects — both the immediate-mode painter and the retained
//! managers call into this module so the two backends can never disagree
//! about where things are.

use std::collections::HashSet;

use glam::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CanvasConfig;
use crate::math::{self, Rect};
use crate::model::{Edge, GraphState, Node, NodeData, NodeFlags, PortDirection, PortSide};
use crate::registry::RendererRegistry;

/// Compass position of a resize handle on a node's bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandlePosition {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl HandlePosition {
    pub const ALL: [HandlePosition; 8] = [
        HandlePosition::TopLeft,
        HandlePosition::Top,
        HandlePosition::TopRight,
        HandlePosition::Right,
        HandlePosition::BottomRight,
        HandlePosition::Bottom,
        HandlePosition::BottomLeft,
        HandlePosition::Left,
    ];

    /// Handle center for a given bounds rect.
    pub fn center(self, bounds: Rect) -> Vec2 {
        let Rect { min, max } = bounds;
        let mid = bounds.center();
        match self {
            HandlePosition::TopLeft => min,
            HandlePosition::Top => Vec2::new(mid.x, min.y),
            HandlePosition::TopRight => Vec2::new(max.x, min.y),
            HandlePosition::Right => Vec2::new(max.x, mid.y),
            HandlePosition::BottomRight => max,
            HandlePosition::Bottom => Vec2::new(mid.x, max.y),
            HandlePosition::BottomLeft => Vec2::new(min.x, max.y),
            HandlePosition::Left => Vec2::new(min.x, mid.y),
        }
    }
}

/// Number of parametric samples used when measuring distance to a curve.
pub const EDGE_HIT_SAMPLES: usize = 50;

/// Distance of automatically-placed edge labels from the path, canvas units.
const LABEL_AUTO_OFFSET: f32 = 12.0;

/// Point and local tangent at an arc-length fraction along a polyline.
fn polyline_point_and_tangent(points: &[Vec2], fraction: f32) -> Option<(Vec2, Vec2)> {
    match points {
        [] => None,
        [single] => Some((*single, Vec2::X)),
        _ => {
            let total: f32 = points.windows(2).map(|w| w[0].distance(w[1])).sum();
            if total <= f32::EPSILON {
                return Some((points[0], Vec2::X));
            }
            let mut remaining = total * fraction.clamp(0.0, 1.0);
            let last_seg = points.len() - 2;
            for i in 0..=last_seg {
                let (a, b) = (points[i], points[i + 1]);
                let seg = a.distance(b);
                if remaining <= seg || i == last_seg {
                    let t = if seg > f32::EPSILON {
                        (remaining / seg).min(1.0)
                    } else {
                        0.0
                    };
                    return Some((a.lerp(b, t), b - a));
                }
                remaining -= seg;
            }
            None
        }
    }
}

/// The geometry model. Borrows settings and the renderer registry; every
/// method is a pure function of its inputs.
pub struct GraphRenderModel<'a> {
    config: &'a CanvasConfig,
    registry: Option<&'a RendererRegistry>,
}

impl<'a> GraphRenderModel<'a> {
    pub fn new(config: &'a CanvasConfig, registry: Option<&'a RendererRegistry>) -> Self {
        Self { config, registry }
    }

    /// Resolved size of a node.
    ///
    /// Fallback chain: explicit node size, then the registered type
    /// renderer's preferred size, then the config default. Groups clamp to
    /// the group minimum when expanded; a collapsed group is exactly one
    /// header tall.
    pub fn node_size<T: NodeData>(&self, node: &Node<T>) -> Vec2 {
        let base = node
            .size
            .or_else(|| {
                self.registry
                    .and_then(|r| r.preferred_size(&node.data.node_type()))
            })
            .unwrap_or(if node.is_group() {
                self.config.group_min_size
            } else {
                self.config.default_node_size
            });

        if node.is_group() {
            if node.is_collapsed() {
                Vec2::new(
                    base.x.max(self.config.group_min_size.x),
                    self.config.group_header_height,
                )
            } else {
                base.max(self.config.group_min_size)
            }
        } else {
            // Degenerate explicit sizes clamp to something drawable.
            base.max(Vec2::splat(1.0))
        }
    }

    /// Canvas-space bounds of a node.
    pub fn node_bounds<T: NodeData>(&self, node: &Node<T>) -> Rect {
        Rect::new(node.position, self.node_size(node))
    }

    /// Position of the port at `index` in the node's `direction` list.
    ///
    /// All ports sharing the same resolved side and direction are evenly
    /// distributed along that side: for `k` ports over a span of length
    /// `L` starting at `S`, port `i` sits at `S + L/(k+1) * (i+1)` —
    /// strictly interior, never flush with a corner; a single port lands
    /// dead-center.
    pub fn port_position<T: NodeData>(
        &self,
        node: &Node<T>,
        direction: PortDirection,
        index: usize,
    ) -> Option<Vec2> {
        let list = match direction {
            PortDirection::Input => &node.inputs,
            PortDirection::Output => &node.outputs,
        };
        let port = list.get(index)?;
        let side = port.side.unwrap_or(direction.default_side());

        let mut rank = 0usize;
        let mut count = 0usize;
        for (i, p) in list.iter().enumerate() {
            if p.side.unwrap_or(direction.default_side()) == side {
                if i == index {
                    rank = count;
                }
                count += 1;
            }
        }

        let bounds = self.node_bounds(node);
        let t = (rank as f32 + 1.0) / (count as f32 + 1.0);
        Some(match side {
            PortSide::Left => Vec2::new(bounds.min.x, bounds.min.y + bounds.height() * t),
            PortSide::Right => Vec2::new(bounds.max.x, bounds.min.y + bounds.height() * t),
            PortSide::Top => Vec2::new(bounds.min.x + bounds.width() * t, bounds.min.y),
            PortSide::Bottom => Vec2::new(bounds.min.x + bounds.width() * t, bounds.max.y),
        })
    }

    /// All port centers for one direction, in port order.
    pub fn port_positions<T: NodeData>(
        &self,
        node: &Node<T>,
        direction: PortDirection,
    ) -> Vec<Vec2> {
        let len = match direction {
            PortDirection::Input => node.inputs.len(),
            PortDirection::Output => node.outputs.len(),
        };
        (0..len)
            .filter_map(|i| self.port_position(node, direction, i))
            .collect()
    }

    /// Resolves a port id to an index in the node's list for `direction`.
    ///
    /// An unknown id resolves to index 0 — a deliberate fallback, not an
    /// error: the edge stays attached to *something* sensible while the
    /// graph is mid-edit.
    pub fn resolve_port_index<T: NodeData>(
        &self,
        node: &Node<T>,
        direction: PortDirection,
        port_id: &str,
    ) -> usize {
        node.port(direction, port_id).map(|(i, _)| i).unwrap_or(0)
    }

    /// Anchor point for an edge attaching to `node` in `direction`.
    ///
    /// Falls back to the side midpoint when the node has no ports on that
    /// direction at all (degenerate but renderable).
    pub fn edge_anchor<T: NodeData>(
        &self,
        node: &Node<T>,
        direction: PortDirection,
        port_id: &str,
    ) -> Vec2 {
        let index = self.resolve_port_index(node, direction, port_id);
        self.port_position(node, direction, index).unwrap_or_else(|| {
            let bounds = self.node_bounds(node);
            match direction.default_side() {
                PortSide::Left => Vec2::new(bounds.min.x, bounds.center().y),
                _ => Vec2::new(bounds.max.x, bounds.center().y),
            }
        })
    }

    /// Start and end points of an edge, or `None` when either endpoint
    /// node no longer exists (the edge is skipped for the frame).
    pub fn edge_endpoints<T: NodeData>(
        &self,
        graph: &GraphState<T>,
        edge: &Edge,
    ) -> Option<(Vec2, Vec2)> {
        let source = graph.nodes.get(edge.source)?;
        let target = graph.nodes.get(edge.target)?;
        let start = self.edge_anchor(source, PortDirection::Output, &edge.source_port);
        let end = self.edge_anchor(target, PortDirection::Input, &edge.target_port);
        Some((start, end))
    }

    /// The full point run for an edge: start, waypoints, end.
    pub fn edge_points<T: NodeData>(
        &self,
        graph: &GraphState<T>,
        edge: &Edge,
    ) -> Option<Vec<Vec2>> {
        let (start, end) = self.edge_endpoints(graph, edge)?;
        let mut points = Vec::with_capacity(edge.waypoints.len() + 2);
        points.push(start);
        points.extend_from_slice(&edge.waypoints);
        points.push(end);
        Some(points)
    }

    /// Control points for the canonical horizontal S-curve between two
    /// points. The offset is `clamp(max(50, |dx| * 0.5), 50, 150)` canvas
    /// units, applied horizontally from each endpoint toward the other.
    ///
    /// Both rendering backends must use this exact formula so their curves
    /// are bit-identical.
    pub fn bezier_control_points(start: Vec2, end: Vec2) -> (Vec2, Vec2) {
        let offset = ((end.x - start.x).abs() * 0.5).max(50.0).min(150.0);
        let cp1 = start + Vec2::new(offset, 0.0);
        let cp2 = end - Vec2::new(offset, 0.0);
        (cp1, cp2)
    }

    /// The eight compass resize handles of a bounds rect, lazily.
    pub fn resize_handle_positions(
        bounds: Rect,
    ) -> impl Iterator<Item = (HandlePosition, Vec2)> {
        HandlePosition::ALL
            .into_iter()
            .map(move |pos| (pos, pos.center(bounds)))
    }

    /// Header strip of a group's bounds.
    pub fn group_header_rect(&self, bounds: Rect) -> Rect {
        Rect {
            min: bounds.min,
            max: Vec2::new(
                bounds.max.x,
                bounds.min.y + self.config.group_header_height.min(bounds.height()),
            ),
        }
    }

    /// Collapse-button square inside a group's header.
    pub fn collapse_button_rect(&self, bounds: Rect) -> Rect {
        let header = self.group_header_rect(bounds);
        let size = self
            .config
            .group_collapse_button_size
            .min(header.height() * 0.8);
        let margin = (header.height() - size) * 0.5;
        let min = Vec2::new(header.min.x + margin, header.min.y + margin);
        Rect::new(min, Vec2::splat(size))
    }

    /// Whether a node is visible: not hidden itself, and not inside any
    /// collapsed (or hidden) ancestor group.
    ///
    /// The ancestor walk stops on a missing parent id, and a visited set
    /// guards against parent cycles — a cycle terminates the walk instead
    /// of spinning.
    pub fn is_node_visible<T: NodeData>(
        &self,
        graph: &GraphState<T>,
        node: &Node<T>,
    ) -> bool {
        if node.flags.contains(NodeFlags::HIDDEN) {
            return false;
        }
        let mut visited: HashSet<crate::model::NodeId> = HashSet::new();
        visited.insert(node.id);
        let mut current = node.parent_group;
        while let Some(parent_id) = current {
            if !visited.insert(parent_id) {
                debug!(?parent_id, "parent group cycle detected, stopping ancestor walk");
                break;
            }
            let Some(parent) = graph.nodes.get(parent_id) else {
                break;
            };
            if parent.is_collapsed() || parent.flags.contains(NodeFlags::HIDDEN) {
                return false;
            }
            current = parent.parent_group;
        }
        true
    }

    /// Whether an edge is renderable: both endpoint nodes exist and are
    /// visible.
    pub fn is_edge_renderable<T: NodeData>(&self, graph: &GraphState<T>, edge: &Edge) -> bool {
        let Some(source) = graph.nodes.get(edge.source) else {
            return false;
        };
        let Some(target) = graph.nodes.get(edge.target) else {
            return false;
        };
        self.is_node_visible(graph, source) && self.is_node_visible(graph, target)
    }

    // --- Labels ---------------------------------------------------------

    /// Anchor position for an edge label on a flattened path.
    ///
    /// With an explicit offset the label sits at anchor + offset. Without
    /// one, placement is automatic by the edge's local direction:
    /// horizontal runs place the label above, vertical runs to the right,
    /// diagonals above-right or above-left depending on heading. The
    /// perpendicular offset is rotated by the local tangent either way.
    pub fn edge_label_anchor(points: &[Vec2], label: &crate::model::EdgeLabel) -> Option<Vec2> {
        let fraction = match label.anchor {
            crate::model::LabelAnchor::Start => 0.0,
            crate::model::LabelAnchor::Center => 0.5,
            crate::model::LabelAnchor::End => 1.0,
        };
        let (pos, tangent) = polyline_point_and_tangent(points, fraction)?;

        let mut out = pos;
        match label.offset {
            Some(offset) => out += offset,
            None => {
                let d = LABEL_AUTO_OFFSET;
                let t = tangent.normalize_or_zero();
                out += if t.y.abs() < 0.35 {
                    Vec2::new(0.0, -d)
                } else if t.x.abs() < 0.35 {
                    Vec2::new(d, 0.0)
                } else if t.x > 0.0 {
                    Vec2::new(d, -d) * std::f32::consts::FRAC_1_SQRT_2
                } else {
                    Vec2::new(-d, -d) * std::f32::consts::FRAC_1_SQRT_2
                };
            }
        }
        if label.perpendicular_offset != 0.0 {
            let t = tangent.normalize_or_zero();
            out += t.perp() * label.perpendicular_offset;
        }
        Some(out)
    }

    // --- Hit predicates -------------------------------------------------

    /// Point-in-port: squared distance against the configured hit radius.
    pub fn hit_port(&self, point: Vec2, port_center: Vec2) -> bool {
        point.distance_squared(port_center) <= self.config.port_hit_radius.powi(2)
    }

    /// Point-near-curve for a single cubic segment: bounding-box
    /// pre-reject (inflated by the hit width), then minimum squared
    /// distance over `EDGE_HIT_SAMPLES` parametric steps.
    pub fn hit_bezier(&self, point: Vec2, start: Vec2, cp1: Vec2, cp2: Vec2, end: Vec2) -> bool {
        let threshold = self.config.edge_hit_width;
        let bounds = Rect { min: start, max: start }
            .union_point(cp1)
            .union_point(cp2)
            .union_point(end)
            .expand(threshold);
        if !bounds.contains(point) {
            return false;
        }
        let mut best = f32::INFINITY;
        let mut prev = start;
        for i in 1..=EDGE_HIT_SAMPLES {
            let t = i as f32 / EDGE_HIT_SAMPLES as f32;
            let p = math::cubic_point(start, cp1, cp2, end, t);
            best = best.min(math::dist_sq_to_segment(point, prev, p));
            prev = p;
        }
        best <= threshold * threshold
    }

    /// Point-near-polyline with the same threshold, for flattened paths.
    pub fn hit_polyline(&self, point: Vec2, points: &[Vec2]) -> bool {
        let threshold = self.config.edge_hit_width;
        math::dist_sq_to_polyline(point, points) <= threshold * threshold
    }

    /// Point-in-resize-handle: square half-extent plus click tolerance.
    pub fn hit_resize_handle(&self, point: Vec2, handle_center: Vec2) -> bool {
        let half = self.config.resize_handle_size * 0.5 + self.config.resize_handle_tolerance;
        let d = point - handle_center;
        d.x.abs() <= half && d.y.abs() <= half
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Port;

    fn model(config: &CanvasConfig) -> GraphRenderModel<'_> {
        GraphRenderModel::new(config, None)
    }

    fn plain_node(pos: Vec2, size: Vec2) -> Node<String> {
        let mut node = Node::new(pos, "n".to_string());
        node.size = Some(size);
        node
    }

    #[test]
    fn size_fallback_chain_hits_default() {
        let config = CanvasConfig::default();
        let m = model(&config);
        let node = Node::new(Vec2::ZERO, "n".to_string());
        assert_eq!(m.node_size(&node), config.default_node_size);
    }

    #[test]
    fn collapsed_group_is_header_tall() {
        let config = CanvasConfig::default();
        let m = model(&config);
        let mut group = plain_node(Vec2::ZERO, Vec2::new(300.0, 200.0));
        group.flags.insert(NodeFlags::GROUP | NodeFlags::COLLAPSED);
        let size = m.node_size(&group);
        assert_eq!(size.y, config.group_header_height);
        assert_eq!(size.x, 300.0);
    }

    #[test]
    fn ports_distribute_strictly_interior() {
        let config = CanvasConfig::default();
        let m = model(&config);
        let mut node = plain_node(Vec2::ZERO, Vec2::new(100.0, 90.0));
        for i in 0..3 {
            node.inputs.push(Port::new(format!("in{i}")));
        }
        let ys: Vec<f32> = (0..3)
            .map(|i| m.port_position(&node, PortDirection::Input, i).unwrap().y)
            .collect();
        // 90 / 4 spacing: 22.5, 45, 67.5 — interior and increasing.
        assert!(ys[0] > 0.0 && ys[2] < 90.0);
        assert!(ys[0] < ys[1] && ys[1] < ys[2]);
        assert!((ys[1] - 45.0).abs() < 1e-5);
    }

    #[test]
    fn explicit_side_forms_its_own_set() {
        let config = CanvasConfig::default();
        let m = model(&config);
        let mut node = plain_node(Vec2::ZERO, Vec2::new(100.0, 80.0));
        node.outputs.push(Port::new("right0"));
        node.outputs.push(Port::with_side("top0", PortSide::Top));
        // The lone Right output centers; the lone Top output centers on the
        // top edge.
        let right = m.port_position(&node, PortDirection::Output, 0).unwrap();
        assert_eq!(right, Vec2::new(100.0, 40.0));
        let top = m.port_position(&node, PortDirection::Output, 1).unwrap();
        assert_eq!(top, Vec2::new(50.0, 0.0));
    }

    #[test]
    fn control_point_offset_clamps() {
        let (cp1, _) =
            GraphRenderModel::bezier_control_points(Vec2::ZERO, Vec2::new(1000.0, 0.0));
        assert_eq!(cp1.x, 150.0);
        let (cp1, _) = GraphRenderModel::bezier_control_points(Vec2::ZERO, Vec2::new(10.0, 0.0));
        assert_eq!(cp1.x, 50.0);
    }

    #[test]
    fn cycle_guard_terminates() {
        let config = CanvasConfig::default();
        let m = model(&config);
        let mut graph: GraphState<String> = GraphState::default();
        let a = graph.insert_node(Node::new(Vec2::ZERO, "a".to_string()));
        let b = graph.insert_node(Node::new(Vec2::ZERO, "b".to_string()));
        graph.nodes[a].parent_group = Some(b);
        graph.nodes[b].parent_group = Some(a);
        // Must terminate; with no collapsed ancestor both stay visible.
        let node_a = graph.nodes[a].clone();
        assert!(m.is_node_visible(&graph, &node_a));
    }

    #[test]
    fn port_hit_radius_is_exact() {
        let config = CanvasConfig::default();
        let m = model(&config);
        let center = Vec2::new(100.0, 50.0);
        assert!(m.hit_port(center, center));
        assert!(m.hit_port(center + Vec2::new(config.port_hit_radius, 0.0), center));
        assert!(!m.hit_port(center + Vec2::new(config.port_hit_radius + 1.0, 0.0), center));
    }

    #[test]
    fn bezier_hit_prerejects_and_samples() {
        let config = CanvasConfig::default();
        let m = model(&config);
        let (start, end) = (Vec2::new(0.0, 0.0), Vec2::new(200.0, 0.0));
        let (cp1, cp2) = GraphRenderModel::bezier_control_points(start, end);
        // On the (degenerate, flat) curve.
        assert!(m.hit_bezier(Vec2::new(100.0, 0.0), start, cp1, cp2, end));
        // Inside the hit band.
        assert!(m.hit_bezier(Vec2::new(100.0, config.edge_hit_width - 1.0), start, cp1, cp2, end));
        // Past the band, and far outside the pre-reject box.
        assert!(!m.hit_bezier(Vec2::new(100.0, config.edge_hit_width + 1.0), start, cp1, cp2, end));
        assert!(!m.hit_bezier(Vec2::new(100.0, 500.0), start, cp1, cp2, end));
    }

    #[test]
    fn resize_handle_hit_has_tolerance() {
        let config = CanvasConfig::default();
        let m = model(&config);
        let center = Vec2::new(10.0, 10.0);
        let reach = config.resize_handle_size * 0.5 + config.resize_handle_tolerance;
        assert!(m.hit_resize_handle(center + Vec2::splat(reach), center));
        assert!(!m.hit_resize_handle(center + Vec2::splat(reach + 0.5), center));
    }

    #[test]
    fn handle_ring_has_eight_positions() {
        let bounds = Rect::new(Vec2::ZERO, Vec2::new(100.0, 50.0));
        let handles: Vec<_> = GraphRenderModel::resize_handle_positions(bounds).collect();
        assert_eq!(handles.len(), 8);
        let (pos, center) = handles[4];
        assert_eq!(pos, HandlePosition::BottomRight);
        assert_eq!(center, Vec2::new(100.0, 50.0));
    }
}
