//! # Hit Testing
//!
//! Screen point -> element queries, the reverse concern of the draw order:
//! what renders on top is tested first. Priority is resize handle,
//! edge-endpoint handle, node (regular nodes before groups, since groups
//! render behind), port, edge.
//!
//! Node lookup goes through the spatial index (rebuilt lazily if dirty);
//! everything else recomputes from the same geometry model the renderers
//! use, so a hit always lands on what was actually drawn.

use glam::Vec2;

use crate::config::CanvasConfig;
use crate::geometry::{GraphRenderModel, HandlePosition};
use crate::model::{EdgeId, GraphState, NodeData, NodeFlags, NodeId, PortDirection};
use crate::painter::build_edge_geometry;
use crate::registry::RendererRegistry;
use crate::render::LodFlags;
use crate::spatial::SpatialIndex;
use crate::view::Viewport;

/// Which end of an edge an endpoint handle belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeEnd {
    Source,
    Target,
}

/// Result of a hit-test query.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitTarget {
    ResizeHandle {
        node: NodeId,
        position: HandlePosition,
    },
    EdgeEndpoint {
        edge: EdgeId,
        end: EdgeEnd,
    },
    Node(NodeId),
    Port {
        node: NodeId,
        direction: PortDirection,
        index: usize,
    },
    Edge(EdgeId),
}

/// Full-priority hit test at a screen-space point.
///
/// Returns `None` over empty canvas. The spatial index is rebuilt first if
/// it was invalidated.
pub fn hit_test<T: NodeData>(
    graph: &GraphState<T>,
    view: &Viewport,
    config: &CanvasConfig,
    registry: Option<&RendererRegistry>,
    spatial: &mut SpatialIndex,
    screen_point: Vec2,
) -> Option<HitTarget> {
    let model = GraphRenderModel::new(config, registry);
    spatial.ensure_built(graph, &model);
    let point = view.screen_to_canvas(screen_point);
    let lod = LodFlags::at_zoom(view.zoom, &config.lod);

    // 1. Resize handles of selected, resizable nodes — drawn topmost.
    for &node_id in graph.draw_order.iter().rev() {
        let Some(node) = graph.nodes.get(node_id) else {
            continue;
        };
        if !node.is_selected()
            || !node.flags.contains(NodeFlags::RESIZABLE)
            || !model.is_node_visible(graph, node)
        {
            continue;
        }
        let bounds = model.node_bounds(node);
        for (position, center) in GraphRenderModel::resize_handle_positions(bounds) {
            if model.hit_resize_handle(point, center) {
                return Some(HitTarget::ResizeHandle {
                    node: node_id,
                    position,
                });
            }
        }
    }

    // 2. Endpoint handles of selected edges.
    for (edge_id, edge) in &graph.edges {
        if !edge.is_selected() || !model.is_edge_renderable(graph, edge) {
            continue;
        }
        let Some((start, end)) = model.edge_endpoints(graph, edge) else {
            continue;
        };
        let radius_sq = config.edge_endpoint_handle_radius.powi(2);
        if point.distance_squared(start) <= radius_sq {
            return Some(HitTarget::EdgeEndpoint {
                edge: edge_id,
                end: EdgeEnd::Source,
            });
        }
        if point.distance_squared(end) <= radius_sq {
            return Some(HitTarget::EdgeEndpoint {
                edge: edge_id,
                end: EdgeEnd::Target,
            });
        }
    }

    // 3. Ports, front to back. Ports sit on node borders, so they must be
    // tested before node bodies or a click dead-center on a port would
    // land on the node instead. Skipped while LOD hides them.
    if lod.ports {
        for &node_id in graph.draw_order.iter().rev() {
            let Some(node) = graph.nodes.get(node_id) else {
                continue;
            };
            if !model.is_node_visible(graph, node) {
                continue;
            }
            for direction in [PortDirection::Output, PortDirection::Input] {
                let len = match direction {
                    PortDirection::Input => node.inputs.len(),
                    PortDirection::Output => node.outputs.len(),
                };
                for index in 0..len {
                    if let Some(pos) = model.port_position(node, direction, index) {
                        if model.hit_port(point, pos) {
                            return Some(HitTarget::Port {
                                node: node_id,
                                direction,
                                index,
                            });
                        }
                    }
                }
            }
        }
    }

    // 4. Regular nodes, topmost first, through the spatial index. At low
    // zoom the clickable area shrinks toward the node center so tiny
    // nodes don't swallow clicks meant for the canvas.
    for entry in spatial.entries().iter().rev() {
        let Some(node) = graph.nodes.get(entry.node) else {
            continue;
        };
        if !node.flags.contains(NodeFlags::SELECTABLE) {
            continue;
        }
        if hit_bounds(entry.bounds, point, view, config) {
            return Some(HitTarget::Node(entry.node));
        }
    }

    // 4b. Groups, after regular nodes (they render behind). Collapsed
    // groups hit on their compact header bounds, expanded ones anywhere
    // in their body.
    for &node_id in graph.draw_order.iter().rev() {
        let Some(node) = graph.nodes.get(node_id) else {
            continue;
        };
        if !node.is_group()
            || !node.flags.contains(NodeFlags::SELECTABLE)
            || !model.is_node_visible(graph, node)
        {
            continue;
        }
        if hit_bounds(model.node_bounds(node), point, view, config) {
            return Some(HitTarget::Node(node_id));
        }
    }

    // 5. Edges: bounding-box pre-reject, then distance to the sampled path.
    for (edge_id, edge) in &graph.edges {
        if !model.is_edge_renderable(graph, edge) {
            continue;
        }
        let Some(points) = model.edge_points(graph, edge) else {
            continue;
        };
        let path = build_edge_geometry(edge, &points, config, registry);
        let Some(bounds) = path.control_bounds() else {
            continue;
        };
        if !bounds.expand(config.edge_hit_width).contains(point) {
            continue;
        }
        let flat = path.flatten(crate::geometry::EDGE_HIT_SAMPLES);
        if model.hit_polyline(point, &flat) {
            return Some(HitTarget::Edge(edge_id));
        }
    }

    None
}

/// Canvas-space bounds test with the low-zoom shrink: when the node's
/// smaller screen dimension drops below the configured pixel threshold,
/// only the inner 40%..100% (linearly interpolated) of the rect counts.
fn hit_bounds(
    bounds: crate::math::Rect,
    point: Vec2,
    view: &Viewport,
    config: &CanvasConfig,
) -> bool {
    let screen_size = bounds.size() * view.zoom;
    let min_dim = screen_size.x.min(screen_size.y);
    let rect = if min_dim < config.tiny_node_px {
        let t = (min_dim / config.tiny_node_px).clamp(0.0, 1.0);
        bounds.scale_from_center(0.4 + 0.6 * t)
    } else {
        bounds
    };
    rect.contains(point)
}
