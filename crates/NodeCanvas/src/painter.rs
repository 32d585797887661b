//! # Direct Renderer
//!
//! The immediate-mode backend: one full-graph walk per invalidated frame,
//! emitting a `RenderList` for the host. The walk culls against the
//! viewport, applies level-of-detail by zoom, and follows a fixed
//! back-to-front order so z-stacking is always correct:
//! grid, expanded group chrome, edges, regular nodes, collapsed groups,
//! resize handles, edge-endpoint handles.
//!
//! The renderer owns the spatial index and a per-theme style cache; both
//! are invalidated explicitly and rebuilt lazily.

use std::collections::HashMap;

use glam::{Vec2, Vec4};
use tracing::{debug, trace};

use crate::config::CanvasConfig;
use crate::geometry::GraphRenderModel;
use crate::model::{
    Edge, EdgeStyle, GraphState, MarkerKind, Node, NodeData, NodeId, PortDirection,
};
use crate::path::{self, PathGeometry};
use crate::registry::{NodeDrawContext, RendererRegistry};
use crate::render::{DrawCommand, LodFlags, RenderList};
use crate::spatial::SpatialIndex;
use crate::theme::{NodeStyle, Theme};
use crate::view::Viewport;

/// Colors resolved from the theme once per theme generation. The cache is
/// the Rust stand-in for cached pens/brushes keyed to theme identity.
#[derive(Clone, Debug)]
struct CachedStyles {
    generation: u64,
    node: NodeStyle,
    node_selected_border: Vec4,
    group_fill: Vec4,
    group_border: Vec4,
    group_header: Vec4,
    group_text: Vec4,
    port_fill: Vec4,
    port_border: Vec4,
    edge: Vec4,
    edge_selected: Vec4,
    edge_label: Vec4,
    handle_fill: Vec4,
    handle_border: Vec4,
    grid: Vec4,
}

impl CachedStyles {
    fn resolve(theme: &Theme) -> Self {
        Self {
            generation: theme.generation,
            node: theme.node,
            node_selected_border: theme.node_selected_border,
            group_fill: theme.group_fill,
            group_border: theme.group_border,
            group_header: theme.group_header,
            group_text: theme.group_text,
            port_fill: theme.port_fill,
            port_border: theme.port_border,
            edge: theme.edge,
            edge_selected: theme.edge_selected,
            edge_label: theme.edge_label,
            handle_fill: theme.handle_fill,
            handle_border: theme.handle_border,
            grid: theme.grid,
        }
    }
}

/// Immediate-mode renderer instance. Owns its caches; create one per
/// canvas surface.
#[derive(Default)]
pub struct DirectRenderer {
    spatial: SpatialIndex,
    styles: Option<CachedStyles>,
}

impl DirectRenderer {
    pub fn new() -> Self {
        Self {
            spatial: SpatialIndex::new(),
            styles: None,
        }
    }

    /// Marks the spatial index stale. Call on any node/edge add/remove,
    /// resize, or collapse-state change.
    pub fn invalidate_index(&mut self) {
        self.spatial.invalidate();
    }

    /// Shared access to the spatial index for hit-testing.
    pub fn spatial_mut(&mut self) -> &mut SpatialIndex {
        &mut self.spatial
    }

    fn styles_for(&mut self, theme: &Theme) -> CachedStyles {
        let stale = self
            .styles
            .as_ref()
            .map(|s| s.generation != theme.generation)
            .unwrap_or(true);
        if stale {
            debug!(generation = theme.generation, "rebuilding cached theme styles");
            self.styles = Some(CachedStyles::resolve(theme));
        }
        self.styles.as_ref().unwrap().clone()
    }

    /// Renders the whole visible graph into a fresh draw list.
    pub fn draw_graph<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        view: &Viewport,
        config: &CanvasConfig,
        theme: &Theme,
        registry: Option<&RendererRegistry>,
    ) -> RenderList {
        let model = GraphRenderModel::new(config, registry);
        self.spatial.ensure_built(graph, &model);
        let styles = self.styles_for(theme);
        let lod = LodFlags::at_zoom(view.zoom, &config.lod);

        let mut out = RenderList::new();

        if lod.grid {
            draw_grid(view, config, styles.grid, &mut out);
        }

        // Per-frame culling memo: node id -> inflated screen bounds hit the
        // viewport. Doubles as the "visible node set" for edge culling.
        let mut on_screen: HashMap<NodeId, bool> = HashMap::new();
        let buffer = config.cull_buffer + config.port_size;
        let mut node_on_screen = |node: &Node<T>, on_screen: &mut HashMap<NodeId, bool>| {
            *on_screen.entry(node.id).or_insert_with(|| {
                let screen = view.rect_to_screen(model.node_bounds(node)).expand(buffer);
                screen.intersects(&view.screen_rect())
            })
        };

        let mut culled_nodes = 0usize;
        let mut culled_edges = 0usize;

        // 1. Expanded group chrome, back to front.
        for node in graph.nodes_in_draw_order() {
            if !node.is_group() || node.is_collapsed() || !model.is_node_visible(graph, node) {
                continue;
            }
            if !node_on_screen(node, &mut on_screen) {
                continue;
            }
            self.draw_expanded_group(node, &model, view, config, &styles, lod, &mut out);
        }

        // 2. Edges with at least one on-screen endpoint.
        for (_, edge) in &graph.edges {
            if !model.is_edge_renderable(graph, edge) {
                continue;
            }
            let source_visible = graph
                .nodes
                .get(edge.source)
                .is_some_and(|n| node_on_screen(n, &mut on_screen));
            let target_visible = graph
                .nodes
                .get(edge.target)
                .is_some_and(|n| node_on_screen(n, &mut on_screen));
            if !source_visible && !target_visible {
                culled_edges += 1;
                continue;
            }
            self.draw_edge(graph, edge, &model, view, config, registry, &styles, lod, &mut out);
        }

        // 3. Regular nodes inside the viewport.
        for node in graph.nodes_in_draw_order() {
            if node.is_group() || !model.is_node_visible(graph, node) {
                continue;
            }
            if !node_on_screen(node, &mut on_screen) {
                culled_nodes += 1;
                continue;
            }
            self.draw_node(node, &model, view, registry, config, &styles, lod, &mut out);
        }

        // 4. Collapsed groups as compact headers, above regular nodes.
        for node in graph.nodes_in_draw_order() {
            if !node.is_group() || !node.is_collapsed() || !model.is_node_visible(graph, node) {
                continue;
            }
            if !node_on_screen(node, &mut on_screen) {
                continue;
            }
            self.draw_collapsed_group(node, &model, view, config, &styles, lod, &mut out);
        }

        // 5. Resize handles for selected, resizable, visible nodes.
        for node in graph.nodes_in_draw_order() {
            if !node.is_selected()
                || !node.flags.contains(crate::model::NodeFlags::RESIZABLE)
                || !model.is_node_visible(graph, node)
                || !node_on_screen(node, &mut on_screen)
            {
                continue;
            }
            self.draw_resize_handles(node, &model, view, config, &styles, &mut out);
        }

        // 6. Endpoint handles for selected edges.
        for (_, edge) in &graph.edges {
            if !edge.is_selected() || !model.is_edge_renderable(graph, edge) {
                continue;
            }
            if let Some((start, end)) = model.edge_endpoints(graph, edge) {
                for p in [start, end] {
                    let center = view.canvas_to_screen(p);
                    let r = config.edge_endpoint_handle_radius * view.zoom;
                    out.push(DrawCommand::Rect {
                        pos: center - Vec2::splat(r),
                        size: Vec2::splat(r * 2.0),
                        color: styles.handle_fill,
                        corner_radius: r,
                        stroke_width: 1.0,
                        stroke_color: Some(styles.handle_border),
                        stroke_dash: None,
                    });
                }
            }
        }

        trace!(
            commands = out.len(),
            culled_nodes,
            culled_edges,
            zoom = view.zoom,
            "direct frame"
        );
        out
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_expanded_group<T: NodeData>(
        &self,
        node: &Node<T>,
        model: &GraphRenderModel<'_>,
        view: &Viewport,
        config: &CanvasConfig,
        styles: &CachedStyles,
        lod: LodFlags,
        out: &mut RenderList,
    ) {
        let bounds = model.node_bounds(node);
        let screen = view.rect_to_screen(bounds);
        let zoom = view.zoom;

        // Body: dashed border normally, solid highlight when selected.
        let (stroke_color, stroke_dash) = if node.is_selected() {
            (styles.node_selected_border, None)
        } else {
            (styles.group_border, Some(vec![6.0 * zoom, 4.0 * zoom]))
        };
        out.push(DrawCommand::Rect {
            pos: screen.min,
            size: screen.size(),
            color: styles.group_fill,
            corner_radius: config.group_corner_radius * zoom,
            stroke_width: if node.is_selected() { 2.0 } else { 1.0 },
            stroke_color: Some(stroke_color),
            stroke_dash,
        });

        // Header strip with collapse button and label.
        let header = view.rect_to_screen(model.group_header_rect(bounds));
        out.push(DrawCommand::Rect {
            pos: header.min,
            size: header.size(),
            color: styles.group_header,
            corner_radius: config.group_corner_radius * zoom,
            stroke_width: 0.0,
            stroke_color: None,
            stroke_dash: None,
        });
        let button = view.rect_to_screen(model.collapse_button_rect(bounds));
        out.push(DrawCommand::Rect {
            pos: button.min,
            size: button.size(),
            color: styles.group_text,
            corner_radius: 2.0 * zoom,
            stroke_width: 0.0,
            stroke_color: None,
            stroke_dash: None,
        });
        if lod.labels && !node.label.is_empty() {
            out.push(DrawCommand::Text {
                pos: header.center(),
                text: node.label.clone(),
                color: styles.group_text,
                size: config.label_font_size * zoom,
            });
        }

        if lod.ports {
            self.draw_ports(node, model, view, config, styles, out);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_collapsed_group<T: NodeData>(
        &self,
        node: &Node<T>,
        model: &GraphRenderModel<'_>,
        view: &Viewport,
        config: &CanvasConfig,
        styles: &CachedStyles,
        lod: LodFlags,
        out: &mut RenderList,
    ) {
        let bounds = model.node_bounds(node);
        let screen = view.rect_to_screen(bounds);
        let zoom = view.zoom;

        out.push(DrawCommand::Rect {
            pos: screen.min,
            size: screen.size(),
            color: styles.group_header,
            corner_radius: config.group_corner_radius * zoom,
            stroke_width: if node.is_selected() { 2.0 } else { 1.0 },
            stroke_color: Some(if node.is_selected() {
                styles.node_selected_border
            } else {
                styles.group_border
            }),
            stroke_dash: None,
        });
        let button = view.rect_to_screen(model.collapse_button_rect(bounds));
        out.push(DrawCommand::Rect {
            pos: button.min,
            size: button.size(),
            color: styles.group_text,
            corner_radius: 2.0 * zoom,
            stroke_width: 0.0,
            stroke_color: None,
            stroke_dash: None,
        });
        if lod.labels && !node.label.is_empty() {
            out.push(DrawCommand::Text {
                pos: screen.center(),
                text: node.label.clone(),
                color: styles.group_text,
                size: config.label_font_size * zoom,
            });
        }
        if lod.ports {
            self.draw_ports(node, model, view, config, styles, out);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_node<T: NodeData>(
        &self,
        node: &Node<T>,
        model: &GraphRenderModel<'_>,
        view: &Viewport,
        registry: Option<&RendererRegistry>,
        config: &CanvasConfig,
        styles: &CachedStyles,
        lod: LodFlags,
        out: &mut RenderList,
    ) {
        let bounds = model.node_bounds(node);
        let screen = view.rect_to_screen(bounds);
        let zoom = view.zoom;
        let node_style = node.style.as_ref().unwrap_or(&styles.node);

        // Custom direct-draw hook. The delegate owns box, label and ports
        // when it reports the node handled.
        if let Some(renderer) =
            registry.and_then(|r| r.node_renderer(&node.data.node_type()))
        {
            let inputs: Vec<Vec2> = model
                .port_positions(node, PortDirection::Input)
                .into_iter()
                .map(|p| view.canvas_to_screen(p))
                .collect();
            let outputs: Vec<Vec2> = model
                .port_positions(node, PortDirection::Output)
                .into_iter()
                .map(|p| view.canvas_to_screen(p))
                .collect();
            let ctx = NodeDrawContext {
                screen_bounds: screen,
                zoom,
                selected: node.is_selected(),
                label: &node.label,
                style: node_style,
                lod,
                input_ports: &inputs,
                output_ports: &outputs,
            };
            if renderer.draw_direct(&ctx, out) {
                return;
            }
        }

        if !lod.detailed {
            // Simplified far-zoom rendering: flat box, no chrome. The
            // label survives until its own (lower) threshold.
            out.push(DrawCommand::Rect {
                pos: screen.min,
                size: screen.size(),
                color: node_style.fill,
                corner_radius: 0.0,
                stroke_width: 0.0,
                stroke_color: None,
                stroke_dash: None,
            });
            if lod.labels && !node.label.is_empty() {
                out.push(DrawCommand::Text {
                    pos: screen.center(),
                    text: node.label.clone(),
                    color: node_style.text,
                    size: config.label_font_size * zoom,
                });
            }
            return;
        }

        let (stroke_color, stroke_width) = if node.is_selected() {
            (styles.node_selected_border, 2.0)
        } else {
            (node_style.border, 1.0)
        };
        out.push(DrawCommand::Rect {
            pos: screen.min,
            size: screen.size(),
            color: node_style.fill,
            corner_radius: config.node_corner_radius * zoom,
            stroke_width,
            stroke_color: Some(stroke_color),
            stroke_dash: None,
        });

        if lod.labels && !node.label.is_empty() {
            out.push(DrawCommand::Text {
                pos: screen.center(),
                text: node.label.clone(),
                color: node_style.text,
                size: config.label_font_size * zoom,
            });
        }

        if lod.ports {
            self.draw_ports(node, model, view, config, styles, out);
        }
    }

    fn draw_ports<T: NodeData>(
        &self,
        node: &Node<T>,
        model: &GraphRenderModel<'_>,
        view: &Viewport,
        config: &CanvasConfig,
        styles: &CachedStyles,
        out: &mut RenderList,
    ) {
        let port_size = Vec2::splat(config.port_size) * view.zoom;
        for direction in [PortDirection::Input, PortDirection::Output] {
            for pos in model.port_positions(node, direction) {
                let center = view.canvas_to_screen(pos);
                out.push(DrawCommand::Rect {
                    pos: center - port_size * 0.5,
                    size: port_size,
                    color: styles.port_fill,
                    corner_radius: port_size.x * 0.5,
                    stroke_width: 1.0,
                    stroke_color: Some(styles.port_border),
                    stroke_dash: None,
                });
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_edge<T: NodeData>(
        &self,
        graph: &GraphState<T>,
        edge: &Edge,
        model: &GraphRenderModel<'_>,
        view: &Viewport,
        config: &CanvasConfig,
        registry: Option<&RendererRegistry>,
        styles: &CachedStyles,
        lod: LodFlags,
        out: &mut RenderList,
    ) {
        let Some(points) = model.edge_points(graph, edge) else {
            return;
        };
        let canvas_path = build_edge_geometry(edge, &points, config, registry);
        if canvas_path.is_empty() {
            return;
        }
        let zoom = view.zoom;
        let screen_path = canvas_path.map_points(|p| view.canvas_to_screen(p));

        let default_style = EdgeStyle {
            color: if edge.is_selected() {
                styles.edge_selected
            } else {
                styles.edge
            },
            ..EdgeStyle::default()
        };
        let style = edge.style.as_ref().unwrap_or(&default_style);
        let color = apply_opacity(
            if edge.is_selected() {
                styles.edge_selected
            } else {
                style.color
            },
            style.opacity,
        );
        let width = style.width * zoom * if edge.is_selected() { 1.5 } else { 1.0 };
        let dash = style
            .dash
            .intervals()
            .map(|runs| runs.into_iter().map(|r| r * zoom).collect::<Vec<_>>());

        // Glow underlay first so the edge strokes over it.
        if let Some(glow) = &style.glow {
            out.push(DrawCommand::Path {
                path: screen_path.clone(),
                stroke_color: glow.color,
                stroke_width: width + glow.radius * 2.0 * zoom,
                dash: None,
                fill_color: None,
            });
        }

        out.push(DrawCommand::Path {
            path: screen_path,
            stroke_color: color,
            stroke_width: width,
            dash,
            fill_color: None,
        });

        // Markers, oriented by the path's end tangents.
        let flat = canvas_path.flatten(8);
        if flat.len() >= 2 {
            let marker_pairs = [
                (edge.marker_start, points[0], flat[0] - flat[1]),
                (
                    edge.marker_end,
                    *points.last().unwrap(),
                    flat[flat.len() - 1] - flat[flat.len() - 2],
                ),
            ];
            for (kind, tip, direction) in marker_pairs {
                if let Some(marker) = path::build_marker(tip, direction, config.marker_size, kind)
                {
                    let marker_screen = marker.map_points(|p| view.canvas_to_screen(p));
                    let fill = (kind == MarkerKind::ArrowClosed).then_some(color);
                    out.push(DrawCommand::Path {
                        path: marker_screen,
                        stroke_color: color,
                        stroke_width: style.width * zoom,
                        dash: None,
                        fill_color: fill,
                    });
                }
            }
        }

        if lod.labels {
            if let Some(label) = &edge.label {
                if let Some(anchor) = GraphRenderModel::edge_label_anchor(&flat, label) {
                    out.push(DrawCommand::Text {
                        pos: view.canvas_to_screen(anchor),
                        text: label.text.clone(),
                        color: styles.edge_label,
                        size: config.label_font_size * zoom,
                    });
                }
            }
        }
    }

    fn draw_resize_handles<T: NodeData>(
        &self,
        node: &Node<T>,
        model: &GraphRenderModel<'_>,
        view: &Viewport,
        config: &CanvasConfig,
        styles: &CachedStyles,
        out: &mut RenderList,
    ) {
        let bounds = model.node_bounds(node);
        let size = Vec2::splat(config.resize_handle_size) * view.zoom;
        for (_, center) in GraphRenderModel::resize_handle_positions(bounds) {
            let screen_center = view.canvas_to_screen(center);
            out.push(DrawCommand::Rect {
                pos: screen_center - size * 0.5,
                size,
                color: styles.handle_fill,
                corner_radius: 1.0,
                stroke_width: 1.0,
                stroke_color: Some(styles.handle_border),
                stroke_dash: None,
            });
        }
    }
}

/// Builds the canvas-space path for an edge, honoring a registered custom
/// edge renderer before the built-in kinds.
pub fn build_edge_geometry(
    edge: &Edge,
    points: &[Vec2],
    config: &CanvasConfig,
    registry: Option<&RendererRegistry>,
) -> PathGeometry {
    if let Some(tag) = &edge.renderer {
        if let Some(custom) = registry.and_then(|r| r.edge_renderer(tag)) {
            if let Some(path) = custom.build_path(points, edge.kind) {
                return path;
            }
        }
    }
    path::build_edge_path(points, edge.kind, config.smooth_step_radius)
}

fn apply_opacity(color: Vec4, opacity: f32) -> Vec4 {
    Vec4::new(color.x, color.y, color.z, color.w * opacity.clamp(0.0, 1.0))
}

/// Renders the background grid over the visible canvas region.
fn draw_grid(view: &Viewport, config: &CanvasConfig, color: Vec4, out: &mut RenderList) {
    let spacing = config.grid_spacing;
    let visible = view.visible_canvas_rect();

    let start_x = (visible.min.x / spacing).floor() * spacing;
    let start_y = (visible.min.y / spacing).floor() * spacing;

    let mut x = start_x;
    while x <= visible.max.x {
        out.push(DrawCommand::Line {
            start: view.canvas_to_screen(Vec2::new(x, visible.min.y)),
            end: view.canvas_to_screen(Vec2::new(x, visible.max.y)),
            color,
            width: 1.0,
        });
        x += spacing;
    }

    let mut y = start_y;
    while y <= visible.max.y {
        out.push(DrawCommand::Line {
            start: view.canvas_to_screen(Vec2::new(visible.min.x, y)),
            end: view.canvas_to_screen(Vec2::new(visible.max.x, y)),
            color,
            width: 1.0,
        });
        y += spacing;
    }
}
