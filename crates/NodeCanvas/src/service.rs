//! # Render Service Facade
//!
//! One API for interaction code, two backends behind it. In direct mode
//! every mutation collapses to "invalidate and request a repaint" —
//! immediate mode has no granular update path. In retained mode each
//! mutation maps to the matching visual-manager call that touches only
//! the affected persistent objects. Callers never branch on the mode.

use glam::Vec2;
use tracing::debug;

use crate::config::CanvasConfig;
use crate::geometry::GraphRenderModel;
use crate::hit::{self, HitTarget};
use crate::model::{GraphState, NodeData, NodeFlags, NodeId};
use crate::painter::DirectRenderer;
use crate::registry::RendererRegistry;
use crate::render::RenderList;
use crate::scene::{
    EdgeVisualManager, NodeVisualManager, ResizeHandleVisualManager, SceneContainer,
};
use crate::theme::Theme;
use crate::view::Viewport;

/// Which backend is active.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderMode {
    /// Immediate mode: full redraw per invalidated frame.
    Direct,
    /// Retained mode: persistent per-element visuals, mutated in place.
    Retained,
}

/// Per-call context: the collaborators every update needs.
#[derive(Clone, Copy)]
pub struct FrameContext<'a> {
    pub config: &'a CanvasConfig,
    pub theme: &'a Theme,
    pub registry: Option<&'a RendererRegistry>,
}

/// The retained backend: host scene container plus the three managers.
pub struct RetainedBackend {
    container: Box<dyn SceneContainer>,
    pub nodes: NodeVisualManager,
    pub edges: EdgeVisualManager,
    pub handles: ResizeHandleVisualManager,
}

impl RetainedBackend {
    pub fn new(container: Box<dyn SceneContainer>) -> Self {
        Self {
            container,
            nodes: NodeVisualManager::new(),
            edges: EdgeVisualManager::new(),
            handles: ResizeHandleVisualManager::new(),
        }
    }
}

/// Mode-switch dispatcher presenting one update/refresh API.
pub struct RenderService {
    mode: RenderMode,
    direct: DirectRenderer,
    retained: Option<RetainedBackend>,
    repaint_needed: bool,
}

impl RenderService {
    /// Direct-mode service.
    pub fn new_direct() -> Self {
        Self {
            mode: RenderMode::Direct,
            direct: DirectRenderer::new(),
            retained: None,
            repaint_needed: true,
        }
    }

    /// Retained-mode service over a host scene container.
    pub fn new_retained(container: Box<dyn SceneContainer>) -> Self {
        Self {
            mode: RenderMode::Retained,
            direct: DirectRenderer::new(),
            retained: Some(RetainedBackend::new(container)),
            repaint_needed: true,
        }
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Whether a repaint was requested since the last `take`. Direct-mode
    /// hosts poll this to decide when to re-issue `draw`.
    pub fn take_repaint_request(&mut self) -> bool {
        std::mem::replace(&mut self.repaint_needed, false)
    }

    /// Marks all cached state stale: spatial index and pending repaint.
    pub fn invalidate(&mut self) {
        self.direct.invalidate_index();
        self.repaint_needed = true;
    }

    /// Access to the retained managers (testing/diagnostics).
    pub fn retained(&self) -> Option<&RetainedBackend> {
        self.retained.as_ref()
    }

    fn retained_mut(&mut self) -> Option<&mut RetainedBackend> {
        match self.mode {
            RenderMode::Retained => self.retained.as_mut(),
            RenderMode::Direct => None,
        }
    }

    /// Node moved.
    pub fn update_node_position<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        node_id: NodeId,
        ctx: FrameContext<'_>,
    ) {
        self.invalidate();
        let Some(backend) = self.retained_mut() else {
            return;
        };
        let model = GraphRenderModel::new(ctx.config, ctx.registry);
        let Some(node) = graph.nodes.get(node_id) else {
            // Node vanished: treat as removal.
            backend.nodes.remove_node(node_id, backend.container.as_mut());
            backend.handles.remove_node(node_id, backend.container.as_mut());
            return;
        };
        backend
            .nodes
            .update_node(node, &model, ctx.config, ctx.theme, backend.container.as_mut());
        if backend.handles.contains(node_id) {
            backend
                .handles
                .update_node(node, &model, ctx.config, ctx.theme, backend.container.as_mut());
        }
        // Connected edges follow the node.
        for (_, edge) in &graph.edges {
            if edge.source == node_id || edge.target == node_id {
                backend.edges.update_edge(
                    graph,
                    edge,
                    &model,
                    ctx.config,
                    ctx.theme,
                    ctx.registry,
                    backend.container.as_mut(),
                );
            }
        }
    }

    /// Node resized (explicit size change).
    pub fn update_node_size<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        node_id: NodeId,
        ctx: FrameContext<'_>,
    ) {
        // Same dependents as a move: body, handles, connected edges.
        self.update_node_position(graph, node_id, ctx);
    }

    /// Selection flag flipped on a node.
    pub fn update_node_selection<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        node_id: NodeId,
        ctx: FrameContext<'_>,
    ) {
        self.repaint_needed = true;
        let Some(backend) = self.retained_mut() else {
            return;
        };
        let model = GraphRenderModel::new(ctx.config, ctx.registry);
        backend.nodes.refresh_selection(
            graph,
            &model,
            ctx.config,
            ctx.theme,
            backend.container.as_mut(),
        );
        // Handle ring follows selection.
        match graph.nodes.get(node_id) {
            Some(node)
                if node.is_selected()
                    && node.flags.contains(NodeFlags::RESIZABLE)
                    && model.is_node_visible(graph, node) =>
            {
                backend
                    .handles
                    .update_node(node, &model, ctx.config, ctx.theme, backend.container.as_mut());
            }
            _ => backend.handles.remove_node(node_id, backend.container.as_mut()),
        }
    }

    /// Reposition the resize-handle ring of a node (mid-resize feedback).
    pub fn update_node_resize_handles<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        node_id: NodeId,
        ctx: FrameContext<'_>,
    ) {
        self.repaint_needed = true;
        let Some(backend) = self.retained_mut() else {
            return;
        };
        if let Some(node) = graph.nodes.get(node_id) {
            let model = GraphRenderModel::new(ctx.config, ctx.registry);
            backend
                .handles
                .update_node(node, &model, ctx.config, ctx.theme, backend.container.as_mut());
        }
    }

    /// Resize finished: body, ports, handles and connected edges settle.
    pub fn update_node_after_resize<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        node_id: NodeId,
        ctx: FrameContext<'_>,
    ) {
        self.update_node_size(graph, node_id, ctx);
        self.update_node_resize_handles(graph, node_id, ctx);
    }

    /// Node removed from the graph: drop its persistent visuals.
    pub fn remove_node_visuals(&mut self, node_id: NodeId) {
        self.invalidate();
        if let Some(backend) = self.retained_mut() {
            backend.nodes.remove_node(node_id, backend.container.as_mut());
            backend.handles.remove_node(node_id, backend.container.as_mut());
        }
    }

    /// Re-render every edge (topology or routing changed).
    pub fn render_edges<T: NodeData>(&mut self, graph: &GraphState<T>, ctx: FrameContext<'_>) {
        self.repaint_needed = true;
        let Some(backend) = self.retained_mut() else {
            return;
        };
        let model = GraphRenderModel::new(ctx.config, ctx.registry);
        backend.edges.sync(
            graph,
            &model,
            ctx.config,
            ctx.theme,
            ctx.registry,
            backend.container.as_mut(),
        );
    }

    /// Full refresh: everything re-synced from graph state.
    pub fn refresh<T: NodeData>(&mut self, graph: &GraphState<T>, ctx: FrameContext<'_>) {
        self.invalidate();
        let Some(backend) = self.retained_mut() else {
            return;
        };
        debug!("retained full refresh");
        let model = GraphRenderModel::new(ctx.config, ctx.registry);
        backend
            .nodes
            .sync(graph, &model, ctx.config, ctx.theme, backend.container.as_mut());
        backend.edges.sync(
            graph,
            &model,
            ctx.config,
            ctx.theme,
            ctx.registry,
            backend.container.as_mut(),
        );
        backend
            .handles
            .sync(graph, &model, ctx.config, ctx.theme, backend.container.as_mut());
        backend
            .nodes
            .refresh_selection(graph, &model, ctx.config, ctx.theme, backend.container.as_mut());
    }

    /// Direct-mode frame: emits the draw list. In retained mode this is a
    /// no-op returning an empty list — the scene container already holds
    /// the visuals.
    pub fn draw<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        view: &Viewport,
        ctx: FrameContext<'_>,
    ) -> RenderList {
        match self.mode {
            RenderMode::Direct => {
                self.repaint_needed = false;
                self.direct
                    .draw_graph(graph, view, ctx.config, ctx.theme, ctx.registry)
            }
            RenderMode::Retained => RenderList::new(),
        }
    }

    /// Hit test at a screen point, shared by both modes.
    pub fn hit_test<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        view: &Viewport,
        ctx: FrameContext<'_>,
        screen_point: Vec2,
    ) -> Option<HitTarget> {
        hit::hit_test(
            graph,
            view,
            ctx.config,
            ctx.registry,
            self.direct.spatial_mut(),
            screen_point,
        )
    }
}
