//! # NodeCanvas
//!
//! `node_canvas` is a headless rendering and hit-testing core for
//! node-graph editors. It owns the geometry model, spatial indexing,
//! viewport culling and level-of-detail, and feeds two interchangeable
//! rendering backends from one source of truth, while the host
//! application keeps the window, input plumbing and pixel pipeline.
//!
//! ## Core Architecture
//! - **Model (`src/model.rs`)**: graph state in flat arenas (SlotMap).
//! - **Geometry (`src/geometry.rs`)**: pure canvas-space geometry — bounds,
//!   ports, edge endpoints, visibility, hit predicates. Both backends
//!   consume it, so they can never disagree about where things are.
//! - **Painter (`src/painter.rs`)**: immediate mode — outputs a
//!   `DrawCommand` list per frame for the host to rasterize.
//! - **Scene (`src/scene.rs`)**: retained mode — persistent per-element
//!   visuals in a host scene container, mutated incrementally.
//! - **Service (`src/service.rs`)**: the facade interaction code talks to;
//!   it routes each update to whichever backend is active.

pub mod config;
pub mod error;
pub mod geometry;
pub mod hit;
pub mod math;
pub mod model;
pub mod painter;
pub mod path;
pub mod registry;
pub mod render;
pub mod scene;
pub mod service;
pub mod spatial;
pub mod theme;
pub mod view;

use glam::Vec2;

use model::{GraphState, NodeData, NodeId};
use render::RenderList;

// Re-exports for convenience
pub use config::CanvasConfig;
pub use error::CanvasError;
pub use hit::HitTarget;
pub use registry::RendererRegistry;
pub use scene::SceneContainer;
pub use service::{FrameContext, RenderMode, RenderService};
pub use theme::Theme;
pub use view::Viewport;

/// The main entry point for the library.
///
/// `GraphCanvas` bundles the collaborators one canvas surface needs —
/// settings, viewport, theme, renderer registry and the render service —
/// and forwards the service API with those collaborators filled in. It is
/// intended to be instantiated once per surface and reused.
pub struct GraphCanvas {
    /// Configuration settings.
    pub config: CanvasConfig,
    /// The viewport handling canvas<->screen transforms.
    pub view: Viewport,
    /// Active theme colors.
    pub theme: Theme,
    /// Custom node/edge renderer registry.
    pub registry: RendererRegistry,
    /// The mode-dispatching render service.
    pub service: RenderService,
}

impl GraphCanvas {
    /// Creates a direct-mode (immediate) canvas.
    pub fn new(config: CanvasConfig) -> Result<Self, CanvasError> {
        config.validate()?;
        Ok(Self {
            config,
            view: Viewport::default(),
            theme: Theme::default(),
            registry: RendererRegistry::new(),
            service: RenderService::new_direct(),
        })
    }

    /// Creates a retained-mode canvas over a host scene container.
    pub fn new_retained(
        config: CanvasConfig,
        container: Box<dyn SceneContainer>,
    ) -> Result<Self, CanvasError> {
        config.validate()?;
        Ok(Self {
            config,
            view: Viewport::default(),
            theme: Theme::default(),
            registry: RendererRegistry::new(),
            service: RenderService::new_retained(container),
        })
    }

    /// Updates the viewport size (e.g., on window resize).
    pub fn update_viewport_size(&mut self, size: Vec2) {
        self.view.size = size;
    }

    /// Swaps the theme, bumping the generation so cached styles rebuild.
    pub fn set_theme(&mut self, mut theme: Theme) {
        theme.generation = self.theme.generation.wrapping_add(1);
        self.theme = theme;
        self.service.invalidate();
    }

    /// Direct-mode frame: the draw list for the host to render. Empty in
    /// retained mode (the scene container already holds the visuals).
    pub fn draw<T: NodeData>(&mut self, graph: &GraphState<T>) -> RenderList {
        let ctx = FrameContext {
            config: &self.config,
            theme: &self.theme,
            registry: Some(&self.registry),
        };
        self.service.draw(graph, &self.view, ctx)
    }

    /// Hit test at a screen point.
    pub fn hit_test<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        screen_point: Vec2,
    ) -> Option<HitTarget> {
        let ctx = FrameContext {
            config: &self.config,
            theme: &self.theme,
            registry: Some(&self.registry),
        };
        self.service.hit_test(graph, &self.view, ctx, screen_point)
    }

    pub fn update_node_position<T: NodeData>(&mut self, graph: &GraphState<T>, node: NodeId) {
        let ctx = FrameContext {
            config: &self.config,
            theme: &self.theme,
            registry: Some(&self.registry),
        };
        self.service.update_node_position(graph, node, ctx);
    }

    pub fn update_node_size<T: NodeData>(&mut self, graph: &GraphState<T>, node: NodeId) {
        let ctx = FrameContext {
            config: &self.config,
            theme: &self.theme,
            registry: Some(&self.registry),
        };
        self.service.update_node_size(graph, node, ctx);
    }

    pub fn update_node_selection<T: NodeData>(&mut self, graph: &GraphState<T>, node: NodeId) {
        let ctx = FrameContext {
            config: &self.config,
            theme: &self.theme,
            registry: Some(&self.registry),
        };
        self.service.update_node_selection(graph, node, ctx);
    }

    pub fn update_node_after_resize<T: NodeData>(&mut self, graph: &GraphState<T>, node: NodeId) {
        let ctx = FrameContext {
            config: &self.config,
            theme: &self.theme,
            registry: Some(&self.registry),
        };
        self.service.update_node_after_resize(graph, node, ctx);
    }

    pub fn render_edges<T: NodeData>(&mut self, graph: &GraphState<T>) {
        let ctx = FrameContext {
            config: &self.config,
            theme: &self.theme,
            registry: Some(&self.registry),
        };
        self.service.render_edges(graph, ctx);
    }

    pub fn refresh<T: NodeData>(&mut self, graph: &GraphState<T>) {
        let ctx = FrameContext {
            config: &self.config,
            theme: &self.theme,
            registry: Some(&self.registry),
        };
        self.service.refresh(graph, ctx);
    }

    /// Marks cached render state stale after external graph mutation.
    pub fn invalidate(&mut self) {
        self.service.invalidate();
    }
}
