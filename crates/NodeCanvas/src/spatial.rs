//! # Spatial Index
//!
//! A rebuildable flat cache of canvas-space bounds for the currently
//! visible, non-group nodes. Hit-testing and culling scan it linearly with
//! early bounds rejection; the flat layout is deliberately simple and
//! cache-friendly for graphs in the low thousands of nodes.
//!
//! The index is dirty-flagged: any graph/topology mutation calls
//! `invalidate()`, and the next query lazily rebuilds. Entries snapshot
//! bounds at rebuild time, so a stale index is never half-updated.

use glam::Vec2;
use tracing::trace;

use crate::geometry::GraphRenderModel;
use crate::math::Rect;
use crate::model::{GraphState, NodeData, NodeId};

/// One snapshot entry: a visible non-group node and its canvas bounds.
#[derive(Clone, Copy, Debug)]
pub struct SpatialEntry {
    pub node: NodeId,
    pub bounds: Rect,
}

/// Dirty-flagged flat spatial cache.
#[derive(Debug)]
pub struct SpatialIndex {
    entries: Vec<SpatialEntry>,
    dirty: bool,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl SpatialIndex {
    /// A fresh index starts dirty so the first query builds it.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            dirty: true,
        }
    }

    /// Marks the cache stale. Call on any node add/remove, resize, or
    /// collapse-state change.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Rebuilds if dirty. Entries follow draw order (back to front), so a
    /// reverse scan visits topmost nodes first.
    pub fn ensure_built<T: NodeData>(
        &mut self,
        graph: &GraphState<T>,
        model: &GraphRenderModel<'_>,
    ) {
        if !self.dirty {
            return;
        }
        self.entries.clear();
        for &node_id in &graph.draw_order {
            let Some(node) = graph.nodes.get(node_id) else {
                continue;
            };
            if node.is_group() || !model.is_node_visible(graph, node) {
                continue;
            }
            self.entries.push(SpatialEntry {
                node: node_id,
                bounds: model.node_bounds(node),
            });
        }
        self.dirty = false;
        trace!(entries = self.entries.len(), "spatial index rebuilt");
    }

    /// All entries, back-to-front. Callers must `ensure_built` first.
    pub fn entries(&self) -> &[SpatialEntry] {
        &self.entries
    }

    /// Topmost node whose bounds contain `point` (canvas space), scanning
    /// front-to-back.
    pub fn node_at(&self, point: Vec2) -> Option<SpatialEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.bounds.contains(point))
            .copied()
    }

    /// Entries whose bounds intersect `region` (canvas space), in draw
    /// order.
    pub fn in_region<'s>(
        &'s self,
        region: Rect,
    ) -> impl Iterator<Item = SpatialEntry> + 's {
        self.entries
            .iter()
            .filter(move |entry| entry.bounds.intersects(&region))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CanvasConfig;
    use crate::model::{Node, NodeFlags};

    fn sized_node(pos: Vec2, size: Vec2) -> Node<String> {
        let mut node = Node::new(pos, "n".to_string());
        node.size = Some(size);
        node
    }

    #[test]
    fn rebuild_skips_groups_and_hidden() {
        let config = CanvasConfig::default();
        let registry_model = GraphRenderModel::new(&config, None);
        let mut graph: GraphState<String> = GraphState::default();

        let plain = graph.insert_node(sized_node(Vec2::ZERO, Vec2::new(100.0, 50.0)));
        let group = graph.insert_node(sized_node(Vec2::new(300.0, 0.0), Vec2::new(250.0, 150.0)));
        graph.nodes[group].flags.insert(NodeFlags::GROUP);
        let hidden = graph.insert_node(sized_node(Vec2::new(600.0, 0.0), Vec2::new(100.0, 50.0)));
        graph.nodes[hidden].flags.insert(NodeFlags::HIDDEN);

        let mut index = SpatialIndex::new();
        index.ensure_built(&graph, &registry_model);
        assert_eq!(index.entries().len(), 1);
        assert_eq!(index.entries()[0].node, plain);
    }

    #[test]
    fn topmost_wins_on_overlap() {
        let config = CanvasConfig::default();
        let model = GraphRenderModel::new(&config, None);
        let mut graph: GraphState<String> = GraphState::default();
        let below = graph.insert_node(sized_node(Vec2::ZERO, Vec2::new(100.0, 100.0)));
        let above = graph.insert_node(sized_node(Vec2::new(50.0, 50.0), Vec2::new(100.0, 100.0)));

        let mut index = SpatialIndex::new();
        index.ensure_built(&graph, &model);
        let hit = index.node_at(Vec2::new(75.0, 75.0)).unwrap();
        assert_eq!(hit.node, above);

        // Raising `below` flips the result after an invalidate+rebuild.
        graph.bring_to_front(below);
        index.invalidate();
        index.ensure_built(&graph, &model);
        let hit = index.node_at(Vec2::new(75.0, 75.0)).unwrap();
        assert_eq!(hit.node, below);
    }

    #[test]
    fn region_query_filters_by_bounds() {
        let config = CanvasConfig::default();
        let model = GraphRenderModel::new(&config, None);
        let mut graph: GraphState<String> = GraphState::default();
        let near = graph.insert_node(sized_node(Vec2::ZERO, Vec2::new(100.0, 50.0)));
        graph.insert_node(sized_node(Vec2::new(1000.0, 1000.0), Vec2::new(100.0, 50.0)));

        let mut index = SpatialIndex::new();
        index.ensure_built(&graph, &model);
        let region = crate::math::Rect::new(Vec2::new(-10.0, -10.0), Vec2::new(300.0, 300.0));
        let hits: Vec<_> = index.in_region(region).map(|e| e.node).collect();
        assert_eq!(hits, vec![near]);
    }

    #[test]
    fn stale_until_invalidated() {
        let config = CanvasConfig::default();
        let model = GraphRenderModel::new(&config, None);
        let mut graph: GraphState<String> = GraphState::default();
        graph.insert_node(sized_node(Vec2::ZERO, Vec2::new(100.0, 50.0)));

        let mut index = SpatialIndex::new();
        index.ensure_built(&graph, &model);
        assert_eq!(index.entries().len(), 1);

        graph.insert_node(sized_node(Vec2::new(200.0, 0.0), Vec2::new(100.0, 50.0)));
        // Without invalidation the snapshot is intentionally stale.
        index.ensure_built(&graph, &model);
        assert_eq!(index.entries().len(), 1);

        index.invalidate();
        index.ensure_built(&graph, &model);
        assert_eq!(index.entries().len(), 2);
    }
}
