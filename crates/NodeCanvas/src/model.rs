//! # Core Data Models
//!
//! The graph the renderers operate on. Entities live in flat arenas
//! (`SlotMap`) so references between them are stable keys rather than
//! pointers, and a key whose entity has been removed simply resolves to
//! `None` — a dangling edge is tolerated, not an error.
//!
//! The graph is generic over `T: NodeData` so consumers embed their own
//! payload; the payload's `node_type()` feeds the renderer registry.

use glam::Vec2;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;
use slotmap::new_key_type;
use std::collections::HashMap;

use bitflags::bitflags;

pub use uuid::Uuid;

/// Trait that user data must implement to be stored in the graph.
pub trait NodeData: Clone + std::fmt::Debug {
    /// Registry id (type tag) for this node, used for renderer dispatch.
    fn node_type(&self) -> String;
}

impl NodeData for String {
    fn node_type(&self) -> String {
        "Default".to_string()
    }
}

impl NodeData for () {
    fn node_type(&self) -> String {
        "Default".to_string()
    }
}

new_key_type! {
    /// Unique identifier for a Node.
    pub struct NodeId;
    /// Unique identifier for an Edge.
    pub struct EdgeId;
}

bitflags! {
    /// Boolean states of a Node.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct NodeFlags: u8 {
        /// The node is currently selected.
        const SELECTED = 1 << 0;
        /// The node is not rendered at all.
        const HIDDEN = 1 << 1;
        /// The node is a group container.
        const GROUP = 1 << 2;
        /// Group only: children are hidden, node renders as a compact header.
        const COLLAPSED = 1 << 3;
        /// The node shows resize handles when selected.
        const RESIZABLE = 1 << 4;
        /// The node can be picked by hit-testing.
        const SELECTABLE = 1 << 5;
        /// The node may be deleted by editing commands.
        const DELETABLE = 1 << 6;
        /// The node cannot be moved.
        const LOCKED = 1 << 7;
    }
}

impl Default for NodeFlags {
    fn default() -> Self {
        NodeFlags::RESIZABLE | NodeFlags::SELECTABLE | NodeFlags::DELETABLE
    }
}

// Serialize flags as their raw bits; unknown bits are dropped on read.
impl Serialize for NodeFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for NodeFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}

bitflags! {
    /// Boolean states of an Edge.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct EdgeFlags: u8 {
        /// The edge is currently selected.
        const SELECTED = 1 << 0;
    }
}

impl Serialize for EdgeFlags {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.bits())
    }
}

impl<'de> Deserialize<'de> for EdgeFlags {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bits = u8::deserialize(deserializer)?;
        Ok(Self::from_bits_truncate(bits))
    }
}

/// Which node edge a port sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PortSide {
    Left,
    Right,
    Top,
    Bottom,
}

/// Input or output, from the owning node's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    /// The side a port defaults to when it does not declare one.
    pub fn default_side(self) -> PortSide {
        match self {
            PortDirection::Input => PortSide::Left,
            PortDirection::Output => PortSide::Right,
        }
    }
}

/// A Port on a Node.
///
/// Ports are owned in-line by their node (ordered lists). Edges reference
/// them by string id; resolution happens by scanning the owning node's
/// list, and an unknown id falls back to index 0.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Port {
    /// String id edges use to reference this port.
    pub id: String,
    /// Declared side; `None` defaults by direction (outputs Right, inputs Left).
    pub side: Option<PortSide>,
    /// Display label.
    pub label: String,
}

impl Port {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            side: None,
            label: String::new(),
        }
    }

    pub fn with_side(id: impl Into<String>, side: PortSide) -> Self {
        Self {
            id: id.into(),
            side: Some(side),
            label: String::new(),
        }
    }
}

/// Visual shape of an edge's path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EdgeKind {
    Straight,
    Step,
    SmoothStep,
    Bezier,
}

/// Marker drawn at an edge endpoint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarkerKind {
    #[default]
    None,
    Arrow,
    ArrowClosed,
}

/// Where along the edge an explicit label anchors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelAnchor {
    Start,
    #[default]
    Center,
    End,
}

/// Label attached to an edge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EdgeLabel {
    pub text: String,
    pub anchor: LabelAnchor,
    /// Explicit offset from the anchor point, canvas units. When `None`,
    /// placement is automatic by edge direction.
    pub offset: Option<Vec2>,
    /// Offset perpendicular to the edge's local tangent, canvas units.
    pub perpendicular_offset: f32,
}

impl EdgeLabel {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            anchor: LabelAnchor::default(),
            offset: None,
            perpendicular_offset: 0.0,
        }
    }
}

/// Stroke dash pattern for edges.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum DashPattern {
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
    LongDash,
    /// On/off run lengths in canvas units.
    Custom(Vec<f32>),
}

impl DashPattern {
    /// On/off intervals, or `None` for a solid stroke.
    pub fn intervals(&self) -> Option<Vec<f32>> {
        match self {
            DashPattern::Solid => None,
            DashPattern::Dash => Some(vec![6.0, 4.0]),
            DashPattern::Dot => Some(vec![1.5, 3.0]),
            DashPattern::DashDot => Some(vec![6.0, 3.0, 1.5, 3.0]),
            DashPattern::LongDash => Some(vec![12.0, 6.0]),
            DashPattern::Custom(runs) => {
                if runs.is_empty() {
                    None
                } else {
                    Some(runs.clone())
                }
            }
        }
    }
}

/// How a glow effect is realized by the retained backend.
///
/// `BackgroundPath` draws a wider translucent copy of the edge path behind
/// it. `DropShadow` asks the scene container for a platform shadow, which
/// some engines composite incorrectly with markers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GlowMode {
    #[default]
    BackgroundPath,
    DropShadow,
}

/// Optional glow around an edge stroke.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GlowStyle {
    pub color: glam::Vec4,
    /// Extra stroke width on each side, canvas units.
    pub radius: f32,
    #[serde(default)]
    pub mode: GlowMode,
}

/// Per-edge visual override.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub color: glam::Vec4,
    pub width: f32,
    pub opacity: f32,
    #[serde(default)]
    pub dash: DashPattern,
    pub glow: Option<GlowStyle>,
}

impl Default for EdgeStyle {
    fn default() -> Self {
        Self {
            color: glam::Vec4::new(0.8, 0.8, 0.8, 1.0),
            width: 2.0,
            opacity: 1.0,
            dash: DashPattern::Solid,
            glow: None,
        }
    }
}

/// A Node in the graph.
///
/// Groups are nodes with the `GROUP` flag; a collapsed group hides every
/// descendant and renders as a compact header.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node<T> {
    /// Self-reference ID.
    pub id: NodeId,
    /// Stable UUID for persistence on the host side.
    pub uuid: Uuid,
    /// Canvas-space position of the top-left corner.
    pub position: Vec2,
    /// Explicit size. `None` defers to the type renderer, then config defaults.
    pub size: Option<Vec2>,
    /// Ordered input ports.
    pub inputs: Vec<Port>,
    /// Ordered output ports.
    pub outputs: Vec<Port>,
    /// Containing group, if any. Weak: a missing parent ends the ancestor walk.
    pub parent_group: Option<NodeId>,
    /// Display label.
    pub label: String,
    /// User-defined payload; `node_type()` keys renderer dispatch.
    pub data: T,
    /// State flags.
    pub flags: NodeFlags,
    /// Optional visual override.
    pub style: Option<crate::theme::NodeStyle>,
}

impl<T: NodeData> Node<T> {
    /// Convenience constructor; the arena overwrites `id` on insert.
    pub fn new(position: Vec2, data: T) -> Self {
        Self {
            id: NodeId::default(),
            uuid: Uuid::new_v4(),
            position,
            size: None,
            inputs: Vec::new(),
            outputs: Vec::new(),
            parent_group: None,
            label: String::new(),
            data,
            flags: NodeFlags::default(),
            style: None,
        }
    }

    pub fn is_group(&self) -> bool {
        self.flags.contains(NodeFlags::GROUP)
    }

    pub fn is_collapsed(&self) -> bool {
        self.flags.contains(NodeFlags::COLLAPSED)
    }

    pub fn is_selected(&self) -> bool {
        self.flags.contains(NodeFlags::SELECTED)
    }

    /// Looks up a port by direction and string id.
    pub fn port(&self, direction: PortDirection, id: &str) -> Option<(usize, &Port)> {
        let list = match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        };
        list.iter().enumerate().find(|(_, p)| p.id == id)
    }
}

/// An Edge between two node ports.
///
/// Node references are weak arena keys; port references are string ids
/// resolved against the node's port list each time they are needed.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Edge {
    /// Self-reference ID.
    pub id: EdgeId,
    /// Source node (output side).
    pub source: NodeId,
    /// Target node (input side).
    pub target: NodeId,
    /// Port id on the source node's outputs. Unknown id falls back to index 0.
    pub source_port: String,
    /// Port id on the target node's inputs. Unknown id falls back to index 0.
    pub target_port: String,
    /// Path shape.
    pub kind: EdgeKind,
    /// Intermediate routing points in canvas space, produced by an external
    /// router or manual dragging. Consumed purely as path vertices.
    #[serde(default)]
    pub waypoints: Vec<Vec2>,
    /// State flags.
    #[serde(default)]
    pub flags: EdgeFlags,
    #[serde(default)]
    pub marker_start: MarkerKind,
    #[serde(default)]
    pub marker_end: MarkerKind,
    pub label: Option<EdgeLabel>,
    /// Optional visual override.
    pub style: Option<EdgeStyle>,
    /// Tag of a registered custom edge renderer; `None` = built-in paths.
    #[serde(default)]
    pub renderer: Option<String>,
}

impl Edge {
    pub fn new(source: NodeId, source_port: impl Into<String>, target: NodeId, target_port: impl Into<String>) -> Self {
        Self {
            id: EdgeId::default(),
            source,
            target,
            source_port: source_port.into(),
            target_port: target_port.into(),
            kind: EdgeKind::Bezier,
            waypoints: Vec::new(),
            flags: EdgeFlags::default(),
            marker_start: MarkerKind::None,
            marker_end: MarkerKind::None,
            label: None,
            style: None,
            renderer: None,
        }
    }

    pub fn is_selected(&self) -> bool {
        self.flags.contains(EdgeFlags::SELECTED)
    }
}

/// External routing collaborator.
///
/// Producing waypoints is somebody else's job (auto-routing, manual drag
/// handles); this core only consumes `Edge::waypoints` as opaque path
/// vertices. Hosts that auto-route implement this and write the result
/// back into the edge before rendering.
pub trait EdgeRouter<T: NodeData> {
    /// Ordered intermediate points the edge must pass through, canvas
    /// space, excluding the port endpoints.
    fn route_edge(&self, graph: &GraphState<T>, edge: &Edge) -> Vec<Vec2>;
}

/// The entire graph state.
///
/// Flat arenas plus a draw-order cache (lower index = background) and an
/// O(1) UUID index. Storage only; geometry and rendering live elsewhere.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphState<T> {
    /// Arena for Nodes.
    pub nodes: SlotMap<NodeId, Node<T>>,
    /// Arena for Edges.
    pub edges: SlotMap<EdgeId, Edge>,
    /// Draw order cache. Lower index = background, higher = foreground.
    pub draw_order: Vec<NodeId>,
    /// Index for O(1) UUID to NodeId lookup.
    #[serde(default, skip)]
    pub uuid_index: HashMap<Uuid, NodeId>,
}

impl<T> Default for GraphState<T> {
    fn default() -> Self {
        Self {
            nodes: SlotMap::with_key(),
            edges: SlotMap::with_key(),
            draw_order: Vec::new(),
            uuid_index: HashMap::new(),
        }
    }
}

impl<T: NodeData> GraphState<T> {
    /// Inserts a node, fixing up its self-id, draw order and UUID index.
    pub fn insert_node(&mut self, mut node: Node<T>) -> NodeId {
        let id = self.nodes.insert_with_key(|key| {
            node.id = key;
            node
        });
        let uuid = self.nodes[id].uuid;
        self.uuid_index.insert(uuid, id);
        self.draw_order.push(id);
        id
    }

    /// Removes a node and its bookkeeping entries. Edges referencing the
    /// node stay in the arena and are skipped at render time until the
    /// host cleans them up.
    pub fn remove_node(&mut self, id: NodeId) -> Option<Node<T>> {
        let node = self.nodes.remove(id)?;
        self.uuid_index.remove(&node.uuid);
        self.draw_order.retain(|&n| n != id);
        Some(node)
    }

    /// Inserts an edge, fixing up its self-id.
    pub fn insert_edge(&mut self, mut edge: Edge) -> EdgeId {
        self.edges.insert_with_key(|key| {
            edge.id = key;
            edge
        })
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Option<Edge> {
        self.edges.remove(id)
    }

    /// Moves a node to the end of the draw order (front of the z-stack).
    pub fn bring_to_front(&mut self, id: NodeId) {
        self.draw_order.retain(|&n| n != id);
        self.draw_order.push(id);
    }

    /// Rebuilds the UUID index after deserialization.
    pub fn rebuild_uuid_index(&mut self) {
        self.uuid_index.clear();
        for (id, node) in &self.nodes {
            self.uuid_index.insert(node.uuid, id);
        }
    }

    /// Iterates nodes in draw order, skipping stale ids.
    pub fn nodes_in_draw_order(&self) -> impl Iterator<Item = &Node<T>> {
        self.draw_order.iter().filter_map(|&id| self.nodes.get(id))
    }
}
