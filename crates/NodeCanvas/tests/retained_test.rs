use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec2;
use node_canvas::model::{
    DashPattern, Edge, EdgeKind, EdgeLabel, EdgeStyle, GlowMode, GlowStyle, GraphState, Node,
    NodeFlags, Port,
};
use node_canvas::scene::{SceneContainer, VisualId, VisualSpec};
use node_canvas::{CanvasConfig, GraphCanvas};

/// Scene container double: stores specs by id and counts operations.
#[derive(Default)]
struct MockSceneInner {
    next_id: VisualId,
    visuals: HashMap<VisualId, VisualSpec>,
    adds: usize,
    updates: usize,
    removes: usize,
}

#[derive(Clone, Default)]
struct MockScene(Rc<RefCell<MockSceneInner>>);

impl SceneContainer for MockScene {
    fn add(&mut self, spec: VisualSpec) -> VisualId {
        let mut inner = self.0.borrow_mut();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.visuals.insert(id, spec);
        inner.adds += 1;
        id
    }

    fn update(&mut self, id: VisualId, spec: VisualSpec) {
        let mut inner = self.0.borrow_mut();
        assert!(inner.visuals.contains_key(&id), "update of unknown visual");
        inner.visuals.insert(id, spec);
        inner.updates += 1;
    }

    fn remove(&mut self, id: VisualId) {
        let mut inner = self.0.borrow_mut();
        assert!(
            inner.visuals.remove(&id).is_some(),
            "remove of unknown visual"
        );
        inner.removes += 1;
    }
}

fn retained_canvas() -> (GraphCanvas, MockScene) {
    let scene = MockScene::default();
    let canvas =
        GraphCanvas::new_retained(CanvasConfig::default(), Box::new(scene.clone())).unwrap();
    (canvas, scene)
}

fn ported_node(pos: Vec2) -> Node<String> {
    let mut node = Node::new(pos, "node".to_string());
    node.size = Some(Vec2::new(150.0, 80.0));
    node.inputs.push(Port::new("in"));
    node.outputs.push(Port::new("out"));
    node
}

fn linked_graph() -> (GraphState<String>, node_canvas::model::NodeId, node_canvas::model::NodeId, node_canvas::model::EdgeId)
{
    let mut graph: GraphState<String> = GraphState::default();
    let a = graph.insert_node(ported_node(Vec2::new(0.0, 0.0)));
    let b = graph.insert_node(ported_node(Vec2::new(300.0, 0.0)));
    let edge = graph.insert_edge(Edge::new(a, "out", b, "in"));
    (graph, a, b, edge)
}

#[test]
fn test_refresh_creates_visuals() {
    let (mut canvas, scene) = retained_canvas();
    let (graph, ..) = linked_graph();

    canvas.refresh(&graph);

    // 2 node bodies + 2x2 ports + 1 edge path. Labels are empty, no
    // selection, no markers.
    let inner = scene.0.borrow();
    assert_eq!(inner.visuals.len(), 7);

    let paths = inner
        .visuals
        .values()
        .filter(|spec| matches!(spec, VisualSpec::Path { .. }))
        .count();
    assert_eq!(paths, 1);
}

#[test]
fn test_refresh_is_idempotent_on_ids() {
    let (mut canvas, scene) = retained_canvas();
    let (graph, ..) = linked_graph();

    canvas.refresh(&graph);
    let count_after_first = scene.0.borrow().visuals.len();
    let adds_after_first = scene.0.borrow().adds;

    // A second refresh mutates in place: no new visuals.
    canvas.refresh(&graph);
    assert_eq!(scene.0.borrow().visuals.len(), count_after_first);
    assert_eq!(scene.0.borrow().adds, adds_after_first);
}

#[test]
fn test_node_move_updates_dependents() {
    let (mut canvas, scene) = retained_canvas();
    let (mut graph, a, ..) = linked_graph();
    canvas.refresh(&graph);

    let updates_before = scene.0.borrow().updates;
    graph.nodes[a].position += Vec2::new(40.0, 10.0);
    canvas.update_node_position(&graph, a);

    let inner = scene.0.borrow();
    // No structural churn, only in-place updates.
    assert_eq!(inner.visuals.len(), 7);
    assert!(inner.updates > updates_before);

    // The node body rect moved with the model.
    let moved = inner.visuals.values().any(|spec| match spec {
        VisualSpec::Rect { rect, .. } => rect.min == Vec2::new(40.0, 10.0),
        _ => false,
    });
    assert!(moved, "body visual should track the node position");
}

#[test]
fn test_selection_diff_touches_only_changed() {
    let (mut canvas, scene) = retained_canvas();
    let (mut graph, a, ..) = linked_graph();
    canvas.refresh(&graph);

    let updates_before = scene.0.borrow().updates;
    let adds_before = scene.0.borrow().adds;

    graph.nodes[a].flags.insert(NodeFlags::SELECTED);
    canvas.update_node_selection(&graph, a);

    let inner = scene.0.borrow();
    // Exactly one body restyled, plus the 8-handle ring appearing.
    assert_eq!(inner.updates, updates_before + 1);
    assert_eq!(inner.adds, adds_before + 8);
}

#[test]
fn test_deselection_removes_handles() {
    let (mut canvas, scene) = retained_canvas();
    let (mut graph, a, ..) = linked_graph();
    canvas.refresh(&graph);

    graph.nodes[a].flags.insert(NodeFlags::SELECTED);
    canvas.update_node_selection(&graph, a);
    let removes_before = scene.0.borrow().removes;

    graph.nodes[a].flags.remove(NodeFlags::SELECTED);
    canvas.update_node_selection(&graph, a);

    let inner = scene.0.borrow();
    assert_eq!(inner.removes, removes_before + 8);
}

#[test]
fn test_removal_is_atomic() {
    let (mut canvas, scene) = retained_canvas();
    let (mut graph, a, ..) = linked_graph();
    canvas.refresh(&graph);
    assert_eq!(scene.0.borrow().visuals.len(), 7);

    // Node A goes away; its visuals AND the now-dangling edge's must all
    // leave the container (the mock panics on double-remove, so this also
    // proves bookkeeping stays consistent).
    graph.remove_node(a);
    canvas.refresh(&graph);

    let inner = scene.0.borrow();
    // Remaining: node B body + its 2 ports.
    assert_eq!(inner.visuals.len(), 3);
}

#[test]
fn test_glow_background_path() {
    let (mut canvas, scene) = retained_canvas();
    let (mut graph, _, _, edge) = linked_graph();
    graph.edges[edge].style = Some(EdgeStyle {
        glow: Some(GlowStyle {
            color: glam::Vec4::new(0.2, 0.6, 1.0, 0.5),
            radius: 4.0,
            mode: GlowMode::BackgroundPath,
        }),
        ..EdgeStyle::default()
    });

    canvas.refresh(&graph);

    let inner = scene.0.borrow();
    let path_specs: Vec<_> = inner
        .visuals
        .values()
        .filter_map(|spec| match spec {
            VisualSpec::Path {
                stroke_width,
                shadow,
                ..
            } => Some((*stroke_width, *shadow)),
            _ => None,
        })
        .collect();
    // Glow underlay + main stroke, both shadow-free (the background-path
    // variant avoids the platform shadow entirely).
    assert_eq!(path_specs.len(), 2);
    assert!(path_specs.iter().all(|(_, shadow)| shadow.is_none()));
    let widths: Vec<f32> = path_specs.iter().map(|(w, _)| *w).collect();
    assert!(widths.contains(&2.0));
    assert!(widths.contains(&10.0)); // 2.0 + 4.0 * 2
}

#[test]
fn test_glow_drop_shadow_variant() {
    let (mut canvas, scene) = retained_canvas();
    let (mut graph, _, _, edge) = linked_graph();
    graph.edges[edge].style = Some(EdgeStyle {
        glow: Some(GlowStyle {
            color: glam::Vec4::new(1.0, 0.0, 0.0, 0.4),
            radius: 3.0,
            mode: GlowMode::DropShadow,
        }),
        ..EdgeStyle::default()
    });

    canvas.refresh(&graph);

    let inner = scene.0.borrow();
    let shadows: Vec<_> = inner
        .visuals
        .values()
        .filter_map(|spec| match spec {
            VisualSpec::Path { shadow, .. } => Some(*shadow),
            _ => None,
        })
        .collect();
    // A single path, carrying the platform shadow.
    assert_eq!(shadows.len(), 1);
    assert!(shadows[0].is_some());
}

#[test]
fn test_dash_pattern_forwarded() {
    let (mut canvas, scene) = retained_canvas();
    let (mut graph, _, _, edge) = linked_graph();
    graph.edges[edge].style = Some(EdgeStyle {
        dash: DashPattern::DashDot,
        ..EdgeStyle::default()
    });

    canvas.refresh(&graph);

    let inner = scene.0.borrow();
    let dash = inner.visuals.values().find_map(|spec| match spec {
        VisualSpec::Path { dash, .. } => dash.clone(),
        _ => None,
    });
    assert_eq!(dash, Some(vec![6.0, 3.0, 1.5, 3.0]));
}

#[test]
fn test_horizontal_edge_label_auto_places_above() {
    let (mut canvas, scene) = retained_canvas();
    let (mut graph, _, _, edge) = linked_graph();
    graph.edges[edge].kind = EdgeKind::Straight;
    graph.edges[edge].label = Some(EdgeLabel::new("weight"));

    canvas.refresh(&graph);

    let inner = scene.0.borrow();
    let label_pos = inner.visuals.values().find_map(|spec| match spec {
        VisualSpec::Text { pos, text, .. } if text == "weight" => Some(*pos),
        _ => None,
    });
    // The edge runs horizontally along y = 40; the automatic placement
    // lifts the label above the line at the center anchor.
    let pos = label_pos.expect("edge label visual");
    assert!(pos.y < 40.0);
    assert!((pos.x - 225.0).abs() < 2.0);
}

#[test]
fn test_perpendicular_offset_rotates_with_edge() {
    let (mut canvas, scene) = retained_canvas();
    let (mut graph, _, _, edge) = linked_graph();
    graph.edges[edge].kind = EdgeKind::Straight;
    let mut label = EdgeLabel::new("w");
    label.offset = Some(Vec2::ZERO);
    label.perpendicular_offset = 20.0;
    graph.edges[edge].label = Some(label);

    canvas.refresh(&graph);

    let inner = scene.0.borrow();
    let pos = inner
        .visuals
        .values()
        .find_map(|spec| match spec {
            VisualSpec::Text { pos, .. } => Some(*pos),
            _ => None,
        })
        .expect("label visual");
    // Edge tangent is +X, so the perpendicular offset moves the label
    // along +Y (glam's counter-clockwise perp in a y-down canvas).
    assert!((pos.x - 225.0).abs() < 1e-3);
    assert!((pos.y - 60.0).abs() < 1e-3);
}
