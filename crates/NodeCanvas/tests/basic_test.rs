use glam::Vec2;
use node_canvas::model::{Edge, EdgeKind, GraphState, MarkerKind, Node, Port};
use node_canvas::render::DrawCommand;
use node_canvas::path::PathVerb;
use node_canvas::{CanvasConfig, GraphCanvas};

fn sized_node(pos: Vec2, size: Vec2) -> Node<String> {
    let mut node = Node::new(pos, "Test Node".to_string());
    node.size = Some(size);
    node
}

#[test]
fn test_basic_rendering() {
    // 1. Setup Graph
    let mut graph: GraphState<String> = GraphState::default();
    graph.insert_node(sized_node(Vec2::new(100.0, 100.0), Vec2::new(100.0, 50.0)));

    // 2. Setup Canvas
    let mut canvas = GraphCanvas::new(CanvasConfig::default()).unwrap();

    // 3. Draw
    let draw_list = canvas.draw(&graph);
    assert!(!draw_list.is_empty(), "Draw list should not be empty");

    // 4. Verify: default zoom 1.0, offset (0,0) -> node rect at (100,100).
    // Grid lines come first; find the Rect.
    let rect_cmd = draw_list
        .iter()
        .find(|cmd| matches!(cmd, DrawCommand::Rect { .. }));

    match rect_cmd {
        Some(DrawCommand::Rect { pos, size, .. }) => {
            assert_eq!(*pos, Vec2::new(100.0, 100.0));
            assert_eq!(*size, Vec2::new(100.0, 50.0));
        }
        _ => panic!("Expected Rect command not found in draw_list"),
    }
}

#[test]
fn test_pan_zoom_projection() {
    let mut graph: GraphState<String> = GraphState::default();
    graph.insert_node(sized_node(Vec2::new(100.0, 100.0), Vec2::new(100.0, 50.0)));

    let mut canvas = GraphCanvas::new(CanvasConfig::default()).unwrap();
    canvas.view.zoom = 2.0;
    canvas.view.offset = Vec2::new(50.0, 20.0);

    let draw_list = canvas.draw(&graph);
    let rect_cmd = draw_list
        .iter()
        .find(|cmd| matches!(cmd, DrawCommand::Rect { .. }));
    match rect_cmd {
        Some(DrawCommand::Rect { pos, size, .. }) => {
            // screen = canvas * zoom + offset
            assert_eq!(*pos, Vec2::new(250.0, 220.0));
            assert_eq!(*size, Vec2::new(200.0, 100.0));
        }
        _ => panic!("Expected Rect command"),
    }
}

#[test]
fn test_screen_canvas_round_trip() {
    let mut canvas = GraphCanvas::new(CanvasConfig::default()).unwrap();
    canvas.view.zoom = 0.37;
    canvas.view.offset = Vec2::new(-312.5, 81.25);

    for p in [
        Vec2::new(0.0, 0.0),
        Vec2::new(123.4, -567.8),
        Vec2::new(-9999.0, 12345.0),
    ] {
        let back = canvas.view.screen_to_canvas(canvas.view.canvas_to_screen(p));
        assert!((back - p).length() < 1e-2, "{p:?} -> {back:?}");
    }
}

/// End-to-end: two nodes, one bezier edge, default viewport. The curve
/// must leave A's output at (150,40), land on B's input at (300,40), and
/// both control points coincide at (225,40) for this spacing.
#[test]
fn test_bezier_edge_end_to_end() {
    let mut graph: GraphState<String> = GraphState::default();

    let mut a = sized_node(Vec2::new(0.0, 0.0), Vec2::new(150.0, 80.0));
    a.outputs.push(Port::new("out"));
    let a = graph.insert_node(a);

    let mut b = sized_node(Vec2::new(300.0, 0.0), Vec2::new(150.0, 80.0));
    b.inputs.push(Port::new("in"));
    let b = graph.insert_node(b);

    let mut edge = Edge::new(a, "out", b, "in");
    edge.kind = EdgeKind::Bezier;
    graph.insert_edge(edge);

    let mut canvas = GraphCanvas::new(CanvasConfig::default()).unwrap();
    let draw_list = canvas.draw(&graph);

    let path_cmd = draw_list
        .iter()
        .find(|cmd| matches!(cmd, DrawCommand::Path { .. }));
    match path_cmd {
        Some(DrawCommand::Path { path, .. }) => {
            assert_eq!(path.verbs[0], PathVerb::MoveTo(Vec2::new(150.0, 40.0)));
            assert_eq!(
                path.verbs[1],
                PathVerb::CubicTo(
                    Vec2::new(225.0, 40.0),
                    Vec2::new(225.0, 40.0),
                    Vec2::new(300.0, 40.0),
                )
            );
        }
        _ => panic!("Expected edge Path command"),
    }
}

#[test]
fn test_markers_emitted() {
    let mut graph: GraphState<String> = GraphState::default();

    let mut a = sized_node(Vec2::new(0.0, 0.0), Vec2::new(150.0, 80.0));
    a.outputs.push(Port::new("out"));
    let a = graph.insert_node(a);
    let mut b = sized_node(Vec2::new(300.0, 0.0), Vec2::new(150.0, 80.0));
    b.inputs.push(Port::new("in"));
    let b = graph.insert_node(b);

    let mut edge = Edge::new(a, "out", b, "in");
    edge.marker_end = MarkerKind::ArrowClosed;
    graph.insert_edge(edge);

    let mut canvas = GraphCanvas::new(CanvasConfig::default()).unwrap();
    let draw_list = canvas.draw(&graph);

    let paths: Vec<_> = draw_list
        .iter()
        .filter_map(|cmd| match cmd {
            DrawCommand::Path { fill_color, .. } => Some(fill_color),
            _ => None,
        })
        .collect();
    // Edge stroke plus one closed (filled) marker.
    assert_eq!(paths.len(), 2);
    assert!(paths[0].is_none());
    assert!(paths[1].is_some());
}

#[test]
fn test_repaint_request_lifecycle() {
    let mut graph: GraphState<String> = GraphState::default();
    let id = graph.insert_node(sized_node(Vec2::ZERO, Vec2::new(100.0, 50.0)));

    let mut canvas = GraphCanvas::new(CanvasConfig::default()).unwrap();

    // A fresh service starts dirty.
    assert!(canvas.service.take_repaint_request());
    assert!(!canvas.service.take_repaint_request());

    // In direct mode every facade mutation collapses to a repaint request.
    canvas.update_node_position(&graph, id);
    assert!(canvas.service.take_repaint_request());

    canvas.update_node_selection(&graph, id);
    assert!(canvas.service.take_repaint_request());

    canvas.render_edges(&graph);
    assert!(canvas.service.take_repaint_request());

    // Drawing clears the pending flag.
    canvas.refresh(&graph);
    canvas.draw(&graph);
    assert!(!canvas.service.take_repaint_request());
}

#[test]
fn test_theme_swap_rebuilds_cached_styles() {
    let mut graph: GraphState<String> = GraphState::default();
    graph.insert_node(sized_node(Vec2::new(100.0, 100.0), Vec2::new(100.0, 50.0)));

    let mut canvas = GraphCanvas::new(CanvasConfig::default()).unwrap();
    canvas.draw(&graph);

    // Swap in a theme with a new node fill; the style cache must follow.
    let mut theme = node_canvas::Theme::default();
    theme.node.fill = glam::Vec4::new(0.9, 0.1, 0.1, 1.0);
    canvas.set_theme(theme);

    let draw_list = canvas.draw(&graph);
    let fill = draw_list.iter().find_map(|cmd| match cmd {
        DrawCommand::Rect { color, .. } => Some(*color),
        _ => None,
    });
    assert_eq!(fill, Some(glam::Vec4::new(0.9, 0.1, 0.1, 1.0)));
}

struct StraightLine;
impl node_canvas::registry::EdgeRenderer for StraightLine {
    fn build_path(
        &self,
        points: &[Vec2],
        _kind: EdgeKind,
    ) -> Option<node_canvas::path::PathGeometry> {
        let mut path = node_canvas::path::PathGeometry::new();
        path.move_to(points[0]);
        path.line_to(*points.last().unwrap());
        Some(path)
    }
}

#[test]
fn test_custom_edge_renderer_delegation() {
    let mut graph: GraphState<String> = GraphState::default();
    let mut a = sized_node(Vec2::new(0.0, 0.0), Vec2::new(150.0, 80.0));
    a.outputs.push(Port::new("out"));
    let a = graph.insert_node(a);
    let mut b = sized_node(Vec2::new(300.0, 0.0), Vec2::new(150.0, 80.0));
    b.inputs.push(Port::new("in"));
    let b = graph.insert_node(b);

    let mut edge = Edge::new(a, "out", b, "in");
    edge.kind = EdgeKind::Bezier;
    edge.renderer = Some("straight-line".to_string());
    graph.insert_edge(edge);

    let mut canvas = GraphCanvas::new(CanvasConfig::default()).unwrap();
    canvas
        .registry
        .register_edge("straight-line", Box::new(StraightLine))
        .unwrap();

    let draw_list = canvas.draw(&graph);
    let path_cmd = draw_list
        .iter()
        .find(|cmd| matches!(cmd, DrawCommand::Path { .. }));
    match path_cmd {
        Some(DrawCommand::Path { path, .. }) => {
            // The delegate replaced the bezier with a plain segment.
            assert_eq!(path.verbs[1], PathVerb::LineTo(Vec2::new(300.0, 40.0)));
        }
        _ => panic!("Expected delegated edge Path"),
    }
}

#[test]
fn test_invalid_config_rejected() {
    let mut config = CanvasConfig::default();
    config.edge_hit_width = 0.0;
    assert!(GraphCanvas::new(config).is_err());
}

#[test]
fn test_dangling_edge_skipped() {
    let mut graph: GraphState<String> = GraphState::default();
    let mut a = sized_node(Vec2::ZERO, Vec2::new(150.0, 80.0));
    a.outputs.push(Port::new("out"));
    let a = graph.insert_node(a);
    let mut b = sized_node(Vec2::new(300.0, 0.0), Vec2::new(150.0, 80.0));
    b.inputs.push(Port::new("in"));
    let b = graph.insert_node(b);
    graph.insert_edge(Edge::new(a, "out", b, "in"));

    // Remove the target; the edge now dangles and must simply not render.
    graph.remove_node(b);

    let mut canvas = GraphCanvas::new(CanvasConfig::default()).unwrap();
    let draw_list = canvas.draw(&graph);
    assert!(
        !draw_list
            .iter()
            .any(|cmd| matches!(cmd, DrawCommand::Path { .. })),
        "dangling edge must be skipped"
    );
}

#[test]
fn test_unknown_port_id_falls_back_to_index_zero() {
    let mut graph: GraphState<String> = GraphState::default();
    let mut a = sized_node(Vec2::new(0.0, 0.0), Vec2::new(150.0, 80.0));
    a.outputs.push(Port::new("out"));
    let a = graph.insert_node(a);
    let mut b = sized_node(Vec2::new(300.0, 0.0), Vec2::new(150.0, 80.0));
    b.inputs.push(Port::new("in"));
    let b = graph.insert_node(b);

    // Port ids that exist nowhere: resolution falls back to index 0 on
    // each side, so the edge still renders between the real ports.
    graph.insert_edge(Edge::new(a, "no-such-out", b, "no-such-in"));

    let mut canvas = GraphCanvas::new(CanvasConfig::default()).unwrap();
    let draw_list = canvas.draw(&graph);
    let path_cmd = draw_list
        .iter()
        .find(|cmd| matches!(cmd, DrawCommand::Path { .. }));
    match path_cmd {
        Some(DrawCommand::Path { path, .. }) => {
            assert_eq!(path.verbs[0], PathVerb::MoveTo(Vec2::new(150.0, 40.0)));
        }
        _ => panic!("Expected fallback edge Path"),
    }
}
