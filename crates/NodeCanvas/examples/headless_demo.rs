use glam::Vec2;
use node_canvas::model::{Edge, EdgeKind, GraphState, MarkerKind, Node, NodeFlags, Port};
use node_canvas::render::DrawCommand;
use node_canvas::{CanvasConfig, GraphCanvas, HitTarget};

#[derive(Clone, Debug)]
#[allow(dead_code)]
struct MyNodeData {
    name: String,
    value: f32,
}

impl node_canvas::model::NodeData for MyNodeData {
    fn node_type(&self) -> String {
        "HeadlessNode".to_string()
    }
}

fn main() {
    println!("=== NodeCanvas Headless Demo ===");

    // 1. Initialize Canvas (direct mode)
    let mut canvas = GraphCanvas::new(CanvasConfig::default()).expect("valid config");
    canvas.update_viewport_size(Vec2::new(1280.0, 720.0));

    // 2. Build a small graph: two nodes, one bezier edge with an arrow.
    let mut graph = GraphState::<MyNodeData>::default();

    let mut node_a = Node::new(
        Vec2::new(100.0, 100.0),
        MyNodeData {
            name: "Node A".into(),
            value: 42.0,
        },
    );
    node_a.label = "Node A".into();
    node_a.size = Some(Vec2::new(150.0, 100.0));
    node_a.outputs.push(Port::new("out"));
    let node_a = graph.insert_node(node_a);

    let mut node_b = Node::new(
        Vec2::new(420.0, 180.0),
        MyNodeData {
            name: "Node B".into(),
            value: 100.0,
        },
    );
    node_b.label = "Node B".into();
    node_b.size = Some(Vec2::new(150.0, 100.0));
    node_b.inputs.push(Port::new("in"));
    let node_b = graph.insert_node(node_b);

    let mut edge = Edge::new(node_a, "out", node_b, "in");
    edge.kind = EdgeKind::Bezier;
    edge.marker_end = MarkerKind::ArrowClosed;
    graph.insert_edge(edge);

    println!("Created graph with 2 nodes and 1 edge");

    // 3. Render a few frames while moving Node A.
    for frame in 0..4 {
        println!("\n--- Frame {frame} ---");

        if frame == 1 {
            println!(">> Moving Node A...");
            if let Some(node) = graph.nodes.get_mut(node_a) {
                node.position += Vec2::new(50.0, 25.0);
            }
            canvas.update_node_position(&graph, node_a);
        } else if frame == 2 {
            println!(">> Selecting Node A...");
            if let Some(node) = graph.nodes.get_mut(node_a) {
                node.flags.insert(NodeFlags::SELECTED);
            }
            canvas.update_node_selection(&graph, node_a);
        } else if frame == 3 {
            println!(">> Zooming out to 0.25x...");
            canvas.view.zoom = 0.25;
            canvas.invalidate();
        }

        let draw_list = canvas.draw(&graph);
        let rects = draw_list
            .iter()
            .filter(|c| matches!(c, DrawCommand::Rect { .. }))
            .count();
        let paths = draw_list
            .iter()
            .filter(|c| matches!(c, DrawCommand::Path { .. }))
            .count();
        let texts = draw_list
            .iter()
            .filter(|c| matches!(c, DrawCommand::Text { .. }))
            .count();
        println!("  Draw list: {} commands ({rects} rects, {paths} paths, {texts} texts)", draw_list.len());
    }

    // 4. Hit-test a few points.
    canvas.view.zoom = 1.0;
    canvas.invalidate();
    for (what, point) in [
        ("node A body", Vec2::new(200.0, 170.0)),
        ("empty space", Vec2::new(900.0, 600.0)),
    ] {
        match canvas.hit_test(&graph, point) {
            Some(HitTarget::Node(id)) => println!("hit {what}: node {id:?}"),
            Some(other) => println!("hit {what}: {other:?}"),
            None => println!("hit {what}: nothing"),
        }
    }

    println!("\nDemo Complete.");
}
