use crate::config::LayoutConfig;
use crate::model::{Direction, Edge, Node, Position, Side};
use dagre_rust::{
    GraphConfig as DagreConfig, GraphEdge as DagreEdge, GraphNode as DagreNode,
    layout as dagre_layout,
};
use graphlib_rust::{Graph as DagreGraph, GraphOption};
use std::collections::HashSet;

/// The all-or-nothing policy check: auto-layout runs only while no node
/// carries a saved, non-origin position. One pinned node means the user
/// arranged this diagram and the adapter must leave it alone.
pub fn needs_auto_layout(nodes: &[Node]) -> bool {
    nodes.iter().all(|node| node.position.is_origin())
}

/// Preferred connection sides for a direction: `(target, source)`.
pub fn preferred_sides(direction: Direction) -> (Side, Side) {
    match direction {
        Direction::LeftRight => (Side::Left, Side::Right),
        Direction::TopDown => (Side::Top, Side::Bottom),
    }
}

fn rankdir(direction: Direction) -> &'static str {
    match direction {
        Direction::TopDown => "TB",
        Direction::LeftRight => "LR",
    }
}

/// Run the layered layout over `nodes`, writing positions back in place.
/// Dagre reports node centers; the rendering convention is top-left, so
/// each coordinate shifts by half the node extent. Returns whether any
/// position was applied; nodes the library cannot place keep (0,0).
pub fn assign_positions(
    nodes: &mut [Node],
    edges: &[Edge],
    direction: Direction,
    config: &LayoutConfig,
) -> bool {
    if nodes.is_empty() {
        return false;
    }

    let mut dagre_graph: DagreGraph<DagreConfig, DagreNode, DagreEdge> =
        DagreGraph::new(Some(GraphOption {
            directed: Some(true),
            multigraph: Some(false),
            compound: Some(false),
        }));

    let mut graph_config = DagreConfig::default();
    graph_config.rankdir = Some(rankdir(direction).to_string());
    graph_config.nodesep = Some(config.node_spacing);
    graph_config.ranksep = Some(config.rank_spacing);
    graph_config.marginx = Some(config.margin_x);
    graph_config.marginy = Some(config.margin_y);
    dagre_graph.set_graph(graph_config);

    for node in nodes.iter() {
        let mut dagre_node = DagreNode::default();
        dagre_node.width = node.dimensions.width as f32;
        dagre_node.height = node.dimensions.height as f32;
        dagre_graph.set_node(node.id.clone(), Some(dagre_node));
    }

    let node_set: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();
    let mut edge_set: HashSet<(String, String)> = HashSet::new();
    for edge in edges {
        if !node_set.contains(edge.source_id.as_str()) || !node_set.contains(edge.target_id.as_str())
        {
            continue;
        }
        let from = edge.source_id.clone();
        let to = edge.target_id.clone();
        if !edge_set.insert((from.clone(), to.clone())) {
            continue;
        }
        let _ = dagre_graph.set_edge(&from, &to, Some(DagreEdge::default()), None);
    }

    dagre_layout::run_layout(&mut dagre_graph);

    let (target_side, source_side) = preferred_sides(direction);
    let mut applied = false;
    for node in nodes.iter_mut() {
        let Some(dagre_node) = dagre_graph.node(&node.id) else {
            continue;
        };
        node.position = Position::new(
            dagre_node.x as f64 - node.dimensions.width / 2.0,
            dagre_node.y as f64 - node.dimensions.height / 2.0,
        );
        node.target_side = target_side;
        node.source_side = source_side;
        applied = true;
    }

    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ComponentKind, Dimensions, EdgeStyle, NodeKind, RelationshipKind};

    fn node(id: &str) -> Node {
        Node {
            id: id.to_string(),
            kind: NodeKind::Component(ComponentKind::Software),
            label: id.to_string(),
            dimensions: Dimensions::new(172.0, 36.0),
            position: Position::default(),
            source_side: Side::Bottom,
            target_side: Side::Top,
        }
    }

    fn edge(source: &str, target: &str) -> Edge {
        Edge {
            id: format!("{source}-{target}"),
            source_id: source.to_string(),
            target_id: target.to_string(),
            kind: RelationshipKind::Structural,
            label: String::new(),
            source_handle: None,
            target_handle: None,
            style: EdgeStyle::SmoothStep,
            animated: false,
        }
    }

    #[test]
    fn auto_layout_gate() {
        let mut nodes = vec![node("A"), node("B")];
        assert!(needs_auto_layout(&nodes));
        nodes[1].position = Position::new(10.0, 10.0);
        assert!(!needs_auto_layout(&nodes));
        // A saved (0,0) is indistinguishable from "never placed".
        nodes[1].position = Position::default();
        assert!(needs_auto_layout(&nodes));
    }

    #[test]
    fn sides_follow_direction() {
        assert_eq!(
            preferred_sides(Direction::LeftRight),
            (Side::Left, Side::Right)
        );
        assert_eq!(preferred_sides(Direction::TopDown), (Side::Top, Side::Bottom));
    }

    #[test]
    fn chain_layout_left_right() {
        let mut nodes = vec![node("A"), node("B"), node("C")];
        let edges = vec![edge("A", "B"), edge("B", "C")];
        let applied = assign_positions(
            &mut nodes,
            &edges,
            Direction::LeftRight,
            &LayoutConfig::default(),
        );
        assert!(applied);
        for n in &nodes {
            assert!(n.position.x.is_finite() && n.position.y.is_finite());
            assert_eq!(n.target_side, Side::Left);
            assert_eq!(n.source_side, Side::Right);
        }
        // Ranks advance along x in LR mode.
        assert!(nodes[0].position.x < nodes[1].position.x);
        assert!(nodes[1].position.x < nodes[2].position.x);
    }

    #[test]
    fn chain_layout_top_down() {
        let mut nodes = vec![node("A"), node("B")];
        let edges = vec![edge("A", "B")];
        assert!(assign_positions(
            &mut nodes,
            &edges,
            Direction::TopDown,
            &LayoutConfig::default(),
        ));
        assert!(nodes[0].position.y < nodes[1].position.y);
        assert_eq!(nodes[0].target_side, Side::Top);
        assert_eq!(nodes[0].source_side, Side::Bottom);
    }

    #[test]
    fn disconnected_node_still_gets_a_position() {
        let mut nodes = vec![node("A"), node("B"), node("lonely")];
        let edges = vec![edge("A", "B")];
        assert!(assign_positions(
            &mut nodes,
            &edges,
            Direction::LeftRight,
            &LayoutConfig::default(),
        ));
        let lonely = &nodes[2];
        assert!(lonely.position.x.is_finite() && lonely.position.y.is_finite());
    }

    #[test]
    fn parallel_edges_are_deduplicated() {
        let mut nodes = vec![node("A"), node("B")];
        let edges = vec![edge("A", "B"), edge("A", "B")];
        assert!(assign_positions(
            &mut nodes,
            &edges,
            Direction::LeftRight,
            &LayoutConfig::default(),
        ));
    }

    #[test]
    fn empty_input_is_a_no_op() {
        let mut nodes: Vec<Node> = Vec::new();
        assert!(!assign_positions(
            &mut nodes,
            &[],
            Direction::LeftRight,
            &LayoutConfig::default(),
        ));
    }
}
