use crate::model::RelationshipKind;
use crate::state::RenderGraph;
use serde::Serialize;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct GraphDump {
    pub direction: String,
    pub nodes: Vec<NodeDump>,
    pub edges: Vec<EdgeDump>,
}

#[derive(Debug, Serialize)]
pub struct NodeDump {
    pub id: String,
    pub kind: String,
    pub label: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub source_side: String,
    pub target_side: String,
}

#[derive(Debug, Serialize)]
pub struct EdgeDump {
    pub id: String,
    pub source: String,
    pub target: String,
    pub kind: String,
    pub label: String,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    pub style: String,
    pub animated: bool,
}

impl GraphDump {
    pub fn from_graph(graph: &RenderGraph) -> Self {
        let nodes = graph
            .nodes
            .iter()
            .map(|node| NodeDump {
                id: node.id.clone(),
                kind: node.kind.class().to_string(),
                label: node.label.clone(),
                x: node.position.x,
                y: node.position.y,
                width: node.dimensions.width,
                height: node.dimensions.height,
                source_side: node.source_side.as_str().to_string(),
                target_side: node.target_side.as_str().to_string(),
            })
            .collect();

        let edges = graph
            .edges
            .iter()
            .map(|edge| EdgeDump {
                id: edge.id.clone(),
                source: edge.source_id.clone(),
                target: edge.target_id.clone(),
                kind: match edge.kind {
                    RelationshipKind::Structural => "structural".to_string(),
                    RelationshipKind::Communication => "communication".to_string(),
                },
                label: edge.label.clone(),
                source_handle: edge.source_handle.clone(),
                target_handle: edge.target_handle.clone(),
                style: edge.style.as_str().to_string(),
                animated: edge.animated,
            })
            .collect();

        GraphDump {
            direction: format!("{:?}", graph.direction),
            nodes,
            edges,
        }
    }
}

pub fn write_graph_dump(path: Option<&Path>, graph: &RenderGraph) -> anyhow::Result<()> {
    let dump = GraphDump::from_graph(graph);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = std::io::stdout();
            serde_json::to_writer_pretty(stdout.lock(), &dump)?;
            println!();
        }
    }
    Ok(())
}
