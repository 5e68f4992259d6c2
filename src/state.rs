use crate::config::{Config, LayoutPolicy};
use crate::handles::assign_handles;
use crate::layout::{assign_positions, needs_auto_layout, preferred_sides};
use crate::model::{
    Artifact, Component, DiagramKind, Direction, Edge, EdgeStyle, Node, NodeKind, Position,
    RelationshipKind, SourceData, compare_ids, display_label,
};
use crate::snapshot::{AREA_ALL, DiagramDoc, FilterData, HandleBinding};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Render-ready output of one `recompute` pass. Hidden nodes and their
/// edges are simply absent; nothing here is ever disabled in place.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub direction: Direction,
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            edges: Vec::new(),
            direction: Direction::TopDown,
        }
    }
}

/// The working copy of one diagram's presentation state: saved/adjusted
/// positions, edge handle bindings, the visibility selection, the area
/// filter, and the edge-style preference. `recompute` is a pure function
/// of this value plus the live relationship data, so the UI layer is a
/// subscriber, never the owner of truth.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutState {
    kind: DiagramKind,
    positions: BTreeMap<String, Position>,
    bindings: BTreeMap<String, HandleBinding>,
    selection: BTreeSet<String>,
    area: String,
    edge_style: EdgeStyle,
    dirty: bool,
}

impl LayoutState {
    pub fn new(kind: DiagramKind) -> Self {
        Self {
            kind,
            positions: BTreeMap::new(),
            bindings: BTreeMap::new(),
            selection: BTreeSet::new(),
            area: AREA_ALL.to_string(),
            edge_style: EdgeStyle::default(),
            dirty: false,
        }
    }

    /// Rebuild the working state from a loaded diagram document. The row
    /// tables win over the blob where both carry an entry; a blob with no
    /// selection falls back to the component-row membership.
    pub fn hydrate(doc: &DiagramDoc) -> Self {
        let data = doc.decode_filter_data();

        let mut positions = data.positions;
        for row in &doc.components {
            positions.insert(row.component_id.clone(), Position::new(row.x, row.y));
        }

        let mut bindings = data.edges;
        for row in &doc.edges {
            let binding = HandleBinding {
                source_handle: row.source_handle.clone(),
                target_handle: row.target_handle.clone(),
            };
            if !binding.is_empty() {
                bindings.insert(format!("{}-{}", row.source_id, row.target_id), binding);
            }
        }

        let selection: BTreeSet<String> = if data.selection.is_empty() {
            doc.components
                .iter()
                .map(|row| row.component_id.clone())
                .collect()
        } else {
            data.selection.into_iter().collect()
        };

        Self {
            kind: doc.kind,
            positions,
            bindings,
            selection,
            area: data.area,
            edge_style: EdgeStyle::default(),
            dirty: false,
        }
    }

    pub fn kind(&self) -> DiagramKind {
        self.kind
    }

    pub fn position(&self, id: &str) -> Option<Position> {
        self.positions.get(id).copied()
    }

    pub fn binding(&self, edge_id: &str) -> Option<&HandleBinding> {
        self.bindings.get(edge_id)
    }

    pub fn selection(&self) -> &BTreeSet<String> {
        &self.selection
    }

    pub fn area(&self) -> &str {
        &self.area
    }

    pub fn edge_style(&self) -> EdgeStyle {
        self.edge_style
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub fn set_node_position(&mut self, id: &str, position: Position) {
        self.positions.insert(id.to_string(), position);
        self.dirty = true;
    }

    pub fn set_edge_handles(&mut self, edge_id: &str, binding: HandleBinding) {
        if binding.is_empty() {
            self.bindings.remove(edge_id);
        } else {
            self.bindings.insert(edge_id.to_string(), binding);
        }
        self.dirty = true;
    }

    pub fn set_selection<I>(&mut self, ids: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.selection = ids.into_iter().collect();
        self.dirty = true;
    }

    pub fn set_area(&mut self, area: &str) {
        if self.area != area {
            self.area = area.to_string();
            self.dirty = true;
        }
    }

    pub fn set_edge_style(&mut self, style: EdgeStyle) {
        if self.edge_style != style {
            self.edge_style = style;
            self.dirty = true;
        }
    }

    /// Pin every computed position into the working state. Backs the
    /// explicit re-layout action, which is the only path allowed to move
    /// nodes that already have saved positions.
    pub fn apply_layout_result(&mut self, graph: &RenderGraph) {
        for node in &graph.nodes {
            self.positions.insert(node.id.clone(), node.position);
        }
        self.dirty = true;
    }

    /// Serialize the complete working state as the persisted blob. Saves
    /// are wholesale; a partial blob would silently drop someone else's
    /// positions on the next load.
    pub fn snapshot(&self) -> FilterData {
        FilterData {
            positions: self.positions.clone(),
            edges: self.bindings.clone(),
            selection: self.selection.iter().cloned().collect(),
            area: self.area.clone(),
        }
    }

    fn component_visible(&self, id: &str) -> bool {
        if !self.selection.is_empty() {
            return self.selection.contains(id);
        }
        // Components carry no area tag, so an empty selection shows all.
        true
    }

    fn artifact_visible(&self, artifact: &Artifact) -> bool {
        if !self.selection.is_empty() {
            return self.selection.contains(&artifact.id);
        }
        match &artifact.area {
            None => true,
            Some(area) => self.area == AREA_ALL || *area == self.area,
        }
    }

    /// Derive the render-ready graph for the current state. Stored
    /// positions and bindings are preserved for ids that are still
    /// visible; entries for hidden ids stay in the state but are omitted
    /// from the output. Identical inputs yield identical output.
    pub fn recompute(&self, data: &SourceData, config: &Config) -> RenderGraph {
        match self.kind {
            DiagramKind::ArtifactGraph => self.recompute_artifact_graph(data, config),
            _ => self.recompute_component_diagram(data, config),
        }
    }

    fn recompute_component_diagram(&self, data: &SourceData, config: &Config) -> RenderGraph {
        let direction = config.layout.component_direction;
        let (target_side, source_side) = preferred_sides(direction);

        let mut visible: Vec<&Component> = data
            .components
            .iter()
            .filter(|component| self.component_visible(&component.id))
            .collect();
        visible.sort_by(|a, b| compare_ids(&a.id, &b.id));

        let mut nodes: Vec<Node> = visible
            .iter()
            .map(|component| Node {
                id: component.id.clone(),
                kind: NodeKind::Component(component.kind),
                label: display_label(&component.name),
                dimensions: config.dimensions.component,
                position: self
                    .positions
                    .get(&component.id)
                    .copied()
                    .unwrap_or(component.fallback_position),
                source_side,
                target_side,
            })
            .collect();

        let visible_ids: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();

        let mut edges: Vec<Edge> = Vec::new();
        for component in &visible {
            for link in &component.links {
                // Edges into filtered-out nodes are dropped, not disabled.
                if !visible_ids.contains(link.child_id.as_str()) {
                    continue;
                }
                let kind = link.relationship.kind();
                edges.push(Edge {
                    id: format!("{}-{}", component.id, link.child_id),
                    source_id: component.id.clone(),
                    target_id: link.child_id.clone(),
                    kind,
                    label: link.relationship.label(),
                    source_handle: None,
                    target_handle: None,
                    style: self.edge_style,
                    animated: kind == RelationshipKind::Communication,
                });
            }
        }

        self.run_layout_if_due(&mut nodes, &edges, direction, config);

        let resolved: BTreeMap<&str, Position> = nodes
            .iter()
            .map(|node| (node.id.as_str(), node.position))
            .collect();
        for edge in &mut edges {
            let assigned = assign_handles(
                edge.kind,
                resolved.get(edge.source_id.as_str()).copied(),
                resolved.get(edge.target_id.as_str()).copied(),
                self.bindings.get(&edge.id),
            );
            edge.source_handle = assigned.source_handle;
            edge.target_handle = assigned.target_handle;
        }

        RenderGraph {
            nodes,
            edges,
            direction,
        }
    }

    fn recompute_artifact_graph(&self, data: &SourceData, config: &Config) -> RenderGraph {
        let direction = config.layout.artifact_direction;
        let (target_side, source_side) = preferred_sides(direction);

        let mut visible: Vec<&Artifact> = data
            .artifacts
            .iter()
            .filter(|artifact| self.artifact_visible(artifact))
            .collect();
        visible.sort_by(|a, b| compare_ids(&a.id, &b.id));

        let mut nodes: Vec<Node> = visible
            .iter()
            .map(|artifact| Node {
                id: artifact.id.clone(),
                kind: NodeKind::Artifact(artifact.kind),
                label: display_label(&artifact.label),
                dimensions: config.dimensions.artifact,
                position: self
                    .positions
                    .get(&artifact.id)
                    .copied()
                    .unwrap_or_default(),
                source_side,
                target_side,
            })
            .collect();

        let visible_ids: HashSet<&str> = nodes.iter().map(|node| node.id.as_str()).collect();

        let mut seen: HashSet<String> = HashSet::new();
        let mut edges: Vec<Edge> = Vec::new();
        for linkage in &data.linkages {
            if !visible_ids.contains(linkage.source_id.as_str())
                || !visible_ids.contains(linkage.target_id.as_str())
            {
                continue;
            }
            let key = linkage.unique_key();
            if !seen.insert(key.clone()) {
                continue;
            }
            let edge_id = format!("e{key}");
            // Linkage edges are user-drawn; handles come only from saved
            // reconnections and are carried verbatim.
            let saved = self.bindings.get(&edge_id);
            edges.push(Edge {
                id: edge_id,
                source_id: linkage.source_id.clone(),
                target_id: linkage.target_id.clone(),
                kind: RelationshipKind::Communication,
                label: linkage.relationship_type.clone(),
                source_handle: saved.and_then(|b| b.source_handle.clone()),
                target_handle: saved.and_then(|b| b.target_handle.clone()),
                style: self.edge_style,
                animated: true,
            });
        }

        self.run_layout_if_due(&mut nodes, &edges, direction, config);

        RenderGraph {
            nodes,
            edges,
            direction,
        }
    }

    fn run_layout_if_due(
        &self,
        nodes: &mut [Node],
        edges: &[Edge],
        direction: Direction,
        config: &Config,
    ) {
        let due = match config.layout.policy {
            LayoutPolicy::Always => true,
            LayoutPolicy::SkipIfAnyPinned => needs_auto_layout(nodes),
        };
        if due {
            log::debug!("auto-layout over {} nodes ({direction:?})", nodes.len());
            assign_positions(nodes, edges, direction, &config.layout);
        }
    }
}
