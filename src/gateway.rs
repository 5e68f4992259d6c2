use crate::model::{
    Artifact, ArtifactKind, Component, ComponentKind, ComponentLink, Linkage, Position,
    Relationship, SourceData,
};
use crate::snapshot::{ComponentPlacement, DiagramDoc, EdgeBindingRow, FilterData, HandleBinding};
use serde::Deserialize;
use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport: {0}")]
    Transport(String),
    #[error("backend returned status {0}")]
    Status(u16),
    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Boundary to the backend diagram storage. The blob endpoints replace
/// `filter_data` wholesale; the component/edge methods are the
/// per-row side channels used by component diagrams. No optimistic
/// concurrency anywhere: last write wins.
pub trait DiagramStore {
    fn load(&self, diagram_id: &str) -> Result<DiagramDoc, StoreError>;
    fn save_snapshot(&self, diagram_id: &str, data: &FilterData) -> Result<(), StoreError>;
    fn save_component_position(
        &self,
        diagram_id: &str,
        component_id: &str,
        x: i64,
        y: i64,
    ) -> Result<(), StoreError>;
    fn remove_component(&self, diagram_id: &str, component_id: &str) -> Result<(), StoreError>;
    fn save_edge_handles(
        &self,
        diagram_id: &str,
        source_id: &str,
        target_id: &str,
        binding: &HandleBinding,
    ) -> Result<(), StoreError>;
}

impl<S: DiagramStore + ?Sized> DiagramStore for std::rc::Rc<S> {
    fn load(&self, diagram_id: &str) -> Result<DiagramDoc, StoreError> {
        (**self).load(diagram_id)
    }

    fn save_snapshot(&self, diagram_id: &str, data: &FilterData) -> Result<(), StoreError> {
        (**self).save_snapshot(diagram_id, data)
    }

    fn save_component_position(
        &self,
        diagram_id: &str,
        component_id: &str,
        x: i64,
        y: i64,
    ) -> Result<(), StoreError> {
        (**self).save_component_position(diagram_id, component_id, x, y)
    }

    fn remove_component(&self, diagram_id: &str, component_id: &str) -> Result<(), StoreError> {
        (**self).remove_component(diagram_id, component_id)
    }

    fn save_edge_handles(
        &self,
        diagram_id: &str,
        source_id: &str,
        target_id: &str,
        binding: &HandleBinding,
    ) -> Result<(), StoreError> {
        (**self).save_edge_handles(diagram_id, source_id, target_id, binding)
    }
}

// ---------------------------------------------------------------------------
// Wire decoding. REST payloads are duck-typed records; they are decoded
// exactly once, here, into the tagged model types the engine consumes.

#[derive(Debug, Deserialize)]
struct ComponentWire {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    x: Option<f64>,
    #[serde(default)]
    y: Option<f64>,
    #[serde(default)]
    children: Vec<ComponentChildWire>,
}

#[derive(Debug, Deserialize)]
struct ComponentChildWire {
    child_id: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    data_items: Option<String>,
    #[serde(default)]
    cardinality: Option<String>,
}

impl From<ComponentWire> for Component {
    fn from(wire: ComponentWire) -> Self {
        let kind = match wire.kind.as_deref() {
            Some("Hardware") => ComponentKind::Hardware,
            _ => ComponentKind::Software,
        };
        let links = wire
            .children
            .into_iter()
            .map(|child| ComponentLink {
                child_id: child.child_id,
                relationship: if child.kind.as_deref() == Some("communication") {
                    Relationship::Communication {
                        protocol: child.protocol,
                        data_items: child.data_items,
                    }
                } else {
                    Relationship::Structural {
                        cardinality: child.cardinality,
                    }
                },
            })
            .collect();
        Component {
            id: wire.id,
            name: wire.name,
            description: wire.description,
            kind,
            fallback_position: Position::new(wire.x.unwrap_or(0.0), wire.y.unwrap_or(0.0)),
            links,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArtifactWire {
    #[serde(default)]
    aid: Option<String>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    area: Option<String>,
}

fn id_prefix(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Vision => "VIS",
        ArtifactKind::Need => "N",
        ArtifactKind::UseCase => "UC",
        ArtifactKind::Requirement => "REQ",
        ArtifactKind::Document => "DOC",
    }
}

impl ArtifactWire {
    fn into_artifact(self, kind: ArtifactKind) -> Option<Artifact> {
        let id = self
            .aid
            .or_else(|| self.id.map(|id| format!("{}-{id}", id_prefix(kind))))?;
        // Requirements display their short name; everything else a title.
        let label = if kind == ArtifactKind::Requirement {
            self.short_name.or(self.title)
        } else {
            self.title.or(self.short_name)
        };
        Some(Artifact {
            id,
            label: label.unwrap_or_default(),
            area: self.area,
            kind,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LinkageWire {
    #[serde(default)]
    aid: Option<String>,
    source_id: String,
    target_id: String,
    #[serde(default)]
    relationship_type: Option<String>,
}

impl From<LinkageWire> for Linkage {
    fn from(wire: LinkageWire) -> Self {
        Linkage {
            aid: wire.aid,
            source_id: wire.source_id,
            target_id: wire.target_id,
            relationship_type: wire.relationship_type.unwrap_or_else(|| "related".to_string()),
        }
    }
}

/// One-file form of the read-only source lists, as produced by exporting
/// the list endpoints. Used by the CLI and by tests.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SourceFile {
    components: Vec<ComponentWire>,
    visions: Vec<ArtifactWire>,
    needs: Vec<ArtifactWire>,
    use_cases: Vec<ArtifactWire>,
    requirements: Vec<ArtifactWire>,
    documents: Vec<ArtifactWire>,
    linkages: Vec<LinkageWire>,
}

impl From<SourceFile> for SourceData {
    fn from(file: SourceFile) -> Self {
        let mut artifacts = Vec::new();
        let groups = [
            (file.visions, ArtifactKind::Vision),
            (file.needs, ArtifactKind::Need),
            (file.use_cases, ArtifactKind::UseCase),
            (file.requirements, ArtifactKind::Requirement),
            (file.documents, ArtifactKind::Document),
        ];
        for (wires, kind) in groups {
            artifacts.extend(wires.into_iter().filter_map(|wire| wire.into_artifact(kind)));
        }
        SourceData {
            components: file.components.into_iter().map(Component::from).collect(),
            artifacts,
            linkages: file.linkages.into_iter().map(Linkage::from).collect(),
        }
    }
}

pub fn parse_components(json: &str) -> Result<Vec<Component>, StoreError> {
    let wires: Vec<ComponentWire> = serde_json::from_str(json)?;
    Ok(wires.into_iter().map(Component::from).collect())
}

pub fn parse_artifacts(json: &str, kind: ArtifactKind) -> Result<Vec<Artifact>, StoreError> {
    let wires: Vec<ArtifactWire> = serde_json::from_str(json)?;
    Ok(wires
        .into_iter()
        .filter_map(|wire| wire.into_artifact(kind))
        .collect())
}

pub fn parse_linkages(json: &str) -> Result<Vec<Linkage>, StoreError> {
    let wires: Vec<LinkageWire> = serde_json::from_str(json)?;
    Ok(wires.into_iter().map(Linkage::from).collect())
}

pub fn parse_source(json: &str) -> Result<SourceData, StoreError> {
    let file: SourceFile = serde_json::from_str(json)?;
    Ok(file.into())
}

// ---------------------------------------------------------------------------
// In-memory store. Mirrors the backend's upsert semantics closely enough
// to back tests and offline runs.

#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RefCell<BTreeMap<String, DiagramDoc>>,
    fail_writes: Cell<bool>,
    write_log: RefCell<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_doc(doc: DiagramDoc) -> Self {
        let store = Self::default();
        store.insert(doc);
        store
    }

    pub fn insert(&self, doc: DiagramDoc) {
        self.docs.borrow_mut().insert(doc.id.clone(), doc);
    }

    pub fn doc(&self, diagram_id: &str) -> Option<DiagramDoc> {
        self.docs.borrow().get(diagram_id).cloned()
    }

    /// Make every write fail with a transport error, for exercising the
    /// no-rollback error path.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    pub fn write_log(&self) -> Vec<String> {
        self.write_log.borrow().clone()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.get() {
            Err(StoreError::Transport("simulated write failure".to_string()))
        } else {
            Ok(())
        }
    }
}

impl DiagramStore for MemoryStore {
    fn load(&self, diagram_id: &str) -> Result<DiagramDoc, StoreError> {
        self.doc(diagram_id).ok_or(StoreError::Status(404))
    }

    fn save_snapshot(&self, diagram_id: &str, data: &FilterData) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut docs = self.docs.borrow_mut();
        let doc = docs.get_mut(diagram_id).ok_or(StoreError::Status(404))?;
        doc.filter_data = Some(serde_json::to_value(data)?);
        self.write_log
            .borrow_mut()
            .push(format!("snapshot {diagram_id}"));
        Ok(())
    }

    fn save_component_position(
        &self,
        diagram_id: &str,
        component_id: &str,
        x: i64,
        y: i64,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut docs = self.docs.borrow_mut();
        let doc = docs.get_mut(diagram_id).ok_or(StoreError::Status(404))?;
        match doc
            .components
            .iter_mut()
            .find(|row| row.component_id == component_id)
        {
            Some(row) => {
                row.x = x as f64;
                row.y = y as f64;
            }
            None => doc.components.push(ComponentPlacement {
                component_id: component_id.to_string(),
                x: x as f64,
                y: y as f64,
            }),
        }
        self.write_log
            .borrow_mut()
            .push(format!("component {component_id} {x},{y}"));
        Ok(())
    }

    fn remove_component(&self, diagram_id: &str, component_id: &str) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut docs = self.docs.borrow_mut();
        let doc = docs.get_mut(diagram_id).ok_or(StoreError::Status(404))?;
        let before = doc.components.len();
        doc.components.retain(|row| row.component_id != component_id);
        if doc.components.len() == before {
            return Err(StoreError::Status(404));
        }
        self.write_log
            .borrow_mut()
            .push(format!("remove {component_id}"));
        Ok(())
    }

    fn save_edge_handles(
        &self,
        diagram_id: &str,
        source_id: &str,
        target_id: &str,
        binding: &HandleBinding,
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut docs = self.docs.borrow_mut();
        let doc = docs.get_mut(diagram_id).ok_or(StoreError::Status(404))?;
        match doc
            .edges
            .iter_mut()
            .find(|row| row.source_id == source_id && row.target_id == target_id)
        {
            Some(row) => {
                // Absent fields leave the stored value untouched, like the
                // backend's partial update.
                if let Some(handle) = &binding.source_handle {
                    row.source_handle = Some(handle.clone());
                }
                if let Some(handle) = &binding.target_handle {
                    row.target_handle = Some(handle.clone());
                }
            }
            None => doc.edges.push(EdgeBindingRow {
                source_id: source_id.to_string(),
                target_id: target_id.to_string(),
                source_handle: binding.source_handle.clone(),
                target_handle: binding.target_handle.clone(),
            }),
        }
        self.write_log
            .borrow_mut()
            .push(format!("edge {source_id}->{target_id}"));
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// HTTP store.

#[cfg(feature = "http")]
pub use http::HttpStore;

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::config::PersistenceConfig;
    use serde::de::DeserializeOwned;
    use std::time::Duration;

    pub struct HttpStore {
        agent: ureq::Agent,
        base_url: String,
    }

    impl HttpStore {
        pub fn new(base_url: &str, timeout: Duration) -> Self {
            let agent = ureq::AgentBuilder::new().timeout(timeout).build();
            Self {
                agent,
                base_url: base_url.trim_end_matches('/').to_string(),
            }
        }

        pub fn from_config(config: &PersistenceConfig) -> Self {
            Self::new(
                &config.base_url,
                Duration::from_secs(config.request_timeout_secs),
            )
        }

        fn url(&self, path: &str) -> String {
            format!("{}{path}", self.base_url)
        }

        fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, StoreError> {
            let resp = self.agent.get(&self.url(path)).call().map_err(map_err)?;
            Ok(serde_json::from_reader(resp.into_reader())?)
        }

        /// Pull the read-only relationship/artifact lists and assemble
        /// them into one engine input. The engine never writes these.
        pub fn fetch_source(&self) -> Result<SourceData, StoreError> {
            let component_wires: Vec<super::ComponentWire> = self.get_json("/components")?;
            let components: Vec<Component> =
                component_wires.into_iter().map(Component::from).collect();

            let mut artifacts = Vec::new();
            let lists = [
                ("/vision/vision-statements", ArtifactKind::Vision),
                ("/need/needs", ArtifactKind::Need),
                ("/use-case/use-cases", ArtifactKind::UseCase),
                ("/requirement/requirements", ArtifactKind::Requirement),
                ("/document/documents", ArtifactKind::Document),
            ];
            for (path, kind) in lists {
                let wires: Vec<super::ArtifactWire> = self.get_json(path)?;
                artifacts.extend(wires.into_iter().filter_map(|wire| wire.into_artifact(kind)));
            }

            let linkages: Vec<super::LinkageWire> = self.get_json("/linkage/linkages")?;
            Ok(SourceData {
                components,
                artifacts,
                linkages: linkages.into_iter().map(Linkage::from).collect(),
            })
        }

        fn put_json(&self, path: &str, body: &serde_json::Value) -> Result<(), StoreError> {
            self.agent
                .put(&self.url(path))
                .set("content-type", "application/json")
                .send_string(&serde_json::to_string(body)?)
                .map_err(map_err)?;
            Ok(())
        }
    }

    fn map_err(err: ureq::Error) -> StoreError {
        match err {
            ureq::Error::Status(code, _) => StoreError::Status(code),
            ureq::Error::Transport(err) => StoreError::Transport(err.to_string()),
        }
    }

    impl DiagramStore for HttpStore {
        fn load(&self, diagram_id: &str) -> Result<DiagramDoc, StoreError> {
            self.get_json(&format!("/diagrams/{diagram_id}"))
        }

        fn save_snapshot(&self, diagram_id: &str, data: &FilterData) -> Result<(), StoreError> {
            let body = serde_json::json!({ "filter_data": data });
            self.put_json(&format!("/diagrams/{diagram_id}"), &body)
        }

        fn save_component_position(
            &self,
            diagram_id: &str,
            component_id: &str,
            x: i64,
            y: i64,
        ) -> Result<(), StoreError> {
            let body = serde_json::json!({ "x": x, "y": y });
            self.put_json(
                &format!("/diagrams/{diagram_id}/components/{component_id}"),
                &body,
            )
        }

        fn remove_component(
            &self,
            diagram_id: &str,
            component_id: &str,
        ) -> Result<(), StoreError> {
            self.agent
                .delete(&self.url(&format!("/diagrams/{diagram_id}/components/{component_id}")))
                .call()
                .map_err(map_err)?;
            Ok(())
        }

        fn save_edge_handles(
            &self,
            diagram_id: &str,
            source_id: &str,
            target_id: &str,
            binding: &HandleBinding,
        ) -> Result<(), StoreError> {
            let body = serde_json::json!({
                "source_handle": binding.source_handle,
                "target_handle": binding.target_handle,
            });
            self.agent
                .put(&self.url(&format!("/diagrams/{diagram_id}/edges")))
                .query("source_id", source_id)
                .query("target_id", target_id)
                .set("content-type", "application/json")
                .send_string(&serde_json::to_string(&body)?)
                .map_err(map_err)?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RelationshipKind;

    #[test]
    fn decodes_component_children_into_tagged_relationships() {
        let json = r#"[{
            "id": "CMP-1",
            "name": "Flight computer",
            "type": "Hardware",
            "x": 12,
            "y": 30,
            "children": [
                {"child_id": "CMP-2", "type": "communication", "protocol": "CAN", "data_items": "telemetry"},
                {"child_id": "CMP-3", "type": "composition", "cardinality": "1..2"}
            ]
        }]"#;
        let components = parse_components(json).unwrap();
        assert_eq!(components.len(), 1);
        let component = &components[0];
        assert_eq!(component.kind, ComponentKind::Hardware);
        assert_eq!(component.fallback_position, Position::new(12.0, 30.0));
        assert_eq!(component.links.len(), 2);
        assert_eq!(
            component.links[0].relationship.kind(),
            RelationshipKind::Communication
        );
        assert_eq!(component.links[0].relationship.label(), "CAN: telemetry");
        assert_eq!(
            component.links[1].relationship.kind(),
            RelationshipKind::Structural
        );
    }

    #[test]
    fn vision_ids_fall_back_to_prefixed_numeric_id() {
        let json = r#"[{"id": "7", "title": "Mission vision"}, {"aid": "VIS-2", "title": "Second"}]"#;
        let artifacts = parse_artifacts(json, ArtifactKind::Vision).unwrap();
        assert_eq!(artifacts[0].id, "VIS-7");
        assert_eq!(artifacts[1].id, "VIS-2");
    }

    #[test]
    fn requirements_prefer_short_name() {
        let json = r#"[{"aid": "REQ-1", "title": "Long formal statement", "short_name": "Max thrust"}]"#;
        let artifacts = parse_artifacts(json, ArtifactKind::Requirement).unwrap();
        assert_eq!(artifacts[0].label, "Max thrust");
    }

    #[test]
    fn linkage_type_defaults() {
        let json = r#"[{"source_id": "N-1", "target_id": "REQ-1"}]"#;
        let linkages = parse_linkages(json).unwrap();
        assert_eq!(linkages[0].relationship_type, "related");
        assert_eq!(linkages[0].unique_key(), "N-1-REQ-1-related");
    }

    #[test]
    fn source_file_collects_all_artifact_lists() {
        let json = r#"{
            "components": [{"id": "CMP-1", "name": "Radio"}],
            "visions": [{"aid": "VIS-1", "title": "V"}],
            "requirements": [{"aid": "REQ-1", "short_name": "R"}],
            "linkages": [{"aid": "LNK-1", "source_id": "VIS-1", "target_id": "REQ-1", "relationship_type": "derives"}]
        }"#;
        let data = parse_source(json).unwrap();
        assert_eq!(data.components.len(), 1);
        assert_eq!(data.artifacts.len(), 2);
        assert_eq!(data.linkages.len(), 1);
    }

    #[test]
    fn memory_store_upserts_edge_rows_partially() {
        let store = MemoryStore::with_doc(DiagramDoc {
            id: "d1".into(),
            ..DiagramDoc::default()
        });
        store
            .save_edge_handles(
                "d1",
                "CMP-1",
                "CMP-2",
                &HandleBinding::new("right-top", "left-top"),
            )
            .unwrap();
        store
            .save_edge_handles(
                "d1",
                "CMP-1",
                "CMP-2",
                &HandleBinding {
                    source_handle: Some("right-bottom".into()),
                    target_handle: None,
                },
            )
            .unwrap();
        let doc = store.doc("d1").unwrap();
        assert_eq!(doc.edges.len(), 1);
        assert_eq!(doc.edges[0].source_handle.as_deref(), Some("right-bottom"));
        // Partial update left the target handle alone.
        assert_eq!(doc.edges[0].target_handle.as_deref(), Some("left-top"));
    }

    #[test]
    fn memory_store_round_trips_snapshots() {
        let store = MemoryStore::with_doc(DiagramDoc {
            id: "d1".into(),
            ..DiagramDoc::default()
        });
        let mut data = FilterData::default();
        data.area = "Propulsion".to_string();
        store.save_snapshot("d1", &data).unwrap();
        let doc = store.doc("d1").unwrap();
        assert_eq!(doc.decode_filter_data().area, "Propulsion");
        assert_eq!(store.write_log(), vec!["snapshot d1"]);
    }

    #[test]
    fn missing_diagram_is_a_status_error() {
        let store = MemoryStore::new();
        assert!(matches!(store.load("nope"), Err(StoreError::Status(404))));
        assert!(matches!(
            store.remove_component("nope", "CMP-1"),
            Err(StoreError::Status(404))
        ));
    }

    #[test]
    fn failed_writes_surface_as_transport_errors() {
        let store = MemoryStore::with_doc(DiagramDoc {
            id: "d1".into(),
            ..DiagramDoc::default()
        });
        store.set_fail_writes(true);
        assert!(matches!(
            store.save_component_position("d1", "CMP-1", 1, 2),
            Err(StoreError::Transport(_))
        ));
    }
}
