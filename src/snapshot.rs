use crate::model::{DiagramKind, Position};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const AREA_ALL: &str = "All";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandleBinding {
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

impl HandleBinding {
    pub fn new(source_handle: &str, target_handle: &str) -> Self {
        Self {
            source_handle: Some(source_handle.to_string()),
            target_handle: Some(target_handle.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source_handle.is_none() && self.target_handle.is_none()
    }
}

/// The persisted layout snapshot. Saved wholesale on every write; the
/// backend treats it as an opaque blob, so this struct is the only
/// schema the shape has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterData {
    pub positions: BTreeMap<String, Position>,
    pub edges: BTreeMap<String, HandleBinding>,
    pub selection: Vec<String>,
    pub area: String,
}

impl Default for FilterData {
    fn default() -> Self {
        Self {
            positions: BTreeMap::new(),
            edges: BTreeMap::new(),
            selection: Vec::new(),
            area: AREA_ALL.to_string(),
        }
    }
}

impl FilterData {
    /// Lenient decode: each field is recovered independently and a
    /// malformed field falls back to its default instead of failing the
    /// whole blob. Worst case the diagram re-lays-out.
    pub fn from_value(value: Option<&Value>) -> Self {
        let mut data = Self::default();
        let Some(Value::Object(map)) = value else {
            if value.is_some_and(|v| !v.is_null()) {
                log::warn!("filter_data is not an object; using defaults");
            }
            return data;
        };

        if let Some(raw) = map.get("positions") {
            match serde_json::from_value(raw.clone()) {
                Ok(positions) => data.positions = positions,
                Err(err) => log::warn!("discarding malformed filter_data.positions: {err}"),
            }
        }
        if let Some(raw) = map.get("edges") {
            match serde_json::from_value(raw.clone()) {
                Ok(edges) => data.edges = edges,
                Err(err) => log::warn!("discarding malformed filter_data.edges: {err}"),
            }
        }
        if let Some(raw) = map.get("selection") {
            match serde_json::from_value(raw.clone()) {
                Ok(selection) => data.selection = selection,
                Err(err) => log::warn!("discarding malformed filter_data.selection: {err}"),
            }
        }
        if let Some(area) = map.get("area").and_then(Value::as_str) {
            data.area = area.to_string();
        }

        data
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentPlacement {
    pub component_id: String,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeBindingRow {
    pub source_id: String,
    pub target_id: String,
    #[serde(default)]
    pub source_handle: Option<String>,
    #[serde(default)]
    pub target_handle: Option<String>,
}

/// Diagram document as served by `GET /diagrams/{id}`. The `components`
/// and `edges` row tables are the component-diagram side channels; the
/// `filter_data` blob carries everything else.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramDoc {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: DiagramKind,
    #[serde(default)]
    pub filter_data: Option<Value>,
    #[serde(default)]
    pub components: Vec<ComponentPlacement>,
    #[serde(default)]
    pub edges: Vec<EdgeBindingRow>,
}

impl DiagramDoc {
    pub fn decode_filter_data(&self) -> FilterData {
        FilterData::from_value(self.filter_data.as_ref())
    }
}
