use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

static ARTIFACT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+)-0*([0-9]+)$").unwrap());

pub const LABEL_MAX_CHARS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    TopDown,
    LeftRight,
}

impl Direction {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "TD" | "TB" => Some(Self::TopDown),
            "LR" => Some(Self::LeftRight),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagramKind {
    #[default]
    Component,
    ArtifactGraph,
    Sequence,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// (0,0) doubles as "no saved position" on the wire, matching the
    /// backend's default placement for freshly added components.
    pub fn is_origin(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
}

impl Dimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Vision,
    Need,
    UseCase,
    Requirement,
    Document,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Hardware,
    Software,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Artifact(ArtifactKind),
    Component(ComponentKind),
    DiagramRef,
}

impl NodeKind {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Artifact(ArtifactKind::Vision) => "vision",
            Self::Artifact(ArtifactKind::Need) => "need",
            Self::Artifact(ArtifactKind::UseCase) => "use-case",
            Self::Artifact(ArtifactKind::Requirement) => "requirement",
            Self::Artifact(ArtifactKind::Document) => "document",
            Self::Component(ComponentKind::Hardware) => "hardware",
            Self::Component(ComponentKind::Software) => "software",
            Self::DiagramRef => "diagram-ref",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    pub label: String,
    pub dimensions: Dimensions,
    pub position: Position,
    pub source_side: Side,
    pub target_side: Side,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationshipKind {
    Structural,
    Communication,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Relationship {
    Structural {
        cardinality: Option<String>,
    },
    Communication {
        protocol: Option<String>,
        data_items: Option<String>,
    },
}

impl Relationship {
    pub fn kind(&self) -> RelationshipKind {
        match self {
            Self::Structural { .. } => RelationshipKind::Structural,
            Self::Communication { .. } => RelationshipKind::Communication,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::Structural { cardinality } => cardinality.clone().unwrap_or_default(),
            Self::Communication {
                protocol,
                data_items,
            } => format!(
                "{}: {}",
                protocol.as_deref().unwrap_or("?"),
                data_items.as_deref().unwrap_or("")
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    #[serde(rename = "default")]
    Bezier,
    Straight,
    Step,
    #[default]
    SmoothStep,
}

impl EdgeStyle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bezier => "default",
            Self::Straight => "straight",
            Self::Step => "step",
            Self::SmoothStep => "smoothstep",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: String,
    pub source_id: String,
    pub target_id: String,
    pub kind: RelationshipKind,
    pub label: String,
    pub source_handle: Option<String>,
    pub target_handle: Option<String>,
    pub style: EdgeStyle,
    pub animated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Component {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub kind: ComponentKind,
    pub fallback_position: Position,
    pub links: Vec<ComponentLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentLink {
    pub child_id: String,
    pub relationship: Relationship,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub id: String,
    pub label: String,
    pub area: Option<String>,
    pub kind: ArtifactKind,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Linkage {
    pub aid: Option<String>,
    pub source_id: String,
    pub target_id: String,
    pub relationship_type: String,
}

impl Linkage {
    /// Stable identity for deduplication and handle-binding lookup: the
    /// linkage's own id when present, else a source-target-type composite.
    pub fn unique_key(&self) -> String {
        match &self.aid {
            Some(aid) => aid.clone(),
            None => format!(
                "{}-{}-{}",
                self.source_id, self.target_id, self.relationship_type
            ),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceData {
    pub components: Vec<Component>,
    pub artifacts: Vec<Artifact>,
    pub linkages: Vec<Linkage>,
}

/// Truncate long titles for in-node display. Operates on characters, not
/// bytes, so multi-byte labels cannot split a code point.
pub fn display_label(raw: &str) -> String {
    if raw.chars().count() > LABEL_MAX_CHARS {
        let mut out: String = raw.chars().take(LABEL_MAX_CHARS).collect();
        out.push_str("...");
        out
    } else {
        raw.to_string()
    }
}

/// Order node ids so that `REQ-2` sorts before `REQ-10`. Ids outside the
/// PREFIX-NUMBER convention fall back to plain string order.
pub fn compare_ids(a: &str, b: &str) -> Ordering {
    let parse = |id: &str| {
        ARTIFACT_ID_RE.captures(id).and_then(|caps| {
            let prefix = caps.get(1)?.as_str().to_string();
            let number: u64 = caps.get(2)?.as_str().parse().ok()?;
            Some((prefix, number))
        })
    };
    match (parse(a), parse(b)) {
        (Some(ka), Some(kb)) => ka.cmp(&kb).then_with(|| a.cmp(b)),
        _ => a.cmp(b),
    }
}
