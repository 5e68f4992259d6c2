use crate::model::{Dimensions, Direction};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub layout: LayoutConfig,
    pub dimensions: DimensionConfig,
    pub persistence: PersistenceConfig,
}

/// Whether `recompute` may run the auto-layout over the visible set.
/// `SkipIfAnyPinned` is the load-bearing default: one manually placed
/// node suppresses layout for the whole diagram so user arrangements
/// are never disturbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayoutPolicy {
    #[default]
    SkipIfAnyPinned,
    Always,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub node_spacing: f32,
    pub rank_spacing: f32,
    pub margin_x: f32,
    pub margin_y: f32,
    pub component_direction: Direction,
    pub artifact_direction: Direction,
    pub policy: LayoutPolicy,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_spacing: 50.0,
            rank_spacing: 50.0,
            margin_x: 8.0,
            margin_y: 8.0,
            component_direction: Direction::TopDown,
            artifact_direction: Direction::LeftRight,
            policy: LayoutPolicy::SkipIfAnyPinned,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionConfig {
    pub component: Dimensions,
    pub artifact: Dimensions,
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self {
            component: Dimensions::new(172.0, 36.0),
            artifact: Dimensions::new(250.0, 80.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    pub base_url: String,
    pub nudge_debounce_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/api/v1".to_string(),
            nudge_debounce_ms: 1000,
            request_timeout_secs: 30,
        }
    }
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };

    let contents = std::fs::read_to_string(path)?;
    // Hand-written configs get the lenient parse (comments, trailing commas).
    let config = match serde_json::from_str(&contents) {
        Ok(config) => config,
        Err(_) => json5::from_str(&contents)?,
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.layout.node_spacing, 50.0);
        assert_eq!(config.dimensions.component.width, 172.0);
        assert_eq!(config.dimensions.artifact.height, 80.0);
        assert_eq!(config.persistence.nudge_debounce_ms, 1000);
        assert_eq!(config.layout.policy, LayoutPolicy::SkipIfAnyPinned);
    }

    #[test]
    fn partial_file_overlays_defaults() {
        let parsed: Config =
            serde_json::from_str(r#"{"layout": {"rank_spacing": 120.0}}"#).unwrap();
        assert_eq!(parsed.layout.rank_spacing, 120.0);
        assert_eq!(parsed.layout.node_spacing, 50.0);
        assert_eq!(parsed.persistence.base_url, "http://localhost:8000/api/v1");
    }

    #[test]
    fn json5_fallback_accepts_comments() {
        let contents = "{\n  // wider ranks for wall displays\n  layout: { rank_spacing: 90.0 },\n}";
        let parsed: Config = json5::from_str(contents).unwrap();
        assert_eq!(parsed.layout.rank_spacing, 90.0);
    }
}
