use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::settings::SuppressionAction;

/// A tagged timestamp range in one video's playback timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scene {
    pub start: f64,
    pub end: f64,
    #[serde(rename = "type")]
    pub scene_type: String,
    pub description: String,
}

/// A video known to the community database, matched by URL/title
/// substring patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub url_patterns: Vec<String>,
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneTypeConfig {
    pub default_action: SuppressionAction,
}

/// The community scene document. Loaded once per page lifetime and never
/// mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SceneDatabase {
    pub videos: Vec<VideoEntry>,
    #[serde(default)]
    pub scene_types: HashMap<String, SceneTypeConfig>,
}

impl SceneDatabase {
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw).context("failed to parse scene database document")
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scene database from {}", path.display()))?;
        Self::from_json(&contents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_community_document() {
        let raw = r#"{
            "videos": [
                {
                    "urlPatterns": ["watch?v=abc123", "some film title"],
                    "scenes": [
                        {"start": 10.0, "end": 20.5, "type": "violence", "description": "opening fight"}
                    ]
                }
            ],
            "sceneTypes": {
                "violence": {"defaultAction": "skip"}
            }
        }"#;

        let db = SceneDatabase::from_json(raw).unwrap();
        assert_eq!(db.videos.len(), 1);
        assert_eq!(db.videos[0].scenes[0].scene_type, "violence");
        assert_eq!(
            db.scene_types["violence"].default_action,
            SuppressionAction::Skip
        );
    }

    #[test]
    fn missing_scene_types_section_is_empty() {
        let db = SceneDatabase::from_json(r#"{"videos": []}"#).unwrap();
        assert!(db.scene_types.is_empty());
    }
}
