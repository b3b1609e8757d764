use crate::settings::SuppressionAction;

use super::models::SceneDatabase;

/// The scene a playback position currently falls inside, resolved to the
/// action configured for its type. Scene identity is the description: the
/// monitor uses it to tell "still the same scene" from "a new one".
#[derive(Debug, Clone, PartialEq)]
pub struct SceneMatch {
    pub action: SuppressionAction,
    pub scene_type: String,
    pub description: String,
    pub end: f64,
}

impl SceneDatabase {
    /// Look up the current playback position against every video whose
    /// patterns match the page URL or title (case-insensitive substring).
    /// Scene bounds are inclusive. A scene type with no configured action
    /// falls back to blur.
    pub fn scene_at(&self, url: &str, title: &str, position: f64) -> Option<SceneMatch> {
        let url = url.to_lowercase();
        let title = title.to_lowercase();

        for video in &self.videos {
            let matches = video.url_patterns.iter().any(|pattern| {
                let pattern = pattern.to_lowercase();
                url.contains(&pattern) || title.contains(&pattern)
            });
            if !matches {
                continue;
            }

            for scene in &video.scenes {
                if position >= scene.start && position <= scene.end {
                    let action = self
                        .scene_types
                        .get(&scene.scene_type)
                        .map(|config| config.default_action)
                        .unwrap_or(SuppressionAction::Blur);

                    return Some(SceneMatch {
                        action,
                        scene_type: scene.scene_type.clone(),
                        description: scene.description.clone(),
                        end: scene.end,
                    });
                }
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_database() -> SceneDatabase {
        SceneDatabase::from_json(
            r#"{
                "videos": [
                    {
                        "urlPatterns": ["watch?v=abc123", "Documentary Title"],
                        "scenes": [
                            {"start": 10.0, "end": 20.0, "type": "violence", "description": "fight"},
                            {"start": 30.0, "end": 40.0, "type": "unlabeled", "description": "argument"}
                        ]
                    },
                    {
                        "urlPatterns": ["watch?v=zzz999"],
                        "scenes": [
                            {"start": 0.0, "end": 5.0, "type": "violence", "description": "intro"}
                        ]
                    }
                ],
                "sceneTypes": {
                    "violence": {"defaultAction": "skip"}
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn matches_by_url_pattern() {
        let db = test_database();
        let hit = db
            .scene_at("https://videos.example/watch?v=abc123", "whatever", 15.0)
            .unwrap();
        assert_eq!(hit.description, "fight");
        assert_eq!(hit.action, SuppressionAction::Skip);
    }

    #[test]
    fn matches_by_title_when_url_does_not() {
        let db = test_database();
        let hit = db
            .scene_at("https://videos.example/other", "documentary title - part 2", 15.0)
            .unwrap();
        assert_eq!(hit.description, "fight");
    }

    #[test]
    fn scene_bounds_are_inclusive() {
        let db = test_database();
        let url = "https://videos.example/watch?v=abc123";
        assert!(db.scene_at(url, "", 10.0).is_some());
        assert!(db.scene_at(url, "", 20.0).is_some());
        assert!(db.scene_at(url, "", 9.99).is_none());
        assert!(db.scene_at(url, "", 20.01).is_none());
    }

    #[test]
    fn unknown_scene_type_falls_back_to_blur() {
        let db = test_database();
        let hit = db
            .scene_at("https://videos.example/watch?v=abc123", "", 35.0)
            .unwrap();
        assert_eq!(hit.action, SuppressionAction::Blur);
    }

    #[test]
    fn no_match_outside_known_videos() {
        let db = test_database();
        assert!(db.scene_at("https://videos.example/watch?v=unknown", "", 15.0).is_none());
    }
}
