use serde::{Deserialize, Serialize};
use std::sync::RwLock;

/// One of the visible/audible effects the monitor can put on a video.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SuppressionAction {
    Blur,
    Overlay,
    Skip,
    Mute,
}

impl Default for SuppressionAction {
    fn default() -> Self {
        SuppressionAction::Blur
    }
}

/// Detection configuration, owned by the surrounding settings store. The
/// engine only reads it; the host pushes a whole new value on change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectionSettings {
    pub enabled: bool,
    pub ai_enabled: bool,
    pub keywords_enabled: bool,
    pub timestamps_enabled: bool,
    /// Consumed by the navigation blocklist check outside this engine;
    /// carried so the settings document round-trips intact.
    pub site_blocking_enabled: bool,
    /// 0..=100. Higher sensitivity lowers the classifier threshold.
    pub sensitivity: u8,
    pub default_action: SuppressionAction,
    pub keywords: Vec<String>,
    /// Classifier labels considered objectionable.
    pub forbidden_labels: Vec<String>,
}

impl Default for DetectionSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ai_enabled: true,
            keywords_enabled: true,
            timestamps_enabled: true,
            site_blocking_enabled: true,
            sensitivity: 50,
            default_action: SuppressionAction::Blur,
            keywords: Vec::new(),
            forbidden_labels: vec![
                "Porn".to_string(),
                "Hentai".to_string(),
                "Sexy".to_string(),
            ],
        }
    }
}

impl DetectionSettings {
    /// Probability a forbidden label must exceed to trigger suppression.
    /// sensitivity 100 => 0.0 (anything nonzero triggers), sensitivity 0
    /// => 1.0 (nothing triggers).
    pub fn classifier_threshold(&self) -> f64 {
        let sensitivity = self.sensitivity.min(100) as f64;
        (100.0 - sensitivity) / 100.0
    }
}

/// In-memory handle to the current settings. Monitors re-read it every
/// detection cycle, so a replacement applies without rebinding anything.
pub struct SettingsStore {
    data: RwLock<DetectionSettings>,
}

impl SettingsStore {
    pub fn new(initial: DetectionSettings) -> Self {
        Self {
            data: RwLock::new(initial),
        }
    }

    pub fn current(&self) -> DetectionSettings {
        self.data.read().unwrap().clone()
    }

    pub fn replace(&self, settings: DetectionSettings) {
        *self.data.write().unwrap() = settings;
    }
}
