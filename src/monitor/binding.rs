use chrono::{DateTime, Utc};

use crate::database::SceneMatch;
use crate::settings::SuppressionAction;

/// A suppression currently in force on one video.
#[derive(Debug, Clone)]
pub struct Suppression {
    pub action: SuppressionAction,
    pub reason: String,
    pub applied_at: DateTime<Utc>,
}

/// Mutable per-video state. One binding exists per monitored video; the
/// attached flag is the idempotence guard against duplicate monitor
/// loops, and it is dropped on navigation so an in-flight cycle from the
/// old route cannot apply effects to the rebound element.
#[derive(Debug, Default)]
pub struct VideoBinding {
    pub attached: bool,
    /// The scene currently driving a timestamp suppression, identified
    /// by description. Cleared explicitly when playback leaves it.
    pub active_scene: Option<SceneMatch>,
    pub suppressed: Option<Suppression>,
    /// Set only when this engine muted the video, so clearing never
    /// unmutes a video the user muted themselves.
    pub muted_by_us: bool,
}

impl VideoBinding {
    pub fn new() -> Self {
        Self {
            attached: true,
            ..Self::default()
        }
    }
}
