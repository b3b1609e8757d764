use chrono::Utc;
use log::info;

use crate::settings::SuppressionAction;
use crate::surface::{PageSurface, VideoSurface};

use super::binding::{Suppression, VideoBinding};

/// How far a skip jumps playback forward.
pub(crate) const SKIP_OFFSET_SECS: f64 = 5.0;

/// Put one effect on the video. Any previously applied effect is cleared
/// first, so effects never stack.
pub(crate) fn apply_action(
    page: &dyn PageSurface,
    video: &dyn VideoSurface,
    binding: &mut VideoBinding,
    action: SuppressionAction,
    reason: &str,
) {
    clear_effects(page, video, binding);

    match action {
        SuppressionAction::Blur => video.set_blurred(true),
        SuppressionAction::Overlay => page.show_overlay(reason),
        SuppressionAction::Skip => video.seek_forward(SKIP_OFFSET_SECS),
        SuppressionAction::Mute => {
            if !video.is_muted() {
                video.set_muted(true);
                binding.muted_by_us = true;
            }
        }
    }

    // A skip leaves nothing to retract later.
    binding.suppressed = if action == SuppressionAction::Skip {
        None
    } else {
        Some(Suppression {
            action,
            reason: reason.to_string(),
            applied_at: Utc::now(),
        })
    };

    info!("applied {action:?} on video {} ({reason})", video.id());
}

/// Back to idle: retract whichever effect is active.
pub(crate) fn clear_action(
    page: &dyn PageSurface,
    video: &dyn VideoSurface,
    binding: &mut VideoBinding,
) {
    clear_effects(page, video, binding);
    binding.suppressed = None;
}

fn clear_effects(page: &dyn PageSurface, video: &dyn VideoSurface, binding: &mut VideoBinding) {
    video.set_blurred(false);
    page.clear_overlay();
    if binding.muted_by_us {
        video.set_muted(false);
        binding.muted_by_us = false;
    }
}
