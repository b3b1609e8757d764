use std::sync::{Arc, Mutex as StdMutex};

use log::{debug, info};

use crate::database::SceneDatabase;
use crate::relay::CoordinationRelay;
use crate::settings::{DetectionSettings, SettingsStore};
use crate::surface::{PageSurface, VideoSurface};

use super::actions::{apply_action, clear_action};
use super::binding::VideoBinding;
use super::frame_check::{encode_frame_jpeg, is_effectively_black};

/// Everything one detection cycle needs besides the video itself. Cloned
/// into each per-video monitor task.
#[derive(Clone)]
pub(crate) struct CycleDeps {
    pub page: Arc<dyn PageSurface>,
    pub settings: Arc<SettingsStore>,
    pub database: Option<Arc<SceneDatabase>>,
    pub relay: Arc<CoordinationRelay>,
}

enum ClassifierVerdict {
    /// A forbidden label cleared the threshold.
    Hit(String),
    /// Analysis ran (or failed) without a detection.
    NoSignal,
    /// Pre-filter skipped the frame; the cycle must not touch state.
    Unchanged,
}

/// One pass of the per-video state machine: timestamp scenes first, then
/// keywords, then the frame classifier. The first stage that matches
/// settles the cycle.
pub(crate) async fn run_detection_cycle(
    deps: &CycleDeps,
    video: &Arc<dyn VideoSurface>,
    binding: &Arc<StdMutex<VideoBinding>>,
) {
    // A paused or ended video keeps whatever state was last set.
    if video.is_paused() || video.has_ended() {
        return;
    }

    let settings = deps.settings.current();

    if !settings.enabled {
        let mut state = binding.lock().unwrap();
        if state.attached {
            state.active_scene = None;
            clear_action(deps.page.as_ref(), video.as_ref(), &mut state);
        }
        return;
    }

    // Priority 1: timestamp scenes. A match preempts every other check
    // this cycle.
    let scene = if settings.timestamps_enabled {
        deps.database.as_deref().and_then(|database| {
            database.scene_at(
                &deps.page.url(),
                &deps.page.title(),
                video.playback_position(),
            )
        })
    } else {
        None
    };

    if let Some(scene) = scene {
        let mut state = binding.lock().unwrap();
        if !state.attached {
            return;
        }
        let is_new_scene = state
            .active_scene
            .as_ref()
            .map(|active| active.description != scene.description)
            .unwrap_or(true);
        if is_new_scene {
            let reason = format!(
                "{}: {}",
                scene.scene_type.to_uppercase(),
                scene.description
            );
            info!("scene detected on video {}: {reason}", video.id());
            apply_action(
                deps.page.as_ref(),
                video.as_ref(),
                &mut state,
                scene.action,
                &reason,
            );
            state.active_scene = Some(scene);
        }
        return;
    }

    // Playback left the active scene: transition back to idle explicitly
    // instead of waiting out some expiry.
    {
        let mut state = binding.lock().unwrap();
        if !state.attached {
            return;
        }
        if state.active_scene.take().is_some() {
            info!("scene ended on video {}", video.id());
            clear_action(deps.page.as_ref(), video.as_ref(), &mut state);
        }
    }

    // Priority 2: keywords in the page text.
    if settings.keywords_enabled {
        if let Some(keyword) = match_keyword(&deps.page.visible_text(), &settings.keywords) {
            let mut state = binding.lock().unwrap();
            if !state.attached {
                return;
            }
            apply_action(
                deps.page.as_ref(),
                video.as_ref(),
                &mut state,
                settings.default_action,
                &format!("keyword match: {keyword}"),
            );
            return;
        }
    }

    // Priority 3: classify the current frame.
    if settings.ai_enabled {
        let verdict = classifier_verdict(deps, video, &settings).await;
        let mut state = binding.lock().unwrap();
        if !state.attached {
            return;
        }
        match verdict {
            ClassifierVerdict::Hit(reason) => {
                apply_action(
                    deps.page.as_ref(),
                    video.as_ref(),
                    &mut state,
                    settings.default_action,
                    &reason,
                );
            }
            ClassifierVerdict::NoSignal => {
                if state.active_scene.is_none() {
                    clear_action(deps.page.as_ref(), video.as_ref(), &mut state);
                }
            }
            ClassifierVerdict::Unchanged => {}
        }
        return;
    }

    // Nothing matched and the classifier is off: stale suppression must
    // not outlive its trigger.
    let mut state = binding.lock().unwrap();
    if !state.attached {
        return;
    }
    clear_action(deps.page.as_ref(), video.as_ref(), &mut state);
}

fn match_keyword(text: &str, keywords: &[String]) -> Option<String> {
    let text = text.to_lowercase();
    keywords
        .iter()
        .find(|keyword| !keyword.is_empty() && text.contains(&keyword.to_lowercase()))
        .cloned()
}

/// Every failure along this path degrades to "no signal": the classifier
/// being down never blocks timestamp or keyword detection and never
/// surfaces to the user.
async fn classifier_verdict(
    deps: &CycleDeps,
    video: &Arc<dyn VideoSurface>,
    settings: &DetectionSettings,
) -> ClassifierVerdict {
    let frame = match video.sample_frame() {
        Ok(frame) => frame,
        Err(err) => {
            debug!("frame sampling failed on video {}: {err:#}", video.id());
            return ClassifierVerdict::NoSignal;
        }
    };

    if is_effectively_black(&frame) {
        debug!("black frame on video {}, skipping analysis", video.id());
        return ClassifierVerdict::Unchanged;
    }

    let encoded = match tokio::task::spawn_blocking(move || encode_frame_jpeg(&frame)).await {
        Ok(Ok(encoded)) => encoded,
        Ok(Err(err)) => {
            debug!("frame encode failed on video {}: {err:#}", video.id());
            return ClassifierVerdict::NoSignal;
        }
        Err(err) => {
            debug!("encode worker join failed: {err}");
            return ClassifierVerdict::NoSignal;
        }
    };

    let predictions = match deps.relay.analyze_frame(encoded).await {
        Ok(predictions) => predictions,
        Err(err) => {
            debug!("analysis unavailable for video {} this cycle: {err}", video.id());
            return ClassifierVerdict::NoSignal;
        }
    };

    let threshold = settings.classifier_threshold();
    for prediction in predictions {
        let forbidden = settings
            .forbidden_labels
            .iter()
            .any(|label| label == &prediction.class_name);
        if forbidden && prediction.probability > threshold {
            let percent = (prediction.probability * 100.0).round();
            return ClassifierVerdict::Hit(format!("{} ({percent}%)", prediction.class_name));
        }
    }

    ClassifierVerdict::NoSignal
}
