use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use log::{debug, info};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::database::SceneDatabase;
use crate::relay::CoordinationRelay;
use crate::settings::{SettingsStore, SuppressionAction};
use crate::surface::{PageSurface, VideoSurface};

use super::actions::{apply_action, clear_action};
use super::binding::VideoBinding;
use super::cycle::CycleDeps;
use super::loop_worker::monitor_loop;

/// How long the page gets to settle after an in-page navigation before
/// videos are re-scanned; a route change can swap the playable content
/// without replacing the elements.
const SETTLE_DELAY_MS: u64 = 1000;

/// How long a manual verification effect stays up before auto-revert.
const MANUAL_REVERT_SECS: u64 = 3;

struct VideoAttachment {
    video: Arc<dyn VideoSurface>,
    state: Arc<StdMutex<VideoBinding>>,
    cancel_token: CancellationToken,
    task: JoinHandle<()>,
}

/// Discovers videos, runs one monitor loop per bound element, and owns
/// the navigation/reset lifecycle.
#[derive(Clone)]
pub struct MonitorController {
    deps: CycleDeps,
    attachments: Arc<Mutex<HashMap<String, VideoAttachment>>>,
}

impl MonitorController {
    pub fn new(
        page: Arc<dyn PageSurface>,
        settings: Arc<SettingsStore>,
        database: Option<Arc<SceneDatabase>>,
        relay: Arc<CoordinationRelay>,
    ) -> Self {
        Self {
            deps: CycleDeps {
                page,
                settings,
                database,
                relay,
            },
            attachments: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Bind every video currently on the page. Idempotent.
    pub async fn scan_and_attach(&self) -> usize {
        let mut attached = 0;
        for video in self.deps.page.videos() {
            if self.attach_video(video).await {
                attached += 1;
            }
        }
        attached
    }

    /// Bind one video and start its monitor loop. Returns false when the
    /// video is already bound, so a second call never doubles the loop.
    pub async fn attach_video(&self, video: Arc<dyn VideoSurface>) -> bool {
        let id = video.id();
        let mut attachments = self.attachments.lock().await;

        if let Some(existing) = attachments.get(&id) {
            if existing.state.lock().unwrap().attached {
                return false;
            }
            // A stale entry from before a navigation; replace it.
            existing.cancel_token.cancel();
            attachments.remove(&id);
        }

        let state = Arc::new(StdMutex::new(VideoBinding::new()));
        let cancel_token = CancellationToken::new();
        let task = tokio::spawn(monitor_loop(
            self.deps.clone(),
            video.clone(),
            state.clone(),
            cancel_token.clone(),
        ));

        info!("attached to video {id}");
        attachments.insert(
            id,
            VideoAttachment {
                video,
                state,
                cancel_token,
                task,
            },
        );
        true
    }

    /// In-page navigation: every bound video loses its attachment and any
    /// active effect, then the page is re-scanned after a settle delay.
    pub async fn handle_navigation(&self) {
        {
            let mut attachments = self.attachments.lock().await;
            for (id, attachment) in attachments.drain() {
                attachment.cancel_token.cancel();
                let mut state = attachment.state.lock().unwrap();
                state.attached = false;
                state.active_scene = None;
                clear_action(self.deps.page.as_ref(), attachment.video.as_ref(), &mut state);
                debug!("detached video {id} after navigation");
            }
        }

        let controller = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(SETTLE_DELAY_MS)).await;
            let rebound = controller.scan_and_attach().await;
            info!("rebound {rebound} video(s) after navigation");
        });
    }

    /// Apply the configured default action to the first video right now,
    /// reverting automatically after a short delay. Lets the host verify
    /// the pipeline without waiting for a real trigger.
    pub async fn run_manual_check(&self) -> Result<SuppressionAction> {
        let settings = self.deps.settings.current();
        let action = settings.default_action;

        let video = self
            .deps
            .page
            .videos()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("no video found"))?;

        self.attach_video(video.clone()).await;
        let state = {
            let attachments = self.attachments.lock().await;
            attachments
                .get(&video.id())
                .map(|attachment| attachment.state.clone())
                .ok_or_else(|| anyhow!("video lost between attach and check"))?
        };

        {
            let mut binding = state.lock().unwrap();
            apply_action(
                self.deps.page.as_ref(),
                video.as_ref(),
                &mut binding,
                action,
                "manual test",
            );
        }
        info!("manual check applied {action:?}");

        // A skip is instantaneous; everything else reverts on a timer.
        if action != SuppressionAction::Skip {
            let page = self.deps.page.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(MANUAL_REVERT_SECS)).await;
                let mut binding = state.lock().unwrap();
                clear_action(page.as_ref(), video.as_ref(), &mut binding);
                info!("manual check reverted");
            });
        }

        Ok(action)
    }

    /// Stop every monitor loop and retract any visible effect.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, VideoAttachment)> = {
            let mut attachments = self.attachments.lock().await;
            attachments.drain().collect()
        };

        for (id, attachment) in drained {
            attachment.cancel_token.cancel();
            {
                let mut state = attachment.state.lock().unwrap();
                state.attached = false;
                state.active_scene = None;
                clear_action(self.deps.page.as_ref(), attachment.video.as_ref(), &mut state);
            }
            if attachment.task.await.is_err() {
                debug!("monitor loop for video {id} aborted");
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn attachment_count(&self) -> usize {
        self.attachments.lock().await.len()
    }

    #[cfg(test)]
    pub(crate) async fn binding_for(&self, id: &str) -> Option<Arc<StdMutex<VideoBinding>>> {
        self.attachments
            .lock()
            .await
            .get(id)
            .map(|attachment| attachment.state.clone())
    }
}
