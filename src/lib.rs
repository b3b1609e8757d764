mod classifier;
mod database;
mod errors;
mod evaluator;
mod monitor;
mod relay;
mod settings;
mod surface;
mod utils;

use std::sync::Arc;

use anyhow::Result;
use log::warn;

pub use classifier::{ClassifierGateway, ClassifierModel, ModelProvider, ModelStatus, Prediction};
pub use database::{Scene, SceneDatabase, SceneMatch, SceneTypeConfig, VideoEntry};
pub use errors::{AnalysisError, ClassifierError};
pub use evaluator::{EvaluatorRequest, EvaluatorResponse, ResponsePayload};
pub use monitor::{MonitorController, Suppression, VideoBinding};
pub use relay::{CoordinationRelay, EvaluatorFactory, InProcessEvaluator};
pub use settings::{DetectionSettings, SettingsStore, SuppressionAction};
pub use surface::{FramePixels, PageSurface, VideoSurface};

/// The engine, assembled once per page: settings handle, classifier
/// gateway behind its relay, and the per-video monitors.
pub struct ContentGuard {
    settings: Arc<SettingsStore>,
    gateway: Arc<ClassifierGateway>,
    relay: Arc<CoordinationRelay>,
    monitor: MonitorController,
}

impl ContentGuard {
    pub fn new(
        page: Arc<dyn PageSurface>,
        settings: DetectionSettings,
        database: Option<SceneDatabase>,
        model_providers: Vec<Arc<dyn ModelProvider>>,
    ) -> Self {
        let settings = Arc::new(SettingsStore::new(settings));
        let gateway = Arc::new(ClassifierGateway::new(model_providers));
        let relay = Arc::new(CoordinationRelay::new(Arc::new(InProcessEvaluator::new(
            gateway.clone(),
        ))));
        let monitor = MonitorController::new(
            page,
            settings.clone(),
            database.map(Arc::new),
            relay.clone(),
        );

        Self {
            settings,
            gateway,
            relay,
            monitor,
        }
    }

    /// Bind every video on the page and, when classifier detection is
    /// enabled, bring the evaluator up ahead of the first analysis.
    pub async fn start(&self) -> usize {
        if self.settings.current().ai_enabled {
            if let Err(err) = self.relay.ensure_evaluator_ready().await {
                warn!("evaluator warm-up failed: {err}");
            }
        }
        self.monitor.scan_and_attach().await
    }

    pub fn monitor(&self) -> &MonitorController {
        &self.monitor
    }

    /// Host notification that the settings object changed. Applies to
    /// the next detection cycle of every bound video.
    pub async fn settings_changed(&self, settings: DetectionSettings) {
        let warm_evaluator = settings.ai_enabled;
        self.settings.replace(settings);
        if warm_evaluator {
            if let Err(err) = self.relay.ensure_evaluator_ready().await {
                warn!("evaluator warm-up failed: {err}");
            }
        }
    }

    /// Host notification of an in-page navigation (same-document route
    /// change or full load).
    pub async fn navigation_occurred(&self) {
        self.monitor.handle_navigation().await;
    }

    /// Run one suppression cycle now and auto-revert shortly after.
    pub async fn run_manual_check(&self) -> Result<SuppressionAction> {
        self.monitor.run_manual_check().await
    }

    pub async fn evaluator_status(&self) -> Result<ModelStatus, AnalysisError> {
        self.relay.evaluator_status().await
    }

    /// Re-arm a classifier whose every load source failed.
    pub async fn retry_classifier(&self) {
        self.gateway.retry().await;
    }

    pub async fn shutdown(&self) {
        self.monitor.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use async_trait::async_trait;
    use image::DynamicImage;
    use tokio::time::{sleep, Duration};

    use crate::monitor::test_support::{bright_frame, FakePage, FakeVideo};

    use super::*;

    struct FixedModel {
        class_name: String,
        probability: f64,
    }

    impl ClassifierModel for FixedModel {
        fn classify(&self, _image: &DynamicImage) -> Result<Vec<Prediction>> {
            Ok(vec![Prediction {
                class_name: self.class_name.clone(),
                probability: self.probability,
            }])
        }
    }

    struct FixedProvider {
        class_name: String,
        probability: f64,
    }

    #[async_trait]
    impl ModelProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn load(&self) -> Result<Arc<dyn ClassifierModel>> {
            Ok(Arc::new(FixedModel {
                class_name: self.class_name.clone(),
                probability: self.probability,
            }))
        }
    }

    /// Real-time wait for an observable state; the monitor loops tick on
    /// their own schedule.
    async fn wait_for(mut condition: impl FnMut() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            sleep(Duration::from_millis(100)).await;
        }
        panic!("expected state never reached");
    }

    #[tokio::test]
    async fn end_to_end_scene_then_classifier_suppression() {
        let page = FakePage::new("https://videos.example/watch?v=abc123", "title");
        let video = FakeVideo::new("v1");
        video.set_frame(bright_frame());
        page.add_video(video.clone());

        let database = SceneDatabase::from_json(
            r#"{
                "videos": [
                    {
                        "urlPatterns": ["watch?v=abc123"],
                        "scenes": [
                            {"start": 4.0, "end": 8.0, "type": "violence", "description": "brawl"}
                        ]
                    }
                ],
                "sceneTypes": {"violence": {"defaultAction": "mute"}}
            }"#,
        )
        .unwrap();

        let guard = ContentGuard::new(
            page.clone(),
            DetectionSettings::default(),
            Some(database),
            vec![Arc::new(FixedProvider {
                class_name: "Porn".to_string(),
                probability: 0.9,
            })],
        );

        assert_eq!(guard.start().await, 1);

        let binding = guard.monitor().binding_for("v1").await.unwrap();

        // Inside the scene window: the timestamp stage mutes, and the
        // classifier never preempts it.
        video.set_position(5.0);
        {
            let binding = binding.clone();
            wait_for(move || {
                let state = binding.lock().unwrap();
                state
                    .suppressed
                    .as_ref()
                    .map(|s| s.action == SuppressionAction::Mute)
                    .unwrap_or(false)
            })
            .await;
        }
        assert_eq!(
            binding
                .lock()
                .unwrap()
                .active_scene
                .as_ref()
                .unwrap()
                .description,
            "brawl"
        );

        // Past the scene: the classifier takes over with the default
        // action on the next cycle.
        video.set_position(9.0);
        {
            let binding = binding.clone();
            wait_for(move || {
                let state = binding.lock().unwrap();
                state
                    .suppressed
                    .as_ref()
                    .map(|s| s.action == SuppressionAction::Blur && s.reason.contains("Porn"))
                    .unwrap_or(false)
            })
            .await;
        }
        assert!(binding.lock().unwrap().active_scene.is_none());

        let status = guard.evaluator_status().await.unwrap();
        assert!(status.model_loaded);

        guard.shutdown().await;
        assert!(!video.muted.load(std::sync::atomic::Ordering::SeqCst));
        assert!(!video.blurred.load(std::sync::atomic::Ordering::SeqCst));
    }
}
