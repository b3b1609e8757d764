//! Scripted demonstration of the guard against a simulated page: one
//! video, a small scene database, and a toy classifier that flags frames
//! by their red-channel dominance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use image::{DynamicImage, GenericImageView};
use log::info;

use sceneguard::{
    ClassifierModel, ContentGuard, DetectionSettings, FramePixels, ModelProvider, PageSurface,
    Prediction, SceneDatabase, VideoSurface,
};

const DEMO_DATABASE: &str = r#"{
    "videos": [
        {
            "urlPatterns": ["watch?v=demo42"],
            "scenes": [
                {"start": 4.0, "end": 10.0, "type": "violence", "description": "warehouse fight"}
            ]
        }
    ],
    "sceneTypes": {
        "violence": {"defaultAction": "overlay"}
    }
}"#;

/// Flags any frame whose red channel clearly dominates.
struct RedDominanceModel;

impl ClassifierModel for RedDominanceModel {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>> {
        let (mut red, mut rest) = (0u64, 0u64);
        for (_, _, pixel) in image.pixels() {
            red += pixel[0] as u64;
            rest += pixel[1] as u64 + pixel[2] as u64;
        }
        let total = (red + rest).max(1);
        let red_share = red as f64 / total as f64;

        Ok(vec![
            Prediction {
                class_name: "Porn".to_string(),
                probability: red_share,
            },
            Prediction {
                class_name: "Neutral".to_string(),
                probability: 1.0 - red_share,
            },
        ])
    }
}

struct RedDominanceProvider;

#[async_trait]
impl ModelProvider for RedDominanceProvider {
    fn name(&self) -> &str {
        "red-dominance demo model"
    }

    async fn load(&self) -> Result<Arc<dyn ClassifierModel>> {
        Ok(Arc::new(RedDominanceModel))
    }
}

struct SimVideo {
    position: Mutex<f64>,
    blurred: AtomicBool,
    muted: AtomicBool,
    frame: Mutex<FramePixels>,
}

impl SimVideo {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            position: Mutex::new(0.0),
            blurred: AtomicBool::new(false),
            muted: AtomicBool::new(false),
            frame: Mutex::new(solid_frame(40, 40, 40)),
        })
    }

    fn advance(&self, seconds: f64) {
        *self.position.lock().unwrap() += seconds;
    }

    fn show(&self, rgb: [u8; 3]) {
        *self.frame.lock().unwrap() = solid_frame(rgb[0], rgb[1], rgb[2]);
    }
}

fn solid_frame(r: u8, g: u8, b: u8) -> FramePixels {
    let mut rgba = Vec::with_capacity(64 * 64 * 4);
    for _ in 0..64 * 64 {
        rgba.extend_from_slice(&[r, g, b, 255]);
    }
    FramePixels {
        rgba,
        width: 64,
        height: 64,
    }
}

impl VideoSurface for SimVideo {
    fn id(&self) -> String {
        "demo-player".to_string()
    }

    fn playback_position(&self) -> f64 {
        *self.position.lock().unwrap()
    }

    fn is_paused(&self) -> bool {
        false
    }

    fn has_ended(&self) -> bool {
        false
    }

    fn seek_forward(&self, seconds: f64) {
        self.advance(seconds);
        info!("[sim] playback jumped forward {seconds}s");
    }

    fn set_blurred(&self, blurred: bool) {
        if self.blurred.swap(blurred, Ordering::SeqCst) != blurred {
            info!("[sim] blur {}", if blurred { "on" } else { "off" });
        }
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn set_muted(&self, muted: bool) {
        if self.muted.swap(muted, Ordering::SeqCst) != muted {
            info!("[sim] audio {}", if muted { "muted" } else { "unmuted" });
        }
    }

    fn sample_frame(&self) -> Result<FramePixels> {
        Ok(self.frame.lock().unwrap().clone())
    }
}

struct SimPage {
    video: Arc<SimVideo>,
    overlay: Mutex<Option<String>>,
}

impl PageSurface for SimPage {
    fn url(&self) -> String {
        "https://videos.example/watch?v=demo42".to_string()
    }

    fn title(&self) -> String {
        "Demo feature film".to_string()
    }

    fn visible_text(&self) -> String {
        "A perfectly ordinary watch page.".to_string()
    }

    fn videos(&self) -> Vec<Arc<dyn VideoSurface>> {
        vec![self.video.clone()]
    }

    fn show_overlay(&self, message: &str) {
        *self.overlay.lock().unwrap() = Some(message.to_string());
        info!("[sim] overlay shown: {message}");
    }

    fn clear_overlay(&self) {
        if self.overlay.lock().unwrap().take().is_some() {
            info!("[sim] overlay removed");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    info!("sceneguard demo starting");

    let video = SimVideo::new();
    let page = Arc::new(SimPage {
        video: video.clone(),
        overlay: Mutex::new(None),
    });

    let database = SceneDatabase::from_json(DEMO_DATABASE)?;
    let guard = ContentGuard::new(
        page.clone(),
        DetectionSettings::default(),
        Some(database),
        vec![Arc::new(RedDominanceProvider)],
    );

    let bound = guard.start().await;
    info!("bound {bound} video(s)");

    let status = guard.evaluator_status().await?;
    info!(
        "evaluator status: loaded={} loading={}",
        status.model_loaded, status.model_loading
    );

    // Play into the tagged scene; the timestamp stage overlays.
    video.advance(5.0);
    tokio::time::sleep(Duration::from_millis(2500)).await;

    // Leave the scene on a harmless frame; suppression clears.
    video.advance(6.0);
    video.show([30, 90, 60]);
    tokio::time::sleep(Duration::from_millis(2500)).await;

    // A red-dominant frame trips the toy classifier.
    video.show([220, 10, 10]);
    tokio::time::sleep(Duration::from_millis(2500)).await;

    // Back to normal content.
    video.show([30, 90, 60]);
    tokio::time::sleep(Duration::from_millis(2500)).await;

    // Manual verification pass: applies the default action, then
    // auto-reverts.
    let action = guard.run_manual_check().await?;
    info!("manual check ran with {action:?}");
    tokio::time::sleep(Duration::from_millis(3500)).await;

    guard.shutdown().await;
    info!("sceneguard demo finished");

    Ok(())
}
