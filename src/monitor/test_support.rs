//! Scripted page and video doubles shared by the monitor tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use crate::surface::{FramePixels, PageSurface, VideoSurface};

pub(crate) struct FakeVideo {
    pub id: String,
    pub position: Mutex<f64>,
    pub paused: AtomicBool,
    pub ended: AtomicBool,
    pub blurred: AtomicBool,
    pub muted: AtomicBool,
    pub frame: Mutex<Option<FramePixels>>,
    pub frames_sampled: AtomicUsize,
}

impl FakeVideo {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            position: Mutex::new(0.0),
            paused: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            blurred: AtomicBool::new(false),
            muted: AtomicBool::new(false),
            frame: Mutex::new(None),
            frames_sampled: AtomicUsize::new(0),
        })
    }

    pub fn set_position(&self, position: f64) {
        *self.position.lock().unwrap() = position;
    }

    pub fn set_frame(&self, frame: FramePixels) {
        *self.frame.lock().unwrap() = Some(frame);
    }
}

impl VideoSurface for FakeVideo {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn playback_position(&self) -> f64 {
        *self.position.lock().unwrap()
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    fn seek_forward(&self, seconds: f64) {
        *self.position.lock().unwrap() += seconds;
    }

    fn set_blurred(&self, blurred: bool) {
        self.blurred.store(blurred, Ordering::SeqCst);
    }

    fn is_muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    fn sample_frame(&self) -> Result<FramePixels> {
        self.frames_sampled.fetch_add(1, Ordering::SeqCst);
        self.frame
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| anyhow!("no frame available"))
    }
}

pub(crate) struct FakePage {
    pub url: Mutex<String>,
    pub title: Mutex<String>,
    pub text: Mutex<String>,
    pub videos: Mutex<Vec<Arc<FakeVideo>>>,
    pub overlay: Mutex<Option<String>>,
}

impl FakePage {
    pub fn new(url: &str, title: &str) -> Arc<Self> {
        Arc::new(Self {
            url: Mutex::new(url.to_string()),
            title: Mutex::new(title.to_string()),
            text: Mutex::new(String::new()),
            videos: Mutex::new(Vec::new()),
            overlay: Mutex::new(None),
        })
    }

    pub fn add_video(&self, video: Arc<FakeVideo>) {
        self.videos.lock().unwrap().push(video);
    }

    pub fn set_text(&self, text: &str) {
        *self.text.lock().unwrap() = text.to_string();
    }
}

impl PageSurface for FakePage {
    fn url(&self) -> String {
        self.url.lock().unwrap().clone()
    }

    fn title(&self) -> String {
        self.title.lock().unwrap().clone()
    }

    fn visible_text(&self) -> String {
        self.text.lock().unwrap().clone()
    }

    fn videos(&self) -> Vec<Arc<dyn VideoSurface>> {
        self.videos
            .lock()
            .unwrap()
            .iter()
            .map(|video| video.clone() as Arc<dyn VideoSurface>)
            .collect()
    }

    fn show_overlay(&self, message: &str) {
        *self.overlay.lock().unwrap() = Some(message.to_string());
    }

    fn clear_overlay(&self) {
        *self.overlay.lock().unwrap() = None;
    }
}

pub(crate) fn bright_frame() -> FramePixels {
    FramePixels {
        rgba: vec![200; 8 * 8 * 4],
        width: 8,
        height: 8,
    }
}

pub(crate) fn black_frame() -> FramePixels {
    let mut rgba = vec![0; 8 * 8 * 4];
    // Keep the alpha channel opaque; only color channels decide darkness.
    for pixel in rgba.chunks_mut(4) {
        pixel[3] = 255;
    }
    FramePixels {
        rgba,
        width: 8,
        height: 8,
    }
}
