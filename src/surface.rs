use std::sync::Arc;

use anyhow::Result;

/// Raw RGBA frame sampled from a video element.
#[derive(Clone)]
pub struct FramePixels {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// One playable video on the page. The engine never touches the host's
/// rendering machinery directly; every effect and every probe goes
/// through this boundary.
pub trait VideoSurface: Send + Sync {
    /// Stable identity of the element for the lifetime of the page.
    fn id(&self) -> String;

    /// Current playback position in seconds.
    fn playback_position(&self) -> f64;

    fn is_paused(&self) -> bool;

    fn has_ended(&self) -> bool;

    fn seek_forward(&self, seconds: f64);

    fn set_blurred(&self, blurred: bool);

    fn is_muted(&self) -> bool;

    fn set_muted(&self, muted: bool);

    /// Capture the frame currently on screen, downscaled by the host to
    /// whatever the sampling surface provides.
    fn sample_frame(&self) -> Result<FramePixels>;
}

/// The page hosting the videos: navigation identity, visible text for
/// keyword scans, and the one full-viewport overlay slot.
pub trait PageSurface: Send + Sync {
    fn url(&self) -> String;

    fn title(&self) -> String;

    fn visible_text(&self) -> String;

    fn videos(&self) -> Vec<Arc<dyn VideoSurface>>;

    /// Cover the viewport with an opaque message layer. Replaces any
    /// prior overlay.
    fn show_overlay(&self, message: &str);

    fn clear_overlay(&self);
}
