use std::sync::{Arc, Mutex as StdMutex};

use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::surface::VideoSurface;

use super::binding::VideoBinding;
use super::cycle::{run_detection_cycle, CycleDeps};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

pub(crate) const POLL_INTERVAL_SECS: u64 = 2;
const CYCLE_TIMEOUT_SECS: u64 = 10;

/// Periodic detection loop for one bound video. Loops for different
/// videos tick independently of each other; this one stops when its
/// cancellation token fires (navigation or shutdown).
pub(crate) async fn monitor_loop(
    deps: CycleDeps,
    video: Arc<dyn VideoSurface>,
    binding: Arc<StdMutex<VideoBinding>>,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(Duration::from_secs(POLL_INTERVAL_SECS));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let video_id = video.id();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let fut = run_detection_cycle(&deps, &video, &binding);
                if tokio::time::timeout(Duration::from_secs(CYCLE_TIMEOUT_SECS), fut).await.is_err() {
                    log_warn!("detection cycle timeout (> {}s) on video {}", CYCLE_TIMEOUT_SECS, video_id);
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("monitor loop for video {} shutting down", video_id);
                break;
            }
        }
    }
}
