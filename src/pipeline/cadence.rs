/// Capture cadence loop
///
/// Runs on the capture thread: grabs a frame every tick, drops frames that
/// look like the previous capture and hands the rest to the recognition pool
/// under the next sequence id.
use super::workers::RecognitionPool;
use crate::capture::{similarity::is_changed, Frame, FrameSource};
use crate::error::CaptureError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

/// Frame counts for one run of the capture loop
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureReport {
    /// Frames sent to recognition; also the next unused sequence id
    pub dispatched: u64,
    /// Frames dropped as unchanged
    pub skipped: u64,
    /// Ticks where the source failed to produce a frame
    pub failed: u64,
}

/// Tick interval for a capture rate (0 is treated as 1 fps)
pub fn frame_interval(fps: u32) -> Duration {
    Duration::from_secs(1) / fps.max(1)
}

/// Capture until `stop` is set or the source is exhausted
pub fn run_capture_loop<S>(
    source: &mut S,
    pool: &RecognitionPool<S::Image>,
    interval: Duration,
    similarity_threshold: f32,
    stop: &AtomicBool,
) -> CaptureReport
where
    S: FrameSource,
    S::Image: Clone,
{
    let mut report = CaptureReport::default();
    let mut previous: Option<S::Image> = None;

    while !stop.load(Ordering::Acquire) {
        let tick = Instant::now();

        match source.capture() {
            Ok(captured) => {
                if is_changed(previous.as_ref(), &captured.image, similarity_threshold) {
                    pool.submit(Frame {
                        seq_id: report.dispatched,
                        timestamp: captured.timestamp,
                        image: captured.image.clone(),
                    });
                    report.dispatched += 1;
                } else {
                    report.skipped += 1;
                }
                previous = Some(captured.image);
            }
            Err(CaptureError::SourceExhausted) => {
                tracing::info!("Frame source exhausted");
                break;
            }
            Err(err) => {
                tracing::warn!("Capture failed: {err}");
                report.failed += 1;
            }
        }

        if let Some(remaining) = interval.checked_sub(tick.elapsed()) {
            thread::sleep(remaining);
        }
    }

    tracing::info!(
        "Capture loop finished: {} dispatched, {} unchanged, {} failed",
        report.dispatched,
        report.skipped,
        report.failed
    );
    report
}
