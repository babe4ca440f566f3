//! Capture stage: pulls frames from the source at a fixed cadence

use std::sync::Arc;
use std::time::Duration;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::channel::{FrameSender, SendOutcome};
use crate::source::FrameSource;
use crate::{Result, ScanError};

/// Counters reported when the capture loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub acquired: u64,
    pub delivered: u64,
    /// Frames released because the slot was still occupied
    pub dropped: u64,
    pub acquire_failures: u64,
}

/// Producer side of the pipeline.
///
/// Every acquired frame is either moved into the slot or released straight back
/// to the source; the loop never holds more than one frame.
pub struct CaptureLoop {
    source: Arc<dyn FrameSource>,
    sender: FrameSender,
    shutdown: CancellationToken,
    period: Duration,
    backoff: Duration,
}

impl CaptureLoop {
    /// # Errors
    ///
    /// [`ScanError::Config`] if `period` is zero.
    pub fn new(
        source: Arc<dyn FrameSource>,
        sender: FrameSender,
        shutdown: CancellationToken,
        period: Duration,
        backoff: Duration,
    ) -> Result<Self> {
        if period.is_zero() {
            return Err(ScanError::config("capture", "capture period must be non-zero"));
        }
        Ok(Self { source, sender, shutdown, period, backoff })
    }

    /// Run until shutdown is flagged or the consumer closes the slot
    pub async fn run(self) -> CaptureStats {
        info!(period_ms = self.period.as_millis() as u64, "Capture loop started");
        let mut stats = CaptureStats::default();

        let mut ticker = interval(self.period);
        // Delay rather than burst after a slow acquisition
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let acquired = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                result = self.source.acquire() => result,
            };

            let frame = match acquired {
                Ok(frame) => frame,
                Err(e) => {
                    stats.acquire_failures += 1;
                    warn!(failures = stats.acquire_failures, "Camera capture failed: {}", e);
                    tokio::select! {
                        biased;
                        _ = self.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.backoff) => continue,
                    }
                }
            };
            stats.acquired += 1;

            match self.sender.try_send(frame) {
                SendOutcome::Delivered => stats.delivered += 1,
                SendOutcome::RejectedFull(frame) => {
                    trace!(seq = frame.seq, "Decoder busy, dropping frame");
                    self.source.release(frame);
                    stats.dropped += 1;
                }
                SendOutcome::RejectedClosed(frame) => {
                    debug!(seq = frame.seq, "Frame slot closed");
                    self.source.release(frame);
                    break;
                }
            }
        }

        info!(
            acquired = stats.acquired,
            delivered = stats.delivered,
            dropped = stats.dropped,
            failures = stats.acquire_failures,
            "Capture loop stopped"
        );
        stats
    }
}
