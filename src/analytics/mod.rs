//! Gateway counters and the periodic reporter.
//!
//! One explicitly constructed instance is owned by the orchestrator and
//! injected into both pump loops; nothing in here is a global.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::info;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(10);

// -----------------------------------------------------------------------------
// ----- StatsSnapshot ---------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub front_end_frames: u64,
    pub back_end_frames: u64,
    pub errors: u64,
    pub uptime: Duration,
}

// -----------------------------------------------------------------------------
// ----- GatewayStatistics -----------------------------------------------------

#[derive(Debug)]
pub struct GatewayStatistics {
    front_end_frames: AtomicU64,
    back_end_frames: AtomicU64,
    errors: AtomicU64,
    started_at: Instant,
}

// -----------------------------------------------------------------------------
// ----- GatewayStatistics: Static ---------------------------------------------

impl GatewayStatistics {
    pub fn new() -> Self {
        Self {
            front_end_frames: AtomicU64::new(0),
            back_end_frames: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            started_at: Instant::now(),
        }
    }
}

impl Default for GatewayStatistics {
    fn default() -> Self {
        Self::new()
    }
}

// -----------------------------------------------------------------------------
// ----- GatewayStatistics: Public ---------------------------------------------

impl GatewayStatistics {
    pub fn inc_front_end_frame(&self) {
        self.front_end_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_back_end_frame(&self) {
        self.back_end_frames.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            front_end_frames: self.front_end_frames.load(Ordering::Relaxed),
            back_end_frames: self.back_end_frames.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            uptime: self.started_at.elapsed(),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Exported: report_loop() -----------------------------------------------

/// Emit one INFO line per interval until cancelled. The log stream is the
/// reporting sink; anything heavier subscribes to `snapshot()` itself.
pub async fn report_loop(
    stats: Arc<GatewayStatistics>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    // The first tick fires immediately; skip it so the first report carries
    // a full interval of traffic.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let snapshot = stats.snapshot();
                info!(
                    "gateway stats: acm_frames={} stm_frames={} errors={} uptime={}",
                    snapshot.front_end_frames,
                    snapshot.back_end_frames,
                    snapshot.errors,
                    humantime::format_duration(Duration::from_secs(snapshot.uptime.as_secs())),
                );
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
