use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::analytics::{self, GatewayStatistics, StatsSnapshot, DEFAULT_REPORT_INTERVAL};
use crate::correlate::{CorrelationTracker, DEFAULT_TIMEOUT};
use crate::errors::GatewayError;
use crate::gateway::pump::{self, PumpShared, SharedWriter};
use crate::net::frame_assembler::{FrameAssembler, DEFAULT_CAPACITY, DEFAULT_SLACK};
use crate::serial::Transport;
use crate::shared_types::GatewayState;
use crate::wire::Command;

// -----------------------------------------------------------------------------
// ----- GatewaySettings -------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GatewaySettings {
    /// Upper bound on a blocking read; also the shutdown latency bound.
    pub read_timeout: Duration,
    pub accumulator_capacity: usize,
    pub accumulator_slack: usize,
    pub correlation_timeout: Duration,
    pub report_interval: Duration,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(100),
            accumulator_capacity: DEFAULT_CAPACITY,
            accumulator_slack: DEFAULT_SLACK,
            correlation_timeout: DEFAULT_TIMEOUT,
            report_interval: DEFAULT_REPORT_INTERVAL,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Gateway ---------------------------------------------------------------

/// Owns both peer connections and everything the pumps share. Statistics and
/// the correlation tracker are constructed here and injected into the loops;
/// there are no process-wide globals.
pub struct Gateway {
    settings: GatewaySettings,
    state: parking_lot::Mutex<GatewayState>,
    stats: Arc<GatewayStatistics>,
    tracker: Arc<CorrelationTracker>,
    cancel: parking_lot::Mutex<CancellationToken>,
    tasks: parking_lot::Mutex<Vec<JoinHandle<()>>>,
    front_writer: parking_lot::Mutex<Option<SharedWriter>>,
    back_writer: parking_lot::Mutex<Option<SharedWriter>>,
}

// -----------------------------------------------------------------------------
// ----- Gateway: Static -------------------------------------------------------

impl Gateway {
    pub fn new(settings: GatewaySettings) -> Self {
        let tracker = Arc::new(CorrelationTracker::new(settings.correlation_timeout));

        Self {
            settings,
            state: parking_lot::Mutex::new(GatewayState::Stopped),
            stats: Arc::new(GatewayStatistics::new()),
            tracker,
            cancel: parking_lot::Mutex::new(CancellationToken::new()),
            tasks: parking_lot::Mutex::new(Vec::new()),
            front_writer: parking_lot::Mutex::new(None),
            back_writer: parking_lot::Mutex::new(None),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Gateway: Public -------------------------------------------------------

impl Gateway {
    /// Launch both pump loops, the statistics reporter, and the correlation
    /// sweep over already-opened transports. Transport opening is the
    /// caller's job so that open failures stay fatal at startup.
    pub fn start(&self, front: Transport, back: Transport) -> Result<(), GatewayError> {
        self.transition(GatewayState::Stopped, GatewayState::Starting)?;

        let cancel = CancellationToken::new();
        *self.cancel.lock() = cancel.clone();

        let (front_reader, front_writer) = tokio::io::split(front);
        let (back_reader, back_writer) = tokio::io::split(back);

        let front_writer: SharedWriter = Arc::new(tokio::sync::Mutex::new(front_writer));
        let back_writer: SharedWriter = Arc::new(tokio::sync::Mutex::new(back_writer));
        *self.front_writer.lock() = Some(front_writer.clone());
        *self.back_writer.lock() = Some(back_writer.clone());

        let shared = PumpShared {
            stats: self.stats.clone(),
            tracker: self.tracker.clone(),
            cancel: cancel.clone(),
            read_timeout: self.settings.read_timeout,
        };

        let front_assembler = FrameAssembler::front_end(
            self.settings.accumulator_capacity,
            self.settings.accumulator_slack,
        );
        let back_assembler = FrameAssembler::back_end(
            self.settings.accumulator_capacity,
            self.settings.accumulator_slack,
        );

        let tasks = vec![
            tokio::spawn(pump::run_front_end_pump(
                shared.clone(),
                front_reader,
                front_writer.clone(),
                back_writer.clone(),
                front_assembler,
            )),
            tokio::spawn(pump::run_back_end_pump(
                shared.clone(),
                back_reader,
                front_writer,
                back_assembler,
            )),
            tokio::spawn(analytics::report_loop(
                self.stats.clone(),
                self.settings.report_interval,
                cancel.clone(),
            )),
            tokio::spawn(Self::expiry_loop(self.tracker.clone(), cancel)),
        ];
        *self.tasks.lock() = tasks;

        self.transition(GatewayState::Starting, GatewayState::Running)?;
        info!("gateway running");

        Ok(())
    }

    /// Cooperative shutdown: pumps observe the token between reads, so the
    /// latency bound is one read timeout. Frames already being processed are
    /// finished, not discarded.
    pub async fn stop(&self) -> Result<(), GatewayError> {
        self.transition(GatewayState::Running, GatewayState::Stopping)?;

        self.cancel.lock().cancel();

        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            let _ = task.await;
        }

        // Dropping the write halves closes the transports.
        *self.front_writer.lock() = None;
        *self.back_writer.lock() = None;

        self.transition(GatewayState::Stopping, GatewayState::Stopped)?;
        info!("gateway stopped");

        Ok(())
    }

    /// Control plane: run an operator-issued command through the same
    /// translate path and the same write locks as ACM traffic.
    pub async fn inject_command(&self, line: &str) -> Result<(), GatewayError> {
        let (front_writer, back_writer) = self.writers()?;

        let shared = PumpShared {
            stats: self.stats.clone(),
            tracker: self.tracker.clone(),
            cancel: self.cancel.lock().clone(),
            read_timeout: self.settings.read_timeout,
        };

        let command = Command(line.trim_end_matches(['\r', '\n']).to_string());
        pump::forward_command(&shared, &command, &front_writer, &back_writer).await;

        Ok(())
    }

    pub fn state(&self) -> GatewayState {
        *self.state.lock()
    }

    pub fn statistics(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn pending_requests(&self) -> usize {
        self.tracker.len()
    }
}

// -----------------------------------------------------------------------------
// ----- Gateway: Private ------------------------------------------------------

impl Gateway {
    fn transition(&self, expected: GatewayState, next: GatewayState) -> Result<(), GatewayError> {
        let mut guard = self.state.lock();

        if *guard != expected {
            return Err(GatewayError::InvalidState {
                actual: *guard,
                expected,
            });
        }

        *guard = next;
        Ok(())
    }

    fn writers(&self) -> Result<(SharedWriter, SharedWriter), GatewayError> {
        let front = self.front_writer.lock().clone();
        let back = self.back_writer.lock().clone();

        match (front, back) {
            (Some(front), Some(back)) => Ok((front, back)),
            _ => Err(GatewayError::InvalidState {
                actual: self.state(),
                expected: GatewayState::Running,
            }),
        }
    }

    async fn expiry_loop(tracker: Arc<CorrelationTracker>, cancel: CancellationToken) {
        let sweep = (tracker.timeout() / 2).max(Duration::from_millis(100));
        let mut ticker = tokio::time::interval(sweep);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    for pending in tracker.expire(Instant::now()) {
                        warn!(
                            "no stm32 response for idex {} after {:?}",
                            pending.idex,
                            pending.sent_at.elapsed(),
                        );
                    }
                }
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_before_start_is_refused() {
        let gateway = Gateway::new(GatewaySettings::default());

        let error = gateway.stop().await.unwrap_err();
        assert!(matches!(
            error,
            GatewayError::InvalidState {
                actual: GatewayState::Stopped,
                expected: GatewayState::Running,
            }
        ));
    }

    #[tokio::test]
    async fn inject_before_start_is_refused() {
        let gateway = Gateway::new(GatewaySettings::default());
        assert!(gateway.inject_command("ver").await.is_err());
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
