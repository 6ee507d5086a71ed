//! The two direction pipelines: read, frame, decode, translate, write.
//!
//! Each pump owns its read half and frame assembler outright. Write halves
//! are shared behind per-transport locks because rejection replies and the
//! control plane cross pump boundaries, and a serial port is not a safe
//! concurrent-write resource.

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::analytics::GatewayStatistics;
use crate::correlate::CorrelationTracker;
use crate::net::FrameAssembler;
use crate::serial::Transport;
use crate::translate::{self, CommandRoute, MessageRoute};
use crate::wire::codec;
use crate::wire::Command;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const SCRATCH_CAPACITY_HINT: usize = 1024;

// -----------------------------------------------------------------------------
// ----- Shared state ----------------------------------------------------------

pub(crate) type SharedWriter = Arc<Mutex<WriteHalf<Transport>>>;

/// State both pumps carry; everything else is owned per-loop.
#[derive(Clone)]
pub(crate) struct PumpShared {
    pub stats: Arc<GatewayStatistics>,
    pub tracker: Arc<CorrelationTracker>,
    pub cancel: CancellationToken,
    pub read_timeout: Duration,
}

// -----------------------------------------------------------------------------
// ----- Front-end pump: ACM -> STM32 ------------------------------------------

pub(crate) async fn run_front_end_pump(
    shared: PumpShared,
    mut reader: ReadHalf<Transport>,
    front_writer: SharedWriter,
    back_writer: SharedWriter,
    mut assembler: FrameAssembler,
) {
    let mut scratch = BytesMut::with_capacity(SCRATCH_CAPACITY_HINT);

    while let Some(n) = read_step(&shared, &mut reader, &mut scratch, "acm").await {
        if n == 0 {
            continue;
        }

        let result = assembler.feed(&scratch);
        if result.overflow {
            shared.stats.inc_error();
            warn!("acm accumulator overflowed without a delimiter; buffer discarded");
        }

        for frame in result.frames {
            shared.stats.inc_front_end_frame();

            let command = codec::decode_front_end(&frame);
            forward_command(&shared, &command, &front_writer, &back_writer).await;
        }
    }

    debug!("acm pump exited");
}

/// Translate one command and write the outcome. Also the control-plane
/// entry point: operator-injected commands go through this exact path.
pub(crate) async fn forward_command(
    shared: &PumpShared,
    command: &Command,
    front_writer: &SharedWriter,
    back_writer: &SharedWriter,
) {
    match translate::route_command(command, &shared.tracker) {
        CommandRoute::Forward(message) => match codec::encode_back_end(&message) {
            Ok(bytes) => {
                debug!("acm -> stm32 [{}]: {command}", message.msg_type());
                if let Err(error) = write_locked(back_writer, &bytes).await {
                    shared.stats.inc_error();
                    warn!("stm32 write failed: {error}");
                }
            }
            Err(error) => {
                shared.stats.inc_error();
                warn!("cannot encode outbound message: {error}");
            }
        },

        CommandRoute::LocalReply(text) => {
            let bytes = codec::encode_front_end(&text);
            if let Err(error) = write_locked(front_writer, &bytes).await {
                shared.stats.inc_error();
                warn!("acm write failed: {error}");
            }
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Back-end pump: STM32 -> ACM -------------------------------------------

pub(crate) async fn run_back_end_pump(
    shared: PumpShared,
    mut reader: ReadHalf<Transport>,
    front_writer: SharedWriter,
    mut assembler: FrameAssembler,
) {
    let mut scratch = BytesMut::with_capacity(SCRATCH_CAPACITY_HINT);

    while let Some(n) = read_step(&shared, &mut reader, &mut scratch, "stm32").await {
        if n == 0 {
            continue;
        }

        let result = assembler.feed(&scratch);
        if result.overflow {
            shared.stats.inc_error();
            warn!("stm32 accumulator overflowed without a delimiter; buffer discarded");
        }

        for frame in result.frames {
            shared.stats.inc_back_end_frame();

            let message = codec::decode_back_end(&frame);

            if let Some(idex) = message.idex() {
                match shared.tracker.resolve(idex) {
                    Some(pending) => {
                        debug!("idex {idex} answered in {:?}", pending.sent_at.elapsed())
                    }
                    None => debug!("idex {idex} arrived with no pending request"),
                }
            }

            match translate::route_message(&message) {
                MessageRoute::Reply(text) => {
                    debug!("stm32 -> acm [{}]", message.msg_type());
                    if let Err(error) = write_locked(&front_writer, &codec::encode_front_end(&text)).await
                    {
                        shared.stats.inc_error();
                        warn!("acm write failed: {error}");
                    }
                }

                MessageRoute::Drop => {
                    shared.stats.inc_error();
                    warn!(
                        "unrecognised stm32 payload dropped: {:?}",
                        String::from_utf8_lossy(&frame.payload)
                    );
                }
            }
        }
    }

    debug!("stm32 pump exited");
}

// -----------------------------------------------------------------------------
// ----- Internal: read step ---------------------------------------------------

/// One bounded read into `scratch`. Returns `None` when the pump must exit
/// (cancellation), `Some(0)` when nothing usable arrived this round. A
/// timeout is expected idle behavior; any other read fault is counted and
/// retried after one timeout's pause. The pump never kills itself over
/// transient I/O.
async fn read_step(
    shared: &PumpShared,
    reader: &mut ReadHalf<Transport>,
    scratch: &mut BytesMut,
    label: &'static str,
) -> Option<usize> {
    if shared.cancel.is_cancelled() {
        return None;
    }

    scratch.clear();
    scratch.reserve(SCRATCH_CAPACITY_HINT);

    let read = tokio::select! {
        _ = shared.cancel.cancelled() => return None,
        result = timeout(shared.read_timeout, reader.read_buf(scratch)) => result,
    };

    match read {
        // Idle line; nothing to do this round.
        Err(_elapsed) => Some(0),

        Ok(Ok(0)) => {
            // A serial peer never reports EOF; an in-memory peer does when
            // its far end closes. Pause one timeout so the loop stays cheap
            // until cancellation or the peer comes back.
            tokio::time::sleep(shared.read_timeout).await;
            Some(0)
        }

        Ok(Ok(n)) => Some(n),

        Ok(Err(error)) => {
            shared.stats.inc_error();
            warn!("{label} read error: {error}");
            tokio::time::sleep(shared.read_timeout).await;
            Some(0)
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: locked write ------------------------------------------------

pub(crate) async fn write_locked(writer: &SharedWriter, bytes: &[u8]) -> std::io::Result<()> {
    let mut guard = writer.lock().await;
    guard.write_all(bytes).await?;
    guard.flush().await
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
