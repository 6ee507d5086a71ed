use thiserror::Error;

use crate::shared_types::GatewayState;

// -----------------------------------------------------------------------------
// ----- GatewayError ----------------------------------------------------------

/// Fatal errors only. Everything that happens inside a running pump loop
/// (timeouts, overflow, decode failures, bad commands) is recovered locally
/// and counted; it never surfaces through this type.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("failed to open serial port {device}: {source}")]
    SerialOpen {
        device: String,
        #[source]
        source: tokio_serial::Error,
    },

    #[error("gateway is {}, expected {}", .actual.as_str(), .expected.as_str())]
    InvalidState {
        actual: GatewayState,
        expected: GatewayState,
    },
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
