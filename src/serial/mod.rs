//! Serial transport boundary: open a port with the fixed line discipline
//! and wrap it behind one stream type the gateway can split and pump.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, DuplexStream, ReadBuf};
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

use crate::errors::GatewayError;

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

pub const DEFAULT_BAUD: u32 = 115_200;

// -----------------------------------------------------------------------------
// ----- SerialSettings --------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SerialSettings {
    pub device: String,
    pub baud: u32,
}

impl SerialSettings {
    pub fn new(device: impl Into<String>, baud: u32) -> Self {
        Self {
            device: device.into(),
            baud,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Exported: open() ------------------------------------------------------

/// Open a peer port. 8 data bits, no parity, and two stop bits; the stop-bit
/// count is a hard compatibility requirement of the peer firmware and must
/// not be made configurable.
pub fn open(settings: &SerialSettings) -> Result<Transport, GatewayError> {
    let stream = tokio_serial::new(&settings.device, settings.baud)
        .data_bits(DataBits::Eight)
        .parity(Parity::None)
        .stop_bits(StopBits::Two)
        .flow_control(FlowControl::None)
        .open_native_async()
        .map_err(|source| GatewayError::SerialOpen {
            device: settings.device.clone(),
            source,
        })?;

    Ok(Transport::Serial(stream))
}

// -----------------------------------------------------------------------------
// ----- Transport -------------------------------------------------------------

/// One peer connection. `Serial` is the real port; `Memory` is one end of a
/// `tokio::io::duplex` pair, used by harnesses that stand in for a peer.
pub enum Transport {
    Serial(SerialStream),
    Memory(DuplexStream),
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Serial(_) => f.write_str("Transport::Serial"),
            Transport::Memory(_) => f.write_str("Transport::Memory"),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Transport: AsyncRead / AsyncWrite -------------------------------------

impl AsyncRead for Transport {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Serial(stream) => Pin::new(stream).poll_read(cx, buf),
            Transport::Memory(stream) => Pin::new(stream).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for Transport {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        match self.get_mut() {
            Transport::Serial(stream) => Pin::new(stream).poll_write(cx, buf),
            Transport::Memory(stream) => Pin::new(stream).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Serial(stream) => Pin::new(stream).poll_flush(cx),
            Transport::Memory(stream) => Pin::new(stream).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.get_mut() {
            Transport::Serial(stream) => Pin::new(stream).poll_shutdown(cx),
            Transport::Memory(stream) => Pin::new(stream).poll_shutdown(cx),
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
