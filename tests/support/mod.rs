use std::time::Duration;

use tokio::io::{AsyncReadExt, DuplexStream};
use tokio::time::{sleep, timeout};

use coingate::{Gateway, GatewaySettings, Transport};

// -----------------------------------------------------------------------------
// ----- Harness ---------------------------------------------------------------

/// A gateway wired to two in-memory transports. The test drives `acm` and
/// `stm` as if it were the respective peer.
pub struct Harness {
    pub gateway: Gateway,
    pub acm: DuplexStream,
    pub stm: DuplexStream,
}

pub fn fast_settings() -> GatewaySettings {
    GatewaySettings {
        read_timeout: Duration::from_millis(20),
        correlation_timeout: Duration::from_millis(200),
        // Keep the reporter quiet for the whole test run.
        report_interval: Duration::from_secs(3600),
        ..GatewaySettings::default()
    }
}

pub fn start_gateway_with(settings: GatewaySettings) -> Harness {
    let (acm, acm_side) = tokio::io::duplex(4096);
    let (stm, stm_side) = tokio::io::duplex(4096);

    let gateway = Gateway::new(settings);
    gateway
        .start(Transport::Memory(acm_side), Transport::Memory(stm_side))
        .expect("gateway starts");

    Harness { gateway, acm, stm }
}

pub fn start_gateway() -> Harness {
    start_gateway_with(fast_settings())
}

// -----------------------------------------------------------------------------
// ----- Stream helpers --------------------------------------------------------

/// Read byte-by-byte until `terminator`, panicking after two seconds.
pub async fn read_until(stream: &mut DuplexStream, terminator: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();

    timeout(Duration::from_secs(2), async {
        let mut byte = [0u8; 1];
        loop {
            stream.read_exact(&mut byte).await.expect("peer closed");
            out.push(byte[0]);
            if out.ends_with(terminator) {
                break;
            }
        }
    })
    .await
    .expect("timed out waiting for terminator");

    out
}

/// Assert nothing arrives within a few gateway read timeouts.
#[allow(dead_code)]
pub async fn assert_silent(stream: &mut DuplexStream) {
    let mut buf = [0u8; 64];

    match timeout(Duration::from_millis(150), stream.read(&mut buf)).await {
        Err(_) => {}
        Ok(read) => {
            let n = read.expect("read failed");
            assert_eq!(
                n,
                0,
                "expected silence, got {:?}",
                String::from_utf8_lossy(&buf[..n])
            );
        }
    }
}

/// Poll `cond` for up to one second.
#[allow(dead_code)]
pub async fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    for _ in 0..100 {
        if cond() {
            return;
        }
        sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
