use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt};

use coingate::{serial, Config, Gateway, GatewayError};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

const APP_NAME: &str = "coingate";

// -----------------------------------------------------------------------------
// ----- Main ------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), GatewayError> {
    setup().await;
    run().await
}

// -----------------------------------------------------------------------------
// ----- Setup -----------------------------------------------------------------

async fn setup() {
    // This has to be the first thing we do, because it initializes the config
    Config::init().await;

    init_tracing();
}

fn init_tracing() {
    let config = Config::snapshot();
    let filter = EnvFilter::try_new(config.log_level.as_str()).unwrap();
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

// -----------------------------------------------------------------------------
// ----- Run -------------------------------------------------------------------

async fn run() -> Result<(), GatewayError> {
    let config = Config::snapshot();

    // Open failures are the one fatal path: without both peers there is
    // nothing to bridge.
    let front = serial::open(&config.acm)?;
    let back = serial::open(&config.stm)?;

    let gateway = Gateway::new(config.gateway.clone());
    gateway.start(front, back)?;

    info!(
        "{} bridging {} (acm) <-> {} (stm32)",
        APP_NAME, config.acm.device, config.stm.device
    );

    if let Err(e) = signal::ctrl_c().await {
        error!("signal listener failed: {e}");
    }

    info!("{} shutting down", APP_NAME);
    gateway.stop().await?;

    Ok(())
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
