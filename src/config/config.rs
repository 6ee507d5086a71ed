use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};

use super::{cli::CliConfig, tuning::Tuning, types::LogLevel};
use crate::gateway::GatewaySettings;
use crate::serial::SerialSettings;

// -----------------------------------------------------------------------------
// ----- Global Singleton ------------------------------------------------------

static ROOT_CONFIG: OnceLock<Arc<RwLock<Config>>> = OnceLock::new();

// -----------------------------------------------------------------------------
// ----- Config ----------------------------------------------------------------

/// Presentation-layer only: the binary resolves CLI, environment, and the
/// tuning file here, then hands plain settings structs to the gateway. The
/// gateway itself never reads this singleton.
#[derive(Clone, Debug)]
pub struct Config {
    pub acm: SerialSettings,
    pub stm: SerialSettings,
    pub log_level: LogLevel,
    pub gateway: GatewaySettings,
}

// -----------------------------------------------------------------------------
// ----- Config: Static --------------------------------------------------------

impl Config {
    /// Async because the tuning file is read with non-blocking IO.
    pub async fn init() {
        CliConfig::init();

        let cli = CliConfig::snapshot();
        Tuning::init(cli.tuning_file.as_deref()).await;

        Self::load();
    }

    pub fn snapshot() -> Config {
        Self::handle().read().clone()
    }
}

// -----------------------------------------------------------------------------
// ----- Config: Private -------------------------------------------------------

impl Config {
    fn load() {
        let cli = CliConfig::snapshot();
        let tuning = Tuning::snapshot();

        let next = Config {
            acm: SerialSettings::new(cli.acm_device, cli.baud),
            stm: SerialSettings::new(cli.stm_device, cli.baud),
            log_level: cli.log_level,
            gateway: tuning.to_gateway_settings(),
        };

        if let Some(handle) = ROOT_CONFIG.get() {
            *handle.write() = next;
        } else {
            let _ = ROOT_CONFIG.set(Arc::new(RwLock::new(next)));
        }
    }

    fn handle() -> Arc<RwLock<Config>> {
        ROOT_CONFIG
            .get()
            .expect("Config not initialized; call Config::init().await first")
            .clone()
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
