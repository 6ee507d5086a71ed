use clap::Parser;
use parking_lot::RwLock;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use super::types::LogLevel;
use crate::serial::DEFAULT_BAUD;

// -----------------------------------------------------------------------------
// ----- Global Singleton ------------------------------------------------------

static CLI_CONFIG: OnceLock<Arc<RwLock<CliConfig>>> = OnceLock::new();

// -----------------------------------------------------------------------------
// ----- CliConfig -------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct CliConfig {
    pub acm_device: String,
    pub stm_device: String,
    pub baud: u32,
    pub tuning_file: Option<PathBuf>,
    pub log_level: LogLevel,
}

impl CliConfig {
    pub fn init() {
        CLI_CONFIG.get_or_init(|| {
            let cfg = Self::from_args();
            cfg.validate();
            Arc::new(RwLock::new(cfg))
        });
    }

    pub fn snapshot() -> CliConfig {
        handle().read().clone()
    }
}

// -----------------------------------------------------------------------------
// ----- CliConfig: Private ----------------------------------------------------

impl CliConfig {
    fn from_args() -> Self {
        let args = Args::try_parse().unwrap_or_else(|e| panic!("Invalid CLI/ENV: {e}"));

        Self {
            acm_device: args.acm_device,
            stm_device: args.stm_device,
            baud: args.baud,
            tuning_file: args.tuning_file,
            log_level: args.log_level,
        }
    }

    fn validate(&self) {
        if let Some(path) = self.tuning_file.as_deref() {
            must_exist_file(path, "--tuning / coingate.toml");
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Args ------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "coingate", version, about = "ACM <-> STM32 serial gateway")]
struct Args {
    // ACM (command module) serial device. Required via CLI or ENV.
    #[arg(long = "acm-device", env = "COINGATE_ACM_DEVICE")]
    acm_device: String,

    // STM32 (game controller) serial device. Required via CLI or ENV.
    #[arg(long = "stm-device", env = "COINGATE_STM_DEVICE")]
    stm_device: String,

    // Shared baud rate; the peer firmware ships at 115200.
    #[arg(long = "baud", env = "COINGATE_BAUD", default_value_t = DEFAULT_BAUD)]
    baud: u32,

    // Optional TOML file with framing/timing overrides.
    #[arg(long = "tuning", env = "COINGATE_TUNING_FILE")]
    tuning_file: Option<PathBuf>,

    #[arg(long = "log", default_value = "info")]
    log_level: LogLevel,
}

// -----------------------------------------------------------------------------
// ----- Internal: Helpers -----------------------------------------------------

fn handle() -> Arc<RwLock<CliConfig>> {
    CLI_CONFIG
        .get()
        .expect("CliConfig not initialized; call CliConfig::init() first")
        .clone()
}

fn must_exist_file(path: &Path, what: &str) {
    let ok = fs::metadata(path).map(|m| m.is_file()).unwrap_or(false);
    if !ok {
        panic!("{what}: file not found at {path:?}");
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
