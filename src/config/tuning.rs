use std::path::{Path, PathBuf};
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Deserialize;
use thiserror::Error;
use tokio::fs;

use crate::gateway::GatewaySettings;

// -----------------------------------------------------------------------------
// ----- Singleton -------------------------------------------------------------

static TUNING: OnceCell<Tuning> = OnceCell::new();

// -----------------------------------------------------------------------------
// ----- Tuning ----------------------------------------------------------------

/// Framing and timing knobs that ship with sane defaults. The overflow
/// threshold pair (`capacity`, `slack`) is deliberately configurable rather
/// than a hardcoded margin.
#[derive(Debug, Clone)]
pub struct Tuning {
    pub read_timeout: Duration,
    pub accumulator_capacity: usize,
    pub accumulator_slack: usize,
    pub correlation_timeout: Duration,
    pub report_interval: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        let defaults = GatewaySettings::default();
        Self {
            read_timeout: defaults.read_timeout,
            accumulator_capacity: defaults.accumulator_capacity,
            accumulator_slack: defaults.accumulator_slack,
            correlation_timeout: defaults.correlation_timeout,
            report_interval: defaults.report_interval,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tuning: Static --------------------------------------------------------

impl Tuning {
    /// Init: panic on any error. Do not continue with a bad state. A missing
    /// path means defaults.
    pub async fn init(path: Option<&Path>) {
        let tuning = match path {
            Some(path) => Self::from_file_async(path)
                .await
                .unwrap_or_else(|e| panic!("failed to load tuning from {:?}: {e}", path)),
            None => Tuning::default(),
        };

        TUNING
            .set(tuning)
            .unwrap_or_else(|_| panic!("Tuning::init called twice"));
    }

    pub fn snapshot() -> Tuning {
        TUNING.get().cloned().unwrap_or_default()
    }
}

// -----------------------------------------------------------------------------
// ----- Tuning: Public --------------------------------------------------------

impl Tuning {
    pub fn to_gateway_settings(&self) -> GatewaySettings {
        GatewaySettings {
            read_timeout: self.read_timeout,
            accumulator_capacity: self.accumulator_capacity,
            accumulator_slack: self.accumulator_slack,
            correlation_timeout: self.correlation_timeout,
            report_interval: self.report_interval,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Tuning: Private -------------------------------------------------------

impl Tuning {
    async fn from_file_async(path: &Path) -> Result<Tuning, TuningError> {
        let raw = fs::read_to_string(path).await.map_err(|e| TuningError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&raw)
    }

    fn parse(raw: &str) -> Result<Tuning, TuningError> {
        let doc: TuningFile = toml::from_str(raw).map_err(|e| TuningError::Toml { source: e })?;

        let tuning = Tuning {
            read_timeout: Duration::from_millis(doc.read_timeout_ms),
            accumulator_capacity: doc.accumulator_capacity,
            accumulator_slack: doc.accumulator_slack,
            correlation_timeout: Duration::from_millis(doc.correlation_timeout_ms),
            report_interval: Duration::from_secs(doc.report_interval_secs),
        };

        validate(&tuning)?;
        Ok(tuning)
    }
}

fn validate(tuning: &Tuning) -> Result<(), TuningError> {
    if tuning.accumulator_slack >= tuning.accumulator_capacity {
        return Err(TuningError::InvalidField(
            "accumulator_slack must be smaller than accumulator_capacity".to_string(),
        ));
    }

    if tuning.read_timeout.is_zero() {
        return Err(TuningError::InvalidField(
            "read_timeout_ms must be non-zero".to_string(),
        ));
    }

    Ok(())
}

// -----------------------------------------------------------------------------
// ----- Internal: file schema -------------------------------------------------

#[derive(Debug, Deserialize)]
struct TuningFile {
    #[serde(default = "default_read_timeout_ms")]
    read_timeout_ms: u64,

    #[serde(default = "default_accumulator_capacity")]
    accumulator_capacity: usize,

    #[serde(default = "default_accumulator_slack")]
    accumulator_slack: usize,

    #[serde(default = "default_correlation_timeout_ms")]
    correlation_timeout_ms: u64,

    #[serde(default = "default_report_interval_secs")]
    report_interval_secs: u64,
}

fn default_read_timeout_ms() -> u64 {
    Tuning::default().read_timeout.as_millis() as u64
}

fn default_accumulator_capacity() -> usize {
    Tuning::default().accumulator_capacity
}

fn default_accumulator_slack() -> usize {
    Tuning::default().accumulator_slack
}

fn default_correlation_timeout_ms() -> u64 {
    Tuning::default().correlation_timeout.as_millis() as u64
}

fn default_report_interval_secs() -> u64 {
    Tuning::default().report_interval.as_secs()
}

// -----------------------------------------------------------------------------
// ----- TuningError -----------------------------------------------------------

#[derive(Debug, Error)]
pub enum TuningError {
    #[error("invalid field: {0}")]
    InvalidField(String),

    #[error("read error for {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parse error: {source}")]
    Toml {
        #[source]
        source: toml::de::Error,
    },
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
