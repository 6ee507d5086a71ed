pub mod cli;
pub mod config;
pub mod tuning;
pub mod types;

pub use cli::CliConfig;
pub use config::Config;
pub use tuning::Tuning;
pub use types::LogLevel;
