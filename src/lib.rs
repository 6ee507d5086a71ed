pub mod analytics;
pub mod config;
pub mod correlate;
pub mod errors;
pub mod gateway;
pub mod net;
pub mod serial;
pub mod shared_types;
pub mod translate;
pub mod wire;

pub use config::Config;
pub use errors::GatewayError;
pub use gateway::{Gateway, GatewaySettings};
pub use serial::Transport;
