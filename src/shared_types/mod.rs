pub mod endpoint;
pub mod gateway_state;

pub use endpoint::Endpoint;
pub use gateway_state::GatewayState;
