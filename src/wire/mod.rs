pub mod codec;
pub mod message;

pub use codec::CodecError;
pub use message::{Command, Message};
