use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;

use crate::net::Frame;
use crate::wire::message::{Command, Message};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

/// STM32 lines end in CRLF.
pub const BACK_END_TERMINATOR: &[u8] = b"\r\n";

/// ACM replies end in a newline followed by the literal prompt marker the
/// command module expects before it will accept the next command.
pub const FRONT_END_TERMINATOR: &[u8] = b"\n>";

// -----------------------------------------------------------------------------
// ----- CodecError ------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CodecError {
    /// `Message::Unknown` has no wire form; it exists for logging only.
    #[error("unknown message has no wire encoding")]
    Untranslatable,

    #[error("message serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

// -----------------------------------------------------------------------------
// ----- Decode ----------------------------------------------------------------

/// Parse one back-end frame. Never fails: anything that is not a recognized
/// tagged message comes back as `Message::Unknown` carrying the raw payload,
/// and the caller counts the error. Decoding errors are data, not faults.
pub fn decode_back_end(frame: &Frame) -> Message {
    match serde_json::from_slice::<Message>(&frame.payload) {
        Ok(message) => message,
        Err(_) => Message::Unknown {
            raw: frame.payload.clone(),
        },
    }
}

/// A front-end frame is the line content verbatim, minus a stray `\r` left
/// behind by CRLF-sending terminals.
pub fn decode_front_end(frame: &Frame) -> Command {
    let text = String::from_utf8_lossy(&frame.payload);
    let trimmed = text.strip_suffix('\r').unwrap_or(&text);

    Command(trimmed.to_string())
}

// -----------------------------------------------------------------------------
// ----- Encode ----------------------------------------------------------------

/// Serialize a message to its JSON-line wire form. Deterministic, and
/// round-trips with `decode_back_end` for every defined tag.
pub fn encode_back_end(message: &Message) -> Result<Bytes, CodecError> {
    if let Message::Unknown { .. } = message {
        return Err(CodecError::Untranslatable);
    }

    let json = serde_json::to_vec(message)?;

    let mut buf = BytesMut::with_capacity(json.len() + BACK_END_TERMINATOR.len());
    buf.put_slice(&json);
    buf.put_slice(BACK_END_TERMINATOR);

    Ok(buf.freeze())
}

pub fn encode_front_end(text: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(text.len() + FRONT_END_TERMINATOR.len());
    buf.put_slice(text.as_bytes());
    buf.put_slice(FRONT_END_TERMINATOR);

    buf.freeze()
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
