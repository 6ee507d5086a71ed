use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// -----------------------------------------------------------------------------
// ----- Command ---------------------------------------------------------------

/// One ACM line without its terminator. Free-form text; structure only
/// appears when the translator matches it against the routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command(pub String);

impl Command {
    /// First whitespace-separated token, used as the routing verb.
    pub fn verb(&self) -> &str {
        self.0.split_whitespace().next().unwrap_or("")
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// -----------------------------------------------------------------------------
// ----- Message ---------------------------------------------------------------

/// One STM32 wire message, tagged by its `MsgType` field. Exactly one tag is
/// set per message; fields are the tag-specific ones the controller firmware
/// emits, nothing more.
///
/// `Unknown` carries payloads that failed to parse or carry an unrecognized
/// tag. It exists for logging only: it is never serialized and never
/// translated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "MsgType")]
pub enum Message {
    /// Data/config blob: function names, numeric results. No correlation id.
    M1 {
        #[serde(flatten)]
        payload: Map<String, Value>,
    },

    /// Indexed request/acknowledgement pair, correlated through `idex`.
    M2 {
        idex: u64,
        #[serde(flatten)]
        payload: Map<String, Value>,
    },

    /// Network provisioning credentials.
    M3 {
        ssid: String,
        pass: String,
        path: String,
    },

    /// Status/version traffic: a query for identifiers, a control action
    /// (`wait` / `version` / `status`), or a readiness response.
    M4 {
        #[serde(rename = "cVer", skip_serializing_if = "Option::is_none")]
        controller_version: Option<String>,

        #[serde(rename = "lVer", skip_serializing_if = "Option::is_none")]
        logic_version: Option<String>,

        #[serde(rename = "devType", skip_serializing_if = "Option::is_none")]
        device_type: Option<String>,

        #[serde(skip_serializing_if = "Option::is_none")]
        uid: Option<String>,

        #[serde(skip_serializing_if = "Option::is_none")]
        action: Option<String>,

        #[serde(skip_serializing_if = "Option::is_none")]
        ready: Option<String>,
    },

    /// Firmware update announcement.
    M5 { version: String },

    /// Opaque passthrough keyed by a topic-type integer.
    M6 {
        #[serde(rename = "tpcType")]
        topic_type: i64,
        data: Value,
    },

    #[serde(skip)]
    Unknown { raw: Bytes },
}

// -----------------------------------------------------------------------------
// ----- Message: Static -------------------------------------------------------

impl Message {
    /// Empty M4 shell; callers fill in the fields they need.
    pub fn m4() -> Message {
        Message::M4 {
            controller_version: None,
            logic_version: None,
            device_type: None,
            uid: None,
            action: None,
            ready: None,
        }
    }

    /// M4 carrying only a control action (`wait` / `version` / `status`).
    pub fn m4_action(action: &str) -> Message {
        Message::M4 {
            controller_version: None,
            logic_version: None,
            device_type: None,
            uid: None,
            action: Some(action.to_string()),
            ready: None,
        }
    }
}

// -----------------------------------------------------------------------------
// ----- Message: Public -------------------------------------------------------

impl Message {
    pub fn msg_type(&self) -> &'static str {
        match self {
            Message::M1 { .. } => "M1",
            Message::M2 { .. } => "M2",
            Message::M3 { .. } => "M3",
            Message::M4 { .. } => "M4",
            Message::M5 { .. } => "M5",
            Message::M6 { .. } => "M6",
            Message::Unknown { .. } => "unknown",
        }
    }

    /// Correlation id, for the one tag that carries it.
    pub fn idex(&self) -> Option<u64> {
        match self {
            Message::M2 { idex, .. } => Some(*idex),
            _ => None,
        }
    }
}

// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
