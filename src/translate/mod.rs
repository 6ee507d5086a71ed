//! The fixed routing table between the two vocabularies.
//!
//! Front-end commands either become one outbound STM32 message or are
//! answered synchronously with a local reply; back-end messages either
//! become one ACM reply or are dropped. Nothing in here touches a transport.

use serde_json::{json, Value};

use crate::correlate::CorrelationTracker;
use crate::shared_types::Endpoint;
use crate::wire::{Command, Message};

// -----------------------------------------------------------------------------
// ----- Constants -------------------------------------------------------------

/// Fixed reply for a version request. The ACM expects this exact shape
/// independent of what the controller reports for itself.
pub const VERSION_REPLY: &str = r#"{"ver":"1.0.0"}"#;

/// Fixed readiness reply for a status request.
pub const STATUS_REPLY: &str = r#"{"status":"ready"}"#;

// -----------------------------------------------------------------------------
// ----- CommandRoute ----------------------------------------------------------

/// Outcome of routing one front-end command.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandRoute {
    /// Send this message to the back end.
    Forward(Message),
    /// Answer the front end directly; nothing goes downstream.
    LocalReply(String),
}

// -----------------------------------------------------------------------------
// ----- MessageRoute ----------------------------------------------------------

/// Outcome of routing one back-end message.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageRoute {
    /// Send this text (plus prompt terminator) to the front end.
    Reply(String),
    /// Unrecognized payload: log, count, answer nothing.
    Drop,
}

// -----------------------------------------------------------------------------
// ----- Exported: route_command() ---------------------------------------------

pub fn route_command(command: &Command, tracker: &CorrelationTracker) -> CommandRoute {
    match command.verb() {
        "ver" => CommandRoute::Forward(Message::m4_action("version")),
        "sta" => CommandRoute::Forward(Message::m4_action("status")),
        "wait" => CommandRoute::Forward(Message::m4_action("wait")),
        "algo" => route_algo(command, tracker),
        "net" => route_net(command),
        "upd" => route_upd(command),
        "cfg" => route_cfg(command),
        _ => CommandRoute::LocalReply(format!("Command not recognised: {command}")),
    }
}

// -----------------------------------------------------------------------------
// ----- Exported: route_message() ---------------------------------------------

pub fn route_message(message: &Message) -> MessageRoute {
    match message {
        Message::M1 { payload } => MessageRoute::Reply(Value::Object(payload.clone()).to_string()),

        Message::M2 { idex, payload } => {
            let mut reply = payload.clone();
            reply.insert("idex".into(), json!(idex));
            MessageRoute::Reply(Value::Object(reply).to_string())
        }

        Message::M4 { action: Some(action), .. } if action == "version" => {
            MessageRoute::Reply(VERSION_REPLY.to_string())
        }

        Message::M4 { action: Some(action), .. } if action == "status" => {
            MessageRoute::Reply(STATUS_REPLY.to_string())
        }

        Message::Unknown { .. } => MessageRoute::Drop,

        // Every remaining defined shape forwards its payload untouched.
        other => match serde_json::to_value(other) {
            Ok(value) => MessageRoute::Reply(value.to_string()),
            Err(_) => MessageRoute::Drop,
        },
    }
}

// -----------------------------------------------------------------------------
// ----- Internal: per-verb routing --------------------------------------------

fn route_algo(command: &Command, tracker: &CorrelationTracker) -> CommandRoute {
    let idex = tracker.register(Endpoint::FrontEnd);

    let mut payload = serde_json::Map::new();
    payload.insert("cmd".into(), json!(command.0));

    CommandRoute::Forward(Message::M2 { idex, payload })
}

fn route_net(command: &Command) -> CommandRoute {
    let args: Vec<&str> = command.0.split_whitespace().skip(1).collect();

    let [ssid, pass, path] = args[..] else {
        return CommandRoute::LocalReply("usage: net <ssid> <pass> <path>".to_string());
    };

    CommandRoute::Forward(Message::M3 {
        ssid: ssid.to_string(),
        pass: pass.to_string(),
        path: path.to_string(),
    })
}

fn route_upd(command: &Command) -> CommandRoute {
    let args: Vec<&str> = command.0.split_whitespace().skip(1).collect();

    let [version] = args[..] else {
        return CommandRoute::LocalReply("usage: upd <version>".to_string());
    };

    CommandRoute::Forward(Message::M5 {
        version: version.to_string(),
    })
}

fn route_cfg(command: &Command) -> CommandRoute {
    let rest = command.0.trim_start().strip_prefix("cfg").unwrap_or("");
    let mut parts = rest.trim_start().splitn(2, char::is_whitespace);

    let topic_type = parts.next().and_then(|t| t.parse::<i64>().ok());
    let data = parts.next().and_then(|d| serde_json::from_str::<Value>(d).ok());

    match (topic_type, data) {
        (Some(topic_type), Some(data)) => CommandRoute::Forward(Message::M6 { topic_type, data }),
        _ => CommandRoute::LocalReply("usage: cfg <topic-type> <json>".to_string()),
    }
}

// -----------------------------------------------------------------------------
// ----- Tests -----------------------------------------------------------------


// -----------------------------------------------------------------------------
// -----------------------------------------------------------------------------
