use serde::{Deserialize, Serialize};
use serde_json::Value;
use tungstenite::protocol::Message as WsMessage;

use crate::utils::Result;

/// Frames a client sends to the engine.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "connect")]
    Connect { nsp: String },

    #[serde(rename = "event")]
    Event {
        nsp: String,
        event: String,
        #[serde(default)]
        data: Vec<Value>,
    },

    #[serde(rename = "disconnect")]
    Disconnect { nsp: String },
}

/// Frames the engine sends to a client.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "connected")]
    Connected { nsp: String, sid: String },

    #[serde(rename = "connect_error")]
    ConnectError { nsp: String, message: String },

    #[serde(rename = "event")]
    Event {
        nsp: String,
        event: String,
        data: Vec<Value>,
    },

    #[serde(rename = "disconnect")]
    Disconnect { nsp: String },
}

impl ServerFrame {
    pub fn nsp(&self) -> &str {
        match self {
            Self::Connected { nsp, .. }
            | Self::ConnectError { nsp, .. }
            | Self::Event { nsp, .. }
            | Self::Disconnect { nsp } => nsp,
        }
    }

    pub(crate) fn encode(&self) -> Result<WsMessage> {
        Ok(WsMessage::text(serde_json::to_string(self)?))
    }
}

/// Namespace names always carry a leading slash; `""` means the root namespace.
pub fn normalize(name: &str) -> String {
    if name.starts_with('/') {
        name.to_string()
    } else {
        format!("/{name}")
    }
}
