use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};
use tungstenite::protocol::Message as WsMessage;

use super::frame::ServerFrame;
use super::namespace::WsNamespace;
use super::{read, write};
use crate::engine::{Emitter, EventHandler, Namespace, Socket};
use crate::utils::Result;

/// Reserved event name dispatched to `on` handlers when a socket goes away.
pub const DISCONNECT_EVENT: &str = "disconnect";

/// Where and when the underlying connection was established.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub address: SocketAddr,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// `disconnect()` was called on the server.
    ServerNamespaceDisconnect,
    /// The client sent a `disconnect` frame for this namespace.
    ClientNamespaceDisconnect,
    /// The WebSocket closed underneath the socket.
    TransportClose,
}

impl DisconnectReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ServerNamespaceDisconnect => "server namespace disconnect",
            Self::ClientNamespaceDisconnect => "client namespace disconnect",
            Self::TransportClose => "transport close",
        }
    }
}

/// A connection to one namespace over a shared WebSocket.
pub struct WsSocket {
    id: String,
    nsp_name: String,
    nsp: Weak<WsNamespace>,
    handshake: Handshake,
    outbox: UnboundedSender<WsMessage>,
    handlers: RwLock<HashMap<String, Vec<EventHandler>>>,
    connected: AtomicBool,
}

impl WsSocket {
    pub(crate) fn new(
        nsp: &Arc<WsNamespace>,
        handshake: Handshake,
        outbox: UnboundedSender<WsMessage>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            nsp_name: nsp.name().to_string(),
            nsp: Arc::downgrade(nsp),
            handshake,
            outbox,
            handlers: RwLock::new(HashMap::new()),
            connected: AtomicBool::new(true),
        }
    }

    pub fn handshake(&self) -> &Handshake {
        &self.handshake
    }

    /// The owning namespace, if it is still alive.
    pub fn namespace(&self) -> Option<Arc<WsNamespace>> {
        self.nsp.upgrade()
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub(crate) fn send(&self, message: WsMessage) {
        if let Err(e) = self.outbox.send(message) {
            warn!("Failed to send to {}: {}", self.id, e);
        }
    }

    pub(crate) fn send_frame(&self, frame: &ServerFrame) -> Result<()> {
        self.send(frame.encode()?);
        Ok(())
    }

    /// Runs the handlers registered for `event`, in registration order.
    pub(crate) fn dispatch(&self, event: &str, args: &[Value]) {
        // handlers may call back into `on`, so run them without the lock held
        let handlers = read(&self.handlers).get(event).cloned();
        for handler in handlers.into_iter().flatten() {
            handler(args);
        }
    }

    /// Marks a socket that never made it into its namespace as gone, without
    /// running any handlers.
    pub(crate) fn discard(&self) {
        self.connected.store(false, Ordering::SeqCst);
        write(&self.handlers).clear();
    }

    /// Leaves the namespace. Only the first call has any effect.
    pub(crate) fn close(&self, reason: DisconnectReason) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }

        if let Some(nsp) = self.nsp.upgrade() {
            nsp.remove(&self.id);
        }

        if reason == DisconnectReason::ServerNamespaceDisconnect {
            let frame = ServerFrame::Disconnect {
                nsp: self.nsp_name.clone(),
            };
            if let Err(e) = self.send_frame(&frame) {
                warn!("Failed to notify {} of disconnect: {}", self.id, e);
            }
        }

        debug!("{} left {} ({})", self.id, self.nsp_name, reason.as_str());
        self.dispatch(DISCONNECT_EVENT, &[Value::from(reason.as_str())]);
        write(&self.handlers).clear();
    }
}

impl Socket for WsSocket {
    fn id(&self) -> &str {
        &self.id
    }

    fn join(&self, channel: &str) {
        if !self.is_connected() {
            return;
        }
        if let Some(nsp) = self.nsp.upgrade() {
            nsp.add_to_channel(&self.id, channel);
        }
    }

    fn leave(&self, channel: &str) {
        if let Some(nsp) = self.nsp.upgrade() {
            nsp.remove_from_channel(&self.id, channel);
        }
    }

    fn on(&self, event: &str, handler: EventHandler) {
        write(&self.handlers)
            .entry(event.to_string())
            .or_default()
            .push(handler);
    }

    fn disconnect(&self) {
        self.close(DisconnectReason::ServerNamespaceDisconnect);
    }
}

/// Emits straight to this one socket.
impl Emitter for WsSocket {
    fn emit(&self, event: &str, args: &[Value]) -> Result<()> {
        if !self.is_connected() {
            return Ok(());
        }
        self.send_frame(&ServerFrame::Event {
            nsp: self.nsp_name.clone(),
            event: event.to_string(),
            data: args.to_vec(),
        })
    }
}

impl std::fmt::Debug for WsSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsSocket")
            .field("id", &self.id)
            .field("nsp", &self.nsp_name)
            .field("connected", &self.is_connected())
            .finish()
    }
}
