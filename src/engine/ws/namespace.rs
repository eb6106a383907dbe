use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, info};
use tungstenite::protocol::Message as WsMessage;

use super::frame::ServerFrame;
use super::socket::WsSocket;
use super::{read, write};
use crate::engine::{ConnectionCallback, Emitter, Middleware, Namespace, Socket};
use crate::utils::Result;

/// A namespace of the WebSocket engine.
///
/// Holds its sockets by id and the channel membership relation. Every socket
/// is a member of the channel named after its own id, so `to(id)` reaches it.
pub struct WsNamespace {
    name: String,
    sockets: RwLock<HashMap<String, Arc<WsSocket>>>,
    channels: RwLock<HashMap<String, HashSet<String>>>,
    middleware: RwLock<Vec<Middleware<WsSocket>>>,
    callbacks: RwLock<Vec<ConnectionCallback<WsSocket>>>,
}

impl WsNamespace {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            sockets: RwLock::new(HashMap::new()),
            channels: RwLock::new(HashMap::new()),
            middleware: RwLock::new(Vec::new()),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    pub fn len(&self) -> usize {
        read(&self.sockets).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn socket(&self, id: &str) -> Option<Arc<WsSocket>> {
        read(&self.sockets).get(id).cloned()
    }

    /// Ids of the sockets in `channel`, sorted.
    pub fn channel_members(&self, channel: &str) -> Vec<String> {
        let mut members: Vec<String> = read(&self.channels)
            .get(channel)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    /// Runs the middleware chain and, if it passes, registers the socket and
    /// announces it to the connection callbacks. A refused socket leaves no
    /// trace in the namespace, even if middleware already joined channels.
    pub(crate) fn admit(&self, socket: Arc<WsSocket>) -> Result<()> {
        if let Err(e) = self.register(&socket) {
            socket.discard();
            self.remove(socket.id());
            return Err(e);
        }
        info!("{} connected to {}", socket.id(), self.name);

        let callbacks = read(&self.callbacks).clone();
        for callback in callbacks {
            callback(socket.clone());
        }
        Ok(())
    }

    fn register(&self, socket: &Arc<WsSocket>) -> Result<()> {
        let middleware = read(&self.middleware).clone();
        for mw in &middleware {
            mw(socket.as_ref())?;
        }

        let connected = ServerFrame::Connected {
            nsp: self.name.clone(),
            sid: socket.id().to_string(),
        }
        .encode()?;

        write(&self.sockets).insert(socket.id().to_string(), socket.clone());
        self.add_to_channel(socket.id(), socket.id());
        socket.send(connected);
        Ok(())
    }

    pub(crate) fn add_to_channel(&self, id: &str, channel: &str) {
        write(&self.channels)
            .entry(channel.to_string())
            .or_default()
            .insert(id.to_string());
        debug!("{id} joined {channel} on {}", self.name);
    }

    pub(crate) fn remove_from_channel(&self, id: &str, channel: &str) {
        let mut channels = write(&self.channels);
        if let Some(members) = channels.get_mut(channel) {
            members.remove(id);
            if members.is_empty() {
                channels.remove(channel);
            }
        }
    }

    /// Drops the socket and all of its channel memberships.
    pub(crate) fn remove(&self, id: &str) {
        write(&self.sockets).remove(id);
        write(&self.channels).retain(|_, members| {
            members.remove(id);
            !members.is_empty()
        });
    }

    fn deliver<'a>(
        &self,
        recipients: impl IntoIterator<Item = &'a Arc<WsSocket>>,
        event: &str,
        args: &[Value],
    ) -> Result<()> {
        let message: WsMessage = ServerFrame::Event {
            nsp: self.name.clone(),
            event: event.to_string(),
            data: args.to_vec(),
        }
        .encode()?;

        for socket in recipients {
            socket.send(message.clone());
        }
        Ok(())
    }
}

impl Namespace for WsNamespace {
    type Socket = WsSocket;

    fn name(&self) -> &str {
        &self.name
    }

    fn use_middleware(&self, middleware: Middleware<WsSocket>) {
        write(&self.middleware).push(middleware);
    }

    fn on_connection(&self, callback: ConnectionCallback<WsSocket>) {
        write(&self.callbacks).push(callback);
    }

    fn to(&self, target: &str) -> Box<dyn Emitter + '_> {
        Box::new(ChannelEmitter {
            nsp: self,
            channel: target.to_string(),
        })
    }
}

/// Namespace-wide emit: every connected socket.
impl Emitter for WsNamespace {
    fn emit(&self, event: &str, args: &[Value]) -> Result<()> {
        let sockets: Vec<Arc<WsSocket>> = read(&self.sockets).values().cloned().collect();
        self.deliver(&sockets, event, args)
    }
}

/// The `to(channel)` selection of a namespace.
struct ChannelEmitter<'a> {
    nsp: &'a WsNamespace,
    channel: String,
}

impl Emitter for ChannelEmitter<'_> {
    fn emit(&self, event: &str, args: &[Value]) -> Result<()> {
        let recipients: Vec<Arc<WsSocket>> = {
            let channels = read(&self.nsp.channels);
            let sockets = read(&self.nsp.sockets);
            channels
                .get(&self.channel)
                .into_iter()
                .flatten()
                .filter_map(|id| sockets.get(id).cloned())
                .collect()
        };
        self.nsp.deliver(&recipients, event, args)
    }
}

impl std::fmt::Debug for WsNamespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsNamespace")
            .field("name", &self.name)
            .field("sockets", &self.len())
            .finish()
    }
}
