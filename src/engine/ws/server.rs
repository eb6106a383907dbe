use std::collections::HashMap;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::{Arc, RwLock};

use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tracing::{debug, error, info, warn};
use tungstenite::protocol::Message as WsMessage;

use super::frame::{ClientFrame, ServerFrame, normalize};
use super::namespace::WsNamespace;
use super::socket::{DisconnectReason, Handshake, WsSocket};
use super::{read, write};
use crate::engine::{Engine, HostServer, Socket};
use crate::utils::Result;

/// Namespaces known to one engine, shared with its connection tasks.
#[derive(Default)]
struct Registry {
    namespaces: RwLock<HashMap<String, Arc<WsNamespace>>>,
}

impl Registry {
    fn of(&self, name: &str) -> Arc<WsNamespace> {
        let name = normalize(name);
        if let Some(nsp) = read(&self.namespaces).get(&name) {
            return nsp.clone();
        }
        write(&self.namespaces)
            .entry(name.clone())
            .or_insert_with(|| Arc::new(WsNamespace::new(name)))
            .clone()
    }

    fn get(&self, name: &str) -> Option<Arc<WsNamespace>> {
        read(&self.namespaces).get(name).cloned()
    }
}

/// The WebSocket engine: accepts connections on a raw listener and routes
/// frames to the namespaces created through [`Engine::of`].
///
/// Attaching spawns the accept loop on the current tokio runtime; dropping
/// the engine stops accepting new connections.
pub struct WsEngine {
    registry: Arc<Registry>,
    local_addr: SocketAddr,
    accept_loop: JoinHandle<()>,
}

impl WsEngine {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Engine for WsEngine {
    type Listener = std::net::TcpListener;
    type Namespace = WsNamespace;

    fn attach(listener: std::net::TcpListener) -> Result<Self> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(std::io::Error::other("the WebSocket engine needs a tokio runtime").into());
        }

        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;
        let listener = TcpListener::from_std(listener)?;

        let registry = Arc::new(Registry::default());
        let accept_loop = spawn(accept_connections(listener, registry.clone()));

        info!("WebSocket engine listening on ws://{local_addr}");

        Ok(Self {
            registry,
            local_addr,
            accept_loop,
        })
    }

    fn of(&self, name: &str) -> Arc<WsNamespace> {
        self.registry.of(name)
    }
}

impl Drop for WsEngine {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

impl std::fmt::Debug for WsEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsEngine")
            .field("local_addr", &self.local_addr)
            .finish()
    }
}

/// A host server owning a bound TCP listener.
#[derive(Debug)]
pub struct TcpHost {
    listener: std::net::TcpListener,
}

impl TcpHost {
    pub fn bind(addr: impl ToSocketAddrs) -> Result<Self> {
        Ok(Self {
            listener: std::net::TcpListener::bind(addr)?,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }
}

impl HostServer for TcpHost {
    type Listener = std::net::TcpListener;

    fn raw_server(&self) -> Result<std::net::TcpListener> {
        Ok(self.listener.try_clone()?)
    }
}

async fn accept_connections(listener: TcpListener, registry: Arc<Registry>) {
    loop {
        match listener.accept().await {
            Ok((stream, address)) => {
                spawn(handle_connection(stream, address, registry.clone()));
            }
            Err(e) => {
                error!("Failed to accept connection: {e}");
                break;
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, address: SocketAddr, registry: Arc<Registry>) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error from {address}: {e}");
            return;
        }
    };

    let handshake = Handshake {
        address,
        time: Utc::now(),
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();

    // engine -> client
    let send_loop = spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_sender.send(msg).await {
                debug!("Failed to send message to {address}: {e}");
                break;
            }
        }
    });

    // one socket per namespace joined over this connection
    let mut sockets: HashMap<String, Arc<WsSocket>> = HashMap::new();

    while let Some(Ok(msg)) = ws_receiver.next().await {
        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else {
            continue;
        };

        match serde_json::from_str::<ClientFrame>(text) {
            Ok(frame) => handle_frame(frame, &registry, &mut sockets, &tx, &handshake),
            Err(err) => {
                warn!(
                    "Invalid client frame from {address}: {err} | {}",
                    &text.chars().take(100).collect::<String>()
                );
            }
        }
    }

    for (_, socket) in sockets.drain() {
        socket.close(DisconnectReason::TransportClose);
    }
    send_loop.abort();
    info!("{address} disconnected");
}

fn handle_frame(
    frame: ClientFrame,
    registry: &Registry,
    sockets: &mut HashMap<String, Arc<WsSocket>>,
    tx: &UnboundedSender<WsMessage>,
    handshake: &Handshake,
) {
    match frame {
        ClientFrame::Connect { nsp } => {
            let name = normalize(&nsp);
            if let Some(existing) = sockets.get(&name).filter(|s| s.is_connected()) {
                debug!("{} is already connected to {name}", handshake.address);
                reply(tx, &ServerFrame::Connected {
                    sid: existing.id().to_string(),
                    nsp: name,
                });
                return;
            }

            let Some(namespace) = registry.get(&name) else {
                reply(tx, &ServerFrame::ConnectError {
                    nsp: name,
                    message: "Invalid namespace".to_string(),
                });
                return;
            };

            let socket = Arc::new(WsSocket::new(&namespace, handshake.clone(), tx.clone()));
            match namespace.admit(socket.clone()) {
                Ok(()) => {
                    sockets.insert(name, socket);
                }
                Err(e) => {
                    info!("{} refused on {name}: {e}", handshake.address);
                    reply(tx, &ServerFrame::ConnectError {
                        nsp: name,
                        message: e.to_string(),
                    });
                }
            }
        }

        ClientFrame::Event { nsp, event, data } => {
            let name = normalize(&nsp);
            let socket = sockets.get(&name).filter(|s| s.is_connected()).cloned();
            match socket {
                Some(socket) => socket.dispatch(&event, &data),
                None => {
                    sockets.remove(&name);
                    debug!("Dropped {event} from {}: not connected to {name}", handshake.address);
                }
            }
        }

        ClientFrame::Disconnect { nsp } => {
            if let Some(socket) = sockets.remove(&normalize(&nsp)) {
                socket.close(DisconnectReason::ClientNamespaceDisconnect);
            }
        }
    }
}

fn reply(tx: &UnboundedSender<WsMessage>, frame: &ServerFrame) {
    match frame.encode() {
        Ok(message) => {
            let _ = tx.send(message);
        }
        Err(e) => error!("Failed to encode frame: {e}"),
    }
}
