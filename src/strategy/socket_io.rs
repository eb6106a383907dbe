use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;
use tracing::debug;

use super::broadcast::{self, BroadcastIntent};
use super::context::{ConnectedEvent, ConnectionHandle, RequestContext};
use super::emitter::LocalEmitter;
use crate::engine::{Engine, HostServer, Middleware, Namespace, Socket};
use crate::utils::{Error, Result};

/// Socket type of the namespaces produced by engine `E`.
pub type SocketOf<E> = <<E as Engine>::Namespace as Namespace>::Socket;

/// Name of the local event fired for each new connection on `namespace`.
pub fn connected_event(namespace: &str) -> String {
    format!("{namespace}_connected")
}

/// The socket strategy: binds an engine to the host server's listener and
/// exposes namespaces, channels and event routing to the application.
///
/// The strategy starts unbound; [`SocketIo::create_socket`] attaches the
/// engine. New connections on a namespace set up with [`SocketIo::connect`]
/// are announced through the strategy's own local events (see
/// [`connected_event`]), which is where the application registers its
/// per-connection handlers.
pub struct SocketIo<E: Engine> {
    inst: RwLock<Option<Arc<E>>>,
    events: LocalEmitter<ConnectedEvent<E::Namespace>>,
}

impl<E: Engine> SocketIo<E> {
    pub fn new() -> Self {
        Self {
            inst: RwLock::new(None),
            events: LocalEmitter::new(),
        }
    }

    pub fn is_bound(&self) -> bool {
        self.inst
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The bound engine instance.
    pub fn engine(&self) -> Result<Arc<E>> {
        self.inst
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(Error::Unbound)
    }

    /// Attaches a new engine to the raw listener of `server`.
    pub fn create_socket<H>(&self, server: &H) -> Result<()>
    where
        H: HostServer<Listener = E::Listener>,
    {
        let engine = E::attach(server.raw_server()?)?;
        *self.inst.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(engine));
        Ok(())
    }

    /// Sets up `namespace` with `middleware`, in order, and announces every
    /// new connection on it as the local event `<namespace>_connected`.
    pub fn connect(
        &self,
        namespace: &str,
        middleware: Vec<Middleware<SocketOf<E>>>,
    ) -> Result<&Self> {
        let nsp = self.engine()?.of(namespace);

        for mw in middleware {
            nsp.use_middleware(mw);
        }

        let event = connected_event(namespace);
        let events = self.events.clone();
        // the namespace owns this callback, so it only holds a weak reference back
        let weak_nsp = Arc::downgrade(&nsp);
        nsp.on_connection(Arc::new(move |socket: Arc<SocketOf<E>>| {
            if let Some(nsp) = weak_nsp.upgrade() {
                events.emit(&event, &ConnectedEvent { socket, nsp });
            }
        }));

        debug!("Listening for connections on {}", nsp.name());
        Ok(self)
    }

    /// Sends `intent` from the connection in `request`.
    ///
    /// An unset target is the sender's own id. A non-empty target is
    /// addressed through `to(target)`; `null` or `""` reaches the whole
    /// namespace.
    pub fn broadcast(
        &self,
        request: &RequestContext<E::Namespace>,
        intent: BroadcastIntent,
    ) -> Result<()> {
        let sender = self.get_socket_id(&request.handle());
        let route = intent.route(&sender);
        broadcast::dispatch(request.nsp.as_ref(), &route, &intent.event, &intent.data)
    }

    pub fn disconnect(&self, obj: &ConnectionHandle<SocketOf<E>>) {
        obj.socket.disconnect();
    }

    pub fn get_socket_id(&self, obj: &ConnectionHandle<SocketOf<E>>) -> String {
        obj.socket.id().to_string()
    }

    pub fn join_channel(&self, obj: &ConnectionHandle<SocketOf<E>>, channel: &str) {
        obj.socket.join(channel);
    }

    pub fn leave_channel(&self, obj: &ConnectionHandle<SocketOf<E>>, channel: &str) {
        obj.socket.leave(channel);
    }

    /// Calls `handler` whenever the connection receives `event`.
    pub fn listen(
        &self,
        obj: &ConnectionHandle<SocketOf<E>>,
        event: &str,
        handler: impl Fn(&[Value]) + Send + Sync + 'static,
    ) {
        obj.socket.on(event, Arc::new(handler));
    }

    pub fn on(
        &self,
        event: impl Into<String>,
        listener: impl Fn(&ConnectedEvent<E::Namespace>) + Send + Sync + 'static,
    ) {
        self.events.on(event, listener);
    }

    pub fn emit(&self, event: &str, payload: &ConnectedEvent<E::Namespace>) -> bool {
        self.events.emit(event, payload)
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.events.listener_count(event)
    }
}

impl<E: Engine> Default for SocketIo<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Engine> std::fmt::Debug for SocketIo<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SocketIo")
            .field("bound", &self.is_bound())
            .field("events", &self.events)
            .finish()
    }
}
