use std::sync::Arc;

use crate::engine::Namespace;

/// The connection an operation applies to.
pub struct ConnectionHandle<S> {
    pub socket: Arc<S>,
}

impl<S> Clone for ConnectionHandle<S> {
    fn clone(&self) -> Self {
        Self {
            socket: self.socket.clone(),
        }
    }
}

impl<S> From<Arc<S>> for ConnectionHandle<S> {
    fn from(socket: Arc<S>) -> Self {
        Self { socket }
    }
}

/// An inbound request bound to a connected socket and its namespace.
pub struct RequestContext<N: Namespace> {
    pub socket: Arc<N::Socket>,
    pub nsp: Arc<N>,
}

impl<N: Namespace> RequestContext<N> {
    pub fn new(socket: Arc<N::Socket>, nsp: Arc<N>) -> Self {
        Self { socket, nsp }
    }

    pub fn handle(&self) -> ConnectionHandle<N::Socket> {
        ConnectionHandle::from(self.socket.clone())
    }
}

impl<N: Namespace> Clone for RequestContext<N> {
    fn clone(&self) -> Self {
        Self {
            socket: self.socket.clone(),
            nsp: self.nsp.clone(),
        }
    }
}

/// Payload of the local `<namespace>_connected` event.
pub struct ConnectedEvent<N: Namespace> {
    pub socket: Arc<N::Socket>,
    pub nsp: Arc<N>,
}

impl<N: Namespace> ConnectedEvent<N> {
    /// The request context for events arriving on this connection.
    pub fn request(&self) -> RequestContext<N> {
        RequestContext::new(self.socket.clone(), self.nsp.clone())
    }

    pub fn handle(&self) -> ConnectionHandle<N::Socket> {
        ConnectionHandle::from(self.socket.clone())
    }
}

impl<N: Namespace> Clone for ConnectedEvent<N> {
    fn clone(&self) -> Self {
        Self {
            socket: self.socket.clone(),
            nsp: self.nsp.clone(),
        }
    }
}
