//! The `engine` module describes the real-time messaging engine the strategy
//! drives.
//!
//! The strategy never talks to sockets or listeners directly. It only needs an
//! engine that can be built from a raw listener, hand out namespaces, and let
//! each namespace and socket be addressed as below. `ws` is the bundled
//! implementation on top of tokio-tungstenite.

pub mod ws;

use std::sync::Arc;

use serde_json::Value;

use crate::utils::Result;

/// Handler for an inbound event; receives the event arguments in order.
pub type EventHandler = Arc<dyn Fn(&[Value]) + Send + Sync>;

/// Namespace middleware. Returning an error refuses the connection.
pub type Middleware<S> = Arc<dyn Fn(&S) -> Result<()> + Send + Sync>;

/// Invoked once per accepted connection on a namespace.
pub type ConnectionCallback<S> = Arc<dyn Fn(Arc<S>) + Send + Sync>;

/// Anything an event can be emitted on: a whole namespace or a `to(target)`
/// selection of it.
pub trait Emitter {
    fn emit(&self, event: &str, args: &[Value]) -> Result<()>;
}

/// One live connection inside a namespace.
pub trait Socket: Send + Sync + 'static {
    /// Opaque identifier assigned by the engine.
    fn id(&self) -> &str;

    fn join(&self, channel: &str);

    fn leave(&self, channel: &str);

    /// Registers `handler` for inbound events named `event`.
    fn on(&self, event: &str, handler: EventHandler);

    fn disconnect(&self);
}

/// A named partition of connections.
pub trait Namespace: Emitter + Send + Sync + 'static {
    type Socket: Socket;

    fn name(&self) -> &str;

    fn use_middleware(&self, middleware: Middleware<Self::Socket>);

    fn on_connection(&self, callback: ConnectionCallback<Self::Socket>);

    /// Selects every connection in channel `target`. A connection id is also
    /// a valid channel name and selects that single connection.
    fn to(&self, target: &str) -> Box<dyn Emitter + '_>;
}

/// A messaging engine attached to a raw network listener.
pub trait Engine: Send + Sync + 'static {
    type Listener;
    type Namespace: Namespace;

    fn attach(listener: Self::Listener) -> Result<Self>
    where
        Self: Sized;

    /// Creates the namespace on first use and returns the same instance afterwards.
    fn of(&self, name: &str) -> Arc<Self::Namespace>;
}

/// The host server the strategy is plugged into.
pub trait HostServer {
    type Listener;

    /// Returns the raw listener the engine attaches to.
    fn raw_server(&self) -> Result<Self::Listener>;
}
