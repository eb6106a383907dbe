//! The socket strategy plugged into the host server.
//!
//! - `broadcast`: resolves an outbound intent to a single route
//! - `context`: the typed request/connection values the strategy operates on
//! - `emitter`: local publish/subscribe for connection announcements
//! - `socket_io`: the strategy itself

pub mod broadcast;
pub mod context;
pub mod emitter;
pub mod socket_io;

pub use broadcast::{BroadcastIntent, Route, Target};
pub use context::{ConnectedEvent, ConnectionHandle, RequestContext};
pub use emitter::LocalEmitter;
pub use socket_io::{SocketIo, SocketOf, connected_event};

#[cfg(test)]
mod tests;
