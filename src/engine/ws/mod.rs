//! A WebSocket implementation of the engine traits.
//!
//! Clients speak a small JSON frame protocol (see [`frame`]) over one
//! WebSocket and may join several namespaces on it. The engine keeps
//! namespace and channel membership in memory; it has no heartbeat,
//! reconnection or transport negotiation.

pub mod client;
pub mod frame;
pub mod namespace;
pub mod server;
pub mod socket;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

pub use client::WsClient;
pub use frame::{ClientFrame, ServerFrame};
pub use namespace::WsNamespace;
pub use server::{TcpHost, WsEngine};
pub use socket::{DISCONNECT_EVENT, DisconnectReason, Handshake, WsSocket};

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}
