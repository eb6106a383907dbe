//! # steeplejack-socketio
//!
//! `steeplejack-socketio` is a socket strategy for a host server: it attaches a
//! real-time messaging engine to the server's raw listener, organizes
//! connections into namespaces and channels, and routes outbound events to a
//! single connection, a channel, or a whole namespace.
//!
//! ## Core Modules
//!
//! - `strategy`: the `SocketIo` strategy and the broadcast routing logic.
//! - `engine`: the traits a messaging engine implements, plus `engine::ws`,
//!   an engine built on tokio-tungstenite.
//! - `plugin`: registration of the strategy under its injection name.
//! - `config`: loading and merging server configuration.
//! - `utils`: shared error type and logging setup.

pub mod config;
pub mod engine;
pub mod plugin;
pub mod strategy;
pub mod utils;

pub use plugin::{INJECT_NAME, plugin};
pub use strategy::{BroadcastIntent, SocketIo, Target};
