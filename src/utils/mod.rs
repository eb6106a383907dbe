//! The `utils` module provides shared definitions used across the
//! `steeplejack-socketio` crate.
//!
//! It centralizes the crate-wide error type and the logging setup so the
//! engine, the strategy and the binary report failures the same way.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
