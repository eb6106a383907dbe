//! Registration of the strategy with a host framework.
//!
//! The host resolves the strategy by its injection name and receives the
//! [`Exports`] pair: the engine constructor and the strategy constructor.

use std::any::Any;

use crate::engine::Engine;
use crate::engine::ws::WsEngine;
use crate::strategy::SocketIo;
use crate::utils::Result;

/// Name the strategy is injected under.
pub const INJECT_NAME: &str = "steeplejack-socketio";

/// What a plugin module exports for engine `E`.
pub struct Exports<E: Engine> {
    /// Builds the engine from a raw listener.
    pub engine: fn(E::Listener) -> Result<E>,
    /// Builds an unbound strategy.
    pub strategy: fn() -> SocketIo<E>,
}

pub fn exports<E: Engine>() -> Exports<E> {
    Exports {
        engine: E::attach,
        strategy: SocketIo::new,
    }
}

struct Module {
    name: &'static str,
    exports: Box<dyn Any + Send + Sync>,
}

/// An ordered set of named modules a host can resolve by name.
#[derive(Default)]
pub struct Plugin {
    modules: Vec<Module>,
}

impl Plugin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T: Any + Send + Sync>(mut self, name: &'static str, exports: T) -> Self {
        self.modules.push(Module {
            name,
            exports: Box::new(exports),
        });
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.modules.iter().map(|m| m.name).collect()
    }

    /// The exports registered under `name`, if they are a `T`.
    pub fn resolve<T: Any>(&self, name: &str) -> Option<&T> {
        self.modules
            .iter()
            .find(|m| m.name == name)
            .and_then(|m| m.exports.downcast_ref::<T>())
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl std::fmt::Debug for Plugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Plugin").field("modules", &self.names()).finish()
    }
}

/// The crate's plugin: the WebSocket-backed strategy under [`INJECT_NAME`].
pub fn plugin() -> Plugin {
    Plugin::new().register(INJECT_NAME, exports::<WsEngine>())
}
