//! Outbound event routing.
//!
//! A [`BroadcastIntent`] resolves to exactly one [`Route`]:
//!
//! - target unset: the sender's own connection id (echo back to the sender)
//! - target a non-empty string: that connection or channel
//! - target `null` or `""`: every connection in the namespace

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::engine::{Emitter, Namespace};
use crate::utils::Result;

/// Who an outbound event is addressed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Target {
    /// No target given; defaults to the sending connection.
    #[default]
    Unset,
    /// A connection id or channel name.
    Explicit(String),
    /// Explicitly nobody in particular, i.e. the whole namespace.
    Null,
}

impl Target {
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }
}

impl From<&str> for Target {
    fn from(target: &str) -> Self {
        Self::Explicit(target.to_string())
    }
}

impl From<String> for Target {
    fn from(target: String) -> Self {
        Self::Explicit(target)
    }
}

impl From<Option<String>> for Target {
    fn from(target: Option<String>) -> Self {
        target.map_or(Self::Null, Self::Explicit)
    }
}

impl Serialize for Target {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Explicit(target) => serializer.serialize_str(target),
            Self::Unset | Self::Null => serializer.serialize_none(),
        }
    }
}

/// A missing field never reaches this; `#[serde(default)]` keeps it `Unset`.
impl<'de> Deserialize<'de> for Target {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Option::<String>::deserialize(deserializer).map(Self::from)
    }
}

/// One outbound dispatch: an event name, its ordered arguments and a target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastIntent {
    pub event: String,
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default, skip_serializing_if = "Target::is_unset")]
    pub target: Target,
}

/// Where a resolved intent is delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `nsp.to(target).emit(..)`
    Targeted(String),
    /// `nsp.emit(..)`
    Namespace,
}

impl BroadcastIntent {
    pub fn new(event: impl Into<String>, data: Vec<Value>) -> Self {
        Self {
            event: event.into(),
            data,
            target: Target::Unset,
        }
    }

    pub fn to(mut self, target: impl Into<Target>) -> Self {
        self.target = target.into();
        self
    }

    pub fn to_everyone(mut self) -> Self {
        self.target = Target::Null;
        self
    }

    /// Resolves the route for an intent sent by connection `sender_id`.
    pub fn route(&self, sender_id: &str) -> Route {
        let target = match &self.target {
            Target::Unset => sender_id,
            Target::Explicit(target) => target.as_str(),
            Target::Null => "",
        };

        // an empty target, explicit or defaulted, counts as no target at all
        if target.is_empty() {
            Route::Namespace
        } else {
            Route::Targeted(target.to_string())
        }
    }
}

/// Emits `event` with `data` on `nsp` along `route`.
pub fn dispatch<N: Namespace>(
    nsp: &N,
    route: &Route,
    event: &str,
    data: &[Value],
) -> Result<()> {
    match route {
        Route::Targeted(target) => nsp.to(target).emit(event, data),
        Route::Namespace => nsp.emit(event, data),
    }
}
