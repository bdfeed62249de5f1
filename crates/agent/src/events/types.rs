//! Typed world events and the registry key enum.
//!
//! The connection emits a closed set of event kinds; modeling them as an enum
//! (rather than name strings) catches typos at compile time while keeping the
//! same runtime fan-out semantics.

use serde::{Deserialize, Serialize};

/// A discrete event emitted by the world connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// Authenticated with the server.
    Login,
    /// The agent's avatar entered the world. Some servers emit this twice on
    /// (re)join.
    Spawn,
    /// The avatar died.
    Death,
    /// Forcibly removed from the server.
    Kicked { reason: String },
    /// A chat line attributed to a sender.
    Chat { sender: String, message: String },
    /// A raw server message.
    Message { text: String },
    /// Health or hunger changed.
    HealthChanged { health: u32, hunger: u32 },
    /// Periodic physics step. `count` cycles through `0..20`, so actions can
    /// throttle themselves to one fixed phase per second.
    Tick { count: u8 },
    /// The connection ended.
    Disconnected,
    /// A connection-level error.
    Error { message: String },
}

impl WorldEvent {
    /// The registry key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            WorldEvent::Login => EventKind::Login,
            WorldEvent::Spawn => EventKind::Spawn,
            WorldEvent::Death => EventKind::Death,
            WorldEvent::Kicked { .. } => EventKind::Kicked,
            WorldEvent::Chat { .. } => EventKind::Chat,
            WorldEvent::Message { .. } => EventKind::Message,
            WorldEvent::HealthChanged { .. } => EventKind::HealthChanged,
            WorldEvent::Tick { .. } => EventKind::Tick,
            WorldEvent::Disconnected => EventKind::Disconnected,
            WorldEvent::Error { .. } => EventKind::Error,
        }
    }

    /// The tick counter, when this is a tick event.
    pub fn tick_count(&self) -> Option<u8> {
        match self {
            WorldEvent::Tick { count } => Some(*count),
            _ => None,
        }
    }
}

/// Registry key for event routing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum EventKind {
    Login,
    Spawn,
    Death,
    Kicked,
    Chat,
    Message,
    HealthChanged,
    Tick,
    Disconnected,
    Error,
}
