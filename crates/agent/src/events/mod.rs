//! Typed event bus for flexible event routing.

mod bus;
mod types;

pub use bus::{EventBus, EventHandler, FnHandler, HandlerId};
pub use types::{EventKind, WorldEvent};
