//! Event-driven orchestration for an autonomous game-world agent.
//!
//! The crate wires a live world connection, a typed event bus, and a set of
//! independently startable behavior units ("actions") into strategies that
//! keep the agent alive and progressing toward a goal. Consumers embed
//! [`Agent`] over a [`WorldConnection`], compose actions through a
//! [`strategy::Strategy`], and drive everything from the agent's event pump.
//!
//! Modules are organized by responsibility:
//! - [`events`] provides the typed, per-agent event bus
//! - [`world`] holds the connection seam, snapshot types, and geometry math
//! - [`agent`] hosts the facade: lifecycle, pump, and shared resources
//! - [`actions`] contains the shipped behavior units
//! - [`strategy`] composes actions and owns the restart protocol

pub mod actions;
pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod strategy;
pub mod world;

pub use actions::{
    Action, ActionHandle, AlwaysShield, EfficientEat, EmergencyQuit, EmergencyQuitConfig,
    GotoLocation, LootFinder,
};
pub use agent::{Agent, LifecyclePhase};
pub use config::AgentConfig;
pub use error::{AgentError, Result};
pub use events::{EventBus, EventHandler, EventKind, FnHandler, HandlerId, WorldEvent};
pub use strategy::{HighwayConfig, HighwayStrategy, RestartRequest, Strategy};
pub use world::{
    Dimension, Entity, EntityKind, Hand, ItemStack, Position, SimConfig, SimWorld, WorldConnection,
};
