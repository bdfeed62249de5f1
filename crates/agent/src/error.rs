//! Unified error types surfaced by the agent API.
//!
//! Wraps failures from the world connection, the event bus, and action
//! reactions so callers can bubble them up with consistent context.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AgentError>;

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("not connected to a world")]
    NotConnected,

    #[error("failed to connect to the world: {0}")]
    ConnectFailed(String),

    #[error("event stream already taken or connection closed")]
    EventStreamUnavailable,

    #[error("inventory slot {slot} is empty")]
    EmptySlot { slot: u16 },

    #[error("timed out waiting for the agent to become active")]
    ActivationTimeout,

    #[error("invalid target coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("event handler failed: {0}")]
    Handler(String),
}
