//! Strategy orchestration: fixed action compositions plus the supervisory
//! restart protocol.

mod highway;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use highway::{HIGHWAY_Y, HighwayConfig, HighwayStrategy};

/// Ask the owning strategy to stop all actions, reconnect after `wait`, and
/// restart the set. Sent by actions that must not perform the restart from
/// within their own reaction.
#[derive(Debug, Clone, Copy)]
pub struct RestartRequest {
    pub wait: Duration,
}

/// A fixed composition of actions with a shared lifecycle.
#[async_trait]
pub trait Strategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn is_running(&self) -> bool;

    /// Constructs and starts the action set.
    async fn start(&self) -> Result<()>;

    /// Stops every action, releasing all bus subscriptions.
    async fn stop(&self);
}
