//! The agent facade.
//!
//! [`Agent`] wraps a [`WorldConnection`] with the pieces every action shares:
//! the event bus, the connection lifecycle state machine, the active-item
//! lock, the player whitelist, and the pending walk goal. The event pump
//! ([`Agent::run`]) is the single dispatch task; all action reactions execute
//! on it, in registration order, so blocking helpers here use bounded waits
//! to avoid starving later reactions.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, watch};
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, trace, warn};

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::events::{EventBus, EventKind, WorldEvent};
use crate::world::{Dimension, Entity, Hand, ItemStack, Position, WorldConnection};

/// Connection lifecycle phases.
///
/// Tick-bound actions only run in `Active`; the pump drops tick events in
/// every earlier phase so action logic never runs against an avatar that has
/// not fully entered the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Disconnected,
    Connecting,
    LoggedIn,
    SpawnPending,
    Active,
}

struct LifecycleState {
    phase: LifecyclePhase,
    spawn_count: u32,
    handlers_enabled: bool,
}

/// Shared facade over one world connection.
///
/// One `Agent` owns one [`EventBus`] and one active-item lock; there is no
/// process-global state. Actions hold an `Arc<Agent>`.
pub struct Agent {
    world: Arc<dyn WorldConnection>,
    bus: EventBus,
    config: AgentConfig,
    lifecycle: Mutex<LifecycleState>,
    /// Serializes every mutation of the held/offhand "active item" state.
    /// Eating and shielding both toggle it and must never interleave.
    active_item: AsyncMutex<()>,
    whitelist: Mutex<HashSet<String>>,
    walk_goal: Mutex<Option<Position>>,
    shutdown_tx: watch::Sender<bool>,
}

impl Agent {
    pub fn new(world: Arc<dyn WorldConnection>, config: AgentConfig) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            world,
            bus: EventBus::new(),
            config,
            lifecycle: Mutex::new(LifecycleState {
                phase: LifecyclePhase::Disconnected,
                spawn_count: 0,
                handlers_enabled: false,
            }),
            active_item: AsyncMutex::new(()),
            whitelist: Mutex::new(HashSet::new()),
            walk_goal: Mutex::new(None),
            shutdown_tx,
        })
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn phase(&self) -> LifecyclePhase {
        self.lifecycle.lock().expect("lifecycle poisoned").phase
    }

    pub fn is_active(&self) -> bool {
        self.phase() == LifecyclePhase::Active
    }

    /// Resolves to `true` once a shutdown-intent disconnect has happened.
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    pub fn whitelist_add(&self, username: impl Into<String>) {
        self.whitelist
            .lock()
            .expect("whitelist poisoned")
            .insert(username.into());
    }

    pub fn is_whitelisted(&self, username: &str) -> bool {
        self.whitelist
            .lock()
            .expect("whitelist poisoned")
            .contains(username)
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    pub async fn connect(&self) -> Result<()> {
        info!("connecting to world...");
        {
            let mut lifecycle = self.lifecycle.lock().expect("lifecycle poisoned");
            lifecycle.phase = LifecyclePhase::Connecting;
            lifecycle.spawn_count = 0;
            lifecycle.handlers_enabled = true;
        }
        match self.world.connect().await {
            Ok(()) => {
                info!(username = %self.config.username, "connected");
                Ok(())
            }
            Err(error) => {
                let mut lifecycle = self.lifecycle.lock().expect("lifecycle poisoned");
                lifecycle.phase = LifecyclePhase::Disconnected;
                lifecycle.handlers_enabled = false;
                Err(error)
            }
        }
    }

    /// Disconnects from the world. With `shutdown` set this also fires the
    /// shutdown signal the binary waits on.
    pub async fn disconnect(&self, shutdown: bool) {
        info!("disconnecting from world...");
        {
            let mut lifecycle = self.lifecycle.lock().expect("lifecycle poisoned");
            lifecycle.phase = LifecyclePhase::Disconnected;
            lifecycle.spawn_count = 0;
            lifecycle.handlers_enabled = false;
        }
        self.world.disconnect().await;

        if shutdown {
            info!("agent shutting down");
            // send_replace: the intent must stick even while nobody holds a
            // receiver yet.
            self.shutdown_tx.send_replace(true);
        }
    }

    /// Full disconnect/wait/connect cycle.
    pub async fn reconnect(&self, wait: Duration) -> Result<()> {
        self.disconnect(false).await;
        info!(wait_secs = wait.as_secs(), "reconnecting to world");
        sleep(wait).await;
        self.connect().await
    }

    /// Blocks until the agent reaches the active phase.
    ///
    /// Times out with a shutdown disconnect after `max_wait`, matching the
    /// fail-fast behavior expected at startup.
    pub async fn wait_until_active(&self, max_wait: Duration) -> Result<()> {
        let deadline = Instant::now() + max_wait;
        while !self.is_active() {
            if Instant::now() >= deadline {
                error!("timed out waiting for the agent to become active");
                self.disconnect(true).await;
                return Err(AgentError::ActivationTimeout);
            }
            sleep(Duration::from_millis(200)).await;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Snapshot accessors
    // ------------------------------------------------------------------
    //
    // Live reads against the connection; after a disconnect every accessor
    // reports unavailable rather than a stale value. No multi-field
    // atomicity: position and health read a moment apart may skew slightly.

    pub fn position(&self) -> Option<Position> {
        if self.phase() == LifecyclePhase::Disconnected {
            return None;
        }
        self.world.position()
    }

    pub fn health(&self) -> Option<u32> {
        if self.phase() == LifecyclePhase::Disconnected {
            return None;
        }
        self.world.health()
    }

    pub fn hunger(&self) -> Option<u32> {
        if self.phase() == LifecyclePhase::Disconnected {
            return None;
        }
        self.world.hunger()
    }

    pub fn dimension(&self) -> Option<Dimension> {
        if self.phase() == LifecyclePhase::Disconnected {
            return None;
        }
        self.world.dimension()
    }

    pub fn inventory(&self) -> Option<HashMap<u16, ItemStack>> {
        if self.phase() == LifecyclePhase::Disconnected {
            return None;
        }
        self.world.inventory()
    }

    pub fn nearby_entities(&self) -> Vec<Entity> {
        if self.phase() == LifecyclePhase::Disconnected {
            return Vec::new();
        }
        self.world.nearby_entities()
    }

    pub fn find_blocks(
        &self,
        names: &[&str],
        max_distance: f64,
        origin: Option<Position>,
    ) -> HashMap<String, Vec<Position>> {
        if self.phase() == LifecyclePhase::Disconnected {
            return HashMap::new();
        }
        self.world.find_blocks(names, max_distance, origin)
    }

    pub fn held_item(&self, hand: Hand) -> Option<ItemStack> {
        if self.phase() == LifecyclePhase::Disconnected {
            return None;
        }
        self.world.held_item(hand)
    }

    pub fn food_value(&self, item: &ItemStack) -> Option<u32> {
        self.world.food_value(item)
    }

    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------

    /// Records the pending walk goal and issues the pathfinding command.
    pub async fn walk_to(&self, target: Position) -> Result<()> {
        self.set_walk_goal(Some(target));
        self.world.walk_to(target).await
    }

    pub async fn stop_pathfinding(&self) {
        self.world.stop_pathfinding().await;
    }

    /// The last walk goal issued, surviving reconnects so stuck recovery can
    /// reissue it.
    pub fn walk_goal(&self) -> Option<Position> {
        *self.walk_goal.lock().expect("walk goal poisoned")
    }

    pub fn set_walk_goal(&self, goal: Option<Position>) {
        *self.walk_goal.lock().expect("walk goal poisoned") = goal;
    }

    pub async fn equip_slot(&self, slot: u16, hand: Hand) -> Result<()> {
        let inventory = self.inventory().ok_or(AgentError::NotConnected)?;
        if !inventory.contains_key(&slot) {
            warn!(slot, "inventory slot not found");
            return Err(AgentError::EmptySlot { slot });
        }
        self.world.equip(slot, hand).await
    }

    /// Puts a shield in the offhand if one is available anywhere in the
    /// inventory. Returns whether a shield ended up equipped.
    pub async fn equip_shield(&self) -> Result<bool> {
        if let Some(item) = self.held_item(Hand::Off)
            && item.name == "shield"
        {
            trace!("shield already equipped in offhand");
            return Ok(true);
        }

        let inventory = self.inventory().ok_or(AgentError::NotConnected)?;
        let mut slots: Vec<&ItemStack> = inventory.values().collect();
        slots.sort_by_key(|item| item.slot);
        for item in slots {
            if item.name == "shield" {
                self.world.equip(item.slot, Hand::Off).await?;
                info!(slot = item.slot, "equipped shield");
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Activates the offhand item under the active-item lock, unless
    /// something is already active.
    pub async fn activate_shield(&self) -> Result<()> {
        let _guard = self.active_item.lock().await;
        if !self.world.held_item_active() {
            self.world.activate_held_item(Hand::Off).await;
        }
        Ok(())
    }

    /// Consumes the main-hand item and waits (bounded) for hunger to rise.
    ///
    /// The active-item lock covers only the deactivate/activate pair; the
    /// wait for the effect happens outside the critical section. On
    /// high-latency servers pathfinding is paused for the duration and the
    /// pending walk goal reissued afterwards. Returns whether hunger visibly
    /// rose before the deadline.
    pub async fn eat_held_item(&self) -> Result<bool> {
        let paused_goal = if self.config.high_latency_server {
            self.walk_goal()
        } else {
            None
        };
        if paused_goal.is_some() {
            info!("pausing pathfinding to eat");
            self.world.stop_pathfinding().await;
        }

        let before = self.hunger().ok_or(AgentError::NotConnected)?;
        {
            let _guard = self.active_item.lock().await;
            self.world.deactivate_held_item().await;
            self.world.activate_held_item(Hand::Main).await;
        }

        let deadline = Instant::now() + self.config.eat_max_wait;
        loop {
            if matches!(self.hunger(), Some(hunger) if hunger > before) {
                break;
            }
            if Instant::now() >= deadline {
                warn!("timed out waiting for food to be consumed");
                return Ok(false);
            }
            sleep(Duration::from_millis(100)).await;
        }

        if let Some(goal) = paused_goal {
            info!(%goal, "walk goal resumed");
            self.walk_to(goal).await?;
        }
        Ok(true)
    }

    // ------------------------------------------------------------------
    // Event pump
    // ------------------------------------------------------------------

    /// Drives events from the connection through the bus until shutdown.
    ///
    /// The pump applies built-in lifecycle handling (spawn counting, kick and
    /// death logging) before fan-out, and gates tick dispatch on the active
    /// phase. A reaction that reconnects the agent is tolerated: when the
    /// current stream ends the pump re-acquires one from the new connection.
    pub async fn run(self: Arc<Self>) -> Result<()> {
        let mut shutdown = self.shutdown_signal();

        loop {
            if *shutdown.borrow() {
                return Ok(());
            }

            let mut events = match self.world.event_stream().await {
                Ok(stream) => stream,
                Err(_) => {
                    // Disconnected and no reconnect pending yet; poll until
                    // either a connection appears or shutdown fires.
                    tokio::select! {
                        _ = sleep(Duration::from_millis(200)) => continue,
                        _ = shutdown.changed() => return Ok(()),
                    }
                }
            };

            loop {
                let event = tokio::select! {
                    event = events.recv() => match event {
                        Some(event) => event,
                        None => break,
                    },
                    _ = shutdown.changed() => return Ok(()),
                };

                self.on_builtin(&event);

                if !self.handlers_enabled() {
                    trace!(event = %event.kind(), "handlers disabled, skipping dispatch");
                    continue;
                }
                if event.kind() == EventKind::Tick && !self.is_active() {
                    trace!("agent not active, suppressing tick dispatch");
                    continue;
                }
                self.bus.dispatch(&event).await?;
            }
        }
    }

    fn handlers_enabled(&self) -> bool {
        self.lifecycle
            .lock()
            .expect("lifecycle poisoned")
            .handlers_enabled
    }

    /// Lifecycle handling that runs for every event before bus fan-out.
    fn on_builtin(&self, event: &WorldEvent) {
        match event {
            WorldEvent::Login => {
                info!(username = %self.config.username, "logged in to the server");
                let mut lifecycle = self.lifecycle.lock().expect("lifecycle poisoned");
                lifecycle.phase = LifecyclePhase::LoggedIn;
            }
            WorldEvent::Spawn => {
                let mut lifecycle = self.lifecycle.lock().expect("lifecycle poisoned");
                lifecycle.spawn_count += 1;
                lifecycle.phase = if lifecycle.spawn_count >= self.config.spawns_required() {
                    LifecyclePhase::Active
                } else {
                    LifecyclePhase::SpawnPending
                };
                info!(
                    spawn_count = lifecycle.spawn_count,
                    phase = ?lifecycle.phase,
                    "avatar spawned"
                );
            }
            WorldEvent::Death => {
                warn!(position = ?self.position(), "avatar died");
            }
            WorldEvent::Kicked { reason } => {
                warn!(%reason, "kicked from the server");
            }
            WorldEvent::Message { text } => {
                if text.contains(&self.config.username) {
                    info!(%text, "important message");
                }
            }
            WorldEvent::HealthChanged { health, hunger } => {
                debug!(health, hunger, "health changed");
            }
            WorldEvent::Disconnected => {
                let mut lifecycle = self.lifecycle.lock().expect("lifecycle poisoned");
                if lifecycle.phase != LifecyclePhase::Disconnected {
                    lifecycle.phase = LifecyclePhase::Disconnected;
                    lifecycle.spawn_count = 0;
                }
            }
            WorldEvent::Error { message } => {
                error!(%message, "world connection error");
            }
            WorldEvent::Tick { .. } | WorldEvent::Chat { .. } => {}
        }
    }

    /// Background loop logging position/health/hunger, independent of the
    /// dispatch task. Snapshot reads are safe to run concurrently with it.
    pub fn spawn_position_logger(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let agent = Arc::clone(self);
        tokio::spawn(async move {
            let mut shutdown = agent.shutdown_signal();
            let mut ticker = tokio::time::interval(agent.config.position_log_interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Some(position) = agent.position() {
                            info!(
                                %position,
                                health = ?agent.health(),
                                hunger = ?agent.hunger(),
                                "agent status"
                            );
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }
        })
    }
}
