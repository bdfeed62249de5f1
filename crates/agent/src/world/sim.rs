//! Deterministic in-process world.
//!
//! Stands in for a real protocol client behind [`WorldConnection`]: it drives
//! the tick clock, integrates walking toward the current target at the
//! configured speed, decays hunger, and serves scripted inventory/entity
//! fixtures. The client binary runs against it by default and the tests use
//! it as a scriptable double.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::debug;

use crate::config::MAX_HUNGER;
use crate::error::{AgentError, Result};
use crate::events::WorldEvent;

use super::connection::WorldConnection;
use super::geom::{Position, SPRINT_SPEED};
use super::types::{Dimension, Entity, Hand, ItemStack};

const EVENT_BUFFER: usize = 256;

/// Fixtures and tunables for the simulated world.
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub tick_interval: Duration,
    /// Avatar movement speed in units per second.
    pub walk_speed: f64,
    pub spawn_position: Position,
    /// Spawn events emitted per connection; high-latency servers send two.
    pub spawn_events: u32,
    pub initial_health: u32,
    pub initial_hunger: u32,
    /// Ticks between hunger losses; `None` disables decay.
    pub hunger_decay_ticks: Option<u64>,
    pub inventory: Vec<ItemStack>,
    /// Item name to food points. Items absent here are inedible.
    pub food_values: HashMap<String, u32>,
    pub entities: Vec<Entity>,
    pub blocks: HashMap<String, Vec<Position>>,
    pub dimension: Dimension,
}

impl Default for SimConfig {
    fn default() -> Self {
        let food_values = HashMap::from([
            ("bread".to_string(), 5),
            ("cooked_beef".to_string(), 8),
            ("golden_carrot".to_string(), 6),
            ("carrot".to_string(), 3),
            ("rotten_flesh".to_string(), 4),
            ("enchanted_golden_apple".to_string(), 4),
        ]);
        Self {
            tick_interval: Duration::from_millis(50),
            walk_speed: SPRINT_SPEED,
            spawn_position: Position::new(0.5, 120.0, 0.5),
            spawn_events: 1,
            initial_health: 20,
            initial_hunger: 20,
            hunger_decay_ticks: None,
            inventory: vec![
                ItemStack::new(0, "bread", 851),
                ItemStack::new(1, "cooked_beef", 931),
                ItemStack::new(2, "shield", 1147),
            ],
            food_values,
            entities: Vec::new(),
            blocks: HashMap::new(),
            dimension: Dimension::Nether,
        }
    }
}

struct SimState {
    connected: bool,
    initialized: bool,
    connect_count: u32,
    position: Position,
    health: u32,
    hunger: u32,
    inventory: HashMap<u16, ItemStack>,
    entities: Vec<Entity>,
    walk_target: Option<Position>,
    held_main: Option<u16>,
    held_off: Option<u16>,
    held_active: bool,
    tick: u8,
    total_ticks: u64,
    events_tx: Option<mpsc::Sender<WorldEvent>>,
    pending_stream: Option<mpsc::Receiver<WorldEvent>>,
}

/// Simulated [`WorldConnection`].
pub struct SimWorld {
    config: SimConfig,
    state: Arc<Mutex<SimState>>,
}

impl SimWorld {
    pub fn new(config: SimConfig) -> Self {
        let state = SimState {
            connected: false,
            initialized: false,
            connect_count: 0,
            position: config.spawn_position,
            health: config.initial_health,
            hunger: config.initial_hunger,
            inventory: HashMap::new(),
            entities: Vec::new(),
            walk_target: None,
            held_main: None,
            held_off: None,
            held_active: false,
            tick: 0,
            total_ticks: 0,
            events_tx: None,
            pending_stream: None,
        };
        Self {
            config,
            state: Arc::new(Mutex::new(state)),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().expect("sim state poisoned")
    }

    /// Number of successful connections so far; lets tests observe reconnect
    /// cycles.
    pub fn connect_count(&self) -> u32 {
        self.lock().connect_count
    }

    pub fn is_connected(&self) -> bool {
        self.lock().connected
    }

    pub fn walk_target(&self) -> Option<Position> {
        self.lock().walk_target
    }

    // Scripting hooks used by tests.

    pub fn set_health(&self, health: u32) {
        self.lock().health = health;
    }

    pub fn set_hunger(&self, hunger: u32) {
        self.lock().hunger = hunger;
    }

    pub fn set_position(&self, position: Position) {
        self.lock().position = position;
    }

    pub fn set_inventory(&self, items: Vec<ItemStack>) {
        let mut state = self.lock();
        state.inventory = items.into_iter().map(|item| (item.slot, item)).collect();
    }

    pub fn add_entity(&self, entity: Entity) {
        self.lock().entities.push(entity);
    }

    pub fn clear_entities(&self) {
        self.lock().entities.clear();
    }

    /// Advances the world by one tick: walking, hunger decay, tick counter.
    /// Returns the events to emit for this step.
    fn step(state: &mut SimState, config: &SimConfig) -> Vec<WorldEvent> {
        let mut events = Vec::with_capacity(2);

        if let Some(target) = state.walk_target {
            let step = config.walk_speed * config.tick_interval.as_secs_f64();
            let distance = state.position.distance(&target);
            if distance <= step {
                state.position = target;
                state.walk_target = None;
            } else {
                let scale = step / distance;
                state.position = Position::new(
                    state.position.x + (target.x - state.position.x) * scale,
                    state.position.y + (target.y - state.position.y) * scale,
                    state.position.z + (target.z - state.position.z) * scale,
                );
            }
        }

        state.total_ticks += 1;
        if let Some(decay) = config.hunger_decay_ticks
            && state.total_ticks % decay == 0
            && state.hunger > 0
        {
            state.hunger -= 1;
            events.push(WorldEvent::HealthChanged {
                health: state.health,
                hunger: state.hunger,
            });
        }

        state.tick = (state.tick + 1) % 20;
        events.push(WorldEvent::Tick { count: state.tick });
        events
    }

    fn spawn_ticker(&self) {
        let state = Arc::clone(&self.state);
        let config = self.config.clone();
        tokio::spawn(async move {
            loop {
                sleep(config.tick_interval).await;
                let (tx, events) = {
                    let mut state = state.lock().expect("sim state poisoned");
                    if !state.connected {
                        break;
                    }
                    let Some(tx) = state.events_tx.clone() else {
                        break;
                    };
                    (tx, Self::step(&mut state, &config))
                };
                for event in events {
                    // Best-effort: a full or closed buffer drops the event.
                    if tx.try_send(event).is_err() {
                        debug!("sim event buffer full or closed, dropping event");
                    }
                }
            }
        });
    }
}

#[async_trait]
impl WorldConnection for SimWorld {
    async fn connect(&self) -> Result<()> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        {
            let mut state = self.lock();
            if state.connected {
                return Err(AgentError::ConnectFailed("already connected".into()));
            }
            state.connected = true;
            state.connect_count += 1;
            state.tick = 0;
            if !state.initialized {
                state.initialized = true;
                state.inventory = self
                    .config
                    .inventory
                    .iter()
                    .cloned()
                    .map(|item| (item.slot, item))
                    .collect();
                state.entities = self.config.entities.clone();
            }

            // Login and spawn arrive before the first tick.
            let _ = tx.try_send(WorldEvent::Login);
            for _ in 0..self.config.spawn_events {
                let _ = tx.try_send(WorldEvent::Spawn);
            }
            state.events_tx = Some(tx);
            state.pending_stream = Some(rx);
        }
        self.spawn_ticker();
        Ok(())
    }

    async fn disconnect(&self) {
        let mut state = self.lock();
        if !state.connected {
            return;
        }
        state.connected = false;
        state.walk_target = None;
        state.held_active = false;
        if let Some(tx) = state.events_tx.take() {
            let _ = tx.try_send(WorldEvent::Disconnected);
        }
        state.pending_stream = None;
    }

    async fn event_stream(&self) -> Result<mpsc::Receiver<WorldEvent>> {
        self.lock()
            .pending_stream
            .take()
            .ok_or(AgentError::EventStreamUnavailable)
    }

    fn position(&self) -> Option<Position> {
        let state = self.lock();
        state.connected.then_some(state.position)
    }

    fn health(&self) -> Option<u32> {
        let state = self.lock();
        state.connected.then_some(state.health)
    }

    fn hunger(&self) -> Option<u32> {
        let state = self.lock();
        state.connected.then_some(state.hunger)
    }

    fn dimension(&self) -> Option<Dimension> {
        let state = self.lock();
        state.connected.then_some(self.config.dimension)
    }

    fn inventory(&self) -> Option<HashMap<u16, ItemStack>> {
        let state = self.lock();
        state.connected.then(|| state.inventory.clone())
    }

    fn nearby_entities(&self) -> Vec<Entity> {
        let state = self.lock();
        if !state.connected {
            return Vec::new();
        }
        state.entities.clone()
    }

    fn find_blocks(
        &self,
        names: &[&str],
        max_distance: f64,
        origin: Option<Position>,
    ) -> HashMap<String, Vec<Position>> {
        let state = self.lock();
        if !state.connected {
            return HashMap::new();
        }
        let origin = origin.unwrap_or(state.position);
        let mut found = HashMap::new();
        for name in names {
            if let Some(positions) = self.config.blocks.get(*name) {
                let close: Vec<Position> = positions
                    .iter()
                    .filter(|position| origin.distance(position) <= max_distance)
                    .copied()
                    .collect();
                found.insert((*name).to_string(), close);
            }
        }
        found
    }

    async fn walk_to(&self, target: Position) -> Result<()> {
        let mut state = self.lock();
        if !state.connected {
            return Err(AgentError::NotConnected);
        }
        state.walk_target = Some(target);
        Ok(())
    }

    async fn stop_pathfinding(&self) {
        self.lock().walk_target = None;
    }

    async fn equip(&self, slot: u16, hand: Hand) -> Result<()> {
        let mut state = self.lock();
        if !state.inventory.contains_key(&slot) {
            return Err(AgentError::EmptySlot { slot });
        }
        match hand {
            Hand::Main => state.held_main = Some(slot),
            Hand::Off => state.held_off = Some(slot),
        }
        Ok(())
    }

    fn held_item(&self, hand: Hand) -> Option<ItemStack> {
        let state = self.lock();
        let slot = match hand {
            Hand::Main => state.held_main?,
            Hand::Off => state.held_off?,
        };
        state.inventory.get(&slot).cloned()
    }

    fn held_item_active(&self) -> bool {
        self.lock().held_active
    }

    async fn activate_held_item(&self, hand: Hand) {
        let mut state = self.lock();
        match hand {
            Hand::Off => state.held_active = true,
            Hand::Main => {
                // Consuming food applies instantly in the sim.
                let Some(slot) = state.held_main else { return };
                let Some(item) = state.inventory.get(&slot) else {
                    return;
                };
                let Some(value) = self.config.food_values.get(&item.name).copied() else {
                    return;
                };
                state.hunger = (state.hunger + value).min(MAX_HUNGER);
                state.inventory.remove(&slot);
                state.held_main = None;
                let health = state.health;
                let hunger = state.hunger;
                if let Some(tx) = &state.events_tx {
                    let _ = tx.try_send(WorldEvent::HealthChanged { health, hunger });
                }
            }
        }
    }

    async fn deactivate_held_item(&self) {
        self.lock().held_active = false;
    }

    fn food_value(&self, item: &ItemStack) -> Option<u32> {
        self.config.food_values.get(&item.name).copied()
    }
}
