//! The world connection seam.
//!
//! The protocol client is an external collaborator; the agent core only
//! depends on this trait. Snapshot accessors are live reads against the
//! connection and must report `None` once the connection is gone, never a
//! stale cache. Commands are async and may be rejected while disconnected.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::Result;
use crate::events::WorldEvent;

use super::geom::Position;
use super::types::{Dimension, Entity, Hand, ItemStack};

/// Capability surface of a live game-world connection.
#[async_trait]
pub trait WorldConnection: Send + Sync {
    /// Establish the connection and start emitting events.
    async fn connect(&self) -> Result<()>;

    /// Tear the connection down. Safe to call when already disconnected.
    async fn disconnect(&self);

    /// Take the event stream for the current connection.
    ///
    /// Each successful `connect` produces exactly one stream; the stream ends
    /// when the connection drops.
    async fn event_stream(&self) -> Result<mpsc::Receiver<WorldEvent>>;

    // Snapshot accessors. All return `None` (or empty) when disconnected.

    fn position(&self) -> Option<Position>;
    fn health(&self) -> Option<u32>;
    fn hunger(&self) -> Option<u32>;
    fn dimension(&self) -> Option<Dimension>;
    fn inventory(&self) -> Option<HashMap<u16, ItemStack>>;
    fn nearby_entities(&self) -> Vec<Entity>;

    /// Positions of named blocks within `max_distance` of `origin` (or of the
    /// agent when `origin` is absent). Unknown block names are skipped.
    fn find_blocks(
        &self,
        names: &[&str],
        max_distance: f64,
        origin: Option<Position>,
    ) -> HashMap<String, Vec<Position>>;

    // Movement primitives.

    async fn walk_to(&self, target: Position) -> Result<()>;
    async fn stop_pathfinding(&self);

    // Item primitives.

    async fn equip(&self, slot: u16, hand: Hand) -> Result<()>;
    fn held_item(&self, hand: Hand) -> Option<ItemStack>;
    fn held_item_active(&self) -> bool;
    async fn activate_held_item(&self, hand: Hand);
    async fn deactivate_held_item(&self);

    /// Food points restored by the item, or `None` if it is not edible.
    fn food_value(&self, item: &ItemStack) -> Option<u32>;
}
