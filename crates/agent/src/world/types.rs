//! Snapshot data types read from the world connection.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::geom::Position;

/// World dimension the agent currently occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Overworld,
    Nether,
    End,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Dimension::Overworld => "overworld",
            Dimension::Nether => "the_nether",
            Dimension::End => "the_end",
        };
        write!(f, "{}", label)
    }
}

/// Which hand an item is equipped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Main,
    Off,
}

/// An item occupying one inventory slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStack {
    pub slot: u16,
    pub name: String,
    /// Registry type id of the item.
    pub kind_id: u32,
}

impl ItemStack {
    pub fn new(slot: u16, name: impl Into<String>, kind_id: u32) -> Self {
        Self {
            slot,
            name: name.into(),
            kind_id,
        }
    }
}

/// Classification of a nearby entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Player,
    Item,
    Other,
}

/// A nearby entity as observed from the world connection.
///
/// The agent's own entity is never included. `sub_name` carries the player
/// username for players and the item name for dropped items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub position: Position,
    pub kind: EntityKind,
    pub sub_name: Option<String>,
}

impl Entity {
    pub fn player(position: Position, username: impl Into<String>) -> Self {
        Self {
            position,
            kind: EntityKind::Player,
            sub_name: Some(username.into()),
        }
    }

    pub fn item(position: Position, name: impl Into<String>) -> Self {
        Self {
            position,
            kind: EntityKind::Item,
            sub_name: Some(name.into()),
        }
    }
}
