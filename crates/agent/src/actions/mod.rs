//! Behavior units composed by strategies.

mod action;
mod always_shield;
mod efficient_eat;
mod emergency_quit;
mod goto_location;
mod loot_finder;

pub use action::{Action, ActionHandle};
pub use always_shield::AlwaysShield;
pub use efficient_eat::{EfficientEat, FOOD_BLACKLIST, valid_food_value};
pub use emergency_quit::{EmergencyQuit, EmergencyQuitConfig};
pub use goto_location::GotoLocation;
pub use loot_finder::LootFinder;
