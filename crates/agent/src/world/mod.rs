//! World access: the connection seam, snapshot types, and geometry helpers.

mod connection;
pub mod geom;
mod sim;
mod types;

pub use connection::WorldConnection;
pub use geom::Position;
pub use sim::{SimConfig, SimWorld};
pub use types::{Dimension, Entity, EntityKind, Hand, ItemStack};
