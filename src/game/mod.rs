//! # Game Module
//!
//! Core simulation systems: the entity model, combat, the dispatcher and
//! the guild/world state they operate on.
//!
//! This module contains the fundamental building blocks of the Guildhall
//! simulation:
//! - Entity aggregate and its capabilities (fighter, inventory, locatable)
//! - Action system with action-point budgets
//! - Initiative-ordered combat rounds producing lazy event sequences
//! - Topic/subscriber dispatcher with weak and strong holding policies
//! - Guild, team, dungeon and mission board state

pub mod actions;
pub mod ai;
pub mod combat;
pub mod dispatch;
pub mod entities;
pub mod events;
pub mod fighter;
pub mod guild;
pub mod inventory;
pub mod occupancy;
pub mod rewards;
pub mod state;
pub mod world;

pub use actions::*;
pub use ai::*;
pub use combat::*;
pub use dispatch::*;
pub use entities::*;
pub use events::*;
pub use fighter::*;
pub use guild::*;
pub use inventory::*;
pub use occupancy::*;
pub use rewards::*;
pub use state::*;
pub use world::*;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a node on a room's tile grid.
///
/// # Examples
///
/// ```
/// use guildhall::Position;
///
/// let pos = Position::new(4, 2);
/// assert_eq!(pos.x, 4);
/// assert_eq!(pos.y, 2);
///
/// let neighbours = pos.cardinal_adjacent_positions();
/// assert_eq!(neighbours.len(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Creates a new position with the given coordinates.
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns the origin position (0, 0).
    pub fn origin() -> Self {
        Self::new(0, 0)
    }

    /// Calculates the Manhattan distance to another position.
    ///
    /// # Examples
    ///
    /// ```
    /// use guildhall::Position;
    ///
    /// let a = Position::new(0, 0);
    /// let b = Position::new(3, 4);
    /// assert_eq!(a.manhattan_distance(b), 7);
    /// ```
    pub fn manhattan_distance(self, other: Position) -> u32 {
        ((self.x - other.x).abs() + (self.y - other.y).abs()) as u32
    }

    /// Returns the 4 cardinal adjacent positions.
    pub fn cardinal_adjacent_positions(self) -> Vec<Position> {
        vec![
            Position::new(self.x, self.y - 1), // N
            Position::new(self.x - 1, self.y), // W
            Position::new(self.x + 1, self.y), // E
            Position::new(self.x, self.y + 1), // S
        ]
    }
}

impl std::ops::Add for Position {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Position {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Unique identifier for game entities.
pub type EntityId = Uuid;

/// Creates a new unique entity ID.
pub fn new_entity_id() -> EntityId {
    Uuid::new_v4()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_creation() {
        let pos = Position::new(5, 10);
        assert_eq!(pos.x, 5);
        assert_eq!(pos.y, 10);
    }

    #[test]
    fn test_position_manhattan_distance() {
        let a = Position::new(0, 0);
        let b = Position::new(3, 4);
        assert_eq!(a.manhattan_distance(b), 7);
    }

    #[test]
    fn test_position_cardinal_adjacent() {
        let pos = Position::new(5, 5);
        let adjacent = pos.cardinal_adjacent_positions();
        assert_eq!(adjacent.len(), 4);
        assert!(adjacent.contains(&Position::new(5, 4)));
        assert!(adjacent.contains(&Position::new(4, 5)));
        assert!(!adjacent.contains(&Position::new(4, 4)));
    }

    #[test]
    fn test_position_arithmetic() {
        let a = Position::new(5, 10);
        let b = Position::new(3, 2);
        assert_eq!(a + b, Position::new(8, 12));
        assert_eq!(a - b, Position::new(2, 8));
    }

    #[test]
    fn test_entity_id_uniqueness() {
        let id1 = new_entity_id();
        let id2 = new_entity_id();
        assert_ne!(id1, id2);
    }
}
