//! # World Model
//!
//! Rooms, dungeons and the mission board. A room is a tile grid with an
//! occupant list and a derived obstacle set; a dungeon is an ordered
//! sequence of rooms ending in a boss chamber; the board offers a fixed
//! number of freshly generated dungeons.

use crate::{Entity, EntityId, DeathHook, Loot, Position};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Visual/terrain variant tag for a room. Irrelevant to simulation
/// outcomes; carried for the rendering layer and layout templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Biome {
    Crypt,
    Cavern,
    Keep,
    Swamp,
}

impl Biome {
    pub fn all() -> &'static [Biome] {
        &[Biome::Crypt, Biome::Cavern, Biome::Keep, Biome::Swamp]
    }
}

/// Static terrain of a room: nodes blocked regardless of occupancy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomLayout {
    pub blocked: HashSet<Position>,
}

impl RoomLayout {
    pub fn open() -> Self {
        Self::default()
    }

    pub fn with_pillars(pillars: impl IntoIterator<Item = Position>) -> Self {
        Self {
            blocked: pillars.into_iter().collect(),
        }
    }
}

/// One combat arena within a dungeon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub width: u32,
    pub height: u32,
    pub occupants: Vec<EntityId>,
    /// Nodes unwalkable because an occupant stands there. Derived state,
    /// kept in sync by the occupancy handler.
    pub obstacles: HashSet<Position>,
    pub layout: RoomLayout,
    pub biome: Biome,
}

impl Room {
    pub fn new(width: u32, height: u32, biome: Biome) -> Self {
        Self {
            width,
            height,
            occupants: Vec::new(),
            obstacles: HashSet::new(),
            layout: RoomLayout::open(),
            biome,
        }
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// Whether the node can be entered: in bounds, clear terrain, and not
    /// occupied by anyone.
    pub fn is_walkable(&self, pos: Position) -> bool {
        self.in_bounds(pos) && !self.layout.blocked.contains(&pos) && !self.obstacles.contains(&pos)
    }

    /// Registers an occupant and arranges for its removal on death.
    ///
    /// The entity's current location immediately becomes an obstacle.
    pub fn add_entity(&mut self, entity: &mut Entity) {
        if !self.occupants.contains(&entity.id) {
            self.occupants.push(entity.id);
        }
        entity.register_death_hook(DeathHook::LeaveRoom);
        if let Some(pos) = entity.position() {
            self.obstacles.insert(pos);
        }
    }

    pub fn remove_occupant(&mut self, id: EntityId) {
        self.occupants.retain(|occupant| *occupant != id);
    }

    /// Rebuilds the obstacle set from the occupants' current locations.
    pub fn recompute_obstacles(&mut self, entities: &HashMap<EntityId, Entity>) {
        self.obstacles = self
            .occupants
            .iter()
            .filter_map(|id| entities.get(id))
            .filter_map(|entity| entity.position())
            .collect();
    }

    /// First free node scanning column-major from the west wall; used to
    /// place an arriving team.
    pub fn entry_position(&self) -> Option<Position> {
        for x in 0..self.width as i32 {
            for y in 0..self.height as i32 {
                let pos = Position::new(x, y);
                if self.is_walkable(pos) {
                    return Some(pos);
                }
            }
        }
        None
    }
}

/// A generated mission: ordered rooms, a boss, and the loot at stake.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dungeon {
    pub name: String,
    pub description: String,
    pub biome: Biome,
    pub rooms: Vec<Room>,
    pub current_room: usize,
    pub min_enemies_per_room: u32,
    pub max_enemies_per_room: u32,
    pub boss: Option<EntityId>,
    pub loot: Loot,
}

impl Dungeon {
    /// Builds a dungeon over the given rooms, starting at the first.
    pub fn from_rooms(name: impl Into<String>, biome: Biome, rooms: Vec<Room>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            biome,
            rooms,
            current_room: 0,
            min_enemies_per_room: 1,
            max_enemies_per_room: 3,
            boss: None,
            loot: Loot::default(),
        }
    }

    /// The room the team currently stands in.
    pub fn room(&self) -> Option<&Room> {
        self.rooms.get(self.current_room)
    }

    pub fn room_mut(&mut self) -> Option<&mut Room> {
        self.rooms.get_mut(self.current_room)
    }

    /// Advances to the next room. Returns false when the rooms are
    /// exhausted and the mission is complete.
    pub fn advance_room(&mut self) -> bool {
        self.current_room += 1;
        self.current_room < self.rooms.len()
    }

    pub fn is_complete(&self) -> bool {
        self.current_room >= self.rooms.len()
    }

    /// All entity ids placed in this dungeon's rooms.
    pub fn spawned_entities(&self) -> Vec<EntityId> {
        self.rooms
            .iter()
            .flat_map(|room| room.occupants.iter().copied())
            .collect()
    }
}

/// A fixed-size board of missions on offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MissionBoard {
    pub size: usize,
    pub missions: Vec<Dungeon>,
}

impl MissionBoard {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            missions: Vec::new(),
        }
    }

    /// Removes and returns the mission at the given slot.
    pub fn take_mission(&mut self, index: usize) -> Option<Dungeon> {
        if index < self.missions.len() {
            Some(self.missions.remove(index))
        } else {
            None
        }
    }
}
