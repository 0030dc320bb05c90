//! # Occupancy Handler
//!
//! Keeps the current room's derived obstacle set in sync with entity
//! movement, death and retreat. Subscribed statically, since one
//! handler serves every encounter.

use crate::{GameEvent, GameState, Subscriber};

/// Recomputes room obstacles whenever an occupant moves or leaves play.
pub struct OccupancyHandler;

impl OccupancyHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OccupancyHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriber for OccupancyHandler {
    fn handle_event(&mut self, event: &GameEvent, state: &mut GameState) -> Vec<GameEvent> {
        match event {
            GameEvent::Moved { .. }
            | GameEvent::Dying { .. }
            | GameEvent::Retreat { .. }
            | GameEvent::NewEncounter { .. } => {
                state.recompute_current_room_obstacles();
            }
            _ => {}
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Biome, Dungeon, Entity, Fighter, Locatable, Name, Position, Room, Species,
    };

    #[test]
    fn test_obstacles_follow_movement() {
        let mut state = GameState::new(11);
        let mut room = Room::new(5, 5, Biome::Swamp);
        let mut walker = Entity::new(Name::new("Walker"), Species::Human)
            .with_fighter(Fighter::new(10, 2, 0, 3))
            .with_locatable(Locatable::new(Position::new(1, 1), 3));
        room.add_entity(&mut walker);
        let walker_id = walker.id;
        state.insert_entity(walker);
        state.dungeon = Some(Dungeon::from_rooms("Bog", Biome::Swamp, vec![room]));

        state.set_position(walker_id, Position::new(2, 3));
        let event = GameEvent::Moved {
            actor: walker_id,
            from: Position::new(1, 1),
            to: Position::new(2, 3),
        };

        let mut handler = OccupancyHandler::new();
        handler.handle_event(&event, &mut state);

        let room = state.current_room().unwrap();
        assert!(room.obstacles.contains(&Position::new(2, 3)));
        assert!(!room.obstacles.contains(&Position::new(1, 1)));
        assert_eq!(room.obstacles.len(), 1);
    }

    #[test]
    fn test_obstacles_cleared_on_death() {
        let mut state = GameState::new(11);
        let mut room = Room::new(5, 5, Biome::Swamp);
        let mut victim = Entity::new(Name::new("Victim"), Species::Goblin)
            .with_fighter(Fighter::new(5, 1, 0, 2).enemy())
            .with_locatable(Locatable::new(Position::new(3, 3), 2));
        room.add_entity(&mut victim);
        let victim_id = victim.id;
        state.insert_entity(victim);
        state.dungeon = Some(Dungeon::from_rooms("Bog", Biome::Swamp, vec![room]));

        state.kill_entity(victim_id);
        let event = GameEvent::Dying {
            entity: victim_id,
            message: "Victim falls.".to_string(),
        };

        let mut handler = OccupancyHandler::new();
        handler.handle_event(&event, &mut state);

        let room = state.current_room().unwrap();
        assert!(room.occupants.is_empty());
        assert!(room.obstacles.is_empty());
    }
}
