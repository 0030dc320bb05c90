//! # Game Events
//!
//! The event vocabulary shared by the combat round, the dispatcher and
//! every observer. Simulation systems emit events; AI, occupancy tracking
//! and UI layers consume them without being coupled to the producers.

use crate::{ActionChoices, EntityId, Position};
use serde::{Deserialize, Serialize};

/// How prominently a message should be surfaced by a UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageImportance {
    Low,
    Normal,
    High,
    Critical,
}

/// Topics a subscriber can register interest in.
///
/// Every [`GameEvent`] maps onto exactly one topic; a publication reaches
/// the subscribers of its event's topic in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    Message,
    Attack,
    Move,
    Dying,
    Retreat,
    NewEncounter,
    Cleanup,
    TeamTriumphant,
    AwaitInput,
    InventoryFull,
}

/// Events produced by the simulation.
///
/// A combat round yields these lazily, one per pull; the engine publishes
/// each on its dispatchers before pulling the next. Effects are applied
/// when the event is produced, so an observer always sees state that
/// already reflects the event it is handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GameEvent {
    /// Free-form narration for the message log.
    Message {
        text: String,
        importance: MessageImportance,
    },
    /// An attack landed (damage may be zero).
    Attack {
        attacker: EntityId,
        target: EntityId,
        damage: u32,
    },
    /// One step of a movement path was traversed.
    Moved {
        actor: EntityId,
        from: Position,
        to: Position,
    },
    /// An entity died; its death hooks have already run.
    Dying { entity: EntityId, message: String },
    /// A fighter broke off and is retreating from combat.
    Retreat { fighter: EntityId, message: String },
    /// A new room encounter has begun.
    NewEncounter { room: usize },
    /// Per-encounter observers should consider themselves dismissed.
    Cleanup,
    /// The team cleared the mission named here.
    TeamTriumphant { dungeon: String },
    /// A fighter needs an action chosen from the given choices.
    AwaitInput {
        fighter: EntityId,
        choices: ActionChoices,
    },
    /// An item could not be stowed because the inventory is full.
    InventoryFull { owner: EntityId },
}

impl GameEvent {
    /// The topic this event is published under.
    pub fn topic(&self) -> Topic {
        match self {
            GameEvent::Message { .. } => Topic::Message,
            GameEvent::Attack { .. } => Topic::Attack,
            GameEvent::Moved { .. } => Topic::Move,
            GameEvent::Dying { .. } => Topic::Dying,
            GameEvent::Retreat { .. } => Topic::Retreat,
            GameEvent::NewEncounter { .. } => Topic::NewEncounter,
            GameEvent::Cleanup => Topic::Cleanup,
            GameEvent::TeamTriumphant { .. } => Topic::TeamTriumphant,
            GameEvent::AwaitInput { .. } => Topic::AwaitInput,
            GameEvent::InventoryFull { .. } => Topic::InventoryFull,
        }
    }

    /// Convenience constructor for a normal-importance message.
    pub fn message(text: impl Into<String>) -> Self {
        GameEvent::Message {
            text: text.into(),
            importance: MessageImportance::Normal,
        }
    }

    /// The narration carried by this event, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            GameEvent::Message { text, .. } => Some(text),
            GameEvent::Dying { message, .. } => Some(message),
            GameEvent::Retreat { message, .. } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::new_entity_id;

    #[test]
    fn test_event_topic_mapping() {
        let attack = GameEvent::Attack {
            attacker: new_entity_id(),
            target: new_entity_id(),
            damage: 3,
        };
        assert_eq!(attack.topic(), Topic::Attack);
        assert_eq!(GameEvent::Cleanup.topic(), Topic::Cleanup);
        assert_eq!(GameEvent::message("hi").topic(), Topic::Message);
    }

    #[test]
    fn test_event_text() {
        let msg = GameEvent::message("an omen");
        assert_eq!(msg.text(), Some("an omen"));

        let dying = GameEvent::Dying {
            entity: new_entity_id(),
            message: "Grim falls.".to_string(),
        };
        assert_eq!(dying.text(), Some("Grim falls."));

        let moved = GameEvent::Moved {
            actor: new_entity_id(),
            from: crate::Position::origin(),
            to: crate::Position::new(1, 0),
        };
        assert_eq!(moved.text(), None);
    }
}
