//! # Combat AI
//!
//! Decision policies for non-player combatants, plus the dispatcher
//! adapter that answers `AwaitInput` events on their behalf. A policy
//! only ever sees the choices the action system offered; it cannot
//! invent actions, only pick among them.

use crate::{
    ActionChoices, AiKind, ConcreteAction, EntityId, GameEvent, GameState, Position, Subscriber,
};

/// Picks the offered choice for a fighter, by its AI kind.
///
/// Selection is deterministic: ties resolve to the earliest offer.
pub fn choose(kind: AiKind, state: &GameState, choices: &ActionChoices) -> Option<ConcreteAction> {
    match kind {
        AiKind::NoCombat => no_combat_choice(choices),
        AiKind::BasicCombat => basic_combat_choice(state, choices),
    }
}

/// Always ends the turn.
fn no_combat_choice(choices: &ActionChoices) -> Option<ConcreteAction> {
    choices
        .get("end turn")
        .and_then(|details| details.first())
        .map(|details| details.action.clone())
}

/// Attacks the lowest-hp enemy when any attack is offered; otherwise
/// takes the move that most closes the distance to the nearest enemy;
/// otherwise ends the turn.
fn basic_combat_choice(state: &GameState, choices: &ActionChoices) -> Option<ConcreteAction> {
    if let Some(attacks) = choices.get("attack") {
        let weakest = attacks.iter().min_by_key(|details| {
            let target = match &details.action {
                ConcreteAction::Attack(attack) => attack.target,
                _ => return u32::MAX,
            };
            state.fighter(target).map(|f| f.hp).unwrap_or(u32::MAX)
        });
        if let Some(details) = weakest {
            return Some(details.action.clone());
        }
    }

    if let Some(moves) = choices.get("move") {
        if let Some(details) = closing_move(state, moves) {
            return Some(details);
        }
    }

    no_combat_choice(choices)
}

/// The offered move whose destination is nearest to the closest live
/// enemy, accepted only when it actually closes distance.
fn closing_move(
    state: &GameState,
    moves: &[crate::ActionDetails],
) -> Option<ConcreteAction> {
    let actor = moves.first().map(|details| {
        use crate::Action;
        details.action.actor()
    })?;
    let start = state.position_of(actor)?;
    let hostiles = state.hostiles_to(actor);
    let nearest = |from: Position| -> Option<u32> {
        hostiles
            .iter()
            .filter_map(|id| state.position_of(*id))
            .map(|pos| from.manhattan_distance(pos))
            .min()
    };
    let current_distance = nearest(start)?;

    let best = moves.iter().min_by_key(|details| {
        let destination = match &details.action {
            ConcreteAction::Move(action) => action.destination(),
            _ => None,
        };
        destination.and_then(nearest).unwrap_or(u32::MAX)
    })?;

    let best_distance = match &best.action {
        ConcreteAction::Move(action) => action.destination().and_then(nearest)?,
        _ => return None,
    };
    if best_distance < current_distance {
        Some(best.action.clone())
    } else {
        None
    }
}

/// Static-bus subscriber answering input requests for AI fighters.
///
/// Fighters without an AI kind are left alone: the round stays stalled
/// until an external driver confirms an action for them.
pub struct AiAdapter;

impl AiAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for AiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriber for AiAdapter {
    fn handle_event(&mut self, event: &GameEvent, state: &mut GameState) -> Vec<GameEvent> {
        let GameEvent::AwaitInput { fighter, choices } = event else {
            return Vec::new();
        };
        let Some(kind) = state.entity(*fighter).and_then(|entity| entity.ai) else {
            return Vec::new();
        };
        if let Some(action) = choose(kind, state, choices) {
            state.ready_action(*fighter, action);
        }
        Vec::new()
    }
}

/// Answers input requests for one specific fighter, regardless of its
/// AI kind. Used to puppet a fighter in drills and tests.
pub struct ScriptedInput {
    pub fighter: EntityId,
    pub actions: Vec<ConcreteAction>,
}

impl Subscriber for ScriptedInput {
    fn handle_event(&mut self, event: &GameEvent, state: &mut GameState) -> Vec<GameEvent> {
        if let GameEvent::AwaitInput { fighter, .. } = event {
            if *fighter == self.fighter && !self.actions.is_empty() {
                let action = self.actions.remove(0);
                state.ready_action(*fighter, action);
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        available_choices, Biome, Dungeon, Entity, Fighter, Locatable, Name, Room, Species,
    };

    fn skirmish() -> (GameState, EntityId, EntityId, EntityId) {
        let mut state = GameState::new(3);
        let mut room = Room::new(8, 4, Biome::Cavern);

        let mut raider = Entity::new(Name::new("Raider"), Species::Orc)
            .with_fighter(Fighter::new(12, 4, 1, 2).enemy())
            .with_ai(crate::AiKind::BasicCombat)
            .with_locatable(Locatable::new(Position::new(0, 0), 2));
        let mut sturdy = Entity::new(Name::new("Sturdy"), Species::Dwarf)
            .with_fighter(Fighter::new(20, 3, 2, 2))
            .with_locatable(Locatable::new(Position::new(5, 0), 2));
        let mut wounded = Entity::new(Name::new("Wounded"), Species::Elf)
            .with_fighter(Fighter::new(20, 3, 0, 3))
            .with_locatable(Locatable::new(Position::new(6, 2), 3));
        wounded.fighter.as_mut().unwrap().hp = 4;

        room.add_entity(&mut raider);
        room.add_entity(&mut sturdy);
        room.add_entity(&mut wounded);

        let (raider_id, sturdy_id, wounded_id) = (raider.id, sturdy.id, wounded.id);
        state.insert_entity(raider);
        state.insert_entity(sturdy);
        state.insert_entity(wounded);
        state.dungeon = Some(Dungeon::from_rooms("Skirmish", Biome::Cavern, vec![room]));
        (state, raider_id, sturdy_id, wounded_id)
    }

    #[test]
    fn test_no_combat_prefers_end_turn() {
        let (state, raider, _, _) = skirmish();
        let choices = available_choices(&state, raider);
        let action = choose(AiKind::NoCombat, &state, &choices).unwrap();
        assert!(matches!(action, ConcreteAction::EndTurn(_)));
    }

    #[test]
    fn test_basic_combat_attacks_weakest() {
        let (state, raider, _, wounded) = skirmish();
        let choices = available_choices(&state, raider);
        let action = choose(AiKind::BasicCombat, &state, &choices).unwrap();
        match action {
            ConcreteAction::Attack(attack) => assert_eq!(attack.target, wounded),
            other => panic!("expected an attack, got {:?}", other),
        }
    }

    #[test]
    fn test_basic_combat_closes_distance_without_attacks() {
        let (mut state, raider, sturdy, wounded) = skirmish();
        // Strip the attack offers by exhausting hostiles' visibility:
        // remove them from choices by building a choice set without
        // attacks.
        let full = available_choices(&state, raider);
        let mut choices = full.clone();
        choices.remove("attack");

        let action = choose(AiKind::BasicCombat, &state, &choices).unwrap();
        let ConcreteAction::Move(movement) = action else {
            panic!("expected a move");
        };
        let destination = movement.destination().unwrap();
        let start = state.position_of(raider).unwrap();
        let nearest_before = [sturdy, wounded]
            .iter()
            .filter_map(|id| state.position_of(*id))
            .map(|pos| start.manhattan_distance(pos))
            .min()
            .unwrap();
        let nearest_after = [sturdy, wounded]
            .iter()
            .filter_map(|id| state.position_of(*id))
            .map(|pos| destination.manhattan_distance(pos))
            .min()
            .unwrap();
        assert!(nearest_after < nearest_before);

        // And with no hostiles at all, it ends the turn.
        state.kill_entity(sturdy);
        state.kill_entity(wounded);
        let choices = available_choices(&state, raider);
        let action = choose(AiKind::BasicCombat, &state, &choices).unwrap();
        assert!(matches!(action, ConcreteAction::EndTurn(_)));
    }

    #[test]
    fn test_adapter_readies_exactly_one_action() {
        let (mut state, raider, _, wounded) = skirmish();
        let choices = available_choices(&state, raider);
        let event = GameEvent::AwaitInput {
            fighter: raider,
            choices,
        };

        let mut adapter = AiAdapter::new();
        adapter.handle_event(&event, &mut state);

        let readied = state.take_readied_action(raider).expect("nothing readied");
        match readied {
            ConcreteAction::Attack(attack) => assert_eq!(attack.target, wounded),
            other => panic!("expected an attack, got {:?}", other),
        }
        // The confirm fired once; nothing remains readied.
        assert!(state.take_readied_action(raider).is_none());
    }

    #[test]
    fn test_adapter_ignores_fighters_without_ai() {
        let (mut state, _, sturdy, _) = skirmish();
        let choices = available_choices(&state, sturdy);
        let event = GameEvent::AwaitInput {
            fighter: sturdy,
            choices,
        };

        let mut adapter = AiAdapter::new();
        adapter.handle_event(&event, &mut state);
        assert!(state.take_readied_action(sturdy).is_none());
    }

    #[test]
    fn test_scripted_input_answers_its_fighter_only() {
        let (mut state, raider, sturdy, _) = skirmish();
        let end_turn = ConcreteAction::EndTurn(crate::EndTurnAction { actor: sturdy });
        let mut script = ScriptedInput {
            fighter: sturdy,
            actions: vec![end_turn.clone()],
        };

        // A request for someone else is ignored.
        let other = GameEvent::AwaitInput {
            fighter: raider,
            choices: available_choices(&state, raider),
        };
        script.handle_event(&other, &mut state);
        assert!(state.take_readied_action(raider).is_none());

        // The scripted fighter gets the queued action, exactly once.
        let own = GameEvent::AwaitInput {
            fighter: sturdy,
            choices: available_choices(&state, sturdy),
        };
        script.handle_event(&own, &mut state);
        assert_eq!(state.take_readied_action(sturdy), Some(end_turn));
        script.handle_event(&own, &mut state);
        assert!(state.take_readied_action(sturdy).is_none());
    }
}
