//! # Combat Round
//!
//! Initiative-ordered turn resolution over two sides of fighters. The
//! round is a lazy producer: each call to [`CombatRound::next_event`]
//! applies at most one combat step and returns the event describing it,
//! so observers run against state that already reflects what they are
//! told. Death and retreat follow-ups for a wounded target are queued
//! immediately and delivered before the next fighter acts.
//!
//! Input is cooperative. When a fighter needs an action the round emits
//! one `AwaitInput` event and then stalls, returning `None` from
//! `next_event` until a confirm readies an action on that fighter.

use crate::{
    Action, CombatStep, EntityId, GameEvent, GameState, GuildhallError, GuildhallResult,
    MessageImportance,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use std::collections::VecDeque;

/// Lifecycle of a combat round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundPhase {
    Idle,
    InitiativeRolled,
    FighterTurn,
    Complete,
}

enum RoundItem {
    /// An already-realised event awaiting delivery.
    Produced(GameEvent),
    /// A deferred effect, applied when popped.
    Step(CombatStep),
}

/// One initiative-ordered pass over all able combatants of two sides.
pub struct CombatRound {
    team: Vec<EntityId>,
    enemies: Vec<EntityId>,
    order: VecDeque<EntityId>,
    phase: RoundPhase,
    current: Option<EntityId>,
    awaiting_input: bool,
    queue: VecDeque<RoundItem>,
}

impl CombatRound {
    pub fn new(team: Vec<EntityId>, enemies: Vec<EntityId>) -> Self {
        Self {
            team,
            enemies,
            order: VecDeque::new(),
            phase: RoundPhase::Idle,
            current: None,
            awaiting_input: false,
            queue: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Whether the round is stalled on an unanswered input request.
    pub fn is_awaiting_input(&self) -> bool {
        self.awaiting_input
    }

    /// The fighter whose turn is in progress.
    pub fn current_fighter(&self) -> Option<EntityId> {
        self.current
    }

    /// Initiative order still to act this round.
    pub fn remaining_order(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.order.iter().copied()
    }

    /// Rolls initiative: every able combatant from both sides enters
    /// the order exactly once, uniformly shuffled.
    pub fn roll_initiative(
        &mut self,
        state: &GameState,
        rng: &mut StdRng,
    ) -> GuildhallResult<()> {
        if self.phase != RoundPhase::Idle {
            return Err(GuildhallError::InvalidState(
                "Initiative has already been rolled for this round".to_string(),
            ));
        }

        let mut combatants: Vec<EntityId> = self
            .team
            .iter()
            .chain(self.enemies.iter())
            .copied()
            .filter(|id| state.is_live(*id))
            .collect();
        combatants.shuffle(rng);

        if let Some(first) = combatants.first() {
            let name = state.display_name(*first);
            self.queue.push_back(RoundItem::Produced(GameEvent::Message {
                text: format!("{} seizes the initiative.", name),
                importance: MessageImportance::High,
            }));
        }

        self.order = combatants.into();
        self.phase = RoundPhase::InitiativeRolled;
        Ok(())
    }

    /// Which side won, judged from live membership: `Some(0)` when the
    /// team stands and the enemies do not, `Some(1)` symmetrically,
    /// `None` while both or neither stand.
    pub fn victor(&self, state: &GameState) -> Option<usize> {
        let team_alive = self.team.iter().any(|id| state.is_live(*id));
        let enemies_alive = self.enemies.iter().any(|id| state.is_live(*id));
        match (team_alive, enemies_alive) {
            (true, false) => Some(0),
            (false, true) => Some(1),
            _ => None,
        }
    }

    /// Pulls the next event, applying its effect as it is produced.
    ///
    /// Returns `None` in two situations: the round is stalled awaiting
    /// an action confirm (check [`is_awaiting_input`]), or the round
    /// has just completed. Pulling again after completion is a
    /// programmer error.
    ///
    /// [`is_awaiting_input`]: CombatRound::is_awaiting_input
    pub fn next_event(&mut self, state: &mut GameState) -> Option<GameEvent> {
        if self.phase == RoundPhase::Complete {
            debug_assert!(false, "combat round iterated past completion");
            return None;
        }
        if self.phase == RoundPhase::Idle {
            debug_assert!(false, "combat round iterated before initiative roll");
            return None;
        }

        loop {
            // Drain queued items first: realised events pass straight
            // through, steps apply their effect now.
            if let Some(item) = self.queue.pop_front() {
                match item {
                    RoundItem::Produced(event) => return Some(event),
                    RoundItem::Step(step) => {
                        if let Some(event) = self.apply_step(step, state) {
                            return Some(event);
                        }
                        // Silent no-op (e.g. attack on a dead target).
                        continue;
                    }
                }
            }

            // A stalled input request: execute the readied action if a
            // confirm arrived, otherwise stay stalled.
            if self.awaiting_input {
                let fighter = self.current.expect("input awaited with no current fighter");
                let Some(action) = state.take_readied_action(fighter) else {
                    return None;
                };
                self.awaiting_input = false;
                match action.execute(state) {
                    Ok(steps) => {
                        self.queue.extend(steps.into_iter().map(RoundItem::Step));
                    }
                    Err(error) => {
                        log::warn!(
                            "Readied action {:?} failed to execute: {}",
                            action.name(),
                            error
                        );
                    }
                }
                continue;
            }

            // Between actions: victory ends the round before anyone
            // else gets a turn.
            if let Some(victor) = self.victor(state) {
                self.phase = RoundPhase::Complete;
                self.current = None;
                let text = if victor == 0 {
                    "The enemies are vanquished. Victory!".to_string()
                } else {
                    "The team has fallen.".to_string()
                };
                return Some(GameEvent::Message {
                    text,
                    importance: MessageImportance::Critical,
                });
            }

            // The current fighter keeps acting while it stands and has
            // budget left.
            if let Some(fighter) = self.current {
                let budget = state
                    .fighter(fighter)
                    .map(|f| f.action_points.current)
                    .unwrap_or(0);
                if state.is_live(fighter) && budget > 0 {
                    let choices = crate::available_choices(state, fighter);
                    self.awaiting_input = true;
                    return Some(GameEvent::AwaitInput { fighter, choices });
                }
                self.current = None;
            }

            // Next fighter in initiative order; combatants incapacitated
            // mid-round forfeit their slot.
            match self.order.pop_front() {
                Some(fighter) if !state.is_live(fighter) => continue,
                Some(fighter) => {
                    self.phase = RoundPhase::FighterTurn;
                    self.current = Some(fighter);
                    if let Some(f) = state.fighter_mut(fighter) {
                        f.action_points.refresh();
                    }
                    continue;
                }
                None => {
                    // Order exhausted with both sides standing: the
                    // round is over, the encounter is not.
                    self.phase = RoundPhase::Complete;
                    return None;
                }
            }
        }
    }

    /// Applies one combat step, queueing any death or retreat
    /// follow-ups, and returns the event describing it. Steps voided by
    /// earlier effects (a dead attacker, an empty slot) return `None`.
    fn apply_step(&mut self, step: CombatStep, state: &mut GameState) -> Option<GameEvent> {
        match step {
            CombatStep::Strike { attacker, target } => {
                if !state.is_live(attacker) || state.entity(target).map_or(true, |e| e.is_dead) {
                    return None;
                }

                let damage = {
                    let attacker_fighter = state.fighter(attacker)?;
                    let target_fighter = state.fighter(target)?;
                    attacker_fighter.damage_against(target_fighter)
                };

                let hp_before = state.fighter(target)?.hp;
                let target_name = state.display_name(target);
                {
                    let target_fighter = state.fighter_mut(target)?;
                    target_fighter.take_damage(damage);
                }

                let target_fighter = state.fighter(target)?;
                if target_fighter.hp == 0 {
                    state.kill_entity(target);
                    self.queue.push_back(RoundItem::Produced(GameEvent::Dying {
                        entity: target,
                        message: format!("{} falls.", target_name),
                    }));
                } else if target_fighter.crossed_retreat_threshold(hp_before) {
                    state.retreat_fighter(target);
                    self.queue.push_back(RoundItem::Produced(GameEvent::Retreat {
                        fighter: target,
                        message: format!("{} breaks and runs!", target_name),
                    }));
                }

                Some(GameEvent::Attack {
                    attacker,
                    target,
                    damage,
                })
            }

            CombatStep::Walk { actor, to } => {
                if !state.is_live(actor) {
                    return None;
                }
                let from = state.position_of(actor)?;
                state.set_position(actor, to);
                Some(GameEvent::Moved { actor, from, to })
            }

            CombatStep::UseItem { actor, slot } => {
                if !state.is_live(actor) {
                    return None;
                }
                let item = {
                    let entity = state.entity(actor)?;
                    entity.inventory.as_ref()?.get(slot)?.clone()
                };

                if let Some(crate::ConsumeEffect::Heal(amount)) = item.consumable {
                    if let Some(fighter) = state.fighter_mut(actor) {
                        fighter.heal(amount);
                    }
                }
                if item.exhaustable {
                    if let Some(entity) = state.entity_mut(actor) {
                        if let Some(inventory) = entity.inventory.as_mut() {
                            inventory.remove(slot);
                        }
                    }
                }

                let name = state.display_name(actor);
                Some(GameEvent::message(format!(
                    "{} uses the {}.",
                    name, item.name
                )))
            }
        }
    }
}

/// Builds the `AwaitInput` event for the given fighter directly; the
/// round does the same internally when its turn comes up.
pub fn request_action_choice(state: &GameState, fighter: EntityId) -> GameEvent {
    GameEvent::AwaitInput {
        fighter,
        choices: crate::available_choices(state, fighter),
    }
}
