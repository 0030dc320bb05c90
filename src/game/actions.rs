//! # Action System
//!
//! Command pattern for everything a fighter can do on its turn. Each
//! action kind knows its cost, can enumerate every concrete instance
//! available to an actor, and executes into a list of combat steps the
//! round then applies one at a time.
//!
//! Actions are plain serializable data; confirming a choice readies the
//! action on its actor, and the combat round picks it up from there.

use crate::{
    EntityId, GameState, GuildhallError, GuildhallResult, Position,
};
use pathfinding::prelude::bfs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The choices offered to a fighter awaiting input: action name to the
/// concrete instances of that action currently available.
pub type ActionChoices = BTreeMap<String, Vec<ActionDetails>>;

/// One selectable instance of an action, with its cost precomputed for
/// display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDetails {
    pub name: String,
    pub cost: u32,
    pub action: ConcreteAction,
}

impl ActionDetails {
    /// Readies the action on its actor. The combat round executes it on
    /// the next pull.
    pub fn confirm(&self, state: &mut GameState) {
        state.ready_action(self.action.actor(), self.action.clone());
    }
}

/// A deferred micro-effect produced by executing an action.
///
/// The round applies each step when it is popped, which is what keeps
/// effect timing tied to event production rather than event consumption.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombatStep {
    /// One attack against one target.
    Strike { attacker: EntityId, target: EntityId },
    /// One node of a movement path traversed.
    Walk { actor: EntityId, to: Position },
    /// Consume the item in the given inventory slot.
    UseItem { actor: EntityId, slot: usize },
}

/// Common interface over the concrete action kinds.
pub trait Action {
    /// Display name, also the key grouping choices for input requests.
    fn name(&self) -> &'static str;

    /// The fighter performing the action.
    fn actor(&self) -> EntityId;

    /// Action-point cost against the actor's current budget.
    fn cost(&self, state: &GameState) -> u32;

    /// Deducts the cost and produces the steps realising the action.
    fn execute(&self, state: &mut GameState) -> GuildhallResult<Vec<CombatStep>>;
}

/// Spends the remainder of the actor's budget; the turn ends when no
/// steps remain and no points are left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndTurnAction {
    pub actor: EntityId,
}

impl EndTurnAction {
    pub fn all_available_to(state: &GameState, actor: EntityId) -> Vec<ActionDetails> {
        let action = EndTurnAction { actor };
        vec![ActionDetails {
            name: action.name().to_string(),
            cost: action.cost(state),
            action: ConcreteAction::EndTurn(action),
        }]
    }
}

impl Action for EndTurnAction {
    fn name(&self) -> &'static str {
        "end turn"
    }

    fn actor(&self) -> EntityId {
        self.actor
    }

    fn cost(&self, state: &GameState) -> u32 {
        state
            .fighter(self.actor)
            .map(|f| f.action_points.current)
            .unwrap_or(0)
    }

    fn execute(&self, state: &mut GameState) -> GuildhallResult<Vec<CombatStep>> {
        let cost = self.cost(state);
        state.spend_ap(self.actor, cost);
        Ok(Vec::new())
    }
}

/// An attack on one hostile occupant of the current room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttackAction {
    pub actor: EntityId,
    pub target: EntityId,
}

impl AttackAction {
    /// One attack per live hostile occupant, in room insertion order.
    pub fn all_available_to(state: &GameState, actor: EntityId) -> Vec<ActionDetails> {
        let budget = state
            .fighter(actor)
            .map(|f| f.action_points.current)
            .unwrap_or(0);
        if budget == 0 {
            return Vec::new();
        }
        state
            .hostiles_to(actor)
            .into_iter()
            .map(|target| {
                let action = AttackAction { actor, target };
                ActionDetails {
                    name: action.name().to_string(),
                    cost: action.cost(state),
                    action: ConcreteAction::Attack(action),
                }
            })
            .collect()
    }
}

impl Action for AttackAction {
    fn name(&self) -> &'static str {
        "attack"
    }

    fn actor(&self) -> EntityId {
        self.actor
    }

    fn cost(&self, state: &GameState) -> u32 {
        state
            .fighter(self.actor)
            .map(|f| f.action_points.current)
            .unwrap_or(0)
    }

    fn execute(&self, state: &mut GameState) -> GuildhallResult<Vec<CombatStep>> {
        let cost = self.cost(state);
        state.spend_ap(self.actor, cost);
        Ok(vec![CombatStep::Strike {
            attacker: self.actor,
            target: self.target,
        }])
    }
}

/// Consuming one item from the actor's own inventory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsumeAction {
    pub actor: EntityId,
    pub slot: usize,
}

impl ConsumeAction {
    /// One instance per consumable item currently held.
    pub fn all_available_to(state: &GameState, actor: EntityId) -> Vec<ActionDetails> {
        let budget = state
            .fighter(actor)
            .map(|f| f.action_points.current)
            .unwrap_or(0);
        if budget == 0 {
            return Vec::new();
        }
        let Some(entity) = state.entity(actor) else {
            return Vec::new();
        };
        let Some(inventory) = entity.inventory.as_ref() else {
            return Vec::new();
        };
        inventory
            .consumables()
            .into_iter()
            .map(|(slot, _)| {
                let action = ConsumeAction { actor, slot };
                ActionDetails {
                    name: action.name().to_string(),
                    cost: action.cost(state),
                    action: ConcreteAction::Consume(action),
                }
            })
            .collect()
    }
}

impl Action for ConsumeAction {
    fn name(&self) -> &'static str {
        "consume item"
    }

    fn actor(&self) -> EntityId {
        self.actor
    }

    fn cost(&self, state: &GameState) -> u32 {
        state
            .fighter(self.actor)
            .map(|f| f.action_points.current)
            .unwrap_or(0)
    }

    fn execute(&self, state: &mut GameState) -> GuildhallResult<Vec<CombatStep>> {
        let cost = self.cost(state);
        state.spend_ap(self.actor, cost);
        Ok(vec![CombatStep::UseItem {
            actor: self.actor,
            slot: self.slot,
        }])
    }
}

/// Movement along a concrete path of adjacent walkable nodes.
///
/// The stored path excludes the starting node; an empty path is a move
/// to the current location and costs nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoveAction {
    pub actor: EntityId,
    pub path: Vec<Position>,
}

impl MoveAction {
    /// One instance per node reachable within the actor's remaining
    /// budget, each carrying a shortest path found over the current
    /// room's walkable grid.
    pub fn all_available_to(state: &GameState, actor: EntityId) -> Vec<ActionDetails> {
        let Some(fighter) = state.fighter(actor) else {
            return Vec::new();
        };
        let budget = fighter.action_points.current;
        let speed = fighter.speed.max(1);
        if budget == 0 {
            return Vec::new();
        }
        let Some(start) = state.position_of(actor) else {
            return Vec::new();
        };
        let Some(room) = state.current_room() else {
            return Vec::new();
        };

        // cost(d) = 1 + d / speed, so the budget admits paths of at most
        // budget * speed - 1 steps.
        let max_steps = (budget * speed - 1) as usize;

        let mut details = Vec::new();
        for destination in reachable_nodes(room, start, max_steps) {
            let Some(path) = bfs(
                &start,
                |pos| walkable_neighbours(room, *pos),
                |pos| *pos == destination,
            ) else {
                continue;
            };
            // bfs returns the start node too.
            let steps: Vec<Position> = path.into_iter().skip(1).collect();
            if steps.is_empty() || steps.len() > max_steps {
                continue;
            }
            let action = MoveAction {
                actor,
                path: steps,
            };
            let cost = action.cost(state);
            details.push(ActionDetails {
                name: action.name().to_string(),
                cost,
                action: ConcreteAction::Move(action),
            });
        }
        details
    }

    /// Number of nodes this move traverses.
    pub fn distance(&self) -> u32 {
        self.path.len() as u32
    }

    /// The node the move ends on, when it goes anywhere at all.
    pub fn destination(&self) -> Option<Position> {
        self.path.last().copied()
    }
}

impl Action for MoveAction {
    fn name(&self) -> &'static str {
        "move"
    }

    fn actor(&self) -> EntityId {
        self.actor
    }

    fn cost(&self, state: &GameState) -> u32 {
        let distance = self.distance();
        if distance == 0 {
            return 0;
        }
        let speed = state
            .fighter(self.actor)
            .map(|f| f.speed.max(1))
            .unwrap_or(1);
        1 + distance / speed
    }

    fn execute(&self, state: &mut GameState) -> GuildhallResult<Vec<CombatStep>> {
        let cost = self.cost(state);
        let budget = state
            .fighter(self.actor)
            .map(|f| f.action_points.current)
            .unwrap_or(0);
        if cost > budget {
            return Err(GuildhallError::InvalidAction(format!(
                "Move costs {} but only {} action points remain",
                cost, budget
            )));
        }
        state.spend_ap(self.actor, cost);
        Ok(self
            .path
            .iter()
            .map(|node| CombatStep::Walk {
                actor: self.actor,
                to: *node,
            })
            .collect())
    }
}

/// The closed set of action kinds, dispatching [`Action`] by delegation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConcreteAction {
    EndTurn(EndTurnAction),
    Attack(AttackAction),
    Consume(ConsumeAction),
    Move(MoveAction),
}

impl Action for ConcreteAction {
    fn name(&self) -> &'static str {
        match self {
            ConcreteAction::EndTurn(action) => action.name(),
            ConcreteAction::Attack(action) => action.name(),
            ConcreteAction::Consume(action) => action.name(),
            ConcreteAction::Move(action) => action.name(),
        }
    }

    fn actor(&self) -> EntityId {
        match self {
            ConcreteAction::EndTurn(action) => action.actor(),
            ConcreteAction::Attack(action) => action.actor(),
            ConcreteAction::Consume(action) => action.actor(),
            ConcreteAction::Move(action) => action.actor(),
        }
    }

    fn cost(&self, state: &GameState) -> u32 {
        match self {
            ConcreteAction::EndTurn(action) => action.cost(state),
            ConcreteAction::Attack(action) => action.cost(state),
            ConcreteAction::Consume(action) => action.cost(state),
            ConcreteAction::Move(action) => action.cost(state),
        }
    }

    fn execute(&self, state: &mut GameState) -> GuildhallResult<Vec<CombatStep>> {
        match self {
            ConcreteAction::EndTurn(action) => action.execute(state),
            ConcreteAction::Attack(action) => action.execute(state),
            ConcreteAction::Consume(action) => action.execute(state),
            ConcreteAction::Move(action) => action.execute(state),
        }
    }
}

/// Everything the given fighter could do right now, grouped by action
/// name. End turn is always present; the rest depend on budget, room
/// and inventory.
pub fn available_choices(state: &GameState, actor: EntityId) -> ActionChoices {
    let mut choices = ActionChoices::new();
    for details in [
        EndTurnAction::all_available_to(state, actor),
        AttackAction::all_available_to(state, actor),
        ConsumeAction::all_available_to(state, actor),
        MoveAction::all_available_to(state, actor),
    ]
    .into_iter()
    .flatten()
    {
        choices
            .entry(details.name.clone())
            .or_insert_with(Vec::new)
            .push(details);
    }
    choices
}

fn walkable_neighbours(room: &crate::Room, pos: Position) -> Vec<Position> {
    pos.cardinal_adjacent_positions()
        .into_iter()
        .filter(|neighbour| room.is_walkable(*neighbour))
        .collect()
}

/// Nodes reachable from `start` in at most `max_steps` walkable steps,
/// excluding `start` itself. Each node appears once, nearest first.
fn reachable_nodes(
    room: &crate::Room,
    start: Position,
    max_steps: usize,
) -> Vec<Position> {
    use pathfinding::prelude::bfs_reach;
    use std::collections::HashSet;

    // The search state carries its depth, so the same node can be
    // revisited deeper; dedup keeps only the first (shortest) visit.
    let mut seen = HashSet::new();
    bfs_reach((start, 0usize), |(pos, depth)| {
        let depth = *depth;
        if depth >= max_steps {
            return Vec::new();
        }
        walkable_neighbours(room, *pos)
            .into_iter()
            .map(move |neighbour| (neighbour, depth + 1))
            .collect::<Vec<_>>()
    })
    .map(|(pos, _)| pos)
    .filter(|pos| *pos != start && seen.insert(*pos))
    .collect()
}
