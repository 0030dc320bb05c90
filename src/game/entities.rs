//! # Entity Model
//!
//! Entities are aggregates of optional capabilities rather than an
//! inheritance tree: a mercenary is an entity with a fighter, an inventory
//! and a locatable; a dropped potion is an entity with only an item.
//!
//! Death is observed through hook lists held as plain data. `die()` fires
//! at most once and hands the drained hooks back to the caller, which is
//! what keeps container cleanup (room occupancy, team membership) driven
//! from one place without hidden callback coupling.

use crate::{EntityId, Fighter, Inventory, Item, Position};
use serde::{Deserialize, Serialize};

/// A composed display name.
///
/// Immutable once constructed.
///
/// # Examples
///
/// ```
/// use guildhall::Name;
///
/// let name = Name::with_title("Guts", "the Unbroken");
/// assert_eq!(name.name_and_title(), "Guts the Unbroken");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Name {
    first_name: String,
    title: Option<String>,
    last_name: Option<String>,
}

impl Name {
    /// Creates a name from a first name alone.
    pub fn new(first_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            title: None,
            last_name: None,
        }
    }

    /// Creates a name with a title.
    pub fn with_title(first_name: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            title: Some(title.into()),
            last_name: None,
        }
    }

    /// Creates a fully qualified name.
    pub fn full(
        first_name: impl Into<String>,
        title: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            title: Some(title.into()),
            last_name: Some(last_name.into()),
        }
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn last_name(&self) -> Option<&str> {
        self.last_name.as_deref()
    }

    /// Composes the display form: first name, last name, then title.
    pub fn name_and_title(&self) -> String {
        let mut parts = vec![self.first_name.clone()];
        if let Some(last) = &self.last_name {
            parts.push(last.clone());
        }
        if let Some(title) = &self.title {
            parts.push(title.clone());
        }
        parts.join(" ")
    }
}

impl std::fmt::Display for Name {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name_and_title())
    }
}

/// Species tags drive texture selection upstream and stat templates during
/// generation; the simulation itself only carries them along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Species {
    Human,
    Dwarf,
    Elf,
    Orc,
    Goblin,
    Skeleton,
    Ogre,
}

impl Species {
    /// Species eligible to be hired as mercenaries.
    pub fn mercenary_species() -> &'static [Species] {
        &[Species::Human, Species::Dwarf, Species::Elf]
    }

    /// Species encountered as dungeon enemies.
    pub fn enemy_species() -> &'static [Species] {
        &[Species::Orc, Species::Goblin, Species::Skeleton]
    }
}

/// Cleanup actions executed when an entity dies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathHook {
    /// Remove the corpse from the room it occupies.
    LeaveRoom,
    /// Remove the member from its guild team.
    LeaveTeam,
}

/// Grid placement capability: a position plus movement speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locatable {
    pub position: Position,
    pub speed: u32,
}

impl Locatable {
    pub fn new(position: Position, speed: u32) -> Self {
        Self { position, speed }
    }
}

/// Which decision policy steers a non-player combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AiKind {
    /// Always ends the turn; for pacifist or stunned actors.
    NoCombat,
    /// Attacks the weakest reachable enemy, closes distance otherwise.
    BasicCombat,
}

/// A game object composed of optional capabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: Name,
    pub species: Species,
    /// Hiring cost in gp, for entities offered on the recruit pool.
    pub cost: Option<u64>,
    pub fighter: Option<Fighter>,
    pub inventory: Option<Inventory>,
    pub item: Option<Item>,
    pub ai: Option<AiKind>,
    pub locatable: Option<Locatable>,
    pub is_dead: bool,
    pub on_death: Vec<DeathHook>,
}

impl Entity {
    /// Creates a bare entity with no capabilities.
    pub fn new(name: Name, species: Species) -> Self {
        Self {
            id: crate::new_entity_id(),
            name,
            species,
            cost: None,
            fighter: None,
            inventory: None,
            item: None,
            ai: None,
            locatable: None,
            is_dead: false,
            on_death: Vec::new(),
        }
    }

    pub fn with_fighter(mut self, fighter: Fighter) -> Self {
        self.fighter = Some(fighter);
        self
    }

    pub fn with_inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_locatable(mut self, locatable: Locatable) -> Self {
        self.locatable = Some(locatable);
        self
    }

    pub fn with_ai(mut self, ai: AiKind) -> Self {
        self.ai = Some(ai);
        self
    }

    pub fn with_cost(mut self, cost: u64) -> Self {
        self.cost = Some(cost);
        self
    }

    /// Registers a death hook unless an equal one is already present.
    pub fn register_death_hook(&mut self, hook: DeathHook) {
        if !self.on_death.contains(&hook) {
            self.on_death.push(hook);
        }
    }

    /// The entity's current grid position, if placed.
    pub fn position(&self) -> Option<Position> {
        self.locatable.map(|l| l.position)
    }

    /// Whether this entity can currently fight.
    pub fn is_live_fighter(&self) -> bool {
        !self.is_dead
            && self
                .fighter
                .as_ref()
                .map(|f| !f.incapacitated())
                .unwrap_or(false)
    }

    /// Marks the entity dead and drains its death hooks.
    ///
    /// A second call is a no-op returning no hooks; removal from
    /// containers therefore happens exactly once.
    pub fn die(&mut self) -> Vec<DeathHook> {
        if self.is_dead {
            return Vec::new();
        }
        self.is_dead = true;
        std::mem::take(&mut self.on_death)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_composition() {
        let plain = Name::new("Brakas");
        assert_eq!(plain.name_and_title(), "Brakas");
        assert!(plain.title().is_none());

        let titled = Name::with_title("Guts", "the Unbroken");
        assert_eq!(titled.name_and_title(), "Guts the Unbroken");

        let full = Name::full("Osric", "the Grey", "Vane");
        assert_eq!(full.name_and_title(), "Osric Vane the Grey");
        assert_eq!(full.to_string(), "Osric Vane the Grey");
    }

    #[test]
    fn test_die_fires_once() {
        let mut entity = Entity::new(Name::new("Mort"), Species::Human);
        entity.register_death_hook(DeathHook::LeaveRoom);
        entity.register_death_hook(DeathHook::LeaveTeam);

        let hooks = entity.die();
        assert!(entity.is_dead);
        assert_eq!(hooks, vec![DeathHook::LeaveRoom, DeathHook::LeaveTeam]);

        // Second death yields nothing.
        assert!(entity.die().is_empty());
    }

    #[test]
    fn test_death_hook_registration_is_idempotent() {
        let mut entity = Entity::new(Name::new("Mort"), Species::Human);
        entity.register_death_hook(DeathHook::LeaveRoom);
        entity.register_death_hook(DeathHook::LeaveRoom);
        assert_eq!(entity.on_death.len(), 1);
    }

    #[test]
    fn test_bare_entity_is_not_a_fighter() {
        let entity = Entity::new(Name::new("Crate"), Species::Human);
        assert!(!entity.is_live_fighter());
        assert!(entity.position().is_none());
    }
}
