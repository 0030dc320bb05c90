//! # Fighter
//!
//! The combat capability attached to an entity: hit points, attack and
//! defence statistics, the per-turn action-point budget, and the retreat
//! and levelling bookkeeping that rides along with them.

use crate::config::{DEFAULT_AP_PER_TURN, RETREAT_THRESHOLD};
use crate::rewards::Leveller;
use crate::ConcreteAction;
use serde::{Deserialize, Serialize};

/// Per-turn action budget.
///
/// `current` is refreshed to `per_turn` when a fighter's turn begins and
/// deducted by each executed action. Once it reaches zero only "end turn"
/// remains available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionPoints {
    pub per_turn: u32,
    pub current: u32,
}

impl ActionPoints {
    pub fn new(per_turn: u32) -> Self {
        Self {
            per_turn,
            current: per_turn,
        }
    }

    /// Resets the budget at turn start.
    pub fn refresh(&mut self) {
        self.current = self.per_turn;
    }

    /// Deducts an action's cost, flooring at zero.
    pub fn spend(&mut self, cost: u32) {
        self.current = self.current.saturating_sub(cost);
    }

    pub fn exhausted(&self) -> bool {
        self.current == 0
    }
}

impl Default for ActionPoints {
    fn default() -> Self {
        Self::new(DEFAULT_AP_PER_TURN)
    }
}

/// Actions executed when a fighter breaks off from combat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RetreatHook {
    /// The member leaves the team and rejoins the guild roster.
    ReturnToRoster,
}

/// Combat statistics and flags for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fighter {
    pub max_hp: u32,
    pub hp: u32,
    pub defence: u32,
    pub power: u32,
    pub speed: u32,
    pub is_enemy: bool,
    pub is_boss: bool,
    pub retreating: bool,
    pub action_points: ActionPoints,
    pub leveller: Leveller,
    pub on_retreat: Vec<RetreatHook>,
    /// The action a confirm has readied for this fighter's turn; the
    /// combat round takes and executes it.
    pub readied_action: Option<ConcreteAction>,
}

impl Fighter {
    /// Creates a fighter at full health with the default AP budget.
    pub fn new(max_hp: u32, power: u32, defence: u32, speed: u32) -> Self {
        Self {
            max_hp,
            hp: max_hp,
            defence,
            power,
            speed,
            is_enemy: false,
            is_boss: false,
            retreating: false,
            action_points: ActionPoints::default(),
            leveller: Leveller::new(),
            on_retreat: Vec::new(),
            readied_action: None,
        }
    }

    pub fn enemy(mut self) -> Self {
        self.is_enemy = true;
        self
    }

    pub fn boss(mut self) -> Self {
        self.is_enemy = true;
        self.is_boss = true;
        self
    }

    /// Dead or retreating fighters are incapacitated: excluded from
    /// initiative and never given a turn.
    pub fn incapacitated(&self) -> bool {
        self.hp == 0 || self.retreating
    }

    /// Damage this fighter deals to the given defender.
    ///
    /// Fail-soft floor: attacking into superior defence lands for zero
    /// rather than healing the target.
    pub fn damage_against(&self, defender: &Fighter) -> u32 {
        self.power.saturating_sub(defender.defence)
    }

    /// Applies damage, clamping hp at zero. Returns the hp actually lost.
    pub fn take_damage(&mut self, damage: u32) -> u32 {
        let lost = damage.min(self.hp);
        self.hp -= lost;
        lost
    }

    /// Restores hp, clamping at `max_hp`. Returns the hp actually gained.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let gained = amount.min(self.max_hp - self.hp);
        self.hp += gained;
        gained
    }

    /// Fraction of maximum hp remaining.
    pub fn hp_ratio(&self) -> f64 {
        if self.max_hp == 0 {
            return 0.0;
        }
        f64::from(self.hp) / f64::from(self.max_hp)
    }

    /// Whether a hit that moved hp from `hp_before` to the current value
    /// drove this fighter below the retreat threshold.
    ///
    /// Retreat triggers on the crossing, not on being low: a fighter that
    /// entered the encounter already battered keeps fighting until a fresh
    /// wound pushes them under.
    pub fn crossed_retreat_threshold(&self, hp_before: u32) -> bool {
        if self.hp == 0 || self.retreating || self.max_hp == 0 {
            return false;
        }
        let before = f64::from(hp_before) / f64::from(self.max_hp);
        before >= RETREAT_THRESHOLD && self.hp_ratio() < RETREAT_THRESHOLD
    }

    /// Marks the fighter as retreating and drains its retreat hooks.
    pub fn retreat(&mut self) -> Vec<RetreatHook> {
        if self.retreating {
            return Vec::new();
        }
        self.retreating = true;
        std::mem::take(&mut self.on_retreat)
    }

    /// Registers a retreat hook unless an equal one is already present.
    pub fn register_retreat_hook(&mut self, hook: RetreatHook) {
        if !self.on_retreat.contains(&hook) {
            self.on_retreat.push(hook);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_action_points_budget() {
        let mut ap = ActionPoints::new(5);
        ap.spend(3);
        assert_eq!(ap.current, 2);
        ap.spend(10);
        assert_eq!(ap.current, 0);
        assert!(ap.exhausted());
        ap.refresh();
        assert_eq!(ap.current, 5);
    }

    #[test]
    fn test_damage_floor_against_superior_defence() {
        let weak = Fighter::new(10, 2, 0, 3);
        let armoured = Fighter::new(10, 5, 6, 3);
        assert_eq!(weak.damage_against(&armoured), 0);
        assert_eq!(armoured.damage_against(&weak), 5);
    }

    #[test]
    fn test_incapacitated_states() {
        let mut fighter = Fighter::new(10, 3, 1, 3);
        assert!(!fighter.incapacitated());

        fighter.take_damage(10);
        assert!(fighter.incapacitated());

        let mut runner = Fighter::new(10, 3, 1, 3);
        runner.retreating = true;
        assert!(runner.incapacitated());
    }

    #[test]
    fn test_retreat_triggers_on_crossing_only() {
        let mut fighter = Fighter::new(20, 3, 0, 3);

        // 20 -> 3 crosses 20% from above.
        let before = fighter.hp;
        fighter.take_damage(17);
        assert!(fighter.crossed_retreat_threshold(before));

        // Already below threshold: a further wound is not a crossing.
        let mut battered = Fighter::new(20, 5, 0, 3);
        battered.hp = 2;
        let before = battered.hp;
        battered.take_damage(1);
        assert!(!battered.crossed_retreat_threshold(before));

        // Dropping to exactly zero is death, not retreat.
        let mut doomed = Fighter::new(20, 5, 0, 3);
        let before = doomed.hp;
        doomed.take_damage(20);
        assert!(!doomed.crossed_retreat_threshold(before));
    }

    #[test]
    fn test_retreat_fires_hooks_once() {
        let mut fighter = Fighter::new(10, 3, 1, 3);
        fighter.register_retreat_hook(RetreatHook::ReturnToRoster);

        assert_eq!(fighter.retreat(), vec![RetreatHook::ReturnToRoster]);
        assert!(fighter.retreating);
        assert!(fighter.retreat().is_empty());
    }

    #[test]
    fn test_heal_clamps_at_max() {
        let mut fighter = Fighter::new(25, 3, 1, 3);
        fighter.take_damage(15);
        assert_eq!(fighter.heal(5), 5);
        assert_eq!(fighter.hp, 15);
        assert_eq!(fighter.heal(100), 10);
        assert_eq!(fighter.hp, 25);
    }

    proptest! {
        /// Damage is never negative and never exceeds attacker power.
        #[test]
        fn prop_damage_floor(power in 0u32..100, defence in 0u32..100) {
            let attacker = Fighter::new(10, power, 0, 3);
            let defender = Fighter::new(10, 0, defence, 3);
            let damage = attacker.damage_against(&defender);
            prop_assert!(damage <= power);
            if power <= defence {
                prop_assert_eq!(damage, 0);
            }
        }

        /// Any sequence of attacks and heals keeps hp within [0, max_hp].
        #[test]
        fn prop_hp_bounds(max_hp in 1u32..200, hits in proptest::collection::vec(0u32..80, 0..20)) {
            let mut fighter = Fighter::new(max_hp, 0, 0, 3);
            for (i, amount) in hits.iter().enumerate() {
                if i % 3 == 2 {
                    fighter.heal(*amount);
                } else {
                    fighter.take_damage(*amount);
                }
                prop_assert!(fighter.hp <= fighter.max_hp);
            }
        }
    }
}
