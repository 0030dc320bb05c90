//! # Loot & Levelling
//!
//! XP and GP accumulated by a mission, the transfer-and-zero claim
//! operations the guild consumes, and the per-fighter levelling rule.

use crate::config::XP_PER_LEVEL;
use crate::{GameEvent, GameState, GuildhallError, GuildhallResult, Item, Subscriber};
use serde::{Deserialize, Serialize};

/// Team xp contributed by a felled enemy, per enemy level.
const ENEMY_TEAM_XP_PER_LEVEL: u64 = 40;
/// Gold dropped by a felled enemy, per enemy level.
const ENEMY_GP_PER_LEVEL: u64 = 10;
/// Guild xp earned per felled enemy, per enemy level.
const ENEMY_GUILD_XP_PER_LEVEL: u64 = 20;
/// Bosses are worth this multiple of a common enemy.
const BOSS_REWARD_MULTIPLIER: u64 = 4;

/// Stat increments granted on each level-up.
///
/// The increments are configuration, not rule: tuning lives with the
/// caller that constructs the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUpTable {
    pub hp: u32,
    pub power: u32,
    pub defence: u32,
}

impl Default for LevelUpTable {
    fn default() -> Self {
        Self {
            hp: 2,
            power: 1,
            defence: 1,
        }
    }
}

/// Tracks one fighter's experience and level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leveller {
    pub level: u32,
    pub xp: u64,
    pub xp_to_level_up: u64,
}

impl Leveller {
    pub fn new() -> Self {
        Self {
            level: 1,
            xp: 0,
            xp_to_level_up: XP_PER_LEVEL,
        }
    }

    pub fn gain(&mut self, xp: u64) {
        self.xp += xp;
    }

    /// Consumes accumulated xp into a level when the threshold is met.
    ///
    /// Returns true when a level was gained.
    pub fn level_up(&mut self) -> bool {
        if self.xp >= self.xp_to_level_up {
            self.xp = 0;
            self.level += 1;
            true
        } else {
            false
        }
    }
}

impl Default for Leveller {
    fn default() -> Self {
        Self::new()
    }
}

/// The reward capability the guild consumes after a mission.
pub trait Rewarder {
    /// Transfers the gold out, zeroing the stash.
    fn claim_gp(&mut self) -> u64;

    /// Transfers the guild experience out, zeroing it.
    fn claim_guild_xp(&mut self) -> u64;
}

/// Rewards accumulated by a dungeon, claimed on victory.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Loot {
    pub guild_xp: u64,
    pub gp: u64,
    /// XP contributions queued per defeated enemy, split across the team.
    pub team_xp_queue: Vec<u64>,
    pub item_drops: Vec<Item>,
    /// Last per-member award, kept for display.
    pub awarded_xp_per_member: u64,
}

impl Loot {
    pub fn new(guild_xp: u64, gp: u64) -> Self {
        Self {
            guild_xp,
            gp,
            ..Default::default()
        }
    }

    /// Queues an xp contribution for later team distribution.
    pub fn queue_team_xp(&mut self, xp: u64) {
        self.team_xp_queue.push(xp);
    }

    /// Drains the team xp queue into an even per-member share.
    ///
    /// The share is `floor(sum / team_size)`; the queue is cleared and the
    /// award recorded. Distributing to an empty team is rejected.
    pub fn take_team_xp(&mut self, team_size: usize) -> GuildhallResult<u64> {
        if team_size == 0 {
            return Err(GuildhallError::InvalidAction(
                "Cannot distribute team xp to an empty team".to_string(),
            ));
        }
        let total: u64 = self.team_xp_queue.iter().sum();
        let per_member = total / team_size as u64;
        self.team_xp_queue.clear();
        self.awarded_xp_per_member = per_member;
        Ok(per_member)
    }
}

impl Rewarder for Loot {
    fn claim_gp(&mut self) -> u64 {
        std::mem::take(&mut self.gp)
    }

    fn claim_guild_xp(&mut self) -> u64 {
        std::mem::take(&mut self.guild_xp)
    }
}

/// Static-bus subscriber crediting the mission's loot for every enemy
/// felled during its encounters.
pub struct RewardsHandler;

impl RewardsHandler {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RewardsHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriber for RewardsHandler {
    fn handle_event(&mut self, event: &GameEvent, state: &mut GameState) -> Vec<GameEvent> {
        let GameEvent::Dying { entity, .. } = event else {
            return Vec::new();
        };
        let Some(fighter) = state.entity(*entity).and_then(|e| e.fighter.as_ref()) else {
            return Vec::new();
        };
        if !fighter.is_enemy {
            return Vec::new();
        }

        let level = u64::from(fighter.leveller.level);
        let multiplier = if fighter.is_boss {
            BOSS_REWARD_MULTIPLIER
        } else {
            1
        };
        let Some(loot) = state.dungeon.as_mut().map(|dungeon| &mut dungeon.loot) else {
            return Vec::new();
        };
        loot.queue_team_xp(level * ENEMY_TEAM_XP_PER_LEVEL * multiplier);
        loot.gp += level * ENEMY_GP_PER_LEVEL * multiplier;
        loot.guild_xp += level * ENEMY_GUILD_XP_PER_LEVEL * multiplier;
        Vec::new()
    }
}
