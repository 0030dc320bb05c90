//! # Guild & Team
//!
//! The player-managed guild: funds, experience, the roster of hired
//! mercenaries and the team composed from it for a mission. Membership is
//! tracked by entity id; the entity registry on the game state remains the
//! single owner of the entities themselves.

use crate::config::{ROSTER_SCALAR, XP_PER_LEVEL};
use crate::EntityId;
use serde::{Deserialize, Serialize};

/// The mission party drawn from the guild roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub members: Vec<EntityId>,
}

impl Team {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.members.contains(&id)
    }

    pub fn remove(&mut self, id: EntityId) -> bool {
        let before = self.members.len();
        self.members.retain(|member| *member != id);
        self.members.len() != before
    }
}

/// A mercenary guild.
///
/// # Examples
///
/// ```
/// use guildhall::Guild;
///
/// let mut guild = Guild::new("The Gilded Fang", 500);
/// guild.xp = 3000;
/// assert_eq!(guild.level(), 3);
/// assert_eq!(guild.roster_limit(), 4);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guild {
    pub name: String,
    pub funds: u64,
    pub xp: u64,
    pub roster: Vec<EntityId>,
    pub team: Team,
    pub roster_scalar: f32,
}

impl Guild {
    pub fn new(name: impl Into<String>, funds: u64) -> Self {
        let name = name.into();
        let team = Team::new(format!("{} Vanguard", name));
        Self {
            name,
            funds,
            xp: 0,
            roster: Vec::new(),
            team,
            roster_scalar: ROSTER_SCALAR,
        }
    }

    /// Guild level, one per thousand xp.
    pub fn level(&self) -> u32 {
        (self.xp / XP_PER_LEVEL) as u32
    }

    /// Hired mercenaries the guild can hold, team members included.
    pub fn roster_limit(&self) -> usize {
        (self.level() as f32 * self.roster_scalar).floor() as usize
    }

    /// Roster plus fielded team members.
    pub fn member_count(&self) -> usize {
        self.roster.len() + self.team.members.len()
    }

    pub fn roster_full(&self) -> bool {
        self.member_count() >= self.roster_limit()
    }

    /// Moves a roster member onto the team.
    ///
    /// Returns false when the id is not on the roster.
    pub fn assign_to_team(&mut self, id: EntityId) -> bool {
        let before = self.roster.len();
        self.roster.retain(|member| *member != id);
        if self.roster.len() == before {
            return false;
        }
        self.team.members.push(id);
        true
    }

    /// Returns a team member to the roster (a retreat).
    pub fn return_to_roster(&mut self, id: EntityId) -> bool {
        if !self.team.remove(id) {
            return false;
        }
        self.roster.push(id);
        true
    }

    /// Strikes a member from the guild entirely (a death).
    pub fn remove_member(&mut self, id: EntityId) {
        self.team.remove(id);
        self.roster.retain(|member| *member != id);
    }
}
