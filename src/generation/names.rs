//! # Name Pools & Forging
//!
//! The static name material the generators draw from, and the
//! [`NameForge`] that turns it into filtered, unique names. The forge
//! consults the banned-name filter for every candidate and never hands
//! out the same mercenary or guild name twice in one campaign.

use crate::generation::NameFilter;
use crate::{GuildhallError, GuildhallResult, Name, Species};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

/// First names offered to generated mercenaries.
pub const MERCENARY_FIRST_NAMES: &[&str] = &[
    "Aldric", "Brakas", "Cedany", "Dorn", "Eilif", "Freya", "Guts", "Hilda", "Isolde", "Jorund",
    "Kaelis", "Lunet", "Maren", "Njall", "Osric", "Petra", "Quill", "Ragna", "Sorcha", "Torvald",
    "Una", "Varek", "Wynne", "Yrsa",
];

/// Titles a seasoned mercenary may carry.
pub const MERCENARY_TITLES: &[&str] = &[
    "the Unbroken",
    "the Grey",
    "the Lucky",
    "of the Marsh",
    "Ironhand",
    "the Quiet",
    "Two-Blades",
    "the Stray",
];

/// Names reserved for dungeon bosses.
pub const BOSS_NAMES: &[&str] = &[
    "Morgrath", "Vexia", "Skarn", "Ulgoth", "Zhara", "Krellmaw", "Ossuar", "Belgrim",
];

/// Titles reserved for dungeon bosses.
pub const BOSS_TITLES: &[&str] = &[
    "the Devourer",
    "of the Deep",
    "the Hollow King",
    "Worldrender",
    "the Pale",
    "Bonewarden",
];

/// Guild names the campaign may be founded under.
pub const GUILD_NAMES: &[&str] = &[
    "The Gilded Fang",
    "The Ashen Compact",
    "The Wayward Banner",
    "The Ember Court",
    "The Hollow Shield",
    "The Last Lantern",
];

/// First descriptor list for dungeon descriptions.
pub const DESCRIPTORS_A: &[&str] = &[
    "Mouldering", "Sunken", "Howling", "Gilded", "Forsaken", "Creeping", "Silent", "Blighted",
];

/// Second descriptor list for dungeon descriptions.
pub const DESCRIPTORS_B: &[&str] = &[
    "Dark", "Depths", "Warrens", "Vaults", "Barrow", "Reaches", "Maw", "Catacombs",
];

/// Epithets composing common enemy names per species.
const ENEMY_EPITHETS: &[&str] = &[
    "Raider", "Skulker", "Bruiser", "Stalker", "Howler", "Gnawer",
];

/// Team names are themed to the guild that fields them.
pub fn team_name_pool(guild_name: &str) -> &'static [&'static str] {
    match guild_name {
        "The Gilded Fang" => &["Fang Vanguard", "The Gilt Edge", "First Bite"],
        "The Ashen Compact" => &["Cinder Watch", "The Grey March", "Ashwalkers"],
        "The Wayward Banner" => &["Banner Guard", "The Lost Column", "Wayfarers"],
        "The Ember Court" => &["Ember Blades", "The Warm Guard", "Coalhearts"],
        "The Hollow Shield" => &["Shieldbearers", "The Hollow Wall", "Bulwark"],
        "The Last Lantern" => &["Lantern Bearers", "The Late Watch", "Wickguard"],
        _ => &["The Vanguard", "First Company", "The Forlorn Hope"],
    }
}

/// Display form of a species, for enemy names.
pub fn species_label(species: Species) -> &'static str {
    match species {
        Species::Human => "Human",
        Species::Dwarf => "Dwarf",
        Species::Elf => "Elf",
        Species::Orc => "Orc",
        Species::Goblin => "Goblin",
        Species::Skeleton => "Skeleton",
        Species::Ogre => "Ogre",
    }
}

/// Produces filtered, campaign-unique names from the static pools.
#[derive(Debug, Clone)]
pub struct NameForge {
    filter: NameFilter,
    used: HashSet<String>,
}

impl NameForge {
    pub fn new(filter: NameFilter) -> Self {
        Self {
            filter,
            used: HashSet::new(),
        }
    }

    /// Draws an unused, unbanned entry from a pool.
    ///
    /// Fails fast when the pool runs dry, which is a configuration
    /// error: the caller asked for more names than the pool holds.
    fn draw(&mut self, pool: &[&str], what: &str, rng: &mut StdRng) -> GuildhallResult<String> {
        let mut candidates: Vec<&str> = pool.to_vec();
        candidates.shuffle(rng);
        for candidate in candidates {
            if self.used.contains(candidate) || !self.filter.check(candidate) {
                continue;
            }
            self.used.insert(candidate.to_string());
            return Ok(candidate.to_string());
        }
        Err(GuildhallError::GenerationFailed(format!(
            "The {} pool is exhausted ({} entries, {} used)",
            what,
            pool.len(),
            self.used.len()
        )))
    }

    /// A mercenary name, titled about half the time.
    pub fn mercenary_name(&mut self, rng: &mut StdRng) -> GuildhallResult<Name> {
        let first = self.draw(MERCENARY_FIRST_NAMES, "mercenary name", rng)?;
        if rng.gen_bool(0.5) {
            let title = MERCENARY_TITLES
                .choose(rng)
                .copied()
                .unwrap_or("the Nameless");
            Ok(Name::with_title(first, title))
        } else {
            Ok(Name::new(first))
        }
    }

    /// A guild name.
    pub fn guild_name(&mut self, rng: &mut StdRng) -> GuildhallResult<String> {
        self.draw(GUILD_NAMES, "guild name", rng)
    }

    /// A boss name, always titled.
    pub fn boss_name(&mut self, rng: &mut StdRng) -> GuildhallResult<Name> {
        let first = self.draw(BOSS_NAMES, "boss name", rng)?;
        let title = BOSS_TITLES.choose(rng).copied().unwrap_or("the Unnamed");
        Ok(Name::with_title(first, title))
    }

    /// A team name themed to the guild.
    pub fn team_name(&self, guild_name: &str, rng: &mut StdRng) -> String {
        team_name_pool(guild_name)
            .choose(rng)
            .copied()
            .unwrap_or("The Vanguard")
            .to_string()
    }

    /// A common enemy name, composed from species and epithet.
    pub fn enemy_name(&self, species: Species, rng: &mut StdRng) -> Name {
        let epithet = ENEMY_EPITHETS.choose(rng).copied().unwrap_or("Raider");
        Name::new(format!("{} {}", species_label(species), epithet))
    }
}

/// A dungeon description of the form `"The {a} {b}"`.
pub fn dungeon_description(rng: &mut StdRng) -> String {
    let a = DESCRIPTORS_A.choose(rng).copied().unwrap_or("Forsaken");
    let b = DESCRIPTORS_B.choose(rng).copied().unwrap_or("Depths");
    format!("The {} {}", a, b)
}
