//! # Generation Module
//!
//! Procedural content for the campaign: missions (dungeons of rooms
//! stocked with enemies and a boss), the recruit pool, and the names
//! for all of it. Everything is driven by a seeded RNG through a
//! shared [`GenerationConfig`], so a campaign is reproducible from its
//! seed alone.

pub mod banlist;
pub mod names;

pub use banlist::*;
pub use names::*;

use crate::config::RECRUIT_POOL_SIZE;
use crate::{
    AiKind, Biome, Dungeon, Entity, Fighter, GuildhallError, GuildhallResult, Inventory, Item,
    Locatable, Position, Room, RoomLayout, Species,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Configuration for procedural generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Random seed for reproducible generation
    pub seed: u64,
    /// Minimum rooms per dungeon, boss room included
    pub min_rooms: u32,
    /// Maximum rooms per dungeon
    pub max_rooms: u32,
    /// Room grid width in nodes
    pub room_width: u32,
    /// Room grid height in nodes
    pub room_height: u32,
    /// Minimum enemies per ordinary room
    pub min_enemies_per_room: u32,
    /// Maximum enemies per ordinary room
    pub max_enemies_per_room: u32,
    /// Probability an ordinary room gets pillar terrain
    pub pillar_chance: f64,
    /// Recruits generated for the hiring pool
    pub recruit_pool_size: usize,
    /// Starting guild treasury
    pub initial_guild_funds: u64,
    /// Starting guild experience
    pub initial_guild_xp: u64,
    /// Healing granted by a starter potion
    pub potion_heal: u32,
}

impl GenerationConfig {
    /// Creates the default campaign configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use guildhall::GenerationConfig;
    ///
    /// let config = GenerationConfig::new(42);
    /// assert!(config.max_rooms >= config.min_rooms);
    /// assert!(config.max_enemies_per_room >= config.min_enemies_per_room);
    /// ```
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            min_rooms: 2,
            max_rooms: 4,
            room_width: 7,
            room_height: 5,
            min_enemies_per_room: 1,
            max_enemies_per_room: 3,
            pillar_chance: 0.3,
            recruit_pool_size: RECRUIT_POOL_SIZE,
            initial_guild_funds: 500,
            initial_guild_xp: 3000,
            potion_heal: 5,
        }
    }

    /// A configuration for testing: small dungeons, no terrain noise.
    pub fn for_testing(seed: u64) -> Self {
        Self {
            seed,
            min_rooms: 2,
            max_rooms: 2,
            room_width: 5,
            room_height: 4,
            min_enemies_per_room: 1,
            max_enemies_per_room: 1,
            pillar_chance: 0.0,
            recruit_pool_size: 3,
            initial_guild_funds: 500,
            initial_guild_xp: 3000,
            potion_heal: 5,
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self::new(42)
    }
}

/// Common interface for content generators.
pub trait Generator<T> {
    /// Generates content using the provided configuration and random
    /// number generator.
    fn generate(&self, config: &GenerationConfig, rng: &mut StdRng) -> GuildhallResult<T>;

    /// Validates that the generated content meets requirements.
    fn validate(&self, content: &T, config: &GenerationConfig) -> GuildhallResult<()>;

    /// Gets the generator type name for logging and debugging.
    fn generator_type(&self) -> &'static str;
}

/// A generated mission together with the entities it spawned; the
/// caller registers them and keeps the dungeon.
#[derive(Debug, Clone)]
pub struct DungeonBundle {
    pub dungeon: Dungeon,
    pub spawned: Vec<Entity>,
}

/// Builds missions: ordered rooms stocked with levelled enemies, a
/// boss in the last room, and the loot at stake.
pub struct DungeonGenerator {
    filter: NameFilter,
}

impl DungeonGenerator {
    pub fn new(filter: NameFilter) -> Self {
        Self { filter }
    }

    /// Base statistics for an enemy species at level 1.
    fn base_fighter(species: Species) -> Fighter {
        match species {
            Species::Goblin => Fighter::new(6, 3, 0, 3),
            Species::Orc => Fighter::new(12, 4, 1, 2),
            Species::Skeleton => Fighter::new(8, 3, 2, 2),
            Species::Ogre => Fighter::new(30, 6, 2, 1),
            // Mercenary species never spawn as enemies; keep them
            // unremarkable if they somehow do.
            _ => Fighter::new(10, 3, 1, 2),
        }
    }

    /// Scales a level-1 fighter up to the given level.
    fn levelled(mut fighter: Fighter, level: u32) -> Fighter {
        let steps = level.saturating_sub(1);
        fighter.max_hp += 2 * steps;
        fighter.hp = fighter.max_hp;
        fighter.power += steps;
        fighter.defence += steps;
        fighter.leveller.level = level;
        fighter
    }

    /// Spawns one common enemy into the room.
    fn spawn_enemy(
        &self,
        forge: &NameForge,
        room: &mut Room,
        rng: &mut StdRng,
    ) -> Option<Entity> {
        let species = *Species::enemy_species().choose(rng)?;
        let level = rng.gen_range(1..=2);
        let fighter = Self::levelled(Self::base_fighter(species), level).enemy();
        let position = far_free_node(room)?;
        let speed = fighter.speed;

        let mut entity = Entity::new(forge.enemy_name(species, rng), species)
            .with_fighter(fighter)
            .with_ai(AiKind::BasicCombat)
            .with_locatable(Locatable::new(position, speed));
        room.add_entity(&mut entity);
        Some(entity)
    }

    /// Spawns the boss into the final room.
    fn spawn_boss(
        &self,
        forge: &mut NameForge,
        room: &mut Room,
        rng: &mut StdRng,
    ) -> GuildhallResult<Entity> {
        let fighter = Self::levelled(Self::base_fighter(Species::Ogre), 3).boss();
        let position = far_free_node(room).ok_or_else(|| {
            GuildhallError::GenerationFailed("Boss room has no free node".to_string())
        })?;
        let speed = fighter.speed;

        let mut entity = Entity::new(forge.boss_name(rng)?, Species::Ogre)
            .with_fighter(fighter)
            .with_ai(AiKind::BasicCombat)
            .with_locatable(Locatable::new(position, speed));
        room.add_entity(&mut entity);
        Ok(entity)
    }

    fn build_room(&self, config: &GenerationConfig, biome: Biome, rng: &mut StdRng) -> Room {
        let mut room = Room::new(config.room_width, config.room_height, biome);
        if rng.gen_bool(config.pillar_chance) {
            // One or two pillars in the interior; never on the rim, so
            // entry and far columns stay clear.
            let pillars = (1..=rng.gen_range(1..=2))
                .map(|_| {
                    Position::new(
                        rng.gen_range(1..config.room_width.saturating_sub(1).max(2) as i32),
                        rng.gen_range(1..config.room_height.saturating_sub(1).max(2) as i32),
                    )
                })
                .collect::<Vec<_>>();
            room.layout = RoomLayout::with_pillars(pillars);
        }
        room
    }
}

impl Generator<DungeonBundle> for DungeonGenerator {
    fn generate(
        &self,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> GuildhallResult<DungeonBundle> {
        let mut forge = NameForge::new(self.filter.clone());
        let biome = *Biome::all().choose(rng).unwrap_or(&Biome::Crypt);
        let room_count = rng.gen_range(config.min_rooms..=config.max_rooms);

        let mut rooms = Vec::new();
        let mut spawned = Vec::new();

        for _ in 1..room_count {
            let mut room = self.build_room(config, biome, rng);
            let enemy_count =
                rng.gen_range(config.min_enemies_per_room..=config.max_enemies_per_room);
            for _ in 0..enemy_count {
                if let Some(enemy) = self.spawn_enemy(&forge, &mut room, rng) {
                    spawned.push(enemy);
                }
            }
            rooms.push(room);
        }

        // The last room holds the boss and nothing else.
        let mut boss_room = self.build_room(config, biome, rng);
        let boss = self.spawn_boss(&mut forge, &mut boss_room, rng)?;
        let boss_id = boss.id;
        let boss_name = boss.name.name_and_title();
        spawned.push(boss);
        rooms.push(boss_room);

        let enemy_count = spawned.len() as u64;
        let mut dungeon = Dungeon::from_rooms(format!("Lair of {}", boss_name), biome, rooms);
        dungeon.description = dungeon_description(rng);
        dungeon.min_enemies_per_room = config.min_enemies_per_room;
        dungeon.max_enemies_per_room = config.max_enemies_per_room;
        dungeon.boss = Some(boss_id);
        dungeon.loot = crate::Loot::new(40 * enemy_count, 30 * enemy_count);
        if rng.gen_bool(0.5) {
            dungeon
                .loot
                .item_drops
                .push(Item::healing_potion(config.potion_heal));
        }

        log::debug!(
            "Generated dungeon '{}' ({:?}, {} rooms, {} enemies)",
            dungeon.name,
            biome,
            dungeon.rooms.len(),
            enemy_count
        );
        Ok(DungeonBundle { dungeon, spawned })
    }

    fn validate(&self, content: &DungeonBundle, config: &GenerationConfig) -> GuildhallResult<()> {
        let dungeon = &content.dungeon;
        if dungeon.rooms.len() < config.min_rooms as usize
            || dungeon.rooms.len() > config.max_rooms as usize
        {
            return Err(GuildhallError::GenerationFailed(format!(
                "Dungeon has {} rooms, outside [{}, {}]",
                dungeon.rooms.len(),
                config.min_rooms,
                config.max_rooms
            )));
        }

        let last = dungeon
            .rooms
            .last()
            .ok_or_else(|| GuildhallError::GenerationFailed("Dungeon has no rooms".to_string()))?;
        if last.occupants.len() != 1 || dungeon.boss.is_none() {
            return Err(GuildhallError::GenerationFailed(
                "The final room must hold exactly the boss".to_string(),
            ));
        }

        for room in &dungeon.rooms {
            let mut seen = std::collections::HashSet::new();
            for id in &room.occupants {
                let entity = content
                    .spawned
                    .iter()
                    .find(|entity| entity.id == *id)
                    .ok_or_else(|| {
                        GuildhallError::GenerationFailed(
                            "Room occupant missing from spawn list".to_string(),
                        )
                    })?;
                let position = entity.position().ok_or_else(|| {
                    GuildhallError::GenerationFailed("Spawned enemy has no position".to_string())
                })?;
                if !room.in_bounds(position) || !seen.insert(position) {
                    return Err(GuildhallError::GenerationFailed(format!(
                        "Enemy placement at {} is out of bounds or shared",
                        position
                    )));
                }
            }
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "dungeon"
    }
}

/// Builds the starting pool of hireable mercenaries.
pub struct RecruitGenerator {
    filter: NameFilter,
}

impl RecruitGenerator {
    pub fn new(filter: NameFilter) -> Self {
        Self { filter }
    }

    /// Base statistics for a mercenary species.
    fn base_fighter(species: Species) -> Fighter {
        match species {
            Species::Human => Fighter::new(20, 5, 2, 3),
            Species::Dwarf => Fighter::new(24, 4, 3, 2),
            Species::Elf => Fighter::new(16, 5, 1, 4),
            _ => Fighter::new(18, 4, 2, 3),
        }
    }
}

impl Generator<Vec<Entity>> for RecruitGenerator {
    fn generate(
        &self,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> GuildhallResult<Vec<Entity>> {
        let mut forge = NameForge::new(self.filter.clone());
        let mut recruits = Vec::with_capacity(config.recruit_pool_size);

        for _ in 0..config.recruit_pool_size {
            let name = forge.mercenary_name(rng)?;
            let species = *Species::mercenary_species()
                .choose(rng)
                .unwrap_or(&Species::Human);
            let fighter = Self::base_fighter(species);
            let speed = fighter.speed;

            let mut inventory = Inventory::new(4);
            let _ = inventory.add(Item::healing_potion(config.potion_heal));

            recruits.push(
                Entity::new(name, species)
                    .with_fighter(fighter)
                    .with_inventory(inventory)
                    .with_ai(AiKind::BasicCombat)
                    .with_cost(rng.gen_range(80..=140))
                    .with_locatable(Locatable::new(Position::origin(), speed)),
            );
        }
        Ok(recruits)
    }

    fn validate(&self, content: &Vec<Entity>, config: &GenerationConfig) -> GuildhallResult<()> {
        if content.len() != config.recruit_pool_size {
            return Err(GuildhallError::GenerationFailed(format!(
                "Recruit pool holds {} of {} requested",
                content.len(),
                config.recruit_pool_size
            )));
        }
        let mut names = std::collections::HashSet::new();
        for recruit in content {
            if !names.insert(recruit.name.first_name().to_string()) {
                return Err(GuildhallError::GenerationFailed(format!(
                    "Duplicate recruit name {}",
                    recruit.name
                )));
            }
            if recruit.fighter.is_none() || recruit.cost.is_none() {
                return Err(GuildhallError::GenerationFailed(
                    "Recruit lacks a fighter or a cost".to_string(),
                ));
            }
        }
        Ok(())
    }

    fn generator_type(&self) -> &'static str {
        "recruits"
    }
}

/// First free node scanning from the east wall, opposite the team's
/// entry side.
fn far_free_node(room: &Room) -> Option<Position> {
    for x in (0..room.width as i32).rev() {
        for y in 0..room.height as i32 {
            let pos = Position::new(x, y);
            if room.is_walkable(pos) {
                return Some(pos);
            }
        }
    }
    None
}

/// Utility functions for generation algorithms.
pub mod utils {
    use super::*;

    /// Creates a seeded random number generator from the config.
    pub fn create_rng(config: &GenerationConfig) -> StdRng {
        StdRng::seed_from_u64(config.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rng_for(config: &GenerationConfig) -> StdRng {
        utils::create_rng(config)
    }

    #[test]
    fn test_dungeon_generation_shape() {
        let config = GenerationConfig::new(2024);
        let mut rng = rng_for(&config);
        let generator = DungeonGenerator::new(NameFilter::permissive());

        let bundle = generator.generate(&config, &mut rng).unwrap();
        generator.validate(&bundle, &config).unwrap();

        let dungeon = &bundle.dungeon;
        assert!(dungeon.rooms.len() >= config.min_rooms as usize);
        assert!(dungeon.rooms.len() <= config.max_rooms as usize);
        assert!(dungeon.description.starts_with("The "));
        assert!(dungeon.name.starts_with("Lair of "));

        // The boss is the final room's sole occupant.
        let last = dungeon.rooms.last().unwrap();
        assert_eq!(last.occupants.len(), 1);
        assert_eq!(dungeon.boss, Some(last.occupants[0]));
        let boss = bundle
            .spawned
            .iter()
            .find(|entity| Some(entity.id) == dungeon.boss)
            .unwrap();
        assert!(boss.fighter.as_ref().unwrap().is_boss);

        // Every spawned enemy is hostile and placed.
        for entity in &bundle.spawned {
            assert!(entity.fighter.as_ref().unwrap().is_enemy);
            assert!(entity.position().is_some());
        }
    }

    #[test]
    fn test_dungeon_generation_is_deterministic() {
        let config = GenerationConfig::new(9);
        let generator = DungeonGenerator::new(NameFilter::permissive());

        let a = generator
            .generate(&config, &mut rng_for(&config))
            .unwrap();
        let b = generator
            .generate(&config, &mut rng_for(&config))
            .unwrap();

        assert_eq!(a.dungeon.name, b.dungeon.name);
        assert_eq!(a.dungeon.rooms.len(), b.dungeon.rooms.len());
        assert_eq!(a.spawned.len(), b.spawned.len());
    }

    #[test]
    fn test_recruit_pool_generation() {
        let config = GenerationConfig::new(5);
        let mut rng = rng_for(&config);
        let generator = RecruitGenerator::new(NameFilter::permissive());

        let recruits = generator.generate(&config, &mut rng).unwrap();
        generator.validate(&recruits, &config).unwrap();

        assert_eq!(recruits.len(), config.recruit_pool_size);
        for recruit in &recruits {
            let inventory = recruit.inventory.as_ref().unwrap();
            assert_eq!(inventory.consumables().len(), 1);
            assert!(recruit.cost.unwrap() >= 80);
            assert!(!recruit.fighter.as_ref().unwrap().is_enemy);
        }
    }

    #[test]
    fn test_recruit_pool_larger_than_name_pool_fails_fast() {
        let mut config = GenerationConfig::new(5);
        config.recruit_pool_size = names::MERCENARY_FIRST_NAMES.len() + 1;
        let mut rng = rng_for(&config);
        let generator = RecruitGenerator::new(NameFilter::permissive());

        assert!(matches!(
            generator.generate(&config, &mut rng),
            Err(GuildhallError::GenerationFailed(_))
        ));
    }
}
