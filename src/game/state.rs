//! # Game State & Engine
//!
//! Central coordination of the simulation. [`GameState`] is the
//! serializable data root: the entity registry, the guild, the recruit
//! pool, the mission board and the active dungeon. Every
//! cross-reference in the model is an [`EntityId`] resolved through the
//! registry, which is what keeps the ownership graph acyclic.
//!
//! [`Engine`] wraps the state with the non-serializable runtime: the
//! seeded RNG, the two dispatchers and the active combat round. It is
//! the single driver thread's interface: set up a campaign, pick a
//! mission, and pull the simulation forward.

use crate::config::MISSION_BOARD_SIZE;
use crate::generation::{
    DungeonGenerator, GenerationConfig, Generator, NameFilter, NameForge, RecruitGenerator,
};
use crate::{
    AiAdapter, CombatRound, ConcreteAction, Dispatcher, Dungeon, Entity, EntityId, GameEvent,
    Guild, GuildhallError, GuildhallResult, LevelUpTable, MessageImportance, MissionBoard,
    OccupancyHandler, Position, RetreatHook, Rewarder, RewardsHandler, Room, RoundPhase,
    Subscriber, SubscriberHandle, Topic,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Rounds an `advance` call will start before giving up on an
/// encounter that cannot resolve.
const MAX_ROUNDS_PER_ENCOUNTER: u32 = 512;

/// Where the current mission stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MissionStatus {
    /// No mission bound; the guild is at rest.
    Idle,
    /// A mission is underway (possibly stalled awaiting input).
    InProgress,
    /// The team cleared every room.
    Victorious,
    /// The team was wiped out.
    Defeated,
}

/// The serializable root of the simulation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// All entities, indexed by id. The registry owns them; everything
    /// else holds ids.
    pub entities: HashMap<EntityId, Entity>,
    /// The player's guild.
    pub guild: Guild,
    /// Mercenaries offered for hire.
    pub recruit_pool: Vec<EntityId>,
    /// Missions on offer.
    pub board: MissionBoard,
    /// The mission currently underway, if any.
    pub dungeon: Option<Dungeon>,
    pub mission_status: MissionStatus,
    /// Completed combat rounds across the campaign.
    pub turn_number: u64,
    pub rng_seed: u64,
}

impl GameState {
    /// Creates an empty state. The guild starts nameless and broke;
    /// [`Engine::setup`] populates everything.
    pub fn new(seed: u64) -> Self {
        Self {
            entities: HashMap::new(),
            guild: Guild::new("Nameless Guild", 0),
            recruit_pool: Vec::new(),
            board: MissionBoard::new(MISSION_BOARD_SIZE),
            dungeon: None,
            mission_status: MissionStatus::Idle,
            turn_number: 0,
            rng_seed: seed,
        }
    }

    /// Adds an entity to the registry, returning its id.
    pub fn insert_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        self.entities.insert(id, entity);
        id
    }

    /// Removes an entity from the registry entirely.
    pub fn despawn_entity(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn fighter(&self, id: EntityId) -> Option<&crate::Fighter> {
        self.entities.get(&id).and_then(|e| e.fighter.as_ref())
    }

    pub fn fighter_mut(&mut self, id: EntityId) -> Option<&mut crate::Fighter> {
        self.entities.get_mut(&id).and_then(|e| e.fighter.as_mut())
    }

    /// Whether the entity is a fighter able to act.
    pub fn is_live(&self, id: EntityId) -> bool {
        self.entities
            .get(&id)
            .map(|e| e.is_live_fighter())
            .unwrap_or(false)
    }

    /// The ids from `candidates` that are live fighters.
    pub fn live_members(&self, candidates: &[EntityId]) -> Vec<EntityId> {
        candidates
            .iter()
            .copied()
            .filter(|id| self.is_live(*id))
            .collect()
    }

    /// Index of the first live candidate, in insertion order. Target
    /// selection is deterministic; no RNG is consulted.
    pub fn choose_target(&self, candidates: &[EntityId]) -> Option<usize> {
        candidates.iter().position(|id| self.is_live(*id))
    }

    /// Display name for narration; placeholder for unknown ids.
    pub fn display_name(&self, id: EntityId) -> String {
        self.entities
            .get(&id)
            .map(|e| e.name.name_and_title())
            .unwrap_or_else(|| "someone".to_string())
    }

    pub fn position_of(&self, id: EntityId) -> Option<Position> {
        self.entities.get(&id).and_then(|e| e.position())
    }

    /// Moves the entity to the given node. Obstacle resync is the
    /// occupancy handler's concern, driven by the `Moved` event.
    pub fn set_position(&mut self, id: EntityId, position: Position) {
        if let Some(locatable) = self
            .entities
            .get_mut(&id)
            .and_then(|e| e.locatable.as_mut())
        {
            locatable.position = position;
        }
    }

    /// The room the active mission is currently in.
    pub fn current_room(&self) -> Option<&Room> {
        self.dungeon.as_ref().and_then(|d| d.room())
    }

    pub fn current_room_mut(&mut self) -> Option<&mut Room> {
        self.dungeon.as_mut().and_then(|d| d.room_mut())
    }

    /// Rebuilds the current room's obstacle set from its occupants.
    pub fn recompute_current_room_obstacles(&mut self) {
        let Some(dungeon) = self.dungeon.as_mut() else {
            return;
        };
        let Some(room) = dungeon.room_mut() else {
            return;
        };
        room.recompute_obstacles(&self.entities);
    }

    /// Live occupants of the current room hostile to the given actor.
    ///
    /// Hostility is sidedness: enemies are hostile to the team and the
    /// team to enemies.
    pub fn hostiles_to(&self, actor: EntityId) -> Vec<EntityId> {
        let Some(actor_fighter) = self.fighter(actor) else {
            return Vec::new();
        };
        let actor_is_enemy = actor_fighter.is_enemy;
        let Some(room) = self.current_room() else {
            return Vec::new();
        };
        room.occupants
            .iter()
            .copied()
            .filter(|id| *id != actor)
            .filter(|id| self.is_live(*id))
            .filter(|id| {
                self.fighter(*id)
                    .map(|f| f.is_enemy != actor_is_enemy)
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Readies an action on a fighter; the combat round executes it.
    pub fn ready_action(&mut self, id: EntityId, action: ConcreteAction) {
        if let Some(fighter) = self.fighter_mut(id) {
            fighter.readied_action = Some(action);
        }
    }

    /// Takes a fighter's readied action, leaving none.
    pub fn take_readied_action(&mut self, id: EntityId) -> Option<ConcreteAction> {
        self.fighter_mut(id).and_then(|f| f.readied_action.take())
    }

    /// Deducts action points from a fighter's current budget.
    pub fn spend_ap(&mut self, id: EntityId, cost: u32) {
        if let Some(fighter) = self.fighter_mut(id) {
            fighter.action_points.spend(cost);
        }
    }

    /// Marks the entity dead and executes its death hooks: the corpse
    /// leaves its room, a guild member leaves the guild.
    pub fn kill_entity(&mut self, id: EntityId) {
        let hooks = match self.entities.get_mut(&id) {
            Some(entity) => entity.die(),
            None => return,
        };
        for hook in hooks {
            match hook {
                crate::DeathHook::LeaveRoom => {
                    if let Some(room) = self.dungeon.as_mut().and_then(|d| d.room_mut()) {
                        room.remove_occupant(id);
                    }
                    self.recompute_current_room_obstacles();
                }
                crate::DeathHook::LeaveTeam => {
                    self.guild.remove_member(id);
                }
            }
        }
    }

    /// Marks the fighter retreating and executes its retreat hooks; a
    /// retreating fighter also leaves the battlefield.
    pub fn retreat_fighter(&mut self, id: EntityId) {
        let hooks = match self.fighter_mut(id) {
            Some(fighter) => fighter.retreat(),
            None => return,
        };
        if let Some(room) = self.dungeon.as_mut().and_then(|d| d.room_mut()) {
            room.remove_occupant(id);
        }
        self.recompute_current_room_obstacles();
        for hook in hooks {
            match hook {
                RetreatHook::ReturnToRoster => {
                    self.guild.return_to_roster(id);
                }
            }
        }
    }

    /// Places a registered entity into the active mission's current
    /// room at its entry node.
    pub fn place_in_current_room(&mut self, id: EntityId) -> GuildhallResult<()> {
        let room = self
            .dungeon
            .as_mut()
            .and_then(|d| d.room_mut())
            .ok_or_else(|| {
                GuildhallError::InvalidState("No room to place the entity in".to_string())
            })?;
        let position = room.entry_position().ok_or_else(|| {
            GuildhallError::InvalidState("The room has no free node left".to_string())
        })?;
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or_else(|| GuildhallError::InvalidState(format!("Entity {} is not registered", id)))?;
        if let Some(locatable) = entity.locatable.as_mut() {
            locatable.position = position;
        }
        room.add_entity(entity);
        Ok(())
    }

    /// Replaces the board's missions with freshly generated dungeons,
    /// despawning the entities of the discarded ones first.
    pub fn fill_board(
        &mut self,
        generator: &DungeonGenerator,
        config: &GenerationConfig,
        rng: &mut StdRng,
    ) -> GuildhallResult<()> {
        for mission in self.board.missions.drain(..) {
            for id in mission.spawned_entities() {
                self.entities.remove(&id);
            }
        }
        for _ in 0..self.board.size {
            let bundle = generator.generate(config, rng)?;
            generator.validate(&bundle, config)?;
            for entity in bundle.spawned {
                self.entities.insert(entity.id, entity);
            }
            self.board.missions.push(bundle.dungeon);
        }
        Ok(())
    }

    /// Saves the game state to JSON.
    pub fn save_to_json(&self) -> GuildhallResult<String> {
        serde_json::to_string_pretty(self).map_err(GuildhallError::from)
    }

    /// Loads game state from JSON.
    pub fn load_from_json(json: &str) -> GuildhallResult<Self> {
        serde_json::from_str(json).map_err(GuildhallError::from)
    }
}

/// Volatile-bus subscriber collecting narration for the message log.
pub struct MessageLog {
    pub lines: Vec<String>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }
}

impl Default for MessageLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Subscriber for MessageLog {
    fn handle_event(&mut self, event: &GameEvent, _state: &mut GameState) -> Vec<GameEvent> {
        if let Some(text) = event.text() {
            self.lines.push(text.to_string());
        }
        Vec::new()
    }
}

/// The simulation driver: owns the state, the dispatchers, the RNG and
/// the active combat round.
pub struct Engine {
    pub state: GameState,
    rng: StdRng,
    config: GenerationConfig,
    /// Volatile bus for per-encounter observers (UI).
    combat_bus: Dispatcher,
    /// Static bus for campaign-lifetime observers (AI, occupancy,
    /// rewards).
    projection_bus: Dispatcher,
    round: Option<CombatRound>,
    ai: SubscriberHandle,
    occupancy: SubscriberHandle,
    rewards: SubscriberHandle,
    log: Rc<RefCell<MessageLog>>,
}

impl Engine {
    /// Builds a fresh campaign: a named guild, a pool of recruits and
    /// a full mission board, everything derived from the seed.
    pub fn setup(seed: u64) -> GuildhallResult<Self> {
        let config = GenerationConfig::new(seed);
        let mut rng = StdRng::seed_from_u64(seed);

        let filter = NameFilter::load_or_permissive(crate::config::BANNED_HASHES_PATH);
        let mut forge = NameForge::new(filter.clone());

        let mut state = GameState::new(seed);
        let guild_name = forge.guild_name(&mut rng)?;
        state.guild = Guild::new(guild_name, config.initial_guild_funds);
        state.guild.xp = config.initial_guild_xp;
        state.guild.team.name = forge.team_name(&state.guild.name, &mut rng);

        let recruits = RecruitGenerator::new(filter.clone()).generate(&config, &mut rng)?;
        for recruit in recruits {
            let id = state.insert_entity(recruit);
            state.recruit_pool.push(id);
        }

        let generator = DungeonGenerator::new(filter);
        state.fill_board(&generator, &config, &mut rng)?;

        let mut engine = Self {
            state,
            rng,
            config,
            combat_bus: Dispatcher::volatile(),
            projection_bus: Dispatcher::persistent(),
            round: None,
            ai: Rc::new(RefCell::new(AiAdapter::new())),
            occupancy: Rc::new(RefCell::new(OccupancyHandler::new())),
            rewards: Rc::new(RefCell::new(RewardsHandler::new())),
            log: Rc::new(RefCell::new(MessageLog::new())),
        };
        engine.wire_projections();
        engine.wire_message_log();

        log::info!(
            "Campaign ready: guild '{}' with {} recruits on offer",
            engine.state.guild.name,
            engine.state.recruit_pool.len()
        );
        Ok(engine)
    }

    /// Subscribes the campaign-lifetime observers on the static bus.
    fn wire_projections(&mut self) {
        let ai = Rc::clone(&self.ai);
        self.projection_bus
            .subscribe(Topic::AwaitInput, "ai-adapter", &ai);

        let occupancy = Rc::clone(&self.occupancy);
        for topic in [
            Topic::Move,
            Topic::Dying,
            Topic::Retreat,
            Topic::NewEncounter,
        ] {
            self.projection_bus
                .subscribe(topic, "occupancy-handler", &occupancy);
        }

        let rewards = Rc::clone(&self.rewards);
        self.projection_bus
            .subscribe(Topic::Dying, "rewards-handler", &rewards);
    }

    /// (Re-)subscribes the message log on the volatile bus; needed
    /// after every flush.
    fn wire_message_log(&mut self) {
        let log_concrete: Rc<RefCell<MessageLog>> = Rc::clone(&self.log);
        let log: SubscriberHandle = log_concrete;
        for topic in [Topic::Message, Topic::Dying, Topic::Retreat] {
            self.combat_bus.subscribe(topic, "message-log", &log);
        }
    }

    /// The narration collected so far.
    pub fn messages(&self) -> Vec<String> {
        self.log.borrow().lines.clone()
    }

    /// The volatile bus, for per-encounter observers.
    pub fn combat_bus_mut(&mut self) -> &mut Dispatcher {
        &mut self.combat_bus
    }

    /// The static bus, for campaign-lifetime observers.
    pub fn projection_bus_mut(&mut self) -> &mut Dispatcher {
        &mut self.projection_bus
    }

    fn emit_message(&mut self, text: impl Into<String>) {
        let event = GameEvent::Message {
            text: text.into(),
            importance: MessageImportance::Normal,
        };
        self.projection_bus.publish(&event, &mut self.state);
        self.combat_bus.publish(&event, &mut self.state);
    }

    /// Hires the recruit at the given pool index.
    ///
    /// Capacity and funds failures surface as message events and leave
    /// every piece of state untouched.
    pub fn recruit(&mut self, index: usize) {
        let Some(&id) = self.state.recruit_pool.get(index) else {
            self.emit_message("No such recruit.");
            return;
        };
        if self.state.guild.roster_full() {
            self.emit_message("Roster full.");
            return;
        }
        let cost = self.state.entity(id).and_then(|e| e.cost).unwrap_or(0);
        if self.state.guild.funds < cost {
            self.emit_message("Insufficient funds.");
            return;
        }

        self.state.guild.funds -= cost;
        self.state.recruit_pool.remove(index);
        self.state.guild.roster.push(id);
        let name = self.state.display_name(id);
        self.emit_message(format!("{} joins the guild for {} gp.", name, cost));
    }

    /// Moves a roster member onto the team, arming the hooks that
    /// return a retreater to the roster and strike the dead from the
    /// guild.
    pub fn assign_to_team(&mut self, id: EntityId) -> bool {
        if !self.state.guild.assign_to_team(id) {
            return false;
        }
        if let Some(entity) = self.state.entity_mut(id) {
            entity.register_death_hook(crate::DeathHook::LeaveTeam);
            if let Some(fighter) = entity.fighter.as_mut() {
                fighter.register_retreat_hook(RetreatHook::ReturnToRoster);
            }
        }
        true
    }

    /// Returns a team member to the roster outside combat.
    pub fn return_to_roster(&mut self, id: EntityId) -> bool {
        self.state.guild.return_to_roster(id)
    }

    /// Takes a mission off the board and binds it as the active
    /// dungeon.
    pub fn select_mission(&mut self, index: usize) -> GuildhallResult<()> {
        if self.state.dungeon.is_some() && self.state.mission_status == MissionStatus::InProgress {
            return Err(GuildhallError::InvalidState(
                "A mission is already underway".to_string(),
            ));
        }
        let mission = self
            .state
            .board
            .take_mission(index)
            .ok_or_else(|| GuildhallError::InvalidAction(format!("No mission at slot {}", index)))?;
        log::info!("Mission selected: {} ({})", mission.name, mission.description);
        self.state.dungeon = Some(mission);
        Ok(())
    }

    /// Opens the selected mission: the team enters the first room and
    /// the encounter observers are wired up.
    pub fn init_combat(&mut self) -> GuildhallResult<()> {
        let room_index = {
            let dungeon = self
                .state
                .dungeon
                .as_ref()
                .ok_or_else(|| GuildhallError::InvalidState("No mission selected".to_string()))?;
            dungeon.current_room
        };
        if self.state.guild.team.members.is_empty() {
            return Err(GuildhallError::InvalidState(
                "The team is empty; assign members before setting out".to_string(),
            ));
        }

        // The volatile bus was flushed after the previous mission; the
        // log rejoins for this one.
        self.wire_message_log();

        for id in self.state.guild.team.members.clone() {
            self.state.place_in_current_room(id)?;
        }
        self.state.mission_status = MissionStatus::InProgress;
        self.round = None;

        let event = GameEvent::NewEncounter { room: room_index };
        self.projection_bus.publish(&event, &mut self.state);
        self.combat_bus.publish(&event, &mut self.state);
        Ok(())
    }

    /// Drives the mission forward until it resolves or stalls awaiting
    /// external input.
    ///
    /// Each produced event is published on the static bus first (AI,
    /// occupancy, rewards) and the volatile bus second (UI), before the
    /// next event is pulled.
    pub fn advance(&mut self) -> GuildhallResult<MissionStatus> {
        if self.state.mission_status != MissionStatus::InProgress {
            return Ok(self.state.mission_status);
        }

        let mut rounds_started: u32 = 0;
        loop {
            if self.round.is_none() {
                rounds_started += 1;
                if rounds_started > MAX_ROUNDS_PER_ENCOUNTER {
                    return Err(GuildhallError::InvalidState(format!(
                        "Encounter failed to resolve within {} rounds",
                        MAX_ROUNDS_PER_ENCOUNTER
                    )));
                }
                let team = self.state.live_members(&self.state.guild.team.members);
                let enemies = self.room_enemies();
                let mut round = CombatRound::new(team, enemies);
                round.roll_initiative(&self.state, &mut self.rng)?;
                self.round = Some(round);
            }

            let round = self.round.as_mut().expect("round just ensured");
            if round.phase() == RoundPhase::Complete {
                // The round delivered its last event on a previous
                // iteration; pulling again would be iterating past
                // completion.
                let victor = round.victor(&self.state);
                self.round = None;
                self.state.turn_number += 1;

                match victor {
                    Some(0) => {
                        if let Some(status) = self.on_room_cleared()? {
                            return Ok(status);
                        }
                    }
                    Some(1) => {
                        self.emit_message("The guild mourns its fallen team.");
                        self.finish_mission(MissionStatus::Defeated);
                        return Ok(MissionStatus::Defeated);
                    }
                    None => {
                        // Both sides stand; a fresh round begins.
                    }
                    Some(_) => unreachable!("victor index out of range"),
                }
                continue;
            }

            match round.next_event(&mut self.state) {
                Some(event) => {
                    self.projection_bus.publish(&event, &mut self.state);
                    self.combat_bus.publish(&event, &mut self.state);
                }
                None => {
                    if round.is_awaiting_input() {
                        // Stalled on a fighter nobody answers for; an
                        // external driver must confirm a choice.
                        return Ok(MissionStatus::InProgress);
                    }
                    debug_assert_eq!(round.phase(), RoundPhase::Complete);
                }
            }
        }
    }

    /// Enemy occupants of the current room.
    fn room_enemies(&self) -> Vec<EntityId> {
        self.state
            .current_room()
            .map(|room| {
                room.occupants
                    .iter()
                    .copied()
                    .filter(|id| {
                        self.state
                            .fighter(*id)
                            .map(|f| f.is_enemy)
                            .unwrap_or(false)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Advances past a cleared room. Returns the final status when the
    /// mission ended, `None` when another room awaits.
    fn on_room_cleared(&mut self) -> GuildhallResult<Option<MissionStatus>> {
        // The team walks on; their nodes free up behind them.
        let team = self.state.guild.team.members.clone();
        if let Some(room) = self.state.current_room_mut() {
            for id in &team {
                room.remove_occupant(*id);
            }
        }
        self.state.recompute_current_room_obstacles();

        let more_rooms = self
            .state
            .dungeon
            .as_mut()
            .map(|d| d.advance_room())
            .unwrap_or(false);

        if more_rooms {
            let room_index = self
                .state
                .dungeon
                .as_ref()
                .map(|d| d.current_room)
                .unwrap_or(0);
            for id in team {
                self.state.place_in_current_room(id)?;
            }
            let event = GameEvent::NewEncounter { room: room_index };
            self.projection_bus.publish(&event, &mut self.state);
            self.combat_bus.publish(&event, &mut self.state);
            return Ok(None);
        }

        self.claim_mission_rewards()?;
        let dungeon_name = self
            .state
            .dungeon
            .as_ref()
            .map(|d| d.name.clone())
            .unwrap_or_default();
        let event = GameEvent::TeamTriumphant {
            dungeon: dungeon_name,
        };
        self.projection_bus.publish(&event, &mut self.state);
        self.combat_bus.publish(&event, &mut self.state);

        self.finish_mission(MissionStatus::Victorious);
        Ok(Some(MissionStatus::Victorious))
    }

    /// Transfers the dungeon's loot to the guild and levels the team.
    fn claim_mission_rewards(&mut self) -> GuildhallResult<()> {
        let team = self.state.guild.team.members.clone();
        let (gp, guild_xp, per_member) = {
            let Some(dungeon) = self.state.dungeon.as_mut() else {
                return Ok(());
            };
            let loot = &mut dungeon.loot;
            let gp = loot.claim_gp();
            let guild_xp = loot.claim_guild_xp();
            let per_member = if team.is_empty() {
                0
            } else {
                loot.take_team_xp(team.len())?
            };
            (gp, guild_xp, per_member)
        };

        self.state.guild.funds += gp;
        self.state.guild.xp += guild_xp;
        self.emit_message(format!("The guild banks {} gp and {} renown.", gp, guild_xp));

        let table = LevelUpTable::default();
        for id in team {
            let levelled = {
                let Some(fighter) = self.state.fighter_mut(id) else {
                    continue;
                };
                fighter.leveller.gain(per_member);
                if fighter.leveller.level_up() {
                    fighter.max_hp += table.hp;
                    fighter.hp = fighter.max_hp;
                    fighter.power += table.power;
                    fighter.defence += table.defence;
                    Some(fighter.leveller.level)
                } else {
                    None
                }
            };
            if let Some(level) = levelled {
                let name = self.state.display_name(id);
                self.emit_message(format!("{} reaches level {}.", name, level));
            }
        }

        // Item drops go to whoever has pack space; a full team is told
        // so, and the item is forfeit.
        let drops = self
            .state
            .dungeon
            .as_mut()
            .map(|dungeon| std::mem::take(&mut dungeon.loot.item_drops))
            .unwrap_or_default();
        let team = self.state.guild.team.members.clone();
        for item in drops {
            let item_name = item.name.clone();
            let mut remaining = Some(item);
            for id in &team {
                let Some(inventory) = self
                    .state
                    .entity_mut(*id)
                    .and_then(|entity| entity.inventory.as_mut())
                else {
                    continue;
                };
                match inventory.add(remaining.take().expect("drop still in hand")) {
                    Ok(_) => {
                        let name = self.state.display_name(*id);
                        self.emit_message(format!("{} pockets a {}.", name, item_name));
                        break;
                    }
                    Err(item) => remaining = Some(item),
                }
            }
            if remaining.is_some() {
                if let Some(&owner) = team.first() {
                    let event = GameEvent::InventoryFull { owner };
                    self.projection_bus.publish(&event, &mut self.state);
                    self.combat_bus.publish(&event, &mut self.state);
                }
                self.emit_message(format!("No room in any pack for the {}.", item_name));
            }
        }
        Ok(())
    }

    /// Seals the mission outcome and clears the per-encounter world
    /// state: subscriptions flushed, retreat flags reset.
    fn finish_mission(&mut self, status: MissionStatus) {
        self.state.mission_status = status;
        self.round = None;

        let members: Vec<EntityId> = self
            .state
            .guild
            .roster
            .iter()
            .chain(self.state.guild.team.members.iter())
            .copied()
            .collect();
        for id in members {
            if let Some(fighter) = self.state.fighter_mut(id) {
                fighter.retreating = false;
                fighter.readied_action = None;
            }
        }

        self.flush_subscriptions();
    }

    /// Dismisses the per-encounter observers: publishes `Cleanup` on
    /// the volatile bus, then clears it. The static bus is untouched.
    pub fn flush_subscriptions(&mut self) {
        self.combat_bus
            .publish(&GameEvent::Cleanup, &mut self.state);
        self.combat_bus.clear();
    }

    /// Regenerates the mission board, for a new outing after a mission
    /// resolves.
    pub fn refresh_board(&mut self) -> GuildhallResult<()> {
        let filter = NameFilter::load_or_permissive(crate::config::BANNED_HASHES_PATH);
        let generator = DungeonGenerator::new(filter);
        self.state
            .fill_board(&generator, &self.config, &mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Fighter, Locatable, Name, Species};

    #[test]
    fn test_game_state_creation() {
        let state = GameState::new(12345);
        assert_eq!(state.turn_number, 0);
        assert_eq!(state.rng_seed, 12345);
        assert_eq!(state.mission_status, MissionStatus::Idle);
        assert!(state.entities.is_empty());
    }

    #[test]
    fn test_registry_round_trip() {
        let mut state = GameState::new(1);
        let entity =
            Entity::new(Name::new("Test"), Species::Human).with_fighter(Fighter::new(10, 2, 1, 3));
        let id = state.insert_entity(entity);

        assert!(state.is_live(id));
        assert_eq!(state.display_name(id), "Test");
        assert!(state.despawn_entity(id).is_some());
        assert!(!state.is_live(id));
        assert_eq!(state.display_name(id), "someone");
    }

    #[test]
    fn test_choose_target_prefers_insertion_order() {
        let mut state = GameState::new(1);
        let dead = state.insert_entity(
            Entity::new(Name::new("Dead"), Species::Goblin)
                .with_fighter(Fighter::new(5, 1, 0, 2).enemy()),
        );
        let live = state.insert_entity(
            Entity::new(Name::new("Live"), Species::Goblin)
                .with_fighter(Fighter::new(5, 1, 0, 2).enemy()),
        );
        state.kill_entity(dead);

        assert_eq!(state.choose_target(&[dead, live]), Some(1));
        assert_eq!(state.choose_target(&[dead]), None);
    }

    #[test]
    fn test_kill_entity_runs_hooks() {
        let mut state = GameState::new(1);
        let mut room = Room::new(4, 4, crate::Biome::Crypt);
        let mut member = Entity::new(Name::new("Member"), Species::Human)
            .with_fighter(Fighter::new(10, 2, 1, 3))
            .with_locatable(Locatable::new(Position::new(1, 1), 3));
        room.add_entity(&mut member);
        member.register_death_hook(crate::DeathHook::LeaveTeam);
        let id = state.insert_entity(member);
        state.guild.roster.push(id);
        state.guild.assign_to_team(id);
        state.dungeon = Some(Dungeon::from_rooms("Pit", crate::Biome::Crypt, vec![room]));

        state.kill_entity(id);

        assert!(state.entity(id).unwrap().is_dead);
        assert!(state.current_room().unwrap().occupants.is_empty());
        assert!(state.guild.team.members.is_empty());
        assert!(state.guild.roster.is_empty());
    }

    #[test]
    fn test_retreat_returns_member_to_roster() {
        let mut state = GameState::new(1);
        let mut room = Room::new(4, 4, crate::Biome::Crypt);
        let mut member = Entity::new(Name::new("Runner"), Species::Elf)
            .with_fighter(Fighter::new(10, 2, 1, 3))
            .with_locatable(Locatable::new(Position::new(1, 1), 3));
        room.add_entity(&mut member);
        member
            .fighter
            .as_mut()
            .unwrap()
            .register_retreat_hook(RetreatHook::ReturnToRoster);
        let id = state.insert_entity(member);
        state.guild.roster.push(id);
        state.guild.assign_to_team(id);
        state.dungeon = Some(Dungeon::from_rooms("Pit", crate::Biome::Crypt, vec![room]));

        state.retreat_fighter(id);

        assert!(state.fighter(id).unwrap().retreating);
        assert!(!state.is_live(id));
        assert!(state.current_room().unwrap().occupants.is_empty());
        assert_eq!(state.guild.roster, vec![id]);
        assert!(state.guild.team.members.is_empty());
    }

    #[test]
    fn test_save_load_round_trip() {
        let mut state = GameState::new(77);
        let id = state.insert_entity(
            Entity::new(Name::new("Keeper"), Species::Dwarf)
                .with_fighter(Fighter::new(15, 3, 2, 2)),
        );
        state.guild.roster.push(id);

        let json = state.save_to_json().unwrap();
        let restored = GameState::load_from_json(&json).unwrap();
        assert_eq!(restored.rng_seed, 77);
        assert_eq!(restored.guild.roster, vec![id]);
        assert_eq!(restored.fighter(id).unwrap().max_hp, 15);
    }

    #[test]
    fn test_engine_setup_is_seed_deterministic() {
        let a = Engine::setup(424).unwrap();
        let b = Engine::setup(424).unwrap();
        assert_eq!(a.state.guild.name, b.state.guild.name);
        assert_eq!(a.state.recruit_pool.len(), b.state.recruit_pool.len());
        assert_eq!(
            a.state.board.missions.len(),
            crate::config::MISSION_BOARD_SIZE
        );
        let names_a: Vec<String> = a
            .state
            .board
            .missions
            .iter()
            .map(|m| m.name.clone())
            .collect();
        let names_b: Vec<String> = b
            .state
            .board
            .missions
            .iter()
            .map(|m| m.name.clone())
            .collect();
        assert_eq!(names_a, names_b);
    }

    #[test]
    fn test_recruit_failures_leave_state_untouched() {
        let mut engine = Engine::setup(11).unwrap();
        // Zero xp means a roster limit of zero.
        engine.state.guild.xp = 0;
        let funds_before = engine.state.guild.funds;
        let pool_before = engine.state.recruit_pool.len();

        engine.recruit(0);

        assert_eq!(engine.state.guild.funds, funds_before);
        assert_eq!(engine.state.recruit_pool.len(), pool_before);
        assert!(engine.state.guild.roster.is_empty());
        assert!(engine
            .messages()
            .iter()
            .any(|line| line == "Roster full."));
    }
}
