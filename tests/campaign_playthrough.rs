//! Full campaign playthroughs: setup, hiring, mission selection and
//! the engine driving combat to a resolution, everything seeded.

use guildhall::{Engine, MissionStatus, Position};
use std::collections::HashSet;

/// Sets up a campaign and fields the largest affordable team.
fn fielded_engine(seed: u64) -> Engine {
    let mut engine = Engine::setup(seed).expect("campaign setup");
    let limit = engine.state.guild.roster_limit();
    for _ in 0..limit {
        if engine.state.recruit_pool.is_empty() {
            break;
        }
        engine.recruit(0);
    }
    for id in engine.state.guild.roster.clone() {
        engine.assign_to_team(id);
    }
    assert!(
        !engine.state.guild.team.members.is_empty(),
        "setup must afford at least one hire"
    );
    engine
}

#[test]
fn test_setup_builds_pool_board_and_guild() {
    let engine = Engine::setup(31).unwrap();

    assert_eq!(engine.state.recruit_pool.len(), 8);
    assert_eq!(engine.state.board.missions.len(), 3);
    assert!(!engine.state.guild.name.is_empty());
    assert!(engine.state.guild.funds > 0);

    // Recruits carry distinct names and a starter potion.
    let mut names = HashSet::new();
    for id in &engine.state.recruit_pool {
        let recruit = engine.state.entity(*id).unwrap();
        assert!(names.insert(recruit.name.first_name().to_string()));
        assert_eq!(recruit.inventory.as_ref().unwrap().consumables().len(), 1);
    }

    // Every mission ends in a boss room with a single occupant.
    for mission in &engine.state.board.missions {
        let last = mission.rooms.last().unwrap();
        assert_eq!(last.occupants.len(), 1);
        assert_eq!(mission.boss, Some(last.occupants[0]));
        assert!(mission.description.starts_with("The "));
    }
}

#[test]
fn test_mission_resolves_and_pays_out() {
    let mut engine = fielded_engine(7001);
    let funds_before = engine.state.guild.funds;
    let guild_xp_before = engine.state.guild.xp;

    engine.select_mission(0).unwrap();
    engine.init_combat().unwrap();
    let status = engine.advance().unwrap();

    // Every generated fighter has an AI, so the mission cannot stall.
    assert!(matches!(
        status,
        MissionStatus::Victorious | MissionStatus::Defeated
    ));
    assert!(!engine.messages().is_empty());

    match status {
        MissionStatus::Victorious => {
            // The dungeon's loot moved to the guild and zeroed out.
            let loot = &engine.state.dungeon.as_ref().unwrap().loot;
            assert_eq!(loot.gp, 0);
            assert_eq!(loot.guild_xp, 0);
            assert!(loot.team_xp_queue.is_empty());
            assert!(loot.awarded_xp_per_member > 0);
            assert!(engine.state.guild.funds > funds_before);
            assert!(engine.state.guild.xp > guild_xp_before);

            // Surviving members banked the split.
            for id in &engine.state.guild.team.members {
                let fighter = engine.state.fighter(*id).unwrap();
                assert!(fighter.leveller.xp > 0 || fighter.leveller.level > 1);
            }
        }
        MissionStatus::Defeated => {
            // A wipe leaves no live team member.
            assert!(engine
                .state
                .guild
                .team
                .members
                .iter()
                .all(|id| !engine.state.is_live(*id)));
        }
        _ => unreachable!(),
    }
}

#[test]
fn test_playthrough_is_deterministic_per_seed() {
    let run = |seed: u64| -> (MissionStatus, Vec<String>, u64) {
        let mut engine = fielded_engine(seed);
        engine.select_mission(0).unwrap();
        engine.init_combat().unwrap();
        let status = engine.advance().unwrap();
        (status, engine.messages(), engine.state.guild.funds)
    };

    let (status_a, messages_a, funds_a) = run(9090);
    let (status_b, messages_b, funds_b) = run(9090);
    assert_eq!(status_a, status_b);
    assert_eq!(messages_a, messages_b);
    assert_eq!(funds_a, funds_b);
}

#[test]
fn test_cleared_rooms_hold_no_enemies() {
    let mut engine = fielded_engine(7002);
    engine.select_mission(0).unwrap();
    engine.init_combat().unwrap();
    let status = engine.advance().unwrap();

    if status == MissionStatus::Victorious {
        let dungeon = engine.state.dungeon.as_ref().unwrap();
        assert!(dungeon.is_complete());
        for room in &dungeon.rooms {
            // Occupancy invariant holds at rest: one node per
            // occupant, obstacles mirroring them.
            let positions: Vec<Position> = room
                .occupants
                .iter()
                .filter_map(|id| engine.state.position_of(*id))
                .collect();
            let unique: HashSet<Position> = positions.iter().copied().collect();
            assert_eq!(unique.len(), positions.len());

            // No live enemy remains anywhere.
            for id in &room.occupants {
                assert!(!engine.state.is_live(*id));
            }
        }
    }
}

#[test]
fn test_flush_clears_volatile_observers_between_missions() {
    use guildhall::{GameEvent, GameState, Subscriber, SubscriberHandle, Topic};
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Counter {
        seen: usize,
    }
    impl Subscriber for Counter {
        fn handle_event(&mut self, _: &GameEvent, _: &mut GameState) -> Vec<GameEvent> {
            self.seen += 1;
            Vec::new()
        }
    }

    let mut engine = fielded_engine(7003);
    let counter = Rc::new(RefCell::new(Counter { seen: 0 }));
    let handle: SubscriberHandle = counter.clone();
    engine
        .combat_bus_mut()
        .subscribe(Topic::Cleanup, "encounter-counter", &handle);

    engine.flush_subscriptions();
    // The flush's own Cleanup was the counter's last delivery.
    assert_eq!(counter.borrow().seen, 1);

    engine.flush_subscriptions();
    assert_eq!(counter.borrow().seen, 1);
}

#[test]
fn test_board_refresh_despawns_stale_missions() {
    let mut engine = Engine::setup(7004).unwrap();
    let stale: Vec<_> = engine
        .state
        .board
        .missions
        .iter()
        .flat_map(|mission| mission.spawned_entities())
        .collect();
    assert!(!stale.is_empty());

    engine.refresh_board().unwrap();

    for id in stale {
        assert!(engine.state.entity(id).is_none());
    }
    assert_eq!(engine.state.board.missions.len(), 3);
}
