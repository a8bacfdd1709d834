//! End-to-end decision passes against a scripted engine.

use rampart::agent::execute_plan;
use rampart::engine::{spawn_coord, BreachEvent, PersistenceError};
use rampart::memory::MemorySnapshot;
use rampart::micro::SpawnOrder;
use rampart::modeler::{Playstyle, Weakness};
use rampart::testkit::MockEngine;
use rampart::{Agent, Coord, JsonFileStore, MemoryStore, Side, UnitType};

/// Store that remembers nothing; keeps persistence out of the way.
struct NullStore;

impl MemoryStore for NullStore {
    fn load(&self) -> Result<Option<MemorySnapshot>, PersistenceError> {
        Ok(None)
    }
    fn save(&self, _snapshot: &MemorySnapshot) -> Result<(), PersistenceError> {
        Ok(())
    }
}

fn agent_for(engine: &MockEngine) -> Agent {
    Agent::new(engine, Box::new(NullStore))
}

#[test]
fn heavy_turtle_opponent_is_classified_after_one_pass() {
    let mut engine = MockEngine::new();
    engine.turn = 10;
    for i in 0..25 {
        engine.place(
            Coord::new(i % 28, 14 + i / 28),
            Side::Them,
            UnitType::Turret,
            false,
        );
    }

    let mut agent = agent_for(&engine);
    agent.decide_turn(&mut engine);

    assert_eq!(agent.model().playstyle, Playstyle::Turtle);
    assert!((agent.model().defense_rating - 0.9).abs() < 1e-9);
    assert_eq!(engine.submitted, 1);
}

#[test]
fn winning_press_turn_floods_scouts_with_a_fat_allocation() {
    let mut engine = MockEngine::new();
    engine.turn = 12;
    engine.mobile_points = 20.0;
    engine.enemy_health = 12.0; // big observed swing => press mode

    let mut agent = agent_for(&engine);
    agent.decide_turn(&mut engine);

    assert_eq!(agent.mode(), rampart::adapt::StrategyMode::Press);
    let scouts = engine.spawned_count(UnitType::Scout);
    assert!(scouts >= 17, "press allocation spawned only {scouts} scouts");
    assert!(scouts <= 20);
}

#[test]
fn hopeless_expected_value_means_a_defense_only_turn() {
    let mut engine = MockEngine::new();
    engine.turn = 12;
    engine.mobile_points = 8.0;
    for x in 0..28 {
        engine.place(Coord::new(x, 15), Side::Them, UnitType::Turret, true);
    }

    let mut agent = agent_for(&engine);
    agent.decide_turn(&mut engine);

    assert_eq!(
        engine.offensive_spawn_total(),
        0,
        "vetoed attack must not spawn mobile units"
    );
    assert_eq!(engine.submitted, 1);
}

#[test]
fn undefended_gap_shows_up_as_sparse_zones() {
    let mut engine = MockEngine::new();
    engine.turn = 10;
    for x in 0..28 {
        if (17..=23).contains(&x) {
            continue;
        }
        engine.place(Coord::new(x, 15), Side::Them, UnitType::Turret, true);
    }

    let mut agent = agent_for(&engine);
    agent.decide_turn(&mut engine);

    assert!(agent
        .model()
        .weaknesses
        .contains(&Weakness::SparseZone { column: 20 }));
    assert!(!agent
        .model()
        .weaknesses
        .contains(&Weakness::SparseZone { column: 10 }));
}

#[test]
fn cache_entries_never_survive_a_turn_change() {
    let mut engine = MockEngine::new();
    engine.turn = 5;
    let mut agent = agent_for(&engine);
    agent.decide_turn(&mut engine);

    assert!(agent.cache().read(5).is_some());
    assert!(agent.cache().read(4).is_none());
    assert!(agent.cache().read(6).is_none());

    engine.turn = 6;
    agent.decide_turn(&mut engine);
    assert!(agent.cache().read(5).is_none(), "stale entry must be gone");
    assert!(agent.cache().read(6).is_some());
}

#[test]
fn breach_feed_accumulates_into_memory_by_side() {
    let mut engine = MockEngine::new();
    engine.turn = 4;
    engine.breaches = vec![
        BreachEvent {
            location: Coord::new(6, 7),
            own_breach: false,
        },
        BreachEvent {
            location: Coord::new(22, 19),
            own_breach: true,
        },
    ];

    let mut agent = agent_for(&engine);
    agent.decide_turn(&mut engine);

    assert_eq!(agent.memory().breaches_taken[&Coord::new(6, 7)].count, 1);
    assert_eq!(agent.memory().breaches_dealt[&Coord::new(22, 19)].count, 1);
}

#[test]
fn decisive_positions_write_memory_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");

    let mut engine = MockEngine::new();
    engine.turn = 3;
    engine.enemy_health = 1.0; // win probability pins at the upper clamp

    let mut agent = Agent::new(&engine, Box::new(JsonFileStore::new(&path)));
    agent.decide_turn(&mut engine);

    let saved = JsonFileStore::new(&path).load().unwrap().unwrap();
    assert_eq!(saved.games_played, 1);
}

#[test]
fn cross_game_memory_is_merged_not_replaced() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memory.json");
    let store = JsonFileStore::new(&path);

    let mut previous = rampart::memory::PersistentMemory::new();
    previous.games_played = 2;
    previous.record_attack_attempt("scout_flood", 9);
    store.save(&previous.snapshot()).unwrap();

    let engine = MockEngine::new();
    let agent = Agent::new(&engine, Box::new(JsonFileStore::new(&path)));
    assert_eq!(agent.memory().games_played, 3);
    assert_eq!(agent.memory().attacks["scout_flood"].attempts, 1);
}

#[test]
fn broken_analysis_still_submits_an_empty_turn() {
    let mut engine = MockEngine::new();
    engine.turn = 7;
    engine.self_health = f64::NAN;

    let mut agent = agent_for(&engine);
    agent.decide_turn(&mut engine);

    assert_eq!(engine.submitted, 1);
    assert!(engine.spawns.is_empty());
}

#[test]
fn rejected_spawns_retry_once_toward_center_then_drop() {
    let mut engine = MockEngine::new();
    engine.rejected.insert(spawn_coord(13));

    let plan = vec![SpawnOrder {
        unit_type: UnitType::Scout,
        location: spawn_coord(13),
        count: 4,
    }];
    execute_plan(&mut engine, &plan);
    assert_eq!(engine.spawns, vec![(UnitType::Scout, spawn_coord(14), 4)]);

    // Both the lane and its fallback refused: the order is dropped silently.
    engine.spawns.clear();
    engine.rejected.insert(spawn_coord(14));
    execute_plan(&mut engine, &plan);
    assert!(engine.spawns.is_empty());
}
