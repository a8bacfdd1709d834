//! The defense build phase.
//!
//! Spends the structure budget set aside by the current [`ThresholdSet`]:
//! phased core layouts first, then reactive placements learned from conceded
//! breaches, then repairs and upgrades, then economy supports with whatever
//! is left. Every placement failure is tolerated silently; the engine is the
//! arbiter of legality.

use crate::adapt::ThresholdSet;
use crate::analyzer::Snapshot;
use crate::engine::{Coord, GameEngine, ResourceKind, Side, UnitType, BOARD_WIDTH, OUR_HALF_TOP};
use crate::memory::PersistentMemory;

/// Nominal structure-point prices used for budget accounting. The engine
/// enforces the real prices; these only pace our spending.
fn nominal_cost(unit_type: UnitType) -> f64 {
    match unit_type {
        UnitType::Wall => 1.0,
        UnitType::Turret => 2.0,
        UnitType::Support => 4.0,
        _ => 0.0,
    }
}

const UPGRADE_COST: f64 = 2.0;
/// Structures below this health fraction get rebuilt in place.
const REBUILD_FLOOR: f64 = 0.5;
/// Structure points beyond which spare supports are worth buying.
const ECONOMY_SURPLUS: f64 = 15.0;
/// Breach count at a single coordinate that triggers a counter build.
const COUNTER_BREACH_FLOOR: u32 = 2;

/// Opening core, built during the first turns.
const OPENING_TURRETS: [Coord; 6] = [
    Coord::new(3, 13),
    Coord::new(24, 13),
    Coord::new(13, 12),
    Coord::new(14, 12),
    Coord::new(7, 11),
    Coord::new(20, 11),
];
const OPENING_WALLS: [Coord; 4] = [
    Coord::new(13, 13),
    Coord::new(14, 13),
    Coord::new(6, 11),
    Coord::new(21, 11),
];
const OPENING_UPGRADES: [Coord; 2] = [Coord::new(13, 13), Coord::new(14, 13)];

/// Early-game fortress ring with overlapping turret cover.
const EARLY_TURRETS: [Coord; 8] = [
    Coord::new(0, 13),
    Coord::new(1, 13),
    Coord::new(26, 13),
    Coord::new(27, 13),
    Coord::new(5, 12),
    Coord::new(22, 12),
    Coord::new(9, 11),
    Coord::new(18, 11),
];
const EARLY_WALLS: [Coord; 6] = [
    Coord::new(4, 12),
    Coord::new(23, 12),
    Coord::new(8, 11),
    Coord::new(19, 11),
    Coord::new(12, 9),
    Coord::new(15, 9),
];

/// Mid-game reinforcement lines and shield supports.
const MID_TURRETS: [Coord; 8] = [
    Coord::new(2, 13),
    Coord::new(25, 13),
    Coord::new(10, 12),
    Coord::new(17, 12),
    Coord::new(6, 11),
    Coord::new(21, 11),
    Coord::new(13, 9),
    Coord::new(14, 9),
];
const MID_SUPPORTS: [Coord; 6] = [
    Coord::new(13, 8),
    Coord::new(14, 8),
    Coord::new(10, 7),
    Coord::new(17, 7),
    Coord::new(12, 6),
    Coord::new(15, 6),
];

/// Late-game fill sweeps these rows for empty cells, front row first.
const LATE_FILL_ROWS: [i32; 4] = [13, 12, 11, 10];
/// Empty fill cells beyond this many become walls instead of turrets.
const LATE_FILL_TURRETS: usize = 20;
const LATE_SUPPORTS: [Coord; 8] = [
    Coord::new(13, 7),
    Coord::new(14, 7),
    Coord::new(11, 6),
    Coord::new(16, 6),
    Coord::new(9, 7),
    Coord::new(18, 7),
    Coord::new(10, 5),
    Coord::new(17, 5),
];

const ECONOMY_SUPPORTS: [Coord; 6] = [
    Coord::new(13, 7),
    Coord::new(14, 7),
    Coord::new(12, 6),
    Coord::new(15, 6),
    Coord::new(11, 7),
    Coord::new(16, 7),
];

struct Budget {
    remaining: f64,
}

impl Budget {
    fn spend_spawn(&mut self, engine: &mut dyn GameEngine, unit_type: UnitType, at: Coord) -> bool {
        let cost = nominal_cost(unit_type);
        if self.remaining < cost {
            return false;
        }
        if engine.attempt_spawn(unit_type, at, 1) {
            self.remaining -= cost;
            true
        } else {
            false
        }
    }

    fn spend_upgrade(&mut self, engine: &mut dyn GameEngine, at: Coord) -> bool {
        if self.remaining < UPGRADE_COST {
            return false;
        }
        if engine.attempt_upgrade(at) {
            self.remaining -= UPGRADE_COST;
            true
        } else {
            false
        }
    }
}

/// Runs the whole defense phase for this turn. Returns the number of
/// successful engine actions, for logging only.
pub fn build_defenses(
    engine: &mut dyn GameEngine,
    snapshot: &Snapshot,
    memory: &PersistentMemory,
    thresholds: &ThresholdSet,
) -> u32 {
    let pool = engine.resource(ResourceKind::Structure, Side::Us);
    let mut budget = Budget {
        remaining: pool * thresholds.defense_budget_ratio,
    };
    let mut actions = 0;

    actions += phase_layout(engine, snapshot, &mut budget);
    actions += counter_breaches(engine, memory, &mut budget);
    actions += rebuild_damaged(engine, snapshot, &mut budget);
    actions += upgrade_turrets(engine, snapshot, &mut budget);

    // Spare structure points become shielding economy.
    if engine.resource(ResourceKind::Structure, Side::Us) > ECONOMY_SURPLUS {
        for support in ECONOMY_SUPPORTS {
            if budget.spend_spawn(engine, UnitType::Support, support) {
                actions += 1;
            }
            if budget.spend_upgrade(engine, support) {
                actions += 1;
            }
        }
    }

    tracing::debug!(turn = snapshot.turn, actions, "defense phase complete");
    actions
}

fn phase_layout(engine: &mut dyn GameEngine, snapshot: &Snapshot, budget: &mut Budget) -> u32 {
    let turn = snapshot.turn;
    let mut actions = 0;
    if turn < 3 {
        for at in OPENING_TURRETS {
            actions += budget.spend_spawn(engine, UnitType::Turret, at) as u32;
        }
        for at in OPENING_WALLS {
            actions += budget.spend_spawn(engine, UnitType::Wall, at) as u32;
        }
        for at in OPENING_UPGRADES {
            actions += budget.spend_upgrade(engine, at) as u32;
        }
    } else if turn < 8 {
        for at in EARLY_TURRETS {
            actions += budget.spend_spawn(engine, UnitType::Turret, at) as u32;
        }
        for at in EARLY_WALLS {
            actions += budget.spend_spawn(engine, UnitType::Wall, at) as u32;
        }
        for at in OPENING_TURRETS {
            actions += budget.spend_upgrade(engine, at) as u32;
        }
    } else if turn < 15 {
        for at in MID_TURRETS {
            actions += budget.spend_spawn(engine, UnitType::Turret, at) as u32;
        }
        for at in MID_SUPPORTS {
            actions += budget.spend_spawn(engine, UnitType::Support, at) as u32;
            actions += budget.spend_upgrade(engine, at) as u32;
        }
    } else {
        actions += late_fortify(engine, snapshot, budget);
    }
    actions
}

/// Maximum fortification from turn 15 on: every empty cell in the front rows
/// is filled (turrets first, then walls), the support grid is extended, and
/// every structure still un-upgraded gets an upgrade attempt.
fn late_fortify(engine: &mut dyn GameEngine, snapshot: &Snapshot, budget: &mut Budget) -> u32 {
    let mut actions = 0;
    let mut empty = Vec::new();
    for y in LATE_FILL_ROWS {
        for x in 0..BOARD_WIDTH {
            let at = Coord::new(x, y);
            if !engine.is_occupied(at) {
                empty.push(at);
            }
        }
    }
    for (slot, at) in empty.into_iter().enumerate() {
        let unit_type = if slot < LATE_FILL_TURRETS {
            UnitType::Turret
        } else {
            UnitType::Wall
        };
        actions += budget.spend_spawn(engine, unit_type, at) as u32;
    }

    for at in LATE_SUPPORTS {
        actions += budget.spend_spawn(engine, UnitType::Support, at) as u32;
    }

    let standing: Vec<Coord> = snapshot
        .ours
        .wall_positions
        .iter()
        .chain(snapshot.ours.support_positions.iter())
        .copied()
        .chain(snapshot.ours.turret_positions.iter().map(|(at, _)| *at))
        .collect();
    for at in standing {
        actions += budget.spend_upgrade(engine, at) as u32;
    }
    actions
}

/// Turrets over entry points the opponent keeps breaking through, plus a
/// preemptive pair at their single favourite.
fn counter_breaches(
    engine: &mut dyn GameEngine,
    memory: &PersistentMemory,
    budget: &mut Budget,
) -> u32 {
    let mut actions = 0;
    for breach in memory.repeat_breaches_taken(COUNTER_BREACH_FLOOR) {
        for at in counter_positions(breach) {
            actions += budget.spend_spawn(engine, UnitType::Turret, at) as u32;
        }
    }
    if let Some((hottest, _)) = memory.hottest_breach_taken() {
        let guard = Coord::new(hottest.x, (hottest.y + 1).min(OUR_HALF_TOP));
        actions += budget.spend_spawn(engine, UnitType::Turret, guard) as u32;
        actions += budget.spend_spawn(
            engine,
            UnitType::Wall,
            Coord::new((hottest.x - 1).max(0), guard.y),
        ) as u32;
    }
    actions
}

fn counter_positions(breach: Coord) -> [Coord; 2] {
    let y = (breach.y + 1).min(OUR_HALF_TOP);
    [
        Coord::new(breach.x, y),
        Coord::new((breach.x + 1).min(27), y),
    ]
}

/// Re-place own structures that have fallen below half health. The engine
/// refunds nothing; the replacement lands next turn in the same spot.
fn rebuild_damaged(engine: &mut dyn GameEngine, snapshot: &Snapshot, budget: &mut Budget) -> u32 {
    let mut actions = 0;
    let mut rebuild = |unit_type: UnitType, at: Coord, engine: &mut dyn GameEngine| -> u32 {
        for unit in engine.units_at(at) {
            if unit.owner == Side::Us
                && unit.unit_type == unit_type
                && unit.max_health > 0.0
                && unit.health / unit.max_health < REBUILD_FLOOR
            {
                return budget.spend_spawn(engine, unit_type, at) as u32;
            }
        }
        0
    };
    for at in snapshot.ours.wall_positions.clone() {
        actions += rebuild(UnitType::Wall, at, engine);
    }
    for (at, _) in snapshot.ours.turret_positions.clone() {
        actions += rebuild(UnitType::Turret, at, engine);
    }
    actions
}

fn upgrade_turrets(engine: &mut dyn GameEngine, snapshot: &Snapshot, budget: &mut Budget) -> u32 {
    let mut actions = 0;
    for (at, upgraded) in snapshot.ours.turret_positions.clone() {
        if !upgraded {
            actions += budget.spend_upgrade(engine, at) as u32;
        }
    }
    actions
}
