//! Scripted engine mock shared by unit and integration tests.
//!
//! Deliberately permissive: legality checks live in the real engine, so the
//! mock records every request and only rejects locations explicitly marked
//! as rejected. Kept in the library (not `tests/`) so `#[cfg(test)]` modules
//! and integration tests share one implementation.

use std::collections::{HashMap, HashSet};

use crate::analyzer::{Snapshot, StateAnalyzer};
use crate::engine::{
    BreachEvent, Coord, GameEngine, PlacedUnit, ResourceKind, Side, UnitType, BOARD_TOP,
};

#[derive(Clone)]
pub struct MockEngine {
    pub turn: u32,
    pub self_health: f64,
    pub enemy_health: f64,
    pub structure_points: f64,
    pub mobile_points: f64,
    pub their_structure_points: f64,
    pub their_mobile_points: f64,
    pub board: HashMap<Coord, Vec<PlacedUnit>>,
    /// Locations where spawn requests are refused.
    pub rejected: HashSet<Coord>,
    /// Whether `path_to_edge` answers at all.
    pub pathing: bool,
    pub breaches: Vec<BreachEvent>,
    pub spawns: Vec<(UnitType, Coord, u32)>,
    pub upgrades: Vec<Coord>,
    pub submitted: u32,
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            turn: 0,
            self_health: 30.0,
            enemy_health: 30.0,
            structure_points: 20.0,
            mobile_points: 10.0,
            their_structure_points: 20.0,
            their_mobile_points: 5.0,
            board: HashMap::new(),
            rejected: HashSet::new(),
            pathing: false,
            breaches: Vec::new(),
            spawns: Vec::new(),
            upgrades: Vec::new(),
            submitted: 0,
        }
    }

    pub fn place(&mut self, at: Coord, owner: Side, unit_type: UnitType, upgraded: bool) {
        let health = if upgraded { 120.0 } else { 60.0 };
        self.place_with_health(at, owner, unit_type, health, health);
        if upgraded {
            if let Some(unit) = self.board.get_mut(&at).and_then(|v| v.last_mut()) {
                unit.upgraded = true;
            }
        }
    }

    pub fn place_with_health(
        &mut self,
        at: Coord,
        owner: Side,
        unit_type: UnitType,
        health: f64,
        max_health: f64,
    ) {
        self.board.entry(at).or_default().push(PlacedUnit {
            owner,
            unit_type,
            health,
            max_health,
            upgraded: false,
        });
    }

    /// Total units requested for the given mobile class.
    pub fn spawned_count(&self, unit_type: UnitType) -> u32 {
        self.spawns
            .iter()
            .filter(|(t, _, _)| *t == unit_type)
            .map(|(_, _, count)| *count)
            .sum()
    }

    pub fn offensive_spawn_total(&self) -> u32 {
        self.spawns
            .iter()
            .filter(|(t, _, _)| !t.is_structure())
            .map(|(_, _, count)| *count)
            .sum()
    }
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl GameEngine for MockEngine {
    fn resource(&self, kind: ResourceKind, side: Side) -> f64 {
        match (kind, side) {
            (ResourceKind::Structure, Side::Us) => self.structure_points,
            (ResourceKind::Mobile, Side::Us) => self.mobile_points,
            (ResourceKind::Structure, Side::Them) => self.their_structure_points,
            (ResourceKind::Mobile, Side::Them) => self.their_mobile_points,
        }
    }

    fn can_spawn(&self, _unit_type: UnitType, location: Coord) -> bool {
        !self.rejected.contains(&location)
    }

    fn attempt_spawn(&mut self, unit_type: UnitType, location: Coord, count: u32) -> bool {
        if self.rejected.contains(&location) {
            return false;
        }
        self.spawns.push((unit_type, location, count));
        true
    }

    fn attempt_upgrade(&mut self, location: Coord) -> bool {
        if self.rejected.contains(&location) {
            return false;
        }
        self.upgrades.push(location);
        true
    }

    fn is_occupied(&self, location: Coord) -> bool {
        self.board
            .get(&location)
            .map(|units| !units.is_empty())
            .unwrap_or(false)
    }

    fn units_at(&self, location: Coord) -> Vec<PlacedUnit> {
        self.board.get(&location).cloned().unwrap_or_default()
    }

    fn turn_number(&self) -> u32 {
        self.turn
    }

    fn self_health(&self) -> f64 {
        self.self_health
    }

    fn enemy_health(&self) -> f64 {
        self.enemy_health
    }

    fn path_to_edge(&self, location: Coord) -> Option<Vec<Coord>> {
        if !self.pathing {
            return None;
        }
        // Straight vertical walk; good enough for estimator tests.
        Some(
            (location.y..=BOARD_TOP)
                .map(|y| Coord::new(location.x, y))
                .collect(),
        )
    }

    fn submit_turn(&mut self) {
        self.submitted += 1;
    }

    fn breach_events(&self) -> Vec<BreachEvent> {
        self.breaches.clone()
    }
}

/// Snapshot of the mock board as seen at `turn`, through a fresh analyzer.
pub fn snapshot_at_turn(engine: &MockEngine, turn: u32) -> Snapshot {
    let mut at_turn = engine.clone();
    at_turn.turn = turn;
    StateAnalyzer::new()
        .analyze(&at_turn)
        .expect("mock analysis never fails")
}
