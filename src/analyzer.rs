//! Per-turn board analysis.
//!
//! One scan of each half per turn, tabulated into an immutable [`Snapshot`].
//! The analyzer also owns the small rolling histories (enemy resource levels,
//! health differential) and the health-diff breach counters that survive
//! between turns.

use std::collections::VecDeque;

use crate::engine::{
    Coord, GameEngine, PhaseError, ResourceKind, Side, UnitType, BOARD_TOP, BOARD_WIDTH,
    ENEMY_HALF_BOTTOM, OUR_HALF_TOP,
};

/// Bounded sample window, oldest evicted first. Memory use is O(capacity)
/// regardless of game length.
#[derive(Clone, Debug)]
pub struct RollingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, value: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }

    pub fn std_dev(&self) -> f64 {
        if self.samples.len() < 2 {
            return 0.0;
        }
        let mean = self.mean();
        let var = self
            .samples
            .iter()
            .map(|s| (s - mean) * (s - mean))
            .sum::<f64>()
            / self.samples.len() as f64;
        var.sqrt()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().copied()
    }

    pub fn last(&self) -> Option<f64> {
        self.samples.back().copied()
    }
}

/// Row-band position of a structure within its owner's half.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Band {
    Front,
    Mid,
    Back,
}

fn band_for(side: Side, y: i32) -> Band {
    match side {
        Side::Us => match y {
            10..=13 => Band::Front,
            5..=9 => Band::Mid,
            _ => Band::Back,
        },
        Side::Them => match y {
            14..=17 => Band::Front,
            18..=22 => Band::Mid,
            _ => Band::Back,
        },
    }
}

/// Structure tabulation for one side's half of the board.
#[derive(Clone, Debug, Default)]
pub struct StructureSummary {
    pub walls: u32,
    pub supports: u32,
    pub turrets: u32,
    pub total_health: f64,
    pub max_health: f64,
    pub upgrades: u32,
    pub front: u32,
    pub mid: u32,
    pub back: u32,
    pub wall_positions: Vec<Coord>,
    pub support_positions: Vec<Coord>,
    pub turret_positions: Vec<(Coord, bool)>,
}

impl StructureSummary {
    pub fn total(&self) -> u32 {
        self.walls + self.supports + self.turrets
    }

    /// Fraction of structure health remaining. Neutral 1.0 with no structures
    /// so downstream scoring never divides by zero.
    pub fn health_pct(&self) -> f64 {
        if self.max_health > 0.0 {
            self.total_health / self.max_health
        } else {
            1.0
        }
    }

    pub fn upgrade_ratio(&self) -> f64 {
        let total = self.total();
        if total > 0 {
            self.upgrades as f64 / total as f64
        } else {
            0.0
        }
    }

    /// Structures per cell of the half-board.
    pub fn density(&self) -> f64 {
        self.total() as f64 / (BOARD_WIDTH * 14) as f64
    }

    /// Summed turret output, upgraded turrets counting double.
    pub fn firepower(&self) -> f64 {
        self.turret_positions
            .iter()
            .map(|(_, upgraded)| if *upgraded { 2.0 } else { 1.0 })
            .sum()
    }
}

/// Immutable per-turn view of the board. Rebuilt every turn, discarded at
/// turn end.
#[derive(Clone, Debug)]
pub struct Snapshot {
    pub turn: u32,
    pub ours: StructureSummary,
    pub theirs: StructureSummary,
    pub our_structure_points: f64,
    pub our_mobile_points: f64,
    pub their_structure_points: f64,
    pub their_mobile_points: f64,
    pub self_health: f64,
    pub enemy_health: f64,
    /// Health we lost since the previous analysis pass.
    pub breaches_taken: u32,
    /// Health the opponent lost since the previous analysis pass.
    pub breaches_dealt: u32,
}

/// Long-lived analyzer state. Lives for one game.
pub struct StateAnalyzer {
    prev_self_health: f64,
    prev_enemy_health: f64,
    pub enemy_mobile_history: RollingWindow,
    pub health_diff_history: RollingWindow,
    pub total_breaches_taken: u32,
    pub total_breaches_dealt: u32,
}

const HISTORY_CAPACITY: usize = 20;
/// Both players open at this health.
pub const STARTING_HEALTH: f64 = 30.0;

impl StateAnalyzer {
    pub fn new() -> Self {
        Self {
            prev_self_health: STARTING_HEALTH,
            prev_enemy_health: STARTING_HEALTH,
            enemy_mobile_history: RollingWindow::new(HISTORY_CAPACITY),
            health_diff_history: RollingWindow::new(HISTORY_CAPACITY),
            total_breaches_taken: 0,
            total_breaches_dealt: 0,
        }
    }

    fn scan_half(engine: &dyn GameEngine, side: Side) -> StructureSummary {
        let (y_lo, y_hi) = match side {
            Side::Us => (0, OUR_HALF_TOP),
            Side::Them => (ENEMY_HALF_BOTTOM, BOARD_TOP),
        };
        let mut summary = StructureSummary::default();
        for x in 0..BOARD_WIDTH {
            for y in y_lo..=y_hi {
                let here = Coord::new(x, y);
                for unit in engine.units_at(here) {
                    if unit.owner != side || !unit.unit_type.is_structure() {
                        continue;
                    }
                    summary.total_health += unit.health;
                    summary.max_health += unit.max_health;
                    if unit.upgraded {
                        summary.upgrades += 1;
                    }
                    match band_for(side, y) {
                        Band::Front => summary.front += 1,
                        Band::Mid => summary.mid += 1,
                        Band::Back => summary.back += 1,
                    }
                    match unit.unit_type {
                        UnitType::Wall => {
                            summary.walls += 1;
                            summary.wall_positions.push(here);
                        }
                        UnitType::Support => {
                            summary.supports += 1;
                            summary.support_positions.push(here);
                        }
                        UnitType::Turret => {
                            summary.turrets += 1;
                            summary.turret_positions.push((here, unit.upgraded));
                        }
                        _ => {}
                    }
                }
            }
        }
        summary
    }

    /// Build this turn's snapshot and advance the rolling histories.
    pub fn analyze(&mut self, engine: &dyn GameEngine) -> Result<Snapshot, PhaseError> {
        let turn = engine.turn_number();
        let self_health = engine.self_health();
        let enemy_health = engine.enemy_health();
        if !self_health.is_finite() || !enemy_health.is_finite() {
            return Err(PhaseError::MissingData("health totals"));
        }

        let our_structure_points = engine.resource(ResourceKind::Structure, Side::Us);
        let our_mobile_points = engine.resource(ResourceKind::Mobile, Side::Us);
        let their_structure_points = engine.resource(ResourceKind::Structure, Side::Them);
        let their_mobile_points = engine.resource(ResourceKind::Mobile, Side::Them);
        let pools = [
            our_structure_points,
            our_mobile_points,
            their_structure_points,
            their_mobile_points,
        ];
        if pools.iter().any(|pool| !pool.is_finite()) {
            return Err(PhaseError::Analysis {
                phase: "resource scan",
                detail: format!("engine reported a non-finite resource pool: {pools:?}"),
            });
        }

        let breaches_taken = (self.prev_self_health - self_health).max(0.0).round() as u32;
        let breaches_dealt = (self.prev_enemy_health - enemy_health).max(0.0).round() as u32;
        self.total_breaches_taken += breaches_taken;
        self.total_breaches_dealt += breaches_dealt;

        let snapshot = Snapshot {
            turn,
            ours: Self::scan_half(engine, Side::Us),
            theirs: Self::scan_half(engine, Side::Them),
            our_structure_points,
            our_mobile_points,
            their_structure_points,
            their_mobile_points,
            self_health,
            enemy_health,
            breaches_taken,
            breaches_dealt,
        };

        self.enemy_mobile_history.push(snapshot.their_mobile_points);
        self.health_diff_history.push(self_health - enemy_health);
        self.prev_self_health = self_health;
        self.prev_enemy_health = enemy_health;

        Ok(snapshot)
    }
}

impl Default for StateAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::MockEngine;

    #[test]
    fn rolling_window_evicts_oldest_first() {
        let mut window = RollingWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            window.push(v);
        }
        assert_eq!(window.len(), 3);
        assert_eq!(window.mean(), 3.0);
    }

    #[test]
    fn guarded_ratios_default_neutral_on_empty_board() {
        let summary = StructureSummary::default();
        assert_eq!(summary.health_pct(), 1.0);
        assert_eq!(summary.upgrade_ratio(), 0.0);
        assert_eq!(summary.density(), 0.0);
    }

    #[test]
    fn scan_tabulates_counts_and_bands_per_side() {
        let mut engine = MockEngine::new();
        engine.place(Coord::new(5, 13), Side::Us, UnitType::Turret, true);
        engine.place(Coord::new(6, 2), Side::Us, UnitType::Wall, false);
        engine.place(Coord::new(10, 14), Side::Them, UnitType::Support, false);
        engine.place(Coord::new(11, 25), Side::Them, UnitType::Turret, false);

        let mut analyzer = StateAnalyzer::new();
        let snapshot = analyzer.analyze(&engine).unwrap();

        assert_eq!(snapshot.ours.turrets, 1);
        assert_eq!(snapshot.ours.walls, 1);
        assert_eq!(snapshot.ours.upgrades, 1);
        assert_eq!(snapshot.ours.front, 1);
        assert_eq!(snapshot.ours.back, 1);
        assert_eq!(snapshot.theirs.supports, 1);
        assert_eq!(snapshot.theirs.front, 1);
        assert_eq!(snapshot.theirs.back, 1);
        assert_eq!(snapshot.theirs.firepower(), 1.0);
    }

    #[test]
    fn breach_counters_diff_health_between_passes() {
        let mut engine = MockEngine::new();
        let mut analyzer = StateAnalyzer::new();

        let first = analyzer.analyze(&engine).unwrap();
        assert_eq!(first.breaches_taken, 0);

        engine.self_health = 27.0;
        engine.enemy_health = 28.0;
        let second = analyzer.analyze(&engine).unwrap();
        assert_eq!(second.breaches_taken, 3);
        assert_eq!(second.breaches_dealt, 2);
        assert_eq!(analyzer.total_breaches_taken, 3);

        // No further change, no further counting.
        let third = analyzer.analyze(&engine).unwrap();
        assert_eq!(third.breaches_taken, 0);
    }

    #[test]
    fn non_finite_resource_pools_fail_analysis() {
        let mut engine = MockEngine::new();
        engine.mobile_points = f64::INFINITY;
        let error = StateAnalyzer::new().analyze(&engine).unwrap_err();
        assert!(matches!(error, PhaseError::Analysis { phase: "resource scan", .. }));
    }
}
