//! Per-column danger estimation for attack routing.
//!
//! Two estimators share one interface: a path-walking variant used when the
//! engine exposes `path_to_edge`, and a turret-density heuristic fallback.
//! The choice is made once at agent construction from a capability probe,
//! never re-checked mid-game. Estimates only ever lower confidence in a
//! column; a failed lookup reads as safe (0.0) so a bad query can never
//! block the turn.

use crate::engine::{spawn_coord, Coord, GameEngine, Side, UnitType, BOARD_WIDTH, ENEMY_HALF_BOTTOM};

/// Horizontal reach, in columns, credited to an enemy turret by the density
/// heuristic.
const TURRET_COLUMN_RADIUS: i32 = 3;
/// Board range a turret threatens along a walked path.
const TURRET_PATH_RANGE: i32 = 3;
/// Base damage per frame a turret deals to a passing unit.
const TURRET_DAMAGE: f64 = 5.0;

/// Fragility multipliers: how much of the raw column danger each unit class
/// actually experiences.
fn class_multiplier(unit_type: UnitType) -> f64 {
    match unit_type {
        UnitType::Scout => 1.0,
        UnitType::Demolisher => 0.5,
        UnitType::Interceptor => 0.2,
        _ => 1.0,
    }
}

pub trait DangerEstimator {
    /// Rebuild the heatmap for this turn. Never fails.
    fn update(&mut self, engine: &dyn GameEngine);
    /// Danger a unit of `unit_type` expects when deployed at `column`.
    /// Always >= 0.0; unknown columns read as 0.0.
    fn estimate(&self, column: i32, unit_type: UnitType) -> f64;
}

/// Picks the estimator once from the engine's pathing capability.
pub fn select_estimator(engine: &dyn GameEngine) -> Box<dyn DangerEstimator> {
    let probe = spawn_coord(13);
    if engine.path_to_edge(probe).is_some() {
        tracing::debug!("danger estimator: path simulation available");
        Box::new(PathSimEstimator::default())
    } else {
        tracing::debug!("danger estimator: falling back to turret density");
        Box::new(TurretDensityEstimator::default())
    }
}

/// Walks the engine's predicted path from every deploy column and sums turret
/// damage along it.
#[derive(Default)]
pub struct PathSimEstimator {
    column_damage: [f64; BOARD_WIDTH as usize],
}

impl PathSimEstimator {
    fn path_damage(engine: &dyn GameEngine, start: Coord) -> f64 {
        let Some(path) = engine.path_to_edge(start) else {
            return 0.0;
        };
        let mut total = 0.0;
        for step in &path {
            for dx in -TURRET_PATH_RANGE..=TURRET_PATH_RANGE {
                for dy in -TURRET_PATH_RANGE..=TURRET_PATH_RANGE {
                    let probe = Coord::new(step.x + dx, step.y + dy);
                    if probe.x < 0 || probe.x >= BOARD_WIDTH {
                        continue;
                    }
                    for unit in engine.units_at(probe) {
                        if unit.owner == Side::Them && unit.unit_type == UnitType::Turret {
                            total += if unit.upgraded {
                                TURRET_DAMAGE * 2.0
                            } else {
                                TURRET_DAMAGE
                            };
                        }
                    }
                }
            }
        }
        total
    }
}

impl DangerEstimator for PathSimEstimator {
    fn update(&mut self, engine: &dyn GameEngine) {
        for column in 0..BOARD_WIDTH {
            self.column_damage[column as usize] = Self::path_damage(engine, spawn_coord(column));
        }
    }

    fn estimate(&self, column: i32, unit_type: UnitType) -> f64 {
        if column < 0 || column >= BOARD_WIDTH {
            return 0.0;
        }
        self.column_damage[column as usize] * class_multiplier(unit_type)
    }
}

/// Density fallback: every enemy turret projects weight onto nearby columns.
#[derive(Default)]
pub struct TurretDensityEstimator {
    column_density: [f64; BOARD_WIDTH as usize],
}

impl DangerEstimator for TurretDensityEstimator {
    fn update(&mut self, engine: &dyn GameEngine) {
        self.column_density = [0.0; BOARD_WIDTH as usize];
        for x in 0..BOARD_WIDTH {
            for y in ENEMY_HALF_BOTTOM..=crate::engine::BOARD_TOP {
                for unit in engine.units_at(Coord::new(x, y)) {
                    if unit.owner != Side::Them || unit.unit_type != UnitType::Turret {
                        continue;
                    }
                    let weight = if unit.upgraded { 2.0 } else { 1.0 };
                    let lo = (x - TURRET_COLUMN_RADIUS).max(0);
                    let hi = (x + TURRET_COLUMN_RADIUS).min(BOARD_WIDTH - 1);
                    for column in lo..=hi {
                        self.column_density[column as usize] += weight;
                    }
                }
            }
        }
    }

    fn estimate(&self, column: i32, unit_type: UnitType) -> f64 {
        if column < 0 || column >= BOARD_WIDTH {
            return 0.0;
        }
        self.column_density[column as usize] * class_multiplier(unit_type)
    }
}

/// Ranks all deploy columns by ascending danger for the given unit class.
pub fn columns_by_safety(estimator: &dyn DangerEstimator, unit_type: UnitType) -> Vec<i32> {
    let mut columns: Vec<i32> = (0..BOARD_WIDTH).collect();
    columns.sort_by(|a, b| {
        estimator
            .estimate(*a, unit_type)
            .total_cmp(&estimator.estimate(*b, unit_type))
    });
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::MockEngine;

    #[test]
    fn density_doubles_for_upgraded_turrets() {
        let mut engine = MockEngine::new();
        engine.place(Coord::new(10, 15), Side::Them, UnitType::Turret, false);
        engine.place(Coord::new(20, 15), Side::Them, UnitType::Turret, true);

        let mut estimator = TurretDensityEstimator::default();
        estimator.update(&engine);

        assert_eq!(estimator.estimate(10, UnitType::Scout), 1.0);
        assert_eq!(estimator.estimate(20, UnitType::Scout), 2.0);
        // Radius 3 reaches neighbours, not the far side of the board.
        assert_eq!(estimator.estimate(13, UnitType::Scout), 1.0);
        assert_eq!(estimator.estimate(0, UnitType::Scout), 0.0);
    }

    #[test]
    fn class_multipliers_scale_the_same_density() {
        let mut engine = MockEngine::new();
        engine.place(Coord::new(10, 15), Side::Them, UnitType::Turret, true);

        let mut estimator = TurretDensityEstimator::default();
        estimator.update(&engine);

        let scout = estimator.estimate(10, UnitType::Scout);
        assert_eq!(estimator.estimate(10, UnitType::Demolisher), scout * 0.5);
        assert_eq!(estimator.estimate(10, UnitType::Interceptor), scout * 0.2);
    }

    #[test]
    fn out_of_range_columns_read_as_safe() {
        let estimator = TurretDensityEstimator::default();
        assert_eq!(estimator.estimate(-1, UnitType::Scout), 0.0);
        assert_eq!(estimator.estimate(BOARD_WIDTH, UnitType::Scout), 0.0);
    }

    #[test]
    fn capability_probe_selects_density_fallback_without_pathing() {
        let engine = MockEngine::new();
        let mut estimator = select_estimator(&engine);
        estimator.update(&engine);
        assert_eq!(estimator.estimate(5, UnitType::Scout), 0.0);
    }

    #[test]
    fn safety_ranking_prefers_uncovered_columns() {
        let mut engine = MockEngine::new();
        engine.place(Coord::new(3, 15), Side::Them, UnitType::Turret, true);

        let mut estimator = TurretDensityEstimator::default();
        estimator.update(&engine);

        let ranked = columns_by_safety(&estimator, UnitType::Scout);
        let covered_rank = ranked.iter().position(|c| *c == 3).unwrap();
        let open_rank = ranked.iter().position(|c| *c == 20).unwrap();
        assert!(open_rank < covered_rank);
    }
}
