//! Micro planners: turning "spend N on archetype X" into concrete spawn
//! orders.
//!
//! Every planner is a pure function of (snapshot, danger estimates, amount,
//! mode) to a [`SpawnPlan`]. Planners never touch the engine; execution and
//! its fallback retries live in the agent.

use crate::adapt::StrategyMode;
use crate::analyzer::Snapshot;
use crate::danger::{columns_by_safety, DangerEstimator};
use crate::engine::{spawn_coord, Coord, UnitType, BOARD_WIDTH};
use crate::playbook::{Archetype, ArchetypeKind};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnOrder {
    pub unit_type: UnitType,
    pub location: Coord,
    pub count: u32,
}

/// Ordered spawn instructions, consumed once by the executor.
pub type SpawnPlan = Vec<SpawnOrder>;

/// Demolishers skip columns above this danger when playing defensively.
const DEMO_DANGER_CEILING: f64 = 6.0;
/// Central columns used by the defensive interceptor spread.
const INTERCEPTOR_SCREEN: [i32; 4] = [11, 13, 14, 16];
/// Flank column pairs for the pincer split.
const PINCER_FLANKS: [(i32, i32); 2] = [(3, 5), (22, 24)];

pub fn plan(
    archetype: &Archetype,
    amount: f64,
    snapshot: &Snapshot,
    danger: &dyn DangerEstimator,
    mode: StrategyMode,
) -> SpawnPlan {
    match archetype.kind {
        ArchetypeKind::ScoutFlood => plan_scouts(amount, danger, mode),
        ArchetypeKind::DemoBreach | ArchetypeKind::SurgicalStrike | ArchetypeKind::MixedAssault => {
            plan_demolisher_escort(archetype, amount, snapshot, danger, mode)
        }
        ArchetypeKind::InterceptorDeny => plan_interceptors(amount, danger, mode),
        ArchetypeKind::PincerAttack => plan_pincer(amount),
    }
}

/// Scout placement over the safest deploy columns.
///
/// Defensive modes concentrate everything on the single safest lane;
/// pressing modes fan out over the three safest with a decreasing share;
/// otherwise two per lane until the budget runs out, remainder on the safest.
pub fn plan_scouts(amount: f64, danger: &dyn DangerEstimator, mode: StrategyMode) -> SpawnPlan {
    let scouts = amount.floor() as u32;
    if scouts == 0 {
        return Vec::new();
    }
    let ranked = columns_by_safety(danger, UnitType::Scout);
    let mut plan = Vec::new();

    match mode {
        StrategyMode::Defensive | StrategyMode::Desperate => {
            plan.push(SpawnOrder {
                unit_type: UnitType::Scout,
                location: spawn_coord(ranked[0]),
                count: scouts,
            });
        }
        StrategyMode::Press | StrategyMode::AllIn => {
            let shares = [0.5, 0.3, 0.2];
            let mut remaining = scouts;
            for (column, share) in ranked.iter().take(3).zip(shares) {
                let count = ((scouts as f64 * share).round() as u32).min(remaining);
                if count > 0 {
                    plan.push(SpawnOrder {
                        unit_type: UnitType::Scout,
                        location: spawn_coord(*column),
                        count,
                    });
                    remaining -= count;
                }
            }
            if remaining > 0 {
                plan.push(SpawnOrder {
                    unit_type: UnitType::Scout,
                    location: spawn_coord(ranked[0]),
                    count: remaining,
                });
            }
        }
        _ => {
            let mut remaining = scouts;
            for column in ranked.iter() {
                if remaining == 0 {
                    break;
                }
                let count = remaining.min(2);
                plan.push(SpawnOrder {
                    unit_type: UnitType::Scout,
                    location: spawn_coord(*column),
                    count,
                });
                remaining -= count;
                if plan.len() >= 4 {
                    break;
                }
            }
            if remaining > 0 {
                plan.push(SpawnOrder {
                    unit_type: UnitType::Scout,
                    location: spawn_coord(ranked[0]),
                    count: remaining,
                });
            }
        }
    }
    plan
}

/// Demolishers toward the densest enemy columns, scouts escorting with the
/// leftover budget.
pub fn plan_demolisher_escort(
    archetype: &Archetype,
    amount: f64,
    snapshot: &Snapshot,
    danger: &dyn DangerEstimator,
    mode: StrategyMode,
) -> SpawnPlan {
    let demo_budget = amount * archetype.demolisher_ratio;
    let demolishers = (demo_budget / UnitType::Demolisher.mobile_cost()).floor() as u32;

    // Rank enemy columns by raw structure count, densest first.
    let mut column_counts = [0u32; BOARD_WIDTH as usize];
    for position in snapshot
        .theirs
        .wall_positions
        .iter()
        .chain(snapshot.theirs.support_positions.iter())
    {
        column_counts[position.x as usize] += 1;
    }
    for (position, _) in &snapshot.theirs.turret_positions {
        column_counts[position.x as usize] += 1;
    }
    let mut ranked: Vec<i32> = (0..BOARD_WIDTH).collect();
    ranked.sort_by_key(|c| std::cmp::Reverse(column_counts[*c as usize]));

    let mut plan = Vec::new();
    let mut placed = 0;
    for column in ranked {
        if placed >= demolishers {
            break;
        }
        if mode == StrategyMode::Defensive
            && danger.estimate(column, UnitType::Demolisher) > DEMO_DANGER_CEILING
        {
            continue;
        }
        plan.push(SpawnOrder {
            unit_type: UnitType::Demolisher,
            location: spawn_coord(column),
            count: 1,
        });
        placed += 1;
    }

    let spent = placed as f64 * UnitType::Demolisher.mobile_cost();
    let escort_budget = (amount - spent).max(0.0);
    plan.extend(plan_scouts(escort_budget, danger, mode));
    plan
}

/// Offensive modes concentrate interceptors on the clearest lane; defensive
/// modes spread them across the fixed central screen.
pub fn plan_interceptors(
    amount: f64,
    danger: &dyn DangerEstimator,
    mode: StrategyMode,
) -> SpawnPlan {
    let interceptors = amount.floor() as u32;
    if interceptors == 0 {
        return Vec::new();
    }
    match mode {
        StrategyMode::Defensive | StrategyMode::Desperate => {
            let per_column = interceptors / INTERCEPTOR_SCREEN.len() as u32;
            let mut leftover = interceptors % INTERCEPTOR_SCREEN.len() as u32;
            let mut plan = Vec::new();
            for column in INTERCEPTOR_SCREEN {
                let extra = if leftover > 0 {
                    leftover -= 1;
                    1
                } else {
                    0
                };
                let count = per_column + extra;
                if count > 0 {
                    plan.push(SpawnOrder {
                        unit_type: UnitType::Interceptor,
                        location: spawn_coord(column),
                        count,
                    });
                }
            }
            plan
        }
        _ => {
            let column = columns_by_safety(danger, UnitType::Interceptor)[0];
            vec![SpawnOrder {
                unit_type: UnitType::Interceptor,
                location: spawn_coord(column),
                count: interceptors,
            }]
        }
    }
}

/// Even split across the two flank pairs, each flank roughly 70/30 scouts to
/// demolishers.
pub fn plan_pincer(amount: f64) -> SpawnPlan {
    let per_flank = amount / 2.0;
    let mut plan = Vec::new();
    for (scout_col, demo_col) in PINCER_FLANKS {
        let scouts = (per_flank * 0.7).floor() as u32;
        let demolishers =
            (per_flank * 0.3 / UnitType::Demolisher.mobile_cost()).floor() as u32;
        if scouts > 0 {
            plan.push(SpawnOrder {
                unit_type: UnitType::Scout,
                location: spawn_coord(scout_col),
                count: scouts,
            });
        }
        if demolishers > 0 {
            plan.push(SpawnOrder {
                unit_type: UnitType::Demolisher,
                location: spawn_coord(demo_col),
                count: demolishers,
            });
        }
    }
    plan
}

/// Total mobile points a plan would spend.
pub fn plan_cost(plan: &SpawnPlan) -> f64 {
    plan.iter()
        .map(|order| order.unit_type.mobile_cost() * order.count as f64)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::danger::TurretDensityEstimator;
    use crate::engine::{Coord, Side};
    use crate::playbook::archetype_by_id;
    use crate::testkit::{snapshot_at_turn, MockEngine};

    fn flat_danger() -> TurretDensityEstimator {
        TurretDensityEstimator::default()
    }

    #[test]
    fn defensive_scouts_concentrate_on_one_lane() {
        let plan = plan_scouts(9.0, &flat_danger(), StrategyMode::Defensive);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].count, 9);
    }

    #[test]
    fn press_scouts_fan_out_with_decreasing_shares() {
        let plan = plan_scouts(10.0, &flat_danger(), StrategyMode::Press);
        assert!(plan.len() >= 3);
        let total: u32 = plan.iter().map(|o| o.count).sum();
        assert_eq!(total, 10);
        assert!(plan[0].count >= plan[1].count);
        assert!(plan[1].count >= plan[2].count);
    }

    #[test]
    fn balanced_scouts_spread_two_per_lane_with_remainder_on_safest() {
        let plan = plan_scouts(11.0, &flat_danger(), StrategyMode::Balanced);
        let total: u32 = plan.iter().map(|o| o.count).sum();
        assert_eq!(total, 11);
        assert!(plan.iter().take(4).all(|o| o.count <= 2));
    }

    #[test]
    fn demolishers_target_dense_columns_and_escorts_spend_the_rest() {
        let mut engine = MockEngine::new();
        for y in 14..18 {
            engine.place(Coord::new(20, y), Side::Them, UnitType::Wall, false);
        }
        let snapshot = snapshot_at_turn(&engine, 10);
        let archetype = archetype_by_id("demo_breach").unwrap();

        let plan = plan_demolisher_escort(
            archetype,
            12.0,
            &snapshot,
            &flat_danger(),
            StrategyMode::Balanced,
        );
        let demos: Vec<_> = plan
            .iter()
            .filter(|o| o.unit_type == UnitType::Demolisher)
            .collect();
        assert_eq!(demos.len(), 2, "0.7 * 12 / 3 demolishers");
        assert_eq!(demos[0].location, spawn_coord(20));
        // 12 - 6 spent on demolishers leaves 6 scout escorts.
        let scouts: u32 = plan
            .iter()
            .filter(|o| o.unit_type == UnitType::Scout)
            .map(|o| o.count)
            .sum();
        assert_eq!(scouts, 6);
        assert!((plan_cost(&plan) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn defensive_demolishers_skip_hot_columns() {
        let mut engine = MockEngine::new();
        // Dense structures and heavy turret cover on column 20.
        for y in 14..18 {
            engine.place(Coord::new(20, y), Side::Them, UnitType::Wall, false);
        }
        for y in 18..25 {
            engine.place(Coord::new(20, y), Side::Them, UnitType::Turret, true);
        }
        let snapshot = snapshot_at_turn(&engine, 10);
        let mut danger = TurretDensityEstimator::default();
        crate::danger::DangerEstimator::update(&mut danger, &engine);
        let archetype = archetype_by_id("demo_breach").unwrap();

        let plan =
            plan_demolisher_escort(archetype, 6.0, &snapshot, &danger, StrategyMode::Defensive);
        assert!(plan
            .iter()
            .filter(|o| o.unit_type == UnitType::Demolisher)
            .all(|o| o.location.x < 17 || o.location.x > 23));
    }

    #[test]
    fn interceptor_modes_concentrate_or_screen() {
        let offensive = plan_interceptors(8.0, &flat_danger(), StrategyMode::Press);
        assert_eq!(offensive.len(), 1);
        assert_eq!(offensive[0].count, 8);

        let defensive = plan_interceptors(8.0, &flat_danger(), StrategyMode::Defensive);
        assert_eq!(defensive.len(), 4);
        assert!(defensive.iter().all(|o| o.count == 2));
        let columns: Vec<i32> = defensive.iter().map(|o| o.location.x).collect();
        assert_eq!(columns, vec![11, 13, 14, 16]);
    }

    #[test]
    fn pincer_splits_both_flanks_roughly_seventy_thirty() {
        let plan = plan_pincer(20.0);
        let flank_a: Vec<_> = plan.iter().filter(|o| o.location.x < 14).collect();
        let flank_b: Vec<_> = plan.iter().filter(|o| o.location.x >= 14).collect();
        assert_eq!(flank_a.len(), 2);
        assert_eq!(flank_b.len(), 2);
        for flank in [flank_a, flank_b] {
            let scouts = flank
                .iter()
                .find(|o| o.unit_type == UnitType::Scout)
                .unwrap();
            let demos = flank
                .iter()
                .find(|o| o.unit_type == UnitType::Demolisher)
                .unwrap();
            assert_eq!(scouts.count, 7);
            assert_eq!(demos.count, 1);
        }
    }
}
