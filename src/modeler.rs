//! Opponent modeling: playstyle, skill, predictability, weaknesses and the
//! counter-strategy lookup.
//!
//! The model is long-lived (one game) and mutated incrementally each turn
//! from the analyzer snapshot. Nothing here is persisted verbatim; only the
//! aggregated memory counters survive across games.

use crate::analyzer::{RollingWindow, Snapshot};
use crate::engine::{Coord, BOARD_WIDTH};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Playstyle {
    Rush,
    Turtle,
    Economic,
    Balanced,
    Adaptive,
    Unknown,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Weakness {
    /// A sampled column with turret coverage below the floor.
    SparseZone { column: i32 },
    LowUpgrades,
    WeakStructures,
    FewWalls,
    ExposedSupport { location: Coord },
}

/// Static playstyle -> response table. Pure function of playstyle.
#[derive(Clone, Copy, Debug)]
pub struct CounterStrategy {
    pub defense_weight: f64,
    pub economy_weight: f64,
    pub counter_attack_weight: f64,
    pub focus: &'static str,
    pub opening: &'static str,
}

pub fn counter_strategy(playstyle: Playstyle) -> CounterStrategy {
    match playstyle {
        Playstyle::Rush => CounterStrategy {
            defense_weight: 0.7,
            economy_weight: 0.1,
            counter_attack_weight: 0.2,
            focus: "front_line_turrets",
            opening: "fortified_funnel",
        },
        Playstyle::Turtle => CounterStrategy {
            defense_weight: 0.2,
            economy_weight: 0.4,
            counter_attack_weight: 0.4,
            focus: "demolisher_pressure",
            opening: "economy_first",
        },
        Playstyle::Economic => CounterStrategy {
            defense_weight: 0.3,
            economy_weight: 0.2,
            counter_attack_weight: 0.5,
            focus: "early_raids",
            opening: "aggressive_probe",
        },
        Playstyle::Balanced => CounterStrategy {
            defense_weight: 0.4,
            economy_weight: 0.3,
            counter_attack_weight: 0.3,
            focus: "flexible_response",
            opening: "standard_core",
        },
        Playstyle::Adaptive | Playstyle::Unknown => CounterStrategy {
            defense_weight: 0.4,
            economy_weight: 0.3,
            counter_attack_weight: 0.3,
            focus: "information_gathering",
            opening: "standard_core",
        },
    }
}

const TIMING_CAPACITY: usize = 30;
const SPEND_CAPACITY: usize = 30;
/// Enemy mobile-point drop that reads as an attack launch.
const ATTACK_SPEND_FLOOR: f64 = 5.0;
/// Column coverage below this flags a sparse zone.
const COVERAGE_FLOOR: f64 = 1.0;
const COVERAGE_RADIUS: i32 = 3;
/// A banked structure pool this large reads as economy hoarding even before
/// the supports land on the board.
const STRUCTURE_HOARD: f64 = 40.0;

pub struct OpponentModel {
    pub playstyle: Playstyle,
    pub aggression: f64,
    pub defense_rating: f64,
    pub economy_priority: f64,
    /// Clamped to [0.15, 0.98].
    pub skill: f64,
    /// Clamped to [0.0, 1.0]; 0.5 until enough timing signal exists.
    pub predictability: f64,
    pub attack_turns: RollingWindow,
    pub spend_samples: RollingWindow,
    pub weaknesses: Vec<Weakness>,
    pub counter: CounterStrategy,
    prev_enemy_mobile: f64,
}

impl OpponentModel {
    pub fn new() -> Self {
        Self {
            playstyle: Playstyle::Unknown,
            aggression: 0.5,
            defense_rating: 0.5,
            economy_priority: 0.5,
            skill: 0.5,
            predictability: 0.5,
            attack_turns: RollingWindow::new(TIMING_CAPACITY),
            spend_samples: RollingWindow::new(SPEND_CAPACITY),
            weaknesses: Vec::new(),
            counter: counter_strategy(Playstyle::Unknown),
            prev_enemy_mobile: 0.0,
        }
    }

    /// Attacks observed per elapsed turn.
    pub fn attack_frequency(&self, turn: u32) -> f64 {
        if turn == 0 {
            return 0.0;
        }
        self.attack_turns.len() as f64 / turn as f64
    }

    /// Incremental update from this turn's snapshot. Below turn 3 there is
    /// not enough signal, so the model is left untouched.
    pub fn update(&mut self, snapshot: &Snapshot, recent_damage_taken: f64) {
        if snapshot.turn < 3 {
            self.prev_enemy_mobile = snapshot.their_mobile_points;
            return;
        }

        // A sharp drop in the enemy mobile pool marks an attack launch.
        let spent = self.prev_enemy_mobile - snapshot.their_mobile_points;
        if spent >= ATTACK_SPEND_FLOOR {
            self.attack_turns.push(snapshot.turn as f64);
            self.spend_samples.push(spent);
        }
        self.prev_enemy_mobile = snapshot.their_mobile_points;

        self.classify_playstyle(snapshot);
        self.skill = self.estimate_skill(snapshot, recent_damage_taken);
        self.predictability = self.estimate_predictability();
        self.weaknesses = detect_weaknesses(snapshot);
        self.counter = counter_strategy(self.playstyle);

        tracing::debug!(
            turn = snapshot.turn,
            playstyle = ?self.playstyle,
            skill = self.skill,
            predictability = self.predictability,
            weaknesses = self.weaknesses.len(),
            "opponent model updated"
        );
    }

    /// Fixed-priority rule table; the first matching branch wins and sets the
    /// per-branch priority scalars.
    fn classify_playstyle(&mut self, snapshot: &Snapshot) {
        let theirs = &snapshot.theirs;
        let frequency = self.attack_frequency(snapshot.turn);
        let avg_spend = self.spend_samples.mean();

        let (playstyle, aggression, defense, economy) =
            if frequency > 0.4 && avg_spend > 0.0 && avg_spend < 8.0 {
                (Playstyle::Rush, 0.9, 0.2, 0.2)
            } else if theirs.turrets > 12 && frequency < 0.2 {
                (Playstyle::Turtle, 0.2, 0.9, 0.4)
            } else if theirs.supports > 6 || snapshot.their_structure_points >= STRUCTURE_HOARD {
                (Playstyle::Economic, 0.4, 0.4, 0.9)
            } else if theirs.upgrade_ratio() > 0.3 && theirs.turrets >= 8 {
                (Playstyle::Balanced, 0.5, 0.6, 0.5)
            } else {
                (Playstyle::Adaptive, 0.5, 0.5, 0.5)
            };

        self.playstyle = playstyle;
        self.aggression = aggression;
        self.defense_rating = defense;
        self.economy_priority = economy;
    }

    /// Additive weighted indicators, clamped. Each indicator contributes at
    /// most its declared weight so the estimate stays monotonic.
    fn estimate_skill(&self, snapshot: &Snapshot, recent_damage_taken: f64) -> f64 {
        let theirs = &snapshot.theirs;
        let mut skill: f64 = 0.3;

        skill += match theirs.supports {
            8.. => 0.15,
            4..=7 => 0.08,
            _ => 0.0,
        };
        let upgrade_ratio = theirs.upgrade_ratio();
        if upgrade_ratio > 0.5 {
            skill += 0.2;
        } else if upgrade_ratio > 0.25 {
            skill += 0.1;
        }
        if recent_damage_taken > 2.0 {
            skill += 0.15;
        } else if recent_damage_taken > 1.0 {
            skill += 0.08;
        }
        // Attack-pattern variety: distinct spend magnitudes seen so far.
        let mut magnitudes: Vec<i64> = self.spend_samples.iter().map(|s| s.round() as i64).collect();
        magnitudes.sort_unstable();
        magnitudes.dedup();
        if magnitudes.len() >= 3 {
            skill += 0.1;
        }
        if theirs.density() > 0.15 && upgrade_ratio > 0.3 {
            skill += 0.15;
        }
        if snapshot.turn > 0 && theirs.total() as f64 / snapshot.turn as f64 > 1.5 {
            skill += 0.1;
        }

        skill.clamp(0.15, 0.98)
    }

    /// `1 / (1 + stddev/mean)` over the gaps between recorded attack turns.
    /// Needs at least five samples to say anything; neutral 0.5 otherwise.
    fn estimate_predictability(&self) -> f64 {
        if self.attack_turns.len() < 5 {
            return 0.5;
        }
        let turns: Vec<f64> = self.attack_turns.iter().collect();
        let mut gaps = RollingWindow::new(turns.len());
        for pair in turns.windows(2) {
            gaps.push(pair[1] - pair[0]);
        }
        let mean_gap = gaps.mean();
        if mean_gap <= 0.0 {
            return 0.5;
        }
        (1.0 / (1.0 + gaps.std_dev() / mean_gap)).clamp(0.0, 1.0)
    }

    /// Mean interval of the last `window` recorded attacks, if enough exist.
    pub fn mean_attack_interval(&self, window: usize) -> Option<f64> {
        if self.attack_turns.len() < window.max(2) {
            return None;
        }
        let turns: Vec<f64> = self.attack_turns.iter().collect();
        let tail = &turns[turns.len() - window..];
        let gaps: Vec<f64> = tail.windows(2).map(|p| p[1] - p[0]).collect();
        if gaps.is_empty() {
            return None;
        }
        Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
    }

    /// Extrapolated turn of the opponent's next attack.
    pub fn predicted_next_attack(&self) -> Option<f64> {
        let last = self.attack_turns.last()?;
        let interval = self.mean_attack_interval(3)?;
        Some(last + interval)
    }
}

impl Default for OpponentModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Radius-weighted per-column turret coverage of the enemy half. Upgraded
/// turrets weigh double; weight falls off linearly with column distance.
pub fn coverage_map(snapshot: &Snapshot) -> [f64; BOARD_WIDTH as usize] {
    let mut coverage = [0.0; BOARD_WIDTH as usize];
    for (position, upgraded) in &snapshot.theirs.turret_positions {
        let base = if *upgraded { 2.0 } else { 1.0 };
        for dx in -COVERAGE_RADIUS..=COVERAGE_RADIUS {
            let column = position.x + dx;
            if column < 0 || column >= BOARD_WIDTH {
                continue;
            }
            let falloff = 1.0 - dx.abs() as f64 / (COVERAGE_RADIUS + 1) as f64;
            coverage[column as usize] += base * falloff;
        }
    }
    coverage
}

fn detect_weaknesses(snapshot: &Snapshot) -> Vec<Weakness> {
    let theirs = &snapshot.theirs;
    let mut weaknesses = Vec::new();

    let coverage = coverage_map(snapshot);
    for column in (0..BOARD_WIDTH).step_by(2) {
        if coverage[column as usize] < COVERAGE_FLOOR {
            weaknesses.push(Weakness::SparseZone { column });
        }
    }

    if theirs.total() >= 5 && theirs.upgrade_ratio() < 0.1 {
        weaknesses.push(Weakness::LowUpgrades);
    }
    if theirs.total() > 0 && theirs.health_pct() < 0.6 {
        weaknesses.push(Weakness::WeakStructures);
    }
    if theirs.walls < 8 {
        weaknesses.push(Weakness::FewWalls);
    }
    for support in &theirs.support_positions {
        let nearby_walls = theirs
            .wall_positions
            .iter()
            .filter(|wall| wall.manhattan(*support) <= 2)
            .count();
        if nearby_walls < 2 {
            weaknesses.push(Weakness::ExposedSupport {
                location: *support,
            });
        }
    }

    weaknesses
}
