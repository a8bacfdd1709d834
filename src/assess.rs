//! Threat and opportunity assessment.
//!
//! Converts the turn snapshot and opponent model into an ordinal threat level
//! plus the list of openings worth attacking this turn. Opportunity types are
//! independent and may co-occur.

use crate::analyzer::Snapshot;
use crate::engine::Coord;
use crate::modeler::{OpponentModel, Playstyle, Weakness};

/// Ordinal severity of the opponent's imminent attacking capability.
/// `Standard` is the moderate rung; `Massive` is the critical one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ThreatLevel {
    Probing,
    Standard,
    Major,
    Massive,
}

#[derive(Clone, Debug)]
pub struct ThreatRecord {
    pub level: ThreatLevel,
    /// Extrapolated turn of the opponent's next attack, when timing data
    /// supports a prediction.
    pub predicted_attack_turn: Option<f64>,
    pub signals: Vec<&'static str>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Opportunity {
    ExploitGap { column: i32 },
    ExposedSupport { location: Coord },
    DamagedDefense,
    EconomicRaid,
    AllInPotential,
    CounterPunch,
    MomentumPush,
}

/// Resource bands for the base threat step function.
const BAND_STANDARD: f64 = 8.0;
const BAND_MAJOR: f64 = 15.0;
const BAND_MASSIVE: f64 = 25.0;

/// Own-resource gates for weakness-derived opportunities.
const GAP_MIN_MOBILE: f64 = 8.0;
const SUPPORT_RAID_MIN_MOBILE: f64 = 6.0;
const DAMAGED_MIN_MOBILE: f64 = 10.0;
const ECON_RAID_MIN_MOBILE: f64 = 8.0;
const ALL_IN_MIN_MOBILE: f64 = 15.0;

pub struct ThreatAssessor {
    /// Consecutive turns we ended without losing health while the opponent
    /// had an attack-sized pool.
    consecutive_holds: u32,
    /// Consecutive turns of positive momentum.
    momentum_streak: u32,
}

impl ThreatAssessor {
    pub fn new() -> Self {
        Self {
            consecutive_holds: 0,
            momentum_streak: 0,
        }
    }

    pub fn assess(
        &mut self,
        snapshot: &Snapshot,
        model: &OpponentModel,
        momentum: f64,
    ) -> (ThreatRecord, Vec<Opportunity>) {
        let threat = self.assess_threat(snapshot, model);
        let opportunities = self.find_opportunities(snapshot, model, momentum);
        tracing::debug!(
            turn = snapshot.turn,
            level = ?threat.level,
            opportunities = opportunities.len(),
            "threat assessed"
        );
        (threat, opportunities)
    }

    fn assess_threat(&self, snapshot: &Snapshot, model: &OpponentModel) -> ThreatRecord {
        let pool = snapshot.their_mobile_points;
        let mut level = if pool >= BAND_MASSIVE {
            ThreatLevel::Massive
        } else if pool >= BAND_MAJOR {
            ThreatLevel::Major
        } else if pool >= BAND_STANDARD {
            ThreatLevel::Standard
        } else {
            ThreatLevel::Probing
        };
        let mut signals = Vec::new();
        let mut predicted_attack_turn = None;

        // Timing extrapolation only once the opponent has shown a cadence.
        if model.predictability > 0.70 && model.attack_turns.len() >= 3 {
            if let Some(next) = model.predicted_next_attack() {
                predicted_attack_turn = Some(next);
                if (next - snapshot.turn as f64) <= 1.5 {
                    level = level.max(ThreatLevel::Standard);
                    signals.push("predicted_attack");
                }
            }
        }

        if model.playstyle == Playstyle::Rush && snapshot.turn < 8 {
            level = level.max(ThreatLevel::Standard);
            signals.push("early_rush");
        }

        ThreatRecord {
            level,
            predicted_attack_turn,
            signals,
        }
    }

    fn find_opportunities(
        &mut self,
        snapshot: &Snapshot,
        model: &OpponentModel,
        momentum: f64,
    ) -> Vec<Opportunity> {
        let mobile = snapshot.our_mobile_points;
        let mut out = Vec::new();

        for weakness in &model.weaknesses {
            match weakness {
                Weakness::SparseZone { column } if mobile >= GAP_MIN_MOBILE => {
                    out.push(Opportunity::ExploitGap { column: *column });
                }
                Weakness::ExposedSupport { location } if mobile >= SUPPORT_RAID_MIN_MOBILE => {
                    out.push(Opportunity::ExposedSupport {
                        location: *location,
                    });
                }
                Weakness::WeakStructures if mobile >= DAMAGED_MIN_MOBILE => {
                    if !out.contains(&Opportunity::DamagedDefense) {
                        out.push(Opportunity::DamagedDefense);
                    }
                }
                _ => {}
            }
        }

        if snapshot.theirs.supports >= 4 && mobile >= ECON_RAID_MIN_MOBILE {
            out.push(Opportunity::EconomicRaid);
        }

        if snapshot.self_health >= 20.0
            && snapshot.enemy_health <= 12.0
            && mobile >= ALL_IN_MIN_MOBILE
        {
            out.push(Opportunity::AllInPotential);
        }

        // A defense "holds" when the opponent was loaded but we lost nothing.
        if snapshot.breaches_taken == 0 && snapshot.their_mobile_points >= BAND_STANDARD {
            self.consecutive_holds += 1;
        } else if snapshot.breaches_taken > 0 {
            self.consecutive_holds = 0;
        }
        if self.consecutive_holds >= 3 {
            out.push(Opportunity::CounterPunch);
        }

        if momentum > 0.5 {
            self.momentum_streak += 1;
        } else {
            self.momentum_streak = 0;
        }
        if self.momentum_streak >= 2 {
            out.push(Opportunity::MomentumPush);
        }

        out
    }
}

impl Default for ThreatAssessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testkit::{snapshot_at_turn, MockEngine};

    fn quiet_model() -> OpponentModel {
        OpponentModel::new()
    }

    #[test]
    fn threat_bands_step_with_enemy_pool() {
        let engine = MockEngine::new();
        let mut snapshot = snapshot_at_turn(&engine, 10);
        let model = quiet_model();
        let mut assessor = ThreatAssessor::new();

        snapshot.their_mobile_points = 3.0;
        assert_eq!(
            assessor.assess(&snapshot, &model, 0.0).0.level,
            ThreatLevel::Probing
        );
        snapshot.their_mobile_points = 12.0;
        assert_eq!(
            assessor.assess(&snapshot, &model, 0.0).0.level,
            ThreatLevel::Standard
        );
        snapshot.their_mobile_points = 20.0;
        assert_eq!(
            assessor.assess(&snapshot, &model, 0.0).0.level,
            ThreatLevel::Major
        );
        snapshot.their_mobile_points = 30.0;
        assert_eq!(
            assessor.assess(&snapshot, &model, 0.0).0.level,
            ThreatLevel::Massive
        );
    }

    #[test]
    fn regular_cadence_escalates_near_the_predicted_turn() {
        let engine = MockEngine::new();
        let mut snapshot = snapshot_at_turn(&engine, 16);
        snapshot.their_mobile_points = 2.0;

        let mut model = quiet_model();
        // Every third turn; next predicted launch is turn 17.
        for turn in [2.0, 5.0, 8.0, 11.0, 14.0] {
            model.attack_turns.push(turn);
        }
        model.predictability = 0.9;

        let mut assessor = ThreatAssessor::new();
        let (threat, _) = assessor.assess(&snapshot, &model, 0.0);
        assert!(threat.level >= ThreatLevel::Standard);
        assert!(threat.signals.contains(&"predicted_attack"));
    }

    #[test]
    fn early_rush_raises_the_floor() {
        let engine = MockEngine::new();
        let mut snapshot = snapshot_at_turn(&engine, 5);
        snapshot.their_mobile_points = 2.0;
        let mut model = quiet_model();
        model.playstyle = Playstyle::Rush;

        let mut assessor = ThreatAssessor::new();
        let (threat, _) = assessor.assess(&snapshot, &model, 0.0);
        assert_eq!(threat.level, ThreatLevel::Standard);
        assert!(threat.signals.contains(&"early_rush"));
    }

    #[test]
    fn weakness_opportunities_respect_resource_gates() {
        let engine = MockEngine::new();
        let mut snapshot = snapshot_at_turn(&engine, 10);
        let mut model = quiet_model();
        model.weaknesses = vec![Weakness::SparseZone { column: 20 }];

        let mut assessor = ThreatAssessor::new();
        snapshot.our_mobile_points = 4.0;
        let (_, opportunities) = assessor.assess(&snapshot, &model, 0.0);
        assert!(opportunities.is_empty());

        snapshot.our_mobile_points = 10.0;
        let (_, opportunities) = assessor.assess(&snapshot, &model, 0.0);
        assert_eq!(
            opportunities,
            vec![Opportunity::ExploitGap { column: 20 }]
        );
    }

    #[test]
    fn lethal_range_flags_all_in_potential() {
        let engine = MockEngine::new();
        let mut snapshot = snapshot_at_turn(&engine, 20);
        snapshot.self_health = 25.0;
        snapshot.enemy_health = 8.0;
        snapshot.our_mobile_points = 18.0;

        let mut assessor = ThreatAssessor::new();
        let (_, opportunities) = assessor.assess(&snapshot, &quiet_model(), 0.0);
        assert!(opportunities.contains(&Opportunity::AllInPotential));
    }

    #[test]
    fn held_defenses_and_momentum_accumulate_into_openings() {
        let engine = MockEngine::new();
        let mut snapshot = snapshot_at_turn(&engine, 10);
        snapshot.their_mobile_points = 10.0;
        snapshot.breaches_taken = 0;

        let model = quiet_model();
        let mut assessor = ThreatAssessor::new();
        for _ in 0..2 {
            let (_, opportunities) = assessor.assess(&snapshot, &model, 0.8);
            assert!(!opportunities.contains(&Opportunity::CounterPunch));
        }
        let (_, opportunities) = assessor.assess(&snapshot, &model, 0.8);
        assert!(opportunities.contains(&Opportunity::CounterPunch));
        assert!(opportunities.contains(&Opportunity::MomentumPush));

        // A breach resets the hold streak.
        snapshot.breaches_taken = 2;
        let (_, opportunities) = assessor.assess(&snapshot, &model, 0.0);
        assert!(!opportunities.contains(&Opportunity::CounterPunch));
    }
}
