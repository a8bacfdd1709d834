//! The attack playbook and play selection.
//!
//! A fixed catalog of attack archetypes is scored against the current
//! snapshot, danger heatmap and opportunity list. The winner passes through
//! an expected-damage gate before any resource is committed: an attack that
//! does not clear the mode's minimum expected value is vetoed outright for
//! the turn, never executed at reduced confidence.

use crate::adapt::{StrategyMode, ThresholdSet};
use crate::analyzer::Snapshot;
use crate::assess::Opportunity;
use crate::danger::{columns_by_safety, DangerEstimator};
use crate::engine::UnitType;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchetypeKind {
    ScoutFlood,
    DemoBreach,
    SurgicalStrike,
    InterceptorDeny,
    MixedAssault,
    PincerAttack,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RiskTag {
    Low,
    Medium,
    High,
}

/// One attack archetype. The catalog is read-only at run time.
#[derive(Clone, Copy, Debug)]
pub struct Archetype {
    pub id: &'static str,
    pub description: &'static str,
    pub kind: ArchetypeKind,
    pub scout_ratio: f64,
    pub demolisher_ratio: f64,
    pub interceptor_ratio: f64,
    pub min_cost: f64,
    pub optimal_cost: f64,
    pub weight: f64,
    pub risk: RiskTag,
    /// Playstyle this archetype is strongest against.
    pub counters: &'static str,
}

/// Declaration order is the tiebreak order.
pub const PLAYBOOK: &[Archetype] = &[
    Archetype {
        id: "scout_flood",
        description: "Mass cheap scouts down the least defended lanes",
        kind: ArchetypeKind::ScoutFlood,
        scout_ratio: 1.0,
        demolisher_ratio: 0.0,
        interceptor_ratio: 0.0,
        min_cost: 8.0,
        optimal_cost: 15.0,
        weight: 1.0,
        risk: RiskTag::Medium,
        counters: "economic",
    },
    Archetype {
        id: "demo_breach",
        description: "Demolishers into the densest front line, scouts escorting",
        kind: ArchetypeKind::DemoBreach,
        scout_ratio: 0.3,
        demolisher_ratio: 0.7,
        interceptor_ratio: 0.0,
        min_cost: 9.0,
        optimal_cost: 18.0,
        weight: 1.1,
        risk: RiskTag::Medium,
        counters: "turtle",
    },
    Archetype {
        id: "surgical_strike",
        description: "Escorted demolishers hunting exposed supports",
        kind: ArchetypeKind::SurgicalStrike,
        scout_ratio: 0.4,
        demolisher_ratio: 0.6,
        interceptor_ratio: 0.0,
        min_cost: 7.0,
        optimal_cost: 12.0,
        weight: 1.0,
        risk: RiskTag::Low,
        counters: "economic",
    },
    Archetype {
        id: "interceptor_deny",
        description: "Interceptor screen across the likely attack lanes",
        kind: ArchetypeKind::InterceptorDeny,
        scout_ratio: 0.0,
        demolisher_ratio: 0.0,
        interceptor_ratio: 1.0,
        min_cost: 4.0,
        optimal_cost: 8.0,
        weight: 0.8,
        risk: RiskTag::Low,
        counters: "rush",
    },
    Archetype {
        id: "mixed_assault",
        description: "Combined scouts and demolishers on one flank",
        kind: ArchetypeKind::MixedAssault,
        scout_ratio: 0.5,
        demolisher_ratio: 0.4,
        interceptor_ratio: 0.1,
        min_cost: 12.0,
        optimal_cost: 20.0,
        weight: 1.05,
        risk: RiskTag::High,
        counters: "balanced",
    },
    Archetype {
        id: "pincer_attack",
        description: "Simultaneous split pressure on both flanks",
        kind: ArchetypeKind::PincerAttack,
        scout_ratio: 0.7,
        demolisher_ratio: 0.3,
        interceptor_ratio: 0.0,
        min_cost: 14.0,
        optimal_cost: 22.0,
        weight: 0.95,
        risk: RiskTag::High,
        counters: "turtle",
    },
];

pub fn archetype_by_id(id: &str) -> Option<&'static Archetype> {
    PLAYBOOK.iter().find(|entry| entry.id == id)
}

/// Hit points of a single scout, used by the scout expected-damage rule.
const SCOUT_HEALTH: f64 = 15.0;
const DEMOLISHER_COST: f64 = 3.0;

#[derive(Clone, Copy, Debug)]
pub struct ChosenPlay {
    pub archetype: &'static Archetype,
    pub amount: f64,
    pub expected_damage: f64,
}

#[derive(Clone, Copy, Debug)]
pub enum PlayDecision {
    Attack(ChosenPlay),
    /// Cheap single-lane interceptor volley when nothing else is affordable
    /// but the opponent's path is predictable enough to deny.
    FallbackVolley { column: i32, count: u32 },
    /// No offensive action this turn.
    Hold,
}

fn primary_class(kind: ArchetypeKind) -> UnitType {
    match kind {
        ArchetypeKind::ScoutFlood | ArchetypeKind::PincerAttack => UnitType::Scout,
        ArchetypeKind::DemoBreach | ArchetypeKind::SurgicalStrike => UnitType::Demolisher,
        ArchetypeKind::InterceptorDeny => UnitType::Interceptor,
        ArchetypeKind::MixedAssault => UnitType::Scout,
    }
}

fn base_term(kind: ArchetypeKind, snapshot: &Snapshot) -> f64 {
    let theirs = &snapshot.theirs;
    match kind {
        // Scouts thrive against thin, un-upgraded turret lines.
        ArchetypeKind::ScoutFlood => {
            (10.0 - theirs.turrets as f64 * 0.3 - theirs.upgrade_ratio() * 5.0).max(0.0)
        }
        // Demolishers want a packed front band to grind through.
        ArchetypeKind::DemoBreach => theirs.front as f64 * 0.8,
        ArchetypeKind::SurgicalStrike => theirs.supports as f64 * 1.2,
        ArchetypeKind::InterceptorDeny => snapshot.their_mobile_points * 0.3,
        ArchetypeKind::MixedAssault => 5.0 + theirs.total() as f64 * 0.1,
        ArchetypeKind::PincerAttack => 3.0 + (10.0 - theirs.upgrade_ratio() * 10.0) * 0.4,
    }
}

fn danger_penalty(kind: ArchetypeKind, danger: &dyn DangerEstimator) -> f64 {
    let class = primary_class(kind);
    let safest = columns_by_safety(danger, class);
    let lanes = match kind {
        ArchetypeKind::PincerAttack => 2,
        _ => 3,
    };
    let mean: f64 = safest
        .iter()
        .take(lanes)
        .map(|c| danger.estimate(*c, class))
        .sum::<f64>()
        / lanes as f64;
    mean * 0.15
}

fn opportunity_boost(kind: ArchetypeKind, opportunities: &[Opportunity]) -> f64 {
    let mut boost = 0.0;
    for opportunity in opportunities {
        boost += match (opportunity, kind) {
            (Opportunity::MomentumPush, ArchetypeKind::ScoutFlood) => 2.0,
            (Opportunity::ExploitGap { .. }, ArchetypeKind::ScoutFlood) => 1.5,
            (Opportunity::ExploitGap { .. }, ArchetypeKind::PincerAttack) => 1.0,
            (Opportunity::ExposedSupport { .. }, ArchetypeKind::SurgicalStrike) => 2.0,
            (Opportunity::ExposedSupport { .. }, ArchetypeKind::DemoBreach) => 1.0,
            (Opportunity::EconomicRaid, ArchetypeKind::SurgicalStrike) => 1.5,
            (Opportunity::DamagedDefense, ArchetypeKind::DemoBreach) => 1.0,
            (Opportunity::CounterPunch, ArchetypeKind::DemoBreach) => 1.5,
            (Opportunity::AllInPotential, ArchetypeKind::MixedAssault) => 2.5,
            _ => 0.0,
        };
    }
    boost
}

/// Expected breach damage for spending `amount` on `archetype`.
pub fn expected_damage(
    archetype: &Archetype,
    amount: f64,
    snapshot: &Snapshot,
    danger: &dyn DangerEstimator,
) -> f64 {
    match archetype.kind {
        ArchetypeKind::ScoutFlood => {
            let scouts = amount.floor();
            let safest = columns_by_safety(danger, UnitType::Scout);
            let lane_danger = safest
                .first()
                .map(|c| danger.estimate(*c, UnitType::Scout))
                .unwrap_or(0.0);
            let surviving_hp = (scouts * SCOUT_HEALTH - lane_danger).max(0.0);
            surviving_hp / SCOUT_HEALTH
        }
        ArchetypeKind::DemoBreach | ArchetypeKind::SurgicalStrike => {
            let demolishers = (amount * archetype.demolisher_ratio / DEMOLISHER_COST).floor();
            let targets = (snapshot.theirs.total() as f64).min(10.0);
            targets * demolishers * 0.3
        }
        ArchetypeKind::InterceptorDeny => {
            let count = amount.floor();
            (count - snapshot.theirs.turrets as f64 * 0.5).max(0.0)
        }
        ArchetypeKind::MixedAssault | ArchetypeKind::PincerAttack => amount * 0.4,
    }
}

/// Scores the affordable playbook entries and applies the EV gate.
pub fn select_play(
    snapshot: &Snapshot,
    opportunities: &[Opportunity],
    thresholds: &ThresholdSet,
    mode: StrategyMode,
    predictability: f64,
    danger: &dyn DangerEstimator,
) -> PlayDecision {
    let available = snapshot.our_mobile_points;
    if available < thresholds.min_attack_mobile {
        return fallback_or_hold(available, predictability, danger);
    }

    let mut best: Option<(&'static Archetype, f64)> = None;
    for archetype in PLAYBOOK {
        if available < archetype.min_cost {
            continue;
        }
        let score = (base_term(archetype.kind, snapshot) - danger_penalty(archetype.kind, danger))
            * archetype.weight
            + opportunity_boost(archetype.kind, opportunities);
        // Strict comparison keeps declaration order as the tiebreak.
        if best.map(|(_, s)| score > s).unwrap_or(true) {
            best = Some((archetype, score));
        }
    }

    let Some((archetype, score)) = best else {
        return fallback_or_hold(available, predictability, danger);
    };

    let amount = archetype
        .min_cost
        .max((available * thresholds.alloc_fraction).floor())
        .min(available);
    let expected = expected_damage(archetype, amount, snapshot, danger);

    if expected < thresholds.attack_min_ev {
        tracing::debug!(
            archetype = archetype.id,
            expected,
            floor = thresholds.attack_min_ev,
            "attack vetoed below expected-value floor"
        );
        return PlayDecision::Hold;
    }

    tracing::info!(
        archetype = archetype.id,
        score,
        amount,
        expected,
        ?mode,
        "play selected"
    );
    PlayDecision::Attack(ChosenPlay {
        archetype,
        amount,
        expected_damage: expected,
    })
}

fn fallback_or_hold(
    available: f64,
    predictability: f64,
    danger: &dyn DangerEstimator,
) -> PlayDecision {
    let count = available.floor() as u32;
    if predictability >= 0.65 && count >= 2 {
        let column = columns_by_safety(danger, UnitType::Interceptor)
            .first()
            .copied()
            .unwrap_or(13);
        return PlayDecision::FallbackVolley { column, count };
    }
    PlayDecision::Hold
}
