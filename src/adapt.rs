//! Strategy mode state machine, decision thresholds and the derived metrics
//! that drive transitions.
//!
//! The mode is re-derived from scratch every turn; nothing is edge-triggered.
//! The full [`ThresholdSet`] is rewritten from mode constants on every
//! transition so thresholds can never drift from stale partial updates.

use crate::analyzer::{RollingWindow, Snapshot};
use crate::assess::ThreatLevel;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StrategyMode {
    Balanced,
    Desperate,
    Defensive,
    Press,
    AllIn,
    Comeback,
}

/// Named numeric knobs. Always produced wholesale by [`ThresholdSet::for_mode`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdSet {
    /// Mobile points below which no attack is considered.
    pub min_attack_mobile: f64,
    /// Share of structure points reserved for the defense build phase.
    pub defense_budget_ratio: f64,
    /// Own health at or below this forces `Desperate`.
    pub emergency_health: f64,
    /// Enemy health at or below this is considered lethal range for `AllIn`.
    pub all_in_enemy_health: f64,
    /// Expected damage an attack must clear or be vetoed.
    pub attack_min_ev: f64,
    /// Fraction of the mobile pool allocated to the chosen play.
    pub alloc_fraction: f64,
}

impl ThresholdSet {
    /// Pure function of mode: same mode, identical thresholds, regardless of
    /// history.
    pub fn for_mode(mode: StrategyMode) -> Self {
        match mode {
            StrategyMode::Balanced => Self {
                min_attack_mobile: 8.0,
                defense_budget_ratio: 0.6,
                emergency_health: 8.0,
                all_in_enemy_health: 10.0,
                attack_min_ev: 2.0,
                alloc_fraction: 0.7,
            },
            StrategyMode::Desperate => Self {
                min_attack_mobile: 12.0,
                defense_budget_ratio: 0.9,
                emergency_health: 8.0,
                all_in_enemy_health: 10.0,
                attack_min_ev: 4.0,
                alloc_fraction: 0.5,
            },
            StrategyMode::Defensive => Self {
                min_attack_mobile: 10.0,
                defense_budget_ratio: 0.8,
                emergency_health: 8.0,
                all_in_enemy_health: 10.0,
                attack_min_ev: 3.0,
                alloc_fraction: 0.55,
            },
            StrategyMode::Press => Self {
                min_attack_mobile: 6.0,
                defense_budget_ratio: 0.45,
                emergency_health: 8.0,
                all_in_enemy_health: 10.0,
                attack_min_ev: 1.5,
                alloc_fraction: 0.85,
            },
            StrategyMode::AllIn => Self {
                min_attack_mobile: 5.0,
                defense_budget_ratio: 0.25,
                emergency_health: 8.0,
                all_in_enemy_health: 10.0,
                attack_min_ev: 1.0,
                alloc_fraction: 0.95,
            },
            StrategyMode::Comeback => Self {
                min_attack_mobile: 9.0,
                defense_budget_ratio: 0.65,
                emergency_health: 8.0,
                all_in_enemy_health: 10.0,
                attack_min_ev: 2.5,
                alloc_fraction: 0.65,
            },
        }
    }
}

const METRIC_WINDOW: usize = 10;

/// Derived scalar metrics over bounded windows. Recomputed, never reset.
pub struct Metrics {
    pub damage_dealt: RollingWindow,
    pub damage_taken: RollingWindow,
    pub resource_spent: RollingWindow,
    pub return_on_spend: RollingWindow,
    /// Always in [0.05, 0.95].
    pub win_probability: f64,
    /// Always in [-2.0, 2.0].
    pub momentum: f64,
    /// Always in [0.0, 1.0].
    pub pressure: f64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            damage_dealt: RollingWindow::new(METRIC_WINDOW),
            damage_taken: RollingWindow::new(METRIC_WINDOW),
            resource_spent: RollingWindow::new(METRIC_WINDOW),
            return_on_spend: RollingWindow::new(METRIC_WINDOW),
            win_probability: 0.5,
            momentum: 0.0,
            pressure: 0.0,
        }
    }

    pub fn record_turn(&mut self, snapshot: &Snapshot, resource_spent: f64) {
        self.damage_dealt.push(snapshot.breaches_dealt as f64);
        self.damage_taken.push(snapshot.breaches_taken as f64);
        self.resource_spent.push(resource_spent);
        if resource_spent > 0.0 {
            self.return_on_spend
                .push(snapshot.breaches_dealt as f64 / resource_spent);
        }
        self.recompute(snapshot);
    }

    fn recompute(&mut self, snapshot: &Snapshot) {
        // Momentum: recent damage exchange plus the health-differential trend.
        let exchange = self.damage_dealt.mean() - self.damage_taken.mean();
        let health_slope = (snapshot.self_health - snapshot.enemy_health) / 15.0;
        self.momentum = (exchange * 0.5 + health_slope * 0.5).clamp(-2.0, 2.0);

        let health_edge = (snapshot.self_health - snapshot.enemy_health) / 60.0;
        self.win_probability =
            (0.5 + health_edge + self.momentum * 0.1).clamp(0.05, 0.95);

        self.pressure = (snapshot.their_mobile_points / 30.0
            + self.damage_taken.mean() / 10.0)
            .clamp(0.0, 1.0);
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// The mode state machine. Holds the sticky all-in commitment for the life of
/// one game.
pub struct StrategyAdapter {
    pub mode: StrategyMode,
    pub thresholds: ThresholdSet,
    pub aggression: f64,
    pub risk_tolerance: f64,
    all_in_committed: bool,
}

impl StrategyAdapter {
    pub fn new() -> Self {
        Self {
            mode: StrategyMode::Balanced,
            thresholds: ThresholdSet::for_mode(StrategyMode::Balanced),
            aggression: 0.5,
            risk_tolerance: 0.5,
            all_in_committed: false,
        }
    }

    /// Re-evaluate the mode by fixed priority and rewrite every threshold.
    pub fn adapt(&mut self, snapshot: &Snapshot, metrics: &Metrics, threat: ThreatLevel) {
        let base = ThresholdSet::for_mode(StrategyMode::Balanced);
        let mut mode = if snapshot.self_health <= base.emergency_health {
            StrategyMode::Desperate
        } else if threat == ThreatLevel::Massive {
            StrategyMode::Defensive
        } else if metrics.win_probability >= 0.65 && metrics.momentum > 0.0 {
            StrategyMode::Press
        } else if metrics.win_probability < 0.35
            && snapshot.enemy_health <= base.all_in_enemy_health
        {
            self.all_in_committed = true;
            StrategyMode::AllIn
        } else if metrics.win_probability < 0.4 {
            StrategyMode::Comeback
        } else {
            StrategyMode::Balanced
        };

        // A committed all-in does not silently downgrade; only survival modes
        // outrank it.
        if self.all_in_committed
            && matches!(
                mode,
                StrategyMode::Balanced | StrategyMode::Comeback | StrategyMode::Press
            )
        {
            mode = StrategyMode::AllIn;
        }

        if mode != self.mode {
            tracing::info!(from = ?self.mode, to = ?mode, "strategy mode transition");
        }
        self.mode = mode;
        self.thresholds = ThresholdSet::for_mode(mode);
        let (aggression, risk) = match mode {
            StrategyMode::Balanced => (0.5, 0.5),
            StrategyMode::Desperate => (0.2, 0.15),
            StrategyMode::Defensive => (0.3, 0.25),
            StrategyMode::Press => (0.75, 0.65),
            StrategyMode::AllIn => (0.95, 0.9),
            StrategyMode::Comeback => (0.6, 0.55),
        };
        self.aggression = aggression;
        self.risk_tolerance = risk;
    }
}

impl Default for StrategyAdapter {
    fn default() -> Self {
        Self::new()
    }
}
