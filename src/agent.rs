//! Turn orchestration.
//!
//! One [`Agent`] instance lives for one game and owns every piece of mutable
//! agent state; nothing is ambient or process-global. Each turn runs the
//! fixed phase order analyze -> model -> assess -> adapt -> defense -> select
//! -> micro-plan -> execute -> learn, with every phase failure degrading the
//! turn rather than aborting it. The turn is always submitted.

use crate::adapt::{Metrics, StrategyAdapter, StrategyMode};
use crate::analyzer::{Snapshot, StateAnalyzer};
use crate::assess::{Opportunity, ThreatAssessor, ThreatRecord};
use crate::danger::{select_estimator, DangerEstimator};
use crate::defense;
use crate::engine::{spawn_coord, GameEngine, MemoryStore, UnitType};
use crate::memory::{PersistentMemory, SAVE_INTERVAL_TURNS};
use crate::micro::{self, plan_cost, SpawnOrder, SpawnPlan};
use crate::modeler::OpponentModel;
use crate::playbook::{select_play, PlayDecision};

/// Everything the phases computed for one turn.
#[derive(Clone, Debug)]
pub struct CacheEntry {
    pub snapshot: Snapshot,
    pub threat: Option<ThreatRecord>,
    pub opportunities: Vec<Opportunity>,
}

/// Per-turn memo. At most one valid entry exists for any turn number; a
/// stale entry is cleared before use and can never be read back.
#[derive(Default)]
pub struct TurnCache {
    entry: Option<(u32, CacheEntry)>,
}

impl TurnCache {
    pub fn read(&self, turn: u32) -> Option<&CacheEntry> {
        match &self.entry {
            Some((cached_turn, entry)) if *cached_turn == turn => Some(entry),
            _ => None,
        }
    }

    pub fn invalidate_stale(&mut self, turn: u32) {
        if matches!(&self.entry, Some((cached_turn, _)) if *cached_turn != turn) {
            self.entry = None;
        }
    }

    pub fn write(&mut self, turn: u32, entry: CacheEntry) {
        self.entry = Some((turn, entry));
    }
}

pub struct Agent {
    analyzer: StateAnalyzer,
    model: OpponentModel,
    assessor: ThreatAssessor,
    adapter: StrategyAdapter,
    metrics: Metrics,
    memory: PersistentMemory,
    cache: TurnCache,
    danger: Box<dyn DangerEstimator>,
    store: Box<dyn MemoryStore>,
    /// Archetype credited with damage observed on later turns.
    last_archetype: Option<String>,
    /// Mobile points spent by the previous turn's offense.
    last_spend: f64,
    last_save_turn: u32,
}

impl Agent {
    /// Builds the per-game state. Probes the engine's pathing capability once
    /// and merges any cross-game memory from the store; a failed load is
    /// logged and replaced by in-memory defaults.
    pub fn new(engine: &dyn GameEngine, store: Box<dyn MemoryStore>) -> Self {
        let danger = select_estimator(engine);
        let mut memory = PersistentMemory::new();
        match store.load() {
            Ok(Some(snapshot)) => memory.merge(&snapshot),
            Ok(None) => {}
            Err(error) => tracing::warn!(%error, "memory load failed, starting fresh"),
        }
        memory.games_played += 1;

        Self {
            analyzer: StateAnalyzer::new(),
            model: OpponentModel::new(),
            assessor: ThreatAssessor::new(),
            adapter: StrategyAdapter::new(),
            metrics: Metrics::new(),
            memory,
            cache: TurnCache::default(),
            danger,
            store,
            last_archetype: None,
            last_spend: 0.0,
            last_save_turn: 0,
        }
    }

    /// The single upward-facing entry point: one full decision pass. Always
    /// submits the turn, even when every phase degrades.
    pub fn decide_turn(&mut self, engine: &mut dyn GameEngine) {
        let turn = engine.turn_number();
        self.cache.invalidate_stale(turn);

        self.ingest_breach_feed(engine, turn);
        self.danger.update(engine);

        let snapshot = match self.analyzer.analyze(engine) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                // Degraded turn: nothing to reason about, but the turn still
                // goes out.
                tracing::warn!(turn, %error, "analysis failed, submitting empty turn");
                engine.submit_turn();
                return;
            }
        };

        // Damage observed this turn is credited to the most recently executed
        // archetype. Approximate by design.
        if snapshot.breaches_dealt > 0 {
            if let Some(archetype) = self.last_archetype.clone() {
                self.memory
                    .record_attack_damage(&archetype, snapshot.breaches_dealt as f64, turn);
            }
        }

        self.metrics.record_turn(&snapshot, self.last_spend);
        self.model
            .update(&snapshot, self.metrics.damage_taken.mean());
        let (threat, opportunities) =
            self.assessor
                .assess(&snapshot, &self.model, self.metrics.momentum);
        self.adapter.adapt(&snapshot, &self.metrics, threat.level);

        self.cache.write(
            turn,
            CacheEntry {
                snapshot: snapshot.clone(),
                threat: Some(threat),
                opportunities: opportunities.clone(),
            },
        );

        defense::build_defenses(engine, &snapshot, &self.memory, &self.adapter.thresholds);

        self.last_spend = self.run_offense(engine, &snapshot, &opportunities, turn);
        self.maybe_save(turn);
        engine.submit_turn();
    }

    pub fn mode(&self) -> StrategyMode {
        self.adapter.mode
    }

    pub fn cache(&self) -> &TurnCache {
        &self.cache
    }

    pub fn memory(&self) -> &PersistentMemory {
        &self.memory
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn model(&self) -> &OpponentModel {
        &self.model
    }

    fn ingest_breach_feed(&mut self, engine: &dyn GameEngine, turn: u32) {
        for event in engine.breach_events() {
            self.memory
                .record_breach(event.location, event.own_breach, turn);
        }
    }

    /// Selects and executes this turn's attack. Returns the mobile points
    /// actually committed.
    fn run_offense(
        &mut self,
        engine: &mut dyn GameEngine,
        snapshot: &Snapshot,
        opportunities: &[Opportunity],
        turn: u32,
    ) -> f64 {
        let decision = select_play(
            snapshot,
            opportunities,
            &self.adapter.thresholds,
            self.adapter.mode,
            self.model.predictability,
            self.danger.as_ref(),
        );

        match decision {
            PlayDecision::Attack(play) => {
                let plan = micro::plan(
                    play.archetype,
                    play.amount,
                    snapshot,
                    self.danger.as_ref(),
                    self.adapter.mode,
                );
                let spent = plan_cost(&plan);
                execute_plan(engine, &plan);
                self.memory.record_attack_attempt(play.archetype.id, turn);
                self.last_archetype = Some(play.archetype.id.to_string());
                spent
            }
            PlayDecision::FallbackVolley { column, count } => {
                let plan = vec![SpawnOrder {
                    unit_type: UnitType::Interceptor,
                    location: spawn_coord(column),
                    count,
                }];
                execute_plan(engine, &plan);
                self.memory.record_attack_attempt("interceptor_deny", turn);
                self.last_archetype = Some("interceptor_deny".to_string());
                count as f64
            }
            PlayDecision::Hold => 0.0,
        }
    }

    /// Periodic saves plus milestone saves when the game is effectively
    /// decided. Save failures are logged and never propagate.
    fn maybe_save(&mut self, turn: u32) {
        let win_probability = self.metrics.win_probability;
        let milestone = win_probability <= 0.05 || win_probability >= 0.95;
        let periodic = turn >= self.last_save_turn + SAVE_INTERVAL_TURNS;
        if !periodic && !milestone {
            return;
        }
        match self.store.save(&self.memory.snapshot()) {
            Ok(()) => self.last_save_turn = turn,
            Err(error) => tracing::warn!(turn, %error, "memory save failed"),
        }
    }
}

/// Runs a spawn plan against the engine. Each rejected order is retried once
/// at the adjacent deploy column toward the board center, then dropped
/// silently.
pub fn execute_plan(engine: &mut dyn GameEngine, plan: &SpawnPlan) {
    for order in plan {
        if engine.attempt_spawn(order.unit_type, order.location, order.count) {
            continue;
        }
        let toward_center = if order.location.x < 14 { 1 } else { -1 };
        let fallback = spawn_coord(order.location.x + toward_center);
        if !engine.attempt_spawn(order.unit_type, fallback, order.count) {
            tracing::debug!(
                unit = ?order.unit_type,
                x = order.location.x,
                "spawn dropped after fallback rejection"
            );
        }
    }
}
