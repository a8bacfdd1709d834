//! Cross-game learning memory.
//!
//! Accumulates attack-outcome and breach statistics during a game and merges
//! them with the on-disk history. Merge is additive: loading never replaces
//! an existing key outright, incoming counters update in place, so merges on
//! disjoint keys commute.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::engine::{Coord, MemoryStore, PersistenceError};

/// Turns between periodic saves.
pub const SAVE_INTERVAL_TURNS: u32 = 10;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct AttackStats {
    pub attempts: u32,
    pub successes: u32,
    pub total_damage: f64,
    pub last_turn: u32,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct BreachStats {
    pub count: u32,
    pub last_turn: u32,
}

/// The persisted whole-value form. Breach keys are structured coordinates,
/// stored as entry pairs to stay JSON-friendly.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    pub games_played: u32,
    pub attacks: BTreeMap<String, AttackStats>,
    pub breaches_taken: Vec<(Coord, BreachStats)>,
    pub breaches_dealt: Vec<(Coord, BreachStats)>,
}

/// In-memory aggregate, keyed directly by archetype id and coordinate.
#[derive(Clone, Debug, Default)]
pub struct PersistentMemory {
    pub games_played: u32,
    pub attacks: HashMap<String, AttackStats>,
    pub breaches_taken: HashMap<Coord, BreachStats>,
    pub breaches_dealt: HashMap<Coord, BreachStats>,
}

impl PersistentMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Additive merge. Existing keys are updated in place, never replaced;
    /// `last_turn` keeps the most recent value.
    pub fn merge(&mut self, incoming: &MemorySnapshot) {
        self.games_played += incoming.games_played;
        for (id, stats) in &incoming.attacks {
            let entry = self.attacks.entry(id.clone()).or_default();
            entry.attempts += stats.attempts;
            entry.successes += stats.successes;
            entry.total_damage += stats.total_damage;
            entry.last_turn = entry.last_turn.max(stats.last_turn);
        }
        for (location, stats) in &incoming.breaches_taken {
            let entry = self.breaches_taken.entry(*location).or_default();
            entry.count += stats.count;
            entry.last_turn = entry.last_turn.max(stats.last_turn);
        }
        for (location, stats) in &incoming.breaches_dealt {
            let entry = self.breaches_dealt.entry(*location).or_default();
            entry.count += stats.count;
            entry.last_turn = entry.last_turn.max(stats.last_turn);
        }
    }

    pub fn snapshot(&self) -> MemorySnapshot {
        let mut breaches_taken: Vec<_> = self
            .breaches_taken
            .iter()
            .map(|(c, s)| (*c, *s))
            .collect();
        breaches_taken.sort_by_key(|(c, _)| *c);
        let mut breaches_dealt: Vec<_> = self
            .breaches_dealt
            .iter()
            .map(|(c, s)| (*c, *s))
            .collect();
        breaches_dealt.sort_by_key(|(c, _)| *c);
        MemorySnapshot {
            games_played: self.games_played,
            attacks: self.attacks.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            breaches_taken,
            breaches_dealt,
        }
    }

    pub fn record_attack_attempt(&mut self, archetype_id: &str, turn: u32) {
        let entry = self.attacks.entry(archetype_id.to_string()).or_default();
        entry.attempts += 1;
        entry.last_turn = turn;
    }

    /// Damage is credited to the named archetype. When several attacks land
    /// the same turn this can misassign credit; the approximation is kept
    /// deliberately (see tests).
    pub fn record_attack_damage(&mut self, archetype_id: &str, damage: f64, turn: u32) {
        let entry = self.attacks.entry(archetype_id.to_string()).or_default();
        if damage > 0.0 {
            entry.successes += 1;
            entry.total_damage += damage;
        }
        entry.last_turn = turn;
    }

    pub fn record_breach(&mut self, location: Coord, own_breach: bool, turn: u32) {
        let map = if own_breach {
            &mut self.breaches_dealt
        } else {
            &mut self.breaches_taken
        };
        let entry = map.entry(location).or_default();
        entry.count += 1;
        entry.last_turn = turn;
    }

    /// The opponent's most frequently breached entry point, if any.
    pub fn hottest_breach_taken(&self) -> Option<(Coord, u32)> {
        self.breaches_taken
            .iter()
            .max_by_key(|(location, stats)| (stats.count, std::cmp::Reverse(*location)))
            .map(|(location, stats)| (*location, stats.count))
    }

    /// Breach locations we have conceded at least `floor` times.
    pub fn repeat_breaches_taken(&self, floor: u32) -> Vec<Coord> {
        let mut out: Vec<Coord> = self
            .breaches_taken
            .iter()
            .filter(|(_, stats)| stats.count >= floor)
            .map(|(location, _)| *location)
            .collect();
        out.sort();
        out
    }

    /// Human-readable summary for the CLI `report` subcommand.
    pub fn render_report(&self) -> String {
        let mut report = format!("Rampart memory report - {} game(s)\n", self.games_played);
        report.push_str("========================================\n\n");
        report.push_str("Attack archetypes:\n");
        let mut attack_ids: Vec<_> = self.attacks.keys().collect();
        attack_ids.sort();
        for id in attack_ids {
            let stats = &self.attacks[id];
            let rate = if stats.attempts > 0 {
                100.0 * stats.successes as f64 / stats.attempts as f64
            } else {
                0.0
            };
            report.push_str(&format!(
                "  {id}: {} attempts, {} scored ({rate:.1}%), {:.1} total damage\n",
                stats.attempts, stats.successes, stats.total_damage
            ));
        }
        report.push_str("\nBreaches conceded:\n");
        let mut taken: Vec<_> = self.breaches_taken.iter().collect();
        taken.sort_by_key(|(c, _)| **c);
        for (location, stats) in taken {
            report.push_str(&format!(
                "  ({}, {}): {} (last turn {})\n",
                location.x, location.y, stats.count, stats.last_turn
            ));
        }
        report
    }
}

/// Production store: one JSON file, whole-value load and save.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl MemoryStore for JsonFileStore {
    fn load(&self) -> Result<Option<MemorySnapshot>, PersistenceError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, snapshot: &MemorySnapshot) -> Result<(), PersistenceError> {
        let json = serde_json::to_string_pretty(snapshot)?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_with(id: &str, attempts: u32, breach: (Coord, u32)) -> MemorySnapshot {
        let mut attacks = BTreeMap::new();
        attacks.insert(
            id.to_string(),
            AttackStats {
                attempts,
                successes: attempts / 2,
                total_damage: attempts as f64,
                last_turn: attempts,
            },
        );
        MemorySnapshot {
            games_played: 1,
            attacks,
            breaches_taken: vec![(
                breach.0,
                BreachStats {
                    count: breach.1,
                    last_turn: 5,
                },
            )],
            breaches_dealt: Vec::new(),
        }
    }

    #[test]
    fn merge_updates_existing_keys_in_place() {
        let mut memory = PersistentMemory::new();
        memory.merge(&snapshot_with("scout_flood", 4, (Coord::new(3, 13), 2)));
        memory.merge(&snapshot_with("scout_flood", 2, (Coord::new(3, 13), 1)));

        let stats = &memory.attacks["scout_flood"];
        assert_eq!(stats.attempts, 6);
        assert_eq!(stats.successes, 3);
        assert_eq!(memory.breaches_taken[&Coord::new(3, 13)].count, 3);
        assert_eq!(memory.games_played, 2);
    }

    #[test]
    fn merge_commutes_on_disjoint_keys() {
        let a = snapshot_with("scout_flood", 3, (Coord::new(3, 13), 2));
        let b = snapshot_with("demo_breach", 5, (Coord::new(20, 6), 1));

        let mut first = PersistentMemory::new();
        first.merge(&a);
        first.merge(&b);
        let mut second = PersistentMemory::new();
        second.merge(&b);
        second.merge(&a);

        assert_eq!(first.attacks["scout_flood"], second.attacks["scout_flood"]);
        assert_eq!(first.attacks["demo_breach"], second.attacks["demo_breach"]);
        assert_eq!(
            first.breaches_taken[&Coord::new(3, 13)],
            second.breaches_taken[&Coord::new(3, 13)]
        );
        assert_eq!(first.games_played, second.games_played);
    }

    #[test]
    fn damage_attribution_credits_the_named_archetype_only() {
        // Known limitation: when two attacks land the same turn, credit goes
        // to the most recently executed archetype. The bookkeeping is
        // deliberately approximate.
        let mut memory = PersistentMemory::new();
        memory.record_attack_attempt("scout_flood", 4);
        memory.record_attack_attempt("demo_breach", 4);
        memory.record_attack_damage("demo_breach", 3.0, 5);

        assert_eq!(memory.attacks["demo_breach"].successes, 1);
        assert_eq!(memory.attacks["scout_flood"].successes, 0);
    }

    #[test]
    fn repeat_breach_lookup_filters_by_floor() {
        let mut memory = PersistentMemory::new();
        for _ in 0..3 {
            memory.record_breach(Coord::new(5, 8), false, 7);
        }
        memory.record_breach(Coord::new(9, 4), false, 8);
        memory.record_breach(Coord::new(10, 3), true, 8);

        assert_eq!(memory.repeat_breaches_taken(2), vec![Coord::new(5, 8)]);
        assert_eq!(memory.hottest_breach_taken(), Some((Coord::new(5, 8), 3)));
    }

    #[test]
    fn json_store_round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        let store = JsonFileStore::new(&path);

        assert!(store.load().unwrap().is_none());

        let mut memory = PersistentMemory::new();
        memory.games_played = 1;
        memory.record_attack_attempt("pincer_attack", 9);
        memory.record_breach(Coord::new(14, 0), false, 9);
        store.save(&memory.snapshot()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.games_played, 1);
        assert_eq!(loaded.attacks["pincer_attack"].attempts, 1);
        assert_eq!(loaded.breaches_taken.len(), 1);
    }

    #[test]
    fn report_lists_archetypes_and_breaches() {
        let mut memory = PersistentMemory::new();
        memory.record_attack_attempt("scout_flood", 3);
        memory.record_attack_damage("scout_flood", 2.0, 3);
        memory.record_breach(Coord::new(1, 12), false, 4);

        let report = memory.render_report();
        assert!(report.contains("scout_flood: 1 attempts, 1 scored (100.0%)"));
        assert!(report.contains("(1, 12): 1 (last turn 4)"));
    }
}
