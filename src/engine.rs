//! Collaborator interfaces and core board types.
//!
//! The agent never talks to the game simulation or the disk directly; it goes
//! through the [`GameEngine`] and [`MemoryStore`] traits defined here. The
//! surrounding harness supplies the production implementations, tests supply
//! scripted mocks.

use serde::{Deserialize, Serialize};

/// Board width in columns. Both halves span the full width.
pub const BOARD_WIDTH: i32 = 28;
/// Highest row index of our half. Rows above belong to the opponent.
pub const OUR_HALF_TOP: i32 = 13;
/// Lowest row index of the enemy half.
pub const ENEMY_HALF_BOTTOM: i32 = 14;
/// Highest row on the board.
pub const BOARD_TOP: i32 = 27;

/// A board coordinate. Used directly as a map key everywhere; coordinates are
/// never round-tripped through strings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn manhattan(self, other: Coord) -> i32 {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    pub fn on_our_half(self) -> bool {
        self.y <= OUR_HALF_TOP
    }
}

/// The deploy-edge coordinate for a given column on our side of the diamond.
pub fn spawn_coord(column: i32) -> Coord {
    let x = column.clamp(0, BOARD_WIDTH - 1);
    let y = if x <= 13 { 13 - x } else { x - 14 };
    Coord::new(x, y)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Us,
    Them,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitType {
    Wall,
    Support,
    Turret,
    Scout,
    Demolisher,
    Interceptor,
}

impl UnitType {
    pub fn is_structure(self) -> bool {
        matches!(self, UnitType::Wall | UnitType::Support | UnitType::Turret)
    }

    /// Mobile-point cost per unit. Structures spend the other resource kind
    /// and are priced by the engine.
    pub fn mobile_cost(self) -> f64 {
        match self {
            UnitType::Scout => 1.0,
            UnitType::Demolisher => 3.0,
            UnitType::Interceptor => 1.0,
            _ => 0.0,
        }
    }
}

/// Which resource pool a query refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceKind {
    /// Spent on walls, supports, turrets and upgrades.
    Structure,
    /// Spent on scouts, demolishers and interceptors.
    Mobile,
}

/// A unit as reported by the engine at some coordinate.
#[derive(Clone, Debug)]
pub struct PlacedUnit {
    pub owner: Side,
    pub unit_type: UnitType,
    pub health: f64,
    pub max_health: f64,
    pub upgraded: bool,
}

/// One breach event from the engine's per-turn action feed.
#[derive(Clone, Copy, Debug)]
pub struct BreachEvent {
    pub location: Coord,
    /// True when our units breached the opponent's edge.
    pub own_breach: bool,
}

/// The game-simulation collaborator. One decision pass runs per turn; the
/// engine answers queries about the committed state of that turn and buffers
/// spawn/upgrade requests until `submit_turn`.
pub trait GameEngine {
    fn resource(&self, kind: ResourceKind, side: Side) -> f64;
    fn can_spawn(&self, unit_type: UnitType, location: Coord) -> bool;
    fn attempt_spawn(&mut self, unit_type: UnitType, location: Coord, count: u32) -> bool;
    fn attempt_upgrade(&mut self, location: Coord) -> bool;
    fn is_occupied(&self, location: Coord) -> bool;
    fn units_at(&self, location: Coord) -> Vec<PlacedUnit>;
    fn turn_number(&self) -> u32;
    fn self_health(&self) -> f64;
    fn enemy_health(&self) -> f64;
    /// Path a mobile unit would take from `location` to the opposite edge.
    /// `None` when the engine exposes no pathing primitive; the capability is
    /// probed once at agent construction.
    fn path_to_edge(&self, location: Coord) -> Option<Vec<Coord>>;
    fn submit_turn(&mut self);
    /// Breach events observed since the previous decision pass.
    fn breach_events(&self) -> Vec<BreachEvent>;
}

/// The persistence collaborator. Whole-value load and save; no partial writes.
pub trait MemoryStore {
    fn load(&self) -> Result<Option<crate::memory::MemorySnapshot>, PersistenceError>;
    fn save(&self, snapshot: &crate::memory::MemorySnapshot) -> Result<(), PersistenceError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("memory store io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("memory store decode failure: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Phase-boundary error taxonomy. Every phase of the decision pass returns
/// one of these instead of panicking; the turn loop degrades and still
/// submits the turn.
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    #[error("missing data from engine: {0}")]
    MissingData(&'static str),
    #[error("analysis failure in {phase}: {detail}")]
    Analysis { phase: &'static str, detail: String },
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_coord_follows_the_deploy_edge() {
        assert_eq!(spawn_coord(13), Coord::new(13, 0));
        assert_eq!(spawn_coord(14), Coord::new(14, 0));
        assert_eq!(spawn_coord(0), Coord::new(0, 13));
        assert_eq!(spawn_coord(27), Coord::new(27, 13));
        assert_eq!(spawn_coord(20), Coord::new(20, 6));
    }

    #[test]
    fn spawn_coord_clamps_out_of_range_columns() {
        assert_eq!(spawn_coord(-4), spawn_coord(0));
        assert_eq!(spawn_coord(99), spawn_coord(27));
    }

    #[test]
    fn mobile_costs_cover_only_mobile_units() {
        assert_eq!(UnitType::Wall.mobile_cost(), 0.0);
        assert_eq!(UnitType::Demolisher.mobile_cost(), 3.0);
        assert!(UnitType::Turret.is_structure());
        assert!(!UnitType::Scout.is_structure());
    }
}
