//! Rampart: the adaptive decision core of a turn-based tower-defense agent.
//!
//! Each turn the agent analyzes the board, refines its model of the
//! opponent, assesses threats and openings, picks a strategy mode, builds
//! defenses, and converts any remaining attack budget into concrete spawn
//! orders. Outcomes feed a JSON-backed memory that carries across games.
//!
//! The game simulation and the disk are external collaborators behind the
//! [`engine::GameEngine`] and [`engine::MemoryStore`] traits; everything in
//! this crate is synchronous and single-threaded by design.

pub mod adapt;
pub mod agent;
pub mod analyzer;
pub mod assess;
pub mod danger;
pub mod defense;
pub mod engine;
pub mod memory;
pub mod micro;
pub mod modeler;
pub mod playbook;
pub mod testkit;

pub use agent::Agent;
pub use engine::{Coord, GameEngine, MemoryStore, Side, UnitType};
pub use memory::JsonFileStore;
