//! The persisted data model (spec.md §3): Universe, Anomaly, Civilization
//! and the bounded event log they share.

pub mod anomaly;
pub mod civilization;
pub mod events;
pub mod universe;

pub use anomaly::{Anomaly, AnomalyCategory, AnomalyType, Location};
pub use civilization::{Civilization, CivilizationType, ExtinctionCause};
pub use events::{SignificantEvent, SignificantEventKind, SignificantEventLog};
pub use universe::{
    CosmicPhase, CurrentState, Difficulty, DifficultyOptions, EndCondition, InitialConditions,
    Metrics, Milestones, PhysicalConstants, Universe, UniverseId, UniverseStatus,
};
