//! bevy_ecs resources the kernel's systems operate on.
//!
//! One [`SimulationKernel`](super::SimulationKernel) run constructs a fresh
//! `bevy_ecs::World` from a single [`Universe`](crate::domain::Universe)
//! snapshot and inserts these resources before building a chained
//! `Schedule` over them.

use bevy_ecs::prelude::Resource;

use crate::domain::{
    Civilization, CurrentState, DifficultyOptions, EndCondition, InitialConditions, Metrics,
    Milestones, PhysicalConstants, SignificantEventLog,
};
use crate::domain::Anomaly;
use crate::rng::DeterministicRng;

/// Everything the per-tick systems read and mutate: the live simulation
/// state plus the bounded collections it owns.
#[derive(Resource)]
pub struct UniverseState {
    pub current: CurrentState,
    pub anomalies: Vec<Anomaly>,
    pub civilizations: Vec<Civilization>,
    pub metrics: Metrics,
    pub milestones: Milestones,
    pub stability_history: Vec<f64>,
    pub next_anomaly_id: u64,
    pub next_civilization_id: u64,
    pub ticks_run: u64,
    pub ended: Option<EndCondition>,
}

/// Run-scoped, read-only configuration (spec.md §4.7 step 2): physical
/// constants, initial conditions, and the difficulty-derived options,
/// including the observable-galaxies multiplier already folded in.
#[derive(Resource, Clone, Copy)]
pub struct KernelConfig {
    pub constants: PhysicalConstants,
    pub initial_conditions: InitialConditions,
    pub options: DifficultyOptions,
    pub player_position: (f64, f64, f64),
}

/// The two independent deterministic RNG substreams (spec.md §4.1):
/// physics and anomaly generation.
#[derive(Resource)]
pub struct KernelRng {
    pub physics: DeterministicRng,
    pub anomaly: DeterministicRng,
}

/// Events appended during this run, continuing the universe's existing
/// bounded log (spec.md §3, §9).
#[derive(Resource)]
pub struct TickEventLog(pub SignificantEventLog);
