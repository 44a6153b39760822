//! The per-run simulation kernel (spec.md §4).
//!
//! One `bevy_ecs::World` holds the mutable state as `Resource`s, advanced
//! by a `bevy_ecs::schedule::Schedule` of `.chain()`-ordered systems. A
//! single long-lived `World` would leak state across tenants, so this
//! kernel instead builds a fresh `World` from one [`Universe`] snapshot per
//! orchestrator run, ticks it in memory, and is then consumed back into an
//! updated snapshot — isolating each tenant's simulation state from every
//! other (spec.md §4.7, §9).

pub mod anomaly;
pub mod civilization;
pub mod end_conditions;
pub mod physics;
pub mod resources;

use bevy_ecs::schedule::Schedule;
use bevy_ecs::world::World;

use crate::domain::{DifficultyOptions, EndCondition, InitialConditions, PhysicalConstants, Universe};
use crate::rng::{DeterministicRng, ANOMALY_STREAM_SUFFIX};
use resources::{KernelConfig, KernelRng, TickEventLog, UniverseState};

pub use end_conditions::{collect_warnings, UniverseWarning, WarningSeverity};

/// One isolated in-memory simulation instance, built from a single
/// universe snapshot and torn back down into one after its ticks run.
pub struct SimulationKernel {
    world: World,
    schedule: Schedule,
}

impl SimulationKernel {
    /// Builds a fresh kernel from a universe snapshot plus the
    /// difficulty-derived options and player position for this run
    /// (spec.md §4.7 steps 2-4).
    pub fn from_universe(
        universe: &Universe,
        options: DifficultyOptions,
        player_position: (f64, f64, f64),
    ) -> Self {
        let mut world = World::new();
        world.insert_resource(UniverseState {
            current: universe.current_state,
            anomalies: universe.anomalies.clone(),
            civilizations: universe.civilizations.clone(),
            metrics: universe.metrics,
            milestones: universe.milestones.clone(),
            stability_history: universe.stability_history.clone(),
            next_anomaly_id: universe.next_anomaly_id,
            next_civilization_id: universe.next_civilization_id,
            ticks_run: universe.ticks_run,
            ended: None,
        });

        let constants = PhysicalConstants {
            observable_galaxies: universe.constants.observable_galaxies
                * options.observable_galaxies_multiplier,
            ..universe.constants
        };
        world.insert_resource(KernelConfig {
            constants,
            initial_conditions: universe.initial_conditions,
            options,
            player_position,
        });

        let physics_rng = DeterministicRng::for_stream(&universe.seed, &run_stream_suffix(universe));
        let anomaly_rng = DeterministicRng::for_stream(
            &universe.seed,
            &format!("{}{}", run_stream_suffix(universe), ANOMALY_STREAM_SUFFIX),
        );
        world.insert_resource(KernelRng {
            physics: physics_rng,
            anomaly: anomaly_rng,
        });

        world.insert_resource(TickEventLog(universe.significant_events.clone()));

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                physics::expansion_system,
                physics::structure_system,
                physics::life_and_civilization_system,
                anomaly::anomaly_generation_system,
                anomaly::anomaly_decay_system,
                physics::stability_system,
                end_conditions::end_condition_system,
            )
                .chain(),
        );

        Self { world, schedule }
    }

    /// Advances the simulation exactly one tick through the chained
    /// systems (spec.md §4.7 step 5). Returns the end condition if this
    /// tick caused the universe to terminate.
    pub fn tick(&mut self) -> Option<EndCondition> {
        self.schedule.run(&mut self.world);
        self.world.resource::<UniverseState>().ended
    }

    /// Consumes the kernel, writing its final state back onto the
    /// originating universe (spec.md §4.7 step 6).
    pub fn write_back(mut self, universe: &mut Universe) {
        let state = self.world.remove_resource::<UniverseState>().expect("UniverseState always present");
        universe.current_state = state.current;
        universe.anomalies = state.anomalies;
        universe.civilizations = state.civilizations;
        universe.metrics = state.metrics;
        universe.milestones = state.milestones;
        universe.stability_history = state.stability_history;
        universe.next_anomaly_id = state.next_anomaly_id;
        universe.next_civilization_id = state.next_civilization_id;
        universe.ticks_run = state.ticks_run;

        let events = self.world.remove_resource::<TickEventLog>().expect("TickEventLog always present");
        universe.significant_events = events.0;

        if let Some(condition) = state.ended {
            universe.end(condition);
        } else {
            universe.touch();
        }
    }
}

/// Derives a per-run RNG stream suffix from the universe's cumulative
/// tick count, so repeated orchestrator runs over the same universe
/// continue the deterministic sequence rather than restarting it
/// (spec.md §4.1, §9).
fn run_stream_suffix(universe: &Universe) -> String {
    format!("_run{}", universe.ticks_run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, InitialConditions, Universe};

    fn sample_universe() -> Universe {
        Universe::new(
            "owner".into(),
            "test".into(),
            "determinism-seed".into(),
            Difficulty::Beginner,
            PhysicalConstants::default(),
            InitialConditions::default(),
        )
    }

    #[test]
    fn identical_seeds_produce_identical_trajectories() {
        let universe_a = sample_universe();
        let universe_b = sample_universe();
        let options = Difficulty::Beginner.options();

        let mut kernel_a = SimulationKernel::from_universe(&universe_a, options, (0.0, 0.0, 0.0));
        let mut kernel_b = SimulationKernel::from_universe(&universe_b, options, (0.0, 0.0, 0.0));
        for _ in 0..50 {
            kernel_a.tick();
            kernel_b.tick();
        }

        let mut final_a = universe_a;
        let mut final_b = universe_b;
        kernel_a.write_back(&mut final_a);
        kernel_b.write_back(&mut final_b);

        assert_eq!(final_a.current_state.age, final_b.current_state.age);
        assert_eq!(final_a.current_state.scale_factor, final_b.current_state.scale_factor);
        assert_eq!(final_a.current_state.galaxy_count, final_b.current_state.galaxy_count);
        assert_eq!(final_a.anomalies.len(), final_b.anomalies.len());
    }

    #[test]
    fn ten_ticks_on_beginner_reaches_reionization() {
        let universe = sample_universe();
        let options = Difficulty::Beginner.options();
        let mut kernel = SimulationKernel::from_universe(&universe, options, (0.0, 0.0, 0.0));
        for _ in 0..10 {
            kernel.tick();
        }
        let mut universe = universe;
        kernel.write_back(&mut universe);
        assert!((universe.current_state.age_gyr() - 0.5).abs() < 1.0e-6);
        assert_eq!(
            universe.current_state.cosmic_phase,
            crate::domain::CosmicPhase::Reionization
        );
        assert!(universe.current_state.stability_index > 0.5);
    }
}
