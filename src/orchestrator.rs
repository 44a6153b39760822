//! The step orchestrator (spec.md §4.7): the one place that loads a
//! universe, drives its kernel for a bounded run, runs the predictor, and
//! persists the result atomically.

use serde::Serialize;
use tokio::time::Instant;

use crate::domain::{EndCondition, Universe, UniverseId, UniverseStatus};
use crate::error::AppError;
use crate::kernel::SimulationKernel;
use crate::predictor::{self, PredictionReport};
use crate::store::PersistentStore;

/// Upper bound on how many ticks a single `simulate` call will run,
/// regardless of what the caller requests (spec.md §4.7 step 3).
pub const MAX_STEPS_PER_RUN: u32 = 100;

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub universe: Universe,
    pub steps_requested: u32,
    pub steps_completed: u32,
    pub ended: bool,
    pub end_condition: Option<EndCondition>,
    pub prediction: PredictionReport,
}

/// Runs a universe forward by up to `requested_steps` ticks (capped at
/// [`MAX_STEPS_PER_RUN`]), stopping early on an end condition or on
/// `deadline`, then persists the result and returns a report (spec.md
/// §4.7).
pub async fn simulate(
    store: &dyn PersistentStore,
    owner_id: &str,
    id: UniverseId,
    requested_steps: u32,
    deadline: Option<Instant>,
) -> Result<SimulationReport, AppError> {
    let handle = store.lock(owner_id, id).await?;
    let mut universe = handle.lock().await;

    if universe.status == UniverseStatus::Ended {
        return Err(AppError::BusinessRule(format!(
            "universe {id} has already ended"
        )));
    }

    let steps = requested_steps.clamp(1, MAX_STEPS_PER_RUN);
    let options = universe.difficulty.options();
    let player_position = (0.0, 0.0, 0.0);

    let mut kernel = SimulationKernel::from_universe(&universe, options, player_position);
    let mut steps_completed = 0;
    let mut end_condition = None;

    for _ in 0..steps {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }
        end_condition = kernel.tick();
        steps_completed += 1;
        if end_condition.is_some() {
            break;
        }
    }

    kernel.write_back(&mut universe);
    let prediction = predictor::predict(&universe);
    let report = SimulationReport {
        universe: universe.clone(),
        steps_requested: requested_steps,
        steps_completed,
        ended: end_condition.is_some(),
        end_condition,
        prediction,
    };
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Difficulty, InitialConditions, PhysicalConstants};
    use crate::store::InMemoryStore;

    async fn seeded_store(seed: &str) -> (InMemoryStore, UniverseId) {
        let store = InMemoryStore::new();
        let universe = Universe::new(
            "owner".into(),
            "test".into(),
            seed.into(),
            Difficulty::Beginner,
            PhysicalConstants::default(),
            InitialConditions::default(),
        );
        let id = universe.id;
        store.create(universe).await.unwrap();
        (store, id)
    }

    #[tokio::test]
    async fn steps_are_capped_at_max_per_run() {
        let (store, id) = seeded_store("cap-test").await;
        let report = simulate(&store, "owner", id, 1000, None).await.unwrap();
        assert!(report.steps_completed <= MAX_STEPS_PER_RUN);
    }

    #[tokio::test]
    async fn ended_universe_rejects_further_simulation() {
        let (store, id) = seeded_store("ended-test").await;
        {
            let handle = store.lock("owner", id).await.unwrap();
            let mut universe = handle.lock().await;
            universe.end(EndCondition::BigRip);
        }
        let err = simulate(&store, "owner", id, 10, None).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[tokio::test]
    async fn one_hundred_steps_reaches_first_galaxy() {
        let (store, id) = seeded_store("s2-first-galaxy").await;
        let report = simulate(&store, "owner", id, 100, None).await.unwrap();
        assert!(report.universe.milestones.is_set(crate::domain::universe::Milestones::FIRST_GALAXY));
        assert!(report.universe.current_state.galaxy_count >= 100.0);
    }
}
