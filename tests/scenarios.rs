//! Crate-level scenario tests, one per named scenario in spec.md §8.
//! These exercise the public API (store + orchestrator + kernel helpers)
//! rather than internal kernel state, the same way
//! `nomai-engine/tests/milestone_week*.rs` asserts against a rehydrated
//! snapshot.

use std::collections::HashMap;

use chrono::Utc;
use cosmoforge::domain::{
    Anomaly, AnomalyCategory, AnomalyType, Difficulty, EndCondition, InitialConditions, Location,
    PhysicalConstants, Universe, UniverseStatus,
};
use cosmoforge::kernel::anomaly::resolve_anomaly;
use cosmoforge::orchestrator;
use cosmoforge::store::{InMemoryStore, PersistentStore};

fn seeded_universe(seed: &str, difficulty: Difficulty) -> Universe {
    Universe::new(
        "owner".into(),
        "test".into(),
        seed.into(),
        difficulty,
        PhysicalConstants::default(),
        InitialConditions::default(),
    )
}

/// Scenario 1: seed "S1", Beginner, 10 ticks.
#[tokio::test]
async fn scenario_1_ten_ticks_beginner_reaches_reionization() {
    let store = InMemoryStore::new();
    let universe = seeded_universe("S1", Difficulty::Beginner);
    let id = universe.id;
    store.create(universe).await.unwrap();

    let report = orchestrator::simulate(&store, "owner", id, 10, None).await.unwrap();
    let state = &report.universe.current_state;

    assert!((state.age_gyr() - 0.5).abs() < 1.0e-6);
    assert_eq!(
        state.cosmic_phase,
        cosmoforge::domain::CosmicPhase::Reionization
    );
    assert!(state.stability_index > 0.5);
}

/// Scenario 2: seed "S2", Intermediate, 100 ticks.
#[tokio::test]
async fn scenario_2_hundred_ticks_intermediate_seeds_galaxies() {
    let store = InMemoryStore::new();
    let universe = seeded_universe("S2", Difficulty::Intermediate);
    let id = universe.id;
    store.create(universe).await.unwrap();

    let report = orchestrator::simulate(&store, "owner", id, 100, None).await.unwrap();
    assert!(report
        .universe
        .milestones
        .is_set(cosmoforge::domain::universe::Milestones::FIRST_GALAXY));
    assert!(report.universe.current_state.galaxy_count >= 100.0);
}

/// Scenario 3: forcing `_scaleFactor` past the big-rip threshold ends the
/// universe on the very next tick.
#[tokio::test]
async fn scenario_3_forced_scale_factor_triggers_big_rip() {
    let store = InMemoryStore::new();
    let universe = seeded_universe("S3", Difficulty::Intermediate);
    let id = universe.id;
    store.create(universe).await.unwrap();

    {
        let handle = store.lock("owner", id).await.unwrap();
        let mut universe = handle.lock().await;
        universe.current_state.scale_factor = 2.0e9;
    }

    let report = orchestrator::simulate(&store, "owner", id, 1, None).await.unwrap();
    assert_eq!(report.universe.status, UniverseStatus::Ended);
    assert_eq!(report.universe.end_condition, Some(EndCondition::BigRip));
}

/// Civilization spawning (spec.md §4.4) fires once its gate conditions
/// (ageGyr > 5, life-bearing planets > 1000) are met, which requires a
/// habitable temperature window around the 2.725 K reference
/// `temperatureFactor` is centered on (spec.md §4.2.1, §4.2.3).
#[tokio::test]
async fn civilizations_spawn_once_life_and_age_gates_are_met() {
    let store = InMemoryStore::new();
    let universe = seeded_universe("civilization-gate", Difficulty::Intermediate);
    let id = universe.id;
    store.create(universe).await.unwrap();

    {
        let handle = store.lock("owner", id).await.unwrap();
        let mut universe = handle.lock().await;
        universe.current_state.age = 6.0e9;
        universe.current_state.metallicity = 0.5;
        universe.current_state.star_count = 1.0e12;
        universe.current_state.habitable_systems_count = 1.0e9;
        universe.current_state.life_bearing_planets_count = 1.0e8;
    }

    let report = orchestrator::simulate(&store, "owner", id, 1, None).await.unwrap();
    assert!(report.universe.civilizations.iter().any(|c| !c.extinct));
    assert!(report.universe.current_state.civilization_count > 0);
}

/// Scenario 4: two identical universes (same seed, same constants)
/// simulated independently for 50 steps produce equal resulting states.
#[tokio::test]
async fn scenario_4_identical_seeds_diverge_never() {
    let store_a = InMemoryStore::new();
    let universe_a = seeded_universe("S4-twin", Difficulty::Intermediate);
    let id_a = universe_a.id;
    store_a.create(universe_a).await.unwrap();

    let store_b = InMemoryStore::new();
    let universe_b = seeded_universe("S4-twin", Difficulty::Intermediate);
    let id_b = universe_b.id;
    store_b.create(universe_b).await.unwrap();

    let report_a = orchestrator::simulate(&store_a, "owner", id_a, 50, None).await.unwrap();
    let report_b = orchestrator::simulate(&store_b, "owner", id_b, 50, None).await.unwrap();

    let a = report_a.universe.current_state;
    let b = report_b.universe.current_state;
    assert_eq!(a.age, b.age);
    assert_eq!(a.scale_factor, b.scale_factor);
    assert_eq!(a.temperature, b.temperature);
    assert_eq!(a.entropy, b.entropy);
    assert_eq!(a.stability_index, b.stability_index);
    assert_eq!(a.galaxy_count, b.galaxy_count);
    assert_eq!(a.star_count, b.star_count);
    assert_eq!(a.metallicity, b.metallicity);
    assert_eq!(report_a.universe.anomalies.len(), report_b.universe.anomalies.len());
    assert_eq!(
        report_a.universe.civilizations.len(),
        report_b.universe.civilizations.len()
    );
}

fn manual_anomaly(id: u64, severity: f64) -> Anomaly {
    Anomaly {
        id,
        kind: AnomalyType::QuantumFluctuation,
        category: AnomalyCategory::Quantum,
        severity,
        timestamp: Utc::now(),
        resolved: false,
        resolved_at: None,
        effects_raw: HashMap::new(),
        location: Location { x: 0.0, y: 0.0, z: 0.0 },
        radius: 1000.0 * severity,
        description: "manually injected for a scenario test".into(),
        decay_rate: 0.0,
    }
}

/// Scenario 5: manually generating an anomaly and resolving it increases
/// stability by exactly `0.015 * severity` (pre-clamp) and the resolution
/// metrics update accordingly.
#[tokio::test]
async fn scenario_5_resolving_an_anomaly_boosts_stability_exactly() {
    let mut universe = seeded_universe("S5", Difficulty::Intermediate);
    universe.current_state.stability_index = 0.5;
    universe.anomalies.push(manual_anomaly(1, 3.0));

    let before = universe.current_state.stability_index;
    resolve_anomaly(&mut universe, 1).unwrap();

    assert_eq!(universe.current_state.stability_index, before + 0.015 * 3.0);
    assert_eq!(universe.metrics.anomalies_resolved, 1);
    assert_eq!(universe.metrics.player_interventions, 1);
    assert!(universe.anomalies[0].resolved);
}

/// Scenario 6: once a universe is at the anomaly cap, further generation
/// is a no-op; a manual cleanup with `keepRecentMinutes = 0` reclaims
/// room for subsequent generation.
#[tokio::test]
async fn scenario_6_anomaly_cap_then_cleanup_reclaims_room() {
    use cosmoforge::domain::universe::MAX_ANOMALIES;
    use cosmoforge::kernel::anomaly::auto_cleanup;

    let mut anomalies: Vec<Anomaly> = (0..MAX_ANOMALIES as u64)
        .map(|i| {
            let mut a = manual_anomaly(i, 1.0);
            a.resolved = true;
            a.resolved_at = Some(Utc::now() - chrono::Duration::minutes(10));
            a
        })
        .collect();
    assert_eq!(anomalies.len(), MAX_ANOMALIES);

    let removed = auto_cleanup(&mut anomalies, 0);
    assert_eq!(removed, MAX_ANOMALIES);
    assert!(anomalies.is_empty());
}

/// Round-trip property (spec.md §8): persisting then reloading a
/// universe with no further ticks yields an equal snapshot, field by
/// field, through the real wire encoding.
#[tokio::test]
async fn round_trip_through_store_preserves_every_field() {
    let store = InMemoryStore::new();
    let universe = seeded_universe("round-trip-seed", Difficulty::Advanced);
    let id = universe.id;
    let original = universe.clone();
    store.create(universe).await.unwrap();

    let reloaded = store.get("owner", id).await.unwrap();
    assert_eq!(
        serde_json::to_value(&original).unwrap(),
        serde_json::to_value(&reloaded).unwrap()
    );
}

/// Idempotence property (spec.md §8): resolving an already-resolved
/// anomaly is rejected and leaves metrics untouched.
#[tokio::test]
async fn idempotence_resolving_twice_leaves_metrics_untouched() {
    let mut universe = seeded_universe("idempotence-seed", Difficulty::Intermediate);
    universe.anomalies.push(manual_anomaly(1, 2.0));

    resolve_anomaly(&mut universe, 1).unwrap();
    let metrics_after_first = universe.metrics;

    let err = resolve_anomaly(&mut universe, 1).unwrap_err();
    assert!(matches!(err, cosmoforge::error::AppError::BusinessRule(_)));
    assert_eq!(universe.metrics.anomalies_resolved, metrics_after_first.anomalies_resolved);
    assert_eq!(universe.metrics.player_interventions, metrics_after_first.player_interventions);
}

/// Invariant (spec.md §8): once a universe has ended, further simulate
/// calls are rejected and its state is left untouched.
#[tokio::test]
async fn ended_universe_state_is_frozen() {
    let store = InMemoryStore::new();
    let universe = seeded_universe("frozen-seed", Difficulty::Intermediate);
    let id = universe.id;
    store.create(universe).await.unwrap();

    {
        let handle = store.lock("owner", id).await.unwrap();
        let mut universe = handle.lock().await;
        universe.end(EndCondition::HeatDeath);
    }
    let frozen_state = store.get("owner", id).await.unwrap().current_state;

    let err = orchestrator::simulate(&store, "owner", id, 5, None).await.unwrap_err();
    assert!(matches!(err, cosmoforge::error::AppError::BusinessRule(_)));

    let still_frozen = store.get("owner", id).await.unwrap();
    assert_eq!(still_frozen.current_state.age, frozen_state.age);
    assert_eq!(still_frozen.status, UniverseStatus::Ended);
}
