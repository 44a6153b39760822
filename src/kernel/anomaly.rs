//! Anomaly generation, effect application, decay, and resolution
//! (spec.md §4.3).

use std::f64::consts::PI;

use bevy_ecs::prelude::{Res, ResMut};
use chrono::{Duration, Utc};

use crate::domain::anomaly::{anomaly_type_table, Anomaly, Location};
use crate::domain::events::SignificantEvent;
use crate::error::AppError;
use crate::kernel::resources::{KernelConfig, KernelRng, TickEventLog, UniverseState};

const CHUNK_SIZE: f64 = 1000.0;
const AUTO_CLEANUP_KEEP_RECENT_MINUTES: i64 = 5;

/// Removes resolved anomalies whose `resolved_at` is older than
/// `keep_recent_minutes`, returning how many were removed (spec.md §4.3.2
/// step 1, and the manual cleanup endpoint in §6.1).
pub fn auto_cleanup(anomalies: &mut Vec<Anomaly>, keep_recent_minutes: i64) -> usize {
    let cutoff = Utc::now() - Duration::minutes(keep_recent_minutes);
    let before = anomalies.len();
    anomalies.retain(|a| !(a.resolved && a.resolved_at.map(|at| at < cutoff).unwrap_or(false)));
    before - anomalies.len()
}

fn sample_location(rng: &mut crate::rng::DeterministicRng, player_position: (f64, f64, f64)) -> Location {
    let theta = rng.next_f64() * 2.0 * PI;
    let chunks_away = 1.0 + rng.next_f64() * 3.0;
    let distance = chunks_away * CHUNK_SIZE;
    let player_chunk_x = (player_position.0 / CHUNK_SIZE).round() * CHUNK_SIZE;
    let player_chunk_y = (player_position.1 / CHUNK_SIZE).round() * CHUNK_SIZE;
    Location {
        x: player_chunk_x + theta.cos() * distance,
        y: player_chunk_y + theta.sin() * distance,
        z: player_position.2 + (rng.next_f64() - 0.5) * 2.0 * 5000.0,
    }
}

fn apply_effect(state: &mut UniverseState, key: &str, value: f64) {
    let current = &mut state.current;
    match key {
        "stability" => {
            current.stability_index = (current.stability_index + value).clamp(0.0, 1.0)
        }
        "entropy" => current.entropy = (current.entropy + value).clamp(0.0, 1.0e16),
        "expansionBoost" => current.expansion_rate = (current.expansion_rate + value).max(0.0),
        "scaleFactorBump" => {
            current.scale_factor = (current.scale_factor + value).clamp(1.0e-10, 1.0e10)
        }
        "metallicity" => current.metallicity = (current.metallicity + value).clamp(0.0, 1.0),
        "starCount" => current.star_count = (current.star_count + value).max(0.0),
        "blackHoleCount" => current.black_hole_count = (current.black_hole_count + value).max(0.0),
        "galaxyCount" => current.galaxy_count = (current.galaxy_count + value).max(0.0),
        "habitable" => {
            current.habitable_systems_count = (current.habitable_systems_count + value).max(0.0)
        }
        _ => {}
    }
}

/// Anomaly generation (spec.md §4.3.2): auto-cleanup, cap check, then one
/// probability roll per eligible type in declared order, applying effects
/// immediately on spawn.
pub fn anomaly_generation_system(
    mut state: ResMut<UniverseState>,
    config: Res<KernelConfig>,
    mut rng: ResMut<KernelRng>,
    mut events: ResMut<TickEventLog>,
) {
    let removed = auto_cleanup(&mut state.anomalies, AUTO_CLEANUP_KEEP_RECENT_MINUTES);
    let _ = removed;
    if state.anomalies.len() >= crate::domain::universe::MAX_ANOMALIES {
        return;
    }

    // Already has the difficulty's multiplier folded in; see
    // `SimulationKernel::from_universe`.
    let carrying_capacity = config.constants.observable_galaxies;
    let activity = (state.current.galaxy_count / carrying_capacity).min(1.0);
    let base_probability = config.options.anomaly_probability_scale * activity;

    let mut spawned_this_tick = 0usize;
    let current_snapshot = state.current;
    for def in anomaly_type_table() {
        if spawned_this_tick >= config.options.max_anomaly_per_step {
            break;
        }
        if !(def.condition)(&current_snapshot) {
            continue;
        }
        let roll = rng.anomaly.next_f64();
        if roll >= def.base_probability * base_probability * 10000.0 {
            continue;
        }

        let severity = (1 + rng.anomaly.next_range_i64(0, 3)) as f64;
        let location = sample_location(&mut rng.anomaly, config.player_position);
        let id = state.next_anomaly_id;
        state.next_anomaly_id += 1;

        let raw_effects = (def.effects)(severity);
        let mut effects_raw = std::collections::HashMap::new();
        for (key, value) in &raw_effects {
            effects_raw.insert((*key).to_string(), *value);
            apply_effect(&mut state, key, *value);
        }

        let anomaly = Anomaly {
            id,
            kind: def.kind,
            category: def.category,
            severity,
            timestamp: Utc::now(),
            resolved: false,
            resolved_at: None,
            effects_raw,
            location,
            radius: 1000.0 * severity,
            description: def.description.to_string(),
            decay_rate: 0.001 * rng.anomaly.next_f64(),
        };
        events.0.push(SignificantEvent::anomaly_generated(
            state.current.age,
            anomaly.id,
            anomaly.kind,
        ));
        state.anomalies.push(anomaly);
        spawned_this_tick += 1;
    }
}

/// Anomaly decay (spec.md §4.3.4): unresolved anomalies probabilistically
/// lose severity and nudge stability back up.
pub fn anomaly_decay_system(mut state: ResMut<UniverseState>, mut rng: ResMut<KernelRng>) {
    let mut stability_delta = 0.0;
    for anomaly in state.anomalies.iter_mut().filter(|a| a.is_active()) {
        if anomaly.decay_rate <= 0.0 {
            continue;
        }
        if rng.anomaly.next_f64() < anomaly.decay_rate && anomaly.severity > 1.0 {
            anomaly.severity -= 0.1;
            stability_delta += 0.001;
        }
    }
    state.current.stability_index = (state.current.stability_index + stability_delta).clamp(0.0, 1.0);
}

/// Manual anomaly resolution (spec.md §4.3.5), invoked by the HTTP layer
/// rather than run every tick.
pub fn resolve_anomaly(
    universe: &mut crate::domain::Universe,
    anomaly_id: u64,
) -> Result<(), AppError> {
    let anomaly = universe
        .anomalies
        .iter_mut()
        .find(|a| a.id == anomaly_id)
        .ok_or_else(|| AppError::NotFound(format!("anomaly {anomaly_id} not found")))?;

    if anomaly.resolved {
        return Err(AppError::BusinessRule(format!(
            "anomaly {anomaly_id} is already resolved"
        )));
    }

    let severity = anomaly.severity;
    anomaly.resolved = true;
    anomaly.resolved_at = Some(Utc::now());

    let stability_boost = 0.015 * severity;
    universe.current_state.stability_index =
        (universe.current_state.stability_index + stability_boost).clamp(0.0, 1.0);
    universe.current_state.entropy = (universe.current_state.entropy - 3.0e6 * severity).clamp(0.0, 1.0e16);
    universe.current_state.energy_budget =
        (universe.current_state.energy_budget + 0.002 * severity).clamp(0.0, 1.0);

    universe.metrics.player_interventions += 1;
    universe.metrics.anomalies_resolved += 1;
    universe.metrics.anomaly_resolution_rate =
        universe.metrics.anomalies_resolved as f64 / universe.anomalies.len().max(1) as f64;

    universe.significant_events.push(SignificantEvent::anomaly_resolved(
        universe.current_state.age,
        anomaly_id,
        stability_boost,
    ));
    universe.touch();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_anomaly(id: u64, resolved: bool, minutes_ago: i64) -> Anomaly {
        Anomaly {
            id,
            kind: crate::domain::AnomalyType::QuantumFluctuation,
            category: crate::domain::AnomalyCategory::Quantum,
            severity: 1.0,
            timestamp: Utc::now(),
            resolved,
            resolved_at: if resolved {
                Some(Utc::now() - Duration::minutes(minutes_ago))
            } else {
                None
            },
            effects_raw: std::collections::HashMap::new(),
            location: Location { x: 0.0, y: 0.0, z: 0.0 },
            radius: 1000.0,
            description: "test".into(),
            decay_rate: 0.0,
        }
    }

    #[test]
    fn auto_cleanup_only_removes_old_resolved() {
        let mut anomalies = vec![
            sample_anomaly(1, true, 10),
            sample_anomaly(2, true, 1),
            sample_anomaly(3, false, 0),
        ];
        let removed = auto_cleanup(&mut anomalies, 5);
        assert_eq!(removed, 1);
        assert_eq!(anomalies.len(), 2);
        assert!(anomalies.iter().any(|a| a.id == 2));
        assert!(anomalies.iter().any(|a| a.id == 3));
    }

    #[test]
    fn resolving_twice_is_rejected() {
        let mut universe = crate::domain::Universe::new(
            "owner".into(),
            "u".into(),
            "seed".into(),
            crate::domain::Difficulty::Intermediate,
            crate::domain::PhysicalConstants::default(),
            crate::domain::InitialConditions::default(),
        );
        universe.anomalies.push(sample_anomaly(1, false, 0));
        resolve_anomaly(&mut universe, 1).unwrap();
        let err = resolve_anomaly(&mut universe, 1).unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
    }

    #[test]
    fn resolving_unknown_id_is_not_found() {
        let mut universe = crate::domain::Universe::new(
            "owner".into(),
            "u".into(),
            "seed".into(),
            crate::domain::Difficulty::Intermediate,
            crate::domain::PhysicalConstants::default(),
            crate::domain::InitialConditions::default(),
        );
        let err = resolve_anomaly(&mut universe, 99).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
