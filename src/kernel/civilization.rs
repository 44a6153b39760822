//! Civilization spawning, evolution, extinction, and culling
//! (spec.md §4.4). These are plain functions invoked from
//! [`crate::kernel::physics::life_and_civilization_system`] rather than
//! separate scheduled systems, since spawn/evolve/cull form one combined
//! "life and civilization" tick phase.

use chrono::Utc;

use crate::domain::civilization::{Civilization, CivilizationType, ExtinctionCause};
use crate::domain::events::SignificantEvent;
use crate::domain::universe::{
    MAX_ACTIVE_CIVILIZATIONS, MAX_RETAINED_EXTINCT_CIVILIZATIONS,
};
use crate::kernel::resources::{KernelConfig, KernelRng, TickEventLog, UniverseState};

/// Rolls the initial [`CivilizationType`] for a freshly spawned
/// civilization (spec.md §4.4 "Initial type").
fn roll_initial_type(age_gyr: f64, roll: f64) -> CivilizationType {
    if age_gyr < 8.0 {
        return CivilizationType::Type0;
    }
    if roll < 0.98 {
        CivilizationType::Type0
    } else if roll < 0.998 {
        CivilizationType::Type1
    } else if roll < 0.9998 {
        CivilizationType::Type2
    } else {
        CivilizationType::Type3
    }
}

pub fn spawn_civilizations(
    state: &mut UniverseState,
    rng: &mut KernelRng,
    events: &mut TickEventLog,
) {
    let active_count = state.civilizations.iter().filter(|c| c.is_active()).count();
    if active_count >= MAX_ACTIVE_CIVILIZATIONS {
        return;
    }

    let expected = (state.current.life_bearing_planets_count
        * 1.0e-7
        * (1.0 + 0.5 * state.current.metallicity))
        .floor();
    let room = (MAX_ACTIVE_CIVILIZATIONS - active_count) as f64;
    let to_spawn = (expected - active_count as f64).max(0.0).min(room).min(10.0) as u64;
    let age_gyr = state.current.age_gyr();

    for _ in 0..to_spawn {
        let id = state.next_civilization_id;
        state.next_civilization_id += 1;
        let kind = roll_initial_type(age_gyr, rng.physics.next_f64());
        let civilization = Civilization {
            id,
            kind,
            created_at: Utc::now(),
            age: 0.0,
            development_level: rng.physics.next_f64(),
            technology: rng.physics.next_f64() * 10.0,
            stability: 0.5 + rng.physics.next_f64() * 0.5,
            population: 1_000_000 + (rng.physics.next_f64() * 1.0e9) as u64,
            resource_depletion: 0.0,
            warlikeness: rng.physics.next_f64(),
            extinct: false,
            extinction_date: None,
            extinction_age: None,
            extinction_cause: None,
        };
        events.0.push(SignificantEvent::civilization_spawned(state.current.age, id));
        state.civilizations.push(civilization);
    }
}

/// Per-step technology growth, development promotion, stability drift, and
/// extinction rolls for every active civilization (spec.md §4.4 "Evolution"
/// and "Extinction risk").
pub fn evolve_civilizations(
    state: &mut UniverseState,
    config: &KernelConfig,
    rng: &mut KernelRng,
    events: &mut TickEventLog,
) {
    let dt = config.options.time_step_years;
    let cosmic_stability = state.current.stability_index;
    let age = state.current.age;

    for civilization in state.civilizations.iter_mut().filter(|c| c.is_active()) {
        civilization.age += dt;

        let tech_growth = 0.01 * (dt / 1.0e8) * (1.0 + civilization.development_level);
        civilization.technology = (civilization.technology + tech_growth).min(100.0);
        civilization.resource_depletion =
            (civilization.resource_depletion + tech_growth * 0.005).min(1.0);

        let promotion = match civilization.kind {
            CivilizationType::Type0 if civilization.technology >= 20.0 => {
                Some((CivilizationType::Type1, 1.0e-3))
            }
            CivilizationType::Type1 if civilization.technology >= 50.0 => {
                Some((CivilizationType::Type2, 1.0e-4))
            }
            CivilizationType::Type2 if civilization.technology >= 80.0 => {
                Some((CivilizationType::Type3, 1.0e-5))
            }
            _ => None,
        };
        if let Some((next_kind, probability)) = promotion {
            if rng.physics.next_f64() < probability {
                civilization.kind = next_kind;
                events.0.push(SignificantEvent::civilization_promoted(
                    age,
                    civilization.id,
                    next_kind,
                ));
            }
        }

        let drift = rng.physics.next_gaussian_scaled(0.0, 0.01)
            - 0.02 * civilization.resource_depletion
            - 0.01 * civilization.warlikeness;
        civilization.stability = (civilization.stability + drift).clamp(0.0, 1.0);

        let mut risk: f64 = 1.0e-5;
        if civilization.stability < 0.3 {
            risk *= (1.0 - civilization.stability) * 50.0;
            if civilization.stability < 0.1 {
                risk *= 100.0;
            }
        }
        if civilization.resource_depletion > 0.8 {
            risk *= 20.0;
        }
        if civilization.warlikeness > 0.8 {
            risk *= 10.0;
        }
        match civilization.kind {
            CivilizationType::Type0 => risk *= 5.0,
            CivilizationType::Type3 => risk *= 0.1,
            _ => {}
        }
        if cosmic_stability < 0.5 {
            risk *= (1.0 - cosmic_stability) * 3.0;
        }
        if civilization.age < 1.0e7 {
            risk *= 2.0;
        } else if civilization.age > 1.0e9 {
            risk *= 1.5;
        }
        risk = risk.min(0.5);

        if rng.physics.next_f64() < risk {
            let cause = if civilization.resource_depletion > 0.8 {
                ExtinctionCause::ResourceExhaustion
            } else if civilization.warlikeness > 0.8 {
                ExtinctionCause::Warfare
            } else if civilization.stability < 0.3 {
                ExtinctionCause::StabilityCollapse
            } else {
                ExtinctionCause::CosmicInstability
            };
            civilization.extinct = true;
            civilization.extinction_date = Some(Utc::now());
            civilization.extinction_age = Some(civilization.age);
            civilization.extinction_cause = Some(cause);
            events.0.push(SignificantEvent::civilization_extinct(age, civilization.id, cause));
        }
    }

    maybe_great_filter(state, rng, events);
}

/// A rare catastrophic event that can wipe out a fraction of active
/// civilizations, gated to happen at most once (spec.md §4.4
/// "Catastrophic events").
fn maybe_great_filter(state: &mut UniverseState, rng: &mut KernelRng, events: &mut TickEventLog) {
    if state.milestones.is_set(crate::domain::universe::Milestones::GREAT_FILTER) {
        return;
    }
    if rng.physics.next_f64() >= 1.0e-6 {
        return;
    }

    let active_ids: Vec<u64> = state
        .civilizations
        .iter()
        .filter(|c| c.is_active())
        .map(|c| c.id)
        .collect();
    if active_ids.is_empty() {
        return;
    }

    let fraction = 0.5 + rng.physics.next_f64() * 0.4;
    let kill_count = ((active_ids.len() as f64) * fraction).floor() as usize;
    for id in active_ids.into_iter().take(kill_count) {
        if let Some(civilization) = state.civilizations.iter_mut().find(|c| c.id == id) {
            civilization.extinct = true;
            civilization.extinction_date = Some(Utc::now());
            civilization.extinction_age = Some(civilization.age);
            civilization.extinction_cause = Some(ExtinctionCause::GreatFilter);
        }
    }
    state.milestones.achieve(crate::domain::universe::Milestones::GREAT_FILTER);
    events.0.push(SignificantEvent::catastrophic_event(state.current.age, kill_count));
}

/// Retains every active civilization plus the most recently extinct 100,
/// run every `CIVILIZATION_CULL_INTERVAL` ticks (spec.md §4.4 "Culling").
pub fn cull_extinct(state: &mut UniverseState) {
    state.ticks_run += 1;
    if state.ticks_run % crate::domain::universe::CIVILIZATION_CULL_INTERVAL != 0 {
        return;
    }

    let mut extinct: Vec<Civilization> = state
        .civilizations
        .iter()
        .filter(|c| !c.is_active())
        .cloned()
        .collect();
    extinct.sort_by_key(|c| std::cmp::Reverse(c.extinction_date));
    extinct.truncate(MAX_RETAINED_EXTINCT_CIVILIZATIONS);

    let mut retained: Vec<Civilization> = state
        .civilizations
        .iter()
        .filter(|c| c.is_active())
        .cloned()
        .collect();
    retained.extend(extinct);
    state.civilizations = retained;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_type_is_type0_before_age_eight_gyr() {
        assert_eq!(roll_initial_type(3.0, 0.9999), CivilizationType::Type0);
        assert_eq!(roll_initial_type(9.0, 0.9999), CivilizationType::Type3);
    }

    #[test]
    fn cull_retains_active_and_caps_extinct() {
        let mut state = UniverseState {
            current: crate::domain::CurrentState::new(&crate::domain::InitialConditions::default()),
            anomalies: Vec::new(),
            civilizations: (0..150)
                .map(|i| Civilization {
                    id: i,
                    kind: CivilizationType::Type0,
                    created_at: Utc::now(),
                    age: 0.0,
                    development_level: 0.0,
                    technology: 0.0,
                    stability: 1.0,
                    population: 0,
                    resource_depletion: 0.0,
                    warlikeness: 0.0,
                    extinct: true,
                    extinction_date: Some(Utc::now()),
                    extinction_age: Some(0.0),
                    extinction_cause: Some(ExtinctionCause::StabilityCollapse),
                })
                .collect(),
            metrics: crate::domain::Metrics::default(),
            milestones: crate::domain::universe::Milestones::default(),
            stability_history: Vec::new(),
            next_anomaly_id: 1,
            next_civilization_id: 1,
            ticks_run: crate::domain::universe::CIVILIZATION_CULL_INTERVAL - 1,
            ended: None,
        };
        cull_extinct(&mut state);
        assert_eq!(state.civilizations.len(), MAX_RETAINED_EXTINCT_CIVILIZATIONS);
    }
}
