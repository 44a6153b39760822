//! Expansion, structure, and life/civilization physics systems
//! (spec.md §4.2.1 - §4.2.4).
//!
//! Each tick phase is one chained `bevy_ecs` system (`climate_system`,
//! `demography_system`, `..._system` style), all `.chain()`ed in
//! `SimulationKernel::from_universe`.

use bevy_ecs::prelude::{Res, ResMut};

use crate::domain::civilization;
use crate::domain::events::SignificantEvent;
use crate::domain::universe::{CosmicPhase, CurrentState, Milestones};
use crate::kernel::resources::{KernelConfig, KernelRng, TickEventLog, UniverseState};

const SECONDS_PER_YEAR: f64 = 3.15576e7;
const MPC_IN_KM: f64 = 3.08567758128e19;
const RADIATION_DENSITY: f64 = 0.0001;

/// `H0` converted from km/s/Mpc to inverse years.
fn h0_per_year(h0_km_s_mpc: f64) -> f64 {
    (h0_km_s_mpc / MPC_IN_KM) * SECONDS_PER_YEAR
}

/// `temperatureFactor = exp(-((T - 2.725) / 5)^2)`, shared by the stability
/// computation and the life/habitability growth term (spec.md §4.2.3, §4.2.4).
pub fn temperature_factor(temperature: f64) -> f64 {
    (-((temperature - 2.725) / 5.0).powi(2)).exp()
}

/// Expansion update (spec.md §4.2.1): advances age, scale factor,
/// temperature, entropy, and energy budget for one tick.
pub fn expansion_system(
    mut state: ResMut<UniverseState>,
    config: Res<KernelConfig>,
    mut events: ResMut<TickEventLog>,
) {
    let dt = config.options.time_step_years;
    let current = &mut state.current;
    current.age += dt;

    let omega_m = config.constants.dark_matter_density + config.constants.matter_density;
    let omega_r = RADIATION_DENSITY;
    let omega_lambda = config.constants.dark_energy_density;
    let a = current.scale_factor;
    let h0 = h0_per_year(config.constants.h0_km_s_mpc);
    let h_eff = h0
        * (omega_m / a.powi(3) + omega_r / a.powi(4) + omega_lambda)
            .max(0.0)
            .sqrt();

    let exponent = (h_eff * dt).clamp(-0.1, 0.1);
    current.scale_factor = (current.scale_factor * exponent.exp()).clamp(1.0e-10, 1.0e10);
    current.expansion_rate = h_eff * MPC_IN_KM / SECONDS_PER_YEAR;

    let t0 = config.initial_conditions.initial_temperature;
    current.temperature = (t0 / current.scale_factor).clamp(0.01, 100.0 * t0);

    let structure_volume = current.scale_factor.powi(3).max(1.0);
    current.entropy =
        (current.entropy + structure_volume.ln() * 1.0e5 * (dt / 1.0e8)).clamp(0.0, 1.0e16);

    current.energy_budget = (current.energy_budget - 5.0e-13 * dt).clamp(0.0, 1.0);

    let phase = CosmicPhase::for_age_gyr(current.age_gyr());
    current.cosmic_phase = phase;

    let _ = events;
}

/// Structure update (spec.md §4.2.2): galaxy seeding/growth, star formation,
/// stellar evolution, and black hole accumulation.
pub fn structure_system(
    mut state: ResMut<UniverseState>,
    config: Res<KernelConfig>,
    mut events: ResMut<TickEventLog>,
) {
    let dt = config.options.time_step_years;
    // `config.constants.observable_galaxies` already has the difficulty's
    // multiplier folded in (see `SimulationKernel::from_universe`), so
    // every consumer of K shares the same carrying capacity.
    let carrying_capacity = config.constants.observable_galaxies;

    let age_gyr = state.current.age_gyr();
    let mut galaxy_delta = 0.0;

    let logistic_rate = (0.15 / 1.0e9) * (1.0 + 2.0 * (-((age_gyr - 5.0) / 3.0).powi(2)).exp());
    if age_gyr > 0.1 && age_gyr < 2.5 && state.current.galaxy_count < 1000.0 {
        galaxy_delta +=
            2000.0 * (-((age_gyr - 0.5) / 0.7).powi(2)).exp() * (dt / 1.0e7);
    } else if state.current.galaxy_count > 0.0 {
        let g = state.current.galaxy_count;
        galaxy_delta += logistic_rate * g * (1.0 - g / carrying_capacity) * dt;
    }
    if age_gyr > 1.0 && state.current.galaxy_count < 100.0 {
        galaxy_delta += 100.0;
    }

    state.current.galaxy_count =
        (state.current.galaxy_count + galaxy_delta).clamp(0.0, 1.5 * carrying_capacity);
    if state.current.galaxy_count >= 1.0 && state.milestones.achieve(Milestones::FIRST_GALAXY) {
        events
            .0
            .push(SignificantEvent::milestone(state.current.age, Milestones::FIRST_GALAXY));
    }

    let stars_target = state.current.galaxy_count * config.constants.average_stars_per_galaxy;
    let star_growth = (stars_target - state.current.star_count)
        * 0.003
        * (1.0 + 0.5 * state.current.metallicity)
        * (-age_gyr / 10.0).exp()
        * (dt / 1.0e7);
    let mut star_delta = star_growth;
    if age_gyr > 0.5 && state.current.galaxy_count > 10.0 && state.current.star_count < 1.0e6 {
        star_delta += 1.0e6;
    }
    state.current.star_count = (state.current.star_count + star_delta).max(0.0);
    if state.current.star_count >= 1.0 && state.milestones.achieve(Milestones::FIRST_STAR) {
        events
            .0
            .push(SignificantEvent::milestone(state.current.age, Milestones::FIRST_STAR));
    }

    let death_rate = state.current.star_count * 1.0e-11 * dt;
    state.current.stellar_generations = (state.current.stellar_generations
        + death_rate / (config.constants.average_stars_per_galaxy * 10.0))
        .min(10.0);
    state.current.metallicity = (state.current.metallicity + death_rate * 1.0e-14).clamp(0.0, 1.0);
    if state.current.metallicity > 0.1
        && state.milestones.achieve(Milestones::STELLAR_POPULATION_I)
    {
        events.0.push(SignificantEvent::milestone(
            state.current.age,
            Milestones::STELLAR_POPULATION_I,
        ));
    }

    state.current.black_hole_count +=
        state.current.star_count * 1.0e-4 * 0.1 * (dt / 1.0e9);
}

/// Life and civilization update (spec.md §4.2.3): habitable systems, life
/// emergence, and (gated) civilization spawning.
pub fn life_and_civilization_system(
    mut state: ResMut<UniverseState>,
    config: Res<KernelConfig>,
    mut rng: ResMut<KernelRng>,
    mut events: ResMut<TickEventLog>,
) {
    let dt = config.options.time_step_years;
    let age_gyr = state.current.age_gyr();

    if age_gyr >= 1.0 && state.current.metallicity >= 0.01 {
        let metallicity_factor = (state.current.metallicity / 0.3).clamp(0.0, 1.0);
        state.current.habitable_systems_count = state.current.star_count
            * (0.001 + metallicity_factor * ((age_gyr - 1.0) / 3.0).clamp(0.0, 1.0) * 0.015);

        if age_gyr > 3.0 && state.current.habitable_systems_count > 100.0 {
            let age_factor = ((age_gyr - 3.0) / 5.0).clamp(0.0, 1.0);
            let temp_suitability = temperature_factor(state.current.temperature);
            state.current.life_bearing_planets_count += state.current.habitable_systems_count
                * 1.0e-8
                * age_factor
                * metallicity_factor
                * temp_suitability
                * (dt / 1.0e8);
        }
    }

    if state.current.life_bearing_planets_count >= 1.0
        && state.milestones.achieve(Milestones::FIRST_LIFE)
    {
        events
            .0
            .push(SignificantEvent::milestone(state.current.age, Milestones::FIRST_LIFE));
    }
    if state.current.life_bearing_planets_count > 1000.0
        && state.milestones.achieve(Milestones::COMPLEX_LIFE_ERA)
    {
        events.0.push(SignificantEvent::milestone(
            state.current.age,
            Milestones::COMPLEX_LIFE_ERA,
        ));
    }

    if age_gyr > 5.0 && state.current.life_bearing_planets_count > 1000.0 {
        civilization::spawn_civilizations(&mut state, &mut rng, &mut events);
    }

    civilization::evolve_civilizations(&mut state, &config, &mut rng, &mut events);
    civilization::cull_extinct(&mut state);

    state.current.civilization_count = state
        .civilizations
        .iter()
        .filter(|c| c.is_active())
        .count() as u32;
}

/// `entropyFactor = max(0, 1 - (entropy / 3e14)^0.7)` (spec.md §4.2.4).
fn entropy_factor(entropy: f64) -> f64 {
    (1.0 - (entropy / 3.0e14).max(0.0).powf(0.7)).max(0.0)
}

/// Average of a galaxy-count factor and a star-count factor, both relative
/// to their expected carrying capacities (spec.md §4.2.4).
fn structure_factor(state: &CurrentState, constants: &crate::domain::PhysicalConstants) -> f64 {
    let age_gyr = state.age_gyr();
    let galaxy_capacity = (constants.observable_galaxies * (age_gyr / 13.8).min(1.0) * 0.3).max(1.0);
    let galaxy_factor = (state.galaxy_count / galaxy_capacity).min(1.0);
    let star_capacity = (state.galaxy_count * constants.average_stars_per_galaxy * 0.5).max(1.0);
    let star_factor = (state.star_count / star_capacity).min(1.0);
    (galaxy_factor + star_factor) / 2.0
}

/// Dark-energy-domination factor: 1.0 while dark energy has not yet come
/// to dominate the density budget, falling off once it exceeds 95%
/// (spec.md §4.2.4).
fn dark_energy_factor(state: &CurrentState, constants: &crate::domain::PhysicalConstants) -> f64 {
    let omega_m = constants.dark_matter_density + constants.matter_density;
    let matter_term = omega_m / state.scale_factor.powi(3);
    let fraction = constants.dark_energy_density / (matter_term + constants.dark_energy_density).max(f64::EPSILON);
    if fraction < 0.95 {
        1.0
    } else {
        (1.0 - ((fraction - 0.95) / 0.05).powi(2)).max(0.0)
    }
}

/// Anomaly-pressure factor: active and total anomaly counts both erode
/// stability, with active anomalies weighted more heavily (spec.md §4.2.4).
fn anomaly_factor(unresolved: usize, total: usize) -> f64 {
    (1.0 - (unresolved as f64 * 0.008).min(0.35) - (total as f64 * 0.0015).min(0.25)).max(0.0)
}

/// Recomputes the stability index and derived metrics, and records the
/// running stability history (spec.md §4.2.4).
pub fn stability_system(mut state: ResMut<UniverseState>, config: Res<KernelConfig>) {
    let current = state.current;
    let unresolved = state.anomalies.iter().filter(|a| a.is_active()).count();
    let total = state.anomalies.len();

    let raw = 0.15 * entropy_factor(current.entropy)
        + 0.25 * structure_factor(&current, &config.constants)
        + 0.15 * dark_energy_factor(&current, &config.constants)
        + 0.15 * temperature_factor(current.temperature)
        + 0.20 * anomaly_factor(unresolved, total)
        + 0.10 * current.energy_budget;

    let modifier = config.options.difficulty_modifier;
    let stability = (raw * (0.6 + 0.4 / modifier)).clamp(0.0, 1.0);
    state.current.stability_index = stability;

    if state.stability_history.len() == crate::domain::universe::STABILITY_HISTORY_CAPACITY {
        state.stability_history.remove(0);
    }
    state.stability_history.push(stability);

    let metallicity_factor = (state.current.metallicity / 0.3).clamp(0.0, 1.0);
    let civilization_factor = (state.current.civilization_count as f64 / 50.0).clamp(0.0, 1.0);
    let star_magnitude_factor =
        (state.current.star_count.max(1.0).log10() / 12.0).clamp(0.0, 1.0);
    state.metrics.complexity_index = (0.4 * metallicity_factor
        + 0.3 * civilization_factor
        + 0.3 * star_magnitude_factor)
        .clamp(0.0, 1.0);

    let habitable_factor = (state.current.habitable_systems_count / 1.0e6).clamp(0.0, 1.0);
    let life_factor = (state.current.life_bearing_planets_count / 1000.0).clamp(0.0, 1.0);
    state.metrics.life_potential_index = (0.5 * habitable_factor + 0.5 * life_factor).clamp(0.0, 1.0);

    let anomaly_load = (total as f64 / 200.0).min(1.0);
    state.metrics.cosmic_health =
        (0.5 * stability + 0.3 * state.current.energy_budget + 0.2 * (1.0 - anomaly_load))
            .clamp(0.0, 1.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::universe::InitialConditions;
    use crate::kernel::resources::KernelRng;
    use crate::rng::DeterministicRng;
    use bevy_ecs::prelude::World;

    fn fresh_world(options: crate::domain::DifficultyOptions) -> World {
        let mut world = World::new();
        world.insert_resource(UniverseState {
            current: CurrentState::new(&InitialConditions::default()),
            anomalies: Vec::new(),
            civilizations: Vec::new(),
            metrics: crate::domain::Metrics::default(),
            milestones: Milestones::default(),
            stability_history: Vec::new(),
            next_anomaly_id: 1,
            next_civilization_id: 1,
            ticks_run: 0,
            ended: None,
        });
        world.insert_resource(KernelConfig {
            constants: crate::domain::PhysicalConstants::default(),
            initial_conditions: InitialConditions::default(),
            options,
            player_position: (0.0, 0.0, 0.0),
        });
        world.insert_resource(KernelRng {
            physics: DeterministicRng::for_seed("physics-test"),
            anomaly: DeterministicRng::for_stream("physics-test", crate::rng::ANOMALY_STREAM_SUFFIX),
        });
        world.insert_resource(TickEventLog(crate::domain::SignificantEventLog::default()));
        world
    }

    #[test]
    fn expansion_advances_age_and_phase() {
        let mut world = fresh_world(crate::domain::Difficulty::Beginner.options());
        let mut schedule = bevy_ecs::schedule::Schedule::default();
        schedule.add_systems(expansion_system);
        for _ in 0..10 {
            schedule.run(&mut world);
        }
        let state = world.resource::<UniverseState>();
        assert!((state.current.age - 5.0e8).abs() < 1.0);
        assert_eq!(state.current.cosmic_phase, CosmicPhase::Reionization);
    }

    #[test]
    fn structure_seeds_galaxies_over_time() {
        let options = crate::domain::Difficulty::Intermediate.options();
        let mut world = fresh_world(options);
        let mut schedule = bevy_ecs::schedule::Schedule::default();
        schedule.add_systems((expansion_system, structure_system).chain());
        for _ in 0..200 {
            schedule.run(&mut world);
        }
        let state = world.resource::<UniverseState>();
        assert!(state.current.galaxy_count > 0.0);
        assert!(state.milestones.is_set(Milestones::FIRST_GALAXY));
    }

    #[test]
    fn stability_history_stays_a_bounded_ring_buffer() {
        let options = crate::domain::Difficulty::Beginner.options();
        let mut world = fresh_world(options);
        let mut schedule = bevy_ecs::schedule::Schedule::default();
        schedule.add_systems((expansion_system, structure_system, stability_system).chain());
        for _ in 0..150 {
            schedule.run(&mut world);
        }
        let state = world.resource::<UniverseState>();
        assert_eq!(
            state.stability_history.len(),
            crate::domain::universe::STABILITY_HISTORY_CAPACITY
        );
    }
}
