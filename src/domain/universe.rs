//! The Universe root entity and its value subrecords (spec.md §3).

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::anomaly::Anomaly;
use crate::domain::civilization::Civilization;
use crate::domain::events::SignificantEventLog;

/// Unique id of a universe document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UniverseId(pub Uuid);

impl UniverseId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UniverseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UniverseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UniverseId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Intermediate
    }
}

/// Options derived from a [`Difficulty`], consumed by the kernel for one
/// orchestrator run (spec.md §4.7 step 2).
#[derive(Debug, Clone, Copy)]
pub struct DifficultyOptions {
    pub time_step_years: f64,
    pub anomaly_probability_scale: f64,
    pub max_anomaly_per_step: usize,
    pub observable_galaxies_multiplier: f64,
    pub difficulty_modifier: f64,
}

impl Difficulty {
    pub fn options(self) -> DifficultyOptions {
        match self {
            Difficulty::Beginner => DifficultyOptions {
                time_step_years: 5.0e7,
                anomaly_probability_scale: 0.6,
                max_anomaly_per_step: 2,
                observable_galaxies_multiplier: 1.2,
                difficulty_modifier: 0.7,
            },
            Difficulty::Intermediate => DifficultyOptions {
                time_step_years: 1.0e7,
                anomaly_probability_scale: 1.0,
                max_anomaly_per_step: 3,
                observable_galaxies_multiplier: 1.0,
                difficulty_modifier: 1.0,
            },
            Difficulty::Advanced => DifficultyOptions {
                time_step_years: 1.0e7,
                anomaly_probability_scale: 1.6,
                max_anomaly_per_step: 5,
                observable_galaxies_multiplier: 0.8,
                difficulty_modifier: 1.4,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UniverseStatus {
    Running,
    Paused,
    Ended,
}

impl Default for UniverseStatus {
    fn default() -> Self {
        UniverseStatus::Running
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CosmicPhase {
    DarkAges,
    Reionization,
    GalaxyFormation,
    StellarPeak,
    GradualDecline,
    TwilightEra,
    DegenerateEra,
}

impl CosmicPhase {
    /// Derives the phase label from age-in-gigayears thresholds
    /// (spec.md §4.2.1).
    pub fn for_age_gyr(age_gyr: f64) -> Self {
        if age_gyr < 0.1 {
            CosmicPhase::DarkAges
        } else if age_gyr < 1.0 {
            CosmicPhase::Reionization
        } else if age_gyr < 5.0 {
            CosmicPhase::GalaxyFormation
        } else if age_gyr < 10.0 {
            CosmicPhase::StellarPeak
        } else if age_gyr < 50.0 {
            CosmicPhase::GradualDecline
        } else if age_gyr < 100.0 {
            CosmicPhase::TwilightEra
        } else {
            CosmicPhase::DegenerateEra
        }
    }
}

/// Physical constants that parametrize a universe's physics engine
/// (spec.md §3, "constants").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhysicalConstants {
    pub dark_matter_density: f64,
    pub matter_density: f64,
    pub dark_energy_density: f64,
    pub h0_km_s_mpc: f64,
    pub observable_galaxies: f64,
    pub average_stars_per_galaxy: f64,
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self {
            dark_matter_density: 0.27,
            matter_density: 0.05,
            dark_energy_density: 0.68,
            h0_km_s_mpc: 70.0,
            observable_galaxies: 2.0e12,
            average_stars_per_galaxy: 1.0e11,
        }
    }
}

/// Initial conditions fixed at universe creation (spec.md §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialConditions {
    pub initial_temperature: f64,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            // temperature = T0 / _scaleFactor; keep T0 near the 2.725 K
            // reference temperatureFactor is centered on.
            initial_temperature: 2.725,
        }
    }
}

/// `CurrentState` value subrecord (spec.md §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentState {
    pub age: f64,
    #[serde(rename = "_scaleFactor")]
    pub scale_factor: f64,
    pub expansion_rate: f64,
    pub temperature: f64,
    pub entropy: f64,
    pub stability_index: f64,
    pub galaxy_count: f64,
    pub star_count: f64,
    pub black_hole_count: f64,
    pub habitable_systems_count: f64,
    pub life_bearing_planets_count: f64,
    pub civilization_count: u32,
    pub metallicity: f64,
    pub cosmic_phase: CosmicPhase,
    pub stellar_generations: f64,
    pub energy_budget: f64,
}

impl CurrentState {
    pub fn new(initial: &InitialConditions) -> Self {
        Self {
            age: 0.0,
            scale_factor: 1.0,
            expansion_rate: 0.0,
            temperature: initial.initial_temperature,
            entropy: 0.0,
            stability_index: 1.0,
            galaxy_count: 0.0,
            star_count: 0.0,
            black_hole_count: 0.0,
            habitable_systems_count: 0.0,
            life_bearing_planets_count: 0.0,
            civilization_count: 0,
            metallicity: 0.0,
            cosmic_phase: CosmicPhase::DarkAges,
            stellar_generations: 0.0,
            energy_budget: 1.0,
        }
    }

    pub fn age_gyr(&self) -> f64 {
        self.age / 1.0e9
    }
}

/// Composite metrics subrecord, recomputed by the physics engine and the
/// anomaly/civilization lifecycle (spec.md §3, §4.2.4, §4.3.5).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metrics {
    pub complexity_index: f64,
    pub life_potential_index: f64,
    pub cosmic_health: f64,
    pub player_interventions: u64,
    pub anomalies_resolved: u64,
    pub anomaly_resolution_rate: f64,
}

/// One-shot boolean achievements; each transitions false → true exactly
/// once across a universe's lifetime (spec.md §3 invariants).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Milestones(pub HashMap<String, bool>);

impl Milestones {
    pub const FIRST_GALAXY: &'static str = "firstGalaxy";
    pub const FIRST_STAR: &'static str = "firstStar";
    pub const STELLAR_POPULATION_I: &'static str = "stellarPopulationI";
    pub const FIRST_LIFE: &'static str = "firstLife";
    pub const COMPLEX_LIFE_ERA: &'static str = "complexLifeEra";
    pub const GREAT_FILTER: &'static str = "greatFilter";

    pub fn is_set(&self, key: &str) -> bool {
        self.0.get(key).copied().unwrap_or(false)
    }

    /// Flips `key` to true if it is not already set. Returns whether this
    /// call performed the (one-shot) transition, so callers can record a
    /// milestone event only on the genuine first occurrence.
    pub fn achieve(&mut self, key: &str) -> bool {
        if self.is_set(key) {
            return false;
        }
        self.0.insert(key.to_string(), true);
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EndCondition {
    InstabilityCollapse,
    HeatDeath,
    StellarDeath,
    BigRip,
    BigCrunch,
    MaximumEntropy,
}

impl EndCondition {
    pub fn reason(self) -> &'static str {
        match self {
            EndCondition::InstabilityCollapse => {
                "Stability index collapsed below the sustainable threshold"
            }
            EndCondition::HeatDeath => "Energy budget exhausted in a cold, dark universe",
            EndCondition::StellarDeath => "Stellar population extinguished before energy ran out",
            EndCondition::BigRip => "Expansion accelerated past every bound structure",
            EndCondition::BigCrunch => "Contraction reversed expansion entirely",
            EndCondition::MaximumEntropy => "Entropy saturated the available energy budget",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Universe {
    pub id: UniverseId,
    pub owner_id: String,
    pub name: String,
    pub seed: String,
    pub difficulty: Difficulty,
    pub constants: PhysicalConstants,
    pub initial_conditions: InitialConditions,
    pub current_state: CurrentState,
    pub anomalies: Vec<Anomaly>,
    pub civilizations: Vec<Civilization>,
    pub significant_events: SignificantEventLog,
    pub milestones: Milestones,
    pub metrics: Metrics,
    pub status: UniverseStatus,
    pub end_condition: Option<EndCondition>,
    pub end_reason: Option<String>,
    pub final_age: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Next id handed to a freshly generated anomaly; monotonic per universe.
    pub next_anomaly_id: u64,
    /// Next id handed to a freshly spawned civilization; monotonic per universe.
    pub next_civilization_id: u64,
    /// Ring buffer of the last 100 stability samples (spec.md §4.2.4).
    pub stability_history: Vec<f64>,
    /// Cumulative ticks advanced across every orchestrator run this
    /// universe has ever been stepped through; drives the civilization
    /// cull interval (spec.md §4.4) independent of any one run's length.
    pub ticks_run: u64,
}

pub const STABILITY_HISTORY_CAPACITY: usize = 100;
pub const MAX_ANOMALIES: usize = 200;
pub const MAX_ACTIVE_CIVILIZATIONS: usize = 500;
pub const MAX_RETAINED_EXTINCT_CIVILIZATIONS: usize = 100;
pub const CIVILIZATION_CULL_INTERVAL: u64 = 10;

impl Universe {
    pub fn new(
        owner_id: String,
        name: String,
        seed: String,
        difficulty: Difficulty,
        constants: PhysicalConstants,
        initial_conditions: InitialConditions,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: UniverseId::new(),
            owner_id,
            name,
            seed,
            difficulty,
            current_state: CurrentState::new(&initial_conditions),
            constants,
            initial_conditions,
            anomalies: Vec::new(),
            civilizations: Vec::new(),
            significant_events: SignificantEventLog::default(),
            milestones: Milestones::default(),
            metrics: Metrics::default(),
            status: UniverseStatus::Running,
            end_condition: None,
            end_reason: None,
            final_age: None,
            created_at: now,
            last_modified: now,
            next_anomaly_id: 1,
            next_civilization_id: 1,
            stability_history: Vec::with_capacity(STABILITY_HISTORY_CAPACITY),
            ticks_run: 0,
        }
    }

    pub fn touch(&mut self) {
        self.last_modified = Utc::now();
    }

    /// `stabilityTrend = mean(last 10) - mean(prior 10)` (spec.md §4.2.4).
    pub fn stability_trend(&self) -> f64 {
        let len = self.stability_history.len();
        if len < 20 {
            return 0.0;
        }
        let last_10 = &self.stability_history[len - 10..];
        let prior_10 = &self.stability_history[len - 20..len - 10];
        let mean = |s: &[f64]| s.iter().sum::<f64>() / s.len() as f64;
        mean(last_10) - mean(prior_10)
    }

    pub fn end(&mut self, condition: EndCondition) {
        self.status = UniverseStatus::Ended;
        self.end_condition = Some(condition);
        self.end_reason = Some(condition.reason().to_string());
        self.final_age = Some(self.current_state.age);
        self.touch();
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestone_transitions_only_once() {
        let mut milestones = Milestones::default();
        assert!(milestones.achieve(Milestones::FIRST_GALAXY));
        assert!(!milestones.achieve(Milestones::FIRST_GALAXY));
        assert!(milestones.is_set(Milestones::FIRST_GALAXY));
    }

    #[test]
    fn cosmic_phase_thresholds() {
        assert_eq!(CosmicPhase::for_age_gyr(0.05), CosmicPhase::DarkAges);
        assert_eq!(CosmicPhase::for_age_gyr(0.5), CosmicPhase::Reionization);
        assert_eq!(CosmicPhase::for_age_gyr(2.0), CosmicPhase::GalaxyFormation);
        assert_eq!(CosmicPhase::for_age_gyr(7.0), CosmicPhase::StellarPeak);
        assert_eq!(CosmicPhase::for_age_gyr(20.0), CosmicPhase::GradualDecline);
        assert_eq!(CosmicPhase::for_age_gyr(75.0), CosmicPhase::TwilightEra);
        assert_eq!(CosmicPhase::for_age_gyr(150.0), CosmicPhase::DegenerateEra);
    }
}
