//! The heuristic predictor (spec.md §4.6): a read-only forecast computed
//! once per orchestrator run from the final universe snapshot. Pure
//! functions over [`Universe`] — no `bevy_ecs`, no mutation, no RNG, so a
//! prediction never perturbs the deterministic trajectory it describes.

use serde::Serialize;

use crate::domain::anomaly::anomaly_type_table;
use crate::domain::universe::EndCondition;
use crate::domain::Universe;
use crate::kernel::physics::temperature_factor;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StabilityForecast {
    pub current: f64,
    pub trend_per_step: f64,
    pub predicted_in_10_steps: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyForecast {
    pub emergence_probability: f64,
    pub likely_types: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndConditionRisk {
    pub condition: EndCondition,
    pub risk: f64,
    pub estimated_steps_remaining: Option<u64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeEvolutionTrend {
    pub habitable_systems_growth_per_step: f64,
    pub life_bearing_planets_growth_per_step: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionReport {
    pub stability: StabilityForecast,
    pub anomaly: AnomalyForecast,
    pub end_conditions: Vec<EndConditionRisk>,
    pub life_evolution: LifeEvolutionTrend,
    pub overall_risk: f64,
    pub action_priority: Vec<&'static str>,
}

/// Builds a forecast from the universe's current snapshot and recent
/// stability history (spec.md §4.6).
pub fn predict(universe: &Universe) -> PredictionReport {
    let current = &universe.current_state;
    let options = universe.difficulty.options();
    let trend = universe.stability_trend() / 10.0;
    let stability = StabilityForecast {
        current: current.stability_index,
        trend_per_step: trend,
        predicted_in_10_steps: (current.stability_index + trend * 10.0).clamp(0.0, 1.0),
    };

    let carrying_capacity =
        universe.constants.observable_galaxies * options.observable_galaxies_multiplier;
    let activity = (current.galaxy_count / carrying_capacity).min(1.0);
    let emergence_probability = (options.anomaly_probability_scale * activity).clamp(0.0, 1.0);
    let likely_types: Vec<&'static str> = anomaly_type_table()
        .iter()
        .filter(|def| (def.condition)(current))
        .map(|def| match def.kind {
            crate::domain::AnomalyType::BlackHoleMerger => "blackHoleMerger",
            crate::domain::AnomalyType::DarkEnergySurge => "darkEnergySurge",
            crate::domain::AnomalyType::SupernovaChain => "supernovaChain",
            crate::domain::AnomalyType::QuantumFluctuation => "quantumFluctuation",
            crate::domain::AnomalyType::GalacticCollision => "galacticCollision",
            crate::domain::AnomalyType::CosmicVoid => "cosmicVoid",
            crate::domain::AnomalyType::MagneticReversal => "magneticReversal",
            crate::domain::AnomalyType::DarkMatterClump => "darkMatterClump",
        })
        .collect();
    let anomaly = AnomalyForecast {
        emergence_probability,
        likely_types,
    };

    let end_conditions = end_condition_risks(universe, trend);

    let life_evolution = LifeEvolutionTrend {
        habitable_systems_growth_per_step: estimate_growth_rate(
            current.habitable_systems_count,
            current.star_count,
        ),
        life_bearing_planets_growth_per_step: estimate_growth_rate(
            current.life_bearing_planets_count,
            current.habitable_systems_count,
        ),
    };

    let unresolved = universe.anomalies.iter().filter(|a| a.is_active()).count();
    let worst_end_risk = end_conditions.iter().map(|r| r.risk).fold(0.0, f64::max);
    let overall_risk = (0.4 * (1.0 - current.stability_index)
        + 0.3 * emergence_probability * (1.0 + unresolved as f64 * 0.05).min(2.0)
        + 0.3 * worst_end_risk)
        .clamp(0.0, 1.0);

    let mut action_priority = Vec::new();
    if current.stability_index < 0.2 {
        action_priority.push("stabilize_immediately");
    }
    if unresolved >= 5 {
        action_priority.push("resolve_anomalies");
    }
    if worst_end_risk > 0.5 {
        action_priority.push("prepare_for_end_condition");
    }
    if action_priority.is_empty() {
        action_priority.push("observe");
    }

    PredictionReport {
        stability,
        anomaly,
        end_conditions,
        life_evolution,
        overall_risk,
        action_priority,
    }
}

/// A simple trend estimate: how much headroom the dependent quantity
/// still has against the quantity driving it, expressed as a fraction per
/// step. This is a heuristic stand-in, not a closed-form derivative.
fn estimate_growth_rate(value: f64, driver: f64) -> f64 {
    if driver <= 0.0 {
        return 0.0;
    }
    ((driver - value) / driver).clamp(0.0, 1.0) * 0.001
}

fn end_condition_risks(universe: &Universe, stability_trend: f64) -> Vec<EndConditionRisk> {
    let current = &universe.current_state;
    let modifier = universe.difficulty.options().difficulty_modifier;
    let dt = universe.difficulty.options().time_step_years;

    let instability_threshold = 0.05 / modifier;
    let instability_risk = if stability_trend < 0.0 && current.stability_index > instability_threshold {
        let steps = ((current.stability_index - instability_threshold) / -stability_trend).ceil();
        (1.0 / (1.0 + steps / 20.0)).clamp(0.0, 1.0)
    } else if current.stability_index <= instability_threshold {
        1.0
    } else {
        0.05
    };
    let instability_steps = if stability_trend < 0.0 {
        Some(((current.stability_index - instability_threshold) / -stability_trend).max(0.0) as u64)
    } else {
        None
    };

    let heat_death_threshold_gyr = 200.0 / modifier;
    let heat_death_steps = if current.age_gyr() < heat_death_threshold_gyr {
        Some((((heat_death_threshold_gyr - current.age_gyr()) * 1.0e9) / dt) as u64)
    } else {
        None
    };
    let heat_death_risk = if current.energy_budget < 0.2 {
        (1.0 - current.energy_budget / 0.2).clamp(0.0, 1.0)
    } else {
        0.05
    };

    let big_rip_risk = (current.scale_factor / 1.0e9).clamp(0.0, 1.0);
    let big_crunch_risk = if current.scale_factor < 1.0e-6 {
        (1.0e-8 / current.scale_factor.max(1.0e-10)).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let entropy_risk = (current.entropy / 2.0e15).clamp(0.0, 1.0);
    let stellar_death_risk = if current.age_gyr() > 60.0 && current.star_count < 1.0e5 {
        0.4
    } else {
        0.05
    };

    vec![
        EndConditionRisk {
            condition: EndCondition::InstabilityCollapse,
            risk: instability_risk,
            estimated_steps_remaining: instability_steps,
        },
        EndConditionRisk {
            condition: EndCondition::HeatDeath,
            risk: heat_death_risk,
            estimated_steps_remaining: heat_death_steps,
        },
        EndConditionRisk {
            condition: EndCondition::StellarDeath,
            risk: stellar_death_risk,
            estimated_steps_remaining: None,
        },
        EndConditionRisk {
            condition: EndCondition::BigRip,
            risk: big_rip_risk,
            estimated_steps_remaining: None,
        },
        EndConditionRisk {
            condition: EndCondition::BigCrunch,
            risk: big_crunch_risk,
            estimated_steps_remaining: None,
        },
        EndConditionRisk {
            condition: EndCondition::MaximumEntropy,
            risk: entropy_risk,
            estimated_steps_remaining: None,
        },
    ]
}
