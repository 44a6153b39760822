//! Termination predicates and non-terminal warnings (spec.md §4.5).

use bevy_ecs::prelude::{Res, ResMut};
use serde::Serialize;

use crate::domain::universe::EndCondition;
use crate::kernel::resources::{KernelConfig, TickEventLog, UniverseState};

/// Evaluates the six termination predicates in declared order; the first
/// match wins. Sets `state.ended` but does not mutate the persisted
/// `Universe` — the orchestrator applies that after the run.
pub fn end_condition_system(
    mut state: ResMut<UniverseState>,
    config: Res<KernelConfig>,
    mut events: ResMut<TickEventLog>,
) {
    if state.ended.is_some() {
        return;
    }
    let modifier = config.options.difficulty_modifier;
    if let Some(condition) = evaluate(&state, modifier) {
        state.ended = Some(condition);
        events.0.push(crate::domain::events::SignificantEvent::universe_end(
            state.current.age,
            condition,
        ));
    }
}

fn recent_mean(history: &[f64], window: usize) -> f64 {
    if history.is_empty() {
        return 1.0;
    }
    let take = window.min(history.len());
    let slice = &history[history.len() - take..];
    slice.iter().sum::<f64>() / slice.len() as f64
}

fn evaluate(state: &UniverseState, modifier: f64) -> Option<EndCondition> {
    let current = &state.current;
    let age_gyr = current.age_gyr();

    if current.stability_index < 0.05 / modifier
        && recent_mean(&state.stability_history, 10) < 0.10 / modifier
    {
        return Some(EndCondition::InstabilityCollapse);
    }
    if age_gyr > 200.0 / modifier && current.energy_budget < 0.05 {
        return Some(EndCondition::HeatDeath);
    }
    if age_gyr > 80.0 && current.star_count < 1.0e4 && current.energy_budget < 0.08 {
        return Some(EndCondition::StellarDeath);
    }
    if current.scale_factor > 1.0e9 {
        return Some(EndCondition::BigRip);
    }
    if current.scale_factor < 1.0e-8 {
        return Some(EndCondition::BigCrunch);
    }
    if current.entropy > 2.0e15 && current.energy_budget < 0.02 {
        return Some(EndCondition::MaximumEntropy);
    }
    None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningSeverity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize)]
pub struct UniverseWarning {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub severity: WarningSeverity,
    pub message: String,
    pub recommendation: &'static str,
}

/// Non-terminal warnings surfaced by the status/predictor endpoints
/// (spec.md §4.5, §6.1).
pub fn collect_warnings(universe: &crate::domain::Universe) -> Vec<UniverseWarning> {
    let current = &universe.current_state;
    let modifier = universe.difficulty.options().difficulty_modifier;
    let mut warnings = Vec::new();

    let instability_threshold = 0.05 / modifier;
    if current.stability_index < instability_threshold * 3.0
        && current.stability_index >= instability_threshold
    {
        warnings.push(UniverseWarning {
            kind: "stability",
            severity: if current.stability_index < instability_threshold * 1.5 {
                WarningSeverity::Critical
            } else {
                WarningSeverity::High
            },
            message: format!(
                "Stability index {:.4} is approaching the collapse threshold",
                current.stability_index
            ),
            recommendation: "Resolve active anomalies to restore stability",
        });
    }

    let heat_death_threshold = 200.0 / modifier;
    if current.age_gyr() > 0.8 * heat_death_threshold {
        warnings.push(UniverseWarning {
            kind: "age",
            severity: WarningSeverity::Medium,
            message: "Universe is approaching its expected heat-death age".to_string(),
            recommendation: "Monitor energy budget for an approaching end condition",
        });
    }

    if current.entropy > 1.5e15 {
        warnings.push(UniverseWarning {
            kind: "entropy",
            severity: WarningSeverity::Medium,
            message: format!("Entropy {:.3e} is nearing saturation", current.entropy),
            recommendation: "Expect reduced structure formation as entropy climbs",
        });
    }

    if current.energy_budget < 0.15 {
        warnings.push(UniverseWarning {
            kind: "energy_budget",
            severity: if current.energy_budget < 0.08 {
                WarningSeverity::High
            } else {
                WarningSeverity::Low
            },
            message: format!("Energy budget {:.4} is running low", current.energy_budget),
            recommendation: "Heat death becomes likely once the budget is exhausted",
        });
    }

    if current.scale_factor > 1.0e8 {
        warnings.push(UniverseWarning {
            kind: "expansion",
            severity: WarningSeverity::High,
            message: format!("Scale factor {:.3e} is approaching the big-rip threshold", current.scale_factor),
            recommendation: "Expansion is accelerating faster than structure can reform",
        });
    }

    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn big_rip_fires_past_threshold() {
        let mut state = UniverseState {
            current: crate::domain::CurrentState::new(&crate::domain::InitialConditions::default()),
            anomalies: Vec::new(),
            civilizations: Vec::new(),
            metrics: crate::domain::Metrics::default(),
            milestones: crate::domain::universe::Milestones::default(),
            stability_history: Vec::new(),
            next_anomaly_id: 1,
            next_civilization_id: 1,
            ticks_run: 0,
            ended: None,
        };
        state.current.scale_factor = 2.0e9;
        assert_eq!(evaluate(&state, 1.0), Some(EndCondition::BigRip));
    }

    #[test]
    fn nominal_state_has_no_end_condition() {
        let state = UniverseState {
            current: crate::domain::CurrentState::new(&crate::domain::InitialConditions::default()),
            anomalies: Vec::new(),
            civilizations: Vec::new(),
            metrics: crate::domain::Metrics::default(),
            milestones: crate::domain::universe::Milestones::default(),
            stability_history: Vec::new(),
            next_anomaly_id: 1,
            next_civilization_id: 1,
            ticks_run: 0,
            ended: None,
        };
        assert_eq!(evaluate(&state, 1.0), None);
    }
}
