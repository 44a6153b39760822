//! Civilization population records (spec.md §3, §4.4).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CivilizationType {
    Type0,
    Type1,
    Type2,
    Type3,
}

/// Cause tag recorded on extinction, chosen from the dominant risk
/// contributor at the moment of the roll (spec.md §4.4 "Extinction risk").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtinctionCause {
    StabilityCollapse,
    ResourceExhaustion,
    Warfare,
    CosmicInstability,
    GreatFilter,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Civilization {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: CivilizationType,
    pub created_at: DateTime<Utc>,
    pub age: f64,
    pub development_level: f64,
    pub technology: f64,
    pub stability: f64,
    pub population: u64,
    pub resource_depletion: f64,
    pub warlikeness: f64,
    pub extinct: bool,
    pub extinction_date: Option<DateTime<Utc>>,
    pub extinction_age: Option<f64>,
    pub extinction_cause: Option<ExtinctionCause>,
}

impl Civilization {
    pub fn is_active(&self) -> bool {
        !self.extinct
    }
}
