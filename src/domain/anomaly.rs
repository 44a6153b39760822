//! Anomaly records and the closed set of anomaly types (spec.md §3, §4.3).
//!
//! Anomaly types are a tagged-variant table (condition predicate + effect
//! function + metadata) rather than a class hierarchy, the same way
//! `Era`/`Tech`/`WeaponTier` are enums driven by a static table elsewhere
//! in this codebase — this keeps the set closed, keeps determinism
//! auditable, and serializes trivially.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::universe::CurrentState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnomalyType {
    BlackHoleMerger,
    DarkEnergySurge,
    SupernovaChain,
    QuantumFluctuation,
    GalacticCollision,
    CosmicVoid,
    MagneticReversal,
    DarkMatterClump,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnomalyCategory {
    Gravitational,
    Cosmological,
    Stellar,
    Quantum,
    Structural,
    Electromagnetic,
}

/// A table row describing one anomaly type: when it can occur, how likely
/// it is per tick, and what it does to the universe when it fires.
pub struct AnomalyTypeDef {
    pub kind: AnomalyType,
    pub category: AnomalyCategory,
    pub base_probability: f64,
    pub description: &'static str,
    pub condition: fn(&CurrentState) -> bool,
    /// Named effect deltas scaled by severity, applied additively/
    /// multiplicatively per spec.md §4.3.3's effect table.
    pub effects: fn(severity: f64) -> Vec<(&'static str, f64)>,
}

/// The declared order in which the generator evaluates anomaly types each
/// tick (spec.md §4.3.2 step 4). Order matters: it is part of the
/// deterministic trajectory given a seed.
pub fn anomaly_type_table() -> &'static [AnomalyTypeDef] {
    const TABLE: &[AnomalyTypeDef] = &[
        AnomalyTypeDef {
            kind: AnomalyType::BlackHoleMerger,
            category: AnomalyCategory::Gravitational,
            base_probability: 0.001,
            description: "Two supermassive black holes spiral together and merge",
            condition: |s| s.black_hole_count > 1.0e5,
            effects: |severity| {
                vec![
                    ("stability", -0.008 * severity),
                    ("entropy", 5.0e6 * severity),
                ]
            },
        },
        AnomalyTypeDef {
            kind: AnomalyType::DarkEnergySurge,
            category: AnomalyCategory::Cosmological,
            base_probability: 0.0004,
            description: "A transient surge in the dark energy density accelerates expansion",
            condition: |s| s.age_gyr() > 5.0,
            effects: |severity| {
                vec![
                    ("expansionBoost", 0.0008 * severity),
                    ("scaleFactorBump", 0.001 * severity),
                    ("stability", -0.012 * severity),
                ]
            },
        },
        AnomalyTypeDef {
            kind: AnomalyType::SupernovaChain,
            category: AnomalyCategory::Stellar,
            base_probability: 0.0015,
            description: "A chain reaction of supernovae sweeps through a stellar cluster",
            condition: |s| s.star_count > 1.0e9,
            effects: |severity| {
                vec![
                    ("metallicity", 0.0005 * severity),
                    ("starCount", -100.0 * severity),
                    ("stability", -0.005 * severity),
                ]
            },
        },
        AnomalyTypeDef {
            kind: AnomalyType::QuantumFluctuation,
            category: AnomalyCategory::Quantum,
            base_probability: 0.0003,
            description: "A vacuum fluctuation briefly perturbs the local metric",
            condition: |_| true,
            effects: |severity| {
                vec![
                    ("entropy", -1.0e6 * severity),
                    ("stability", -0.015 * severity),
                ]
            },
        },
        AnomalyTypeDef {
            kind: AnomalyType::GalacticCollision,
            category: AnomalyCategory::Structural,
            base_probability: 0.0008,
            description: "Two galaxies collide, scattering stars and feeding black holes",
            condition: |s| s.galaxy_count > 1.0e6 && s.age_gyr() > 2.0,
            effects: |severity| {
                vec![
                    ("starCount", 5000.0 * severity),
                    ("blackHoleCount", 10.0 * severity),
                    ("stability", -0.007 * severity),
                ]
            },
        },
        AnomalyTypeDef {
            kind: AnomalyType::CosmicVoid,
            category: AnomalyCategory::Structural,
            base_probability: 0.0003,
            description: "An underdense void swallows a cluster of galaxies",
            condition: |s| s.age_gyr() > 3.0,
            effects: |severity| {
                vec![
                    ("galaxyCount", -1000.0 * severity),
                    ("stability", -0.01 * severity),
                ]
            },
        },
        AnomalyTypeDef {
            kind: AnomalyType::MagneticReversal,
            category: AnomalyCategory::Electromagnetic,
            base_probability: 0.0005,
            description: "A galactic-scale magnetic field reversal disrupts habitability",
            condition: |s| s.galaxy_count > 1.0e5,
            effects: |severity| {
                vec![
                    ("habitable", -100.0 * severity),
                    ("stability", -0.004 * severity),
                ]
            },
        },
        AnomalyTypeDef {
            kind: AnomalyType::DarkMatterClump,
            category: AnomalyCategory::Gravitational,
            base_probability: 0.0006,
            description: "An overdense dark matter clump distorts local structure formation",
            condition: |s| s.age_gyr() > 1.0,
            effects: |severity| vec![("stability", -0.006 * severity)],
        },
    ];
    TABLE
}

pub fn anomaly_type_def(kind: AnomalyType) -> &'static AnomalyTypeDef {
    anomaly_type_table()
        .iter()
        .find(|def| def.kind == kind)
        .expect("anomaly_type_table is exhaustive over AnomalyType")
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Location {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: AnomalyType,
    pub category: AnomalyCategory,
    pub severity: f64,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub effects_raw: HashMap<String, f64>,
    pub location: Location,
    pub radius: f64,
    pub description: String,
    pub decay_rate: f64,
}

impl Anomaly {
    pub fn is_active(&self) -> bool {
        !self.resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::universe::InitialConditions;

    #[test]
    fn anomaly_table_order_is_stable() {
        let kinds: Vec<AnomalyType> = anomaly_type_table().iter().map(|d| d.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AnomalyType::BlackHoleMerger,
                AnomalyType::DarkEnergySurge,
                AnomalyType::SupernovaChain,
                AnomalyType::QuantumFluctuation,
                AnomalyType::GalacticCollision,
                AnomalyType::CosmicVoid,
                AnomalyType::MagneticReversal,
                AnomalyType::DarkMatterClump,
            ]
        );
    }

    #[test]
    fn quantum_fluctuation_always_eligible() {
        let state = CurrentState::new(&InitialConditions::default());
        let def = anomaly_type_def(AnomalyType::QuantumFluctuation);
        assert!((def.condition)(&state));
    }

    #[test]
    fn effect_scales_linearly_with_severity() {
        let def = anomaly_type_def(AnomalyType::DarkMatterClump);
        let at_one = (def.effects)(1.0);
        let at_three = (def.effects)(3.0);
        assert_eq!(at_one[0].1 * 3.0, at_three[0].1);
    }
}
