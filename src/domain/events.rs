//! Significant events and their bounded FIFO log (spec.md §3, §9).
//!
//! A `VecDeque` with a push that evicts from the front on overflow, sized
//! for a larger capacity (2000) with a batched eviction of the oldest 500
//! entries rather than a single pop, for amortized O(1) cost on a hot
//! path that can append every tick.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::anomaly::AnomalyType;
use crate::domain::civilization::{CivilizationType, ExtinctionCause};
use crate::domain::universe::EndCondition;

pub const SIGNIFICANT_EVENT_CAPACITY: usize = 2000;
pub const SIGNIFICANT_EVENT_EVICTION_BATCH: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignificantEventKind {
    Milestone,
    AnomalyGenerated,
    AnomalyResolved,
    CivilizationSpawned,
    CivilizationExtinct,
    CivilizationPromoted,
    CatastrophicEvent,
    UniverseEnd,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignificantEvent {
    pub timestamp: DateTime<Utc>,
    pub age: f64,
    pub age_gyr: String,
    #[serde(rename = "type")]
    pub kind: SignificantEventKind,
    pub description: String,
    pub effects: HashMap<String, f64>,
}

impl SignificantEvent {
    pub fn new(
        age: f64,
        kind: SignificantEventKind,
        description: impl Into<String>,
        effects: HashMap<String, f64>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            age,
            age_gyr: format!("{:.3}", age / 1.0e9),
            kind,
            description: description.into(),
            effects,
        }
    }

    pub fn milestone(age: f64, milestone_key: &str) -> Self {
        Self::new(
            age,
            SignificantEventKind::Milestone,
            format!("Milestone reached: {milestone_key}"),
            HashMap::new(),
        )
    }

    pub fn anomaly_generated(age: f64, anomaly_id: u64, kind: AnomalyType) -> Self {
        Self::new(
            age,
            SignificantEventKind::AnomalyGenerated,
            format!("Anomaly #{anomaly_id} ({kind:?}) emerged"),
            HashMap::new(),
        )
    }

    pub fn anomaly_resolved(age: f64, anomaly_id: u64, stability_boost: f64) -> Self {
        let mut effects = HashMap::new();
        effects.insert("stabilityBoost".to_string(), stability_boost);
        Self::new(
            age,
            SignificantEventKind::AnomalyResolved,
            format!("Anomaly #{anomaly_id} resolved"),
            effects,
        )
    }

    pub fn civilization_spawned(age: f64, civ_id: u64) -> Self {
        Self::new(
            age,
            SignificantEventKind::CivilizationSpawned,
            format!("Civilization #{civ_id} emerged"),
            HashMap::new(),
        )
    }

    pub fn civilization_extinct(age: f64, civ_id: u64, cause: ExtinctionCause) -> Self {
        Self::new(
            age,
            SignificantEventKind::CivilizationExtinct,
            format!("Civilization #{civ_id} went extinct ({cause:?})"),
            HashMap::new(),
        )
    }

    pub fn civilization_promoted(age: f64, civ_id: u64, new_kind: CivilizationType) -> Self {
        Self::new(
            age,
            SignificantEventKind::CivilizationPromoted,
            format!("Civilization #{civ_id} advanced to {new_kind:?}"),
            HashMap::new(),
        )
    }

    pub fn catastrophic_event(age: f64, killed: usize) -> Self {
        Self::new(
            age,
            SignificantEventKind::CatastrophicEvent,
            format!("A great filter event eliminated {killed} civilizations"),
            HashMap::new(),
        )
    }

    pub fn universe_end(age: f64, condition: EndCondition) -> Self {
        Self::new(
            age,
            SignificantEventKind::UniverseEnd,
            format!("Universe ended: {condition:?}"),
            HashMap::new(),
        )
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignificantEventLog(VecDeque<SignificantEvent>);

impl SignificantEventLog {
    pub fn push(&mut self, event: SignificantEvent) {
        self.0.push_back(event);
        if self.0.len() > SIGNIFICANT_EVENT_CAPACITY {
            let evict = SIGNIFICANT_EVENT_EVICTION_BATCH.min(self.0.len());
            self.0.drain(0..evict);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SignificantEvent> {
        self.0.iter()
    }

    pub fn last(&self) -> Option<&SignificantEvent> {
        self.0.back()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_evicts_oldest_batch() {
        let mut log = SignificantEventLog::default();
        for i in 0..2001 {
            log.push(SignificantEvent::new(
                i as f64,
                SignificantEventKind::Milestone,
                "tick",
                HashMap::new(),
            ));
        }
        // 2001 pushed, overflow triggers once the 2001st push crosses 2000.
        assert_eq!(log.len(), SIGNIFICANT_EVENT_CAPACITY + 1 - SIGNIFICANT_EVENT_EVICTION_BATCH);
        // The oldest surviving event is the 501st pushed (age == 500.0).
        assert_eq!(log.iter().next().unwrap().age, 500.0);
    }

    #[test]
    fn stays_under_capacity_without_overflow() {
        let mut log = SignificantEventLog::default();
        for i in 0..500 {
            log.push(SignificantEvent::new(
                i as f64,
                SignificantEventKind::Milestone,
                "tick",
                HashMap::new(),
            ));
        }
        assert_eq!(log.len(), 500);
    }
}
