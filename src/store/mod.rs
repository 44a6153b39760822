//! Persistence (spec.md §5, §9): a storage trait plus the in-memory
//! implementation this service ships with.
//!
//! Generalized from a single shared `Arc<RwLock<ObserverSnapshot>>` held
//! for a process's lifetime into a keyed table of per-universe locks: an outer
//! `RwLock<HashMap<UniverseId, Arc<Mutex<Universe>>>>` for the registry,
//! and an inner `tokio::sync::Mutex` held for the full load-simulate-persist
//! duration of one orchestrator run, so two concurrent `simulate` calls
//! against the same universe serialize instead of racing, while calls
//! against different universes run fully in parallel.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{Universe, UniverseId};
use crate::error::AppError;

/// Abstracts over where universes live, so the in-memory table used here
/// can later be swapped for a real database without touching the
/// orchestrator or HTTP layers (spec.md §6.3 `STORAGE_CONNECTION_STRING`).
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn create(&self, universe: Universe) -> Result<(), AppError>;
    async fn get(&self, owner_id: &str, id: UniverseId) -> Result<Universe, AppError>;
    async fn list(&self, owner_id: &str) -> Result<Vec<Universe>, AppError>;
    async fn delete(&self, owner_id: &str, id: UniverseId) -> Result<(), AppError>;

    /// Returns the per-universe lock so a caller can hold it across an
    /// entire load-simulate-persist sequence (spec.md §4.7, §9). Fails
    /// with `NotFound` if the universe doesn't exist or isn't owned by
    /// `owner_id` — the same way `get` does, so existence is never leaked
    /// to a non-owner.
    async fn lock(
        &self,
        owner_id: &str,
        id: UniverseId,
    ) -> Result<Arc<Mutex<Universe>>, AppError>;
}

#[derive(Default)]
pub struct InMemoryStore {
    universes: RwLock<HashMap<UniverseId, Arc<Mutex<Universe>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(id: UniverseId) -> AppError {
        AppError::NotFound(format!("universe {id} not found"))
    }
}

/// Round-trips a universe through its wire encoding (spec.md §6.2), so a
/// `get`/`list` exercises the same `serde_json` path a real document
/// store would, rather than handing back a bare in-process `Clone`
/// (spec.md §8 "Round-trip").
fn wire_round_trip(universe: &Universe) -> Result<Universe, AppError> {
    let value = serde_json::to_value(universe)
        .map_err(|e| AppError::Persistence(format!("universe failed to serialize: {e}")))?;
    serde_json::from_value(value)
        .map_err(|e| AppError::Persistence(format!("universe failed to deserialize: {e}")))
}

#[async_trait]
impl PersistentStore for InMemoryStore {
    async fn create(&self, universe: Universe) -> Result<(), AppError> {
        let id = universe.id;
        let mut table = self
            .universes
            .write()
            .map_err(|_| AppError::Persistence("universe table lock poisoned".into()))?;
        table.insert(id, Arc::new(Mutex::new(universe)));
        Ok(())
    }

    async fn get(&self, owner_id: &str, id: UniverseId) -> Result<Universe, AppError> {
        let entry = {
            let table = self
                .universes
                .read()
                .map_err(|_| AppError::Persistence("universe table lock poisoned".into()))?;
            table.get(&id).cloned()
        };
        let entry = entry.ok_or_else(|| Self::not_found(id))?;
        let universe = entry.lock().await;
        if universe.owner_id != owner_id {
            return Err(Self::not_found(id));
        }
        wire_round_trip(&universe)
    }

    async fn list(&self, owner_id: &str) -> Result<Vec<Universe>, AppError> {
        let entries: Vec<Arc<Mutex<Universe>>> = {
            let table = self
                .universes
                .read()
                .map_err(|_| AppError::Persistence("universe table lock poisoned".into()))?;
            table.values().cloned().collect()
        };
        let mut owned = Vec::new();
        for entry in entries {
            let universe = entry.lock().await;
            if universe.owner_id == owner_id {
                owned.push(wire_round_trip(&universe)?);
            }
        }
        owned.sort_by_key(|u| u.created_at);
        Ok(owned)
    }

    async fn delete(&self, owner_id: &str, id: UniverseId) -> Result<(), AppError> {
        let entry = {
            let table = self
                .universes
                .read()
                .map_err(|_| AppError::Persistence("universe table lock poisoned".into()))?;
            table.get(&id).cloned()
        };
        let entry = entry.ok_or_else(|| Self::not_found(id))?;
        {
            let universe = entry.lock().await;
            if universe.owner_id != owner_id {
                return Err(Self::not_found(id));
            }
        }
        let mut table = self
            .universes
            .write()
            .map_err(|_| AppError::Persistence("universe table lock poisoned".into()))?;
        table.remove(&id);
        Ok(())
    }

    async fn lock(&self, owner_id: &str, id: UniverseId) -> Result<Arc<Mutex<Universe>>, AppError> {
        let entry = {
            let table = self
                .universes
                .read()
                .map_err(|_| AppError::Persistence("universe table lock poisoned".into()))?;
            table.get(&id).cloned()
        };
        let entry = entry.ok_or_else(|| Self::not_found(id))?;
        {
            let universe = entry.lock().await;
            if universe.owner_id != owner_id {
                return Err(Self::not_found(id));
            }
        }
        Ok(entry)
    }
}
