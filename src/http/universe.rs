//! Universe CRUD, simulation, and anomaly endpoints (spec.md §6.1).

use std::str::FromStr;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::domain::{Anomaly, Difficulty, InitialConditions, PhysicalConstants, Universe, UniverseId};
use crate::error::AppError;
use crate::http::response::Envelope;
use crate::http::{AppState, AuthenticatedUser};
use crate::kernel::{anomaly, end_conditions};
use crate::orchestrator;

fn parse_id(raw: &str) -> Result<UniverseId, AppError> {
    UniverseId::from_str(raw).map_err(|_| AppError::Validation(format!("invalid universe id: {raw}")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUniverseRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub seed: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub constants: Option<PhysicalConstants>,
    #[serde(default)]
    pub initial_conditions: Option<InitialConditions>,
}

/// `POST /universe` (spec.md §6.1): creates and persists a new universe,
/// returning 201 on success.
pub async fn create_universe(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Json(request): Json<CreateUniverseRequest>,
) -> Result<(StatusCode, Envelope<Universe>), AppError> {
    let name = request.name.unwrap_or_else(|| "Untitled Universe".to_string());
    if name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".into()));
    }
    let seed = request.seed.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    if seed.trim().is_empty() {
        return Err(AppError::Validation("seed must not be empty".into()));
    }

    let universe = Universe::new(
        owner_id,
        name,
        seed,
        request.difficulty.unwrap_or_default(),
        request.constants.unwrap_or_default(),
        request.initial_conditions.unwrap_or_default(),
    );
    let created = universe.clone();
    state.store.create(universe).await?;
    Ok((StatusCode::CREATED, Envelope(created)))
}

/// `GET /universe` (spec.md §6.1): the caller's universes, summary
/// projection omitted in favor of the full document — the HTTP transport
/// adapter is free to trim fields before wire serialization, but the
/// core returns the full snapshot.
pub async fn list_universes(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
) -> Result<Envelope<Vec<Universe>>, AppError> {
    let universes = state.store.list(&owner_id).await?;
    Ok(Envelope(universes))
}

/// `GET /universe/:id`.
pub async fn get_universe(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Envelope<Universe>, AppError> {
    let id = parse_id(&id)?;
    let universe = state.store.get(&owner_id, id).await?;
    Ok(Envelope(universe))
}

/// `DELETE /universe/:id`.
pub async fn delete_universe(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Envelope<()>, AppError> {
    let id = parse_id(&id)?;
    state.store.delete(&owner_id, id).await?;
    Ok(Envelope(()))
}

#[derive(Debug, Deserialize)]
pub struct SimulateRequest {
    #[serde(default = "default_steps")]
    pub steps: u32,
}

fn default_steps() -> u32 {
    orchestrator::MAX_STEPS_PER_RUN
}

/// `POST /universe/:id/simulate` (spec.md §6.1, §4.7): the orchestrator
/// report for a bounded run, capped at a request-boundary deadline so a
/// stalled run never blocks the HTTP worker indefinitely (spec.md §5).
pub async fn simulate_universe(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Path(id): Path<String>,
    body: Option<Json<SimulateRequest>>,
) -> Result<Envelope<orchestrator::SimulationReport>, AppError> {
    let id = parse_id(&id)?;
    let steps = body.map(|Json(b)| b.steps).unwrap_or_else(default_steps);
    if steps == 0 {
        return Err(AppError::Validation("steps must be at least 1".into()));
    }
    let deadline = Some(tokio::time::Instant::now() + std::time::Duration::from_secs(25));
    let report = orchestrator::simulate(state.store.as_ref(), &owner_id, id, steps, deadline).await?;
    Ok(Envelope(report))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveAnomalyRequest {
    pub anomaly_id: u64,
}

/// `POST /universe/:id/resolve-anomaly` (spec.md §6.1, §4.3.5).
pub async fn resolve_anomaly(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Path(id): Path<String>,
    Json(request): Json<ResolveAnomalyRequest>,
) -> Result<Envelope<Universe>, AppError> {
    let id = parse_id(&id)?;
    let handle = state.store.lock(&owner_id, id).await?;
    let mut universe = handle.lock().await;
    anomaly::resolve_anomaly(&mut universe, request.anomaly_id)?;
    Ok(Envelope(universe.clone()))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub current_state: crate::domain::CurrentState,
    pub metrics: crate::domain::Metrics,
    pub stability_history: Vec<f64>,
    pub stability_trend: f64,
    pub anomaly_count: usize,
    pub active_anomaly_count: usize,
    pub civilization_count: usize,
    pub active_civilization_count: usize,
    pub status: crate::domain::UniverseStatus,
}

/// `GET /universe/:id/stats` (spec.md §6.1): a statistics snapshot,
/// mirroring `PhysicsEngine::getStatistics()`/`getStabilityHistory()`
/// (spec.md §4.2).
pub async fn universe_stats(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Envelope<StatsSnapshot>, AppError> {
    let id = parse_id(&id)?;
    let universe = state.store.get(&owner_id, id).await?;
    let snapshot = StatsSnapshot {
        current_state: universe.current_state,
        metrics: universe.metrics,
        stability_history: universe.stability_history.clone(),
        stability_trend: universe.stability_trend(),
        anomaly_count: universe.anomalies.len(),
        active_anomaly_count: universe.anomalies.iter().filter(|a| a.is_active()).count(),
        civilization_count: universe.civilizations.len(),
        active_civilization_count: universe.civilizations.iter().filter(|c| c.is_active()).count(),
        status: universe.status,
    };
    Ok(Envelope(snapshot))
}

#[derive(Debug, Serialize)]
pub struct AnomalySplit {
    pub active: Vec<Anomaly>,
    pub resolved: Vec<Anomaly>,
}

/// `GET /universe/:id/anomalies` (spec.md §6.1): the active/resolved
/// split.
pub async fn universe_anomalies(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Envelope<AnomalySplit>, AppError> {
    let id = parse_id(&id)?;
    let universe = state.store.get(&owner_id, id).await?;
    let (resolved, active): (Vec<Anomaly>, Vec<Anomaly>) =
        universe.anomalies.into_iter().partition(|a| a.resolved);
    Ok(Envelope(AnomalySplit { active, resolved }))
}

/// `GET /universe/:id/predictions` (spec.md §6.1, §4.6).
pub async fn universe_predictions(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Envelope<crate::predictor::PredictionReport>, AppError> {
    let id = parse_id(&id)?;
    let universe = state.store.get(&owner_id, id).await?;
    Ok(Envelope(crate::predictor::predict(&universe)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndConditionStatus {
    pub status: crate::domain::UniverseStatus,
    pub end_condition: Option<crate::domain::EndCondition>,
    pub end_reason: Option<String>,
    pub final_age: Option<f64>,
    pub warnings: Vec<end_conditions::UniverseWarning>,
}

/// `GET /universe/:id/end-conditions` (spec.md §6.1, §4.5): the
/// universe's termination status plus any active non-terminal warnings.
pub async fn universe_end_conditions(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Envelope<EndConditionStatus>, AppError> {
    let id = parse_id(&id)?;
    let universe = state.store.get(&owner_id, id).await?;
    let warnings = end_conditions::collect_warnings(&universe);
    Ok(Envelope(EndConditionStatus {
        status: universe.status,
        end_condition: universe.end_condition,
        end_reason: universe.end_reason.clone(),
        final_age: universe.final_age,
        warnings,
    }))
}

/// `GET /universe/:id/events` (added beyond spec.md's endpoint table):
/// the bounded significant-event log, useful for auditing a run without
/// re-deriving it from the full universe document.
pub async fn universe_events(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<Envelope<Vec<crate::domain::SignificantEvent>>, AppError> {
    let id = parse_id(&id)?;
    let universe = state.store.get(&owner_id, id).await?;
    Ok(Envelope(universe.significant_events.iter().cloned().collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupRequest {
    #[serde(default = "default_keep_recent_minutes")]
    pub keep_recent_minutes: i64,
}

fn default_keep_recent_minutes() -> i64 {
    5
}

/// `POST /universe/:id/cleanup-anomalies` (spec.md §6.1).
pub async fn cleanup_anomalies(
    State(state): State<AppState>,
    AuthenticatedUser(owner_id): AuthenticatedUser,
    Path(id): Path<String>,
    body: Option<Json<CleanupRequest>>,
) -> Result<Envelope<serde_json::Value>, AppError> {
    let id = parse_id(&id)?;
    let keep_recent_minutes = body.map(|Json(b)| b.keep_recent_minutes).unwrap_or_else(default_keep_recent_minutes);
    let handle = state.store.lock(&owner_id, id).await?;
    let mut universe = handle.lock().await;
    let removed = anomaly::auto_cleanup(&mut universe.anomalies, keep_recent_minutes);
    universe.touch();
    Ok(Envelope(
        serde_json::json!({ "removed": removed, "remaining": universe.anomalies.len() }),
    ))
}
