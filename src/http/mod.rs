//! The HTTP surface (spec.md §6): an `axum` router over the orchestrator,
//! store, and predictor, with `tower_http::trace::TraceLayer` for
//! structured request logging.

pub mod response;
pub mod universe;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::store::PersistentStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn PersistentStore>,
    pub config: Arc<AppConfig>,
}

/// Extracts and verifies the bearer token from `Authorization`, yielding
/// the authenticated `userId` every handler scopes its store calls to
/// (spec.md §6.2).
pub struct AuthenticatedUser(pub String);

#[async_trait::async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Auth("missing Authorization header".to_string()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Auth("Authorization header must be a Bearer token".to_string()))?;
        let user_id = crate::auth::verify_token(&state.config.token_signing_secret, token)?;
        Ok(AuthenticatedUser(user_id))
    }
}

/// Route table mirrors spec.md §6.1's endpoint table exactly, plus one
/// addition (`GET /universe/:id/events`) noted in its own handler doc
/// comment.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/universe", post(universe::create_universe).get(universe::list_universes))
        .route("/universe/:id", get(universe::get_universe).delete(universe::delete_universe))
        .route("/universe/:id/simulate", post(universe::simulate_universe))
        .route("/universe/:id/resolve-anomaly", post(universe::resolve_anomaly))
        .route("/universe/:id/stats", get(universe::universe_stats))
        .route("/universe/:id/anomalies", get(universe::universe_anomalies))
        .route("/universe/:id/predictions", get(universe::universe_predictions))
        .route("/universe/:id/end-conditions", get(universe::universe_end_conditions))
        .route("/universe/:id/cleanup-anomalies", post(universe::cleanup_anomalies))
        .route("/universe/:id/events", get(universe::universe_events))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
