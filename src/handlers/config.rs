use axum::{Json, extract::State, http::StatusCode};
use dispatch_gateway::ConfigUpdate;
use serde::Deserialize;
use std::time::Duration;
use crate::handlers::ApiError;
use crate::state::AppState;

// PATCH /config body, durations in milliseconds
#[derive(Deserialize)]
pub struct ConfigPatch {
    pub max_concurrent: Option<usize>,
    pub min_interval_ms: Option<u64>,
    pub cache_ttl_ms: Option<u64>,
}

impl From<ConfigPatch> for ConfigUpdate {
    fn from(patch: ConfigPatch) -> Self {
        ConfigUpdate {
            max_concurrent: patch.max_concurrent,
            min_interval: patch.min_interval_ms.map(Duration::from_millis),
            cache_ttl: patch.cache_ttl_ms.map(Duration::from_millis),
        }
    }
}

pub async fn config_handler(
    State(state): State<AppState>,
    Json(patch): Json<ConfigPatch>,
) -> Result<StatusCode, ApiError> {
    state
        .scheduler
        .update_config(patch.into())
        .map(|_| StatusCode::NO_CONTENT)
        .map_err(|error| ApiError {
            error,
            login_route: state.login_route.clone(),
        })
}
