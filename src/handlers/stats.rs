use axum::{Json, extract::State};
use dispatch_gateway::Stats;
use crate::handlers::ApiError;
use crate::state::AppState;

pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<Stats>, ApiError> {
    state.scheduler.stats().await.map(Json).map_err(|error| ApiError {
        error,
        login_route: state.login_route.clone(),
    })
}
