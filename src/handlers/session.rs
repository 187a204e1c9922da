use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::info;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct Credentials {
    pub token: String,
    #[serde(default)]
    pub tenant: Option<String>,
}

#[derive(Serialize)]
pub struct SessionView {
    pub authenticated: bool,
    pub tenant: Option<String>,
    pub redirect: Option<String>, // set once after a teardown
}

pub async fn get_session_handler(State(state): State<AppState>) -> Json<SessionView> {
    Json(SessionView {
        authenticated: state.session.is_authenticated(),
        tenant: state.session.tenant(),
        redirect: state.redirect.take(),
    })
}

pub async fn put_session_handler(
    State(state): State<AppState>,
    Json(credentials): Json<Credentials>,
) -> StatusCode {
    info!(tenant = ?credentials.tenant, "Session started");
    state.session.sign_in(credentials.token, credentials.tenant);
    StatusCode::NO_CONTENT
}

pub async fn clear_session_handler(State(state): State<AppState>) -> StatusCode {
    state.session.clear();
    info!("Session cleared");
    StatusCode::NO_CONTENT
}
