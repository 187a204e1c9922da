use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use dispatch_gateway::{CallDescriptor, CallError, TransportError};
use serde_json::{Value, json};
use crate::state::AppState;

// Failed call as seen by the dashboard
pub struct ApiError {
    pub error: CallError,
    pub login_route: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.error {
            CallError::Transport(TransportError::Unauthorized)
            | CallError::Transport(TransportError::SessionExpired) => StatusCode::UNAUTHORIZED,
            CallError::Transport(TransportError::Status { status, .. }) => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            CallError::Transport(_) => StatusCode::BAD_GATEWAY,
            CallError::Closed | CallError::Aborted => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    fn body(&self) -> Value {
        let mut body = json!({ "error": self.error.to_string() });
        if let CallError::Transport(e) = &self.error {
            if e.ends_session() {
                body["redirect"] = Value::String(self.login_route.clone());
            }
        }
        body
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body())).into_response()
    }
}

pub async fn call_handler(
    State(state): State<AppState>,
    Json(descriptor): Json<CallDescriptor>,
) -> Result<Json<Value>, ApiError> {
    state
        .scheduler
        .submit(descriptor)
        .await
        .map(Json)
        .map_err(|error| ApiError {
            error,
            login_route: state.login_route.clone(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(error: CallError) -> ApiError {
        ApiError {
            error,
            login_route: "/login".to_string(),
        }
    }

    #[test]
    fn session_errors_carry_the_login_route() {
        let err = api_error(TransportError::SessionExpired.into());
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.body()["redirect"], "/login");
    }

    #[test]
    fn backend_status_is_passed_through() {
        let err = api_error(
            TransportError::Status {
                status: 422,
                body: "bad stop".to_string(),
            }
            .into(),
        );
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert!(err.body().get("redirect").is_none());
    }

    #[test]
    fn other_failures_map_to_gateway_errors() {
        assert_eq!(
            api_error(TransportError::Network("refused".into()).into()).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(api_error(CallError::Closed).status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
