use thiserror::Error;

/// Failure reported by a transport.
///
/// Cloneable because a single failed call settles every caller that was
/// coalesced onto it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("invalid url '{0}'")]
    InvalidUrl(String),

    #[error("backend answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("could not decode response: {0}")]
    Decode(String),

    #[error("session is not authorized")]
    Unauthorized,

    #[error("session refers to a workspace that no longer exists")]
    SessionExpired,
}

impl TransportError {
    // Errors after which the session has been torn down
    pub fn ends_session(&self) -> bool {
        matches!(self, TransportError::Unauthorized | TransportError::SessionExpired)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CallError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("scheduler is no longer running")]
    Closed,

    #[error("call execution aborted")]
    Aborted,
}
