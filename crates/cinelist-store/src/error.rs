use thiserror::Error;

/// Everything that can go wrong talking to the watchlist store
///
/// The controller converts each of these into a state transition; none of them
/// reach the presentation layer as an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Transport-level failure (connect, timeout, truncated body)
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// No credential available; no request was sent
    #[error("not signed in")]
    AuthMissing,

    /// The store rejected the credential (401)
    #[error("session expired or invalid")]
    Unauthorized,

    /// The movie id is unknown to the catalog
    #[error("movie not found in catalog")]
    NotFound,

    /// The store declined the request
    #[error("{reason} (HTTP {status})")]
    Rejected { status: u16, reason: String },

    /// 2xx response whose body could not be understood
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl StoreError {
    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        StoreError::Rejected {
            status,
            reason: reason.into(),
        }
    }

    /// Short text suitable for an inline notice next to the control
    pub fn user_message(&self) -> String {
        match self {
            StoreError::NetworkFailure(_) => "Could not reach the watchlist service. Try again.".to_string(),
            StoreError::AuthMissing => "Sign in to manage your watchlist.".to_string(),
            StoreError::Unauthorized => "Your session has expired. Sign in again.".to_string(),
            StoreError::NotFound => "This movie is not in the catalog.".to_string(),
            StoreError::Rejected { reason, .. } => reason.clone(),
            StoreError::MalformedResponse(_) => "Unexpected response from the watchlist service.".to_string(),
        }
    }
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::NetworkFailure(err.to_string())
    }
}
