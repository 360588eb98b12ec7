use thiserror::Error;

/// Errors raised while coordinating permission requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PermissionError {
    /// The platform reported an authorization status outside the known set.
    #[error("unexpected authorization status: {code}")]
    UnexpectedStatus {
        /// Raw status code as reported by the platform.
        code: i64,
    },
    /// The coordinator was dropped before the request resolved.
    #[error("permission request abandoned before a decision arrived")]
    Abandoned,
}

/// Convenience alias for permission results.
pub type PermissionResult<T> = Result<T, PermissionError>;
