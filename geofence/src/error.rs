use fencekit_permission::PermissionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Region monitoring failures reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringError {
    /// The user or system refused region monitoring.
    #[error("region monitoring denied")]
    Denied,
    /// The region could not be monitored.
    #[error("region monitoring failure")]
    Failure,
    /// Monitoring could not be set up right away and will be retried by the OS.
    #[error("region monitoring setup delayed")]
    SetupDelayed,
    /// Region events may arrive late.
    #[error("region monitoring response delayed")]
    ResponseDelayed,
}

impl TryFrom<i64> for MonitoringError {
    type Error = GeofenceError;

    /// Converts a raw `CLError` code.
    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            4 => Ok(Self::Denied),
            5 => Ok(Self::Failure),
            6 => Ok(Self::SetupDelayed),
            7 => Ok(Self::ResponseDelayed),
            _ => Err(GeofenceError::UnexpectedStatus { code }),
        }
    }
}

impl From<MonitoringError> for i64 {
    fn from(error: MonitoringError) -> Self {
        match error {
            MonitoringError::Denied => 4,
            MonitoringError::Failure => 5,
            MonitoringError::SetupDelayed => 6,
            MonitoringError::ResponseDelayed => 7,
        }
    }
}

/// Errors that can occur when managing a geofence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeofenceError {
    /// The platform reported a status or error code outside the known set.
    #[error("unexpected status code from location service: {code}")]
    UnexpectedStatus {
        /// Raw code as reported by the platform.
        code: i64,
    },
    /// The region cannot be monitored as described.
    #[error("invalid region: {reason}")]
    InvalidRegion {
        /// What is wrong with the region.
        reason: String,
    },
    /// Permission handling failed.
    #[error(transparent)]
    Permission(#[from] PermissionError),
    /// The authority has no delegate to deliver callbacks to.
    #[error("no delegate registered with the location authority")]
    DelegateMissing,
    /// The location service rejected the request.
    #[error("location service error: {message}")]
    Backend {
        /// Message from the backend.
        message: String,
    },
    /// Failed to encode or decode data crossing the platform bridge.
    #[error("serialization error: {message}")]
    Serialization {
        /// Underlying error message.
        message: String,
    },
}

impl From<serde_json::Error> for GeofenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Convenience alias for geofence results.
pub type GeofenceResult<T> = Result<T, GeofenceError>;
