//! Location permission state and coalesced permission requests.
//!
//! The platform location service decides whether the app may monitor
//! regions. This crate models its answers ([`AuthorizationStatus`] as
//! reported by the OS, [`AuthorizationState`] as seen by callers) and
//! provides [`PermissionRequestCoordinator`], which asks the OS at most once
//! per undetermined period and hands the answer to every waiting caller.
//!
//! # Usage
//!
//! ```ignore
//! use fencekit_permission::{AuthorizationState, PermissionRequestCoordinator};
//!
//! let coordinator = PermissionRequestCoordinator::new();
//! coordinator.request(&source, |state| {
//!     if state == AuthorizationState::Available {
//!         // start monitoring
//!     }
//! });
//!
//! // Later, when the OS reports the user's decision:
//! coordinator.on_authorization_changed(status)?;
//! ```

#![warn(missing_docs)]

mod coordinator;
mod error;

pub use coordinator::{PendingRequest, PermissionRequestCoordinator};
pub use error::{PermissionError, PermissionResult};

use serde::{Deserialize, Serialize};

/// The state of location services for this app, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationState {
    /// Location services are enabled and the user granted access.
    Available,
    /// The user has not yet answered the permission dialog.
    NotDetermined,
    /// The user explicitly denied access. It can be re-enabled from system settings.
    Denied,
    /// The user cannot grant access (e.g., parental controls or device policy).
    Restricted,
    /// Location services are turned off device-wide.
    ServiceDisabled,
}

impl AuthorizationState {
    /// Returns `true` if region monitoring may proceed.
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Available)
    }
}

/// Authorization status as reported by the platform location service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    /// The user has not chosen yet.
    NotDetermined,
    /// The app is not allowed to use location services.
    Restricted,
    /// The user denied access.
    Denied,
    /// Access granted at all times, including in the background.
    AuthorizedAlways,
    /// Access granted only while the app is in use.
    AuthorizedWhenInUse,
}

impl AuthorizationStatus {
    /// Maps the status to the caller-facing state.
    ///
    /// Both authorized variants read as [`AuthorizationState::Available`].
    #[must_use]
    pub const fn to_state(self) -> AuthorizationState {
        match self {
            Self::NotDetermined => AuthorizationState::NotDetermined,
            Self::Restricted => AuthorizationState::Restricted,
            Self::Denied => AuthorizationState::Denied,
            Self::AuthorizedAlways | Self::AuthorizedWhenInUse => AuthorizationState::Available,
        }
    }
}

impl TryFrom<i64> for AuthorizationStatus {
    type Error = PermissionError;

    /// Converts a raw `CLAuthorizationStatus` value.
    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::NotDetermined),
            1 => Ok(Self::Restricted),
            2 => Ok(Self::Denied),
            3 => Ok(Self::AuthorizedAlways),
            4 => Ok(Self::AuthorizedWhenInUse),
            _ => Err(PermissionError::UnexpectedStatus { code }),
        }
    }
}

impl From<AuthorizationStatus> for i64 {
    fn from(status: AuthorizationStatus) -> Self {
        match status {
            AuthorizationStatus::NotDetermined => 0,
            AuthorizationStatus::Restricted => 1,
            AuthorizationStatus::Denied => 2,
            AuthorizationStatus::AuthorizedAlways => 3,
            AuthorizationStatus::AuthorizedWhenInUse => 4,
        }
    }
}

/// The part of a platform location service that answers permission questions.
pub trait AuthorizationSource {
    /// Whether location services are enabled device-wide.
    fn is_service_enabled(&self) -> bool;

    /// The current authorization status for this app.
    ///
    /// # Errors
    ///
    /// Returns [`PermissionError::UnexpectedStatus`] if the platform reports
    /// a status code outside [`AuthorizationStatus`].
    fn authorization_status(&self) -> PermissionResult<AuthorizationStatus>;

    /// Shows the OS dialog asking for "always" access.
    ///
    /// The answer arrives later through
    /// [`PermissionRequestCoordinator::on_authorization_changed`].
    fn request_always_authorization(&self);
}

/// Returns the current state of location services for this app.
///
/// # Errors
///
/// Propagates an unknown status code from the source. A disabled service is
/// reported without asking for the status.
pub fn current_state<S: AuthorizationSource + ?Sized>(
    source: &S,
) -> PermissionResult<AuthorizationState> {
    if source.is_service_enabled() {
        Ok(source.authorization_status()?.to_state())
    } else {
        Ok(AuthorizationState::ServiceDisabled)
    }
}
