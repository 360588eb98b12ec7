//! Single-region geofence monitoring.
//!
//! [`GeofenceManager`] binds to a platform [`LocationAuthority`], keeps at
//! most one circular region under monitoring, and forwards boundary crossings
//! and monitoring failures to closures supplied by the host. Permission
//! requests are coalesced through
//! [`PermissionRequestCoordinator`](fencekit_permission::PermissionRequestCoordinator).
//!
//! The authority does all the real work: sensing, region math, and the
//! permission dialog belong to the OS. Use [`sys::ManualAuthority`] where no
//! OS region monitoring exists, or `sys::AppleLocationAuthority` with the
//! `apple` feature.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use fencekit_geofence::{Coordinate, GeofenceManager, GeofenceRegion};
//!
//! let manager = GeofenceManager::new(
//!     authority,
//!     |entered| println!("entered: {entered}"),
//!     |error| eprintln!("monitoring failed: {error}"),
//! );
//!
//! manager.request_permissions(move |state| {
//!     if state.is_available() {
//!         // monitor home
//!     }
//! })?;
//!
//! let home = GeofenceRegion::new("home", Coordinate::new(42.36, -71.06), 150.0)?;
//! manager.set_geofence(Some(home))?;
//! ```

#![warn(missing_docs)]

mod authority;
mod error;
mod events;
mod manager;
mod region;

/// Location authority backends.
pub mod sys;

pub use authority::{AuthorityDelegate, LocationAuthority};
pub use error::{GeofenceError, GeofenceResult, MonitoringError};
pub use events::GeofenceEvent;
pub use fencekit_permission::{
    AuthorizationSource, AuthorizationState, AuthorizationStatus, PermissionError,
    PermissionResult,
};
pub use manager::{BoundaryCrossedHandler, GeofenceManager, MonitoringErrorHandler};
pub use region::{Coordinate, GeofenceRegion};
