//! # Fencekit
//!
//! Monitor one circular geofence through the platform location service and
//! get told when the device crosses its boundary.
//!
//! ## Features
//!
//! - `permission`: authorization states and the coalescing permission request coordinator.
//! - `geofence` (default): the geofence manager, authority traits and the manual authority.
//! - `apple`: the `CoreLocation` authority for iOS and macOS, bridged through swift-bridge.
//!
//! Use the `full` feature to enable everything.
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! fencekit = { version = "0.1", features = ["apple"] }
//! ```
//!
//! ```rust
//! # #[cfg(feature = "geofence")]
//! # fn demo() -> Result<(), fencekit::geofence::GeofenceError> {
//! use std::sync::Arc;
//! use fencekit::geofence::sys::ManualAuthority;
//! use fencekit::geofence::{Coordinate, GeofenceManager, GeofenceRegion};
//!
//! let authority = Arc::new(ManualAuthority::default());
//! let manager = GeofenceManager::new(
//!     authority,
//!     |entered| println!("entered: {entered}"),
//!     |error| eprintln!("monitoring failed: {error}"),
//! );
//!
//! let home = GeofenceRegion::new("home", Coordinate::new(42.36, -71.06), 150.0)?;
//! manager.set_geofence(Some(home))?;
//! # Ok(())
//! # }
//! ```

#[cfg(feature = "geofence")]
pub use fencekit_geofence as geofence;

#[cfg(feature = "permission")]
pub use fencekit_permission as permission;
