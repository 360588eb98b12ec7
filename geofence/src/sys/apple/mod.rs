//! Apple platform (iOS/macOS) authority backed by `CoreLocation` via swift-bridge.
//!
//! The host app links a Swift `FencekitGeofenceManager` class that owns a
//! `CLLocationManager`, implements the `extern "Swift"` functions below, and
//! forwards its delegate callbacks to the `DelegateRelay` it was created with.
//! Regions cross the bridge as JSON.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use fencekit_permission::{AuthorizationSource, AuthorizationStatus, PermissionResult};
use log::error;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{AuthorityDelegate, GeofenceError, GeofenceRegion, GeofenceResult, LocationAuthority};

#[swift_bridge::bridge]
mod ffi {
    extern "Rust" {
        type DelegateRelay;

        fn authorization_changed(self: &DelegateRelay, status: i64);
        fn region_entered(self: &DelegateRelay, region_json: &str);
        fn region_exited(self: &DelegateRelay, region_json: &str);
        fn monitoring_failed(self: &DelegateRelay, region_json: &str, code: i64);
    }

    extern "Swift" {
        type FencekitGeofenceManager;

        #[swift_bridge(init)]
        fn new(relay: DelegateRelay) -> FencekitGeofenceManager;

        fn location_services_enabled(self: &FencekitGeofenceManager) -> bool;
        fn authorization_status(self: &FencekitGeofenceManager) -> i64;
        fn request_always_authorization(self: &FencekitGeofenceManager);
        fn start_monitoring(self: &FencekitGeofenceManager, region_json: String);
        fn stop_monitoring(self: &FencekitGeofenceManager, identifier: String);
        fn monitored_regions(self: &FencekitGeofenceManager) -> String;
    }
}

type SharedDelegate = Arc<Mutex<Option<Arc<dyn AuthorityDelegate>>>>;

/// Authority backed by the Apple `CoreLocation` stack.
pub struct AppleLocationAuthority {
    manager: Mutex<ffi::FencekitGeofenceManager>,
    delegate: SharedDelegate,
}

// Safety: the Swift manager is only touched through the Mutex, and the Swift
// side confines `CLLocationManager` to the thread it was created on.
#[allow(clippy::non_send_fields_in_send_ty)]
unsafe impl Send for AppleLocationAuthority {}
unsafe impl Sync for AppleLocationAuthority {}

impl fmt::Debug for AppleLocationAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppleLocationAuthority").finish()
    }
}

impl Default for AppleLocationAuthority {
    fn default() -> Self {
        Self::new()
    }
}

impl AppleLocationAuthority {
    /// Creates the Swift-side manager. Callbacks arriving before a delegate
    /// is registered are dropped.
    #[must_use]
    pub fn new() -> Self {
        let delegate = SharedDelegate::default();
        let relay = DelegateRelay {
            delegate: delegate.clone(),
        };
        Self {
            manager: Mutex::new(ffi::FencekitGeofenceManager::new(relay)),
            delegate,
        }
    }

    fn with_manager<T>(&self, action: impl FnOnce(&ffi::FencekitGeofenceManager) -> T) -> T {
        let guard = self.manager.lock().unwrap_or_else(PoisonError::into_inner);
        action(&guard)
    }
}

impl AuthorizationSource for AppleLocationAuthority {
    fn is_service_enabled(&self) -> bool {
        self.with_manager(ffi::FencekitGeofenceManager::location_services_enabled)
    }

    fn authorization_status(&self) -> PermissionResult<AuthorizationStatus> {
        let code = self.with_manager(ffi::FencekitGeofenceManager::authorization_status);
        AuthorizationStatus::try_from(code).inspect_err(|err| error!("{err}"))
    }

    fn request_always_authorization(&self) {
        self.with_manager(ffi::FencekitGeofenceManager::request_always_authorization);
    }
}

impl LocationAuthority for AppleLocationAuthority {
    fn start_monitoring(&self, region: &GeofenceRegion) -> GeofenceResult<()> {
        let json = to_json(region)?;
        self.with_manager(|manager| manager.start_monitoring(json));
        Ok(())
    }

    fn stop_monitoring(&self, region: &GeofenceRegion) {
        let identifier = region.identifier().to_owned();
        self.with_manager(|manager| manager.stop_monitoring(identifier));
    }

    fn monitored_regions(&self) -> GeofenceResult<Vec<GeofenceRegion>> {
        let json = self.with_manager(ffi::FencekitGeofenceManager::monitored_regions);
        from_json(&json).inspect_err(|err| error!("failed to read monitored regions: {err}"))
    }

    fn set_delegate(&self, delegate: Arc<dyn AuthorityDelegate>) {
        let mut guard = self.delegate.lock().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(delegate);
    }
}

struct DelegateRelay {
    delegate: SharedDelegate,
}

impl DelegateRelay {
    fn dispatch(&self, action: impl FnOnce(&dyn AuthorityDelegate) -> GeofenceResult<()>) {
        let delegate = self
            .delegate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let Some(delegate) = delegate else {
            error!("dropping location callback: {}", GeofenceError::DelegateMissing);
            return;
        };

        if let Err(err) = action(delegate.as_ref()) {
            error!("location callback failed: {err}");
        }
    }

    fn authorization_changed(&self, status: i64) {
        self.dispatch(|delegate| {
            let status = AuthorizationStatus::try_from(status)?;
            delegate.on_authorization_changed(status)
        });
    }

    fn region_entered(&self, region_json: &str) {
        self.dispatch(|delegate| delegate.on_region_entered(&from_json(region_json)?));
    }

    fn region_exited(&self, region_json: &str) {
        self.dispatch(|delegate| delegate.on_region_exited(&from_json(region_json)?));
    }

    fn monitoring_failed(&self, region_json: &str, code: i64) {
        self.dispatch(|delegate| {
            let region: Option<GeofenceRegion> = if region_json.is_empty() {
                None
            } else {
                Some(from_json(region_json)?)
            };
            delegate.on_monitoring_failed(region.as_ref(), code)
        });
    }
}

impl fmt::Debug for DelegateRelay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateRelay").finish()
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> GeofenceResult<String> {
    Ok(serde_json::to_string(value)?)
}

fn from_json<T: DeserializeOwned>(value: &str) -> GeofenceResult<T> {
    Ok(serde_json::from_str(value)?)
}
