use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fencekit_permission::{AuthorizationSource, AuthorizationStatus, PermissionResult};
use log::debug;

use crate::{AuthorityDelegate, GeofenceError, GeofenceRegion, GeofenceResult, LocationAuthority};

/// A location authority driven by the host application.
///
/// It keeps the same bookkeeping as an OS service (service switch,
/// authorization status, monitored regions) but never senses anything:
/// the host decides when the user answers the prompt or when the device
/// crosses a boundary, and the authority relays that to its delegate.
/// Useful on platforms without OS region monitoring and in tests.
pub struct ManualAuthority {
    service_enabled: AtomicBool,
    status: Mutex<AuthorizationStatus>,
    prompts: AtomicUsize,
    regions: Mutex<Vec<GeofenceRegion>>,
    delegate: Mutex<Option<Arc<dyn AuthorityDelegate>>>,
}

impl Default for ManualAuthority {
    fn default() -> Self {
        Self::new(AuthorizationStatus::NotDetermined)
    }
}

impl fmt::Debug for ManualAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualAuthority")
            .field("service_enabled", &self.is_service_enabled())
            .field("status", &*lock(&self.status))
            .field("prompts", &self.prompt_count())
            .field("regions", &*lock(&self.regions))
            .finish_non_exhaustive()
    }
}

impl ManualAuthority {
    /// Creates an authority with location services enabled and the given status.
    #[must_use]
    pub fn new(status: AuthorizationStatus) -> Self {
        Self {
            service_enabled: AtomicBool::new(true),
            status: Mutex::new(status),
            prompts: AtomicUsize::new(0),
            regions: Mutex::new(Vec::new()),
            delegate: Mutex::new(None),
        }
    }

    /// Turns location services on or off device-wide.
    pub fn set_service_enabled(&self, enabled: bool) {
        self.service_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Changes the status without notifying the delegate.
    pub fn set_status(&self, status: AuthorizationStatus) {
        *lock(&self.status) = status;
    }

    /// Number of times the permission prompt was shown.
    #[must_use]
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }

    /// Records the user's answer and notifies the delegate.
    ///
    /// # Errors
    ///
    /// Returns [`GeofenceError::DelegateMissing`] if no delegate is registered,
    /// or whatever the delegate returns.
    pub fn authorize(&self, status: AuthorizationStatus) -> GeofenceResult<()> {
        self.set_status(status);
        self.delegate()?.on_authorization_changed(status)
    }

    /// Reports that the device entered the monitored region `identifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is not monitored, no delegate is
    /// registered, or the delegate rejects the event.
    pub fn enter(&self, identifier: &str) -> GeofenceResult<()> {
        let region = self.monitored(identifier)?;
        self.delegate()?.on_region_entered(&region)
    }

    /// Reports that the device left the monitored region `identifier`.
    ///
    /// # Errors
    ///
    /// Returns an error if the region is not monitored, no delegate is
    /// registered, or the delegate rejects the event.
    pub fn exit(&self, identifier: &str) -> GeofenceResult<()> {
        let region = self.monitored(identifier)?;
        self.delegate()?.on_region_exited(&region)
    }

    /// Reports a monitoring failure with a raw platform error code.
    ///
    /// # Errors
    ///
    /// Returns [`GeofenceError::DelegateMissing`] if no delegate is registered,
    /// or whatever the delegate returns for `code`.
    pub fn fail(&self, identifier: Option<&str>, code: i64) -> GeofenceResult<()> {
        let region = identifier.map(|id| self.monitored(id)).transpose()?;
        self.delegate()?.on_monitoring_failed(region.as_ref(), code)
    }

    fn monitored(&self, identifier: &str) -> GeofenceResult<GeofenceRegion> {
        lock(&self.regions)
            .iter()
            .find(|region| region.identifier() == identifier)
            .cloned()
            .ok_or_else(|| GeofenceError::Backend {
                message: format!("region {identifier} is not monitored"),
            })
    }

    // Cloned out so callbacks run without holding the lock.
    fn delegate(&self) -> GeofenceResult<Arc<dyn AuthorityDelegate>> {
        lock(&self.delegate)
            .clone()
            .ok_or(GeofenceError::DelegateMissing)
    }
}

impl AuthorizationSource for ManualAuthority {
    fn is_service_enabled(&self) -> bool {
        self.service_enabled.load(Ordering::SeqCst)
    }

    fn authorization_status(&self) -> PermissionResult<AuthorizationStatus> {
        Ok(*lock(&self.status))
    }

    fn request_always_authorization(&self) {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        debug!("authorization prompt shown");
    }
}

impl LocationAuthority for ManualAuthority {
    fn start_monitoring(&self, region: &GeofenceRegion) -> GeofenceResult<()> {
        let mut regions = lock(&self.regions);
        regions.retain(|existing| existing.identifier() != region.identifier());
        regions.push(region.clone());
        Ok(())
    }

    fn stop_monitoring(&self, region: &GeofenceRegion) {
        lock(&self.regions).retain(|existing| existing.identifier() != region.identifier());
    }

    fn monitored_regions(&self) -> GeofenceResult<Vec<GeofenceRegion>> {
        Ok(lock(&self.regions).clone())
    }

    fn set_delegate(&self, delegate: Arc<dyn AuthorityDelegate>) {
        *lock(&self.delegate) = Some(delegate);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
