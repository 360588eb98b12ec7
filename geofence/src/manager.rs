use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use async_channel::Receiver;
use fencekit_permission::{
    AuthorizationState, AuthorizationStatus, PermissionRequestCoordinator, PermissionResult,
    current_state,
};
use log::{debug, error, info, warn};

use crate::events::EventSink;
use crate::{
    AuthorityDelegate, GeofenceEvent, GeofenceRegion, GeofenceResult, LocationAuthority,
    MonitoringError,
};

/// Called with `true` when the device enters the geofence and `false` when it leaves.
pub type BoundaryCrossedHandler = Box<dyn Fn(bool) + Send + Sync>;

/// Called once for every region monitoring failure.
pub type MonitoringErrorHandler = Box<dyn Fn(MonitoringError) + Send + Sync>;

/// Manages a single geofence region on top of a [`LocationAuthority`].
///
/// To keep receiving region events after the app was terminated, create the
/// manager early during app launch so the authority has a delegate before
/// the OS replays pending events.
pub struct GeofenceManager {
    authority: Arc<dyn LocationAuthority>,
    permissions: PermissionRequestCoordinator,
    boundary_crossed: BoundaryCrossedHandler,
    monitoring_error: MonitoringErrorHandler,
    events: Option<EventSink>,
    region_lock: Mutex<()>,
}

impl fmt::Debug for GeofenceManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeofenceManager")
            .field("permissions", &self.permissions)
            .field("events", &self.events.is_some())
            .finish_non_exhaustive()
    }
}

impl GeofenceManager {
    /// Creates a manager and registers it as the authority's delegate.
    ///
    /// `on_boundary_crossed` runs whenever the device enters or exits the
    /// geofence; `on_error` runs whenever region monitoring fails.
    pub fn new<B, E>(
        authority: Arc<dyn LocationAuthority>,
        on_boundary_crossed: B,
        on_error: E,
    ) -> Arc<Self>
    where
        B: Fn(bool) + Send + Sync + 'static,
        E: Fn(MonitoringError) + Send + Sync + 'static,
    {
        Self::build(
            authority,
            Box::new(on_boundary_crossed),
            Box::new(on_error),
            None,
        )
    }

    /// Like [`new`](Self::new), additionally publishing every event on a channel.
    pub fn with_events<B, E>(
        authority: Arc<dyn LocationAuthority>,
        on_boundary_crossed: B,
        on_error: E,
    ) -> (Arc<Self>, Receiver<GeofenceEvent>)
    where
        B: Fn(bool) + Send + Sync + 'static,
        E: Fn(MonitoringError) + Send + Sync + 'static,
    {
        let (sink, receiver) = EventSink::channel();
        let manager = Self::build(
            authority,
            Box::new(on_boundary_crossed),
            Box::new(on_error),
            Some(sink),
        );
        (manager, receiver)
    }

    fn build(
        authority: Arc<dyn LocationAuthority>,
        boundary_crossed: BoundaryCrossedHandler,
        monitoring_error: MonitoringErrorHandler,
        events: Option<EventSink>,
    ) -> Arc<Self> {
        let manager = Arc::new(Self {
            authority,
            permissions: PermissionRequestCoordinator::new(),
            boundary_crossed,
            monitoring_error,
            events,
            region_lock: Mutex::new(()),
        });

        let relay = Arc::new(DelegateRelay {
            manager: Arc::downgrade(&manager),
        });
        manager.authority.set_delegate(relay);

        match manager.geofence() {
            Ok(existing) => {
                info!("geofence manager initializing with existing geofence: {existing:?}");
            }
            Err(err) => {
                warn!("geofence manager initializing without monitored regions: {err}");
            }
        }
        manager
    }

    /// Current state of location services for this app, without prompting.
    ///
    /// # Errors
    ///
    /// Returns [`GeofenceError::Permission`](crate::GeofenceError::Permission)
    /// if the authority reports a status code it does not know.
    pub fn authorization_state(&self) -> GeofenceResult<AuthorizationState> {
        Ok(current_state(&*self.authority)?)
    }

    /// Requests location permission if needed, then calls `completion` with the outcome.
    ///
    /// See [`PermissionRequestCoordinator::request`].
    ///
    /// # Errors
    ///
    /// Returns [`GeofenceError::Permission`](crate::GeofenceError::Permission)
    /// if the authority reports a status code it does not know. `completion`
    /// is dropped without being called in that case.
    pub fn request_permissions<F>(&self, completion: F) -> GeofenceResult<()>
    where
        F: FnOnce(AuthorizationState) + Send + 'static,
    {
        Ok(self.permissions.request(&*self.authority, completion)?)
    }

    /// Requests location permission if needed and waits for the outcome.
    ///
    /// # Errors
    ///
    /// Fails if the authority reports an unknown status code, or if the
    /// manager is dropped before a decision arrives.
    pub fn request_permissions_async(
        &self,
    ) -> impl Future<Output = PermissionResult<AuthorizationState>> + Send + use<> {
        self.permissions.request_async(&*self.authority)
    }

    /// The monitored geofence, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the authority cannot list its monitored regions.
    pub fn geofence(&self) -> GeofenceResult<Option<GeofenceRegion>> {
        Ok(self.authority.monitored_regions()?.into_iter().next())
    }

    /// Replaces the monitored geofence.
    ///
    /// Every region the authority currently monitors is removed before
    /// `region` is added, so two geofences never overlap. Passing `None`
    /// only removes.
    ///
    /// # Errors
    ///
    /// Returns an error if `region` is invalid or the authority cannot list
    /// its monitored regions (both checked before anything is removed or
    /// added), or if the authority refuses to monitor `region`.
    pub fn set_geofence(&self, region: Option<GeofenceRegion>) -> GeofenceResult<()> {
        if let Some(region) = &region {
            region.validate()?;
        }

        let _guard = self
            .region_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let monitored = self.authority.monitored_regions()?;
        for existing in monitored {
            debug!("stopping geofence {}", existing.identifier());
            self.authority.stop_monitoring(&existing);
        }

        match region {
            Some(region) => {
                info!(
                    "monitoring geofence {} ({} m)",
                    region.identifier(),
                    region.radius()
                );
                self.authority.start_monitoring(&region)
            }
            None => {
                info!("geofence cleared");
                Ok(())
            }
        }
    }

    /// Forwards a boundary crossing to the handler.
    pub fn on_boundary_crossed(&self, entered: bool) {
        (self.boundary_crossed)(entered);
        self.publish(GeofenceEvent::crossing(entered));
    }

    /// Forwards a monitoring failure with a raw platform code to the error handler.
    ///
    /// # Errors
    ///
    /// Returns [`GeofenceError::UnexpectedStatus`](crate::GeofenceError::UnexpectedStatus)
    /// without calling the handler when `code` is not a known monitoring error.
    pub fn on_monitoring_failed(&self, code: i64) -> GeofenceResult<()> {
        let failure = MonitoringError::try_from(code).inspect_err(|err| {
            error!("{err}");
        })?;

        warn!("{failure}");
        (self.monitoring_error)(failure);
        self.publish(GeofenceEvent::MonitoringFailed { error: failure });
        Ok(())
    }

    fn publish(&self, event: GeofenceEvent) {
        if let Some(events) = &self.events {
            events.publish(event);
        }
    }
}

impl AuthorityDelegate for GeofenceManager {
    fn on_authorization_changed(&self, status: AuthorizationStatus) -> GeofenceResult<()> {
        self.permissions.on_authorization_changed(status)?;
        if status != AuthorizationStatus::NotDetermined {
            self.publish(GeofenceEvent::AuthorizationChanged {
                state: status.to_state(),
            });
        }
        Ok(())
    }

    fn on_region_entered(&self, _region: &GeofenceRegion) -> GeofenceResult<()> {
        self.on_boundary_crossed(true);
        Ok(())
    }

    fn on_region_exited(&self, _region: &GeofenceRegion) -> GeofenceResult<()> {
        self.on_boundary_crossed(false);
        Ok(())
    }

    fn on_monitoring_failed(
        &self,
        _region: Option<&GeofenceRegion>,
        code: i64,
    ) -> GeofenceResult<()> {
        Self::on_monitoring_failed(self, code)
    }
}

/// Registered with the authority in place of the manager itself, so the
/// authority does not keep the manager alive.
struct DelegateRelay {
    manager: Weak<GeofenceManager>,
}

impl DelegateRelay {
    fn with_manager<F>(&self, action: F) -> GeofenceResult<()>
    where
        F: FnOnce(&GeofenceManager) -> GeofenceResult<()>,
    {
        self.manager.upgrade().map_or_else(
            || {
                debug!("geofence manager dropped, ignoring callback");
                Ok(())
            },
            |manager| action(&*manager),
        )
    }
}

impl AuthorityDelegate for DelegateRelay {
    fn on_authorization_changed(&self, status: AuthorizationStatus) -> GeofenceResult<()> {
        self.with_manager(|manager| manager.on_authorization_changed(status))
    }

    fn on_region_entered(&self, region: &GeofenceRegion) -> GeofenceResult<()> {
        self.with_manager(|manager| manager.on_region_entered(region))
    }

    fn on_region_exited(&self, region: &GeofenceRegion) -> GeofenceResult<()> {
        self.with_manager(|manager| manager.on_region_exited(region))
    }

    fn on_monitoring_failed(
        &self,
        _region: Option<&GeofenceRegion>,
        code: i64,
    ) -> GeofenceResult<()> {
        self.with_manager(|manager| manager.on_monitoring_failed(code))
    }
}
