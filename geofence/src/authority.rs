use std::sync::Arc;

use fencekit_permission::{AuthorizationSource, AuthorizationStatus};

use crate::{GeofenceRegion, GeofenceResult};

/// Platform location service that performs region monitoring.
///
/// Implementations wrap the OS service. They report status through
/// [`AuthorizationSource`] and deliver callbacks to the registered
/// [`AuthorityDelegate`].
pub trait LocationAuthority: AuthorizationSource + Send + Sync {
    /// Begins monitoring `region`.
    ///
    /// # Errors
    ///
    /// Returns an error if the service rejects the region outright. Failures
    /// reported later arrive through [`AuthorityDelegate::on_monitoring_failed`].
    fn start_monitoring(&self, region: &GeofenceRegion) -> GeofenceResult<()>;

    /// Stops monitoring `region`.
    fn stop_monitoring(&self, region: &GeofenceRegion);

    /// Regions currently monitored by this app.
    ///
    /// # Errors
    ///
    /// Returns an error if the regions cannot be read back from the platform.
    fn monitored_regions(&self) -> GeofenceResult<Vec<GeofenceRegion>>;

    /// Registers the receiver of authority callbacks, replacing any previous one.
    fn set_delegate(&self, delegate: Arc<dyn AuthorityDelegate>);
}

/// Callbacks invoked by a [`LocationAuthority`].
///
/// Each returns an error when the authority reports something outside the
/// known contract, so the caller can surface it.
pub trait AuthorityDelegate: Send + Sync {
    /// The app's authorization status changed.
    ///
    /// # Errors
    ///
    /// Returns an error for a status the receiver cannot interpret.
    fn on_authorization_changed(&self, status: AuthorizationStatus) -> GeofenceResult<()>;

    /// The device entered `region`.
    ///
    /// # Errors
    ///
    /// Implementations may reject events for unknown regions.
    fn on_region_entered(&self, region: &GeofenceRegion) -> GeofenceResult<()>;

    /// The device left `region`.
    ///
    /// # Errors
    ///
    /// Implementations may reject events for unknown regions.
    fn on_region_exited(&self, region: &GeofenceRegion) -> GeofenceResult<()>;

    /// Monitoring `region` failed with a raw platform error code.
    ///
    /// # Errors
    ///
    /// Returns an error if `code` is not a known monitoring error.
    fn on_monitoring_failed(&self, region: Option<&GeofenceRegion>, code: i64)
    -> GeofenceResult<()>;
}
