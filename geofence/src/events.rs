use async_channel::{Receiver, Sender, unbounded};
use fencekit_permission::AuthorizationState;
use log::warn;
use serde::{Deserialize, Serialize};

use crate::MonitoringError;

/// Events published on a manager's event channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeofenceEvent {
    /// The device entered the geofence.
    Entered,
    /// The device left the geofence.
    Exited,
    /// Region monitoring failed.
    MonitoringFailed {
        /// The reported failure.
        error: MonitoringError,
    },
    /// The user made an authorization decision.
    AuthorizationChanged {
        /// The resulting state.
        state: AuthorizationState,
    },
}

impl GeofenceEvent {
    /// Builds the event for a boundary crossing.
    #[must_use]
    pub const fn crossing(entered: bool) -> Self {
        if entered { Self::Entered } else { Self::Exited }
    }
}

#[derive(Debug)]
pub(crate) struct EventSink {
    sender: Sender<GeofenceEvent>,
}

impl EventSink {
    pub(crate) fn channel() -> (Self, Receiver<GeofenceEvent>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }

    pub(crate) fn publish(&self, event: GeofenceEvent) {
        if let Err(err) = self.sender.try_send(event) {
            warn!("dropping geofence event: {err}");
        }
    }
}
