//! macOS smoke binary for fencekit-geofence.
//!
//! Run with: cargo run -p fencekit-geofence-test --features apple
//!
//! Without the `apple` feature the same walkthrough runs against a scripted
//! manual authority.

use std::sync::Arc;

use fencekit_geofence::{Coordinate, GeofenceEvent, GeofenceManager, GeofenceRegion};
use fencekit_permission::AuthorizationState;

#[tokio::main]
async fn main() {
    println!("=== Fencekit Geofence Test ===\n");

    let (authority, script) = authority();
    let (manager, events) = GeofenceManager::with_events(
        authority,
        |entered| println!("Boundary crossed (entered: {entered})"),
        |error| println!("Monitoring error: {error}"),
    );

    match manager.authorization_state() {
        Ok(state) => println!("Current authorization: {state:?}"),
        Err(e) => println!("Current authorization unreadable: {e}"),
    }
    match manager.geofence() {
        Ok(existing) => println!("Existing geofence: {existing:?}\n"),
        Err(e) => println!("Existing geofence unreadable: {e}\n"),
    }

    println!("Requesting location permission...");
    let pending = manager.request_permissions_async();
    script.answer_prompt();
    let state = match pending.await {
        Ok(state) => state,
        Err(e) => {
            println!("Permission request failed: {e}");
            return;
        }
    };
    println!("Permission state: {state:?}\n");

    if state != AuthorizationState::Available {
        println!("Region monitoring needs \"always\" access; stopping.");
        return;
    }

    let center = Coordinate::new(37.3349, -122.009);
    let region = match GeofenceRegion::new("fencekit-test", center, 200.0) {
        Ok(region) => region,
        Err(e) => {
            println!("Invalid region: {e}");
            return;
        }
    };

    match manager.set_geofence(Some(region)) {
        Ok(()) => println!("✓ Monitoring {:?}", manager.geofence().ok().flatten()),
        Err(e) => {
            println!("✗ Failed to start monitoring: {e}");
            return;
        }
    }

    script.cross_boundary();

    println!("\nWaiting for a region event...");
    loop {
        match events.recv().await {
            Ok(GeofenceEvent::Entered) => {
                println!("✓ Entered region");
                break;
            }
            Ok(event) => println!("Received {event:?}"),
            Err(e) => {
                println!("Event channel closed: {e}");
                break;
            }
        }
    }

    if let Err(e) = manager.set_geofence(None) {
        println!("✗ Failed to clear geofence: {e}");
    }
}

#[cfg(all(feature = "apple", target_os = "macos"))]
fn authority() -> (Arc<dyn fencekit_geofence::LocationAuthority>, Script) {
    let authority: Arc<dyn fencekit_geofence::LocationAuthority> =
        Arc::new(fencekit_geofence::sys::AppleLocationAuthority::new());
    (authority, Script)
}

#[cfg(all(feature = "apple", target_os = "macos"))]
struct Script;

#[cfg(all(feature = "apple", target_os = "macos"))]
impl Script {
    #[allow(clippy::unused_self)]
    fn answer_prompt(&self) {
        println!("Answer the system dialog to continue.");
    }

    #[allow(clippy::unused_self)]
    fn cross_boundary(&self) {
        println!("Move into the region (or simulate a location in Xcode).");
    }
}

#[cfg(not(all(feature = "apple", target_os = "macos")))]
fn authority() -> (Arc<dyn fencekit_geofence::LocationAuthority>, Script) {
    let manual = Arc::new(fencekit_geofence::sys::ManualAuthority::default());
    let authority: Arc<dyn fencekit_geofence::LocationAuthority> = manual.clone();
    (authority, Script(manual))
}

#[cfg(not(all(feature = "apple", target_os = "macos")))]
struct Script(Arc<fencekit_geofence::sys::ManualAuthority>);

#[cfg(not(all(feature = "apple", target_os = "macos")))]
impl Script {
    fn answer_prompt(&self) {
        println!("(scripted) granting always access");
        if let Err(e) = self
            .0
            .authorize(fencekit_permission::AuthorizationStatus::AuthorizedAlways)
        {
            println!("Authorization callback failed: {e}");
        }
    }

    fn cross_boundary(&self) {
        println!("(scripted) entering region");
        if let Err(e) = self.0.enter("fencekit-test") {
            println!("Region callback failed: {e}");
        }
    }
}
