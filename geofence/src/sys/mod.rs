//! Location authority backends.
//!
//! [`ManualAuthority`] is available everywhere. The CoreLocation backend is
//! compiled on iOS and macOS when the `apple` feature is enabled.

mod manual;

pub use manual::ManualAuthority;

#[cfg(all(feature = "apple", any(target_os = "ios", target_os = "macos")))]
mod apple;

#[cfg(all(feature = "apple", any(target_os = "ios", target_os = "macos")))]
pub use apple::AppleLocationAuthority;
