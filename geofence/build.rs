//! Build script for fencekit-geofence.
//!
//! Generates the Swift bridge for the Apple backend when the `apple` feature
//! is enabled on an Apple target.

use std::{env, path::PathBuf};

fn main() {
    let target_os = env::var("CARGO_CFG_TARGET_OS").unwrap_or_default();
    let apple_feature = env::var_os("CARGO_FEATURE_APPLE").is_some();

    if apple_feature && (target_os == "ios" || target_os == "macos") {
        build_apple();
    }
}

fn build_apple() {
    const BRIDGE: &str = "src/sys/apple/mod.rs";

    let out_dir = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR is set by cargo"));

    println!("cargo:rerun-if-changed={BRIDGE}");

    swift_bridge_build::parse_bridges(vec![BRIDGE])
        .write_all_concatenated(out_dir, env!("CARGO_PKG_NAME"));
}
