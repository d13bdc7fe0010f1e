//! Build script for HealthEnforcer
//!
//! Bumps a persistent build counter and embeds build metadata as env vars.

use std::fs;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=src");

    let counter_path = Path::new("build_number.txt");

    let previous: u64 = fs::read_to_string(counter_path)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(0);
    let build_number = previous + 1;

    fs::write(counter_path, build_number.to_string())
        .expect("Failed to write build number file");

    let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string();
    let profile = std::env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=HEALTHENFORCER_BUILD_NUMBER={}", build_number);
    println!("cargo:rustc-env=HEALTHENFORCER_BUILD_TIMESTAMP={}", timestamp);
    println!("cargo:rustc-env=HEALTHENFORCER_BUILD_PROFILE={}", profile);

    println!(
        "cargo:warning=HealthEnforcer build #{} ({}) at {}",
        build_number, profile, timestamp
    );
}
