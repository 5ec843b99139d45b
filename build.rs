//! Build script for rolesim
//!
//! Embeds build-time information into the binary:
//! - Git commit hash and dirty flag
//! - Build timestamp
//! - Target triple and profile

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/index");
    println!("cargo:rerun-if-changed=config/catalog.toml");
    println!("cargo:rerun-if-changed=config/rubric.toml");

    let git_hash = git_output(&["rev-parse", "--short=8", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let git_dirty = match git_output(&["status", "--porcelain"]) {
        Some(out) if !out.is_empty() => "true",
        Some(_) => "false",
        None => "unknown",
    };

    let build_timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=ROLESIM_GIT_HASH={}", git_hash);
    println!("cargo:rustc-env=ROLESIM_GIT_DIRTY={}", git_dirty);
    println!("cargo:rustc-env=ROLESIM_BUILD_TIMESTAMP={}", build_timestamp);
    println!("cargo:rustc-env=ROLESIM_TARGET={}", target);
    println!("cargo:rustc-env=ROLESIM_PROFILE={}", profile);
}

/// Run a git command and return its trimmed stdout, if it succeeded
fn git_output(args: &[&str]) -> Option<String> {
    Command::new("git")
        .args(args)
        .output()
        .ok()
        .filter(|output| output.status.success())
        .and_then(|output| String::from_utf8(output.stdout).ok())
        .map(|s| s.trim().to_string())
}
