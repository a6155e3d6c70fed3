//! Embeds build identification for the startup banner
//!
//! `GIT_HASH` prefers `NYVORO_SOURCE_REV` (container builds have no `.git`),
//! then `git rev-parse`, with a `-dirty` suffix for uncommitted changes.

use std::env;
use std::process::Command;

const UNKNOWN: &str = "unknown";

/// Trimmed stdout of a successful git invocation
fn git(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8(output.stdout).ok().map(|s| s.trim().to_string())
}

fn source_revision() -> String {
    if let Some(rev) = env::var("NYVORO_SOURCE_REV").ok().filter(|r| !r.trim().is_empty()) {
        return rev.trim().to_string();
    }

    match git(&["rev-parse", "--short=8", "HEAD"]) {
        Some(hash) => {
            let dirty = git(&["status", "--porcelain", "--untracked-files=no"])
                .is_some_and(|changes| !changes.is_empty());
            if dirty {
                format!("{}-dirty", hash)
            } else {
                hash
            }
        }
        None => UNKNOWN.to_string(),
    }
}

fn emit(key: &str, value: &str) {
    println!("cargo:rustc-env={}={}", key, value);
}

// No rerun-if directives: any package change reruns the script.
fn main() {
    emit("GIT_HASH", &source_revision());
    emit(
        "BUILD_TIMESTAMP",
        &chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    );
    emit("BUILD_PROFILE", &env::var("PROFILE").unwrap_or_else(|_| UNKNOWN.to_string()));
}
