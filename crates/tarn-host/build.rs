//! Build script for tarn-host.
//!
//! Records target, profile, compiler identity and git hash so the host can
//! expose them to scripts as `require('tarn').build`.

use std::path::Path;
use std::process::Command;

/// First line of a tool's stdout, if it ran and succeeded.
fn tool_output(program: &str, args: &[&str]) -> Option<String> {
    let out = Command::new(program).args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&out.stdout);
    text.lines().next().map(|l| l.trim().to_string())
}

fn main() {
    let head = Path::new("../../.git/HEAD");
    if head.exists() {
        println!("cargo::rerun-if-changed={}", head.display());
    }

    let git_hash = tool_output("git", &["rev-parse", "--short", "HEAD"])
        .unwrap_or_else(|| "unknown".to_string());

    let rustc = std::env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string());
    let compiler =
        tool_output(&rustc, &["--version"]).unwrap_or_else(|| "rustc (unknown)".to_string());

    let target = std::env::var("TARGET").unwrap_or_default();
    let profile = std::env::var("PROFILE").unwrap_or_default();
    let opt_level = std::env::var("OPT_LEVEL").unwrap_or_default();
    // Encoded flags are separated by 0x1f
    let flags = std::env::var("CARGO_ENCODED_RUSTFLAGS")
        .unwrap_or_default()
        .replace('\u{1f}', " ");

    let build_date = chrono::Utc::now().format("%Y-%m-%d").to_string();

    println!("cargo:rustc-env=TARN_GIT_HASH={git_hash}");
    println!("cargo:rustc-env=TARN_BUILD_DATE={build_date}");
    println!("cargo:rustc-env=TARN_BUILD_TARGET={target}");
    println!("cargo:rustc-env=TARN_BUILD_OPTIONS=profile={profile} opt-level={opt_level}");
    println!("cargo:rustc-env=TARN_COMPILER={compiler}");
    println!("cargo:rustc-env=TARN_RUSTFLAGS={flags}");
}
