use std::process::Command;

/// Nightly builds are tagged when `NOMOS_NIGHTLY` is `1` or `true`
fn nightly_requested() -> bool {
    std::env::var("NOMOS_NIGHTLY")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

/// Short commit hash from git, or `GIT_SHA` when building outside a checkout
fn commit_hash() -> Option<String> {
    let from_git = Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
        .ok()
        .filter(|out| out.status.success())
        .map(|out| String::from_utf8_lossy(&out.stdout).trim().to_string());

    from_git
        .or_else(|| std::env::var("GIT_SHA").ok())
        .filter(|sha| !sha.is_empty())
}

fn app_version(base: &str) -> String {
    if !nightly_requested() {
        return base.to_string();
    }
    match commit_hash() {
        Some(sha) => format!("{}-nightly+{}", base, sha),
        None => format!("{}-nightly", base),
    }
}

fn main() {
    let version = app_version(env!("CARGO_PKG_VERSION"));
    println!("cargo:rustc-env=APP_VERSION={}", version);

    for var in ["NOMOS_NIGHTLY", "GIT_SHA"] {
        println!("cargo:rerun-if-env-changed={}", var);
    }
    println!("cargo:rerun-if-changed=.git/HEAD");
}
