//! Embeds the git commit into the binary for the health endpoint.
//!
//! `SQLROUTER_GIT_SHORT_OVERRIDE` wins over git, for builds without a
//! `.git` directory. Falls back to `"unknown"`.

use std::process::Command;

fn git_short() -> String {
    std::env::var("SQLROUTER_GIT_SHORT_OVERRIDE")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| {
            Command::new("git")
                .args(["rev-parse", "--short", "HEAD"])
                .output()
                .ok()
                .filter(|o| o.status.success())
                .and_then(|o| String::from_utf8(o.stdout).ok())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "unknown".into())
        })
}

fn main() {
    println!("cargo:rerun-if-changed=.git/HEAD");
    println!("cargo:rerun-if-changed=.git/refs");
    println!("cargo:rerun-if-env-changed=SQLROUTER_GIT_SHORT_OVERRIDE");

    println!("cargo:rustc-env=SQLROUTER_GIT_SHORT={}", git_short());
}
