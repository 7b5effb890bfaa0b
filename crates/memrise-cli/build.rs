// Stamps `memrise --version` with the commit it was built from.

use std::process::Command;

fn git_output(args: &[&str]) -> Option<String> {
    let output = Command::new("git").args(args).output().ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
}

fn has_uncommitted_changes() -> bool {
    Command::new("git")
        .args(["diff", "--quiet", "HEAD"])
        .status()
        .is_ok_and(|status| !status.success())
}

fn main() {
    let commit = git_output(&["rev-parse", "--short", "HEAD"]).unwrap_or_else(|| "unknown".to_string());
    let stamp = if has_uncommitted_changes() {
        let built_at = chrono::Local::now().format("%Y%m%d-%H%M%S");
        format!("{commit}-dirty-{built_at}")
    } else {
        commit
    };
    println!("cargo:rustc-env=BUILD_HASH={stamp}");

    for watched in ["HEAD", "index"] {
        println!("cargo:rerun-if-changed=../../.git/{watched}");
    }
}
