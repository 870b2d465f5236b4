// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Allow unused items: test helpers are shared across multiple test binaries,
// and not every test file uses every helper.
#![allow(dead_code)]
#![allow(unused_imports)]

use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// Port 9 (discard) is closed on loopback, so every probe fails fast.
pub const UNREACHABLE: &str = "http://127.0.0.1:9/";

pub fn outpost() -> Command {
    cargo_bin_cmd!("outpost")
}

/// A temp directory holding an `outpost.toml` whose network is unreachable
/// and whose store lives next to it.
pub fn offline_env() -> TempDir {
    let temp = TempDir::new().unwrap();
    let store = temp.path().join("data").join("outpost.db");
    let config = format!(
        r#"log_file = "{log}"

[network]
base_url = "{UNREACHABLE}"
probe_url = "{UNREACHABLE}"
probe_timeout_ms = 500
request_timeout_secs = 2

[storage]
path = "{store}"
"#,
        log = temp.path().join("outpost.log").display(),
        store = store.display(),
    );
    std::fs::write(config_path(&temp), config).unwrap();
    temp
}

pub fn config_path(temp: &TempDir) -> PathBuf {
    temp.path().join("outpost.toml")
}

/// `outpost --config <temp>/outpost.toml`, run inside the temp directory.
pub fn outpost_in(temp: &TempDir) -> Command {
    let mut cmd = outpost();
    cmd.arg("--config")
        .arg(config_path(temp))
        .current_dir(temp.path());
    cmd
}

/// Queue a POST through the offline layer.
pub fn queue_post(temp: &TempDir, path: &str, body: &str) {
    outpost_in(temp)
        .args(["fetch", "POST", path, "-d", body])
        .assert()
        .success()
        .stdout(predicate::str::contains("Offline. Request queued."));
}
