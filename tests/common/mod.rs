//! Shared integration-test infrastructure: spawn the `dup` binary and build
//! throwaway directory trees with controlled content.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

pub struct CmdResult {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CmdResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }
}

fn resolve_bin_path() -> PathBuf {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_dup") {
        let p = PathBuf::from(path);
        if p.exists() {
            return p;
        }
    }

    let exe_name = if cfg!(windows) { "dup.exe" } else { "dup" };
    let fallback = std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(PathBuf::from))
        .and_then(|deps| deps.parent().map(PathBuf::from))
        .map(|debug_dir| debug_dir.join(exe_name));

    match fallback {
        Some(path) if path.exists() => path,
        _ => panic!(
            "unable to resolve dup binary path for integration test (checked CARGO_BIN_EXE_dup and debug sibling path)"
        ),
    }
}

/// Run the `dup` binary with `args`, capturing stdout/stderr.
pub fn run_dup(args: &[&str]) -> CmdResult {
    let bin_path = resolve_bin_path();
    let output = Command::new(&bin_path)
        .args(args)
        .env("RUST_BACKTRACE", "1")
        .output()
        .expect("execute dup command");

    CmdResult {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

/// Builder for throwaway directory trees used by comparator/grouper tests.
pub struct TestTree {
    root: tempfile::TempDir,
}

impl TestTree {
    pub fn new() -> Self {
        Self {
            root: tempfile::tempdir().expect("create test tempdir"),
        }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Create a file with the given content at `rel_path`, creating parent
    /// directories as needed. Returns the full path.
    pub fn file(&self, rel_path: &str, content: &[u8]) -> PathBuf {
        let path = self.root.path().join(rel_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dirs");
        }
        std::fs::write(&path, content).expect("write test file");
        path
    }

    /// Create an empty directory at `rel_path`. Returns the full path.
    pub fn dir(&self, rel_path: &str) -> PathBuf {
        let path = self.root.path().join(rel_path);
        std::fs::create_dir_all(&path).expect("create test dir");
        path
    }
}

impl Default for TestTree {
    fn default() -> Self {
        Self::new()
    }
}
