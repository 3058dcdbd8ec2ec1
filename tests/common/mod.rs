//! Common test utilities for vogue integration tests.
//!
//! Provides `TestEnv` for isolated test environments that never read the
//! user's `~/.config/vogue/config.kdl`.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
use std::path::Path;
pub use tempfile::TempDir;

/// A test environment with an isolated project and config directory.
///
/// The `vg()` method returns a `Command` that sets `VOGUE_CONFIG_DIR`
/// per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub project_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    /// Create a new test environment with isolated directories.
    pub fn new() -> Self {
        Self {
            project_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and initialize a project in it.
    pub fn init() -> Self {
        let env = Self::new();
        env.vg().args(["project", "init", "show"]).assert().success();
        env
    }

    /// Get a Command for the vg binary running in the project directory.
    pub fn vg(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_vg"));
        cmd.current_dir(self.project_dir.path());
        cmd.env("VOGUE_CONFIG_DIR", self.config_dir.path());
        cmd.env("VOGUE_USER", "tester");
        cmd.env_remove("VOGUE_PROJECT");
        cmd.env_remove("VOGUE_LOG");
        cmd.env_remove("VOGUE_LOG_FORMAT");
        cmd
    }

    /// Run `vg <args>`, assert success and parse stdout as JSON.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.vg().args(args).assert().success().get_output().stdout.clone();
        serde_json::from_slice(&output).unwrap_or_else(|e| {
            panic!(
                "vg {:?} printed invalid JSON ({}): {}",
                args,
                e,
                String::from_utf8_lossy(&output)
            )
        })
    }

    /// Run `vg <args>` and return the `id` field of its JSON output.
    pub fn create(&self, args: &[&str]) -> String {
        self.json(args)["id"].as_str().unwrap().to_string()
    }

    /// Get the path to the project directory.
    pub fn path(&self) -> &Path {
        self.project_dir.path()
    }

    /// Get the path to the config directory.
    pub fn config_path(&self) -> &Path {
        self.config_dir.path()
    }

    /// Write a file relative to the project root, creating parents.
    pub fn write_file(&self, rel: &str, contents: &[u8]) {
        let path = self.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
