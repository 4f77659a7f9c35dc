//! Test helpers for integration tests

use anyhow::{Context, Result};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const LINUX_GNU: &str = "x86_64-unknown-linux-gnu";
pub const DARWIN_ARM: &str = "aarch64-apple-darwin";
pub const WIN_MSVC: &str = "x86_64-pc-windows-msvc";

/// A throwaway addon project: package.json with a `napi` section
pub struct TestProject {
  _root: TempDir,
  pub path: PathBuf,
}

impl TestProject {
  /// Project named `@giegie/explore` at 1.0.0 targeting `targets`
  pub fn new(targets: &[&str]) -> Result<Self> {
    Self::with_version(targets, "1.0.0")
  }

  pub fn with_version(targets: &[&str], version: &str) -> Result<Self> {
    let root = TempDir::new()?;
    let path = root.path().to_path_buf();

    let package_json = serde_json::json!({
      "name": "@giegie/explore",
      "version": version,
      "description": "Native bindings for explore",
      "license": "MIT",
      "repository": "https://github.com/giegie/explore",
      "main": "index.js",
      "napi": {
        "binaryName": "explore",
        "targets": targets,
      },
    });
    std::fs::write(path.join("package.json"), serde_json::to_string_pretty(&package_json)? + "\n")?;

    Ok(Self { _root: root, path })
  }

  /// Write addon.toml at the project root
  pub fn write_config(&self, content: &str) -> Result<()> {
    std::fs::write(self.path.join("addon.toml"), content)?;
    Ok(())
  }

  /// Drop a fake built binary where the collector looks for it
  pub fn add_artifact(&self, rel_path: &str, content: &[u8]) -> Result<PathBuf> {
    let path = self.path.join(rel_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, content)?;
    Ok(path)
  }

  pub fn npm_package(&self, suffix: &str) -> PathBuf {
    self.path.join("npm").join(suffix)
  }

  /// Parse a JSON file relative to the project root
  pub fn read_json(&self, rel_path: &str) -> Result<Value> {
    let content =
      std::fs::read_to_string(self.path.join(rel_path)).with_context(|| format!("Failed to read {}", rel_path))?;
    Ok(serde_json::from_str(&content)?)
  }

  pub fn read(&self, rel_path: &str) -> Result<String> {
    std::fs::read_to_string(self.path.join(rel_path)).with_context(|| format!("Failed to read {}", rel_path))
  }
}

/// Run `cargo addon <args>` in `dir`
pub fn run_cargo_addon(dir: &Path, args: &[&str]) -> Result<Output> {
  let bin = env!("CARGO_BIN_EXE_cargo-addon");
  Command::new(bin)
    .arg("addon")
    .args(args)
    .current_dir(dir)
    .env_remove("RUST_LOG")
    .output()
    .context("Failed to run cargo-addon")
}

/// Run a command that must succeed and parse its `--json` stdout
pub fn run_json(dir: &Path, args: &[&str]) -> Result<Value> {
  let output = run_cargo_addon(dir, args)?;
  assert!(
    output.status.success(),
    "cargo addon {:?} failed:\nstdout: {}\nstderr: {}",
    args,
    String::from_utf8_lossy(&output.stdout),
    String::from_utf8_lossy(&output.stderr)
  );
  serde_json::from_slice(&output.stdout).context("stdout is not JSON")
}
