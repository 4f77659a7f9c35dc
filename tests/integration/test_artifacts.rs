//! Integration tests for `cargo addon artifacts`

use crate::helpers::{DARWIN_ARM, LINUX_GNU, TestProject, run_cargo_addon, run_json};
use anyhow::Result;

fn project_with_dirs(targets: &[&str]) -> Result<TestProject> {
  let project = TestProject::new(targets)?;
  run_json(&project.path, &["create-npm-dirs", "--json"])?;
  Ok(project)
}

#[test]
fn test_collects_into_matching_package() -> Result<()> {
  let project = project_with_dirs(&[LINUX_GNU, DARWIN_ARM])?;
  project.add_artifact("artifacts/bindings-linux/explore.linux-x64-gnu.node", b"linux")?;
  project.add_artifact("artifacts/bindings-darwin/explore.darwin-arm64.node", b"darwin")?;

  let report = run_json(&project.path, &["artifacts", "--artifacts-dir", "artifacts", "--json"])?;
  assert_eq!(report["collected"].as_array().map(Vec::len), Some(2));
  assert_eq!(report["missing"].as_array().map(Vec::len), Some(0));

  let linux = std::fs::read(project.npm_package("linux-x64-gnu").join("explore.linux-x64-gnu.node"))?;
  assert_eq!(linux, b"linux");
  let darwin = std::fs::read(project.npm_package("darwin-arm64").join("explore.darwin-arm64.node"))?;
  assert_eq!(darwin, b"darwin");
  Ok(())
}

#[test]
fn test_missing_platform_is_a_warning() -> Result<()> {
  let project = project_with_dirs(&[LINUX_GNU, DARWIN_ARM])?;
  project.add_artifact("explore.linux-x64-gnu.node", b"linux")?;

  let report = run_json(&project.path, &["artifacts", "--json"])?;
  let missing = report["missing"].as_array().cloned().unwrap_or_default();
  assert_eq!(missing.len(), 1);
  assert_eq!(missing[0]["package"], "@giegie/explore-darwin-arm64");
  Ok(())
}

#[test]
fn test_require_all_fails_with_validation_code() -> Result<()> {
  let project = project_with_dirs(&[LINUX_GNU, DARWIN_ARM])?;
  project.add_artifact("explore.linux-x64-gnu.node", b"linux")?;

  let output = run_cargo_addon(&project.path, &["artifacts", "--require-all"])?;
  assert_eq!(output.status.code(), Some(3));

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("@giegie/explore-darwin-arm64"), "stderr: {}", stderr);
  Ok(())
}

#[test]
fn test_unknown_suffix_is_rejected() -> Result<()> {
  let project = project_with_dirs(&[LINUX_GNU])?;
  project.add_artifact("explore.linux-x64-gnu.node", b"linux")?;
  project.add_artifact("explore.freebsd-x64.node", b"bsd")?;
  project.add_artifact("other.linux-x64-gnu.node", b"not ours")?;

  let report = run_json(&project.path, &["artifacts", "--json"])?;
  assert_eq!(report["collected"].as_array().map(Vec::len), Some(1));
  assert_eq!(report["rejected"].as_array().map(Vec::len), Some(1));

  let copied = std::fs::read(project.npm_package("linux-x64-gnu").join("explore.linux-x64-gnu.node"))?;
  assert_eq!(copied, b"linux");
  Ok(())
}

#[test]
fn test_recollect_skips_identical_binary() -> Result<()> {
  let project = project_with_dirs(&[LINUX_GNU])?;
  project.add_artifact("explore.linux-x64-gnu.node", b"linux")?;

  let first = run_json(&project.path, &["artifacts", "--json"])?;
  assert_eq!(first["collected"][0]["copied"], true);

  let second = run_json(&project.path, &["artifacts", "--json"])?;
  assert_eq!(second["collected"][0]["copied"], false);
  Ok(())
}
