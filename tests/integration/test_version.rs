//! Integration tests for `cargo addon version`

use crate::helpers::{DARWIN_ARM, LINUX_GNU, TestProject, WIN_MSVC, run_json};
use anyhow::Result;

#[test]
fn test_syncs_root_version_into_every_package() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU, DARWIN_ARM, WIN_MSVC])?;
  run_json(&project.path, &["create-npm-dirs", "--json"])?;

  let mut root = project.read_json("package.json")?;
  root["version"] = serde_json::json!("1.1.0-beta.2");
  std::fs::write(project.path.join("package.json"), serde_json::to_string_pretty(&root)?)?;

  let report = run_json(&project.path, &["version", "--json"])?;
  assert_eq!(report["version"], "1.1.0-beta.2");
  assert_eq!(report["updated"].as_array().map(Vec::len), Some(3));

  for suffix in ["linux-x64-gnu", "darwin-arm64", "win32-x64-msvc"] {
    let manifest = project.read_json(&format!("npm/{}/package.json", suffix))?;
    assert_eq!(manifest["version"], "1.1.0-beta.2", "{} not synced", suffix);
  }
  Ok(())
}

#[test]
fn test_already_in_sync_changes_nothing() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU])?;
  run_json(&project.path, &["create-npm-dirs", "--json"])?;
  let before = project.read("npm/linux-x64-gnu/package.json")?;

  let report = run_json(&project.path, &["version", "--json"])?;
  assert_eq!(report["updated"].as_array().map(Vec::len), Some(0));
  assert_eq!(report["unchanged"].as_array().map(Vec::len), Some(1));
  assert_eq!(project.read("npm/linux-x64-gnu/package.json")?, before);
  Ok(())
}

#[test]
fn test_without_npm_dir_succeeds() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU])?;

  let report = run_json(&project.path, &["version", "--json"])?;
  assert_eq!(report["version"], "1.0.0");
  assert_eq!(report["updated"].as_array().map(Vec::len), Some(0));
  Ok(())
}
