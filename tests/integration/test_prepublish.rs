//! Integration tests for `cargo addon prepublish`
//!
//! Only dry runs: a real run would call npm and gh.

use crate::helpers::{DARWIN_ARM, LINUX_GNU, TestProject, run_cargo_addon, run_json};
use anyhow::Result;

#[test]
fn test_dry_run_reports_without_writing() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU, DARWIN_ARM])?;
  run_json(&project.path, &["create-npm-dirs", "--json"])?;
  let root_before = project.read("package.json")?;

  let report = run_json(&project.path, &["prepublish", "--dry-run", "--json"])?;
  assert_eq!(report["dry_run"], true);
  assert_eq!(report["tag"], "v1.0.0");

  let published: Vec<String> = serde_json::from_value(report["published"].clone())?;
  assert_eq!(
    published,
    vec!["@giegie/explore-linux-x64-gnu", "@giegie/explore-darwin-arm64"]
  );

  // optionalDependencies would be added to the root manifest
  assert!(!report["diffs"].as_array().cloned().unwrap_or_default().is_empty());
  assert_eq!(project.read("package.json")?, root_before);
  Ok(())
}

#[test]
fn test_lerna_tag_and_release_plan() -> Result<()> {
  let project = TestProject::with_version(&[LINUX_GNU], "2.0.0-alpha.1")?;
  run_json(&project.path, &["create-npm-dirs", "--json"])?;

  let report = run_json(
    &project.path,
    &["prepublish", "--tag-style", "lerna", "--gh-release", "--dry-run", "--json"],
  )?;
  assert_eq!(report["tag"], "@giegie/explore@2.0.0-alpha.1");
  assert_eq!(report["release"]["action"], "created");
  assert_eq!(report["release"]["name"], "@giegie/explore@2.0.0-alpha.1");
  Ok(())
}

#[test]
fn test_release_settings_from_addon_toml() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU])?;
  project.write_config("[release]\ngh_release = true\ngh_release_id = \"12345\"\n")?;
  run_json(&project.path, &["create-npm-dirs", "--json"])?;

  let report = run_json(&project.path, &["prepublish", "--dry-run", "--json"])?;
  assert_eq!(report["release"]["action"], "uploaded");
  assert_eq!(report["release"]["id"], "12345");
  Ok(())
}

#[test]
fn test_missing_platform_manifest_fails() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU])?;

  let output = run_cargo_addon(&project.path, &["prepublish", "--dry-run"])?;
  assert!(!output.status.success());
  Ok(())
}
