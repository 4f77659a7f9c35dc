//! Integration tests for `cargo addon create-npm-dirs`

use crate::helpers::{DARWIN_ARM, LINUX_GNU, TestProject, WIN_MSVC, run_cargo_addon, run_json};
use anyhow::Result;

#[test]
fn test_creates_one_package_per_target() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU, DARWIN_ARM, WIN_MSVC])?;

  let output = run_cargo_addon(&project.path, &["create-npm-dirs"])?;
  assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

  let linux = project.read_json("npm/linux-x64-gnu/package.json")?;
  assert_eq!(linux["name"], "@giegie/explore-linux-x64-gnu");
  assert_eq!(linux["version"], "1.0.0");
  assert_eq!(linux["os"], serde_json::json!(["linux"]));
  assert_eq!(linux["cpu"], serde_json::json!(["x64"]));
  assert_eq!(linux["libc"], serde_json::json!(["glibc"]));
  assert_eq!(linux["main"], "explore.linux-x64-gnu.node");
  assert_eq!(linux["files"], serde_json::json!(["explore.linux-x64-gnu.node"]));
  assert_eq!(linux["license"], "MIT");

  let darwin = project.read_json("npm/darwin-arm64/package.json")?;
  assert_eq!(darwin["os"], serde_json::json!(["darwin"]));
  assert!(darwin.get("libc").is_none(), "darwin packages carry no libc constraint");

  let win = project.read_json("npm/win32-x64-msvc/package.json")?;
  assert_eq!(win["cpu"], serde_json::json!(["x64"]));

  let readme = project.read("npm/win32-x64-msvc/README.md")?;
  assert!(readme.contains("@giegie/explore-win32-x64-msvc"));

  Ok(())
}

#[test]
fn test_second_run_is_a_no_op() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU])?;

  let first = run_json(&project.path, &["create-npm-dirs", "--json"])?;
  assert_eq!(first["manifests"].as_array().map(Vec::len), Some(1));

  let second = run_json(&project.path, &["create-npm-dirs", "--json"])?;
  assert_eq!(second["manifests"].as_array().map(Vec::len), Some(0));
  assert_eq!(second["readmes"].as_array().map(Vec::len), Some(0));

  Ok(())
}

#[test]
fn test_keeps_foreign_fields() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU])?;
  run_json(&project.path, &["create-npm-dirs", "--json"])?;

  let path = project.npm_package("linux-x64-gnu").join("package.json");
  let mut manifest = project.read_json("npm/linux-x64-gnu/package.json")?;
  manifest["funding"] = serde_json::json!("https://example.com/sponsor");
  manifest["version"] = serde_json::json!("0.9.0");
  std::fs::write(&path, serde_json::to_string_pretty(&manifest)?)?;

  run_json(&project.path, &["create-npm-dirs", "--json"])?;

  let after = project.read_json("npm/linux-x64-gnu/package.json")?;
  assert_eq!(after["funding"], "https://example.com/sponsor");
  assert_eq!(after["version"], "1.0.0");
  Ok(())
}

#[test]
fn test_dry_run_writes_nothing() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU, DARWIN_ARM])?;

  let report = run_json(&project.path, &["create-npm-dirs", "--dry-run", "--json"])?;
  assert_eq!(report["manifests"].as_array().map(Vec::len), Some(2));
  assert!(!project.path.join("npm").exists());
  Ok(())
}

#[test]
fn test_custom_npm_dir() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU])?;

  run_json(&project.path, &["--npm-dir", "packages", "create-npm-dirs", "--json"])?;
  assert!(project.path.join("packages/linux-x64-gnu/package.json").exists());
  assert!(!project.path.join("npm").exists());
  Ok(())
}

#[test]
fn test_missing_package_json_fails() -> Result<()> {
  let dir = tempfile::TempDir::new()?;

  let output = run_cargo_addon(dir.path(), &["create-npm-dirs"])?;
  assert!(!output.status.success());
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}
