//! Integration tests for `cargo addon config`

use crate::helpers::{LINUX_GNU, TestProject, run_cargo_addon, run_json};
use anyhow::Result;

#[test]
fn test_defaults_without_config_file() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU])?;

  let config = run_json(&project.path, &["config"])?;
  assert!(config["config_file"].is_null());
  assert_eq!(config["build"]["platform"], true);
  assert_eq!(config["build"]["strip"], true);
  assert_eq!(config["build"]["release"], false);
  assert_eq!(config["cross_mode"], "none");
  Ok(())
}

#[test]
fn test_cli_flags_win_over_file() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU])?;
  project.write_config("[build]\nrelease = true\nstrip = false\nprofile = \"dist\"\n")?;

  let from_file = run_json(&project.path, &["config"])?;
  assert_eq!(from_file["config_file"], "addon.toml");
  assert_eq!(from_file["build"]["release"], true);
  assert_eq!(from_file["build"]["strip"], false);
  assert_eq!(from_file["build"]["profile"], "dist");

  let overridden = run_json(&project.path, &["config", "--strip", "--profile", "bench"])?;
  assert_eq!(overridden["build"]["strip"], true);
  assert_eq!(overridden["build"]["release"], true);
  assert_eq!(overridden["build"]["profile"], "bench");

  let debug = run_json(&project.path, &["config", "--no-release"])?;
  assert_eq!(debug["build"]["release"], false);
  Ok(())
}

#[test]
fn test_unknown_key_is_a_user_error() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU])?;
  project.write_config("[build]\nrelaese = true\n")?;

  let output = run_cargo_addon(&project.path, &["config"])?;
  assert_eq!(output.status.code(), Some(1));
  Ok(())
}

#[test]
fn test_conflicting_cross_flags() -> Result<()> {
  let project = TestProject::new(&[LINUX_GNU])?;

  let output = run_cargo_addon(&project.path, &["config", "--use-cross", "--cross-compile"])?;
  assert_eq!(output.status.code(), Some(1));

  let stderr = String::from_utf8_lossy(&output.stderr);
  assert!(stderr.contains("use_cross"), "stderr: {}", stderr);
  Ok(())
}
