//! Registry and release host access
//!
//! [`Publisher`] is the seam the coordinator talks to. [`NpmGhPublisher`]
//! shells out to `npm publish` and the `gh` CLI.

use crate::core::error::PublishError;
use std::path::{Path, PathBuf};
use std::process::Command;

pub trait Publisher {
  /// Publish the package in `dir`; `dist_tag` is `--tag` for prereleases
  fn publish_package(&self, dir: &Path, package: &str, dist_tag: Option<&str>) -> Result<(), PublishError>;

  /// Resolve an existing release id to its tag name
  fn find_release(&self, id: &str) -> Result<String, PublishError>;

  /// Create a release at `tag` with the given assets
  fn create_release(&self, tag: &str, name: &str, prerelease: bool, assets: &[PathBuf]) -> Result<(), PublishError>;

  /// Attach assets to the release at `tag`, replacing same-named ones
  fn upload_assets(&self, tag: &str, assets: &[PathBuf]) -> Result<(), PublishError>;
}

/// `npm` + `gh` CLI publisher
#[derive(Debug, Clone)]
pub struct NpmGhPublisher {
  cwd: PathBuf,
}

impl NpmGhPublisher {
  pub fn new(cwd: &Path) -> Self {
    Self { cwd: cwd.to_path_buf() }
  }

  /// Run a command, returning stdout or stderr text on failure
  fn run(&self, program: &str, args: &[String], dir: &Path) -> Result<String, String> {
    tracing::debug!(program, args = %args.join(" "), dir = %dir.display(), "running");
    let output = Command::new(program)
      .args(args)
      .current_dir(dir)
      .output()
      .map_err(|e| format!("Failed to run {}: {}", program, e))?;

    if !output.status.success() {
      return Err(String::from_utf8_lossy(&output.stderr).trim().to_string());
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
  }
}

fn asset_args(assets: &[PathBuf]) -> Vec<String> {
  assets.iter().map(|a| a.to_string_lossy().to_string()).collect()
}

impl Publisher for NpmGhPublisher {
  fn publish_package(&self, dir: &Path, package: &str, dist_tag: Option<&str>) -> Result<(), PublishError> {
    let mut args = vec!["publish".to_string()];
    if let Some(tag) = dist_tag {
      args.push("--tag".to_string());
      args.push(tag.to_string());
    }
    self.run("npm", &args, dir).map(|_| ()).map_err(|reason| PublishError::PackageFailed {
      package: package.to_string(),
      reason,
    })
  }

  fn find_release(&self, id: &str) -> Result<String, PublishError> {
    let args = vec![
      "api".to_string(),
      format!("repos/{{owner}}/{{repo}}/releases/{}", id),
      "--jq".to_string(),
      ".tag_name".to_string(),
    ];
    let tag = self.run("gh", &args, &self.cwd).map_err(|reason| PublishError::ReleaseLookup {
      id: id.to_string(),
      reason,
    })?;
    if tag.is_empty() {
      return Err(PublishError::ReleaseLookup {
        id: id.to_string(),
        reason: "release has no tag".to_string(),
      });
    }
    Ok(tag)
  }

  fn create_release(&self, tag: &str, name: &str, prerelease: bool, assets: &[PathBuf]) -> Result<(), PublishError> {
    let mut args = vec![
      "release".to_string(),
      "create".to_string(),
      tag.to_string(),
      "--title".to_string(),
      name.to_string(),
      "--generate-notes".to_string(),
    ];
    if prerelease {
      args.push("--prerelease".to_string());
    }
    args.extend(asset_args(assets));
    self.run("gh", &args, &self.cwd).map(|_| ()).map_err(|reason| PublishError::ReleaseFailed {
      tag: tag.to_string(),
      reason,
    })
  }

  fn upload_assets(&self, tag: &str, assets: &[PathBuf]) -> Result<(), PublishError> {
    if assets.is_empty() {
      return Ok(());
    }
    let mut args = vec!["release".to_string(), "upload".to_string(), tag.to_string()];
    args.extend(asset_args(assets));
    args.push("--clobber".to_string());
    self.run("gh", &args, &self.cwd).map(|_| ()).map_err(|reason| PublishError::ReleaseFailed {
      tag: tag.to_string(),
      reason,
    })
  }
}
