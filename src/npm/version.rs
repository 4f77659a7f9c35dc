//! VersionSynchronizer: root version → every platform package
//!
//! Works on whatever package directories exist under the npm dir, so it can
//! run on its own after `npm version` without any other stage.

use crate::core::context::ProjectContext;
use crate::core::error::{AddonResult, ResultExt};
use crate::core::manifest::PackageManifest;
use crate::utils;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Default, Serialize)]
pub struct VersionReport {
  pub version: String,
  /// Manifests rewritten by this run
  pub updated: Vec<PathBuf>,
  /// Manifests already at the version
  pub unchanged: Vec<PathBuf>,
}

pub struct VersionSynchronizer<'a> {
  ctx: &'a ProjectContext,
}

impl<'a> VersionSynchronizer<'a> {
  pub fn new(ctx: &'a ProjectContext) -> Self {
    Self { ctx }
  }

  pub fn run(&self) -> AddonResult<VersionReport> {
    let root = self.ctx.root_manifest()?;
    let version = root.semver()?.to_string();
    let npm_dir = self.ctx.npm_dir();

    let mut report = VersionReport {
      version: version.clone(),
      ..Default::default()
    };
    if !npm_dir.exists() {
      tracing::debug!(dir = %npm_dir.display(), "no npm dir, nothing to sync");
      return Ok(report);
    }

    let dirs = utils::child_dirs(&npm_dir).with_context(|| format!("Failed to read {}", npm_dir.display()))?;
    for dir in dirs {
      let path = dir.join("package.json");
      if !path.exists() {
        continue;
      }
      let mut manifest = PackageManifest::load(&path)?;
      if manifest.version().ok() == Some(version.as_str()) {
        report.unchanged.push(path);
        continue;
      }
      manifest.set("version", version.as_str());
      manifest.save()?;
      report.updated.push(path);
    }

    tracing::info!(version = %version, updated = report.updated.len(), "versions synced");
    Ok(report)
  }
}
