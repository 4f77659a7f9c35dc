//! ArtifactCollector: place built `.node` files into their platform packages
//!
//! The source may be a local build output or a directory of CI artifacts
//! downloaded from several runners. The target encoded in each file name is
//! the only matching key; a binary is never copied into another target's
//! package.

use crate::core::context::ProjectContext;
use crate::core::error::{AddonResult, ResultExt, ValidationError};
use crate::core::manifest::PackageManifest;
use crate::npm::{self, PlatformPackage};
use crate::utils;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// A platform package left without a binary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactMissing {
  pub package: String,
  pub target: String,
}

impl fmt::Display for ArtifactMissing {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "no artifact for {} ({})", self.package, self.target)
  }
}

/// A `.node` file that was found but not placed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedArtifact {
  pub path: PathBuf,
  pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectedArtifact {
  pub package: String,
  pub source: PathBuf,
  pub dest: PathBuf,
  /// False when the destination already had identical content
  pub copied: bool,
}

#[derive(Debug, Default, Serialize)]
pub struct CollectionReport {
  pub collected: Vec<CollectedArtifact>,
  pub missing: Vec<ArtifactMissing>,
  pub rejected: Vec<RejectedArtifact>,
}

pub struct ArtifactCollector<'a> {
  ctx: &'a ProjectContext,
  source_dir: PathBuf,
  require_all: bool,
}

impl<'a> ArtifactCollector<'a> {
  pub fn new(ctx: &'a ProjectContext, source_dir: PathBuf) -> Self {
    Self {
      ctx,
      source_dir,
      require_all: false,
    }
  }

  /// Treat missing platforms as a validation failure
  pub fn require_all(mut self, require_all: bool) -> Self {
    self.require_all = require_all;
    self
  }

  /// All `.node` files under the source dir
  ///
  /// The npm tree and `node_modules` are pruned: binaries there belong to
  /// already staged or installed packages, not to this build.
  fn scan(&self, npm_dir: &Path) -> AddonResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    let walker = WalkDir::new(&self.source_dir)
      .follow_links(false)
      .into_iter()
      .filter_entry(|entry| !is_pruned(entry, npm_dir));
    for entry in walker {
      let entry = match entry {
        Ok(entry) => entry,
        Err(e) => {
          tracing::debug!(error = %e, "skipping unreadable entry");
          continue;
        }
      };
      if entry.file_type().is_file() && entry.path().extension().is_some_and(|e| e == "node") {
        found.push(entry.into_path());
      }
    }
    found.sort();
    Ok(found)
  }

  pub fn run(&self) -> AddonResult<CollectionReport> {
    let binary_name = self.ctx.binary_name()?;
    let npm_dir = self.ctx.npm_dir();
    let packages = npm::plan_packages(self.ctx)?;
    let by_suffix: BTreeMap<String, &PlatformPackage> = packages.iter().map(|p| (p.suffix(), p)).collect();

    let mut report = CollectionReport::default();
    let prefix = format!("{}.", binary_name);

    for path in self.scan(&npm_dir)? {
      let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
      let Some(suffix) = file_name.strip_prefix(&prefix).and_then(|rest| rest.strip_suffix(".node")) else {
        tracing::debug!(path = %path.display(), "not an artifact of {}", binary_name);
        continue;
      };

      let Some(pkg) = by_suffix.get(suffix) else {
        report.reject(path, format!("no platform package for '{}'", suffix));
        continue;
      };
      if let Some(first) = report.collected.iter().find(|c| c.package == pkg.name) {
        let reason = format!("duplicate artifact for {}, keeping {}", pkg.name, first.source.display());
        report.reject(path, reason);
        continue;
      }

      let manifest = PackageManifest::load(&pkg.manifest_path())?;
      if let Some(reason) = constraint_mismatch(&manifest, pkg) {
        report.reject(path, reason);
        continue;
      }

      let collected = self.place(&path, pkg, &binary_name)?;
      report.collected.push(collected);
    }

    for pkg in &packages {
      if !report.collected.iter().any(|c| c.package == pkg.name) {
        let missing = ArtifactMissing {
          package: pkg.name.clone(),
          target: pkg.target.triple.clone(),
        };
        tracing::warn!("{}", missing);
        report.missing.push(missing);
      }
    }

    if self.require_all && !report.missing.is_empty() {
      return Err(
        ValidationError::ArtifactsMissing {
          packages: report.missing.iter().map(|m| m.package.clone()).collect(),
        }
        .into(),
      );
    }
    Ok(report)
  }

  /// Copy into the package, leaving exactly one `.node` file there
  fn place(&self, source: &Path, pkg: &PlatformPackage, binary_name: &str) -> AddonResult<CollectedArtifact> {
    let dest = pkg.dir.join(pkg.binary_file_name(binary_name));

    for entry in fs::read_dir(&pkg.dir).with_context(|| format!("Failed to read {}", pkg.dir.display()))? {
      let stale = entry?.path();
      if stale != dest && stale.extension().is_some_and(|e| e == "node") {
        tracing::debug!(path = %stale.display(), "removing stale binary");
        fs::remove_file(&stale)?;
      }
    }

    let unchanged = dest.exists() && utils::sha256_file(&dest)? == utils::sha256_file(source)?;
    if !unchanged {
      fs::copy(source, &dest).with_context(|| format!("Failed to copy {} to {}", source.display(), dest.display()))?;
    }
    tracing::info!(package = %pkg.name, copied = !unchanged, "collected");

    Ok(CollectedArtifact {
      package: pkg.name.clone(),
      source: source.to_path_buf(),
      dest,
      copied: !unchanged,
    })
  }
}

impl CollectionReport {
  fn reject(&mut self, path: PathBuf, reason: String) {
    tracing::warn!(path = %path.display(), "rejected artifact: {}", reason);
    self.rejected.push(RejectedArtifact { path, reason });
  }
}

fn is_pruned(entry: &DirEntry, npm_dir: &Path) -> bool {
  entry.file_type().is_dir() && (entry.path() == npm_dir || entry.file_name() == "node_modules")
}

/// Reason the package manifest's os/cpu disagree with its target
fn constraint_mismatch(manifest: &PackageManifest, pkg: &PlatformPackage) -> Option<String> {
  let declares = |field: &str, want: &str| match manifest.get(field) {
    Some(Value::Array(values)) => values.iter().any(|v| v.as_str() == Some(want)),
    _ => false,
  };
  if !declares("os", &pkg.target.platform) {
    return Some(format!("{} does not declare os '{}'", pkg.manifest_path().display(), pkg.target.platform));
  }
  if !declares("cpu", &pkg.target.arch) {
    return Some(format!("{} does not declare cpu '{}'", pkg.manifest_path().display(), pkg.target.arch));
  }
  None
}
