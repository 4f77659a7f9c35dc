//! NpmDirManager: one package skeleton per target
//!
//! Existing manifests are merged rather than replaced: the keys we own are
//! set, everything else is kept. Files are only written when their content
//! changes, so running twice is a no-op.

use crate::core::context::ProjectContext;
use crate::core::error::{AddonResult, ResultExt};
use crate::core::manifest::{ManifestDiff, PackageManifest};
use crate::npm::{self, PlatformPackage};
use serde::Serialize;
use serde_json::json;
use std::fs;
use std::path::PathBuf;

/// Root fields copied into every platform package
const INHERITED_FIELDS: &[&str] = &[
  "description",
  "keywords",
  "author",
  "homepage",
  "license",
  "engines",
  "publishConfig",
  "repository",
  "bugs",
];

/// What a run created or would create
#[derive(Debug, Default, Serialize)]
pub struct DirsReport {
  pub packages: Vec<PlatformPackage>,
  /// Manifest changes, written unless dry-run
  pub manifests: Vec<ManifestDiff>,
  /// README files written (or that would be)
  pub readmes: Vec<PathBuf>,
}

impl DirsReport {
  pub fn is_unchanged(&self) -> bool {
    self.manifests.is_empty() && self.readmes.is_empty()
  }
}

pub struct NpmDirManager<'a> {
  ctx: &'a ProjectContext,
  dry_run: bool,
}

impl<'a> NpmDirManager<'a> {
  pub fn new(ctx: &'a ProjectContext, dry_run: bool) -> Self {
    Self { ctx, dry_run }
  }

  pub fn run(&self) -> AddonResult<DirsReport> {
    let root = self.ctx.root_manifest()?;
    let version = root.version()?.to_string();
    let root_name = root.name()?.to_string();
    let binary_name = self.ctx.binary_name()?;

    let mut report = DirsReport {
      packages: npm::plan_packages(self.ctx)?,
      ..Default::default()
    };

    for pkg in &report.packages {
      let manifest = self.platform_manifest(pkg, &root, &version, &binary_name)?;
      let diff = manifest.diff();
      if !diff.is_empty() {
        if !self.dry_run {
          manifest.save()?;
        }
        report.manifests.push(diff);
      }

      let readme_path = pkg.dir.join("README.md");
      let readme = format!(
        "# `{}`\n\nThis is the **{}** binary for `{}`\n",
        pkg.name, pkg.target, root_name
      );
      if fs::read_to_string(&readme_path).ok().as_deref() != Some(readme.as_str()) {
        if !self.dry_run {
          fs::create_dir_all(&pkg.dir).with_context(|| format!("Failed to create {}", pkg.dir.display()))?;
          fs::write(&readme_path, &readme).with_context(|| format!("Failed to write {}", readme_path.display()))?;
        }
        report.readmes.push(readme_path);
      }
    }

    tracing::info!(
      packages = report.packages.len(),
      changed = report.manifests.len(),
      dry_run = self.dry_run,
      "npm dirs ready"
    );
    Ok(report)
  }

  /// Existing manifest (if any) with our keys applied
  fn platform_manifest(
    &self,
    pkg: &PlatformPackage,
    root: &PackageManifest,
    version: &str,
    binary_name: &str,
  ) -> AddonResult<PackageManifest> {
    let path = pkg.manifest_path();
    let mut manifest = if path.exists() {
      PackageManifest::load(&path)?
    } else {
      PackageManifest::new(&path)
    };

    let binary = pkg.binary_file_name(binary_name);
    manifest.set("name", pkg.name.clone());
    manifest.set("version", version);
    manifest.set("cpu", json!([pkg.target.arch]));
    manifest.set("main", binary.clone());
    manifest.set("files", json!([binary]));
    manifest.set("os", json!([pkg.target.platform]));
    match pkg.target.libc() {
      Some(libc) => manifest.set("libc", json!([libc])),
      None => {
        manifest.remove("libc");
      }
    }
    for field in INHERITED_FIELDS {
      if let Some(value) = root.get(field) {
        manifest.set(field, value.clone());
      }
    }
    Ok(manifest)
  }
}
