//! Per-platform npm packages
//!
//! - **dirs**: create/refresh one package skeleton per target (NpmDirManager)
//! - **artifacts**: copy built `.node` files into their packages (ArtifactCollector)
//! - **version**: propagate the root version to every package (VersionSynchronizer)

pub mod artifacts;
pub mod dirs;
pub mod version;

use crate::core::context::ProjectContext;
use crate::core::error::AddonResult;
use crate::core::target::TargetTriple;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One npm sub-package, keyed by target triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformPackage {
  pub target: TargetTriple,
  /// `<prefix>-<platform-arch-abi>`
  pub name: String,
  pub dir: PathBuf,
}

impl PlatformPackage {
  pub fn new(prefix: &str, target: TargetTriple, npm_dir: &Path) -> Self {
    let suffix = target.platform_arch_abi();
    Self {
      name: format!("{}-{}", prefix, suffix),
      dir: npm_dir.join(&suffix),
      target,
    }
  }

  pub fn suffix(&self) -> String {
    self.target.platform_arch_abi()
  }

  pub fn manifest_path(&self) -> PathBuf {
    self.dir.join("package.json")
  }

  /// `<binary>.<suffix>.node`
  pub fn binary_file_name(&self, binary_name: &str) -> String {
    format!("{}.{}.node", binary_name, self.suffix())
  }
}

/// Platform packages for the project, one per distinct triple
pub fn plan_packages(ctx: &ProjectContext) -> AddonResult<Vec<PlatformPackage>> {
  let prefix = ctx.package_prefix()?;
  let npm_dir = ctx.npm_dir();
  Ok(
    ctx
      .package_targets()?
      .into_iter()
      .map(|t| PlatformPackage::new(&prefix, t, &npm_dir))
      .collect(),
  )
}
