//! Project context - resolve once, pass everywhere
//!
//! `ProjectContext` holds the resolved [`BuildOptions`] plus the parts of
//! addon.toml that are not build settings. It is built once in main.rs and
//! handed by reference to every command and pipeline stage; nothing reads
//! configuration from global state.

use crate::core::config::{self, AddonConfig, BuildOptions, BuildOverrides};
use crate::core::error::AddonResult;
use crate::core::manifest::{CrateManifest, PackageManifest};
use crate::core::target::{self, TargetTriple};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Default npm-packages directory, relative to `cwd`
pub const DEFAULT_NPM_DIR: &str = "npm";

#[derive(Debug, Clone)]
pub struct ProjectContext {
  /// Effective build options; `cwd` is absolute
  pub options: BuildOptions,

  /// Non-build sections of addon.toml
  pub config: AddonConfig,
}

impl ProjectContext {
  /// Resolve defaults, addon.toml and CLI overrides into one context
  ///
  /// `--cwd` locates the project (and its addon.toml); a `cwd` inside
  /// addon.toml is resolved relative to that project directory.
  pub fn build(current_dir: &Path, cli: &BuildOverrides) -> AddonResult<Self> {
    let project_dir = match &cli.cwd {
      Some(cwd) => current_dir.join(cwd),
      None => current_dir.to_path_buf(),
    };

    let config = AddonConfig::load(&project_dir)?;
    let mut options = config::merge(&config::merge(&BuildOptions::default(), &config.build), cli);
    options.cwd = match (&cli.cwd, &config.build.cwd) {
      (None, Some(from_file)) => project_dir.join(from_file),
      _ => project_dir,
    };
    options.validate()?;

    tracing::debug!(cwd = %options.cwd.display(), "resolved project context");
    Ok(Self { options, config })
  }

  /// Context over explicit options, without reading addon.toml
  pub fn from_options(options: BuildOptions) -> Self {
    Self {
      options,
      config: AddonConfig::default(),
    }
  }

  pub fn root(&self) -> &Path {
    &self.options.cwd
  }

  /// Root of the per-platform npm packages
  pub fn npm_dir(&self) -> PathBuf {
    let dir = self
      .config
      .npm
      .dir
      .clone()
      .unwrap_or_else(|| PathBuf::from(DEFAULT_NPM_DIR));
    self.options.resolve(&dir)
  }

  /// Directory scanned for built `.node` files
  pub fn artifacts_dir(&self) -> PathBuf {
    match &self.config.npm.artifacts_dir {
      Some(dir) => self.options.resolve(dir),
      None => self.options.output_dir(),
    }
  }

  pub fn package_json_path(&self) -> PathBuf {
    self.options.resolve(&self.options.package_json_path)
  }

  pub fn cargo_manifest_path(&self) -> PathBuf {
    self.options.resolve(&self.options.manifest_path)
  }

  /// Load the root package.json
  pub fn root_manifest(&self) -> AddonResult<PackageManifest> {
    Ok(PackageManifest::load(&self.package_json_path())?)
  }

  /// Root package.json, or None when the project has none
  ///
  /// Only a missing file is tolerated; an unreadable or malformed one is
  /// an error.
  pub fn optional_root_manifest(&self) -> AddonResult<Option<PackageManifest>> {
    let path = self.package_json_path();
    match fs::metadata(&path) {
      Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
      _ => Ok(Some(PackageManifest::load(&path)?)),
    }
  }

  /// Stem of the `.node` files: `napi.binaryName`, else the cdylib name
  pub fn binary_name(&self) -> AddonResult<String> {
    let napi = self.optional_root_manifest()?.map(|m| m.napi()).transpose()?;
    if let Some(name) = napi.and_then(|n| n.binary_name) {
      return Ok(name);
    }
    let krate = CrateManifest::load(&self.cargo_manifest_path())?;
    tracing::debug!(package = %krate.package_name, lib = %krate.lib_name, "binary name from Cargo.toml");
    Ok(krate.lib_name)
  }

  /// Triples that get a platform package
  ///
  /// Configured targets, else `napi.targets` in package.json, else the
  /// default table.
  pub fn package_targets(&self) -> AddonResult<Vec<TargetTriple>> {
    if !self.options.target.is_empty() {
      return Ok(target::parse_unique(&self.options.target)?);
    }
    if let Some(root) = self.optional_root_manifest()? {
      let napi = root.napi()?;
      if !napi.targets.is_empty() {
        return Ok(target::parse_unique(&napi.targets)?);
      }
    }
    Ok(target::default_targets())
  }

  /// Prefix of platform package names
  ///
  /// `js_package_name`, else `napi.packageName`, else the root package name.
  pub fn package_prefix(&self) -> AddonResult<String> {
    if let Some(name) = &self.options.js_package_name {
      return Ok(name.clone());
    }
    let root = self.root_manifest()?;
    if let Some(name) = root.napi()?.package_name {
      return Ok(name);
    }
    Ok(root.name()?.to_string())
  }
}
