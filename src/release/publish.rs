//! PublishCoordinator: manifest mutation, npm publish, GitHub release
//!
//! Order: compute every manifest change, persist them, publish the platform
//! packages, then create (or attach to) the release. Under dry-run the
//! changes are computed and returned as diffs; nothing is written and the
//! publisher is never called.

use crate::core::config::ReleaseSettings;
use crate::core::context::ProjectContext;
use crate::core::error::AddonResult;
use crate::core::manifest::{ManifestDiff, PackageManifest};
use crate::npm::{self, PlatformPackage};
use crate::release::publisher::Publisher;
use crate::release::tags::{self, ReleaseTag, TagStyle};
use semver::Version;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Release-time settings, built right before publishing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PublishManifest {
  pub version: Version,
  pub tag_style: TagStyle,
  pub gh_release: bool,
  pub gh_release_name: Option<String>,
  /// Attach to this release instead of creating one
  pub gh_release_id: Option<String>,
  pub skip_optional_publish: bool,
  pub dry_run: bool,
}

impl PublishManifest {
  pub fn new(version: Version, settings: &ReleaseSettings, dry_run: bool) -> Self {
    Self {
      version,
      tag_style: settings.tag_style.unwrap_or_default(),
      gh_release: settings.gh_release.unwrap_or(false),
      gh_release_name: settings.gh_release_name.clone().filter(|n| !n.is_empty()),
      gh_release_id: settings.gh_release_id.clone().filter(|id| !id.is_empty()),
      skip_optional_publish: settings.skip_optional_publish.unwrap_or(false),
      dry_run,
    }
  }
}

/// What the release did (or would do)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum ReleaseAction {
  Created { tag: String, name: String, assets: Vec<PathBuf> },
  Uploaded { id: String, tag: String, assets: Vec<PathBuf> },
}

#[derive(Debug, Default, Serialize)]
pub struct PublishReport {
  pub tag: String,
  pub dry_run: bool,
  /// Non-empty manifest changes
  pub diffs: Vec<ManifestDiff>,
  /// Packages published (or that would be)
  pub published: Vec<String>,
  /// Packages left out by `skip_optional_publish`
  pub skipped: Vec<String>,
  pub release: Option<ReleaseAction>,
}

pub struct PublishCoordinator<'a, P: Publisher + ?Sized> {
  ctx: &'a ProjectContext,
  publisher: &'a P,
}

impl<'a, P: Publisher + ?Sized> PublishCoordinator<'a, P> {
  pub fn new(ctx: &'a ProjectContext, publisher: &'a P) -> Self {
    Self { ctx, publisher }
  }

  pub fn run(&self, manifest: &PublishManifest) -> AddonResult<PublishReport> {
    let root = self.ctx.root_manifest()?;
    let root_name = root.name()?.to_string();
    let packages = npm::plan_packages(self.ctx)?;
    let binary_name = self.ctx.binary_name()?;
    let version = manifest.version.to_string();

    let new_root = root_with_optional_deps(&root, &packages, &version);
    let mut updated = vec![new_root.clone()];
    for pkg in &packages {
      let mut platform = PackageManifest::load(&pkg.manifest_path())?;
      platform.set("version", version.as_str());
      updated.push(platform);
    }

    let tag = manifest.tag_style.format(&root_name, &manifest.version);
    let mut report = PublishReport {
      tag: tag.clone(),
      dry_run: manifest.dry_run,
      diffs: updated.iter().map(PackageManifest::diff).filter(|d| !d.is_empty()).collect(),
      ..Default::default()
    };

    if manifest.dry_run {
      for diff in &report.diffs {
        tracing::info!(path = %diff.path.display(), "dry run: would update manifest");
      }
    } else {
      for m in &updated {
        m.save()?;
      }
    }

    let optional = optional_dependency_names(&new_root);
    let dist_tag = tags::dist_tag(&manifest.version);
    for pkg in &packages {
      if manifest.skip_optional_publish && optional.contains(&pkg.name) {
        report.skipped.push(pkg.name.clone());
        continue;
      }
      if manifest.dry_run {
        tracing::info!(package = %pkg.name, tag = ?dist_tag, "dry run: would publish");
      } else {
        self.publisher.publish_package(&pkg.dir, &pkg.name, dist_tag.as_deref())?;
        tracing::info!(package = %pkg.name, "published");
      }
      report.published.push(pkg.name.clone());
    }

    if manifest.gh_release {
      let assets: Vec<PathBuf> = packages
        .iter()
        .map(|p| p.dir.join(p.binary_file_name(&binary_name)))
        .filter(|p| p.exists())
        .collect();
      report.release = Some(self.release(manifest, &tag, assets)?);
    }

    Ok(report)
  }

  fn release(&self, manifest: &PublishManifest, tag: &str, assets: Vec<PathBuf>) -> AddonResult<ReleaseAction> {
    if let Some(id) = &manifest.gh_release_id {
      let tag = if manifest.dry_run {
        tracing::info!(id = %id, assets = assets.len(), "dry run: would upload to existing release");
        tag.to_string()
      } else {
        let existing = self.publisher.find_release(id)?;
        match ReleaseTag::parse(&existing) {
          Some(found) if found.version != manifest.version => tracing::warn!(
            release = %found.tag_name,
            package = %found.package_name,
            version = %manifest.version,
            "existing release is tagged for a different version"
          ),
          None => tracing::debug!(release = %existing, "release tag carries no version"),
          _ => {}
        }
        self.publisher.upload_assets(&existing, &assets)?;
        existing
      };
      return Ok(ReleaseAction::Uploaded {
        id: id.clone(),
        tag,
        assets,
      });
    }

    let name = manifest.gh_release_name.clone().unwrap_or_else(|| tag.to_string());
    if manifest.dry_run {
      tracing::info!(tag, name = %name, "dry run: would create release");
    } else {
      let prerelease = !manifest.version.pre.is_empty();
      self.publisher.create_release(tag, &name, prerelease, &assets)?;
      tracing::info!(tag, "created release");
    }
    Ok(ReleaseAction::Created {
      tag: tag.to_string(),
      name,
      assets,
    })
  }
}

/// Root manifest with every platform package pinned as an optional dependency
fn root_with_optional_deps(root: &PackageManifest, packages: &[PlatformPackage], version: &str) -> PackageManifest {
  let mut deps = match root.get("optionalDependencies") {
    Some(Value::Object(existing)) => existing.clone(),
    _ => Map::new(),
  };
  for pkg in packages {
    deps.insert(pkg.name.clone(), Value::from(version));
  }

  let mut new_root = root.clone();
  new_root.set("version", version);
  new_root.set("optionalDependencies", Value::Object(deps));
  new_root
}

fn optional_dependency_names(root: &PackageManifest) -> Vec<String> {
  match root.get("optionalDependencies") {
    Some(Value::Object(deps)) => deps.keys().cloned().collect(),
    _ => Vec::new(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::config::BuildOptions;
  use crate::core::error::{AddonError, PublishError};
  use crate::npm::dirs::NpmDirManager;
  use std::cell::RefCell;
  use std::fs;
  use std::path::Path;
  use tempfile::TempDir;

  #[derive(Default)]
  struct FakePublisher {
    calls: RefCell<Vec<String>>,
    fail_package: Option<&'static str>,
  }

  impl Publisher for FakePublisher {
    fn publish_package(&self, _dir: &Path, package: &str, dist_tag: Option<&str>) -> Result<(), PublishError> {
      self.calls.borrow_mut().push(format!("publish {} {:?}", package, dist_tag));
      if self.fail_package == Some(package) {
        return Err(PublishError::PackageFailed {
          package: package.to_string(),
          reason: "E403".to_string(),
        });
      }
      Ok(())
    }

    fn find_release(&self, id: &str) -> Result<String, PublishError> {
      self.calls.borrow_mut().push(format!("find {}", id));
      Ok("v1.2.0".to_string())
    }

    fn create_release(&self, tag: &str, name: &str, prerelease: bool, assets: &[PathBuf]) -> Result<(), PublishError> {
      self
        .calls
        .borrow_mut()
        .push(format!("create {} {} {} {}", tag, name, prerelease, assets.len()));
      Ok(())
    }

    fn upload_assets(&self, tag: &str, assets: &[PathBuf]) -> Result<(), PublishError> {
      self.calls.borrow_mut().push(format!("upload {} {}", tag, assets.len()));
      Ok(())
    }
  }

  fn project() -> (TempDir, ProjectContext) {
    let dir = TempDir::new().unwrap();
    fs::write(
      dir.path().join("package.json"),
      r#"{"name":"@giegie/explore","version":"1.2.0","napi":{"binaryName":"explore"},"optionalDependencies":{"left-pad":"1.0.0"}}"#,
    )
    .unwrap();
    let options = BuildOptions {
      cwd: dir.path().to_path_buf(),
      target: vec!["x86_64-unknown-linux-gnu".into(), "aarch64-apple-darwin".into()],
      ..Default::default()
    };
    let ctx = ProjectContext::from_options(options);
    NpmDirManager::new(&ctx, false).run().unwrap();
    fs::write(dir.path().join("npm/linux-x64-gnu/explore.linux-x64-gnu.node"), "bin").unwrap();
    (dir, ctx)
  }

  fn manifest(version: &str, dry_run: bool) -> PublishManifest {
    let settings = ReleaseSettings {
      gh_release: Some(true),
      ..Default::default()
    };
    PublishManifest::new(Version::parse(version).unwrap(), &settings, dry_run)
  }

  fn snapshot(dir: &Path) -> Vec<String> {
    ["package.json", "npm/linux-x64-gnu/package.json", "npm/darwin-arm64/package.json"]
      .iter()
      .map(|p| fs::read_to_string(dir.join(p)).unwrap())
      .collect()
  }

  #[test]
  fn test_dry_run_persists_nothing() {
    let (dir, ctx) = project();
    let before = snapshot(dir.path());
    let publisher = FakePublisher::default();

    let report = PublishCoordinator::new(&ctx, &publisher).run(&manifest("1.3.0", true)).unwrap();

    assert_eq!(report.diffs.len(), 3);
    assert!(report.diffs[0].unified().contains("@giegie/explore-linux-x64-gnu"));
    assert_eq!(report.published.len(), 2);
    assert!(publisher.calls.borrow().is_empty());
    assert_eq!(snapshot(dir.path()), before);
  }

  #[test]
  fn test_publish_updates_manifests_and_creates_release() {
    let (dir, ctx) = project();
    let publisher = FakePublisher::default();
    let report = PublishCoordinator::new(&ctx, &publisher).run(&manifest("1.3.0", false)).unwrap();

    let root: Value = serde_json::from_str(&fs::read_to_string(dir.path().join("package.json")).unwrap()).unwrap();
    assert_eq!(root["version"], "1.3.0");
    assert_eq!(root["optionalDependencies"]["left-pad"], "1.0.0");
    assert_eq!(root["optionalDependencies"]["@giegie/explore-darwin-arm64"], "1.3.0");

    assert_eq!(
      *publisher.calls.borrow(),
      vec![
        "publish @giegie/explore-linux-x64-gnu None".to_string(),
        "publish @giegie/explore-darwin-arm64 None".to_string(),
        "create v1.3.0 v1.3.0 false 1".to_string(),
      ]
    );
    assert_eq!(report.tag, "v1.3.0");
  }

  #[test]
  fn test_skip_optional_publish_still_updates_manifests() {
    let (dir, ctx) = project();
    let publisher = FakePublisher::default();
    let mut m = manifest("1.3.0", false);
    m.skip_optional_publish = true;
    m.gh_release = false;

    let report = PublishCoordinator::new(&ctx, &publisher).run(&m).unwrap();
    assert_eq!(report.skipped.len(), 2);
    assert!(publisher.calls.borrow().is_empty());
    let platform = fs::read_to_string(dir.path().join("npm/darwin-arm64/package.json")).unwrap();
    assert!(platform.contains("\"version\": \"1.3.0\""));
  }

  #[test]
  fn test_existing_release_gets_uploads() {
    let (_dir, ctx) = project();
    let publisher = FakePublisher::default();
    let mut m = manifest("1.2.0", false);
    m.gh_release_id = Some("123".into());

    let report = PublishCoordinator::new(&ctx, &publisher).run(&m).unwrap();
    let calls = publisher.calls.borrow();
    assert!(calls.contains(&"find 123".to_string()));
    assert!(calls.contains(&"upload v1.2.0 1".to_string()));
    assert!(!calls.iter().any(|c| c.starts_with("create")));
    assert!(matches!(report.release, Some(ReleaseAction::Uploaded { .. })));
  }

  #[test]
  fn test_lerna_tags_and_prerelease_dist_tag() {
    let (_dir, ctx) = project();
    let publisher = FakePublisher::default();
    let mut m = manifest("2.0.0-beta.1", false);
    m.tag_style = TagStyle::Lerna;
    m.gh_release_name = Some("Explore 2 beta".into());

    let report = PublishCoordinator::new(&ctx, &publisher).run(&m).unwrap();
    assert_eq!(report.tag, "@giegie/explore@2.0.0-beta.1");
    let calls = publisher.calls.borrow();
    assert!(calls.contains(&"publish @giegie/explore-linux-x64-gnu Some(\"beta\")".to_string()));
    assert!(calls.contains(&"create @giegie/explore@2.0.0-beta.1 Explore 2 beta true 1".to_string()));
  }

  #[test]
  fn test_publish_failure_names_package() {
    let (_dir, ctx) = project();
    let publisher = FakePublisher {
      fail_package: Some("@giegie/explore-darwin-arm64"),
      ..Default::default()
    };
    let err = PublishCoordinator::new(&ctx, &publisher)
      .run(&manifest("1.3.0", false))
      .unwrap_err();
    match err {
      AddonError::Publish(PublishError::PackageFailed { package, .. }) => {
        assert_eq!(package, "@giegie/explore-darwin-arm64")
      }
      other => panic!("unexpected error: {other:?}"),
    }
  }

  #[test]
  fn test_empty_release_id_means_create() {
    let settings = ReleaseSettings {
      gh_release_id: Some(String::new()),
      ..Default::default()
    };
    let m = PublishManifest::new(Version::new(1, 0, 0), &settings, true);
    assert_eq!(m.gh_release_id, None);
    assert_eq!(m.tag_style, TagStyle::Npm);
  }
}
