//! The release pipeline
//!
//! build → npm dirs → artifacts → prepublish → version sync, strictly in
//! that order. Each stage sits behind [`ReleaseSteps`] so the sequencing can
//! be tested without a toolchain or a registry.

use crate::build::toolchain::Toolchain;
use crate::build::{BuildExecutor, BuildOutput, OutputKind};
use crate::core::config::ReleaseSettings;
use crate::core::context::ProjectContext;
use crate::core::error::AddonResult;
use crate::npm::artifacts::{ArtifactCollector, CollectionReport};
use crate::npm::dirs::{DirsReport, NpmDirManager};
use crate::npm::version::{VersionReport, VersionSynchronizer};
use crate::release::publish::{PublishCoordinator, PublishManifest, PublishReport};
use crate::release::publisher::Publisher;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// One method per pipeline stage
pub trait ReleaseSteps {
  fn build(&self, ctx: &ProjectContext) -> AddonResult<Vec<BuildOutput>>;
  fn create_npm_dirs(&self, ctx: &ProjectContext, dry_run: bool) -> AddonResult<DirsReport>;
  fn collect_artifacts(&self, ctx: &ProjectContext, source: &Path, require_all: bool) -> AddonResult<CollectionReport>;
  fn prepublish(&self, ctx: &ProjectContext, manifest: &PublishManifest) -> AddonResult<PublishReport>;
  fn sync_version(&self, ctx: &ProjectContext) -> AddonResult<VersionReport>;
}

/// The real stages
pub struct NativeSteps<'a> {
  toolchain: &'a dyn Toolchain,
  publisher: &'a dyn Publisher,
}

impl<'a> NativeSteps<'a> {
  pub fn new(toolchain: &'a dyn Toolchain, publisher: &'a dyn Publisher) -> Self {
    Self { toolchain, publisher }
  }
}

impl ReleaseSteps for NativeSteps<'_> {
  fn build(&self, ctx: &ProjectContext) -> AddonResult<Vec<BuildOutput>> {
    BuildExecutor::new(ctx, self.toolchain).run()
  }

  fn create_npm_dirs(&self, ctx: &ProjectContext, dry_run: bool) -> AddonResult<DirsReport> {
    NpmDirManager::new(ctx, dry_run).run()
  }

  fn collect_artifacts(&self, ctx: &ProjectContext, source: &Path, require_all: bool) -> AddonResult<CollectionReport> {
    ArtifactCollector::new(ctx, source.to_path_buf()).require_all(require_all).run()
  }

  fn prepublish(&self, ctx: &ProjectContext, manifest: &PublishManifest) -> AddonResult<PublishReport> {
    PublishCoordinator::new(ctx, self.publisher).run(manifest)
  }

  fn sync_version(&self, ctx: &ProjectContext) -> AddonResult<VersionReport> {
    VersionSynchronizer::new(ctx).run()
  }
}

#[derive(Debug, Clone, Default)]
pub struct PipelineOptions {
  /// Publish stage dry run
  pub dry_run: bool,
  /// Missing platform artifacts fail the run
  pub require_all: bool,
  pub release: ReleaseSettings,
}

#[derive(Debug, Default, Serialize)]
pub struct PipelineReport {
  pub outputs: Vec<BuildOutput>,
  pub dirs: Option<DirsReport>,
  pub collection: Option<CollectionReport>,
  pub publish: Option<PublishReport>,
  pub version: Option<VersionReport>,
}

impl PipelineReport {
  /// Generated non-binary files (binding entry, type definitions)
  pub fn generated_files(&self) -> Vec<&PathBuf> {
    self
      .outputs
      .iter()
      .filter(|o| o.kind != OutputKind::Node)
      .map(|o| &o.path)
      .collect()
  }
}

/// Run every stage in order, stopping at the first failure
///
/// Missing artifacts are warnings unless `require_all` is set. A publish
/// failure skips version sync unless `sync_on_publish_failure` is set; the
/// publish error is returned either way.
pub fn run<S: ReleaseSteps + ?Sized>(
  ctx: &ProjectContext,
  steps: &S,
  options: &PipelineOptions,
) -> AddonResult<PipelineReport> {
  let mut report = PipelineReport::default();

  tracing::info!("stage: build");
  report.outputs = steps.build(ctx)?;
  if ctx.options.watch {
    tracing::info!("watch mode ended, skipping release stages");
    return Ok(report);
  }

  tracing::info!("stage: create npm dirs");
  report.dirs = Some(steps.create_npm_dirs(ctx, false)?);

  tracing::info!("stage: collect artifacts");
  report.collection = Some(steps.collect_artifacts(ctx, &ctx.artifacts_dir(), options.require_all)?);

  tracing::info!("stage: prepublish");
  let version = ctx.root_manifest()?.semver()?;
  let manifest = PublishManifest::new(version, &options.release, options.dry_run);
  match steps.prepublish(ctx, &manifest) {
    Ok(publish) => report.publish = Some(publish),
    Err(err) => {
      if options.release.sync_on_publish_failure.unwrap_or(false) {
        tracing::warn!(error = %err, "publish failed, syncing versions anyway");
        if let Err(sync_err) = steps.sync_version(ctx) {
          tracing::warn!(error = %sync_err, "version sync after publish failure also failed");
        }
      }
      return Err(err);
    }
  }

  tracing::info!("stage: sync versions");
  report.version = Some(steps.sync_version(ctx)?);

  Ok(report)
}
