//! `cargo addon prepublish`

use crate::core::config::ReleaseSettings;
use crate::core::context::ProjectContext;
use crate::core::error::AddonResult;
use crate::release::publish::{PublishCoordinator, PublishManifest, PublishReport, ReleaseAction};
use crate::release::publisher::NpmGhPublisher;

pub fn run_prepublish(ctx: &ProjectContext, cli: &ReleaseSettings, dry_run: bool, json: bool) -> AddonResult<()> {
  let settings = ctx.config.release.overlay(cli);
  let version = ctx.root_manifest()?.semver()?;
  let manifest = PublishManifest::new(version, &settings, dry_run);

  let publisher = NpmGhPublisher::new(ctx.root());
  let report = PublishCoordinator::new(ctx, &publisher).run(&manifest)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
  } else {
    print_publish_report(&report);
  }
  Ok(())
}

pub fn print_publish_report(report: &PublishReport) {
  let verb = if report.dry_run { "Would publish" } else { "Published" };

  if report.dry_run && !report.diffs.is_empty() {
    println!("📝 Manifest changes:");
    for diff in &report.diffs {
      print!("{}", diff.unified());
    }
    println!();
  }

  for name in &report.published {
    println!("   🚀 {} {}", verb, name);
  }
  for name in &report.skipped {
    println!("   ⏭️  Skipped {} (optional dependency)", name);
  }

  match &report.release {
    Some(ReleaseAction::Created { tag, name, assets }) => {
      let verb = if report.dry_run { "Would create" } else { "Created" };
      println!("🏷️  {} release {} ({}) with {} asset(s)", verb, name, tag, assets.len());
    }
    Some(ReleaseAction::Uploaded { id, tag, assets }) => {
      let verb = if report.dry_run { "Would upload" } else { "Uploaded" };
      println!("🏷️  {} {} asset(s) to release {} ({})", verb, assets.len(), id, tag);
    }
    None => {}
  }

  if report.dry_run {
    println!("💡 Dry run: nothing was written or published");
  } else {
    println!("✅ Prepublish complete for {}", report.tag);
  }
}
