//! `cargo addon release`: the whole pipeline in one run

use crate::build::toolchain::CargoToolchain;
use crate::commands::prepublish::print_publish_report;
use crate::core::config::ReleaseSettings;
use crate::core::context::ProjectContext;
use crate::core::error::AddonResult;
use crate::pipeline::{self, NativeSteps, PipelineOptions};
use crate::release::publisher::NpmGhPublisher;
use crate::utils;

pub fn run_release(
  ctx: &ProjectContext,
  cli: &ReleaseSettings,
  dry_run: bool,
  require_all: bool,
  json: bool,
) -> AddonResult<()> {
  let options = PipelineOptions {
    dry_run,
    require_all,
    release: ctx.config.release.overlay(cli),
  };

  let toolchain = CargoToolchain;
  let publisher = NpmGhPublisher::new(ctx.root());
  let steps = NativeSteps::new(&toolchain, &publisher);

  if !json {
    println!("🚀 Running release pipeline{}", if dry_run { " (dry run)" } else { "" });
  }
  let report = pipeline::run(ctx, &steps, &options)?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  if let Some(collection) = &report.collection {
    println!(
      "📦 {} artifact(s) collected, {} missing",
      collection.collected.len(),
      collection.missing.len()
    );
    for missing in &collection.missing {
      println!("   ⚠️  {}", missing);
    }
  }
  if let Some(publish) = &report.publish {
    print_publish_report(publish);
  }
  if let Some(version) = &report.version {
    println!("🔢 {} package(s) at {}", version.updated.len() + version.unchanged.len(), version.version);
  }

  let generated = report.generated_files();
  if !generated.is_empty() {
    println!("📝 Generated files:");
    for path in generated {
      println!("   {}", utils::display_path(path, ctx.root()));
    }
  }
  Ok(())
}
