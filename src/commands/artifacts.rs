//! `cargo addon artifacts`

use crate::core::context::ProjectContext;
use crate::core::error::AddonResult;
use crate::npm::artifacts::ArtifactCollector;
use crate::utils;

pub fn run_artifacts(ctx: &ProjectContext, require_all: bool, json: bool) -> AddonResult<()> {
  let source = ctx.artifacts_dir();
  let report = ArtifactCollector::new(ctx, source.clone()).require_all(require_all).run()?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  println!("🔍 Collecting artifacts from {}", utils::display_path(&source, ctx.root()));
  for item in &report.collected {
    let note = if item.copied { "" } else { " (unchanged)" };
    println!(
      "   📦 {} → {}{}",
      utils::display_path(&item.source, ctx.root()),
      utils::display_path(&item.dest, ctx.root()),
      note
    );
  }
  for rejected in &report.rejected {
    println!(
      "   ⛔ {}: {}",
      utils::display_path(&rejected.path, ctx.root()),
      rejected.reason
    );
  }
  for missing in &report.missing {
    println!("   ⚠️  {}", missing);
  }

  println!(
    "✅ Collected {} artifact(s), {} missing",
    report.collected.len(),
    report.missing.len()
  );
  Ok(())
}
