//! `cargo addon version`

use crate::core::context::ProjectContext;
use crate::core::error::AddonResult;
use crate::npm::version::VersionSynchronizer;
use crate::utils;

pub fn run_version(ctx: &ProjectContext, json: bool) -> AddonResult<()> {
  let report = VersionSynchronizer::new(ctx).run()?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  for path in &report.updated {
    println!("   ✏️  {}", utils::display_path(path, ctx.root()));
  }
  println!(
    "✅ {} package(s) at {} ({} updated)",
    report.updated.len() + report.unchanged.len(),
    report.version,
    report.updated.len()
  );
  Ok(())
}
