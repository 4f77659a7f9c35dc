//! `cargo addon create-npm-dirs`

use crate::core::context::ProjectContext;
use crate::core::error::AddonResult;
use crate::npm::dirs::NpmDirManager;
use crate::utils;

pub fn run_create_npm_dirs(ctx: &ProjectContext, dry_run: bool, json: bool) -> AddonResult<()> {
  let report = NpmDirManager::new(ctx, dry_run).run()?;

  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  println!(
    "📁 {} platform package(s) in {}",
    report.packages.len(),
    utils::display_path(&ctx.npm_dir(), ctx.root())
  );
  for pkg in &report.packages {
    let changed = report.manifests.iter().any(|d| d.path == pkg.manifest_path());
    let marker = if changed { "✏️ " } else { "  " };
    println!("   {} {} ({})", marker, pkg.name, pkg.target);
  }

  if report.is_unchanged() {
    println!("✅ Already up to date");
  } else if dry_run {
    println!();
    for diff in &report.manifests {
      print!("{}", diff.unified());
    }
    println!("💡 Dry run: no files written");
  } else {
    println!("✅ Wrote {} manifest(s)", report.manifests.len());
  }
  Ok(())
}
