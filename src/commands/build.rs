//! `cargo addon build`

use crate::build::toolchain::CargoToolchain;
use crate::build::{BuildExecutor, OutputKind};
use crate::core::context::ProjectContext;
use crate::core::error::AddonResult;
use crate::utils;

pub fn run_build(ctx: &ProjectContext, json: bool) -> AddonResult<()> {
  let toolchain = CargoToolchain;
  let executor = BuildExecutor::new(ctx, &toolchain);

  if !json && !ctx.options.watch {
    let targets = executor.targets()?;
    let names: Vec<String> = targets.iter().map(|t| t.triple.clone()).collect();
    println!("🔨 Building {} target(s): {}", targets.len(), names.join(", "));
  }

  let outputs = executor.run()?;

  if json {
    println!("{}", serde_json::to_string_pretty(&outputs)?);
    return Ok(());
  }
  if ctx.options.watch {
    return Ok(());
  }

  for output in &outputs {
    let icon = match output.kind {
      OutputKind::Node | OutputKind::Exe => "📦",
      OutputKind::Js | OutputKind::Dts => "📝",
    };
    println!("   {} {}", icon, utils::display_path(&output.path, ctx.root()));
  }
  println!("✅ Build complete");
  Ok(())
}
