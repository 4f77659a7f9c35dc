//! `cargo addon config`: print the effective configuration

use crate::core::config::AddonConfig;
use crate::core::context::ProjectContext;
use crate::core::error::AddonResult;
use crate::utils;
use serde_json::json;

pub fn run_config(ctx: &ProjectContext) -> AddonResult<()> {
  let source = AddonConfig::find_config_path(ctx.root()).map(|p| utils::display_path(&p, ctx.root()));
  let mode = ctx.options.cross_mode()?;

  let effective = json!({
    "config_file": source,
    "build": ctx.options,
    "cross_mode": mode,
    "npm_dir": ctx.npm_dir(),
    "artifacts_dir": ctx.artifacts_dir(),
  });
  println!("{}", serde_json::to_string_pretty(&effective)?);
  Ok(())
}
