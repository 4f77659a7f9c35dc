//! Shared clap argument groups and their conversion to overrides

use crate::core::config::{BuildOverrides, DtsOverrides, FeatureOverrides, JsBindingOverrides, ReleaseSettings};
use crate::release::tags::TagStyle;
use clap::Args;
use std::path::PathBuf;

/// `--x` / `--no-x` pair to a tri-state override
fn flag(on: bool, off: bool) -> Option<bool> {
  match (on, off) {
    (true, _) => Some(true),
    (false, true) => Some(false),
    (false, false) => None,
  }
}

/// Build options; anything not given keeps the addon.toml or default value
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
  /// Target triple to build (repeatable; default: host)
  #[arg(short, long = "target", value_name = "TRIPLE")]
  pub target: Vec<String>,

  /// Path to Cargo.toml
  #[arg(long, value_name = "PATH")]
  pub manifest_path: Option<PathBuf>,

  /// Path to the root package.json
  #[arg(long, value_name = "PATH")]
  pub package_json_path: Option<PathBuf>,

  /// Cargo target directory
  #[arg(long, value_name = "DIR")]
  pub target_dir: Option<PathBuf>,

  /// Where .node, binding and type definition files are written
  #[arg(short, long, value_name = "DIR")]
  pub output_dir: Option<PathBuf>,

  /// Add the platform suffix to .node file names
  #[arg(long)]
  pub platform: bool,
  #[arg(long, conflicts_with = "platform")]
  pub no_platform: bool,

  /// Prefix for platform package names
  #[arg(long, value_name = "NAME")]
  pub js_package_name: Option<String>,

  /// Emit `const enum` in type definitions
  #[arg(long)]
  pub const_enum: bool,
  #[arg(long, conflicts_with = "const_enum")]
  pub no_const_enum: bool,

  /// JS binding file name
  #[arg(long, value_name = "FILE")]
  pub js: Option<PathBuf>,
  /// Do not write the JS binding file
  #[arg(long, conflicts_with = "js")]
  pub no_js: bool,

  /// ES module binding
  #[arg(long)]
  pub esm: bool,
  /// CommonJS binding
  #[arg(long, conflicts_with = "esm")]
  pub cjs: bool,

  /// Type definition file name
  #[arg(long, value_name = "FILE")]
  pub dts: Option<PathBuf>,
  /// Custom text prepended to the type definition file
  #[arg(long, value_name = "TEXT")]
  pub dts_header: Option<String>,
  /// Drop the default type definition header
  #[arg(long)]
  pub no_dts_header: bool,
  /// Keep intermediate type definitions between builds
  #[arg(long)]
  pub dts_cache: bool,

  /// Strip symbols from the binary
  #[arg(long)]
  pub strip: bool,
  #[arg(long, conflicts_with = "strip")]
  pub no_strip: bool,

  /// Build in release mode
  #[arg(short, long)]
  pub release: bool,
  #[arg(long, conflicts_with = "release")]
  pub no_release: bool,

  /// Build a binary target instead of the cdylib
  #[arg(long, value_name = "NAME")]
  pub bin: Option<String>,

  /// Package to build in a workspace
  #[arg(short, long, value_name = "SPEC")]
  pub package: Option<String>,

  /// Cargo profile
  #[arg(long, value_name = "NAME")]
  pub profile: Option<String>,

  /// Cross-compile with cargo-zigbuild / cargo-xwin
  #[arg(short = 'x', long)]
  pub cross_compile: bool,

  /// Cross-compile with `cross`
  #[arg(long)]
  pub use_cross: bool,

  /// Cross-compile with GNU cross linkers
  #[arg(long)]
  pub use_napi_cross: bool,

  /// Rebuild on change (requires cargo-watch)
  #[arg(short, long)]
  pub watch: bool,

  /// Features to enable (comma separated or repeated)
  #[arg(short = 'F', long, value_delimiter = ',', value_name = "FEATURES")]
  pub features: Vec<String>,

  #[arg(long)]
  pub all_features: bool,

  #[arg(long)]
  pub no_default_features: bool,

  /// Extra arguments passed to cargo as-is
  #[arg(last = true, value_name = "CARGO_ARGS")]
  pub cargo_options: Vec<String>,
}

impl BuildArgs {
  /// Overrides for the values given on the command line only
  pub fn overrides(&self) -> BuildOverrides {
    let js_binding = JsBindingOverrides {
      path: self.js.clone(),
      esm: flag(self.esm, self.cjs),
      disabled: self.no_js.then_some(true),
    };
    let dts = DtsOverrides {
      path: self.dts.clone(),
      header: self.dts_header.clone(),
      no_default_header: self.no_dts_header.then_some(true),
      cache: self.dts_cache.then_some(true),
    };
    let features = FeatureOverrides {
      list: (!self.features.is_empty()).then(|| self.features.clone()),
      all: self.all_features.then_some(true),
      no_default: self.no_default_features.then_some(true),
    };

    BuildOverrides {
      manifest_path: self.manifest_path.clone(),
      package_json_path: self.package_json_path.clone(),
      target: (!self.target.is_empty()).then(|| self.target.clone()),
      target_dir: self.target_dir.clone(),
      output_dir: self.output_dir.clone(),
      platform: flag(self.platform, self.no_platform),
      js_package_name: self.js_package_name.clone(),
      const_enum: flag(self.const_enum, self.no_const_enum),
      js_binding: (js_binding != JsBindingOverrides::default()).then_some(js_binding),
      dts: (dts != DtsOverrides::default()).then_some(dts),
      strip: flag(self.strip, self.no_strip),
      release: flag(self.release, self.no_release),
      bin: self.bin.clone(),
      package: self.package.clone(),
      profile: self.profile.clone(),
      cross_compile: self.cross_compile.then_some(true),
      use_cross: self.use_cross.then_some(true),
      use_napi_cross: self.use_napi_cross.then_some(true),
      watch: self.watch.then_some(true),
      features: (features != FeatureOverrides::default()).then_some(features),
      cargo_options: (!self.cargo_options.is_empty()).then(|| self.cargo_options.clone()),
      ..Default::default()
    }
  }
}

/// Release options; anything not given keeps the addon.toml value
#[derive(Args, Debug, Clone, Default)]
pub struct ReleaseArgs {
  /// Tag naming convention
  #[arg(long, value_enum)]
  pub tag_style: Option<TagStyle>,

  /// Create or update a GitHub release
  #[arg(long)]
  pub gh_release: bool,

  /// Display name of a new GitHub release
  #[arg(long, value_name = "NAME")]
  pub gh_release_name: Option<String>,

  /// Attach to this existing GitHub release instead of creating one
  #[arg(long, value_name = "ID")]
  pub gh_release_id: Option<String>,

  /// Do not publish platform packages that are optional dependencies
  #[arg(long)]
  pub skip_optional_publish: bool,

  /// Sync versions even when publishing fails
  #[arg(long)]
  pub sync_on_publish_failure: bool,
}

impl ReleaseArgs {
  pub fn settings(&self) -> ReleaseSettings {
    ReleaseSettings {
      tag_style: self.tag_style,
      gh_release: self.gh_release.then_some(true),
      gh_release_name: self.gh_release_name.clone(),
      gh_release_id: self.gh_release_id.clone(),
      skip_optional_publish: self.skip_optional_publish.then_some(true),
      sync_on_publish_failure: self.sync_on_publish_failure.then_some(true),
    }
  }
}
