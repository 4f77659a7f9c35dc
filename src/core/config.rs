//! Build configuration: static defaults, overrides and the merge between them
//!
//! Effective options are resolved in three layers, later layers winning:
//!
//! ```text
//! BuildOptions::default()  ←  addon.toml [build]  ←  CLI flags
//! ```
//!
//! Each override layer is a [`BuildOverrides`]: the same shape as
//! [`BuildOptions`] with every field optional. Scalars and lists replace the
//! lower layer wholesale, while the structured groups (`js_binding`, `dts`,
//! `features`) merge leaf by leaf.

use crate::core::error::{AddonError, AddonResult, ConfigError, ResultExt};
use crate::core::target;
use crate::release::tags::TagStyle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Header prepended to generated type definitions unless disabled
pub const DEFAULT_DTS_HEADER: &str = "/* auto-generated by cargo-addon */\n/* eslint-disable */\n";

/// Effective settings for one pipeline run. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOptions {
  /// Base directory for every relative path below
  pub cwd: PathBuf,
  /// Cargo.toml of the addon crate
  pub manifest_path: PathBuf,
  /// Root package.json
  pub package_json_path: PathBuf,
  /// Target triples; empty means the host
  pub target: Vec<String>,
  /// `cargo build --target-dir`
  pub target_dir: Option<PathBuf>,
  /// Where built binaries and generated files land
  pub output_dir: PathBuf,
  /// Embed the platform suffix in the binary file name
  pub platform: bool,
  /// Package name used by the generated JS binding
  pub js_package_name: Option<String>,
  /// Emit `const enum` in type definitions
  pub const_enum: bool,
  pub js_binding: JsBindingOptions,
  pub dts: DtsOptions,
  /// Strip symbols from the produced library
  pub strip: bool,
  pub release: bool,
  pub verbose: bool,
  pub bin: Option<String>,
  pub package: Option<String>,
  pub profile: Option<String>,
  /// cargo-zigbuild / cargo-xwin
  pub cross_compile: bool,
  /// `cross` instead of `cargo`
  pub use_cross: bool,
  /// plain cargo with GNU cross linkers
  pub use_napi_cross: bool,
  pub watch: bool,
  pub features: FeatureOptions,
  /// Passed through to cargo untouched
  pub cargo_options: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JsBindingOptions {
  /// Binding file, relative to `output_dir`
  pub path: PathBuf,
  /// ESM instead of CommonJS
  pub esm: bool,
  pub disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DtsOptions {
  /// Type definition file, relative to `output_dir`
  pub path: PathBuf,
  /// Custom header written above the definitions
  pub header: Option<String>,
  /// Drop [`DEFAULT_DTS_HEADER`]
  pub no_default_header: bool,
  /// Keep intermediate type definitions between builds
  pub cache: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct FeatureOptions {
  pub list: Vec<String>,
  pub all: bool,
  pub no_default: bool,
}

impl Default for BuildOptions {
  fn default() -> Self {
    Self {
      cwd: PathBuf::from("."),
      manifest_path: PathBuf::from("Cargo.toml"),
      package_json_path: PathBuf::from("package.json"),
      target: Vec::new(),
      target_dir: None,
      output_dir: PathBuf::from("."),
      platform: true,
      js_package_name: None,
      const_enum: true,
      js_binding: JsBindingOptions {
        path: PathBuf::from("index.js"),
        esm: true,
        disabled: false,
      },
      dts: DtsOptions {
        path: PathBuf::from("index.d.ts"),
        header: None,
        no_default_header: false,
        cache: false,
      },
      strip: true,
      release: false,
      verbose: false,
      bin: None,
      package: None,
      profile: None,
      cross_compile: false,
      use_cross: false,
      use_napi_cross: false,
      watch: false,
      features: FeatureOptions::default(),
      cargo_options: Vec::new(),
    }
  }
}

/// Which cross-compilation wrapper drives cargo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CrossMode {
  /// Plain `cargo build`
  None,
  /// cargo-zigbuild, or cargo-xwin for windows-msvc targets
  CrossCompile,
  /// `cross build`
  Cross,
  /// `cargo build` with GNU cross linkers in the environment
  NapiCross,
}

impl BuildOptions {
  /// Resolve a configured path against `cwd`
  pub fn resolve(&self, path: &Path) -> PathBuf {
    if path.is_absolute() {
      path.to_path_buf()
    } else {
      self.cwd.join(path)
    }
  }

  /// Absolute output directory
  pub fn output_dir(&self) -> PathBuf {
    self.resolve(&self.output_dir)
  }

  /// Selected cross wrapper; more than one flag set is a conflict
  pub fn cross_mode(&self) -> Result<CrossMode, ConfigError> {
    let selected: Vec<(&str, CrossMode)> = [
      ("cross_compile", self.cross_compile, CrossMode::CrossCompile),
      ("use_cross", self.use_cross, CrossMode::Cross),
      ("use_napi_cross", self.use_napi_cross, CrossMode::NapiCross),
    ]
    .into_iter()
    .filter(|(_, on, _)| *on)
    .map(|(name, _, mode)| (name, mode))
    .collect();

    match selected.as_slice() {
      [] => Ok(CrossMode::None),
      [(_, mode)] => Ok(*mode),
      many => Err(ConfigError::ConflictingFlags {
        flags: many.iter().map(|(name, _)| name.to_string()).collect(),
      }),
    }
  }

  /// Check invariants that the type system cannot express
  pub fn validate(&self) -> Result<(), ConfigError> {
    self.cross_mode()?;
    target::parse_unique(&self.target)?;
    if self.dts.path.as_os_str().is_empty() || self.js_binding.path.as_os_str().is_empty() {
      return Err(ConfigError::Invalid {
        key: "dts.path / js_binding.path".to_string(),
        reason: "file name must not be empty".to_string(),
      });
    }
    Ok(())
  }

  /// Header for the type definition file, if any
  pub fn dts_header(&self) -> String {
    let mut header = String::new();
    if !self.dts.no_default_header {
      header.push_str(DEFAULT_DTS_HEADER);
    }
    if let Some(custom) = &self.dts.header {
      header.push_str(custom);
      if !custom.ends_with('\n') {
        header.push('\n');
      }
    }
    header
  }
}

/// Partial [`BuildOptions`]; `None` keeps the lower layer's value
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildOverrides {
  pub cwd: Option<PathBuf>,
  pub manifest_path: Option<PathBuf>,
  pub package_json_path: Option<PathBuf>,
  pub target: Option<Vec<String>>,
  pub target_dir: Option<PathBuf>,
  pub output_dir: Option<PathBuf>,
  pub platform: Option<bool>,
  pub js_package_name: Option<String>,
  pub const_enum: Option<bool>,
  pub js_binding: Option<JsBindingOverrides>,
  pub dts: Option<DtsOverrides>,
  pub strip: Option<bool>,
  pub release: Option<bool>,
  pub verbose: Option<bool>,
  pub bin: Option<String>,
  pub package: Option<String>,
  pub profile: Option<String>,
  pub cross_compile: Option<bool>,
  pub use_cross: Option<bool>,
  pub use_napi_cross: Option<bool>,
  pub watch: Option<bool>,
  pub features: Option<FeatureOverrides>,
  pub cargo_options: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JsBindingOverrides {
  pub path: Option<PathBuf>,
  pub esm: Option<bool>,
  pub disabled: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DtsOverrides {
  pub path: Option<PathBuf>,
  pub header: Option<String>,
  pub no_default_header: Option<bool>,
  pub cache: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeatureOverrides {
  pub list: Option<Vec<String>>,
  pub all: Option<bool>,
  pub no_default: Option<bool>,
}

impl From<&BuildOptions> for BuildOverrides {
  fn from(o: &BuildOptions) -> Self {
    Self {
      cwd: Some(o.cwd.clone()),
      manifest_path: Some(o.manifest_path.clone()),
      package_json_path: Some(o.package_json_path.clone()),
      target: Some(o.target.clone()),
      target_dir: o.target_dir.clone(),
      output_dir: Some(o.output_dir.clone()),
      platform: Some(o.platform),
      js_package_name: o.js_package_name.clone(),
      const_enum: Some(o.const_enum),
      js_binding: Some(JsBindingOverrides {
        path: Some(o.js_binding.path.clone()),
        esm: Some(o.js_binding.esm),
        disabled: Some(o.js_binding.disabled),
      }),
      dts: Some(DtsOverrides {
        path: Some(o.dts.path.clone()),
        header: o.dts.header.clone(),
        no_default_header: Some(o.dts.no_default_header),
        cache: Some(o.dts.cache),
      }),
      strip: Some(o.strip),
      release: Some(o.release),
      verbose: Some(o.verbose),
      bin: o.bin.clone(),
      package: o.package.clone(),
      profile: o.profile.clone(),
      cross_compile: Some(o.cross_compile),
      use_cross: Some(o.use_cross),
      use_napi_cross: Some(o.use_napi_cross),
      watch: Some(o.watch),
      features: Some(FeatureOverrides {
        list: Some(o.features.list.clone()),
        all: Some(o.features.all),
        no_default: Some(o.features.no_default),
      }),
      cargo_options: Some(o.cargo_options.clone()),
    }
  }
}

fn set<T: Clone>(slot: &mut T, value: &Option<T>) {
  if let Some(v) = value {
    *slot = v.clone();
  }
}

fn set_opt<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
  if value.is_some() {
    *slot = value.clone();
  }
}

/// Apply `overrides` on top of `base`. Pure: touches no filesystem state.
pub fn merge(base: &BuildOptions, overrides: &BuildOverrides) -> BuildOptions {
  let mut out = base.clone();

  set(&mut out.cwd, &overrides.cwd);
  set(&mut out.manifest_path, &overrides.manifest_path);
  set(&mut out.package_json_path, &overrides.package_json_path);
  set(&mut out.target, &overrides.target);
  set_opt(&mut out.target_dir, &overrides.target_dir);
  set(&mut out.output_dir, &overrides.output_dir);
  set(&mut out.platform, &overrides.platform);
  set_opt(&mut out.js_package_name, &overrides.js_package_name);
  set(&mut out.const_enum, &overrides.const_enum);

  if let Some(js) = &overrides.js_binding {
    set(&mut out.js_binding.path, &js.path);
    set(&mut out.js_binding.esm, &js.esm);
    set(&mut out.js_binding.disabled, &js.disabled);
  }
  if let Some(dts) = &overrides.dts {
    set(&mut out.dts.path, &dts.path);
    set_opt(&mut out.dts.header, &dts.header);
    set(&mut out.dts.no_default_header, &dts.no_default_header);
    set(&mut out.dts.cache, &dts.cache);
  }

  set(&mut out.strip, &overrides.strip);
  set(&mut out.release, &overrides.release);
  set(&mut out.verbose, &overrides.verbose);
  set_opt(&mut out.bin, &overrides.bin);
  set_opt(&mut out.package, &overrides.package);
  set_opt(&mut out.profile, &overrides.profile);
  set(&mut out.cross_compile, &overrides.cross_compile);
  set(&mut out.use_cross, &overrides.use_cross);
  set(&mut out.use_napi_cross, &overrides.use_napi_cross);
  set(&mut out.watch, &overrides.watch);

  if let Some(features) = &overrides.features {
    set(&mut out.features.list, &features.list);
    set(&mut out.features.all, &features.all);
    set(&mut out.features.no_default, &features.no_default);
  }

  set(&mut out.cargo_options, &overrides.cargo_options);
  out
}

/// `[npm]` section of addon.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NpmConfig {
  /// Root of the per-platform packages (default: `npm`)
  pub dir: Option<PathBuf>,
  /// Where CI-downloaded artifacts are collected from (default: output dir)
  pub artifacts_dir: Option<PathBuf>,
}

/// `[release]` section of addon.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReleaseSettings {
  pub tag_style: Option<TagStyle>,
  pub gh_release: Option<bool>,
  pub gh_release_name: Option<String>,
  pub gh_release_id: Option<String>,
  pub skip_optional_publish: Option<bool>,
  /// Sync versions even when publishing failed
  pub sync_on_publish_failure: Option<bool>,
}

impl ReleaseSettings {
  /// `other` wins wherever it has a value
  pub fn overlay(&self, other: &ReleaseSettings) -> ReleaseSettings {
    ReleaseSettings {
      tag_style: other.tag_style.or(self.tag_style),
      gh_release: other.gh_release.or(self.gh_release),
      gh_release_name: other.gh_release_name.clone().or_else(|| self.gh_release_name.clone()),
      gh_release_id: other.gh_release_id.clone().or_else(|| self.gh_release_id.clone()),
      skip_optional_publish: other.skip_optional_publish.or(self.skip_optional_publish),
      sync_on_publish_failure: other.sync_on_publish_failure.or(self.sync_on_publish_failure),
    }
  }
}

/// Project configuration file (addon.toml)
///
/// Searched in order: addon.toml, .addon.toml, .cargo/addon.toml, .config/addon.toml.
/// A project without one runs on defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddonConfig {
  #[serde(default)]
  pub build: BuildOverrides,
  #[serde(default)]
  pub npm: NpmConfig,
  #[serde(default)]
  pub release: ReleaseSettings,
}

impl AddonConfig {
  /// Find config file in search order
  pub fn find_config_path(path: &Path) -> Option<PathBuf> {
    let candidates = vec![
      path.join("addon.toml"),
      path.join(".addon.toml"),
      path.join(".cargo").join("addon.toml"),
      path.join(".config").join("addon.toml"),
    ];

    candidates.into_iter().find(|p| p.exists())
  }

  /// Load addon.toml from `path`, or defaults when none exists
  pub fn load(path: &Path) -> AddonResult<Self> {
    match Self::find_config_path(path) {
      Some(config_path) => Self::load_file(&config_path),
      None => Ok(Self::default()),
    }
  }

  /// Load and parse a specific config file
  pub fn load_file(config_path: &Path) -> AddonResult<Self> {
    let content = fs::read_to_string(config_path)
      .with_context(|| format!("Failed to read config from {}", config_path.display()))?;
    Self::parse(&content, config_path)
  }

  /// Parse config text; `source` is only used for error reporting
  pub fn parse(content: &str, source: &Path) -> AddonResult<Self> {
    toml_edit::de::from_str(content).map_err(|e| {
      let message = e.to_string();
      match unknown_field(&message) {
        Some(key) => AddonError::Config(ConfigError::UnknownKey {
          key,
          source: source.to_path_buf(),
        }),
        None => AddonError::message(format!("Failed to parse config from {}: {}", source.display(), message)),
      }
    })
  }
}

/// Extract the field name from serde's "unknown field `x`" message
fn unknown_field(message: &str) -> Option<String> {
  let start = message.find("unknown field `")? + "unknown field `".len();
  let len = message[start..].find('`')?;
  Some(message[start..start + len].to_string())
}
