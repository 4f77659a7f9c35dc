//! BuildExecutor: compile every target and place the outputs
//!
//! Targets compile concurrently on the rayon pool; the executor only looks at
//! the aggregated result. A failure on any target removes every binary this
//! run already copied, so callers never see a partial set.

pub mod binding;
pub mod toolchain;

use crate::core::config::CrossMode;
use crate::core::context::ProjectContext;
use crate::core::error::{AddonResult, BuildError, ConfigError, ResultExt};
use crate::core::target::{self, TargetTriple};
use crate::ui::progress::BuildProgress;
use crate::utils;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use toolchain::{CompileRequest, CompiledArtifact, Toolchain};

/// What a build output is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
  /// Native addon binary (`.node`)
  Node,
  /// `--bin` executable
  Exe,
  /// JS binding entry
  Js,
  /// Type definitions
  Dts,
}

/// One produced file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildOutput {
  pub kind: OutputKind,
  pub path: PathBuf,
}

impl BuildOutput {
  fn new(kind: OutputKind, path: PathBuf) -> Self {
    Self { kind, path }
  }
}

pub struct BuildExecutor<'a, T: Toolchain + ?Sized> {
  ctx: &'a ProjectContext,
  toolchain: &'a T,
}

impl<'a, T: Toolchain + ?Sized> BuildExecutor<'a, T> {
  pub fn new(ctx: &'a ProjectContext, toolchain: &'a T) -> Self {
    Self { ctx, toolchain }
  }

  /// Configured targets, or the host when none are set
  pub fn targets(&self) -> AddonResult<Vec<TargetTriple>> {
    if self.ctx.options.target.is_empty() {
      let host = self.toolchain.host_triple()?;
      return Ok(vec![TargetTriple::parse(&host)?]);
    }
    Ok(target::parse_unique(&self.ctx.options.target)?)
  }

  fn check_targets(&self, mode: CrossMode, targets: &[TargetTriple]) -> Result<(), ConfigError> {
    if !self.ctx.options.platform && targets.len() > 1 {
      return Err(ConfigError::Invalid {
        key: "platform".to_string(),
        reason: "several targets without platform suffixes would all write the same output file".to_string(),
      });
    }
    if mode == CrossMode::NapiCross
      && let Some(t) = targets.iter().find(|t| t.gnu_cross_prefix().is_none())
    {
      return Err(ConfigError::Invalid {
        key: "use_napi_cross".to_string(),
        reason: format!("no GNU cross toolchain for {}", t),
      });
    }
    Ok(())
  }

  /// Directory for intermediate type definitions
  fn type_def_dir(&self) -> PathBuf {
    let opts = &self.ctx.options;
    let target_dir = match &opts.target_dir {
      Some(dir) => opts.resolve(dir),
      None => opts.cwd.join("target"),
    };
    target_dir.join("addon")
  }

  /// Build all targets and write the binding files
  pub fn run(&self) -> AddonResult<Vec<BuildOutput>> {
    let opts = &self.ctx.options;
    let mode = opts.cross_mode()?;
    let targets = self.targets()?;
    self.check_targets(mode, &targets)?;

    let binary_name = self.ctx.binary_name()?;
    let output_dir = opts.output_dir();
    let type_def_dir = self.type_def_dir();
    fs::create_dir_all(&output_dir).with_context(|| format!("Failed to create {}", output_dir.display()))?;
    fs::create_dir_all(&type_def_dir).with_context(|| format!("Failed to create {}", type_def_dir.display()))?;

    let requests: Vec<CompileRequest<'_>> = targets
      .iter()
      .map(|t| CompileRequest {
        options: opts,
        target: t,
        mode,
        type_def_file: type_def_dir.join(format!("{}.{}.tmp", binary_name, t.platform_arch_abi())),
      })
      .collect();

    if !opts.dts.cache {
      for request in &requests {
        if request.type_def_file.exists() {
          fs::remove_file(&request.type_def_file)?;
        }
      }
    }

    if opts.watch {
      if let Some(first) = requests.first() {
        self.toolchain.watch(first)?;
      }
      return Ok(Vec::new());
    }

    tracing::info!(targets = requests.len(), ?mode, "building");
    let progress = BuildProgress::new(requests.len());
    let results: Vec<Result<BuildOutput, BuildError>> = requests
      .par_iter()
      .map(|request| {
        let bar = progress.add_bar(request.target.triple.clone());
        let result = self
          .toolchain
          .compile(request)
          .and_then(|artifact| self.place(&artifact, request.target, &binary_name, &output_dir));
        progress.finish(bar.as_ref());
        result
      })
      .collect();

    let mut outputs = Vec::with_capacity(results.len() + 2);
    let mut failure = None;
    for result in results {
      match result {
        Ok(output) => outputs.push(output),
        Err(err) if failure.is_none() => failure = Some(err),
        Err(err) => tracing::debug!(error = %err, "additional build failure"),
      }
    }
    if let Some(err) = failure {
      for output in &outputs {
        if let Err(e) = fs::remove_file(&output.path) {
          tracing::warn!(path = %output.path.display(), error = %e, "failed to remove partial output");
        }
      }
      return Err(err.into());
    }

    if opts.bin.is_none() {
      if let Some(js) = self.write_binding(&binary_name, &targets, &output_dir)? {
        outputs.push(js);
      }
      if let Some(dts) = self.write_dts(&requests, &output_dir)? {
        outputs.push(dts);
      }
    }

    Ok(outputs)
  }

  /// Copy one compiled artifact into the output directory
  fn place(
    &self,
    artifact: &CompiledArtifact,
    target: &TargetTriple,
    binary_name: &str,
    output_dir: &Path,
  ) -> Result<BuildOutput, BuildError> {
    let (kind, dest) = match artifact {
      CompiledArtifact::Library(_) if self.ctx.options.platform => (
        OutputKind::Node,
        output_dir.join(format!("{}.{}.node", binary_name, target.platform_arch_abi())),
      ),
      CompiledArtifact::Library(_) => (OutputKind::Node, output_dir.join(format!("{}.node", binary_name))),
      CompiledArtifact::Executable(path) if self.ctx.options.platform => {
        (OutputKind::Exe, output_dir.join(suffixed_file_name(path, target)))
      }
      CompiledArtifact::Executable(path) => (
        OutputKind::Exe,
        output_dir.join(path.file_name().unwrap_or(path.as_os_str())),
      ),
    };

    fs::copy(artifact.path(), &dest).map_err(|e| BuildError::ToolchainFailed {
      target: target.triple.clone(),
      reason: format!("failed to copy {} to {}: {}", artifact.path().display(), dest.display(), e),
    })?;
    tracing::info!(target = %target, path = %dest.display(), "built");
    Ok(BuildOutput::new(kind, dest))
  }

  fn write_binding(
    &self,
    binary_name: &str,
    built: &[TargetTriple],
    output_dir: &Path,
  ) -> AddonResult<Option<BuildOutput>> {
    let opts = &self.ctx.options;
    if opts.js_binding.disabled {
      return Ok(None);
    }

    let targets = if opts.platform {
      let mut all = self.ctx.package_targets()?;
      for t in built {
        if !all.contains(t) {
          all.push(t.clone());
        }
      }
      all
    } else {
      Vec::new()
    };
    let prefix = if opts.js_package_name.is_none() && self.ctx.optional_root_manifest()?.is_none() {
      tracing::debug!("no package.json, binding uses the binary name");
      binary_name.to_string()
    } else {
      self.ctx.package_prefix()?
    };

    let path = output_dir.join(&opts.js_binding.path);
    let content = binding::render_binding(binary_name, &prefix, &targets, opts.js_binding.esm);
    utils::write_if_changed(&path, &content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(Some(BuildOutput::new(OutputKind::Js, path)))
  }

  fn write_dts(&self, requests: &[CompileRequest<'_>], output_dir: &Path) -> AddonResult<Option<BuildOutput>> {
    let opts = &self.ctx.options;
    let Some(source) = requests.iter().map(|r| &r.type_def_file).find(|p| p.exists()) else {
      tracing::debug!("no intermediate type definitions produced");
      return Ok(None);
    };

    let type_defs = fs::read_to_string(source)?;
    let path = output_dir.join(&opts.dts.path);
    let content = binding::render_dts(&opts.dts_header(), &type_defs, opts.const_enum);
    utils::write_if_changed(&path, &content).with_context(|| format!("Failed to write {}", path.display()))?;

    if !opts.dts.cache {
      for request in requests {
        if request.type_def_file.exists() {
          fs::remove_file(&request.type_def_file)?;
        }
      }
    }
    Ok(Some(BuildOutput::new(OutputKind::Dts, path)))
  }
}

/// `<name>.<suffix>[.exe]`, so every target keeps its own executable
fn suffixed_file_name(path: &Path, target: &TargetTriple) -> String {
  let name = path.file_name().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
  match name.strip_suffix(".exe") {
    Some(stem) => format!("{}.{}.exe", stem, target.platform_arch_abi()),
    None => format!("{}.{}", name, target.platform_arch_abi()),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::core::config::BuildOptions;
  use crate::core::error::{AddonError, ManifestError};
  use std::sync::atomic::{AtomicBool, Ordering};
  use tempfile::TempDir;

  /// Writes a fake cdylib per target; fails for `fail_on`
  struct FakeToolchain {
    scratch: PathBuf,
    fail_on: Option<&'static str>,
    watched: AtomicBool,
  }

  impl FakeToolchain {
    fn new(scratch: &Path) -> Self {
      Self {
        scratch: scratch.to_path_buf(),
        fail_on: None,
        watched: AtomicBool::new(false),
      }
    }
  }

  impl Toolchain for FakeToolchain {
    fn host_triple(&self) -> AddonResult<String> {
      Ok("x86_64-unknown-linux-gnu".to_string())
    }

    fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledArtifact, BuildError> {
      if self.fail_on == Some(request.target.triple.as_str()) {
        return Err(BuildError::ToolchainFailed {
          target: request.target.triple.clone(),
          reason: "linker not found".to_string(),
        });
      }
      if let Some(bin) = &request.options.bin {
        let exe_dir = self.scratch.join(&request.target.triple);
        fs::create_dir_all(&exe_dir).unwrap();
        let exe_name = if request.target.platform == "win32" {
          format!("{}.exe", bin)
        } else {
          bin.clone()
        };
        let exe = exe_dir.join(exe_name);
        fs::write(&exe, request.target.triple.as_bytes()).unwrap();
        return Ok(CompiledArtifact::Executable(exe));
      }
      let lib = self.scratch.join(format!("lib-{}.so", request.target.triple));
      fs::write(&lib, request.target.triple.as_bytes()).unwrap();
      fs::write(&request.type_def_file, "export declare function sum(a: number, b: number): number\n").unwrap();
      Ok(CompiledArtifact::Library(lib))
    }

    fn watch(&self, _request: &CompileRequest<'_>) -> Result<(), BuildError> {
      self.watched.store(true, Ordering::SeqCst);
      Ok(())
    }
  }

  fn project(targets: &[&str]) -> (TempDir, ProjectContext) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"binding-explore\"\n").unwrap();
    fs::write(
      dir.path().join("package.json"),
      r#"{"name":"@giegie/explore","version":"0.1.0","napi":{"binaryName":"explore"}}"#,
    )
    .unwrap();
    fs::create_dir(dir.path().join("scratch")).unwrap();
    let options = BuildOptions {
      cwd: dir.path().to_path_buf(),
      output_dir: PathBuf::from("dist"),
      target: targets.iter().map(|t| t.to_string()).collect(),
      ..Default::default()
    };
    (dir, ProjectContext::from_options(options))
  }

  fn node_files(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
      .map(|rd| {
        rd.filter_map(|e| e.ok())
          .map(|e| e.file_name().to_string_lossy().to_string())
          .filter(|n| n.ends_with(".node"))
          .collect()
      })
      .unwrap_or_default();
    names.sort();
    names
  }

  #[test]
  fn test_builds_every_target_and_writes_bindings() {
    let (dir, ctx) = project(&["x86_64-unknown-linux-gnu", "aarch64-apple-darwin"]);
    let toolchain = FakeToolchain::new(&dir.path().join("scratch"));
    let outputs = BuildExecutor::new(&ctx, &toolchain).run().unwrap();

    let kinds: Vec<OutputKind> = outputs.iter().map(|o| o.kind).collect();
    assert_eq!(
      kinds,
      vec![OutputKind::Node, OutputKind::Node, OutputKind::Js, OutputKind::Dts]
    );
    assert_eq!(
      node_files(&dir.path().join("dist")),
      vec!["explore.darwin-arm64.node", "explore.linux-x64-gnu.node"]
    );

    let dts = fs::read_to_string(dir.path().join("dist").join("index.d.ts")).unwrap();
    assert!(dts.starts_with(crate::core::config::DEFAULT_DTS_HEADER));
    assert!(dts.contains("export declare function sum"));
    assert!(!dir.path().join("target/addon/explore.linux-x64-gnu.tmp").exists());

    let js = fs::read_to_string(dir.path().join("dist").join("index.js")).unwrap();
    assert!(js.contains("@giegie/explore-${suffix}"));
  }

  #[test]
  fn test_failure_on_one_target_leaves_no_partial_set() {
    let (dir, ctx) = project(&["x86_64-unknown-linux-gnu", "aarch64-unknown-linux-gnu", "aarch64-apple-darwin"]);
    let mut toolchain = FakeToolchain::new(&dir.path().join("scratch"));
    toolchain.fail_on = Some("aarch64-unknown-linux-gnu");

    let err = BuildExecutor::new(&ctx, &toolchain).run().unwrap_err();
    match err {
      AddonError::Build(e) => assert_eq!(e.target(), Some("aarch64-unknown-linux-gnu")),
      other => panic!("expected build error, got {other:?}"),
    }
    assert!(node_files(&dir.path().join("dist")).is_empty());
    assert!(!dir.path().join("dist").join("index.js").exists());
  }

  #[test]
  fn test_empty_target_builds_host() {
    let (dir, ctx) = project(&[]);
    let toolchain = FakeToolchain::new(&dir.path().join("scratch"));
    let outputs = BuildExecutor::new(&ctx, &toolchain).run().unwrap();
    assert_eq!(outputs[0].path, dir.path().join("dist").join("explore.linux-x64-gnu.node"));
  }

  #[test]
  fn test_no_platform_and_disabled_binding() {
    let (dir, mut ctx) = project(&["x86_64-apple-darwin"]);
    ctx.options.platform = false;
    ctx.options.js_binding.disabled = true;
    let toolchain = FakeToolchain::new(&dir.path().join("scratch"));
    let outputs = BuildExecutor::new(&ctx, &toolchain).run().unwrap();

    assert_eq!(outputs[0].path, dir.path().join("dist").join("explore.node"));
    assert!(outputs.iter().all(|o| o.kind != OutputKind::Js));
  }

  #[test]
  fn test_several_targets_need_platform_suffix() {
    let (dir, mut ctx) = project(&["x86_64-apple-darwin", "aarch64-apple-darwin"]);
    ctx.options.platform = false;
    let toolchain = FakeToolchain::new(&dir.path().join("scratch"));
    let err = BuildExecutor::new(&ctx, &toolchain).run().unwrap_err();
    assert!(matches!(err, AddonError::Config(ConfigError::Invalid { .. })));
  }

  #[test]
  fn test_napi_cross_rejects_non_gnu_targets() {
    let (dir, mut ctx) = project(&["aarch64-apple-darwin"]);
    ctx.options.use_napi_cross = true;
    let toolchain = FakeToolchain::new(&dir.path().join("scratch"));
    let err = BuildExecutor::new(&ctx, &toolchain).run().unwrap_err();
    assert!(matches!(err, AddonError::Config(ConfigError::Invalid { .. })));
  }

  #[test]
  fn test_watch_returns_no_outputs() {
    let (dir, mut ctx) = project(&["x86_64-apple-darwin"]);
    ctx.options.watch = true;
    let toolchain = FakeToolchain::new(&dir.path().join("scratch"));
    let outputs = BuildExecutor::new(&ctx, &toolchain).run().unwrap();
    assert!(outputs.is_empty());
    assert!(toolchain.watched.load(Ordering::SeqCst));
  }

  #[test]
  fn test_malformed_package_json_aborts_build() {
    let (dir, ctx) = project(&["x86_64-unknown-linux-gnu"]);
    fs::write(
      dir.path().join("package.json"),
      r#"{"name":"@giegie/explore","version":"0.1.0","napi":{"binaryName":"explore"},}"#,
    )
    .unwrap();
    let toolchain = FakeToolchain::new(&dir.path().join("scratch"));

    let err = BuildExecutor::new(&ctx, &toolchain).run().unwrap_err();
    assert!(matches!(err, AddonError::Manifest(ManifestError::Malformed { .. })));
    assert!(node_files(&dir.path().join("dist")).is_empty());
    assert!(!dir.path().join("dist").join("index.js").exists());
  }

  #[test]
  fn test_binding_without_package_json_uses_binary_name() {
    let (dir, ctx) = project(&["x86_64-unknown-linux-gnu"]);
    fs::remove_file(dir.path().join("package.json")).unwrap();
    let toolchain = FakeToolchain::new(&dir.path().join("scratch"));

    BuildExecutor::new(&ctx, &toolchain).run().unwrap();
    let js = fs::read_to_string(dir.path().join("dist").join("index.js")).unwrap();
    assert!(js.contains("binding_explore-${suffix}"));
  }

  #[test]
  fn test_executables_keep_one_file_per_target() {
    let (dir, mut ctx) = project(&["x86_64-unknown-linux-gnu", "x86_64-pc-windows-msvc"]);
    ctx.options.bin = Some("explore-cli".into());
    let toolchain = FakeToolchain::new(&dir.path().join("scratch"));
    let outputs = BuildExecutor::new(&ctx, &toolchain).run().unwrap();

    let dist = dir.path().join("dist");
    let paths: Vec<PathBuf> = outputs.iter().map(|o| o.path.clone()).collect();
    assert_eq!(
      paths,
      vec![
        dist.join("explore-cli.linux-x64-gnu"),
        dist.join("explore-cli.win32-x64-msvc.exe"),
      ]
    );
    assert!(outputs.iter().all(|o| o.kind == OutputKind::Exe));
    assert_eq!(
      fs::read_to_string(dist.join("explore-cli.linux-x64-gnu")).unwrap(),
      "x86_64-unknown-linux-gnu"
    );
  }

  #[test]
  fn test_several_executables_need_platform_suffix() {
    let (dir, mut ctx) = project(&["x86_64-unknown-linux-gnu", "aarch64-apple-darwin"]);
    ctx.options.bin = Some("explore-cli".into());
    ctx.options.platform = false;
    let toolchain = FakeToolchain::new(&dir.path().join("scratch"));
    let err = BuildExecutor::new(&ctx, &toolchain).run().unwrap_err();
    assert!(matches!(err, AddonError::Config(ConfigError::Invalid { .. })));
  }
}
