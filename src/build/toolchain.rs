//! External compiler toolchain
//!
//! The orchestration core never spawns cargo directly; it goes through the
//! [`Toolchain`] trait so tests can substitute a fake. [`CargoToolchain`] is
//! the real implementation: it assembles the command line for the selected
//! [`CrossMode`] and reads cargo's JSON messages to find the produced library.

use crate::core::config::{BuildOptions, CrossMode};
use crate::core::error::{AddonError, AddonResult, BuildError};
use crate::core::target::TargetTriple;
use cargo_metadata::Message;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Environment variable the addon's proc-macros write type definitions to
pub const TYPE_DEF_ENV: &str = "TYPE_DEF_TMP_PATH";

/// One target's compilation request
#[derive(Debug, Clone)]
pub struct CompileRequest<'a> {
  pub options: &'a BuildOptions,
  pub target: &'a TargetTriple,
  pub mode: CrossMode,
  /// Where intermediate type definitions are written
  pub type_def_file: PathBuf,
}

/// What a successful compile produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledArtifact {
  /// cdylib (`.so` / `.dylib` / `.dll`)
  Library(PathBuf),
  /// `--bin` executable
  Executable(PathBuf),
}

impl CompiledArtifact {
  pub fn path(&self) -> &Path {
    match self {
      CompiledArtifact::Library(p) | CompiledArtifact::Executable(p) => p,
    }
  }
}

/// Capability set of the external build toolchain
pub trait Toolchain: Sync {
  /// Triple of the machine running the build
  fn host_triple(&self) -> AddonResult<String>;

  /// Compile one target to completion
  fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledArtifact, BuildError>;

  /// Rebuild on change until interrupted
  fn watch(&self, request: &CompileRequest<'_>) -> Result<(), BuildError>;
}

/// A fully assembled process invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
  pub program: String,
  pub args: Vec<String>,
  pub env: Vec<(String, String)>,
  pub cwd: PathBuf,
}

impl CommandSpec {
  fn to_command(&self) -> Command {
    let mut cmd = Command::new(&self.program);
    cmd.args(&self.args).current_dir(&self.cwd);
    for (key, value) in &self.env {
      cmd.env(key, value);
    }
    cmd
  }

  /// Printable form for logs
  pub fn display(&self) -> String {
    let mut parts: Vec<String> = self.env.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
    parts.push(self.program.clone());
    parts.extend(self.args.iter().cloned());
    parts.join(" ")
  }
}

/// Program + subcommand for a cross mode and target
fn driver(mode: CrossMode, target: &TargetTriple) -> (&'static str, Vec<&'static str>) {
  match mode {
    CrossMode::None | CrossMode::NapiCross => ("cargo", vec!["build"]),
    CrossMode::CrossCompile if target.is_windows_msvc() => ("cargo", vec!["xwin", "build"]),
    CrossMode::CrossCompile => ("cargo", vec!["zigbuild"]),
    CrossMode::Cross => ("cross", vec!["build"]),
  }
}

/// Name a cargo subcommand plugin is installed under
fn plugin_program(mode: CrossMode, target: &TargetTriple) -> &'static str {
  match driver(mode, target) {
    ("cargo", sub) if sub.first() == Some(&"xwin") => "cargo-xwin",
    ("cargo", sub) if sub.first() == Some(&"zigbuild") => "cargo-zigbuild",
    ("cross", _) => "cross",
    _ => "cargo",
  }
}

/// `CARGO_TARGET_X86_64_UNKNOWN_LINUX_GNU_LINKER` style env key
fn target_env_key(triple: &str, suffix: &str) -> String {
  format!("CARGO_TARGET_{}_{}", triple.to_uppercase().replace('-', "_"), suffix)
}

/// Assemble the build command for one target
pub fn compile_command(request: &CompileRequest<'_>) -> CommandSpec {
  let opts = request.options;
  let (program, sub) = driver(request.mode, request.target);
  let mut args: Vec<String> = sub.iter().map(|s| s.to_string()).collect();

  args.push("--target".to_string());
  args.push(request.target.triple.clone());
  args.push("--manifest-path".to_string());
  args.push(opts.resolve(&opts.manifest_path).to_string_lossy().to_string());
  args.push("--message-format=json-render-diagnostics".to_string());

  if let Some(dir) = &opts.target_dir {
    args.push("--target-dir".to_string());
    args.push(opts.resolve(dir).to_string_lossy().to_string());
  }
  // --profile and --release are mutually exclusive in cargo
  match &opts.profile {
    Some(profile) => {
      args.push("--profile".to_string());
      args.push(profile.clone());
    }
    None if opts.release => args.push("--release".to_string()),
    None => {}
  }
  if let Some(bin) = &opts.bin {
    args.push("--bin".to_string());
    args.push(bin.clone());
  }
  if let Some(package) = &opts.package {
    args.push("--package".to_string());
    args.push(package.clone());
  }
  if !opts.features.list.is_empty() {
    args.push("--features".to_string());
    args.push(opts.features.list.join(","));
  }
  if opts.features.all {
    args.push("--all-features".to_string());
  }
  if opts.features.no_default {
    args.push("--no-default-features".to_string());
  }
  if opts.verbose {
    args.push("--verbose".to_string());
  }
  args.extend(opts.cargo_options.iter().cloned());

  let mut env = vec![(
    TYPE_DEF_ENV.to_string(),
    request.type_def_file.to_string_lossy().to_string(),
  )];
  if opts.strip {
    let profile = match &opts.profile {
      Some(p) => p.clone(),
      None if opts.release => "release".to_string(),
      None => "dev".to_string(),
    };
    env.push((
      format!("CARGO_PROFILE_{}_STRIP", profile.to_uppercase().replace('-', "_")),
      "symbols".to_string(),
    ));
  }
  if request.mode == CrossMode::NapiCross
    && let Some(prefix) = request.target.gnu_cross_prefix()
  {
    let cc_key = request.target.triple.replace('-', "_");
    env.push((target_env_key(&request.target.triple, "LINKER"), format!("{}-gcc", prefix)));
    env.push((format!("CC_{}", cc_key), format!("{}-gcc", prefix)));
    env.push((format!("CXX_{}", cc_key), format!("{}-g++", prefix)));
  }

  CommandSpec {
    program: program.to_string(),
    args,
    env,
    cwd: opts.cwd.clone(),
  }
}

/// Wrap a build command for cargo-watch
pub fn watch_command(build: &CommandSpec) -> CommandSpec {
  let joined = build.args.join(" ");
  let mut args: Vec<String> = vec![
    "watch".to_string(),
    "--why".to_string(),
    "-i".to_string(),
    "*.{js,ts,node}".to_string(),
  ];
  if build.program == "cargo" {
    args.push("-x".to_string());
    args.push(joined);
  } else {
    args.push("-s".to_string());
    args.push(format!("{} {}", build.program, joined));
  }
  CommandSpec {
    program: "cargo".to_string(),
    args,
    env: build.env.clone(),
    cwd: build.cwd.clone(),
  }
}

/// Find the produced library (or executable) in cargo's JSON output
fn find_artifact(stdout: &[u8], want_bin: Option<&str>) -> Option<CompiledArtifact> {
  let mut found = None;
  for message in Message::parse_stream(stdout).flatten() {
    let Message::CompilerArtifact(artifact) = message else {
      continue;
    };
    match want_bin {
      Some(bin) if artifact.target.is_bin() && artifact.target.name == bin => {
        if let Some(exe) = artifact.executable {
          found = Some(CompiledArtifact::Executable(exe.into_std_path_buf()));
        }
      }
      None if artifact.target.is_cdylib() => {
        let lib = artifact.filenames.into_iter().find(|f| {
          matches!(f.extension(), Some("so") | Some("dylib") | Some("dll"))
        });
        if let Some(lib) = lib {
          found = Some(CompiledArtifact::Library(lib.into_std_path_buf()));
        }
      }
      _ => {}
    }
  }
  found
}

/// Last lines of stderr, enough to show the failing diagnostic
fn stderr_tail(stderr: &[u8]) -> String {
  let text = String::from_utf8_lossy(stderr);
  let lines: Vec<&str> = text.lines().collect();
  let start = lines.len().saturating_sub(40);
  lines[start..].join("\n")
}

/// Host triple from `rustc -vV` output
fn host_from_version_info(success: bool, stdout: &[u8], stderr: &[u8]) -> AddonResult<String> {
  if !success {
    return Err(AddonError::Build(BuildError::ToolchainUnavailable {
      program: "rustc".to_string(),
      reason: stderr_tail(stderr),
    }));
  }
  String::from_utf8_lossy(stdout)
    .lines()
    .find_map(|line| line.strip_prefix("host: "))
    .map(|h| h.trim().to_string())
    .ok_or_else(|| AddonError::message("Could not determine host triple from `rustc -vV`"))
}

/// Real toolchain: cargo and its cross wrappers
#[derive(Debug, Default, Clone, Copy)]
pub struct CargoToolchain;

impl CargoToolchain {
  fn spawn_error(program: &str, err: io::Error) -> BuildError {
    BuildError::ToolchainUnavailable {
      program: program.to_string(),
      reason: err.to_string(),
    }
  }
}

impl Toolchain for CargoToolchain {
  fn host_triple(&self) -> AddonResult<String> {
    let output = Command::new("rustc")
      .arg("-vV")
      .output()
      .map_err(|e| AddonError::Build(Self::spawn_error("rustc", e)))?;
    host_from_version_info(output.status.success(), &output.stdout, &output.stderr)
  }

  fn compile(&self, request: &CompileRequest<'_>) -> Result<CompiledArtifact, BuildError> {
    let cmd = compile_command(request);
    let target = request.target.triple.clone();
    tracing::debug!(command = %cmd.display(), "running toolchain");

    let output = cmd
      .to_command()
      .stdin(Stdio::null())
      .output()
      .map_err(|e| Self::spawn_error(&cmd.program, e))?;

    if !output.status.success() {
      let stderr = stderr_tail(&output.stderr);
      if stderr.contains("no such command") {
        return Err(BuildError::ToolchainUnavailable {
          program: plugin_program(request.mode, request.target).to_string(),
          reason: stderr,
        });
      }
      return Err(BuildError::ToolchainFailed { target, reason: stderr });
    }

    find_artifact(&output.stdout, request.options.bin.as_deref()).ok_or(BuildError::NoArtifact { target })
  }

  fn watch(&self, request: &CompileRequest<'_>) -> Result<(), BuildError> {
    let cmd = watch_command(&compile_command(request));
    tracing::info!(command = %cmd.display(), "watching for changes");

    let status = cmd
      .to_command()
      .stdin(Stdio::inherit())
      .stdout(Stdio::inherit())
      .stderr(Stdio::inherit())
      .status()
      .map_err(|e| Self::spawn_error("cargo-watch", e))?;

    if status.success() {
      Ok(())
    } else {
      Err(BuildError::ToolchainFailed {
        target: request.target.triple.clone(),
        reason: format!("cargo watch exited with {}", status),
      })
    }
  }
}
