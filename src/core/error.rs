//! Error types for cargo-addon with contextual messages and exit codes
//!
//! Every pipeline stage returns [`AddonResult`]. The variants follow the
//! failure taxonomy of the release pipeline:
//!
//! - [`ConfigError`] and [`ManifestError`] abort the run immediately
//! - [`BuildError`] aborts the run before any artifact is staged
//! - [`PublishError`] aborts the publish stage (version sync is skipped by default)
//!
//! Missing platform artifacts are warnings
//! ([`crate::npm::artifacts::ArtifactMissing`]) unless `--require-all` turns
//! them into a [`ValidationError`].

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Exit codes for cargo-addon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
  /// User error (config, manifests, invalid args)
  User = 1,
  /// System error (toolchain, network, I/O)
  System = 2,
  /// Validation failure (required artifacts missing)
  Validation = 3,
}

impl ExitCode {
  /// Convert to i32 for process exit
  pub fn as_i32(self) -> i32 {
    self as i32
  }
}

/// Main error type for cargo-addon
#[derive(Debug)]
pub enum AddonError {
  /// Configuration errors
  Config(ConfigError),

  /// External toolchain failures
  Build(BuildError),

  /// package.json / Cargo.toml problems
  Manifest(ManifestError),

  /// Registry or release host failures
  Publish(PublishError),

  /// Release preconditions not met
  Validation(ValidationError),

  /// I/O errors
  Io(io::Error),

  /// Generic error with message and optional context
  Message {
    message: String,
    context: Option<String>,
    help: Option<String>,
  },
}

impl AddonError {
  /// Create a simple error message
  pub fn message(msg: impl Into<String>) -> Self {
    AddonError::Message {
      message: msg.into(),
      context: None,
      help: None,
    }
  }

  /// Add context to an existing error
  pub fn context(self, ctx: impl Into<String>) -> Self {
    let ctx_str = ctx.into();
    match self {
      AddonError::Message { message, context, help } => AddonError::Message {
        message,
        context: Some(context.map(|c| format!("{}\n{}", ctx_str, c)).unwrap_or(ctx_str)),
        help,
      },
      AddonError::Io(e) => AddonError::Message {
        message: format!("{}: {}", ctx_str, e),
        context: None,
        help: None,
      },
      _ => self,
    }
  }

  /// Get the appropriate exit code for this error
  pub fn exit_code(&self) -> ExitCode {
    match self {
      AddonError::Config(_) => ExitCode::User,
      AddonError::Manifest(_) => ExitCode::User,
      AddonError::Build(_) => ExitCode::System,
      AddonError::Publish(_) => ExitCode::System,
      AddonError::Validation(_) => ExitCode::Validation,
      AddonError::Io(_) => ExitCode::System,
      AddonError::Message { .. } => ExitCode::User,
    }
  }

  /// Get contextual help message for this error
  pub fn help_message(&self) -> Option<String> {
    match self {
      AddonError::Config(e) => e.help_message(),
      AddonError::Build(e) => e.help_message(),
      AddonError::Manifest(e) => e.help_message(),
      AddonError::Publish(e) => e.help_message(),
      AddonError::Validation(e) => e.help_message(),
      AddonError::Message { help, .. } => help.clone(),
      AddonError::Io(_) => None,
    }
  }
}

impl fmt::Display for AddonError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      AddonError::Config(e) => write!(f, "{}", e),
      AddonError::Build(e) => write!(f, "{}", e),
      AddonError::Manifest(e) => write!(f, "{}", e),
      AddonError::Publish(e) => write!(f, "{}", e),
      AddonError::Validation(e) => write!(f, "{}", e),
      AddonError::Io(e) => write!(f, "I/O error: {}", e),
      AddonError::Message { message, context, .. } => {
        write!(f, "{}", message)?;
        if let Some(ctx) = context {
          write!(f, "\n{}", ctx)?;
        }
        Ok(())
      }
    }
  }
}

impl std::error::Error for AddonError {
  fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
    match self {
      AddonError::Io(e) => Some(e),
      _ => None,
    }
  }
}

impl From<io::Error> for AddonError {
  fn from(err: io::Error) -> Self {
    AddonError::Io(err)
  }
}

impl From<String> for AddonError {
  fn from(msg: String) -> Self {
    AddonError::message(msg)
  }
}

impl From<&str> for AddonError {
  fn from(msg: &str) -> Self {
    AddonError::message(msg)
  }
}

impl From<ConfigError> for AddonError {
  fn from(err: ConfigError) -> Self {
    AddonError::Config(err)
  }
}

impl From<BuildError> for AddonError {
  fn from(err: BuildError) -> Self {
    AddonError::Build(err)
  }
}

impl From<ManifestError> for AddonError {
  fn from(err: ManifestError) -> Self {
    AddonError::Manifest(err)
  }
}

impl From<PublishError> for AddonError {
  fn from(err: PublishError) -> Self {
    AddonError::Publish(err)
  }
}

impl From<ValidationError> for AddonError {
  fn from(err: ValidationError) -> Self {
    AddonError::Validation(err)
  }
}

impl From<toml_edit::TomlError> for AddonError {
  fn from(err: toml_edit::TomlError) -> Self {
    AddonError::message(format!("TOML parse error: {}", err))
  }
}

impl From<cargo_metadata::Error> for AddonError {
  fn from(err: cargo_metadata::Error) -> Self {
    AddonError::message(format!("Cargo metadata error: {}", err))
  }
}

impl From<serde_json::Error> for AddonError {
  fn from(err: serde_json::Error) -> Self {
    AddonError::message(format!("JSON error: {}", err))
  }
}

/// Configuration-related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
  /// Key not present in the configuration schema
  UnknownKey { key: String, source: PathBuf },

  /// Mutually exclusive flags were set together
  ConflictingFlags { flags: Vec<String> },

  /// Target triple cannot be mapped to an npm platform
  UnsupportedTarget { triple: String },

  /// Two targets map to the same platform package
  DuplicateTarget { triple: String, suffix: String },

  /// Value present but unusable
  Invalid { key: String, reason: String },
}

impl ConfigError {
  fn help_message(&self) -> Option<String> {
    match self {
      ConfigError::UnknownKey { .. } => {
        Some("Run `cargo addon config` to print every supported key with its effective value.".to_string())
      }
      ConfigError::ConflictingFlags { .. } => {
        Some("Pick a single cross toolchain: --cross-compile, --use-cross or --use-napi-cross.".to_string())
      }
      ConfigError::UnsupportedTarget { .. } => {
        Some("Use a full rustc target triple such as x86_64-unknown-linux-gnu.".to_string())
      }
      ConfigError::DuplicateTarget { .. } => Some("Remove the duplicate entry from the target list.".to_string()),
      ConfigError::Invalid { .. } => None,
    }
  }
}

impl fmt::Display for ConfigError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ConfigError::UnknownKey { key, source } => {
        write!(f, "Unknown configuration key '{}' in {}", key, source.display())
      }
      ConfigError::ConflictingFlags { flags } => {
        write!(f, "Conflicting options set together: {}", flags.join(", "))
      }
      ConfigError::UnsupportedTarget { triple } => {
        write!(f, "Unsupported target triple '{}'", triple)
      }
      ConfigError::DuplicateTarget { triple, suffix } => {
        write!(f, "Target '{}' duplicates platform package '{}'", triple, suffix)
      }
      ConfigError::Invalid { key, reason } => {
        write!(f, "Invalid value for '{}': {}", key, reason)
      }
    }
  }
}

/// External toolchain failures
#[derive(Debug)]
pub enum BuildError {
  /// Toolchain ran and failed for a target
  ToolchainFailed { target: String, reason: String },

  /// Toolchain binary could not be spawned
  ToolchainUnavailable { program: String, reason: String },

  /// Toolchain succeeded but produced no cdylib
  NoArtifact { target: String },
}

impl BuildError {
  /// Target the failure belongs to, if any
  pub fn target(&self) -> Option<&str> {
    match self {
      BuildError::ToolchainFailed { target, .. } | BuildError::NoArtifact { target } => Some(target),
      BuildError::ToolchainUnavailable { .. } => None,
    }
  }

  fn help_message(&self) -> Option<String> {
    match self {
      BuildError::ToolchainUnavailable { program, .. } => Some(match program.as_str() {
        "cargo-zigbuild" => "Install it with `cargo install cargo-zigbuild` and make sure `zig` is on PATH.".to_string(),
        "cargo-xwin" => "Install it with `cargo install cargo-xwin`.".to_string(),
        "cross" => "Install it with `cargo install cross` and make sure docker or podman is running.".to_string(),
        "cargo-watch" => "Install it with `cargo install cargo-watch`.".to_string(),
        other => format!("Make sure `{}` is installed and on PATH.", other),
      }),
      BuildError::NoArtifact { .. } => {
        Some("Set `crate-type = [\"cdylib\"]` in the [lib] section of Cargo.toml.".to_string())
      }
      BuildError::ToolchainFailed { .. } => None,
    }
  }
}

impl fmt::Display for BuildError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      BuildError::ToolchainFailed { target, reason } => {
        write!(f, "Build failed for target {}:\n{}", target, reason)
      }
      BuildError::ToolchainUnavailable { program, reason } => {
        write!(f, "Failed to run {}: {}", program, reason)
      }
      BuildError::NoArtifact { target } => {
        write!(f, "Build for target {} produced no cdylib artifact", target)
      }
    }
  }
}

/// Package manifest errors
#[derive(Debug)]
pub enum ManifestError {
  /// File could not be read or written
  Unreadable { path: PathBuf, reason: String },

  /// File content is not a valid manifest
  Malformed { path: PathBuf, reason: String },

  /// Required field absent
  MissingField { path: PathBuf, field: String },

  /// Version field is not valid semver
  InvalidVersion { path: PathBuf, version: String },
}

impl ManifestError {
  fn help_message(&self) -> Option<String> {
    match self {
      ManifestError::InvalidVersion { .. } => Some("Versions must be valid semver, e.g. 1.2.3 or 1.3.0-beta.1".to_string()),
      ManifestError::MissingField { field, .. } if field == "name" || field == "version" => {
        Some("Run `npm init` or add the field to package.json.".to_string())
      }
      _ => None,
    }
  }
}

impl fmt::Display for ManifestError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ManifestError::Unreadable { path, reason } => {
        write!(f, "Cannot access manifest {}: {}", path.display(), reason)
      }
      ManifestError::Malformed { path, reason } => {
        write!(f, "Malformed manifest {}: {}", path.display(), reason)
      }
      ManifestError::MissingField { path, field } => {
        write!(f, "Manifest {} has no '{}' field", path.display(), field)
      }
      ManifestError::InvalidVersion { path, version } => {
        write!(f, "Manifest {} has invalid version '{}'", path.display(), version)
      }
    }
  }
}

/// Registry and release host failures
#[derive(Debug)]
pub enum PublishError {
  /// `npm publish` failed for a package
  PackageFailed { package: String, reason: String },

  /// Release creation or asset upload failed
  ReleaseFailed { tag: String, reason: String },

  /// Existing release could not be resolved
  ReleaseLookup { id: String, reason: String },
}

impl PublishError {
  fn help_message(&self) -> Option<String> {
    match self {
      PublishError::PackageFailed { reason, .. } => {
        if reason.contains("E401") || reason.contains("ENEEDAUTH") {
          Some("Authenticate with `npm login` or set NODE_AUTH_TOKEN.".to_string())
        } else if reason.contains("E403") {
          Some("The version may already be published, or the token lacks publish rights.".to_string())
        } else {
          None
        }
      }
      PublishError::ReleaseFailed { .. } | PublishError::ReleaseLookup { .. } => {
        Some("Check `gh auth status` and that GITHUB_TOKEN can write releases.".to_string())
      }
    }
  }
}

impl fmt::Display for PublishError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      PublishError::PackageFailed { package, reason } => {
        write!(f, "Failed to publish {}:\n{}", package, reason)
      }
      PublishError::ReleaseFailed { tag, reason } => {
        write!(f, "Failed to create release {}:\n{}", tag, reason)
      }
      PublishError::ReleaseLookup { id, reason } => {
        write!(f, "Failed to find release {}:\n{}", id, reason)
      }
    }
  }
}

/// Release precondition failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
  /// Platform packages left without a binary under `--require-all`
  ArtifactsMissing { packages: Vec<String> },
}

impl ValidationError {
  fn help_message(&self) -> Option<String> {
    match self {
      ValidationError::ArtifactsMissing { .. } => Some(
        "Build the missing targets (or download their CI artifacts) into the artifacts directory, or drop --require-all."
          .to_string(),
      ),
    }
  }
}

impl fmt::Display for ValidationError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ValidationError::ArtifactsMissing { packages } => {
        write!(f, "No artifact found for: {}", packages.join(", "))
      }
    }
  }
}

/// Result type alias for cargo-addon
pub type AddonResult<T> = Result<T, AddonError>;

/// Helper trait to add context to Results
pub trait ResultExt<T> {
  /// Add context to an error result
  fn context(self, ctx: impl Into<String>) -> AddonResult<T>;

  /// Add context using a closure (lazy evaluation)
  fn with_context<F>(self, f: F) -> AddonResult<T>
  where
    F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
  E: Into<AddonError>,
{
  fn context(self, ctx: impl Into<String>) -> AddonResult<T> {
    self.map_err(|e| e.into().context(ctx))
  }

  fn with_context<F>(self, f: F) -> AddonResult<T>
  where
    F: FnOnce() -> String,
  {
    self.map_err(|e| e.into().context(f()))
  }
}

/// Pretty-print an error to stderr with help text
pub fn print_error(error: &AddonError) {
  eprintln!("\n❌ {}\n", error);

  if let Some(help) = error.help_message() {
    eprintln!("💡 Help: {}\n", help);
  }
}
