//! package.json and Cargo.toml access
//!
//! package.json files are handled as ordered JSON objects so fields this tool
//! does not know about survive every rewrite untouched. Writes are skipped
//! when the serialized content is unchanged, which keeps every stage that
//! touches manifests idempotent.

use crate::core::error::ManifestError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use similar::TextDiff;
use std::fs;
use std::path::{Path, PathBuf};

/// The `napi` block of the root package.json
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NapiConfig {
  /// Binary file stem (`<binaryName>.<suffix>.node`)
  #[serde(default)]
  pub binary_name: Option<String>,
  /// Prefix for platform package names (default: root package name)
  #[serde(default)]
  pub package_name: Option<String>,
  #[serde(default)]
  pub targets: Vec<String>,
}

/// A package.json loaded into memory
#[derive(Debug, Clone, PartialEq)]
pub struct PackageManifest {
  path: PathBuf,
  fields: Map<String, Value>,
}

impl PackageManifest {
  /// Read and parse a package.json
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = fs::read_to_string(path).map_err(|e| ManifestError::Unreadable {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })?;
    Self::parse(path, &content)
  }

  /// Parse package.json text
  pub fn parse(path: &Path, content: &str) -> Result<Self, ManifestError> {
    let value: Value = serde_json::from_str(content).map_err(|e| ManifestError::Malformed {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })?;
    match value {
      Value::Object(fields) => Ok(Self {
        path: path.to_path_buf(),
        fields,
      }),
      _ => Err(ManifestError::Malformed {
        path: path.to_path_buf(),
        reason: "top-level value must be an object".to_string(),
      }),
    }
  }

  /// Empty manifest that will be written to `path`
  pub fn new(path: &Path) -> Self {
    Self {
      path: path.to_path_buf(),
      fields: Map::new(),
    }
  }

  fn required_str(&self, field: &str) -> Result<&str, ManifestError> {
    self
      .fields
      .get(field)
      .and_then(Value::as_str)
      .ok_or_else(|| ManifestError::MissingField {
        path: self.path.clone(),
        field: field.to_string(),
      })
  }

  pub fn name(&self) -> Result<&str, ManifestError> {
    self.required_str("name")
  }

  pub fn version(&self) -> Result<&str, ManifestError> {
    self.required_str("version")
  }

  /// Version parsed as semver
  pub fn semver(&self) -> Result<semver::Version, ManifestError> {
    let version = self.version()?;
    parse_version(&self.path, version)
  }

  /// `napi` block, or defaults when absent
  pub fn napi(&self) -> Result<NapiConfig, ManifestError> {
    match self.fields.get("napi") {
      Some(value) => serde_json::from_value(value.clone()).map_err(|e| ManifestError::Malformed {
        path: self.path.clone(),
        reason: format!("invalid napi block: {}", e),
      }),
      None => Ok(NapiConfig::default()),
    }
  }

  pub fn get(&self, key: &str) -> Option<&Value> {
    self.fields.get(key)
  }

  /// Set a top-level field, keeping its position if it already exists
  pub fn set(&mut self, key: &str, value: impl Into<Value>) {
    self.fields.insert(key.to_string(), value.into());
  }

  pub fn remove(&mut self, key: &str) -> Option<Value> {
    self.fields.shift_remove(key)
  }

  /// Pretty JSON with a trailing newline, the way npm writes it
  pub fn render(&self) -> String {
    let mut out = serde_json::to_string_pretty(&Value::Object(self.fields.clone())).unwrap_or_default();
    out.push('\n');
    out
  }

  /// Content currently on disk, if any
  fn on_disk(&self) -> Option<String> {
    fs::read_to_string(&self.path).ok()
  }

  /// Diff between the file on disk and the in-memory manifest
  pub fn diff(&self) -> ManifestDiff {
    ManifestDiff {
      path: self.path.clone(),
      before: self.on_disk().unwrap_or_default(),
      after: self.render(),
    }
  }

  /// Write to disk if content changed. Returns whether a write happened.
  pub fn save(&self) -> Result<bool, ManifestError> {
    let rendered = self.render();
    if self.on_disk().as_deref() == Some(rendered.as_str()) {
      return Ok(false);
    }
    if let Some(parent) = self.path.parent() {
      fs::create_dir_all(parent).map_err(|e| ManifestError::Unreadable {
        path: parent.to_path_buf(),
        reason: e.to_string(),
      })?;
    }
    fs::write(&self.path, rendered).map_err(|e| ManifestError::Unreadable {
      path: self.path.clone(),
      reason: e.to_string(),
    })?;
    tracing::debug!(path = %self.path.display(), "wrote manifest");
    Ok(true)
  }
}

/// Parse a version string, attributing failures to `path`
pub fn parse_version(path: &Path, version: &str) -> Result<semver::Version, ManifestError> {
  semver::Version::parse(version).map_err(|_| ManifestError::InvalidVersion {
    path: path.to_path_buf(),
    version: version.to_string(),
  })
}

/// A computed manifest change, reported by dry runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestDiff {
  pub path: PathBuf,
  pub before: String,
  pub after: String,
}

impl ManifestDiff {
  pub fn is_empty(&self) -> bool {
    self.before == self.after
  }

  /// Unified diff text
  pub fn unified(&self) -> String {
    let path = self.path.display().to_string();
    TextDiff::from_lines(&self.before, &self.after)
      .unified_diff()
      .context_radius(2)
      .header(&path, &path)
      .to_string()
  }
}

/// The pieces of Cargo.toml the build needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrateManifest {
  pub package_name: String,
  /// `[lib] name`, or the package name with dashes replaced
  pub lib_name: String,
}

impl CrateManifest {
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = fs::read_to_string(path).map_err(|e| ManifestError::Unreadable {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })?;
    let doc: toml_edit::DocumentMut = content.parse().map_err(|e: toml_edit::TomlError| ManifestError::Malformed {
      path: path.to_path_buf(),
      reason: e.to_string(),
    })?;

    let package_name = doc
      .get("package")
      .and_then(|p| p.get("name"))
      .and_then(|n| n.as_str())
      .ok_or_else(|| ManifestError::MissingField {
        path: path.to_path_buf(),
        field: "package.name".to_string(),
      })?
      .to_string();

    let lib_name = doc
      .get("lib")
      .and_then(|l| l.get("name"))
      .and_then(|n| n.as_str())
      .map(str::to_string)
      .unwrap_or_else(|| package_name.replace('-', "_"));

    Ok(Self { package_name, lib_name })
  }
}
