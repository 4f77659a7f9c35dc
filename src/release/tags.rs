//! Release tag naming
//!
//! Two conventions are supported:
//! - `npm`: `v1.2.3` (single-package repos, what `npm version` creates)
//! - `lerna`: `@scope/pkg@1.2.3` (monorepos, what `lerna version` creates)

use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tag naming convention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TagStyle {
  #[default]
  Npm,
  Lerna,
}

impl fmt::Display for TagStyle {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      TagStyle::Npm => f.write_str("npm"),
      TagStyle::Lerna => f.write_str("lerna"),
    }
  }
}

impl TagStyle {
  /// Tag name for `package_name` at `version`
  pub fn format(self, package_name: &str, version: &Version) -> String {
    match self {
      TagStyle::Npm => format!("v{}", version),
      TagStyle::Lerna => format!("{}@{}", package_name, version),
    }
  }
}

/// A release tag split into its parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseTag {
  /// Package name, empty for `v1.2.3` tags
  pub package_name: String,
  pub version: Version,
  pub tag_name: String,
}

impl ReleaseTag {
  /// Parse a tag in either convention
  ///
  /// - `@scope/pkg@1.2.3` / `pkg@1.2.3` (lerna)
  /// - `v1.2.3` (npm)
  pub fn parse(tag_name: &str) -> Option<Self> {
    // rsplit so the scope's leading '@' stays with the name
    if let Some((name, version_str)) = tag_name.rsplit_once('@')
      && !name.is_empty()
      && let Ok(version) = version_str.parse::<Version>()
    {
      return Some(Self {
        package_name: name.to_string(),
        version,
        tag_name: tag_name.to_string(),
      });
    }

    if let Some(version_str) = tag_name.strip_prefix('v')
      && let Ok(version) = version_str.parse::<Version>()
    {
      return Some(Self {
        package_name: String::new(),
        version,
        tag_name: tag_name.to_string(),
      });
    }

    None
  }
}

/// npm dist-tag for a version: the first prerelease identifier, if any
///
/// `1.2.0-beta.3` → `beta`, `1.2.0` → None (npm uses `latest`).
pub fn dist_tag(version: &Version) -> Option<String> {
  if version.pre.is_empty() {
    return None;
  }
  let first = version.pre.as_str().split('.').next().unwrap_or_default();
  if first.is_empty() || first.chars().all(|c| c.is_ascii_digit()) {
    Some("next".to_string())
  } else {
    Some(first.to_string())
  }
}
