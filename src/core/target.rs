//! Rust target triples mapped onto npm platform identifiers
//!
//! A platform package is keyed by the `platform-arch[-abi]` suffix derived
//! from its triple, e.g. `x86_64-unknown-linux-gnu` → `linux-x64-gnu`. The
//! suffix is embedded in binary file names (`addon.linux-x64-gnu.node`) and
//! package names (`@scope/addon-linux-x64-gnu`).

use crate::core::error::ConfigError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Triples built when neither the config nor package.json names any
pub const DEFAULT_TARGETS: &[&str] = &[
  "x86_64-apple-darwin",
  "aarch64-apple-darwin",
  "x86_64-pc-windows-msvc",
  "aarch64-pc-windows-msvc",
  "x86_64-unknown-linux-gnu",
  "aarch64-unknown-linux-gnu",
  "x86_64-unknown-linux-musl",
  "aarch64-unknown-linux-musl",
];

/// A parsed target triple with its npm `os`/`cpu` equivalents
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct TargetTriple {
  /// Original rustc triple
  pub triple: String,
  /// npm `os` value (darwin, linux, win32, ...)
  pub platform: String,
  /// npm `cpu` value (x64, arm64, ...)
  pub arch: String,
  /// ABI component, if the triple has one
  pub abi: Option<String>,
}

impl TargetTriple {
  /// Parse a rustc target triple
  pub fn parse(raw: &str) -> Result<Self, ConfigError> {
    let unsupported = || ConfigError::UnsupportedTarget {
      triple: raw.to_string(),
    };

    // `armv7-linux-androideabi` carries its ABI glued to the OS
    let normalized = match raw.strip_suffix("androideabi") {
      Some(head) => format!("{}android-eabi", head),
      None => raw.to_string(),
    };
    let parts: Vec<&str> = normalized.split('-').collect();

    let (cpu, sys, abi) = match parts.as_slice() {
      [cpu, sys] => (*cpu, *sys, None),
      [cpu, "linux", "android"] => (*cpu, "android", None),
      [cpu, _vendor, sys] => (*cpu, *sys, None),
      [cpu, _vendor, sys, abi] => (*cpu, *sys, Some(abi.to_string())),
      _ => return Err(unsupported()),
    };

    let platform = match sys {
      "linux" => "linux",
      "windows" => "win32",
      "darwin" => "darwin",
      "freebsd" => "freebsd",
      "android" => "android",
      _ => return Err(unsupported()),
    };

    let arch = match cpu {
      "x86_64" => "x64",
      "aarch64" => "arm64",
      "i686" => "ia32",
      "armv7" => "arm",
      "riscv64gc" => "riscv64",
      "powerpc64le" => "ppc64",
      "s390x" => "s390x",
      "loongarch64" => "loong64",
      _ => return Err(unsupported()),
    };

    Ok(Self {
      triple: raw.to_string(),
      platform: platform.to_string(),
      arch: arch.to_string(),
      abi,
    })
  }

  /// `platform-arch[-abi]`, the per-package key
  pub fn platform_arch_abi(&self) -> String {
    match &self.abi {
      Some(abi) => format!("{}-{}-{}", self.platform, self.arch, abi),
      None => format!("{}-{}", self.platform, self.arch),
    }
  }

  /// npm `libc` constraint for Linux gnu/musl targets
  pub fn libc(&self) -> Option<&'static str> {
    if self.platform != "linux" {
      return None;
    }
    match self.abi.as_deref() {
      Some(abi) if abi.starts_with("gnu") => Some("glibc"),
      Some(abi) if abi.starts_with("musl") => Some("musl"),
      _ => None,
    }
  }

  /// Whether cargo-xwin is the right cross wrapper for this triple
  pub fn is_windows_msvc(&self) -> bool {
    self.platform == "win32" && self.abi.as_deref() == Some("msvc")
  }

  /// GNU cross-compiler prefix (`aarch64-linux-gnu`) for linux gnu targets
  pub fn gnu_cross_prefix(&self) -> Option<String> {
    if self.platform != "linux" {
      return None;
    }
    let cpu = self.triple.split('-').next()?;
    match (cpu, self.abi.as_deref()) {
      ("x86_64" | "aarch64", Some("gnu")) => Some(format!("{}-linux-gnu", cpu)),
      ("armv7", Some("gnueabihf")) => Some("arm-linux-gnueabihf".to_string()),
      _ => None,
    }
  }
}

impl FromStr for TargetTriple {
  type Err = ConfigError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::parse(s)
  }
}

impl fmt::Display for TargetTriple {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.triple)
  }
}

/// Parse a list of triples, rejecting any two that share a platform package
pub fn parse_unique<S: AsRef<str>>(triples: &[S]) -> Result<Vec<TargetTriple>, ConfigError> {
  let mut parsed: Vec<TargetTriple> = Vec::with_capacity(triples.len());
  for raw in triples {
    let triple = TargetTriple::parse(raw.as_ref())?;
    let suffix = triple.platform_arch_abi();
    if parsed.iter().any(|t| t.platform_arch_abi() == suffix) {
      return Err(ConfigError::DuplicateTarget {
        triple: triple.triple,
        suffix,
      });
    }
    parsed.push(triple);
  }
  Ok(parsed)
}

/// Default target table, parsed
pub fn default_targets() -> Vec<TargetTriple> {
  DEFAULT_TARGETS
    .iter()
    .filter_map(|t| TargetTriple::parse(t).ok())
    .collect()
}
