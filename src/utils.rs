//! Utility functions for path handling and file hashing

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Render `path` relative to `base` for user-facing output
///
/// Falls back to the full path when no relative form exists (different
/// drive on Windows, or a relative `path` against an absolute `base`).
pub fn display_path(path: &Path, base: &Path) -> String {
  match pathdiff::diff_paths(path, base) {
    Some(rel) if rel.as_os_str().is_empty() => ".".to_string(),
    Some(rel) => path_to_forward_slashes(&rel),
    None => path_to_forward_slashes(path),
  }
}

/// Convert a path to forward slashes (npm and git both expect them)
pub fn path_to_forward_slashes(path: &Path) -> String {
  #[cfg(target_os = "windows")]
  {
    path.to_string_lossy().replace('\\', "/")
  }
  #[cfg(not(target_os = "windows"))]
  {
    path.to_string_lossy().to_string()
  }
}

/// Hex sha256 of a file's content
pub fn sha256_file(path: &Path) -> io::Result<String> {
  let bytes = fs::read(path)?;
  let mut hasher = Sha256::new();
  hasher.update(&bytes);
  Ok(format!("{:x}", hasher.finalize()))
}

/// Write `content` only if it differs from what is on disk
///
/// Returns whether a write happened.
pub fn write_if_changed(path: &Path, content: &str) -> io::Result<bool> {
  if fs::read_to_string(path).ok().as_deref() == Some(content) {
    return Ok(false);
  }
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent)?;
  }
  fs::write(path, content)?;
  Ok(true)
}

/// Direct child directories of `dir`, sorted by name
pub fn child_dirs(dir: &Path) -> io::Result<Vec<PathBuf>> {
  let mut dirs = Vec::new();
  for entry in fs::read_dir(dir)? {
    let path = entry?.path();
    if path.is_dir() {
      dirs.push(path);
    }
  }
  dirs.sort();
  Ok(dirs)
}
