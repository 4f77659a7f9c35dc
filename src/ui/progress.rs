//! Progress indicators for long-running operations
//!
//! Uses `linya` for allocation-free, concurrency-optimized progress bars.
//! One bar per target while builds run on the rayon pool.

use linya::{Bar, Progress};
use std::sync::{Arc, Mutex};

/// Multi-bar progress for parallel target builds
/// Thread-safe wrapper for concurrent progress tracking
#[derive(Clone)]
pub struct BuildProgress {
  progress: Arc<Mutex<Progress>>,
  enabled: bool,
}

impl BuildProgress {
  /// Bars are only drawn when more than one target builds
  pub fn new(targets: usize) -> Self {
    Self {
      progress: Arc::new(Mutex::new(Progress::new())),
      enabled: targets > 1,
    }
  }

  /// Add a bar for one target
  pub fn add_bar(&self, label: impl Into<String>) -> Option<Bar> {
    if !self.enabled {
      return None;
    }
    let mut progress = self.progress.lock().ok()?;
    Some(progress.bar(1, label.into()))
  }

  /// Mark a target finished (thread-safe)
  pub fn finish(&self, bar: Option<&Bar>) {
    if let Some(bar) = bar
      && let Ok(mut progress) = self.progress.lock()
    {
      progress.inc_and_draw(bar, 1);
    }
  }
}
