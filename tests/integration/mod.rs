//! Integration tests for cargo-addon
//!
//! Every test drives the real binary against a temporary npm project. None
//! of them needs cargo, npm or gh on PATH: builds are not run and publishing
//! is exercised in dry-run mode only.

mod helpers;
mod test_artifacts;
mod test_config;
mod test_npm_dirs;
mod test_prepublish;
mod test_version;
