//! Core building blocks shared by every stage
//!
//! - **config**: build options, overrides, merge, and addon.toml
//! - **context**: resolved project context, built once per run
//! - **error**: error types with contextual help messages and exit codes
//! - **manifest**: package.json and Cargo.toml access
//! - **target**: target triples and their npm platform names

pub mod config;
pub mod context;
pub mod error;
pub mod manifest;
pub mod target;
