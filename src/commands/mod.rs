//! CLI commands for cargo-addon
//!
//! One module per subcommand. Every command takes `&ProjectContext`, built
//! once in main.rs, and prints either emoji status lines or `--json`.
//!
//! - **build**: compile targets, write binding and type definitions
//! - **npm_dirs**: create/refresh the platform package skeletons
//! - **artifacts**: collect `.node` files into their packages
//! - **prepublish**: update manifests, publish, create the release
//! - **version**: sync the root version into every platform package
//! - **release**: the whole pipeline
//! - **config**: print the effective configuration

pub mod args;
pub mod artifacts;
pub mod build;
pub mod config;
pub mod npm_dirs;
pub mod prepublish;
pub mod release;
pub mod version;

pub use artifacts::run_artifacts;
pub use build::run_build;
pub use config::run_config;
pub use npm_dirs::run_create_npm_dirs;
pub use prepublish::run_prepublish;
pub use release::run_release;
pub use version::run_version;
