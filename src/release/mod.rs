//! Release: manifest mutation, publishing and release tags
//!
//! - **publish**: PublishCoordinator and the release-time [`publish::PublishManifest`]
//! - **publisher**: `npm publish` / `gh release` behind the [`publisher::Publisher`] trait
//! - **tags**: npm and lerna tag naming, dist-tags for prereleases

pub mod publish;
pub mod publisher;
pub mod tags;
