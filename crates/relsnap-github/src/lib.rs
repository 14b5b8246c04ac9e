//! relsnap GitHub - release fetcher
//!
//! - `ReleaseProvider`: one "latest release" lookup per repository
//! - `GitHubClient`: the REST implementation (`GET /repos/{owner}/{repo}/releases/latest`)
//! - `ReleaseFetcher`: parses an item's locator, calls the provider and
//!   classifies the result as `Found`, `NotFound` or `Error`

#![warn(unreachable_pub)]

pub mod client;
pub mod error;
pub mod fetcher;
pub mod provider;

pub use client::{GitHubClient, RELEASE_MEDIA_TYPE};
pub use error::FetchError;
pub use fetcher::{ReleaseFetcher, ReleaseOutcome};
pub use provider::ReleaseProvider;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
