//! # contract: seams between the pipeline and the outside world
//!
//! The only external collaborator of a sync run is the network. It sits
//! behind the [`Fetcher`] trait so the orchestrator can be driven by the
//! real HTTP client ([`crate::download::HttpFetcher`]) or by a mock in
//! tests.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`; with the `test-export-mocks`
//!   feature (on by default) `MockFetcher` is available to dependent crates
//!   and integration tests.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

use crate::error::FetchError;

/// Result of [`crate::download::fetch_archive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutcome {
    /// Absolute path of the archive on disk.
    pub path: PathBuf,
    /// True when an existing file was reused and nothing was transferred.
    pub skipped: bool,
}

/// Retrieves a remote resource into a local file.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Transfer `url` into `dest`, replacing any existing file. The parent
    /// directory of `dest` already exists. Returns the number of bytes written.
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, FetchError>;
}
