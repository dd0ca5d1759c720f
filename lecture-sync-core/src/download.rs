use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, error, info};

use crate::contract::{FetchOutcome, Fetcher};
use crate::error::FetchError;

/// Downloads over HTTP(S) with a bounded request timeout.
///
/// The body is streamed into a temporary file next to the destination and
/// renamed into place once complete, so an interrupted transfer never leaves
/// a truncated archive behind.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| {
                error!(error = ?source, "Failed to build HTTP client");
                FetchError::Client { source }
            })?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_to(&self, url: &str, dest: &Path) -> Result<u64, FetchError> {
        info!(url = %url, dest = %dest.display(), "Fetching archive");

        let http_err = |source: reqwest::Error| FetchError::Http {
            url: url.to_string(),
            source,
        };

        let mut response = self.client.get(url).send().await.map_err(|e| {
            error!(error = ?e, url = %url, "Request failed");
            http_err(e)
        })?;

        let status = response.status();
        if !status.is_success() {
            error!(status = %status, url = %url, "Server returned error status");
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let parent = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|source| FetchError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
        let tmp_path = tmp.path().to_path_buf();
        let write_err = |source: std::io::Error| FetchError::Io {
            path: tmp_path.clone(),
            source,
        };

        let mut written: u64 = 0;
        while let Some(chunk) = response.chunk().await.map_err(http_err)? {
            tmp.write_all(&chunk).map_err(write_err)?;
            written += chunk.len() as u64;
        }
        tmp.flush().map_err(write_err)?;
        tmp.persist(dest).map_err(|e| FetchError::Io {
            path: dest.to_path_buf(),
            source: e.error,
        })?;

        info!(url = %url, bytes = written, dest = %dest.display(), "Archive downloaded");
        Ok(written)
    }
}

/// Makes sure `destination` holds the archive at `url`.
///
/// An existing file is reused as-is unless `overwrite` is set; the returned
/// path is always absolute.
pub async fn fetch_archive<F>(
    fetcher: &F,
    url: &str,
    destination: &Path,
    overwrite: bool,
) -> Result<FetchOutcome, FetchError>
where
    F: Fetcher + ?Sized,
{
    let path = absolute(destination)?;

    if path.exists() && !overwrite {
        info!(
            path = %path.display(),
            "Archive already exists, skip downloading. Set overwrite to fetch it again."
        );
        return Ok(FetchOutcome {
            path,
            skipped: true,
        });
    }

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|source| {
                error!(error = ?source, path = %parent.display(), "Failed to create download directory");
                FetchError::Io {
                    path: parent.to_path_buf(),
                    source,
                }
            })?;
            debug!(path = %parent.display(), "Created download directory");
        }
    }

    fetcher.fetch_to(url, &path).await?;
    Ok(FetchOutcome {
        path,
        skipped: false,
    })
}

fn absolute(path: &Path) -> Result<PathBuf, FetchError> {
    std::path::absolute(path).map_err(|source| FetchError::Io {
        path: path.to_path_buf(),
        source,
    })
}
