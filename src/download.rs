//! Download of QPM archives.
//!
//! CI artifact archives require the workflow token; release assets are
//! public. The trait lets tests stage archives without network access.

use crate::http::{USER_AGENT, transfer_agent};
use log::debug;
use std::path::Path;

/// Downloads a URL to a local file.
///
/// # Examples
///
/// ```
/// use qpm_action::download::HttpDownloader;
///
/// let downloader = HttpDownloader::new(Some("ghp_example".to_owned()));
/// // downloader.download(url, true, dest) in production
/// # let _ = downloader;
/// ```
#[cfg_attr(test, mockall::automock)]
pub trait ToolDownloader {
    /// Download `url` into `dest`, sending the token when `authenticated`.
    ///
    /// # Errors
    ///
    /// Returns [`DownloadError::NotFound`] on HTTP 404 and
    /// [`DownloadError::HttpError`] or [`DownloadError::Io`] otherwise.
    fn download(&self, url: &str, authenticated: bool, dest: &Path) -> Result<(), DownloadError>;
}

/// Errors arising from downloads.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// HTTP request failed.
    #[error("download failed for {url}: {reason}")]
    HttpError {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The archive was not found (HTTP 404), e.g. an expired artifact.
    #[error("archive not found: {url}")]
    NotFound {
        /// The URL that returned 404.
        url: String,
    },

    /// I/O error writing the downloaded file.
    #[error("I/O error writing download: {0}")]
    Io(#[from] std::io::Error),
}

/// HTTP downloader using the shared transfer agent.
pub struct HttpDownloader {
    token: Option<String>,
}

impl HttpDownloader {
    /// Create a downloader that authenticates with `token` when asked to.
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl ToolDownloader for HttpDownloader {
    fn download(&self, url: &str, authenticated: bool, dest: &Path) -> Result<(), DownloadError> {
        debug!("downloading {url} to {}", dest.display());
        let mut request = transfer_agent().get(url).header("User-Agent", USER_AGENT);
        if let Some(token) = self.token.as_deref().filter(|_| authenticated) {
            request = request.header("Authorization", format!("Bearer {token}"));
        }
        let response = request.call().map_err(|e| map_ureq_error(url, &e))?;
        let mut file = std::fs::File::create(dest)?;
        std::io::copy(&mut response.into_body().as_reader(), &mut file)?;
        Ok(())
    }
}

/// Map a ureq error to a [`DownloadError`].
fn map_ureq_error(url: &str, err: &ureq::Error) -> DownloadError {
    match err {
        ureq::Error::StatusCode(404) => DownloadError::NotFound {
            url: url.to_owned(),
        },
        other => DownloadError::HttpError {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}
