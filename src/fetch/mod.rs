// src/fetch/mod.rs

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument, warn};

/// Why a download did not produce a local file.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never completed: DNS, connect, timeout or a broken body stream.
    #[error("request to {url} failed: {source}")]
    Transient {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with something other than 200.
    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },

    /// The body arrived but could not be persisted.
    #[error("writing {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    /// Transient failures may succeed on a later run; status errors will not.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient { .. } | FetchError::Io { .. })
    }
}

/// Anything that can GET a URL and hand back the full body of a 200 response.
#[allow(async_fn_in_trait)]
pub trait Remote {
    async fn download(&self, url: &str) -> Result<Bytes, FetchError>;
}

impl Remote for Client {
    async fn download(&self, url: &str) -> Result<Bytes, FetchError> {
        let transient = |source: reqwest::Error| FetchError::Transient {
            url: url.to_string(),
            source,
        };
        let resp = self.get(url).send().await.map_err(transient)?;
        let status = resp.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        resp.bytes().await.map_err(transient)
    }
}

/// Outcome of a successful [`fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    /// The file was already on disk; no request was made.
    Cached(PathBuf),
    /// The file was downloaded and written.
    Downloaded { path: PathBuf, bytes: u64 },
}

impl Fetched {
    pub fn path(&self) -> &Path {
        match self {
            Fetched::Cached(path) => path,
            Fetched::Downloaded { path, .. } => path,
        }
    }

    pub fn was_downloaded(&self) -> bool {
        matches!(self, Fetched::Downloaded { .. })
    }
}

/// Download `url` to `dest` unless `dest` already exists.
///
/// Existence alone is the cache check: the content is not verified. The body is
/// written to a `.tmp` sibling and renamed into place, so `dest` only ever
/// appears once it is complete.
#[instrument(level = "info", skip(remote, dest), fields(dest = %dest.display()))]
pub async fn fetch<R: Remote>(remote: &R, url: &str, dest: &Path) -> Result<Fetched, FetchError> {
    let io = |path: &Path| {
        let path = path.to_path_buf();
        move |source: std::io::Error| FetchError::Io { path, source }
    };

    if fs::try_exists(dest).await.map_err(io(dest))? {
        info!("already exists, skipping download");
        return Ok(Fetched::Cached(dest.to_path_buf()));
    }

    info!(url, "downloading");
    let body = match remote.download(url).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "download failed");
            return Err(e);
        }
    };

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await.map_err(io(parent))?;
    }
    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, &body).await.map_err(io(&tmp))?;
    fs::rename(&tmp, dest).await.map_err(io(dest))?;

    info!(bytes = body.len(), "download complete");
    Ok(Fetched::Downloaded {
        path: dest.to_path_buf(),
        bytes: body.len() as u64,
    })
}
