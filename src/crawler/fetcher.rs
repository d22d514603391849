//! Artifact fetcher
//!
//! This module downloads the binary artifact behind a catalog row:
//! - Building HTTP clients with the configured user agent and timeouts
//! - Reusing a local copy left behind by an earlier run
//! - Retry logic for transient failures
//! - Payload validation (minimum size, magic bytes)
//! - Trying several candidate links for one row

use crate::config::FetchConfig;
use reqwest::{redirect::Policy, Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Reasons an artifact could not be fetched
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} not found")]
    NotFound { url: String },

    #[error("{url} failed after {attempts} attempts: {last}")]
    Transient {
        url: String,
        attempts: u32,
        last: String,
    },

    #[error("{url} returned an invalid payload: {reason}")]
    Validation { url: String, reason: String },

    #[error("no artifact links found")]
    NoCandidates,

    #[error("all {attempted} candidate links failed; last: {last}")]
    AllCandidatesFailed {
        attempted: usize,
        last: Box<FetchError>,
    },

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl FetchError {
    /// Stable tag written in front of the failure ledger reason
    pub fn tag(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not-found",
            Self::Transient { .. } => "transient",
            Self::Validation { .. } => "validation",
            Self::NoCandidates => "no-candidates",
            Self::AllCandidatesFailed { last, .. } => last.tag(),
            Self::Io { .. } => "io",
        }
    }

    /// Failure ledger reason: tag plus message
    pub fn ledger_reason(&self) -> String {
        format!("{}: {}", self.tag(), self)
    }

    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// A fetched artifact on local disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedArtifact {
    pub path: PathBuf,
    /// URL it came from; None when an existing local copy was reused
    pub source_url: Option<String>,
    pub bytes: u64,
}

impl FetchedArtifact {
    pub fn reused_local(&self) -> bool {
        self.source_url.is_none()
    }
}

/// Checks that a payload looks like the expected artifact format
#[derive(Debug, Clone)]
pub struct PayloadValidator {
    min_bytes: usize,
    magic: Vec<u8>,
    window: usize,
}

impl PayloadValidator {
    pub fn new(min_bytes: usize, magic: &[u8], window: usize) -> Self {
        Self {
            min_bytes,
            magic: magic.to_vec(),
            window,
        }
    }

    pub fn from_config(config: &FetchConfig) -> Self {
        Self::new(config.min_bytes, config.magic.as_bytes(), config.magic_window)
    }

    /// Accepts payloads strictly longer than `min_bytes` whose magic appears
    /// at the start or anywhere within the first `window` bytes
    pub fn validate(&self, payload: &[u8]) -> Result<(), String> {
        if payload.len() <= self.min_bytes {
            return Err(format!(
                "payload is {} bytes, expected more than {}",
                payload.len(),
                self.min_bytes
            ));
        }

        if self.magic.is_empty() || payload.starts_with(&self.magic) {
            return Ok(());
        }

        let head = &payload[..payload.len().min(self.window)];
        if head
            .windows(self.magic.len())
            .any(|window| window == self.magic.as_slice())
        {
            Ok(())
        } else {
            Err(format!(
                "magic {:?} not found in the first {} bytes",
                String::from_utf8_lossy(&self.magic),
                self.window
            ))
        }
    }
}

/// Builds an HTTP client with proper configuration
///
/// Redirects are followed (artifact links commonly bounce through a
/// download handler) but bounded.
///
/// # Example
///
/// ```no_run
/// use catalog_harvester::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(
///     "catalog-harvester/1.0",
///     Duration::from_secs(60),
///     Duration::from_secs(10),
/// )
/// .unwrap();
/// ```
pub fn build_http_client(
    user_agent: &str,
    timeout: Duration,
    connect_timeout: Duration,
) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .connect_timeout(connect_timeout)
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Downloads artifacts into a local directory
///
/// # Retry Logic
///
/// | Condition | Action |
/// |-----------|--------|
/// | Local copy exists | Reuse it, no request |
/// | HTTP 404 | Fail immediately (not-found) |
/// | HTTP 2xx, invalid payload | Fail immediately (validation) |
/// | Other HTTP status | Retry after fixed delay |
/// | Timeout / transport error | Retry after fixed delay |
#[derive(Debug, Clone)]
pub struct ArtifactFetcher {
    client: Client,
    download_dir: PathBuf,
    max_attempts: u32,
    retry_delay: Duration,
    validator: PayloadValidator,
}

impl ArtifactFetcher {
    pub fn new(
        client: Client,
        download_dir: impl Into<PathBuf>,
        max_attempts: u32,
        retry_delay: Duration,
        validator: PayloadValidator,
    ) -> Self {
        Self {
            client,
            download_dir: download_dir.into(),
            max_attempts: max_attempts.max(1),
            retry_delay,
            validator,
        }
    }

    /// Builds a fetcher and its client from configuration
    pub fn from_config(config: &FetchConfig, download_dir: &Path) -> Result<Self, reqwest::Error> {
        let client = build_http_client(
            &config.user_agent,
            Duration::from_secs(config.request_timeout_secs),
            Duration::from_secs(config.connect_timeout_secs),
        )?;

        Ok(Self::new(
            client,
            download_dir,
            config.max_attempts,
            Duration::from_millis(config.retry_delay_ms),
            PayloadValidator::from_config(config),
        ))
    }

    /// Where the artifact for `identifier` is stored locally
    pub fn local_path(&self, identifier: &str) -> PathBuf {
        self.download_dir.join(identifier)
    }

    /// An existing local copy for `identifier`, if one is on disk
    pub async fn existing_local(&self, identifier: &str) -> Option<FetchedArtifact> {
        let path = self.local_path(identifier);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Some(FetchedArtifact {
                path,
                source_url: None,
                bytes: meta.len(),
            }),
            _ => None,
        }
    }

    /// Fetches one URL into the local copy for `identifier`
    pub async fn fetch(&self, url: &str, identifier: &str) -> Result<FetchedArtifact, FetchError> {
        if let Some(existing) = self.existing_local(identifier).await {
            tracing::debug!("Reusing local copy {}", existing.path.display());
            return Ok(existing);
        }

        let mut last_error = String::new();

        for attempt in 1..=self.max_attempts {
            match self.client.get(url).send().await {
                Ok(response) if response.status() == StatusCode::NOT_FOUND => {
                    return Err(FetchError::NotFound {
                        url: url.to_string(),
                    });
                }
                Ok(response) if response.status().is_success() => match response.bytes().await {
                    Ok(payload) => {
                        self.validator
                            .validate(&payload)
                            .map_err(|reason| FetchError::Validation {
                                url: url.to_string(),
                                reason,
                            })?;
                        return self.store(identifier, url, &payload).await;
                    }
                    Err(e) => last_error = describe_transport_error(&e),
                },
                Ok(response) => last_error = format!("HTTP {}", response.status().as_u16()),
                Err(e) => last_error = describe_transport_error(&e),
            }

            if attempt < self.max_attempts {
                tracing::warn!(
                    "Attempt {}/{} for {} failed ({}); retrying in {:?}",
                    attempt,
                    self.max_attempts,
                    url,
                    last_error,
                    self.retry_delay
                );
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(FetchError::Transient {
            url: url.to_string(),
            attempts: self.max_attempts,
            last: last_error,
        })
    }

    /// Tries candidate URLs in order and returns the first success
    ///
    /// Any failure, even with a single candidate, is reported as
    /// [`FetchError::AllCandidatesFailed`] so the ledger reason carries the
    /// attempted count.
    pub async fn fetch_any(
        &self,
        urls: &[String],
        identifier: &str,
    ) -> Result<FetchedArtifact, FetchError> {
        if urls.is_empty() {
            return Err(FetchError::NoCandidates);
        }

        let mut last = None;

        for (index, url) in urls.iter().enumerate() {
            match self.fetch(url, identifier).await {
                Ok(artifact) => return Ok(artifact),
                Err(e) => {
                    tracing::debug!(
                        "Candidate {}/{} for {} failed: {}",
                        index + 1,
                        urls.len(),
                        identifier,
                        e
                    );
                    last = Some(e);
                }
            }
        }

        Err(FetchError::AllCandidatesFailed {
            attempted: urls.len(),
            last: Box::new(last.unwrap_or(FetchError::NoCandidates)),
        })
    }

    /// Writes a validated payload through a partial file and renames it into place
    async fn store(
        &self,
        identifier: &str,
        url: &str,
        payload: &[u8],
    ) -> Result<FetchedArtifact, FetchError> {
        tokio::fs::create_dir_all(&self.download_dir)
            .await
            .map_err(|e| FetchError::io(&self.download_dir, e))?;

        let path = self.local_path(identifier);
        let partial = self.download_dir.join(format!(".{}.partial", identifier));
        tokio::fs::write(&partial, payload)
            .await
            .map_err(|e| FetchError::io(&partial, e))?;
        tokio::fs::rename(&partial, &path)
            .await
            .map_err(|e| FetchError::io(&path, e))?;

        tracing::debug!("Fetched {} ({} bytes) from {}", identifier, payload.len(), url);
        Ok(FetchedArtifact {
            path,
            source_url: Some(url.to_string()),
            bytes: payload.len() as u64,
        })
    }
}

fn describe_transport_error(error: &reqwest::Error) -> String {
    if error.is_timeout() {
        "request timeout".to_string()
    } else if error.is_connect() {
        "connection failed".to_string()
    } else {
        error.to_string()
    }
}
