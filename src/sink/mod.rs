//! Durable storage sinks for ingested artifacts
//!
//! The orchestrator only sees the [`StorageSink`] trait. The configured target
//! picks the implementation:
//! - `directory`: [`DirectorySink`], a local or mounted archive directory
//! - `http`: [`HttpSink`], an object endpoint accepting PUT and DELETE
//! - `s3`: [`S3Sink`], an S3 bucket (or S3-compatible store)

mod directory;
mod http;
mod s3;
mod traits;

pub use directory::DirectorySink;
pub use http::HttpSink;
pub use s3::S3Sink;
pub use traits::{SinkError, SinkResult, StorageSink};

use crate::config::{SinkConfig, SinkTarget};
use std::time::Duration;

/// Builds the sink selected by `config.target`
pub fn build_sink(config: &SinkConfig) -> SinkResult<Box<dyn StorageSink>> {
    let sink: Box<dyn StorageSink> = match config.target {
        SinkTarget::Directory => {
            let directory = config.directory.as_deref().ok_or_else(|| {
                SinkError::Config("directory target requires a directory".to_string())
            })?;
            Box::new(DirectorySink::new(directory))
        }
        SinkTarget::Http => {
            let base_url = config.base_url.as_deref().ok_or_else(|| {
                SinkError::Config("http target requires a base-url".to_string())
            })?;
            Box::new(HttpSink::from_parts(
                base_url,
                config.token_env.as_deref(),
                Duration::from_secs(config.timeout_secs),
            )?)
        }
        SinkTarget::S3 => {
            let bucket = config
                .bucket
                .as_deref()
                .ok_or_else(|| SinkError::Config("s3 target requires a bucket".to_string()))?;
            Box::new(S3Sink::from_parts(
                bucket,
                config.region.as_deref(),
                config.endpoint_url.as_deref(),
                Duration::from_secs(config.timeout_secs),
            )?)
        }
    };

    tracing::info!("Storage sink: {}", sink.describe());
    Ok(sink)
}
