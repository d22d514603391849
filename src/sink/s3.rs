//! Amazon S3 storage sink
//!
//! Objects are stored in one bucket keyed by artifact identifier. Credentials
//! come from the standard `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY`
//! (and optional `AWS_SESSION_TOKEN`) environment variables. The region comes
//! from the configuration or `AWS_REGION`. An `endpoint-url` points the sink
//! at an S3-compatible store and switches to path-style addressing.

use crate::sink::traits::{check_key, SinkError, SinkResult, StorageSink};
use async_trait::async_trait;
use aws_config::environment::credentials::EnvironmentVariableCredentialsProvider;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use std::path::Path;
use std::time::Duration;

/// Stores artifacts as objects in an S3 bucket
#[derive(Debug, Clone)]
pub struct S3Sink {
    client: Client,
    bucket: String,
}

impl S3Sink {
    pub fn new(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Builds a client from the environment credentials and the given region
    pub fn from_parts(
        bucket: &str,
        region: Option<&str>,
        endpoint_url: Option<&str>,
        timeout: Duration,
    ) -> SinkResult<Self> {
        if std::env::var_os("AWS_ACCESS_KEY_ID").is_none() {
            return Err(SinkError::MissingToken("AWS_ACCESS_KEY_ID".to_string()));
        }

        let region = region
            .map(str::to_string)
            .or_else(|| std::env::var("AWS_REGION").ok())
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| {
                SinkError::Config("s3 target requires a region or AWS_REGION".to_string())
            })?;

        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region))
            .credentials_provider(EnvironmentVariableCredentialsProvider::new())
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
        if let Some(endpoint) = endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(Self::new(Client::from_conf(builder.build()), bucket))
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

fn s3_error(key: &str, error: impl std::error::Error + 'static) -> SinkError {
    SinkError::S3 {
        key: key.to_string(),
        message: DisplayErrorContext(error).to_string(),
    }
}

#[async_trait]
impl StorageSink for S3Sink {
    async fn upload(&self, local: &Path, key: &str) -> SinkResult<()> {
        check_key(key)?;
        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| SinkError::io(local, std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/octet-stream")
            .body(body)
            .send()
            .await
            .map_err(|e| s3_error(key, e))?;

        tracing::debug!("Uploaded {} to s3://{}", key, self.bucket);
        Ok(())
    }

    async fn delete(&self, key: &str) -> SinkResult<()> {
        check_key(key)?;
        // S3 answers 204 whether or not the object existed
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| s3_error(key, e))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("s3 bucket {}", self.bucket)
    }
}
