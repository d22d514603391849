//! HTTP object storage sink
//!
//! Objects live at `{base-url}/{key}`. Uploads are `PUT`s of the raw file and
//! removals are `DELETE`s; a 404 on delete means the object is already gone.
//! When a token environment variable is configured its value is sent as a
//! bearer token.

use crate::sink::traits::{check_key, SinkError, SinkResult, StorageSink};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Stores artifacts on an HTTP endpoint accepting PUT and DELETE
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpSink {
    pub fn new(client: Client, base_url: Url, token: Option<String>) -> Self {
        Self {
            client,
            base_url,
            token,
        }
    }

    /// Builds a sink with its own client and an optional token read from `token_env`
    pub fn from_parts(base_url: &str, token_env: Option<&str>, timeout: Duration) -> SinkResult<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| SinkError::Config(format!("invalid base-url '{}': {}", base_url, e)))?;

        let token = match token_env {
            Some(var) => Some(
                std::env::var(var).map_err(|_| SinkError::MissingToken(var.to_string()))?,
            ),
            None => None,
        };

        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self::new(client, base_url, token))
    }

    /// URL of the object stored under `key`
    pub fn object_url(&self, key: &str) -> SinkResult<Url> {
        check_key(key)?;
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| SinkError::Config(format!("base-url {} cannot hold paths", self.base_url)))?
            .pop_if_empty()
            .push(key);
        Ok(url)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl StorageSink for HttpSink {
    async fn upload(&self, local: &Path, key: &str) -> SinkResult<()> {
        let url = self.object_url(key)?;
        let body = tokio::fs::read(local)
            .await
            .map_err(|e| SinkError::io(local, e))?;

        let response = self
            .authorize(self.client.put(url))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SinkError::Status {
                key: key.to_string(),
                status: status.as_u16(),
            });
        }

        tracing::debug!("Uploaded {} ({})", key, status);
        Ok(())
    }

    async fn delete(&self, key: &str) -> SinkResult<()> {
        let url = self.object_url(key)?;
        let response = self.authorize(self.client.delete(url)).send().await?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }

        Err(SinkError::Status {
            key: key.to_string(),
            status: status.as_u16(),
        })
    }

    fn describe(&self) -> String {
        format!("http {}", self.base_url)
    }
}
