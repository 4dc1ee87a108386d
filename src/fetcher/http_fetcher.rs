use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::app::{NetworkError, PreprintError, Result};
use crate::config::CatalogConfig;
use crate::fetcher::{FetchResponse, Fetcher};

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| {
                PreprintError::Network(NetworkError::Transport(format!(
                    "failed to build HTTP client: {}",
                    e
                )))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, request: &str) -> Result<FetchResponse> {
        let response = self.client.get(request).send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!("GET {} -> {} ({} bytes)", request, status, body.len());

        Ok(FetchResponse { status, body })
    }
}
