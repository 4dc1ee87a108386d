pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;

pub use http_fetcher::HttpFetcher;

/// Raw answer from the catalog endpoint. Non-success statuses are returned
/// as data; only transport failures are errors.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, request: &str) -> Result<FetchResponse>;
}
