use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::app::{NetworkError, PreprintError, Result};
use crate::config::CatalogConfig;
use crate::domain::Paper;
use crate::fetcher::Fetcher;
use crate::parser::FeedParser;
use crate::query::{IntentKind, QueryBuilder, QueryIntent};

/// Retry target for browse requests against an unreliable upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackPolicy {
    pub category: String,
}

/// Builds a request, fetches it and parses the answer.
pub struct CatalogService {
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    builder: QueryBuilder,
    parser: FeedParser,
    fallback: Option<FallbackPolicy>,
}

impl CatalogService {
    pub fn new(fetcher: Arc<dyn Fetcher + Send + Sync>, builder: QueryBuilder) -> Self {
        Self {
            fetcher,
            builder,
            parser: FeedParser::new(),
            fallback: None,
        }
    }

    pub fn from_config(fetcher: Arc<dyn Fetcher + Send + Sync>, config: &CatalogConfig) -> Self {
        let service = Self::new(fetcher, QueryBuilder::new(config.base_url.clone()));
        match &config.fallback_category {
            Some(category) => service.with_fallback(FallbackPolicy {
                category: category.clone(),
            }),
            None => service,
        }
    }

    pub fn with_fallback(mut self, policy: FallbackPolicy) -> Self {
        self.fallback = Some(policy);
        self
    }

    pub fn query_builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// One request, no retry. Fails as a whole; never returns partial results.
    pub async fn fetch(&self, intent: &QueryIntent) -> Result<Vec<Paper>> {
        let request = self.builder.build(intent)?;
        debug!("Fetching {}", request);

        let response = self.fetcher.fetch(&request).await?;
        if !response.is_success() {
            return Err(PreprintError::Network(NetworkError::Status(response.status)));
        }

        let papers = self.parser.parse(&response.body)?;
        debug!("Parsed {} papers from {}", papers.len(), request);
        Ok(papers)
    }

    /// Like [`fetch`](Self::fetch), but a latest/browse request that comes back
    /// empty or fails on the network is retried once against the fallback
    /// category. Invalid queries and parse errors are returned as-is, and
    /// free-text searches are never retried.
    pub async fn fetch_with_fallback(&self, intent: &QueryIntent) -> Result<Vec<Paper>> {
        let Some(fallback) = self.fallback_intent(intent) else {
            return self.fetch(intent).await;
        };

        match self.fetch(intent).await {
            Ok(papers) if !papers.is_empty() => Ok(papers),
            Ok(_) => {
                info!("Primary query returned nothing, retrying with fallback category");
                self.fetch(&fallback).await
            }
            Err(e) if e.is_retryable() => {
                warn!("Primary query failed ({}), retrying with fallback category", e);
                self.fetch(&fallback).await.map_err(|fallback_err| {
                    warn!("Fallback query failed too: {}", fallback_err);
                    e
                })
            }
            Err(e) => Err(e),
        }
    }

    fn fallback_intent(&self, intent: &QueryIntent) -> Option<QueryIntent> {
        let policy = self.fallback.as_ref()?;
        match &intent.kind {
            IntentKind::Latest => {}
            IntentKind::CategoryBrowse(category) if *category != policy.category => {}
            _ => return None,
        }
        Some(QueryIntent::category_browse(
            policy.category.clone(),
            intent.page_size,
        ))
    }
}
