use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{PreprintError, Result};
use crate::catalog::CatalogService;
use crate::config::Config;
use crate::coordinator::{CoordinatorOptions, ViewCoordinator};
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::store::sqlite::SqliteStore;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub catalog: Arc<CatalogService>,
    pub coordinator: Arc<ViewCoordinator>,
}

impl AppContext {
    pub fn new(config: &Config, db_path: Option<PathBuf>) -> Result<Self> {
        let db_path = match db_path {
            Some(p) => p,
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: &Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: &Config, store: Arc<SqliteStore>) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::new(&config.catalog)?);
        let catalog = Arc::new(CatalogService::from_config(fetcher, &config.catalog));
        let coordinator = Arc::new(ViewCoordinator::new(
            catalog.clone(),
            store.clone(),
            CoordinatorOptions::from_config(config),
        ));

        Ok(Self {
            config: config.clone(),
            store,
            catalog,
            coordinator,
        })
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| PreprintError::Config("Could not find data directory".into()))?;
        let preprint_dir = data_dir.join("preprint");
        std::fs::create_dir_all(&preprint_dir)?;
        Ok(preprint_dir.join("preprint.db"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CategoryKey;
    use tokio_test::assert_ok;

    #[test]
    fn test_in_memory_context_follows_config() {
        let mut config = Config::default();
        config.view.default_category = CategoryKey::Math;

        let ctx = assert_ok!(AppContext::in_memory(&config));

        assert_eq!(ctx.coordinator.active_key(), CategoryKey::Math);
        assert_eq!(ctx.catalog.query_builder().base_url(), config.catalog.base_url);
    }
}
