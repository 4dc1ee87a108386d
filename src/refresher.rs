//! Periodic background reloads.
//!
//! Reloads the configured views on a fixed interval through the
//! coordinator, so refreshed lists go through the same favorite
//! reconciliation as user-triggered reloads. The interval follows
//! `SettingChange::RefreshInterval` events while running.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::Notify;
use tokio::time::{interval, Interval};
use tracing::{debug, info, warn};

use crate::app::{PreprintError, Result};
use crate::config::RefreshConfig;
use crate::coordinator::{SettingChange, ViewCoordinator, ViewEvent};
use crate::domain::CategoryKey;

/// Totals for one refresh cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub refreshed: usize,
    pub papers: usize,
    pub errors: usize,
}

pub struct Refresher {
    enabled: bool,
    categories: Vec<CategoryKey>,
    on_start: bool,
    interval: Duration,
    running: AtomicBool,
    shutdown: Notify,
}

impl Refresher {
    pub fn new(config: &RefreshConfig) -> Result<Self> {
        let interval = config.interval().map_err(PreprintError::Config)?;
        Ok(Self {
            enabled: config.enabled,
            categories: config.categories.clone(),
            on_start: config.on_start,
            interval,
            running: AtomicBool::new(true),
            shutdown: Notify::new(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn categories(&self) -> &[CategoryKey] {
        &self.categories
    }

    /// Run until [`stop`](Self::stop) is called or the coordinator goes away.
    /// Returns at once when auto-refresh is disabled.
    pub async fn run(&self, coordinator: &ViewCoordinator) {
        if !self.enabled {
            info!("Auto-refresh is disabled, refresher not started");
            return;
        }

        let mut events = coordinator.subscribe();

        info!(
            "Refresher started (interval: {}, categories: {})",
            RefreshConfig::format_interval(self.interval.as_secs()),
            self.categories
                .iter()
                .map(|c| c.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        );

        if self.on_start && self.is_running() {
            debug!("Running initial refresh");
            self.refresh_once(coordinator).await;
        }

        let mut timer = Self::timer(self.interval).await;

        while self.is_running() {
            tokio::select! {
                _ = timer.tick() => {
                    if !self.is_running() {
                        break;
                    }
                    debug!("Running scheduled refresh");
                    self.refresh_once(coordinator).await;
                }
                event = events.recv() => match event {
                    Ok(ViewEvent::SettingChanged(SettingChange::RefreshInterval(every))) => {
                        if every.is_zero() {
                            warn!("Ignoring zero refresh interval");
                        } else {
                            info!("Refresh interval changed to {:?}", every);
                            timer = Self::timer(every).await;
                        }
                    }
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        debug!("Refresher skipped {} view events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = self.shutdown.notified() => break,
            }
        }

        info!("Refresher stopped");
    }

    /// Reload every configured view once, concurrently.
    pub async fn refresh_once(&self, coordinator: &ViewCoordinator) -> RefreshSummary {
        let start = Utc::now();
        let results = join_all(self.categories.iter().map(|key| async move {
            (*key, coordinator.reload(*key).await)
        }))
        .await;

        let mut summary = RefreshSummary::default();
        for (key, result) in results {
            match result {
                Ok(outcome) => {
                    summary.refreshed += 1;
                    summary.papers += outcome.count();
                }
                Err(e) => {
                    summary.errors += 1;
                    warn!("Error refreshing {}: {}", key, e);
                }
            }
        }

        let elapsed = Utc::now().signed_duration_since(start);
        info!(
            "Refresh complete: {} views, {} papers, {} errors ({:.1}s)",
            summary.refreshed,
            summary.papers,
            summary.errors,
            elapsed.num_milliseconds() as f64 / 1000.0
        );
        summary
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    // The first tick of a tokio interval fires immediately.
    async fn timer(every: Duration) -> Interval {
        let mut timer = interval(every);
        timer.tick().await;
        timer
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::catalog::CatalogService;
    use crate::coordinator::CoordinatorOptions;
    use crate::query::QueryBuilder;
    use crate::store::SqliteStore;
    use crate::test_support::{feed_of, Reply, StubFetcher};

    const CS: &str = "search_query=cat%3Acs*&";
    const MATH: &str = "search_query=cat%3Amath*&";

    fn coordinator(stub: Arc<StubFetcher>) -> ViewCoordinator {
        let catalog = Arc::new(CatalogService::new(stub, QueryBuilder::default()));
        ViewCoordinator::new(
            catalog,
            Arc::new(SqliteStore::in_memory().unwrap()),
            CoordinatorOptions::default(),
        )
    }

    fn config(interval: &str, on_start: bool, categories: &[CategoryKey]) -> RefreshConfig {
        RefreshConfig {
            enabled: true,
            interval: interval.to_string(),
            on_start,
            categories: categories.to_vec(),
        }
    }

    #[test]
    fn test_rejects_bad_interval() {
        let err = Refresher::new(&config("soon", true, &[CategoryKey::Cs]))
            .err()
            .unwrap();
        assert!(matches!(err, PreprintError::Config(_)));
        assert!(Refresher::new(&config("0", true, &[CategoryKey::Cs])).is_err());
    }

    #[tokio::test]
    async fn test_refresh_once_counts_failures() {
        let stub = Arc::new(
            StubFetcher::new()
                .route(CS, Reply::Body(feed_of(&["a", "b"])))
                .route(MATH, Reply::Status(500)),
        );
        let c = coordinator(stub);
        let refresher =
            Refresher::new(&config("1h", true, &[CategoryKey::Cs, CategoryKey::Math])).unwrap();

        let summary = refresher.refresh_once(&c).await;

        assert_eq!(
            summary,
            RefreshSummary {
                refreshed: 1,
                papers: 2,
                errors: 1,
            }
        );
        assert_eq!(c.papers(CategoryKey::Cs).len(), 2);
    }

    #[tokio::test]
    async fn test_run_refreshes_on_start_and_stops() {
        let stub = Arc::new(StubFetcher::new().route(CS, Reply::Body(feed_of(&["a"]))));
        let c = coordinator(stub.clone());
        let refresher = Refresher::new(&config("1h", true, &[CategoryKey::Cs])).unwrap();

        tokio::join!(refresher.run(&c), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            refresher.stop();
        });

        assert_eq!(stub.calls(), 1);
        assert!(!refresher.is_running());
        assert_eq!(c.papers(CategoryKey::Cs).len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_refresher_does_nothing() {
        let stub = Arc::new(StubFetcher::new().route(CS, Reply::Body(feed_of(&["a"]))));
        let c = coordinator(stub.clone());
        let mut disabled = config("1h", true, &[CategoryKey::Cs]);
        disabled.enabled = false;
        let refresher = Refresher::new(&disabled).unwrap();

        tokio::time::timeout(Duration::from_secs(1), refresher.run(&c))
            .await
            .unwrap();

        assert!(!refresher.is_enabled());
        assert_eq!(stub.calls(), 0);
        assert!(c.papers(CategoryKey::Cs).is_empty());
    }

    #[tokio::test]
    async fn test_interval_setting_takes_effect() {
        let stub = Arc::new(StubFetcher::new().route(CS, Reply::Body(feed_of(&["a"]))));
        let c = coordinator(stub.clone());
        let refresher = Refresher::new(&config("1h", false, &[CategoryKey::Cs])).unwrap();

        tokio::join!(refresher.run(&c), async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            c.apply_setting(SettingChange::RefreshInterval(Duration::from_millis(20)));
            tokio::time::sleep(Duration::from_millis(100)).await;
            refresher.stop();
        });

        assert!(stub.calls() >= 1);
    }
}
