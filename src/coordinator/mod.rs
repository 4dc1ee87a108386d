//! The state owner every view binds to.
//!
//! ```text
//! reload/search/toggle ─► ViewCoordinator ─► CatalogService (async)
//!                               │        └─► PaperStore (blocking pool)
//!                               ▼
//!                     ViewState (one lock, never held across .await)
//! ```
//!
//! Network and store calls run outside the state lock; each operation
//! rejoins it only to commit, so a reader never sees a half-updated list.

mod events;
mod state;


pub use events::{SettingChange, ViewEvent};
pub use state::{CacheEntry, LoadState, SearchQuery};

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, warn};

use crate::app::{PreprintError, Result};
use crate::catalog::CatalogService;
use crate::config::{clamp_page_size, Config};
use crate::domain::{CategoryKey, FavoriteMark, Paper};
use crate::query::QueryIntent;
use crate::store::PaperStore;

use self::state::{InflightOutcome, ViewState};

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorOptions {
    pub page_size: usize,
    pub default_category: CategoryKey,
}

impl CoordinatorOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            page_size: config.catalog.page_size(),
            default_category: config.view.default_category,
        }
    }
}

impl Default for CoordinatorOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// This call fetched and committed the list.
    Replaced { count: usize },
    /// Another reload of the same key was already running; this call waited
    /// for it instead of issuing a second fetch.
    Joined { count: usize },
}

impl ReloadOutcome {
    pub fn count(&self) -> usize {
        match self {
            ReloadOutcome::Replaced { count } | ReloadOutcome::Joined { count } => *count,
        }
    }
}

/// Result of a favorite toggle. The in-memory views are always updated;
/// `store_error` is set when the change could not be persisted.
#[derive(Debug, Clone)]
pub struct ToggleOutcome {
    pub paper: Paper,
    pub store_error: Option<PreprintError>,
}

impl ToggleOutcome {
    pub fn persisted(&self) -> bool {
        self.store_error.is_none()
    }
}

struct Fetched {
    papers: Vec<Paper>,
    /// Favorites read from the store, used to reconcile `papers`.
    persisted: Vec<Paper>,
}

enum Commit {
    Replace,
    Search(SearchQuery),
    Favorites,
}

enum Admission {
    Begin(watch::Sender<InflightOutcome>, LoadState),
    Join(watch::Receiver<InflightOutcome>),
    /// A different search is running; wait for it, then start ours.
    Wait(watch::Receiver<InflightOutcome>),
}

pub struct ViewCoordinator {
    catalog: Arc<CatalogService>,
    store: Arc<dyn PaperStore + Send + Sync>,
    state: Mutex<ViewState>,
    toggle_lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<ViewEvent>,
}

impl ViewCoordinator {
    pub fn new(
        catalog: Arc<CatalogService>,
        store: Arc<dyn PaperStore + Send + Sync>,
        options: CoordinatorOptions,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            catalog,
            store,
            state: Mutex::new(ViewState::new(
                options.default_category,
                clamp_page_size(options.page_size),
            )),
            toggle_lock: tokio::sync::Mutex::new(()),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ViewEvent> {
        self.events.subscribe()
    }

    // ---- operations -------------------------------------------------------

    /// Refresh one view. Latest and subject keys fetch from the catalog,
    /// `search` re-runs the active query, `favorites` re-derives the
    /// favorites list.
    pub async fn reload(&self, key: CategoryKey) -> Result<ReloadOutcome> {
        match key {
            CategoryKey::Favorites => self.reload_favorites().await,
            CategoryKey::Search => {
                let query = self
                    .lock()
                    .search
                    .clone()
                    .ok_or_else(|| PreprintError::InvalidQuery("no active search".into()))?;
                let intent = self.search_intent(&query);
                self.run_exclusive(key, Commit::Search(query), self.fetch_papers(intent))
                    .await
            }
            _ => {
                let intent = self.browse_intent(key);
                self.run_exclusive(key, Commit::Replace, self.fetch_papers(intent))
                    .await
            }
        }
    }

    /// Run a free-text search and make the search view active. The query is
    /// validated before any state changes.
    pub async fn search(&self, query: &str, category: Option<&str>) -> Result<ReloadOutcome> {
        let search = SearchQuery {
            text: query.trim().to_string(),
            category: category
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from),
        };
        let intent = self.search_intent(&search);
        self.catalog.query_builder().build(&intent)?;

        self.run_exclusive(
            CategoryKey::Search,
            Commit::Search(search),
            self.fetch_papers(intent),
        )
        .await
    }

    /// Drop the search results and return to the default view.
    pub fn clear_search(&self) {
        let default = {
            let mut state = self.lock();
            state.search = None;
            // A search still in flight is now stale; a repeat of the same
            // query must not join it.
            state.pending_search = None;
            *state.entry_mut(CategoryKey::Search) = CacheEntry::default();
            state.active = state.default_category;
            state.default_category
        };
        debug!("Search cleared, active view is {}", default);
        self.emit(ViewEvent::SearchCleared);
        self.emit(ViewEvent::ActiveChanged(default));
    }

    /// Flip the favorite flag of a paper and push the change into every view
    /// holding it.
    ///
    /// When the store rejects the write, the in-memory change is kept and
    /// the error is returned in [`ToggleOutcome::store_error`] and recorded
    /// on the favorites view.
    pub async fn toggle_favorite(&self, paper_id: &str) -> Result<ToggleOutcome> {
        let _serialized = self.toggle_lock.lock().await;

        let located = self.lock().locate(paper_id);
        let mut paper = match located {
            Some(paper) => paper,
            None => {
                let id = paper_id.to_string();
                self.with_store(move |store| store.fetch_by_id(&id))
                    .await?
                    .ok_or_else(|| PreprintError::PaperNotFound(paper_id.to_string()))?
            }
        };
        if let Some(mark) = self.lock().marks.get(paper_id).copied() {
            paper.apply_mark(mark);
        }
        paper.toggle_favorite(Utc::now());

        let to_store = paper.clone();
        let store_error = self
            .with_store(move |store| store.upsert(&to_store))
            .await
            .err();

        let touched = {
            let mut state = self.lock();
            state.marks.insert(paper.id.clone(), paper.mark());
            let touched = state.propagate(&paper);
            if let Some(e) = &store_error {
                state.entry_mut(CategoryKey::Favorites).error =
                    Some(format!("Favorite saved for this session only: {}", e));
            }
            touched
        };

        match &store_error {
            None => info!("Paper {} favorite = {}", paper.id, paper.is_favorite),
            Some(e) => warn!(
                "Paper {} favorite = {} kept in memory only: {}",
                paper.id, paper.is_favorite, e
            ),
        }

        for key in touched {
            self.emit(ViewEvent::CacheUpdated { key });
        }
        self.emit(ViewEvent::FavoriteToggled {
            id: paper.id.clone(),
            is_favorite: paper.is_favorite,
        });

        Ok(ToggleOutcome { paper, store_error })
    }

    /// Rebuild the favorites view from the store plus every favorite known to
    /// this session, newest first.
    pub async fn load_favorites(&self) -> Result<Vec<Paper>> {
        self.reload_favorites().await?;
        Ok(self.papers(CategoryKey::Favorites))
    }

    /// Everything persisted in the store, with session favorite state applied.
    pub async fn stored_papers(&self) -> Result<Vec<Paper>> {
        let mut papers = self.with_store(|store| store.fetch_all()).await?;
        let state = self.lock();
        for paper in papers.iter_mut() {
            if let Some(mark) = state.marks.get(&paper.id) {
                paper.apply_mark(*mark);
            }
        }
        Ok(papers)
    }

    pub fn apply_setting(&self, change: SettingChange) {
        {
            let mut state = self.lock();
            match &change {
                SettingChange::PageSize(size) => state.page_size = clamp_page_size(*size),
                SettingChange::DefaultCategory(CategoryKey::Search) => {
                    warn!("Ignoring search as a default category");
                    return;
                }
                SettingChange::DefaultCategory(key) => state.default_category = *key,
                SettingChange::RefreshInterval(_) => {}
            }
        }
        debug!("Setting changed: {:?}", change);
        self.emit(ViewEvent::SettingChanged(change));
    }

    // ---- read-only accessors ---------------------------------------------

    pub fn active_key(&self) -> CategoryKey {
        self.lock().active
    }

    pub fn set_active(&self, key: CategoryKey) {
        self.lock().active = key;
        self.emit(ViewEvent::ActiveChanged(key));
    }

    pub fn papers(&self, key: CategoryKey) -> Vec<Paper> {
        self.lock().papers(key).to_vec()
    }

    pub fn active_papers(&self) -> Vec<Paper> {
        let state = self.lock();
        state.papers(state.active).to_vec()
    }

    pub fn load_state(&self, key: CategoryKey) -> LoadState {
        self.lock().entry(key).map(|e| e.load).unwrap_or_default()
    }

    pub fn is_loading(&self, key: CategoryKey) -> bool {
        self.load_state(key) == LoadState::Loading
    }

    pub fn error_message(&self, key: CategoryKey) -> Option<String> {
        self.lock().entry(key).and_then(|e| e.error.clone())
    }

    pub fn search_query(&self) -> Option<SearchQuery> {
        self.lock().search.clone()
    }

    pub fn is_favorite(&self, paper_id: &str) -> bool {
        self.lock()
            .marks
            .get(paper_id)
            .map(|m| m.is_favorite)
            .unwrap_or(false)
    }

    /// One copy of every paper across latest and the subject views.
    pub fn unique_papers(&self) -> Vec<Paper> {
        self.lock().unique_papers()
    }

    // ---- internals --------------------------------------------------------

    fn lock(&self) -> MutexGuard<'_, ViewState> {
        // Commits are plain assignments; a panic mid-commit cannot leave the
        // state half-written, so a poisoned lock is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn emit(&self, event: ViewEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn browse_intent(&self, key: CategoryKey) -> QueryIntent {
        let page_size = self.lock().page_size;
        match key.subject_code() {
            Some(code) => QueryIntent::category_browse(code, page_size),
            None => QueryIntent::latest(page_size),
        }
    }

    fn search_intent(&self, query: &SearchQuery) -> QueryIntent {
        let page_size = self.lock().page_size;
        QueryIntent::free_text_search(query.text.clone(), query.category.clone(), page_size)
    }

    async fn with_store<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&(dyn PaperStore + Send + Sync)) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || f(store.as_ref()))
            .await
            .map_err(|e| PreprintError::Store(format!("store task failed: {}", e)))?
    }

    async fn fetch_papers(&self, intent: QueryIntent) -> Result<Fetched> {
        let papers = self.catalog.fetch_with_fallback(&intent).await?;
        let persisted = if papers.is_empty() {
            Vec::new()
        } else {
            match self.with_store(|store| store.fetch_favorites()).await {
                Ok(favorites) => favorites,
                Err(e) => {
                    warn!("Stored favorites unavailable, using session state only: {}", e);
                    Vec::new()
                }
            }
        };
        Ok(Fetched { papers, persisted })
    }

    async fn reload_favorites(&self) -> Result<ReloadOutcome> {
        let work = async {
            let stored = self.with_store(|store| store.fetch_favorites()).await?;
            Ok(Fetched {
                papers: stored,
                persisted: Vec::new(),
            })
        };
        self.run_exclusive(CategoryKey::Favorites, Commit::Favorites, work)
            .await
    }

    /// Run `work` as the single in-flight reload of `key`, or join the one
    /// already running.
    async fn run_exclusive<F>(&self, key: CategoryKey, commit: Commit, work: F) -> Result<ReloadOutcome>
    where
        F: Future<Output = Result<Fetched>>,
    {
        let (tx, previous) = loop {
            let admission = self.admit(key, &commit);
            match admission {
                Admission::Begin(tx, previous) => break (tx, previous),
                Admission::Join(rx) => {
                    debug!("Reload of {} already in flight, joining it", key);
                    return self.join_inflight(key, rx).await;
                }
                Admission::Wait(mut rx) => {
                    debug!("Waiting for the previous search to finish");
                    let _ = rx.wait_for(Option::is_some).await;
                }
            }
        };

        let mut guard = InflightGuard {
            state: &self.state,
            key,
            previous,
            armed: true,
        };
        self.emit(ViewEvent::LoadStateChanged {
            key,
            state: LoadState::Loading,
        });
        if matches!(commit, Commit::Search(_)) {
            self.emit(ViewEvent::ActiveChanged(CategoryKey::Search));
        }

        let result = match work.await {
            Ok(fetched) => Ok(self.commit(key, &commit, fetched)),
            Err(e) => {
                self.commit_failure(key, &commit, &e);
                Err(e)
            }
        };
        guard.armed = false;
        tx.send_replace(Some(result.clone()));

        result.map(|count| ReloadOutcome::Replaced { count })
    }

    fn admit(&self, key: CategoryKey, commit: &Commit) -> Admission {
        let mut state = self.lock();

        if let Some(rx) = state.inflight.get(&key).cloned() {
            return match commit {
                Commit::Search(query) if state.pending_search.as_ref() != Some(query) => {
                    Admission::Wait(rx)
                }
                _ => Admission::Join(rx),
            };
        }

        if let Commit::Search(query) = commit {
            state.search = Some(query.clone());
            state.pending_search = Some(query.clone());
            state.active = CategoryKey::Search;
        }

        let (tx, rx) = watch::channel(None);
        state.inflight.insert(key, rx);
        let entry = state.entry_mut(key);
        let previous = entry.load;
        entry.load = LoadState::Loading;

        Admission::Begin(tx, previous)
    }

    async fn join_inflight(
        &self,
        key: CategoryKey,
        mut rx: watch::Receiver<InflightOutcome>,
    ) -> Result<ReloadOutcome> {
        let outcome = rx.wait_for(Option::is_some).await.map(|r| (*r).clone());
        match outcome {
            Ok(Some(Ok(count))) => Ok(ReloadOutcome::Joined { count }),
            Ok(Some(Err(e))) => Err(e),
            Ok(None) | Err(_) => Err(PreprintError::Abandoned(key.to_string())),
        }
    }

    /// True when a search result no longer matches what the user asked for,
    /// either because the search was cleared or replaced.
    fn is_stale(state: &ViewState, commit: &Commit) -> bool {
        match commit {
            Commit::Search(query) => state.search.as_ref() != Some(query),
            _ => false,
        }
    }

    fn commit(&self, key: CategoryKey, commit: &Commit, fetched: Fetched) -> usize {
        let persisted: HashMap<String, FavoriteMark> = fetched
            .persisted
            .iter()
            .map(|p| (p.id.clone(), p.mark()))
            .collect();

        let committed = {
            let mut state = self.lock();
            state.inflight.remove(&key);

            if Self::is_stale(&state, commit) {
                state.pending_search = None;
                *state.entry_mut(key) = CacheEntry::default();
                None
            } else {
                let papers = match commit {
                    Commit::Favorites => state.derive_favorites(fetched.papers),
                    Commit::Replace | Commit::Search(_) => {
                        let mut papers = fetched.papers;
                        state.reconcile(&mut papers, &persisted);
                        state.refresh_favorite_copies(&papers);
                        papers
                    }
                };
                if matches!(commit, Commit::Search(_)) {
                    state.pending_search = None;
                }
                let count = papers.len();
                state.entry_mut(key).replace(papers);
                Some(count)
            }
        };

        match committed {
            Some(count) => {
                info!("Reloaded {}: {} papers", key, count);
                self.emit(ViewEvent::CacheReplaced { key, count });
                self.emit(ViewEvent::LoadStateChanged {
                    key,
                    state: LoadState::Loaded,
                });
                count
            }
            None => {
                debug!("Discarded results for a search that is no longer active");
                self.emit(ViewEvent::LoadStateChanged {
                    key,
                    state: LoadState::Empty,
                });
                0
            }
        }
    }

    fn commit_failure(&self, key: CategoryKey, commit: &Commit, error: &PreprintError) {
        let load = {
            let mut state = self.lock();
            state.inflight.remove(&key);
            if matches!(commit, Commit::Search(_)) {
                state.pending_search = None;
            }
            if Self::is_stale(&state, commit) {
                *state.entry_mut(key) = CacheEntry::default();
                LoadState::Empty
            } else {
                state.entry_mut(key).fail(error.to_string());
                LoadState::Errored
            }
        };

        warn!("Reload of {} failed: {}", key, error);
        self.emit(ViewEvent::LoadStateChanged { key, state: load });
    }
}

/// Clears the in-flight marker if a reload future is dropped before it
/// commits, so later reloads of the key are not blocked forever.
struct InflightGuard<'a> {
    state: &'a Mutex<ViewState>,
    key: CategoryKey,
    previous: LoadState,
    armed: bool,
}

impl Drop for InflightGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.inflight.remove(&self.key);
        if self.key == CategoryKey::Search {
            state.pending_search = None;
        }
        state.entry_mut(self.key).load = self.previous;
    }
}
