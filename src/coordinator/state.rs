use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;

use crate::app::Result;
use crate::domain::{sort_favorites, CategoryKey, FavoriteMark, Paper};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadState {
    #[default]
    Empty,
    Loading,
    Loaded,
    Errored,
}

/// Contents and status of one cached view.
#[derive(Debug, Clone, Default)]
pub struct CacheEntry {
    pub papers: Vec<Paper>,
    pub load: LoadState,
    pub error: Option<String>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub(crate) fn replace(&mut self, papers: Vec<Paper>) {
        self.papers = papers;
        self.load = LoadState::Loaded;
        self.error = None;
        self.refreshed_at = Some(Utc::now());
    }

    /// Record a failure without discarding what is already displayed.
    pub(crate) fn fail(&mut self, message: String) {
        self.load = LoadState::Errored;
        self.error = Some(message);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub text: String,
    pub category: Option<String>,
}

pub(crate) type InflightOutcome = Option<Result<usize>>;

/// Everything guarded by the coordinator's state lock.
pub(crate) struct ViewState {
    pub caches: HashMap<CategoryKey, CacheEntry>,
    /// Favorite state learned this session, by paper id. Wins over anything
    /// fetched or read from the store.
    pub marks: HashMap<String, FavoriteMark>,
    pub inflight: HashMap<CategoryKey, watch::Receiver<InflightOutcome>>,
    pub search: Option<SearchQuery>,
    /// Query of the search currently in flight, if any.
    pub pending_search: Option<SearchQuery>,
    pub active: CategoryKey,
    pub default_category: CategoryKey,
    pub page_size: usize,
}

impl ViewState {
    pub fn new(default_category: CategoryKey, page_size: usize) -> Self {
        Self {
            caches: HashMap::new(),
            marks: HashMap::new(),
            inflight: HashMap::new(),
            search: None,
            pending_search: None,
            active: default_category,
            default_category,
            page_size,
        }
    }

    pub fn entry(&self, key: CategoryKey) -> Option<&CacheEntry> {
        self.caches.get(&key)
    }

    pub fn entry_mut(&mut self, key: CategoryKey) -> &mut CacheEntry {
        self.caches.entry(key).or_default()
    }

    pub fn papers(&self, key: CategoryKey) -> &[Paper] {
        self.entry(key).map(|e| e.papers.as_slice()).unwrap_or(&[])
    }

    /// Re-apply known favorite state to freshly fetched papers.
    ///
    /// Session marks win; otherwise a favorite known to the store is carried
    /// over and remembered as a session mark.
    pub fn reconcile(&mut self, papers: &mut [Paper], persisted: &HashMap<String, FavoriteMark>) {
        for paper in papers.iter_mut() {
            if let Some(mark) = self.marks.get(&paper.id) {
                paper.apply_mark(*mark);
            } else if let Some(mark) = persisted.get(&paper.id) {
                paper.apply_mark(*mark);
                self.marks.insert(paper.id.clone(), *mark);
            }
        }
    }

    /// Refresh the favorites view's copies of any favorites in `papers`.
    pub fn refresh_favorite_copies(&mut self, papers: &[Paper]) {
        let Some(favorites) = self.caches.get_mut(&CategoryKey::Favorites) else {
            return;
        };
        for fresh in papers.iter().filter(|p| p.is_favorite) {
            if let Some(existing) = favorites.papers.iter_mut().find(|p| p.id == fresh.id) {
                *existing = fresh.clone();
            }
        }
    }

    /// Store favorites, then favorites seen in the search results, then
    /// favorites toggled this session in any other view. Session marks
    /// override store state; first occurrence per id wins.
    pub fn derive_favorites(&self, stored: Vec<Paper>) -> Vec<Paper> {
        let mut seen = HashSet::new();
        let mut favorites = Vec::new();

        let session_favorites = std::iter::once(CategoryKey::Search)
            .chain(std::iter::once(CategoryKey::Favorites))
            .chain(std::iter::once(CategoryKey::Latest))
            .chain(CategoryKey::SUBJECTS)
            .flat_map(|key| self.papers(key).iter().cloned());

        for mut paper in stored.into_iter().chain(session_favorites) {
            if let Some(mark) = self.marks.get(&paper.id) {
                paper.apply_mark(*mark);
            }
            if paper.is_favorite && seen.insert(paper.id.clone()) {
                favorites.push(paper);
            }
        }

        sort_favorites(&mut favorites);
        favorites
    }

    /// Replace every cached copy of `paper`, including the favorites view.
    /// Returns the keys whose contents changed.
    pub fn propagate(&mut self, paper: &Paper) -> Vec<CategoryKey> {
        let mut touched = Vec::new();

        for (key, entry) in self.caches.iter_mut() {
            if *key == CategoryKey::Favorites {
                continue;
            }
            let mut hit = false;
            for cached in entry.papers.iter_mut().filter(|p| p.id == paper.id) {
                *cached = paper.clone();
                hit = true;
            }
            if hit {
                touched.push(*key);
            }
        }

        let favorites = self.entry_mut(CategoryKey::Favorites);
        let before = favorites.papers.len();
        favorites.papers.retain(|p| p.id != paper.id);
        let removed = favorites.papers.len() != before;
        if paper.is_favorite {
            favorites.papers.push(paper.clone());
            sort_favorites(&mut favorites.papers);
        }
        if removed || paper.is_favorite {
            touched.push(CategoryKey::Favorites);
        }

        touched
    }

    /// First copy of each paper across latest and the subject views, in
    /// that scan order.
    pub fn unique_papers(&self) -> Vec<Paper> {
        let mut seen = HashSet::new();
        std::iter::once(CategoryKey::Latest)
            .chain(CategoryKey::SUBJECTS)
            .flat_map(|key| self.papers(key).iter())
            .filter(|p| seen.insert(p.id.clone()))
            .cloned()
            .collect()
    }

    /// Look a paper up by id, preferring the view the user is looking at.
    pub fn locate(&self, id: &str) -> Option<Paper> {
        std::iter::once(self.active)
            .chain(CategoryKey::ALL)
            .flat_map(|key| self.papers(key).iter())
            .find(|p| p.id == id)
            .cloned()
    }
}
