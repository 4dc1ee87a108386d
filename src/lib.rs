//! # Preprint
//!
//! A terminal client for the arXiv catalog: browse the latest submissions,
//! page through subject archives, run free-text searches and keep a list
//! of favorite papers.
//!
//! ## Architecture
//!
//! ```text
//! QueryBuilder → Fetcher → FeedParser → CatalogService → ViewCoordinator → CLI
//!                                                              │
//!                                                         PaperStore
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Newest papers across cs, math and physics
//! preprint latest
//!
//! # Search within computer science
//! preprint search "graph neural networks" --category cs
//!
//! # Favorite a paper from the cs listing, then list favorites
//! preprint favorite 2403.01234v1 --from cs
//! preprint favorites
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`catalog`]: Fetch-and-parse service with category fallback
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: TOML configuration
//! - [`coordinator`]: View caches, search and favorites
//! - [`domain`]: Core domain models (Paper, CategoryKey)
//! - [`fetcher`]: HTTP transport
//! - [`parser`]: Atom feed parsing
//! - [`query`]: Catalog request construction
//! - [`refresher`]: Periodic background reloads
//! - [`store`]: Database persistence

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, fetcher, catalog service, coordinator.
pub mod app;

/// Builds a request, fetches it and parses the answer, retrying browse
/// requests against a fallback category when configured.
pub mod catalog;

/// Command-line interface using clap.
///
/// - `latest` - Latest submissions
/// - `browse <category>` - One subject archive
/// - `search <query> [--category]` - Free-text search
/// - `favorite <id> [--from <category>]` - Toggle a favorite
/// - `favorites` / `stored` - Local lists
/// - `watch [--interval]` - Foreground auto-refresh
pub mod cli;

/// Configuration management.
///
/// Loads from `~/.config/preprint/config.toml`, supporting:
/// - Catalog endpoint, page size, timeout and fallback category
/// - Default view
/// - Auto-refresh interval and categories
pub mod config;

/// The state owner every view binds to.
pub mod coordinator;

/// Core domain models.
///
/// - [`Paper`](domain::Paper): One catalog record plus its favorite state
/// - [`CategoryKey`](domain::CategoryKey): Label of a cached view
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for catalog requests
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Atom feed parsing into [`Paper`](domain::Paper) records.
pub mod parser;

/// Catalog request construction.
pub mod query;

/// Periodic background reloads.
pub mod refresher;

/// SQLite persistence layer.
///
/// - [`PaperStore`](store::PaperStore): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;

#[cfg(test)]
mod test_support;
