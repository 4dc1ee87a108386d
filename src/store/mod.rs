pub mod sqlite;

use crate::app::Result;
use crate::domain::Paper;

pub use sqlite::SqliteStore;

/// Durable paper persistence keyed by paper id.
///
/// Calls are synchronous; async callers run them on the blocking pool.
pub trait PaperStore {
    /// Insert the paper, or overwrite the stored copy with the same id.
    fn upsert(&self, paper: &Paper) -> Result<()>;
    fn fetch_all(&self) -> Result<Vec<Paper>>;
    /// Favorites only, newest `favorited_at` first, undated last.
    fn fetch_favorites(&self) -> Result<Vec<Paper>>;
    fn fetch_by_id(&self, id: &str) -> Result<Option<Paper>>;
}
