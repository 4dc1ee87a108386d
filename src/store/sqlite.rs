use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{PreprintError, Result};
use crate::domain::Paper;
use crate::store::PaperStore;

const PAPER_COLUMNS: &str = "id, title, summary, authors, published_at, updated_at, pdf_url,
     landing_page_url, categories, is_favorite, favorited_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| PreprintError::Store(format!("connection lock poisoned: {}", e)))
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn paper_from_row(row: &Row<'_>) -> rusqlite::Result<Paper> {
        let categories: String = row.get(8)?;
        Ok(Paper {
            id: row.get(0)?,
            title: row.get(1)?,
            summary: row.get(2)?,
            authors: row.get(3)?,
            published_at: row
                .get::<_, String>(4)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
            updated_at: row
                .get::<_, Option<String>>(5)?
                .and_then(|s| Self::parse_datetime(&s)),
            pdf_url: row.get(6)?,
            landing_page_url: row.get(7)?,
            categories: categories.split_whitespace().map(String::from).collect(),
            is_favorite: row.get::<_, i32>(9)? != 0,
            favorited_at: row
                .get::<_, Option<String>>(10)?
                .and_then(|s| Self::parse_datetime(&s)),
        })
    }

    fn query_papers(&self, sql: &str) -> Result<Vec<Paper>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(sql)?;
        let papers = stmt
            .query_map([], Self::paper_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(papers)
    }
}

impl PaperStore for SqliteStore {
    fn upsert(&self, paper: &Paper) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO papers (id, title, summary, authors, published_at, updated_at, pdf_url,
                                 landing_page_url, categories, is_favorite, favorited_at, stored_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             ON CONFLICT(id) DO UPDATE SET
                title = ?2, summary = ?3, authors = ?4, published_at = ?5, updated_at = ?6,
                pdf_url = ?7, landing_page_url = ?8, categories = ?9,
                is_favorite = ?10, favorited_at = ?11, stored_at = ?12",
            params![
                paper.id,
                paper.title,
                paper.summary,
                paper.authors,
                paper.published_at.to_rfc3339(),
                paper.updated_at.map(|dt| dt.to_rfc3339()),
                paper.pdf_url,
                paper.landing_page_url,
                paper.categories_joined(),
                paper.is_favorite as i32,
                paper.favorited_at.map(|dt| dt.to_rfc3339()),
                Utc::now().to_rfc3339()
            ],
        )?;

        Ok(())
    }

    fn fetch_all(&self) -> Result<Vec<Paper>> {
        self.query_papers(&format!(
            "SELECT {} FROM papers ORDER BY published_at DESC",
            PAPER_COLUMNS
        ))
    }

    fn fetch_favorites(&self) -> Result<Vec<Paper>> {
        // SQLite sorts NULL lowest, so undated favorites land last under DESC.
        self.query_papers(&format!(
            "SELECT {} FROM papers WHERE is_favorite = 1 ORDER BY favorited_at DESC",
            PAPER_COLUMNS
        ))
    }

    fn fetch_by_id(&self, id: &str) -> Result<Option<Paper>> {
        let conn = self.conn()?;

        let paper = conn
            .query_row(
                &format!("SELECT {} FROM papers WHERE id = ?1", PAPER_COLUMNS),
                params![id],
                Self::paper_from_row,
            )
            .optional()?;

        Ok(paper)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{at, favorite, paper};

    #[test]
    fn test_upsert_and_fetch_by_id() {
        let store = SqliteStore::in_memory().unwrap();
        let mut original = paper("2403.00001v1");
        original.summary = "Summary".into();
        original.authors = "Ada Lovelace, Alan Turing".into();
        original.categories = vec!["cs.LG".into(), "stat.ML".into()];
        original.pdf_url = "http://arxiv.org/pdf/2403.00001v1".into();
        store.upsert(&original).unwrap();

        let retrieved = store.fetch_by_id("2403.00001v1").unwrap().unwrap();
        assert_eq!(retrieved, original);
    }

    #[test]
    fn test_upsert_overwrites_existing() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert(&paper("x")).unwrap();

        let mut updated = paper("x");
        updated.title = "Revised".into();
        updated.is_favorite = true;
        updated.favorited_at = Some(at(2, 8));
        store.upsert(&updated).unwrap();

        let all = store.fetch_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Revised");
        assert!(all[0].is_favorite);
        assert_eq!(all[0].favorited_at, Some(at(2, 8)));
    }

    #[test]
    fn test_fetch_favorites_sorted_nulls_last() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert(&favorite("undated", None)).unwrap();
        store.upsert(&favorite("old", Some(at(1, 1)))).unwrap();
        store.upsert(&paper("plain")).unwrap();
        store.upsert(&favorite("new", Some(at(5, 1)))).unwrap();

        let favorites = store.fetch_favorites().unwrap();
        let ids: Vec<&str> = favorites.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }

    #[test]
    fn test_unfavorite_removes_from_favorites() {
        let store = SqliteStore::in_memory().unwrap();
        store.upsert(&favorite("x", Some(at(1, 1)))).unwrap();
        store.upsert(&paper("x")).unwrap();

        assert!(store.fetch_favorites().unwrap().is_empty());
        assert_eq!(store.fetch_all().unwrap().len(), 1);
    }

    #[test]
    fn test_fetch_by_id_nonexistent() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.fetch_by_id("missing").unwrap().is_none());
    }

    #[test]
    fn test_file_backed_store_persists_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("preprint.db");

        {
            let store = SqliteStore::new(&path).unwrap();
            store.upsert(&favorite("kept", Some(at(3, 3)))).unwrap();
        }

        let reopened = SqliteStore::new(&path).unwrap();
        let favorites = reopened.fetch_favorites().unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, "kept");
    }
}
