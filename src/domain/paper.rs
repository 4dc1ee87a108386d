use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized bibliographic record. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub authors: String,
    pub published_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub pdf_url: String,
    pub landing_page_url: String,
    pub categories: Vec<String>,
    pub is_favorite: bool,
    pub favorited_at: Option<DateTime<Utc>>,
}

impl Paper {
    pub fn new(id: impl Into<String>, title: impl Into<String>, published_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            summary: String::new(),
            authors: String::new(),
            published_at,
            updated_at: Some(published_at),
            pdf_url: String::new(),
            landing_page_url: String::new(),
            categories: Vec::new(),
            is_favorite: false,
            favorited_at: None,
        }
    }

    pub fn primary_category(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }

    /// Categories in feed order, space separated.
    pub fn categories_joined(&self) -> String {
        self.categories.join(" ")
    }

    pub fn mark(&self) -> FavoriteMark {
        FavoriteMark {
            is_favorite: self.is_favorite,
            favorited_at: self.favorited_at,
        }
    }

    pub fn apply_mark(&mut self, mark: FavoriteMark) {
        self.is_favorite = mark.is_favorite;
        self.favorited_at = mark.favorited_at;
    }

    /// Flip the favorite flag, stamping `now` when it turns on.
    pub fn toggle_favorite(&mut self, now: DateTime<Utc>) {
        self.is_favorite = !self.is_favorite;
        self.favorited_at = if self.is_favorite { Some(now) } else { None };
    }
}

/// The mutable favorite state of a paper, tracked separately from the
/// fetched record so it can be re-applied to fresh copies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FavoriteMark {
    pub is_favorite: bool,
    pub favorited_at: Option<DateTime<Utc>>,
}

/// Newest favorite first; favorites without a timestamp go last.
/// The sort is stable so equal timestamps keep their incoming order.
pub fn sort_favorites(papers: &mut [Paper]) {
    papers.sort_by(|a, b| match (a.favorited_at, b.favorited_at) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_new_paper_is_not_favorite() {
        let paper = Paper::new("2403.00001v1", "Title", at(0));
        assert!(!paper.is_favorite);
        assert!(paper.favorited_at.is_none());
        assert_eq!(paper.updated_at, Some(at(0)));
    }

    #[test]
    fn test_toggle_sets_and_clears_timestamp() {
        let mut paper = Paper::new("2403.00001v1", "Title", at(0));

        paper.toggle_favorite(at(5));
        assert!(paper.is_favorite);
        assert_eq!(paper.favorited_at, Some(at(5)));

        paper.toggle_favorite(at(6));
        assert!(!paper.is_favorite);
        assert!(paper.favorited_at.is_none());
    }

    #[test]
    fn test_primary_category_and_join() {
        let mut paper = Paper::new("x", "Title", at(0));
        assert_eq!(paper.primary_category(), None);

        paper.categories = vec!["cs.LG".into(), "stat.ML".into()];
        assert_eq!(paper.primary_category(), Some("cs.LG"));
        assert_eq!(paper.categories_joined(), "cs.LG stat.ML");
    }

    #[test]
    fn test_sort_favorites_nulls_last() {
        let mut undated = Paper::new("a", "A", at(0));
        undated.is_favorite = true;
        let mut older = Paper::new("b", "B", at(0));
        older.apply_mark(FavoriteMark {
            is_favorite: true,
            favorited_at: Some(at(1)),
        });
        let mut newer = Paper::new("c", "C", at(0));
        newer.apply_mark(FavoriteMark {
            is_favorite: true,
            favorited_at: Some(at(9)),
        });

        let mut papers = vec![undated, older, newer];
        sort_favorites(&mut papers);

        let ids: Vec<&str> = papers.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }
}
