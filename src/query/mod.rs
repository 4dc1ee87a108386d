//! Request construction for the arXiv query API.
//!
//! ```text
//! QueryIntent → search_query grammar → percent-encoded URL
//! ```

use url::Url;

use crate::app::{PreprintError, Result};

pub const DEFAULT_BASE_URL: &str = "https://export.arxiv.org/api/query";

/// Archives OR-ed together for the "latest" view.
pub const LATEST_ARCHIVES: [&str; 3] = ["cs", "math", "physics"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentKind {
    Latest,
    CategoryBrowse(String),
    FreeTextSearch {
        query: String,
        category: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Relevance,
    LastUpdatedDate,
    SubmittedDate,
}

impl SortField {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            SortField::Relevance => "relevance",
            SortField::LastUpdatedDate => "lastUpdatedDate",
            SortField::SubmittedDate => "submittedDate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

/// What the caller wants fetched.
///
/// `page_size` is expected in `1..=100`; the configuration layer clamps it
/// before an intent is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryIntent {
    pub kind: IntentKind,
    pub page_size: usize,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
}

impl QueryIntent {
    pub fn latest(page_size: usize) -> Self {
        Self {
            kind: IntentKind::Latest,
            page_size,
            sort_field: SortField::LastUpdatedDate,
            sort_order: SortOrder::Descending,
        }
    }

    pub fn category_browse(category: impl Into<String>, page_size: usize) -> Self {
        Self {
            kind: IntentKind::CategoryBrowse(category.into()),
            page_size,
            sort_field: SortField::SubmittedDate,
            sort_order: SortOrder::Descending,
        }
    }

    pub fn free_text_search(
        query: impl Into<String>,
        category: Option<String>,
        page_size: usize,
    ) -> Self {
        Self {
            kind: IntentKind::FreeTextSearch {
                query: query.into(),
                category,
            },
            page_size,
            sort_field: SortField::Relevance,
            sort_order: SortOrder::Descending,
        }
    }

    pub fn sorted_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_field = field;
        self.sort_order = order;
        self
    }
}

#[derive(Debug, Clone)]
pub struct QueryBuilder {
    base_url: String,
}

impl Default for QueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl QueryBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build(&self, intent: &QueryIntent) -> Result<String> {
        let search_query = search_query(&intent.kind)?;
        let url = Url::parse_with_params(
            &self.base_url,
            &[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", intent.page_size.to_string().as_str()),
                ("sortBy", intent.sort_field.as_api_str()),
                ("sortOrder", intent.sort_order.as_api_str()),
            ],
        )?;
        Ok(url.to_string())
    }
}

fn search_query(kind: &IntentKind) -> Result<String> {
    match kind {
        IntentKind::Latest => Ok(LATEST_ARCHIVES
            .iter()
            .map(|code| format!("cat:{}*", code))
            .collect::<Vec<_>>()
            .join(" OR ")),
        IntentKind::CategoryBrowse(category) => category_constraint(category),
        IntentKind::FreeTextSearch { query, category } => {
            let text = text_constraint(query)?;
            match category {
                Some(category) => Ok(format!("{} AND {}", text, category_constraint(category)?)),
                None => Ok(text),
            }
        }
    }
}

fn category_constraint(category: &str) -> Result<String> {
    let code = category.trim().trim_end_matches('*');
    if code.is_empty() {
        return Err(PreprintError::InvalidQuery("category is empty".into()));
    }
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(PreprintError::InvalidQuery(format!(
            "category contains unsupported characters: {}",
            category
        )));
    }
    Ok(format!("cat:{}*", code))
}

fn text_constraint(query: &str) -> Result<String> {
    if query.chars().any(char::is_control) {
        return Err(PreprintError::InvalidQuery(
            "search text contains control characters".into(),
        ));
    }
    // Quotes would break out of the phrase grouping below.
    let words: Vec<&str> = query
        .split(|c: char| c.is_whitespace() || c == '"')
        .filter(|w| !w.is_empty())
        .collect();
    match words.as_slice() {
        [] => Err(PreprintError::InvalidQuery("search text is empty".into())),
        [word] => Ok(format!("all:{}", word)),
        phrase => Ok(format!("all:\"{}\"", phrase.join(" "))),
    }
}
