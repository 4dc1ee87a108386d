//! Fixtures shared by the unit tests: Atom builders, a scripted fetcher and
//! a store that always fails.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::app::{NetworkError, PreprintError, Result};
use crate::domain::Paper;
use crate::fetcher::{FetchResponse, Fetcher};
use crate::store::PaperStore;

pub struct EntrySpec {
    pub id: String,
    pub title: String,
    pub published: String,
    pub categories: Vec<String>,
    pub with_id: bool,
    pub with_links: bool,
}

impl EntrySpec {
    pub fn new(id: &str, title: &str) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            published: "2024-03-01T09:30:00Z".to_string(),
            categories: vec!["cs.LG".to_string()],
            with_id: true,
            with_links: true,
        }
    }

    pub fn categories(mut self, categories: &[&str]) -> Self {
        self.categories = categories.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn published(mut self, raw: &str) -> Self {
        self.published = raw.to_string();
        self
    }

    pub fn without_id(mut self) -> Self {
        self.with_id = false;
        self
    }

    pub fn without_links(mut self) -> Self {
        self.with_links = false;
        self
    }
}

pub fn entry_xml(spec: &EntrySpec) -> String {
    let mut xml = String::from("  <entry>\n");
    if spec.with_id {
        xml.push_str(&format!("    <id>http://arxiv.org/abs/{}</id>\n", spec.id));
    }
    xml.push_str(&format!("    <published>{}</published>\n", spec.published));
    xml.push_str(&format!("    <title>{}</title>\n", spec.title));
    xml.push_str("    <summary>A summary.</summary>\n");
    xml.push_str("    <author><name>Grace Hopper</name></author>\n");
    if spec.with_links {
        xml.push_str(&format!(
            "    <link href=\"http://arxiv.org/abs/{}\" rel=\"alternate\" type=\"text/html\"/>\n",
            spec.id
        ));
        xml.push_str(&format!(
            "    <link title=\"pdf\" href=\"http://arxiv.org/pdf/{}\" rel=\"related\" type=\"application/pdf\"/>\n",
            spec.id
        ));
    }
    for term in &spec.categories {
        xml.push_str(&format!(
            "    <category term=\"{}\" scheme=\"http://arxiv.org/schemas/atom\"/>\n",
            term
        ));
    }
    xml.push_str("  </entry>\n");
    xml
}

pub fn feed_xml(entries: &[String]) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <feed xmlns=\"http://www.w3.org/2005/Atom\">\n\
         <title>ArXiv Query</title>\n\
         <id>http://arxiv.org/api/query</id>\n\
         <updated>2024-03-01T00:00:00Z</updated>\n\
         {}</feed>",
        entries.concat()
    )
}

/// Feed containing one simple entry per id, in order.
pub fn feed_of(ids: &[&str]) -> String {
    let entries: Vec<String> = ids
        .iter()
        .map(|id| entry_xml(&EntrySpec::new(id, &format!("Paper {}", id))))
        .collect();
    feed_xml(&entries)
}

pub fn at(day: u32, hour: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
}

pub fn paper(id: &str) -> Paper {
    let mut paper = Paper::new(id, format!("Paper {}", id), at(1, 9));
    paper.categories = vec!["cs.LG".to_string()];
    paper
}

pub fn favorite(id: &str, favorited_at: Option<DateTime<Utc>>) -> Paper {
    let mut paper = paper(id);
    paper.is_favorite = true;
    paper.favorited_at = favorited_at;
    paper
}

#[derive(Clone)]
pub enum Reply {
    Body(String),
    Status(u16),
    Transport(String),
}

/// A [`Fetcher`] that answers by matching a substring of the request URL.
/// Routes are checked in insertion order; an unmatched request is a 404.
pub struct StubFetcher {
    routes: Mutex<Vec<(String, Reply)>>,
    requests: Mutex<Vec<String>>,
    calls: AtomicUsize,
    delay: Duration,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn route(self, needle: &str, reply: Reply) -> Self {
        self.routes.lock().unwrap().push((needle.to_string(), reply));
        self
    }

    /// Replace the reply for an existing route, or add it.
    pub fn set_route(&self, needle: &str, reply: Reply) {
        let mut routes = self.routes.lock().unwrap();
        match routes.iter_mut().find(|(n, _)| n == needle) {
            Some(route) => route.1 = reply,
            None => routes.push((needle.to_string(), reply)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, request: &str) -> Result<FetchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.to_string());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let reply = self
            .routes
            .lock()
            .unwrap()
            .iter()
            .find(|(needle, _)| request.contains(needle.as_str()))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Body(body)) => Ok(FetchResponse {
                status: 200,
                body: body.into_bytes(),
            }),
            Some(Reply::Status(status)) => Ok(FetchResponse {
                status,
                body: Vec::new(),
            }),
            Some(Reply::Transport(message)) => {
                Err(PreprintError::Network(NetworkError::Transport(message)))
            }
            None => Ok(FetchResponse {
                status: 404,
                body: Vec::new(),
            }),
        }
    }
}

/// A [`PaperStore`] whose every call fails, standing in for an unavailable
/// database.
pub struct FailingStore;

impl PaperStore for FailingStore {
    fn upsert(&self, _paper: &Paper) -> Result<()> {
        Err(PreprintError::Store("database is locked".into()))
    }

    fn fetch_all(&self) -> Result<Vec<Paper>> {
        Err(PreprintError::Store("database is locked".into()))
    }

    fn fetch_favorites(&self) -> Result<Vec<Paper>> {
        Err(PreprintError::Store("database is locked".into()))
    }

    fn fetch_by_id(&self, _id: &str) -> Result<Option<Paper>> {
        Err(PreprintError::Store("database is locked".into()))
    }
}
