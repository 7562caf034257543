//! In-memory catalogs, web search and browser sessions shared by the tests

use async_trait::async_trait;
use device_resolver::pool::{RateLimiter, Session, SessionError, SessionFactory, SessionPool};
use device_resolver::record::{CandidateLink, PartialRecord};
use device_resolver::sources::{AdapterError, LinkSearch, SourceAdapter, Sources};
use device_resolver::Brand;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A catalog answering from fixed tables
///
/// Unknown queries return no links, unknown references are `NotFound`, and
/// references listed in `broken` fail as if the site were down.
#[derive(Default)]
pub struct FakeCatalog {
    pub source: String,
    pub by_identifier: HashMap<String, Vec<CandidateLink>>,
    pub by_name: HashMap<String, Vec<CandidateLink>>,
    /// Links returned for any name query not in `by_name`
    pub any_name: Vec<CandidateLink>,
    pub details: HashMap<String, PartialRecord>,
    pub broken: Vec<String>,
    pub searches: AtomicUsize,
    pub extractions: AtomicUsize,
}

impl FakeCatalog {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Self::default()
        }
    }

    pub fn identifier(mut self, query: &str, name: &str, target: &str) -> Self {
        self.by_identifier
            .entry(query.to_string())
            .or_default()
            .push(CandidateLink::new(name, target, 1));
        self
    }

    pub fn name(mut self, query: &str, name: &str, target: &str) -> Self {
        self.by_name
            .entry(query.to_string())
            .or_default()
            .push(CandidateLink::new(name, target, 1));
        self
    }

    pub fn any_name(mut self, name: &str, target: &str) -> Self {
        self.any_name.push(CandidateLink::new(name, target, 1));
        self
    }

    pub fn detail(mut self, target: &str, name: &str, date: &str, price: &str) -> Self {
        let mut record = PartialRecord::new(self.source.clone(), target);
        record.device_name = name.to_string();
        record.announced_date = date.to_string();
        record.price = price.to_string();
        self.details.insert(target.to_string(), record);
        self
    }

    pub fn broken(mut self, target: &str) -> Self {
        self.broken.push(target.to_string());
        self
    }
}

#[async_trait]
impl SourceAdapter for FakeCatalog {
    fn name(&self) -> &str {
        &self.source
    }

    async fn search_by_identifier(
        &self,
        identifier: &str,
        _brand: Option<Brand>,
    ) -> Result<Vec<CandidateLink>, AdapterError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.broken.iter().any(|b| b == identifier) {
            return Err(AdapterError::Unavailable(format!("{} is down", self.source)));
        }
        Ok(self.by_identifier.get(identifier).cloned().unwrap_or_default())
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<CandidateLink>, AdapterError> {
        self.searches.fetch_add(1, Ordering::SeqCst);
        if self.broken.iter().any(|b| b == name) {
            return Err(AdapterError::Unavailable(format!("{} is down", self.source)));
        }
        Ok(self
            .by_name
            .get(name)
            .cloned()
            .unwrap_or_else(|| self.any_name.clone()))
    }

    async fn extract_detail(&self, reference: &str) -> Result<PartialRecord, AdapterError> {
        self.extractions.fetch_add(1, Ordering::SeqCst);
        if self.broken.iter().any(|b| b == reference) {
            return Err(AdapterError::Unavailable(format!("{} is down", self.source)));
        }
        self.details
            .get(reference)
            .cloned()
            .ok_or_else(|| AdapterError::NotFound(reference.to_string()))
    }
}

/// Web search returning the same links for every query
#[derive(Default)]
pub struct FakeSearch {
    pub links: Vec<CandidateLink>,
    pub fail: bool,
    /// Sleep before answering, to trip strategy timeouts
    pub delay: Option<Duration>,
    pub queries: Mutex<Vec<String>>,
}

impl FakeSearch {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn returning(target: &str) -> Self {
        Self {
            links: vec![CandidateLink::new("search hit", target, 1)],
            ..Self::default()
        }
    }
}

#[async_trait]
impl LinkSearch for FakeSearch {
    fn name(&self) -> &str {
        "fake-search"
    }

    async fn find_links(
        &self,
        query: &str,
        site_domain: &str,
    ) -> Result<Vec<CandidateLink>, AdapterError> {
        self.queries
            .lock()
            .unwrap()
            .push(format!("{} site:{}", query, site_domain));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(AdapterError::Timeout("search".to_string()));
        }
        Ok(self.links.clone())
    }
}

pub fn sources(primary: FakeCatalog, secondary: FakeCatalog, search: FakeSearch) -> Sources {
    Sources {
        primary: Arc::new(primary),
        secondary: Arc::new(secondary),
        cross_reference: Arc::new(search),
        primary_domain: "gsmarena.test".to_string(),
    }
}

/// Browser session serving canned HTML by URL substring
pub struct ScriptedSession {
    routes: Arc<Vec<(String, String)>>,
    visited: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Session for ScriptedSession {
    async fn render(&mut self, url: &str, _wait_for: Option<&str>) -> Result<String, SessionError> {
        self.visited.lock().unwrap().push(url.to_string());
        self.routes
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, html)| html.clone())
            .ok_or_else(|| SessionError::Navigation {
                url: url.to_string(),
                message: "no scripted page".to_string(),
            })
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        Ok(())
    }
}

pub struct ScriptedFactory {
    routes: Arc<Vec<(String, String)>>,
    pub visited: Arc<Mutex<Vec<String>>>,
}

impl ScriptedFactory {
    pub fn new(routes: Vec<(&str, String)>) -> Self {
        Self {
            routes: Arc::new(
                routes
                    .into_iter()
                    .map(|(fragment, html)| (fragment.to_string(), html))
                    .collect(),
            ),
            visited: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl SessionFactory for ScriptedFactory {
    type Session = ScriptedSession;

    async fn create(&self, _label: &str) -> Result<ScriptedSession, SessionError> {
        Ok(ScriptedSession {
            routes: Arc::clone(&self.routes),
            visited: Arc::clone(&self.visited),
        })
    }
}

/// A one-session pool with no pacing
pub async fn scripted_pool(routes: Vec<(&str, String)>) -> (Arc<SessionPool<ScriptedFactory>>, Arc<Mutex<Vec<String>>>) {
    let factory = ScriptedFactory::new(routes);
    let visited = Arc::clone(&factory.visited);
    let pool = SessionPool::initialize(factory, 1, Arc::new(RateLimiter::new(Duration::ZERO)))
        .await
        .unwrap();
    (Arc::new(pool), visited)
}
