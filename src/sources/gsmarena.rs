//! Primary catalog adapter
//!
//! Search result pages are decrypted client-side, so searches are rendered
//! in a pooled browser session and read from `#decrypted`. Detail pages are
//! plain HTML and fetched over HTTP.

use super::html::{selector, text_of};
use super::{AdapterError, Fetcher, SourceAdapter};
use crate::config::KnownMapping;
use crate::normalize::Brand;
use crate::pool::{SessionFactory, SessionPool};
use crate::record::{CandidateLink, PartialRecord};
use async_trait::async_trait;
use scraper::Html;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

pub const PRIMARY_SOURCE: &str = "gsmarena";

/// Element the search page fills in once decrypted
const RESULTS_ELEMENT: &str = "#decrypted";

/// Codes whose catalog search lands on the wrong device
const KNOWN_PAGES: &[(&str, &str)] = &[
    ("CPH1931", "oppo_a5_(2020)-9883.php"),
    ("CPH2387", "oppo_a57_4g-11565.php"),
    ("V2111", "vivo_y21-11063.php"),
    ("CPH2471", "oppo_a96-11827.php"),
    ("CPH2269", "oppo_reno7-11534.php"),
    ("SM-A245F", "samsung_galaxy_a24-12421.php"),
    ("SM-G991B", "samsung_galaxy_s21-10626.php"),
];

pub struct GsmArena<F: SessionFactory> {
    base_url: Url,
    fetcher: Fetcher,
    pool: Arc<SessionPool<F>>,
    acquire_timeout: Duration,

    /// Uppercased identifier -> page path relative to `base_url`
    known_pages: HashMap<String, String>,
}

impl<F: SessionFactory> GsmArena<F> {
    pub fn new(
        base_url: Url,
        fetcher: Fetcher,
        pool: Arc<SessionPool<F>>,
        acquire_timeout: Duration,
    ) -> Self {
        let known_pages = KNOWN_PAGES
            .iter()
            .map(|(code, page)| (code.to_string(), page.to_string()))
            .collect();

        Self {
            base_url,
            fetcher,
            pool,
            acquire_timeout,
            known_pages,
        }
    }

    /// Adds (or overrides) identifier -> page mappings
    pub fn with_known_mappings(mut self, mappings: &[KnownMapping]) -> Self {
        for mapping in mappings {
            self.known_pages.insert(
                mapping.identifier.trim().to_ascii_uppercase(),
                mapping.path.trim().trim_start_matches('/').to_string(),
            );
        }
        self
    }

    fn known_page(&self, identifier: &str) -> Result<Option<CandidateLink>, AdapterError> {
        let key = identifier.trim().to_ascii_uppercase();
        let Some(page) = self.known_pages.get(&key) else {
            return Ok(None);
        };

        let target = self
            .base_url
            .join(page)
            .map_err(|e| AdapterError::Parse(format!("bad known page '{}': {}", page, e)))?;
        tracing::debug!("Known mapping {} -> {}", key, target);

        Ok(Some(CandidateLink::new(key, target.to_string(), 1)))
    }

    async fn search(&self, query: &str) -> Result<Vec<CandidateLink>, AdapterError> {
        let mut url = self
            .base_url
            .join("res.php3")
            .map_err(|e| AdapterError::Parse(e.to_string()))?;
        url.query_pairs_mut().append_pair("sSearch", query);

        let html = self
            .pool
            .render(
                self.fetcher.consumer(),
                self.acquire_timeout,
                url.as_str(),
                Some(RESULTS_ELEMENT),
            )
            .await?;

        let links = parse_search_results(&html, &self.base_url)?;
        tracing::debug!("{} search for '{}': {} links", PRIMARY_SOURCE, query, links.len());
        Ok(links)
    }
}

#[async_trait]
impl<F: SessionFactory> SourceAdapter for GsmArena<F> {
    fn name(&self) -> &str {
        PRIMARY_SOURCE
    }

    async fn search_by_identifier(
        &self,
        identifier: &str,
        _brand: Option<Brand>,
    ) -> Result<Vec<CandidateLink>, AdapterError> {
        if let Some(link) = self.known_page(identifier)? {
            return Ok(vec![link]);
        }
        self.search(identifier).await
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<CandidateLink>, AdapterError> {
        self.search(name).await
    }

    async fn extract_detail(&self, reference: &str) -> Result<PartialRecord, AdapterError> {
        let html = self.fetcher.get_text(reference).await?;
        let record = parse_device_page(&html, reference)?;
        tracing::debug!(
            "{} detail '{}' announced='{}' price='{}'",
            PRIMARY_SOURCE,
            record.device_name,
            record.announced_date,
            record.price
        );
        Ok(record)
    }
}

/// Extracts device links from decrypted search results
///
/// Links come from the makers grid; pages without one fall back to any link
/// pointing at a `.php` page. Every link is flagged when the page says it is
/// only showing closest matches.
pub fn parse_search_results(html: &str, base_url: &Url) -> Result<Vec<CandidateLink>, AdapterError> {
    let document = Html::parse_fragment(html);

    let closest_match = document
        .select(&selector("div.no-results")?)
        .any(|div| text_of(div).to_lowercase().contains("closest matches"));
    if closest_match {
        tracing::warn!("Search results only list closest matches");
    }

    let mut anchors: Vec<_> = document.select(&selector("div.makers a[href]")?).collect();
    if anchors.is_empty() {
        anchors = document
            .select(&selector("a[href]")?)
            .filter(|a| a.value().attr("href").is_some_and(|href| href.contains(".php")))
            .collect();
    }

    let mut links = Vec::new();
    for anchor in anchors {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Ok(target) = base_url.join(href) else {
            continue;
        };
        let name = text_of(anchor);
        if name.is_empty() {
            continue;
        }

        let mut link = CandidateLink::new(name, target.to_string(), links.len() + 1);
        link.closest_match = closest_match;
        links.push(link);
    }

    Ok(links)
}

/// Parses a device detail page
///
/// Every spec row lands in `specifications` keyed by its first non-empty
/// cell. The `Announced` row is cut at `Released`.
pub fn parse_device_page(html: &str, reference: &str) -> Result<PartialRecord, AdapterError> {
    let document = Html::parse_document(html);
    let mut record = PartialRecord::new(PRIMARY_SOURCE, reference);

    record.device_name = document
        .select(&selector("h1.specs-phone-name-title")?)
        .next()
        .map(text_of)
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "Unknown".to_string());

    let cell_selector = selector("th, td")?;
    for row in document.select(&selector(r#"table[cellspacing="0"] tr"#)?) {
        let cells: Vec<String> = row.select(&cell_selector).map(text_of).collect();
        if cells.len() < 2 {
            continue;
        }

        for (i, cell) in cells.iter().enumerate() {
            let Some(value) = cells.get(i + 1) else {
                break;
            };
            if cell.contains("Announced") {
                record.announced_date = announced_part(value);
            } else if cell.contains("Price") {
                record.price = value.clone();
            }
        }

        let key = cells.iter().find(|text| !text.is_empty());
        let value = &cells[cells.len() - 1];
        if let Some(key) = key {
            if !value.is_empty() && key != value {
                record.specifications.insert(key.clone(), value.clone());
            }
        }
    }

    Ok(record)
}

/// `2023, April 18. Released 2023, May 05` -> `2023, April 18`
fn announced_part(value: &str) -> String {
    match value.split_once("Released") {
        Some((announced, _)) => announced.replace('.', "").trim().to_string(),
        None => value.trim().to_string(),
    }
}
