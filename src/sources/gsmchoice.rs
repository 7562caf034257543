//! Secondary catalog adapter
//!
//! Used mostly to turn an opaque model code into a display name the primary
//! catalog can find. Search goes through the site's JSON suggestion API and
//! falls back to the HTML search page.

use super::html::{selector, text_of};
use super::{AdapterError, Fetcher, SourceAdapter};
use crate::normalize::Brand;
use crate::record::{CandidateLink, PartialRecord};
use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use serde::Deserialize;
use std::sync::OnceLock;
use url::Url;

pub const SECONDARY_SOURCE: &str = "gsmchoice";

/// One entry of the suggestion API response
#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    sbrand: String,
    #[serde(default)]
    smodel: String,
    #[serde(default)]
    model: String,
}

fn catalogue_link() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"/en/catalogue/.*\.php").ok())
        .as_ref()
}

pub struct GsmChoice {
    base_url: Url,
    fetcher: Fetcher,
}

impl GsmChoice {
    pub fn new(base_url: Url, fetcher: Fetcher) -> Self {
        Self { base_url, fetcher }
    }

    fn endpoint(&self, path: &str) -> Result<Url, AdapterError> {
        self.base_url
            .join(path)
            .map_err(|e| AdapterError::Parse(format!("bad endpoint '{}': {}", path, e)))
    }

    async fn search_api(&self, query: &str) -> Result<Vec<CandidateLink>, AdapterError> {
        let mut url = self.endpoint("js/searchy.xhtml")?;
        url.query_pairs_mut()
            .append_pair("search", query)
            .append_pair("lang", "en")
            .append_pair("v", "3");

        let hits: Vec<SearchHit> = self.fetcher.get_json(url.as_str()).await?;
        self.links_from_hits(hits)
    }

    fn links_from_hits(&self, hits: Vec<SearchHit>) -> Result<Vec<CandidateLink>, AdapterError> {
        let mut links = Vec::new();
        for hit in hits {
            let brand = hit.sbrand.trim();
            let model = hit.smodel.trim();
            if brand.is_empty() || model.is_empty() {
                continue;
            }

            let target = self.endpoint(&format!("en/catalogue/{}/{}/", brand, model))?;
            let name = if hit.model.trim().is_empty() {
                format!("{} {}", brand, model.replace('-', " "))
            } else {
                hit.model.trim().to_string()
            };
            links.push(CandidateLink::new(name, target.to_string(), links.len() + 1));
        }
        Ok(links)
    }

    async fn search_web(&self, query: &str) -> Result<Vec<CandidateLink>, AdapterError> {
        let mut url = self.endpoint("en/search/")?;
        url.query_pairs_mut().append_pair("sSearch4", query);

        let html = self.fetcher.get_text(url.as_str()).await?;
        parse_search_page(&html, &self.base_url)
    }

    async fn search(&self, query: &str) -> Result<Vec<CandidateLink>, AdapterError> {
        match self.search_api(query).await {
            Ok(links) if !links.is_empty() => return Ok(links),
            Ok(_) => tracing::debug!("{} API has no hits for '{}'", SECONDARY_SOURCE, query),
            Err(e) => tracing::warn!("{} API search failed for '{}': {}", SECONDARY_SOURCE, query, e),
        }
        self.search_web(query).await
    }
}

#[async_trait]
impl SourceAdapter for GsmChoice {
    fn name(&self) -> &str {
        SECONDARY_SOURCE
    }

    async fn search_by_identifier(
        &self,
        identifier: &str,
        _brand: Option<Brand>,
    ) -> Result<Vec<CandidateLink>, AdapterError> {
        self.search(identifier).await
    }

    async fn search_by_name(&self, name: &str) -> Result<Vec<CandidateLink>, AdapterError> {
        self.search(name).await
    }

    async fn extract_detail(&self, reference: &str) -> Result<PartialRecord, AdapterError> {
        let html = self.fetcher.get_text(reference).await?;
        parse_catalogue_page(&html, reference)
    }
}

/// Links to catalogue pages on the HTML search page, in page order
fn parse_search_page(html: &str, base_url: &Url) -> Result<Vec<CandidateLink>, AdapterError> {
    let document = Html::parse_document(html);
    let mut links: Vec<CandidateLink> = Vec::new();

    for anchor in document.select(&selector("a[href]")?) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !catalogue_link().is_some_and(|re| re.is_match(href)) {
            continue;
        }
        let Ok(target) = base_url.join(href) else {
            continue;
        };
        if links.iter().any(|l| l.target == target.as_str()) {
            continue;
        }

        let name = text_of(anchor);
        links.push(CandidateLink::new(name, target.to_string(), links.len() + 1));
    }

    Ok(links)
}

/// Parses a catalogue page into a name, an announced date and spec rows
pub fn parse_catalogue_page(html: &str, reference: &str) -> Result<PartialRecord, AdapterError> {
    let document = Html::parse_document(html);
    let mut record = PartialRecord::new(SECONDARY_SOURCE, reference);

    let heading = document
        .select(&selector("div#PhoneModelName h1.infoline__title span")?)
        .next()
        .map(text_of)
        .filter(|name| !name.is_empty());

    record.device_name = match heading {
        Some(name) => name,
        None => document
            .select(&selector("title")?)
            .next()
            .map(text_of)
            .and_then(|title| {
                let name = title.split(" - ").next()?.split(" | ").next()?.trim().to_string();
                (!name.is_empty()).then_some(name)
            })
            .unwrap_or_default(),
    };

    let key_selector = selector("th.phoneCategoryName")?;
    let value_selector = selector("td.phoneCategoryValue")?;
    let span_selector = selector("span")?;

    for row in document.select(&selector("table.PhoneData tr")?) {
        let (Some(key), Some(value)) = (
            row.select(&key_selector).next(),
            row.select(&value_selector).next(),
        ) else {
            continue;
        };

        let key = text_of(key);
        if key.is_empty() {
            continue;
        }

        if key.contains("Announced") && record.announced_date.is_empty() {
            if let Some(span) = value.select(&span_selector).next() {
                record.announced_date = text_of(span);
            }
        }

        let value = text_of(value);
        if !value.is_empty() {
            record.specifications.insert(key, value);
        }
    }

    if record.device_name.is_empty() && record.specifications.is_empty() {
        return Err(AdapterError::Parse(format!(
            "no device data on catalogue page {}",
            reference
        )));
    }

    Ok(record)
}
