//! Site-restricted web search used to cross-reference model codes

use super::html::{selector, text_of};
use super::{AdapterError, LinkSearch};
use crate::pool::{SessionFactory, SessionPool};
use crate::record::CandidateLink;
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const SEARCH_SOURCE: &str = "google";

/// Result list container on the search results page
const RESULTS_ELEMENT: &str = "#rso";

pub struct WebSearch<F: SessionFactory> {
    base_url: Url,
    pool: Arc<SessionPool<F>>,
    consumer: String,
    acquire_timeout: Duration,
}

impl<F: SessionFactory> WebSearch<F> {
    pub fn new(
        base_url: Url,
        pool: Arc<SessionPool<F>>,
        consumer: impl Into<String>,
        acquire_timeout: Duration,
    ) -> Self {
        Self {
            base_url,
            pool,
            consumer: consumer.into(),
            acquire_timeout,
        }
    }
}

#[async_trait]
impl<F: SessionFactory> LinkSearch for WebSearch<F> {
    fn name(&self) -> &str {
        SEARCH_SOURCE
    }

    async fn find_links(
        &self,
        query: &str,
        site_domain: &str,
    ) -> Result<Vec<CandidateLink>, AdapterError> {
        let mut url = self
            .base_url
            .join("search")
            .map_err(|e| AdapterError::Parse(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("q", &format!("{} site:{}", query, site_domain));

        tracing::debug!("Web search: {} site:{}", query, site_domain);
        let html = self
            .pool
            .render(
                &self.consumer,
                self.acquire_timeout,
                url.as_str(),
                Some(RESULTS_ELEMENT),
            )
            .await?;

        parse_result_links(&html, site_domain)
    }
}

/// Extracts result links pointing at `site_domain`, in result order
///
/// Each result block contributes its first absolute link; the title is the
/// block's `h3` when present.
pub fn parse_result_links(html: &str, site_domain: &str) -> Result<Vec<CandidateLink>, AdapterError> {
    let document = Html::parse_fragment(html);
    let anchor_selector = selector("a[href]")?;
    let title_selector = selector("h3")?;

    let mut links: Vec<CandidateLink> = Vec::new();
    for item in document.select(&selector("div.MjjYud")?) {
        let Some(anchor) = item.select(&anchor_selector).next() else {
            continue;
        };
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if !href.starts_with("http") || !href.contains(site_domain) {
            continue;
        }
        if links.iter().any(|l| l.target == href) {
            continue;
        }

        let title = anchor
            .select(&title_selector)
            .next()
            .map(text_of)
            .unwrap_or_else(|| text_of(anchor));
        links.push(CandidateLink::new(title, href, links.len() + 1));
    }

    Ok(links)
}
