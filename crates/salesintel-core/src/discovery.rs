//! Search-based discovery of reference pages for prompt enrichment.
//!
//! [`DuckDuckGoDiscovery`] queries the DuckDuckGo HTML endpoint and returns the top organic
//! result URLs. Ads and DuckDuckGo's own pages are skipped. The result links are redirect
//! URLs (`/l/?uddg=<target>`), which are unwrapped to the target.

use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE};
use reqwest::{Client, Url};
use tracing::debug;

use crate::config::ScraperConfig;
use crate::error::FetchError;
use crate::extractor::{MAX_BODY_BYTES, read_body_capped};
use crate::security::redact;

static RESULT_ANCHOR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\s[^>]*class="[^"]*\bresult__a\b[^"]*"[^>]*>"#)
        .expect("invalid result anchor regex")
});
static HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\bhref="([^"]*)""#).expect("invalid href regex"));

#[async_trait]
pub trait PageDiscovery: Send + Sync {
    /// URLs worth reading for `query`, best first.
    async fn discover(&self, query: &str) -> Result<Vec<String>, FetchError>;
}

pub struct DuckDuckGoDiscovery {
    client: Client,
    search_url: String,
    max_results: usize,
}

impl DuckDuckGoDiscovery {
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|err| FetchError::Request {
                url: config.search_url.clone(),
                message: format!("failed to build HTTP client: {err}"),
            })?;

        Ok(Self {
            client,
            search_url: config.search_url.trim().to_string(),
            max_results: config.max_results,
        })
    }
}

#[async_trait]
impl PageDiscovery for DuckDuckGoDiscovery {
    async fn discover(&self, query: &str) -> Result<Vec<String>, FetchError> {
        let request_failed = |err: reqwest::Error| FetchError::Request {
            url: self.search_url.clone(),
            message: redact(&err.to_string()),
        };

        let response = self
            .client
            .get(&self.search_url)
            .query(&[("q", query)])
            .header(ACCEPT, "text/html,application/xhtml+xml")
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: self.search_url.clone(),
                status: status.as_u16(),
            });
        }

        let body = read_body_capped(response, MAX_BODY_BYTES)
            .await
            .map_err(request_failed)?;
        let urls = parse_result_links(&body, self.max_results);
        debug!(query, found = urls.len(), "search results parsed");
        Ok(urls)
    }
}

/// Organic result targets from a DuckDuckGo HTML results page, deduplicated, in page order.
pub fn parse_result_links(html: &str, limit: usize) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for anchor in RESULT_ANCHOR.find_iter(html) {
        if urls.len() >= limit {
            break;
        }
        let Some(href) = HREF.captures(anchor.as_str()).and_then(|caps| caps.get(1)) else {
            continue;
        };
        if let Some(url) = resolve_result_href(href.as_str()) {
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
    }
    urls
}

fn resolve_result_href(href: &str) -> Option<String> {
    let href = href.trim().replace("&amp;", "&");
    let absolute = if href.starts_with("//") {
        format!("https:{href}")
    } else if href.starts_with('/') {
        format!("https://duckduckgo.com{href}")
    } else {
        href
    };

    let url = Url::parse(&absolute).ok()?;
    let is_search_host = url
        .host_str()
        .is_some_and(|host| host == "duckduckgo.com" || host.ends_with(".duckduckgo.com"));

    let target = if is_search_host {
        if url.path() != "/l/" {
            return None;
        }
        let (_, target) = url.query_pairs().find(|(key, _)| key == "uddg")?;
        Url::parse(&target).ok()?
    } else {
        url
    };

    matches!(target.scheme(), "http" | "https").then(|| target.to_string())
}
