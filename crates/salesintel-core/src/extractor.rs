//! Best-effort page text extraction used for prompt enrichment.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE};
use reqwest::{Client, Response};
use tracing::debug;

use crate::config::ScraperConfig;
use crate::error::FetchError;
use crate::security::redact;

/// Elements whose content never reaches the extracted text.
const SKIPPED_ELEMENTS: &[&str] = &[
    "script", "style", "nav", "header", "footer", "iframe", "noscript",
];

/// Bytes of markup read from any one page; the rest of the body is never downloaded.
pub(crate) const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

const BLOCK_ELEMENTS: &[&str] = &[
    "p", "br", "div", "li", "tr", "h1", "h2", "h3", "h4", "h5", "h6", "section", "article",
    "main", "ul", "ol", "table", "blockquote", "pre",
];

#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches a page once, with a single timeout, and strips it down to readable text.
pub struct HttpTextExtractor {
    client: Client,
    max_chars: usize,
}

impl HttpTextExtractor {
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|err| FetchError::Request {
                url: String::new(),
                message: format!("failed to build HTTP client: {err}"),
            })?;

        Ok(Self {
            client,
            max_chars: config.max_chars,
        })
    }
}

#[async_trait]
impl TextExtractor for HttpTextExtractor {
    async fn extract(&self, url: &str) -> Result<String, FetchError> {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(FetchError::InvalidUrl {
                url: url.to_string(),
            });
        }

        let request_failed = |err: reqwest::Error| FetchError::Request {
            url: url.to_string(),
            message: redact(&err.to_string()),
        };

        let response = self
            .client
            .get(url)
            .header(
                ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await
            .map_err(request_failed)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        let body = read_body_capped(response, MAX_BODY_BYTES)
            .await
            .map_err(request_failed)?;

        let text = if content_type.contains("html") || content_type.is_empty() {
            extract_text_from_html(&body)
        } else {
            normalize_whitespace(&body)
        };
        let text = truncate_chars(&text, self.max_chars);

        if text.trim().is_empty() {
            return Err(FetchError::Empty {
                url: url.to_string(),
            });
        }

        debug!(%url, chars = text.chars().count(), "extracted page text");
        Ok(text)
    }
}

/// Read a response body chunk by chunk, stopping at `limit` bytes.
pub(crate) async fn read_body_capped(
    mut response: Response,
    limit: usize,
) -> Result<String, reqwest::Error> {
    let mut body = CappedBody::new(limit, response.content_length());
    while let Some(chunk) = response.chunk().await? {
        if !body.push(&chunk) {
            debug!(limit, "response body truncated at byte cap");
            break;
        }
    }
    Ok(body.into_string())
}

struct CappedBody {
    bytes: Vec<u8>,
    limit: usize,
}

impl CappedBody {
    fn new(limit: usize, content_length: Option<u64>) -> Self {
        let capacity = content_length
            .map(|len| len.min(limit as u64) as usize)
            .unwrap_or(0);
        Self {
            bytes: Vec::with_capacity(capacity),
            limit,
        }
    }

    /// Append a chunk; returns `false` once the cap is reached.
    fn push(&mut self, chunk: &[u8]) -> bool {
        let room = self.limit - self.bytes.len();
        if chunk.len() >= room {
            self.bytes.extend_from_slice(&chunk[..room]);
            return false;
        }
        self.bytes.extend_from_slice(chunk);
        true
    }

    fn into_string(self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Strip markup from an HTML document, keeping one line per block element.
pub fn extract_text_from_html(html: &str) -> String {
    let mut text = String::with_capacity(html.len() / 2);
    let mut skip_depth = 0usize;
    let mut chars = html.chars();

    while let Some(ch) = chars.next() {
        if ch != '<' {
            if skip_depth == 0 {
                text.push(ch);
            }
            continue;
        }

        let mut tag = String::new();
        for inner in chars.by_ref() {
            if inner == '>' {
                break;
            }
            tag.push(inner);
        }

        let trimmed = tag.trim();
        let closing = trimmed.starts_with('/');
        let name: String = trimmed
            .trim_start_matches('/')
            .chars()
            .take_while(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }

        if SKIPPED_ELEMENTS.contains(&name.as_str()) {
            if closing {
                skip_depth = skip_depth.saturating_sub(1);
            } else if !trimmed.ends_with('/') {
                skip_depth += 1;
            }
            continue;
        }

        if skip_depth == 0 && BLOCK_ELEMENTS.contains(&name.as_str()) {
            text.push('\n');
        }
    }

    normalize_whitespace(&decode_entities(&text))
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Collapse runs of whitespace inside lines and drop empty lines.
fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
