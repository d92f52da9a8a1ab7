//! In-memory collaborators for exercising agents without network access.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::completion::{CompletionClient, RawResponse};
use crate::discovery::PageDiscovery;
use crate::error::{CompletionError, FetchError};
use crate::extractor::TextExtractor;
use crate::schema::SchemaDescriptor;

type Responder =
    Box<dyn Fn(&str, &SchemaDescriptor) -> Result<RawResponse, CompletionError> + Send + Sync>;

/// Completion client that replays queued outcomes, then falls back to a responder.
#[derive(Default)]
pub struct ScriptedCompletionClient {
    queue: Mutex<VecDeque<Result<RawResponse, CompletionError>>>,
    responder: Option<Responder>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletionClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every call not covered by the queue with `responder`.
    pub fn responding<F>(responder: F) -> Self
    where
        F: Fn(&str, &SchemaDescriptor) -> Result<RawResponse, CompletionError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            responder: Some(Box::new(responder)),
            ..Self::default()
        }
    }

    pub fn then_json(self, value: Value) -> Self {
        self.then_text(value.to_string())
    }

    pub fn then_text(self, text: impl Into<String>) -> Self {
        self.push(Ok(RawResponse::new(text)));
        self
    }

    pub fn then_error(self, err: CompletionError) -> Self {
        self.push(Err(err));
        self
    }

    fn push(&self, outcome: Result<RawResponse, CompletionError>) {
        self.queue
            .lock()
            .expect("scripted queue poisoned")
            .push_back(outcome);
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompt log poisoned").clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().expect("prompt log poisoned").len()
    }
}

#[async_trait]
impl CompletionClient for ScriptedCompletionClient {
    async fn complete(
        &self,
        prompt: &str,
        schema: &SchemaDescriptor,
    ) -> Result<RawResponse, CompletionError> {
        self.prompts
            .lock()
            .expect("prompt log poisoned")
            .push(prompt.to_string());

        let queued = self.queue.lock().expect("scripted queue poisoned").pop_front();
        match (queued, &self.responder) {
            (Some(outcome), _) => outcome,
            (None, Some(responder)) => responder(prompt, schema),
            (None, None) => Err(CompletionError::MalformedEnvelope {
                message: "no scripted response left".to_string(),
            }),
        }
    }
}

/// Extractor returning one fixed outcome for every URL.
pub struct StaticExtractor {
    outcome: Result<String, FetchError>,
    urls: Mutex<Vec<String>>,
}

impl StaticExtractor {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            outcome: Ok(text.into()),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: FetchError) -> Self {
        Self {
            outcome: Err(err),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_urls(&self) -> Vec<String> {
        self.urls.lock().expect("url log poisoned").clone()
    }
}

#[async_trait]
impl TextExtractor for StaticExtractor {
    async fn extract(&self, url: &str) -> Result<String, FetchError> {
        self.urls
            .lock()
            .expect("url log poisoned")
            .push(url.to_string());
        self.outcome.clone()
    }
}

/// Discovery returning one fixed list of URLs (or one error) for every query.
pub struct StaticDiscovery {
    outcome: Result<Vec<String>, FetchError>,
    queries: Mutex<Vec<String>>,
}

impl StaticDiscovery {
    pub fn urls<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outcome: Ok(urls.into_iter().map(Into::into).collect()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(err: FetchError) -> Self {
        Self {
            outcome: Err(err),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("query log poisoned").clone()
    }
}

#[async_trait]
impl PageDiscovery for StaticDiscovery {
    async fn discover(&self, query: &str) -> Result<Vec<String>, FetchError> {
        self.queries
            .lock()
            .expect("query log poisoned")
            .push(query.to_string());
        self.outcome.clone()
    }
}
