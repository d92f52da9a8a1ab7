//! Agent execution context and the shared research pipeline.
//!
//! Every research agent runs the same four steps: render a prompt, call the completion
//! client with the agent's schema, validate the response, return the result. Agents only
//! supply the template and the schema through [`ResearchAgent`]; [`run_research`] owns the
//! control flow, including optional page enrichment and the single transient retry.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use salesintel_core::{
    AgentRole, CompletionClient, CompletionError, PageDiscovery, PromptBuildError, RawResponse,
    ResearchError, ResearchRequest, ResearchResult, SchemaDescriptor, TextExtractor,
};
use tokio::time::sleep;
use tracing::{debug, info, instrument, warn};

/// Collaborators shared by all agents for one run.
#[derive(Clone)]
pub struct AgentContext {
    client: Arc<dyn CompletionClient>,
    extractor: Option<Arc<dyn TextExtractor>>,
    discovery: Option<Arc<dyn PageDiscovery>>,
    retry_delay: Duration,
}

impl AgentContext {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            extractor: None,
            discovery: None,
            retry_delay: Duration::ZERO,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Search used to find reference pages for requests that carry no URL.
    /// Only consulted when an extractor is configured too.
    pub fn with_discovery(mut self, discovery: Arc<dyn PageDiscovery>) -> Self {
        self.discovery = Some(discovery);
        self
    }

    /// Pause before retrying a transient completion failure.
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn client(&self) -> &dyn CompletionClient {
        self.client.as_ref()
    }

    pub fn extractor(&self) -> Option<&dyn TextExtractor> {
        self.extractor.as_deref()
    }

    pub fn discovery(&self) -> Option<&dyn PageDiscovery> {
        self.discovery.as_deref()
    }
}

/// Page text fetched for a request before its prompt is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub sources: Vec<String>,
    pub text: String,
}

impl Enrichment {
    /// Prompt block introducing the fetched text.
    pub fn render(&self) -> String {
        format!(
            "Reference material extracted from {} (may be incomplete or outdated):\n\"\"\"\n{}\n\"\"\"",
            self.sources.join(", "),
            self.text
        )
    }
}

/// Contract every research agent satisfies.
#[async_trait]
pub trait ResearchAgent: Send + Sync {
    fn role(&self) -> AgentRole;

    /// Declared output shape, sent to the model and enforced on the response.
    fn schema(&self) -> &'static SchemaDescriptor;

    fn build_prompt(
        &self,
        request: &ResearchRequest,
        enrichment: Option<&Enrichment>,
    ) -> Result<String, PromptBuildError>;

    /// Web search for reference pages when the request names none.
    fn discovery_query(&self, _request: &ResearchRequest) -> Option<String> {
        None
    }

    /// Pin fields the request already determines over whatever the model answered.
    fn finalize(&self, _request: &ResearchRequest, result: ResearchResult) -> ResearchResult {
        result
    }

    async fn research(
        &self,
        context: &AgentContext,
        request: &ResearchRequest,
    ) -> Result<ResearchResult, ResearchError> {
        run_research(self, context, request).await
    }
}

/// Drive one request through prompt, completion, and validation.
#[instrument(
    name = "agent.research",
    skip_all,
    fields(role = %agent.role(), subject = %request.subject())
)]
pub async fn run_research<A>(
    agent: &A,
    context: &AgentContext,
    request: &ResearchRequest,
) -> Result<ResearchResult, ResearchError>
where
    A: ResearchAgent + ?Sized,
{
    if request.subject().trim().is_empty() {
        return Err(PromptBuildError::MissingField {
            agent: agent.role(),
            field: "subject",
        }
        .into());
    }

    let enrichment = gather_enrichment(agent, context, request).await;
    let prompt = agent.build_prompt(request, enrichment.as_ref())?;
    let schema = agent.schema();

    debug!(
        schema = schema.name,
        prompt_chars = prompt.len(),
        enriched = enrichment.is_some(),
        "prompt rendered"
    );

    let raw = complete_with_retry(context, &prompt, schema).await?;
    let result = schema.validate(agent.role(), &raw.text).inspect_err(|err| {
        warn!(error = %err, schema = schema.name, "response failed schema validation");
    })?;
    let result = agent.finalize(request, result);

    info!(fields = result.len(), "research result validated");
    Ok(result)
}

/// Fetch reference pages for the request. Failures are logged and dropped.
///
/// The request's own URL wins; otherwise the agent's discovery query picks the pages.
async fn gather_enrichment<A>(
    agent: &A,
    context: &AgentContext,
    request: &ResearchRequest,
) -> Option<Enrichment>
where
    A: ResearchAgent + ?Sized,
{
    let Some(extractor) = context.extractor() else {
        if let Some(url) = request.profile_url() {
            debug!(%url, "no text extractor configured; skipping enrichment");
        }
        return None;
    };

    let urls = match request.profile_url() {
        Some(url) => vec![url.to_string()],
        None => discover_pages(agent, context, request).await,
    };

    let mut sources = Vec::with_capacity(urls.len());
    let mut texts = Vec::with_capacity(urls.len());
    for url in urls {
        match extractor.extract(&url).await {
            Ok(text) => {
                debug!(%url, chars = text.chars().count(), "enrichment text fetched");
                sources.push(url);
                texts.push(text);
            }
            Err(err) => {
                warn!(%url, error = %err, "enrichment fetch failed; continuing without page context");
            }
        }
    }

    if texts.is_empty() {
        return None;
    }
    Some(Enrichment {
        sources,
        text: texts.join("\n\n"),
    })
}

async fn discover_pages<A>(
    agent: &A,
    context: &AgentContext,
    request: &ResearchRequest,
) -> Vec<String>
where
    A: ResearchAgent + ?Sized,
{
    let (Some(discovery), Some(query)) = (context.discovery(), agent.discovery_query(request))
    else {
        return Vec::new();
    };

    match discovery.discover(&query).await {
        Ok(urls) => {
            debug!(%query, found = urls.len(), "reference pages discovered");
            urls
        }
        Err(err) => {
            warn!(%query, error = %err, "page discovery failed; continuing without page context");
            Vec::new()
        }
    }
}

async fn complete_with_retry(
    context: &AgentContext,
    prompt: &str,
    schema: &SchemaDescriptor,
) -> Result<RawResponse, CompletionError> {
    match context.client().complete(prompt, schema).await {
        Ok(raw) => Ok(raw),
        Err(err) if err.is_transient() => {
            warn!(error = %err, "transient completion failure; retrying once");
            if !context.retry_delay.is_zero() {
                sleep(context.retry_delay).await;
            }
            context.client().complete(prompt, schema).await
        }
        Err(err) => Err(err),
    }
}

/// Standard closing block shared by the agent templates.
pub(crate) fn response_instructions(schema: &SchemaDescriptor) -> String {
    format!(
        "Respond with a single JSON object containing these fields:\n{}\n\n\
         Use null for optional fields you cannot determine. Do not include any other text \
         or markdown formatting.",
        schema.describe()
    )
}
