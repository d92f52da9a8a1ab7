//! Query interpreter: turns a free-text query into a research plan.

use salesintel_core::{
    AgentRole, FieldSpec, PromptBuildError, ResearchError, ResearchRequest, ResearchResult,
    SchemaDescriptor, SchemaValidationError,
};
use serde::Serialize;
use tracing::info;

use crate::agent_context::{AgentContext, Enrichment, ResearchAgent, response_instructions};

pub static QUERY_SCHEMA: SchemaDescriptor = SchemaDescriptor::new(
    "research_query",
    &[
        FieldSpec::optional_text("company_name", "Company mentioned in the text, or null"),
        FieldSpec::optional_text("prospect_name", "Person mentioned in the text, or null"),
        FieldSpec::required_text(
            "research_type",
            "One of \"company\", \"prospect\", or \"both\"",
        ),
        FieldSpec::optional_text("company_url", "Company website URL if given, or null"),
        FieldSpec::optional_text("profile_url", "Profile page URL for the person if given, or null"),
    ],
);

/// Which agents a query asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResearchScope {
    Company,
    Prospect,
    Both,
}

impl ResearchScope {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "company" => Some(ResearchScope::Company),
            "prospect" => Some(ResearchScope::Prospect),
            "both" => Some(ResearchScope::Both),
            _ => None,
        }
    }

    pub fn includes_company(&self) -> bool {
        matches!(self, ResearchScope::Company | ResearchScope::Both)
    }

    pub fn includes_prospect(&self) -> bool {
        matches!(self, ResearchScope::Prospect | ResearchScope::Both)
    }
}

/// Interpreted query: what to research and about whom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResearchPlan {
    pub scope: ResearchScope,
    pub company: Option<String>,
    pub prospect: Option<String>,
    pub company_url: Option<String>,
    pub profile_url: Option<String>,
}

impl ResearchPlan {
    /// Build a plan from a result validated against [`QUERY_SCHEMA`].
    pub fn from_result(result: &ResearchResult) -> Result<Self, SchemaValidationError> {
        let raw_scope = result.text("research_type").unwrap_or_default();
        let scope =
            ResearchScope::parse(raw_scope).ok_or_else(|| SchemaValidationError::UnexpectedValue {
                field: "research_type".to_string(),
                value: raw_scope.to_string(),
            })?;

        Ok(Self {
            scope,
            company: name_field(result, "company_name"),
            prospect: name_field(result, "prospect_name"),
            company_url: url_field(result, "company_url"),
            profile_url: url_field(result, "profile_url"),
        })
    }

    pub fn company_request(&self) -> Option<ResearchRequest> {
        if !self.scope.includes_company() {
            return None;
        }
        let company = self.company.as_deref()?;
        let request = ResearchRequest::new(company);
        Some(match &self.company_url {
            Some(url) => request.with_profile_url(url),
            None => request,
        })
    }

    /// Prospect request, carrying the company (when known) as context.
    pub fn prospect_request(&self) -> Option<ResearchRequest> {
        if !self.scope.includes_prospect() {
            return None;
        }
        let mut request = ResearchRequest::new(self.prospect.as_deref()?);
        if let Some(company) = &self.company {
            request = request.with_context(company);
        }
        if let Some(url) = &self.profile_url {
            request = request.with_profile_url(url);
        }
        Some(request)
    }

    /// Whether the plan names at least one party to research.
    pub fn is_actionable(&self) -> bool {
        self.company_request().is_some() || self.prospect_request().is_some()
    }
}

fn name_field(result: &ResearchResult, field: &str) -> Option<String> {
    result
        .text(field)
        .map(str::trim)
        .filter(|value| !value.is_empty() && !value.eq_ignore_ascii_case("null"))
        .map(str::to_string)
}

fn url_field(result: &ResearchResult, field: &str) -> Option<String> {
    result
        .text(field)
        .map(str::trim)
        .filter(|value| value.starts_with("http://") || value.starts_with("https://"))
        .map(str::to_string)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct QueryInterpreter;

impl QueryInterpreter {
    pub fn new() -> Self {
        Self
    }

    pub async fn interpret(
        &self,
        context: &AgentContext,
        query: &str,
    ) -> Result<ResearchPlan, ResearchError> {
        let result = self.research(context, &ResearchRequest::new(query)).await?;
        let plan = ResearchPlan::from_result(&result)?;
        info!(
            scope = ?plan.scope,
            company = plan.company.as_deref().unwrap_or("-"),
            prospect = plan.prospect.as_deref().unwrap_or("-"),
            "query interpreted"
        );
        Ok(plan)
    }
}

impl ResearchAgent for QueryInterpreter {
    fn role(&self) -> AgentRole {
        AgentRole::QueryInterpreter
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &QUERY_SCHEMA
    }

    fn build_prompt(
        &self,
        request: &ResearchRequest,
        _enrichment: Option<&Enrichment>,
    ) -> Result<String, PromptBuildError> {
        let query = request.subject().trim();
        if query.is_empty() {
            return Err(PromptBuildError::MissingField {
                agent: self.role(),
                field: "subject",
            });
        }

        Ok(format!(
            "Analyze the following research request and identify the company name (if \
             mentioned), the prospect's name (if mentioned), and whether company research, \
             prospect research, or both are needed.\n\nText: {query}\n\n{}",
            response_instructions(self.schema())
        ))
    }
}
