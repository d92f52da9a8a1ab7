//! Prospect research agent: profile of an individual contact.

use salesintel_core::{
    AgentRole, FieldSpec, PromptBuildError, ResearchRequest, ResearchResult, SchemaDescriptor,
};

use crate::agent_context::{Enrichment, ResearchAgent, response_instructions};

pub static PROSPECT_SCHEMA: SchemaDescriptor = SchemaDescriptor::new(
    "prospect_research",
    &[
        FieldSpec::required_text("name", "Full name of the prospect"),
        FieldSpec::required_text("role", "Current job title"),
        FieldSpec::required_text("company", "Current employer"),
        FieldSpec::required_text(
            "background",
            "Professional background: career path, expertise, notable achievements",
        ),
        FieldSpec::required_text(
            "decision_maker_assessment",
            "How much buying authority and influence this person likely has, and why",
        ),
        FieldSpec::optional_text("location", "Current location"),
        FieldSpec::optional_list("experience", "Previous job titles and companies"),
        FieldSpec::optional_list("education", "Educational background"),
        FieldSpec::optional_text("linkedin_url", "LinkedIn profile URL if known"),
    ],
);

#[derive(Debug, Default, Clone, Copy)]
pub struct ProspectResearchAgent;

impl ProspectResearchAgent {
    pub fn new() -> Self {
        Self
    }
}

impl ResearchAgent for ProspectResearchAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Prospect
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &PROSPECT_SCHEMA
    }

    fn build_prompt(
        &self,
        request: &ResearchRequest,
        enrichment: Option<&Enrichment>,
    ) -> Result<String, PromptBuildError> {
        let name = request.subject().trim();
        if name.is_empty() {
            return Err(PromptBuildError::MissingField {
                agent: self.role(),
                field: "subject",
            });
        }
        let known_employer = employer(request);

        let mut sections = Vec::with_capacity(5);
        sections.push(match known_employer {
            Some(company) => format!(
                "You are a B2B sales research analyst. Build a professional profile of \
                 \"{name}\" who works at \"{company}\"."
            ),
            None => format!(
                "You are a B2B sales research analyst. Build a professional profile of \
                 \"{name}\"."
            ),
        });

        if let Some(company) = known_employer {
            sections.push(format!(
                "The person is known to work at {company}; use exactly \"{company}\" for the \
                 \"company\" field."
            ));
        }

        sections.push(
            "Focus on their current title, career history, education, and their likely role \
             in purchasing decisions."
                .to_string(),
        );

        if let Some(enrichment) = enrichment {
            sections.push(enrichment.render());
        }

        sections.push(response_instructions(self.schema()));
        Ok(sections.join("\n\n"))
    }

    fn discovery_query(&self, request: &ResearchRequest) -> Option<String> {
        let name = request.subject().trim();
        Some(match employer(request) {
            Some(company) => format!("{name} {company} profile"),
            None => format!("{name} profile"),
        })
    }

    /// The requested person and employer are facts, not something the model decides.
    fn finalize(&self, request: &ResearchRequest, result: ResearchResult) -> ResearchResult {
        let result = result.with_text_override("name", request.subject().trim());
        match employer(request) {
            Some(company) => result.with_text_override("company", company),
            None => result,
        }
    }
}

fn employer(request: &ResearchRequest) -> Option<&str> {
    request.context().map(str::trim).filter(|c| !c.is_empty())
}
