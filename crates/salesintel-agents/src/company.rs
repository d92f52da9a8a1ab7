//! Company research agent: executive briefing for a sales team.

use salesintel_core::{AgentRole, FieldSpec, PromptBuildError, ResearchRequest, SchemaDescriptor};

use crate::agent_context::{Enrichment, ResearchAgent, response_instructions};

pub static COMPANY_SCHEMA: SchemaDescriptor = SchemaDescriptor::new(
    "company_research",
    &[
        FieldSpec::required_text(
            "overview",
            "Comprehensive overview of the company's business, mission, and key operations",
        ),
        FieldSpec::required_text(
            "market_position",
            "Position in its industry, main competitors, and market share",
        ),
        FieldSpec::required_list(
            "technology_stack",
            "Technology solutions, platforms, or vendors the company is known to use",
        ),
        FieldSpec::required_list(
            "growth_indicators",
            "Signs of growth or expansion such as hiring, funding, new markets",
        ),
        FieldSpec::required_text(
            "sales_insights",
            "Actionable guidance for a SaaS sales approach to this company",
        ),
        FieldSpec::optional_text("industry", "Main industry"),
        FieldSpec::optional_text("headquarters", "Headquarters location"),
        FieldSpec::optional_text("founded", "Year or date the company was founded"),
        FieldSpec::optional_text("size", "Employee count or size band"),
        FieldSpec::optional_text("ceo", "Current CEO name"),
        FieldSpec::optional_text("website", "Primary website URL"),
        FieldSpec::optional_list("key_products_services", "Main products or services"),
        FieldSpec::optional_list(
            "recent_developments",
            "Recent significant news, acquisitions, or changes",
        ),
        FieldSpec::optional_list(
            "pain_points",
            "Challenges or pain points the company is likely facing",
        ),
        FieldSpec::optional_list(
            "opportunities",
            "Opportunities for a SaaS product given the company's situation",
        ),
        FieldSpec::optional_list("decision_makers", "Key decision makers and their roles"),
        FieldSpec::optional_text(
            "recommended_approach",
            "Suggested approach for reaching out to this company",
        ),
    ],
);

#[derive(Debug, Default, Clone, Copy)]
pub struct CompanyResearchAgent;

impl CompanyResearchAgent {
    pub fn new() -> Self {
        Self
    }
}

impl ResearchAgent for CompanyResearchAgent {
    fn role(&self) -> AgentRole {
        AgentRole::Company
    }

    fn schema(&self) -> &'static SchemaDescriptor {
        &COMPANY_SCHEMA
    }

    fn build_prompt(
        &self,
        request: &ResearchRequest,
        enrichment: Option<&Enrichment>,
    ) -> Result<String, PromptBuildError> {
        let company = request.subject().trim();
        if company.is_empty() {
            return Err(PromptBuildError::MissingField {
                agent: self.role(),
                field: "subject",
            });
        }

        let mut sections = vec![format!(
            "You are a B2B sales research analyst. Prepare an executive briefing on the \
             company \"{company}\" for a SaaS sales team."
        )];

        if let Some(context) = request.context().map(str::trim).filter(|c| !c.is_empty()) {
            sections.push(format!("Additional context from the requester: {context}"));
        }

        sections.push(
            "Consider the company's current challenges, growth stage and trajectory, \
             technology adoption patterns, budget capacity, decision-making structure, and \
             recent developments that might create opportunities."
                .to_string(),
        );

        if let Some(enrichment) = enrichment {
            sections.push(enrichment.render());
        }

        sections.push(response_instructions(self.schema()));
        Ok(sections.join("\n\n"))
    }

    fn discovery_query(&self, request: &ResearchRequest) -> Option<String> {
        Some(format!("{} company overview", request.subject().trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::agent_context::AgentContext;
    use salesintel_core::testing::ScriptedCompletionClient;
    use salesintel_core::{SchemaValidationError, Stage};
    use serde_json::json;

    fn microsoft_response() -> serde_json::Value {
        json!({
            "overview": "Microsoft builds software, devices, and cloud services.",
            "market_position": "Top-three cloud provider and leader in productivity software.",
            "technology_stack": ["Azure", ".NET", "TypeScript"],
            "growth_indicators": ["AI investment", "Cloud revenue growth"],
            "sales_insights": "Lead with compliance and integration with Microsoft 365.",
            "ceo": "Satya Nadella",
            "founded": null,
            "pain_points": []
        })
    }

    #[test]
    fn prompt_names_company_and_all_fields() {
        let prompt = CompanyResearchAgent
            .build_prompt(&ResearchRequest::new("Microsoft"), None)
            .unwrap();

        assert!(prompt.contains("\"Microsoft\""));
        for spec in COMPANY_SCHEMA.fields {
            assert!(prompt.contains(spec.name), "prompt lacks {}", spec.name);
        }
        assert!(!prompt.contains("Additional context"));
    }

    #[test]
    fn prompt_includes_context_and_enrichment() {
        let enrichment = Enrichment {
            sources: vec!["https://microsoft.test/about".into()],
            text: "Founded in 1975 in Albuquerque.".into(),
        };
        let request = ResearchRequest::new("Microsoft").with_context("Focus on Azure");
        let prompt = CompanyResearchAgent
            .build_prompt(&request, Some(&enrichment))
            .unwrap();

        assert!(prompt.contains("Additional context from the requester: Focus on Azure"));
        assert!(prompt.contains("Founded in 1975 in Albuquerque."));
    }

    #[tokio::test]
    async fn research_returns_validated_company_profile() {
        let client = Arc::new(ScriptedCompletionClient::new().then_json(microsoft_response()));
        let context = AgentContext::new(client.clone());

        let result = CompanyResearchAgent
            .research(&context, &ResearchRequest::new("Microsoft"))
            .await
            .unwrap();

        assert_eq!(result.source(), AgentRole::Company);
        assert!(!result.text("overview").unwrap().is_empty());
        assert_eq!(result.list("technology_stack").unwrap().len(), 3);
        assert_eq!(result.text("ceo"), Some("Satya Nadella"));
        assert!(result.get("founded").is_none());
        assert!(result.get("pain_points").is_none());
        assert!(client.prompts()[0].contains("Microsoft"));
    }

    #[tokio::test]
    async fn string_technology_stack_is_rejected() {
        let mut response = microsoft_response();
        response["technology_stack"] = json!("Azure, .NET");
        let client = Arc::new(ScriptedCompletionClient::new().then_json(response));

        let err = CompanyResearchAgent
            .research(
                &AgentContext::new(client),
                &ResearchRequest::new("Microsoft"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Stage::Validation);
        assert!(matches!(
            err,
            salesintel_core::ResearchError::SchemaValidation(
                SchemaValidationError::WrongType { .. }
            )
        ));
    }
}
