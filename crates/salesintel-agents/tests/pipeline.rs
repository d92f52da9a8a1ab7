use std::sync::Arc;

use salesintel_agents::{
    AgentContext, CompanyResearchAgent, ProspectResearchAgent, QueryOutcome, ResearchAgent,
    Researcher,
};
use salesintel_core::testing::{ScriptedCompletionClient, StaticDiscovery, StaticExtractor};
use salesintel_core::{
    AgentRole, CompletionError, FetchError, RawResponse, ResearchError, ResearchRequest, Stage,
};
use serde_json::json;

/// Fake model that answers according to the schema it was asked for.
fn fake_model() -> ScriptedCompletionClient {
    ScriptedCompletionClient::responding(|_prompt, schema| {
        let body = match schema.name {
            "research_query" => json!({
                "company_name": "Apple",
                "prospect_name": "John Smith",
                "research_type": "both",
                "profile_url": "https://profiles.test/jsmith"
            }),
            "company_research" => json!({
                "overview": "Apple designs consumer electronics and software.",
                "market_position": "Premium leader in smartphones.",
                "technology_stack": ["Swift", "Objective-C"],
                "growth_indicators": ["Services revenue growth"],
                "sales_insights": "Emphasise privacy and polish.",
                "headquarters": "Cupertino, California"
            }),
            "prospect_research" => json!({
                "name": "John Smith",
                "role": "Director of IT",
                "company": "Apple Inc.",
                "background": "Led infrastructure teams for a decade.",
                "decision_maker_assessment": "Signs off on tooling purchases."
            }),
            other => {
                return Err(CompletionError::MalformedEnvelope {
                    message: format!("unexpected schema {other}"),
                });
            }
        };
        Ok(RawResponse::new(body.to_string()))
    })
}

#[tokio::test]
async fn query_produces_company_then_prospect_sections() {
    let client = Arc::new(fake_model());
    let extractor = Arc::new(StaticExtractor::text("John Smith, Director of IT at Apple."));
    let context = AgentContext::new(client.clone()).with_extractor(extractor.clone());
    let researcher = Researcher::new(context);

    let outcome = researcher
        .run_query("Research John Smith from Apple")
        .await
        .expect("pipeline should succeed");

    let report = match outcome {
        QueryOutcome::Report(report) => report,
        other => panic!("expected a report, got {other:?}"),
    };
    let sections = report.sections();
    assert_eq!(sections.len(), 2);
    assert_eq!(sections[0].source, AgentRole::Company);
    assert_eq!(sections[1].source, AgentRole::Prospect);
    assert_eq!(
        sections[1].get("company").and_then(|value| value.as_text()),
        Some("Apple")
    );

    assert_eq!(client.calls(), 3);
    assert_eq!(extractor.requested_urls(), vec!["https://profiles.test/jsmith"]);
    assert!(client.prompts()[2].contains("Director of IT at Apple."));

    let rendered = report.to_string();
    assert!(rendered.starts_with("Company Information\n"));
    assert!(rendered.contains("Headquarters: Cupertino, California"));
    assert!(rendered.contains("Prospect Information\n"));
    assert!(rendered.contains("  - Swift\n"));
}

#[tokio::test]
async fn company_without_url_is_enriched_from_search() {
    let client = Arc::new(fake_model());
    let extractor = Arc::new(StaticExtractor::text("Apple is headquartered in Cupertino."));
    let discovery = Arc::new(StaticDiscovery::urls(["https://apple.test/"]));
    let context = AgentContext::new(client.clone())
        .with_extractor(extractor.clone())
        .with_discovery(discovery.clone());

    let outcome = Researcher::new(context)
        .run_query("Research John Smith from Apple")
        .await
        .unwrap();

    assert!(matches!(outcome, QueryOutcome::Report(ref report) if report.len() == 2));
    assert_eq!(discovery.queries(), vec!["Apple company overview"]);
    assert_eq!(
        extractor.requested_urls(),
        vec!["https://apple.test/", "https://profiles.test/jsmith"]
    );
    assert!(client.prompts()[1].contains("Apple is headquartered in Cupertino."));
}

#[tokio::test]
async fn microsoft_request_yields_non_empty_overview() {
    let client = Arc::new(ScriptedCompletionClient::new().then_json(json!({
        "overview": "Microsoft builds software and cloud services.",
        "market_position": "Leader",
        "technology_stack": ["Azure"],
        "growth_indicators": ["AI"],
        "sales_insights": "Integrate with Teams."
    })));

    let result = CompanyResearchAgent
        .research(
            &AgentContext::new(client.clone()),
            &ResearchRequest::new("Microsoft"),
        )
        .await
        .unwrap();

    assert!(client.prompts()[0].contains("Microsoft"));
    assert!(!result.text("overview").unwrap_or_default().is_empty());
}

#[tokio::test]
async fn results_are_either_complete_or_a_stage_error() {
    let responses = [
        json!({ "name": "Jane", "role": "CTO" }),
        json!({
            "name": "Jane",
            "role": "CTO",
            "company": "Initech",
            "background": 42,
            "decision_maker_assessment": "High"
        }),
        json!(["not", "an", "object"]),
    ];

    for response in responses {
        let client = Arc::new(ScriptedCompletionClient::new().then_json(response.clone()));
        let err = ProspectResearchAgent
            .research(
                &AgentContext::new(client),
                &ResearchRequest::new("Jane").with_context("Initech"),
            )
            .await
            .expect_err("incomplete response must not validate");
        assert_eq!(err.stage(), Stage::Validation, "response {response}");
    }
}

#[tokio::test]
async fn unreachable_enrichment_page_does_not_fail_research() {
    let client = Arc::new(fake_model());
    let extractor = Arc::new(StaticExtractor::failing(FetchError::Request {
        url: "https://unreachable.test".into(),
        message: "dns error".into(),
    }));
    let context = AgentContext::new(client).with_extractor(extractor);
    let request = ResearchRequest::new("John Smith")
        .with_context("Apple")
        .with_profile_url("https://unreachable.test");

    let result = ProspectResearchAgent
        .research(&context, &request)
        .await
        .unwrap();
    assert_eq!(result.text("company"), Some("Apple"));
}

#[tokio::test]
async fn prospect_failure_propagates_unchanged() {
    let client = Arc::new(
        ScriptedCompletionClient::new()
            .then_json(json!({
                "company_name": "Apple",
                "prospect_name": "John Smith",
                "research_type": "prospect"
            }))
            .then_error(CompletionError::AuthFailed {
                provider: "Gemini".into(),
            }),
    );
    let researcher = Researcher::new(AgentContext::new(client));

    let err = researcher
        .run_query("Research John Smith from Apple")
        .await
        .unwrap_err();

    assert_eq!(
        err,
        ResearchError::Completion(CompletionError::AuthFailed {
            provider: "Gemini".into()
        })
    );
}
