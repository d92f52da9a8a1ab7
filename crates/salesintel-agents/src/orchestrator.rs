//! Researcher orchestrator: interpret a query, run the agents it calls for, combine the results.
//!
//! Agents run one after another. The company agent (when requested) goes first, then the
//! prospect agent with the company as context, then the synthesizer. Any agent failure
//! aborts the run and propagates unchanged.

use std::time::Instant;

use salesintel_core::{CombinedReport, ResearchError};
use tracing::{info, instrument};

use crate::agent_context::{AgentContext, ResearchAgent};
use crate::company::CompanyResearchAgent;
use crate::interpreter::{QueryInterpreter, ResearchPlan};
use crate::prospect::ProspectResearchAgent;
use crate::synthesizer::SynthesizerAgent;

/// Result of handling one free-text query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Report(CombinedReport),
    /// The query named neither a company nor a prospect.
    Unrecognized(ResearchPlan),
}

pub struct Researcher {
    context: AgentContext,
    company: CompanyResearchAgent,
    prospect: ProspectResearchAgent,
    interpreter: QueryInterpreter,
    synthesizer: SynthesizerAgent,
}

impl Researcher {
    pub fn new(context: AgentContext) -> Self {
        Self {
            context,
            company: CompanyResearchAgent::new(),
            prospect: ProspectResearchAgent::new(),
            interpreter: QueryInterpreter::new(),
            synthesizer: SynthesizerAgent::new(),
        }
    }

    pub fn context(&self) -> &AgentContext {
        &self.context
    }

    pub async fn plan(&self, query: &str) -> Result<ResearchPlan, ResearchError> {
        self.interpreter.interpret(&self.context, query).await
    }

    /// Run the agents a plan calls for and synthesize their results.
    #[instrument(name = "researcher.execute", skip_all, fields(scope = ?plan.scope))]
    pub async fn execute(&self, plan: &ResearchPlan) -> Result<CombinedReport, ResearchError> {
        let started = Instant::now();
        let mut results = Vec::with_capacity(2);

        if let Some(request) = plan.company_request() {
            results.push(self.company.research(&self.context, &request).await?);
        }
        if let Some(request) = plan.prospect_request() {
            results.push(self.prospect.research(&self.context, &request).await?);
        }

        let report = self.synthesizer.synthesize(results);
        info!(
            sections = report.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "research completed"
        );
        Ok(report)
    }

    pub async fn run_query(&self, query: &str) -> Result<QueryOutcome, ResearchError> {
        let plan = self.plan(query).await?;
        if !plan.is_actionable() {
            info!("query names neither a company nor a prospect");
            return Ok(QueryOutcome::Unrecognized(plan));
        }
        self.execute(&plan).await.map(QueryOutcome::Report)
    }
}
