//! Research agents built on `salesintel-core`.
//!
//! [`CompanyResearchAgent`] and [`ProspectResearchAgent`] supply a prompt template and a
//! schema; [`run_research`] drives both through the same pipeline. [`Researcher`] ties the
//! query interpreter, the two agents and the [`SynthesizerAgent`] together for the CLI.

pub mod agent_context;
pub mod company;
pub mod interpreter;
pub mod orchestrator;
pub mod prospect;
pub mod synthesizer;

pub use agent_context::{AgentContext, Enrichment, ResearchAgent, run_research};
pub use company::{COMPANY_SCHEMA, CompanyResearchAgent};
pub use interpreter::{QUERY_SCHEMA, QueryInterpreter, ResearchPlan, ResearchScope};
pub use orchestrator::{QueryOutcome, Researcher};
pub use prospect::{PROSPECT_SCHEMA, ProspectResearchAgent};
pub use synthesizer::SynthesizerAgent;
