//! SalesIntel core abstractions.
//!
//! This crate holds everything the research agents share: the request/result/report
//! model, schema descriptors and their validator, the completion, page-discovery and
//! text-extraction seams with their HTTP implementations, configuration, and the error taxonomy.

mod completion;
mod config;
mod discovery;
mod error;
mod extractor;
mod model;
mod schema;
mod security;
mod telemetry;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use completion::{CompletionClient, GeminiClient, RawResponse};
pub use config::{Config, ConfigLoader, LlmConfig, LoggingConfig, ScraperConfig};
pub use discovery::{DuckDuckGoDiscovery, PageDiscovery, parse_result_links};
pub use error::{
    CompletionError, FetchError, PromptBuildError, ResearchError, SalesIntelError,
    SchemaValidationError, Stage,
};
pub use extractor::{HttpTextExtractor, TextExtractor, extract_text_from_html};
pub use model::{
    AgentRole, CombinedReport, FieldValue, ReportSection, ResearchRequest, ResearchResult,
    ResultField,
};
pub use schema::{FieldKind, FieldSpec, SchemaDescriptor};
pub use security::{SecretValue, redact, require_env};
pub use telemetry::{TelemetryOptions, init_telemetry};
