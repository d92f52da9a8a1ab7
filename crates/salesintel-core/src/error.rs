use std::{fmt, path::PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::model::AgentRole;
use crate::schema::FieldKind;

/// Configuration and secret loading failures.
#[derive(Debug, Error)]
pub enum SalesIntelError {
    #[error("configuration error: {0}")]
    InvalidConfiguration(String),
    #[error("missing environment variable: {0}")]
    MissingSecret(String),
    #[error("I/O error while reading {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SalesIntelError {
    pub fn config_io(path: PathBuf, source: std::io::Error) -> Self {
        Self::ConfigIo { path, source }
    }
}

/// The request cannot be rendered into the agent's prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromptBuildError {
    #[error("{agent} request is missing required field `{field}`")]
    MissingField {
        agent: AgentRole,
        field: &'static str,
    },
}

/// The completion call did not produce a response body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("transport failure: {message}")]
    Transport { message: String },
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
    #[error("authentication rejected by {provider}")]
    AuthFailed { provider: String },
    #[error("rate limited by provider")]
    RateLimited { retry_after_secs: Option<u64> },
    #[error("HTTP {status} from provider: {message}")]
    Api { status: u16, message: String },
    #[error("unexpected provider response: {message}")]
    MalformedEnvelope { message: String },
}

impl CompletionError {
    /// Network-level failures that a single resubmission may cure.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CompletionError::Transport { .. } | CompletionError::Timeout { .. }
        )
    }
}

/// The model answered, but not in the declared shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaValidationError {
    #[error("response is not valid JSON: {message}")]
    NotJson { message: String },
    #[error("response is a JSON {found}, expected an object")]
    NotAnObject { found: &'static str },
    #[error("required field `{field}` is missing")]
    MissingField { field: String },
    #[error("required field `{field}` is blank")]
    BlankField { field: String },
    #[error("field `{field}` should be {expected}")]
    WrongType { field: String, expected: FieldKind },
    #[error("field `{field}` has unsupported value `{value}`")]
    UnexpectedValue { field: String, value: String },
}

/// Enrichment page could not be turned into text. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("unsupported URL `{url}`")]
    InvalidUrl { url: String },
    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("no readable text at {url}")]
    Empty { url: String },
}

/// Pipeline stage a research call failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PromptConstruction,
    Completion,
    Validation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::PromptConstruction => "prompt construction",
            Stage::Completion => "completion",
            Stage::Validation => "validation",
        };
        f.write_str(label)
    }
}

/// Uniform failure of an agent's research call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResearchError {
    #[error("prompt construction failed: {0}")]
    PromptBuild(#[from] PromptBuildError),
    #[error("completion failed: {0}")]
    Completion(#[from] CompletionError),
    #[error("response validation failed: {0}")]
    SchemaValidation(#[from] SchemaValidationError),
}

impl ResearchError {
    pub fn stage(&self) -> Stage {
        match self {
            ResearchError::PromptBuild(_) => Stage::PromptConstruction,
            ResearchError::Completion(_) => Stage::Completion,
            ResearchError::SchemaValidation(_) => Stage::Validation,
        }
    }
}
