use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use salesintel_agents::{AgentContext, QueryOutcome, Researcher};
use salesintel_core::{
    ConfigLoader, DuckDuckGoDiscovery, GeminiClient, HttpTextExtractor, ResearchError, TelemetryOptions,
    init_telemetry, redact,
};
use tokio::runtime::Runtime;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

const EXIT_RESEARCH_FAILED: u8 = 1;
const EXIT_USAGE: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "salesintel",
    version,
    about = "Research a company and/or a prospect with a generative model"
)]
struct Cli {
    /// Free-text request, e.g. "Research John Smith from Apple".
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,

    /// Configuration file (defaults to $SALESINTEL_CONFIG, then ./salesintel.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Dotenv file to load before resolving the API key (defaults to ./.env if present).
    #[arg(long)]
    env_file: Option<PathBuf>,
}

impl Cli {
    /// The query as one line, or `None` when it is blank.
    fn query_text(&self) -> Option<String> {
        let query = self.query.join(" ");
        let query = query.trim();
        (!query.is_empty()).then(|| query.to_string())
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {}", redact(&format!("{err:#}")));
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let Some(query) = cli.query_text() else {
        eprintln!("error: the research query must not be blank");
        return Ok(ExitCode::from(EXIT_USAGE));
    };

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => ignore_missing(dotenvy::dotenv()).context("failed to load ./.env")?,
    }

    let config = ConfigLoader::load(cli.config.clone()).context("failed to load configuration")?;
    init_telemetry(TelemetryOptions {
        default_level: config.logging.level.clone(),
        ..TelemetryOptions::default()
    })?;

    let api_key = config.llm_api_key()?;
    let client = GeminiClient::new(&config.llm, api_key).context("failed to build LLM client")?;
    info!(model = client.model(), "LLM client ready");

    let mut context = AgentContext::new(Arc::new(client))
        .with_retry_delay(Duration::from_millis(config.llm.retry_delay_ms));
    if config.scraper.enabled {
        let extractor =
            HttpTextExtractor::new(&config.scraper).context("failed to build page extractor")?;
        context = context.with_extractor(Arc::new(extractor));
        if config.scraper.discovery {
            let discovery =
                DuckDuckGoDiscovery::new(&config.scraper).context("failed to build page search")?;
            context = context.with_discovery(Arc::new(discovery));
        }
    } else {
        warn!("page enrichment disabled by configuration");
    }

    let researcher = Researcher::new(context);
    let query_id = Uuid::new_v4();
    let span = info_span!("query", %query_id);

    let rt = Runtime::new()?;
    let outcome = rt.block_on(researcher.run_query(&query).instrument(span));
    Ok(ExitCode::from(report_outcome(outcome)))
}

/// A missing default `.env` is fine; an unreadable or malformed one is not.
fn ignore_missing<T>(result: Result<T, dotenvy::Error>) -> Result<(), dotenvy::Error> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err),
    }
}

/// Print the outcome and choose the process exit code.
fn report_outcome(outcome: Result<QueryOutcome, ResearchError>) -> u8 {
    match outcome {
        Ok(QueryOutcome::Report(report)) => {
            print!("{report}");
            0
        }
        Ok(QueryOutcome::Unrecognized(_)) => {
            eprintln!(
                "Could not understand the request. Name a company, a person, or both, \
                 e.g. \"Research John Smith from Apple\"."
            );
            EXIT_USAGE
        }
        Err(err) => {
            let message = redact(&err.to_string());
            error!(stage = %err.stage(), error = %message, "research failed");
            eprintln!("research failed during {}: {message}", err.stage());
            EXIT_RESEARCH_FAILED
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use salesintel_core::CompletionError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn query_words_are_joined() {
        let cli = Cli::try_parse_from(["salesintel", "Tell", "me", "about", "Microsoft"]).unwrap();
        assert_eq!(cli.query_text().as_deref(), Some("Tell me about Microsoft"));
        assert!(cli.config.is_none());
        assert!(cli.env_file.is_none());
    }

    #[test]
    fn config_and_env_file_flags_are_accepted() {
        let cli = Cli::try_parse_from([
            "salesintel",
            "--config",
            "custom.toml",
            "--env-file",
            "secrets.env",
            "Research John Smith from Apple",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        assert_eq!(cli.env_file, Some(PathBuf::from("secrets.env")));
        assert_eq!(
            cli.query_text().as_deref(),
            Some("Research John Smith from Apple")
        );
    }

    #[test]
    fn missing_query_is_a_usage_error() {
        assert!(Cli::try_parse_from(["salesintel"]).is_err());
    }

    #[test]
    fn blank_query_is_rejected_before_any_work() {
        let cli = Cli::try_parse_from(["salesintel", " ", "\t"]).unwrap();
        assert_eq!(cli.query_text(), None);
    }

    #[test]
    fn missing_env_file_is_tolerated() {
        let missing = dotenvy::from_path("/nonexistent/salesintel/.env");
        assert!(ignore_missing(missing).is_ok());
    }

    #[test]
    fn malformed_env_file_is_reported() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "SALESINTEL_TEST_BROKEN=\"unterminated").unwrap();

        let loaded = dotenvy::from_path(file.path());
        assert!(ignore_missing(loaded).is_err());
    }

    #[test]
    fn empty_report_exits_with_zero() {
        let outcome = Ok(QueryOutcome::Report(Default::default()));
        assert_eq!(report_outcome(outcome), 0);
    }

    #[test]
    fn failed_research_exits_with_one() {
        let outcome = Err(ResearchError::Completion(CompletionError::Timeout {
            timeout_secs: 60,
        }));
        assert_eq!(report_outcome(outcome), EXIT_RESEARCH_FAILED);
    }
}
