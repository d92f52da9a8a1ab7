use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::{SalesIntelError, SecretValue, require_env};

const DEFAULT_CONFIG_PATH: &str = "salesintel.toml";
const CONFIG_PATH_ENV: &str = "SALESINTEL_CONFIG";

/// Top-level configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm: LlmConfig,
    pub scraper: ScraperConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Resolve the configured LLM secret value (from environment only).
    pub fn llm_api_key(&self) -> Result<SecretValue, SalesIntelError> {
        require_env(&self.llm.api_key_env)
    }
}

/// Helper to load configuration with guard rails.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a provided path or discoverable defaults.
    ///
    /// Resolution order:
    /// 1. Explicit `path` argument (must exist).
    /// 2. `SALESINTEL_CONFIG` environment variable (must exist).
    /// 3. `salesintel.toml` in the current working directory, or built-in defaults when absent.
    pub fn load(path: Option<PathBuf>) -> Result<Config, SalesIntelError> {
        let config = match resolve_path(path) {
            Some(candidate) => {
                let raw = fs::read_to_string(&candidate)
                    .map_err(|err| SalesIntelError::config_io(candidate.clone(), err))?;
                Self::parse(&raw)?
            }
            None => Config::default(),
        };

        Self::validate(&config)?;
        Ok(config)
    }

    /// Parse TOML without touching the filesystem.
    pub fn parse(raw: &str) -> Result<Config, SalesIntelError> {
        toml::from_str(raw).map_err(|err| SalesIntelError::InvalidConfiguration(err.to_string()))
    }

    pub fn validate(config: &Config) -> Result<(), SalesIntelError> {
        if config.llm.api_key_env.trim().is_empty() {
            return Err(SalesIntelError::InvalidConfiguration(
                "llm.api_key_env must reference an environment variable".into(),
            ));
        }

        if !config.llm.provider.eq_ignore_ascii_case("gemini") {
            return Err(SalesIntelError::InvalidConfiguration(format!(
                "unsupported llm.provider `{}` (expected `gemini`)",
                config.llm.provider
            )));
        }

        if config.llm.model.trim().is_empty() {
            return Err(SalesIntelError::InvalidConfiguration(
                "llm.model must not be empty".into(),
            ));
        }

        if config.llm.timeout_secs == 0 || config.scraper.timeout_secs == 0 {
            return Err(SalesIntelError::InvalidConfiguration(
                "timeouts must be greater than zero".into(),
            ));
        }

        if !(0.0..=2.0).contains(&config.llm.temperature) {
            return Err(SalesIntelError::InvalidConfiguration(format!(
                "llm.temperature {} is outside 0.0..=2.0",
                config.llm.temperature
            )));
        }

        if config.scraper.max_chars == 0 {
            return Err(SalesIntelError::InvalidConfiguration(
                "scraper.max_chars must be greater than zero".into(),
            ));
        }

        if config.scraper.discovery {
            if config.scraper.max_results == 0 {
                return Err(SalesIntelError::InvalidConfiguration(
                    "scraper.max_results must be greater than zero when discovery is on".into(),
                ));
            }
            let search_url = config.scraper.search_url.trim();
            if !search_url.starts_with("http://") && !search_url.starts_with("https://") {
                return Err(SalesIntelError::InvalidConfiguration(format!(
                    "scraper.search_url `{search_url}` must be an http(s) URL"
                )));
            }
        }

        Ok(())
    }
}

fn resolve_path(path: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = path {
        return Some(path);
    }

    if let Ok(from_env) = env::var(CONFIG_PATH_ENV) {
        if !from_env.trim().is_empty() {
            return Some(PathBuf::from(from_env));
        }
    }

    let default = Path::new(DEFAULT_CONFIG_PATH);
    default.exists().then(|| default.to_path_buf())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: String,
    pub model: String,
    pub api_key_env: String,
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub temperature: f32,
    /// Pause before the single retry of a transient failure.
    pub retry_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "gemini".to_string(),
            model: "gemini-1.5-pro".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            base_url: None,
            timeout_secs: 60,
            temperature: 0.2,
            retry_delay_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub enabled: bool,
    pub timeout_secs: u64,
    pub max_chars: usize,
    pub user_agent: String,
    /// Search the web for reference pages when a request carries no URL.
    pub discovery: bool,
    /// Pages taken from the top of the search results.
    pub max_results: usize,
    pub search_url: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_secs: 30,
            max_chars: 4000,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/124.0 Safari/537.36"
                .to_string(),
            discovery: true,
            max_results: 3,
            search_url: "https://html.duckduckgo.com/html/".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn empty_document_yields_defaults() {
        let config = ConfigLoader::parse("").unwrap();
        assert_eq!(config.llm.model, "gemini-1.5-pro");
        assert_eq!(config.llm.api_key_env, "GEMINI_API_KEY");
        assert_eq!(config.scraper.max_chars, 4000);
        assert!(config.scraper.enabled);
        assert!(config.scraper.discovery);
        assert_eq!(config.scraper.max_results, 3);
        assert_eq!(config.logging.level, "info");
        ConfigLoader::validate(&config).unwrap();
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let config = ConfigLoader::parse(
            r#"
            [llm]
            model = "gemini-1.5-flash"
            retry_delay_ms = 0

            [scraper]
            enabled = false
            "#,
        )
        .unwrap();

        assert_eq!(config.llm.model, "gemini-1.5-flash");
        assert_eq!(config.llm.retry_delay_ms, 0);
        assert_eq!(config.llm.timeout_secs, 60);
        assert!(!config.scraper.enabled);
        assert_eq!(config.scraper.timeout_secs, 30);
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = Config::default();
        config.llm.api_key_env = " ".into();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(SalesIntelError::InvalidConfiguration(_))
        ));

        let mut config = Config::default();
        config.llm.provider = "openai".into();
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = Config::default();
        config.llm.temperature = 3.5;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = Config::default();
        config.scraper.max_chars = 0;
        assert!(ConfigLoader::validate(&config).is_err());

        let mut config = Config::default();
        config.scraper.max_results = 0;
        assert!(ConfigLoader::validate(&config).is_err());
        config.scraper.discovery = false;
        ConfigLoader::validate(&config).unwrap();

        let mut config = Config::default();
        config.scraper.search_url = "duckduckgo.com/html".into();
        assert!(ConfigLoader::validate(&config).is_err());
    }

    #[test]
    fn malformed_toml_is_invalid_configuration() {
        let err = ConfigLoader::parse("[llm\nmodel = ").unwrap_err();
        assert!(matches!(err, SalesIntelError::InvalidConfiguration(_)));
    }

    #[test]
    fn explicit_path_is_loaded() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"debug\"").unwrap();

        let config = ConfigLoader::load(Some(file.path().to_path_buf())).unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn explicit_missing_path_is_an_io_error() {
        let err = ConfigLoader::load(Some(PathBuf::from("/nonexistent/salesintel.toml")))
            .unwrap_err();
        assert!(matches!(err, SalesIntelError::ConfigIo { .. }));
    }
}
