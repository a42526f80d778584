use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Immutable application configuration, loaded once at startup and passed
/// into each component's constructor. Precedence: env > file > default.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub directory: DirectoryConfig,
    pub retrieval: RetrievalConfig,
    pub policy: PolicyConfig,
    pub labels: LabelConfig,
    pub llm: LlmConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DirectoryConfig {
    /// Per-call bound on order-directory lookups; a timeout is recoverable.
    pub lookup_timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    /// How many knowledge snippets an informational answer draws on.
    pub fan_out: usize,
}

#[derive(Clone, Debug)]
pub struct PolicyConfig {
    pub return_window_days: i64,
}

#[derive(Clone, Debug)]
pub struct LabelConfig {
    pub base_url: String,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    /// Deterministic built-in snippet corpus; no model call.
    Static,
    Ollama,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub return_window_days: Option<i64>,
    pub lookup_timeout_secs: Option<u64>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://ecomarket.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            directory: DirectoryConfig { lookup_timeout_secs: 5 },
            retrieval: RetrievalConfig { fan_out: 4 },
            policy: PolicyConfig { return_window_days: 30 },
            labels: LabelConfig { base_url: "https://ecomarket.dev".to_string() },
            llm: LlmConfig {
                provider: LlmProvider::Static,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "static" => Ok(Self::Static),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected static|ollama)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("ecomarket.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(database) = patch.database {
            if let Some(url) = database.url {
                self.database.url = url;
            }
            if let Some(max_connections) = database.max_connections {
                self.database.max_connections = max_connections;
            }
            if let Some(timeout_secs) = database.timeout_secs {
                self.database.timeout_secs = timeout_secs;
            }
        }

        if let Some(directory) = patch.directory {
            if let Some(lookup_timeout_secs) = directory.lookup_timeout_secs {
                self.directory.lookup_timeout_secs = lookup_timeout_secs;
            }
        }

        if let Some(retrieval) = patch.retrieval {
            if let Some(fan_out) = retrieval.fan_out {
                self.retrieval.fan_out = fan_out;
            }
        }

        if let Some(policy) = patch.policy {
            if let Some(return_window_days) = policy.return_window_days {
                self.policy.return_window_days = return_window_days;
            }
        }

        if let Some(labels) = patch.labels {
            if let Some(base_url) = labels.base_url {
                self.labels.base_url = base_url;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(api_key.into());
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ECOMARKET_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("ECOMARKET_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("ECOMARKET_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("ECOMARKET_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("ECOMARKET_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ECOMARKET_DIRECTORY_LOOKUP_TIMEOUT_SECS") {
            self.directory.lookup_timeout_secs =
                parse_u64("ECOMARKET_DIRECTORY_LOOKUP_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("ECOMARKET_RETRIEVAL_FAN_OUT") {
            self.retrieval.fan_out =
                parse_u32("ECOMARKET_RETRIEVAL_FAN_OUT", &value)? as usize;
        }

        if let Some(value) = read_env("ECOMARKET_POLICY_RETURN_WINDOW_DAYS") {
            self.policy.return_window_days =
                parse_i64("ECOMARKET_POLICY_RETURN_WINDOW_DAYS", &value)?;
        }

        if let Some(value) = read_env("ECOMARKET_LABELS_BASE_URL") {
            self.labels.base_url = value;
        }

        if let Some(value) = read_env("ECOMARKET_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("ECOMARKET_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("ECOMARKET_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("ECOMARKET_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("ECOMARKET_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("ECOMARKET_LLM_TIMEOUT_SECS", &value)?;
        }

        let log_level =
            read_env("ECOMARKET_LOGGING_LEVEL").or_else(|| read_env("ECOMARKET_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ECOMARKET_LOGGING_FORMAT").or_else(|| read_env("ECOMARKET_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(database_url) = overrides.database_url {
            self.database.url = database_url;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(return_window_days) = overrides.return_window_days {
            self.policy.return_window_days = return_window_days;
        }
        if let Some(lookup_timeout_secs) = overrides.lookup_timeout_secs {
            self.directory.lookup_timeout_secs = lookup_timeout_secs;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_directory(&self.directory)?;
        validate_retrieval(&self.retrieval)?;
        validate_policy(&self.policy)?;
        validate_labels(&self.labels)?;
        validate_llm(&self.llm)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("ecomarket.toml"), PathBuf::from("config/ecomarket.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let url = database.url.trim();
    let sqlite_url =
        url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
    if !sqlite_url {
        return Err(ConfigError::Validation(
            "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)"
                .to_string(),
        ));
    }

    if database.max_connections == 0 {
        return Err(ConfigError::Validation(
            "database.max_connections must be greater than zero".to_string(),
        ));
    }

    if database.timeout_secs == 0 || database.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "database.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_directory(directory: &DirectoryConfig) -> Result<(), ConfigError> {
    if directory.lookup_timeout_secs == 0 || directory.lookup_timeout_secs > 60 {
        return Err(ConfigError::Validation(
            "directory.lookup_timeout_secs must be in range 1..=60".to_string(),
        ));
    }
    Ok(())
}

fn validate_retrieval(retrieval: &RetrievalConfig) -> Result<(), ConfigError> {
    if retrieval.fan_out == 0 || retrieval.fan_out > 10 {
        return Err(ConfigError::Validation(
            "retrieval.fan_out must be in range 1..=10".to_string(),
        ));
    }
    Ok(())
}

fn validate_policy(policy: &PolicyConfig) -> Result<(), ConfigError> {
    if policy.return_window_days <= 0 || policy.return_window_days > 365 {
        return Err(ConfigError::Validation(
            "policy.return_window_days must be in range 1..=365".to_string(),
        ));
    }
    Ok(())
}

fn validate_labels(labels: &LabelConfig) -> Result<(), ConfigError> {
    if !labels.base_url.starts_with("http://") && !labels.base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "labels.base_url must start with http:// or https://".to_string(),
        ));
    }
    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if llm.provider == LlmProvider::Ollama {
        let missing = llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
        if missing {
            return Err(ConfigError::Validation(
                "llm.base_url is required for the ollama provider".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value.parse::<i64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    directory: Option<DirectoryPatch>,
    retrieval: Option<RetrievalPatch>,
    policy: Option<PolicyPatch>,
    labels: Option<LabelPatch>,
    llm: Option<LlmPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DirectoryPatch {
    lookup_timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalPatch {
    fan_out: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct PolicyPatch {
    return_window_days: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
struct LabelPatch {
    base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
