use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_PREFIX: &str = "CARELINE_";
pub const CONFIG_FILE_CANDIDATES: [&str; 2] = ["careline.toml", "config/careline.toml"];

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub live_api: LiveApiConfig,
    pub retrieval: RetrievalConfig,
    pub agent: AgentConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub azure_endpoint: Option<String>,
    pub azure_deployment: Option<String>,
    pub azure_api_version: String,
    pub temperature: f32,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct LiveApiConfig {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub timeout_secs: u64,
    pub serve_mock: bool,
}

#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    pub corpus_path: PathBuf,
    pub max_results: usize,
}

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub max_round_trips: u32,
    pub max_execution_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Azure,
    /// Deterministic keyword planner, no completion service.
    #[serde(rename = "none", alias = "offline")]
    Offline,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Azure => "azure",
            Self::Offline => "none",
        }
    }
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
    pub llm_api_key: Option<String>,
    pub live_api_base_url: Option<String>,
    pub corpus_path: Option<PathBuf>,
    pub server_port: Option<u16>,
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
                url: "sqlite://careline.db".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            llm: LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: None,
                base_url: Some("https://api.openai.com/v1".to_string()),
                model: "gpt-4o-mini".to_string(),
                azure_endpoint: None,
                azure_deployment: None,
                azure_api_version: "2024-02-15-preview".to_string(),
                temperature: 0.2,
                timeout_secs: 30,
                max_retries: 1,
            },
            live_api: LiveApiConfig {
                base_url: "http://localhost:8000/mock-live".to_string(),
                api_key: None,
                timeout_secs: 10,
                serve_mock: true,
            },
            retrieval: RetrievalConfig {
                corpus_path: PathBuf::from("data/policies.jsonl"),
                max_results: 3,
            },
            agent: AgentConfig { max_round_trips: 3, max_execution_secs: 25 },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "azure" => Ok(Self::Azure),
            "none" | "offline" => Ok(Self::Offline),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|azure|none)"
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
            let expected =
                options.config_path.unwrap_or_else(|| PathBuf::from(CONFIG_FILE_CANDIDATES[0]));
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

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(secret_value(api_key));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(azure_endpoint) = llm.azure_endpoint {
                self.llm.azure_endpoint = Some(azure_endpoint);
            }
            if let Some(azure_deployment) = llm.azure_deployment {
                self.llm.azure_deployment = Some(azure_deployment);
            }
            if let Some(azure_api_version) = llm.azure_api_version {
                self.llm.azure_api_version = azure_api_version;
            }
            if let Some(temperature) = llm.temperature {
                self.llm.temperature = temperature;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(live_api) = patch.live_api {
            if let Some(base_url) = live_api.base_url {
                self.live_api.base_url = base_url;
            }
            if let Some(api_key) = live_api.api_key {
                self.live_api.api_key = Some(secret_value(api_key));
            }
            if let Some(timeout_secs) = live_api.timeout_secs {
                self.live_api.timeout_secs = timeout_secs;
            }
            if let Some(serve_mock) = live_api.serve_mock {
                self.live_api.serve_mock = serve_mock;
            }
        }

        if let Some(retrieval) = patch.retrieval {
            if let Some(corpus_path) = retrieval.corpus_path {
                self.retrieval.corpus_path = corpus_path;
            }
            if let Some(max_results) = retrieval.max_results {
                self.retrieval.max_results = max_results;
            }
        }

        if let Some(agent) = patch.agent {
            if let Some(max_round_trips) = agent.max_round_trips {
                self.agent.max_round_trips = max_round_trips;
            }
            if let Some(max_execution_secs) = agent.max_execution_secs {
                self.agent.max_execution_secs = max_execution_secs;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
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
        if let Some(value) = read_env("CARELINE_DATABASE_URL") {
            self.database.url = value;
        }
        if let Some(value) = read_env("CARELINE_DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections =
                parse_u32("CARELINE_DATABASE_MAX_CONNECTIONS", &value)?;
        }
        if let Some(value) = read_env("CARELINE_DATABASE_TIMEOUT_SECS") {
            self.database.timeout_secs = parse_u64("CARELINE_DATABASE_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("CARELINE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("CARELINE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CARELINE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("CARELINE_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("CARELINE_LLM_AZURE_ENDPOINT") {
            self.llm.azure_endpoint = Some(value);
        }
        if let Some(value) = read_env("CARELINE_LLM_AZURE_DEPLOYMENT") {
            self.llm.azure_deployment = Some(value);
        }
        if let Some(value) = read_env("CARELINE_LLM_AZURE_API_VERSION") {
            self.llm.azure_api_version = value;
        }
        if let Some(value) = read_env("CARELINE_LLM_TEMPERATURE") {
            self.llm.temperature = parse_f32("CARELINE_LLM_TEMPERATURE", &value)?;
        }
        if let Some(value) = read_env("CARELINE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("CARELINE_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CARELINE_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("CARELINE_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("CARELINE_LIVE_API_BASE_URL") {
            self.live_api.base_url = value;
        }
        if let Some(value) = read_env("CARELINE_LIVE_API_KEY") {
            self.live_api.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("CARELINE_LIVE_API_TIMEOUT_SECS") {
            self.live_api.timeout_secs = parse_u64("CARELINE_LIVE_API_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("CARELINE_LIVE_API_SERVE_MOCK") {
            self.live_api.serve_mock = parse_bool("CARELINE_LIVE_API_SERVE_MOCK", &value)?;
        }

        if let Some(value) = read_env("CARELINE_RETRIEVAL_CORPUS_PATH") {
            self.retrieval.corpus_path = PathBuf::from(value);
        }
        if let Some(value) = read_env("CARELINE_RETRIEVAL_MAX_RESULTS") {
            self.retrieval.max_results = parse_usize("CARELINE_RETRIEVAL_MAX_RESULTS", &value)?;
        }

        if let Some(value) = read_env("CARELINE_AGENT_MAX_ROUND_TRIPS") {
            self.agent.max_round_trips = parse_u32("CARELINE_AGENT_MAX_ROUND_TRIPS", &value)?;
        }
        if let Some(value) = read_env("CARELINE_AGENT_MAX_EXECUTION_SECS") {
            self.agent.max_execution_secs =
                parse_u64("CARELINE_AGENT_MAX_EXECUTION_SECS", &value)?;
        }

        if let Some(value) = read_env("CARELINE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("CARELINE_SERVER_PORT") {
            self.server.port = parse_u16("CARELINE_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("CARELINE_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("CARELINE_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("CARELINE_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("CARELINE_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("CARELINE_LOGGING_LEVEL").or_else(|| read_env("CARELINE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("CARELINE_LOGGING_FORMAT").or_else(|| read_env("CARELINE_LOG_FORMAT"));
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
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(base_url) = overrides.live_api_base_url {
            self.live_api.base_url = base_url;
        }
        if let Some(corpus_path) = overrides.corpus_path {
            self.retrieval.corpus_path = corpus_path;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_database(&self.database)?;
        validate_llm(&self.llm)?;
        validate_live_api(&self.live_api)?;
        validate_retrieval(&self.retrieval)?;
        validate_agent(&self.agent)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    CONFIG_FILE_CANDIDATES.into_iter().map(PathBuf::from).find(|path| path.exists())
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

fn is_blank(value: Option<&str>) -> bool {
    value.map(|value| value.trim().is_empty()).unwrap_or(true)
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    if !(0.0..=2.0).contains(&llm.temperature) {
        return Err(ConfigError::Validation(
            "llm.temperature must be in range 0.0..=2.0".to_string(),
        ));
    }

    if llm.max_retries > 5 {
        return Err(ConfigError::Validation("llm.max_retries must be at most 5".to_string()));
    }

    let api_key = llm.api_key.as_ref().map(|value| value.expose_secret());
    match llm.provider {
        LlmProvider::OpenAi => {
            if is_blank(api_key) {
                return Err(ConfigError::Validation(
                    "llm.api_key is required when llm.provider=openai (set CARELINE_LLM_API_KEY)"
                        .to_string(),
                ));
            }
            if llm.model.trim().is_empty() {
                return Err(ConfigError::Validation("llm.model must not be empty".to_string()));
            }
        }
        LlmProvider::Azure => {
            if is_blank(api_key)
                || is_blank(llm.azure_endpoint.as_deref())
                || is_blank(llm.azure_deployment.as_deref())
            {
                return Err(ConfigError::Validation(
                    "Azure OpenAI credentials are incomplete: llm.api_key, llm.azure_endpoint, and llm.azure_deployment are required when llm.provider=azure".to_string(),
                ));
            }
        }
        LlmProvider::Offline => {}
    }

    Ok(())
}

fn validate_live_api(live_api: &LiveApiConfig) -> Result<(), ConfigError> {
    let base_url = live_api.base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "live_api.base_url must start with http:// or https://".to_string(),
        ));
    }

    if live_api.timeout_secs == 0 || live_api.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "live_api.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    Ok(())
}

fn validate_retrieval(retrieval: &RetrievalConfig) -> Result<(), ConfigError> {
    if retrieval.corpus_path.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "retrieval.corpus_path must not be empty".to_string(),
        ));
    }

    if retrieval.max_results == 0 || retrieval.max_results > 3 {
        return Err(ConfigError::Validation(
            "retrieval.max_results must be in range 1..=3".to_string(),
        ));
    }

    Ok(())
}

fn validate_agent(agent: &AgentConfig) -> Result<(), ConfigError> {
    if agent.max_round_trips == 0 || agent.max_round_trips > 10 {
        return Err(ConfigError::Validation(
            "agent.max_round_trips must be in range 1..=10".to_string(),
        ));
    }

    if agent.max_execution_secs == 0 || agent.max_execution_secs > 300 {
        return Err(ConfigError::Validation(
            "agent.max_execution_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.health_check_port == server.port {
        return Err(ConfigError::Validation(
            "server.health_check_port must differ from server.port".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
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

fn invalid_override(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| invalid_override(key, value))
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| invalid_override(key, value))
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| invalid_override(key, value))
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| invalid_override(key, value))
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| invalid_override(key, value))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| invalid_override(key, value))
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    llm: Option<LlmPatch>,
    live_api: Option<LiveApiPatch>,
    retrieval: Option<RetrievalPatch>,
    agent: Option<AgentPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    azure_endpoint: Option<String>,
    azure_deployment: Option<String>,
    azure_api_version: Option<String>,
    temperature: Option<f32>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LiveApiPatch {
    base_url: Option<String>,
    api_key: Option<String>,
    timeout_secs: Option<u64>,
    serve_mock: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalPatch {
    corpus_path: Option<PathBuf>,
    max_results: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct AgentPatch {
    max_round_trips: Option<u32>,
    max_execution_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
