use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use careline_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in effective_fields(&config) {
        let source = field_source(
            field.key,
            field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    lines.join("\n")
}

fn effective_fields(config: &AppConfig) -> Vec<Field> {
    let unset = || "<unset>".to_string();
    vec![
        Field::new("database.url", &config.database.url, &["CARELINE_DATABASE_URL"]),
        Field::new(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["CARELINE_DATABASE_MAX_CONNECTIONS"],
        ),
        Field::new(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["CARELINE_DATABASE_TIMEOUT_SECS"],
        ),
        Field::new("llm.provider", config.llm.provider.as_str(), &["CARELINE_LLM_PROVIDER"]),
        Field::new("llm.model", &config.llm.model, &["CARELINE_LLM_MODEL"]),
        Field::new(
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(unset),
            &["CARELINE_LLM_BASE_URL"],
        ),
        Field::new("llm.api_key", redact_secret(config.llm.api_key.as_ref()), &[
            "CARELINE_LLM_API_KEY",
        ]),
        Field::new(
            "llm.azure_endpoint",
            config.llm.azure_endpoint.clone().unwrap_or_else(unset),
            &["CARELINE_LLM_AZURE_ENDPOINT"],
        ),
        Field::new(
            "llm.azure_deployment",
            config.llm.azure_deployment.clone().unwrap_or_else(unset),
            &["CARELINE_LLM_AZURE_DEPLOYMENT"],
        ),
        Field::new("llm.temperature", config.llm.temperature.to_string(), &[
            "CARELINE_LLM_TEMPERATURE",
        ]),
        Field::new("llm.timeout_secs", config.llm.timeout_secs.to_string(), &[
            "CARELINE_LLM_TIMEOUT_SECS",
        ]),
        Field::new("live_api.base_url", &config.live_api.base_url, &["CARELINE_LIVE_API_BASE_URL"]),
        Field::new("live_api.api_key", redact_secret(config.live_api.api_key.as_ref()), &[
            "CARELINE_LIVE_API_KEY",
        ]),
        Field::new("live_api.serve_mock", config.live_api.serve_mock.to_string(), &[
            "CARELINE_LIVE_API_SERVE_MOCK",
        ]),
        Field::new(
            "retrieval.corpus_path",
            config.retrieval.corpus_path.display().to_string(),
            &["CARELINE_RETRIEVAL_CORPUS_PATH"],
        ),
        Field::new("retrieval.max_results", config.retrieval.max_results.to_string(), &[
            "CARELINE_RETRIEVAL_MAX_RESULTS",
        ]),
        Field::new("agent.max_round_trips", config.agent.max_round_trips.to_string(), &[
            "CARELINE_AGENT_MAX_ROUND_TRIPS",
        ]),
        Field::new("agent.max_execution_secs", config.agent.max_execution_secs.to_string(), &[
            "CARELINE_AGENT_MAX_EXECUTION_SECS",
        ]),
        Field::new("server.bind_address", &config.server.bind_address, &[
            "CARELINE_SERVER_BIND_ADDRESS",
        ]),
        Field::new("server.port", config.server.port.to_string(), &["CARELINE_SERVER_PORT"]),
        Field::new(
            "server.health_check_port",
            config.server.health_check_port.to_string(),
            &["CARELINE_SERVER_HEALTH_CHECK_PORT"],
        ),
        Field::new("logging.level", &config.logging.level, &[
            "CARELINE_LOGGING_LEVEL",
            "CARELINE_LOG_LEVEL",
        ]),
        Field::new("logging.format", format!("{:?}", config.logging.format).to_lowercase(), &[
            "CARELINE_LOGGING_FORMAT",
            "CARELINE_LOG_FORMAT",
        ]),
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("config file"));
            return format!("file ({})", file_path.display());
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    match secret.map(|secret| secret.expose_secret().trim().is_empty()) {
        None => "<unset>".to_string(),
        Some(true) => "<empty>".to_string(),
        Some(false) => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use toml::Value;

    use super::{contains_path, redact_secret};

    #[test]
    fn secrets_never_render_their_value() {
        let key = SecretString::from("sk-live-123".to_string());
        assert_eq!(redact_secret(Some(&key)), "<redacted>");
        assert_eq!(redact_secret(None), "<unset>");
        assert_eq!(redact_secret(Some(&SecretString::from(" ".to_string()))), "<empty>");
    }

    #[test]
    fn nested_keys_are_found_in_file_doc() {
        let doc: Value = "[agent]\nmax_round_trips = 2\n".parse().expect("toml");
        assert!(contains_path(&doc, "agent.max_round_trips"));
        assert!(!contains_path(&doc, "agent.max_execution_secs"));
    }
}
