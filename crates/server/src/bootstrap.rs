use std::sync::Arc;

use careline_agent::llm::LlmClient;
use careline_agent::{
    AgentRuntime, CompletionError, GuardrailPolicy, HttpLiveDataClient, KeywordPlanner,
    LlmPlanner, OpenAiClient, Planner, RuntimeLimits, ToolRegistry,
};
use careline_core::audit::{AuditSink, TracingAuditSink};
use careline_core::config::{AppConfig, ConfigError, LlmProvider, LoadOptions};
use careline_core::retrieval::RetrievalError;
use careline_core::{LocalCorpus, Redactor, RetrievalService};
use careline_db::{connect_with_settings, migrations, DbPool, SqlWritebackRepository};
use thiserror::Error;
use tracing::info;

use crate::health::HealthState;
use crate::session::SessionService;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub corpus: Arc<dyn RetrievalService>,
    pub session: Arc<SessionService>,
    pub planner: &'static str,
}

impl Application {
    pub fn health_state(&self) -> HealthState {
        HealthState::new(self.db_pool.clone(), self.corpus.clone(), self.planner)
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("policy corpus could not be loaded: {0}")]
    Corpus(#[source] RetrievalError),
    #[error("completion client could not be built: {0}")]
    Completion(#[source] CompletionError),
    #[error("live data client could not be built: {0}")]
    LiveData(#[source] reqwest::Error),
    #[error("pattern compilation failed: {0}")]
    Pattern(String),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        llm_provider = config.llm.provider.as_str(),
        "starting application bootstrap"
    );

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let corpus = LocalCorpus::load(&config.retrieval.corpus_path, config.retrieval.max_results)
        .map_err(BootstrapError::Corpus)?;
    info!(
        event_name = "system.bootstrap.corpus_loaded",
        correlation_id = "bootstrap",
        documents = corpus.documents().len(),
        corpus_path = %config.retrieval.corpus_path.display(),
        "policy corpus loaded"
    );
    let corpus: Arc<dyn RetrievalService> = Arc::new(corpus);

    let live_data =
        HttpLiveDataClient::from_config(&config.live_api).map_err(BootstrapError::LiveData)?;
    let registry = ToolRegistry::standard(corpus.clone(), Arc::new(live_data));
    let planner = build_planner(&config)?;
    let planner_name = planner.name();

    let audit: Arc<dyn AuditSink> = Arc::new(TracingAuditSink);
    let runtime = AgentRuntime::new(
        planner,
        Arc::new(registry),
        GuardrailPolicy::new().map_err(|error| BootstrapError::Pattern(error.to_string()))?,
        RuntimeLimits::from_config(&config.agent),
        audit.clone(),
    );
    let session = SessionService::new(
        Redactor::new().map_err(|error| BootstrapError::Pattern(error.to_string()))?,
        runtime,
        Arc::new(SqlWritebackRepository::new(db_pool.clone())),
        audit,
    );

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        planner = planner_name,
        max_round_trips = config.agent.max_round_trips,
        max_execution_secs = config.agent.max_execution_secs,
        "agent runtime assembled"
    );

    Ok(Application { config, db_pool, corpus, session: Arc::new(session), planner: planner_name })
}

fn build_planner(config: &AppConfig) -> Result<Arc<dyn Planner>, BootstrapError> {
    match config.llm.provider {
        LlmProvider::Offline => Ok(Arc::new(KeywordPlanner::new())),
        LlmProvider::OpenAi | LlmProvider::Azure => {
            let client: Arc<dyn LlmClient> =
                Arc::new(OpenAiClient::from_config(&config.llm).map_err(BootstrapError::Completion)?);
            info!(
                event_name = "system.bootstrap.completion_client",
                correlation_id = "bootstrap",
                provider = config.llm.provider.as_str(),
                model = client.model(),
                "completion client configured"
            );
            Ok(Arc::new(LlmPlanner::new(client)))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use careline_core::config::{ConfigOverrides, LlmProvider, LoadOptions};
    use tempfile::{NamedTempFile, TempDir};

    use crate::bootstrap::{bootstrap, BootstrapError};

    fn corpus_file() -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp corpus");
        writeln!(
            file,
            r#"{{"doc_id":"pol-pt-001","title":"Outpatient Physical Therapy","content":"Outpatient physical therapy is covered and requires prior authorization."}}"#
        )
        .expect("write corpus");
        file
    }

    fn options(db_dir: &TempDir, provider: LlmProvider, corpus_path: PathBuf) -> LoadOptions {
        let database_url = format!("sqlite://{}?mode=rwc", db_dir.path().join("careline.db").display());
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url),
                llm_provider: Some(provider),
                corpus_path: Some(corpus_path),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_completion_credentials() {
        let db_dir = TempDir::new().expect("temp dir");
        let corpus = corpus_file();
        let result =
            bootstrap(options(&db_dir, LlmProvider::OpenAi, corpus.path().to_path_buf())).await;

        let message = result.err().expect("missing api key").to_string();
        assert!(message.contains("llm.api_key"));
    }

    #[tokio::test]
    async fn bootstrap_offline_provider_assembles_keyword_planner() {
        let db_dir = TempDir::new().expect("temp dir");
        let corpus = corpus_file();
        let app = bootstrap(options(&db_dir, LlmProvider::Offline, corpus.path().to_path_buf()))
            .await
            .expect("offline bootstrap succeeds");

        assert_eq!(app.planner, "keyword");
        assert_eq!(app.corpus.document_count(), 1);

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'crm_writeback'",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("write-back table available after bootstrap");
        assert_eq!(table_count, 1);

        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn bootstrap_reports_missing_corpus() {
        let db_dir = TempDir::new().expect("temp dir");
        let result = bootstrap(options(
            &db_dir,
            LlmProvider::Offline,
            PathBuf::from("/nonexistent/careline/policies.jsonl"),
        ))
        .await;

        assert!(matches!(result, Err(BootstrapError::Corpus(_))));
    }
}
