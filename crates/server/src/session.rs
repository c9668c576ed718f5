use std::sync::Arc;

use careline_agent::AgentRuntime;
use careline_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use careline_core::{
    ApplicationError, Citation, InterfaceError, OrchestrationResult, Query, QueryContext,
    RedactedQuery, Redactor, ToolResultSummary, WritebackRecord,
};
use careline_db::WritebackRepository;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const APOLOGY_ANSWER: &str = "I'm sorry, I wasn't able to gather enough information to answer \
that right now. Please try rephrasing the question or check the member and claim identifiers.";

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub message: String,
    #[serde(default)]
    pub context: QueryContext,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub answer: String,
    pub citations: Vec<Citation>,
    pub tool_results: Vec<ToolResultSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crm_writeback_id: Option<String>,
}

/// Entry point for one chat turn: redact, orchestrate, write back.
pub struct SessionService {
    redactor: Redactor,
    runtime: AgentRuntime,
    writeback: Arc<dyn WritebackRepository>,
    audit: Arc<dyn AuditSink>,
}

impl SessionService {
    pub fn new(
        redactor: Redactor,
        runtime: AgentRuntime,
        writeback: Arc<dyn WritebackRepository>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { redactor, runtime, writeback, audit }
    }

    pub async fn handle(
        &self,
        request: ChatRequest,
        correlation_id: &str,
    ) -> Result<ChatResponse, InterfaceError> {
        let query = Query::new(request.session_id, request.message, request.context)
            .map_err(|error| ApplicationError::from(error).into_interface(correlation_id))?;
        let redacted = self.redactor.redact_query(&query);

        let session_id = redacted.session_id.as_str().to_string();
        let audit = AuditContext::new(&session_id, correlation_id, "session");
        info!(
            event_name = "session.chat_received",
            correlation_id,
            session_id = %session_id,
            redactions = redacted.redaction_count,
            planner = self.runtime.planner_name(),
            "chat request accepted"
        );
        self.audit.emit(
            AuditEvent::new(&audit, "session.chat_received", AuditCategory::Ingress, AuditOutcome::Success)
                .with_metadata("redactions", redacted.redaction_count.to_string()),
        );

        let result = match self.runtime.run(&redacted, correlation_id).await {
            Ok(result) => result,
            Err(ApplicationError::PlanningExhausted { round_trips, stop_reason }) => {
                warn!(
                    event_name = "session.planning_exhausted",
                    correlation_id,
                    session_id = %session_id,
                    round_trips,
                    stop_reason = ?stop_reason,
                    "nothing gathered before the budget ran out; returning apology"
                );
                self.audit.emit(
                    AuditEvent::new(
                        &audit,
                        "session.planning_exhausted",
                        AuditCategory::Synthesis,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("stop_reason", format!("{stop_reason:?}")),
                );
                OrchestrationResult {
                    answer: APOLOGY_ANSWER.to_string(),
                    citations: Vec::new(),
                    invocations: Vec::new(),
                    stop_reason,
                }
            }
            Err(error) => {
                warn!(
                    event_name = "session.chat_failed",
                    correlation_id,
                    session_id = %session_id,
                    error = %error,
                    "chat request failed"
                );
                self.audit.emit(
                    AuditEvent::new(&audit, "session.chat_failed", AuditCategory::Ingress, AuditOutcome::Failed)
                        .with_metadata("error", error.to_string()),
                );
                return Err(error.into_interface(correlation_id));
            }
        };

        let crm_writeback_id = self.write_back(&redacted, &result, correlation_id, &audit).await;

        Ok(ChatResponse {
            session_id,
            tool_results: result.summaries(),
            answer: result.answer,
            citations: result.citations,
            crm_writeback_id,
        })
    }

    async fn write_back(
        &self,
        query: &RedactedQuery,
        result: &OrchestrationResult,
        correlation_id: &str,
        audit: &AuditContext,
    ) -> Option<String> {
        let record = WritebackRecord::from_result(query, result);
        let id = record.id.0.clone();

        match self.writeback.save(record).await {
            Ok(()) => {
                self.audit.emit(
                    AuditEvent::new(audit, "session.crm_writeback", AuditCategory::Persistence, AuditOutcome::Success)
                        .with_metadata("writeback_id", id.clone()),
                );
                Some(id)
            }
            Err(error) => {
                warn!(
                    event_name = "session.crm_writeback_failed",
                    correlation_id,
                    session_id = %query.session_id.as_str(),
                    error = %error,
                    "crm write-back failed; omitting id from response"
                );
                self.audit.emit(
                    AuditEvent::new(audit, "session.crm_writeback", AuditCategory::Persistence, AuditOutcome::Failed)
                        .with_metadata("error", error.to_string()),
                );
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use careline_agent::guardrails::ELIGIBILITY_CAVEAT;
    use careline_agent::llm::CompletionError;
    use careline_agent::planner::{NextAction, PlanningContext};
    use careline_agent::{
        AgentRuntime, GuardrailPolicy, KeywordPlanner, Planner, RuntimeLimits, StaticLiveData,
        ToolRegistry,
    };
    use careline_core::audit::{AuditSink, InMemoryAuditSink};
    use careline_core::retrieval::{LocalCorpus, PolicyDocument};
    use careline_core::{InterfaceError, QueryContext, Redactor, SessionId, WritebackId, WritebackRecord};
    use careline_db::{InMemoryWritebackRepository, RepositoryError, WritebackRepository};
    use serde_json::json;

    use super::{ChatRequest, SessionService, APOLOGY_ANSWER};

    struct StalledPlanner;

    #[async_trait]
    impl Planner for StalledPlanner {
        async fn decide(&self, _context: &PlanningContext<'_>) -> Result<NextAction, CompletionError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(NextAction::Finish { answer: "too late".to_string() })
        }

        fn name(&self) -> &'static str {
            "stalled"
        }
    }

    struct FailingWriteback;

    #[async_trait]
    impl WritebackRepository for FailingWriteback {
        async fn save(&self, _record: WritebackRecord) -> Result<(), RepositoryError> {
            Err(RepositoryError::Decode("disk full".to_string()))
        }

        async fn find_by_id(&self, _id: &WritebackId) -> Result<Option<WritebackRecord>, RepositoryError> {
            Ok(None)
        }

        async fn list_for_session(
            &self,
            _session_id: &SessionId,
        ) -> Result<Vec<WritebackRecord>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    pub(crate) fn corpus() -> LocalCorpus {
        LocalCorpus::from_documents(
            vec![
                PolicyDocument {
                    doc_id: "pol-pt-001".to_string(),
                    title: "Outpatient Physical Therapy".to_string(),
                    content: "Outpatient physical therapy is covered when medically necessary and requires prior authorization after the initial evaluation.".to_string(),
                    url: None,
                    plan_type: Some("PPO".to_string()),
                    state: Some("CA".to_string()),
                    effective_date: Some("2024-01-01".to_string()),
                },
                PolicyDocument {
                    doc_id: "sop-claims-007".to_string(),
                    title: "Claim Denial Handling SOP".to_string(),
                    content: "When a claim is denied, explain the denial reason and outline next steps: verify authorization, correct coding, or file an appeal within 180 days.".to_string(),
                    url: None,
                    plan_type: None,
                    state: None,
                    effective_date: None,
                },
            ],
            3,
        )
    }

    pub(crate) fn service_with(
        live: StaticLiveData,
        writeback: Arc<dyn WritebackRepository>,
    ) -> SessionService {
        let registry = ToolRegistry::standard(Arc::new(corpus()), Arc::new(live));
        let audit = Arc::new(InMemoryAuditSink::default());
        let runtime = AgentRuntime::new(
            Arc::new(KeywordPlanner::new()),
            Arc::new(registry),
            GuardrailPolicy::new().expect("guardrail patterns compile"),
            RuntimeLimits { max_round_trips: 3, max_execution: Duration::from_secs(5) },
            audit.clone(),
        );
        SessionService::new(Redactor::new().expect("redaction patterns compile"), runtime, writeback, audit)
    }

    fn request(message: &str, context: serde_json::Value) -> ChatRequest {
        let context: QueryContext = serde_json::from_value(context).expect("object context");
        ChatRequest { session_id: "s1".to_string(), message: message.to_string(), context }
    }

    #[tokio::test]
    async fn scenario_coverage_and_eligibility_logs_both_tools() {
        let repo = Arc::new(InMemoryWritebackRepository::default());
        let service = service_with(StaticLiveData::healthy(), repo.clone());

        let response = service
            .handle(
                request(
                    "Is outpatient physical therapy covered and is this member eligible?",
                    json!({"member_id": "M123"}),
                ),
                "req-1",
            )
            .await
            .expect("chat succeeds");

        let names: Vec<&str> = response.tool_results.iter().map(|result| result.name.as_str()).collect();
        assert_eq!(names, vec!["policy_search", "get_eligibility"]);
        assert!(!response.citations.is_empty());
        assert!(response.citations.len() <= 3);
        assert!(response.answer.contains("ACTIVE"));

        let writeback_id = response.crm_writeback_id.expect("write-back id returned");
        assert!(writeback_id.starts_with("crm_"));
        let stored = repo
            .find_by_id(&WritebackId(writeback_id))
            .await
            .expect("find")
            .expect("record stored");
        assert_eq!(stored.tools_used, vec!["policy_search", "get_eligibility"]);
    }

    #[tokio::test]
    async fn ssn_is_redacted_before_write_back() {
        let repo = Arc::new(InMemoryWritebackRepository::default());
        let service = service_with(StaticLiveData::healthy(), repo.clone());

        service
            .handle(
                request("Member SSN 123-45-6789, is this member eligible?", json!({"member_id": "M123"})),
                "req-2",
            )
            .await
            .expect("chat succeeds");

        let records = repo.list_for_session(&SessionId("s1".to_string())).await.expect("list");
        assert_eq!(records.len(), 1);
        assert!(!records[0].message.contains("123-45-6789"));
        assert!(records[0].message.contains("[REDACTED_SSN]"));
    }

    #[tokio::test]
    async fn live_outage_still_completes_without_eligibility_claim() {
        let service = service_with(
            StaticLiveData::unavailable(),
            Arc::new(InMemoryWritebackRepository::default()),
        );

        let response = service
            .handle(request("Is this member currently eligible?", json!({"member_id": "M123"})), "req-3")
            .await
            .expect("degraded answer, not an error");

        assert!(response.answer.ends_with(ELIGIBILITY_CAVEAT));
        assert!(!response.answer.contains("ACTIVE"));
        assert_eq!(response.tool_results[0].data["error"], "upstream_unavailable");
    }

    #[tokio::test]
    async fn failed_write_back_omits_id() {
        let service = service_with(StaticLiveData::healthy(), Arc::new(FailingWriteback));

        let response = service
            .handle(request("Why was this claim denied and what are the next steps?", json!({"claim_id": "C999"})), "req-4")
            .await
            .expect("chat succeeds");

        assert_eq!(response.crm_writeback_id, None);
        let names: Vec<&str> = response.tool_results.iter().map(|result| result.name.as_str()).collect();
        assert_eq!(names, vec!["get_claim_status", "policy_search"]);
    }

    #[tokio::test]
    async fn blank_message_is_bad_request() {
        let service = service_with(
            StaticLiveData::healthy(),
            Arc::new(InMemoryWritebackRepository::default()),
        );

        let error = service.handle(request("   ", json!({})), "req-5").await.expect_err("invalid");
        assert!(matches!(
            error,
            InterfaceError::BadRequest { ref correlation_id, .. } if correlation_id == "req-5"
        ));
    }

    #[tokio::test]
    async fn deadline_with_nothing_gathered_apologizes_with_deadline_reason() {
        let sink = Arc::new(InMemoryAuditSink::default());
        let audit: Arc<dyn AuditSink> = sink.clone();
        let runtime = AgentRuntime::new(
            Arc::new(StalledPlanner),
            Arc::new(ToolRegistry::standard(Arc::new(corpus()), Arc::new(StaticLiveData::healthy()))),
            GuardrailPolicy::new().expect("guardrail patterns compile"),
            RuntimeLimits { max_round_trips: 3, max_execution: Duration::from_millis(100) },
            audit.clone(),
        );
        let service = SessionService::new(
            Redactor::new().expect("redaction patterns compile"),
            runtime,
            Arc::new(InMemoryWritebackRepository::default()),
            audit,
        );

        let response = service
            .handle(request("Is this member eligible?", json!({"member_id": "M123"})), "req-6")
            .await
            .expect("apology, not an error");

        assert_eq!(response.answer, APOLOGY_ANSWER);
        assert!(response.tool_results.is_empty());
        let exhausted = sink
            .events()
            .into_iter()
            .find(|event| event.event_type == "session.planning_exhausted")
            .expect("planning exhaustion audited");
        assert_eq!(exhausted.metadata.get("stop_reason").map(String::as_str), Some("DeadlineExceeded"));
    }
}
