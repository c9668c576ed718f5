use std::sync::Arc;
use std::time::{Duration, Instant};

use careline_core::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use careline_core::config::AgentConfig;
use careline_core::flows::{
    FlowContext, OrchestrationEvent, OrchestrationFlow, OrchestrationState, TransitionError,
};
use careline_core::{
    ApplicationError, Citation, DomainError, OrchestrationResult, RedactedQuery, StopReason,
    ToolInvocation, ToolName,
};
use serde_json::json;
use tokio::time::timeout_at;
use tracing::{info, warn};

use crate::guardrails::{GuardrailDecision, GuardrailPolicy};
use crate::planner::{NextAction, Observation, Planner, PlanningContext};
use crate::synthesis::compose_answer;
use crate::tools::ToolRegistry;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RuntimeLimits {
    pub max_round_trips: u32,
    pub max_execution: Duration,
}

impl RuntimeLimits {
    pub fn from_config(config: &AgentConfig) -> Self {
        Self {
            max_round_trips: config.max_round_trips,
            max_execution: Duration::from_secs(config.max_execution_secs),
        }
    }
}

impl Default for RuntimeLimits {
    fn default() -> Self {
        Self { max_round_trips: 3, max_execution: Duration::from_secs(25) }
    }
}

enum LoopExit {
    Finished(String),
    Stopped(StopReason),
}

/// Runs one redacted query through the bounded plan/execute loop.
///
/// Tool calls execute sequentially and are logged in execution order. The
/// whole request shares one absolute deadline; a planner or tool call still
/// pending at expiry is dropped and its result discarded.
pub struct AgentRuntime {
    planner: Arc<dyn Planner>,
    registry: Arc<ToolRegistry>,
    guardrails: GuardrailPolicy,
    limits: RuntimeLimits,
    audit: Arc<dyn AuditSink>,
    flow: OrchestrationFlow,
}

impl AgentRuntime {
    pub fn new(
        planner: Arc<dyn Planner>,
        registry: Arc<ToolRegistry>,
        guardrails: GuardrailPolicy,
        limits: RuntimeLimits,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self { planner, registry, guardrails, limits, audit, flow: OrchestrationFlow }
    }

    pub fn planner_name(&self) -> &'static str {
        self.planner.name()
    }

    pub fn limits(&self) -> RuntimeLimits {
        self.limits
    }

    pub async fn run(
        &self,
        query: &RedactedQuery,
        correlation_id: &str,
    ) -> Result<OrchestrationResult, ApplicationError> {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.limits.max_execution;
        let audit = AuditContext::new(query.session_id.as_str(), correlation_id, "orchestrator");
        let specs = self.registry.specs();

        let mut context = FlowContext::new(self.limits.max_round_trips);
        let mut observations: Vec<Observation> = Vec::new();
        let mut invocations: Vec<ToolInvocation> = Vec::new();
        let mut state =
            self.advance(self.flow.initial_state(), OrchestrationEvent::PlanningStarted, &context, &audit)?;

        let exit = loop {
            let decision = {
                let planning = PlanningContext {
                    query,
                    tools: &specs,
                    observations: &observations,
                    invocations: &invocations,
                };
                timeout_at(deadline, self.planner.decide(&planning)).await
            };

            let action = match decision {
                Err(_) => break LoopExit::Stopped(StopReason::DeadlineExceeded),
                Ok(Err(error)) => {
                    warn!(
                        event_name = "orchestrator.completion_failed",
                        correlation_id,
                        planner = self.planner.name(),
                        error = %error,
                        "completion service failed during planning"
                    );
                    self.advance(state, OrchestrationEvent::CompletionServiceFailed, &context, &audit)?;
                    return Err(ApplicationError::CompletionService(error.to_string()));
                }
                Ok(Ok(action)) => action,
            };

            let (call_id, tool, arguments) = match action {
                NextAction::Finish { answer } => break LoopExit::Finished(answer),
                NextAction::Invoke { call_id, tool, arguments } => (call_id, tool, arguments),
            };

            match self.flow.apply_with_audit(
                &state,
                &OrchestrationEvent::ToolSelected,
                &context,
                self.audit.as_ref(),
                &audit,
            ) {
                Ok(outcome) => state = outcome.to,
                Err(TransitionError::RoundTripCapReached { .. }) => {
                    break LoopExit::Stopped(StopReason::RoundTripLimit);
                }
                Err(error) => return Err(flow_error(error)),
            }
            context.round_trips_used += 1;

            let registered = ToolName::parse(&tool).filter(|name| self.registry.contains(*name));
            let result = match registered {
                None => {
                    warn!(
                        event_name = "orchestrator.unknown_tool",
                        correlation_id,
                        tool = %tool,
                        "decision layer requested an unregistered tool"
                    );
                    json!({ "error": "unknown_tool", "message": format!("tool `{tool}` is not available") })
                }
                Some(name) => {
                    let cached = invocations
                        .iter()
                        .find(|invocation| invocation.matches(name, &arguments))
                        .map(|invocation| invocation.outcome.observation());
                    match cached {
                        Some(observation) => observation,
                        None => {
                            let dispatched =
                                timeout_at(deadline, self.registry.dispatch(name, &arguments)).await;
                            let Ok(outcome) = dispatched else {
                                break LoopExit::Stopped(StopReason::DeadlineExceeded);
                            };
                            let invocation = ToolInvocation {
                                ordinal: invocations.len(),
                                tool: name,
                                arguments: arguments.clone(),
                                outcome,
                            };
                            self.record_invocation(&invocation, correlation_id, &audit);
                            let observation = invocation.outcome.observation();
                            invocations.push(invocation);
                            observation
                        }
                    }
                }
            };

            observations.push(Observation { call_id, tool, arguments, result });
            context.has_observations = !invocations.is_empty();
            state = self.advance(state, OrchestrationEvent::ToolCompleted, &context, &audit)?;
        };

        let (draft, stop_reason) = match exit {
            LoopExit::Finished(answer) => {
                state = self.advance(state, OrchestrationEvent::FinishRequested, &context, &audit)?;
                (answer, StopReason::Finished)
            }
            LoopExit::Stopped(reason) => {
                warn!(
                    event_name = "orchestrator.budget_exhausted",
                    correlation_id,
                    stop_reason = ?reason,
                    round_trips = context.round_trips_used,
                    invocations = invocations.len(),
                    "request budget exhausted; forcing synthesis"
                );
                state = self.advance(state, OrchestrationEvent::BudgetExhausted, &context, &audit)?;
                if state == OrchestrationState::Failed {
                    return Err(ApplicationError::PlanningExhausted {
                        round_trips: context.round_trips_used,
                        stop_reason: reason,
                    });
                }
                (compose_answer(query, &invocations), reason)
            }
        };

        let answer = match self.guardrails.evaluate(&draft, &invocations) {
            GuardrailDecision::Allow => draft,
            GuardrailDecision::Degrade { reason_code, answer } => {
                self.audit.emit(
                    AuditEvent::new(
                        &audit,
                        "orchestrator.answer_degraded",
                        AuditCategory::Synthesis,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("reason_code", reason_code),
                );
                answer
            }
        };
        self.advance(state, OrchestrationEvent::AnswerAssembled, &context, &audit)?;

        let citations = collect_citations(&invocations);
        info!(
            event_name = "orchestrator.completed",
            correlation_id,
            planner = self.planner.name(),
            stop_reason = ?stop_reason,
            round_trips = context.round_trips_used,
            invocations = invocations.len(),
            citations = citations.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request orchestrated"
        );

        Ok(OrchestrationResult { answer, citations, invocations, stop_reason })
    }

    fn advance(
        &self,
        state: OrchestrationState,
        event: OrchestrationEvent,
        context: &FlowContext,
        audit: &AuditContext,
    ) -> Result<OrchestrationState, ApplicationError> {
        self.flow
            .apply_with_audit(&state, &event, context, self.audit.as_ref(), audit)
            .map(|outcome| outcome.to)
            .map_err(flow_error)
    }

    fn record_invocation(&self, invocation: &ToolInvocation, correlation_id: &str, audit: &AuditContext) {
        let succeeded = invocation.outcome.is_success();
        info!(
            event_name = "orchestrator.tool_invoked",
            correlation_id,
            tool = invocation.tool.as_str(),
            ordinal = invocation.ordinal,
            succeeded,
            citations = invocation.outcome.citations().len(),
            "tool invocation logged"
        );
        self.audit.emit(
            AuditEvent::new(
                audit,
                "orchestrator.tool_invoked",
                AuditCategory::Tool,
                if succeeded { AuditOutcome::Success } else { AuditOutcome::Failed },
            )
            .with_metadata("tool", invocation.tool.as_str())
            .with_metadata("ordinal", invocation.ordinal.to_string()),
        );
    }
}

fn flow_error(error: TransitionError) -> ApplicationError {
    ApplicationError::Domain(DomainError::FlowTransition(error))
}

/// Citations from every policy search, in invocation order.
fn collect_citations(invocations: &[ToolInvocation]) -> Vec<Citation> {
    invocations
        .iter()
        .filter(|invocation| invocation.tool == ToolName::PolicySearch)
        .flat_map(|invocation| invocation.outcome.citations().iter().cloned())
        .collect()
}
