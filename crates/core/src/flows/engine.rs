use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::flows::states::{
    FlowAction, FlowContext, OrchestrationEvent, OrchestrationState, TransitionOutcome,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: OrchestrationState, event: OrchestrationEvent },
    #[error("round trip cap of {max_round_trips} reached; no further tool calls allowed")]
    RoundTripCapReached { max_round_trips: u32 },
}

/// Transition table for one request: `Received → Planning ⇄ Executing → Synthesizing → Completed`,
/// with `Failed` reachable from every non-terminal state.
#[derive(Clone, Debug, Default)]
pub struct OrchestrationFlow;

impl OrchestrationFlow {
    pub fn initial_state(&self) -> OrchestrationState {
        OrchestrationState::Received
    }

    pub fn apply(
        &self,
        current: &OrchestrationState,
        event: &OrchestrationEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, TransitionError> {
        transition(current, event, context)
    }

    pub fn apply_with_audit<S>(
        &self,
        current: &OrchestrationState,
        event: &OrchestrationEvent,
        context: &FlowContext,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, TransitionError>
    where
        S: AuditSink + ?Sized,
    {
        let result = self.apply(current, event, context);
        match &result {
            Ok(outcome) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "orchestrator.transition_applied",
                        AuditCategory::Flow,
                        AuditOutcome::Success,
                    )
                    .with_metadata("from", format!("{:?}", outcome.from))
                    .with_metadata("to", format!("{:?}", outcome.to))
                    .with_metadata("event", format!("{:?}", outcome.event))
                    .with_metadata("round_trips_used", context.round_trips_used.to_string()),
                );
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "orchestrator.transition_rejected",
                        AuditCategory::Flow,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("error", error.to_string()),
                );
            }
        }
        result
    }
}

fn transition(
    current: &OrchestrationState,
    event: &OrchestrationEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, TransitionError> {
    use FlowAction::{
        AssembleAnswer, CollectCitations, ConsultPlanner, InvokeTool, ReturnApology,
        ReturnFailure, ReturnResult,
    };
    use OrchestrationEvent::{
        AnswerAssembled, BudgetExhausted, CompletionServiceFailed, FinishRequested,
        PlanningStarted, ToolCompleted, ToolSelected,
    };
    use OrchestrationState::{Completed, Executing, Failed, Planning, Received, Synthesizing};

    let (to, actions) = match (current, event) {
        (Received, PlanningStarted) => (Planning, vec![ConsultPlanner]),
        (Planning, ToolSelected) => {
            if context.round_trips_used >= context.max_round_trips {
                return Err(TransitionError::RoundTripCapReached {
                    max_round_trips: context.max_round_trips,
                });
            }
            (Executing, vec![InvokeTool])
        }
        (Executing, ToolCompleted) => (Planning, vec![ConsultPlanner]),
        (Planning, FinishRequested) => (Synthesizing, vec![CollectCitations, AssembleAnswer]),
        (Planning, BudgetExhausted) | (Executing, BudgetExhausted) => {
            if context.has_observations {
                (Synthesizing, vec![CollectCitations, AssembleAnswer])
            } else {
                (Failed, vec![ReturnApology])
            }
        }
        (Synthesizing, AnswerAssembled) => (Completed, vec![ReturnResult]),
        (state, CompletionServiceFailed) if !state.is_terminal() => (Failed, vec![ReturnFailure]),
        _ => {
            return Err(TransitionError::InvalidTransition { state: *current, event: *event });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: *event, actions })
}

#[cfg(test)]
mod tests {
    use super::{OrchestrationFlow, TransitionError};
    use crate::audit::{AuditContext, AuditOutcome, InMemoryAuditSink};
    use crate::flows::states::{FlowAction, FlowContext, OrchestrationEvent, OrchestrationState};

    #[test]
    fn happy_path_reaches_completed() {
        let flow = OrchestrationFlow;
        let mut context = FlowContext::new(3);

        let planning = flow
            .apply(&flow.initial_state(), &OrchestrationEvent::PlanningStarted, &context)
            .expect("received -> planning");
        assert_eq!(planning.to, OrchestrationState::Planning);

        let executing = flow
            .apply(&planning.to, &OrchestrationEvent::ToolSelected, &context)
            .expect("planning -> executing");
        assert_eq!(executing.actions, vec![FlowAction::InvokeTool]);

        context.round_trips_used = 1;
        context.has_observations = true;
        let back = flow
            .apply(&executing.to, &OrchestrationEvent::ToolCompleted, &context)
            .expect("executing -> planning");
        assert_eq!(back.to, OrchestrationState::Planning);

        let synthesizing = flow
            .apply(&back.to, &OrchestrationEvent::FinishRequested, &context)
            .expect("planning -> synthesizing");
        assert!(synthesizing.actions.contains(&FlowAction::CollectCitations));

        let completed = flow
            .apply(&synthesizing.to, &OrchestrationEvent::AnswerAssembled, &context)
            .expect("synthesizing -> completed");
        assert_eq!(completed.to, OrchestrationState::Completed);
        assert!(completed.to.is_terminal());
    }

    #[test]
    fn tool_selection_rejected_once_cap_is_reached() {
        let flow = OrchestrationFlow;
        let context = FlowContext { round_trips_used: 3, max_round_trips: 3, has_observations: true };

        let result =
            flow.apply(&OrchestrationState::Planning, &OrchestrationEvent::ToolSelected, &context);
        assert_eq!(result, Err(TransitionError::RoundTripCapReached { max_round_trips: 3 }));
    }

    #[test]
    fn exhausted_budget_without_observations_fails() {
        let flow = OrchestrationFlow;
        let context = FlowContext::new(3);

        let outcome = flow
            .apply(&OrchestrationState::Executing, &OrchestrationEvent::BudgetExhausted, &context)
            .expect("budget exhaustion is always accepted mid-flight");
        assert_eq!(outcome.to, OrchestrationState::Failed);
        assert_eq!(outcome.actions, vec![FlowAction::ReturnApology]);
    }

    #[test]
    fn exhausted_budget_with_observations_synthesizes() {
        let flow = OrchestrationFlow;
        let context = FlowContext { round_trips_used: 2, max_round_trips: 3, has_observations: true };

        let outcome = flow
            .apply(&OrchestrationState::Planning, &OrchestrationEvent::BudgetExhausted, &context)
            .expect("planning -> synthesizing");
        assert_eq!(outcome.to, OrchestrationState::Synthesizing);
    }

    #[test]
    fn terminal_states_reject_further_events() {
        let flow = OrchestrationFlow;
        let context = FlowContext::new(3);

        for state in [OrchestrationState::Completed, OrchestrationState::Failed] {
            let result =
                flow.apply(&state, &OrchestrationEvent::CompletionServiceFailed, &context);
            assert!(matches!(result, Err(TransitionError::InvalidTransition { .. })));
        }
    }

    #[test]
    fn audit_records_rejected_transition() {
        let flow = OrchestrationFlow;
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new("s1", "req-9", "orchestrator");

        let result = flow.apply_with_audit(
            &OrchestrationState::Received,
            &OrchestrationEvent::AnswerAssembled,
            &FlowContext::new(3),
            &sink,
            &audit,
        );

        assert!(result.is_err());
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type, "orchestrator.transition_rejected");
        assert_eq!(events[0].outcome, AuditOutcome::Rejected);
    }
}
