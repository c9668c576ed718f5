use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestrationState {
    Received,
    Planning,
    Executing,
    Synthesizing,
    Completed,
    Failed,
}

impl OrchestrationState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestrationEvent {
    PlanningStarted,
    ToolSelected,
    ToolCompleted,
    FinishRequested,
    BudgetExhausted,
    AnswerAssembled,
    CompletionServiceFailed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowContext {
    pub round_trips_used: u32,
    pub max_round_trips: u32,
    pub has_observations: bool,
}

impl FlowContext {
    pub fn new(max_round_trips: u32) -> Self {
        Self { round_trips_used: 0, max_round_trips, has_observations: false }
    }

    pub fn round_trips_remaining(&self) -> u32 {
        self.max_round_trips.saturating_sub(self.round_trips_used)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowAction {
    ConsultPlanner,
    InvokeTool,
    CollectCitations,
    AssembleAnswer,
    ReturnResult,
    ReturnApology,
    ReturnFailure,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: OrchestrationState,
    pub to: OrchestrationState,
    pub event: OrchestrationEvent,
    pub actions: Vec<FlowAction>,
}
