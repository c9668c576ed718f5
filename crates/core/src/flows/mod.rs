pub mod engine;
pub mod states;

pub use engine::{OrchestrationFlow, TransitionError};
pub use states::{
    FlowAction, FlowContext, OrchestrationEvent, OrchestrationState, TransitionOutcome,
};
