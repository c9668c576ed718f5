//! Agent runtime: the bounded tool-routing loop behind the call-center copilot.
//!
//! A redacted query moves through a constrained loop:
//! 1. **Planning** (`planner`) asks the completion service, or the offline
//!    keyword planner, for the next step.
//! 2. **Execution** (`tools`) dispatches exactly one registered tool and logs it.
//! 3. **Synthesis** (`runtime`, `synthesis`) builds the answer and runs it through
//!    the `guardrails` before returning.
//!
//! # Safety Principle
//!
//! The completion service only routes and phrases. Eligibility and claim
//! outcomes come from live lookups logged in the same request, never from
//! the model or the policy corpus.

pub mod conversation;
pub mod guardrails;
pub mod live_data;
pub mod llm;
pub mod openai;
pub mod planner;
pub mod runtime;
pub mod synthesis;
pub mod tools;

pub use guardrails::{GuardrailDecision, GuardrailPolicy};
pub use live_data::{HttpLiveDataClient, LiveDataService, StaticLiveData};
pub use llm::{CompletionError, LlmClient};
pub use openai::OpenAiClient;
pub use planner::{KeywordPlanner, LlmPlanner, Planner};
pub use runtime::{AgentRuntime, RuntimeLimits};
pub use tools::ToolRegistry;
