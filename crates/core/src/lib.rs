pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod redaction;
pub mod retrieval;

pub use domain::citation::Citation;
pub use domain::invocation::{
    OrchestrationResult, StopReason, ToolInvocation, ToolName, ToolOutcome, ToolOutput,
    ToolResultSummary,
};
pub use domain::query::{Query, QueryContext, RedactedQuery, SessionId};
pub use domain::writeback::{WritebackId, WritebackRecord};
pub use errors::{ApplicationError, DomainError, InterfaceError, ToolError};
pub use redaction::{Redaction, Redactor};
pub use retrieval::{LocalCorpus, PolicyDocument, RetrievalFilters, RetrievalService};
