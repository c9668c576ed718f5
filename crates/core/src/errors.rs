use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::flows::TransitionError;
use crate::StopReason;

/// Failures of a single tool call. These become observations for the planner
/// and never fail a request on their own.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolError {
    #[error("{service} service unavailable: {detail}")]
    UpstreamUnavailable { service: String, detail: String },
    #[error("invalid identifier supplied for `{field}`")]
    InvalidIdentifier { field: String },
    #[error("invalid tool arguments: {detail}")]
    InvalidArguments { detail: String },
}

impl ToolError {
    pub fn upstream(service: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::UpstreamUnavailable { service: service.into(), detail: detail.into() }
    }

    pub fn invalid_identifier(field: impl Into<String>) -> Self {
        Self::InvalidIdentifier { field: field.into() }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable { .. } => "upstream_unavailable",
            Self::InvalidIdentifier { .. } => "invalid_identifier",
            Self::InvalidArguments { .. } => "invalid_arguments",
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    FlowTransition(#[from] TransitionError),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("completion service failure: {0}")]
    CompletionService(String),
    #[error(
        "planning exhausted ({stop_reason:?}) after {round_trips} round trips without usable results"
    )]
    PlanningExhausted { round_trips: u32, stop_reason: StopReason },
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("service unavailable: {message}")]
    ServiceUnavailable { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => {
                "The request could not be processed. Check inputs and try again."
            }
            Self::ServiceUnavailable { .. } => {
                "The assistant is temporarily unavailable. Please retry shortly."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::ServiceUnavailable { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::ServiceUnavailable { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(DomainError::InvalidRequest(message)) => {
                Self::BadRequest { message, correlation_id }
            }
            ApplicationError::Domain(DomainError::FlowTransition(error)) => {
                Self::Internal { message: error.to_string(), correlation_id }
            }
            ApplicationError::CompletionService(message)
            | ApplicationError::Persistence(message) => {
                Self::ServiceUnavailable { message, correlation_id }
            }
            error @ ApplicationError::PlanningExhausted { .. } => {
                Self::ServiceUnavailable { message: error.to_string(), correlation_id }
            }
            ApplicationError::Configuration(message) => Self::Internal { message, correlation_id },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError, ToolError};
    use crate::flows::{OrchestrationEvent, OrchestrationState, TransitionError};

    #[test]
    fn invalid_request_maps_to_bad_request_with_correlation_id() {
        let interface =
            ApplicationError::from(DomainError::InvalidRequest("message must not be empty".into()))
                .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest { ref correlation_id, ref message }
                if correlation_id == "req-1" && message.contains("message")
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn completion_failure_maps_to_service_unavailable() {
        let interface = ApplicationError::CompletionService("HTTP 502".to_owned())
            .into_interface("req-2");

        assert!(matches!(interface, InterfaceError::ServiceUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn flow_transition_error_maps_to_internal() {
        let interface = ApplicationError::from(DomainError::from(
            TransitionError::InvalidTransition {
                state: OrchestrationState::Completed,
                event: OrchestrationEvent::PlanningStarted,
            },
        ))
        .into_interface("req-3");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn tool_error_codes_are_stable() {
        assert_eq!(ToolError::upstream("claims", "timeout").code(), "upstream_unavailable");
        assert_eq!(ToolError::invalid_identifier("member_id").code(), "invalid_identifier");
        assert_eq!(
            ToolError::InvalidArguments { detail: "missing query".into() }.code(),
            "invalid_arguments"
        );
    }
}
