use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::domain::citation::Citation;
use crate::errors::ToolError;

/// The closed set of capabilities the orchestrator can dispatch to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolName {
    PolicySearch,
    GetEligibility,
    GetClaimStatus,
}

impl ToolName {
    pub const ALL: [ToolName; 3] = [Self::PolicySearch, Self::GetEligibility, Self::GetClaimStatus];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PolicySearch => "policy_search",
            Self::GetEligibility => "get_eligibility",
            Self::GetClaimStatus => "get_claim_status",
        }
    }

    /// Resolves a tool name requested by the decision layer. Unknown names yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "policy_search" => Some(Self::PolicySearch),
            "get_eligibility" => Some(Self::GetEligibility),
            "get_claim_status" => Some(Self::GetClaimStatus),
            _ => None,
        }
    }
}

impl fmt::Display for ToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub data: Value,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Succeeded(ToolOutput),
    Failed { error: ToolError },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn citations(&self) -> &[Citation] {
        match self {
            Self::Succeeded(output) => &output.citations,
            Self::Failed { .. } => &[],
        }
    }

    /// Payload handed back to the decision layer as the result of a tool turn.
    pub fn observation(&self) -> Value {
        match self {
            Self::Succeeded(output) if output.citations.is_empty() => output.data.clone(),
            Self::Succeeded(output) => json!({
                "data": output.data,
                "citations": output.citations,
            }),
            Self::Failed { error } => json!({
                "error": error.code(),
                "message": error.to_string(),
            }),
        }
    }
}

/// One executed step of a request, in the order it ran.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub ordinal: usize,
    pub tool: ToolName,
    pub arguments: Value,
    pub outcome: ToolOutcome,
}

impl ToolInvocation {
    pub fn matches(&self, tool: ToolName, arguments: &Value) -> bool {
        self.tool == tool && &self.arguments == arguments
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Finished,
    RoundTripLimit,
    DeadlineExceeded,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub invocations: Vec<ToolInvocation>,
    pub stop_reason: StopReason,
}

impl OrchestrationResult {
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.invocations.iter().map(|invocation| invocation.tool.as_str()).collect()
    }

    pub fn summaries(&self) -> Vec<ToolResultSummary> {
        self.invocations.iter().map(ToolResultSummary::from).collect()
    }
}

/// Caller-facing view of one invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolResultSummary {
    pub name: String,
    pub data: Value,
    #[serde(default)]
    pub citations: Vec<Citation>,
}

impl From<&ToolInvocation> for ToolResultSummary {
    fn from(invocation: &ToolInvocation) -> Self {
        let (data, citations) = match &invocation.outcome {
            ToolOutcome::Succeeded(output) => (output.data.clone(), output.citations.clone()),
            ToolOutcome::Failed { error } => {
                (json!({ "error": error.code(), "message": error.to_string() }), Vec::new())
            }
        };
        Self { name: invocation.tool.as_str().to_string(), data, citations }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{ToolInvocation, ToolName, ToolOutcome, ToolOutput, ToolResultSummary};
    use crate::errors::ToolError;

    #[test]
    fn parses_only_registered_tool_names() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::parse(tool.as_str()), Some(tool));
        }
        assert_eq!(ToolName::parse("delete_member"), None);
        assert_eq!(ToolName::parse(""), None);
    }

    #[test]
    fn failed_outcome_observation_carries_error_code() {
        let outcome = ToolOutcome::Failed {
            error: ToolError::UpstreamUnavailable {
                service: "eligibility".to_string(),
                detail: "connection refused".to_string(),
            },
        };

        let observation = outcome.observation();
        assert_eq!(observation["error"], "upstream_unavailable");
        assert!(observation["message"].as_str().unwrap_or_default().contains("eligibility"));
        assert!(outcome.citations().is_empty());
    }

    #[test]
    fn summary_flattens_failures_into_data() {
        let invocation = ToolInvocation {
            ordinal: 0,
            tool: ToolName::GetClaimStatus,
            arguments: json!({ "claim_id": "" }),
            outcome: ToolOutcome::Failed {
                error: ToolError::InvalidIdentifier { field: "claim_id".to_string() },
            },
        };

        let summary = ToolResultSummary::from(&invocation);
        assert_eq!(summary.name, "get_claim_status");
        assert_eq!(summary.data["error"], "invalid_identifier");
    }

    #[test]
    fn invocation_matches_on_tool_and_arguments() {
        let invocation = ToolInvocation {
            ordinal: 1,
            tool: ToolName::GetEligibility,
            arguments: json!({ "member_id": "M123" }),
            outcome: ToolOutcome::Succeeded(ToolOutput {
                data: json!({ "eligibility": "ACTIVE" }),
                citations: Vec::new(),
            }),
        };

        assert!(invocation.matches(ToolName::GetEligibility, &json!({ "member_id": "M123" })));
        assert!(!invocation.matches(ToolName::GetEligibility, &json!({ "member_id": "M124" })));
        assert!(!invocation.matches(ToolName::GetClaimStatus, &json!({ "member_id": "M123" })));
    }
}
