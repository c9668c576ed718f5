use careline_core::{RedactedQuery, ToolInvocation, ToolName, ToolOutcome};
use serde_json::Value;

const NO_TOOLS_ANSWER: &str = "I can help with coverage and policy questions, member eligibility, \
and claim status. Please include the member or claim identifier in the case context when asking \
about a specific member or claim.";
const NO_POLICY_MATCH: &str = "I could not find a policy document that addresses this question.";

/// Builds an answer strictly from what the invocation log holds. Used by the
/// offline planner and when a request stops before the decision layer finished.
pub fn compose_answer(query: &RedactedQuery, invocations: &[ToolInvocation]) -> String {
    if invocations.is_empty() {
        return NO_TOOLS_ANSWER.to_string();
    }

    let mut sentences = Vec::new();
    for invocation in invocations {
        match invocation.tool {
            ToolName::PolicySearch => sentences.push(policy_sentence(invocation)),
            ToolName::GetEligibility => sentences.push(eligibility_sentence(query, invocation)),
            ToolName::GetClaimStatus => sentences.push(claim_sentence(query, invocation)),
        }
    }
    sentences.join(" ")
}

fn policy_sentence(invocation: &ToolInvocation) -> String {
    match &invocation.outcome {
        ToolOutcome::Succeeded(output) if output.citations.is_empty() => NO_POLICY_MATCH.to_string(),
        ToolOutcome::Succeeded(output) => output
            .citations
            .iter()
            .map(|citation| {
                format!("Per policy {} [{}]: {}", citation.title, citation.doc_id, citation.snippet.trim())
            })
            .collect::<Vec<_>>()
            .join(" "),
        ToolOutcome::Failed { .. } => "Policy documents could not be searched at this time.".to_string(),
    }
}

fn eligibility_sentence(query: &RedactedQuery, invocation: &ToolInvocation) -> String {
    let member = invocation
        .arguments
        .get("member_id")
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .or_else(|| query.member_id())
        .unwrap_or("the member");

    match &invocation.outcome {
        ToolOutcome::Succeeded(output) => match output.data.get("eligibility").and_then(Value::as_str) {
            Some(status) => format!("Member {member} eligibility status: {status}."),
            None => format!("The eligibility record for member {member} did not include a status."),
        },
        ToolOutcome::Failed { .. } => {
            format!("Eligibility for member {member} could not be retrieved.")
        }
    }
}

fn claim_sentence(query: &RedactedQuery, invocation: &ToolInvocation) -> String {
    let claim = invocation
        .arguments
        .get("claim_id")
        .and_then(Value::as_str)
        .filter(|value| !value.trim().is_empty())
        .or_else(|| query.claim_id())
        .unwrap_or("the claim");

    match &invocation.outcome {
        ToolOutcome::Succeeded(output) => {
            let Some(status) = output.data.get("status").and_then(Value::as_str) else {
                return format!("The record for claim {claim} did not include a status.");
            };
            match output.data.get("denial_reason").and_then(Value::as_str) {
                Some(reason) => format!("Claim {claim} status: {status}. Denial reason: {reason}"),
                None => format!("Claim {claim} status: {status}."),
            }
        }
        ToolOutcome::Failed { .. } => format!("Status for claim {claim} could not be retrieved."),
    }
}

#[cfg(test)]
mod tests {
    use careline_core::{
        Citation, QueryContext, RedactedQuery, SessionId, ToolError, ToolInvocation, ToolName,
        ToolOutcome, ToolOutput,
    };
    use serde_json::json;

    use super::compose_answer;

    fn query() -> RedactedQuery {
        RedactedQuery {
            session_id: SessionId("s1".to_string()),
            message: "question".to_string(),
            context: QueryContext::new(),
            redaction_count: 0,
        }
    }

    #[test]
    fn answer_cites_policy_and_reports_eligibility() {
        let invocations = vec![
            ToolInvocation {
                ordinal: 0,
                tool: ToolName::PolicySearch,
                arguments: json!({"query": "physical therapy"}),
                outcome: ToolOutcome::Succeeded(ToolOutput {
                    data: json!({"query": "physical therapy", "matches": 1}),
                    citations: vec![Citation {
                        doc_id: "pol-pt-001".to_string(),
                        title: "Outpatient Physical Therapy".to_string(),
                        snippet: "Covered with prior authorization.".to_string(),
                        url: None,
                        metadata: Default::default(),
                    }],
                }),
            },
            ToolInvocation {
                ordinal: 1,
                tool: ToolName::GetEligibility,
                arguments: json!({"member_id": "M123"}),
                outcome: ToolOutcome::Succeeded(ToolOutput {
                    data: json!({"member_id": "M123", "eligibility": "ACTIVE"}),
                    citations: Vec::new(),
                }),
            },
        ];

        let answer = compose_answer(&query(), &invocations);
        assert!(answer.contains("[pol-pt-001]"));
        assert!(answer.contains("Member M123 eligibility status: ACTIVE."));
    }

    #[test]
    fn failed_lookup_never_states_a_status() {
        let invocations = vec![ToolInvocation {
            ordinal: 0,
            tool: ToolName::GetClaimStatus,
            arguments: json!({"claim_id": "C999"}),
            outcome: ToolOutcome::Failed { error: ToolError::upstream("claims", "timeout") },
        }];

        let answer = compose_answer(&query(), &invocations);
        assert_eq!(answer, "Status for claim C999 could not be retrieved.");
    }

    #[test]
    fn empty_log_returns_help_text() {
        assert!(compose_answer(&query(), &[]).contains("coverage and policy questions"));
    }
}
