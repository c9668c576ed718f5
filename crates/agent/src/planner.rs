use std::sync::Arc;

use async_trait::async_trait;
use careline_core::{RedactedQuery, ToolInvocation, ToolName};
use serde_json::{json, Value};

use crate::conversation::{Intent, IntentExtractor};
use crate::llm::{ChatMessage, Completion, CompletionError, CompletionRequest, LlmClient, ToolCallRequest};
use crate::synthesis::compose_answer;
use crate::tools::ToolSpec;

pub const SYSTEM_PROMPT: &str = "You are a healthcare call center assistant. Use tools when needed. Cite policy sources. \
Never state a member's eligibility or a claim's status unless a tool returned it in this conversation.";

#[derive(Clone, Debug, PartialEq)]
pub enum NextAction {
    Invoke { call_id: String, tool: String, arguments: Value },
    Finish { answer: String },
}

/// Result of one round trip as shown to the decision layer.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub call_id: String,
    pub tool: String,
    pub arguments: Value,
    pub result: Value,
}

pub struct PlanningContext<'a> {
    pub query: &'a RedactedQuery,
    pub tools: &'a [ToolSpec],
    pub observations: &'a [Observation],
    pub invocations: &'a [ToolInvocation],
}

#[async_trait]
pub trait Planner: Send + Sync {
    async fn decide(&self, context: &PlanningContext<'_>) -> Result<NextAction, CompletionError>;

    fn name(&self) -> &'static str;
}

/// Delegates each step to a completion service with native tool calling.
pub struct LlmPlanner {
    client: Arc<dyn LlmClient>,
}

impl LlmPlanner {
    pub fn new(client: Arc<dyn LlmClient>) -> Self {
        Self { client }
    }

    pub fn build_request(context: &PlanningContext<'_>) -> CompletionRequest {
        let context_json =
            serde_json::to_string(&context.query.context).unwrap_or_else(|_| "{}".to_string());
        let mut messages = vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(format!("{}\nContext: {context_json}", context.query.message)),
        ];

        for observation in context.observations {
            messages.push(ChatMessage::assistant_tool_call(ToolCallRequest {
                id: observation.call_id.clone(),
                name: observation.tool.clone(),
                arguments: observation.arguments.clone(),
            }));
            messages.push(ChatMessage::tool_result(
                observation.call_id.clone(),
                observation.result.to_string(),
            ));
        }

        CompletionRequest { messages, tools: context.tools.to_vec() }
    }
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn decide(&self, context: &PlanningContext<'_>) -> Result<NextAction, CompletionError> {
        let request = Self::build_request(context);
        match self.client.complete(&request).await? {
            Completion::Message(answer) => Ok(NextAction::Finish { answer }),
            Completion::ToolCall(call) => {
                Ok(NextAction::Invoke { call_id: call.id, tool: call.name, arguments: call.arguments })
            }
        }
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

/// Offline planner for `llm.provider = "none"`. Routes by keyword intent and
/// context identifiers, then answers deterministically from the invocation log.
#[derive(Clone, Debug, Default)]
pub struct KeywordPlanner {
    extractor: IntentExtractor,
}

impl KeywordPlanner {
    pub fn new() -> Self {
        Self { extractor: IntentExtractor::new() }
    }

    pub fn plan(&self, query: &RedactedQuery) -> Vec<(ToolName, Value)> {
        let extracted = self.extractor.extract(&query.message);
        extracted
            .intents
            .iter()
            .filter_map(|intent| match intent {
                Intent::Coverage => extracted
                    .policy_query
                    .as_ref()
                    .map(|policy_query| (ToolName::PolicySearch, json!({ "query": policy_query }))),
                Intent::Eligibility => Some((
                    ToolName::GetEligibility,
                    json!({ "member_id": query.member_id().unwrap_or_default() }),
                )),
                Intent::ClaimStatus => Some((
                    ToolName::GetClaimStatus,
                    json!({ "claim_id": query.claim_id().unwrap_or_default() }),
                )),
            })
            .collect()
    }
}

#[async_trait]
impl Planner for KeywordPlanner {
    async fn decide(&self, context: &PlanningContext<'_>) -> Result<NextAction, CompletionError> {
        let pending = self.plan(context.query).into_iter().find(|(tool, arguments)| {
            !context
                .observations
                .iter()
                .any(|seen| seen.tool == tool.as_str() && &seen.arguments == arguments)
        });

        Ok(match pending {
            Some((tool, arguments)) => NextAction::Invoke {
                call_id: format!("call_{}", context.observations.len() + 1),
                tool: tool.as_str().to_string(),
                arguments,
            },
            None => NextAction::Finish { answer: compose_answer(context.query, context.invocations) },
        })
    }

    fn name(&self) -> &'static str {
        "keyword"
    }
}

#[cfg(test)]
mod tests {
    use careline_core::{QueryContext, RedactedQuery, SessionId, ToolName};
    use serde_json::json;

    use super::{KeywordPlanner, LlmPlanner, NextAction, Observation, Planner, PlanningContext};

    fn query(message: &str, context: serde_json::Value) -> RedactedQuery {
        let context: QueryContext = serde_json::from_value(context).expect("object context");
        RedactedQuery {
            session_id: SessionId("s1".to_string()),
            message: message.to_string(),
            context,
            redaction_count: 0,
        }
    }

    #[test]
    fn keyword_plan_routes_multi_intent_in_mention_order() {
        let plan = KeywordPlanner::new().plan(&query(
            "Is outpatient PT covered and is this member eligible?",
            json!({"member_id": "M123"}),
        ));

        assert_eq!(
            plan,
            vec![
                (ToolName::PolicySearch, json!({"query": "outpatient physical therapy covered"})),
                (ToolName::GetEligibility, json!({"member_id": "M123"})),
            ]
        );
    }

    #[tokio::test]
    async fn keyword_planner_skips_observed_steps_then_finishes() {
        let planner = KeywordPlanner::new();
        let query = query("Is this member currently eligible?", json!({"member_id": "M123"}));
        let observations = vec![Observation {
            call_id: "call_1".to_string(),
            tool: "get_eligibility".to_string(),
            arguments: json!({"member_id": "M123"}),
            result: json!({"eligibility": "ACTIVE"}),
        }];

        let first = planner
            .decide(&PlanningContext { query: &query, tools: &[], observations: &[], invocations: &[] })
            .await
            .expect("keyword planner never fails");
        assert!(matches!(first, NextAction::Invoke { ref tool, .. } if tool == "get_eligibility"));

        let second = planner
            .decide(&PlanningContext {
                query: &query,
                tools: &[],
                observations: &observations,
                invocations: &[],
            })
            .await
            .expect("keyword planner never fails");
        assert!(matches!(second, NextAction::Finish { .. }));
    }

    #[test]
    fn llm_request_replays_observations_as_tool_turns() {
        let query = query("Is this member eligible?", json!({"member_id": "M123"}));
        let observations = vec![Observation {
            call_id: "call_a".to_string(),
            tool: "get_eligibility".to_string(),
            arguments: json!({"member_id": "M123"}),
            result: json!({"eligibility": "ACTIVE"}),
        }];

        let request = LlmPlanner::build_request(&PlanningContext {
            query: &query,
            tools: &[],
            observations: &observations,
            invocations: &[],
        });

        assert_eq!(request.messages.len(), 4);
        let user = request.messages[1].content.as_deref().unwrap_or_default();
        assert!(user.starts_with("Is this member eligible?\nContext: "));
        assert!(user.contains("M123"));
        assert_eq!(request.messages[2].tool_calls[0].id, "call_a");
        assert_eq!(request.messages[3].tool_call_id.as_deref(), Some("call_a"));
    }
}
