use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use careline_core::retrieval::{RetrievalFilters, RetrievalService};
use careline_core::{ToolError, ToolName, ToolOutcome, ToolOutput};
use serde_json::{json, Map, Value};

use crate::live_data::LiveDataService;

/// Contract for one capability, sent verbatim to the decision layer.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSpec {
    pub name: ToolName,
    pub description: &'static str,
    pub parameters: Value,
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn spec(&self) -> ToolSpec;
    async fn invoke(&self, arguments: &Value) -> Result<ToolOutput, ToolError>;
}

/// Static mapping from tool id to handler. Built once at startup and shared
/// read-only across requests.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<ToolName, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn standard(
        retrieval: Arc<dyn RetrievalService>,
        live_data: Arc<dyn LiveDataService>,
    ) -> Self {
        let mut registry = Self::default();
        registry.register(PolicySearchTool::new(retrieval));
        registry.register(EligibilityTool::new(live_data.clone()));
        registry.register(ClaimStatusTool::new(live_data));
        registry
    }

    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.spec().name, Arc::new(tool));
    }

    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|tool| tool.spec()).collect()
    }

    pub fn contains(&self, name: ToolName) -> bool {
        self.tools.contains_key(&name)
    }

    pub async fn dispatch(&self, name: ToolName, arguments: &Value) -> ToolOutcome {
        let Some(tool) = self.tools.get(&name) else {
            return ToolOutcome::Failed {
                error: ToolError::InvalidArguments {
                    detail: format!("tool `{name}` is not registered"),
                },
            };
        };

        match tool.invoke(arguments).await {
            Ok(output) => ToolOutcome::Succeeded(output),
            Err(error) => ToolOutcome::Failed { error },
        }
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn argument_object(arguments: &Value) -> Result<&Map<String, Value>, ToolError> {
    arguments.as_object().ok_or_else(|| ToolError::InvalidArguments {
        detail: "arguments must be a JSON object".to_string(),
    })
}

fn optional_string(arguments: &Map<String, Value>, field: &str) -> Option<String> {
    arguments
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn identifier(arguments: &Value, field: &str) -> Result<String, ToolError> {
    let arguments = argument_object(arguments)?;
    optional_string(arguments, field).ok_or_else(|| ToolError::invalid_identifier(field))
}

pub struct PolicySearchTool {
    retrieval: Arc<dyn RetrievalService>,
}

impl PolicySearchTool {
    pub fn new(retrieval: Arc<dyn RetrievalService>) -> Self {
        Self { retrieval }
    }
}

#[async_trait]
impl Tool for PolicySearchTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: ToolName::PolicySearch,
            description: "Search policy and SOP documents and return relevant passages with citations. Use this tool for coverage, benefits, policy, or workflow questions.",
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Topic to look up, e.g. 'outpatient physical therapy prior authorization'"},
                    "plan_type": {"type": "string", "description": "Optional plan type filter such as PPO or HMO"},
                    "state": {"type": "string", "description": "Optional two-letter state filter"}
                },
                "required": ["query"]
            }),
        }
    }

    async fn invoke(&self, arguments: &Value) -> Result<ToolOutput, ToolError> {
        let arguments = argument_object(arguments)?;
        let query = optional_string(arguments, "query").ok_or_else(|| {
            ToolError::InvalidArguments { detail: "`query` must be a non-empty string".to_string() }
        })?;
        let filters = RetrievalFilters {
            plan_type: optional_string(arguments, "plan_type"),
            state: optional_string(arguments, "state"),
        };

        let citations = self
            .retrieval
            .search(&query, &filters)
            .await
            .map_err(|error| ToolError::upstream("retrieval", error.to_string()))?;

        Ok(ToolOutput { data: json!({ "query": query, "matches": citations.len() }), citations })
    }
}

pub struct EligibilityTool {
    live_data: Arc<dyn LiveDataService>,
}

impl EligibilityTool {
    pub fn new(live_data: Arc<dyn LiveDataService>) -> Self {
        Self { live_data }
    }
}

#[async_trait]
impl Tool for EligibilityTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: ToolName::GetEligibility,
            description: "Retrieve authoritative eligibility and coverage status for a member.",
            parameters: json!({
                "type": "object",
                "properties": {"member_id": {"type": "string", "description": "Member identifier from the case context"}},
                "required": ["member_id"]
            }),
        }
    }

    async fn invoke(&self, arguments: &Value) -> Result<ToolOutput, ToolError> {
        let member_id = identifier(arguments, "member_id")?;
        let data = self.live_data.eligibility(&member_id).await?;
        Ok(ToolOutput { data, citations: Vec::new() })
    }
}

pub struct ClaimStatusTool {
    live_data: Arc<dyn LiveDataService>,
}

impl ClaimStatusTool {
    pub fn new(live_data: Arc<dyn LiveDataService>) -> Self {
        Self { live_data }
    }
}

#[async_trait]
impl Tool for ClaimStatusTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: ToolName::GetClaimStatus,
            description: "Retrieve authoritative claim status and denial information.",
            parameters: json!({
                "type": "object",
                "properties": {"claim_id": {"type": "string", "description": "Claim identifier from the case context"}},
                "required": ["claim_id"]
            }),
        }
    }

    async fn invoke(&self, arguments: &Value) -> Result<ToolOutput, ToolError> {
        let claim_id = identifier(arguments, "claim_id")?;
        let data = self.live_data.claim_status(&claim_id).await?;
        Ok(ToolOutput { data, citations: Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use careline_core::retrieval::{LocalCorpus, PolicyDocument};
    use careline_core::{ToolError, ToolName, ToolOutcome};
    use serde_json::json;

    use super::ToolRegistry;
    use crate::live_data::StaticLiveData;

    fn registry() -> ToolRegistry {
        let corpus = LocalCorpus::from_documents(
            vec![PolicyDocument {
                doc_id: "pol-pt-001".to_string(),
                title: "Outpatient Physical Therapy".to_string(),
                content: "Outpatient physical therapy is covered with prior authorization after 12 visits.".to_string(),
                url: None,
                plan_type: Some("PPO".to_string()),
                state: Some("CA".to_string()),
                effective_date: None,
            }],
            3,
        );
        ToolRegistry::standard(Arc::new(corpus), Arc::new(StaticLiveData::healthy()))
    }

    #[test]
    fn standard_registry_exposes_three_tools_in_stable_order() {
        let specs = registry().specs();
        let names: Vec<ToolName> = specs.iter().map(|spec| spec.name).collect();
        assert_eq!(names, ToolName::ALL.to_vec());
        assert!(specs.iter().all(|spec| !spec.description.is_empty()));
    }

    #[tokio::test]
    async fn policy_search_returns_citations() {
        let outcome = registry()
            .dispatch(ToolName::PolicySearch, &json!({"query": "physical therapy"}))
            .await;

        assert!(outcome.is_success());
        assert_eq!(outcome.citations().len(), 1);
        assert_eq!(outcome.citations()[0].doc_id, "pol-pt-001");
    }

    #[tokio::test]
    async fn policy_search_with_no_hits_succeeds_with_empty_citations() {
        let outcome =
            registry().dispatch(ToolName::PolicySearch, &json!({"query": "dental"})).await;
        assert!(outcome.is_success());
        assert!(outcome.citations().is_empty());
    }

    #[tokio::test]
    async fn empty_member_id_is_invalid_identifier() {
        let outcome =
            registry().dispatch(ToolName::GetEligibility, &json!({"member_id": "  "})).await;
        assert_eq!(
            outcome,
            ToolOutcome::Failed { error: ToolError::invalid_identifier("member_id") }
        );
    }

    #[tokio::test]
    async fn non_object_arguments_are_rejected() {
        let outcome = registry().dispatch(ToolName::GetClaimStatus, &json!("C999")).await;
        assert!(matches!(
            outcome,
            ToolOutcome::Failed { error: ToolError::InvalidArguments { .. } }
        ));
    }

    #[tokio::test]
    async fn claim_status_returns_live_payload() {
        let outcome =
            registry().dispatch(ToolName::GetClaimStatus, &json!({"claim_id": "C999"})).await;
        let ToolOutcome::Succeeded(output) = outcome else {
            panic!("claim lookup should succeed");
        };
        assert_eq!(output.data["status"], "DENIED");
    }
}
