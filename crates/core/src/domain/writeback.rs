use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::invocation::OrchestrationResult;
use crate::domain::query::{RedactedQuery, SessionId};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WritebackId(pub String);

impl WritebackId {
    /// CRM-style identifier, `crm_` followed by six hex characters.
    pub fn generate() -> Self {
        let hex = Uuid::new_v4().simple().to_string();
        Self(format!("crm_{}", &hex[..6]))
    }
}

/// Interaction summary handed to the CRM after a chat completes. Holds redacted text only.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WritebackRecord {
    pub id: WritebackId,
    pub session_id: SessionId,
    pub message: String,
    pub answer: String,
    pub tools_used: Vec<String>,
    pub citation_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl WritebackRecord {
    pub fn from_result(query: &RedactedQuery, result: &OrchestrationResult) -> Self {
        Self {
            id: WritebackId::generate(),
            session_id: query.session_id.clone(),
            message: query.message.clone(),
            answer: result.answer.clone(),
            tools_used: result.tool_names().into_iter().map(str::to_string).collect(),
            citation_ids: result.citations.iter().map(|citation| citation.doc_id.clone()).collect(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::WritebackId;

    #[test]
    fn generated_ids_use_crm_prefix_and_six_hex_chars() {
        let id = WritebackId::generate();
        let suffix = id.0.strip_prefix("crm_").unwrap_or_default();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
