use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::DomainError;

pub const MEMBER_ID_KEY: &str = "member_id";
pub const CLAIM_ID_KEY: &str = "claim_id";

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub type QueryContext = BTreeMap<String, Value>;

/// A caller question exactly as received. Never mutated after construction.
#[derive(Clone, Debug, PartialEq)]
pub struct Query {
    session_id: SessionId,
    message: String,
    context: QueryContext,
}

impl Query {
    pub fn new(
        session_id: impl Into<String>,
        message: impl Into<String>,
        context: QueryContext,
    ) -> Result<Self, DomainError> {
        let session_id = session_id.into();
        let message = message.into();

        if session_id.trim().is_empty() {
            return Err(DomainError::InvalidRequest("session_id must not be empty".to_string()));
        }
        if message.trim().is_empty() {
            return Err(DomainError::InvalidRequest("message must not be empty".to_string()));
        }

        Ok(Self { session_id: SessionId(session_id), message, context })
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &QueryContext {
        &self.context
    }
}

/// A [`Query`] after identifiable substrings were replaced with placeholder tokens.
#[derive(Clone, Debug, PartialEq)]
pub struct RedactedQuery {
    pub session_id: SessionId,
    pub message: String,
    pub context: QueryContext,
    pub redaction_count: usize,
}

impl RedactedQuery {
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(Value::as_str).map(str::trim).filter(|value| !value.is_empty())
    }

    pub fn member_id(&self) -> Option<&str> {
        self.context_str(MEMBER_ID_KEY)
    }

    pub fn claim_id(&self) -> Option<&str> {
        self.context_str(CLAIM_ID_KEY)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Query, QueryContext, RedactedQuery, SessionId};
    use crate::errors::DomainError;

    #[test]
    fn rejects_blank_message() {
        let result = Query::new("s1", "   ", QueryContext::new());
        assert!(matches!(result, Err(DomainError::InvalidRequest(ref message)) if message.contains("message")));
    }

    #[test]
    fn rejects_blank_session_id() {
        let result = Query::new("", "Is this member eligible?", QueryContext::new());
        assert!(matches!(result, Err(DomainError::InvalidRequest(ref message)) if message.contains("session_id")));
    }

    #[test]
    fn context_identifiers_ignore_blank_and_non_string_values() {
        let mut context = QueryContext::new();
        context.insert("member_id".to_string(), json!(" M123 "));
        context.insert("claim_id".to_string(), json!(""));
        context.insert("plan".to_string(), json!(42));

        let query = RedactedQuery {
            session_id: SessionId("s1".to_string()),
            message: "hello".to_string(),
            context,
            redaction_count: 0,
        };

        assert_eq!(query.member_id(), Some("M123"));
        assert_eq!(query.claim_id(), None);
        assert_eq!(query.context_str("plan"), None);
    }
}
