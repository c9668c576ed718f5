use regex::Regex;
use serde_json::Value;

use crate::domain::query::{Query, RedactedQuery};

pub const SSN_PLACEHOLDER: &str = "[REDACTED_SSN]";
pub const EMAIL_PLACEHOLDER: &str = "[REDACTED_EMAIL]";
pub const PHONE_PLACEHOLDER: &str = "[REDACTED_PHONE]";

const SSN_PATTERN: &str = r"\b\d{3}-\d{2}-\d{4}\b";
const EMAIL_PATTERN: &str = r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b";
const PHONE_PATTERN: &str = r"(?:\+?1[-.\s]?)?(?:\(\d{3}\)\s?|\b\d{3}[-.\s])\d{3}[-.\s]\d{4}\b";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redaction {
    pub text: String,
    pub count: usize,
}

/// Replaces identifiable substrings with fixed placeholders. Patterns run in
/// order, so an SSN is never re-matched as a phone number.
#[derive(Clone, Debug)]
pub struct Redactor {
    rules: Vec<(Regex, &'static str)>,
}

impl Redactor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            rules: vec![
                (Regex::new(SSN_PATTERN)?, SSN_PLACEHOLDER),
                (Regex::new(EMAIL_PATTERN)?, EMAIL_PLACEHOLDER),
                (Regex::new(PHONE_PATTERN)?, PHONE_PLACEHOLDER),
            ],
        })
    }

    pub fn redact(&self, text: &str) -> Redaction {
        let mut cleaned = text.to_string();
        let mut count = 0;
        for (pattern, placeholder) in &self.rules {
            let matches = pattern.find_iter(&cleaned).count();
            if matches > 0 {
                count += matches;
                cleaned = pattern.replace_all(&cleaned, *placeholder).into_owned();
            }
        }
        Redaction { text: cleaned, count }
    }

    /// Redacts string leaves of a JSON value, returning the number of replacements.
    pub fn redact_value(&self, value: &mut Value) -> usize {
        match value {
            Value::String(text) => {
                let redaction = self.redact(text);
                if redaction.count > 0 {
                    *text = redaction.text;
                }
                redaction.count
            }
            Value::Array(items) => items.iter_mut().map(|item| self.redact_value(item)).sum(),
            Value::Object(map) => map.values_mut().map(|item| self.redact_value(item)).sum(),
            Value::Null | Value::Bool(_) | Value::Number(_) => 0,
        }
    }

    pub fn redact_query(&self, query: &Query) -> RedactedQuery {
        let message = self.redact(query.message());
        let mut context = query.context().clone();
        let context_count: usize = context.values_mut().map(|value| self.redact_value(value)).sum();

        RedactedQuery {
            session_id: query.session_id().clone(),
            message: message.text,
            context,
            redaction_count: message.count + context_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Redactor, EMAIL_PLACEHOLDER, PHONE_PLACEHOLDER, SSN_PLACEHOLDER};
    use crate::domain::query::{Query, QueryContext};

    fn redactor() -> Redactor {
        Redactor::new().expect("patterns compile")
    }

    #[test]
    fn replaces_ssn_digits_with_placeholder() {
        let redaction = redactor().redact("Member SSN is 123-45-6789, please check.");

        assert!(!redaction.text.contains("123-45-6789"));
        assert!(redaction.text.contains(SSN_PLACEHOLDER));
        assert_eq!(redaction.count, 1);
    }

    #[test]
    fn leaves_clean_text_untouched() {
        let text = "Is outpatient physical therapy covered?";
        let redaction = redactor().redact(text);

        assert_eq!(redaction.text, text);
        assert_eq!(redaction.count, 0);
    }

    #[test]
    fn redacts_email_and_phone() {
        let redaction =
            redactor().redact("Reach jane.doe@example.com or (555) 123-4567 or 555.987.6543");

        assert!(redaction.text.contains(EMAIL_PLACEHOLDER));
        assert_eq!(redaction.text.matches(PHONE_PLACEHOLDER).count(), 2);
        assert_eq!(redaction.count, 3);
        assert!(!redaction.text.contains("example.com"));
    }

    #[test]
    fn ssn_is_not_double_counted_as_phone() {
        let redaction = redactor().redact("111-22-3333");
        assert_eq!(redaction.text, SSN_PLACEHOLDER);
        assert_eq!(redaction.count, 1);
    }

    #[test]
    fn redacts_string_context_values_and_preserves_identifiers() {
        let mut context = QueryContext::new();
        context.insert("member_id".to_string(), json!("M123"));
        context.insert("notes".to_string(), json!(["caller ssn 987-65-4321"]));
        let query = Query::new("s1", "SSN 123-45-6789", context).expect("valid query");

        let redacted = redactor().redact_query(&query);

        assert_eq!(redacted.member_id(), Some("M123"));
        assert_eq!(redacted.context["notes"][0], json!(format!("caller ssn {SSN_PLACEHOLDER}")));
        assert_eq!(redacted.redaction_count, 2);
        assert_eq!(redacted.message, format!("SSN {SSN_PLACEHOLDER}"));
    }
}
