use careline_core::{ToolInvocation, ToolName};
use regex::Regex;

pub const ELIGIBILITY_CAVEAT: &str = "Eligibility could not be confirmed at this time.";
pub const CLAIM_CAVEAT: &str = "Claim status could not be confirmed at this time.";

const SENTENCE_PATTERN: &str = r"[^.!?\n]+(?:[.!?]+|\n|$)\s*";
const ELIGIBILITY_SUBJECT_PATTERN: &str = r"(?i)\b(eligib\w*|member|coverage)\b";
const ELIGIBILITY_STATUS_PATTERN: &str = r"(?i)\b(is|are|remains|was|appears)\s+(currently\s+|still\s+)?(not\s+)?(eligible|ineligible|active|inactive|enrolled|terminated)\b";
const CLAIM_SUBJECT_PATTERN: &str = r"(?i)\bclaims?\b";
const CLAIM_STATUS_PATTERN: &str = r"(?i)\b(is|was|has been|remains|appears)\s+(currently\s+|still\s+)?(not\s+)?(denied|approved|paid|pending|rejected|processed|in review)\b";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Degrade { reason_code: &'static str, answer: String },
}

/// Keeps the answer from asserting eligibility or claim outcomes that no
/// successful live lookup in the same request backs up. Sentences quoted from
/// a cited policy snippet are policy text and are never stripped.
#[derive(Clone, Debug)]
pub struct GuardrailPolicy {
    sentence: Regex,
    eligibility_subject: Regex,
    eligibility_status: Regex,
    claim_subject: Regex,
    claim_status: Regex,
}

struct Check<'a> {
    tool: ToolName,
    subject: &'a Regex,
    status: &'a Regex,
    caveat: &'static str,
    reason_code: &'static str,
}

impl GuardrailPolicy {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            sentence: Regex::new(SENTENCE_PATTERN)?,
            eligibility_subject: Regex::new(ELIGIBILITY_SUBJECT_PATTERN)?,
            eligibility_status: Regex::new(ELIGIBILITY_STATUS_PATTERN)?,
            claim_subject: Regex::new(CLAIM_SUBJECT_PATTERN)?,
            claim_status: Regex::new(CLAIM_STATUS_PATTERN)?,
        })
    }

    pub fn evaluate(&self, answer: &str, invocations: &[ToolInvocation]) -> GuardrailDecision {
        let checks = [
            Check {
                tool: ToolName::GetEligibility,
                subject: &self.eligibility_subject,
                status: &self.eligibility_status,
                caveat: ELIGIBILITY_CAVEAT,
                reason_code: "eligibility_unconfirmed",
            },
            Check {
                tool: ToolName::GetClaimStatus,
                subject: &self.claim_subject,
                status: &self.claim_status,
                caveat: CLAIM_CAVEAT,
                reason_code: "claim_status_unconfirmed",
            },
        ];

        let cited: Vec<&str> = invocations
            .iter()
            .filter(|invocation| invocation.tool == ToolName::PolicySearch)
            .flat_map(|invocation| invocation.outcome.citations())
            .map(|citation| citation.snippet.as_str())
            .collect();

        let mut text = answer.trim().to_string();
        let mut reason_code = None;

        for check in checks {
            let attempts: Vec<&ToolInvocation> =
                invocations.iter().filter(|invocation| invocation.tool == check.tool).collect();
            let confirmed = attempts.iter().any(|invocation| invocation.outcome.is_success());
            let failed = attempts.iter().any(|invocation| !invocation.outcome.is_success());

            let mut removed = false;
            if !confirmed {
                let (kept, dropped) = self.strip_claims(&text, check.subject, check.status, &cited);
                text = kept;
                removed = dropped;
            }

            if (removed || (failed && !confirmed)) && !text.contains(check.caveat) {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(check.caveat);
                reason_code.get_or_insert(check.reason_code);
            }
        }

        match reason_code {
            Some(reason_code) => GuardrailDecision::Degrade { reason_code, answer: text },
            None => GuardrailDecision::Allow,
        }
    }

    fn strip_claims(
        &self,
        text: &str,
        subject: &Regex,
        status: &Regex,
        cited: &[&str],
    ) -> (String, bool) {
        let mut removed = false;
        let kept: String = self
            .sentence
            .find_iter(text)
            .map(|sentence| sentence.as_str())
            .filter(|sentence| {
                let asserts = subject.is_match(sentence)
                    && status.is_match(sentence)
                    && !is_quoted(sentence, cited);
                removed |= asserts;
                !asserts
            })
            .collect();
        (kept.trim().to_string(), removed)
    }
}

/// True when the sentence body appears verbatim in a cited snippet. The body
/// skips a leading `... [doc-id]: ` attribution.
fn is_quoted(sentence: &str, cited: &[&str]) -> bool {
    let body = match sentence.rfind("]: ") {
        Some(index) => &sentence[index + 3..],
        None => sentence,
    };
    let body = body.trim();
    !body.is_empty() && cited.iter().any(|snippet| snippet.contains(body))
}
