use std::collections::BTreeSet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Intent {
    Coverage,
    Eligibility,
    ClaimStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedIntent {
    /// Intents in the order the caller raised them.
    pub intents: Vec<Intent>,
    /// Topic phrase for policy retrieval, stripped of question scaffolding.
    pub policy_query: Option<String>,
}

const COVERAGE_CUES: [&str; 14] = [
    "covered",
    "coverage",
    "cover ",
    "benefit",
    "prior auth",
    "authorization",
    "policy",
    "copay",
    "deductible",
    "referral",
    "in-network",
    "appeal",
    "next steps",
    " sop ",
];
const ELIGIBILITY_CUES: [&str; 5] = ["eligib", "enrolled", "enrollment", "active member", "termed"];
const CLAIM_CUES: [&str; 5] = ["claim", "denied", "denial", "eob", "reimburse"];

const ABBREVIATIONS: [(&str, &str); 3] =
    [("pt", "physical therapy"), ("ot", "occupational therapy"), ("pa", "prior authorization")];

const STOPWORDS: [&str; 44] = [
    "a", "about", "an", "and", "any", "are", "be", "can", "could", "currently", "do", "does",
    "eligible", "eligibility", "for", "has", "have", "how", "i", "if", "in", "is", "it", "me",
    "member", "my", "of", "on", "or", "our", "please", "should", "status", "the", "their",
    "there", "this", "to", "was", "we", "were", "what", "why", "will",
];

#[derive(Clone, Debug, Default)]
pub struct IntentExtractor;

impl IntentExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str) -> ExtractedIntent {
        let normalized_text = format!("{} ", normalize_text(text));

        let mut positioned: Vec<(usize, Intent)> = [
            (Intent::Coverage, &COVERAGE_CUES[..]),
            (Intent::Eligibility, &ELIGIBILITY_CUES[..]),
            (Intent::ClaimStatus, &CLAIM_CUES[..]),
        ]
        .into_iter()
        .filter_map(|(intent, cues)| first_position(&normalized_text, cues).map(|pos| (pos, intent)))
        .collect();
        positioned.sort();

        let intents: Vec<Intent> = positioned.into_iter().map(|(_, intent)| intent).collect();
        let policy_query = intents
            .contains(&Intent::Coverage)
            .then(|| policy_query(&normalized_text))
            .flatten();

        ExtractedIntent { intents, policy_query }
    }
}

fn normalize_text(text: &str) -> String {
    text.to_lowercase()
}

fn first_position(text: &str, cues: &[&str]) -> Option<usize> {
    cues.iter().filter_map(|cue| text.find(cue)).min()
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|ch: char| !(ch.is_alphanumeric() || ch == '-'))
        .filter(|token| !token.is_empty())
        .collect()
}

fn policy_query(normalized_text: &str) -> Option<String> {
    let stopwords: BTreeSet<&str> = STOPWORDS.into_iter().collect();
    let terms: Vec<&str> = tokenize(normalized_text)
        .into_iter()
        .filter(|token| !stopwords.contains(token))
        .map(|token| {
            ABBREVIATIONS
                .iter()
                .find(|(short, _)| *short == token)
                .map_or(token, |(_, expanded)| *expanded)
        })
        .collect();

    (!terms.is_empty()).then(|| terms.join(" "))
}
