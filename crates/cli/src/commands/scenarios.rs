//! The four canned demo conversations an agent walks through on a call.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Scenario {
    pub number: u8,
    pub title: &'static str,
    pub message: &'static str,
    pub member_id: Option<&'static str>,
    pub claim_id: Option<&'static str>,
    pub expected_tools: &'static str,
}

pub const DEMO_SESSION_ID: &str = "s1";

pub const SCENARIOS: [Scenario; 4] = [
    Scenario {
        number: 1,
        title: "Coverage & prior authorization",
        message: "Is outpatient physical therapy covered, and does it require prior authorization?",
        member_id: Some("M123"),
        claim_id: None,
        expected_tools: "policy_search",
    },
    Scenario {
        number: 2,
        title: "Eligibility check",
        message: "Is this member currently eligible?",
        member_id: Some("M123"),
        claim_id: None,
        expected_tools: "get_eligibility",
    },
    Scenario {
        number: 3,
        title: "Claim denial explanation",
        message: "Why was this claim denied and what are the next steps?",
        member_id: Some("M123"),
        claim_id: Some("C999"),
        expected_tools: "get_claim_status, policy_search",
    },
    Scenario {
        number: 4,
        title: "Multi-intent orchestration",
        message: "Is outpatient PT covered and is this member eligible?",
        member_id: Some("M123"),
        claim_id: None,
        expected_tools: "policy_search, get_eligibility",
    },
];

pub fn find(number: u8) -> Option<&'static Scenario> {
    SCENARIOS.iter().find(|scenario| scenario.number == number)
}

pub fn run() -> String {
    let mut lines = vec!["demo scenarios (run with `careline ask --scenario N`):".to_string()];
    for scenario in &SCENARIOS {
        let mut context = Vec::new();
        if let Some(member_id) = scenario.member_id {
            context.push(format!("member_id={member_id}"));
        }
        if let Some(claim_id) = scenario.claim_id {
            context.push(format!("claim_id={claim_id}"));
        }
        lines.push(format!("{}) {}", scenario.number, scenario.title));
        lines.push(format!("   question: {}", scenario.message));
        lines.push(format!("   context: {}", context.join(" ")));
        lines.push(format!("   expects: {}", scenario.expected_tools));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{find, run, SCENARIOS};

    #[test]
    fn scenarios_are_numbered_one_through_four() {
        let numbers: Vec<u8> = SCENARIOS.iter().map(|scenario| scenario.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
        assert_eq!(find(3).and_then(|scenario| scenario.claim_id), Some("C999"));
        assert!(find(5).is_none());
    }

    #[test]
    fn listing_includes_every_question() {
        let listing = run();
        for scenario in &SCENARIOS {
            assert!(listing.contains(scenario.message));
        }
        assert!(listing.contains("claim_id=C999"));
    }
}
