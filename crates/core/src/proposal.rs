//! Proposal synthesis
//!
//! Turns a finished (or nearly finished) conversation into the plain-text
//! proposal consumed downstream. The `[PROPOSAL_DATA]` / `[/PROPOSAL_DATA]`
//! delimiters are parsed by other systems and must not change.

use std::fmt;

use serde::Serialize;

use crate::conversation::state::{ConversationState, SKIPPED};

pub const PROPOSAL_OPEN: &str = "[PROPOSAL_DATA]";
pub const PROPOSAL_CLOSE: &str = "[/PROPOSAL_DATA]";

/// Keys shown in the proposal header rather than the requirements list.
const HEADER_KEYS: [&str; 3] = ["name", "company", "notes"];

const SCOPE_OF_WORK: &str = "\
Phase 1: Discovery & Planning - Requirements gathering and technical architecture
Phase 2: Design & Preparation - Creative direction and asset preparation
Phase 3: Production & Development - Core work and implementation
Phase 4: Review & Delivery - Quality assurance and final delivery";

const NEXT_STEPS: &str = "\
1. Review and confirm this proposal
2. Sign agreement and pay deposit
3. Kickoff meeting to begin work";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Requirement {
    pub label: String,
    pub value: String,
}

/// Denormalized proposal fields. Holds no reference back to the state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Proposal {
    pub project: String,
    pub client: String,
    pub service: String,
    pub summary: String,
    pub requirements: Vec<Requirement>,
    pub budget: String,
    pub timeline: String,
}

impl Proposal {
    pub fn from_state(state: &ConversationState) -> Self {
        let answers = &state.collected_answers;

        let client = answers.get("name").unwrap_or("Client").to_string();
        let project =
            answers.get("company").or_else(|| answers.get("name")).unwrap_or("Project").to_string();
        let summary = answers
            .get("description")
            .or_else(|| answers.get("video_type"))
            .unwrap_or("Custom project")
            .to_string();
        let budget = answers.get("budget").unwrap_or("To be discussed").to_string();
        let timeline = answers.get("timeline").unwrap_or("Flexible").to_string();
        let service = if state.service_name.is_empty() {
            "Custom Service".to_string()
        } else {
            state.service_name.clone()
        };

        let requirements = answers
            .iter()
            .filter(|(key, value)| !HEADER_KEYS.contains(key) && *value != SKIPPED)
            .map(|(key, value)| Requirement { label: format_label(key), value: value.to_string() })
            .collect();

        Self { project, client, service, summary, requirements, budget, timeline }
    }

    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let requirements = self
            .requirements
            .iter()
            .map(|requirement| format!("• {}: {}", requirement.label, requirement.value))
            .collect::<Vec<_>>()
            .join("\n");

        writeln!(f, "{PROPOSAL_OPEN}")?;
        writeln!(f, "PROJECT PROPOSAL")?;
        writeln!(f)?;
        writeln!(f, "Project: {}", self.project)?;
        writeln!(f, "For: {}", self.client)?;
        writeln!(f, "Service: {}", self.service)?;
        writeln!(f)?;
        writeln!(f, "Summary:")?;
        writeln!(f, "{}", self.summary)?;
        writeln!(f)?;
        writeln!(f, "Requirements Gathered:")?;
        writeln!(f, "{requirements}")?;
        writeln!(f)?;
        writeln!(f, "Budget: {}", self.budget)?;
        writeln!(f, "Timeline: {}", self.timeline)?;
        writeln!(f)?;
        writeln!(f, "Scope of Work:")?;
        writeln!(f, "{SCOPE_OF_WORK}")?;
        writeln!(f)?;
        writeln!(f, "Next Steps:")?;
        writeln!(f, "{NEXT_STEPS}")?;
        writeln!(f)?;
        writeln!(f, "To customize this proposal, please use the Edit Proposal option.")?;
        write!(f, "{PROPOSAL_CLOSE}")
    }
}

pub fn synthesize(state: &ConversationState) -> String {
    Proposal::from_state(state).render()
}

/// `video_type` -> `Video type`.
pub fn format_label(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) => {
            first.to_uppercase().collect::<String>() + &chars.as_str().replace('_', " ")
        }
        None => String::new(),
    }
}

/// Body between the proposal delimiters, for consumers that receive the
/// proposal embedded in a longer message.
pub fn extract_proposal_block(text: &str) -> Option<&str> {
    let start = text.find(PROPOSAL_OPEN)? + PROPOSAL_OPEN.len();
    let end = text[start..].find(PROPOSAL_CLOSE)? + start;
    Some(text[start..end].trim_matches('\n'))
}
