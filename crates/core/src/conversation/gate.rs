use serde::Serialize;

use crate::conversation::state::ConversationState;

/// Any one of these counts as a project description.
pub const DESCRIPTION_KEYS: [&str; 3] = ["description", "video_type", "project_type"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Readiness {
    pub ready: bool,
    /// Essentials still outstanding. Empty when the catalog is exhausted.
    pub missing: Vec<&'static str>,
}

/// Ready once the catalog is exhausted, or earlier when a real name, some
/// description, a real budget and any timeline (skipped allowed) are known.
pub fn assess_readiness(state: &ConversationState) -> Readiness {
    if state.is_complete {
        return Readiness { ready: true, missing: Vec::new() };
    }

    let answers = &state.collected_answers;
    let mut missing = Vec::new();
    if !answers.is_answered("name") {
        missing.push("name");
    }
    if !DESCRIPTION_KEYS.iter().any(|key| answers.contains_key(key)) {
        missing.push("description");
    }
    if !answers.is_answered("budget") {
        missing.push("budget");
    }
    if !answers.contains_key("timeline") {
        missing.push("timeline");
    }

    Readiness { ready: missing.is_empty(), missing }
}

pub fn is_ready_for_proposal(state: &ConversationState) -> bool {
    assess_readiness(state).ready
}

#[cfg(test)]
mod tests {
    use crate::catalog::CatalogRegistry;
    use crate::conversation::state::{Answers, ConversationState};

    use super::{assess_readiness, is_ready_for_proposal};

    fn state_with(service: &str, answers: &[(&str, &str)]) -> ConversationState {
        let registry = CatalogRegistry::builtin().expect("builtin catalogs parse");
        let mut state = ConversationState::new(service, registry.resolve(service));
        state.collected_answers = answers.iter().copied().collect::<Answers>();
        state.current_question_index = answers.len();
        state.is_complete = answers.len() >= state.catalog.len();
        state
    }

    #[test]
    fn essentials_open_the_gate_before_the_catalog_ends() {
        let state = state_with(
            "Video Services",
            &[("name", "Sam"), ("video_type", "Corporate"), ("budget", "₹60,000"), ("timeline", "[skipped]")],
        );

        assert!(!state.is_complete);
        assert!(is_ready_for_proposal(&state));
    }

    #[test]
    fn skipped_name_or_budget_keeps_the_gate_closed() {
        let skipped_name = state_with(
            "Quantum Widgets",
            &[("name", "[skipped]"), ("description", "app"), ("budget", "₹1"), ("timeline", "soon")],
        );
        assert_eq!(assess_readiness(&skipped_name).missing, vec!["name"]);

        let mut skipped_budget = skipped_name.clone();
        skipped_budget.collected_answers.insert("name", "Ana");
        skipped_budget.collected_answers.insert("budget", "[skipped]");
        skipped_budget.is_complete = false;
        assert_eq!(assess_readiness(&skipped_budget).missing, vec!["budget"]);
    }

    #[test]
    fn fresh_conversation_reports_every_essential_missing() {
        let readiness = assess_readiness(&state_with("default", &[]));

        assert!(!readiness.ready);
        assert_eq!(readiness.missing, vec!["name", "description", "budget", "timeline"]);
    }

    #[test]
    fn exhausted_catalog_is_always_ready() {
        let state = state_with(
            "default",
            &[("name", "[skipped]"), ("company", "x"), ("description", "y"), ("budget", "[skipped]"), ("timeline", "z")],
        );

        assert!(state.is_complete);
        assert!(is_ready_for_proposal(&state));
    }
}
