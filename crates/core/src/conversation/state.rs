use std::sync::Arc;

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::catalog::{Catalog, QuestionDefinition};
use crate::conversation::greeting::GreetingMatcher;
use crate::conversation::turn::{Role, Turn};

/// Recorded for a question the user deliberately passed on.
pub const SKIPPED: &str = "[skipped]";

/// Answers keyed by question key, in the order they were first recorded.
/// Re-recording a key keeps its original position.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Answers {
    entries: Vec<(String, String)>,
}

impl Answers {
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.iter().find(|(existing, _)| existing == key).map(|(_, value)| value.as_str())
    }

    pub fn get_ignore_case(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Present and not the skip sentinel.
    pub fn is_answered(&self, key: &str) -> bool {
        self.get(key).is_some_and(|value| value != SKIPPED)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for Answers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut answers = Self::default();
        for (key, value) in iter {
            answers.insert(key, value);
        }
        answers
    }
}

impl Serialize for Answers {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Where a conversation stands. Always derived from a transcript, never stored.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationState {
    pub collected_answers: Answers,
    pub current_question_index: usize,
    pub catalog: Arc<Catalog>,
    pub service_name: String,
    pub is_complete: bool,
}

impl ConversationState {
    pub fn new(service_name: impl Into<String>, catalog: Arc<Catalog>) -> Self {
        let is_complete = catalog.is_empty();
        Self {
            collected_answers: Answers::default(),
            current_question_index: 0,
            catalog,
            service_name: service_name.into(),
            is_complete,
        }
    }

    pub fn current_question(&self) -> Option<&QuestionDefinition> {
        self.catalog.question(self.current_question_index)
    }

    pub fn remaining_questions(&self) -> usize {
        self.catalog.len().saturating_sub(self.current_question_index)
    }
}

/// Replays every adjacent (assistant, user) pair of `history`.
///
/// Empty replies and greetings are not counted. Each counted reply is recorded
/// under the question at the position equal to the number of replies counted
/// before it; replies beyond the end of the catalog advance the index but are
/// not recorded anywhere.
pub fn reconstruct(
    history: &[Turn],
    service_name: &str,
    catalog: Arc<Catalog>,
    greetings: &GreetingMatcher,
) -> ConversationState {
    let mut state = ConversationState::new(service_name, catalog);
    let mut counted = 0usize;

    for pair in history.windows(2) {
        let [prompt, reply] = pair else {
            continue;
        };
        if prompt.role != Role::Assistant || reply.role != Role::User {
            continue;
        }

        let answer = reply.content.trim();
        if answer.is_empty() || greetings.is_greeting(answer) {
            continue;
        }

        if let Some(question) = state.catalog.question(counted) {
            state.collected_answers.insert(question.key.clone(), answer);
        }
        counted += 1;
    }

    state.current_question_index = counted;
    state.is_complete = counted >= state.catalog.len();
    state
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// A greeting: same question stays current.
    Held,
    Recorded { key: String },
    Skipped { key: String },
    /// Index moved on without writing an answer (empty message, or past the
    /// end of the catalog).
    Passed,
}

impl TurnOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Held => "held",
            Self::Recorded { .. } => "recorded",
            Self::Skipped { .. } => "skipped",
            Self::Passed => "passed",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnResult {
    pub state: ConversationState,
    pub outcome: TurnOutcome,
}

/// Applies one raw user message to `state`.
pub fn process_turn(
    state: &ConversationState,
    message: &str,
    greetings: &GreetingMatcher,
) -> TurnResult {
    let mut next = state.clone();

    if greetings.is_greeting(message) {
        next.is_complete = false;
        return TurnResult { state: next, outcome: TurnOutcome::Held };
    }

    let trimmed = message.trim();
    let mut outcome = TurnOutcome::Passed;
    if let Some(question) = state.current_question() {
        if !trimmed.is_empty() {
            let lowered = message.to_lowercase();
            let key = question.key.clone();
            if lowered.contains("skip") || lowered == "done" {
                next.collected_answers.insert(key.clone(), SKIPPED);
                outcome = TurnOutcome::Skipped { key };
            } else {
                next.collected_answers.insert(key.clone(), trimmed);
                outcome = TurnOutcome::Recorded { key };
            }
        }
    }

    next.current_question_index = state.current_question_index.saturating_add(1);
    next.is_complete = next.current_question_index >= next.catalog.len();
    TurnResult { state: next, outcome }
}

pub fn advance(
    state: &ConversationState,
    message: &str,
    greetings: &GreetingMatcher,
) -> ConversationState {
    process_turn(state, message, greetings).state
}
