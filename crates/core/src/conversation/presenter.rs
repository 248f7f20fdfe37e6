use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::catalog::QuestionDefinition;
use crate::conversation::state::{Answers, ConversationState};

/// Picks which phrasing variant of a question to show.
pub trait PhrasingSelector: Send + Sync {
    /// Returns an index below `variant_count`. Never called with zero.
    fn select(&self, variant_count: usize) -> usize;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RandomPhrasing;

impl PhrasingSelector for RandomPhrasing {
    fn select(&self, variant_count: usize) -> usize {
        rand::thread_rng().gen_range(0..variant_count)
    }
}

/// Always the same variant, wrapped into range.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedPhrasing(pub usize);

impl PhrasingSelector for FixedPhrasing {
    fn select(&self, variant_count: usize) -> usize {
        self.0 % variant_count
    }
}

/// Reproducible sequence of picks from a seed.
#[derive(Debug)]
pub struct SeededPhrasing {
    rng: Mutex<StdRng>,
}

impl SeededPhrasing {
    pub fn new(seed: u64) -> Self {
        Self { rng: Mutex::new(StdRng::seed_from_u64(seed)) }
    }
}

impl PhrasingSelector for SeededPhrasing {
    fn select(&self, variant_count: usize) -> usize {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..variant_count),
            Err(poisoned) => poisoned.into_inner().gen_range(0..variant_count),
        }
    }
}

/// Selector chosen from configuration.
#[derive(Debug)]
pub enum PhrasingStrategy {
    Random(RandomPhrasing),
    Seeded(SeededPhrasing),
}

impl PhrasingStrategy {
    pub fn from_seed(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::Seeded(SeededPhrasing::new(seed)),
            None => Self::Random(RandomPhrasing),
        }
    }
}

impl PhrasingSelector for PhrasingStrategy {
    fn select(&self, variant_count: usize) -> usize {
        match self {
            Self::Random(selector) => selector.select(variant_count),
            Self::Seeded(selector) => selector.select(variant_count),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Suggestions,
    MultiSelect,
}

impl SuggestionKind {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Suggestions => "SUGGESTIONS",
            Self::MultiSelect => "MULTI_SELECT",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "SUGGESTIONS" => Some(Self::Suggestions),
            "MULTI_SELECT" => Some(Self::MultiSelect),
            _ => None,
        }
    }
}

/// The `[SUGGESTIONS: a | b]` / `[MULTI_SELECT: a | b]` line appended to a
/// prompt for the presentation layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SuggestionTrailer {
    pub kind: SuggestionKind,
    pub chips: Vec<String>,
}

impl SuggestionTrailer {
    pub fn for_question(question: &QuestionDefinition) -> Option<Self> {
        let chips = question.suggestion_chips()?;
        let kind =
            if question.multi_select { SuggestionKind::MultiSelect } else { SuggestionKind::Suggestions };
        Some(Self { kind, chips: chips.to_vec() })
    }

    pub fn render(&self) -> String {
        format!("[{}: {}]", self.kind.tag(), self.chips.join(" | "))
    }
}

/// Splits a rendered prompt into its display text and trailer, if it has one.
pub fn split_suggestion_trailer(text: &str) -> (&str, Option<SuggestionTrailer>) {
    let Some((body, last_line)) = text.rsplit_once('\n') else {
        return (text, None);
    };
    let Some(inner) = last_line.strip_prefix('[').and_then(|line| line.strip_suffix(']')) else {
        return (text, None);
    };
    let Some((tag, chips)) = inner.split_once(": ") else {
        return (text, None);
    };
    let Some(kind) = SuggestionKind::from_tag(tag) else {
        return (text, None);
    };

    let chips = chips
        .split(" | ")
        .map(str::trim)
        .filter(|chip| !chip.is_empty())
        .map(str::to_string)
        .collect();
    (body, Some(SuggestionTrailer { kind, chips }))
}

/// Replaces `{key}` placeholders (key matched case-insensitively) with
/// collected answers. Unknown placeholders stay literal.
pub fn substitute_placeholders(template: &str, answers: &Answers) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            output.push_str(&rest[open..]);
            return output;
        };

        match answers.get_ignore_case(&after[..close]) {
            Some(value) => {
                output.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                output.push('{');
                rest = after;
            }
        }
    }

    output.push_str(rest);
    output
}

/// Text of the next question, or `None` once the conversation is complete.
pub fn present<S>(state: &ConversationState, selector: &S) -> Option<String>
where
    S: PhrasingSelector + ?Sized,
{
    if state.is_complete {
        return None;
    }

    let question = state.current_question()?;
    let variant_count = question.phrasings.len();
    if variant_count == 0 {
        return None;
    }
    let template = &question.phrasings[selector.select(variant_count) % variant_count];

    let mut text = substitute_placeholders(template, &state.collected_answers);
    if let Some(trailer) = SuggestionTrailer::for_question(question) {
        text.push('\n');
        text.push_str(&trailer.render());
    }
    Some(text)
}
