/// Greeting tokens recognised when no list is configured.
pub const DEFAULT_GREETINGS: &[&str] =
    &["hi", "hello", "hey", "hii", "hiii", "yo", "sup", "what's up", "whats up"];

/// Whole-message greeting detection. A greeting never counts as an answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GreetingMatcher {
    tokens: Vec<String>,
}

impl Default for GreetingMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_GREETINGS.iter().copied())
    }
}

impl GreetingMatcher {
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = tokens
            .into_iter()
            .map(|token| token.as_ref().trim().to_lowercase())
            .filter(|token| !token.is_empty())
            .collect();
        Self { tokens }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_greeting(&self, text: &str) -> bool {
        let normalized = text.trim().to_lowercase();
        !normalized.is_empty() && self.tokens.iter().any(|token| *token == normalized)
    }
}
