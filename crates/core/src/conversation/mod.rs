pub mod engine;
pub mod gate;
pub mod greeting;
pub mod opening;
pub mod presenter;
pub mod state;
pub mod turn;

pub use engine::{ConversationEngine, EngineReply};
pub use gate::{assess_readiness, is_ready_for_proposal, Readiness};
pub use greeting::{GreetingMatcher, DEFAULT_GREETINGS};
pub use opening::opening_message;
pub use presenter::{
    present, split_suggestion_trailer, FixedPhrasing, PhrasingSelector, PhrasingStrategy,
    RandomPhrasing, SeededPhrasing, SuggestionKind, SuggestionTrailer,
};
pub use state::{advance, process_turn, reconstruct, Answers, ConversationState, TurnOutcome, TurnResult, SKIPPED};
pub use turn::{Role, Turn};
