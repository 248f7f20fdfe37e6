use std::sync::Arc;

use tracing::{debug, info};

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::catalog::{Catalog, CatalogRegistry};
use crate::config::AppConfig;
use crate::conversation::gate::is_ready_for_proposal;
use crate::conversation::greeting::GreetingMatcher;
use crate::conversation::opening::opening_message;
use crate::conversation::presenter::{present, PhrasingSelector, PhrasingStrategy, RandomPhrasing};
use crate::conversation::state::{self, ConversationState, TurnOutcome, TurnResult};
use crate::conversation::turn::Turn;
use crate::errors::ApplicationError;
use crate::proposal::synthesize;

/// What to send back to the user after a turn.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineReply {
    Ask { prompt: String, state: ConversationState, outcome: TurnOutcome },
    Propose { proposal: String, state: ConversationState, outcome: TurnOutcome },
}

impl EngineReply {
    pub fn state(&self) -> &ConversationState {
        match self {
            Self::Ask { state, .. } | Self::Propose { state, .. } => state,
        }
    }

    pub fn outcome(&self) -> &TurnOutcome {
        match self {
            Self::Ask { outcome, .. } | Self::Propose { outcome, .. } => outcome,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Self::Ask { prompt, .. } => prompt,
            Self::Propose { proposal, .. } => proposal,
        }
    }

    pub fn is_proposal(&self) -> bool {
        matches!(self, Self::Propose { .. })
    }
}

/// Drives a guided intake conversation. Holds no per-conversation state: every
/// call derives state from the transcript it is given.
pub struct ConversationEngine<S = RandomPhrasing> {
    registry: CatalogRegistry,
    greetings: GreetingMatcher,
    selector: S,
}

impl ConversationEngine<RandomPhrasing> {
    pub fn new(registry: CatalogRegistry) -> Self {
        Self::with_selector(registry, GreetingMatcher::default(), RandomPhrasing)
    }
}

impl ConversationEngine<PhrasingStrategy> {
    /// Loads catalogs from `catalog.path` (built-ins otherwise) and applies
    /// the configured greetings and phrasing seed.
    pub fn from_config(config: &AppConfig) -> Result<Self, ApplicationError> {
        let registry = match &config.catalog.path {
            Some(path) => CatalogRegistry::load(path)?,
            None => CatalogRegistry::builtin()?,
        };
        let greetings = GreetingMatcher::new(&config.conversation.greetings);
        let selector = PhrasingStrategy::from_seed(config.conversation.phrasing_seed);

        Ok(Self::with_selector(registry, greetings, selector))
    }
}

impl<S> ConversationEngine<S>
where
    S: PhrasingSelector,
{
    pub fn with_selector(registry: CatalogRegistry, greetings: GreetingMatcher, selector: S) -> Self {
        Self { registry, greetings, selector }
    }

    pub fn registry(&self) -> &CatalogRegistry {
        &self.registry
    }

    pub fn greetings(&self) -> &GreetingMatcher {
        &self.greetings
    }

    pub fn opening(&self, service: &str) -> &'static str {
        opening_message(service)
    }

    pub fn reconstruct(&self, history: &[Turn], service: &str) -> ConversationState {
        self.reconstruct_with(history, service, self.registry.resolve(service))
    }

    fn reconstruct_with(
        &self,
        history: &[Turn],
        service: &str,
        catalog: Arc<Catalog>,
    ) -> ConversationState {
        let state = state::reconstruct(history, service, catalog, &self.greetings);
        debug!(
            event_name = "conversation.state_reconstructed",
            service,
            turns = history.len(),
            current_question_index = state.current_question_index,
            is_complete = state.is_complete,
            "conversation state rebuilt from transcript"
        );
        state
    }

    pub fn advance(&self, state: &ConversationState, message: &str) -> TurnResult {
        let result = state::process_turn(state, message, &self.greetings);
        match &result.outcome {
            TurnOutcome::Held => debug!(
                event_name = "conversation.greeting_held",
                service = state.service_name.as_str(),
                current_question_index = state.current_question_index,
                "greeting received, re-asking current question"
            ),
            outcome => debug!(
                event_name = "conversation.turn_advanced",
                service = state.service_name.as_str(),
                outcome = outcome.label(),
                current_question_index = result.state.current_question_index,
                "turn applied"
            ),
        }
        result
    }

    pub fn present(&self, state: &ConversationState) -> Option<String> {
        present(state, &self.selector)
    }

    /// One full turn: rebuild state from `history` (the transcript before
    /// `message`), apply `message`, then either propose or ask the next question.
    pub fn respond(&self, history: &[Turn], service: &str, message: &str) -> EngineReply {
        self.respond_with(history, service, self.registry.resolve(service), message)
    }

    fn respond_with(
        &self,
        history: &[Turn],
        service: &str,
        catalog: Arc<Catalog>,
        message: &str,
    ) -> EngineReply {
        let state = self.reconstruct_with(history, service, catalog);
        let TurnResult { state, outcome } = self.advance(&state, message);

        if is_ready_for_proposal(&state) {
            return self.propose(state, outcome);
        }

        match self.present(&state) {
            Some(prompt) => EngineReply::Ask { prompt, state, outcome },
            None => self.propose(state, outcome),
        }
    }

    pub fn respond_with_audit<A>(
        &self,
        history: &[Turn],
        service: &str,
        message: &str,
        sink: &A,
        audit: &AuditContext,
    ) -> EngineReply
    where
        A: AuditSink,
    {
        let resolved = self.registry.resolve_name(service);
        if resolved.fell_back || resolved.via_alias {
            sink.emit(
                AuditEvent::new(audit, "catalog.resolved", AuditCategory::Catalog, AuditOutcome::Success)
                    .with_metadata("service", service)
                    .with_metadata("resolved", resolved.resolved_name.as_str())
                    .with_metadata("fell_back", resolved.fell_back.to_string()),
            );
        }

        let reply = self.respond_with(history, service, Arc::clone(&resolved.catalog), message);
        let state = reply.state();
        let outcome = match reply.outcome() {
            TurnOutcome::Held => AuditOutcome::Held,
            _ => AuditOutcome::Success,
        };
        sink.emit(
            AuditEvent::new(audit, "conversation.turn_processed", AuditCategory::Conversation, outcome)
                .with_metadata("service", service)
                .with_metadata("outcome", reply.outcome().label())
                .with_metadata("question_index", state.current_question_index.to_string()),
        );

        if reply.is_proposal() {
            sink.emit(
                AuditEvent::new(audit, "proposal.generated", AuditCategory::Proposal, AuditOutcome::Success)
                    .with_metadata("service", service)
                    .with_metadata("answers", state.collected_answers.len().to_string())
                    .with_metadata("catalog_complete", state.is_complete.to_string()),
            );
        }

        reply
    }

    fn propose(&self, state: ConversationState, outcome: TurnOutcome) -> EngineReply {
        info!(
            event_name = "conversation.proposal_ready",
            service = state.service_name.as_str(),
            answers = state.collected_answers.len(),
            catalog_complete = state.is_complete,
            "enough information gathered, generating proposal"
        );
        let proposal = synthesize(&state);
        EngineReply::Propose { proposal, state, outcome }
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tracing::field::{Field, Visit};
    use tracing::{Event, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    use crate::audit::{AuditContext, AuditOutcome, InMemoryAuditSink};
    use crate::catalog::CatalogRegistry;
    use crate::config::AppConfig;
    use crate::conversation::greeting::GreetingMatcher;
    use crate::conversation::presenter::FixedPhrasing;
    use crate::conversation::state::TurnOutcome;
    use crate::conversation::turn::Turn;

    use super::{ConversationEngine, EngineReply};

    /// Counts events carrying a given `event_name` field.
    struct EventCounter {
        event_name: &'static str,
        hits: Arc<AtomicUsize>,
    }

    struct EventName(Option<String>);

    impl Visit for EventName {
        fn record_str(&mut self, field: &Field, value: &str) {
            if field.name() == "event_name" {
                self.0 = Some(value.to_string());
            }
        }

        fn record_debug(&mut self, _field: &Field, _value: &dyn fmt::Debug) {}
    }

    impl<S: Subscriber> Layer<S> for EventCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            let mut name = EventName(None);
            event.record(&mut name);
            if name.0.as_deref() == Some(self.event_name) {
                self.hits.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn engine() -> ConversationEngine<FixedPhrasing> {
        ConversationEngine::with_selector(
            CatalogRegistry::builtin().expect("builtin catalogs parse"),
            GreetingMatcher::default(),
            FixedPhrasing(0),
        )
    }

    /// Plays `answers` through `respond`, feeding each reply back into the transcript.
    fn play(engine: &ConversationEngine<FixedPhrasing>, service: &str, answers: &[&str]) -> Vec<EngineReply> {
        let mut history = vec![Turn::assistant(engine.opening(service))];
        let first = engine.present(&engine.reconstruct(&[], service)).expect("first question");
        history.push(Turn::assistant(first));

        let mut replies = Vec::new();
        for answer in answers {
            let reply = engine.respond(&history, service, answer);
            history.push(Turn::user(*answer));
            history.push(Turn::assistant(reply.text()));
            replies.push(reply);
        }
        replies
    }

    #[test]
    fn default_flow_asks_each_question_then_proposes() {
        let engine = engine();
        let replies = play(&engine, "Quantum Widgets", &["Ana", "Acme", "A shop app", "₹50,000", "1 month"]);

        assert!(replies[0].text().starts_with("Nice to meet you, Ana!"));
        assert!(!replies[2].is_proposal());
        let last = replies.last().expect("final reply");
        assert!(last.is_proposal());
        assert!(last.text().contains("Project: Acme"));
        assert!(last.state().is_complete);
    }

    #[test]
    fn greeting_mid_flow_re_asks_the_same_question() {
        let engine = engine();
        let replies = play(&engine, "default", &["Ana", "hello", "Acme"]);

        assert_eq!(*replies[1].outcome(), TurnOutcome::Held);
        assert_eq!(replies[1].text(), replies[0].text());
        assert_eq!(replies[2].state().collected_answers.get("company"), Some("Acme"));
    }

    #[test]
    fn essentials_trigger_an_early_proposal() {
        let engine = engine();
        let replies = play(
            &engine,
            "Video Services",
            &["Sam", "Corporate", "Brand Awareness", "Need full production", "30-60 seconds", "Cinematic", "YouTube", "₹60,000 - ₹1,25,000", "Flexible"],
        );

        let last = replies.last().expect("final reply");
        assert!(last.is_proposal());
        assert!(!last.state().is_complete, "notes question is never asked");
        assert!(last.text().contains("Summary:\nCorporate"));
        assert!(replies[..replies.len() - 1].iter().all(|reply| !reply.is_proposal()));
    }

    #[test]
    fn alias_services_walk_the_website_catalog() {
        let engine = engine();
        let replies = play(&engine, "App Development", &["Ana", "Acme"]);

        assert!(replies[1].text().contains("what's the vision?"));
        assert_eq!(replies[1].state().service_name, "App Development");
        assert_eq!(replies[1].state().catalog.position("website_type"), Some(3));
    }

    #[test]
    fn audited_turns_emit_conversation_and_proposal_events() {
        let engine = engine();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(Some("conv-7".to_string()), "req-7", "intake-engine");
        let history = [
            Turn::assistant("Name?"),
            Turn::user("Ana"),
            Turn::assistant("Company?"),
            Turn::user("Acme"),
            Turn::assistant("Describe?"),
            Turn::user("A shop app"),
            Turn::assistant("Budget?"),
            Turn::user("₹50,000"),
            Turn::assistant("Timeline?"),
        ];

        let reply = engine.respond_with_audit(&history, "Quantum Widgets", "1 month", &sink, &audit);
        assert!(reply.is_proposal());

        let events = sink.events();
        let types = events.iter().map(|event| event.event_type.as_str()).collect::<Vec<_>>();
        assert_eq!(types, vec!["catalog.resolved", "conversation.turn_processed", "proposal.generated"]);
        assert!(events.iter().all(|event| event.correlation_id == "req-7"));
        assert_eq!(events[1].metadata.get("outcome").map(String::as_str), Some("recorded"));
    }

    #[test]
    fn audited_greeting_is_marked_held() {
        let engine = engine();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(None, "req-8", "intake-engine");

        let reply = engine.respond_with_audit(&[Turn::assistant("Name?")], "default", "hi", &sink, &audit);
        assert!(!reply.is_proposal());

        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].outcome, AuditOutcome::Held);
    }

    #[test]
    fn audited_turn_resolves_the_service_once() {
        let engine = engine();
        let sink = InMemoryAuditSink::default();
        let audit = AuditContext::new(None, "req-9", "intake-engine");
        let fallbacks = Arc::new(AtomicUsize::new(0));
        let subscriber = tracing_subscriber::registry().with(EventCounter {
            event_name: "catalog.fallback_default",
            hits: Arc::clone(&fallbacks),
        });

        tracing::subscriber::with_default(subscriber, || {
            engine.respond_with_audit(&[Turn::assistant("Name?")], "Quantum Widgets", "Ana", &sink, &audit);
        });

        assert_eq!(fallbacks.load(Ordering::SeqCst), 1);
        assert_eq!(sink.events()[0].event_type, "catalog.resolved");
    }

    #[test]
    fn random_engine_asks_a_catalog_phrasing() {
        let engine = ConversationEngine::new(CatalogRegistry::builtin().expect("builtin catalogs parse"));
        let reply = engine.respond(&[Turn::assistant("Name?")], "default", "Ana");

        let catalog = engine.registry().default_catalog();
        let phrasings = &catalog.question(1).expect("company question").phrasings;
        assert!(phrasings.iter().any(|phrasing| phrasing.replace("{name}", "Ana") == reply.text()));
        assert!(engine.greetings().is_greeting("hello"));
    }

    #[test]
    fn engine_builds_from_default_config() {
        let engine = ConversationEngine::from_config(&AppConfig::default()).expect("engine from config");

        assert!(engine.greetings().is_greeting("sup"));
        assert_eq!(engine.registry().default_catalog().len(), 5);
        assert!(engine.present(&engine.reconstruct(&[], "default")).is_some());
    }
}
