use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use intake_core::audit::{AuditContext, AuditEvent, InMemoryAuditSink};
use intake_core::config::ConfigOverrides;
use intake_core::conversation::{
    assess_readiness, split_suggestion_trailer, Answers, ConversationEngine, ConversationState,
    EngineReply, PhrasingStrategy, SuggestionTrailer, Turn,
};
use intake_core::errors::ApplicationError;
use intake_core::proposal::synthesize;
use serde::Serialize;
use tracing::info;

use crate::commands::{load_engine, CommandResult, EXIT_INPUT};

#[derive(Debug, Clone)]
pub struct ReplayArgs {
    pub service: String,
    pub transcript: PathBuf,
    pub message: Option<String>,
    pub seed: Option<u64>,
}

#[derive(Debug, Serialize)]
struct StateReport<'a> {
    service: &'a str,
    collected_answers: &'a Answers,
    current_question_index: usize,
    total_questions: usize,
    current_question_key: Option<&'a str>,
    is_complete: bool,
}

impl<'a> StateReport<'a> {
    fn from_state(state: &'a ConversationState) -> Self {
        Self {
            service: &state.service_name,
            collected_answers: &state.collected_answers,
            current_question_index: state.current_question_index,
            total_questions: state.catalog.len(),
            current_question_key: state.current_question().map(|question| question.key.as_str()),
            is_complete: state.is_complete,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReplayReport<'a> {
    state: StateReport<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    outcome: Option<&'static str>,
    ready_for_proposal: bool,
    missing: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_prompt: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggestions: Option<SuggestionTrailer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    proposal: Option<&'a str>,
    audit: Vec<AuditEvent>,
}

pub fn run(args: ReplayArgs) -> CommandResult {
    let overrides = ConfigOverrides { phrasing_seed: args.seed, ..ConfigOverrides::default() };
    let (_, engine) = match load_engine("replay", overrides) {
        Ok(loaded) => loaded,
        Err(result) => return result,
    };

    let history = match load_transcript(&args.transcript) {
        Ok(history) => history,
        Err(error) => {
            let interface = ApplicationError::InvalidTranscript(format!("{error:#}"))
                .into_interface("cli-replay");
            return CommandResult::failure(
                "replay",
                "invalid_transcript",
                format!("{} ({error:#})", interface.user_message()),
                EXIT_INPUT,
            );
        }
    };

    match args.message {
        Some(message) => respond(&engine, &history, &args.service, &message),
        None => inspect(&engine, &history, &args.service),
    }
}

fn load_transcript(path: &Path) -> Result<Vec<Turn>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("could not read transcript `{}`", path.display()))?;
    let turns = Turn::parse_transcript(&raw)
        .with_context(|| format!("transcript `{}` is not a JSON array of turns", path.display()))?;
    Ok(turns)
}

/// Applies `message` on top of the transcript, as a live turn would.
fn respond(
    engine: &ConversationEngine<PhrasingStrategy>,
    history: &[Turn],
    service: &str,
    message: &str,
) -> CommandResult {
    let sink = InMemoryAuditSink::default();
    let audit = AuditContext::new(None, "cli-replay", "intake-cli");
    let reply = engine.respond_with_audit(history, service, message, &sink, &audit);

    let (next_prompt, suggestions, proposal) = match &reply {
        EngineReply::Ask { prompt, .. } => {
            let (body, trailer) = split_suggestion_trailer(prompt);
            (Some(body), trailer, None)
        }
        EngineReply::Propose { proposal, .. } => (None, None, Some(proposal.as_str())),
    };
    let report = ReplayReport {
        state: StateReport::from_state(reply.state()),
        outcome: Some(reply.outcome().label()),
        ready_for_proposal: reply.is_proposal(),
        missing: assess_readiness(reply.state()).missing,
        next_prompt,
        suggestions,
        proposal,
        audit: sink.events(),
    };

    info!(
        event_name = "cli.replay.responded",
        correlation_id = "cli-replay",
        service,
        outcome = reply.outcome().label(),
        proposal = reply.is_proposal(),
        "replayed transcript and applied message"
    );
    CommandResult::success_with_data("replay", message_for(&report), report)
}

/// Rebuilds state without applying a new message.
fn inspect(
    engine: &ConversationEngine<PhrasingStrategy>,
    history: &[Turn],
    service: &str,
) -> CommandResult {
    let state = engine.reconstruct(history, service);
    let readiness = assess_readiness(&state);
    let prompt = if readiness.ready { None } else { engine.present(&state) };
    let proposal = match prompt {
        Some(_) => None,
        None => Some(synthesize(&state)),
    };

    let (next_prompt, suggestions) = match prompt.as_deref() {
        Some(prompt) => {
            let (body, trailer) = split_suggestion_trailer(prompt);
            (Some(body), trailer)
        }
        None => (None, None),
    };
    let report = ReplayReport {
        state: StateReport::from_state(&state),
        outcome: None,
        ready_for_proposal: readiness.ready,
        missing: readiness.missing,
        next_prompt,
        suggestions,
        proposal: proposal.as_deref(),
        audit: Vec::new(),
    };

    info!(
        event_name = "cli.replay.inspected",
        correlation_id = "cli-replay",
        service,
        turns = history.len(),
        "replayed transcript"
    );
    CommandResult::success_with_data("replay", message_for(&report), report)
}

fn message_for(report: &ReplayReport<'_>) -> String {
    match report.state.current_question_key {
        _ if report.proposal.is_some() => "proposal ready".to_string(),
        Some(key) => format!("waiting on `{key}`"),
        None => "no further questions".to_string(),
    }
}
