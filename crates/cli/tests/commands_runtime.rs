use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use intake_cli::commands::replay::{self, ReplayArgs};
use intake_cli::commands::{catalog, config, doctor, opening};
use serde_json::Value;

const DEFAULT_TRANSCRIPT: &str = r#"[
    {"role": "assistant", "content": "Hey there! What should I call you?"},
    {"role": "user", "content": "Ana"},
    {"role": "assistant", "content": "What's your company called?"},
    {"role": "user", "content": "hello"},
    {"role": "assistant", "content": "What's your company called?"},
    {"role": "user", "content": "Acme"},
    {"role": "assistant", "content": "What are you building?"},
    {"role": "user", "content": "A shop app"},
    {"role": "assistant", "content": "Budget?"},
    {"role": "user", "content": "₹50,000"}
]"#;

#[test]
fn opening_returns_service_greeting() {
    with_env(&[], || {
        let result = opening::run("Audio Services");
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "opening");
        assert_eq!(payload["status"], "ok");
        assert_eq!(payload["message"], "Hey! 🎙️ Let's create some amazing audio together!");
    });
}

#[test]
fn catalog_lists_services_and_aliases() {
    with_env(&[], || {
        let result = catalog::run(None);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        let services = payload["data"].as_array().expect("service list");
        assert_eq!(services.len(), 13);

        let app = services
            .iter()
            .find(|entry| entry["service"] == "App Development")
            .expect("alias listed");
        assert_eq!(app["alias_of"], "Website Development");
        assert!(services.iter().any(|entry| entry["service"] == "default" && entry["questions"] == 5));
    });
}

#[test]
fn catalog_reports_fallback_for_unknown_service() {
    with_env(&[], || {
        let payload = parse_payload(&catalog::run(Some("Quantum Widgets")).output);

        assert_eq!(payload["data"]["resolved"], "default");
        assert_eq!(payload["data"]["fell_back"], true);
        assert_eq!(payload["data"]["questions"][0]["key"], "name");
    });
}

#[test]
fn replay_without_message_reports_next_question() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("temp dir");
        let transcript = write_file(dir.path(), "chat.json", DEFAULT_TRANSCRIPT);

        let result = replay::run(args("default", transcript, None));
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        let data = &payload["data"];
        assert_eq!(data["state"]["current_question_index"], 4);
        assert_eq!(data["state"]["current_question_key"], "timeline");
        assert_eq!(data["state"]["collected_answers"]["company"], "Acme");
        assert_eq!(data["ready_for_proposal"], false);
        assert_eq!(data["missing"], serde_json::json!(["timeline"]));
        assert_eq!(data["suggestions"]["kind"], "suggestions");
        assert_eq!(data["suggestions"]["chips"][1], "1 month");
        assert!(data.get("proposal").is_none());
    });
}

#[test]
fn replay_with_final_answer_produces_proposal() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("temp dir");
        let transcript = write_file(dir.path(), "chat.json", DEFAULT_TRANSCRIPT);

        let result = replay::run(args("default", transcript, Some("1 month")));
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        let data = &payload["data"];
        assert_eq!(data["outcome"], "recorded");
        assert_eq!(data["ready_for_proposal"], true);
        let proposal = data["proposal"].as_str().expect("proposal text");
        assert!(proposal.starts_with("[PROPOSAL_DATA]"));
        assert!(proposal.contains("Budget: ₹50,000"));
        assert!(proposal.contains("Timeline: 1 month"));

        let audit_types = data["audit"]
            .as_array()
            .expect("audit events")
            .iter()
            .map(|event| event["event_type"].as_str().unwrap_or_default().to_string())
            .collect::<Vec<_>>();
        assert_eq!(audit_types, vec!["conversation.turn_processed", "proposal.generated"]);
    });
}

#[test]
fn replay_greeting_holds_the_question() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("temp dir");
        let transcript = write_file(dir.path(), "chat.json", DEFAULT_TRANSCRIPT);

        let payload =
            parse_payload(&replay::run(args("default", transcript, Some("hey"))).output);

        assert_eq!(payload["data"]["outcome"], "held");
        assert_eq!(payload["data"]["state"]["current_question_key"], "timeline");
        assert!(payload["data"]["next_prompt"].is_string());
    });
}

#[test]
fn replay_rejects_malformed_transcript() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("temp dir");
        let transcript = write_file(dir.path(), "chat.json", r#"{"role": "user"}"#);

        let result = replay::run(args("default", transcript, None));
        assert_eq!(result.exit_code, 3);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "invalid_transcript");
    });
}

#[test]
fn replay_reports_missing_transcript_as_input_failure() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("temp dir");

        let result = replay::run(args("default", dir.path().join("absent.json"), None));
        assert_eq!(result.exit_code, 3);
        assert!(parse_payload(&result.output)["message"]
            .as_str()
            .unwrap_or_default()
            .contains("could not read transcript"));
    });
}

#[test]
fn replay_uses_configured_catalog_file() {
    let dir = tempfile::tempdir().expect("temp dir");
    let catalog_path = write_file(
        dir.path(),
        "catalogs.toml",
        r#"
[[catalogs]]
service = "default"

[[catalogs.questions]]
key = "name"
phrasings = ["Who is this?"]

[[catalogs.questions]]
key = "budget"
phrasings = ["How much, {name}?"]
"#,
    );
    let transcript = write_file(
        dir.path(),
        "chat.json",
        r#"[{"role":"assistant","content":"Who is this?"},{"role":"user","content":"Ana"}]"#,
    );
    let catalog_env = catalog_path.display().to_string();

    with_env(&[("INTAKE_CATALOG_PATH", catalog_env.as_str())], || {
        let payload = parse_payload(&replay::run(args("Anything", transcript.clone(), None)).output);

        assert_eq!(payload["data"]["state"]["total_questions"], 2);
        assert_eq!(payload["data"]["next_prompt"], "How much, Ana?");
    });
}

#[test]
fn replay_reports_catalog_failure() {
    let dir = tempfile::tempdir().expect("temp dir");
    let catalog_path = write_file(dir.path(), "catalogs.toml", "[[aliases]]\nservice = \"x\"\ntarget = \"y\"\n");
    let transcript = write_file(dir.path(), "chat.json", "[]");
    let catalog_env = catalog_path.display().to_string();

    with_env(&[("INTAKE_CATALOG_PATH", catalog_env.as_str())], || {
        let result = replay::run(args("default", transcript.clone(), None));
        assert_eq!(result.exit_code, 4);
        assert_eq!(parse_payload(&result.output)["error_class"], "catalog_load");
    });
}

#[test]
fn replay_reports_config_failure() {
    with_env(&[("INTAKE_LOGGING_LEVEL", "chatty")], || {
        let dir = tempfile::tempdir().expect("temp dir");
        let transcript = write_file(dir.path(), "chat.json", "[]");

        let result = replay::run(args("default", transcript, None));
        assert_eq!(result.exit_code, 2);
        assert_eq!(parse_payload(&result.output)["error_class"], "config_validation");
    });
}

#[test]
fn doctor_passes_with_builtin_catalogs() {
    with_env(&[], || {
        let result = doctor::run(true);
        assert_eq!(result.exit_code, 0);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["overall_status"], "pass");
        assert_eq!(payload["checks"][1]["name"], "catalog_load");
    });
}

#[test]
fn doctor_fails_on_invalid_greetings() {
    with_env(&[("INTAKE_CONVERSATION_GREETINGS", " , ")], || {
        let result = doctor::run(false);
        assert_eq!(result.exit_code, 2);
        assert!(result.output.contains("- [fail] config_validation"));
        assert!(result.output.contains("- [skip] catalog_load"));
    });
}

#[test]
fn config_attributes_env_sources() {
    with_env(&[("INTAKE_LOG_LEVEL", "debug"), ("INTAKE_CONVERSATION_PHRASING_SEED", "9")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 0);
        let output = result.output;

        assert!(output.contains("- logging.level = debug (source: env (INTAKE_LOG_LEVEL))"));
        assert!(output.contains("- conversation.phrasing_seed = 9 (source: env (INTAKE_CONVERSATION_PHRASING_SEED))"));
        assert!(output.contains("- catalog.path = <builtin> (source: default)"));
    });
}

#[test]
fn config_reports_validation_failure_with_config_exit_code() {
    with_env(&[("INTAKE_LOGGING_LEVEL", "chatty")], || {
        let result = config::run();
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
        assert!(payload["message"].as_str().unwrap_or_default().contains("logging.level"));
    });
}

fn args(service: &str, transcript: PathBuf, message: Option<&str>) -> ReplayArgs {
    ReplayArgs {
        service: service.to_string(),
        transcript,
        message: message.map(str::to_string),
        seed: Some(1),
    }
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK.get_or_init(|| Mutex::new(())).lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "INTAKE_CATALOG_PATH",
        "INTAKE_CONVERSATION_GREETINGS",
        "INTAKE_CONVERSATION_PHRASING_SEED",
        "INTAKE_LOGGING_LEVEL",
        "INTAKE_LOGGING_FORMAT",
        "INTAKE_LOG_LEVEL",
        "INTAKE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
