pub mod catalog;
pub mod config;
pub mod doctor;
pub mod opening;
pub mod replay;

use intake_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use intake_core::conversation::{ConversationEngine, PhrasingStrategy};
use intake_core::errors::ApplicationError;
use serde::Serialize;
use serde_json::Value;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_INPUT: u8 = 3;
pub const EXIT_CATALOG: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, Value::Null)
    }

    pub fn success_with_data(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        let data = match serde_json::to_value(data) {
            Ok(Value::Null) => None,
            Ok(value) => Some(value),
            Err(error) => {
                return Self::failure(command, "serialization", error.to_string(), 1);
            }
        };
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    fn from_application_error(command: &str, error: ApplicationError) -> Self {
        match error {
            ApplicationError::Configuration(error) => {
                Self::failure(command, "config_validation", error.to_string(), EXIT_CONFIG)
            }
            ApplicationError::Catalog(error) => {
                Self::failure(command, "catalog_load", error.to_string(), EXIT_CATALOG)
            }
            ApplicationError::InvalidTranscript(message) => {
                Self::failure(command, "invalid_transcript", message, EXIT_INPUT)
            }
        }
    }
}

/// Loads configuration and the engine it describes, mapping failures to
/// command outcomes.
pub(crate) fn load_engine(
    command: &str,
    overrides: ConfigOverrides,
) -> Result<(AppConfig, ConversationEngine<PhrasingStrategy>), CommandResult> {
    let config = AppConfig::load(LoadOptions { overrides, ..LoadOptions::default() })
        .map_err(|error| CommandResult::from_application_error(command, error.into()))?;
    let engine = ConversationEngine::from_config(&config)
        .map_err(|error| CommandResult::from_application_error(command, error))?;
    Ok((config, engine))
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
