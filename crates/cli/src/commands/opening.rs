use intake_core::conversation::opening_message;

use crate::commands::CommandResult;

pub fn run(service: &str) -> CommandResult {
    CommandResult::success("opening", opening_message(service))
}
