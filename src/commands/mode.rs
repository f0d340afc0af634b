use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo, StateChange};
use crate::request::ErrorMode;

pub struct ModeCommand;

pub(crate) fn mode_label(mode: ErrorMode) -> &'static str {
    match mode {
        ErrorMode::Local => "local",
        ErrorMode::Propagate => "propagate",
    }
}

#[async_trait]
impl Command for ModeCommand {
    fn name(&self) -> &str {
        "/mode"
    }

    fn usage(&self) -> &str {
        "local|propagate"
    }

    fn description(&self) -> &str {
        "keep errors in the result or hand them to the boundary"
    }

    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult {
        let mode = match args.to_ascii_lowercase().as_str() {
            "" => {
                println!("errors: {}", mode_label(info.error_mode));
                return CommandResult::Handled;
            }
            "local" => ErrorMode::Local,
            "propagate" => ErrorMode::Propagate,
            _ => {
                println!("usage: /mode local|propagate");
                return CommandResult::Handled;
            }
        };

        if mode == info.error_mode {
            println!("already {}", mode_label(mode));
            return CommandResult::Handled;
        }
        CommandResult::StateChanged(StateChange::ErrorMode(mode))
    }
}
