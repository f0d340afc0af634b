use async_trait::async_trait;
use std::time::Duration;

use super::{Command, CommandResult, SessionInfo};

pub struct DelayCommand;

#[async_trait]
impl Command for DelayCommand {
    fn name(&self) -> &str {
        "/delay"
    }

    fn usage(&self) -> &str {
        "<ms>"
    }

    fn description(&self) -> &str {
        "delay mock backend answers (0 turns it off)"
    }

    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult {
        let Some(mock) = info.backend.mock() else {
            println!("/delay only applies to the mock backend (start with --mock)");
            return CommandResult::Handled;
        };

        if args.is_empty() {
            println!("delay: {}ms", mock.delay().as_millis());
            return CommandResult::Handled;
        }

        match args.parse::<u64>() {
            Ok(ms) => {
                mock.set_delay(Duration::from_millis(ms));
                println!("delay set to {ms}ms");
            }
            Err(_) => println!("usage: /delay <ms>"),
        }
        CommandResult::Handled
    }
}
