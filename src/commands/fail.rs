use async_trait::async_trait;

use super::{Command, CommandResult, SessionInfo, parse_switch};

pub struct FailCommand;

#[async_trait]
impl Command for FailCommand {
    fn name(&self) -> &str {
        "/fail"
    }

    fn usage(&self) -> &str {
        "on|off"
    }

    fn description(&self) -> &str {
        "make the mock backend answer 501"
    }

    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult {
        let Some(mock) = info.backend.mock() else {
            println!("/fail only applies to the mock backend (start with --mock)");
            return CommandResult::Handled;
        };

        match parse_switch(args) {
            Some(fail) => {
                mock.set_fail(fail);
                println!("fail {}", if fail { "on" } else { "off" });
            }
            None if args.is_empty() => {
                println!("fail: {}", if mock.fails() { "on" } else { "off" });
            }
            None => println!("usage: /fail on|off"),
        }
        CommandResult::Handled
    }
}
