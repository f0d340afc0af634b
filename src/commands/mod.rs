//! REPL commands prefixed with `/`.
//!
//! Commands implement the [`Command`] trait and live in a [`CommandRegistry`],
//! which handles dispatch, aliases and the generated `/help` listing.
//! Anything that is not a command is a search term.

mod delay;
mod fail;
mod help;
mod mode;
mod quit;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Backend;
use crate::request::ErrorMode;

/// What commands can see of the running session.
pub struct SessionInfo<'a> {
    pub backend: &'a Backend,
    pub error_mode: ErrorMode,
}

/// A change the REPL must apply after a command runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    ErrorMode(ErrorMode),
}

pub enum CommandResult {
    /// Not a command: search for it.
    NotACommand,
    Handled,
    StateChanged(StateChange),
    Quit,
}

#[async_trait]
pub trait Command: Send + Sync {
    /// Primary name, e.g. `"/delay"`.
    fn name(&self) -> &str;

    fn aliases(&self) -> &[&str] {
        &[]
    }

    /// Argument synopsis for `/help`, e.g. `"<ms>"`.
    fn usage(&self) -> &str {
        ""
    }

    fn description(&self) -> &str;

    /// `args` is everything after the command word, trimmed.
    async fn execute(&self, args: &str, info: &SessionInfo<'_>) -> CommandResult;
}

pub struct CommandRegistry {
    commands: Vec<Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        let commands: Vec<Arc<dyn Command>> = vec![
            Arc::new(help::HelpCommand),
            Arc::new(delay::DelayCommand),
            Arc::new(fail::FailCommand),
            Arc::new(mode::ModeCommand),
            Arc::new(quit::QuitCommand),
        ];
        Self { commands }
    }

    pub async fn dispatch(&self, input: &str, info: &SessionInfo<'_>) -> CommandResult {
        let input = input.trim();
        let (word, args) = input
            .split_once(char::is_whitespace)
            .map_or((input, ""), |(w, a)| (w, a.trim()));

        for command in &self.commands {
            if word == command.name() || command.aliases().contains(&word) {
                // /help needs the registry itself
                if command.name() == "/help" {
                    print!("{}", self.help_text());
                    return CommandResult::Handled;
                }
                return command.execute(args, info).await;
            }
        }

        if word.starts_with('/') {
            println!("unknown command: {word}");
            println!("type /help for available commands");
            return CommandResult::Handled;
        }

        CommandResult::NotACommand
    }

    pub fn help_text(&self) -> String {
        let entries: Vec<(String, &str)> = self
            .commands
            .iter()
            .map(|c| (format_label(c.name(), c.usage(), c.aliases()), c.description()))
            .collect();

        let width = entries.iter().map(|(label, _)| label.len()).max().unwrap_or(10);

        let mut out = String::new();
        for (label, desc) in &entries {
            out.push_str(&format!("  {label:<width$}  {desc}\n"));
        }
        out
    }

    pub fn names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    pub fn all_triggers(&self) -> Vec<&str> {
        let mut triggers = Vec::new();
        for cmd in &self.commands {
            triggers.push(cmd.name());
            triggers.extend_from_slice(cmd.aliases());
        }
        triggers
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn format_label(name: &str, usage: &str, aliases: &[&str]) -> String {
    let mut label = name.to_string();
    if !usage.is_empty() {
        label.push(' ');
        label.push_str(usage);
    }
    if !aliases.is_empty() {
        label.push_str(&format!(" ({})", aliases.join(", ")));
    }
    label
}

/// Parse `on`/`off` style switches.
pub(crate) fn parse_switch(arg: &str) -> Option<bool> {
    match arg.to_ascii_lowercase().as_str() {
        "on" | "yes" | "true" | "1" => Some(true),
        "off" | "no" | "false" | "0" => Some(false),
        _ => None,
    }
}
