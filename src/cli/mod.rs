//! CLI command handling.
//!
//! Provides subcommands for:
//! - Running the bot over stdin/stdout (`run`, the default)
//! - Trying the request parser on a piece of text (`parse`)
//! - Shell completion generation (`completion`)

mod completion;
mod parse;

pub use completion::generate_completions;
pub use parse::run_parse_command;

use clap::{Parser, Subcommand};

use crate::config::{BotConfig, ENV_REQUEST_TIMEOUT_SECS, ENV_SCREEN_NAME};
use crate::error::ConfigError;

#[derive(Parser, Debug)]
#[command(name = "flockbot")]
#[command(about = "Curates a timeline by rebroadcasting statuses its followers ask for")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// The bot's own screen name (overrides the environment)
    #[arg(long, global = true, env = ENV_SCREEN_NAME)]
    pub screen_name: Option<String>,

    /// Seconds to wait for a request/response exchange
    #[arg(long, global = true, env = ENV_REQUEST_TIMEOUT_SECS)]
    pub request_timeout_secs: Option<u64>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the bot (default if no subcommand given)
    Run,

    /// Parse TEXT as a filter request and print the result
    Parse {
        /// Text of the status, as a follower would write it
        text: String,

        /// Screen name recorded as the requester
        #[arg(long, default_value = "you")]
        by: String,
    },

    /// Generate shell completion scripts
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

impl Cli {
    /// Check if we should run the bot (default behavior or explicit `run` command).
    pub fn should_run_bot(&self) -> bool {
        matches!(self.command, None | Some(Command::Run))
    }

    /// Build the bot configuration, letting flags win over `env`.
    pub fn bot_config<F>(&self, env: F) -> Result<BotConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        BotConfig::from_lookup(|key| match key {
            ENV_SCREEN_NAME => self.screen_name.clone().or_else(|| env(key)),
            ENV_REQUEST_TIMEOUT_SECS => self
                .request_timeout_secs
                .map(|secs| secs.to_string())
                .or_else(|| env(key)),
            _ => env(key),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_no_args() {
        let cli = Cli::try_parse_from(["flockbot"]).unwrap();
        assert!(cli.command.is_none());
        assert!(!cli.log_json);
        assert!(cli.should_run_bot());
    }

    #[test]
    fn parse_run_command() {
        let cli = Cli::try_parse_from(["flockbot", "run", "--log-json"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Run)));
        assert!(cli.log_json);
        assert!(cli.should_run_bot());
    }

    #[test]
    fn parse_screen_name_flag() {
        let cli = Cli::try_parse_from(["flockbot", "--screen-name", "curator"]).unwrap();
        assert_eq!(cli.screen_name.as_deref(), Some("curator"));
    }

    #[test]
    fn parse_timeout_flag() {
        let cli = Cli::try_parse_from(["flockbot", "run", "--request-timeout-secs", "3"]).unwrap();
        assert_eq!(cli.request_timeout_secs, Some(3));
    }

    #[test]
    fn parse_command_with_requester() {
        let cli = Cli::try_parse_from([
            "flockbot",
            "parse",
            "about rust like bob",
            "--by",
            "alice",
        ])
        .unwrap();
        assert!(!cli.should_run_bot());
        match cli.command {
            Some(Command::Parse { text, by }) => {
                assert_eq!(text, "about rust like bob");
                assert_eq!(by, "alice");
            }
            other => panic!("expected parse command, got {:?}", other),
        }
    }

    #[test]
    fn command_completion_variant() {
        let cli = Cli::try_parse_from(["flockbot", "completion", "bash"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Completion {
                shell: clap_complete::Shell::Bash
            })
        ));
    }

    #[test]
    fn flags_override_environment() {
        let cli = Cli::try_parse_from([
            "flockbot",
            "--screen-name",
            "curator",
            "--request-timeout-secs",
            "4",
        ])
        .unwrap();
        let config = cli
            .bot_config(|key| match key {
                "FLOCKBOT_SCREEN_NAME" => Some("from_env".to_string()),
                "FLOCKBOT_SEARCH_HISTORY" => Some("50".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.screen_name, "curator");
        assert_eq!(config.request_timeout, std::time::Duration::from_secs(4));
        assert_eq!(config.search_history, 50);
    }

    #[test]
    fn completion_rejects_unknown_shell() {
        assert!(Cli::try_parse_from(["flockbot", "completion", "tcsh"]).is_err());
    }
}
