use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use flockbot::cli::{Cli, Command, generate_completions, run_parse_command};
use flockbot::transport::ConsoleTransport;
use flockbot::{Bot, BotConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before clap reads env-backed flags.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.log_json);

    if !cli.should_run_bot() {
        return run_command(&cli);
    }

    let config = cli.bot_config(|key| std::env::var(key).ok())?;
    let bot = start(&config)?;
    tracing::info!(
        identity = %config.screen_name,
        timeout = ?config.request_timeout,
        "flockbot running, press Ctrl-C to stop"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    bot.shutdown().await;
    Ok(())
}

/// One-shot subcommands that exit without starting the bot.
fn run_command(cli: &Cli) -> anyhow::Result<()> {
    match &cli.command {
        Some(Command::Parse { text, by }) => println!("{}", run_parse_command(text, by)?),
        Some(Command::Completion { shell }) => {
            generate_completions(*shell, &mut std::io::stdout())
        }
        None | Some(Command::Run) => {}
    }
    Ok(())
}

/// Wire the console transport to a new bot and start streaming.
fn start(config: &BotConfig) -> flockbot::Result<Bot> {
    let transport =
        Arc::new(ConsoleTransport::stdio().with_history_limit(config.search_history));
    let bot = Bot::spawn(config, transport.clone(), transport);
    bot.router().start()?;
    Ok(bot)
}

/// Logs go to stderr; stdout carries the console transport's output.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flockbot=info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .init();
    }
}
