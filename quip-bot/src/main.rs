//! quip-bot - Scheduled quote bot daemon
//!
//! Generates a quote on every tick and publishes it to every platform with
//! credentials, until SIGINT or SIGTERM.

use clap::Parser;
use libquipcast::logging::{LogFormat, LoggingConfig};
use libquipcast::{Config, QuoteBot, Result, Scheduler};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "quip-bot")]
#[command(version)]
#[command(about = "Scheduled quote bot for Bluesky and Twitter")]
#[command(long_about = "\
quip-bot - Scheduled quote bot for Bluesky and Twitter

DESCRIPTION:
    quip-bot is a long-running daemon. Every interval it asks a
    chat-completion model for a short in-character quote, skips quotes
    posted recently, falls back to built-in quotes when generation fails,
    and posts the result to every configured platform.

    The first quote is posted immediately on startup.

USAGE:
    # Run in foreground (logs to stderr)
    quip-bot

    # Post every three hours
    quip-bot --interval 3h

    # Post a single quote and exit
    quip-bot --once

    # JSON logs, also written to a file
    quip-bot --log-format json --log-file ~/.local/share/quipcast/bot.log

SIGNALS:
    SIGTERM, SIGINT - Graceful shutdown (finishes the current tick)

ENVIRONMENT:
    OPENAI_API_KEY                 Quote generation (fallback quotes only if unset)
    BLUESKY_HANDLE, BLUESKY_APP_PASSWORD
    TWITTER_API_KEY, TWITTER_API_SECRET,
    TWITTER_ACCESS_TOKEN, TWITTER_ACCESS_TOKEN_SECRET
    QUIPCAST_POST_INTERVAL         Time between posts (default: 1h)
    QUIPCAST_HISTORY_PATH          Recent-posts file
    QUIPCAST_CONFIG                Config file path

    A .env file in the working directory is loaded first.

CONFIGURATION:
    Configuration file: ~/.config/quipcast/config.toml
    History file: ~/.local/share/quipcast/recent_posts.json

EXIT CODES:
    0 - Clean shutdown
    1 - Runtime error
    2 - Configuration error (including no platform configured)
")]
struct Cli {
    /// Config file (default: $QUIPCAST_CONFIG or ~/.config/quipcast/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Time between posts, e.g. "1h", "3h", "90m" (overrides config)
    #[arg(short, long, value_name = "DURATION")]
    interval: Option<String>,

    /// Post once and exit
    #[arg(long)]
    once: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format: text, json, or pretty (default: $QUIPCAST_LOG_FORMAT or text)
    #[arg(long, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    /// Also append logs to this file
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env(cli.verbose);
    if let Some(format) = cli.log_format {
        logging.format = format;
    }
    if cli.log_file.is_some() {
        logging.file = cli.log_file.clone();
    }
    if let Err(e) = logging.init() {
        eprintln!("Error: failed to open log file: {}", e);
        std::process::exit(2);
    }

    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load_with(cli.config.as_deref())?;
    if let Some(interval) = cli.interval {
        config.schedule.interval = interval;
    }
    let interval = config.schedule.interval()?;

    let mut bot = QuoteBot::from_config(&config).await?;
    let platforms = bot.publisher().platform_names().join(", ");
    info!("quip-bot starting (platforms: {})", platforms);

    let ready = bot.publisher_mut().authenticate_all().await;
    info!(
        "{}/{} platform(s) authenticated",
        ready,
        bot.publisher().len()
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    if let Err(e) = setup_signal_handlers(shutdown.clone()) {
        warn!("{:#}. Graceful shutdown is unavailable.", e);
    }

    let scheduler = Scheduler::new(interval).with_shutdown(shutdown);

    if cli.once {
        scheduler.run_once(&mut bot).await?;
        info!("quip-bot: posted once, exiting");
    } else {
        scheduler.run(&mut bot).await;
    }

    info!("quip-bot stopped");
    Ok(())
}

/// Set up signal handlers for graceful shutdown
#[cfg(unix)]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
    use anyhow::Context;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals =
        Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            info!(
                "Received {}, finishing current tick and stopping...",
                if sig == SIGINT { "SIGINT" } else { "SIGTERM" }
            );
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    Ok(())
}

#[cfg(not(unix))]
fn setup_signal_handlers(shutdown: Arc<AtomicBool>) -> anyhow::Result<()> {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl-C, finishing current tick and stopping...");
            shutdown.store(true, Ordering::Relaxed);
        }
    });

    Ok(())
}
