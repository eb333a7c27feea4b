//! quip-preview - Preview quotes without posting them

use clap::Parser;
use libquipcast::error::GenerationError;
use libquipcast::filter::is_duplicate;
use libquipcast::generator::create_generator;
use libquipcast::logging::{LogFormat, LoggingConfig};
use libquipcast::{Config, FallbackQuotes, HistoryStore, JsonFileHistoryStore, Result};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "quip-preview")]
#[command(version, about = "Preview generated and fallback quotes without posting")]
#[command(long_about = r#"Generate quotes with the configured model and print them with their
character counts. Nothing is posted and history is not modified.

EXAMPLES:
    # Generate one quote
    quip-preview

    # Generate five quotes as JSON
    quip-preview --count 5 --format json

    # List the built-in fallback quotes
    quip-preview --fallback

    # Show recently posted quotes
    quip-preview --history

EXIT CODES:
    0 - Success
    1 - Generation failed
    2 - Configuration error (including OPENAI_API_KEY not set)
"#)]
struct Cli {
    /// Number of quotes to generate
    #[arg(short = 'n', long, default_value = "1", value_name = "N")]
    #[arg(value_parser = clap::value_parser!(u32).range(1..=50))]
    count: u32,

    /// List the built-in fallback quotes instead of generating
    #[arg(long, conflicts_with = "history")]
    fallback: bool,

    /// Show the recently posted quotes instead of generating
    #[arg(long)]
    history: bool,

    /// Output format
    #[arg(short, long, default_value = "text", value_name = "FORMAT")]
    #[arg(value_parser = ["text", "json"])]
    format: String,

    /// Config file (default: $QUIPCAST_CONFIG or ~/.config/quipcast/config.toml)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// One quote as printed
#[derive(Debug, Serialize)]
struct PreviewEntry {
    text: String,
    chars: usize,
    within_limit: bool,
    /// Only reported for generated quotes
    #[serde(skip_serializing_if = "Option::is_none")]
    recently_posted: Option<bool>,
}

impl PreviewEntry {
    fn new(text: &str, limit: usize) -> Self {
        let chars = text.chars().count();
        Self {
            text: text.to_string(),
            chars,
            within_limit: chars <= limit,
            recently_posted: None,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "warn" };
    let logging = LoggingConfig::new(LogFormat::Text, level.to_string(), cli.verbose);
    if let Err(e) = logging.init() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_with(cli.config.as_deref())?;
    let limit = config.generator.max_chars;

    let entries = if cli.fallback {
        FallbackQuotes::builtin()
            .quotes()
            .iter()
            .map(|q| PreviewEntry::new(q.as_str(), limit))
            .collect()
    } else if cli.history {
        history_store(&config)
            .load()
            .iter()
            .map(|text| PreviewEntry::new(text, limit))
            .collect()
    } else {
        generate(&config, cli.count).await?
    };

    print_entries(&entries, &cli.format, limit)
}

fn history_store(config: &Config) -> JsonFileHistoryStore {
    JsonFileHistoryStore::new(config.history.expand_path(), config.history.capacity)
}

async fn generate(config: &Config, count: u32) -> Result<Vec<PreviewEntry>> {
    if config.generator.api_key.is_none() {
        return Err(GenerationError::NotConfigured.into());
    }

    let generator = create_generator(&config.generator)?;
    let history = history_store(config).load();
    let limit = config.generator.max_chars;

    let mut entries = Vec::with_capacity(count as usize);
    for i in 1..=count {
        tracing::debug!("Generating quote {}/{}", i, count);
        let quote = generator.generate().await?;

        let mut entry = PreviewEntry::new(quote.as_str(), limit);
        entry.recently_posted = Some(is_duplicate(quote.as_str(), &history));
        entries.push(entry);
    }

    Ok(entries)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

fn print_entries(entries: &[PreviewEntry], format: &str, limit: usize) -> Result<()> {
    if format == "json" {
        println!("{}", to_json(entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No quotes found.");
        return Ok(());
    }

    for (i, entry) in entries.iter().enumerate() {
        println!("[{}] {}", i + 1, entry.text);

        let status = if entry.within_limit {
            format!("within the {} character limit", limit)
        } else {
            format!("exceeds the {} character limit", limit)
        };
        let recent = match entry.recently_posted {
            Some(true) => ", posted recently",
            _ => "",
        };
        println!("    {} characters ({}{})", entry.chars, status, recent);
    }

    Ok(())
}
