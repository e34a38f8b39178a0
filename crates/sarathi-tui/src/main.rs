use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use sarathi_core::{Conversation, Endpoint, GuideClient, Settings, Source};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "sarathi")]
#[command(version, about = "Chat with a Bhagavad Gita guide, with a verse of the day")]
struct Cli {
    /// Settings file (defaults to <config dir>/sarathi/config.json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Chat endpoint URL; skips the endpoint document
    #[arg(long, env = "SARATHI_ENDPOINT")]
    endpoint: Option<String>,

    /// Path or URL of the endpoint document ({"API_URL": ...})
    #[arg(long)]
    env_source: Option<String>,

    /// Path or URL of the verses document
    #[arg(long)]
    verses: Option<String>,

    /// Request timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = match &cli.config {
        Some(path) => Settings::load_from(path)?,
        None => Settings::load()?,
    };
    if cli.env_source.is_some() {
        settings.env_source = cli.env_source.clone();
    }
    if cli.verses.is_some() {
        settings.verses_source = cli.verses.clone();
    }
    if cli.timeout.is_some() {
        settings.request_timeout_secs = cli.timeout;
    }

    match &cli.command {
        Some(Commands::Ask { question }) => {
            init_logging(LogTarget::Stderr)?;
            let guide = connect(&cli, &settings).await?;
            ask(&guide, question).await
        }
        None => {
            init_logging(LogTarget::File)?;
            let guide = connect(&cli, &settings).await?;
            run_tui(guide, &settings).await
        }
    }
}

/// Resolve the endpoint before anything can be submitted.
async fn connect(cli: &Cli, settings: &Settings) -> Result<GuideClient> {
    let endpoint = match &cli.endpoint {
        Some(url) => Endpoint::parse(url).with_context(|| format!("invalid endpoint: {}", url))?,
        None => {
            let http = reqwest::Client::builder()
                .timeout(settings.request_timeout())
                .build()?;
            Endpoint::resolve(&http, &Source::parse(settings.env_source())).await
        }
    };

    GuideClient::new(endpoint, settings.request_timeout())
}

async fn ask(guide: &GuideClient, question: &str) -> Result<()> {
    let mut conversation = Conversation::default();

    let Some(reply) = conversation.exchange(guide, question).await else {
        bail!("the question is empty");
    };

    if reply.fallback {
        eprintln!("(the guidance service is unavailable; answering from the built-in verses)");
    }
    println!("{}", reply.text);
    Ok(())
}

async fn run_tui(guide: GuideClient, settings: &Settings) -> Result<()> {
    let http = reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .build()?;

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new(settings.verse_refresh());

    let mut app = App::new(
        Conversation::default().with_greeting(),
        guide,
        http,
        Source::parse(settings.verses_source()),
        events.sender(),
    );
    app.reload_verses();
    app.probe_health();
    info!(endpoint = %app.guide.endpoint(), "Started");

    let result = run_loop(&mut terminal, &mut app, &mut events).await;
    tui::restore()?;
    result
}

async fn run_loop(terminal: &mut tui::Tui, app: &mut App, events: &mut EventHandler) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

enum LogTarget {
    Stderr,
    /// The TUI owns the terminal, so logs go to `<cache dir>/sarathi/sarathi.log`
    File,
}

fn init_logging(target: LogTarget) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sarathi_tui=info,sarathi_core=info".into());

    match target {
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
        LogTarget::File => {
            let log_dir = dirs::cache_dir()
                .ok_or_else(|| anyhow!("Could not determine cache directory"))?
                .join("sarathi");
            fs::create_dir_all(&log_dir)?;
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(log_dir.join("sarathi.log"))?;

            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
    }
    Ok(())
}
