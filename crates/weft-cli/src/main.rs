//! Weft CLI
//!
//! Replays a file of window messages against an HTML page and prints every
//! reply the bridge posts, one JSON object per line.

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use weft_bridge::{Bridge, BridgeConfig, Envelope, Page, WindowId};
use weft_html::HtmlParser;

#[derive(Parser)]
#[command(name = "weft")]
#[command(about = "Drive page inputs through window messages")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Feed messages to a page and print the replies
    Replay(ReplayArgs),
}

#[derive(clap::Args)]
struct ReplayArgs {
    /// HTML page to load
    #[arg(long)]
    page: PathBuf,

    /// Messages, one JSON object per line
    #[arg(long)]
    messages: PathBuf,

    /// Bridge configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Window id the page runs in
    #[arg(long, default_value_t = 0)]
    window: u32,

    /// Script globals to expose, e.g. `jQuery`
    #[arg(long = "global")]
    globals: Vec<String>,

    /// Document URL
    #[arg(long, default_value = "about:blank")]
    url: String,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Replay(args) => replay(&args, &mut io::stdout().lock()),
    }
}

fn replay(args: &ReplayArgs, out: &mut impl Write) -> Result<()> {
    let config = match &args.config {
        Some(path) => BridgeConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => BridgeConfig::default(),
    };

    let html = fs::read_to_string(&args.page)
        .with_context(|| format!("Failed to read page {}", args.page.display()))?;
    let document = HtmlParser::new().parse_with_url(&html, &args.url)?;

    let window = WindowId(args.window);
    let mut page = Page::new(document).with_window(window);
    for global in &args.globals {
        page.define_global(global);
    }
    let bridge = Bridge::new(page, config)?;

    let input = fs::read_to_string(&args.messages)
        .with_context(|| format!("Failed to read messages {}", args.messages.display()))?;
    let (tx, rx) = smol::channel::unbounded();
    for (number, line) in input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: invalid JSON", args.messages.display(), number + 1))?;
        if tx.try_send(envelope(value, window)?).is_err() {
            bail!("message queue closed");
        }
    }
    drop(tx);

    tracing::info!(page = %args.page.display(), "replaying messages");
    smol::block_on(bridge.serve(rx));

    let replies = bridge.page().borrow().take_messages();
    tracing::info!(replies = replies.len(), "replay finished");
    for reply in replies {
        writeln!(out, "{}", serde_json::to_string(&reply)?)?;
    }
    Ok(())
}

/// A `{source, data}` line is a full envelope; anything else is a payload
/// posted by the page's own window
fn envelope(value: Value, window: WindowId) -> Result<Envelope> {
    let is_envelope = value.get("source").is_some() && value.get("data").is_some();
    if is_envelope {
        return serde_json::from_value(value).context("Malformed envelope");
    }
    Ok(Envelope::new(window, value))
}
