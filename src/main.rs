mod analysis;
mod config;
mod context;
mod lyrics;
mod server;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use analysis::Analyzer;
use context::RequestContext;
use lyrics::{ChorusDetector, LrclibClient, LyricsKind, LyricsParser, RetryingSource};

#[derive(Debug, Parser)]
#[command(name = "lyrics-analyzer", version, about = "Fetch song lyrics and detect the chorus")]
struct Cli {
    /// Override config file path.
    #[arg(long)]
    config: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Analyze one song and print the result as JSON.
    Analyze {
        track: String,
        artist: String,
        /// Give up after this many milliseconds (retries included).
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Parse a local lyrics file and print lines and chorus (no network).
    Parse {
        path: std::path::PathBuf,
        /// Treat the file as plain lyrics instead of LRC.
        #[arg(long)]
        plain: bool,
    },
    /// Run the HTTP API.
    Serve {
        /// Listen address, overrides `server.addr`.
        #[arg(long)]
        addr: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;

    match cli.command {
        Command::Analyze {
            track,
            artist,
            timeout_ms,
        } => {
            let track = track.trim();
            let artist = artist.trim();
            anyhow::ensure!(
                !track.is_empty() && !artist.is_empty(),
                "track and artist are required"
            );

            let analyzer = make_analyzer(&cfg)?;
            let ctx = match timeout_ms {
                Some(ms) => RequestContext::with_timeout(Duration::from_millis(ms)),
                None => RequestContext::new(),
            };
            let canceller = ctx.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    canceller.cancel();
                }
            });

            let result = analyzer.analyze(&ctx, track, artist).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Parse { path, plain } => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display()))?;
            let kind = if plain {
                LyricsKind::Plain
            } else {
                LyricsKind::Synced
            };
            let lines = LyricsParser::new()
                .parse(kind, &raw)
                .with_context(|| format!("parse {}", path.display()))?;
            let chorus = ChorusDetector::new().detect(&lines);
            let out = serde_json::json!({
                "lyrics": analysis::model::LyricsPayload::new(kind, lines),
                "chorus": chorus,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| cfg.server.addr.clone());
            let state = server::ServerState {
                analyzer: Arc::new(make_analyzer(&cfg)?),
                request_timeout: cfg.server.request_timeout(),
            };
            server::serve(&addr, state).await?;
        }
    }

    Ok(())
}

fn make_analyzer(cfg: &config::Config) -> anyhow::Result<Analyzer> {
    let client = LrclibClient::new(&cfg.lrclib.base_url, cfg.lrclib.timeout())?;
    let source = RetryingSource::new(client, cfg.retry.policy());
    Ok(Analyzer::new(
        Box::new(source),
        LyricsParser::new(),
        Some(ChorusDetector::new()),
    ))
}
