use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use arbor_stream::config::Config;
use arbor_stream::resolver::extractors::InfoExtractorOrchestrator;
use arbor_stream::resolver::{FormatCatalog, FormatSelector, RelayServer, StreamResolver};

#[derive(Parser)]
#[command(name = "arbor-stream", version, about = "Audio stream resolver and local relay")]
struct Cli {
    /// Config file (defaults to the per-user config.toml)
    #[arg(short, long, global = true, env = "ARBOR_STREAM_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve a page URL and print the playback document as JSON
    Resolve {
        url: String,
        /// Keep the relay serving until Ctrl-C
        #[arg(long)]
        hold: bool,
    },
    /// Show which format would be selected from a saved `yt-dlp --dump-json` file
    Inspect {
        file: PathBuf,
        /// Use the audio-download preset instead of the streaming containers
        #[arg(long)]
        download: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("failed to load config")?;
    arbor_stream::logging::init(&config.logging, cli.verbose);

    match cli.command {
        Commands::Resolve { url, hold } => resolve(&config, &url, hold).await,
        Commands::Inspect { file, download } => inspect(&config, &file, download),
    }
}

async fn resolve(config: &Config, url: &str, hold: bool) -> Result<()> {
    let relay = Arc::new(RelayServer::new(config.relay.clone())?);
    let resolver = StreamResolver::new(Arc::new(InfoExtractorOrchestrator::new()), relay, config);

    let result = resolver
        .resolve(url)
        .await
        .with_context(|| format!("could not resolve {}", url))?;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if hold {
        tracing::info!(port = ?resolver.relay().port(), "relay serving, Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}

fn inspect(config: &Config, file: &Path, download: bool) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let catalog = FormatCatalog::from_json_str(&text)?;
    let constraints = if download {
        config.selection.download_constraints_for(catalog.extractor_key())
    } else {
        config.selection.constraints_for(catalog.extractor_key())
    };
    let stream = FormatSelector::select(&catalog, &constraints)?;
    let candidate = &stream.candidate;

    let summary = serde_json::json!({
        "extractor_key": catalog.extractor_key(),
        "candidates": catalog.candidates().len(),
        "format_id": candidate.format_id,
        "ext": candidate.container,
        "acodec": candidate.audio_codec,
        "protocol": candidate.protocol.as_str(),
        "abr": candidate.average_bitrate,
        "mime_type": stream.mime_type,
        "source": stream.source,
        "url": stream.url(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
