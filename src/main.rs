use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use m3u8_resolver::{
    config::Config,
    export::{ExportFormat, failure_report},
    ingestor::{PipelineOptions, PipelineProgress, ProgressCallback, ResolutionPipeline},
    models::SourceReference,
    sources::{CredentialSource, YtDlpExtractor},
};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    /// `title | url` lines
    Text,
    /// Extended M3U
    M3u,
}

impl From<OutputFormat> for ExportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => ExportFormat::Text,
            OutputFormat::M3u => ExportFormat::M3u,
        }
    }
}

#[derive(Parser)]
#[command(name = "m3u8-resolver")]
#[command(version)]
#[command(about = "Resolve video and playlist links into playable HLS stream URLs")]
#[command(long_about = None)]
struct Cli {
    /// Video, live stream or playlist URLs
    #[arg(value_name = "URL")]
    references: Vec<String>,

    /// Read URLs from a file, one per line
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Treat every URL as a playlist
    #[arg(long)]
    playlist: bool,

    /// Netscape-format cookie file for sources that require sign-in
    #[arg(long, value_name = "FILE")]
    cookies: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write the playlist to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Maximum concurrent lookups (overrides config file)
    #[arg(long, value_name = "N")]
    concurrency: Option<usize>,

    /// Items per batch (overrides config file)
    #[arg(long, value_name = "N")]
    batch_size: Option<usize>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("m3u8_resolver={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting m3u8-resolver v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    if let Some(concurrency) = cli.concurrency {
        config.pipeline.concurrency = concurrency;
    }
    if let Some(batch_size) = cli.batch_size {
        config.pipeline.batch_size = batch_size;
    }
    config.validate()?;

    let references = collect_references(&cli, &config).await?;
    if references.is_empty() {
        anyhow::bail!("No URLs given and no presets configured");
    }

    let extractor = Arc::new(YtDlpExtractor::from_config(&config.extractor));
    let progress: ProgressCallback = Arc::new(|p: PipelineProgress| {
        info!(
            "Resolved {}/{} ({:.0}%)",
            p.completed,
            p.total,
            p.percentage()
        );
    });
    let pipeline = ResolutionPipeline::new(extractor, PipelineOptions::from_config(&config))
        .with_progress_callback(progress);

    let canceller = pipeline.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if canceller.cancel() {
                warn!("Interrupt received, cancelling remaining lookups");
            } else {
                std::process::exit(130);
            }
        }
    });

    let auth = cli.cookies.clone().map(CredentialSource::File);
    let report = pipeline.run(&references, auth.as_ref()).await?;

    let rendered = ExportFormat::from(cli.format).render(&report.playlist);
    match &cli.output {
        Some(path) => {
            tokio::fs::write(path, rendered)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Playlist written to {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    let failures = failure_report(&report.playlist);
    if !failures.is_empty() {
        eprintln!("Unavailable items:");
        eprint!("{failures}");
    }
    for failed in &report.collection_failures {
        warn!("Collection {} unavailable: {} ({})", failed.url, failed.detail, failed.reason);
    }

    info!("{}", report.summary());
    Ok(())
}

/// URLs from the command line and input file, or the configured presets
async fn collect_references(cli: &Cli, config: &Config) -> Result<Vec<SourceReference>> {
    let mut lines: Vec<String> = cli.references.clone();

    if let Some(path) = &cli.input {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        lines.extend(contents.lines().map(str::to_string));
    }

    let urls: Vec<String> = lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if urls.is_empty() {
        if !config.presets.is_empty() {
            info!(
                "No URLs given, using {} configured presets",
                config.presets.len()
            );
        }
        return Ok(config.preset_references());
    }

    Ok(urls
        .into_iter()
        .map(|url| {
            if cli.playlist {
                SourceReference::playlist(url)
            } else {
                SourceReference::new(url)
            }
        })
        .collect())
}
