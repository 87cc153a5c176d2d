use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "lumina", version)]
struct Cli {
    /// Config JSON; missing fields take their defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// History log path (overrides the config file).
    #[arg(long, global = true)]
    history: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compose a photo onto a template, save it to the gallery and record it.
    Compose(ComposeArgs),
    /// Print saved creations, newest first.
    History(HistoryArgs),
    /// Load a JSON feed file and print its entries.
    Feed(FeedArgs),
}

#[derive(Parser, Debug)]
struct ComposeArgs {
    /// User photo.
    #[arg(long)]
    photo: PathBuf,

    /// Template image. Without one the photo is saved unchanged.
    #[arg(long)]
    template: Option<PathBuf>,

    /// Gallery root directory.
    #[arg(long)]
    gallery: Option<PathBuf>,

    /// Minimum processing time in milliseconds.
    #[arg(long)]
    latency_ms: Option<u64>,

    /// JPEG quality (1-100).
    #[arg(long)]
    quality: Option<u8>,
}

#[derive(Parser, Debug)]
struct HistoryArgs {
    /// Print one JSON object per line.
    #[arg(long)]
    json: bool,
}

#[derive(Parser, Debug)]
struct FeedArgs {
    /// Feed JSON file (array of `{id, author, download_url}`).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Maximum number of entries.
    #[arg(long)]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut cfg = load_config(cli.config.as_deref())?;
    if let Some(history) = cli.history {
        cfg.history_path = history;
    }

    match cli.cmd {
        Command::Compose(args) => cmd_compose(cfg, args).await,
        Command::History(args) => cmd_history(&cfg, args),
        Command::Feed(args) => cmd_feed(&cfg, args),
    }
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<lumina::LuminaConfig> {
    let cfg = match path {
        Some(p) => lumina::LuminaConfig::from_path(p)?,
        None => lumina::LuminaConfig::default(),
    };
    Ok(cfg)
}

async fn cmd_compose(mut cfg: lumina::LuminaConfig, args: ComposeArgs) -> anyhow::Result<()> {
    if let Some(gallery) = args.gallery {
        cfg.gallery_root = gallery;
    }
    if let Some(ms) = args.latency_ms {
        cfg.min_latency_ms = ms;
    }
    if let Some(q) = args.quality {
        cfg.jpeg_quality = q;
    }
    cfg.validate()?;

    let coordinator = cfg.open_pipeline()?;
    coordinator.select_photo(args.photo.clone())?;
    if let Some(template) = args.template {
        coordinator.select_template(template)?;
    }

    coordinator
        .process_image()?
        .await
        .with_context(|| format!("compose '{}'", args.photo.display()))?;
    let record = coordinator.save_result()?.await.context("save composition")?;

    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

fn cmd_history(cfg: &lumina::LuminaConfig, args: HistoryArgs) -> anyhow::Result<()> {
    let store = cfg.open_history()?;
    for record in store.snapshot().iter() {
        if args.json {
            println!("{}", serde_json::to_string(record)?);
        } else {
            println!(
                "{:>5}  {}  {}  {}",
                record.id,
                format_timestamp(record.timestamp),
                record.template_name,
                record.image_uri
            );
        }
    }
    Ok(())
}

fn cmd_feed(cfg: &lumina::LuminaConfig, args: FeedArgs) -> anyhow::Result<()> {
    let limit = args.limit.unwrap_or(cfg.feed_limit);
    let mut feed = lumina::Feed::with_limit(lumina::JsonFileSource::new(args.in_path), limit);
    feed.try_refresh()?;
    for entry in feed.entries().iter() {
        println!("{}\t{}\t{}", entry.id, entry.author, entry.download_url);
    }
    Ok(())
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S%.3f").to_string())
        .unwrap_or_else(|| millis.to_string())
}
