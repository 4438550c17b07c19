//! Ember - reference cache probe runner

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ember::{run_headless, AppSettings, CacheProbe, Version};
use embercache::{BackingStoreKind, CacheMode};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Application name
    #[arg(short, long)]
    name: Option<String>,

    /// Backing store (hash, identity, concurrent)
    #[arg(short, long)]
    backing: Option<BackingStoreKind>,

    /// Reclamation mode (weak, soft)
    #[arg(short, long)]
    mode: Option<CacheMode>,

    /// Values kept alive by soft retention
    #[arg(long)]
    soft_capacity: Option<usize>,

    /// Frames to run
    #[arg(short, long)]
    frames: Option<u64>,

    /// Unowned values cached per frame
    #[arg(short, long, default_value_t = 8)]
    transients: u64,

    /// Print the probe report as JSON
    #[arg(long)]
    json: bool,
}

const DEFAULT_FRAMES: u64 = 60;

fn settings_from(args: &Args) -> Result<AppSettings> {
    let mut settings = match &args.config {
        Some(path) => AppSettings::load(path)?,
        None => AppSettings::new("Ember Probe", Version::new(0, 1, 0)),
    };

    if let Some(name) = &args.name {
        settings.app_name = name.clone();
    }
    if let Some(backing) = args.backing {
        settings.cache.backing = backing;
    }
    if let Some(mode) = args.mode {
        settings.cache.mode = mode;
    }
    if let Some(soft_capacity) = args.soft_capacity {
        settings.cache.soft_capacity = soft_capacity;
    }
    settings.max_frames = args.frames.or(settings.max_frames).or(Some(DEFAULT_FRAMES));

    settings
        .cache
        .validate()
        .context("Invalid cache settings")?;
    Ok(settings)
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let settings = settings_from(&args)?;

    info!("Starting Ember v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Cache: backing={} mode={} soft_capacity={} shards={}",
        settings.cache.backing,
        settings.cache.mode,
        settings.cache.soft_capacity,
        settings.cache.shards
    );

    let mut probe = CacheProbe::new(args.transients);
    let summary = match run_headless(&mut probe, settings) {
        Ok(summary) => summary,
        Err(e) => {
            error!("Run failed: {:#}", e);
            return Err(e);
        }
    };

    let Some(report) = probe.report() else {
        anyhow::bail!("probe produced no report");
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!("\nEmber probe: {} frames", summary.frames);
        println!("   Backing:     {}", report.backing);
        println!("   Mode:        {}", report.mode);
        println!("   Entries:     {}", report.entries);
        println!("   Pinned:      {}", report.pinned);
        println!("   Retained:    {}", report.retained);
        println!("   Inserts:     {}", report.stats.inserts);
        println!("   Reclaimed:   {}", report.stats.reclaimed);
        println!("   Hit ratio:   {:.2}%", report.stats.hit_ratio * 100.0);
    }

    Ok(())
}
