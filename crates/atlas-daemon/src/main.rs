//! CodeAtlas daemon entry point.

mod registry;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use atlas_core::AtlasConfig;

use crate::registry::ServiceRegistry;

#[derive(Parser)]
#[command(name = "atlasd")]
#[command(about = "Mirrors watched codebases into a Neo4j code graph")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (falls back to defaults + env overrides)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Project root to watch (repeatable)
    #[arg(long = "watch", required = true)]
    watch: Vec<PathBuf>,

    /// Project name; defaults to the watched directory's basename
    #[arg(long)]
    project: Option<String>,
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

fn project_name(cli: &Cli, root: &PathBuf) -> Result<String> {
    if let Some(name) = &cli.project {
        return Ok(name.clone());
    }
    match root.file_name() {
        Some(name) => Ok(name.to_string_lossy().into_owned()),
        None => bail!("Cannot derive a project name from {}", root.display()),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    if cli.watch.len() > 1 && cli.project.is_some() {
        bail!("--project only applies when watching a single root");
    }

    let config = AtlasConfig::load(cli.config.as_deref()).context("Failed to load config")?;

    let primary = project_name(&cli, &cli.watch[0])?;
    let services = ServiceRegistry::init(&config, &primary).await?;

    for root in &cli.watch {
        let root = root
            .canonicalize()
            .with_context(|| format!("Cannot watch {}", root.display()))?;
        let project = project_name(&cli, &root)?;
        let id = services.watchers.start_watcher(&root, &project).await?;
        info!(watcher = %id, project = %project, root = %root.display(), "Watcher running");
    }

    info!("CodeAtlas daemon ready, press Ctrl+C to stop");
    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("Shutting down");
    services.shutdown().await;
    Ok(())
}
