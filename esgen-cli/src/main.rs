use clap::{Parser, Subcommand};
use esgen::model::IndexDescriptor;
use esgen::{EngineConfig, HttpEngine, IndexLifecycle, Inventory, ReindexJob, Reindexer, SearchEngine};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "esgen", version, about = "Index generation tooling for HTTP search engines")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Engine base URL; overrides the ESGEN_{DEBUG,RELEASE}_URL profile
    #[arg(long, env = "ESGEN_URL", global = true)]
    url: Option<String>,

    /// Engine version string, e.g. 2.4.6 or 5.6
    #[arg(long, env = "ESGEN_ENGINE_VERSION", global = true)]
    engine_version: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Print cluster health
    Health,
    /// List every index with its aliases
    Indices,
    /// List the document types of an index
    Types {
        #[arg(long)]
        index: String,
    },
    /// Run a reindex job described by a JSON file
    Reindex {
        #[arg(long)]
        job: PathBuf,
    },
    /// Create one index generation from a JSON descriptor
    Create {
        #[arg(long)]
        descriptor: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    // Input files are read before touching the network.
    let job: Option<ReindexJob> = match &cli.command {
        Command::Reindex { job } => Some(read_json(job)?),
        _ => None,
    };
    let descriptor: Option<IndexDescriptor> = match &cli.command {
        Command::Create { descriptor } => Some(read_json(descriptor)?),
        _ => None,
    };

    let config = load_config(&cli)?;
    let engine = Arc::new(HttpEngine::new(&config)?);

    let output = match cli.command {
        Command::Health => engine.cluster_health().await?,
        Command::Indices => {
            let listing = Inventory::new(Arc::clone(&engine), config.max_fan_out)
                .indices_and_aliases()
                .await?;
            serde_json::to_value(listing)?
        }
        Command::Types { index } => {
            let types = Inventory::new(Arc::clone(&engine), config.max_fan_out)
                .types(&index)
                .await?;
            serde_json::to_value(types)?
        }
        Command::Reindex { .. } => {
            let job = job.ok_or("reindex job was not loaded")?;
            let report = Reindexer::new(Arc::clone(&engine), config.version())
                .run(&job)
                .await?;
            serde_json::to_value(report)?
        }
        Command::Create { .. } => {
            let descriptor = descriptor.ok_or("index descriptor was not loaded")?;
            let outcomes = IndexLifecycle::new(Arc::clone(&engine), config.version())
                .create_indices(std::slice::from_ref(&descriptor))
                .await?;
            serde_json::to_value(outcomes)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_config(cli: &Cli) -> Result<EngineConfig, Box<dyn Error>> {
    let mut config = EngineConfig::from_env()?;
    if let Some(url) = &cli.url {
        config = config.with_url(url.as_str());
    }
    if let Some(version) = &cli.engine_version {
        config = config.with_engine_version(version.as_str());
    }
    config.validate()?;
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, Box<dyn Error>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;
    serde_json::from_str(&raw).map_err(|e| format!("invalid JSON in {}: {}", path.display(), e).into())
}
