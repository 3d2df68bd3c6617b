//! Component registry server binary.

use anyhow::Result;
use clap::{Parser, Subcommand};
use component_registry::config::BackendKind;
use component_registry::{run_server, Config, IndexStore};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "component-registry")]
#[command(about = "Versioned UI component registry")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the registry server
    Start {
        /// Host to bind to (defaults to the configured host)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to (defaults to the configured port)
        #[arg(long)]
        port: Option<u16>,

        /// Data directory for component storage
        #[arg(long)]
        data: Option<PathBuf>,

        /// Path to a JSON configuration file
        #[arg(long, default_value = "config.json")]
        config: PathBuf,

        /// Storage backend: local or memory
        #[arg(long)]
        backend: Option<BackendKind>,
    },

    /// Rebuild the index document from stored components
    Reindex {
        /// Data directory for component storage
        #[arg(long)]
        data: Option<PathBuf>,

        /// Path to a JSON configuration file
        #[arg(long, default_value = "config.json")]
        config: PathBuf,
    },
}

fn load_config(path: &Path, data: Option<PathBuf>) -> Result<Config> {
    let mut config = Config::load_or_default(path)?;
    if let Some(data) = data {
        config.storage.data_dir = data;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = registry_logging::init_subscriber();

    let cli = Cli::parse();

    match cli.command {
        Commands::Start {
            host,
            port,
            data,
            config,
            backend,
        } => {
            let mut config = load_config(&config, data)?;
            if let Some(backend) = backend {
                config.storage.backend = backend;
            }
            let host = host.unwrap_or_else(|| config.server.default_host.clone());
            let port = port.unwrap_or(config.server.default_port);
            run_server(host, port, config).await
        }

        Commands::Reindex { data, config } => {
            let config = load_config(&config, data)?;
            let index = IndexStore::new(config.storage.build_backend());
            let document = index.rebuild().await?;
            info!(components = document.len(), "Index rebuilt");
            println!("✅ Rebuilt index with {} component(s)", document.len());
            for (name, entry) in document.iter() {
                println!("   {name} -> {}", entry.latest);
            }
            Ok(())
        }
    }
}
