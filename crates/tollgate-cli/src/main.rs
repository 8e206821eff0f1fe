//! Tollgate command line.
//!
//! One binary, two roles: `tollgate dispatcher` runs the front door,
//! `tollgate backend` runs a single tenant's backend. Both take their
//! entire configuration from an explicit TOML file; tenant identity is
//! never inferred from the environment.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tollgate_backend::BackendServer;
use tollgate_backend::config::BackendFileConfig;
use tollgate_directory::{RoutingConfig, TenantDirectory};
use tollgate_dispatcher::{DispatcherFileConfig, DispatcherServer};

mod manifest;

#[derive(Parser)]
#[command(name = "tollgate", version, about = "Tenant-isolated chat command gateway")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the front-door dispatcher.
    Dispatcher {
        /// Path to the dispatcher TOML config.
        #[arg(long, env = "TOLLGATE_DISPATCHER_CONFIG")]
        config: PathBuf,
    },
    /// Run one tenant's backend server.
    Backend {
        /// Path to the backend TOML config.
        #[arg(long, env = "TOLLGATE_BACKEND_CONFIG")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tollgate=info,info".into()),
        )
        .init();

    match Cli::parse().command {
        Command::Dispatcher { config } => run_dispatcher(&config).await,
        Command::Backend { config } => run_backend(&config).await,
    }
}

async fn run_dispatcher(path: &Path) -> anyhow::Result<()> {
    let file = DispatcherFileConfig::load(path)
        .with_context(|| format!("loading dispatcher config {}", path.display()))?;
    let routes = RoutingConfig::load(&file.routes)
        .with_context(|| format!("loading routing table {}", file.routes.display()))?;

    let directory = TenantDirectory::new(routes.into_table()?);
    let server = DispatcherServer::new(file.into_config(), directory)?;
    server.serve().await?;
    Ok(())
}

async fn run_backend(path: &Path) -> anyhow::Result<()> {
    let file = BackendFileConfig::load(path)
        .with_context(|| format!("loading backend config {}", path.display()))?;

    let (handler_manifest, allowed) = manifest::assemble(&file.capabilities)?;
    let registry = handler_manifest.build_registry(&allowed)?;
    tracing::info!(
        tenant = %file.tenant_id,
        capabilities = allowed.len(),
        "Assembled tenant registry"
    );

    let server = BackendServer::new(file.into_config(), registry);
    server.serve().await?;
    Ok(())
}
