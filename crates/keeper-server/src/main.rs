//! `keeperd`: the SecretKeeper server.

use anyhow::Context;
use clap::Parser;
use keeper_core::config::{BindMode, Config};
use keeper_core::paths;
use keeper_server::{MemorySecretStore, SecretServer, SecretStore, SqliteSecretStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// SecretKeeper server.
#[derive(Parser)]
#[command(name = "keeperd", version, about)]
struct Args {
    /// Config file (defaults to ~/.secretkeeper/keeper.json5)
    #[arg(short, long, env = "KEEPER_CONFIG")]
    config: Option<PathBuf>,

    /// Port number (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Listen on all interfaces instead of loopback
    #[arg(long)]
    lan: bool,

    /// SQLite database (omit for an in-memory store)
    #[arg(long, conflicts_with = "persist")]
    database: Option<PathBuf>,

    /// Keep secrets in the default database under ~/.secretkeeper
    #[arg(long)]
    persist: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = Config::load_or_default(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if args.lan {
        config.server.bind = BindMode::Lan;
    }
    if let Some(database) = args.database {
        config.server.database = Some(database);
    } else if args.persist {
        paths::ensure_base_dir()?;
        config.server.database = Some(paths::server_database()?);
    }
    config.validate()?;

    init_tracing(&config);

    let store: Arc<dyn SecretStore> = match &config.server.database {
        Some(path) => Arc::new(
            SqliteSecretStore::open(path)
                .await
                .with_context(|| format!("opening database {}", path.display()))?,
        ),
        None => {
            info!("No database configured; secrets are kept in memory");
            Arc::new(MemorySecretStore::new())
        }
    };

    let server = SecretServer::new(&config.server, store).await;
    server.run(shutdown_signal()).await?;
    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!(
            "keeperd={level},keeper_server={level},tower_http=info",
            level = config.logging.level.as_filter()
        )
        .into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if config.logging.json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
