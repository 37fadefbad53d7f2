//! Xornet fleet backend
//!
//! Opens the fleet database, wires the token issuer and fleet manager, and
//! runs the stale-machine reaper until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};

use xornet_core::config::{self, Config, DEV_JWT_SECRET};
use xornet_core::tracing_init::{default_filter, init_tracing};

use xornet_fleet::auth::TokenIssuer;
use xornet_fleet::storage::{FleetDatabase, MachineStore};
use xornet_fleet::{FleetManager, Reaper};

#[derive(Parser, Debug)]
#[command(name = "xornet-fleet")]
#[command(
    version,
    about = "Xornet fleet backend - machine liveness and session authority"
)]
struct Args {
    /// Path to a JSON config file (default: ~/.config/xornet/fleet.json).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to SQLite database file.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Session signing secret.
    #[arg(long, env = "XORNET_JWT_SECRET", hide_env_values = true)]
    jwt_secret: Option<String>,

    /// Session lifetime in seconds. 0 issues sessions that never expire.
    #[arg(long)]
    session_ttl: Option<i64>,

    /// Shard identifier. Only shard "1" (or no shard) runs the reaper sweep.
    #[arg(long, env = "XORNET_SHARD")]
    shard: Option<String>,

    /// Seconds between reaper sweeps.
    #[arg(long)]
    reap_interval: Option<u64>,

    /// Maximum concurrent writes per sweep.
    #[arg(long)]
    reap_concurrency: Option<usize>,

    /// Sweep once immediately at startup.
    #[arg(long)]
    reap_on_start: bool,

    /// Log level for xornet crates when RUST_LOG is not set.
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

impl Args {
    /// Layer command-line flags over the loaded configuration.
    fn apply(self, config: &mut Config) {
        if let Some(path) = self.db_path {
            config.storage.database_path = Some(path);
        }
        if let Some(secret) = self.jwt_secret {
            config.auth.jwt_secret = secret;
        }
        if let Some(ttl) = self.session_ttl {
            config.auth.session_ttl_secs = (ttl > 0).then_some(ttl);
        }
        if let Some(shard) = self.shard {
            config.reaper.shard = Some(shard).filter(|s| !s.trim().is_empty());
        }
        if let Some(secs) = self.reap_interval {
            config.reaper.interval_secs = secs;
        }
        if let Some(n) = self.reap_concurrency {
            config.reaper.max_concurrency = n;
        }
        if self.reap_on_start {
            config.reaper.run_on_start = true;
        }
        if let Some(level) = self.log_level {
            config.log.level = level;
        }
        if self.log_json {
            config.log.json = true;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = config::load_config(args.config.as_deref())?;
    args.apply(&mut config);

    init_tracing(
        &default_filter("xornet_fleet", &config.log.level),
        config.log.json,
    );

    info!(
        version = env!("CARGO_PKG_VERSION"),
        shard = ?config.reaper.shard,
        "Starting xornet-fleet"
    );

    if config.auth.jwt_secret == DEV_JWT_SECRET {
        warn!("Using the built-in development session secret; set XORNET_JWT_SECRET");
    }

    let db_path = match config.storage.database_path.clone() {
        Some(path) => path,
        None => config::database_path()
            .ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?,
    };

    let db = match FleetDatabase::open(&db_path).await {
        Ok(db) => db,
        Err(e) => {
            error!(path = %db_path.display(), error = %e, "Failed to open fleet database");
            return Err(anyhow::anyhow!(
                "failed to open fleet database at {}: {e}",
                db_path.display()
            ));
        }
    };

    let tokens = Arc::new(TokenIssuer::new(
        config.auth.jwt_secret.as_bytes(),
        config.auth.session_ttl_secs,
    ));
    let fleet = FleetManager::new(db.clone(), tokens);

    match fleet.store().list_machines(None).await {
        Ok(machines) => info!(machines = machines.len(), "Fleet loaded"),
        Err(e) => warn!(error = %e, "Could not count machines at startup"),
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reaper = Reaper::new(db.clone(), &config.reaper);
    info!(
        leader = reaper.shard().is_leader(),
        interval_secs = config.reaper.interval_secs,
        "Reaper configured"
    );
    let reaper = reaper.spawn(shutdown_rx);

    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal");

    let _ = shutdown_tx.send(true);
    if let Err(e) = reaper.await {
        warn!(error = %e, "Reaper task ended abnormally");
    }

    db.close().await;
    info!("Fleet stopped");
    Ok(())
}
