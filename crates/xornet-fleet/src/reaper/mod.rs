//! Stale-machine reaper.
//!
//! On a fixed interval the leader instance loads every machine, decides per
//! machine whether to evict, demote or keep it (see
//! [`reap_check`](crate::liveness::reap_check)), and applies the writes
//! concurrently under a semaphore. Writes are conditional on the
//! `last_update` the sweep read, so a heartbeat that lands mid-sweep wins.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Semaphore, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use xornet_core::config::ReaperConfig;
use xornet_core::db::unix_timestamp;

use crate::error::{FleetError, Result};
use crate::liveness::ReapAction;
use crate::storage::{Machine, MachineStore};

mod shard;

pub use shard::{LEADER_SHARD, ShardGuard};


const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// Counts from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub scanned: usize,
    pub evicted: usize,
    pub demoted: usize,
    /// Conditional writes that found the machine changed since it was read.
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Evicted,
    Demoted,
    Skipped,
    Failed,
}

impl SweepReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Evicted => self.evicted += 1,
            Outcome::Demoted => self.demoted += 1,
            Outcome::Skipped => self.skipped += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

pub struct Reaper<S> {
    store: S,
    shard: ShardGuard,
    interval: Duration,
    shutdown_grace: Duration,
    run_on_start: bool,
    permits: Arc<Semaphore>,
}

impl<S: MachineStore + Clone + 'static> Reaper<S> {
    pub fn new(store: S, config: &ReaperConfig) -> Self {
        let max_concurrency = if config.max_concurrency == 0 {
            DEFAULT_MAX_CONCURRENCY
        } else {
            config.max_concurrency
        };

        Self {
            store,
            shard: ShardGuard::new(config.shard.as_deref()),
            interval: Duration::from_secs(config.interval_secs.max(1)),
            shutdown_grace: Duration::from_secs(config.shutdown_grace_secs),
            run_on_start: config.run_on_start,
            permits: Arc::new(Semaphore::new(max_concurrency)),
        }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub const fn shard(&self) -> &ShardGuard {
        &self.shard
    }

    pub async fn sweep(&self) -> Result<SweepReport> {
        self.sweep_at(unix_timestamp()).await
    }

    /// Sweep every machine as of `now`.
    ///
    /// A non-leader shard returns an empty report without touching storage.
    /// Failing to load the machine list aborts the sweep; a failed write for
    /// one machine is logged and counted, and the rest still run.
    pub async fn sweep_at(&self, now: i64) -> Result<SweepReport> {
        if !self.shard.is_leader() {
            debug!(shard = ?self.shard.shard(), "Not the leader shard, skipping sweep");
            return Ok(SweepReport::default());
        }

        info!(now, "Reaper sweep started");
        let machines = self.store.list_machines(None).await.map_err(|e| {
            error!(error = %e, "Reaper failed to load machines");
            FleetError::StorageUnavailable(e.to_string())
        })?;

        let mut report = SweepReport {
            scanned: machines.len(),
            ..SweepReport::default()
        };

        let mut tasks = JoinSet::new();
        for machine in machines {
            let action = machine.reap_check(now);
            if action == ReapAction::Keep {
                continue;
            }
            let store = self.store.clone();
            let permits = Arc::clone(&self.permits);
            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return Outcome::Failed;
                };
                apply(&store, &machine, action, now).await
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(outcome) => report.record(outcome),
                Err(e) => {
                    warn!(error = %e, "Reaper task did not complete");
                    report.failed += 1;
                }
            }
        }

        info!(
            scanned = report.scanned,
            evicted = report.evicted,
            demoted = report.demoted,
            skipped = report.skipped,
            failed = report.failed,
            "Reaper sweep completed"
        );
        Ok(report)
    }

    /// Run one sweep now. Errors have already been logged by the sweep.
    pub async fn run_once(&self) -> Option<SweepReport> {
        self.sweep().await.ok()
    }

    /// Sweep on a fixed interval until `shutdown` flips.
    ///
    /// The first tick is skipped unless `run_on_start` is set. A sweep in
    /// progress when shutdown arrives gets `shutdown_grace` to finish; after
    /// that it is dropped, which aborts its outstanding writes.
    pub fn spawn(self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                shard = ?self.shard.shard(),
                leader = self.shard.is_leader(),
                interval_secs = self.interval.as_secs(),
                "Reaper started"
            );

            let mut timer = tokio::time::interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            if !self.run_on_start {
                timer.tick().await; // Skip first immediate tick
            }

            loop {
                if *shutdown.borrow() {
                    break;
                }
                tokio::select! {
                    _ = timer.tick() => {
                        let sweep = self.run_once();
                        tokio::pin!(sweep);
                        tokio::select! {
                            _ = &mut sweep => {}
                            _ = shutdown.changed() => {
                                info!(grace_secs = self.shutdown_grace.as_secs(), "Shutdown requested during sweep");
                                if tokio::time::timeout(self.shutdown_grace, &mut sweep).await.is_err() {
                                    warn!("Reaper sweep cut off after shutdown grace");
                                }
                                break;
                            }
                        }
                    }
                    _ = shutdown.changed() => break,
                }
            }

            info!("Reaper shutting down");
        })
    }
}

async fn apply<S: MachineStore>(
    store: &S,
    machine: &Machine,
    action: ReapAction,
    now: i64,
) -> Outcome {
    let result = match action {
        ReapAction::Evict => {
            store
                .evict_machine(&machine.uuid, machine.last_update)
                .await
        }
        ReapAction::Demote => {
            store
                .demote_machine(&machine.uuid, machine.last_update, now)
                .await
        }
        // Filtered out before any task is spawned.
        ReapAction::Keep => return Outcome::Skipped,
    };

    match result {
        Ok(true) if action == ReapAction::Evict => {
            info!(machine_uuid = %machine.uuid, last_update = ?machine.last_update, "Evicted stale machine");
            Outcome::Evicted
        }
        Ok(true) => {
            info!(machine_uuid = %machine.uuid, last_update = ?machine.last_update, "Machine marked offline");
            Outcome::Demoted
        }
        Ok(false) => {
            debug!(machine_uuid = %machine.uuid, ?action, "Machine changed during sweep, left as is");
            Outcome::Skipped
        }
        Err(e) => {
            warn!(machine_uuid = %machine.uuid, ?action, error = %e, "Reaper write failed");
            Outcome::Failed
        }
    }
}
