// Background aggregation worker: one read-decode-aggregate cycle per tick.
// The loop awaits each cycle and the interval skips missed ticks, so at
// most one cycle is ever in flight.

use crate::aggregate;
use crate::chain::{self, ChainClient};
use crate::models::{CycleFailure, ProtocolSnapshot};
use crate::registry::Registry;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use tokio::sync::{RwLock, broadcast};
use tokio::time::{Duration, Instant, interval, timeout};

/// Rate limit for "no receivers" logging (avoid a line per cycle when no one
/// is on /ws/snapshot).
const NO_RECEIVERS_WARN_INTERVAL: Duration = Duration::from_secs(300);

/// Latest cycle outcome, shared with the HTTP layer. A failed cycle never
/// overwrites the last good snapshot; it records the failure alongside.
#[derive(Debug, Default)]
pub struct LatestState {
    pub snapshot: Option<ProtocolSnapshot>,
    pub last_error: Option<CycleFailure>,
}

/// Client, registry, channels, and shutdown for the worker.
pub struct WorkerDeps {
    pub chain: Arc<ChainClient>,
    pub registry: Arc<Registry>,
    pub tx: broadcast::Sender<ProtocolSnapshot>,
    pub latest: Arc<RwLock<LatestState>>,
    pub ws_connections: Arc<AtomicUsize>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

/// Worker timing and logging config.
pub struct WorkerConfig {
    pub poll_interval_secs: u64,
    pub cycle_timeout_secs: u64,
    /// How often to log app stats (real seconds).
    pub stats_log_interval_secs: u64,
}

/// Runs one full aggregation cycle: execute the query plan, decode, derive,
/// assemble. Fails whole (no partial snapshot) on a mandatory read or
/// decode error.
pub async fn run_cycle(
    chain: &ChainClient,
    registry: &Registry,
) -> anyhow::Result<ProtocolSnapshot> {
    let plan = chain::query_plan(registry);
    let raw = chain.execute(&plan).await?;
    let inputs = aggregate::decode_inputs(&plan, &raw, registry.operators.len())?;
    Ok(aggregate::build_snapshot(registry, &inputs, Utc::now()))
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        chain,
        registry,
        tx,
        latest,
        ws_connections,
        mut shutdown_rx,
    } = deps;
    let cycle_timeout = Duration::from_secs(config.cycle_timeout_secs);
    let stats_log_interval = Duration::from_secs(config.stats_log_interval_secs);

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(config.poll_interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(stats_log_interval);
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut cycles_completed: u64 = 0;
        let mut cycles_failed: u64 = 0;
        let mut last_no_receivers_warn: Option<Instant> = None;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let outcome = timeout(cycle_timeout, run_cycle(&chain, &registry)).await;
                    let result = match outcome {
                        Ok(r) => r,
                        Err(_) => Err(anyhow::anyhow!(
                            "aggregation cycle exceeded {}s",
                            cycle_timeout.as_secs()
                        )),
                    };
                    match result {
                        Ok(snapshot) => {
                            cycles_completed += 1;
                            {
                                let mut state = latest.write().await;
                                state.snapshot = Some(snapshot.clone());
                                state.last_error = None;
                            }
                            if tx.send(snapshot).is_err() {
                                let should_warn = last_no_receivers_warn
                                    .is_none_or(|t| t.elapsed() >= NO_RECEIVERS_WARN_INTERVAL);
                                if should_warn {
                                    tracing::debug!(
                                        operation = "broadcast_snapshot",
                                        "No active WebSocket clients; broadcast channel has no receivers"
                                    );
                                    last_no_receivers_warn = Some(Instant::now());
                                }
                            }
                        }
                        Err(e) => {
                            cycles_failed += 1;
                            tracing::warn!(
                                error = %e,
                                operation = "run_cycle",
                                "aggregation cycle failed"
                            );
                            latest.write().await.last_error = Some(CycleFailure {
                                error: "failed to fetch on-chain data".into(),
                                details: format!("{e:#}"),
                                timestamp: Utc::now()
                                    .to_rfc3339_opts(SecondsFormat::Millis, true),
                            });
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => {
                    tracing::info!(
                        ws_clients =
                            ws_connections.load(std::sync::atomic::Ordering::Relaxed),
                        cycles_completed,
                        cycles_failed,
                        "app stats"
                    );
                }
            }
        }
    })
}
