//! Supervisor for poller generations.

use crate::metrics::MetricsRegistry;
use healthcheck::{Checker, Config, HealthTable, HttpChecker, MemberMonitor, TcpChecker};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How often the per-pool gauges are refreshed from the table
const SAMPLE_INTERVAL: Duration = Duration::from_secs(5);

/// Sole owner of the cancellation token and sole spawner of pollers.
///
/// One generation = one rebuilt health table, one fresh token, one poller
/// per (pool, member). A triggered token drains the whole set; the
/// supervisor joins every poller before starting the next generation, so
/// stragglers can never write into a new-generation table.
pub struct Supervisor {
    config: Arc<RwLock<Config>>,
    table: Arc<HealthTable>,
    current: Arc<Mutex<CancellationToken>>,
    metrics: Option<Arc<MetricsRegistry>>,
}

/// Cancellation handle for the admin API.
#[derive(Clone)]
pub struct SupervisorHandle {
    current: Arc<Mutex<CancellationToken>>,
}

impl SupervisorHandle {
    /// Cancel the current generation, causing the supervisor to drain all
    /// pollers and restart from the active config.
    pub async fn cancel(&self) {
        self.current.lock().await.cancel();
    }

    /// Whether the current generation's token has been triggered.
    pub async fn is_cancelled(&self) -> bool {
        self.current.lock().await.is_cancelled()
    }
}

impl Supervisor {
    /// Create a supervisor over the shared config and table
    pub fn new(
        config: Arc<RwLock<Config>>,
        table: Arc<HealthTable>,
        metrics: Option<Arc<MetricsRegistry>>,
    ) -> Self {
        Self {
            config,
            table,
            current: Arc::new(Mutex::new(CancellationToken::new())),
            metrics,
        }
    }

    /// Handle through which the API cancels the running generation
    pub fn handle(&self) -> SupervisorHandle {
        SupervisorHandle {
            current: self.current.clone(),
        }
    }

    /// Run generations forever: rebuild the table from the active config,
    /// spawn the poller set, join it, repeat.
    pub async fn run(self) {
        loop {
            // Publish the generation token before reading the config: a
            // reconfigure that lands mid-restart cancels the new generation
            // instead of a stale token, and its config is picked up next pass.
            let shutdown = CancellationToken::new();
            *self.current.lock().await = shutdown.clone();

            let config = self.config.read().await.clone();
            self.table.build_from_config(&config).await;

            let mut pollers = spawn_pollers(&config, self.table.clone(), shutdown.clone());
            info!(pollers = pollers.len(), "generation started");

            if let Some(metrics) = &self.metrics {
                metrics.record_generation_start();
                metrics.set_pollers_active(pollers.len());
                tokio::spawn(sample_pools(
                    self.table.clone(),
                    metrics.clone(),
                    shutdown.clone(),
                ));
            }

            if pollers.is_empty() {
                // Nothing to supervise; park until a reconfigure or cancel
                shutdown.cancelled().await;
            } else {
                while pollers.join_next().await.is_some() {}
            }

            if let Some(metrics) = &self.metrics {
                metrics.set_pollers_active(0);
            }
            info!("all pollers have exited");
        }
    }
}

/// Spawn one poller per (pool, member) over both pool kinds, all sharing
/// one generation token.
pub fn spawn_pollers(
    config: &Config,
    table: Arc<HealthTable>,
    shutdown: CancellationToken,
) -> JoinSet<()> {
    let mut pollers = JoinSet::new();

    for pool in &config.tcp_pools {
        for host in &pool.common.members {
            let checker: Arc<dyn Checker> = Arc::new(TcpChecker::new(
                host.clone(),
                pool.common.port,
                Duration::from_secs(pool.common.interval),
            ));
            let monitor = MemberMonitor::new(checker, pool.common.clone(), table.clone());
            pollers.spawn(monitor.run(shutdown.clone()));
        }
    }

    for pool in &config.http_pools {
        for host in &pool.common.members {
            match HttpChecker::new(pool, host) {
                Ok(checker) => {
                    let monitor =
                        MemberMonitor::new(Arc::new(checker), pool.common.clone(), table.clone());
                    pollers.spawn(monitor.run(shutdown.clone()));
                }
                Err(e) => {
                    warn!(
                        pool = %pool.common.name,
                        %host,
                        error = %e,
                        "failed to build http checker, skipping member"
                    );
                }
            }
        }
    }

    pollers
}

/// Refresh the per-pool gauges from the table until the generation ends.
async fn sample_pools(
    table: Arc<HealthTable>,
    metrics: Arc<MetricsRegistry>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(SAMPLE_INTERVAL) => {
                for (pool, members) in table.snapshot().await {
                    let healthy = members.iter().filter(|m| m.healthy).count();
                    metrics.set_pool_members(&pool, members.len(), healthy);
                }
            }
        }
    }
}
