//! Long-lived per-member polling loop.

use crate::checkers::Checker;
use crate::config::CommonPool;
use crate::table::HealthTable;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Polls one (pool, member) pair until its generation is cancelled.
///
/// Every suspension point is a cancellation point; a triggered token makes
/// the loop return within one interval plus one outstanding probe.
pub struct MemberMonitor {
    checker: Arc<dyn Checker>,
    pool: CommonPool,
    table: Arc<HealthTable>,
}

impl MemberMonitor {
    /// Create a monitor for one member of one pool
    pub fn new(checker: Arc<dyn Checker>, pool: CommonPool, table: Arc<HealthTable>) -> Self {
        Self {
            checker,
            pool,
            table,
        }
    }

    /// Run the polling loop until `shutdown` is triggered.
    pub async fn run(self, shutdown: CancellationToken) {
        let interval = Duration::from_secs(self.pool.interval);

        // Uniform random startup delay in [0, interval) staggers the probes
        // of a generation instead of firing them all at once.
        let backoff = rand::thread_rng().gen_range(0..self.pool.interval);
        info!(
            pool = %self.pool.name,
            host = %self.checker.host(),
            kind = self.checker.kind(),
            backoff,
            "starting poller"
        );

        tokio::select! {
            _ = shutdown.cancelled() => return,
            _ = sleep(Duration::from_secs(backoff)) => {}
        }

        loop {
            if shutdown.is_cancelled() {
                break;
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                observation = self.checker.check() => {
                    if let Some(obs) = observation {
                        self.table.set_health(&self.pool, obs).await;
                    }
                }
            }

            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = sleep(interval) => {}
            }
        }

        debug!(
            pool = %self.pool.name,
            host = %self.checker.host(),
            "poller exited"
        );
    }
}
