//! Shared health table mapping pool names to ordered member states.

use crate::config::{CommonPool, Config};
use crate::types::{Member, Observation};
use common::{Error, Result};
use std::collections::BTreeMap;
use std::net::IpAddr;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Default)]
struct TableInner {
    /// Pool name → members, in config order. Sorted keys keep the JSON dump
    /// deterministic.
    pools: BTreeMap<String, Vec<Member>>,

    /// Pool name → fallback IP recorded when the pool was built from config
    fallbacks: BTreeMap<String, IpAddr>,
}

/// Concurrent health table. The only shared mutable state between pollers
/// and readers: pollers write through [`HealthTable::set_health`], readers
/// take consistent snapshots.
#[derive(Debug, Default)]
pub struct HealthTable {
    inner: RwLock<TableInner>,
}

impl HealthTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Ensure a pool exists. Existing pools keep their members.
    pub async fn add_pool(&self, name: &str) {
        let mut inner = self.inner.write().await;
        inner.pools.entry(name.to_string()).or_default();
    }

    /// Rebuild the table from a config: wipe everything, then seed every
    /// pool with its configured members at the fallback IP, unhealthy, zero
    /// failures.
    pub async fn build_from_config(&self, config: &Config) {
        let mut inner = self.inner.write().await;
        inner.pools.clear();
        inner.fallbacks.clear();

        let pools = config
            .tcp_pools
            .iter()
            .map(|p| &p.common)
            .chain(config.http_pools.iter().map(|p| &p.common));

        for pool in pools {
            let members = pool
                .members
                .iter()
                .map(|host| Member {
                    host: host.clone(),
                    ip: pool.fallback_ip,
                    healthy: false,
                    failures: 0,
                })
                .collect();
            inner.pools.insert(pool.name.clone(), members);
            inner.fallbacks.insert(pool.name.clone(), pool.fallback_ip);
        }
    }

    /// Replace one pool's member list wholesale.
    pub async fn replace_pool(&self, name: &str, members: Vec<Member>) {
        let mut inner = self.inner.write().await;
        inner.pools.insert(name.to_string(), members);
    }

    /// Consistent point-in-time copy of the whole table.
    pub async fn snapshot(&self) -> BTreeMap<String, Vec<Member>> {
        self.inner.read().await.pools.clone()
    }

    /// Consistent point-in-time JSON encoding of the whole table: object
    /// keyed by pool name, member arrays in order.
    pub async fn snapshot_json(&self) -> Result<String> {
        let inner = self.inner.read().await;
        Ok(serde_json::to_string(&inner.pools)?)
    }

    /// IP of the first member published healthy, in member order. If none is
    /// healthy, the first member's IP. If the pool is unknown or empty, the
    /// fallback IP recorded at build time, else [`Error::UnknownPool`].
    pub async fn first_healthy_ip(&self, pool: &str) -> Result<IpAddr> {
        let inner = self.inner.read().await;

        if let Some(members) = inner.pools.get(pool) {
            if let Some(member) = members.iter().find(|m| m.healthy) {
                return Ok(member.ip);
            }
            if let Some(first) = members.first() {
                return Ok(first.ip);
            }
        }

        inner
            .fallbacks
            .get(pool)
            .copied()
            .ok_or_else(|| Error::UnknownPool(pool.to_string()))
    }

    /// Apply one probe result to a member, with failure-count hysteresis.
    ///
    /// The steady state takes only the shared lease: the prospective new
    /// state is computed under the read lock and nothing happens when it
    /// matches what is stored. Otherwise the write lock is taken and the
    /// state recomputed from the re-read slot, since another writer may have
    /// run between the two acquisitions.
    pub async fn set_health(&self, pool: &CommonPool, obs: Observation) {
        debug!(
            pool = %pool.name,
            host = %obs.host,
            healthy = obs.healthy,
            "recording observation"
        );

        {
            let inner = self.inner.read().await;
            let prev = inner
                .pools
                .get(&pool.name)
                .and_then(|members| members.iter().find(|m| m.host == obs.host));
            if let Some(prev) = prev {
                if next_state(prev, &obs, pool.failure_threshold) == *prev {
                    return;
                }
            }
        }

        let mut inner = self.inner.write().await;
        let members = inner.pools.entry(pool.name.clone()).or_default();
        match members.iter_mut().find(|m| m.host == obs.host) {
            Some(slot) => {
                let next = next_state(slot, &obs, pool.failure_threshold);
                if next.healthy && !slot.healthy {
                    info!(pool = %pool.name, host = %slot.host, "member is now healthy");
                } else if !next.healthy && slot.healthy {
                    warn!(
                        pool = %pool.name,
                        host = %slot.host,
                        failures = next.failures,
                        "member is now unhealthy"
                    );
                }
                *slot = next;
            }
            None => {
                // First reading for a host the builder never saw: append at
                // the end of the member order.
                members.push(Member {
                    failures: if obs.healthy { 0 } else { 1 },
                    host: obs.host,
                    ip: obs.ip,
                    healthy: obs.healthy,
                });
            }
        }
    }
}

/// Hysteresis: a positive observation resets the member immediately; a
/// negative one increments the saturating failure count and only unpublishes
/// the member once the count reaches the pool threshold.
fn next_state(prev: &Member, obs: &Observation, threshold: u32) -> Member {
    if obs.healthy {
        Member {
            host: prev.host.clone(),
            ip: obs.ip,
            healthy: true,
            failures: 0,
        }
    } else {
        let failures = (prev.failures + 1).min(threshold);
        Member {
            host: prev.host.clone(),
            ip: obs.ip,
            healthy: failures < threshold,
            failures,
        }
    }
}
