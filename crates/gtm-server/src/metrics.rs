//! Prometheus metrics for the poller server.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;

/// Labels for per-pool metrics
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct PoolLabels {
    /// Pool name
    pub pool: String,
}

/// Metrics registry with all poller server metrics
pub struct MetricsRegistry {
    /// Prometheus registry
    pub registry: Registry,

    /// Pollers running in the current generation
    pollers_active: Gauge,

    /// Supervisor generations started
    generations_total: Counter,

    /// Members per pool
    pool_members: Family<PoolLabels, Gauge>,

    /// Members per pool currently published healthy
    pool_members_healthy: Family<PoolLabels, Gauge>,
}

impl MetricsRegistry {
    /// Create a new metrics registry
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let pollers_active = Gauge::default();
        registry.register(
            "gtm_pollers_active",
            "Number of pollers running in the current generation",
            pollers_active.clone(),
        );

        // prometheus-client appends the _total suffix to counters itself
        let generations_total = Counter::default();
        registry.register(
            "gtm_generations",
            "Number of supervisor generations started",
            generations_total.clone(),
        );

        let pool_members = Family::<PoolLabels, Gauge>::default();
        registry.register(
            "gtm_pool_members",
            "Number of members in a pool",
            pool_members.clone(),
        );

        let pool_members_healthy = Family::<PoolLabels, Gauge>::default();
        registry.register(
            "gtm_pool_members_healthy",
            "Number of pool members currently published healthy",
            pool_members_healthy.clone(),
        );

        Self {
            registry,
            pollers_active,
            generations_total,
            pool_members,
            pool_members_healthy,
        }
    }

    /// Record the poller count of the current generation
    pub fn set_pollers_active(&self, count: usize) {
        self.pollers_active.set(count as i64);
    }

    /// Count a new supervisor generation
    pub fn record_generation_start(&self) {
        self.generations_total.inc();
    }

    /// Record one pool's member and healthy counts
    pub fn set_pool_members(&self, pool: &str, total: usize, healthy: usize) {
        let labels = PoolLabels {
            pool: pool.to_string(),
        };
        self.pool_members.get_or_create(&labels).set(total as i64);
        self.pool_members_healthy
            .get_or_create(&labels)
            .set(healthy as i64);
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;

    #[test]
    fn test_registry_encodes() {
        let metrics = MetricsRegistry::new();
        metrics.set_pollers_active(4);
        metrics.record_generation_start();
        metrics.set_pool_members("web", 3, 2);

        let mut buffer = String::new();
        encode(&mut buffer, &metrics.registry).unwrap();

        assert!(buffer.contains("gtm_pollers_active 4"));
        assert!(buffer.contains("gtm_generations_total 1"));
        assert!(buffer.contains(r#"gtm_pool_members_healthy{pool="web"} 2"#));
    }
}
