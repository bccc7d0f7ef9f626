//! OpenGTM poller server.
//!
//! Wires the health-check engine into a running service:
//!
//! - **Supervisor**: owns the cancellation token of the current generation,
//!   spawns one poller per (pool, member), rebuilds the table and respawns
//!   the whole set on cancel or reconfigure
//! - **API**: axum surface for DNS-side readers (`/health/{pool}`,
//!   `/healthtable`) and operators (`/config`, `/cancel`, probes, metrics)
//! - **Metrics**: Prometheus gauges and counters sampled from the table
//!
//! Two binaries are built from this crate: `poller` (the GTM itself, port
//! 8080) and `responder` (a thin JSON health-table store, port 8081).

pub mod api;
pub mod metrics;
pub mod supervisor;

pub use api::AppState;
pub use metrics::MetricsRegistry;
pub use supervisor::{spawn_pollers, Supervisor, SupervisorHandle};
