//! Health-check engine for the OpenGTM poller.
//!
//! Decides which backends in a named pool are usable by probing every
//! (pool, member) pair on its own schedule and publishing results into a
//! shared health table that DNS-facing readers can query without blocking
//! the pollers.
//!
//! # Components
//!
//! - **Config**: typed TCP/HTTP pool definitions with validation
//! - **HealthTable**: concurrent pool-name → member-state mapping with
//!   failure-count hysteresis
//! - **Checkers**: single-probe TCP connect and HTTP GET implementations
//! - **MemberMonitor**: the long-lived per-member polling loop
//!
//! # Example
//!
//! ```no_run
//! use healthcheck::{Config, HealthTable, MemberMonitor, TcpChecker};
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! let config = Config::default();
//! let table = Arc::new(HealthTable::new());
//! table.build_from_config(&config).await;
//!
//! let pool = config.tcp_pools[0].common.clone();
//! let checker = Arc::new(TcpChecker::new(
//!     pool.members[0].clone(),
//!     pool.port,
//!     Duration::from_secs(pool.interval),
//! ));
//!
//! let shutdown = CancellationToken::new();
//! tokio::spawn(MemberMonitor::new(checker, pool, table).run(shutdown));
//! # }
//! ```

pub mod checkers;
pub mod config;
pub mod monitor;
pub mod table;
pub mod types;

pub use checkers::{Checker, HttpChecker, TcpChecker};
pub use config::{CommonPool, Config, ConfigError, HttpPool, TcpPool};
pub use monitor::MemberMonitor;
pub use table::HealthTable;
pub use types::{Member, Observation};
