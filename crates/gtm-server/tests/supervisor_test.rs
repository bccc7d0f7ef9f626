//! Integration tests for the Supervisor component

use gtm_server::supervisor::{Supervisor, spawn_pollers};
use healthcheck::config::{CommonPool, Config, HttpPool, TcpPool};
use healthcheck::table::HealthTable;
use healthcheck::types::Observation;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

fn common(name: &str, members: Vec<String>) -> CommonPool {
    CommonPool {
        name: name.to_string(),
        port: 1,
        members,
        fallback_ip: "127.0.0.1".parse().unwrap(),
        interval: 1,
        failure_threshold: 3,
    }
}

/// One TCP pool with ten members nothing will ever answer for
fn ten_member_config() -> Config {
    let members = (0..10).map(|i| format!("host{i}.invalid")).collect();
    Config {
        http_pools: vec![],
        tcp_pools: vec![TcpPool {
            common: common("big", members),
        }],
    }
}

#[tokio::test]
async fn test_spawns_one_poller_per_member() {
    let config = Config {
        http_pools: vec![HttpPool {
            common: common("web", vec!["a.invalid".to_string(), "b.invalid".to_string()]),
            send: "/h".to_string(),
            host_header: String::new(),
            https_enabled: false,
            https_require_validity: false,
            receive_up_string: String::new(),
            receive_up_codes: vec![200],
        }],
        tcp_pools: vec![TcpPool {
            common: common("db", vec!["c.invalid".to_string()]),
        }],
    };

    let table = Arc::new(HealthTable::new());
    let shutdown = CancellationToken::new();
    let mut pollers = spawn_pollers(&config, table, shutdown.clone());

    assert_eq!(pollers.len(), 3);

    shutdown.cancel();
    timeout(Duration::from_secs(2), async {
        while pollers.join_next().await.is_some() {}
    })
    .await
    .expect("pollers should drain after cancel");
}

#[tokio::test]
async fn test_cancellation_converges_within_two_seconds() {
    let config = ten_member_config();
    let table = Arc::new(HealthTable::new());
    table.build_from_config(&config).await;

    let shutdown = CancellationToken::new();
    let mut pollers = spawn_pollers(&config, table.clone(), shutdown.clone());
    assert_eq!(pollers.len(), 10);

    // Let the generation settle into its polling loops, then pull the plug
    tokio::time::sleep(Duration::from_millis(300)).await;
    shutdown.cancel();

    timeout(Duration::from_secs(2), async {
        while pollers.join_next().await.is_some() {}
    })
    .await
    .expect("all pollers should exit within 2s of cancellation");

    // A fresh generation spawns the full set again
    let shutdown = CancellationToken::new();
    let pollers = spawn_pollers(&config, table, shutdown.clone());
    assert_eq!(pollers.len(), 10);
    shutdown.cancel();
}

#[tokio::test]
async fn test_supervisor_restart_rebuilds_table() {
    let config = Config {
        http_pools: vec![],
        tcp_pools: vec![TcpPool {
            common: common("p1", vec!["127.0.0.1".to_string()]),
        }],
    };
    let seeded = config.tcp_pools[0].common.clone();

    let config = Arc::new(RwLock::new(config));
    let table = Arc::new(HealthTable::new());
    let supervisor = Supervisor::new(config.clone(), table.clone(), None);
    let handle = supervisor.handle();
    let supervisor_task = tokio::spawn(supervisor.run());

    tokio::time::sleep(Duration::from_millis(200)).await;

    // Plant a pool the config does not know about; the rebuild must drop it
    let ghost = common("ghost", vec!["g".to_string()]);
    table
        .set_health(&ghost, Observation::down("g", "9.9.9.9".parse().unwrap()))
        .await;
    assert!(table.snapshot_json().await.unwrap().contains("ghost"));

    handle.cancel().await;

    timeout(Duration::from_secs(3), async {
        loop {
            let json = table.snapshot_json().await.unwrap();
            if !json.contains("ghost") && json.contains(&seeded.name) {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("restart should rebuild the table from config");

    supervisor_task.abort();
}

#[tokio::test]
async fn test_empty_config_parks_until_cancel() {
    let config = Arc::new(RwLock::new(Config {
        http_pools: vec![],
        tcp_pools: vec![],
    }));
    let table = Arc::new(HealthTable::new());
    let supervisor = Supervisor::new(config.clone(), table.clone(), None);
    let handle = supervisor.handle();
    let supervisor_task = tokio::spawn(supervisor.run());

    // Parked: no pollers, no spin. Reconfigure and wake it
    tokio::time::sleep(Duration::from_millis(100)).await;
    *config.write().await = Config {
        http_pools: vec![],
        tcp_pools: vec![TcpPool {
            common: common("late", vec!["127.0.0.1".to_string()]),
        }],
    };
    handle.cancel().await;

    timeout(Duration::from_secs(3), async {
        loop {
            if table.snapshot_json().await.unwrap().contains("late") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("supervisor should pick up the new config after cancel");

    supervisor_task.abort();
}
