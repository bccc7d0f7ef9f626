//! Core types shared between pollers and the health table.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Published state of a single pool member. This is the main way state is
/// shared between pollers and the API, so the serialized field order is part
/// of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// Host name or literal IP address from the pool config
    pub host: String,

    /// Last successfully resolved address for `host`; the pool's fallback IP
    /// until the first resolution
    pub ip: IpAddr,

    /// Up/down status after hysteresis
    pub healthy: bool,

    /// Consecutive failed checks, saturating at the pool's failure threshold
    pub failures: u32,
}

/// Outcome of a single probe, before hysteresis is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    /// The probed member's configured host
    pub host: String,

    /// Address the host resolved to for this cycle
    pub ip: IpAddr,

    /// Raw probe verdict
    pub healthy: bool,
}

impl Observation {
    /// Create an observation for a successful probe.
    pub fn up(host: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            host: host.into(),
            ip,
            healthy: true,
        }
    }

    /// Create an observation for a failed probe.
    pub fn down(host: impl Into<String>, ip: IpAddr) -> Self {
        Self {
            host: host.into(),
            ip,
            healthy: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_serialized_field_order() {
        let member = Member {
            host: "host1".to_string(),
            ip: "1.1.1.1".parse().unwrap(),
            healthy: false,
            failures: 0,
        };

        let json = serde_json::to_string(&member).unwrap();
        assert_eq!(
            json,
            r#"{"host":"host1","ip":"1.1.1.1","healthy":false,"failures":0}"#
        );
    }

    #[test]
    fn test_observation_constructors() {
        let ip: IpAddr = "10.0.0.1".parse().unwrap();
        assert!(Observation::up("h", ip).healthy);
        assert!(!Observation::down("h", ip).healthy);
    }
}
