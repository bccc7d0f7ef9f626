//! Single-probe health check implementations.

use crate::config::HttpPool;
use crate::types::Observation;
use async_trait::async_trait;
use reqwest::header;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

/// One probe of one pool member.
///
/// `None` means the cycle produced no reading at all (DNS resolution failed
/// or returned nothing) and the table must not be updated.
#[async_trait]
pub trait Checker: Send + Sync {
    /// Perform a single probe
    async fn check(&self) -> Option<Observation>;

    /// The configured host this checker probes
    fn host(&self) -> &str;

    /// Probe kind, for logs
    fn kind(&self) -> &'static str;
}

/// Resolve a host through the OS resolver and take the first address.
async fn resolve(host: &str) -> Option<IpAddr> {
    match tokio::net::lookup_host((host, 0u16)).await {
        Ok(mut addrs) => addrs.next().map(|addr| addr.ip()),
        Err(e) => {
            warn!(host, error = %e, "dns resolution failed");
            None
        }
    }
}

/// TCP connect checker: the member is up if a connection can be established.
pub struct TcpChecker {
    host: String,
    port: u16,
    /// Connect deadline; one probe interval, so a stuck SYN cannot delay
    /// more than one cycle
    timeout: Duration,
}

impl TcpChecker {
    /// Create a new TCP checker
    pub fn new(host: String, port: u16, timeout: Duration) -> Self {
        Self {
            host,
            port,
            timeout,
        }
    }
}

#[async_trait]
impl Checker for TcpChecker {
    async fn check(&self) -> Option<Observation> {
        let ip = resolve(&self.host).await?;
        let addr = SocketAddr::new(ip, self.port);

        match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                // Close immediately on success; close errors don't matter
                drop(stream);
                debug!(host = %self.host, %addr, "tcp check successful");
                Some(Observation::up(self.host.clone(), ip))
            }
            Ok(Err(e)) => {
                debug!(host = %self.host, %addr, error = %e, "tcp check failed");
                Some(Observation::down(self.host.clone(), ip))
            }
            Err(_) => {
                debug!(host = %self.host, %addr, "tcp check timed out");
                Some(Observation::down(self.host.clone(), ip))
            }
        }
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn kind(&self) -> &'static str {
        "tcp"
    }
}

/// HTTP GET checker: status-code match supersedes any body checking.
pub struct HttpChecker {
    host: String,
    url: String,
    host_header: String,
    up_codes: Vec<u16>,
    up_string: String,
    client: reqwest::Client,
}

impl HttpChecker {
    /// Build a checker for one member of an HTTP pool. The client lives for
    /// the whole poller: request timeout equals the probe interval and
    /// connection reuse is disabled so a pooled socket cannot mask a backend
    /// failure.
    pub fn new(pool: &HttpPool, host: &str) -> Result<Self, reqwest::Error> {
        let scheme = if pool.https_enabled { "https" } else { "http" };
        let url = format!("{}://{}:{}{}", scheme, host, pool.common.port, pool.send);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(pool.common.interval))
            .danger_accept_invalid_certs(!pool.https_require_validity)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(Self {
            host: host.to_string(),
            url,
            host_header: pool.host_header.clone(),
            up_codes: pool.receive_up_codes.clone(),
            up_string: pool.receive_up_string.clone(),
            client,
        })
    }

    /// Verdict decided by the status line alone: `Some(true)` on a
    /// receive-up code, `Some(false)` when there is no body check to fall
    /// back on, `None` when the body must be read.
    fn status_verdict(&self, status: u16) -> Option<bool> {
        if self.up_codes.contains(&status) {
            return Some(true);
        }
        if self.up_string.is_empty() {
            return Some(false);
        }
        None
    }

    /// Case-sensitive byte-substring search for the receive-up string.
    fn body_contains_marker(&self, body: &[u8]) -> bool {
        let needle = self.up_string.as_bytes();
        body.windows(needle.len()).any(|window| window == needle)
    }
}

#[async_trait]
impl Checker for HttpChecker {
    async fn check(&self) -> Option<Observation> {
        let ip = resolve(&self.host).await?;

        let mut request = self.client.get(&self.url);
        if !self.host_header.is_empty() {
            request = request.header(header::HOST, &self.host_header);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %self.url, error = %e, "http check failed");
                return Some(Observation::down(self.host.clone(), ip));
            }
        };

        let status = response.status().as_u16();
        let healthy = match self.status_verdict(status) {
            Some(verdict) => verdict,
            None => match response.bytes().await {
                Ok(body) => self.body_contains_marker(&body),
                Err(e) => {
                    debug!(url = %self.url, error = %e, "http body read failed");
                    false
                }
            },
        };

        debug!(url = %self.url, status, healthy, "http check complete");
        Some(Observation {
            host: self.host.clone(),
            ip,
            healthy,
        })
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn kind(&self) -> &'static str {
        "http"
    }
}
