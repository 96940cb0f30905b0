use std::net::{IpAddr, Ipv4Addr};

use serde::Deserialize;

/// Network configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The host address.
    pub host: IpAddr,

    /// The port number.
    pub port: u16,

    /// Number of milliseconds to wait for before the first retry when accepting a
    /// new connection fails.
    pub min_backoff_ms: u64,

    /// Max number of milliseconds to wait for when retrying to accept a new connection.
    pub max_backoff_ms: u64,

    /// Max number of concurrent connections that can be served by the server.
    pub max_connections: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: crate::DEFAULT_PORT,
            min_backoff_ms: 1,
            max_backoff_ms: 64000,
            max_connections: 128,
        }
    }
}
