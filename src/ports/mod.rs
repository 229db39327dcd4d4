//! Host network access.
//!
//! Everything that touches live OS state goes through [`HostNetwork`]: the
//! connection-table snapshot and the bind/release probes. [`SystemNetwork`]
//! is the real implementation; the reconciler and mapper are generic over the
//! trait so they can run against an in-memory table.

mod probe;
mod table;

#[cfg(test)]
pub(crate) mod testing;

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::error::{ArgumentError, Result};
use crate::model::ConnectionRecord;
use crate::port::Port;

pub use probe::{get_random_free_port, is_port_free};
pub use table::{is_localhost, list_local_connections, normalize, RawSocket};

/// How long a connection-table query may run before it is abandoned.
pub const DEFAULT_TABLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Capability interface over the host's sockets.
pub trait HostNetwork: Send + Sync {
    /// Takes one snapshot of localhost sockets.
    fn connections(&self) -> Result<Vec<ConnectionRecord>>;

    /// Reports whether `port` can be bound on `host` right now.
    fn is_port_free(&self, host: IpAddr, port: Port) -> Result<bool>;

    /// Asks the kernel for an ephemeral port on `host`.
    fn ephemeral_port(&self, host: IpAddr) -> Result<Port>;
}

impl<T: HostNetwork + ?Sized> HostNetwork for &T {
    fn connections(&self) -> Result<Vec<ConnectionRecord>> {
        (**self).connections()
    }

    fn is_port_free(&self, host: IpAddr, port: Port) -> Result<bool> {
        (**self).is_port_free(host, port)
    }

    fn ephemeral_port(&self, host: IpAddr) -> Result<Port> {
        (**self).ephemeral_port(host)
    }
}

/// The live OS: real sockets and the kernel's connection table.
#[derive(Debug, Clone, Copy)]
pub struct SystemNetwork {
    table_timeout: Duration,
}

impl SystemNetwork {
    pub fn new() -> Self {
        Self {
            table_timeout: DEFAULT_TABLE_TIMEOUT,
        }
    }

    /// Overrides the bound on connection-table queries.
    pub fn with_table_timeout(mut self, timeout: Duration) -> Self {
        self.table_timeout = timeout;
        self
    }

    pub fn table_timeout(&self) -> Duration {
        self.table_timeout
    }
}

impl Default for SystemNetwork {
    fn default() -> Self {
        Self::new()
    }
}

impl HostNetwork for SystemNetwork {
    fn connections(&self) -> Result<Vec<ConnectionRecord>> {
        list_local_connections(self.table_timeout)
    }

    fn is_port_free(&self, host: IpAddr, port: Port) -> Result<bool> {
        is_port_free(host, port)
    }

    fn ephemeral_port(&self, host: IpAddr) -> Result<Port> {
        get_random_free_port(host)
    }
}

/// Resolves a host argument: `localhost` or an IP literal.
pub fn parse_host(host: &str) -> std::result::Result<IpAddr, ArgumentError> {
    let trimmed = host.trim();
    if trimmed.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
    trimmed
        .trim_start_matches('[')
        .trim_end_matches(']')
        .parse()
        .map_err(|_| ArgumentError::InvalidHost(host.to_string()))
}
