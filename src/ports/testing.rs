//! In-memory `HostNetwork` for reconciler and mapper tests.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::model::{ConnectionRecord, Protocol};
use crate::port::Port;

use super::HostNetwork;

/// Fixed connection table plus a set of ports that refuse to bind.
///
/// Counts every call so tests can assert that validation happens first.
#[derive(Debug, Default)]
pub(crate) struct FakeNetwork {
    records: Vec<ConnectionRecord>,
    bound: HashSet<u16>,
    ephemeral: Option<u16>,
    table_calls: AtomicUsize,
    probe_calls: AtomicUsize,
}

impl FakeNetwork {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// PID 100 holds 8000 and 8001, PID 200 holds 9000; all three refuse to bind.
    pub(crate) fn sample() -> Self {
        Self::new()
            .with_socket(Some(100), "127.0.0.1", 8000, Protocol::Tcp)
            .with_socket(Some(100), "127.0.0.1", 8001, Protocol::Tcp)
            .with_socket(Some(200), "127.0.0.1", 9000, Protocol::Tcp)
    }

    /// Adds a table record; the port also becomes unbindable.
    pub(crate) fn with_socket(
        self,
        pid: Option<u32>,
        addr: &str,
        port: u16,
        protocol: Protocol,
    ) -> Self {
        let mut network = self.with_table_only(pid, addr, port, protocol);
        network.bound.insert(port);
        network
    }

    /// Adds a table record while a TCP bind on the port still succeeds,
    /// as with a UDP-only socket.
    pub(crate) fn with_table_only(
        mut self,
        pid: Option<u32>,
        addr: &str,
        port: u16,
        protocol: Protocol,
    ) -> Self {
        self.records.push(ConnectionRecord {
            pid,
            local_address: addr.parse().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            local_port: port,
            protocol,
        });
        self
    }

    /// Marks a port unbindable without a table record (a stale snapshot).
    pub(crate) fn with_hidden_binding(mut self, port: u16) -> Self {
        self.bound.insert(port);
        self
    }

    pub(crate) fn with_ephemeral(mut self, port: u16) -> Self {
        self.ephemeral = Some(port);
        self
    }

    pub(crate) fn table_calls(&self) -> usize {
        self.table_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn os_calls(&self) -> usize {
        self.table_calls() + self.probe_calls()
    }
}

impl HostNetwork for FakeNetwork {
    fn connections(&self) -> Result<Vec<ConnectionRecord>> {
        self.table_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.records.clone())
    }

    fn is_port_free(&self, _host: IpAddr, port: Port) -> Result<bool> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(!self.bound.contains(&port.as_u16()))
    }

    fn ephemeral_port(&self, host: IpAddr) -> Result<Port> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        match self.ephemeral {
            Some(port) => Ok(Port::new(port)?),
            None => Err(Error::EphemeralExhausted {
                host: host.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
            }),
        }
    }
}
