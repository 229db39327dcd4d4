//! Busy/free reconciliation of port ranges and candidate sets.

use std::collections::{BTreeSet, HashSet};
use std::net::{IpAddr, Ipv4Addr};

use log::debug;

use crate::error::{Error, Result};
use crate::model::ConnectionRecord;
use crate::port::{Candidates, Port, PortRange};
use crate::ports::HostNetwork;

/// Range used when the caller supplies none: the IANA registered ports.
pub const DEFAULT_PORT_RANGE: PortRange = PortRange::REGISTERED;

/// Computes busy and free port sets against one connection-table snapshot.
///
/// Holds its default range and probe host as plain values so tests and the
/// settings file can override them.
#[derive(Debug, Clone)]
pub struct PortReconciler<N> {
    network: N,
    default_range: PortRange,
    host: IpAddr,
}

impl<N: HostNetwork> PortReconciler<N> {
    /// Creates a reconciler probing 127.0.0.1 over [`DEFAULT_PORT_RANGE`].
    pub fn new(network: N) -> Self {
        Self {
            network,
            default_range: DEFAULT_PORT_RANGE,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        }
    }

    pub fn with_default_range(mut self, range: PortRange) -> Self {
        self.default_range = range;
        self
    }

    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    pub fn default_range(&self) -> PortRange {
        self.default_range
    }

    pub fn host(&self) -> IpAddr {
        self.host
    }

    /// Candidates that appear in the current snapshot, ascending.
    pub fn get_busy_ports(&self, candidates: &Candidates) -> Result<Vec<Port>> {
        let busy = self.busy_set()?;
        Ok(candidates.iter().filter(|port| busy.contains(port)).collect())
    }

    /// Every localhost port in the current snapshot, ascending.
    pub fn get_all_busy_ports(&self) -> Result<Vec<Port>> {
        let busy: BTreeSet<Port> = self
            .snapshot()?
            .iter()
            .filter_map(ConnectionRecord::port)
            .collect();
        Ok(busy.into_iter().collect())
    }

    /// Ports in `range` (default range when `None`) absent from the snapshot.
    pub fn get_free_ports(&self, range: Option<PortRange>) -> Result<Vec<Port>> {
        let range = range.unwrap_or(self.default_range);
        let busy = self.busy_set()?;
        Ok(range.iter().filter(|port| !busy.contains(port)).collect())
    }

    /// Smallest candidate that is absent from the snapshot and binds right now.
    ///
    /// Ports held by any socket in the snapshot (TCP or UDP) are skipped; the
    /// rest are probed in ascending order, since the snapshot can lag the kernel.
    /// Falls back to the default range when `None`.
    pub fn get_minimum_free_port(&self, candidates: Option<&Candidates>) -> Result<Port> {
        let default_candidates;
        let candidates = match candidates {
            Some(candidates) => candidates,
            None => {
                default_candidates = Candidates::Range(self.default_range);
                &default_candidates
            }
        };

        let busy = self.busy_set()?;
        for port in candidates.iter().filter(|port| !busy.contains(port)) {
            if self.network.is_port_free(self.host, port)? {
                debug!("minimum free port in {candidates}: {port}");
                return Ok(port);
            }
        }

        Err(Error::NoFreePort {
            candidates: candidates.to_string(),
        })
    }

    /// An ephemeral port chosen by the kernel on the configured host.
    pub fn get_random_free_port(&self) -> Result<Port> {
        self.network.ephemeral_port(self.host)
    }

    /// Checks one port on the configured host.
    pub fn is_port_free(&self, port: Port) -> Result<bool> {
        self.network.is_port_free(self.host, port)
    }

    fn snapshot(&self) -> Result<Vec<ConnectionRecord>> {
        self.network.connections()
    }

    // Built once per call so membership tests never go back to the OS.
    fn busy_set(&self) -> Result<HashSet<Port>> {
        let busy: HashSet<Port> = self
            .snapshot()?
            .iter()
            .filter_map(ConnectionRecord::port)
            .collect();
        debug!("{} busy localhost port(s) in snapshot", busy.len());
        Ok(busy)
    }
}
