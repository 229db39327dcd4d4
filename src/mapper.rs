//! PID ownership views over the connection table.
//!
//! `get_pid_to_ports` and `get_pid_to_addresses` each take their own snapshot,
//! so two calls may disagree if sockets open or close in between. Use
//! [`PidPortMapper::snapshot`] when both views must describe the same instant.

use log::debug;

use crate::error::Result;
use crate::model::{
    push_unique, ConnectionRecord, Owner, OwnershipSnapshot, PidAddressMap, PidPortMap,
};
use crate::ports::HostNetwork;

/// Groups localhost sockets by owning process.
#[derive(Debug, Clone)]
pub struct PidPortMapper<N> {
    network: N,
}

impl<N: HostNetwork> PidPortMapper<N> {
    pub fn new(network: N) -> Self {
        Self { network }
    }

    /// PID to the ports it holds, in first-seen order.
    pub fn get_pid_to_ports(&self) -> Result<PidPortMap> {
        Ok(ports_by_owner(&self.network.connections()?))
    }

    /// PID to its local endpoints (`127.0.0.1:8080`, `[::1]:8080`).
    pub fn get_pid_to_addresses(&self) -> Result<PidAddressMap> {
        Ok(addresses_by_owner(&self.network.connections()?))
    }

    /// Both views from a single connection-table read.
    pub fn snapshot(&self) -> Result<OwnershipSnapshot> {
        let records = self.network.connections()?;
        let snapshot = OwnershipSnapshot {
            ports: ports_by_owner(&records),
            addresses: addresses_by_owner(&records),
        };
        debug!(
            "ownership snapshot: {} owner(s) from {} record(s)",
            snapshot.ports.len(),
            records.len()
        );
        Ok(snapshot)
    }
}

/// Groups ports by owner; unattributed sockets land under [`Owner::Unknown`].
///
/// Records with local port 0 hold nothing and are skipped.
pub fn ports_by_owner(records: &[ConnectionRecord]) -> PidPortMap {
    let mut map = PidPortMap::new();
    for record in records {
        if let Some(port) = record.port() {
            push_unique(map.entry(Owner::from(record.pid)).or_default(), port);
        }
    }
    map
}

/// Groups formatted local endpoints by owner.
pub fn addresses_by_owner(records: &[ConnectionRecord]) -> PidAddressMap {
    let mut map = PidAddressMap::new();
    for record in records.iter().filter(|r| r.port().is_some()) {
        push_unique(
            map.entry(Owner::from(record.pid)).or_default(),
            record.local_socket().to_string(),
        );
    }
    map
}
