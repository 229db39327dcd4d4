//! Data models for connection-table snapshots and PID ownership maps.

use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Serialize, Serializer};

use crate::port::Port;

/// Transport protocol of a socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
        }
    }
}

/// One localhost socket from a connection-table snapshot.
///
/// `pid` is `None` when the OS would not attribute the socket to a process
/// (insufficient privilege, kernel-owned sockets). The port is occupied either way.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ConnectionRecord {
    pub pid: Option<u32>,
    pub local_address: IpAddr,
    pub local_port: u16,
    pub protocol: Protocol,
}

impl ConnectionRecord {
    /// Local endpoint as a socket address (`127.0.0.1:80`, `[::1]:80`).
    pub fn local_socket(&self) -> SocketAddr {
        SocketAddr::new(self.local_address, self.local_port)
    }

    /// Local port, or `None` for unbound sockets reporting port 0.
    pub fn port(&self) -> Option<Port> {
        Port::new(self.local_port).ok()
    }
}

/// Key of a PID ownership map.
///
/// Known PIDs sort ascending; `Unknown` collects unattributed sockets and sorts last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Owner {
    Pid(u32),
    Unknown,
}

impl From<Option<u32>> for Owner {
    fn from(pid: Option<u32>) -> Self {
        pid.map_or(Owner::Unknown, Owner::Pid)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Owner::Pid(pid) => write!(f, "{pid}"),
            Owner::Unknown => f.write_str("unknown"),
        }
    }
}

// JSON object keys must be strings.
impl Serialize for Owner {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// PID to the ports it holds, first-seen order, no duplicates.
pub type PidPortMap = BTreeMap<Owner, Vec<Port>>;

/// PID to its local endpoints formatted as socket addresses.
pub type PidAddressMap = BTreeMap<Owner, Vec<String>>;

/// Both ownership views built from the same connection-table snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnershipSnapshot {
    pub ports: PidPortMap,
    pub addresses: PidAddressMap,
}

/// Appends `value` unless it is already present, keeping first-seen order.
pub(crate) fn push_unique<T: PartialEq>(list: &mut Vec<T>, value: T) {
    if !list.contains(&value) {
        list.push(value);
    }
}
