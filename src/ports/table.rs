//! Connection-table snapshots.
//!
//! Reads every IPv4/IPv6 TCP and UDP socket with its owning PIDs via `netstat2`
//! and keeps the ones bound to a localhost address.

use std::error::Error as StdError;
use std::io;
use std::net::IpAddr;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use log::{debug, warn};
use netstat2::{get_sockets_info, AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo};

use crate::error::{Error, Result};
use crate::model::{ConnectionRecord, Protocol};

const READ_TABLE: &str = "read the connection table";

/// A socket as reported by the OS, before localhost filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSocket {
    pub protocol: Protocol,
    pub local_addr: IpAddr,
    pub local_port: u16,
    /// Owning processes; empty when the OS would not say.
    pub pids: Vec<u32>,
}

/// True for loopback and wildcard addresses, including IPv4-mapped forms.
///
/// Wildcard binds count because they hold the port on the loopback interface too.
pub fn is_localhost(addr: IpAddr) -> bool {
    match addr {
        IpAddr::V4(v4) => v4.is_loopback() || v4.is_unspecified(),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => v4.is_loopback() || v4.is_unspecified(),
            None => v6.is_loopback() || v6.is_unspecified(),
        },
    }
}

/// Filters raw sockets to localhost and expands them into records.
///
/// A socket shared by several processes yields one record per PID; a socket
/// with no known owner yields one record with `pid: None`.
pub fn normalize<I>(sockets: I) -> Vec<ConnectionRecord>
where
    I: IntoIterator<Item = RawSocket>,
{
    let mut records = Vec::new();

    for socket in sockets {
        if !is_localhost(socket.local_addr) {
            continue;
        }

        let record = |pid| ConnectionRecord {
            pid,
            local_address: socket.local_addr,
            local_port: socket.local_port,
            protocol: socket.protocol,
        };

        if socket.pids.is_empty() {
            records.push(record(None));
        } else {
            records.extend(socket.pids.iter().map(|&pid| record(Some(pid))));
        }
    }

    records
}

/// Takes one snapshot of localhost sockets, giving up after `timeout`.
///
/// No retries and no caching: every call is a fresh read of live state.
pub fn list_local_connections(timeout: Duration) -> Result<Vec<ConnectionRecord>> {
    let raw = run_with_timeout(READ_TABLE, timeout, read_raw_sockets)?;
    let records = normalize(raw);
    debug!("connection table: {} localhost record(s)", records.len());
    Ok(records)
}

fn read_raw_sockets() -> Result<Vec<RawSocket>> {
    let af_flags = AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6;
    let proto_flags = ProtocolFlags::TCP | ProtocolFlags::UDP;
    let sockets = get_sockets_info(af_flags, proto_flags).map_err(|e| classify(&e))?;

    let raw: Vec<RawSocket> = sockets
        .into_iter()
        .map(|socket| {
            let (protocol, local_addr, local_port) = match socket.protocol_socket_info {
                ProtocolSocketInfo::Tcp(tcp) => (Protocol::Tcp, tcp.local_addr, tcp.local_port),
                ProtocolSocketInfo::Udp(udp) => (Protocol::Udp, udp.local_addr, udp.local_port),
            };
            RawSocket {
                protocol,
                local_addr,
                local_port,
                pids: socket.associated_pids,
            }
        })
        .collect();

    debug!("connection table: {} raw socket(s)", raw.len());
    Ok(raw)
}

/// Maps a table-query failure onto the crate taxonomy.
///
/// The first `io::Error` in the source chain decides between permission and
/// transient failure; the outer message is kept for context.
fn classify(err: &(dyn StdError + 'static)) -> Error {
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    let mut depth = 0;

    while let Some(e) = current {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            let message = if depth == 0 {
                io_err.to_string()
            } else {
                format!("{err}: {io_err}")
            };
            return Error::from_os(READ_TABLE, io::Error::new(io_err.kind(), message));
        }
        current = e.source();
        depth += 1;
    }

    Error::Os {
        operation: READ_TABLE.to_string(),
        source: io::Error::new(io::ErrorKind::Other, err.to_string()),
    }
}

/// Runs `query` on a worker thread and waits at most `timeout` for it.
///
/// On timeout the worker is left to finish on its own; its result is dropped.
fn run_with_timeout<T, F>(operation: &str, timeout: Duration, query: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    let (tx, rx) = mpsc::sync_channel(1);

    thread::Builder::new()
        .name("connection-table".to_string())
        .spawn(move || {
            // The receiver is gone if the caller already timed out.
            let _ = tx.send(query());
        })
        .map_err(|e| Error::from_os(format!("start a worker to {operation}"), e))?;

    match rx.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            warn!("gave up trying to {operation} after {timeout:?}");
            Err(Error::Timeout {
                operation: operation.to_string(),
                timeout,
            })
        }
        Err(RecvTimeoutError::Disconnected) => Err(Error::Os {
            operation: operation.to_string(),
            source: io::Error::new(io::ErrorKind::Other, "worker exited without a result"),
        }),
    }
}
