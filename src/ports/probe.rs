//! Bind/release probes on real sockets.
//!
//! Both probes bind a fresh TCP socket and drop it before returning, so the
//! handle is closed on every path, errors included. Neither sends data.

use std::io;
use std::net::{IpAddr, SocketAddr};

use log::{trace, warn};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};

use crate::error::{Error, Result};
use crate::port::Port;

/// Opens a TCP socket and binds it to `addr`.
///
/// `SO_REUSEADDR` is left off: with it, a port held by a listener in another
/// process can look bindable on some platforms.
fn bind_socket(addr: SocketAddr) -> io::Result<Socket> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.bind(&SockAddr::from(addr))?;
    Ok(socket)
}

/// Checks whether `port` can be bound on `host` right now.
///
/// Returns `Ok(false)` only when the address is in use. Any other failure is an
/// error, so a missing interface or a privileged port is never reported as busy.
pub fn is_port_free(host: IpAddr, port: Port) -> Result<bool> {
    let addr = SocketAddr::new(host, port.as_u16());

    match bind_socket(addr) {
        Ok(socket) => {
            drop(socket);
            trace!("probe {addr}: free");
            Ok(true)
        }
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            trace!("probe {addr}: busy");
            Ok(false)
        }
        Err(e) => Err(Error::from_os(format!("probe {addr}"), e)),
    }
}

/// Lets the kernel pick a free ephemeral port on `host` and returns it.
///
/// The port was free when the socket was bound; it is released before this
/// returns, so another process may take it before the caller uses it.
pub fn get_random_free_port(host: IpAddr) -> Result<Port> {
    let addr = SocketAddr::new(host, 0);
    let mut last_error = None;

    // Bind and read-back are not atomic; one retry covers a lost read-back.
    for attempt in 1..=2 {
        let socket = match bind_socket(addr) {
            Ok(socket) => socket,
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                return Err(Error::EphemeralExhausted {
                    host: host.to_string(),
                    source: e,
                });
            }
            Err(e) => return Err(Error::from_os(format!("bind {addr}"), e)),
        };

        let assigned = socket
            .local_addr()
            .and_then(|local| {
                local.as_socket().map(|s| s.port()).ok_or_else(|| {
                    io::Error::new(io::ErrorKind::InvalidData, "not an inet address")
                })
            })
            .and_then(|port| {
                Port::new(port).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
            });
        drop(socket);

        match assigned {
            Ok(port) => {
                trace!("ephemeral port on {host}: {port}");
                return Ok(port);
            }
            Err(e) => {
                warn!("attempt {attempt}: could not read back ephemeral port on {host}: {e}");
                last_error = Some(e);
            }
        }
    }

    Err(Error::Os {
        operation: format!("read back the ephemeral port bound on {host}"),
        source: last_error.unwrap_or_else(|| io::Error::from(io::ErrorKind::Other)),
    })
}
