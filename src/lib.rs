//! Localhost port and process introspection.
//!
//! - [`is_port_free`] / [`get_random_free_port`]: bind/release probes.
//! - [`list_local_connections`]: one snapshot of localhost sockets with owning PIDs.
//! - [`PortReconciler`]: busy and free subsets of a range or candidate set.
//! - [`PidPortMapper`]: PID to ports and PID to addresses.
//!
//! All OS access goes through [`HostNetwork`]; [`SystemNetwork`] is the live
//! implementation. Nothing is cached: every query reads current kernel state,
//! and any port reported free may be taken by another process before use.

pub mod config;
pub mod error;
pub mod mapper;
pub mod model;
pub mod persistence;
pub mod port;
pub mod ports;
pub mod reconcile;

pub use config::Settings;
pub use error::{ArgumentError, ConfigError, Error, ErrorKind, Result};
pub use mapper::PidPortMapper;
pub use model::{ConnectionRecord, Owner, OwnershipSnapshot, PidAddressMap, PidPortMap, Protocol};
pub use port::{Candidates, Port, PortRange};
pub use ports::{
    get_random_free_port, is_port_free, list_local_connections, parse_host, HostNetwork,
    SystemNetwork,
};
pub use reconcile::{PortReconciler, DEFAULT_PORT_RANGE};
