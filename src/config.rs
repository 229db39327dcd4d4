//! User settings: default scan range, probe host and table timeout.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ArgumentError, Result};
use crate::mapper::PidPortMapper;
use crate::port::PortRange;
use crate::ports::{parse_host, SystemNetwork, DEFAULT_TABLE_TIMEOUT};
use crate::reconcile::{PortReconciler, DEFAULT_PORT_RANGE};

/// Settings stored as TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Range scanned when a command is given no ports (e.g. `[1024, 49151]`).
    #[serde(default = "default_range")]
    pub default_range: PortRange,

    /// Host probed for bindability: `localhost` or an IP literal.
    #[serde(default = "default_host")]
    pub host: String,

    /// Upper bound on a connection-table query, in milliseconds. Must be positive.
    #[serde(
        default = "default_table_timeout_ms",
        deserialize_with = "deserialize_table_timeout_ms"
    )]
    pub table_timeout_ms: u64,
}

fn default_range() -> PortRange {
    DEFAULT_PORT_RANGE
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_table_timeout_ms() -> u64 {
    DEFAULT_TABLE_TIMEOUT.as_millis() as u64
}

fn deserialize_table_timeout_ms<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match u64::deserialize(deserializer)? {
        0 => Err(serde::de::Error::custom(
            "table_timeout_ms must be greater than 0",
        )),
        ms => Ok(ms),
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_range: default_range(),
            host: default_host(),
            table_timeout_ms: default_table_timeout_ms(),
        }
    }
}

impl Settings {
    /// The configured host, resolved.
    pub fn host_addr(&self) -> std::result::Result<IpAddr, ArgumentError> {
        parse_host(&self.host)
    }

    pub fn table_timeout(&self) -> Duration {
        Duration::from_millis(self.table_timeout_ms)
    }

    /// The live network with this timeout applied.
    pub fn network(&self) -> SystemNetwork {
        SystemNetwork::new().with_table_timeout(self.table_timeout())
    }

    /// A reconciler over the live network using these defaults.
    pub fn reconciler(&self) -> Result<PortReconciler<SystemNetwork>> {
        Ok(PortReconciler::new(self.network())
            .with_default_range(self.default_range)
            .with_host(self.host_addr()?))
    }

    pub fn mapper(&self) -> PidPortMapper<SystemNetwork> {
        PidPortMapper::new(self.network())
    }

    /// Parses "start-end" and stores it as the default range.
    pub fn set_range(&mut self, spec: &str) -> Result<PortRange> {
        let range: PortRange = spec.parse()?;
        self.default_range = range;
        Ok(range)
    }

    /// Validates and stores the probe host.
    pub fn set_host(&mut self, host: &str) -> Result<IpAddr> {
        let addr = parse_host(host)?;
        self.host = host.trim().to_string();
        Ok(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::net::Ipv4Addr;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.default_range, DEFAULT_PORT_RANGE);
        assert_eq!(settings.host_addr().unwrap(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(settings.table_timeout(), DEFAULT_TABLE_TIMEOUT);
    }

    #[test]
    fn test_missing_keys_fall_back_to_defaults() {
        let settings: Settings = toml::from_str("host = \"::1\"").unwrap();
        assert_eq!(settings.host, "::1");
        assert_eq!(settings.default_range, DEFAULT_PORT_RANGE);
        assert_eq!(settings.table_timeout_ms, 5000);
    }

    #[test]
    fn test_toml_roundtrip() {
        let settings = Settings {
            default_range: PortRange::new(8000, 8999).unwrap(),
            host: "127.0.0.1".to_string(),
            table_timeout_ms: 250,
        };

        let text = toml::to_string_pretty(&settings).unwrap();
        let back: Settings = toml::from_str(&text).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_inverted_range_rejected_on_load() {
        let result: std::result::Result<Settings, _> =
            toml::from_str("default_range = [9000, 8000]");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_table_timeout_rejected_on_load() {
        let result: std::result::Result<Settings, _> = toml::from_str("table_timeout_ms = 0");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("table_timeout_ms must be greater than 0"));

        let settings: Settings = toml::from_str("table_timeout_ms = 1").unwrap();
        assert_eq!(settings.table_timeout(), Duration::from_millis(1));
    }

    #[test]
    fn test_set_range() {
        let mut settings = Settings::default();

        let range = settings.set_range("3000-3999").unwrap();
        assert_eq!(range, PortRange::new(3000, 3999).unwrap());
        assert_eq!(settings.default_range, range);

        let err = settings.set_range("3999-3000").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(settings.default_range, range);
    }

    #[test]
    fn test_set_host() {
        let mut settings = Settings::default();

        settings.set_host(" ::1 ").unwrap();
        assert_eq!(settings.host, "::1");

        let err = settings.set_host("example..com").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(settings.host, "::1");
    }

    #[test]
    fn test_reconciler_uses_settings() {
        let settings = Settings {
            default_range: PortRange::new(4000, 4010).unwrap(),
            host: "127.0.0.1".to_string(),
            table_timeout_ms: 1000,
        };

        let reconciler = settings.reconciler().unwrap();
        assert_eq!(reconciler.default_range(), settings.default_range);
        assert_eq!(reconciler.host(), IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    #[test]
    fn test_reconciler_rejects_bad_host() {
        let settings = Settings {
            host: "nope".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            settings.reconciler().unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }
}
