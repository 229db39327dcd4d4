//! Port newtype, inclusive port ranges and candidate sets.
//!
//! `Port` wraps `u16` with validation so that port 0 (reserved for ephemeral
//! allocation requests) can never reach a probe or a range scan.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ArgumentError;

/// A validated TCP/UDP port number (1-65535).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Port(u16);

impl Port {
    /// The minimum valid port number.
    pub const MIN: u16 = 1;

    /// The maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Creates a new `Port` from a `u16` value.
    ///
    /// # Errors
    ///
    /// Returns `ArgumentError::InvalidPort` if the value is 0.
    pub fn new(value: u16) -> Result<Self, ArgumentError> {
        if value == 0 {
            Err(ArgumentError::InvalidPort(value))
        } else {
            Ok(Port(value))
        }
    }

    /// Returns the port number as a `u16`.
    #[inline]
    pub fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u16> for Port {
    type Error = ArgumentError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Port::new(value)
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

impl FromStr for Port {
    type Err = ArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: u16 = s
            .trim()
            .parse()
            .map_err(|_| ArgumentError::InvalidPortFormat(s.to_string()))?;
        Port::new(value)
    }
}

impl Serialize for Port {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Port {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u16::deserialize(deserializer)?;
        Port::new(value).map_err(serde::de::Error::custom)
    }
}

/// An inclusive range of ports, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    /// 1024-49151, the IANA registered ports.
    pub const REGISTERED: PortRange = PortRange {
        start: Port(1024),
        end: Port(49151),
    };

    /// Creates a range from raw bounds, validating both ends.
    pub fn new(start: u16, end: u16) -> Result<Self, ArgumentError> {
        let start_port = Port::new(start)?;
        let end_port = Port::new(end)?;
        if start > end {
            return Err(ArgumentError::InvalidRange { start, end });
        }
        Ok(Self {
            start: start_port,
            end: end_port,
        })
    }

    pub fn start(&self) -> Port {
        self.start
    }

    pub fn end(&self) -> Port {
        self.end
    }

    /// Number of ports in the range.
    pub fn len(&self) -> usize {
        usize::from(self.end.0 - self.start.0) + 1
    }

    /// A validated range is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, port: Port) -> bool {
        self.start <= port && port <= self.end
    }

    /// Iterates the range in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

impl FromStr for PortRange {
    type Err = ArgumentError;

    /// Parses "start-end" (e.g. "8000-8999").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('-')
            .ok_or_else(|| ArgumentError::InvalidRangeFormat(s.to_string()))?;

        let start: u16 = start
            .trim()
            .parse()
            .map_err(|_| ArgumentError::InvalidRangeFormat(s.to_string()))?;
        let end: u16 = end
            .trim()
            .parse()
            .map_err(|_| ArgumentError::InvalidRangeFormat(s.to_string()))?;

        PortRange::new(start, end)
    }
}

// Stored as `[start, end]` in the settings file.
impl Serialize for PortRange {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        [self.start.0, self.end.0].serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PortRange {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let [start, end] = <[u16; 2]>::deserialize(deserializer)?;
        PortRange::new(start, end).map_err(serde::de::Error::custom)
    }
}

/// Ports to reconcile: a contiguous range or an explicit set.
///
/// Both forms iterate as ascending, unique ports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidates {
    Range(PortRange),
    Set(BTreeSet<Port>),
}

impl Candidates {
    /// Builds an explicit candidate set from raw port numbers.
    ///
    /// Duplicates collapse; port 0 and an empty input are rejected.
    pub fn from_ports<I>(ports: I) -> Result<Self, ArgumentError>
    where
        I: IntoIterator<Item = u16>,
    {
        let set = ports
            .into_iter()
            .map(Port::new)
            .collect::<Result<BTreeSet<_>, _>>()?;
        Candidates::try_from(set)
    }

    /// Iterates candidates in ascending order.
    pub fn iter(&self) -> Box<dyn Iterator<Item = Port> + '_> {
        match self {
            Candidates::Range(range) => Box::new(range.iter()),
            Candidates::Set(set) => Box::new(set.iter().copied()),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Candidates::Range(range) => range.len(),
            Candidates::Set(set) => set.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<PortRange> for Candidates {
    fn from(range: PortRange) -> Self {
        Candidates::Range(range)
    }
}

impl TryFrom<BTreeSet<Port>> for Candidates {
    type Error = ArgumentError;

    fn try_from(set: BTreeSet<Port>) -> Result<Self, Self::Error> {
        if set.is_empty() {
            return Err(ArgumentError::EmptyCandidates);
        }
        Ok(Candidates::Set(set))
    }
}

impl fmt::Display for Candidates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Candidates::Range(range) => write!(f, "range {range}"),
            Candidates::Set(set) => {
                let ports: Vec<String> = set.iter().map(Port::to_string).collect();
                write!(f, "ports {{{}}}", ports.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ports() {
        assert!(Port::new(1).is_ok());
        assert!(Port::new(8080).is_ok());
        assert!(Port::new(65535).is_ok());
    }

    #[test]
    fn test_invalid_port_zero() {
        assert_eq!(Port::new(0), Err(ArgumentError::InvalidPort(0)));
    }

    #[test]
    fn test_from_str() {
        assert_eq!("8080".parse::<Port>().unwrap().as_u16(), 8080);
        assert!("0".parse::<Port>().is_err());
        assert!("abc".parse::<Port>().is_err());
        assert!("70000".parse::<Port>().is_err());
    }

    #[test]
    fn test_serde_invalid_port() {
        let result: Result<Port, _> = serde_json::from_str("0");
        assert!(result.is_err());
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        assert_eq!(
            PortRange::new(9000, 8000),
            Err(ArgumentError::InvalidRange {
                start: 9000,
                end: 8000
            })
        );
        assert_eq!(PortRange::new(0, 10), Err(ArgumentError::InvalidPort(0)));
    }

    #[test]
    fn test_range_single_port() {
        let range = PortRange::new(8000, 8000).unwrap();
        assert_eq!(range.len(), 1);
        assert_eq!(range.iter().map(Port::as_u16).collect::<Vec<_>>(), vec![8000]);
    }

    #[test]
    fn test_range_full_span_len() {
        let range = PortRange::new(1, 65535).unwrap();
        assert_eq!(range.len(), 65535);
        assert_eq!(range.iter().last().map(Port::as_u16), Some(65535));
    }

    #[test]
    fn test_range_parse() {
        let range: PortRange = "8000-8999".parse().unwrap();
        assert_eq!(range.start().as_u16(), 8000);
        assert_eq!(range.end().as_u16(), 8999);
        assert_eq!(range.to_string(), "8000-8999");

        assert_eq!(
            "8000".parse::<PortRange>(),
            Err(ArgumentError::InvalidRangeFormat("8000".to_string()))
        );
        assert!("a-b".parse::<PortRange>().is_err());
        assert!("9000-8000".parse::<PortRange>().is_err());
    }

    #[test]
    fn test_range_serde_as_pair() {
        let range = PortRange::new(1024, 49151).unwrap();
        assert_eq!(serde_json::to_string(&range).unwrap(), "[1024,49151]");

        let back: PortRange = serde_json::from_str("[1024,49151]").unwrap();
        assert_eq!(back, range);

        let inverted: Result<PortRange, _> = serde_json::from_str("[10,5]");
        assert!(inverted.is_err());
    }

    #[test]
    fn test_candidates_sorted_and_unique() {
        let candidates = Candidates::from_ports([8002, 8000, 8001, 8000]).unwrap();
        let ports: Vec<u16> = candidates.iter().map(Port::as_u16).collect();
        assert_eq!(ports, vec![8000, 8001, 8002]);
        assert_eq!(candidates.len(), 3);
    }

    #[test]
    fn test_candidates_rejects_empty_and_zero() {
        assert_eq!(
            Candidates::from_ports(Vec::new()),
            Err(ArgumentError::EmptyCandidates)
        );
        assert_eq!(
            Candidates::from_ports([8000, 0]),
            Err(ArgumentError::InvalidPort(0))
        );
    }

    #[test]
    fn test_candidates_display() {
        let set = Candidates::from_ports([8001, 8000]).unwrap();
        assert_eq!(set.to_string(), "ports {8000, 8001}");

        let range = Candidates::from(PortRange::new(1, 3).unwrap());
        assert_eq!(range.to_string(), "range 1-3");
    }
}
