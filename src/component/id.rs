//! Component identifiers
//!
//! A component ID has the textual form `<Letter><Serial>[|<IP>:<Port>]`, for
//! example `D1|127.0.0.1:8080` or `A7`. The letter encodes the component's
//! role. IDs are never trusted once built: every consumer re-derives their
//! parts with [`ComponentId::split`].

use super::ComponentError;
use crate::ErrorType;
use serde::Serialize;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

/// The role a component plays in the crawl pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentType {
    Downloader,
    Analyzer,
    Pipeline,
}

impl ComponentType {
    /// All roles, in pipeline order
    pub const ALL: [ComponentType; 3] = [
        ComponentType::Downloader,
        ComponentType::Analyzer,
        ComponentType::Pipeline,
    ];

    /// Returns the letter used for this role in component IDs
    pub fn letter(self) -> char {
        match self {
            ComponentType::Downloader => 'D',
            ComponentType::Analyzer => 'A',
            ComponentType::Pipeline => 'P',
        }
    }

    /// Maps an ID letter back to its role
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'D' => Some(ComponentType::Downloader),
            'A' => Some(ComponentType::Analyzer),
            'P' => Some(ComponentType::Pipeline),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ComponentType::Downloader => "downloader",
            ComponentType::Analyzer => "analyzer",
            ComponentType::Pipeline => "pipeline",
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComponentType {
    type Err = ComponentError;

    /// Accepts either the role name (`"analyzer"`) or its ID letter (`"A"`)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        if let (Some(letter), None) = (chars.next(), chars.next()) {
            if let Some(component_type) = ComponentType::from_letter(letter) {
                return Ok(component_type);
            }
        }
        ComponentType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ComponentError::IllegalParameter(format!("unknown component type: {}", s)))
    }
}

impl From<ComponentType> for ErrorType {
    fn from(component_type: ComponentType) -> Self {
        match component_type {
            ComponentType::Downloader => ErrorType::Downloader,
            ComponentType::Analyzer => ErrorType::Analyzer,
            ComponentType::Pipeline => ErrorType::Pipeline,
        }
    }
}

/// Network address a component is reachable at
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentAddr {
    network: String,
    addr: SocketAddr,
}

impl ComponentAddr {
    /// Builds an address, checking the network name and the IP literal
    ///
    /// # Arguments
    ///
    /// * `network` - Either `"http"` or `"https"`
    /// * `ip` - An IPv4 or IPv6 literal
    /// * `port` - The port number
    pub fn new(network: &str, ip: &str, port: u16) -> Result<Self, ComponentError> {
        if network != "http" && network != "https" {
            return Err(ComponentError::IllegalParameter(format!(
                "illegal network for component address: {}",
                network
            )));
        }
        let ip: IpAddr = ip.parse().map_err(|_| {
            ComponentError::IllegalParameter(format!("illegal IP for component address: {}", ip))
        })?;
        Ok(Self {
            network: network.to_string(),
            addr: SocketAddr::new(ip, port),
        })
    }

    pub fn network(&self) -> &str {
        &self.network
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.addr
    }
}

impl fmt::Display for ComponentAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.addr)
    }
}

/// The parts a component ID decodes into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdParts {
    pub component_type: ComponentType,
    pub serial_number: u64,
    pub addr: Option<SocketAddr>,
}

/// Opaque component identifier
///
/// Any string can be wrapped; legality is checked by [`ComponentId::split`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    /// Generates the ID of a component from its parts
    ///
    /// # Example
    ///
    /// ```
    /// use webcrawler::component::{ComponentAddr, ComponentId, ComponentType};
    ///
    /// let addr = ComponentAddr::new("http", "127.0.0.1", 8080).unwrap();
    /// let id = ComponentId::generate(ComponentType::Downloader, 1, Some(&addr));
    /// assert_eq!(id.as_str(), "D1|127.0.0.1:8080");
    /// ```
    pub fn generate(
        component_type: ComponentType,
        serial_number: u64,
        addr: Option<&ComponentAddr>,
    ) -> Self {
        let id = match addr {
            Some(addr) => format!("{}{}|{}", component_type.letter(), serial_number, addr),
            None => format!("{}{}", component_type.letter(), serial_number),
        };
        Self(id)
    }

    /// Decodes the ID into its role, serial number and optional address
    pub fn split(&self) -> Result<IdParts, ComponentError> {
        let id = self.0.as_str();
        let letter = id
            .chars()
            .next()
            .ok_or_else(|| ComponentError::IllegalParameter("insufficient component ID".to_string()))?;
        let component_type = ComponentType::from_letter(letter).ok_or_else(|| {
            ComponentError::IllegalParameter(format!("illegal component type letter: {}", letter))
        })?;

        let rest = &id[letter.len_utf8()..];
        let (sn_part, addr_part) = match rest.split_once('|') {
            Some((sn, addr)) => (sn, Some(addr)),
            None => (rest, None),
        };

        let serial_number = parse_serial_number(sn_part).ok_or_else(|| {
            ComponentError::IllegalParameter(format!("illegal component serial number: {}", sn_part))
        })?;

        let addr = match addr_part {
            Some(addr) => Some(addr.parse::<SocketAddr>().map_err(|_| {
                ComponentError::IllegalParameter(format!("illegal component address: {}", addr))
            })?),
            None => None,
        };

        Ok(IdParts {
            component_type,
            serial_number,
            addr,
        })
    }

    /// Returns `true` if the ID decodes cleanly
    pub fn is_legal(&self) -> bool {
        self.split().is_ok()
    }

    /// Returns the role encoded in the ID
    pub fn component_type(&self) -> Result<ComponentType, ComponentError> {
        self.split().map(|parts| parts.component_type)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Digits only; `u64::from_str` alone would also accept a leading `+`
fn parse_serial_number(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
