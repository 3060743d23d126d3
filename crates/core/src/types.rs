//! Domain types shared by the platform client and the scenario.
//!
//! None of these are owned by sdcheck: applications, routes and policies live on the
//! platform, and these types only describe them well enough to drive the CLI and to
//! read back its output.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name of a pushed application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppName(String);

impl AppName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for AppName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Hostname bound to an app under an internal (service-to-service) domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternalRoute {
    pub host: String,
    pub domain: String,
}

impl InternalRoute {
    pub fn new(host: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            domain: domain.into(),
        }
    }

    /// `host.domain`
    pub fn fqdn(&self) -> String {
        format!("{}.{}", self.host, self.domain)
    }
}

impl fmt::Display for InternalRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.host, self.domain)
    }
}

/// Transport protocol a network policy applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "tcp",
            Self::Udp => "udp",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" => Ok(Self::Tcp),
            "udp" => Ok(Self::Udp),
            other => Err(format!("unknown protocol: {other}")),
        }
    }
}

/// Inclusive port range. A single port is `start == end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRange {
    pub start: u16,
    pub end: u16,
}

impl PortRange {
    pub fn single(port: u16) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    pub fn contains(&self, port: u16) -> bool {
        self.start <= port && port <= self.end
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl FromStr for PortRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |p: &str| {
            p.trim()
                .parse::<u16>()
                .map_err(|e| format!("invalid port '{p}': {e}"))
        };
        match s.split_once('-') {
            Some((a, b)) => {
                let (start, end) = (parse(a)?, parse(b)?);
                if start > end {
                    return Err(format!("invalid port range '{s}': start > end"));
                }
                Ok(Self { start, end })
            }
            None => parse(s).map(Self::single),
        }
    }
}

/// Authorization for traffic from one app to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkPolicy {
    pub source: AppName,
    pub destination: AppName,
    pub protocol: Protocol,
    pub ports: PortRange,
}

impl NetworkPolicy {
    pub fn new(source: AppName, destination: AppName, protocol: Protocol, port: u16) -> Self {
        Self {
            source,
            destination,
            protocol,
            ports: PortRange::single(port),
        }
    }

    /// Whether this policy admits `source -> destination` on `protocol`/`port`.
    pub fn allows(
        &self,
        source: &AppName,
        destination: &AppName,
        protocol: Protocol,
        port: u16,
    ) -> bool {
        &self.source == source
            && &self.destination == destination
            && self.protocol == protocol
            && self.ports.contains(port)
    }

    /// Parses the table printed by `cf network-policies`.
    ///
    /// Lines before the `source destination protocol ports` header are informational
    /// and skipped. Extra trailing columns (destination space/org on newer clients) are
    /// ignored, as are rows that do not parse.
    pub fn parse_listing(output: &str) -> Vec<Self> {
        let mut lines = output.lines();
        let header_found = lines.by_ref().any(|line| {
            let mut cols = line.split_whitespace();
            cols.next() == Some("source") && cols.next() == Some("destination")
        });
        if !header_found {
            return Vec::new();
        }

        lines
            .filter_map(|line| {
                let cols: Vec<&str> = line.split_whitespace().collect();
                if cols.len() < 4 {
                    return None;
                }
                Some(Self {
                    source: AppName::new(cols[0]),
                    destination: AppName::new(cols[1]),
                    protocol: cols[2].parse().ok()?,
                    ports: cols[3].parse().ok()?,
                })
            })
            .collect()
    }
}

impl fmt::Display for NetworkPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} {}/{}",
            self.source, self.destination, self.protocol, self.ports
        )
    }
}

/// Credentials and target for one CLI session.
#[derive(Clone, Serialize)]
pub struct UserContext {
    pub api: String,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    pub org: Option<String>,
    pub space: Option<String>,
    pub skip_ssl_validation: bool,
}

impl fmt::Debug for UserContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserContext")
            .field("api", &self.api)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("org", &self.org)
            .field("space", &self.space)
            .field("skip_ssl_validation", &self.skip_ssl_validation)
            .finish()
    }
}
