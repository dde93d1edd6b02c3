//! Realm origin identity.
//!
//! A realm's origin is configured as either a bare origin or a full URL and
//! is kept in serialized form: `scheme://host[:port]`.

use std::fmt;
use thiserror::Error;

/// An origin tuple (scheme, host, port).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Origin {
    /// URL scheme, lower-cased
    pub scheme: String,
    /// Host, lower-cased
    pub host: String,
    /// Port; `None` means the scheme's default port
    pub port: Option<u16>,
}

/// Origin parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OriginError {
    /// The URL could not be parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    /// `null` origins cannot identify a realm
    #[error("Opaque origin")]
    OpaqueOrigin,
}

impl Origin {
    /// Create an origin, normalizing case and eliding the default port.
    pub fn new(scheme: impl Into<String>, host: impl Into<String>, port: Option<u16>) -> Self {
        let scheme = scheme.into().to_lowercase();
        let port = port.filter(|p| Some(*p) != default_port(&scheme));
        Self {
            scheme,
            host: host.into().to_lowercase(),
            port,
        }
    }

    /// Parse the origin of a URL or of a serialized origin.
    pub fn parse(url: &str) -> Result<Self, OriginError> {
        let url = url.trim();
        if url == "null" {
            return Err(OriginError::OpaqueOrigin);
        }

        let (scheme, rest) = url
            .split_once("://")
            .ok_or_else(|| OriginError::InvalidUrl("Missing scheme".to_string()))?;
        if scheme.is_empty()
            || !scheme
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        {
            return Err(OriginError::InvalidUrl("Invalid scheme".to_string()));
        }

        let authority = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or(rest);
        let host_port = match authority.rsplit_once('@') {
            Some((_userinfo, host_port)) => host_port,
            None => authority,
        };

        let (host, port) = if host_port.starts_with('[') {
            if let Some((ipv6, port)) = host_port.rsplit_once("]:") {
                (format!("{}]", ipv6), Some(parse_port(port)?))
            } else if host_port.ends_with(']') {
                (host_port.to_string(), None)
            } else {
                return Err(OriginError::InvalidUrl("Malformed IPv6 address".to_string()));
            }
        } else if let Some((host, port)) = host_port.rsplit_once(':') {
            (host.to_string(), Some(parse_port(port)?))
        } else {
            (host_port.to_string(), None)
        };

        if host.is_empty() {
            return Err(OriginError::InvalidUrl("Empty host".to_string()));
        }

        Ok(Origin::new(scheme, host, port))
    }

    /// Serialized form, `scheme://host[:port]`.
    pub fn serialize(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.scheme, self.host, port),
            None => format!("{}://{}", self.scheme, self.host),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.serialize())
    }
}

fn parse_port(port: &str) -> Result<u16, OriginError> {
    port.parse::<u16>()
        .map_err(|_| OriginError::InvalidUrl("Invalid port".to_string()))
}

fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" | "ws" => Some(80),
        "https" | "wss" => Some(443),
        "ftp" => Some(21),
        _ => None,
    }
}
