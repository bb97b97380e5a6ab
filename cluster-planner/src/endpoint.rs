//! Endpoint strings of the form `scheme://host:port`.
//!
//! Dispatchers are configured with endpoints whose port is left empty
//! (`tcp://localhost:`); the planner fills in the allocated port and, for
//! servers, swaps the scheme depending on the SSL settings.

use crate::error::{PlannerError, Result};
use std::fmt;
use std::str::FromStr;

/// Port assumed when an endpoint does not name one.
pub const DEFAULT_PORT: u16 = 8529;

pub const SCHEME_TCP: &str = "tcp";
pub const SCHEME_SSL: &str = "ssl";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    scheme: Option<String>,
    host: String,
    port: Option<u16>,
}

impl Endpoint {
    pub fn new(scheme: Option<&str>, host: &str, port: Option<u16>) -> Self {
        Self {
            scheme: scheme.map(str::to_string),
            host: host.to_string(),
            port,
        }
    }

    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (scheme, rest) = match trimmed.split_once("://") {
            Some((scheme, rest)) if !scheme.is_empty() => (Some(scheme.to_string()), rest),
            Some(_) => return Err(PlannerError::endpoint(input, "empty scheme")),
            None => (None, trimmed),
        };

        let (host, port_text) = if rest.starts_with('[') {
            // [v6]:port
            let close = rest
                .find(']')
                .ok_or_else(|| PlannerError::endpoint(input, "unterminated IPv6 address"))?;
            let (host, tail) = rest.split_at(close + 1);
            match tail {
                "" => (host, None),
                _ => match tail.strip_prefix(':') {
                    Some(port) => (host, Some(port)),
                    None => return Err(PlannerError::endpoint(input, "garbage after address")),
                },
            }
        } else {
            match rest.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (rest, None),
            }
        };

        if host.is_empty() {
            return Err(PlannerError::endpoint(input, "missing host"));
        }

        let port = match port_text {
            None | Some("") => None,
            Some(text) => Some(
                text.parse::<u16>()
                    .map_err(|_| PlannerError::endpoint(input, format!("bad port '{}'", text)))?,
            ),
        };

        Ok(Self {
            scheme,
            host: host.to_string(),
            port,
        })
    }

    pub fn scheme(&self) -> Option<&str> {
        self.scheme.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn port_or_default(&self) -> u16 {
        self.port.unwrap_or(DEFAULT_PORT)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_ssl(mut self, use_ssl: bool) -> Self {
        let scheme = if use_ssl { SCHEME_SSL } else { SCHEME_TCP };
        self.scheme = Some(scheme.to_string());
        self
    }

    pub fn is_ssl(&self) -> bool {
        self.scheme.as_deref() == Some(SCHEME_SSL)
    }

    /// `host:port`, or just `host` without a port.
    pub fn addr_port(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.host, port),
            None => self.host.clone(),
        }
    }

    /// HTTP(S) URL of the endpoint: `ssl` maps to `https`, everything else
    /// to `http`.
    pub fn to_url(&self) -> String {
        let scheme = if self.is_ssl() { "https" } else { "http" };
        format!("{}://{}", scheme, self.addr_port())
    }

    pub fn is_loopback(&self) -> bool {
        matches!(self.host.as_str(), "localhost" | "127.0.0.1")
    }
}

impl FromStr for Endpoint {
    type Err = PlannerError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{}://", scheme)?;
        }
        write!(f, "{}", self.addr_port())
    }
}

/// Rewrites the scheme to `ssl://` or `tcp://`.
pub fn exchange_protocol(endpoint: &str, use_ssl: bool) -> Result<String> {
    Ok(Endpoint::parse(endpoint)?.with_ssl(use_ssl).to_string())
}

/// Replaces (or appends) the port.
pub fn exchange_port(endpoint: &str, port: u16) -> Result<String> {
    Ok(Endpoint::parse(endpoint)?.with_port(port).to_string())
}

pub fn get_addr_port(endpoint: &str) -> Result<String> {
    Ok(Endpoint::parse(endpoint)?.addr_port())
}

pub fn get_addr(endpoint: &str) -> Result<String> {
    Ok(Endpoint::parse(endpoint)?.host)
}

pub fn get_port(endpoint: &str) -> Result<u16> {
    Ok(Endpoint::parse(endpoint)?.port_or_default())
}

pub fn endpoint_to_url(endpoint: &str) -> Result<String> {
    Ok(Endpoint::parse(endpoint)?.to_url())
}
