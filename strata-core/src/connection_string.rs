//! Connection string parsing.
//!
//! Accepts `scheme://host[:port][,host[:port]]*[?key=value&...]`. The scheme is
//! optional and defaults to `couchbase`. IPv6 literals must be bracketed when a
//! port is given (`[::1]:8091`).

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Connection string scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    /// Cluster-aware plain-text bootstrap.
    #[default]
    Couchbase,
    /// Cluster-aware TLS bootstrap.
    Couchbases,
    /// Plain HTTP bootstrap against the management port.
    Http,
    /// HTTPS bootstrap against the management port.
    Https,
}

impl Scheme {
    /// Whether the scheme supports DNS-SRV lookups.
    pub fn is_cluster_aware(&self) -> bool {
        matches!(self, Scheme::Couchbase | Scheme::Couchbases)
    }

    /// Whether the scheme implies TLS.
    pub fn is_tls(&self) -> bool {
        matches!(self, Scheme::Couchbases | Scheme::Https)
    }

    fn as_str(&self) -> &'static str {
        match self {
            Scheme::Couchbase => "couchbase",
            Scheme::Couchbases => "couchbases",
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }
}

impl FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "couchbase" => Ok(Scheme::Couchbase),
            "couchbases" => Ok(Scheme::Couchbases),
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(format!("unsupported scheme `{}`", other)),
        }
    }
}

/// One host entry of a connection string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostEntry {
    /// Hostname or IP literal, without brackets.
    pub host: String,
    /// Explicit port, if one was given.
    pub port: Option<u16>,
}

impl HostEntry {
    fn parse(raw: &str) -> std::result::Result<Self, String> {
        if let Some(rest) = raw.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| format!("unterminated IPv6 literal `{}`", raw))?;
            let port = match tail {
                "" => None,
                t => Some(parse_port(t.strip_prefix(':').unwrap_or(t))?),
            };
            return Ok(Self {
                host: host.to_string(),
                port,
            });
        }

        match raw.matches(':').count() {
            0 => Ok(Self {
                host: raw.to_string(),
                port: None,
            }),
            1 => {
                let (host, port) = raw.split_once(':').unwrap_or((raw, ""));
                if host.is_empty() {
                    return Err(format!("missing host in `{}`", raw));
                }
                Ok(Self {
                    host: host.to_string(),
                    port: Some(parse_port(port)?),
                })
            }
            // Bare IPv6 literal without a port.
            _ => Ok(Self {
                host: raw.to_string(),
                port: None,
            }),
        }
    }

    /// Host formatted for use in a URL authority.
    pub fn url_host(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

impl fmt::Display for HostEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.url_host(), port),
            None => f.write_str(&self.host),
        }
    }
}

fn parse_port(raw: &str) -> std::result::Result<u16, String> {
    raw.parse::<u16>()
        .map_err(|_| format!("invalid port `{}`", raw))
}

/// A parsed connection string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionString {
    scheme: Scheme,
    hosts: Vec<HostEntry>,
    params: BTreeMap<String, String>,
}

impl ConnectionString {
    /// Parse a connection string.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidConnectionString`] on an unknown scheme,
    /// an empty host list, a malformed port, or a path component.
    pub fn parse(input: &str) -> Result<Self> {
        let fail = |reason: String| CoreError::InvalidConnectionString {
            input: input.to_string(),
            reason,
        };

        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(fail("connection string is empty".to_string()));
        }

        let (scheme, rest) = match trimmed.split_once("://") {
            Some((scheme, rest)) => (scheme.parse::<Scheme>().map_err(fail)?, rest),
            None => (Scheme::default(), trimmed),
        };

        let (host_part, param_part) = match rest.split_once('?') {
            Some((hosts, params)) => (hosts, Some(params)),
            None => (rest, None),
        };

        let host_part = host_part.trim_end_matches('/');
        if host_part.contains('/') {
            return Err(fail("path components are not supported".to_string()));
        }

        let hosts = host_part
            .split([',', ';'])
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .map(HostEntry::parse)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(fail)?;

        if hosts.is_empty() {
            return Err(fail("no hosts given".to_string()));
        }

        let params = param_part
            .into_iter()
            .flat_map(|p| p.split('&'))
            .filter(|kv| !kv.is_empty())
            .map(|kv| match kv.split_once('=') {
                Some((k, v)) => (k.to_string(), v.to_string()),
                None => (kv.to_string(), String::new()),
            })
            .collect();

        Ok(Self {
            scheme,
            hosts,
            params,
        })
    }

    /// The scheme.
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// The host entries, in the order given.
    pub fn hosts(&self) -> &[HostEntry] {
        &self.hosts
    }

    /// Query-string options appended to the connection string.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

impl FromStr for ConnectionString {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://", self.scheme.as_str())?;
        let hosts: Vec<String> = self.hosts.iter().map(ToString::to_string).collect();
        f.write_str(&hosts.join(","))?;
        if !self.params.is_empty() {
            let params: Vec<String> = self
                .params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "?{}", params.join("&"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_host() {
        let cs = ConnectionString::parse("couchbase://db1.example.com").unwrap();
        assert_eq!(cs.scheme(), Scheme::Couchbase);
        assert_eq!(cs.hosts().len(), 1);
        assert_eq!(cs.hosts()[0].host, "db1.example.com");
        assert_eq!(cs.hosts()[0].port, None);
    }

    #[test]
    fn test_parse_defaults_scheme() {
        let cs = ConnectionString::parse("10.0.0.1,10.0.0.2").unwrap();
        assert_eq!(cs.scheme(), Scheme::Couchbase);
        assert_eq!(cs.hosts().len(), 2);
    }

    #[test]
    fn test_parse_ports_and_params() {
        let cs =
            ConnectionString::parse("couchbases://a:11207;b:11208?network=external&ipv6").unwrap();
        assert_eq!(cs.scheme(), Scheme::Couchbases);
        assert_eq!(cs.hosts()[0].port, Some(11207));
        assert_eq!(cs.hosts()[1].port, Some(11208));
        assert_eq!(cs.params().get("network").map(String::as_str), Some("external"));
        assert_eq!(cs.params().get("ipv6").map(String::as_str), Some(""));
    }

    #[test]
    fn test_parse_ipv6() {
        let cs = ConnectionString::parse("http://[::1]:8091").unwrap();
        assert_eq!(cs.hosts()[0].host, "::1");
        assert_eq!(cs.hosts()[0].port, Some(8091));
        assert_eq!(cs.hosts()[0].url_host(), "[::1]");

        let bare = ConnectionString::parse("couchbase://fe80::1").unwrap();
        assert_eq!(bare.hosts()[0].port, None);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ConnectionString::parse("").is_err());
        assert!(ConnectionString::parse("ftp://host").is_err());
        assert!(ConnectionString::parse("couchbase://").is_err());
        assert!(ConnectionString::parse("couchbase://host:notaport").is_err());
        assert!(ConnectionString::parse("couchbase://host/bucket").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        let raw = "couchbase://a:11210,b?network=default";
        let cs = ConnectionString::parse(raw).unwrap();
        assert_eq!(cs.to_string(), raw);
    }
}
