//! Cluster nodes and their service endpoints.

use crate::error::{CoreError, Result};
use crate::options::ClusterOptions;
use crate::service::ServiceType;
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// One cluster member and the service endpoints it advertises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    hostname: String,
    endpoints: BTreeMap<ServiceType, Url>,
}

impl Node {
    /// Create a node with no services.
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            endpoints: BTreeMap::new(),
        }
    }

    /// Advertise a service at the given base URL.
    #[must_use]
    pub fn with_service(mut self, service: ServiceType, base: Url) -> Self {
        self.endpoints.insert(service, base);
        self
    }

    /// Advertise a service at a base URL given as a string.
    pub fn with_service_str(self, service: ServiceType, base: &str) -> Result<Self> {
        let url = Url::parse(base).map_err(|source| CoreError::InvalidUrl {
            input: base.to_string(),
            source,
        })?;
        Ok(self.with_service(service, url))
    }

    /// Derive a node from a seed server, advertising the given services on
    /// their default ports.
    pub fn from_server(
        server: &Url,
        options: &ClusterOptions,
        services: &[ServiceType],
    ) -> Result<Self> {
        let host = server
            .host_str()
            .ok_or_else(|| CoreError::Config(format!("server `{}` has no host", server)))?;
        let host = if host.contains(':') && !host.starts_with('[') {
            format!("[{}]", host)
        } else {
            host.to_string()
        };
        let scheme = if options.use_tls { "https" } else { "http" };

        let mut node = Node::new(host.clone());
        for &service in services {
            let port = service_port(service, options);
            let raw = format!("{}://{}:{}", scheme, host, port);
            let url = Url::parse(&raw).map_err(|source| CoreError::InvalidUrl { input: raw, source })?;
            node.endpoints.insert(service, url);
        }
        Ok(node)
    }

    /// The node's hostname.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Whether this node advertises the service.
    pub fn serves(&self, service: ServiceType) -> bool {
        self.endpoints.contains_key(&service)
    }

    /// Base URL of the service on this node.
    pub fn endpoint(&self, service: ServiceType) -> Option<&Url> {
        self.endpoints.get(&service)
    }

    /// Services advertised by this node.
    pub fn services(&self) -> impl Iterator<Item = ServiceType> + '_ {
        self.endpoints.keys().copied()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.hostname)
    }
}

fn service_port(service: ServiceType, options: &ClusterOptions) -> u16 {
    let p = &options.ports;
    let (plain, tls) = match service {
        ServiceType::Management => (p.management, p.management_tls),
        ServiceType::KeyValue => (p.kv, p.kv_tls),
        ServiceType::Views => (p.views, p.views_tls),
        ServiceType::Query => (p.query, p.query_tls),
        ServiceType::Search => (p.search, p.search_tls),
        ServiceType::Analytics => (p.analytics, p.analytics_tls),
    };
    if options.use_tls { tls } else { plain }
}
