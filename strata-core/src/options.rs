//! Cluster options.

use crate::connection_string::ConnectionString;
use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Options used to open a cluster.
///
/// Constructed once through [`ClusterOptions::builder`] and treated as
/// immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterOptions {
    /// Parsed connection string, if one was supplied.
    pub connection_string: Option<ConnectionString>,
    /// Seed servers.
    pub servers: Vec<Url>,
    /// Buckets to open.
    pub buckets: Vec<String>,

    /// RBAC username.
    pub username: Option<String>,
    /// RBAC password.
    #[serde(skip_serializing)]
    pub password: Option<String>,

    /// Timeouts, in milliseconds.
    pub timeouts: TimeoutConfig,

    /// How often to poll for a new cluster map.
    pub config_poll_interval_ms: u64,
    /// Whether config polling is enabled.
    pub enable_config_polling: bool,

    /// Whether TCP keep-alives are enabled on HTTP connections.
    pub enable_tcp_keepalives: bool,
    /// Idle time before the first keep-alive probe.
    pub tcp_keepalive_time_ms: u64,
    /// Interval between keep-alive probes.
    pub tcp_keepalive_interval_ms: u64,

    /// Use TLS for all service connections.
    pub use_tls: bool,
    /// Prefer IPv6 addresses when resolving hosts.
    pub enable_ipv6_addressing: bool,
    /// Resolve a single cluster-aware host through DNS-SRV.
    pub enable_dns_srv_resolution: bool,

    /// Upper bound on idle pooled HTTP connections per server.
    pub max_http_connections_per_server: usize,

    /// Service ports.
    pub ports: PortConfig,
}

/// Per-service timeouts in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment.
    pub connect_ms: u64,
    /// Key-value operations.
    pub kv_ms: u64,
    /// View queries.
    pub view_ms: u64,
    /// SQL++ queries.
    pub query_ms: u64,
    /// Analytics queries.
    pub analytics_ms: u64,
    /// Search queries.
    pub search_ms: u64,
    /// Management requests.
    pub management_ms: u64,
}

/// Service ports for plain and TLS connections.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PortConfig {
    /// Management REST port.
    pub management: u16,
    /// Management REST port over TLS.
    pub management_tls: u16,
    /// Key-value port.
    pub kv: u16,
    /// Key-value port over TLS.
    pub kv_tls: u16,
    /// View service port.
    pub views: u16,
    /// View service port over TLS.
    pub views_tls: u16,
    /// Query service port.
    pub query: u16,
    /// Query service port over TLS.
    pub query_tls: u16,
    /// Search service port.
    pub search: u16,
    /// Search service port over TLS.
    pub search_tls: u16,
    /// Analytics service port.
    pub analytics: u16,
    /// Analytics service port over TLS.
    pub analytics_tls: u16,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            connection_string: None,
            servers: Vec::new(),
            buckets: Vec::new(),
            username: None,
            password: None,
            timeouts: TimeoutConfig::default(),
            config_poll_interval_ms: 2_500,
            enable_config_polling: true,
            enable_tcp_keepalives: true,
            tcp_keepalive_time_ms: 60_000,
            tcp_keepalive_interval_ms: 1_000,
            use_tls: false,
            enable_ipv6_addressing: false,
            enable_dns_srv_resolution: true,
            max_http_connections_per_server: 10,
            ports: PortConfig::default(),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_ms: 10_000,
            kv_ms: 2_500,
            view_ms: 75_000,
            query_ms: 75_000,
            analytics_ms: 75_000,
            search_ms: 75_000,
            management_ms: 75_000,
        }
    }
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            management: 8091,
            management_tls: 18091,
            kv: 11210,
            kv_tls: 11207,
            views: 8092,
            views_tls: 18092,
            query: 8093,
            query_tls: 18093,
            search: 8094,
            search_tls: 18094,
            analytics: 8095,
            analytics_tls: 18095,
        }
    }
}

impl ClusterOptions {
    /// Create a new options builder.
    pub fn builder() -> ClusterOptionsBuilder {
        ClusterOptionsBuilder::default()
    }

    /// Connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.connect_ms)
    }

    /// View query timeout as a Duration.
    pub fn view_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.view_ms)
    }

    /// SQL++ query timeout as a Duration.
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.query_ms)
    }

    /// Analytics query timeout as a Duration.
    pub fn analytics_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.analytics_ms)
    }

    /// Management request timeout as a Duration.
    pub fn management_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.management_ms)
    }

    /// Config poll interval as a Duration.
    pub fn config_poll_interval(&self) -> Duration {
        Duration::from_millis(self.config_poll_interval_ms)
    }

    /// TCP keep-alive time, or `None` when keep-alives are disabled.
    pub fn tcp_keepalive(&self) -> Option<Duration> {
        self.enable_tcp_keepalives
            .then(|| Duration::from_millis(self.tcp_keepalive_time_ms))
    }

    /// Username and password, if both are set.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user.as_str(), pass.as_str())),
            _ => None,
        }
    }

    /// Whether DNS-SRV resolution should be used to bootstrap.
    ///
    /// True only when resolution is enabled, the connection string uses a
    /// cluster-aware scheme, and it names exactly one host with no port.
    pub fn is_valid_dns_srv(&self) -> bool {
        if !self.enable_dns_srv_resolution {
            return false;
        }

        let Some(cs) = &self.connection_string else {
            return false;
        };

        if !cs.scheme().is_cluster_aware() {
            return false;
        }

        match cs.hosts() {
            [only] => only.port.is_none(),
            _ => false,
        }
    }

    /// Validate the options.
    pub fn validate(&self) -> Result<()> {
        if self.servers.is_empty() && self.connection_string.is_none() {
            return Err(CoreError::Config(
                "either servers or a connection string is required".to_string(),
            ));
        }

        let t = &self.timeouts;
        for (name, value) in [
            ("connect", t.connect_ms),
            ("kv", t.kv_ms),
            ("view", t.view_ms),
            ("query", t.query_ms),
            ("analytics", t.analytics_ms),
            ("search", t.search_ms),
            ("management", t.management_ms),
        ] {
            if value == 0 {
                return Err(CoreError::Config(format!(
                    "{} timeout must be > 0",
                    name
                )));
            }
        }

        if self.max_http_connections_per_server == 0 {
            return Err(CoreError::Config(
                "max_http_connections_per_server must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for ClusterOptions.
#[derive(Debug, Default)]
pub struct ClusterOptionsBuilder {
    options: ClusterOptions,
}

impl ClusterOptionsBuilder {
    /// Parse a connection string and seed the server list from its hosts.
    ///
    /// Hosts without an explicit port get the key-value port. A `couchbases`
    /// or `https` scheme turns TLS on.
    pub fn connection_string(mut self, input: &str) -> Result<Self> {
        let cs = ConnectionString::parse(input)?;
        let default_port = if cs.scheme().is_tls() {
            self.options.ports.kv_tls
        } else {
            self.options.ports.kv
        };

        let servers = cs
            .hosts()
            .iter()
            .map(|h| {
                let raw = format!(
                    "http://{}:{}",
                    h.url_host(),
                    h.port.unwrap_or(default_port)
                );
                Url::parse(&raw).map_err(|source| CoreError::InvalidUrl { input: raw, source })
            })
            .collect::<Result<Vec<_>>>()?;

        self.options.use_tls |= cs.scheme().is_tls();
        self.options.connection_string = Some(cs);
        self.options.servers = servers;
        Ok(self)
    }

    /// Replace the seed servers.
    pub fn servers<I, S>(mut self, servers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let servers = servers
            .into_iter()
            .map(|s| {
                let s = s.as_ref();
                Url::parse(s).map_err(|source| CoreError::InvalidUrl {
                    input: s.to_string(),
                    source,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        if servers.is_empty() {
            return Err(CoreError::invalid_argument(
                "servers",
                "cannot be null or empty",
            ));
        }

        self.options.servers = servers;
        Ok(self)
    }

    /// Replace the bucket list.
    pub fn buckets<I, S>(mut self, buckets: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let buckets: Vec<String> = buckets.into_iter().map(Into::into).collect();
        if buckets.is_empty() {
            return Err(CoreError::invalid_argument(
                "buckets",
                "cannot be null or empty",
            ));
        }
        self.options.buckets = buckets;
        Ok(self)
    }

    /// Set RBAC credentials. Both values must be non-blank.
    pub fn credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let username = username.into();
        let password = password.into();

        if username.trim().is_empty() {
            return Err(CoreError::invalid_argument(
                "username",
                "cannot be null or empty",
            ));
        }
        if password.trim().is_empty() {
            return Err(CoreError::invalid_argument(
                "password",
                "cannot be null or empty",
            ));
        }

        self.options.username = Some(username);
        self.options.password = Some(password);
        Ok(self)
    }

    /// Set the connect timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeouts.connect_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the key-value timeout.
    pub fn kv_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeouts.kv_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the view query timeout.
    pub fn view_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeouts.view_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the SQL++ query timeout.
    pub fn query_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeouts.query_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the analytics query timeout.
    pub fn analytics_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeouts.analytics_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the search timeout.
    pub fn search_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeouts.search_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the management timeout.
    pub fn management_timeout(mut self, timeout: Duration) -> Self {
        self.options.timeouts.management_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the config poll interval.
    pub fn config_poll_interval(mut self, interval: Duration) -> Self {
        self.options.config_poll_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Enable or disable config polling.
    pub fn enable_config_polling(mut self, enabled: bool) -> Self {
        self.options.enable_config_polling = enabled;
        self
    }

    /// Configure TCP keep-alives.
    pub fn tcp_keepalive(mut self, enabled: bool, time: Duration, interval: Duration) -> Self {
        self.options.enable_tcp_keepalives = enabled;
        self.options.tcp_keepalive_time_ms = time.as_millis() as u64;
        self.options.tcp_keepalive_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Use TLS for service connections.
    pub fn use_tls(mut self, enabled: bool) -> Self {
        self.options.use_tls = enabled;
        self
    }

    /// Prefer IPv6 addresses.
    pub fn enable_ipv6_addressing(mut self, enabled: bool) -> Self {
        self.options.enable_ipv6_addressing = enabled;
        self
    }

    /// Enable or disable DNS-SRV bootstrap.
    pub fn enable_dns_srv_resolution(mut self, enabled: bool) -> Self {
        self.options.enable_dns_srv_resolution = enabled;
        self
    }

    /// Set the per-server HTTP connection pool bound.
    pub fn max_http_connections_per_server(mut self, max: usize) -> Self {
        self.options.max_http_connections_per_server = max;
        self
    }

    /// Override the service ports.
    pub fn ports(mut self, ports: PortConfig) -> Self {
        self.options.ports = ports;
        self
    }

    /// Build the options.
    pub fn build(self) -> Result<ClusterOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ClusterOptions::default();
        assert_eq!(options.analytics_timeout(), Duration::from_secs(75));
        assert_eq!(options.config_poll_interval(), Duration::from_millis(2_500));
        assert_eq!(options.ports.kv, 11210);
        assert_eq!(options.ports.management, 8091);
        assert!(options.enable_dns_srv_resolution);
        assert_eq!(options.tcp_keepalive(), Some(Duration::from_secs(60)));
    }

    #[test]
    fn test_connection_string_seeds_servers() {
        let options = ClusterOptions::builder()
            .connection_string("couchbase://node1,node2:12000")
            .unwrap()
            .build()
            .unwrap();

        let servers: Vec<String> = options.servers.iter().map(|u| u.to_string()).collect();
        assert_eq!(
            servers,
            vec!["http://node1:11210/", "http://node2:12000/"]
        );
        assert!(!options.use_tls);
    }

    #[test]
    fn test_tls_scheme_enables_tls() {
        let options = ClusterOptions::builder()
            .connection_string("couchbases://secure-node")
            .unwrap()
            .build()
            .unwrap();
        assert!(options.use_tls);
        assert_eq!(options.servers[0].port(), Some(11207));
    }

    #[test]
    fn test_empty_servers_rejected() {
        let result = ClusterOptions::builder().servers(Vec::<String>::new());
        assert!(matches!(
            result,
            Err(CoreError::InvalidArgument { name: "servers", .. })
        ));
    }

    #[test]
    fn test_empty_buckets_rejected() {
        let result = ClusterOptions::builder().buckets(Vec::<String>::new());
        assert!(result.is_err());
    }

    #[test]
    fn test_blank_credentials_rejected() {
        assert!(ClusterOptions::builder().credentials(" ", "pw").is_err());
        assert!(ClusterOptions::builder().credentials("user", "").is_err());

        let options = ClusterOptions::builder()
            .servers(["http://localhost:8091"])
            .unwrap()
            .credentials("user", "pw")
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(options.credentials(), Some(("user", "pw")));
    }

    #[test]
    fn test_build_requires_servers() {
        assert!(ClusterOptions::builder().build().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = ClusterOptions::builder()
            .servers(["http://localhost:8091"])
            .unwrap()
            .analytics_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(CoreError::Config(_))));
    }

    fn with_cs(cs: &str) -> ClusterOptions {
        ClusterOptions::builder()
            .connection_string(cs)
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    fn test_dns_srv_single_host_without_port() {
        assert!(with_cs("couchbase://cluster.example.com").is_valid_dns_srv());
        assert!(with_cs("couchbases://cluster.example.com").is_valid_dns_srv());
    }

    #[test]
    fn test_dns_srv_rejections() {
        assert!(!with_cs("couchbase://a,b").is_valid_dns_srv());
        assert!(!with_cs("couchbase://a:11210").is_valid_dns_srv());
        assert!(!with_cs("http://a").is_valid_dns_srv());

        let mut disabled = with_cs("couchbase://a");
        disabled.enable_dns_srv_resolution = false;
        assert!(!disabled.is_valid_dns_srv());

        let servers_only = ClusterOptions::builder()
            .servers(["http://a:8091"])
            .unwrap()
            .build()
            .unwrap();
        assert!(!servers_only.is_valid_dns_srv());
    }
}
