//! Cluster context: options plus the current set of known nodes.

use crate::error::{CoreError, Result};
use crate::node::Node;
use crate::options::ClusterOptions;
use crate::service::ServiceType;
use parking_lot::RwLock;
use rand::seq::SliceRandom;
use std::sync::Arc;

/// Holds the cluster options and the node registry.
///
/// Topology maintenance (config polling, rebalance handling) is driven from
/// outside; this type only stores the result and answers node lookups. Safe to
/// share across tasks.
#[derive(Debug)]
pub struct ClusterContext {
    options: Arc<ClusterOptions>,
    nodes: RwLock<Vec<Arc<Node>>>,
}

impl ClusterContext {
    /// Create a context with no nodes.
    pub fn new(options: ClusterOptions) -> Self {
        Self {
            options: Arc::new(options),
            nodes: RwLock::new(Vec::new()),
        }
    }

    /// Create a context seeded with one node per configured server, each
    /// advertising every HTTP service on its default port.
    pub fn bootstrap(options: ClusterOptions) -> Result<Self> {
        let services = [
            ServiceType::Management,
            ServiceType::Views,
            ServiceType::Query,
            ServiceType::Search,
            ServiceType::Analytics,
        ];

        let nodes = options
            .servers
            .iter()
            .map(|server| Node::from_server(server, &options, &services).map(Arc::new))
            .collect::<Result<Vec<_>>>()?;

        tracing::debug!(nodes = nodes.len(), "Bootstrapped cluster context");

        Ok(Self {
            options: Arc::new(options),
            nodes: RwLock::new(nodes),
        })
    }

    /// The cluster options.
    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Add a node, replacing any existing node with the same hostname.
    pub fn add_node(&self, node: Node) {
        let mut nodes = self.nodes.write();
        nodes.retain(|n| n.hostname() != node.hostname());
        nodes.push(Arc::new(node));
    }

    /// Remove a node by hostname. Returns true if it was present.
    pub fn remove_node(&self, hostname: &str) -> bool {
        let mut nodes = self.nodes.write();
        let before = nodes.len();
        nodes.retain(|n| n.hostname() != hostname);
        nodes.len() != before
    }

    /// Snapshot of the current nodes.
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        self.nodes.read().clone()
    }

    /// Pick a node serving `service`, uniformly at random.
    ///
    /// Fails immediately with [`CoreError::NoNodeAvailable`] when no node
    /// serves the service; callers do not retry selection here.
    pub fn pick_node(&self, service: ServiceType) -> Result<Arc<Node>> {
        let nodes = self.nodes.read();
        let eligible: Vec<&Arc<Node>> = nodes.iter().filter(|n| n.serves(service)).collect();

        eligible
            .choose(&mut rand::thread_rng())
            .map(|n| Arc::clone(n))
            .ok_or(CoreError::NoNodeAvailable(service))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn analytics_node(host: &str) -> Node {
        Node::new(host)
            .with_service_str(ServiceType::Analytics, &format!("http://{}:8095", host))
            .unwrap()
    }

    #[test]
    fn test_pick_node_no_nodes() {
        let ctx = ClusterContext::new(ClusterOptions::default());
        let err = ctx.pick_node(ServiceType::Analytics).unwrap_err();
        assert!(matches!(err, CoreError::NoNodeAvailable(ServiceType::Analytics)));
    }

    #[test]
    fn test_pick_node_filters_by_service() {
        let ctx = ClusterContext::new(ClusterOptions::default());
        ctx.add_node(analytics_node("a1"));
        ctx.add_node(
            Node::new("v1")
                .with_service_str(ServiceType::Views, "http://v1:8092")
                .unwrap(),
        );

        for _ in 0..20 {
            let node = ctx.pick_node(ServiceType::Analytics).unwrap();
            assert_eq!(node.hostname(), "a1");
        }
        assert!(ctx.pick_node(ServiceType::Search).is_err());
    }

    #[test]
    fn test_pick_node_spreads_across_eligible() {
        let ctx = ClusterContext::new(ClusterOptions::default());
        ctx.add_node(analytics_node("a1"));
        ctx.add_node(analytics_node("a2"));
        ctx.add_node(analytics_node("a3"));

        let seen: HashSet<String> = (0..200)
            .map(|_| ctx.pick_node(ServiceType::Analytics).unwrap().hostname().to_string())
            .collect();
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_add_replaces_and_remove() {
        let ctx = ClusterContext::new(ClusterOptions::default());
        ctx.add_node(analytics_node("a1"));
        ctx.add_node(analytics_node("a1"));
        assert_eq!(ctx.nodes().len(), 1);

        assert!(ctx.remove_node("a1"));
        assert!(!ctx.remove_node("a1"));
        assert!(ctx.nodes().is_empty());
    }

    #[test]
    fn test_bootstrap_from_servers() {
        let options = ClusterOptions::builder()
            .connection_string("couchbase://db1,db2")
            .unwrap()
            .build()
            .unwrap();
        let ctx = ClusterContext::bootstrap(options).unwrap();

        assert_eq!(ctx.nodes().len(), 2);
        let node = ctx.pick_node(ServiceType::Views).unwrap();
        assert!(node.serves(ServiceType::Analytics));
        assert!(!node.serves(ServiceType::KeyValue));
    }
}
