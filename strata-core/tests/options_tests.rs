//! Integration tests for cluster options and bootstrap.

use serde_json::json;
use std::time::Duration;
use strata_core::{ClusterContext, ClusterOptions, CoreError, ServiceType};

#[test]
fn test_options_from_json_fills_defaults() {
    let options: ClusterOptions = serde_json::from_value(json!({
        "servers": ["http://10.0.0.1:8091", "http://10.0.0.2:8091"],
        "username": "Administrator",
        "password": "password",
        "timeouts": { "analytics_ms": 30000 },
        "use_tls": false
    }))
    .unwrap();

    options.validate().unwrap();
    assert_eq!(options.servers.len(), 2);
    assert_eq!(options.analytics_timeout(), Duration::from_secs(30));
    assert_eq!(options.view_timeout(), Duration::from_secs(75));
    assert_eq!(options.connect_timeout(), Duration::from_secs(10));
    assert_eq!(options.credentials(), Some(("Administrator", "password")));
    assert_eq!(options.max_http_connections_per_server, 10);
}

#[test]
fn test_password_not_serialized() {
    let options = ClusterOptions::builder()
        .servers(["http://10.0.0.1:8091"])
        .unwrap()
        .credentials("Administrator", "hunter2")
        .unwrap()
        .build()
        .unwrap();

    let value = serde_json::to_value(&options).unwrap();
    assert_eq!(value["username"], json!("Administrator"));
    assert!(value.get("password").is_none());
}

#[test]
fn test_bootstrap_from_connection_string() {
    let options = ClusterOptions::builder()
        .connection_string("couchbase://db1.example.com,db2.example.com")
        .unwrap()
        .build()
        .unwrap();

    let context = ClusterContext::bootstrap(options).unwrap();
    assert_eq!(context.nodes().len(), 2);

    let node = context.pick_node(ServiceType::Analytics).unwrap();
    let endpoint = node.endpoint(ServiceType::Analytics).unwrap();
    assert_eq!(endpoint.port(), Some(8095));
    assert_eq!(endpoint.scheme(), "http");

    let err = context.pick_node(ServiceType::KeyValue).unwrap_err();
    assert!(matches!(err, CoreError::NoNodeAvailable(ServiceType::KeyValue)));
}

#[test]
fn test_tls_bootstrap_uses_tls_ports() {
    let options = ClusterOptions::builder()
        .connection_string("couchbases://secure.example.com")
        .unwrap()
        .build()
        .unwrap();
    assert!(options.use_tls);
    assert!(options.is_valid_dns_srv());

    let context = ClusterContext::bootstrap(options).unwrap();
    let node = context.pick_node(ServiceType::Views).unwrap();
    let endpoint = node.endpoint(ServiceType::Views).unwrap();
    assert_eq!(endpoint.scheme(), "https");
    assert_eq!(endpoint.port(), Some(18092));
}
