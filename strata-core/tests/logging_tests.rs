//! Integration tests for logging configuration.

use std::collections::HashMap;
use strata_core::CoreError;
use strata_core::logging::{FILTER_VAR, FORMAT_VAR, LogConfig, LogFormat};

fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = vars
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_format_and_filter_from_variables() {
    let config = LogConfig::from_lookup(lookup(&[
        (FORMAT_VAR, "Compact"),
        (FILTER_VAR, "warn,strata_client=debug"),
        ("RUST_LOG", "trace"),
    ]));

    assert_eq!(
        config,
        LogConfig::new(LogFormat::Compact, "warn,strata_client=debug")
    );
}

#[test]
fn test_filter_falls_back_to_rust_log_then_info() {
    let config = LogConfig::from_lookup(lookup(&[(FILTER_VAR, "  "), ("RUST_LOG", "debug")]));
    assert_eq!(config.filter, "debug");

    let config = LogConfig::from_lookup(lookup(&[]));
    assert_eq!(config.filter, "info");
    assert_eq!(config.format, LogFormat::detect());
}

#[test]
fn test_unknown_format_is_detected_instead() {
    let config = LogConfig::from_lookup(lookup(&[(FORMAT_VAR, "xml")]));
    assert_eq!(config.format, LogFormat::detect());

    let err = "xml".parse::<LogFormat>().unwrap_err();
    assert!(matches!(err, CoreError::Config(ref msg) if msg.contains("xml")));
}

#[test]
fn test_format_parse_ignores_case_and_whitespace() {
    assert_eq!(" JSON ".parse::<LogFormat>().unwrap(), LogFormat::Json);
    assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
}
