//! Tests for handler config files and the service registry
//!
//! # Test Coverage
//!
//! - Loading and validating YAML config files
//! - Resolving the configured service through [`ServiceRegistry`]
//! - Endpoint, CORS and binder settings reaching the dispatcher

mod common;

use std::path::PathBuf;
use std::time::Duration;

use common::services::People;
use common::temp_files::create_temp_yaml;
use jsonrest::{HandlerConfig, IncomingRequest, NullPolicy, ServiceRegistry};
use serde_json::json;

fn registry() -> ServiceRegistry {
    let mut registry = ServiceRegistry::new();
    registry.register("people", |_sessions| Ok(People::default()));
    registry
}

#[test]
fn test_load_full_config() {
    let file = create_temp_yaml(
        r"
name: people-api
service: people
log_path: logs/people.log
endpoint: /api
cross_domain: true
session:
  header: x-auth
  cookie: auth
  idle_timeout_secs: 600
binder:
  null_policy: reject
",
    );
    let config = HandlerConfig::load(file.path()).unwrap();

    assert_eq!(config.display_name(), "people-api");
    assert_eq!(config.service, "people");
    assert_eq!(config.log_path, PathBuf::from("logs/people.log"));
    assert_eq!(config.endpoint, "/api");
    assert!(config.cross_domain);
    assert_eq!(config.session.header, "x-auth");
    assert_eq!(config.session.cookie, "auth");
    assert_eq!(config.session.idle_timeout(), Some(Duration::from_secs(600)));
    assert_eq!(config.binder.null_policy, NullPolicy::Reject);
}

#[test]
fn test_load_rejects_missing_log_path() {
    let file = create_temp_yaml("service: people\n");
    let err = HandlerConfig::load(file.path()).unwrap_err();
    assert!(format!("{err:#}").contains("log_path"));
}

#[test]
fn test_load_rejects_bad_yaml() {
    let file = create_temp_yaml("service: [unclosed\n");
    let err = HandlerConfig::load(file.path()).unwrap_err();
    assert!(err.to_string().starts_with("Invalid config file"));
}

#[test]
fn test_load_missing_file() {
    let err = HandlerConfig::load("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().starts_with("Failed to read config file"));
}

#[test]
fn test_registry_builds_configured_dispatcher() {
    let config = HandlerConfig::from_yaml(
        "service: people\nlog_path: p.log\nendpoint: /api\ncross_domain: true\n",
    )
    .unwrap();
    let dispatcher = registry().dispatcher_for(&config).unwrap();

    let response =
        dispatcher.handle(&IncomingRequest::new("/api/add").with_body(r#"{"a":2,"b":3}"#));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!(5));
    assert_eq!(response.get_header("access-control-allow-origin"), Some("*"));

    let unmounted = dispatcher.handle(&IncomingRequest::new("/other/add"));
    assert_eq!(unmounted.status, 404);
}

#[test]
fn test_registry_applies_null_policy() {
    let config = HandlerConfig::from_yaml(
        "service: people\nlog_path: p.log\nbinder:\n  null_policy: reject\n",
    )
    .unwrap();
    let dispatcher = registry().dispatcher_for(&config).unwrap();
    let response = dispatcher.handle(&IncomingRequest::new("/add").with_body(r#"{"a":null,"b":1}"#));
    assert_eq!(response.status, 400);
}

#[test]
fn test_registry_unknown_service() {
    let config = HandlerConfig::from_yaml("service: ghosts\nlog_path: p.log\n").unwrap();
    let err = registry().dispatcher_for(&config).unwrap_err();
    assert_eq!(err.to_string(), "Type ghosts not found");
}

#[test]
fn test_registry_names() {
    let mut registry = registry();
    registry.register("echo", |sessions| Ok(jsonrest::echo::EchoService::new(sessions)));
    assert!(registry.contains("people"));
    assert!(!registry.contains("People"));
    assert_eq!(registry.names(), vec!["echo", "people"]);
}
