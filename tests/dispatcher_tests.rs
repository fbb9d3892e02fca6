//! End-to-end tests for [`Dispatcher::handle`]
//!
//! # Test Coverage
//!
//! - Status and body rendering for every outcome
//! - Auth gate (method never invoked when rejected)
//! - Mount prefix, path normalisation and CORS
//! - Lazy router construction

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::services::People;
use jsonrest::dispatcher::{JSON_CONTENT_TYPE, NOT_CONNECTED, UNKNOWN_PATH};
use jsonrest::router::PanicError;
use jsonrest::{
    BinderOptions, Dispatcher, DispatchError, HandlerResponse, IncomingRequest, NullPolicy,
    RequestContext,
};
use serde_json::json;

fn people() -> (Arc<People>, Dispatcher) {
    let service = Arc::new(People::default());
    let dispatcher = Dispatcher::new(Arc::clone(&service));
    (service, dispatcher)
}

fn post(dispatcher: &Dispatcher, url: &str, body: &str) -> HandlerResponse {
    dispatcher.handle(&IncomingRequest::new(url).with_body(body))
}

#[test]
fn test_string_result_is_wrapped() {
    let (_, dispatcher) = people();
    let response = post(&dispatcher, "/register", r#"{"name":"Ann","age":5}"#);
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({ "response": "Ann:5" }));
    assert_eq!(response.get_header("Content-Type"), Some(JSON_CONTENT_TYPE));
}

#[test]
fn test_field_names_ignore_case() {
    let (_, dispatcher) = people();
    let response = post(&dispatcher, "/REGISTER/", r#"{"NaMe":"Bo","AGE":"7"}"#);
    assert_eq!(response.status, 200);
    assert_eq!(response.body["response"], "Bo:7");
}

#[test]
fn test_non_string_results_are_raw() {
    let (_, dispatcher) = people();
    let response = post(&dispatcher, "/add", r#"{"a":2,"b":40}"#);
    assert_eq!(response.body, json!(42));

    let response = post(&dispatcher, "/list", r#"{"values":[3,1,2]}"#);
    assert_eq!(response.body, json!([3, 1, 2]));

    let response = post(&dispatcher, "/object", "");
    assert_eq!(response.body, json!({ "a": 1 }));
}

#[test]
fn test_unit_result_has_empty_body() {
    let (_, dispatcher) = people();
    let response = post(&dispatcher, "/nothing", "");
    assert_eq!(response.status, 200);
    assert!(response.body.is_null());
    assert!(response.body_bytes().is_empty());
}

#[test]
fn test_unknown_path_is_404() {
    let (_, dispatcher) = people();
    let response = post(&dispatcher, "/nope", "{}");
    assert_eq!(response.status, 404);
    assert_eq!(response.body, json!({ "error": UNKNOWN_PATH }));
}

#[test]
fn test_auth_gate_blocks_without_invoking() {
    let (service, dispatcher) = people();
    let response = post(&dispatcher, "/secret", "");
    assert_eq!(response.status, 401);
    assert_eq!(response.body, json!({ "error": NOT_CONNECTED }));
    assert_eq!(service.secret_calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_auth_gate_admits_authenticated_caller() {
    let service = Arc::new(People::default());
    let dispatcher = Dispatcher::new(Arc::clone(&service)).with_sessions(Arc::new(
        |ctx: &RequestContext| ctx.get_header("x-token") == Some("letmein"),
    ));

    let denied = dispatcher.handle(&IncomingRequest::new("/secret").with_header("X-Token", "no"));
    assert_eq!(denied.status, 401);

    let allowed =
        dispatcher.handle(&IncomingRequest::new("/secret").with_header("X-Token", "letmein"));
    assert_eq!(allowed.status, 200);
    assert_eq!(allowed.body["response"], "classified");
    assert_eq!(service.secret_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_binding_failures_are_400() {
    let (_, dispatcher) = people();

    let missing = post(&dispatcher, "/register", r#"{"name":"Ann"}"#);
    assert_eq!(missing.status, 400);
    assert!(missing.body["error"].as_str().unwrap().contains("`age`"));

    let malformed = post(&dispatcher, "/register", "{not json");
    assert_eq!(malformed.status, 400);
    assert!(malformed.body["error"]
        .as_str()
        .unwrap()
        .starts_with("malformed request body"));

    let wrong_type = post(&dispatcher, "/register", r#"{"name":"Ann","age":"old"}"#);
    assert_eq!(wrong_type.status, 400);
    assert!(wrong_type.body["error"].as_str().unwrap().contains("age"));

    let not_object = post(&dispatcher, "/register", "[1,2]");
    assert_eq!(not_object.status, 400);

    let empty = post(&dispatcher, "/register", "  ");
    assert_eq!(empty.status, 400);
    assert!(empty.body["error"].as_str().unwrap().contains("`name`"));
}

#[test]
fn test_fault_carries_code() {
    let (_, dispatcher) = people();
    let response = post(&dispatcher, "/refuse", "");
    assert_eq!(response.status, 400);
    assert_eq!(response.body, json!({ "error": "not today", "code": "E_REFUSED" }));
}

#[test]
fn test_target_error_is_500() {
    let (_, dispatcher) = people();
    let response = post(&dispatcher, "/fail", r#"{"reason":"disk full"}"#);
    assert_eq!(response.status, 500);
    assert_eq!(response.body, json!({ "error": "disk full" }));
}

#[test]
fn test_panic_is_500_and_dispatcher_survives() {
    let (_, dispatcher) = people();
    let response = post(&dispatcher, "/boom", "");
    assert_eq!(response.status, 500);
    assert_eq!(response.body["error"], "panicked: boom");

    let after = post(&dispatcher, "/add", r#"{"a":1,"b":1}"#);
    assert_eq!(after.body, json!(2));
}

#[test]
fn test_panic_backtrace_taken_at_panic_site() {
    let (_, dispatcher) = people();
    let err = dispatcher
        .dispatch("/boom", &RequestContext::new("/boom"), b"")
        .unwrap_err();
    let panic = err
        .target_error()
        .and_then(|e| e.downcast_ref::<PanicError>())
        .unwrap();
    assert_eq!(panic.message, "boom");
    assert!(panic.backtrace.contains("People::boom"), "{}", panic.backtrace);
}

#[test]
fn test_percent_encoded_body() {
    let (_, dispatcher) = people();
    let response = post(&dispatcher, "/register", "%7B%22name%22%3A%22Ann%22%2C%22age%22%3A3%7D");
    assert_eq!(response.body["response"], "Ann:3");
}

#[test]
fn test_endpoint_prefix_and_cors() {
    let dispatcher = Dispatcher::new(Arc::new(People::default()))
        .with_endpoint("/api")
        .with_cross_domain(true);

    let response = post(&dispatcher, "/API//add?trace=1", r#"{"a":1,"b":2}"#);
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!(3));
    assert_eq!(response.get_header("access-control-allow-origin"), Some("*"));

    let not_found = post(&dispatcher, "/api/missing", "");
    assert_eq!(not_found.status, 404);
    assert_eq!(not_found.get_header("access-control-allow-origin"), Some("*"));
}

#[test]
fn test_no_cors_header_by_default() {
    let (_, dispatcher) = people();
    let response = post(&dispatcher, "/nothing", "");
    assert_eq!(response.get_header("access-control-allow-origin"), None);
}

#[test]
fn test_context_parameter_sees_request() {
    let (_, dispatcher) = people();
    let response = post(&dispatcher, "/path_of?x=1", r#"{"suffix":"!"}"#);
    assert_eq!(response.body["response"], "/path_of?x=1!");
}

#[test]
fn test_null_policy() {
    let lenient = Dispatcher::new(Arc::new(People::default()));
    let response = post(&lenient, "/add", r#"{"a":null,"b":5}"#);
    assert_eq!(response.body, json!(5));

    let strict = Dispatcher::new(Arc::new(People::default()))
        .with_binder_options(BinderOptions::default().with_null_policy(NullPolicy::Reject));
    let response = post(&strict, "/add", r#"{"a":null,"b":5}"#);
    assert_eq!(response.status, 400);
}

#[test]
fn test_dispatch_is_idempotent() {
    let (_, dispatcher) = people();
    let ctx = RequestContext::new("/describe");
    let body = br#"{"person":{"name":"Ann","address":{"street":"Main","zip":1},"tags":["a"]}}"#;

    let first = dispatcher.dispatch("/describe", &ctx, body).unwrap();
    let second = dispatcher.dispatch("/describe", &ctx, body).unwrap();
    assert_eq!(first, second);
    assert_eq!(first, json!("Ann () Main 1 [a]"));
}

#[test]
fn test_router_built_once() {
    let builds = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&builds);
    let dispatcher = Dispatcher::from_factory(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(People::default())
    });
    assert_eq!(builds.load(Ordering::SeqCst), 0);

    for _ in 0..3 {
        assert_eq!(post(&dispatcher, "/add", r#"{"a":1,"b":2}"#).status, 200);
    }
    assert_eq!(builds.load(Ordering::SeqCst), 1);
}

#[test]
fn test_failed_factory_is_retried() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&attempts);
    let dispatcher = Dispatcher::from_factory(move || {
        if counter.fetch_add(1, Ordering::SeqCst) == 0 {
            anyhow::bail!("database offline");
        }
        Ok(People::default())
    });

    let first = post(&dispatcher, "/add", r#"{"a":1,"b":2}"#);
    assert_eq!(first.status, 500);
    assert!(first.body["error"].as_str().unwrap().contains("database offline"));
    assert!(dispatcher.router().is_ok());
    assert_eq!(post(&dispatcher, "/add", r#"{"a":1,"b":2}"#).body, json!(3));
}

#[test]
fn test_concurrent_requests() {
    let (_, dispatcher) = people();
    let dispatcher = Arc::new(dispatcher);
    let handles: Vec<_> = (0..8)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            std::thread::spawn(move || {
                let body = format!(r#"{{"a":{i},"b":1}}"#);
                post(&dispatcher, "/add", &body).body
            })
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), json!(i as i64 + 1));
    }
}

#[test]
fn test_unknown_path_error_variant() {
    let (_, dispatcher) = people();
    let err = dispatcher
        .dispatch("/nope", &RequestContext::new("/nope"), b"")
        .unwrap_err();
    assert!(matches!(err, DispatchError::UnknownPath { ref path } if path == "/nope"));
}
