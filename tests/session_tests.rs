//! Tests for the session flow of the built-in echo service
//!
//! # Test Coverage
//!
//! - Login hands out a session id accepted by the auth gate
//! - Header and cookie transport, custom names from config
//! - Logout closes the session

use std::sync::Arc;

use jsonrest::dispatcher::NOT_CONNECTED;
use jsonrest::echo::EchoService;
use jsonrest::{Dispatcher, HandlerConfig, IncomingRequest, ServiceRegistry, SessionStore};
use serde_json::json;

fn echo_dispatcher(store: &Arc<SessionStore>) -> Dispatcher {
    let service = Arc::new(EchoService::new(Arc::clone(store)));
    Dispatcher::new(service).with_sessions(Arc::<SessionStore>::clone(store))
}

fn login(dispatcher: &Dispatcher, user: &str) -> String {
    let response = dispatcher
        .handle(&IncomingRequest::new("/login").with_body(json!({ "user": user }).to_string()));
    assert_eq!(response.status, 200, "{}", response.body);
    response.body["session_id"].as_str().unwrap().to_string()
}

#[test]
fn test_login_then_whoami_by_header() {
    let store = Arc::new(SessionStore::new());
    let dispatcher = echo_dispatcher(&store);

    let anonymous = dispatcher.handle(&IncomingRequest::new("/whoami"));
    assert_eq!(anonymous.status, 401);
    assert_eq!(anonymous.body, json!({ "error": NOT_CONNECTED }));

    let session = login(&dispatcher, "ann");
    assert_eq!(store.len(), 1);

    let response =
        dispatcher.handle(&IncomingRequest::new("/whoami").with_header("X-Session-Id", &session));
    assert_eq!(response.status, 200);
    assert_eq!(response.body, json!({ "response": "ann" }));
}

#[test]
fn test_session_cookie() {
    let store = Arc::new(SessionStore::new());
    let dispatcher = echo_dispatcher(&store);
    let session = login(&dispatcher, "bo");

    let response = dispatcher.handle(
        &IncomingRequest::new("/whoami").with_header("Cookie", format!("theme=dark; session_id={session}")),
    );
    assert_eq!(response.body["response"], "bo");
}

#[test]
fn test_logout_closes_session() {
    let store = Arc::new(SessionStore::new());
    let dispatcher = echo_dispatcher(&store);
    let session = login(&dispatcher, "cy");

    let logout = dispatcher.handle(&IncomingRequest::new("/logout").with_header("x-session-id", &session));
    assert_eq!(logout.body, json!(true));
    assert!(store.is_empty());

    let again = dispatcher.handle(&IncomingRequest::new("/logout").with_header("x-session-id", &session));
    assert_eq!(again.body, json!(false));

    let whoami = dispatcher.handle(&IncomingRequest::new("/whoami").with_header("x-session-id", &session));
    assert_eq!(whoami.status, 401);
}

#[test]
fn test_forged_session_rejected() {
    let store = Arc::new(SessionStore::new());
    let dispatcher = echo_dispatcher(&store);
    login(&dispatcher, "dee");

    for forged in ["not-a-ulid", "01ARZ3NDEKTSV4RRFFQ69G5FAV", ""] {
        let response =
            dispatcher.handle(&IncomingRequest::new("/whoami").with_header("x-session-id", forged));
        assert_eq!(response.status, 401, "{forged}");
    }
}

#[test]
fn test_empty_user_is_fault() {
    let store = Arc::new(SessionStore::new());
    let dispatcher = echo_dispatcher(&store);
    let response = dispatcher.handle(&IncomingRequest::new("/login").with_body(r#"{"user":" "}"#));
    assert_eq!(response.status, 400);
    assert_eq!(response.body["code"], "EMPTY_USER");
    assert!(store.is_empty());
}

#[test]
fn test_configured_session_names() {
    let mut registry = ServiceRegistry::new();
    registry.register("echo", |sessions| Ok(EchoService::new(sessions)));
    let config = HandlerConfig::from_yaml(
        "service: echo\nlog_path: e.log\nsession:\n  header: x-auth\n  cookie: auth\n",
    )
    .unwrap();
    let dispatcher = registry.dispatcher_for(&config).unwrap();
    let session = login(&dispatcher, "eve");

    let default_header =
        dispatcher.handle(&IncomingRequest::new("/whoami").with_header("x-session-id", &session));
    assert_eq!(default_header.status, 401);

    let custom_header =
        dispatcher.handle(&IncomingRequest::new("/whoami").with_header("x-auth", &session));
    assert_eq!(custom_header.body["response"], "eve");

    let custom_cookie = dispatcher
        .handle(&IncomingRequest::new("/whoami").with_header("cookie", format!("auth={session}")));
    assert_eq!(custom_cookie.body["response"], "eve");
}

#[test]
fn test_ping_and_echo() {
    let dispatcher = echo_dispatcher(&Arc::new(SessionStore::new()));
    let ping = dispatcher.handle(&IncomingRequest::new("/ping"));
    assert_eq!(ping.body, json!({ "response": "pong" }));

    let echo = dispatcher.handle(&IncomingRequest::new("/echo").with_body(r#"{"message":"hi"}"#));
    assert_eq!(echo.body, json!({ "response": "hi" }));
}
