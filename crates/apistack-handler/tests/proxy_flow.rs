//! proxy_flow.rs
//!
//! End-to-end proxy events through the greeting handler.

use std::sync::Arc;

use apistack_handler::credential;
use apistack_handler::{Greeting, GreetingHandler, IntakeAck, ProxyEvent, ProxyHandler, StaticVersion};

fn handler() -> GreetingHandler {
    GreetingHandler::new("sam.leung", Arc::new(StaticVersion::new("1.40.0"))).with_cost(credential::MIN_COST)
}

#[test]
fn get_returns_greeting() {
    let event = ProxyEvent::new("GET", "/api").with_request_context("req-1", "dev");
    let resp = handler().handle(&event).unwrap();

    assert_eq!(resp.status_code, 200);
    assert_eq!(resp.headers["Content-Type"], "application/json");

    let body: Greeting = serde_json::from_str(&resp.body).unwrap();
    assert!(body.message.contains("Welcome to deno"));
    assert!(body.user.full_name.ends_with('!'));
    assert!(body.key.starts_with("$2b$04$"));
    assert!(credential::verify(&body.uuid, &body.key).unwrap());

    let raw: serde_json::Value = serde_json::from_str(&resp.body).unwrap();
    assert!(raw["user"]["fullName"].is_string());
}

#[test]
fn each_get_mints_a_new_id() {
    let h = handler();
    let a: Greeting = serde_json::from_str(&h.handle(&ProxyEvent::new("GET", "/api")).unwrap().body).unwrap();
    let b: Greeting = serde_json::from_str(&h.handle(&ProxyEvent::new("GET", "/api")).unwrap().body).unwrap();
    assert_ne!(a.uuid, b.uuid);
}

#[test]
fn post_accepts_array_body() {
    let event = ProxyEvent::new("POST", "/api")
        .with_body(r#"[{"content":{"photoUrl":"u","text":"t","type":"text"}}]"#);
    let resp = handler().handle(&event).unwrap();
    assert_eq!(resp.status_code, 200);
    let ack: IntakeAck = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(ack.accepted, 1);
}

#[test]
fn post_with_malformed_body_is_400() {
    let event = ProxyEvent::new("POST", "/api").with_body("not json");
    let resp = handler().handle(&event).unwrap();
    assert_eq!(resp.status_code, 400);
}
