#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;

use policyweave_core::{
    Component, ComponentId, ErrorCode, Event, ExecutionId, LazyParams, Message, Params,
    PointcutParameters, PolicyError, SourceFailure, SourceOutcome, SourceSuccess,
};

#[test]
fn component_id_parses_namespace_and_name() {
    let id: ComponentId = "http:listener".parse().unwrap();
    assert_eq!(id.namespace(), "http");
    assert_eq!(id.name(), "listener");
    assert_eq!(id.to_string(), "http:listener");
    assert_eq!(id, ComponentId::new("http", "listener"));
}

#[test]
fn component_id_rejects_malformed_input() {
    for bad in ["listener", ":listener", "http:", ""] {
        let err = bad.parse::<ComponentId>().expect_err(bad);
        assert_eq!(err.code(), ErrorCode::BadRequest, "{bad}");
    }
}

#[test]
fn error_codes_are_stable() {
    let event = Event::new(ExecutionId::new("exec-1"), Message::default());
    let cases = [
        (PolicyError::execution(event, "boom"), "EXECUTION_FAILED"),
        (PolicyError::policy("p", "bad"), "POLICY_FAILED"),
        (PolicyError::rejected("p", "no"), "REJECTED"),
        (PolicyError::BadRequest("x".into()), "BAD_REQUEST"),
        (PolicyError::UnsupportedVersion, "UNSUPPORTED_VERSION"),
        (PolicyError::Internal("x".into()), "INTERNAL"),
    ];
    for (err, code) in cases {
        assert_eq!(err.code().as_str(), code);
    }
}

#[test]
fn execution_failure_keeps_the_failed_event() {
    let event = Event::new(
        ExecutionId::new("exec-7"),
        Message::new(json!("partial"), Params::new()),
    );
    let PolicyError::Execution(failure) = PolicyError::execution(event, "timeout") else {
        panic!("expected execution error");
    };
    assert_eq!(failure.cause(), "timeout");
    assert_eq!(failure.to_string(), "timeout (execution=exec-7)");
    assert_eq!(failure.into_event().message.payload, json!("partial"));
}

#[test]
fn generated_execution_ids_are_unique() {
    let ids: HashSet<ExecutionId> = (0..1000).map(|_| ExecutionId::generate()).collect();
    assert_eq!(ids.len(), 1000);
    assert!(ids.iter().all(|id| id.as_str().starts_with("exec-")));
}

#[test]
fn lazy_params_run_only_when_resolved() {
    let ran = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&ran);
    let lazy = LazyParams::new(move || {
        flag.store(true, Ordering::SeqCst);
        let mut p = Params::new();
        p.insert("status".into(), json!(200));
        p
    });

    let event = Event::new(ExecutionId::new("exec-1"), Message::default());
    let outcome = SourceOutcome::Success(SourceSuccess::new(
        event,
        lazy,
        Arc::new(|_: &Event| Params::new()),
    ));
    assert!(outcome.is_success());
    assert!(!ran.load(Ordering::SeqCst));

    let params = outcome.success().unwrap().response_parameters();
    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(params["status"], json!(200));
}

#[test]
fn failure_outcome_exposes_the_failed_event() {
    let event = Event::new(ExecutionId::new("exec-2"), Message::new(json!("oops"), Params::new()));
    let PolicyError::Execution(failure) = PolicyError::execution(event, "db down") else {
        panic!("expected execution error");
    };
    let outcome = SourceOutcome::Failure(SourceFailure::new(*failure, LazyParams::new(Params::new)));

    assert!(!outcome.is_success());
    assert_eq!(outcome.event().message.payload, json!("oops"));
    let failure = outcome.failure().unwrap();
    assert_eq!(failure.failure().cause(), "db down");
    assert!(failure.response_parameters().is_empty());
}

#[test]
fn error_response_parameters_use_the_given_event() {
    let success = SourceSuccess::new(
        Event::new(ExecutionId::new("exec-3"), Message::default()),
        LazyParams::new(Params::new),
        Arc::new(|ev: &Event| {
            let mut p = Params::new();
            p.insert("execution".into(), json!(ev.execution_id().as_str()));
            p
        }),
    );
    let other = Event::new(ExecutionId::new("exec-other"), Message::default());
    assert_eq!(success.error_response_parameters(&other)["execution"], json!("exec-other"));
}

#[test]
fn operation_pointcut_links_to_its_source() {
    let source = Arc::new(
        PointcutParameters::new(Component::new(ComponentId::new("http", "listener"), "orders/source"))
            .with_attribute("method", "GET"),
    );
    let op = PointcutParameters::new(Component::new(ComponentId::new("db", "select"), "orders/processors/0"))
        .with_source(Some(Arc::clone(&source)));

    assert_eq!(op.component().location(), "orders/processors/0");
    assert!(op.attribute("method").is_none());
    assert_eq!(op.source().unwrap().attribute("method"), Some(&json!("GET")));
    assert!(source.source().is_none());
}

#[test]
fn event_source_pointcut_is_attached_once_resolved() {
    let mut event = Event::new(ExecutionId::new("exec-4"), Message::default());
    assert!(event.source_pointcut().is_none());

    let pointcut = Arc::new(PointcutParameters::new(Component::new(
        ComponentId::new("http", "listener"),
        "orders/source",
    )));
    event.set_source_pointcut(Arc::clone(&pointcut));
    assert_eq!(event.source_pointcut().unwrap().component_id().name(), "listener");
    assert_eq!(event.clone().execution_id().as_str(), "exec-4");
}

#[test]
fn failure_parts_outlive_the_outcome() {
    let event = Event::new(ExecutionId::new("exec-5"), Message::default());
    let PolicyError::Execution(failure) = PolicyError::execution(event, "queue full") else {
        panic!("expected execution error");
    };
    let outcome = SourceFailure::new(
        *failure,
        LazyParams::new(|| {
            let mut p = Params::new();
            p.insert("status".into(), json!(503));
            p
        }),
    );

    let (failure, params) = outcome.into_parts();
    assert_eq!(failure.cause(), "queue full");
    assert_eq!(params.resolve()["status"], json!(503));
}
