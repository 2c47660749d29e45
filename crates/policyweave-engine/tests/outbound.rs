#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use policyweave_core::{
    Component, ComponentId, Event, Message, Params, PointcutParameters, PolicyError, Result,
};
use policyweave_engine::config::AppliesTo;
use policyweave_engine::pointcut::AttributeSourcePointcutFactory;
use policyweave_engine::policy::{Matcher, StaticPolicyProvider};
use policyweave_engine::transform::{OperationParametersTransformer, SupportsComponent};
use policyweave_engine::{OperationCall, OperationNext, Policy, PolicyManager, PolicyProvider, PolicyState};

use common::*;

/// Doubles the numeric `id` parameter.
struct DoubleId;

#[async_trait]
impl Policy for DoubleId {
    fn id(&self) -> &str {
        "double-id"
    }

    async fn on_operation(&self, mut call: OperationCall, next: OperationNext<'_>, _state: PolicyState) -> Result<Event> {
        if let Some(id) = call.parameters.get("id").and_then(Value::as_i64) {
            call.parameters.insert("id".into(), json!(id * 2));
        }
        next.run(call).await
    }
}

fn echo_parameters() -> impl Fn(Params, Event) -> futures_util::future::Ready<Result<Event>> + Send + Sync {
    |parameters: Params, event: Event| {
        futures_util::future::ready(Ok(
            event.with_message(Message::new(Value::Object(parameters), Default::default()))
        ))
    }
}

#[tokio::test]
async fn links_rewrite_parameters_before_the_operation() {
    let double: Arc<dyn Policy> = Arc::new(DoubleId);
    let manager = PolicyManager::builder().provider(provider_of(vec![double])).build();
    let event = get_request("exec-out");

    let outbound = manager.create_outbound_executable(&db_select(), &event, params(json!({ "id": 42 })));
    assert_eq!(outbound.chain().policy_ids(), vec!["double-id"]);
    assert_eq!(outbound.parameters()["id"], json!(42));

    let result = outbound.execute(event, &echo_parameters()).await.unwrap();
    assert_eq!(result.message.payload, json!({ "id": 84 }));
}

#[tokio::test]
async fn no_policies_calls_the_operation_with_original_parameters() {
    let manager = PolicyManager::builder().build();
    let event = get_request("exec-plain");

    let outbound = manager.create_outbound_executable(&db_select(), &event, params(json!({ "id": 42 })));
    assert!(outbound.chain().is_passthrough());

    let result = outbound.execute(event, &echo_parameters()).await.unwrap();
    assert_eq!(result.message.payload, json!({ "id": 42 }));
    assert!(manager.state_store().is_empty());
}

#[tokio::test]
async fn operation_errors_come_back_unwrapped() {
    let journal = Journal::default();
    let manager = PolicyManager::builder()
        .provider(provider_of(vec![Recording::new("p1", &journal)]))
        .build();
    let event = get_request("exec-err");
    let outbound = manager.create_outbound_executable(&db_select(), &event, Params::new());

    let failing = |_p: Params, event: Event| async move {
        Err::<Event, _>(PolicyError::execution(event, "connection reset"))
    };
    let err = outbound.execute(event, &failing).await.expect_err("operation failed");
    match err {
        PolicyError::Execution(failure) => assert_eq!(failure.cause(), "connection reset"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(journal.entries(), vec!["enter:p1", "exit:p1"]);
}

/// Exposes `{sql}` call parameters as the message payload.
struct SqlTransformer;

impl SupportsComponent for SqlTransformer {
    fn supports(&self, component: &ComponentId) -> bool {
        component.namespace() == "db"
    }
}

impl OperationParametersTransformer for SqlTransformer {
    fn message_from_parameters(&self, parameters: &Params) -> Message {
        Message::new(parameters.get("sql").cloned().unwrap_or(Value::Null), Params::new())
    }

    fn parameters_from_message(&self, message: &Message) -> Params {
        params(json!({ "sql": message.payload }))
    }
}

/// Appends a row limit to the SQL it sees in the message payload.
struct LimitRows;

#[async_trait]
impl Policy for LimitRows {
    fn id(&self) -> &str {
        "limit-rows"
    }

    async fn on_operation(&self, mut call: OperationCall, next: OperationNext<'_>, _state: PolicyState) -> Result<Event> {
        let sql = call.event.message.payload.as_str().unwrap_or_default().to_owned();
        call.event.message.payload = json!(format!("{sql} LIMIT 10"));
        next.run(call).await
    }
}

#[tokio::test]
async fn transformer_exposes_parameters_as_message_and_restores_flow_message() {
    let limit: Arc<dyn Policy> = Arc::new(LimitRows);
    let manager = PolicyManager::builder()
        .provider(provider_of(vec![limit]))
        .operation_transformer(Arc::new(SqlTransformer))
        .build();
    let event = get_request("exec-sql");
    let outbound = manager.create_outbound_executable(
        &db_select(),
        &event,
        params(json!({ "sql": "SELECT * FROM orders", "timeout_ms": 500 })),
    );

    let seen = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&seen);
    let operation = move |parameters: Params, event: Event| {
        *sink.lock().unwrap() = Some((parameters, event.message.clone()));
        async move { Ok::<_, PolicyError>(event) }
    };
    outbound.execute(event, &operation).await.unwrap();

    let (parameters, message) = seen.lock().unwrap().take().unwrap();
    assert_eq!(parameters["sql"], json!("SELECT * FROM orders LIMIT 10"));
    assert_eq!(parameters["timeout_ms"], json!(500));
    assert_eq!(message.payload, json!("hello"));
    assert_eq!(message.attribute("method"), Some(&json!("GET")));
}

/// Provider that records every pointcut it is asked about.
#[derive(Default)]
struct Snooping {
    seen: Mutex<Vec<PointcutParameters>>,
}

impl PolicyProvider for Snooping {
    fn find_source_policies(&self, pointcut: &PointcutParameters) -> Vec<Arc<dyn Policy>> {
        self.seen.lock().unwrap().push(pointcut.clone());
        Vec::new()
    }

    fn find_operation_policies(&self, pointcut: &PointcutParameters) -> Vec<Arc<dyn Policy>> {
        self.seen.lock().unwrap().push(pointcut.clone());
        Vec::new()
    }
}

#[tokio::test]
async fn operation_pointcut_carries_the_source_pointcut() {
    let provider = Arc::new(Snooping::default());
    let manager = PolicyManager::builder()
        .provider(provider.clone())
        .source_pointcut_factory(Arc::new(AttributeSourcePointcutFactory::new(
            |id: &ComponentId| id.namespace() == "http",
            ["method"],
        )))
        .build();

    let event = get_request("exec-nested");
    let inbound = manager.create_inbound_executable(&listener(), &event, CountingProcessor::new().processor());
    let mut event = event;
    event.set_source_pointcut(Arc::clone(inbound.pointcut().unwrap()));
    manager.create_outbound_executable(&db_select(), &event, Params::new());

    let seen = provider.seen.lock().unwrap();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].attribute("method"), Some(&json!("GET")));
    assert_eq!(seen[1].component_id(), &ComponentId::new("db", "select"));
    let source = seen[1].source().expect("source pointcut attached");
    assert_eq!(source.component_id(), &ComponentId::new("http", "listener"));
    assert_eq!(source.attribute("method"), Some(&json!("GET")));
}

#[tokio::test]
async fn operation_policies_can_match_on_source_attributes() {
    let journal = Journal::default();
    let provider = StaticPolicyProvider::new().bind(
        AppliesTo::Operation,
        Matcher::any().with_attribute("method", "GET"),
        Recording::new("reads-only", &journal),
    );
    let manager = PolicyManager::builder()
        .provider(Arc::new(provider))
        .source_pointcut_factory(Arc::new(AttributeSourcePointcutFactory::new(
            |_: &ComponentId| true,
            ["method"],
        )))
        .build();

    let get = get_request("exec-get");
    let inbound = manager.create_inbound_executable(&listener(), &get, CountingProcessor::new().processor());
    let get = get.with_source_pointcut(Arc::clone(inbound.pointcut().unwrap()));
    let outbound = manager.create_outbound_executable(&db_select(), &get, Params::new());
    assert_eq!(outbound.chain().policy_ids(), vec!["reads-only"]);

    let post = Event::new(
        get.execution_id().clone(),
        Message::new(Value::Null, params(json!({ "method": "POST" }))),
    );
    let inbound = manager.create_inbound_executable(&listener(), &post, CountingProcessor::new().processor());
    // source policies never apply to this binding, but the pointcut is still resolved
    assert!(inbound.chain().is_passthrough());
    let post = post.with_source_pointcut(Arc::clone(inbound.pointcut().unwrap()));
    let other = Component::new(ComponentId::new("db", "insert"), "orders/processors/1");
    assert!(manager
        .create_outbound_executable(&other, &post, Params::new())
        .chain()
        .is_passthrough());
}

#[tokio::test]
async fn operation_links_enter_in_order_and_exit_in_reverse() {
    let journal = Journal::default();
    let manager = PolicyManager::builder()
        .provider(provider_of(vec![
            Recording::new("p1", &journal),
            Recording::new("p2", &journal),
        ]))
        .build();
    let event = get_request("exec-op-order");
    let outbound = manager.create_outbound_executable(&db_select(), &event, Params::new());

    let op_journal = journal.clone();
    let operation = move |_p: Params, event: Event| {
        op_journal.push("operation");
        async move { Ok::<_, PolicyError>(event) }
    };
    outbound.execute(event, &operation).await.unwrap();

    assert_eq!(
        journal.entries(),
        vec!["enter:p1", "enter:p2", "operation", "exit:p2", "exit:p1"]
    );
}
