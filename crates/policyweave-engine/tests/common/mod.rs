//! Shared fixtures for engine integration tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use policyweave_core::{Component, ComponentId, Event, ExecutionId, Message, Params, Result};
use policyweave_engine::config::AppliesTo;
use policyweave_engine::policy::{rejection, Matcher, StaticPolicyProvider};
use policyweave_engine::{
    OperationCall, OperationNext, Policy, PolicyState, ResponseParametersFn, SourceNext,
};

pub fn params(v: Value) -> Params {
    match v {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

pub fn listener() -> Component {
    Component::new(ComponentId::new("http", "listener"), "orders/source")
}

pub fn db_select() -> Component {
    Component::new(ComponentId::new("db", "select"), "orders/processors/0")
}

pub fn get_request(id: &str) -> Event {
    Event::new(
        ExecutionId::new(id),
        Message::new(json!("hello"), params(json!({ "method": "GET" }))),
    )
}

/// Shared entry/exit log.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Records `enter:<id>` before and `exit:<id>` after the rest of the chain.
pub struct Recording {
    pub id: String,
    pub journal: Journal,
}

impl Recording {
    pub fn new(id: &str, journal: &Journal) -> Arc<dyn Policy> {
        Arc::new(Self {
            id: id.into(),
            journal: journal.clone(),
        })
    }
}

#[async_trait]
impl Policy for Recording {
    fn id(&self) -> &str {
        &self.id
    }

    async fn on_source(&self, event: Event, next: SourceNext<'_>, _state: PolicyState) -> Result<Event> {
        self.journal.push(format!("enter:{}", self.id));
        // suspend once so completion order is exercised across an await point
        tokio::task::yield_now().await;
        let result = next.run(event).await;
        self.journal.push(format!("exit:{}", self.id));
        result
    }

    async fn on_operation(
        &self,
        call: OperationCall,
        next: OperationNext<'_>,
        _state: PolicyState,
    ) -> Result<Event> {
        self.journal.push(format!("enter:{}", self.id));
        let result = next.run(call).await;
        self.journal.push(format!("exit:{}", self.id));
        result
    }
}

/// Refuses every inbound invocation with a 401, never calling the rest of the chain.
pub struct Reject {
    pub id: String,
    pub journal: Journal,
}

impl Reject {
    pub fn new(id: &str, journal: &Journal) -> Arc<dyn Policy> {
        Arc::new(Self {
            id: id.into(),
            journal: journal.clone(),
        })
    }
}

#[async_trait]
impl Policy for Reject {
    fn id(&self) -> &str {
        &self.id
    }

    async fn on_source(&self, event: Event, _next: SourceNext<'_>, _state: PolicyState) -> Result<Event> {
        self.journal.push(format!("enter:{}", self.id));
        Ok(rejection(event, 401, "unauthorized"))
    }
}

/// Provider binding every policy to every invocation, in the given order.
pub fn provider_of(policies: Vec<Arc<dyn Policy>>) -> Arc<StaticPolicyProvider> {
    let mut provider = StaticPolicyProvider::new();
    for p in policies {
        provider = provider.bind(AppliesTo::Both, Matcher::any(), p);
    }
    Arc::new(provider)
}

/// Processor whose success params echo the result and count evaluations.
pub struct CountingProcessor {
    pub success_calls: Arc<AtomicUsize>,
    pub failure_calls: Arc<AtomicUsize>,
}

impl CountingProcessor {
    pub fn new() -> Self {
        Self {
            success_calls: Arc::new(AtomicUsize::new(0)),
            failure_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn processor(&self) -> Arc<ResponseParametersFn> {
        let success = Arc::clone(&self.success_calls);
        let failure = Arc::clone(&self.failure_calls);
        Arc::new(ResponseParametersFn::new(
            move |ev| {
                success.fetch_add(1, Ordering::SeqCst);
                success_params(ev)
            },
            move |ev| {
                failure.fetch_add(1, Ordering::SeqCst);
                failure_params(ev)
            },
        ))
    }
}

pub fn success_params(ev: &Event) -> Params {
    let status = ev.message.attribute("status").cloned().unwrap_or(json!(200));
    params(json!({ "status": status, "body": ev.message.payload }))
}

pub fn failure_params(ev: &Event) -> Params {
    params(json!({ "status": 500, "body": ev.message.payload }))
}
