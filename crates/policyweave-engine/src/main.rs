//! policyweave demo runner
//!
//! Loads a policy config, builds the manager, and drives one inbound invocation
//! (which makes one outbound call) through the resulting chains.
//! - Config path: first argument, default `policyweave.yaml`
//! - Log level: `RUST_LOG`

use std::sync::Arc;

use serde_json::json;
use tracing_subscriber::{fmt, EnvFilter};

use policyweave_core::{Component, ComponentId, Event, ExecutionId, Message, Params, PolicyError};
use policyweave_engine::pointcut::AttributeSourcePointcutFactory;
use policyweave_engine::policy::StaticPolicyProvider;
use policyweave_engine::{config, PolicyManager, ResponseParametersFn};

#[tokio::main]
async fn main() {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let path = std::env::args().nth(1).unwrap_or_else(|| "policyweave.yaml".into());
    let cfg = config::load_from_file(&path).expect("config load failed");
    let provider = StaticPolicyProvider::from_config(&cfg).expect("policy config invalid");

    let manager = Arc::new(
        PolicyManager::builder()
            .provider(Arc::new(provider))
            .source_pointcut_factory(Arc::new(AttributeSourcePointcutFactory::new(
                |id| id.namespace() == "http",
                ["method", "path"],
            )))
            .build(),
    );

    let listener = Component::new(ComponentId::new("http", "listener"), "orders/source");
    let request = Message::with_attributes(params(json!({ "method": "GET", "path": "/orders/42" })));
    let event = Event::new(ExecutionId::generate(), request);
    let execution_id = event.execution_id().clone();

    let response = Arc::new(ResponseParametersFn::new(
        |ev| params(json!({ "status": ev.message.attribute("status").cloned().unwrap_or(json!(200)) })),
        |_| params(json!({ "status": 500 })),
    ));

    let inbound = manager.create_inbound_executable(&listener, &event, response);
    tracing::info!(policies = ?inbound.chain().policy_ids(), "inbound chain built");

    let flow_manager = Arc::clone(&manager);
    let flow = move |event: Event| {
        let manager = Arc::clone(&flow_manager);
        async move {
            let select = Component::new(ComponentId::new("db", "select"), "orders/processors/0");
            let outbound = manager.create_outbound_executable(&select, &event, params(json!({ "id": 42 })));
            let op = |parameters: Params, event: Event| async move {
                Ok::<_, PolicyError>(event.with_message(Message::new(json!({ "row": parameters }), Params::new())))
            };
            outbound.execute(event, &op).await
        }
    };

    match inbound.process(event, &flow).await {
        Ok(outcome) if outcome.is_success() => {
            let payload = outcome.event().message.payload.clone();
            if let Some(success) = outcome.success() {
                tracing::info!(%payload, params = ?success.response_parameters(), "invocation succeeded");
            }
        }
        Ok(outcome) => {
            if let Some(failure) = outcome.failure() {
                let (failure, params) = failure.into_parts();
                tracing::warn!(cause = failure.cause(), params = ?params.resolve(), "invocation failed");
            }
        }
        Err(e) => tracing::error!(code = e.code().as_str(), error = %e, "policy chain error"),
    }

    manager.dispose_state(&execution_id);
}

fn params(v: serde_json::Value) -> Params {
    match v {
        serde_json::Value::Object(map) => map,
        _ => Params::new(),
    }
}
