//! # Kitchen Display Demo
//!
//! Replays a scripted session against a full engine: a logging rendering task, a
//! loopback transport and an in-memory (or JSON file) clock store.
//!
//! - `KDS_CONFIG`: optional TOML config path.
//! - `KDS_QUEUE_POLICY`: `single_focus` (default) or `bounded`, overrides the config.
//! - `KDS_STATE`: optional JSON file for the persisted clock.

use kds_engine::clock::{JsonFileStore, KeyValueStore, MemoryStore};
use kds_engine::codec::encode_hex;
use kds_engine::config::{EngineConfig, PolicyKind};
use kds_engine::notifier::LoopbackTransport;
use kds_engine::presentation::{ChannelPresenter, LifecycleEvent};
use kds_engine::runtime::{setup_tracing, KitchenSystem};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn, Instrument};

fn load_config() -> Result<EngineConfig, String> {
    let config = match std::env::var("KDS_CONFIG") {
        Ok(path) => EngineConfig::from_path(path).map_err(|e| e.to_string())?,
        Err(_) => EngineConfig::default(),
    };
    match std::env::var("KDS_QUEUE_POLICY") {
        Ok(policy) => {
            let policy = policy.parse::<PolicyKind>().map_err(|e| e.to_string())?;
            Ok(config.with_policy(policy))
        }
        Err(_) => Ok(config),
    }
}

async fn render(mut events: mpsc::UnboundedReceiver<LifecycleEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            LifecycleEvent::OrderAdded { order, handle } => {
                info!(order_id = %order.id, number = order.number, dishes = %order.dish_summary, ?handle, "[screen] row added")
            }
            LifecycleEvent::OrderUpdated(order) => {
                info!(order_id = %order.id, dishes = %order.dish_summary, "[screen] redraw")
            }
            LifecycleEvent::FocusChanged { focus: Some(order), .. } => {
                info!(order_id = %order.id, number = order.number, dishes = %order.dish_summary, "[screen] now preparing")
            }
            LifecycleEvent::FocusChanged { focus: None, .. } => info!("[screen] nothing in preparation"),
            LifecycleEvent::OrderRemoved { order_id, .. } => info!(%order_id, "[screen] removed"),
            LifecycleEvent::WaitingCountChanged(count) => info!(count, "[screen] waiting"),
            LifecycleEvent::TransientMessage { text, duration } => {
                info!(%text, ms = duration.as_millis() as u64, "[screen] popup")
            }
            LifecycleEvent::Idle => info!("[screen] waiting for orders..."),
            LifecycleEvent::TimeSynced { text, .. } => info!(%text, "[screen] clock"),
            LifecycleEvent::ConnectionChanged(connected) => info!(connected, "[screen] link"),
        }
    }
}

fn script() -> Vec<String> {
    vec![
        // Verbose generation.
        format!(
            r#"{{"type":"add","orderId":"order_0001","items":[{{"name":"{}"}},{{"name":"Fries"}}]}}"#,
            encode_hex("Burger")
        ),
        // Terse generation.
        format!(r#"{{"t":"a","o":"order_0002","c":["{}","Cola"]}}"#, encode_hex("Noodles")),
        r#"{"t":"a","o":"order_0003","c":["Salad"]}"#.to_string(),
        // Redelivered add is ignored.
        r#"{"t":"a","o":"order_0003","c":["Salad"]}"#.to_string(),
        r#"{"t":"u","o":"order_0002","c":["Noodles","Tea"]}"#.to_string(),
        r#"{"t":"u","o":"order_0001","status":true}"#.to_string(),
        r#"{"t":"i","command":"display_test","timestamp":"9/28/2025, 6:00:26 PM"}"#.to_string(),
        format!(r#"{{"t":"i","content":"{}"}}"#, encode_hex("Kitchen closes at 22:00")),
        // Broken JSON, content still recovered.
        format!(r#"{{"t":"i","content":"{}",,"#, encode_hex("Two hungry tables")),
        r#"{"t":"r","o":"order_9999"}"#.to_string(),
        "not json at all".to_string(),
    ]
}

#[tokio::main]
async fn main() -> Result<(), String> {
    setup_tracing();

    let config = load_config()?;
    info!(policy = ?config.policy, "Starting kitchen display demo");

    let kv: Arc<dyn KeyValueStore> = match std::env::var("KDS_STATE") {
        Ok(path) => Arc::new(JsonFileStore::new(path)),
        Err(_) => Arc::new(MemoryStore::new()),
    };
    let (presenter, events) = ChannelPresenter::new();
    let renderer = tokio::spawn(render(events));

    let system = KitchenSystem::new(
        config,
        Box::new(presenter),
        Arc::new(LoopbackTransport::new(true)),
        kv,
    )
    .await
    .map_err(|e| e.to_string())?;

    system
        .ingress
        .connection_changed(true)
        .await
        .map_err(|e| e.to_string())?;

    let span = tracing::info_span!("replay");
    async {
        for frame in script() {
            if let Err(e) = system.ingress.deliver(frame.into_bytes()).await {
                warn!(error = %e, "frame rejected");
            }
        }
    }
    .instrument(span)
    .await;

    let span = tracing::info_span!("operator");
    async {
        match system.coordinator.complete_focused().await {
            Ok(outcome) => info!(?outcome, "Operator completed focused order"),
            Err(e) => warn!(error = %e, "Operator action failed"),
        }
        match system.coordinator.snapshot().await {
            Ok(orders) => info!(live = orders.len(), "Orders still on screen"),
            Err(e) => warn!(error = %e, "Snapshot failed"),
        }
    }
    .instrument(span)
    .await;

    system.shutdown().await?;

    if let Err(e) = renderer.await {
        warn!("Renderer task failed: {:?}", e);
    }
    info!("Demo finished");
    Ok(())
}
