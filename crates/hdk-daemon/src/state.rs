//! Shared runtime state for hdk-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The order service is
//! itself a cheap clone over `Arc`s.

use std::time::Duration;

use hdk_kitchen::{OrderEvent, OrderService};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Order(OrderEvent),
}

impl BusMsg {
    /// SSE `event:` name.
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::Order(OrderEvent::Created { .. }) => "created",
            BusMsg::Order(OrderEvent::Claimed { .. }) => "claimed",
            BusMsg::Order(OrderEvent::StatusChanged { .. }) => "status_changed",
            BusMsg::Order(OrderEvent::Deleted { .. }) => "deleted",
        }
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    pub orders: OrderService,
}

impl AppState {
    pub fn new(orders: OrderService) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);
        Self {
            bus,
            build: BuildInfo {
                service: "hdk-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            orders,
        }
    }
}

// ---------------------------------------------------------------------------
// Background tasks
// ---------------------------------------------------------------------------

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}

/// Spawn a task relaying service [`OrderEvent`]s onto the SSE bus. Ends
/// when the service side of the channel is dropped.
pub fn spawn_event_forwarder(
    mut events: broadcast::Receiver<OrderEvent>,
    bus: broadcast::Sender<BusMsg>,
) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(ev) => {
                    debug!(order_id = %ev.order_id(), "relaying order event");
                    let _ = bus.send(BusMsg::Order(ev));
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "order event relay lagged; events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
