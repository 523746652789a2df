//! Shared runtime state for nexus-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum. The ticket service does
//! its own locking; this module owns nothing async itself apart from the
//! heartbeat task.

use std::sync::Arc;
use std::time::Duration;

use nexus_lifecycle::TicketService;
use nexus_schemas::TicketView;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BusMsg (SSE event bus payload)
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat { ts_millis: i64 },
    Ticket(TicketEvent),
}

/// A committed ticket mutation, as seen by subscribers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketEvent {
    /// "created" | "job_request_updated" | "state_changed"
    pub change: String,
    pub ticket: TicketView,
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
    /// Hash of the layered config the daemon booted with (None = defaults).
    pub config_hash: Option<String>,
    pub tickets: Arc<TicketService>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(TicketService::with_defaults(), None)
    }
}

impl AppState {
    pub fn new(tickets: TicketService, config_hash: Option<String>) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        Self {
            bus,
            build: BuildInfo {
                service: "nexus-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            config_hash,
            tickets: Arc::new(tickets),
        }
    }

    /// Publish a ticket change. No subscribers is not an error.
    pub fn publish(&self, change: &str, ticket: TicketView) {
        let _ = self.bus.send(BusMsg::Ticket(TicketEvent {
            change: change.to_string(),
            ticket,
        }));
    }
}

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
