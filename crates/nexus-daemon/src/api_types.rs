//! Request and response types for all nexus-daemon HTTP endpoints.
//!
//! Request fields are `Option` so missing fields can be answered with a
//! precise 400 instead of a generic extractor rejection. No business logic
//! lives here.

use nexus_schemas::{Ticket, TicketState};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// /health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
    pub config_hash: Option<String>,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable machine-readable kind, e.g. "PRECONDITION_FAILED".
    pub kind: String,
}

// ---------------------------------------------------------------------------
// /api/tools
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateToolRequest {
    pub master_id: Option<String>,
    pub tool_name: Option<String>,
}

// ---------------------------------------------------------------------------
// /api/tickets
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub master_id: Option<String>,
    pub tool_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequestRequest {
    pub job_request: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    /// Raw state name; parsed in the handler so unknown names get a 400.
    pub to_state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedTransitionsResponse {
    pub ticket_id: String,
    pub state: TicketState,
    pub allowed: Vec<TicketState>,
}

// ---------------------------------------------------------------------------
// /api/masters/:id/critical
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CriticalLockResponse {
    pub master_id: String,
    pub locked: bool,
    /// The ticket holding the lock, if any.
    pub ticket: Option<Ticket>,
}
