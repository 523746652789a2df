//! nexus-schemas
//!
//! Wire-level domain types shared by every Nexus crate: catalog entities
//! (masters, tools), tickets, audit log entries and the denormalized
//! ticket read model. JSON field names are camelCase.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(s: impl Into<String>) -> Self {
                Self(s.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(
    /// Master identity (stable string, e.g. `master-1`).
    MasterId
);
string_id!(
    /// Tool identity (e.g. `tool-1`).
    ToolId
);
string_id!(
    /// Ticket identity. Distinct from the human-readable ticket number.
    TicketId
);
string_id!(AuditLogId);

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

/// Top-level owner grouping tools. Immutable once seeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Master {
    pub id: MasterId,
    pub name: String,
    pub description: String,
}

/// A named resource belonging to exactly one master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: ToolId,
    pub name: String,
    pub master_id: MasterId,
}

// ---------------------------------------------------------------------------
// TicketState
// ---------------------------------------------------------------------------

/// Every state a ticket can occupy. `Waiting` is initial, `Closed` terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TicketState {
    Waiting,
    Monitoring,
    Hold,
    Ready,
    Critical,
    Complete,
    Failed,
    Closed,
}

impl TicketState {
    pub const ALL: [TicketState; 8] = [
        TicketState::Waiting,
        TicketState::Monitoring,
        TicketState::Hold,
        TicketState::Ready,
        TicketState::Critical,
        TicketState::Complete,
        TicketState::Failed,
        TicketState::Closed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketState::Waiting => "Waiting",
            TicketState::Monitoring => "Monitoring",
            TicketState::Hold => "Hold",
            TicketState::Ready => "Ready",
            TicketState::Critical => "Critical",
            TicketState::Complete => "Complete",
            TicketState::Failed => "Failed",
            TicketState::Closed => "Closed",
        }
    }
}

impl fmt::Display for TicketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a [`TicketState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownState(pub String);

impl fmt::Display for UnknownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown ticket state '{}'", self.0)
    }
}

impl std::error::Error for UnknownState {}

impl FromStr for TicketState {
    type Err = UnknownState;

    /// Exact, case-sensitive match on the state name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TicketState::ALL
            .iter()
            .copied()
            .find(|st| st.as_str() == s.trim())
            .ok_or_else(|| UnknownState(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub id: TicketId,
    /// Human-readable sequential number, e.g. `TKT-00042`.
    pub ticket_number: String,
    pub master_id: MasterId,
    pub tool_id: ToolId,
    pub state: TicketState,
    pub job_request: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn is_critical(&self) -> bool {
        self.state == TicketState::Critical
    }

    pub fn has_job_request(&self) -> bool {
        !self.job_request.trim().is_empty()
    }
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    Created,
    #[serde(rename = "Job Request Updated")]
    JobRequestUpdated,
    #[serde(rename = "State Changed")]
    StateChanged,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Created => "Created",
            AuditAction::JobRequestUpdated => "Job Request Updated",
            AuditAction::StateChanged => "State Changed",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable record of one ticket-affecting event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: AuditLogId,
    /// Back-reference only; the log does not own the ticket.
    pub ticket_id: TicketId,
    pub action: AuditAction,
    pub user: String,
    pub timestamp: DateTime<Utc>,
    pub details: String,
}

// ---------------------------------------------------------------------------
// Read model
// ---------------------------------------------------------------------------

/// Ticket joined with its master/tool display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketView {
    #[serde(flatten)]
    pub ticket: Ticket,
    /// Master display name (empty when the master is unknown).
    pub master: String,
    /// Tool display name (empty when the tool is unknown).
    pub tool: String,
    pub is_critical: bool,
}

impl TicketView {
    pub fn new(ticket: Ticket, master: Option<&Master>, tool: Option<&Tool>) -> Self {
        let is_critical = ticket.is_critical();
        Self {
            ticket,
            master: master.map(|m| m.name.clone()).unwrap_or_default(),
            tool: tool.map(|t| t.name.clone()).unwrap_or_default(),
            is_critical,
        }
    }
}
