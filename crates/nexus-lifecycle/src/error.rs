//! Lifecycle error taxonomy.
//!
//! Every variant is reported synchronously and leaves the store untouched:
//! validation completes before any write.

use std::fmt;

use nexus_schemas::TicketState;

/// Which entity a [`LifecycleError::NotFound`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Master,
    Tool,
    Ticket,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Entity::Master => "Master",
            Entity::Tool => "Tool",
            Entity::Ticket => "Ticket",
        })
    }
}

/// Business rule that blocked a structurally legal transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Precondition {
    /// `Waiting -> Monitoring` with a blank job request.
    JobRequestRequired,
    /// Another ticket of the same master already holds `Critical`.
    CriticalLockHeld {
        master_id: String,
        holder_ticket_number: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    NotFound { entity: Entity, id: String },
    /// The tool does not belong to the given master.
    InvalidRelationship { tool_id: String, master_id: String },
    /// Missing, blank or duplicate input.
    InvalidArgument { field: &'static str, reason: String },
    /// Operation not permitted in the ticket's current state.
    InvalidState {
        ticket_number: String,
        state: TicketState,
        operation: &'static str,
    },
    /// Rejected by the state machine.
    InvalidTransition { from: TicketState, to: TicketState },
    PreconditionFailed(Precondition),
    /// Poisoned store lock or audit journal I/O failure.
    Internal(String),
}

/// Coarse classification used by boundary layers to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    InvalidRelationship,
    InvalidArgument,
    InvalidState,
    InvalidTransition,
    PreconditionFailed,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "NOT_FOUND",
            ErrorKind::InvalidRelationship => "INVALID_RELATIONSHIP",
            ErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ErrorKind::InvalidState => "INVALID_STATE",
            ErrorKind::InvalidTransition => "INVALID_TRANSITION",
            ErrorKind::PreconditionFailed => "PRECONDITION_FAILED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl LifecycleError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::InvalidRelationship { .. } => ErrorKind::InvalidRelationship,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            Self::PreconditionFailed(_) => ErrorKind::PreconditionFailed,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_found(entity: Entity, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidRelationship { tool_id, master_id } => write!(
                f,
                "Tool {tool_id} does not belong to selected master {master_id}"
            ),
            Self::InvalidArgument { field, reason } => write!(f, "{field}: {reason}"),
            Self::InvalidState {
                ticket_number,
                state,
                operation,
            } => write!(
                f,
                "{operation} is only allowed for tickets in Waiting state ({ticket_number} is {state})"
            ),
            Self::InvalidTransition { from, to } => {
                write!(f, "Invalid transition from {from} to {to}")
            }
            Self::PreconditionFailed(Precondition::JobRequestRequired) => {
                write!(f, "Job request is required to start monitoring")
            }
            Self::PreconditionFailed(Precondition::CriticalLockHeld {
                holder_ticket_number,
                ..
            }) => write!(
                f,
                "Cannot set ticket to Critical: Master already has a critical ticket ({holder_ticket_number})"
            ),
            Self::Internal(msg) => write!(f, "internal error: {msg}"),
        }
    }
}

impl std::error::Error for LifecycleError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_lock_message_names_holder() {
        let e = LifecycleError::PreconditionFailed(Precondition::CriticalLockHeld {
            master_id: "master-1".to_string(),
            holder_ticket_number: "TKT-00001".to_string(),
        });
        assert_eq!(e.kind(), ErrorKind::PreconditionFailed);
        assert!(e.to_string().contains("TKT-00001"));
    }

    #[test]
    fn transition_message_names_both_states() {
        let e = LifecycleError::InvalidTransition {
            from: TicketState::Waiting,
            to: TicketState::Critical,
        };
        assert_eq!(e.to_string(), "Invalid transition from Waiting to Critical");
    }
}
