//! nexus-lifecycle
//!
//! The ticket lifecycle engine:
//! - [`store`]: in-memory entity store (masters, tools, tickets, audit logs)
//! - [`state_machine`]: the fixed transition table
//! - [`service`]: [`TicketService`], the sole mutator of ticket state, which
//!   enforces the job-request rule and the one-critical-ticket-per-master
//!   lock and records an audit entry for every mutation
//! - [`error`]: the error taxonomy surfaced to boundary layers

pub mod error;
pub mod service;
pub mod state_machine;
pub mod store;

pub use error::{Entity, ErrorKind, LifecycleError, Precondition};
pub use service::{LifecycleResult, TicketService};
pub use store::EntityStore;
