//! Ticket state machine.
//!
//! # State diagram
//!
//! ```text
//!   Waiting ──► Monitoring ──► Ready ──► Critical ──► Complete ──► Closed (term.)
//!                 ▲    │                    │                        ▲
//!                 │    ▼                    └──────► Failed ─────────┘
//!                 └── Hold
//! ```
//!
//! The table is structural only. Business rules layered on top (job request
//! required before monitoring, one critical ticket per master) live in
//! [`crate::service`].

use nexus_schemas::TicketState;

/// Fixed successor set of `from`. Empty for `Closed`.
pub fn allowed_next(from: TicketState) -> &'static [TicketState] {
    use TicketState::*;

    match from {
        Waiting => &[Monitoring],
        Monitoring => &[Ready, Hold],
        Hold => &[Monitoring],
        Ready => &[Critical],
        Critical => &[Complete, Failed],
        Complete => &[Closed],
        Failed => &[Closed],
        Closed => &[],
    }
}

/// `true` iff `to` is in the successor set of `from`.
pub fn is_allowed(from: TicketState, to: TicketState) -> bool {
    allowed_next(from).contains(&to)
}

pub fn is_terminal(state: TicketState) -> bool {
    allowed_next(state).is_empty()
}
