//! Shared fixtures for Nexus scenario tests.
//!
//! - [`seeded_service`]: fresh service over the default catalog
//!   (`master-1`/`tool-1` Zeus, `master-2`/`tool-2` Phoenix)
//! - [`journaled_service`]: same, mirroring audit entries to a temp journal
//! - [`drive_to`]: walk a ticket along the shortest legal path to a state

use anyhow::{Context, Result};
use nexus_config::NexusConfig;
use nexus_lifecycle::{state_machine, TicketService};
use nexus_schemas::{MasterId, Ticket, TicketId, TicketState, ToolId};

pub const FIXTURE_JOB_REQUEST: &str = "fixture job request";

pub fn seeded_service() -> TicketService {
    TicketService::with_defaults()
}

/// Service journaling to `<tempdir>/audit.jsonl`. Keep the returned dir alive
/// for as long as the journal is needed.
pub fn journaled_service() -> Result<(TicketService, tempfile::TempDir)> {
    let dir = tempfile::tempdir().context("create temp dir")?;
    let mut cfg = NexusConfig::default();
    cfg.audit.journal_path = Some(
        dir.path()
            .join("audit.jsonl")
            .to_string_lossy()
            .into_owned(),
    );
    let svc = TicketService::from_config(&cfg)?;
    Ok((svc, dir))
}

pub fn create(svc: &TicketService, master: &str, tool: &str) -> Result<Ticket> {
    svc.create_ticket(&MasterId::new(master), &ToolId::new(tool))
        .with_context(|| format!("create ticket for {master}/{tool}"))
}

/// Shortest path from `Waiting` to `target` (excluding `Waiting` itself).
pub fn path_to(target: TicketState) -> Vec<TicketState> {
    use std::collections::{HashMap, VecDeque};

    let mut prev: HashMap<TicketState, TicketState> = HashMap::new();
    let mut queue = VecDeque::from([TicketState::Waiting]);
    while let Some(st) = queue.pop_front() {
        if st == target {
            break;
        }
        for &next in state_machine::allowed_next(st) {
            if next != TicketState::Waiting && !prev.contains_key(&next) {
                prev.insert(next, st);
                queue.push_back(next);
            }
        }
    }

    let mut path = Vec::new();
    let mut cur = target;
    while cur != TicketState::Waiting {
        path.push(cur);
        match prev.get(&cur) {
            Some(&p) => cur = p,
            None => break,
        }
    }
    path.reverse();
    path
}

/// Fill in the job request (if still waiting) and transition along
/// [`path_to`]. Fails on the first refused step.
pub fn drive_to(svc: &TicketService, ticket_id: &TicketId, target: TicketState) -> Result<Ticket> {
    let mut ticket = svc.get_ticket(ticket_id)?;
    if ticket.state == TicketState::Waiting && !ticket.has_job_request() {
        ticket = svc.update_job_request(ticket_id, FIXTURE_JOB_REQUEST)?;
    }
    for step in path_to(target) {
        ticket = svc
            .transition_state(ticket_id, step)
            .with_context(|| format!("{} -> {step}", ticket.state))?;
    }
    Ok(ticket)
}
