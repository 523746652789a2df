//! Ticket lifecycle service.
//!
//! # Serialization
//!
//! Every public operation runs under one mutex guarding the entity store, the
//! audit recorder and the ticket-number counter. That single boundary covers
//! per-ticket read-check-write, the per-master critical-lock check-and-set
//! and id/number allocation: two concurrent `Critical` transitions for the
//! same master cannot both observe "no critical ticket".
//!
//! # Write order
//!
//! 1. Validate against the current store (no writes).
//! 2. Build the audit entry (journal append happens here and may fail).
//! 3. Mutate the ticket and commit the entry to the store.
//!
//! A failure in steps 1 or 2 leaves the store exactly as it was.

use std::sync::{Mutex, MutexGuard};

use anyhow::Context;
use nexus_audit::{AuditJournal, AuditRecorder};
use nexus_config::{NexusConfig, TicketNumbering};
use nexus_schemas::{
    AuditAction, AuditLog, Master, MasterId, Ticket, TicketId, TicketState, TicketView, Tool,
    ToolId,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{Entity, LifecycleError, Precondition};
use crate::state_machine;
use crate::store::EntityStore;

pub type LifecycleResult<T> = Result<T, LifecycleError>;

struct Inner {
    store: EntityStore,
    recorder: AuditRecorder,
    numbering: TicketNumbering,
    /// Next ticket sequence number (1-based).
    next_seq: u64,
}

pub struct TicketService {
    inner: Mutex<Inner>,
}

impl TicketService {
    pub fn new(store: EntityStore, recorder: AuditRecorder, numbering: TicketNumbering) -> Self {
        Self {
            inner: Mutex::new(Inner {
                store,
                recorder,
                numbering,
                next_seq: 1,
            }),
        }
    }

    /// Seeded catalog, default numbering, `system` attribution, no journal.
    pub fn with_defaults() -> Self {
        let cfg = NexusConfig::default();
        Self::new(
            EntityStore::with_catalog(cfg.seed.masters(), cfg.seed.tools()),
            AuditRecorder::new(cfg.audit.system_user),
            cfg.tickets,
        )
    }

    /// Build from validated settings; opens the audit journal when configured.
    pub fn from_config(cfg: &NexusConfig) -> anyhow::Result<Self> {
        cfg.validate()?;
        let store = EntityStore::with_catalog(cfg.seed.masters(), cfg.seed.tools());

        let mut recorder = AuditRecorder::new(cfg.audit.system_user.clone());
        if let Some(path) = &cfg.audit.journal_path {
            let journal = AuditJournal::open(path, cfg.audit.hash_chain)
                .with_context(|| format!("open audit journal {path}"))?;
            info!(
                path = %journal.path().display(),
                resumed_seq = journal.seq(),
                chain_head = journal.last_hash().unwrap_or("-"),
                "audit journal opened"
            );
            recorder = recorder.with_journal(journal);
        }

        Ok(Self::new(store, recorder, cfg.tickets.clone()))
    }

    fn lock(&self) -> LifecycleResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| LifecycleError::Internal("ticket store lock poisoned".to_string()))
    }

    // -----------------------------------------------------------------------
    // Mutations
    // -----------------------------------------------------------------------

    pub fn create_ticket(&self, master_id: &MasterId, tool_id: &ToolId) -> LifecycleResult<Ticket> {
        self.lock()?.create_ticket(master_id, tool_id)
    }

    /// [`Self::create_ticket`], returning the read model built under the same lock.
    pub fn create_ticket_view(
        &self,
        master_id: &MasterId,
        tool_id: &ToolId,
    ) -> LifecycleResult<TicketView> {
        let mut guard = self.lock()?;
        let ticket = guard.create_ticket(master_id, tool_id)?;
        Ok(view_of(&guard.store, &ticket))
    }

    pub fn update_job_request(&self, ticket_id: &TicketId, text: &str) -> LifecycleResult<Ticket> {
        self.lock()?.update_job_request(ticket_id, text)
    }

    pub fn update_job_request_view(
        &self,
        ticket_id: &TicketId,
        text: &str,
    ) -> LifecycleResult<TicketView> {
        let mut guard = self.lock()?;
        let ticket = guard.update_job_request(ticket_id, text)?;
        Ok(view_of(&guard.store, &ticket))
    }

    pub fn transition_state(&self, ticket_id: &TicketId, to: TicketState) -> LifecycleResult<Ticket> {
        self.lock()?.transition_state(ticket_id, to)
    }

    pub fn transition_state_view(
        &self,
        ticket_id: &TicketId,
        to: TicketState,
    ) -> LifecycleResult<TicketView> {
        let mut guard = self.lock()?;
        let ticket = guard.transition_state(ticket_id, to)?;
        Ok(view_of(&guard.store, &ticket))
    }

    /// Tool creation (administrative). Names are unique within a master.
    pub fn create_tool(&self, master_id: &MasterId, name: &str) -> LifecycleResult<Tool> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LifecycleError::InvalidArgument {
                field: "toolName",
                reason: "tool name must not be blank".to_string(),
            });
        }

        let mut guard = self.lock()?;
        let store = &mut guard.store;

        if store.find_master(master_id).is_none() {
            return Err(LifecycleError::not_found(Entity::Master, master_id));
        }
        if store.list_tools_by_master(master_id).any(|t| t.name == name) {
            return Err(LifecycleError::InvalidArgument {
                field: "toolName",
                reason: "A tool with this name already exists for this master".to_string(),
            });
        }

        let tool = Tool {
            id: ToolId::new(format!("tool-{}", Uuid::new_v4().as_simple())),
            name: name.to_string(),
            master_id: master_id.clone(),
        };
        store.append_tool(tool.clone());

        info!(tool_id = %tool.id, master_id = %tool.master_id, name = %tool.name, "tool created");
        Ok(tool)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Entries for the ticket in insertion order. Unknown tickets yield an
    /// empty list, not an error.
    pub fn get_audit_logs(&self, ticket_id: &TicketId) -> LifecycleResult<Vec<AuditLog>> {
        let guard = self.lock()?;
        let logs = guard
            .store
            .list_audit_logs_by_ticket(ticket_id)
            .cloned()
            .collect();
        Ok(logs)
    }

    pub fn get_ticket(&self, ticket_id: &TicketId) -> LifecycleResult<Ticket> {
        let guard = self.lock()?;
        guard
            .store
            .find_ticket(ticket_id)
            .cloned()
            .ok_or_else(|| LifecycleError::not_found(Entity::Ticket, ticket_id))
    }

    /// All tickets in creation order.
    pub fn list_tickets(&self) -> LifecycleResult<Vec<Ticket>> {
        Ok(self.lock()?.store.tickets().to_vec())
    }

    pub fn ticket_view(&self, ticket_id: &TicketId) -> LifecycleResult<TicketView> {
        let guard = self.lock()?;
        let ticket = guard
            .store
            .find_ticket(ticket_id)
            .ok_or_else(|| LifecycleError::not_found(Entity::Ticket, ticket_id))?;
        Ok(view_of(&guard.store, ticket))
    }

    pub fn list_ticket_views(&self) -> LifecycleResult<Vec<TicketView>> {
        let guard = self.lock()?;
        let views = guard
            .store
            .tickets()
            .iter()
            .map(|t| view_of(&guard.store, t))
            .collect();
        Ok(views)
    }

    pub fn list_masters(&self) -> LifecycleResult<Vec<Master>> {
        Ok(self.lock()?.store.masters().cloned().collect())
    }

    pub fn list_tools(&self) -> LifecycleResult<Vec<Tool>> {
        Ok(self.lock()?.store.tools().cloned().collect())
    }

    /// Structurally legal next states for the ticket's current state.
    pub fn allowed_transitions(&self, ticket_id: &TicketId) -> LifecycleResult<Vec<TicketState>> {
        let ticket = self.get_ticket(ticket_id)?;
        Ok(state_machine::allowed_next(ticket.state).to_vec())
    }

    /// The ticket currently holding the master's critical lock, if any.
    pub fn critical_ticket(&self, master_id: &MasterId) -> LifecycleResult<Option<Ticket>> {
        let guard = self.lock()?;
        if guard.store.find_master(master_id).is_none() {
            return Err(LifecycleError::not_found(Entity::Master, master_id));
        }
        let holder = guard
            .store
            .list_tickets_by_master(master_id)
            .find(|t| t.is_critical())
            .cloned();
        Ok(holder)
    }
}

impl Inner {
    // Bodies of the public mutations. Callers hold the service lock.

    fn create_ticket(&mut self, master_id: &MasterId, tool_id: &ToolId) -> LifecycleResult<Ticket> {
        if self.store.find_master(master_id).is_none() {
            return Err(LifecycleError::not_found(Entity::Master, master_id));
        }
        let tool = self
            .store
            .find_tool(tool_id)
            .ok_or_else(|| LifecycleError::not_found(Entity::Tool, tool_id))?;
        if &tool.master_id != master_id {
            return Err(LifecycleError::InvalidRelationship {
                tool_id: tool_id.to_string(),
                master_id: master_id.to_string(),
            });
        }

        let id = TicketId::new(format!("ticket-{}", Uuid::new_v4().as_simple()));
        let ticket_number = self.numbering.format(self.next_seq);

        let log = self
            .recorder
            .entry(&id, AuditAction::Created, "Ticket created")
            .map_err(internal)?;

        let ticket = Ticket {
            id,
            ticket_number,
            master_id: master_id.clone(),
            tool_id: tool_id.clone(),
            state: TicketState::Waiting,
            job_request: String::new(),
            created_at: log.timestamp,
            updated_at: log.timestamp,
        };

        self.next_seq += 1;
        self.store.append_ticket(ticket.clone());
        self.recorder.commit(&mut self.store, log);

        info!(
            ticket_id = %ticket.id,
            ticket_number = %ticket.ticket_number,
            master_id = %ticket.master_id,
            tool_id = %ticket.tool_id,
            "ticket created"
        );
        Ok(ticket)
    }

    fn update_job_request(&mut self, ticket_id: &TicketId, text: &str) -> LifecycleResult<Ticket> {
        let ticket = self
            .store
            .find_ticket(ticket_id)
            .ok_or_else(|| LifecycleError::not_found(Entity::Ticket, ticket_id))?;
        if ticket.state != TicketState::Waiting {
            return Err(LifecycleError::InvalidState {
                ticket_number: ticket.ticket_number.clone(),
                state: ticket.state,
                operation: "Job request update",
            });
        }
        if text.trim().is_empty() {
            return Err(LifecycleError::InvalidArgument {
                field: "jobRequest",
                reason: "job request must not be blank".to_string(),
            });
        }

        let log = self
            .recorder
            .entry(ticket_id, AuditAction::JobRequestUpdated, "Job request modified")
            .map_err(internal)?;

        let updated = apply(&mut self.store, ticket_id, |t| {
            t.job_request = text.to_string();
            t.updated_at = log.timestamp;
        })?;
        self.recorder.commit(&mut self.store, log);

        info!(ticket_number = %updated.ticket_number, "job request updated");
        Ok(updated)
    }

    fn transition_state(&mut self, ticket_id: &TicketId, to: TicketState) -> LifecycleResult<Ticket> {
        let ticket = self
            .store
            .find_ticket(ticket_id)
            .ok_or_else(|| LifecycleError::not_found(Entity::Ticket, ticket_id))?;
        let from = ticket.state;

        if !state_machine::is_allowed(from, to) {
            warn!(ticket_number = %ticket.ticket_number, %from, %to, "transition refused by state machine");
            return Err(LifecycleError::InvalidTransition { from, to });
        }

        if from == TicketState::Waiting && to == TicketState::Monitoring && !ticket.has_job_request()
        {
            warn!(ticket_number = %ticket.ticket_number, "monitoring refused: job request missing");
            return Err(LifecycleError::PreconditionFailed(
                Precondition::JobRequestRequired,
            ));
        }

        if to == TicketState::Critical {
            let holder = self
                .store
                .list_tickets_by_master(&ticket.master_id)
                .find(|t| t.state == TicketState::Critical && t.id != ticket.id);
            if let Some(holder) = holder {
                warn!(
                    ticket_number = %ticket.ticket_number,
                    holder = %holder.ticket_number,
                    master_id = %ticket.master_id,
                    "critical lock held"
                );
                return Err(LifecycleError::PreconditionFailed(
                    Precondition::CriticalLockHeld {
                        master_id: ticket.master_id.to_string(),
                        holder_ticket_number: holder.ticket_number.clone(),
                    },
                ));
            }
        }

        let log = self
            .recorder
            .entry(
                ticket_id,
                AuditAction::StateChanged,
                format!("State changed from {from} to {to}"),
            )
            .map_err(internal)?;

        let updated = apply(&mut self.store, ticket_id, |t| {
            t.state = to;
            t.updated_at = log.timestamp;
        })?;
        self.recorder.commit(&mut self.store, log);

        info!(ticket_number = %updated.ticket_number, %from, %to, "ticket state changed");
        Ok(updated)
    }
}

/// Mutate a ticket already validated to exist and return the updated copy.
fn apply(
    store: &mut EntityStore,
    ticket_id: &TicketId,
    f: impl FnOnce(&mut Ticket),
) -> LifecycleResult<Ticket> {
    let ticket = store
        .ticket_mut(ticket_id)
        .ok_or_else(|| LifecycleError::Internal(format!("ticket {ticket_id} vanished under lock")))?;
    f(&mut *ticket);
    Ok(ticket.clone())
}

fn view_of(store: &EntityStore, ticket: &Ticket) -> TicketView {
    TicketView::new(
        ticket.clone(),
        store.find_master(&ticket.master_id),
        store.find_tool(&ticket.tool_id),
    )
}

fn internal(e: anyhow::Error) -> LifecycleError {
    LifecycleError::Internal(format!("{e:#}"))
}
