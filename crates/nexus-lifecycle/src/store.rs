//! In-memory entity store.
//!
//! Holds masters, tools, tickets and audit logs and answers lookups by id and
//! by relationship. No validation happens here: [`crate::TicketService`] is
//! the only caller that mutates tickets and it owns every invariant.

use std::collections::{BTreeMap, HashMap};

use nexus_audit::AuditSink;
use nexus_schemas::{AuditLog, Master, MasterId, Ticket, TicketId, Tool, ToolId};

#[derive(Debug, Default)]
pub struct EntityStore {
    masters: BTreeMap<MasterId, Master>,
    tools: BTreeMap<ToolId, Tool>,
    /// Creation order.
    tickets: Vec<Ticket>,
    ticket_index: HashMap<TicketId, usize>,
    /// Insertion order.
    audit_logs: Vec<AuditLog>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with catalog entries (seed data).
    pub fn with_catalog(masters: Vec<Master>, tools: Vec<Tool>) -> Self {
        let mut store = Self::new();
        for m in masters {
            store.insert_master(m);
        }
        for t in tools {
            store.append_tool(t);
        }
        store
    }

    // -- masters ------------------------------------------------------------

    pub fn insert_master(&mut self, master: Master) {
        self.masters.insert(master.id.clone(), master);
    }

    pub fn find_master(&self, id: &MasterId) -> Option<&Master> {
        self.masters.get(id)
    }

    pub fn masters(&self) -> impl Iterator<Item = &Master> {
        self.masters.values()
    }

    // -- tools --------------------------------------------------------------

    pub fn append_tool(&mut self, tool: Tool) {
        self.tools.insert(tool.id.clone(), tool);
    }

    pub fn find_tool(&self, id: &ToolId) -> Option<&Tool> {
        self.tools.get(id)
    }

    pub fn tools(&self) -> impl Iterator<Item = &Tool> {
        self.tools.values()
    }

    pub fn list_tools_by_master<'a>(
        &'a self,
        master_id: &'a MasterId,
    ) -> impl Iterator<Item = &'a Tool> + 'a {
        self.tools.values().filter(move |t| &t.master_id == master_id)
    }

    // -- tickets ------------------------------------------------------------

    pub fn append_ticket(&mut self, ticket: Ticket) {
        self.ticket_index
            .insert(ticket.id.clone(), self.tickets.len());
        self.tickets.push(ticket);
    }

    pub fn find_ticket(&self, id: &TicketId) -> Option<&Ticket> {
        self.ticket_index.get(id).map(|&i| &self.tickets[i])
    }

    pub fn ticket_mut(&mut self, id: &TicketId) -> Option<&mut Ticket> {
        match self.ticket_index.get(id) {
            Some(&i) => self.tickets.get_mut(i),
            None => None,
        }
    }

    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn list_tickets_by_master<'a>(
        &'a self,
        master_id: &'a MasterId,
    ) -> impl Iterator<Item = &'a Ticket> + 'a {
        self.tickets.iter().filter(move |t| &t.master_id == master_id)
    }

    // -- audit --------------------------------------------------------------

    pub fn append_audit_log(&mut self, log: AuditLog) {
        self.audit_logs.push(log);
    }

    pub fn list_audit_logs_by_ticket<'a>(
        &'a self,
        ticket_id: &'a TicketId,
    ) -> impl Iterator<Item = &'a AuditLog> + 'a {
        self.audit_logs
            .iter()
            .filter(move |l| &l.ticket_id == ticket_id)
    }
}

impl AuditSink for EntityStore {
    fn append_audit_log(&mut self, log: AuditLog) {
        EntityStore::append_audit_log(self, log);
    }
}
