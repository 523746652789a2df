//! nexus-audit
//!
//! Builds and appends immutable [`AuditLog`] entries for ticket-affecting
//! events. Entries go to an [`AuditSink`] (the entity store) and, when a
//! journal is configured, are mirrored to a hash-chained JSONL file.
//!
//! Recording is two-phase so callers can keep "no partial mutation":
//! [`AuditRecorder::entry`] stamps, builds and journals the entry (the only
//! step that can fail), and [`AuditRecorder::commit`] appends it to the sink.

pub mod journal;

use anyhow::Result;
use chrono::{DateTime, Utc};
use nexus_schemas::{AuditAction, AuditLog, AuditLogId, TicketId};
use uuid::Uuid;

pub use journal::{
    compute_record_hash, verify_hash_chain, verify_hash_chain_str, AuditJournal, JournalRecord,
    VerifyResult,
};

/// Destination for committed audit entries.
pub trait AuditSink {
    fn append_audit_log(&mut self, log: AuditLog);
}

impl AuditSink for Vec<AuditLog> {
    fn append_audit_log(&mut self, log: AuditLog) {
        self.push(log);
    }
}

pub struct AuditRecorder {
    user: String,
    /// Timestamp of the last stamped entry; `stamp` never returns earlier.
    last_ts: Option<DateTime<Utc>>,
    journal: Option<AuditJournal>,
}

impl AuditRecorder {
    /// Recorder attributing every entry to `user` (the configured system identity).
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            last_ts: None,
            journal: None,
        }
    }

    pub fn with_journal(mut self, journal: AuditJournal) -> Self {
        self.journal = Some(journal);
        self
    }

    /// Current time, clamped so consecutive stamps are non-decreasing even if
    /// the wall clock steps backwards.
    pub fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.last_ts {
            Some(last) if now < last => last,
            _ => now,
        };
        self.last_ts = Some(ts);
        ts
    }

    /// Build an entry and mirror it to the journal. Does not touch the sink.
    pub fn entry(
        &mut self,
        ticket_id: &TicketId,
        action: AuditAction,
        details: impl Into<String>,
    ) -> Result<AuditLog> {
        let log = AuditLog {
            id: AuditLogId::new(format!("log-{}", Uuid::new_v4().as_simple())),
            ticket_id: ticket_id.clone(),
            action,
            user: self.user.clone(),
            timestamp: self.stamp(),
            details: details.into(),
        };

        if let Some(journal) = self.journal.as_mut() {
            journal.append(&log)?;
        }

        Ok(log)
    }

    /// Append a previously built entry.
    pub fn commit<S: AuditSink + ?Sized>(&self, sink: &mut S, log: AuditLog) {
        sink.append_audit_log(log);
    }

    /// `entry` + `commit` in one step.
    pub fn record<S: AuditSink + ?Sized>(
        &mut self,
        sink: &mut S,
        ticket_id: &TicketId,
        action: AuditAction,
        details: impl Into<String>,
    ) -> Result<AuditLog> {
        let log = self.entry(ticket_id, action, details)?;
        self.commit(sink, log.clone());
        Ok(log)
    }
}
