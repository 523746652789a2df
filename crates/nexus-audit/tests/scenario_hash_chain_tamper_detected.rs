//! Audit journal hash chain integrity.
//!
//! GREEN when:
//! - Journaling 5 entries with hash_chain=true, then verifying, succeeds.
//! - Mutating line 3's details is detected as a hash_self mismatch.
//! - Deleting a line is detected as a hash_prev mismatch.
//! - Reopening a journal continues the chain instead of restarting it.

use nexus_audit::{verify_hash_chain, AuditJournal, AuditRecorder, VerifyResult};
use nexus_schemas::{AuditAction, AuditLog, TicketId};

fn write_entries(path: &std::path::Path, n: usize) {
    let journal = AuditJournal::open(path, true).unwrap();
    let mut rec = AuditRecorder::new("system").with_journal(journal);
    let mut sink: Vec<AuditLog> = Vec::new();
    let tid = TicketId::new("ticket-1");
    for i in 0..n {
        rec.record(
            &mut sink,
            &tid,
            AuditAction::StateChanged,
            format!("State changed step {i}"),
        )
        .unwrap();
    }
    assert_eq!(sink.len(), n);
}

#[test]
fn untampered_chain_verifies_valid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    write_entries(&path, 5);

    let result = verify_hash_chain(&path).unwrap();
    assert_eq!(result, VerifyResult::Valid { lines: 5 });
}

#[test]
fn tampered_details_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    write_entries(&path, 5);

    let content = std::fs::read_to_string(&path).unwrap();
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();
    let mut rec: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
    rec["entry"]["details"] = serde_json::json!("TAMPERED");
    lines[2] = serde_json::to_string(&rec).unwrap();
    std::fs::write(&path, lines.join("\n") + "\n").unwrap();

    match verify_hash_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 3, "{reason}");
            assert!(reason.contains("hash_self mismatch"), "{reason}");
        }
        VerifyResult::Valid { lines } => panic!("tampered journal verified ({lines} lines)"),
    }
}

#[test]
fn deleted_line_detected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    write_entries(&path, 5);

    let content = std::fs::read_to_string(&path).unwrap();
    let kept: Vec<&str> = content
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != 2)
        .map(|(_, l)| l)
        .collect();
    std::fs::write(&path, kept.join("\n") + "\n").unwrap();

    match verify_hash_chain(&path).unwrap() {
        VerifyResult::Broken { line, reason } => {
            assert_eq!(line, 3, "{reason}");
            assert!(reason.contains("hash_prev mismatch"), "{reason}");
        }
        VerifyResult::Valid { lines } => panic!("journal with a gap verified ({lines} lines)"),
    }
}

#[test]
fn reopened_journal_continues_chain() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("audit.jsonl");
    write_entries(&path, 2);

    let reopened = AuditJournal::open(&path, true).unwrap();
    assert_eq!(reopened.seq(), 2);
    assert!(reopened.last_hash().is_some());
    drop(reopened);

    write_entries(&path, 3);
    assert_eq!(
        verify_hash_chain(&path).unwrap(),
        VerifyResult::Valid { lines: 5 }
    );
}

#[test]
fn empty_journal_is_valid() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("audit.jsonl");
    std::fs::write(&path, "").unwrap();

    assert_eq!(
        verify_hash_chain(&path).unwrap(),
        VerifyResult::Valid { lines: 0 }
    );
}
