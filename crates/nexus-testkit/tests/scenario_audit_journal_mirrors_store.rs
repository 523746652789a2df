//! Every committed audit entry is mirrored to the journal, in order, and the
//! journal's hash chain verifies.

use nexus_audit::{verify_hash_chain, JournalRecord, VerifyResult};
use nexus_schemas::TicketState;
use nexus_testkit::{create, drive_to, journaled_service};

#[test]
fn journal_matches_store_entries() {
    let (svc, dir) = journaled_service().unwrap();

    let t1 = create(&svc, "master-1", "tool-1").unwrap();
    let t2 = create(&svc, "master-2", "tool-2").unwrap();
    drive_to(&svc, &t1.id, TicketState::Ready).unwrap();
    // Refused: must not reach the journal.
    let _ = svc.transition_state(&t2.id, TicketState::Monitoring);

    let path = dir.path().join("audit.jsonl");
    let content = std::fs::read_to_string(&path).unwrap();
    let records: Vec<JournalRecord> = content
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let mut expected = svc.get_audit_logs(&t1.id).unwrap();
    expected.extend(svc.get_audit_logs(&t2.id).unwrap());

    assert_eq!(records.len(), expected.len());
    for (i, rec) in records.iter().enumerate() {
        assert_eq!(rec.seq, i as u64);
    }
    let mut journaled: Vec<_> = records.iter().map(|r| r.entry.clone()).collect();
    journaled.sort_by(|a, b| a.id.cmp(&b.id));
    expected.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(journaled, expected);

    assert_eq!(
        verify_hash_chain(&path).unwrap(),
        VerifyResult::Valid {
            lines: records.len()
        }
    );
}
