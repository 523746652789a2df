//! End-to-end checks of the `nexus` binary.
//!
//! GREEN when:
//! - `config-hash` prints a stable hash, warns on unused keys and fails on
//!   them under `--strict`.
//! - `audit verify` accepts a journal written by the service and rejects it
//!   after a single byte of tampering.
//! - `transitions` prints the table and rejects unknown state names.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::process::Command;

use nexus_schemas::TicketState;
use nexus_testkit::{create, drive_to, journaled_service};

fn nexus() -> Command {
    Command::cargo_bin("nexus").expect("nexus binary built")
}

// ---------------------------------------------------------------------------
// config-hash
// ---------------------------------------------------------------------------

#[test]
fn config_hash_is_stable_across_key_order() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let a = dir.path().join("a.yaml");
    let b = dir.path().join("b.yaml");
    fs::write(&a, "tickets:\n  number_prefix: JOB\n  number_width: 4\n")?;
    fs::write(&b, "tickets:\n  number_width: 4\n  number_prefix: JOB\n")?;

    let out_a = nexus().arg("config-hash").arg(&a).output()?;
    let out_b = nexus().arg("config-hash").arg(&b).output()?;
    assert!(out_a.status.success());
    assert!(out_b.status.success());

    let first_line = |o: &std::process::Output| {
        String::from_utf8_lossy(&o.stdout)
            .lines()
            .next()
            .unwrap_or_default()
            .to_string()
    };
    assert!(first_line(&out_a).starts_with("config_hash="));
    assert_eq!(first_line(&out_a), first_line(&out_b));
    Ok(())
}

#[test]
fn config_hash_warns_on_unused_keys_and_strict_fails() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("base.yaml");
    fs::write(&path, "audit:\n  sytem_user: ops\n")?;

    nexus()
        .arg("config-hash")
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("unused_key=/audit/sytem_user"));

    nexus()
        .args(["config-hash", "--strict"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"));
    Ok(())
}

#[test]
fn config_hash_rejects_secret_literals() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("base.yaml");
    fs::write(&path, "daemon:\n  bind_addr: \"sk-live-abcdef\"\n")?;

    nexus()
        .arg("config-hash")
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"));
    Ok(())
}

// ---------------------------------------------------------------------------
// audit verify
// ---------------------------------------------------------------------------

#[test]
fn audit_verify_accepts_service_journal_and_detects_tamper() -> anyhow::Result<()> {
    let (svc, dir) = journaled_service()?;
    let t = create(&svc, "master-1", "tool-1")?;
    drive_to(&svc, &t.id, TicketState::Closed)?;

    let path = dir.path().join("audit.jsonl");
    let expected_lines = svc.get_audit_logs(&t.id)?.len();

    nexus()
        .args(["audit", "verify"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains(format!(
            "audit_chain=valid lines={expected_lines}"
        )));

    let content = fs::read_to_string(&path)?;
    fs::write(&path, content.replacen("Ticket created", "Ticket forged", 1))?;

    nexus()
        .args(["audit", "verify"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("audit_chain=broken line=1"));
    Ok(())
}

#[test]
fn audit_verify_missing_file_fails() {
    nexus()
        .args(["audit", "verify", "/nonexistent/nexus/audit.jsonl"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("read audit journal"));
}

// ---------------------------------------------------------------------------
// transitions
// ---------------------------------------------------------------------------

#[test]
fn transitions_prints_full_table() {
    nexus()
        .arg("transitions")
        .assert()
        .success()
        .stdout(predicate::str::contains("Waiting -> Monitoring"))
        .stdout(predicate::str::contains("Monitoring -> Ready, Hold"))
        .stdout(predicate::str::contains("Closed -> (terminal)"));
}

#[test]
fn transitions_from_single_state() {
    nexus()
        .args(["transitions", "--from", "Critical"])
        .assert()
        .success()
        .stdout(predicate::str::diff("Critical -> Complete, Failed\n"));
}

#[test]
fn transitions_rejects_unknown_state() {
    nexus()
        .args(["transitions", "--from", "critical"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid --from"));
}
