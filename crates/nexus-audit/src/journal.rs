//! Append-only audit journal. Writes JSON Lines (one record per line).
//!
//! Optional hash chain: each record carries `hash_prev` + `hash_self`, where
//! `hash_self` is SHA-256 over the canonical JSON of the record without
//! `hash_self`. Reopening an existing journal resumes the chain from its last
//! line.

use anyhow::{Context, Result};
use nexus_schemas::AuditLog;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// One journal line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalRecord {
    /// 0-based position in the journal.
    pub seq: u64,
    pub entry: AuditLog,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

pub struct AuditJournal {
    path: PathBuf,
    hash_chain: bool,
    last_hash: Option<String>,
    seq: u64,
}

impl AuditJournal {
    /// Opens (or creates) the journal at `path`, ensuring parent dirs exist.
    /// If the file already holds records, `seq` and the chain head are
    /// restored from its last line.
    pub fn open(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("create_dir_all {:?}", parent))?;
            }
        }

        let mut journal = Self {
            path,
            hash_chain,
            last_hash: None,
            seq: 0,
        };

        if journal.path.exists() {
            let content = fs::read_to_string(&journal.path)
                .with_context(|| format!("read audit journal {:?}", journal.path))?;
            if let Some(last) = content.lines().rev().find(|l| !l.trim().is_empty()) {
                let rec: JournalRecord = serde_json::from_str(last.trim())
                    .context("parse last audit journal record")?;
                journal.seq = rec.seq + 1;
                journal.last_hash = rec.hash_self;
            }
        }

        Ok(journal)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn last_hash(&self) -> Option<&str> {
        self.last_hash.as_deref()
    }

    /// Number of records written so far (equals the next record's seq).
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Append one entry. The in-memory chain head only advances once the line
    /// is on disk.
    pub fn append(&mut self, entry: &AuditLog) -> Result<JournalRecord> {
        let mut rec = JournalRecord {
            seq: self.seq,
            entry: entry.clone(),
            hash_prev: None,
            hash_self: None,
        };

        if self.hash_chain {
            rec.hash_prev = self.last_hash.clone();
            rec.hash_self = Some(compute_record_hash(&rec)?);
        }

        let line = canonical_json_line(&rec)?;
        append_line(&self.path, &line)?;

        self.seq += 1;
        if self.hash_chain {
            self.last_hash = rec.hash_self.clone();
        }
        Ok(rec)
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit journal {:?}", path))?;
    f.write_all(line.as_bytes())
        .context("write audit line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

/// Canonicalize by sorting keys recursively and emitting compact JSON.
fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize audit record failed")?;
    serde_json::to_string(&sort_keys(&raw)).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Hash over the canonical JSON of the record WITHOUT hash_self.
pub fn compute_record_hash(rec: &JournalRecord) -> Result<String> {
    let mut clone = rec.clone();
    clone.hash_self = None;

    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Verify the hash chain integrity of a journal file.
pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = fs::read_to_string(path.as_ref())
        .with_context(|| format!("read audit journal {:?}", path.as_ref()))?;
    verify_hash_chain_str(&content)
}

/// Same as [`verify_hash_chain`] over in-memory JSONL content.
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let rec: JournalRecord = serde_json::from_str(trimmed)
            .with_context(|| format!("parse audit record at line {}", i + 1))?;

        line_count += 1;

        if rec.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!(
                    "hash_prev mismatch: expected {:?}, got {:?}",
                    prev_hash, rec.hash_prev
                ),
            });
        }

        if let Some(ref claimed) = rec.hash_self {
            let recomputed = compute_record_hash(&rec)?;
            if *claimed != recomputed {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: format!(
                        "hash_self mismatch: claimed {}, recomputed {}",
                        claimed, recomputed
                    ),
                });
            }
        }

        prev_hash = rec.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines: line_count })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    /// The entire chain is valid.
    Valid { lines: usize },
    /// The chain is broken at the given (1-based) line.
    Broken { line: usize, reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid { .. })
    }
}
