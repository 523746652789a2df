//! Typed settings deserialized from the merged config document.
//!
//! Every section is optional; an empty document yields [`NexusConfig::default`],
//! which seeds the two reference masters and their tools.

use std::collections::BTreeSet;

use anyhow::{bail, Context, Result};
use nexus_schemas::{Master, MasterId, Tool, ToolId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NexusConfig {
    pub daemon: DaemonSettings,
    pub audit: AuditSettings,
    pub tickets: TicketNumbering,
    pub seed: SeedSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonSettings {
    pub bind_addr: String,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
}

impl Default for DaemonSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "http://localhost:3000".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditSettings {
    /// Attribution recorded on every audit entry.
    pub system_user: String,
    /// When set, every audit entry is mirrored to this JSONL file.
    pub journal_path: Option<String>,
    /// Chain journal lines with `hash_prev` / `hash_self`.
    pub hash_chain: bool,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            system_user: "system".to_string(),
            journal_path: None,
            hash_chain: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketNumbering {
    pub number_prefix: String,
    /// Zero-padding width of the numeric part.
    pub number_width: usize,
}

impl Default for TicketNumbering {
    fn default() -> Self {
        Self {
            number_prefix: "TKT".to_string(),
            number_width: 5,
        }
    }
}

impl TicketNumbering {
    /// `format(42)` => `TKT-00042` with the defaults.
    pub fn format(&self, seq: u64) -> String {
        format!(
            "{}-{:0width$}",
            self.number_prefix,
            seq,
            width = self.number_width
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeedSettings {
    pub masters: Vec<SeedMaster>,
    pub tools: Vec<SeedTool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedMaster {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedTool {
    pub id: String,
    pub name: String,
    pub master_id: String,
}

impl Default for SeedSettings {
    fn default() -> Self {
        Self {
            masters: vec![
                SeedMaster {
                    id: "master-1".to_string(),
                    name: "Zeus".to_string(),
                    description: "Primary diagnostics master".to_string(),
                },
                SeedMaster {
                    id: "master-2".to_string(),
                    name: "Phoenix".to_string(),
                    description: "Programming master".to_string(),
                },
            ],
            tools: vec![
                SeedTool {
                    id: "tool-1".to_string(),
                    name: "Diagnostic Scanner A".to_string(),
                    master_id: "master-1".to_string(),
                },
                SeedTool {
                    id: "tool-2".to_string(),
                    name: "Programming Tool B".to_string(),
                    master_id: "master-2".to_string(),
                },
            ],
        }
    }
}

impl SeedSettings {
    pub fn masters(&self) -> Vec<Master> {
        self.masters
            .iter()
            .map(|m| Master {
                id: MasterId::new(m.id.clone()),
                name: m.name.clone(),
                description: m.description.clone(),
            })
            .collect()
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .map(|t| Tool {
                id: ToolId::new(t.id.clone()),
                name: t.name.clone(),
                master_id: MasterId::new(t.master_id.clone()),
            })
            .collect()
    }

    /// Referential checks the engine relies on: unique ids, every tool's
    /// master exists, tool names unique within a master.
    pub fn validate(&self) -> Result<()> {
        let mut master_ids = BTreeSet::new();
        for m in &self.masters {
            if m.id.trim().is_empty() || m.name.trim().is_empty() {
                bail!("CONFIG_SEED_INVALID: master id and name must be non-empty");
            }
            if !master_ids.insert(m.id.as_str()) {
                bail!("CONFIG_SEED_INVALID: duplicate master id '{}'", m.id);
            }
        }

        let mut tool_ids = BTreeSet::new();
        let mut names = BTreeSet::new();
        for t in &self.tools {
            if t.id.trim().is_empty() || t.name.trim().is_empty() {
                bail!("CONFIG_SEED_INVALID: tool id and name must be non-empty");
            }
            if !tool_ids.insert(t.id.as_str()) {
                bail!("CONFIG_SEED_INVALID: duplicate tool id '{}'", t.id);
            }
            if !master_ids.contains(t.master_id.as_str()) {
                bail!(
                    "CONFIG_SEED_INVALID: tool '{}' references unknown master '{}'",
                    t.id,
                    t.master_id
                );
            }
            if !names.insert((t.master_id.as_str(), t.name.as_str())) {
                bail!(
                    "CONFIG_SEED_INVALID: tool name '{}' is duplicated under master '{}'",
                    t.name,
                    t.master_id
                );
            }
        }
        Ok(())
    }
}

impl NexusConfig {
    /// Build from canonical config JSON (produced by [`crate::load_layered_yaml`]).
    pub fn from_config_json(cfg: &Value) -> Result<Self> {
        let parsed: NexusConfig =
            serde_json::from_value(cfg.clone()).context("config does not match settings schema")?;
        parsed.validate()?;
        Ok(parsed)
    }

    pub fn validate(&self) -> Result<()> {
        if self.audit.system_user.trim().is_empty() {
            bail!("CONFIG_INVALID: audit.system_user must be non-empty");
        }
        if self.tickets.number_prefix.trim().is_empty() {
            bail!("CONFIG_INVALID: tickets.number_prefix must be non-empty");
        }
        if !(1..=12).contains(&self.tickets.number_width) {
            bail!(
                "CONFIG_INVALID: tickets.number_width out of bounds (1..=12): {}",
                self.tickets.number_width
            );
        }
        self.seed.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_numbering_pads_to_five_digits() {
        let n = TicketNumbering::default();
        assert_eq!(n.format(1), "TKT-00001");
        assert_eq!(n.format(123456), "TKT-123456");
    }

    #[test]
    fn default_seed_is_valid() {
        NexusConfig::default().validate().unwrap();
    }

    #[test]
    fn seed_rejects_tool_with_unknown_master() {
        let mut seed = SeedSettings::default();
        seed.tools.push(SeedTool {
            id: "tool-9".to_string(),
            name: "Orphan".to_string(),
            master_id: "master-404".to_string(),
        });
        let err = seed.validate().unwrap_err().to_string();
        assert!(err.contains("unknown master"), "{err}");
    }

    #[test]
    fn seed_rejects_duplicate_tool_name_within_master() {
        let mut seed = SeedSettings::default();
        seed.tools.push(SeedTool {
            id: "tool-3".to_string(),
            name: "Diagnostic Scanner A".to_string(),
            master_id: "master-1".to_string(),
        });
        assert!(seed.validate().is_err());
    }
}
