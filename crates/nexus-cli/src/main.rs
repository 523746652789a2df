use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nexus_config::UnusedKeyPolicy;
use nexus_lifecycle::state_machine;
use nexus_schemas::TicketState;

#[derive(Parser)]
#[command(name = "nexus")]
#[command(about = "Nexus ticket lifecycle operator CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> site...)
        #[arg(required = true)]
        paths: Vec<String>,

        /// Fail instead of warn when the merged config has keys nothing reads
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Audit journal utilities
    Audit {
        #[command(subcommand)]
        cmd: AuditCmd,
    },

    /// Print the ticket transition table
    Transitions {
        /// Only print successors of this state (e.g. Monitoring)
        #[arg(long)]
        from: Option<String>,
    },
}

#[derive(Subcommand)]
enum AuditCmd {
    /// Verify the hash chain of a JSONL audit journal
    Verify {
        /// Journal path (audit.journal_path in config)
        path: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Commands::ConfigHash { paths, strict } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = nexus_config::load_layered_yaml(&path_refs)?;

            // Typed validation (seed integrity, numbering width) runs before
            // anything is printed.
            loaded.settings()?;

            let policy = if strict {
                UnusedKeyPolicy::Fail
            } else {
                UnusedKeyPolicy::Warn
            };
            let report = nexus_config::report_unused_keys(&loaded.config_json, policy)?;
            for ptr in &report.unused_leaf_pointers {
                eprintln!("unused_key={ptr}");
            }

            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Audit { cmd } => match cmd {
            AuditCmd::Verify { path } => match nexus_audit::verify_hash_chain(&path)? {
                nexus_audit::VerifyResult::Valid { lines } => {
                    println!("audit_chain=valid lines={lines} path={path}");
                }
                nexus_audit::VerifyResult::Broken { line, reason } => {
                    bail!("audit_chain=broken line={line} path={path}: {reason}");
                }
            },
        },

        Commands::Transitions { from } => match from {
            Some(raw) => {
                let state: TicketState = raw
                    .parse()
                    .with_context(|| format!("invalid --from {raw:?}"))?;
                print_row(state);
            }
            None => {
                for state in TicketState::ALL {
                    print_row(state);
                }
            }
        },
    }

    Ok(())
}

fn print_row(state: TicketState) {
    let next = state_machine::allowed_next(state);
    if next.is_empty() {
        println!("{state} -> (terminal)");
        return;
    }
    let names: Vec<&str> = next.iter().map(|s| s.as_str()).collect();
    println!("{state} -> {}", names.join(", "));
}
