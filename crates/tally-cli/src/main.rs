use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tally_config::{LedgerSettings, UnusedKeyPolicy};
use tally_ledger::ErrorKind;
use tracing::{debug, warn};

mod commands;

use commands::{cheque::ChequeCmd, customer::CustomerCmd, entry::EntryCmd};

#[derive(Parser)]
#[command(name = "tally")]
#[command(about = "Customer current-account ledger", long_about = None)]
struct Cli {
    /// Layered config paths in merge order (base -> env -> local)
    #[arg(long = "config", global = true)]
    config_paths: Vec<String>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Customer accounts
    Customer {
        #[command(subcommand)]
        cmd: CustomerCmd,
    },

    /// Ledger entries (purchases and payments)
    Entry {
        #[command(subcommand)]
        cmd: EntryCmd,
    },

    /// Cheque lifecycle
    Cheque {
        #[command(subcommand)]
        cmd: ChequeCmd,
    },

    /// Recompute a customer's snapshots and balance and report drift
    Verify {
        #[arg(long)]
        customer: i64,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Silent if the file does not exist; production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    let loaded = match load_settings(&cli.config_paths) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("error: {err:#}");
            return ExitCode::from(1);
        }
    };
    init_tracing(&loaded.settings.log_filter);
    if let Some(hash) = &loaded.config_hash {
        debug!(config_hash = %hash, "config/loaded");
    }
    for key in &loaded.unused_keys {
        warn!(key = %key, "config/unused_key");
    }

    match run(cli, &loaded.settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(cli: Cli, settings: &LedgerSettings) -> Result<()> {
    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = commands::connect(settings).await?;
            match cmd {
                DbCmd::Status => {
                    let s = tally_db::status(&pool).await?;
                    println!("db_ok={} has_ledger_tables={}", s.ok, s.has_ledger_tables);
                }
                DbCmd::Migrate => {
                    tally_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = tally_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Customer { cmd } => commands::customer::run(cmd, settings).await?,
        Commands::Entry { cmd } => commands::entry::run(cmd, settings).await?,
        Commands::Cheque { cmd } => commands::cheque::run(cmd, settings).await?,

        Commands::Verify { customer } => {
            let pool = commands::connect(settings).await?;
            let report = tally_db::verify_customer(&pool, customer).await?;
            println!("customer_id={}", report.customer_id);
            println!("entries_checked={}", report.entries_checked);
            println!("stored_balance={}", report.stored_balance);
            println!("expected_balance={}", report.expected_balance);
            for d in &report.drifted {
                println!(
                    "drift entry_id={} stored={} expected={}",
                    d.entry_id, d.stored, d.expected
                );
            }
            println!("clean={}", report.is_clean());
            if !report.is_clean() {
                warn!(customer_id = customer, drifted = report.drifted.len(), "verify/drift");
                anyhow::bail!("ledger drift detected for customer {customer}");
            }
        }
    }

    Ok(())
}

/// Settings plus what gets logged once tracing is up.
struct LoadedSettings {
    settings: LedgerSettings,
    config_hash: Option<String>,
    unused_keys: Vec<String>,
}

/// Defaults when no `--config` is given; unused keys only warn.
fn load_settings(paths: &[String]) -> Result<LoadedSettings> {
    if paths.is_empty() {
        return Ok(LoadedSettings {
            settings: LedgerSettings::default(),
            config_hash: None,
            unused_keys: Vec::new(),
        });
    }
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = tally_config::load_layered_yaml(&path_refs)?;
    let report = tally_config::report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    Ok(LoadedSettings {
        settings: loaded.ledger_settings()?,
        config_hash: Some(loaded.config_hash),
        unused_keys: report.unused_leaf_pointers,
    })
}

fn exit_code(err: &anyhow::Error) -> u8 {
    match tally_db::error_kind(err) {
        Some(ErrorKind::Validation) => 2,
        Some(ErrorKind::NotFound) => 3,
        Some(ErrorKind::Conflict) => 4,
        None => 1,
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();
}
