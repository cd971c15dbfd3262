use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use tally_config::LedgerSettings;
use tally_ledger::ChequeStatus;

use super::{connect, parse_date};

#[derive(Subcommand)]
pub enum ChequeCmd {
    /// Move a cheque to a new status (pending -> deposited -> honored, or rejected)
    Status {
        /// Entry id of the cheque payment
        #[arg(long)]
        entry: i64,

        /// deposited | rejected | honored
        #[arg(long)]
        to: String,
    },

    /// Pending cheques due on or before a date
    Due {
        /// YYYY-MM-DD (default: today)
        #[arg(long)]
        on_or_before: Option<String>,
    },
}

pub async fn run(cmd: ChequeCmd, settings: &LedgerSettings) -> Result<()> {
    match cmd {
        ChequeCmd::Status { entry, to } => {
            let status = ChequeStatus::parse(&to)?;
            let pool = connect(settings).await?;
            let c = tally_db::set_cheque_status(&pool, entry, status).await?;
            println!("entry_id={} status={}", c.entry_id, c.status.as_str());
        }

        ChequeCmd::Due { on_or_before } => {
            let date = match on_or_before {
                Some(d) => parse_date("date", &d)?,
                None => Utc::now().date_naive(),
            };
            let pool = connect(settings).await?;
            let due = tally_db::cheques_due(&pool, date).await?;
            for d in &due {
                println!(
                    "entry_id={} customer_id={} number={} bank={} drawer={} amount={} due={}",
                    d.cheque.entry_id,
                    d.customer_id,
                    d.cheque.number,
                    d.cheque.bank,
                    d.cheque.drawer_name,
                    d.cheque.amount,
                    d.cheque.due_date
                );
            }
            println!("count={}", due.len());
        }
    }
    Ok(())
}
