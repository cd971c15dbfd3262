use anyhow::Result;
use clap::Subcommand;
use tally_config::LedgerSettings;
use tally_ledger::Customer;

use super::{connect, opt_str};

#[derive(Subcommand)]
pub enum CustomerCmd {
    /// Create a customer with a zero balance
    Create {
        #[arg(long)]
        name: String,

        /// Tax id (CUIT/CUIL or equivalent)
        #[arg(long)]
        tax_id: Option<String>,
    },

    /// Print a customer row
    Show {
        #[arg(long)]
        id: i64,
    },

    /// Soft delete (ledger is kept, new entries are rejected)
    Delete {
        #[arg(long)]
        id: i64,
    },

    /// Undo a soft delete
    Restore {
        #[arg(long)]
        id: i64,
    },
}

pub async fn run(cmd: CustomerCmd, settings: &LedgerSettings) -> Result<()> {
    let pool = connect(settings).await?;
    let customer = match cmd {
        CustomerCmd::Create { name, tax_id } => {
            tally_db::insert_customer(&pool, &name, tax_id.as_deref()).await?
        }
        CustomerCmd::Show { id } => tally_db::fetch_customer(&pool, id).await?,
        CustomerCmd::Delete { id } => tally_db::delete_customer(&pool, id).await?,
        CustomerCmd::Restore { id } => tally_db::restore_customer(&pool, id).await?,
    };
    print_customer(&customer, &settings.currency_code);
    Ok(())
}

fn print_customer(c: &Customer, currency: &str) {
    println!("customer_id={}", c.customer_id);
    println!("name={}", c.name);
    println!("tax_id={}", opt_str(&c.tax_id));
    println!("current_balance={} {}", c.current_balance, currency);
    println!(
        "last_purchase_at={}",
        c.last_purchase_at.map(|t| t.to_rfc3339()).unwrap_or_default()
    );
    println!("created_at={}", c.created_at.to_rfc3339());
    println!("deleted={}", c.is_deleted());
}
