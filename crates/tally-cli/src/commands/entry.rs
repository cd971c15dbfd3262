use anyhow::Result;
use clap::Subcommand;
use tally_config::LedgerSettings;
use tally_ledger::{
    ChequeDetails, DeletePlan, EntryEdit, LedgerEntry, LedgerError, NewEntry, PaymentMethod,
};

use super::{connect, opt_str, parse_amount, parse_date};

#[derive(Subcommand)]
pub enum EntryCmd {
    /// Record a purchase from a finalized delivery note
    Purchase {
        #[arg(long)]
        customer: i64,

        /// Note total, decimal text (e.g. 1234.56)
        #[arg(long)]
        amount: String,

        /// Delivery note number
        #[arg(long)]
        note: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Entry date YYYY-MM-DD (default: today)
        #[arg(long)]
        date: Option<String>,
    },

    /// Record a payment
    Payment {
        #[arg(long)]
        customer: i64,

        #[arg(long)]
        amount: String,

        /// cash | transfer | cheque | current_account
        #[arg(long)]
        method: String,

        #[arg(long, default_value = "")]
        description: String,

        #[arg(long)]
        document: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        cheque_number: Option<String>,

        #[arg(long)]
        cheque_bank: Option<String>,

        #[arg(long)]
        cheque_drawer: Option<String>,

        /// Cheque due date YYYY-MM-DD
        #[arg(long)]
        cheque_due: Option<String>,

        /// Defaults to the payment amount
        #[arg(long)]
        cheque_amount: Option<String>,
    },

    /// Edit a live entry; only given fields change
    Edit {
        #[arg(long)]
        id: i64,

        /// New absolute amount; the entry keeps its kind
        #[arg(long)]
        amount: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        method: Option<String>,

        /// Empty string clears the document number
        #[arg(long)]
        document: Option<String>,
    },

    /// Soft delete an entry and reverse its effect on the balance
    Delete {
        #[arg(long)]
        id: i64,
    },

    /// Account history, newest first
    List {
        #[arg(long)]
        customer: i64,

        /// One JSON object per line instead of key=value rows
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Previously used descriptions starting with a prefix
    Suggest {
        #[arg(long, default_value = "")]
        prefix: String,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

pub async fn run(cmd: EntryCmd, settings: &LedgerSettings) -> Result<()> {
    match cmd {
        EntryCmd::Purchase {
            customer,
            amount,
            note,
            description,
            date,
        } => {
            let mut req = NewEntry::purchase(customer, parse_amount(&amount)?, description, note);
            if let Some(d) = date {
                req = req.on(parse_date("date", &d)?);
            }
            req.validate()?;

            let pool = connect(settings).await?;
            let entry = tally_db::record_entry(&pool, &req).await?;
            print_entry(&entry);
        }

        EntryCmd::Payment {
            customer,
            amount,
            method,
            description,
            document,
            date,
            cheque_number,
            cheque_bank,
            cheque_drawer,
            cheque_due,
            cheque_amount,
        } => {
            let method = PaymentMethod::parse(&method)?;
            let mut req = NewEntry::payment(customer, parse_amount(&amount)?, method, description);
            if let Some(doc) = document {
                req = req.with_document(doc);
            }
            if let Some(d) = date {
                req = req.on(parse_date("date", &d)?);
            }

            let any_cheque_field = cheque_number.is_some()
                || cheque_bank.is_some()
                || cheque_drawer.is_some()
                || cheque_due.is_some()
                || cheque_amount.is_some();
            if method == PaymentMethod::Cheque || any_cheque_field {
                req = req.with_cheque(ChequeDetails {
                    number: cheque_number.unwrap_or_default(),
                    bank: cheque_bank.unwrap_or_default(),
                    drawer_name: cheque_drawer.unwrap_or_default(),
                    due_date: cheque_due
                        .map(|d| parse_date("cheque due date", &d))
                        .transpose()?,
                    amount: cheque_amount.map(|a| parse_amount(&a)).transpose()?,
                });
            }
            req.validate()?;

            let pool = connect(settings).await?;
            let entry = tally_db::record_entry(&pool, &req).await?;
            print_entry(&entry);
        }

        EntryCmd::Edit {
            id,
            amount,
            description,
            date,
            method,
            document,
        } => {
            let edit = EntryEdit {
                description,
                entry_date: date.map(|d| parse_date("date", &d)).transpose()?,
                method: method.map(|m| PaymentMethod::parse(&m)).transpose()?,
                document_number: document,
                amount: amount.map(|a| parse_amount(&a)).transpose()?,
            };
            if edit.is_empty() {
                return Err(LedgerError::EmptyField { field: "edit" }.into());
            }
            edit.validate()?;

            let pool = connect(settings).await?;
            let entry = tally_db::edit_entry(&pool, id, &edit).await?;
            print_entry(&entry);
        }

        EntryCmd::Delete { id } => {
            let pool = connect(settings).await?;
            match tally_db::delete_entry(&pool, id).await? {
                DeletePlan::AlreadyDeleted => {
                    println!("deleted=true entry_id={} already_deleted=true", id)
                }
                DeletePlan::Reverse { reversal_delta } => println!(
                    "deleted=true entry_id={} reversal_delta={}",
                    id, reversal_delta
                ),
            }
        }

        EntryCmd::List { customer, json } => {
            let pool = connect(settings).await?;
            let rows = tally_db::account_history(&pool, customer).await?;
            for r in &rows {
                if json {
                    println!("{}", serde_json::to_string(r)?);
                } else {
                    println!(
                        "entry_id={} date={} kind={} method={} debit={} credit={} balance={} document={} description={}",
                        r.entry_id,
                        r.entry_date,
                        r.kind.as_str(),
                        r.method.as_str(),
                        r.debit,
                        r.credit,
                        r.balance,
                        opt_str(&r.document_number),
                        r.description
                    );
                }
            }
            let c = tally_db::fetch_customer(&pool, customer).await?;
            println!("current_balance={} {}", c.current_balance, settings.currency_code);
        }

        EntryCmd::Suggest { prefix, limit } => {
            let pool = connect(settings).await?;
            let history = tally_db::load_description_history(&pool).await?;
            for d in history.suggest(&prefix, limit) {
                println!("{d}");
            }
        }
    }
    Ok(())
}

fn print_entry(e: &LedgerEntry) {
    println!("entry_id={}", e.entry_id);
    println!("customer_id={}", e.customer_id);
    println!("kind={}", e.kind.as_str());
    println!("amount={}", e.amount);
    println!("balance_snapshot={}", e.balance_snapshot);
    println!("method={}", e.method.as_str());
    println!("document={}", opt_str(&e.document_number));
    println!("entry_date={}", e.entry_date);
    if let Some(c) = &e.cheque {
        println!(
            "cheque number={} bank={} due={} amount={} status={}",
            c.number,
            c.bank,
            c.due_date,
            c.amount,
            c.status.as_str()
        );
    }
}
