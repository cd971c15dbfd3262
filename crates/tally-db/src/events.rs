//! Append-only mutation log (`ledger_events`).
//!
//! Rows are written inside the mutation's transaction and never read back
//! for balance computation.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::{PgConnection, PgPool, Row};
use tally_ledger::Cents;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventType {
    EntryRecorded,
    EntryEdited,
    EntryDeleted,
    ChequeStatusChanged,
    CustomerDeleted,
    CustomerRestored,
}

impl LedgerEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerEventType::EntryRecorded => "entry_recorded",
            LedgerEventType::EntryEdited => "entry_edited",
            LedgerEventType::EntryDeleted => "entry_deleted",
            LedgerEventType::ChequeStatusChanged => "cheque_status_changed",
            LedgerEventType::CustomerDeleted => "customer_deleted",
            LedgerEventType::CustomerRestored => "customer_restored",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "entry_recorded" => Ok(LedgerEventType::EntryRecorded),
            "entry_edited" => Ok(LedgerEventType::EntryEdited),
            "entry_deleted" => Ok(LedgerEventType::EntryDeleted),
            "cheque_status_changed" => Ok(LedgerEventType::ChequeStatusChanged),
            "customer_deleted" => Ok(LedgerEventType::CustomerDeleted),
            "customer_restored" => Ok(LedgerEventType::CustomerRestored),
            other => Err(anyhow!("invalid ledger event type: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NewLedgerEvent {
    pub customer_id: i64,
    pub entry_id: Option<i64>,
    pub event_type: LedgerEventType,
    pub delta: Cents,
    pub balance_after: Cents,
    pub payload: Value,
}

pub(crate) async fn insert_event(conn: &mut PgConnection, ev: &NewLedgerEvent) -> Result<i64> {
    let (event_id,): (i64,) = sqlx::query_as::<_, (i64,)>(
        r#"
        insert into ledger_events (
          customer_id, entry_id, event_type, delta, balance_after, payload
        ) values (
          $1, $2, $3, $4, $5, $6
        )
        returning event_id
        "#,
    )
    .bind(ev.customer_id)
    .bind(ev.entry_id)
    .bind(ev.event_type.as_str())
    .bind(ev.delta.raw())
    .bind(ev.balance_after.raw())
    .bind(&ev.payload)
    .fetch_one(&mut *conn)
    .await
    .context("insert_event failed")?;
    Ok(event_id)
}

#[derive(Debug, Clone, Serialize)]
pub struct LedgerEventRow {
    pub event_id: i64,
    pub customer_id: i64,
    pub entry_id: Option<i64>,
    pub event_type: LedgerEventType,
    pub delta: Cents,
    pub balance_after: Cents,
    pub payload: Value,
    pub ts_utc: DateTime<Utc>,
}

/// Events of one customer in write order.
pub async fn list_events(pool: &PgPool, customer_id: i64) -> Result<Vec<LedgerEventRow>> {
    let rows = sqlx::query(
        r#"
        select event_id, customer_id, entry_id, event_type, delta, balance_after, payload, ts_utc
        from ledger_events
        where customer_id = $1
        order by event_id asc
        "#,
    )
    .bind(customer_id)
    .fetch_all(pool)
    .await
    .context("list_events failed")?;

    rows.iter()
        .map(|row| {
            Ok(LedgerEventRow {
                event_id: row.try_get("event_id")?,
                customer_id: row.try_get("customer_id")?,
                entry_id: row.try_get("entry_id")?,
                event_type: LedgerEventType::parse(&row.try_get::<String, _>("event_type")?)?,
                delta: Cents::new(row.try_get("delta")?),
                balance_after: Cents::new(row.try_get("balance_after")?),
                payload: row.try_get("payload")?,
                ts_utc: row.try_get("ts_utc")?,
            })
        })
        .collect()
}
