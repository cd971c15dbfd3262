use std::sync::Arc;
use std::thread;

use tally_ledger::{Cents, MemoryLedger, NewEntry, PaymentMethod};

#[test]
fn scenario_two_concurrent_payments_both_land() {
    for _ in 0..200 {
        let ledger = Arc::new(MemoryLedger::new());
        let cust = ledger.create_customer("Concurrente", None).unwrap().customer_id;

        let handles: Vec<_> = [100_i64, 200]
            .into_iter()
            .map(|raw| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    ledger
                        .record_entry(NewEntry::payment(cust, Cents::new(raw), PaymentMethod::Cash, "pago"))
                        .unwrap()
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(ledger.customer(cust).unwrap().current_balance, Cents::new(300));
        assert!(ledger.verify(cust).unwrap().is_clean());
    }
}

#[test]
fn scenario_concurrent_edits_and_records_stay_consistent() {
    let ledger = Arc::new(MemoryLedger::new());
    let cust = ledger.create_customer("Concurrente", None).unwrap().customer_id;
    let first = ledger
        .record_entry(NewEntry::purchase(cust, Cents::new(1_000), "remito", "R-1"))
        .unwrap();

    let writers: Vec<_> = (0..8_i64)
        .map(|t| {
            let ledger = Arc::clone(&ledger);
            thread::spawn(move || {
                for i in 0..25_i64 {
                    ledger
                        .record_entry(NewEntry::payment(cust, Cents::new(t * 100 + i + 1), PaymentMethod::Cash, "pago"))
                        .unwrap();
                }
            })
        })
        .collect();
    let editor = {
        let ledger = Arc::clone(&ledger);
        thread::spawn(move || {
            for i in 1..=25_i64 {
                ledger
                    .edit_entry(first.entry_id, &tally_ledger::EntryEdit::amount(Cents::new(1_000 + i)))
                    .unwrap();
            }
        })
    };
    for h in writers {
        h.join().unwrap();
    }
    editor.join().unwrap();

    let report = ledger.verify(cust).unwrap();
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(report.entries_checked, 201);
}
