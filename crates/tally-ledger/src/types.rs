use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::money::Cents;

/// PURCHASE or PAYMENT. Immutable once an entry is recorded.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Purchase,
    Payment,
}

impl EntryKind {
    /// The balance sign convention, in one place.
    ///
    /// Balance models funds available to the customer: a payment adds to it,
    /// a purchase takes from it. `amount_abs` is the user-facing positive
    /// amount; the result is what gets stored in `LedgerEntry::amount`.
    #[inline]
    pub fn signed(self, amount_abs: Cents) -> Cents {
        match self {
            EntryKind::Payment => amount_abs,
            EntryKind::Purchase => -amount_abs,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Purchase => "purchase",
            EntryKind::Payment => "payment",
        }
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "purchase" => Ok(EntryKind::Purchase),
            "payment" => Ok(EntryKind::Payment),
            other => Err(LedgerError::UnknownValue {
                field: "entry kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Free-function form of [`EntryKind::signed`].
#[inline]
pub fn signed_amount(kind: EntryKind, amount_abs: Cents) -> Cents {
    kind.signed(amount_abs)
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Transfer,
    Cheque,
    CurrentAccount,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Cheque => "cheque",
            PaymentMethod::CurrentAccount => "current_account",
        }
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "transfer" => Ok(PaymentMethod::Transfer),
            "cheque" => Ok(PaymentMethod::Cheque),
            "current_account" => Ok(PaymentMethod::CurrentAccount),
            other => Err(LedgerError::UnknownValue {
                field: "payment method",
                value: other.to_string(),
            }),
        }
    }
}

/// Cheque lifecycle.
///
/// ```text
/// pending ──► deposited ──► honored
///    │            │
///    └────────────┴──► rejected
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChequeStatus {
    Pending,
    Deposited,
    Rejected,
    Honored,
}

impl ChequeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChequeStatus::Pending => "pending",
            ChequeStatus::Deposited => "deposited",
            ChequeStatus::Rejected => "rejected",
            ChequeStatus::Honored => "honored",
        }
    }

    pub fn parse(s: &str) -> Result<Self, LedgerError> {
        match s {
            "pending" => Ok(ChequeStatus::Pending),
            "deposited" => Ok(ChequeStatus::Deposited),
            "rejected" => Ok(ChequeStatus::Rejected),
            "honored" => Ok(ChequeStatus::Honored),
            other => Err(LedgerError::UnknownValue {
                field: "cheque status",
                value: other.to_string(),
            }),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ChequeStatus::Rejected | ChequeStatus::Honored)
    }

    pub fn can_transition_to(&self, next: ChequeStatus) -> bool {
        matches!(
            (self, next),
            (ChequeStatus::Pending, ChequeStatus::Deposited)
                | (ChequeStatus::Pending, ChequeStatus::Rejected)
                | (ChequeStatus::Deposited, ChequeStatus::Honored)
                | (ChequeStatus::Deposited, ChequeStatus::Rejected)
        )
    }

    /// Check a transition for the cheque owned by `entry_id`.
    pub fn transition(&self, entry_id: i64, next: ChequeStatus) -> Result<ChequeStatus, LedgerError> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(LedgerError::IllegalChequeTransition {
                entry_id,
                from: self.as_str(),
                to: next.as_str(),
            })
        }
    }
}

/// Cheque details as supplied by the payment-registration flow.
///
/// `due_date` is optional here only so an incomplete form can be reported
/// field by field; [`ChequeDetails::validate`] rejects it when absent.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChequeDetails {
    pub number: String,
    pub bank: String,
    pub drawer_name: String,
    pub due_date: Option<NaiveDate>,
    /// Defaults to the owning entry's absolute amount.
    pub amount: Option<Cents>,
}

impl ChequeDetails {
    pub fn validate(&self) -> Result<NaiveDate, LedgerError> {
        let mut missing = Vec::new();
        if self.number.trim().is_empty() {
            missing.push("number");
        }
        if self.bank.trim().is_empty() {
            missing.push("bank");
        }
        if self.drawer_name.trim().is_empty() {
            missing.push("drawer name");
        }
        if self.due_date.is_none() {
            missing.push("due date");
        }
        if let Some(amount) = self.amount {
            if !amount.is_positive() {
                return Err(LedgerError::NonPositiveAmount { amount });
            }
        }
        match self.due_date {
            Some(due) if missing.is_empty() => Ok(due),
            _ => Err(LedgerError::MissingChequeDetails { missing }),
        }
    }
}

/// Stored cheque sub-record, owned by exactly one payment entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cheque {
    pub entry_id: i64,
    pub number: String,
    pub bank: String,
    pub drawer_name: String,
    pub amount: Cents,
    pub due_date: NaiveDate,
    pub status: ChequeStatus,
}

/// A pending cheque together with the customer who handed it over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChequeDue {
    pub customer_id: i64,
    pub cheque: Cheque,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: i64,
    pub name: String,
    pub tax_id: Option<String>,
    /// Authoritative running balance (Σ amount of non-deleted entries).
    pub current_balance: Cents,
    /// Advisory only.
    pub last_purchase_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Customer {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// One recorded purchase or payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Monotonic; id order is entry order.
    pub entry_id: i64,
    pub customer_id: i64,
    pub kind: EntryKind,
    /// Signed per [`EntryKind::signed`].
    pub amount: Cents,
    /// Customer balance immediately after this entry.
    pub balance_snapshot: Cents,
    pub method: PaymentMethod,
    pub document_number: Option<String>,
    pub description: String,
    pub entry_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub cheque: Option<Cheque>,
}

impl LedgerEntry {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// User-facing positive amount.
    pub fn amount_abs(&self) -> Cents {
        self.amount.abs()
    }
}

/// Request to record a new entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewEntry {
    pub customer_id: i64,
    pub kind: EntryKind,
    /// Positive, user-facing amount.
    pub amount: Cents,
    pub method: PaymentMethod,
    pub description: String,
    pub document_number: Option<String>,
    /// Defaults to the recording day.
    pub entry_date: Option<NaiveDate>,
    pub cheque: Option<ChequeDetails>,
}

impl NewEntry {
    /// A purchase originated by a finalized delivery note.
    pub fn purchase(
        customer_id: i64,
        total: Cents,
        description: impl Into<String>,
        note_number: impl Into<String>,
    ) -> Self {
        Self {
            customer_id,
            kind: EntryKind::Purchase,
            amount: total,
            method: PaymentMethod::CurrentAccount,
            description: description.into(),
            document_number: Some(note_number.into()),
            entry_date: None,
            cheque: None,
        }
    }

    /// A payment registered from the office.
    pub fn payment(
        customer_id: i64,
        amount: Cents,
        method: PaymentMethod,
        description: impl Into<String>,
    ) -> Self {
        Self {
            customer_id,
            kind: EntryKind::Payment,
            amount,
            method,
            description: description.into(),
            document_number: None,
            entry_date: None,
            cheque: None,
        }
    }

    pub fn with_document(mut self, document_number: impl Into<String>) -> Self {
        self.document_number = Some(document_number.into());
        self
    }

    pub fn with_cheque(mut self, cheque: ChequeDetails) -> Self {
        self.cheque = Some(cheque);
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.entry_date = Some(date);
        self
    }

    /// Input checks that need no stored state.
    ///
    /// Returns the validated cheque due date when a cheque is attached.
    pub fn validate(&self) -> Result<Option<NaiveDate>, LedgerError> {
        if !self.amount.is_positive() {
            return Err(LedgerError::NonPositiveAmount { amount: self.amount });
        }
        match (self.method, &self.cheque) {
            (PaymentMethod::Cheque, _) if self.kind != EntryKind::Payment => {
                Err(LedgerError::UnexpectedChequeDetails)
            }
            (PaymentMethod::Cheque, Some(details)) => details.validate().map(Some),
            (PaymentMethod::Cheque, None) => Err(LedgerError::MissingChequeDetails {
                missing: vec!["number", "bank", "drawer name", "due date"],
            }),
            (_, Some(_)) => Err(LedgerError::UnexpectedChequeDetails),
            (_, None) => Ok(None),
        }
    }
}

/// Field updates for an existing entry. `None` leaves a field untouched.
///
/// `document_number: Some("")` clears the document link.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryEdit {
    pub description: Option<String>,
    pub entry_date: Option<NaiveDate>,
    pub method: Option<PaymentMethod>,
    pub document_number: Option<String>,
    pub amount: Option<Cents>,
}

impl EntryEdit {
    pub fn amount(amount: Cents) -> Self {
        Self {
            amount: Some(amount),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        if let Some(amount) = self.amount {
            if !amount.is_positive() {
                return Err(LedgerError::NonPositiveAmount { amount });
            }
        }
        Ok(())
    }

    /// Normalized document update: `Some(None)` clears, `None` keeps.
    pub fn document_update(&self) -> Option<Option<String>> {
        self.document_number.as_ref().map(|d| {
            let d = d.trim();
            if d.is_empty() {
                None
            } else {
                Some(d.to_string())
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheque() -> ChequeDetails {
        ChequeDetails {
            number: "00012345".to_string(),
            bank: "Banco Nación".to_string(),
            drawer_name: "Metalúrgica Sur SA".to_string(),
            due_date: NaiveDate::from_ymd_opt(2026, 11, 30),
            amount: None,
        }
    }

    #[test]
    fn sign_convention_payment_positive_purchase_negative() {
        let thousand = Cents::from_major(1_000);
        assert_eq!(EntryKind::Payment.signed(thousand), thousand);
        assert_eq!(EntryKind::Purchase.signed(thousand), -thousand);
        assert_eq!(signed_amount(EntryKind::Purchase, thousand).raw(), -100_000);
    }

    #[test]
    fn enum_text_roundtrips() {
        for k in [EntryKind::Purchase, EntryKind::Payment] {
            assert_eq!(EntryKind::parse(k.as_str()).unwrap(), k);
        }
        for m in [
            PaymentMethod::Cash,
            PaymentMethod::Transfer,
            PaymentMethod::Cheque,
            PaymentMethod::CurrentAccount,
        ] {
            assert_eq!(PaymentMethod::parse(m.as_str()).unwrap(), m);
        }
        for s in [
            ChequeStatus::Pending,
            ChequeStatus::Deposited,
            ChequeStatus::Rejected,
            ChequeStatus::Honored,
        ] {
            assert_eq!(ChequeStatus::parse(s.as_str()).unwrap(), s);
        }
        assert!(EntryKind::parse("refund").is_err());
    }

    #[test]
    fn cheque_transitions() {
        use ChequeStatus::*;
        assert!(Pending.can_transition_to(Deposited));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Deposited.can_transition_to(Honored));
        assert!(Deposited.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Honored));
        assert!(!Pending.can_transition_to(Pending));
        assert!(!Honored.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Deposited));
        assert!(Honored.is_terminal() && Rejected.is_terminal());
        assert!(matches!(
            Honored.transition(9, Pending),
            Err(LedgerError::IllegalChequeTransition { entry_id: 9, .. })
        ));
    }

    #[test]
    fn cheque_payment_requires_complete_details() {
        let base = NewEntry::payment(1, Cents::from_major(100), PaymentMethod::Cheque, "pago");
        assert!(matches!(
            base.validate(),
            Err(LedgerError::MissingChequeDetails { .. })
        ));

        let mut partial = cheque();
        partial.bank = "  ".to_string();
        partial.due_date = None;
        let err = base.clone().with_cheque(partial).validate().unwrap_err();
        assert_eq!(
            err,
            LedgerError::MissingChequeDetails {
                missing: vec!["bank", "due date"]
            }
        );

        let due = base.with_cheque(cheque()).validate().unwrap();
        assert_eq!(due, NaiveDate::from_ymd_opt(2026, 11, 30));
    }

    #[test]
    fn cheque_details_rejected_on_other_methods_and_purchases() {
        let cash = NewEntry::payment(1, Cents::from_major(10), PaymentMethod::Cash, "pago")
            .with_cheque(cheque());
        assert_eq!(cash.validate(), Err(LedgerError::UnexpectedChequeDetails));

        let mut purchase = NewEntry::purchase(1, Cents::from_major(10), "remito", "R-0001");
        purchase.method = PaymentMethod::Cheque;
        assert_eq!(purchase.validate(), Err(LedgerError::UnexpectedChequeDetails));
    }

    #[test]
    fn non_positive_amounts_rejected() {
        let zero = NewEntry::payment(1, Cents::ZERO, PaymentMethod::Cash, "x");
        assert!(matches!(zero.validate(), Err(LedgerError::NonPositiveAmount { .. })));
        let neg = EntryEdit::amount(Cents::new(-1));
        assert!(matches!(neg.validate(), Err(LedgerError::NonPositiveAmount { .. })));
    }

    #[test]
    fn document_update_normalizes_blank_to_clear() {
        let keep = EntryEdit::default();
        assert_eq!(keep.document_update(), None);
        let clear = EntryEdit {
            document_number: Some("  ".to_string()),
            ..EntryEdit::default()
        };
        assert_eq!(clear.document_update(), Some(None));
        let set = EntryEdit {
            document_number: Some(" F-0003 ".to_string()),
            ..EntryEdit::default()
        };
        assert_eq!(set.document_update(), Some(Some("F-0003".to_string())));
    }
}
