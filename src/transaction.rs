//! The `Transaction` model, the core type of the application.
//!
//! A [TransactionDraft] holds the user-editable fields; [TransactionDraft::finalize]
//! validates the draft and stamps the generated `id` and `created_at` fields
//! to produce a [Transaction].

use std::fmt;

use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::{Error, category::validate_category};

/// Whether a transaction records money earned or money spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money flowing in, e.g. a salary payment.
    Income,
    /// Money flowing out, e.g. a grocery purchase.
    Expense,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Income => write!(f, "income"),
            TransactionType::Expense => write!(f, "expense"),
        }
    }
}

/// A single dated income or expense record.
///
/// Transactions are created from a [TransactionDraft]; `id` and `created_at`
/// are stamped at creation and never change afterwards.
///
/// The serialized form matches the persisted storage record: `date` is an
/// ISO-8601 calendar date and `created_at` an ISO-8601 date-time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Opaque unique identifier, assigned at creation.
    pub id: String,
    /// Whether this is an income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The amount of money that moved. Always greater than zero.
    pub amount: f64,
    /// The category label. Drawn from the fixed set in [crate::category].
    pub category: String,
    /// The calendar date the transaction happened on. Distinct from
    /// `created_at`, which records when the entry was made.
    pub date: Date,
    /// Optional free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// When this record was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The user-editable fields of a transaction, before `id` and `created_at`
/// have been assigned.
///
/// This is the input to [TransactionStore::add](crate::TransactionStore::add)
/// and [TransactionStore::update](crate::TransactionStore::update).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionDraft {
    /// Whether this is an income or an expense.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// The amount of money that moved.
    pub amount: f64,
    /// The category label.
    pub category: String,
    /// The calendar date the transaction happened on.
    pub date: Date,
    /// Optional free-text note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl TransactionDraft {
    /// Check the draft against the transaction schema without creating a
    /// transaction.
    ///
    /// # Errors
    /// This function will return a:
    /// - [Error::NonPositiveAmount] if `amount` is zero or negative,
    /// - or a category error as described in
    ///   [validate_category](crate::category).
    ///
    /// Any calendar date is accepted; restricting dates to a sensible range
    /// is a UI concern.
    pub fn validate(&self) -> Result<(), Error> {
        if self.amount <= 0.0 {
            return Err(Error::NonPositiveAmount(self.amount));
        }

        validate_category(&self.category, self.transaction_type)
    }

    /// Validate the draft, then stamp a fresh `id` and `created_at` to
    /// produce a [Transaction].
    ///
    /// Validation runs before any field is generated, so a failed call has
    /// no observable effect.
    ///
    /// # Errors
    /// Returns the same errors as [TransactionDraft::validate].
    pub fn finalize(self, created_at: OffsetDateTime) -> Result<Transaction, Error> {
        self.validate()?;

        Ok(Transaction {
            id: new_transaction_id(),
            transaction_type: self.transaction_type,
            amount: self.amount,
            category: self.category,
            date: self.date,
            note: self.note,
            created_at,
        })
    }
}

/// Generate a fresh opaque transaction ID.
fn new_transaction_id() -> String {
    format!("txn_{}", Uuid::new_v4())
}

#[cfg(test)]
mod transaction_tests {
    use time::{OffsetDateTime, macros::date};

    use crate::Error;

    use super::{Transaction, TransactionDraft, TransactionType};

    fn food_draft(amount: f64) -> TransactionDraft {
        TransactionDraft {
            transaction_type: TransactionType::Expense,
            amount,
            category: "Food".to_owned(),
            date: date!(2024 - 01 - 02),
            note: None,
        }
    }

    #[test]
    fn finalize_stamps_id_and_created_at() {
        let now = OffsetDateTime::now_utc();

        let transaction = food_draft(250.0).finalize(now).unwrap();

        assert!(transaction.id.starts_with("txn_"));
        assert_eq!(transaction.created_at, now);
        assert_eq!(transaction.amount, 250.0);
        assert_eq!(transaction.category, "Food");
        assert_eq!(transaction.date, date!(2024 - 01 - 02));
    }

    #[test]
    fn finalize_generates_unique_ids() {
        let now = OffsetDateTime::now_utc();

        let first = food_draft(1.0).finalize(now).unwrap();
        let second = food_draft(1.0).finalize(now).unwrap();

        assert_ne!(first.id, second.id);
    }

    #[test]
    fn finalize_rejects_zero_amount() {
        let result = food_draft(0.0).finalize(OffsetDateTime::now_utc());

        assert_eq!(result, Err(Error::NonPositiveAmount(0.0)));
    }

    #[test]
    fn finalize_rejects_negative_amount() {
        let result = food_draft(-9.99).finalize(OffsetDateTime::now_utc());

        assert_eq!(result, Err(Error::NonPositiveAmount(-9.99)));
    }

    #[test]
    fn finalize_rejects_category_from_the_other_partition() {
        let draft = TransactionDraft {
            category: "Salary".to_owned(),
            ..food_draft(10.0)
        };

        assert_eq!(
            draft.finalize(OffsetDateTime::now_utc()),
            Err(Error::CategoryTypeMismatch {
                category: "Salary".to_owned(),
                transaction_type: TransactionType::Expense,
            })
        );
    }

    #[test]
    fn future_dates_are_accepted() {
        let draft = TransactionDraft {
            date: date!(2100 - 01 - 01),
            ..food_draft(10.0)
        };

        assert!(draft.finalize(OffsetDateTime::now_utc()).is_ok());
    }

    #[test]
    fn serializes_with_the_persisted_field_names() {
        let transaction = Transaction {
            id: "txn_test".to_owned(),
            transaction_type: TransactionType::Income,
            amount: 1000.0,
            category: "Salary".to_owned(),
            date: date!(2024 - 01 - 01),
            note: None,
            created_at: date!(2024 - 01 - 01).midnight().assume_utc(),
        };

        let json = serde_json::to_value(&transaction).unwrap();

        assert_eq!(json["type"], "income");
        assert_eq!(json["date"], "2024-01-01");
        assert!(json["createdAt"].as_str().unwrap().starts_with("2024-01-01T00:00:00"));
        assert!(json.get("note").is_none());
    }

    #[test]
    fn deserializing_revives_dates_exactly() {
        let json = r#"{
            "id": "txn_test",
            "type": "expense",
            "amount": 250.0,
            "category": "Food",
            "date": "2024-01-02",
            "createdAt": "2024-01-02T09:30:00.000Z"
        }"#;

        let transaction: Transaction = serde_json::from_str(json).unwrap();

        assert_eq!(transaction.date, date!(2024 - 01 - 02));
        assert_eq!(
            transaction.created_at,
            date!(2024 - 01 - 02).with_hms(9, 30, 0).unwrap().assume_utc()
        );
    }
}
