//! The fixed set of transaction categories.
//!
//! Categories are a closed set of labels partitioned by naming convention:
//! labels containing "Income" are reserved for income transactions and
//! labels containing "Expense" are reserved for expense transactions. Each
//! type has a catch-all label ("Other Income"/"Other Expense").

use crate::{Error, TransactionType};

/// Category labels valid only for income transactions.
pub const INCOME_CATEGORIES: [&str; 6] = [
    "Salary",
    "Bonus",
    "Freelance",
    "Investment",
    "Gift",
    "Other Income",
];

/// Category labels valid only for expense transactions.
pub const EXPENSE_CATEGORIES: [&str; 9] = [
    "Food",
    "Housing",
    "Transport",
    "Utilities",
    "Entertainment",
    "Health",
    "Shopping",
    "Education",
    "Other Expense",
];

fn is_known(category: &str) -> bool {
    INCOME_CATEGORIES.contains(&category) || EXPENSE_CATEGORIES.contains(&category)
}

/// Check that `category` is a known label and is allowed for transactions of
/// type `transaction_type`.
///
/// # Errors
/// This function will return a:
/// - [Error::EmptyCategory] if `category` is an empty string,
/// - [Error::UnknownCategory] if `category` is not in the fixed category set,
/// - or [Error::CategoryTypeMismatch] if `category` is tagged with the other
///   transaction type (e.g., "Salary" on an expense).
pub fn validate_category(category: &str, transaction_type: TransactionType) -> Result<(), Error> {
    if category.is_empty() {
        return Err(Error::EmptyCategory);
    }

    if !is_known(category) {
        return Err(Error::UnknownCategory(category.to_owned()));
    }

    let reserved_for_other_type = match transaction_type {
        TransactionType::Income => EXPENSE_CATEGORIES.contains(&category),
        TransactionType::Expense => INCOME_CATEGORIES.contains(&category),
    };

    if reserved_for_other_type {
        return Err(Error::CategoryTypeMismatch {
            category: category.to_owned(),
            transaction_type,
        });
    }

    Ok(())
}

/// The category labels to offer in a selection widget for transactions of
/// type `transaction_type`.
pub fn selectable_categories(transaction_type: TransactionType) -> &'static [&'static str] {
    match transaction_type {
        TransactionType::Income => &INCOME_CATEGORIES,
        TransactionType::Expense => &EXPENSE_CATEGORIES,
    }
}
