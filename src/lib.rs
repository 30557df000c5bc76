//! Zenith Finance is a personal finance tracker: users record income and
//! expense transactions, view aggregated summaries and chart series, and
//! converse with an LLM assistant that is given their transaction data as
//! context.
//!
//! This library provides the application core:
//!
//! - [TransactionStore], the single source of truth for the transaction
//!   list, with validation and full-collection JSON persistence behind a
//!   pluggable [Storage] backend.
//! - [views], pure functions that derive summaries and chart series from a
//!   store snapshot.
//! - [ChatRelay], which forwards a user message plus the serialized
//!   transaction history to a remote chat-completion endpoint and streams
//!   the response back fragment by fragment.
//!
//! The `server` binary hosts the chat relay as an HTTP endpoint for the
//! browser-hosted UI.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum_server::Handle;
use tokio::signal;

mod app_state;
mod category;
mod chat;
pub mod endpoints;
mod routing;
mod storage;
mod store;
mod tools;
mod transaction;
pub mod views;

pub use app_state::AppState;
pub use category::{EXPENSE_CATEGORIES, INCOME_CATEGORIES, selectable_categories};
pub use chat::{
    ChatMessage, ChatRelay, ChatRequest, CompletionStream, MessageAccumulator, RelayConfig, Role,
};
pub use routing::build_router;
pub use storage::{JsonFileStorage, MemoryStorage, Storage};
pub use store::{STORAGE_KEY, SubscriberId, TransactionStore};
pub use tools::{Tool, ToolDefinition, ToolRegistry};
pub use transaction::{Transaction, TransactionDraft, TransactionType};

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down
/// gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// A zero or negative amount was used to create a transaction.
    ///
    /// Transactions record money that moved; the direction is carried by the
    /// transaction type, so amounts must be strictly positive.
    #[error("transaction amounts must be greater than zero, got {0}")]
    NonPositiveAmount(f64),

    /// An empty string was used as a transaction category.
    #[error("a category is required")]
    EmptyCategory,

    /// The category label is not part of the fixed category set.
    #[error("\"{0}\" is not a known category")]
    UnknownCategory(String),

    /// The category belongs to the other transaction type, e.g. an income
    /// category on an expense transaction.
    #[error("the category \"{category}\" cannot be used for {transaction_type} transactions")]
    CategoryTypeMismatch {
        /// The rejected category label.
        category: String,
        /// The type of the transaction the category was used with.
        transaction_type: TransactionType,
    },

    /// A mutation referenced a transaction ID that is not in the store.
    #[error("the requested transaction could not be found")]
    NotFound,

    /// The chat relay could not reach the upstream completion service, or
    /// the upstream response could not be read.
    ///
    /// The error string should be logged on the server; clients should see a
    /// generic "assistant unavailable" notice instead.
    #[error("could not reach the chat completion service: {0}")]
    Transport(String),

    /// The model requested a tool that has not been declared.
    #[error("the tool \"{0}\" has not been declared")]
    ToolNotFound(String),

    /// The storage backend failed to persist the transaction collection.
    ///
    /// Unreadable or corrupt persisted data is not an error; it is treated
    /// as empty state when the store loads.
    #[error("could not persist transactions: {0}")]
    Storage(String),
}

impl Error {
    /// The name of the transaction field that failed validation, if this is
    /// a validation error.
    ///
    /// The UI layer uses this to attach the error message to the offending
    /// form field.
    pub fn offending_field(&self) -> Option<&'static str> {
        match self {
            Error::NonPositiveAmount(_) => Some("amount"),
            Error::EmptyCategory | Error::UnknownCategory(_) => Some("category"),
            Error::CategoryTypeMismatch { .. } => Some("category"),
            _ => None,
        }
    }
}

#[cfg(test)]
mod error_tests {
    use super::{Error, TransactionType};

    #[test]
    fn validation_errors_name_the_offending_field() {
        assert_eq!(Error::NonPositiveAmount(-1.0).offending_field(), Some("amount"));
        assert_eq!(Error::EmptyCategory.offending_field(), Some("category"));
        assert_eq!(
            Error::UnknownCategory("Yachts".to_owned()).offending_field(),
            Some("category")
        );
        assert_eq!(
            Error::CategoryTypeMismatch {
                category: "Salary".to_owned(),
                transaction_type: TransactionType::Expense,
            }
            .offending_field(),
            Some("category")
        );
    }

    #[test]
    fn non_validation_errors_have_no_field() {
        assert_eq!(Error::NotFound.offending_field(), None);
        assert_eq!(Error::Transport("timed out".to_owned()).offending_field(), None);
        assert_eq!(Error::ToolNotFound("web_search".to_owned()).offending_field(), None);
    }
}
