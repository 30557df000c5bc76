//! The transaction store, the single source of truth for the transaction
//! list.
//!
//! The store owns the ordered collection of [Transaction]s. All mutations go
//! through [TransactionStore::add], [TransactionStore::update], and
//! [TransactionStore::delete]; each validates its input, applies the change,
//! serializes the whole collection, and writes it to the injected [Storage]
//! backend before the mutation is considered committed. Other components
//! read via [TransactionStore::list] snapshots or register with
//! [TransactionStore::subscribe] to recompute on change.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    storage::Storage,
    transaction::{Transaction, TransactionDraft},
};

/// The namespace key the transaction collection is persisted under.
pub const STORAGE_KEY: &str = "zenith-finance-transactions";

/// The version written into the persisted envelope.
const STORAGE_VERSION: u32 = 0;

/// The persisted storage record: `{ "state": { "transactions": [...] },
/// "version": n }`.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedEnvelope {
    state: PersistedState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedState {
    transactions: Vec<Transaction>,
}

/// A handle identifying one subscriber; pass it to
/// [TransactionStore::unsubscribe] to tear the subscription down.
pub type SubscriberId = usize;

type SnapshotCallback = Box<dyn FnMut(&[Transaction]) + Send>;

/// Owns the ordered transaction collection, validates every mutation, and
/// persists the full collection to a [Storage] backend after each one.
pub struct TransactionStore<S: Storage> {
    storage: S,
    key: String,
    transactions: Vec<Transaction>,
    subscribers: Vec<(SubscriberId, SnapshotCallback)>,
    next_subscriber_id: SubscriberId,
}

impl<S: Storage> TransactionStore<S> {
    /// Load the store from `storage` under the default [STORAGE_KEY].
    ///
    /// Missing data starts the store empty. Data that does not parse as the
    /// persisted envelope is treated as empty state rather than an error;
    /// the dates of every parsed record are revived from their ISO string
    /// form so they compare and sort correctly.
    pub fn load(storage: S) -> Self {
        Self::load_with_key(storage, STORAGE_KEY)
    }

    /// Load the store from `storage` under a caller-chosen namespace key.
    pub fn load_with_key(storage: S, key: &str) -> Self {
        let transactions = match storage.read(key) {
            Ok(Some(contents)) => match serde_json::from_str::<PersistedEnvelope>(&contents) {
                Ok(envelope) => envelope.state.transactions,
                Err(error) => {
                    tracing::warn!(
                        "persisted transactions under \"{key}\" are corrupt, starting empty: {error}"
                    );
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(error) => {
                tracing::warn!("could not read persisted transactions, starting empty: {error}");
                Vec::new()
            }
        };

        Self {
            storage,
            key: key.to_owned(),
            transactions,
            subscribers: Vec::new(),
            next_subscriber_id: 0,
        }
    }

    /// The current snapshot of the collection, in insertion order.
    pub fn list(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Validate `draft`, stamp a fresh `id` and `created_at`, append the
    /// transaction, and persist the collection.
    ///
    /// # Errors
    /// This function will return a validation error as described in
    /// [TransactionDraft::validate], or an [Error::Storage] if the backend
    /// write failed. On any error the collection is unchanged.
    pub fn add(&mut self, draft: TransactionDraft) -> Result<Transaction, Error> {
        let transaction = draft.finalize(OffsetDateTime::now_utc())?;

        let mut next = self.transactions.clone();
        next.push(transaction.clone());
        self.commit(next)?;

        Ok(transaction)
    }

    /// Validate `draft` and replace every field of the transaction with ID
    /// `id` except `id` itself and `created_at`, then persist the
    /// collection.
    ///
    /// # Errors
    /// This function will return a:
    /// - validation error as described in [TransactionDraft::validate],
    /// - [Error::NotFound] if `id` is not in the store,
    /// - or [Error::Storage] if the backend write failed.
    ///
    /// On any error the collection is unchanged.
    pub fn update(&mut self, id: &str, draft: TransactionDraft) -> Result<Transaction, Error> {
        draft.validate()?;

        let position = self
            .transactions
            .iter()
            .position(|transaction| transaction.id == id)
            .ok_or(Error::NotFound)?;

        let existing = &self.transactions[position];
        let updated = Transaction {
            id: existing.id.clone(),
            created_at: existing.created_at,
            transaction_type: draft.transaction_type,
            amount: draft.amount,
            category: draft.category,
            date: draft.date,
            note: draft.note,
        };

        let mut next = self.transactions.clone();
        next[position] = updated.clone();
        self.commit(next)?;

        Ok(updated)
    }

    /// Remove the transaction with ID `id` and persist the collection.
    ///
    /// Deleting an ID that is not in the store is a no-op, not an error.
    ///
    /// # Errors
    /// This function will return an [Error::Storage] if the backend write
    /// failed; the collection is unchanged in that case.
    pub fn delete(&mut self, id: &str) -> Result<(), Error> {
        if !self.transactions.iter().any(|transaction| transaction.id == id) {
            return Ok(());
        }

        let mut next = self.transactions.clone();
        next.retain(|transaction| transaction.id != id);
        self.commit(next)
    }

    /// Register `callback` to be called with the new snapshot after every
    /// committed mutation.
    ///
    /// Returns the current snapshot and the subscription's teardown handle.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&[Transaction]) + Send + 'static,
    ) -> (Vec<Transaction>, SubscriberId) {
        let id = self.next_subscriber_id;
        self.next_subscriber_id += 1;
        self.subscribers.push((id, Box::new(callback)));

        (self.transactions.clone(), id)
    }

    /// Tear down the subscription with handle `id`; its callback will not be
    /// called again.
    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers
            .retain(|(subscriber_id, _)| *subscriber_id != id);
    }

    /// Persist `next` and, only if the write succeeds, make it the current
    /// collection and notify subscribers.
    fn commit(&mut self, next: Vec<Transaction>) -> Result<(), Error> {
        let envelope = PersistedEnvelope {
            state: PersistedState {
                transactions: next,
            },
            version: Some(STORAGE_VERSION),
        };

        let serialized =
            serde_json::to_string(&envelope).map_err(|error| Error::Storage(error.to_string()))?;
        self.storage.write(&self.key, &serialized)?;

        self.transactions = envelope.state.transactions;

        for (_, callback) in &mut self.subscribers {
            callback(&self.transactions);
        }

        Ok(())
    }
}
