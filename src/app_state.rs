//! Implements the state shared across the server's route handlers.

use std::sync::Arc;

use crate::chat::ChatRelay;

/// The state of the HTTP server.
///
/// The server is stateless with respect to transactions: the browser owns
/// the transaction store and sends a snapshot with each chat request, so the
/// only shared state is the relay's upstream connection.
#[derive(Clone)]
pub struct AppState {
    /// The relay that forwards chat requests upstream.
    pub relay: Arc<ChatRelay>,
}

impl AppState {
    /// Create a new [AppState] around `relay`.
    pub fn new(relay: ChatRelay) -> Self {
        Self {
            relay: Arc::new(relay),
        }
    }
}
