//! Ticket store trait.
//!
//! The store is the sole authority on which tickets exist. The lifecycle
//! manager only ever reaches tickets through this trait, so an in-memory map
//! and a database-backed table are interchangeable.

use crate::ticket::{Ticket, TicketId};
use std::future::Future;
use thiserror::Error;

/// Errors from a ticket store.
///
/// "Not found" is not an error; lookups return `Ok(None)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The backing storage could not be reached or refused the operation.
    #[error("Ticket store unavailable: {0}")]
    Unavailable(String),
}

/// Result type alias for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Keyed ticket storage.
///
/// # Implementation Notes
///
/// - `put` overwrites unconditionally; callers validate.
/// - `insert_new` must check vacancy and insert as one step.
/// - `update` must apply its closure atomically with respect to every other
///   `put`/`update` of the same key (a write lock, a row lock, or a
///   transaction). Scan-history appends rely on this to never lose entries or
///   resurrect a stale status.
pub trait TicketStore: Send + Sync {
    /// Insert or overwrite a ticket.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the storage operation fails.
    fn put(&self, ticket: Ticket) -> impl Future<Output = StoreResult<()>> + Send;

    /// Look up a ticket. No side effects.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the storage operation fails.
    fn get(&self, ticket_id: &TicketId) -> impl Future<Output = StoreResult<Option<Ticket>>> + Send;

    /// Insert a ticket only if its identifier is vacant.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: inserted
    /// - `Ok(false)`: another ticket already holds this identifier; nothing written
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the storage operation fails.
    fn insert_new(&self, ticket: Ticket) -> impl Future<Output = StoreResult<bool>> + Send;

    /// Atomically read-modify-write one ticket.
    ///
    /// Returns `Ok(None)` without calling `f` when the ticket does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the storage operation fails. In
    /// that case no modification may be visible.
    fn update<F, T>(
        &self,
        ticket_id: &TicketId,
        f: F,
    ) -> impl Future<Output = StoreResult<Option<T>>> + Send
    where
        F: FnOnce(&mut Ticket) -> T + Send,
        T: Send;
}
