//! Per-ticket exclusion tokens.
//!
//! Each ticket identifier maps to its own async mutex, created on first use.
//! Holding a [`TicketLockGuard`] is holding the token for that identifier;
//! dropping the guard releases it immediately, on every exit path including
//! `?` and panics.
//!
//! Tokens are acquired with `try_lock`, so a contended redemption learns
//! about the contention at once instead of queueing behind the holder.
//! Unrelated identifiers never share a mutex. The registry map itself is
//! guarded by a short-lived `std` mutex that is never held across `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as TokenMutex, OwnedMutexGuard};
use turnstile_core::TicketId;

type Registry = Arc<Mutex<HashMap<TicketId, Arc<TokenMutex<()>>>>>;

/// Registry of per-ticket exclusion tokens.
///
/// Cloning shares the registry.
#[derive(Debug, Clone, Default)]
pub struct TicketLocks {
    registry: Registry,
}

impl TicketLocks {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the token for `ticket_id` if nobody holds it.
    ///
    /// Never waits. Returns `None` when another guard for the same
    /// identifier is alive.
    #[must_use]
    pub fn try_acquire(&self, ticket_id: &TicketId) -> Option<TicketLockGuard> {
        // Try the token under the registry lock so a failed attempt has
        // dropped its clone before any guard's `Drop` can count holders.
        let guard = {
            let mut registry = self
                .registry
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            Arc::clone(registry.entry(ticket_id.clone()).or_default())
                .try_lock_owned()
                .ok()?
        };

        Some(TicketLockGuard {
            ticket_id: ticket_id.clone(),
            guard: Some(guard),
            registry: Arc::clone(&self.registry),
        })
    }

    /// Whether a guard for `ticket_id` is currently alive.
    #[must_use]
    pub fn is_held(&self, ticket_id: &TicketId) -> bool {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(ticket_id)
            .is_some_and(|token| token.try_lock().is_err())
    }

    /// Number of identifiers with a live token entry.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no identifier currently has a token entry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Exclusive hold on one ticket's token. Released on drop.
#[derive(Debug)]
#[must_use = "the token is released as soon as the guard is dropped"]
pub struct TicketLockGuard {
    ticket_id: TicketId,
    guard: Option<OwnedMutexGuard<()>>,
    registry: Registry,
}

impl TicketLockGuard {
    /// Identifier this guard protects.
    #[must_use]
    pub const fn ticket_id(&self) -> &TicketId {
        &self.ticket_id
    }
}

impl Drop for TicketLockGuard {
    fn drop(&mut self) {
        // Unlock first so the strong count below only counts other holders.
        drop(self.guard.take());

        let mut registry = self
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        // Clones are taken and failed attempts dropped under the registry
        // lock, so a count of one here means nobody holds this token.
        if registry
            .get(&self.ticket_id)
            .is_some_and(|token| Arc::strong_count(token) == 1)
        {
            registry.remove(&self.ticket_id);
        }
    }
}
