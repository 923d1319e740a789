//! In-memory ticket store.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;
use turnstile_core::store::{StoreResult, TicketStore};
use turnstile_core::{Ticket, TicketId};

/// Process-local [`TicketStore`] over a shared map.
///
/// Cloning shares the underlying map. Writes take the map's write lock, which
/// makes `insert_new` and `update` atomic. Nothing survives a restart.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTicketStore {
    tickets: Arc<RwLock<HashMap<TicketId, Ticket>>>,
}

impl InMemoryTicketStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tickets.
    pub async fn len(&self) -> usize {
        self.tickets.read().await.len()
    }

    /// Whether the store holds no tickets.
    pub async fn is_empty(&self) -> bool {
        self.tickets.read().await.is_empty()
    }

    /// Copy of every stored ticket, ordered by identifier.
    pub async fn snapshot(&self) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self.tickets.read().await.values().cloned().collect();
        tickets.sort_by(|a, b| a.id().cmp(b.id()));
        tickets
    }
}

impl TicketStore for InMemoryTicketStore {
    async fn put(&self, ticket: Ticket) -> StoreResult<()> {
        self.tickets
            .write()
            .await
            .insert(ticket.id().clone(), ticket);
        Ok(())
    }

    async fn get(&self, ticket_id: &TicketId) -> StoreResult<Option<Ticket>> {
        Ok(self.tickets.read().await.get(ticket_id).cloned())
    }

    async fn insert_new(&self, ticket: Ticket) -> StoreResult<bool> {
        match self.tickets.write().await.entry(ticket.id().clone()) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(slot) => {
                slot.insert(ticket);
                Ok(true)
            }
        }
    }

    async fn update<F, T>(&self, ticket_id: &TicketId, f: F) -> StoreResult<Option<T>>
    where
        F: FnOnce(&mut Ticket) -> T + Send,
        T: Send,
    {
        Ok(self.tickets.write().await.get_mut(ticket_id).map(f))
    }
}
