//! Ticket lifecycle manager.
//!
//! [`TicketLifecycle`] is the imperative shell around the pure transitions in
//! [`turnstile_core::lifecycle`]: it reads the clock, generates identifiers,
//! takes the per-ticket exclusion token and persists through the injected
//! [`TicketStore`].
//!
//! # Single redemption
//!
//! `redeem` holds the ticket's token from before it re-reads the ticket
//! until after the write, and the write itself is one atomic
//! [`TicketStore::update`]. Only one caller per identifier can be inside that
//! window, so the `issued → used` transition and its `redeemed` history
//! entry happen at most once. Callers that find the token taken get `busy`.
//!
//! # Example
//!
//! ```rust
//! use turnstile_core::{RedeemStatus, TicketDetails};
//! use turnstile_runtime::{InMemoryTicketStore, LifecycleEnvironment, TicketLifecycle};
//!
//! # async fn example() -> turnstile_core::Result<()> {
//! let lifecycle = TicketLifecycle::new(InMemoryTicketStore::new(), LifecycleEnvironment::production());
//!
//! let ticket = lifecycle
//!     .issue(TicketDetails::new("Alice", "a@x.com", "VIP $200", "PayPal"))
//!     .await?;
//!
//! let first = lifecycle.redeem(ticket.id()).await?;
//! assert!(first.redeemed);
//!
//! let second = lifecycle.redeem(ticket.id()).await?;
//! assert_eq!(second.status, RedeemStatus::Used);
//! # Ok(())
//! # }
//! ```

use crate::locks::TicketLocks;
use crate::metrics;
use crate::retry::{RetryPolicy, retry_with_backoff};
use std::sync::Arc;
use std::time::Instant;
use turnstile_core::environment::{Clock, RandomTicketIds, SystemClock, TicketIdGenerator};
use turnstile_core::lifecycle::{check_ticket, redeem_ticket};
use turnstile_core::payload::ticket_id_from_scan;
use turnstile_core::{
    CheckResult, LifecycleError, RedeemResult, RedeemStatus, Result, ScanCommand, ScanRequest,
    ScanResponse, Ticket, TicketDetails, TicketId, TicketStore,
};

/// Injected nondeterminism: time and identifier randomness.
#[derive(Clone)]
pub struct LifecycleEnvironment {
    /// Source of `issued_at`, `used_at` and scan timestamps
    pub clock: Arc<dyn Clock>,
    /// Source of candidate ticket identifiers
    pub ids: Arc<dyn TicketIdGenerator>,
}

impl LifecycleEnvironment {
    /// Creates a new `LifecycleEnvironment`
    #[must_use]
    pub const fn new(clock: Arc<dyn Clock>, ids: Arc<dyn TicketIdGenerator>) -> Self {
        Self { clock, ids }
    }

    /// System clock and random `SW-XXXXXXX` identifiers.
    #[must_use]
    pub fn production() -> Self {
        Self::new(Arc::new(SystemClock), Arc::new(RandomTicketIds))
    }
}

impl std::fmt::Debug for LifecycleEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleEnvironment").finish_non_exhaustive()
    }
}

/// Tunables for [`TicketLifecycle`].
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleConfig {
    /// Identifiers tried per issuance before giving up (at least 1 is used)
    pub max_id_attempts: usize,
    /// How long a redemption keeps trying for a contended token
    pub lock_retry: RetryPolicy,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            max_id_attempts: 5,
            lock_retry: RetryPolicy::fail_fast(),
        }
    }
}

/// Issues, checks and redeems tickets against a [`TicketStore`].
///
/// Cloning shares the store (if `S` shares on clone), the environment and
/// the exclusion registry.
#[derive(Debug, Clone)]
pub struct TicketLifecycle<S> {
    store: S,
    env: LifecycleEnvironment,
    config: LifecycleConfig,
    locks: TicketLocks,
}

impl<S: TicketStore> TicketLifecycle<S> {
    /// Create a manager with the default [`LifecycleConfig`].
    #[must_use]
    pub fn new(store: S, env: LifecycleEnvironment) -> Self {
        Self::with_config(store, env, LifecycleConfig::default())
    }

    /// Create a manager with explicit tunables.
    #[must_use]
    pub fn with_config(store: S, env: LifecycleEnvironment, config: LifecycleConfig) -> Self {
        Self {
            store,
            env,
            config,
            locks: TicketLocks::new(),
        }
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The per-ticket exclusion registry.
    #[must_use]
    pub const fn locks(&self) -> &TicketLocks {
        &self.locks
    }

    /// The active tunables.
    #[must_use]
    pub const fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    /// Issue a new ticket in `issued` with an empty scan history.
    ///
    /// # Errors
    ///
    /// - [`LifecycleError::MissingField`] if a detail is blank
    /// - [`LifecycleError::IdSpaceExhausted`] if every generated identifier
    ///   was already taken
    /// - [`LifecycleError::StoreUnavailable`] if the store fails
    pub async fn issue(&self, details: TicketDetails) -> Result<Ticket> {
        if let Some(field) = details.missing_field() {
            tracing::debug!(field, "Rejected issuance with missing field");
            return Err(LifecycleError::MissingField(field));
        }

        let attempts = self.config.max_id_attempts.max(1);
        for attempt in 1..=attempts {
            let ticket = Ticket::issue(self.env.ids.next_id(), details.clone(), self.env.clock.now());

            if self.store.insert_new(ticket.clone()).await? {
                tracing::info!(
                    ticket_id = %ticket.id(),
                    ticket_type = ticket.ticket_type(),
                    "Ticket issued"
                );
                metrics::record_ticket_issued(ticket.ticket_type());
                return Ok(ticket);
            }

            tracing::warn!(
                ticket_id = %ticket.id(),
                attempt,
                max_attempts = attempts,
                "Generated ticket ID already taken"
            );
            metrics::record_id_collision();
        }

        Err(LifecycleError::IdSpaceExhausted { attempts })
    }

    /// Look at a ticket and record a `checked` scan.
    ///
    /// Never changes `status` or `used_at`, and takes no exclusion token.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::StoreUnavailable`] if the store fails.
    pub async fn check(&self, ticket_id: &TicketId) -> Result<CheckResult> {
        let now = self.env.clock.now();
        let result = self
            .store
            .update(ticket_id, |ticket| {
                let status = check_ticket(ticket, now);
                CheckResult::found(status, ticket.clone())
            })
            .await?
            .unwrap_or_else(CheckResult::invalid);

        tracing::debug!(ticket_id = %ticket_id, outcome = result.status.as_str(), "Ticket checked");
        metrics::record_check(result.status);
        Ok(result)
    }

    /// Redeem a ticket: `issued → used`, at most once per identifier.
    ///
    /// # Outcomes
    ///
    /// - `invalid`: no such ticket; nothing recorded
    /// - `busy`: another redemption of this ticket holds its token; nothing
    ///   recorded
    /// - `valid` with `redeemed = true`: this call redeemed it
    /// - `used`: already redeemed; a `checked` scan is recorded
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::StoreUnavailable`] if the store fails. The
    /// token is released either way.
    pub async fn redeem(&self, ticket_id: &TicketId) -> Result<RedeemResult> {
        let started = Instant::now();
        let result = self.redeem_exclusive(ticket_id).await?;
        metrics::record_redemption(result.status, started.elapsed());
        Ok(result)
    }

    async fn redeem_exclusive(&self, ticket_id: &TicketId) -> Result<RedeemResult> {
        if self.store.get(ticket_id).await?.is_none() {
            tracing::debug!(ticket_id = %ticket_id, "Redemption of unknown ticket");
            return Ok(RedeemResult::invalid());
        }

        let Some(_token) =
            retry_with_backoff(&self.config.lock_retry, || self.locks.try_acquire(ticket_id)).await
        else {
            tracing::warn!(ticket_id = %ticket_id, "Redemption already in progress");
            return Ok(RedeemResult::busy());
        };

        // Read the clock under the token so `used_at` follows every earlier scan.
        let now = self.env.clock.now();
        let result = self
            .store
            .update(ticket_id, |ticket| redeem_ticket(ticket, now).into_result(ticket.clone()))
            .await?
            .unwrap_or_else(RedeemResult::invalid);

        match result.status {
            RedeemStatus::Valid => tracing::info!(ticket_id = %ticket_id, "Ticket redeemed"),
            status => tracing::info!(
                ticket_id = %ticket_id,
                outcome = status.as_str(),
                "Ticket not redeemed"
            ),
        }
        Ok(result)
    }

    /// Dispatch a gate request to [`check`](Self::check) or
    /// [`redeem`](Self::redeem).
    ///
    /// `ticket_id` may be a bare identifier in any case and spacing, or the
    /// scanned verification link.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::StoreUnavailable`] if the store fails.
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanResponse> {
        let ticket_id = ticket_id_from_scan(&request.ticket_id)
            .unwrap_or_else(|| TicketId::normalize(&request.ticket_id));

        match request.action {
            ScanCommand::Check => self.check(&ticket_id).await.map(ScanResponse::Check),
            ScanCommand::Redeem => self.redeem(&ticket_id).await.map(ScanResponse::Redeem),
        }
    }

    /// Look a ticket up without recording a scan.
    ///
    /// # Errors
    ///
    /// Returns [`LifecycleError::StoreUnavailable`] if the store fails.
    pub async fn ticket(&self, ticket_id: &TicketId) -> Result<Option<Ticket>> {
        Ok(self.store.get(ticket_id).await?)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use crate::memory::InMemoryTicketStore;
    use turnstile_core::{CheckStatus, TicketStatus};
    use turnstile_testing::{SequentialTicketIds, sequential_ticket_id, test_clock};

    fn lifecycle() -> TicketLifecycle<InMemoryTicketStore> {
        TicketLifecycle::new(
            InMemoryTicketStore::new(),
            LifecycleEnvironment::new(Arc::new(test_clock()), Arc::new(SequentialTicketIds::new())),
        )
    }

    fn details() -> TicketDetails {
        TicketDetails::new("Alice", "a@x.com", "VIP $200", "PayPal")
    }

    #[tokio::test]
    async fn test_issue_uses_generated_id_and_clock() {
        let lifecycle = lifecycle();
        let ticket = lifecycle.issue(details()).await.unwrap();

        assert_eq!(ticket.id(), &sequential_ticket_id(0));
        assert_eq!(ticket.issued_at(), test_clock().now());
        assert_eq!(ticket.status(), TicketStatus::Issued);
        assert!(ticket.scan_history().is_empty());
    }

    #[tokio::test]
    async fn test_redeem_holds_no_token_afterwards() {
        let lifecycle = lifecycle();
        let ticket = lifecycle.issue(details()).await.unwrap();

        let result = lifecycle.redeem(ticket.id()).await.unwrap();
        assert_eq!(result.status, RedeemStatus::Valid);
        assert!(lifecycle.locks().is_empty());
    }

    #[tokio::test]
    async fn test_redeem_while_token_held_is_busy() {
        let lifecycle = lifecycle();
        let ticket = lifecycle.issue(details()).await.unwrap();

        let held = lifecycle.locks().try_acquire(ticket.id()).unwrap();
        let result = lifecycle.redeem(ticket.id()).await.unwrap();
        assert_eq!(result, RedeemResult::busy());

        let stored = lifecycle.ticket(ticket.id()).await.unwrap().unwrap();
        assert_eq!(stored.status(), TicketStatus::Issued);
        assert!(stored.scan_history().is_empty());

        drop(held);
        assert!(lifecycle.redeem(ticket.id()).await.unwrap().redeemed);
    }

    #[tokio::test]
    async fn test_unknown_redeem_takes_no_token() {
        let lifecycle = lifecycle();
        let result = lifecycle.redeem(&TicketId::new("SW-ZZZZZZZ")).await.unwrap();

        assert_eq!(result, RedeemResult::invalid());
        assert!(lifecycle.locks().is_empty());
    }

    #[tokio::test]
    async fn test_check_does_not_contend_with_token() {
        let lifecycle = lifecycle();
        let ticket = lifecycle.issue(details()).await.unwrap();

        let _held = lifecycle.locks().try_acquire(ticket.id()).unwrap();
        let result = lifecycle.check(ticket.id()).await.unwrap();
        assert_eq!(result.status, CheckStatus::Valid);
    }

    #[tokio::test]
    async fn test_ticket_lookup_records_nothing() {
        let lifecycle = lifecycle();
        let ticket = lifecycle.issue(details()).await.unwrap();

        let seen = lifecycle.ticket(ticket.id()).await.unwrap().unwrap();
        assert!(seen.scan_history().is_empty());
        assert!(lifecycle.ticket(&TicketId::new("SW-ZZZZZZZ")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_zero_id_attempts_still_tries_once() {
        let lifecycle = TicketLifecycle::with_config(
            InMemoryTicketStore::new(),
            LifecycleEnvironment::new(Arc::new(test_clock()), Arc::new(SequentialTicketIds::new())),
            LifecycleConfig {
                max_id_attempts: 0,
                ..LifecycleConfig::default()
            },
        );

        assert!(lifecycle.issue(details()).await.is_ok());
    }
}
