//! # Turnstile Runtime
//!
//! Runtime for the Turnstile ticket lifecycle.
//!
//! This crate wires the pure transitions of `turnstile-core` to a store, a
//! clock and a per-ticket exclusion registry.
//!
//! ## Core Components
//!
//! - **`TicketLifecycle`**: issues, checks, redeems and dispatches gate scans
//! - **`InMemoryTicketStore`**: process-local `TicketStore`
//! - **`TicketLocks`**: per-ticket exclusion tokens with scoped release
//! - **`RetryPolicy`**: optional backoff for contended redemptions
//!
//! ## Example
//!
//! ```ignore
//! use turnstile_runtime::{InMemoryTicketStore, LifecycleEnvironment, TicketLifecycle};
//!
//! let lifecycle = TicketLifecycle::new(InMemoryTicketStore::new(), LifecycleEnvironment::production());
//!
//! let ticket = lifecycle.issue(details).await?;
//! let result = lifecycle.redeem(ticket.id()).await?;
//! ```

/// Ticket lifecycle manager
pub mod lifecycle;

/// Per-ticket exclusion tokens
pub mod locks;

/// In-memory ticket store
pub mod memory;

/// Prometheus metrics for observability
pub mod metrics;

/// Retry logic with exponential backoff
pub mod retry;

pub use lifecycle::{LifecycleConfig, LifecycleEnvironment, TicketLifecycle};
pub use locks::{TicketLockGuard, TicketLocks};
pub use memory::InMemoryTicketStore;
pub use retry::RetryPolicy;
