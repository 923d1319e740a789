//! # Turnstile Core
//!
//! Types and rules for issuing and redeeming event tickets.
//!
//! A purchaser receives a ticket with an `SW-XXXXXXX` identifier and a QR
//! link; a gate operator scans it to check it or to redeem it. Redemption
//! moves the ticket `issued → used` exactly once.
//!
//! ## Core Concepts
//!
//! - **Ticket**: one admission right with an append-only scan history
//! - **Transition**: pure functions `(Ticket, now) → (Ticket', outcome)` in
//!   [`lifecycle`]
//! - **Store**: injected keyed storage, [`store::TicketStore`]
//! - **Environment**: injected [`environment::Clock`] and
//!   [`environment::TicketIdGenerator`]
//!
//! ## Architecture Principles
//!
//! - Functional Core, Imperative Shell: this crate decides, the runtime crate
//!   performs I/O and locking
//! - Ordinary outcomes (`invalid`, `used`, `busy`) are values, not errors
//! - Dependency Injection via Environment
//!
//! ## Example
//!
//! ```
//! use turnstile_core::{
//!     lifecycle::{redeem_ticket, Redemption},
//!     ticket::{Ticket, TicketDetails, TicketId, TicketStatus},
//!     Utc,
//! };
//!
//! let mut ticket = Ticket::issue(
//!     TicketId::new("SW-4K7Q0ZD"),
//!     TicketDetails::new("Alice", "a@x.com", "VIP $200", "PayPal"),
//!     Utc::now(),
//! );
//!
//! assert_eq!(redeem_ticket(&mut ticket, Utc::now()), Redemption::Redeemed);
//! assert_eq!(ticket.status(), TicketStatus::Used);
//! assert_eq!(redeem_ticket(&mut ticket, Utc::now()), Redemption::AlreadyUsed);
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};

pub mod environment;
pub mod error;
pub mod lifecycle;
pub mod payload;
pub mod store;
pub mod ticket;

pub use environment::{Clock, RandomTicketIds, SystemClock, TicketIdGenerator};
pub use error::{LifecycleError, Result};
pub use lifecycle::{
    CheckResult, CheckStatus, RedeemResult, RedeemStatus, Redemption, ScanCommand, ScanRequest,
    ScanResponse,
};
pub use store::{StoreError, StoreResult, TicketStore};
pub use ticket::{
    InvalidTicketError, ParseTicketIdError, ScanAction, ScanEntry, Ticket, TicketDetails, TicketId,
    TicketStatus,
};
