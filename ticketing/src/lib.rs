//! Event Ticketing - issue tickets, hand out QR links, admit at the gate
//!
//! This crate is the application layer over the Turnstile lifecycle:
//!
//! - **Issuance**: validated purchaser details become an `issued` ticket with
//!   an `SW-XXXXXXX` identifier and a QR verification link
//! - **Verification**: gate scans check or redeem a ticket; each ticket is
//!   admitted at most once, however many scanners race on it
//! - **Configuration**: environment variables, `.env` supported
//! - **Observability**: `tracing` logs and Prometheus metrics
//!
//! # Architecture
//!
//! ```text
//!  issue_json / scan_json        (HTTP layer not included)
//!           │
//!           ▼
//!   ┌───────────────┐   validate   ┌──────────────────┐
//!   │ TicketingApp  │─────────────►│ requests         │
//!   └───────────────┘              └──────────────────┘
//!           │
//!           ▼
//!   ┌───────────────┐   token      ┌──────────────────┐
//!   │TicketLifecycle│─────────────►│ TicketLocks      │
//!   └───────────────┘              └──────────────────┘
//!           │ update (atomic)
//!           ▼
//!   ┌───────────────────┐
//!   │InMemoryTicketStore│
//!   └───────────────────┘
//! ```

pub mod app;
pub mod config;
pub mod requests;

pub use app::{AppError, Operation, TicketingApp};
pub use config::Config;
pub use requests::{IssueTicketRequest, IssueTicketResponse, ValidationError};
