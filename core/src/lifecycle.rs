//! Ticket state machine and scan outcomes.
//!
//! The functions here are pure: they receive a ticket snapshot and the
//! current time, mutate the snapshot, and report what happened. They never
//! read a clock, touch a store or take a lock. The runtime's
//! `TicketLifecycle` supplies the timestamp, holds the per-ticket exclusion
//! token and persists the result.
//!
//! ```text
//!            check / redeem (used)            check
//!               ┌────────┐                  ┌────────┐
//!               ▼        │                  ▼        │
//!          ┌─────────┐   │    redeem   ┌─────────┐   │
//!  issue → │ issued  │───┘────────────►│  used   │───┘
//!          └─────────┘                 └─────────┘
//! ```
//!
//! Every arrow appends exactly one scan-history entry. Only the
//! `issued → used` arrow appends `redeemed`.

use crate::ticket::{ScanAction, Ticket, TicketStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Transitions
// ============================================================================

/// Result of applying a redemption to an existing ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Redemption {
    /// The ticket moved `issued → used` during this call.
    Redeemed,
    /// The ticket was already `used`; nothing but history changed.
    AlreadyUsed,
}

impl Redemption {
    /// Build the handler-facing result for this redemption.
    #[must_use]
    pub fn into_result(self, ticket: Ticket) -> RedeemResult {
        match self {
            Self::Redeemed => RedeemResult {
                status: RedeemStatus::Valid,
                ticket: Some(ticket),
                redeemed: true,
            },
            Self::AlreadyUsed => RedeemResult {
                status: RedeemStatus::Used,
                ticket: Some(ticket),
                redeemed: false,
            },
        }
    }
}

/// Record a check. Never changes `status` or `used_at`.
pub fn check_ticket(ticket: &mut Ticket, at: DateTime<Utc>) -> CheckStatus {
    ticket.record_scan(at, ScanAction::Checked);
    match ticket.status() {
        TicketStatus::Issued => CheckStatus::Valid,
        TicketStatus::Used => CheckStatus::Used,
    }
}

/// Apply a redemption attempt.
///
/// Callers must hold the ticket's exclusion token and pass the freshly
/// re-read ticket: the decision is only as good as the snapshot it sees.
pub fn redeem_ticket(ticket: &mut Ticket, at: DateTime<Utc>) -> Redemption {
    match ticket.status() {
        TicketStatus::Used => {
            ticket.record_scan(at, ScanAction::Checked);
            Redemption::AlreadyUsed
        }
        TicketStatus::Issued => {
            ticket.mark_used(at);
            ticket.record_scan(at, ScanAction::Redeemed);
            Redemption::Redeemed
        }
    }
}

// ============================================================================
// Handler-facing outcomes
// ============================================================================

/// Outcome of a check.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    /// No ticket with that identifier
    Invalid,
    /// Ticket exists and is still `issued`
    Valid,
    /// Ticket exists and was already redeemed
    Used,
}

impl CheckStatus {
    /// Wire name of the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Valid => "valid",
            Self::Used => "used",
        }
    }
}

/// Outcome of a redemption.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedeemStatus {
    /// No ticket with that identifier
    Invalid,
    /// Ticket was `issued` and has now been redeemed by this call
    Valid,
    /// Ticket had already been redeemed
    Used,
    /// Another redemption of the same ticket is in flight; retry later
    Busy,
}

impl RedeemStatus {
    /// Wire name of the outcome.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Invalid => "invalid",
            Self::Valid => "valid",
            Self::Used => "used",
            Self::Busy => "busy",
        }
    }
}

/// `{status, ticket}` returned by a check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Outcome
    pub status: CheckStatus,
    /// Ticket after the check, `None` when invalid
    pub ticket: Option<Ticket>,
}

impl CheckResult {
    /// Result for an unknown identifier.
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            status: CheckStatus::Invalid,
            ticket: None,
        }
    }

    /// Result for an existing ticket.
    #[must_use]
    pub const fn found(status: CheckStatus, ticket: Ticket) -> Self {
        Self {
            status,
            ticket: Some(ticket),
        }
    }
}

/// `{status, ticket, redeemed}` returned by a redemption.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedeemResult {
    /// Outcome
    pub status: RedeemStatus,
    /// Ticket after the attempt, `None` when invalid or busy
    pub ticket: Option<Ticket>,
    /// Whether this call performed the `issued → used` transition
    #[serde(default)]
    pub redeemed: bool,
}

impl RedeemResult {
    /// Result for an unknown identifier.
    #[must_use]
    pub const fn invalid() -> Self {
        Self {
            status: RedeemStatus::Invalid,
            ticket: None,
            redeemed: false,
        }
    }

    /// Result when the exclusion token could not be acquired.
    #[must_use]
    pub const fn busy() -> Self {
        Self {
            status: RedeemStatus::Busy,
            ticket: None,
            redeemed: false,
        }
    }
}

/// What a gate operator asked for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanCommand {
    /// Look at the ticket without redeeming it
    Check,
    /// Admit the ticket (the gate's default action)
    #[default]
    Redeem,
}

/// `{ticketId, action}` as received from the gate.
///
/// `ticket_id` is the raw operator input; it is normalized before lookup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRequest {
    /// Raw identifier as typed or decoded from the QR code; absent or null
    /// reads as empty
    #[serde(default, deserialize_with = "null_as_empty")]
    pub ticket_id: String,
    /// Requested action, defaults to redeem
    #[serde(default)]
    pub action: ScanCommand,
}

impl ScanRequest {
    /// Creates a new `ScanRequest`
    #[must_use]
    pub fn new(ticket_id: impl Into<String>, action: ScanCommand) -> Self {
        Self {
            ticket_id: ticket_id.into(),
            action,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Response to a [`ScanRequest`]; serializes as the inner result.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScanResponse {
    /// Answer to a check
    Check(CheckResult),
    /// Answer to a redemption
    Redeem(RedeemResult),
}

impl ScanResponse {
    /// Wire status string of the response.
    #[must_use]
    pub const fn status(&self) -> &'static str {
        match self {
            Self::Check(result) => result.status.as_str(),
            Self::Redeem(result) => result.status.as_str(),
        }
    }

    /// Ticket carried by the response, if any.
    #[must_use]
    pub const fn ticket(&self) -> Option<&Ticket> {
        match self {
            Self::Check(result) => result.ticket.as_ref(),
            Self::Redeem(result) => result.ticket.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use crate::ticket::{TicketDetails, TicketId};
    use chrono::Duration;

    fn issued(at: DateTime<Utc>) -> Ticket {
        Ticket::issue(
            TicketId::new("SW-TEST001"),
            TicketDetails::new("Alice", "a@x.com", "VIP $200", "PayPal"),
            at,
        )
    }

    #[test]
    fn test_check_keeps_status_and_appends_history() {
        let t0 = Utc::now();
        let mut ticket = issued(t0);

        for i in 1..=3 {
            let status = check_ticket(&mut ticket, t0 + Duration::seconds(i));
            assert_eq!(status, CheckStatus::Valid);
        }

        assert_eq!(ticket.status(), TicketStatus::Issued);
        assert!(ticket.used_at().is_none());
        assert_eq!(ticket.scans_with(ScanAction::Checked), 3);
    }

    #[test]
    fn test_redeem_flips_once() {
        let t0 = Utc::now();
        let t1 = t0 + Duration::seconds(5);
        let t2 = t0 + Duration::seconds(9);
        let mut ticket = issued(t0);

        assert_eq!(redeem_ticket(&mut ticket, t1), Redemption::Redeemed);
        assert_eq!(ticket.status(), TicketStatus::Used);
        assert_eq!(ticket.used_at(), Some(t1));

        assert_eq!(redeem_ticket(&mut ticket, t2), Redemption::AlreadyUsed);
        assert_eq!(ticket.used_at(), Some(t1));
        assert_eq!(ticket.scans_with(ScanAction::Redeemed), 1);
        assert_eq!(ticket.scans_with(ScanAction::Checked), 1);
        assert_eq!(ticket.scan_history().last().unwrap().scanned_at, t2);
    }

    #[test]
    fn test_check_after_redeem_reports_used() {
        let t0 = Utc::now();
        let mut ticket = issued(t0);
        redeem_ticket(&mut ticket, t0);

        assert_eq!(check_ticket(&mut ticket, t0), CheckStatus::Used);
        assert_eq!(ticket.scan_history().len(), 2);
    }

    #[test]
    fn test_redemption_into_result() {
        let ticket = issued(Utc::now());

        let result = Redemption::Redeemed.into_result(ticket.clone());
        assert_eq!(result.status, RedeemStatus::Valid);
        assert!(result.redeemed);

        let result = Redemption::AlreadyUsed.into_result(ticket);
        assert_eq!(result.status, RedeemStatus::Used);
        assert!(!result.redeemed);
    }

    #[test]
    fn test_scan_request_defaults_to_redeem() {
        let request: ScanRequest = serde_json::from_str(r#"{"ticketId":"sw-abc1234"}"#).unwrap();
        assert_eq!(request.action, ScanCommand::Redeem);

        let request: ScanRequest =
            serde_json::from_str(r#"{"ticketId":"SW-ABC1234","action":"check"}"#).unwrap();
        assert_eq!(request.action, ScanCommand::Check);
    }

    #[test]
    fn test_scan_request_without_ticket_id_reads_empty() {
        let request: ScanRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.ticket_id, "");

        let request: ScanRequest =
            serde_json::from_str(r#"{"ticketId":null,"action":"check"}"#).unwrap();
        assert_eq!(request.ticket_id, "");
        assert_eq!(request.action, ScanCommand::Check);
    }

    #[test]
    fn test_scan_response_serializes_flat() {
        let json = serde_json::to_value(ScanResponse::Redeem(RedeemResult::busy())).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "busy", "ticket": null, "redeemed": false})
        );

        let json = serde_json::to_value(ScanResponse::Check(CheckResult::invalid())).unwrap();
        assert_eq!(json, serde_json::json!({"status": "invalid", "ticket": null}));
    }
}
