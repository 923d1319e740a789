//! Ticket entity and identifier types.
//!
//! A [`Ticket`] is a single purchased admission right. It is created in the
//! [`TicketStatus::Issued`] state and moves to [`TicketStatus::Used`] at most
//! once. Every check or redemption attempt against it leaves a [`ScanEntry`]
//! in its scan history.
//!
//! The JSON shape (camelCase keys, lowercase status strings) matches what the
//! gate and purchase pages consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Prefix carried by every generated ticket identifier.
pub const TICKET_ID_PREFIX: &str = "SW-";

/// Number of base-36 characters following [`TICKET_ID_PREFIX`].
pub const TICKET_ID_SUFFIX_LEN: usize = 7;

/// Characters allowed in the identifier suffix, in base-36 digit order.
pub const TICKET_ID_ALPHABET: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

// ============================================================================
// Identifier
// ============================================================================

/// Error type for `TicketId` parsing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid ticket ID: {0}")]
pub struct ParseTicketIdError(String);

/// Identifier of an issued ticket, e.g. `SW-4K7Q0ZD`.
///
/// # Validation
///
/// - `FromStr::from_str()`: normalizes, then requires the canonical
///   `SW-XXXXXXX` form. Use it for operator input that must be well-formed.
/// - [`TicketId::normalize`]: trims and upper-cases only. This is what request
///   handlers apply before a lookup; an unknown but oddly-shaped identifier
///   simply resolves to "invalid".
/// - `new()` / `From`: no processing, for trusted values.
///
/// # Examples
///
/// ```
/// use turnstile_core::ticket::TicketId;
///
/// let id = TicketId::normalize("  sw-4k7q0zd ");
/// assert_eq!(id.as_str(), "SW-4K7Q0ZD");
/// assert!(id.is_canonical());
///
/// assert!("SW-12".parse::<TicketId>().is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(String);

impl TicketId {
    /// Wrap an identifier without any normalization.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Trim surrounding whitespace and upper-case the identifier.
    #[must_use]
    pub fn normalize(raw: &str) -> Self {
        Self(raw.trim().to_uppercase())
    }

    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert the `TicketId` into its inner `String`.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Whether the identifier has the canonical `SW-` + 7 `[0-9A-Z]` form.
    #[must_use]
    pub fn is_canonical(&self) -> bool {
        self.0.strip_prefix(TICKET_ID_PREFIX).is_some_and(|suffix| {
            suffix.len() == TICKET_ID_SUFFIX_LEN
                && suffix
                    .bytes()
                    .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
        })
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TicketId {
    type Err = ParseTicketIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = Self::normalize(s);
        if id.0.is_empty() {
            return Err(ParseTicketIdError("Ticket ID cannot be empty".to_string()));
        }
        if !id.is_canonical() {
            return Err(ParseTicketIdError(format!(
                "expected {TICKET_ID_PREFIX} followed by {TICKET_ID_SUFFIX_LEN} characters from [0-9A-Z], got {id}"
            )));
        }
        Ok(id)
    }
}

impl From<String> for TicketId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for TicketId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for TicketId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Status and scan history
// ============================================================================

/// Lifecycle state of a ticket. `Used` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketStatus {
    /// Purchased, not yet admitted.
    Issued,
    /// Redeemed at the gate.
    Used,
}

impl TicketStatus {
    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Issued => "issued",
            Self::Used => "used",
        }
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a scan did to the ticket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanAction {
    /// Status was looked at (including a redemption attempt on a used ticket).
    Checked,
    /// The ticket was flipped to `used` by this scan.
    Redeemed,
}

/// One entry of a ticket's append-only scan history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanEntry {
    /// When the scan happened
    pub scanned_at: DateTime<Utc>,
    /// What the scan did
    pub action: ScanAction,
}

// ============================================================================
// Ticket
// ============================================================================

/// Purchaser-supplied fields captured at issuance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketDetails {
    /// Attendee name
    pub name: String,
    /// Attendee email
    pub email: String,
    /// Ticket tier, e.g. `VIP $200`
    pub ticket_type: String,
    /// Payment method label, e.g. `PayPal`
    pub payment_method: String,
}

impl TicketDetails {
    /// Creates a new `TicketDetails`
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        ticket_type: impl Into<String>,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            ticket_type: ticket_type.into(),
            payment_method: payment_method.into(),
        }
    }

    /// First required field that is empty or whitespace-only, by wire name.
    #[must_use]
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("email", &self.email),
            ("ticketType", &self.ticket_type),
            ("paymentMethod", &self.payment_method),
        ]
        .into_iter()
        .find_map(|(field, value)| value.trim().is_empty().then_some(field))
    }
}

/// Error for a stored ticket whose status and `usedAt` disagree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Inconsistent ticket {ticket_id}: status {status} with usedAt {used_at:?}")]
pub struct InvalidTicketError {
    ticket_id: TicketId,
    status: TicketStatus,
    used_at: Option<DateTime<Utc>>,
}

/// An issued admission record.
///
/// Purchaser details and `issued_at` never change after issuance. `status`,
/// `used_at` and the scan history only change through the transitions in
/// [`crate::lifecycle`], which keep `used_at.is_some() == (status == Used)`.
/// Deserialization rejects records that break that rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "TicketRecord")]
pub struct Ticket {
    ticket_id: TicketId,
    #[serde(flatten)]
    details: TicketDetails,
    status: TicketStatus,
    issued_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    scan_history: Vec<ScanEntry>,
}

/// Unchecked wire form of a [`Ticket`].
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TicketRecord {
    ticket_id: TicketId,
    #[serde(flatten)]
    details: TicketDetails,
    status: TicketStatus,
    issued_at: DateTime<Utc>,
    #[serde(default)]
    used_at: Option<DateTime<Utc>>,
    #[serde(default)]
    scan_history: Vec<ScanEntry>,
}

impl TryFrom<TicketRecord> for Ticket {
    type Error = InvalidTicketError;

    fn try_from(record: TicketRecord) -> Result<Self, Self::Error> {
        if record.used_at.is_some() != matches!(record.status, TicketStatus::Used) {
            return Err(InvalidTicketError {
                ticket_id: record.ticket_id,
                status: record.status,
                used_at: record.used_at,
            });
        }
        Ok(Self {
            ticket_id: record.ticket_id,
            details: record.details,
            status: record.status,
            issued_at: record.issued_at,
            used_at: record.used_at,
            scan_history: record.scan_history,
        })
    }
}

impl Ticket {
    /// Create a freshly issued ticket with an empty scan history.
    #[must_use]
    pub const fn issue(ticket_id: TicketId, details: TicketDetails, issued_at: DateTime<Utc>) -> Self {
        Self {
            ticket_id,
            details,
            status: TicketStatus::Issued,
            issued_at,
            used_at: None,
            scan_history: Vec::new(),
        }
    }

    /// Ticket identifier
    #[must_use]
    pub const fn id(&self) -> &TicketId {
        &self.ticket_id
    }

    /// Purchaser details
    #[must_use]
    pub const fn details(&self) -> &TicketDetails {
        &self.details
    }

    /// Attendee name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.details.name
    }

    /// Attendee email
    #[must_use]
    pub fn email(&self) -> &str {
        &self.details.email
    }

    /// Ticket tier
    #[must_use]
    pub fn ticket_type(&self) -> &str {
        &self.details.ticket_type
    }

    /// Payment method label
    #[must_use]
    pub fn payment_method(&self) -> &str {
        &self.details.payment_method
    }

    /// Current lifecycle state
    #[must_use]
    pub const fn status(&self) -> TicketStatus {
        self.status
    }

    /// Whether the ticket has been redeemed
    #[must_use]
    pub const fn is_used(&self) -> bool {
        matches!(self.status, TicketStatus::Used)
    }

    /// Issuance time
    #[must_use]
    pub const fn issued_at(&self) -> DateTime<Utc> {
        self.issued_at
    }

    /// Time of the first successful redemption
    #[must_use]
    pub const fn used_at(&self) -> Option<DateTime<Utc>> {
        self.used_at
    }

    /// Scan history, oldest first
    #[must_use]
    pub fn scan_history(&self) -> &[ScanEntry] {
        &self.scan_history
    }

    /// Number of history entries with the given action.
    #[must_use]
    pub fn scans_with(&self, action: ScanAction) -> usize {
        self.scan_history
            .iter()
            .filter(|entry| entry.action == action)
            .count()
    }

    pub(crate) fn record_scan(&mut self, scanned_at: DateTime<Utc>, action: ScanAction) {
        self.scan_history.push(ScanEntry { scanned_at, action });
    }

    pub(crate) fn mark_used(&mut self, used_at: DateTime<Utc>) {
        self.status = TicketStatus::Used;
        self.used_at = Some(used_at);
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;

    fn alice() -> TicketDetails {
        TicketDetails::new("Alice", "a@x.com", "VIP $200", "PayPal")
    }

    #[test]
    fn test_normalize_trims_and_uppercases() {
        let id = TicketId::normalize("\t sw-ab12cd3 \n");
        assert_eq!(id.as_str(), "SW-AB12CD3");
        assert!(id.is_canonical());
    }

    #[test]
    fn test_parse_rejects_malformed_ids() {
        assert!("".parse::<TicketId>().is_err());
        assert!("   ".parse::<TicketId>().is_err());
        assert!("SW-ABC".parse::<TicketId>().is_err());
        assert!("SW-ABCDEFGH".parse::<TicketId>().is_err());
        assert!("XX-ABCDEFG".parse::<TicketId>().is_err());
        assert!("SW-ABC_EFG".parse::<TicketId>().is_err());
    }

    #[test]
    fn test_parse_accepts_lowercase_input() {
        let id: TicketId = " sw-0000zzz".parse().unwrap();
        assert_eq!(id, TicketId::new("SW-0000ZZZ"));
    }

    #[test]
    fn test_missing_field_reports_first_blank() {
        assert_eq!(alice().missing_field(), None);

        let mut details = alice();
        details.email = "  ".to_string();
        assert_eq!(details.missing_field(), Some("email"));

        details.name = String::new();
        assert_eq!(details.missing_field(), Some("name"));
    }

    #[test]
    fn test_issued_ticket_shape() {
        let now = Utc::now();
        let ticket = Ticket::issue(TicketId::new("SW-AAAAAAA"), alice(), now);

        assert_eq!(ticket.status(), TicketStatus::Issued);
        assert_eq!(ticket.issued_at(), now);
        assert!(ticket.used_at().is_none());
        assert!(ticket.scan_history().is_empty());
        assert_eq!(ticket.ticket_type(), "VIP $200");
    }

    #[test]
    fn test_ticket_json_uses_camel_case_and_omits_used_at() {
        let ticket = Ticket::issue(TicketId::new("SW-AAAAAAA"), alice(), Utc::now());
        let json = serde_json::to_value(&ticket).unwrap();

        assert_eq!(json["ticketId"], "SW-AAAAAAA");
        assert_eq!(json["ticketType"], "VIP $200");
        assert_eq!(json["paymentMethod"], "PayPal");
        assert_eq!(json["status"], "issued");
        assert!(json.get("usedAt").is_none());
        assert_eq!(json["scanHistory"], serde_json::json!([]));

        let back: Ticket = serde_json::from_value(json).unwrap();
        assert_eq!(back, ticket);
    }

    #[test]
    fn test_deserialize_rejects_status_used_at_mismatch() {
        let ticket = Ticket::issue(TicketId::new("SW-AAAAAAA"), alice(), Utc::now());
        let mut json = serde_json::to_value(&ticket).unwrap();

        json["status"] = serde_json::json!("used");
        let err = serde_json::from_value::<Ticket>(json.clone()).unwrap_err();
        assert!(err.to_string().contains("Inconsistent ticket SW-AAAAAAA"));

        json["status"] = serde_json::json!("issued");
        json["usedAt"] = serde_json::json!("2025-01-01T00:00:00Z");
        assert!(serde_json::from_value::<Ticket>(json.clone()).is_err());

        json["status"] = serde_json::json!("used");
        let used: Ticket = serde_json::from_value(json).unwrap();
        assert!(used.is_used());
        assert!(used.used_at().is_some());
    }
}
