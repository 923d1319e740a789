//! Request and response bodies of the ticketing API.
//!
//! Issuance input is untrusted: fields are trimmed, truncated and stripped
//! of angle brackets, then checked against the allow-lists below before a
//! [`TicketDetails`] is built. Verification requests carry only a ticket
//! identifier and need no validation beyond presence.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use turnstile_core::{Ticket, TicketDetails, TicketId};

/// Ticket tiers on sale.
pub const ALLOWED_TICKET_TYPES: [&str; 3] = ["Regular $100", "VIP $200", "VVIP $300"];

/// Accepted payment methods.
pub const ALLOWED_PAYMENT_METHODS: [&str; 3] = ["Credit / Debit Card", "PayPal", "Mobile Money"];

const MAX_NAME_LEN: usize = 100;
const MAX_EMAIL_LEN: usize = 100;
const MAX_CHOICE_LEN: usize = 50;
const MIN_NAME_LEN: usize = 2;

/// Reasons an issuance request is rejected before reaching the lifecycle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// One of the four fields was absent or blank
    #[error("Missing required fields: name, email, ticketType, and paymentMethod are required")]
    MissingFields,

    /// Name shorter than two characters after sanitizing
    #[error("Name must be at least 2 characters long")]
    NameTooShort,

    /// Email not of the form `local@domain.tld`
    #[error("Invalid email address format")]
    InvalidEmail,

    /// Ticket type not in [`ALLOWED_TICKET_TYPES`]
    #[error("Invalid ticket type selected")]
    UnknownTicketType,

    /// Payment method not in [`ALLOWED_PAYMENT_METHODS`]
    #[error("Invalid payment method selected")]
    UnknownPaymentMethod,
}

/// Body of an issuance request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTicketRequest {
    /// Attendee name
    #[serde(default)]
    pub name: Option<String>,
    /// Attendee email
    #[serde(default)]
    pub email: Option<String>,
    /// Ticket tier
    #[serde(default)]
    pub ticket_type: Option<String>,
    /// Payment method label
    #[serde(default)]
    pub payment_method: Option<String>,
}

impl IssueTicketRequest {
    /// Creates a new `IssueTicketRequest` with every field present
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        ticket_type: impl Into<String>,
        payment_method: impl Into<String>,
    ) -> Self {
        Self {
            name: Some(name.into()),
            email: Some(email.into()),
            ticket_type: Some(ticket_type.into()),
            payment_method: Some(payment_method.into()),
        }
    }

    /// Sanitize and validate into purchaser details.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found, in field order.
    pub fn validate(&self) -> Result<TicketDetails, ValidationError> {
        let (Some(name), Some(email), Some(ticket_type), Some(payment_method)) = (
            present(self.name.as_deref()),
            present(self.email.as_deref()),
            present(self.ticket_type.as_deref()),
            present(self.payment_method.as_deref()),
        ) else {
            return Err(ValidationError::MissingFields);
        };

        let name = sanitize(name, MAX_NAME_LEN);
        let email = sanitize(email, MAX_EMAIL_LEN);
        let ticket_type = sanitize(ticket_type, MAX_CHOICE_LEN);
        let payment_method = sanitize(payment_method, MAX_CHOICE_LEN);

        if name.chars().count() < MIN_NAME_LEN {
            return Err(ValidationError::NameTooShort);
        }
        if !is_valid_email(&email) {
            return Err(ValidationError::InvalidEmail);
        }
        if !ALLOWED_TICKET_TYPES.contains(&ticket_type.as_str()) {
            return Err(ValidationError::UnknownTicketType);
        }
        if !ALLOWED_PAYMENT_METHODS.contains(&payment_method.as_str()) {
            return Err(ValidationError::UnknownPaymentMethod);
        }

        Ok(TicketDetails::new(name, email, ticket_type, payment_method))
    }
}

/// Body of a successful issuance response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueTicketResponse {
    /// Identifier of the new ticket
    pub ticket_id: TicketId,
    /// The ticket as stored
    pub ticket: Ticket,
    /// Link to encode in the ticket's QR code
    pub verification_url: String,
}

/// Body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Human-readable message
    pub error: String,
}

impl ErrorBody {
    /// Creates a new `ErrorBody`
    #[must_use]
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Trim, keep at most `max_len` characters, then drop `<` and `>`.
fn sanitize(input: &str, max_len: usize) -> String {
    input
        .trim()
        .chars()
        .take(max_len)
        .filter(|c| !matches!(c, '<' | '>'))
        .collect()
}

/// `local@domain.tld`: no whitespace, exactly one `@`, and a dot inside the domain.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)] // Test code

    use super::*;
    use proptest::prelude::*;

    fn valid() -> IssueTicketRequest {
        IssueTicketRequest::new("Alice", "a@x.com", "VIP $200", "PayPal")
    }

    #[test]
    fn test_valid_request_builds_details() {
        let details = valid().validate().unwrap();
        assert_eq!(details, TicketDetails::new("Alice", "a@x.com", "VIP $200", "PayPal"));
    }

    #[test]
    fn test_fields_are_sanitized() {
        let request = IssueTicketRequest::new("  <b>Bob</b>  ", " bob@example.org ", "VVIP $300", "Mobile Money");
        let details = request.validate().unwrap();

        assert_eq!(details.name, "bBob/b");
        assert_eq!(details.email, "bob@example.org");
    }

    #[test]
    fn test_missing_fields() {
        let mut request = valid();
        request.payment_method = None;
        assert_eq!(request.validate(), Err(ValidationError::MissingFields));

        let mut request = valid();
        request.name = Some(String::new());
        assert_eq!(request.validate(), Err(ValidationError::MissingFields));

        let request: IssueTicketRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.validate(), Err(ValidationError::MissingFields));
    }

    #[test]
    fn test_short_name() {
        let mut request = valid();
        request.name = Some("  A ".to_string());
        assert_eq!(request.validate(), Err(ValidationError::NameTooShort));
    }

    #[test]
    fn test_email_shapes() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.co"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("a@.com"));
        assert!(!is_valid_email("a@x."));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@b@x.com"));
        assert!(!is_valid_email("a b@x.com"));
    }

    #[test]
    fn test_allow_lists() {
        let mut request = valid();
        request.ticket_type = Some("Backstage $999".to_string());
        assert_eq!(request.validate(), Err(ValidationError::UnknownTicketType));

        let mut request = valid();
        request.payment_method = Some("Bitcoin".to_string());
        assert_eq!(request.validate(), Err(ValidationError::UnknownPaymentMethod));
    }

    #[test]
    fn test_request_reads_camel_case() {
        let request: IssueTicketRequest = serde_json::from_str(
            r#"{"name":"Alice","email":"a@x.com","ticketType":"VIP $200","paymentMethod":"PayPal"}"#,
        )
        .unwrap();
        assert_eq!(request, valid());
    }

    proptest! {
        #[test]
        fn prop_sanitize_bounds_length_and_strips_brackets(input in ".{0,300}", max in 1usize..120) {
            let out = sanitize(&input, max);
            prop_assert!(out.chars().count() <= max);
            prop_assert!(!out.contains('<') && !out.contains('>'));
        }
    }
}
