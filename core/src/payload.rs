//! QR payloads.
//!
//! A ticket's QR code encodes a verification link, `/verify?ticketId=SW-…`,
//! optionally prefixed with the public origin. Gate scanners may hand back
//! that path, the absolute URL, or a bare identifier typed by an operator;
//! [`ticket_id_from_scan`] accepts all three.

use crate::ticket::TicketId;

/// Path of the gate verification page.
pub const VERIFY_PATH: &str = "/verify";

/// Query parameter carrying the ticket identifier.
pub const TICKET_ID_PARAM: &str = "ticketId";

/// Relative verification link for a ticket.
///
/// ```
/// use turnstile_core::{payload::verification_path, ticket::TicketId};
///
/// let path = verification_path(&TicketId::new("SW-4K7Q0ZD"));
/// assert_eq!(path, "/verify?ticketId=SW-4K7Q0ZD");
/// ```
#[must_use]
pub fn verification_path(ticket_id: &TicketId) -> String {
    format!(
        "{VERIFY_PATH}?{TICKET_ID_PARAM}={}",
        urlencoding::encode(ticket_id.as_str())
    )
}

/// Absolute verification link, e.g. for the QR code itself.
#[must_use]
pub fn verification_url(base_url: &str, ticket_id: &TicketId) -> String {
    format!(
        "{}{}",
        base_url.trim_end_matches('/'),
        verification_path(ticket_id)
    )
}

/// Extract a normalized ticket identifier from scanned or typed text.
///
/// Returns `None` for blank input, and for links that carry no non-empty
/// `ticketId` parameter.
#[must_use]
pub fn ticket_id_from_scan(scanned: &str) -> Option<TicketId> {
    let text = scanned.trim();
    if text.is_empty() {
        return None;
    }

    if !(text.starts_with('/') || text.contains("://")) {
        return Some(TicketId::normalize(text));
    }

    let (_, query) = text.split_once('?')?;
    let query = query.split_once('#').map_or(query, |(query, _fragment)| query);

    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == TICKET_ID_PARAM)
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|value| TicketId::normalize(&value))
        .filter(|id| !id.as_str().is_empty())
}
