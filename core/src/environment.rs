//! Environment module - Dependency injection traits
//!
//! Time and identifier randomness are the two nondeterministic inputs of the
//! ticket lifecycle. Both are abstracted behind traits and injected, so tests
//! can pin them (see the `turnstile-testing` crate).

use crate::ticket::{TICKET_ID_ALPHABET, TICKET_ID_PREFIX, TICKET_ID_SUFFIX_LEN, TicketId};
use chrono::{DateTime, Utc};
use rand::Rng;

/// Clock trait - abstracts time operations for testability
///
/// # Examples
///
/// ```
/// use turnstile_core::environment::{Clock, SystemClock};
///
/// let clock = SystemClock;
/// assert!(clock.now() <= chrono::Utc::now());
/// ```
pub trait Clock: Send + Sync {
    /// Get the current time
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Source of candidate ticket identifiers.
///
/// Generators are not required to produce unique values; the lifecycle
/// manager detects collisions against the store and asks again.
pub trait TicketIdGenerator: Send + Sync {
    /// Produce the next candidate identifier.
    fn next_id(&self) -> TicketId;
}

/// Random `SW-XXXXXXX` identifiers drawn from the thread-local RNG.
///
/// Each suffix character is uniform over `[0-9A-Z]`, giving 36^7
/// (about 7.8 × 10^10) distinct identifiers.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTicketIds;

impl TicketIdGenerator for RandomTicketIds {
    fn next_id(&self) -> TicketId {
        let mut rng = rand::thread_rng();
        let suffix: String = (0..TICKET_ID_SUFFIX_LEN)
            .map(|_| char::from(TICKET_ID_ALPHABET[rng.gen_range(0..TICKET_ID_ALPHABET.len())]))
            .collect();
        TicketId::new(format!("{TICKET_ID_PREFIX}{suffix}"))
    }
}
