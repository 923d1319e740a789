//! # Turnstile Testing
//!
//! Testing utilities for the Turnstile ticket lifecycle.
//!
//! This crate provides:
//! - Deterministic clocks (`FixedClock`, `SteppingClock`)
//! - Predictable identifier generators (`SequentialTicketIds`, `ScriptedTicketIds`)
//! - A store that always fails (`UnavailableTicketStore`)
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use turnstile_runtime::{InMemoryTicketStore, LifecycleEnvironment, TicketLifecycle};
//! use turnstile_testing::{test_clock, SequentialTicketIds};
//!
//! #[tokio::test]
//! async fn test_issue() {
//!     let env = LifecycleEnvironment::new(
//!         Arc::new(test_clock()),
//!         Arc::new(SequentialTicketIds::new()),
//!     );
//!     let lifecycle = TicketLifecycle::new(InMemoryTicketStore::new(), env);
//!     // ...
//! }
//! ```

use chrono::{DateTime, Duration, Utc};
use turnstile_core::environment::{Clock, TicketIdGenerator};
use turnstile_core::store::{StoreError, StoreResult, TicketStore};
use turnstile_core::ticket::{
    TICKET_ID_ALPHABET, TICKET_ID_PREFIX, TICKET_ID_SUFFIX_LEN, Ticket, TicketId,
};

/// Mock implementations of Environment traits and the ticket store.
pub mod mocks {
    use super::{
        Clock, DateTime, Duration, StoreError, StoreResult, TICKET_ID_ALPHABET, TICKET_ID_PREFIX,
        TICKET_ID_SUFFIX_LEN, Ticket, TicketId, TicketIdGenerator, TicketStore, Utc,
    };
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Mutex, PoisonError};

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use turnstile_testing::mocks::FixedClock;
    /// use turnstile_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that advances by a fixed step on every reading.
    ///
    /// Lets tests tell apart the timestamps of consecutive operations.
    ///
    /// ```
    /// use turnstile_testing::mocks::SteppingClock;
    /// use turnstile_core::environment::Clock;
    /// use chrono::{Duration, Utc};
    ///
    /// let start = Utc::now();
    /// let clock = SteppingClock::new(start, Duration::seconds(1));
    /// assert_eq!(clock.now(), start);
    /// assert_eq!(clock.now(), start + Duration::seconds(1));
    /// ```
    #[derive(Debug)]
    pub struct SteppingClock {
        start: DateTime<Utc>,
        step: Duration,
        ticks: AtomicU64,
    }

    impl SteppingClock {
        /// Create a clock whose first reading is `start`
        #[must_use]
        pub const fn new(start: DateTime<Utc>, step: Duration) -> Self {
            Self {
                start,
                step,
                ticks: AtomicU64::new(0),
            }
        }
    }

    impl Clock for SteppingClock {
        fn now(&self) -> DateTime<Utc> {
            let tick = self.ticks.fetch_add(1, Ordering::SeqCst);
            let tick = i32::try_from(tick).unwrap_or(i32::MAX);
            self.start + self.step * tick
        }
    }

    /// Canonical identifier for a sequence number: `SW-0000000`, `SW-0000001`, …
    ///
    /// Numbers beyond 36^7 - 1 wrap around.
    #[must_use]
    pub fn sequential_ticket_id(n: u64) -> TicketId {
        let mut digits = [b'0'; TICKET_ID_SUFFIX_LEN];
        let mut rest = n;
        for slot in digits.iter_mut().rev() {
            // rest % 36 < 36, the cast cannot truncate
            #[allow(clippy::cast_possible_truncation)]
            let digit = (rest % 36) as usize;
            *slot = TICKET_ID_ALPHABET[digit];
            rest /= 36;
        }
        let suffix: String = digits.iter().copied().map(char::from).collect();
        TicketId::new(format!("{TICKET_ID_PREFIX}{suffix}"))
    }

    /// Generator yielding [`sequential_ticket_id`] values from 0 upward.
    #[derive(Debug, Default)]
    pub struct SequentialTicketIds {
        next: AtomicU64,
    }

    impl SequentialTicketIds {
        /// Start at `SW-0000000`
        #[must_use]
        pub const fn new() -> Self {
            Self::starting_at(0)
        }

        /// Start at the given sequence number
        #[must_use]
        pub const fn starting_at(n: u64) -> Self {
            Self {
                next: AtomicU64::new(n),
            }
        }
    }

    impl TicketIdGenerator for SequentialTicketIds {
        fn next_id(&self) -> TicketId {
            sequential_ticket_id(self.next.fetch_add(1, Ordering::SeqCst))
        }
    }

    /// Generator replaying a fixed list; the last entry repeats forever.
    ///
    /// Used to force identifier collisions.
    #[derive(Debug)]
    pub struct ScriptedTicketIds {
        script: Mutex<VecDeque<TicketId>>,
        last: TicketId,
    }

    impl ScriptedTicketIds {
        /// Create a generator replaying `ids` in order.
        ///
        /// An empty script yields `SW-0000000` forever.
        #[must_use]
        pub fn new(ids: impl IntoIterator<Item = TicketId>) -> Self {
            let script: VecDeque<TicketId> = ids.into_iter().collect();
            let last = script
                .back()
                .cloned()
                .unwrap_or_else(|| sequential_ticket_id(0));
            Self {
                script: Mutex::new(script),
                last,
            }
        }
    }

    impl TicketIdGenerator for ScriptedTicketIds {
        fn next_id(&self) -> TicketId {
            self.script
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| self.last.clone())
        }
    }

    /// Store whose every operation fails with [`StoreError::Unavailable`].
    #[derive(Debug, Clone, Default)]
    pub struct UnavailableTicketStore;

    impl UnavailableTicketStore {
        fn outage<T>() -> StoreResult<T> {
            Err(StoreError::Unavailable("simulated outage".to_string()))
        }
    }

    impl TicketStore for UnavailableTicketStore {
        async fn put(&self, _ticket: Ticket) -> StoreResult<()> {
            Self::outage()
        }

        async fn get(&self, _ticket_id: &TicketId) -> StoreResult<Option<Ticket>> {
            Self::outage()
        }

        async fn insert_new(&self, _ticket: Ticket) -> StoreResult<bool> {
            Self::outage()
        }

        async fn update<F, T>(&self, _ticket_id: &TicketId, _f: F) -> StoreResult<Option<T>>
        where
            F: FnOnce(&mut Ticket) -> T + Send,
            T: Send,
        {
            Self::outage()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }
}

// Re-export commonly used items
pub use mocks::{
    FixedClock, ScriptedTicketIds, SequentialTicketIds, SteppingClock, UnavailableTicketStore,
    sequential_ticket_id, test_clock,
};
