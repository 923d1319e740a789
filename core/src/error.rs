//! Error types for lifecycle operations.
//!
//! Only genuine failures live here. An unknown ticket, an already-used ticket
//! and a contended redemption are ordinary outcomes
//! ([`CheckStatus`](crate::lifecycle::CheckStatus) /
//! [`RedeemStatus`](crate::lifecycle::RedeemStatus)), not errors.

use crate::store::StoreError;
use thiserror::Error;

/// Result type alias for lifecycle operations.
pub type Result<T> = std::result::Result<T, LifecycleError>;

/// Failures of the ticket lifecycle manager.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The ticket store could not be read or written. Fatal to the request.
    #[error(transparent)]
    StoreUnavailable(#[from] StoreError),

    /// A required issuance field was empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Every generated identifier collided with an existing ticket.
    #[error("Could not generate a unique ticket ID after {attempts} attempts")]
    IdSpaceExhausted {
        /// Number of identifiers tried
        attempts: usize,
    },
}

impl LifecycleError {
    /// Returns `true` if the caller sent a bad request (maps to a 4xx).
    ///
    /// # Examples
    ///
    /// ```
    /// # use turnstile_core::{LifecycleError, StoreError};
    /// assert!(LifecycleError::MissingField("email").is_client_error());
    /// assert!(!LifecycleError::from(StoreError::Unavailable("down".into())).is_client_error());
    /// ```
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::MissingField(_))
    }
}
