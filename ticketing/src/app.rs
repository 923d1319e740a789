//! Application wiring: configuration, lifecycle manager and metrics.
//!
//! [`TicketingApp`] is what an HTTP layer would hold in its state. Its
//! `*_json` methods take and return raw JSON bodies, so routing code only
//! has to map [`AppError::status_code`] onto a response.

use crate::config::Config;
use crate::requests::{ErrorBody, IssueTicketRequest, IssueTicketResponse, ValidationError};
use thiserror::Error;
use turnstile_core::payload::verification_url;
use turnstile_core::{LifecycleError, ScanRequest, ScanResponse, Ticket};
use turnstile_runtime::metrics::{MetricsError, MetricsExporter};
use turnstile_runtime::{InMemoryTicketStore, LifecycleEnvironment, TicketLifecycle};

/// Errors surfaced to API callers.
#[derive(Debug, Error)]
pub enum AppError {
    /// Request body was not valid JSON for the endpoint
    #[error("Invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    /// Issuance input failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Verification request without a ticket identifier
    #[error("ticketId is required")]
    MissingTicketId,

    /// The lifecycle manager failed
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Endpoint a request was made against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Ticket issuance
    Issue,
    /// Ticket verification
    Verify,
}

impl Operation {
    /// Message returned to callers when the operation fails server-side.
    #[must_use]
    pub const fn failure_message(self) -> &'static str {
        match self {
            Self::Issue => "Failed to create ticket",
            Self::Verify => "Failed to verify ticket",
        }
    }
}

impl AppError {
    /// HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidBody(_) | Self::Validation(_) | Self::MissingTicketId => 400,
            Self::Lifecycle(err) if err.is_client_error() => 400,
            Self::Lifecycle(_) => 500,
        }
    }

    /// JSON error body for this error raised by `operation`.
    ///
    /// Server-side failures are reported generically; the detail is logged.
    #[must_use]
    pub fn body(&self, operation: Operation) -> ErrorBody {
        if self.status_code() >= 500 {
            tracing::error!(error = %self, ?operation, "Request failed");
            ErrorBody::new(operation.failure_message())
        } else {
            ErrorBody::new(self.to_string())
        }
    }
}

/// The ticketing application.
pub struct TicketingApp {
    config: Config,
    lifecycle: TicketLifecycle<InMemoryTicketStore>,
    metrics: MetricsExporter,
}

impl TicketingApp {
    /// Create the application with the system clock and random identifiers.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::with_environment(config, LifecycleEnvironment::production())
    }

    /// Create the application with an explicit environment.
    #[must_use]
    pub fn with_environment(config: Config, env: LifecycleEnvironment) -> Self {
        let lifecycle =
            TicketLifecycle::with_config(InMemoryTicketStore::new(), env, config.lifecycle());
        Self {
            config,
            lifecycle,
            metrics: MetricsExporter::new(),
        }
    }

    /// Install the Prometheus recorder.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError`] if the recorder cannot be built or installed.
    pub fn install_metrics(&mut self) -> Result<(), MetricsError> {
        self.metrics.install()
    }

    /// Prometheus exposition of the current metrics, if installed here.
    #[must_use]
    pub fn render_metrics(&self) -> Option<String> {
        self.metrics.render()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The lifecycle manager.
    #[must_use]
    pub const fn lifecycle(&self) -> &TicketLifecycle<InMemoryTicketStore> {
        &self.lifecycle
    }

    /// Absolute QR verification link for a ticket.
    #[must_use]
    pub fn verification_url(&self, ticket: &Ticket) -> String {
        verification_url(&self.config.server.public_base_url, ticket.id())
    }

    /// Validate a request and issue a ticket.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Validation`] for bad input and
    /// [`AppError::Lifecycle`] if issuance fails.
    pub async fn issue(&self, request: &IssueTicketRequest) -> Result<IssueTicketResponse, AppError> {
        let details = request.validate()?;
        let ticket = self.lifecycle.issue(details).await?;

        Ok(IssueTicketResponse {
            ticket_id: ticket.id().clone(),
            verification_url: self.verification_url(&ticket),
            ticket,
        })
    }

    /// Issue a ticket from a raw JSON body.
    ///
    /// # Errors
    ///
    /// See [`issue`](Self::issue); additionally [`AppError::InvalidBody`].
    pub async fn issue_json(&self, body: &str) -> Result<String, AppError> {
        let request: IssueTicketRequest = serde_json::from_str(body)?;
        let response = self.issue(&request).await?;
        Ok(serde_json::to_string(&response)?)
    }

    /// Verify a ticket from a raw `{ticketId, action?}` JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::InvalidBody`] for malformed JSON,
    /// [`AppError::MissingTicketId`] for a blank identifier and
    /// [`AppError::Lifecycle`] if the store fails.
    pub async fn scan_json(&self, body: &str) -> Result<String, AppError> {
        let request: ScanRequest = serde_json::from_str(body)?;
        let response = self.scan(request).await?;
        Ok(serde_json::to_string(&response)?)
    }

    /// Verify a ticket.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::MissingTicketId`] for a blank identifier and
    /// [`AppError::Lifecycle`] if the store fails.
    pub async fn scan(&self, request: ScanRequest) -> Result<ScanResponse, AppError> {
        if request.ticket_id.trim().is_empty() {
            return Err(AppError::MissingTicketId);
        }
        Ok(self.lifecycle.scan(request).await?)
    }
}

impl std::fmt::Debug for TicketingApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TicketingApp")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
