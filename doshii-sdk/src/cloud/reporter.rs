//! Cloud reporting channel
//!
//! Every POS-side decision is reported back to Doshii through a
//! [`CloudReporter`]. Workflows never await a reporter directly; they go
//! through [`deliver`], which runs the call on a detached task under a
//! timeout so that dropping the caller never cancels a report in flight.

use async_trait::async_trait;
use shared::cloud::ReportReceipt;
use shared::order::{Order, Rejection, Transaction};
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Reporting errors
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Doshii responded {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Version conflict: {0}")]
    VersionConflict(String),

    #[error("Report timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid report: {0}")]
    Invalid(String),

    #[error("Report task aborted: {0}")]
    Aborted(String),
}

impl ReportError {
    /// Network failures, timeouts and 5xx may succeed on retry
    pub fn is_retryable(&self) -> bool {
        match self {
            ReportError::Network(_) | ReportError::Timeout(_) => true,
            ReportError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type ReportResult<T> = Result<T, ReportError>;

/// Outbound calls to Doshii
///
/// Implementations must be safe to call again with the same arguments: the
/// workflows resend an unacknowledged report verbatim.
#[async_trait]
pub trait CloudReporter: Send + Sync {
    /// Order accepted, carrying its new POS id
    async fn accept_order(&self, order: &Order) -> ReportResult<ReportReceipt>;

    /// Order rejected before acceptance
    async fn reject_order(
        &self,
        doshii_id: &str,
        rejection: &Rejection,
    ) -> ReportResult<ReportReceipt>;

    /// Any later change of an accepted order, including terminal status
    async fn update_order(&self, order: &Order) -> ReportResult<ReportReceipt>;

    /// POS-originated (walk-in) order; the receipt carries the Doshii id
    async fn create_order(&self, order: &Order) -> ReportResult<ReportReceipt>;

    /// Ready-to-pay / ready-to-refund confirmation
    async fn update_transaction(&self, trx: &Transaction) -> ReportResult<ReportReceipt>;

    /// Ready-to-pay / ready-to-refund decline
    async fn reject_transaction(
        &self,
        trx: &Transaction,
        rejection: &Rejection,
    ) -> ReportResult<ReportReceipt>;
}

/// Run a report to completion on its own task, bounded by `timeout`
pub async fn deliver<T, F>(timeout: Duration, report: F) -> ReportResult<T>
where
    F: Future<Output = ReportResult<T>> + Send + 'static,
    T: Send + 'static,
{
    let handle = tokio::spawn(tokio::time::timeout(timeout, report));
    match handle.await {
        Ok(Ok(result)) => result,
        Ok(Err(_elapsed)) => Err(ReportError::Timeout(timeout)),
        Err(e) => Err(ReportError::Aborted(e.to_string())),
    }
}
