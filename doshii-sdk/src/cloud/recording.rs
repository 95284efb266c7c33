//! In-process reporter
//!
//! Records every acknowledged report and answers with increasing versions
//! (`v1`, `v2`, ...). Used by tests and by POS hosts running without Doshii
//! credentials.

use super::reporter::{CloudReporter, ReportError, ReportResult};
use async_trait::async_trait;
use shared::cloud::ReportReceipt;
use shared::error::ErrorCode;
use shared::order::{Order, OrderStatus, Rejection, Transaction, TransactionStatus};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// One acknowledged report
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportCall {
    AcceptOrder {
        doshii_id: Option<String>,
        pos_id: Option<String>,
        total: i64,
    },
    RejectOrder {
        doshii_id: String,
        code: ErrorCode,
    },
    UpdateOrder {
        pos_id: Option<String>,
        status: OrderStatus,
        total: i64,
    },
    CreateOrder {
        pos_id: Option<String>,
    },
    UpdateTransaction {
        trx_id: String,
        amount: i64,
        status: TransactionStatus,
    },
    RejectTransaction {
        trx_id: String,
        code: ErrorCode,
    },
}

#[derive(Debug, Default)]
pub struct RecordingReporter {
    calls: Mutex<Vec<ReportCall>>,
    attempts: AtomicUsize,
    pending_failures: AtomicUsize,
    conflict: Mutex<Option<String>>,
    version: AtomicU64,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `n` reports with a network error
    pub fn fail_next(&self, n: usize) {
        self.pending_failures.store(n, Ordering::SeqCst);
    }

    /// Answer the next report with a version conflict
    pub fn conflict_next(&self, current_version: impl Into<String>) {
        *self.conflict.lock().unwrap_or_else(|e| e.into_inner()) = Some(current_version.into());
    }

    /// Acknowledged reports, oldest first
    pub fn calls(&self) -> Vec<ReportCall> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Reports attempted, including failed ones
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn acknowledge(&self, call: ReportCall) -> ReportResult<ReportReceipt> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        if self
            .pending_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ReportError::Network("simulated outage".into()));
        }
        if let Some(current) = self
            .conflict
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            return Err(ReportError::VersionConflict(current));
        }

        tracing::debug!(?call, "Report recorded");
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(call);
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ReportReceipt::new(format!("v{version}")))
    }
}

#[async_trait]
impl CloudReporter for RecordingReporter {
    async fn accept_order(&self, order: &Order) -> ReportResult<ReportReceipt> {
        self.acknowledge(ReportCall::AcceptOrder {
            doshii_id: order.doshii_id.clone(),
            pos_id: order.id.clone(),
            total: order.total,
        })
    }

    async fn reject_order(
        &self,
        doshii_id: &str,
        rejection: &Rejection,
    ) -> ReportResult<ReportReceipt> {
        self.acknowledge(ReportCall::RejectOrder {
            doshii_id: doshii_id.to_string(),
            code: rejection.code,
        })
    }

    async fn update_order(&self, order: &Order) -> ReportResult<ReportReceipt> {
        self.acknowledge(ReportCall::UpdateOrder {
            pos_id: order.id.clone(),
            status: order.status,
            total: order.total,
        })
    }

    async fn create_order(&self, order: &Order) -> ReportResult<ReportReceipt> {
        let mut receipt = self.acknowledge(ReportCall::CreateOrder {
            pos_id: order.id.clone(),
        })?;
        receipt.doshii_id = order
            .id
            .as_deref()
            .map(|pos_id| format!("walkin-{pos_id}"));
        Ok(receipt)
    }

    async fn update_transaction(&self, trx: &Transaction) -> ReportResult<ReportReceipt> {
        self.acknowledge(ReportCall::UpdateTransaction {
            trx_id: trx.id.clone(),
            amount: trx.amount,
            status: trx.status,
        })
    }

    async fn reject_transaction(
        &self,
        trx: &Transaction,
        rejection: &Rejection,
    ) -> ReportResult<ReportReceipt> {
        self.acknowledge(ReportCall::RejectTransaction {
            trx_id: trx.id.clone(),
            code: rejection.code,
        })
    }
}
