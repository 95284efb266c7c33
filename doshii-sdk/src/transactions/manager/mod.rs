//! TransactionsManager - Payment Reconciliation
//!
//! Gates captures and refunds requested by the partner against the amount
//! owing on the POS order.
//!
//! ```text
//! transaction_created (amount ≥ 0)
//!     └─ evaluate_payment_readiness → lock order → waiting → report
//! transaction_completed
//!     └─ record_successful_payment → unlock → complete order when paid
//! transaction_cancelled
//!     └─ cancel_payment → unlock → rejected
//! transaction_created (amount < 0)
//!     └─ evaluate_refund_readiness → linkage check → waiting → report
//! ```
//!
//! While a capture is waiting the order's `payment_lock` names it; every
//! order mutation is refused until the capture completes or is cancelled.

#[cfg(test)]
mod tests;

use super::store::TransactionStore;
use crate::cloud::{CloudReporter, deliver};
use crate::orders::manager::DEFAULT_REPORT_TIMEOUT;
use crate::orders::{ManagerError, ManagerResult, Order, OrdersManager, VersionLedger};
use shared::error::ErrorCode;
use shared::order::{Rejection, Transaction, TransactionStatus};
use shared::util::now_millis;
use std::sync::Arc;
use std::time::Duration;

/// Answer to a ready-to-pay / ready-to-refund request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentReadiness {
    /// Confirmed; the amount may be lower than requested when `accept_less`
    Ready(Transaction),
    Declined { code: ErrorCode, reason: String },
}

impl PaymentReadiness {
    fn declined(err: ManagerError) -> Self {
        PaymentReadiness::Declined {
            code: err.code(),
            reason: err.to_string(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, PaymentReadiness::Ready(_))
    }

    /// Rejection to report for a declined request
    pub fn rejection(&self) -> Option<Rejection> {
        match self {
            PaymentReadiness::Ready(_) => None,
            PaymentReadiness::Declined { code, reason } => Some(Rejection::new(*code, reason)),
        }
    }
}

pub struct TransactionsManager {
    orders: Arc<OrdersManager>,
    transactions: Arc<TransactionStore>,
    ledger: Arc<VersionLedger>,
    reporter: Arc<dyn CloudReporter>,
    report_timeout: Duration,
}

impl std::fmt::Debug for TransactionsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionsManager")
            .field("transactions", &self.transactions)
            .field("report_timeout", &self.report_timeout)
            .finish_non_exhaustive()
    }
}

impl TransactionsManager {
    pub fn new(
        orders: Arc<OrdersManager>,
        transactions: Arc<TransactionStore>,
        ledger: Arc<VersionLedger>,
        reporter: Arc<dyn CloudReporter>,
    ) -> Self {
        Self {
            orders,
            transactions,
            ledger,
            reporter,
            report_timeout: DEFAULT_REPORT_TIMEOUT,
        }
    }

    pub fn with_report_timeout(mut self, timeout: Duration) -> Self {
        self.report_timeout = timeout;
        self
    }

    // ========================================================================
    // Captures
    // ========================================================================

    /// Ready-to-pay handshake for a capture
    pub async fn evaluate_payment_readiness(
        &self,
        trx: Transaction,
    ) -> ManagerResult<PaymentReadiness> {
        if trx.amount < 0 {
            return Ok(PaymentReadiness::declined(ManagerError::InvalidAmountSign {
                transaction_id: trx.id,
                amount: trx.amount,
            }));
        }
        let pos_id = self
            .orders
            .resolve_pos_id(&trx.order_id)
            .ok_or_else(|| ManagerError::OrderNotFound(trx.order_id.clone()))?;
        let _guard = self.orders.lock_order(&pos_id).await;
        let order = self.orders.retrieve_order(&pos_id)?;

        if let Some(holder) = order.payment_lock.clone() {
            if holder == trx.id
                && let Some(waiting) = self.transactions.get(&trx.id)
            {
                tracing::debug!(order_id = %pos_id, transaction_id = %trx.id, "Ready-to-pay redelivered");
                return self.confirm(waiting).await;
            }
            tracing::info!(
                order_id = %pos_id,
                transaction_id = %trx.id,
                locked_by = %holder,
                "Capture declined, order locked"
            );
            return Ok(PaymentReadiness::declined(ManagerError::OrderLocked {
                order_id: pos_id,
                transaction_id: holder,
            }));
        }
        if let Some(known) = self.transactions.get(&trx.id) {
            match known.status {
                TransactionStatus::Complete => return Ok(PaymentReadiness::Ready(known)),
                TransactionStatus::Rejected => {
                    return Ok(PaymentReadiness::declined(ManagerError::InvalidOperation(
                        format!("transaction {} was cancelled", known.id),
                    )));
                }
                TransactionStatus::Pending | TransactionStatus::Waiting => {}
            }
        }

        let owing = order.total - self.transactions.net_captured(&pos_id);
        let mut ready = trx;
        // Zero settles only a free order, and a free order only takes zero
        if owing < 0 || (owing == 0) != (ready.amount == 0) {
            return Ok(PaymentReadiness::declined(
                ManagerError::PaymentAmountMismatch {
                    owing,
                    requested: ready.amount,
                },
            ));
        }
        if ready.amount != owing {
            if !self.orders.allow_partial_payment(&order) {
                tracing::info!(
                    order_id = %pos_id,
                    transaction_id = %ready.id,
                    owing,
                    requested = ready.amount,
                    "Capture declined, amount mismatch"
                );
                return Ok(PaymentReadiness::declined(
                    ManagerError::PaymentAmountMismatch {
                        owing,
                        requested: ready.amount,
                    },
                ));
            }
            if ready.amount > owing {
                ready.amount = owing;
                ready.accept_less = true;
            }
        }

        let now = now_millis();
        ready.order_id = pos_id.clone();
        ready.status = TransactionStatus::Waiting;
        if ready.created_at == 0 {
            ready.created_at = now;
        }
        ready.updated_at = now;
        self.transactions.insert(ready.clone())?;
        self.lock(order, &ready.id)?;

        tracing::info!(
            order_id = %pos_id,
            transaction_id = %ready.id,
            amount = ready.amount,
            owing,
            accept_less = ready.accept_less,
            "Capture ready, order locked"
        );
        self.confirm(ready).await
    }

    /// Abandon a capture; the order accepts mutations again
    pub async fn cancel_payment(&self, trx: &Transaction) -> ManagerResult<Transaction> {
        let pos_id = self
            .transactions
            .get(&trx.id)
            .ok_or_else(|| ManagerError::TransactionNotFound(trx.id.clone()))?
            .order_id;
        let _guard = self.orders.lock_order(&pos_id).await;

        let mut cancelled = self
            .transactions
            .get(&trx.id)
            .ok_or_else(|| ManagerError::TransactionNotFound(trx.id.clone()))?;
        match cancelled.status {
            TransactionStatus::Rejected => return Ok(cancelled),
            TransactionStatus::Complete => {
                return Err(ManagerError::InvalidOperation(format!(
                    "transaction {} is already complete",
                    cancelled.id
                )));
            }
            TransactionStatus::Pending | TransactionStatus::Waiting => {}
        }

        let unlocked = self.release(&pos_id, &cancelled.id)?;
        cancelled.status = TransactionStatus::Rejected;
        cancelled.updated_at = now_millis();
        self.transactions.insert(cancelled.clone())?;
        tracing::info!(order_id = %pos_id, transaction_id = %cancelled.id, unlocked, "Payment cancelled");
        Ok(cancelled)
    }

    /// Capture confirmed by Doshii
    ///
    /// Returns the order when this payment completed it.
    pub async fn record_successful_payment(&self, trx: Transaction) -> ManagerResult<Option<Order>> {
        if trx.amount < 0 {
            return Err(ManagerError::InvalidAmountSign {
                transaction_id: trx.id,
                amount: trx.amount,
            });
        }
        let pos_id = self.orders.resolve_any_pos_id(&trx.order_id);
        let _guard = self.orders.lock_order(&pos_id).await;

        let Some(paid) = self.record_complete(trx, &pos_id)? else {
            return Ok(None);
        };
        tracing::info!(order_id = %pos_id, transaction_id = %paid.id, amount = paid.amount, "Payment recorded");

        let Some(mut order) = self.orders.store().get(&pos_id) else {
            tracing::warn!(order_id = %pos_id, transaction_id = %paid.id, "Payment recorded for an inactive order");
            return Ok(None);
        };
        match order.payment_lock.as_deref() {
            Some(holder) if holder == paid.id => {
                order.payment_lock = None;
                order.updated_at = now_millis();
                self.orders.store().replace(order.clone())?;
            }
            Some(holder) => {
                tracing::debug!(order_id = %pos_id, locked_by = %holder, "Another capture in flight, not completing");
                return Ok(None);
            }
            None => {}
        }

        let captured = self.transactions.net_captured(&pos_id);
        if captured == order.total {
            return self.orders.complete_locked(&pos_id).await.map(Some);
        }
        if captured > order.total {
            tracing::warn!(order_id = %pos_id, total = order.total, captured, "Order overpaid");
        }
        Ok(None)
    }

    // ========================================================================
    // Refunds
    // ========================================================================

    /// Ready-to-refund handshake
    pub async fn evaluate_refund_readiness(
        &self,
        trx: Transaction,
    ) -> ManagerResult<PaymentReadiness> {
        if trx.amount >= 0 {
            return Ok(PaymentReadiness::declined(ManagerError::InvalidAmountSign {
                transaction_id: trx.id,
                amount: trx.amount,
            }));
        }
        let pos_id = self.orders.resolve_any_pos_id(&trx.order_id);
        let _guard = self.orders.lock_order(&pos_id).await;

        if let Some(known) = self.transactions.get(&trx.id) {
            match known.status {
                TransactionStatus::Waiting => return self.confirm(known).await,
                TransactionStatus::Complete => return Ok(PaymentReadiness::Ready(known)),
                TransactionStatus::Rejected => {
                    return Ok(PaymentReadiness::declined(ManagerError::InvalidOperation(
                        format!("transaction {} was cancelled", known.id),
                    )));
                }
                TransactionStatus::Pending => {}
            }
        }

        if let Err(e) = self.check_linkage(&trx, &pos_id) {
            tracing::info!(order_id = %pos_id, transaction_id = %trx.id, error = %e, "Refund declined");
            return Ok(PaymentReadiness::declined(e));
        }

        let now = now_millis();
        let mut ready = trx;
        ready.order_id = pos_id.clone();
        ready.status = TransactionStatus::Waiting;
        if ready.created_at == 0 {
            ready.created_at = now;
        }
        ready.updated_at = now;
        self.transactions.insert(ready.clone())?;

        tracing::info!(order_id = %pos_id, transaction_id = %ready.id, amount = ready.amount, "Refund ready");
        self.confirm(ready).await
    }

    /// Every linked id a completed capture of this order, enough left to refund
    fn check_linkage(&self, refund: &Transaction, pos_id: &str) -> ManagerResult<()> {
        let mut linked = refund.linked_trx_ids.clone();
        linked.sort();
        linked.dedup();
        if linked.is_empty() {
            return Err(ManagerError::TransactionLinkageInvalid(format!(
                "refund {} is not linked to any capture",
                refund.id
            )));
        }

        let mut refundable = 0;
        for id in &linked {
            match self.transactions.get(id) {
                Some(capture) if capture.is_captured() && capture.order_id == pos_id => {
                    refundable += capture.amount;
                }
                _ => {
                    return Err(ManagerError::TransactionLinkageInvalid(format!(
                        "{id} is not a completed capture of order {pos_id}"
                    )));
                }
            }
        }
        refundable -= self.transactions.reserved_against(&linked, &refund.id);

        if -refund.amount > refundable {
            return Err(ManagerError::TransactionLinkageInvalid(format!(
                "refund of {} exceeds the {} left on the linked captures",
                -refund.amount, refundable
            )));
        }
        Ok(())
    }

    /// Refund confirmed by Doshii
    pub async fn record_successful_refund(&self, trx: Transaction) -> ManagerResult<Transaction> {
        if trx.amount >= 0 {
            return Err(ManagerError::InvalidAmountSign {
                transaction_id: trx.id,
                amount: trx.amount,
            });
        }
        let pos_id = self.orders.resolve_any_pos_id(&trx.order_id);
        let _guard = self.orders.lock_order(&pos_id).await;

        let trx_id = trx.id.clone();
        match self.record_complete(trx, &pos_id)? {
            Some(refund) => {
                tracing::info!(order_id = %pos_id, transaction_id = %refund.id, amount = refund.amount, "Refund recorded");
                Ok(refund)
            }
            None => self
                .transactions
                .get(&trx_id)
                .ok_or(ManagerError::TransactionNotFound(trx_id)),
        }
    }

    // ========================================================================
    // Versions
    // ========================================================================

    pub fn record_transaction_version(&self, trx_id: &str, version: &str) -> ManagerResult<()> {
        let mut trx = self
            .transactions
            .get(trx_id)
            .ok_or_else(|| ManagerError::TransactionNotFound(trx_id.to_string()))?;
        self.ledger.record_transaction(trx_id, version)?;
        trx.version = Some(version.to_string());
        self.transactions.insert(trx)?;
        Ok(())
    }

    pub fn retrieve_transaction_version(&self, trx_id: &str) -> ManagerResult<Option<String>> {
        if !self.transactions.contains(trx_id) {
            return Err(ManagerError::TransactionNotFound(trx_id.to_string()));
        }
        Ok(self.ledger.get_transaction(trx_id))
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn transaction(&self, trx_id: &str) -> Option<Transaction> {
        self.transactions.get(trx_id)
    }

    pub fn transactions_for_order(&self, pos_id: &str) -> Vec<Transaction> {
        self.transactions.for_order(pos_id)
    }

    /// Report a declined request to Doshii
    pub async fn report_decline(&self, trx: &Transaction, rejection: Rejection) -> ManagerResult<()> {
        let reporter = self.reporter.clone();
        let mut snapshot = trx.clone();
        snapshot.status = TransactionStatus::Rejected;
        deliver(self.report_timeout, async move {
            reporter.reject_transaction(&snapshot, &rejection).await
        })
        .await
        .inspect_err(|e| {
            tracing::error!(transaction_id = %trx.id, error = %e, "Failed to report declined transaction");
        })?;
        Ok(())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Report a waiting transaction and record the returned version
    ///
    /// A waiting transaction whose version is already recorded was reported
    /// before; it is answered from the store.
    async fn confirm(&self, mut trx: Transaction) -> ManagerResult<PaymentReadiness> {
        if self.ledger.get_transaction(&trx.id).is_some() {
            return Ok(PaymentReadiness::Ready(trx));
        }

        let reporter = self.reporter.clone();
        let snapshot = trx.clone();
        let receipt = deliver(self.report_timeout, async move {
            reporter.update_transaction(&snapshot).await
        })
        .await
        .inspect_err(|e| {
            tracing::error!(transaction_id = %trx.id, error = %e, "Failed to report ready transaction");
        })?;

        self.ledger.record_transaction(&trx.id, &receipt.version)?;
        trx.version = Some(receipt.version);
        self.transactions.insert(trx.clone())?;
        Ok(PaymentReadiness::Ready(trx))
    }

    /// Store `trx` as complete; `None` when it already was
    fn record_complete(&self, trx: Transaction, pos_id: &str) -> ManagerResult<Option<Transaction>> {
        let previous = self.transactions.get(&trx.id);
        if let Some(prev) = &previous
            && prev.status == TransactionStatus::Complete
        {
            tracing::debug!(transaction_id = %prev.id, "Transaction already recorded, ignoring");
            return Ok(None);
        }

        let now = now_millis();
        let mut done = trx;
        done.order_id = pos_id.to_string();
        done.status = TransactionStatus::Complete;
        done.updated_at = now;
        if let Some(prev) = previous {
            done.created_at = prev.created_at;
            done.accept_less |= prev.accept_less;
            if done.version.is_none() {
                done.version = prev.version;
            }
            if done.linked_trx_ids.is_empty() {
                done.linked_trx_ids = prev.linked_trx_ids;
            }
        }
        if done.created_at == 0 {
            done.created_at = now;
        }

        self.transactions.insert(done.clone())?;
        if let Some(version) = done.version.as_deref() {
            self.ledger.record_transaction(&done.id, version)?;
        }
        Ok(Some(done))
    }

    fn lock(&self, mut order: Order, trx_id: &str) -> ManagerResult<()> {
        order.payment_lock = Some(trx_id.to_string());
        order.updated_at = now_millis();
        self.orders.store().replace(order)?;
        Ok(())
    }

    /// Clear the order lock if `trx_id` holds it
    fn release(&self, pos_id: &str, trx_id: &str) -> ManagerResult<bool> {
        let Some(mut order) = self.orders.store().get(pos_id) else {
            return Ok(false);
        };
        if order.payment_lock.as_deref() != Some(trx_id) {
            return Ok(false);
        }
        order.payment_lock = None;
        order.updated_at = now_millis();
        self.orders.store().replace(order)?;
        Ok(true)
    }
}
