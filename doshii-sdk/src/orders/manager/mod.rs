//! OrdersManager - Order Acceptance Workflow
//!
//! Decides on inbound Doshii orders and keeps the Order Store, the Version
//! Ledger and Doshii consistent with that decision.
//!
//! # Inbound order flow
//!
//! ```text
//! evaluate_new_order(order, consumer, transactions)
//!     ├─ 1. Lock doshii:<id>
//!     ├─ 2. Known outcome? reported → no-op, unreported → resend
//!     ├─ 3. Map items (catalog or placeholder product)
//!     ├─ 4. Price items and order (rust_decimal)
//!     ├─ 5. POS policy + bundled payment check
//!     ├─ 6a. Accept: POS id, store + ledger + outcome in one commit, report,
//!     │       record version, record bundled payments (may complete)
//!     └─ 6b. Reject: outcome only, report code + reason
//! ```
//!
//! # State machine
//!
//! ```text
//! Pending → Accepted → Complete
//! Pending → Rejected
//! Accepted → VenueCancelled
//! ```
//!
//! Orders leave the active store on every terminal state; their outcome is
//! retained so redelivered events are ignored.

mod error;
pub use error::*;

#[cfg(test)]
mod tests;

use super::ledger::{LedgerEntry, VersionLedger};
use super::money;
use super::store::{OrderGuard, OrderStore};
use crate::cloud::{CloudReporter, deliver};
use crate::pos::{CatalogLookup, OrderingPolicy, PolicyDecision};
use crate::transactions::TransactionStore;
use shared::cloud::ReportReceipt;
use shared::error::ErrorCode;
use shared::order::{
    Consumer, Order, OrderEdit, OrderItem, OrderOutcome, OrderStatus, Rejection, Transaction,
    TransactionStatus,
};
use shared::util::{format_cents, now_millis};
use std::sync::Arc;
use std::time::Duration;

/// Product reference given to items the catalog does not know
pub const DEFAULT_PLACEHOLDER_PRODUCT_ID: &str = "doshii-unmapped";

/// Default bound on a single outbound report
pub const DEFAULT_REPORT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct OrdersManager {
    store: Arc<OrderStore>,
    ledger: Arc<VersionLedger>,
    transactions: Arc<TransactionStore>,
    reporter: Arc<dyn CloudReporter>,
    policy: Arc<dyn OrderingPolicy>,
    catalog: Arc<dyn CatalogLookup>,
    placeholder_product_id: String,
    report_timeout: Duration,
}

impl std::fmt::Debug for OrdersManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrdersManager")
            .field("store", &self.store)
            .field("placeholder_product_id", &self.placeholder_product_id)
            .field("report_timeout", &self.report_timeout)
            .finish_non_exhaustive()
    }
}

impl OrdersManager {
    pub fn new(
        store: Arc<OrderStore>,
        ledger: Arc<VersionLedger>,
        transactions: Arc<TransactionStore>,
        reporter: Arc<dyn CloudReporter>,
        policy: Arc<dyn OrderingPolicy>,
        catalog: Arc<dyn CatalogLookup>,
    ) -> Self {
        Self {
            store,
            ledger,
            transactions,
            reporter,
            policy,
            catalog,
            placeholder_product_id: DEFAULT_PLACEHOLDER_PRODUCT_ID.to_string(),
            report_timeout: DEFAULT_REPORT_TIMEOUT,
        }
    }

    pub fn with_placeholder_product(mut self, product_id: impl Into<String>) -> Self {
        self.placeholder_product_id = product_id.into();
        self
    }

    pub fn with_report_timeout(mut self, timeout: Duration) -> Self {
        self.report_timeout = timeout;
        self
    }

    // ========================================================================
    // Inbound orders
    // ========================================================================

    /// Accept or reject an order pushed by Doshii
    ///
    /// Returns the recorded outcome. A reporting failure is returned as an
    /// error after the decision has been persisted; redelivery of the same
    /// event resends the identical report.
    pub async fn evaluate_new_order(
        &self,
        mut order: Order,
        consumer: &Consumer,
        transactions: &[Transaction],
    ) -> ManagerResult<OrderOutcome> {
        let doshii_id = order
            .doshii_id
            .clone()
            .ok_or_else(|| ManagerError::InvalidOrder("order has no Doshii id".into()))?;
        let _creation = self.store.lock(&OrderStore::creation_key(&doshii_id)).await;

        if let Some(pos_id) = order.id.as_deref()
            && let Some(existing) = self.store.get(pos_id)
            && existing.doshii_id.as_deref() != Some(doshii_id.as_str())
        {
            tracing::warn!(
                order_id = %pos_id,
                doshii_id = %doshii_id,
                existing_doshii_id = ?existing.doshii_id,
                "POS id already belongs to another order"
            );
            return Err(ManagerError::DuplicateOrder(pos_id.to_string()));
        }

        if let Some(outcome) = self.store.outcome_for(&doshii_id) {
            return self.redeliver(outcome, transactions).await;
        }
        if let Some(pos_id) = self.store.pos_id_for(&doshii_id) {
            // Active order without an outcome: restore the decision it implies
            tracing::warn!(order_id = %pos_id, doshii_id = %doshii_id, "Active order has no outcome, restoring acceptance");
            let outcome = OrderOutcome::accepted(&doshii_id, &pos_id);
            self.store.record_outcome(outcome.clone())?;
            return self.redeliver(outcome, transactions).await;
        }

        match self.decide(&mut order, consumer, transactions) {
            Ok(()) => self.accept(order, &doshii_id, transactions).await,
            Err(rejection) => self.reject(&doshii_id, rejection).await,
        }
    }

    /// Map, price and run the POS policy; `Err` carries the rejection
    fn decide(
        &self,
        order: &mut Order,
        consumer: &Consumer,
        transactions: &[Transaction],
    ) -> Result<(), Rejection> {
        self.map_items(&mut order.items);
        money::recalculate(order).map_err(|e| Rejection::new(e.code(), e.to_string()))?;

        if let PolicyDecision::Reject(reason) = self.policy.evaluate(order, consumer) {
            return Err(Rejection::new(ErrorCode::OrderRejectedByPolicy, reason));
        }

        self.check_bundled_payments(order, transactions)
            .map_err(|e| Rejection::new(e.code(), e.to_string()))
    }

    /// Bundled prepayments must be captures that settle the order
    fn check_bundled_payments(
        &self,
        order: &Order,
        transactions: &[Transaction],
    ) -> ManagerResult<()> {
        if transactions.is_empty() {
            return Ok(());
        }
        if let Some(refund) = transactions.iter().find(|t| t.amount < 0) {
            return Err(ManagerError::InvalidAmountSign {
                transaction_id: refund.id.clone(),
                amount: refund.amount,
            });
        }

        let paid: i64 = transactions.iter().map(|t| t.amount).sum();
        let partial = self.policy.allow_partial_payment(order);
        if paid == order.total || (partial && paid < order.total) {
            Ok(())
        } else {
            Err(ManagerError::PaymentAmountMismatch {
                owing: order.total,
                requested: paid,
            })
        }
    }

    /// Fill POS product references; unknown items get the placeholder
    fn map_items(&self, items: &mut [OrderItem]) {
        for item in items.iter_mut().filter(|i| i.pos_id.is_none()) {
            match self.catalog.resolve(&item.partner_ref) {
                Some(product_id) => item.pos_id = Some(product_id),
                None => {
                    tracing::warn!(
                        partner_ref = %item.partner_ref,
                        placeholder = %self.placeholder_product_id,
                        "Unmapped item, using placeholder product"
                    );
                    item.pos_id = Some(self.placeholder_product_id.clone());
                }
            }
        }
    }

    async fn accept(
        &self,
        mut order: Order,
        doshii_id: &str,
        transactions: &[Transaction],
    ) -> ManagerResult<OrderOutcome> {
        let pos_id = self.store.next_pos_id()?;
        let _guard = self.store.lock(&pos_id).await;

        let now = now_millis();
        order.id = Some(pos_id.clone());
        order.status = OrderStatus::Accepted;
        order.payment_lock = None;
        order.created_at = now;
        order.updated_at = now;

        self.store.admit(
            order.clone(),
            LedgerEntry {
                version: order.version.clone(),
                checkin_id: order.checkin_id.clone(),
            },
            OrderOutcome::accepted(doshii_id, &pos_id),
            &self.ledger,
        )?;

        tracing::info!(
            order_id = %pos_id,
            doshii_id = %doshii_id,
            total = %format_cents(order.total),
            items = order.items.len(),
            "Order accepted"
        );
        self.report_acceptance(&order).await?;
        self.settle_bundled(&pos_id, transactions).await?;
        self.current_outcome(doshii_id)
    }

    async fn reject(&self, doshii_id: &str, rejection: Rejection) -> ManagerResult<OrderOutcome> {
        tracing::info!(
            doshii_id = %doshii_id,
            code = %rejection.code,
            reason = %rejection.reason,
            "Order rejected"
        );
        let outcome = OrderOutcome::rejected(doshii_id, rejection);
        self.store.record_outcome(outcome.clone())?;
        self.report_rejection(&outcome).await
    }

    /// Same creation event again
    ///
    /// Bundled payments not yet recorded are recorded once the acceptance is
    /// acknowledged.
    async fn redeliver(
        &self,
        outcome: OrderOutcome,
        transactions: &[Transaction],
    ) -> ManagerResult<OrderOutcome> {
        if outcome.reported {
            tracing::debug!(
                doshii_id = %outcome.doshii_id,
                status = %outcome.status,
                "Order already decided, ignoring redelivery"
            );
            if let Some(pos_id) = outcome.pos_id.as_deref()
                && !transactions.is_empty()
                && self.store.contains(pos_id)
            {
                let _guard = self.store.lock(pos_id).await;
                self.settle_bundled(pos_id, transactions).await?;
                return self.current_outcome(&outcome.doshii_id);
            }
            return Ok(outcome);
        }

        tracing::info!(
            doshii_id = %outcome.doshii_id,
            status = %outcome.status,
            "Resending unreported decision"
        );
        if outcome.is_rejected() {
            return self.report_rejection(&outcome).await;
        }

        let active = outcome
            .pos_id
            .as_deref()
            .and_then(|pos_id| self.store.get(pos_id));
        match active {
            Some(order) => {
                let pos_id = order.display_id().to_string();
                let _guard = self.store.lock(&pos_id).await;
                self.report_acceptance(&order).await?;
                self.settle_bundled(&pos_id, transactions).await?;
                self.current_outcome(&outcome.doshii_id)
            }
            // Left the active store since; its terminal report supersedes
            None => Ok(self
                .store
                .mark_reported(&outcome.doshii_id)?
                .unwrap_or(outcome)),
        }
    }

    async fn report_acceptance(&self, order: &Order) -> ManagerResult<OrderOutcome> {
        let pos_id = order.display_id().to_string();
        let doshii_id = order.doshii_id.clone().unwrap_or_default();

        let reporter = self.reporter.clone();
        let snapshot = order.clone();
        let receipt = deliver(self.report_timeout, async move {
            reporter.accept_order(&snapshot).await
        })
        .await
        .inspect_err(|e| {
            tracing::error!(order_id = %pos_id, doshii_id = %doshii_id, error = %e, "Failed to report acceptance");
        })?;

        self.apply_receipt(&pos_id, &receipt)?;
        self.store
            .mark_reported(&doshii_id)?
            .ok_or_else(|| ManagerError::OrderNotFound(doshii_id))
    }

    /// Record bundled prepayments as completed captures
    ///
    /// Caller holds the order lock. Completes the order when the payments
    /// settle it.
    async fn settle_bundled(&self, pos_id: &str, transactions: &[Transaction]) -> ManagerResult<()> {
        if transactions.is_empty() {
            return Ok(());
        }
        let now = now_millis();
        for trx in transactions {
            if self
                .transactions
                .get(&trx.id)
                .is_some_and(|known| known.status == TransactionStatus::Complete)
            {
                continue;
            }
            let mut paid = trx.clone();
            paid.order_id = pos_id.to_string();
            paid.status = TransactionStatus::Complete;
            if paid.created_at == 0 {
                paid.created_at = now;
            }
            paid.updated_at = now;
            if let Some(version) = paid.version.as_deref() {
                self.ledger.record_transaction(&paid.id, version)?;
            }
            tracing::info!(order_id = %pos_id, transaction_id = %paid.id, amount = paid.amount, "Bundled payment recorded");
            self.transactions.insert(paid)?;
        }

        let Some(order) = self.store.get(pos_id) else {
            return Ok(());
        };
        if !order.is_locked() && self.transactions.net_captured(pos_id) == order.total {
            self.complete_locked(pos_id).await?;
        }
        Ok(())
    }

    fn current_outcome(&self, doshii_id: &str) -> ManagerResult<OrderOutcome> {
        self.store
            .outcome_for(doshii_id)
            .ok_or_else(|| ManagerError::OrderNotFound(doshii_id.to_string()))
    }

    async fn report_rejection(&self, outcome: &OrderOutcome) -> ManagerResult<OrderOutcome> {
        let rejection = outcome.rejection.clone().ok_or_else(|| {
            ManagerError::InvalidOperation(format!(
                "outcome of {} has no rejection",
                outcome.doshii_id
            ))
        })?;

        let reporter = self.reporter.clone();
        let doshii_id = outcome.doshii_id.clone();
        deliver(self.report_timeout, async move {
            reporter.reject_order(&doshii_id, &rejection).await
        })
        .await
        .inspect_err(|e| {
            tracing::error!(doshii_id = %outcome.doshii_id, error = %e, "Failed to report rejection");
        })?;

        self.store
            .mark_reported(&outcome.doshii_id)?
            .ok_or_else(|| ManagerError::OrderNotFound(outcome.doshii_id.clone()))
    }

    // ========================================================================
    // Versions and checkins
    // ========================================================================

    /// Record the version Doshii returned for an active order
    pub async fn record_order_version(&self, pos_id: &str, version: &str) -> ManagerResult<()> {
        let _guard = self.store.lock(pos_id).await;
        let mut order = self.active(pos_id)?;
        self.ledger.record_version(pos_id, version)?;
        order.version = Some(version.to_string());
        self.store.replace(order)?;
        Ok(())
    }

    /// Last recorded version of an active order
    pub fn retrieve_order_version(&self, pos_id: &str) -> ManagerResult<Option<String>> {
        self.active(pos_id)?;
        Ok(self.ledger.get(pos_id).and_then(|e| e.version))
    }

    pub async fn record_checkin_for_order(&self, pos_id: &str, checkin_id: &str) -> ManagerResult<()> {
        let _guard = self.store.lock(pos_id).await;
        let mut order = self.active(pos_id)?;
        self.ledger.record_checkin(pos_id, checkin_id)?;
        order.checkin_id = Some(checkin_id.to_string());
        self.store.replace(order)?;
        Ok(())
    }

    pub fn retrieve_checkin_for_order(&self, pos_id: &str) -> ManagerResult<Option<String>> {
        self.active(pos_id)?;
        Ok(self.ledger.get(pos_id).and_then(|e| e.checkin_id))
    }

    // ========================================================================
    // Updates from Doshii
    // ========================================================================

    /// Venue-side cancellation: `Accepted → VenueCancelled`
    ///
    /// Returns `None` when the order already reached a terminal state.
    /// Refused with `OrderLocked` while a capture is in flight.
    pub async fn process_venue_cancellation(&self, order: Order) -> ManagerResult<Option<Order>> {
        let Some(pos_id) = self.resolve_active(&order) else {
            return self.ignore_or_not_found(&order, "venue cancellation");
        };
        let _guard = self.store.lock(&pos_id).await;
        let Some(mut current) = self.store.get(&pos_id) else {
            return Ok(None);
        };
        if !current.status.can_transition_to(OrderStatus::VenueCancelled) {
            return Err(ManagerError::OrderTerminal(pos_id, current.status));
        }

        if let Some(trx_id) = current.payment_lock.clone() {
            tracing::warn!(order_id = %pos_id, transaction_id = %trx_id, "Venue cancellation refused during capture");
            return Err(ManagerError::OrderLocked {
                order_id: pos_id,
                transaction_id: trx_id,
            });
        }
        current.status = OrderStatus::VenueCancelled;
        current.updated_at = now_millis();
        if order.version.is_some() {
            current.version = order.version;
        }
        self.retire(&current)?;
        tracing::info!(order_id = %pos_id, doshii_id = ?current.doshii_id, "Order cancelled by venue");

        let receipt = self.send_update(&current).await?;
        current.version = Some(receipt.version);
        Ok(Some(current))
    }

    /// Partner-side change of an accepted order
    ///
    /// Returns the updated order, or `None` when the event was ignored
    /// (terminal order or duplicate version).
    pub async fn apply_cloud_update(&self, incoming: Order) -> ManagerResult<Option<Order>> {
        let Some(pos_id) = self.resolve_active(&incoming) else {
            return self.ignore_or_not_found(&incoming, "update");
        };
        let _guard = self.store.lock(&pos_id).await;
        let Some(mut current) = self.store.get(&pos_id) else {
            return Ok(None);
        };
        if current.status.is_terminal() {
            return Ok(None);
        }

        let recorded = self.ledger.get(&pos_id).and_then(|e| e.version);
        if incoming.version.is_some() && incoming.version == recorded {
            tracing::debug!(order_id = %pos_id, version = ?recorded, "Duplicate order update, ignoring");
            return Ok(None);
        }
        if let Some(trx_id) = current.payment_lock.clone() {
            return Err(ManagerError::OrderLocked {
                order_id: pos_id,
                transaction_id: trx_id,
            });
        }

        if !incoming.items.is_empty() {
            let mut items = incoming.items;
            self.map_items(&mut items);
            current.items = items;
        }
        if !incoming.surcounts.is_empty() {
            current.surcounts = incoming.surcounts;
        }
        if !incoming.phase.is_empty() {
            current.phase = incoming.phase;
        }
        if incoming.checkin_id.is_some() {
            current.checkin_id = incoming.checkin_id;
        }
        money::recalculate(&mut current)?;
        current.version = incoming.version.or(current.version);
        current.updated_at = now_millis();

        self.store.replace(current.clone())?;
        self.ledger.record(
            &pos_id,
            LedgerEntry {
                version: current.version.clone(),
                checkin_id: current.checkin_id.clone(),
            },
        )?;
        tracing::info!(order_id = %pos_id, version = ?current.version, total = current.total, "Order updated from Doshii");
        Ok(Some(current))
    }

    // ========================================================================
    // POS-originated changes
    // ========================================================================

    /// Walk-in order created at the POS
    pub async fn create_walk_in_order(&self, mut order: Order) -> ManagerResult<Order> {
        let pos_id = self.store.next_pos_id()?;
        let _guard = self.store.lock(&pos_id).await;

        self.map_items(&mut order.items);
        money::recalculate(&mut order)?;
        let now = now_millis();
        order.id = Some(pos_id.clone());
        order.status = OrderStatus::Accepted;
        order.payment_lock = None;
        order.created_at = now;
        order.updated_at = now;

        self.store.insert(order.clone())?;
        self.ledger.record(
            &pos_id,
            LedgerEntry {
                version: None,
                checkin_id: order.checkin_id.clone(),
            },
        )?;
        tracing::info!(order_id = %pos_id, total = order.total, "Walk-in order created");

        let reporter = self.reporter.clone();
        let snapshot = order.clone();
        let receipt = deliver(self.report_timeout, async move {
            reporter.create_order(&snapshot).await
        })
        .await?;
        self.apply_receipt(&pos_id, &receipt)?;

        // Doshii echoes POS-created orders back on the feed
        if let Some(doshii_id) = receipt.doshii_id.as_deref() {
            let mut outcome = OrderOutcome::accepted(doshii_id, &pos_id);
            outcome.reported = true;
            self.store.record_outcome(outcome)?;
        }
        Ok(self.store.get(&pos_id).unwrap_or(order))
    }

    /// Staff edit of an active order
    pub async fn update_order_locally(&self, pos_id: &str, edit: OrderEdit) -> ManagerResult<Order> {
        let _guard = self.store.lock(pos_id).await;
        let mut order = self.active(pos_id)?;
        if order.status.is_terminal() {
            return Err(ManagerError::OrderTerminal(pos_id.to_string(), order.status));
        }
        if let Some(trx_id) = order.payment_lock.clone() {
            tracing::warn!(order_id = %pos_id, transaction_id = %trx_id, "Local edit refused during capture");
            return Err(ManagerError::OrderLocked {
                order_id: pos_id.to_string(),
                transaction_id: trx_id,
            });
        }
        if edit.is_empty() {
            return Ok(order);
        }

        let reprice = edit.touches_amount();
        if let Some(mut items) = edit.items {
            self.map_items(&mut items);
            order.items = items;
        }
        if let Some(surcounts) = edit.surcounts {
            order.surcounts = surcounts;
        }
        if let Some(phase) = edit.phase {
            order.phase = phase;
        }
        if reprice {
            money::recalculate(&mut order)?;
        }
        order.version = self.ledger.get(pos_id).and_then(|e| e.version);
        order.updated_at = now_millis();
        self.store.replace(order.clone())?;

        let receipt = self.send_update(&order).await?;
        self.apply_receipt(pos_id, &receipt)?;
        tracing::info!(order_id = %pos_id, version = %receipt.version, total = order.total, "Order updated locally");
        Ok(self.store.get(pos_id).unwrap_or(order))
    }

    /// Complete a fully paid order
    pub async fn complete_order(&self, pos_id: &str) -> ManagerResult<Order> {
        let _guard = self.store.lock(pos_id).await;
        self.complete_locked(pos_id).await
    }

    /// [`complete_order`](Self::complete_order) for callers already holding the order lock
    pub(crate) async fn complete_locked(&self, pos_id: &str) -> ManagerResult<Order> {
        let mut order = self.active(pos_id)?;
        if order.status.is_terminal() {
            return Err(ManagerError::OrderTerminal(pos_id.to_string(), order.status));
        }
        if let Some(trx_id) = order.payment_lock.clone() {
            return Err(ManagerError::OrderLocked {
                order_id: pos_id.to_string(),
                transaction_id: trx_id,
            });
        }

        let captured = self.transactions.net_captured(pos_id);
        if self.transactions.capture_count(pos_id) == 0 || captured != order.total {
            return Err(ManagerError::OrderNotPaid {
                order_id: pos_id.to_string(),
                total: order.total,
                captured,
            });
        }

        order.status = OrderStatus::Complete;
        order.updated_at = now_millis();
        self.retire(&order)?;
        tracing::info!(order_id = %pos_id, doshii_id = ?order.doshii_id, total = %format_cents(order.total), "Order completed");

        let receipt = self.send_update(&order).await?;
        order.version = Some(receipt.version);
        Ok(order)
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn retrieve_order(&self, pos_id: &str) -> ManagerResult<Order> {
        self.active(pos_id)
    }

    pub fn active_orders(&self) -> Vec<Order> {
        self.store.active_orders()
    }

    pub fn outcome_for(&self, doshii_id: &str) -> Option<OrderOutcome> {
        self.store.outcome_for(doshii_id)
    }

    /// Active POS id for a POS id or a Doshii id
    pub fn resolve_pos_id(&self, reference: &str) -> Option<String> {
        if self.store.contains(reference) {
            return Some(reference.to_string());
        }
        self.store.pos_id_for(reference)
    }

    /// Like [`resolve_pos_id`](Self::resolve_pos_id), also for orders that
    /// already left the active store
    pub fn resolve_any_pos_id(&self, reference: &str) -> String {
        self.resolve_pos_id(reference)
            .or_else(|| self.store.outcome_for(reference).and_then(|o| o.pos_id))
            .unwrap_or_else(|| reference.to_string())
    }

    // ========================================================================
    // Crate internals
    // ========================================================================

    pub(crate) async fn lock_order(&self, pos_id: &str) -> OrderGuard {
        self.store.lock(pos_id).await
    }

    pub(crate) fn store(&self) -> &OrderStore {
        &self.store
    }

    pub(crate) fn allow_partial_payment(&self, order: &Order) -> bool {
        self.policy.allow_partial_payment(order)
    }

    fn active(&self, pos_id: &str) -> ManagerResult<Order> {
        self.store
            .get(pos_id)
            .ok_or_else(|| ManagerError::OrderNotFound(pos_id.to_string()))
    }

    fn resolve_active(&self, order: &Order) -> Option<String> {
        order
            .id
            .as_deref()
            .and_then(|id| self.resolve_pos_id(id))
            .or_else(|| order.doshii_id.as_deref().and_then(|id| self.store.pos_id_for(id)))
    }

    fn ignore_or_not_found<T>(&self, order: &Order, event: &str) -> ManagerResult<Option<T>> {
        let decided = order
            .doshii_id
            .as_deref()
            .and_then(|id| self.store.outcome_for(id));
        match decided {
            Some(outcome) => {
                tracing::debug!(
                    doshii_id = %outcome.doshii_id,
                    status = %outcome.status,
                    kind = event,
                    "Order no longer active, ignoring"
                );
                Ok(None)
            }
            None => Err(ManagerError::OrderNotFound(order.display_id().to_string())),
        }
    }

    /// Remove a terminal order from the active store and ledger
    fn retire(&self, order: &Order) -> ManagerResult<()> {
        let pos_id = order.display_id();
        self.store.remove(pos_id)?;
        self.ledger.remove(pos_id)?;
        if let Some(doshii_id) = order.doshii_id.as_deref()
            && let Some(mut outcome) = self.store.outcome_for(doshii_id)
        {
            outcome.status = order.status;
            self.store.record_outcome(outcome)?;
        }
        Ok(())
    }

    /// Record a receipt's version (and Doshii id) on an active order
    fn apply_receipt(&self, pos_id: &str, receipt: &ReportReceipt) -> ManagerResult<()> {
        let Some(mut order) = self.store.get(pos_id) else {
            return Ok(());
        };
        self.ledger.record_version(pos_id, &receipt.version)?;
        order.version = Some(receipt.version.clone());
        if order.doshii_id.is_none() {
            order.doshii_id = receipt.doshii_id.clone();
        }
        self.store.replace(order)?;
        Ok(())
    }

    async fn send_update(&self, order: &Order) -> ManagerResult<ReportReceipt> {
        let reporter = self.reporter.clone();
        let snapshot = order.clone();
        let receipt = deliver(self.report_timeout, async move {
            reporter.update_order(&snapshot).await
        })
        .await
        .inspect_err(|e| {
            tracing::error!(order_id = %order.display_id(), status = %order.status, error = %e, "Failed to report order update");
        })?;
        Ok(receipt)
    }
}
