//! Event Router - 事件路由与分发
//!
//! 把 socket 推送的 CloudEvent 交给对应的工作流。
//!
//! ```text
//! SocketWorker ── mpsc ──► EventRouter
//!                             ├── order_created          → SdkState::evaluate_new_order
//!                             ├── order_updated          → OrdersManager::apply_cloud_update
//!                             ├── order_venue_cancelled  → OrdersManager::process_venue_cancellation
//!                             ├── transaction_created    → payment / refund readiness
//!                             ├── transaction_cancelled  → TransactionsManager::cancel_payment
//!                             └── transaction_completed  → record payment / refund
//! ```
//!
//! 事件按到达顺序逐个处理；declined 的 ready-to-pay / ready-to-refund
//! 通过 `reject_transaction` 回报给 Doshii。

use shared::cloud::CloudEvent;
use shared::error::AppError;
use shared::order::{Rejection, Transaction};
use tokio::sync::mpsc;

use crate::core::SdkState;
use crate::orders::ManagerError;
use crate::transactions::PaymentReadiness;

/// 事件路由器
pub struct EventRouter {
    state: SdkState,
}

impl EventRouter {
    pub fn new(state: SdkState) -> Self {
        Self { state }
    }

    /// 运行路由器（阻塞直到源通道关闭）
    pub async fn run(self, mut source: mpsc::Receiver<CloudEvent>) {
        tracing::info!("Event router started");
        while let Some(event) = source.recv().await {
            // Failures are logged by dispatch
            let _ = self.dispatch(event).await;
        }
        tracing::info!("Source channel closed, event router stopping");
    }

    /// 分发单个事件
    pub async fn dispatch(&self, event: CloudEvent) -> Result<(), AppError> {
        let kind = event.kind();
        tracing::debug!(event = kind, "Dispatching cloud event");

        let result = match event {
            CloudEvent::OrderCreated {
                order,
                consumer,
                transactions,
            } => self
                .state
                .evaluate_new_order(order, &consumer, transactions)
                .await
                .map(|outcome| {
                    tracing::debug!(
                        doshii_id = %outcome.doshii_id,
                        pos_id = ?outcome.pos_id,
                        status = %outcome.status,
                        "Order decided"
                    );
                }),
            CloudEvent::OrderUpdated { order } => self
                .state
                .orders
                .apply_cloud_update(order)
                .await
                .map(|_| ()),
            CloudEvent::OrderVenueCancelled { order } => self
                .state
                .orders
                .process_venue_cancellation(order)
                .await
                .map(|_| ()),
            CloudEvent::TransactionCreated { transaction } => {
                self.transaction_created(transaction).await
            }
            CloudEvent::TransactionCancelled { transaction } => self
                .state
                .transactions
                .cancel_payment(&transaction)
                .await
                .map(|_| ()),
            CloudEvent::TransactionCompleted { transaction } => {
                if transaction.amount < 0 {
                    self.state
                        .transactions
                        .record_successful_refund(transaction)
                        .await
                        .map(|_| ())
                } else {
                    self.state
                        .transactions
                        .record_successful_payment(transaction)
                        .await
                        .map(|_| ())
                }
            }
        };

        result.map_err(|e| {
            let err = AppError::from(e);
            tracing::error!(
                event = kind,
                error_code = %err.code,
                error = %err.message,
                "Cloud event failed"
            );
            err
        })
    }

    /// Ready-to-pay (amount ≥ 0) or ready-to-refund (amount < 0)
    async fn transaction_created(&self, trx: Transaction) -> Result<(), ManagerError> {
        let payments = &self.state.transactions;
        let readiness = if trx.amount < 0 {
            payments.evaluate_refund_readiness(trx.clone()).await
        } else {
            payments.evaluate_payment_readiness(trx.clone()).await
        };

        match readiness {
            Ok(PaymentReadiness::Ready(_)) => Ok(()),
            Ok(PaymentReadiness::Declined { code, reason }) => {
                payments
                    .report_decline(&trx, Rejection::new(code, reason))
                    .await
            }
            // Business failures are answered like declines; system failures are left to redelivery
            Err(e) if e.code().category().is_decline() => {
                payments
                    .report_decline(&trx, Rejection::new(e.code(), e.to_string()))
                    .await?;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{RecordingReporter, ReportCall};
    use crate::core::Config;
    use crate::orders::OrderStorage;
    use crate::pos::AutoAcceptPolicy;
    use shared::error::ErrorCode;
    use shared::order::{Consumer, Order, OrderItem, OrderStatus};
    use std::collections::HashMap;
    use std::sync::Arc;

    fn create_router() -> (EventRouter, SdkState, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::new());
        let state = SdkState::new(
            Config::with_work_dir("unused"),
            OrderStorage::open_in_memory().unwrap(),
            reporter.clone(),
            Arc::new(AutoAcceptPolicy::default()),
            Arc::new(HashMap::<String, String>::new()),
        )
        .unwrap();
        (EventRouter::new(state.clone()), state, reporter)
    }

    fn order_created(doshii_id: &str, total: i64) -> CloudEvent {
        CloudEvent::OrderCreated {
            order: Order::pending(doshii_id, vec![OrderItem::new("dish", "Dish", 1, total)]),
            consumer: Consumer::default(),
            transactions: vec![],
        }
    }

    #[tokio::test]
    async fn test_order_created_is_accepted() {
        let (router, state, _reporter) = create_router();
        router.dispatch(order_created("d-1", 1200)).await.unwrap();

        let outcome = state.orders.outcome_for("d-1").unwrap();
        assert_eq!(outcome.status, OrderStatus::Accepted);
        assert!(outcome.reported);
    }

    #[tokio::test]
    async fn test_declined_payment_is_reported() {
        let (router, _state, reporter) = create_router();
        router.dispatch(order_created("d-1", 1200)).await.unwrap();

        router
            .dispatch(CloudEvent::TransactionCreated {
                transaction: Transaction::capture("t-1", "d-1", 999),
            })
            .await
            .unwrap();

        assert_eq!(
            reporter.calls().last(),
            Some(&ReportCall::RejectTransaction {
                trx_id: "t-1".into(),
                code: ErrorCode::PaymentAmountMismatch,
            })
        );
    }

    #[tokio::test]
    async fn test_payment_for_unknown_order_is_declined() {
        let (router, _state, reporter) = create_router();

        let err = router
            .dispatch(CloudEvent::TransactionCreated {
                transaction: Transaction::capture("t-1", "d-missing", 500),
            })
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::OrderNotFound);
        assert_eq!(
            reporter.calls(),
            vec![ReportCall::RejectTransaction {
                trx_id: "t-1".into(),
                code: ErrorCode::OrderNotFound,
            }]
        );
    }

    #[tokio::test]
    async fn test_run_processes_events_in_order() {
        let (router, state, _reporter) = create_router();
        let (tx, rx) = mpsc::channel(16);
        let handle = tokio::spawn(router.run(rx));

        tx.send(order_created("d-1", 1200)).await.unwrap();
        tx.send(CloudEvent::TransactionCreated {
            transaction: Transaction::capture("t-1", "d-1", 1200),
        })
        .await
        .unwrap();
        tx.send(CloudEvent::TransactionCompleted {
            transaction: Transaction::capture("t-1", "d-1", 1200),
        })
        .await
        .unwrap();
        drop(tx);
        handle.await.unwrap();

        assert_eq!(
            state.orders.outcome_for("d-1").unwrap().status,
            OrderStatus::Complete
        );
        assert!(state.orders.active_orders().is_empty());
    }
}
