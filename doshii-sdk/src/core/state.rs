use std::sync::Arc;

use shared::order::{Consumer, Order, OrderOutcome, Transaction};

use crate::cloud::CloudReporter;
use crate::core::Config;
use crate::orders::{ManagerResult, OrderStorage, OrderStore, OrdersManager, VersionLedger};
use crate::pos::{CatalogLookup, OrderingPolicy};
use crate::transactions::{TransactionStore, TransactionsManager};

/// SDK 状态 - 持有所有工作流的共享引用
///
/// 使用 Arc 实现浅拷贝，所有权成本极低。没有全局状态：宿主 POS 持有
/// 一个 SdkState，socket worker 和事件路由共享它的克隆。
///
/// # 组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | orders | Arc<OrdersManager> | 订单受理工作流 |
/// | transactions | Arc<TransactionsManager> | 支付/退款工作流 |
/// | reporter | Arc<dyn CloudReporter> | Doshii 上报通道 |
#[derive(Clone)]
pub struct SdkState {
    /// SDK 配置
    pub config: Config,
    /// 订单受理工作流
    pub orders: Arc<OrdersManager>,
    /// 支付/退款工作流
    pub transactions: Arc<TransactionsManager>,
    /// Doshii 上报通道
    pub reporter: Arc<dyn CloudReporter>,
}

impl std::fmt::Debug for SdkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SdkState")
            .field("config", &self.config)
            .field("orders", &self.orders)
            .field("transactions", &self.transactions)
            .finish_non_exhaustive()
    }
}

impl SdkState {
    /// 从存储恢复所有 store 并组装工作流
    pub fn new(
        config: Config,
        storage: OrderStorage,
        reporter: Arc<dyn CloudReporter>,
        policy: Arc<dyn OrderingPolicy>,
        catalog: Arc<dyn CatalogLookup>,
    ) -> ManagerResult<Self> {
        let store = Arc::new(OrderStore::restore(storage.clone())?);
        let ledger = Arc::new(VersionLedger::restore(storage.clone())?);
        let issued = storage.get_order_count()?;
        let trx_store = Arc::new(TransactionStore::restore(storage)?);

        let orders = Arc::new(
            OrdersManager::new(
                store,
                ledger.clone(),
                trx_store.clone(),
                reporter.clone(),
                policy,
                catalog,
            )
            .with_placeholder_product(config.placeholder_product_id.clone())
            .with_report_timeout(config.report_timeout()),
        );
        let transactions = Arc::new(
            TransactionsManager::new(orders.clone(), trx_store, ledger, reporter.clone())
                .with_report_timeout(config.report_timeout()),
        );

        tracing::info!(
            active_orders = orders.active_orders().len(),
            pos_ids_issued = issued,
            location_id = %config.location_id,
            "SDK state initialized"
        );
        Ok(Self {
            config,
            orders,
            transactions,
            reporter,
        })
    }

    /// Decide on an inbound order
    ///
    /// Bundled payments are recorded under the order lock once the
    /// acceptance has been acknowledged; a redelivery after a failed report
    /// records them then.
    pub async fn evaluate_new_order(
        &self,
        order: Order,
        consumer: &Consumer,
        transactions: Vec<Transaction>,
    ) -> ManagerResult<OrderOutcome> {
        self.orders
            .evaluate_new_order(order, consumer, &transactions)
            .await
    }
}
