mod pos;

use std::sync::Arc;

use anyhow::Context;
use doshii_sdk::{
    CloudReporter, Config, DoshiiClient, EventRouter, OrderStorage, RecordingReporter, SdkState,
    SocketWorker, init_logger_with_file,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::pos::{SampleCatalog, SamplePolicy};

/// Socket → router queue depth
const EVENT_QUEUE_CAPACITY: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境 (dotenv, 日志)
    dotenv::dotenv().ok();
    let config = Config::from_env();
    init_logger_with_file(
        Some(config.log_level.as_str()),
        config.log_dir.is_some(),
        config.log_dir.as_deref(),
    );

    tracing::info!(location_id = %config.location_id, "Sample POS starting...");

    // 2. 存储
    std::fs::create_dir_all(&config.work_dir)
        .with_context(|| format!("Failed to create work dir {}", config.work_dir))?;
    let storage = OrderStorage::open(config.orders_db_path())
        .with_context(|| format!("Failed to open {}", config.orders_db_path().display()))?;

    // 3. 上报通道：无 token 时离线运行
    let reporter: Arc<dyn CloudReporter> = if config.is_offline() {
        tracing::warn!("No vendor token configured, running offline");
        Arc::new(RecordingReporter::new())
    } else {
        Arc::new(DoshiiClient::new(
            &config.api_url,
            &config.vendor_token,
            &config.location_id,
        )?)
    };

    // 4. 工作流
    let state = SdkState::new(
        config.clone(),
        storage,
        reporter,
        Arc::new(SamplePolicy::default()),
        Arc::new(SampleCatalog),
    )?;

    // 5. 后台任务
    let shutdown = CancellationToken::new();
    let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    let router = tokio::spawn(EventRouter::new(state.clone()).run(events_rx));

    let worker = if config.is_offline() {
        drop(events_tx);
        None
    } else {
        let worker = SocketWorker::new(&config, events_tx, shutdown.clone());
        Some(tokio::spawn(worker.run()))
    };

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for ctrl-c")?;
    tracing::info!("Shutdown requested");
    shutdown.cancel();

    // Worker exit drops the sender, which ends the router
    if let Some(worker) = worker {
        worker.await.context("Socket worker panicked")?;
    }
    router.await.context("Event router panicked")?;

    tracing::info!(
        active_orders = state.orders.active_orders().len(),
        "Sample POS stopped"
    );
    Ok(())
}
