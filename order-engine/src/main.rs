use order_engine::{OrdersManager, print_banner, setup_environment};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Environment (dotenv, logging)
    let config = setup_environment()?;

    print_banner();
    tracing::info!(environment = %config.environment, "Order engine starting...");

    // 2. Open the store and keep the working copy in sync
    let manager = OrdersManager::open(&config)?;
    let sync = manager.start_sync()?;

    // 3. Flush the manual email queue once
    let report = manager.retry_pending_emails().await?;
    tracing::info!(
        sent = report.sent.len(),
        failed = report.failed.len(),
        "Manual email queue processed"
    );
    for (order_id, reason) in &report.failed {
        tracing::warn!(order_id = %order_id, reason = %reason, "Email still pending");
    }

    let remaining = manager.pending_emails()?;
    if !remaining.is_empty() {
        tracing::warn!(count = remaining.len(), "Orders waiting for a manual email");
    }

    sync.abort();
    Ok(())
}
