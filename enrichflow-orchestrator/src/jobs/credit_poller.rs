use std::sync::Arc;
use std::time::Duration;

use crate::helpers::credit_ledger::CreditLedger;
use crate::jobs::refresh_registry::RefreshRegistry;

pub const CREDIT_POLLER: &str = "credits";

/// Keeps the displayed balance close to the server's between launches.
pub async fn register(registry: &Arc<RefreshRegistry>, ledger: Arc<CreditLedger>, period: Duration) {
    registry
        .register(CREDIT_POLLER, period, move || {
            let ledger = ledger.clone();
            async move {
                ledger.force_resync().await?;
                anyhow::Ok(())
            }
        })
        .await;
}
