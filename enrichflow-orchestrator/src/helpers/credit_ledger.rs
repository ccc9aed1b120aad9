use chrono::Utc;
use serde::{Deserialize, Serialize};
use shared_types::{CreditLedgerState, EnrichmentConfig, LedgerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;

use crate::integrations::{ApiError, EnrichmentApi};
use crate::jobs::refresh_registry::RefreshRegistry;

/// Registry name of the resync that follows a launch
pub const CREDIT_RESYNC: &str = "credit-resync";

/// Credits charged per contact for each enrichment field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditCosts {
    pub email_per_contact: u64,
    pub phone_per_contact: u64,
}

impl Default for CreditCosts {
    fn default() -> Self {
        Self {
            email_per_contact: 1,
            phone_per_contact: 10,
        }
    }
}

impl CreditCosts {
    /// Estimated charge for enriching `contacts` contacts. Never below one credit.
    pub fn estimate(&self, contacts: u32, config: EnrichmentConfig) -> u64 {
        let mut per_contact = 0;
        if config.email() {
            per_contact += self.email_per_contact;
        }
        if config.phone() {
            per_contact += self.phone_per_contact;
        }
        (u64::from(contacts) * per_contact).max(1)
    }
}

/// Local view of the account's remaining credits.
///
/// `debit` applies an estimate straight away so the dashboard reflects a
/// launch before the server has charged it; `force_resync` replaces whatever
/// the estimate says with the server's number. The value is for display
/// only: the server decides whether a launch is affordable.
pub struct CreditLedger {
    api: Arc<dyn EnrichmentApi>,
    state: Mutex<CreditLedgerState>,
    events: broadcast::Sender<LedgerEvent>,
    refresh: Option<Arc<RefreshRegistry>>,
}

impl CreditLedger {
    pub fn new(api: Arc<dyn EnrichmentApi>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            api,
            state: Mutex::new(CreditLedgerState::default()),
            events,
            refresh: None,
        }
    }

    /// Scheduled resyncs run through `registry` and so hold off while it is paused.
    pub fn with_refresh(mut self, registry: Arc<RefreshRegistry>) -> Self {
        self.refresh = Some(registry);
        self
    }

    pub async fn snapshot(&self) -> CreditLedgerState {
        self.state.lock().await.clone()
    }

    pub async fn remaining(&self) -> i64 {
        self.state.lock().await.remaining
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Optimistic local charge; may take `remaining` below zero.
    pub async fn debit(&self, amount: u64, reason: &str) -> i64 {
        let remaining = {
            let mut state = self.state.lock().await;
            let amount = i64::try_from(amount).unwrap_or(i64::MAX);
            state.remaining = state.remaining.saturating_sub(amount);
            state.remaining
        };

        tracing::debug!("Debited {} credits ({}), {} estimated left", amount, reason, remaining);

        let _ = self.events.send(LedgerEvent::Debited {
            amount,
            reason: reason.to_string(),
            remaining,
        });

        remaining
    }

    /// Fetches the real balance and overwrites the local estimate.
    pub async fn force_resync(&self) -> Result<CreditLedgerState, ApiError> {
        let remaining = self.api.credit_balance().await?;

        let (snapshot, previous) = {
            let mut state = self.state.lock().await;
            let previous = state.remaining;
            state.remaining = remaining;
            state.last_synced_at = Some(Utc::now());
            (state.clone(), previous)
        };

        if previous != remaining {
            tracing::debug!("Credit balance resynced: {} -> {}", previous, remaining);
        }

        let _ = self.events.send(LedgerEvent::Resynced {
            remaining,
            previous,
        });

        Ok(snapshot)
    }

    /// Resyncs once `delay` has passed, giving the server time to settle a charge.
    /// With a refresh registry attached, a resync that falls due while refresh
    /// is paused runs after the resume.
    pub fn schedule_resync(self: &Arc<Self>, delay: Duration) -> JoinHandle<()> {
        let ledger = self.clone();
        let resync = move || {
            let ledger = ledger.clone();
            async move {
                ledger.force_resync().await?;
                anyhow::Ok(())
            }
        };

        match &self.refresh {
            Some(registry) => registry.run_once(CREDIT_RESYNC, delay, resync),
            None => tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = resync().await {
                    tracing::warn!("Scheduled credit resync failed: {}", e);
                }
            }),
        }
    }
}
