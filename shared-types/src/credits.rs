use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Locally known credit balance. `remaining` is an estimate between resyncs and may go negative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CreditLedgerState {
    pub remaining: i64,
    pub last_synced_at: Option<DateTime<Utc>>,
}

impl Default for CreditLedgerState {
    fn default() -> Self {
        Self {
            remaining: 0,
            last_synced_at: None,
        }
    }
}

/// Emitted every time the ledger changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum LedgerEvent {
    Debited {
        amount: u64,
        reason: String,
        remaining: i64,
    },
    Resynced {
        remaining: i64,
        previous: i64,
    },
}
