use chrono::Utc;
use shared_types::{ConfirmationRequest, ConfirmedEnrichment, EnrichmentChoice, ValidationError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::{oneshot, watch};
use uuid::Uuid;

use crate::jobs::refresh_registry::RefreshRegistry;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// Callers must wait for the open confirmation to settle before asking again
    #[error("An enrichment confirmation is already open")]
    AlreadyPending,

    #[error("No enrichment confirmation is open")]
    NothingPending,

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

struct PendingConfirmation {
    request: ConfirmationRequest,
    responder: oneshot::Sender<Option<ConfirmedEnrichment>>,
}

/// Single-slot "choose enrichment type" step shared by every import source.
///
/// `confirm` parks the caller until the presentation layer answers through
/// `submit` or `cancel`, quoting the id of the request it rendered. Only one request can be open at a time; a second
/// `confirm` fails with [`GateError::AlreadyPending`] instead of queueing.
/// Background refresh is paused for as long as a request is open.
pub struct ConfirmationGate {
    slot: Mutex<Option<PendingConfirmation>>,
    current: watch::Sender<Option<ConfirmationRequest>>,
    refresh: Option<Arc<RefreshRegistry>>,
}

impl ConfirmationGate {
    pub fn new(refresh: Option<Arc<RefreshRegistry>>) -> Self {
        let (current, _) = watch::channel(None);
        Self {
            slot: Mutex::new(None),
            current,
            refresh,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Option<PendingConfirmation>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Asks the user how `label` should be enriched. Resolves to `None` when
    /// the user cancels; that is a normal outcome, not an error.
    pub async fn confirm(&self, label: &str) -> Result<Option<ConfirmedEnrichment>, GateError> {
        let (responder, response) = oneshot::channel();
        let request = ConfirmationRequest {
            id: Uuid::new_v4(),
            label: label.to_string(),
            requested_at: Utc::now(),
        };

        // Taken before the request is published so observers always see refresh paused.
        let _pause = self.refresh.as_ref().map(|registry| registry.pause());

        {
            let mut slot = self.slot();
            if slot.is_some() {
                tracing::warn!("Confirmation for {} requested while another is open", label);
                return Err(GateError::AlreadyPending);
            }
            *slot = Some(PendingConfirmation {
                request: request.clone(),
                responder,
            });
            self.current.send_replace(Some(request.clone()));
        }

        // Dropped before `_pause`: the slot is released, then refresh resumes.
        let _release = SlotRelease {
            gate: self,
            id: request.id,
        };

        tracing::info!("Waiting for enrichment confirmation: {}", label);

        let outcome = response.await.unwrap_or(None);

        match &outcome {
            Some(confirmed) => tracing::info!(
                "Confirmed {} enrichment for {}",
                confirmed.config.describe(),
                label
            ),
            None => tracing::info!("Enrichment cancelled for {}", label),
        }

        Ok(outcome)
    }

    /// Answers request `id`. An invalid choice (no field selected, bad
    /// filename) is rejected and the request stays open.
    ///
    /// Answers meant for a request that is no longer open fail with
    /// [`GateError::NothingPending`] and leave any newer request untouched.
    pub fn submit(&self, id: Uuid, choice: EnrichmentChoice) -> Result<(), GateError> {
        let confirmed = choice.validate()?;
        let pending = self.take(id)?;
        let _ = pending.responder.send(Some(confirmed));
        Ok(())
    }

    pub fn cancel(&self, id: Uuid) -> Result<(), GateError> {
        let pending = self.take(id)?;
        let _ = pending.responder.send(None);
        Ok(())
    }

    fn take(&self, id: Uuid) -> Result<PendingConfirmation, GateError> {
        let mut slot = self.slot();
        match slot.as_ref() {
            Some(pending) if pending.request.id == id => {}
            Some(pending) => {
                tracing::debug!(
                    "Ignoring answer for {}, {} is open instead",
                    id,
                    pending.request.id
                );
                return Err(GateError::NothingPending);
            }
            None => return Err(GateError::NothingPending),
        }
        let pending = slot.take().ok_or(GateError::NothingPending)?;
        self.current.send_replace(None);
        Ok(pending)
    }

    pub fn pending(&self) -> Option<ConfirmationRequest> {
        self.current.borrow().clone()
    }

    pub fn is_pending(&self) -> bool {
        self.slot().is_some()
    }

    /// Open request for the modal to render; `None` when nothing is open.
    pub fn subscribe(&self) -> watch::Receiver<Option<ConfirmationRequest>> {
        self.current.subscribe()
    }
}

impl Default for ConfirmationGate {
    fn default() -> Self {
        Self::new(None)
    }
}

/// Frees the slot if `confirm` ends without an answer (its future was dropped).
struct SlotRelease<'a> {
    gate: &'a ConfirmationGate,
    id: Uuid,
}

impl Drop for SlotRelease<'_> {
    fn drop(&mut self) {
        let mut slot = self.gate.slot();
        let ours = slot
            .as_ref()
            .map(|pending| pending.request.id == self.id)
            .unwrap_or(false);
        if ours {
            *slot = None;
            self.gate.current.send_replace(None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::EnrichmentConfig;
    use std::time::Duration;

    async fn wait_for_request(gate: &ConfirmationGate) -> ConfirmationRequest {
        let mut current = gate.subscribe();
        let request = current
            .wait_for(|request| request.is_some())
            .await
            .unwrap()
            .clone();
        request.unwrap()
    }

    #[tokio::test]
    async fn test_confirm_resolves_with_choice() {
        let gate = Arc::new(ConfirmationGate::default());

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.confirm("leads.csv").await })
        };

        let request = wait_for_request(&gate).await;
        assert_eq!(request.label, "leads.csv");
        assert!(gate.is_pending());

        gate.submit(request.id, EnrichmentChoice {
            email: true,
            phone: false,
            filename: None,
        })
        .unwrap();

        let confirmed = waiter.await.unwrap().unwrap().unwrap();
        assert_eq!(confirmed.config, EnrichmentConfig::new(true, false).unwrap());
        assert_eq!(confirmed.filename, None);
        assert!(!gate.is_pending());
        assert!(gate.pending().is_none());
    }

    #[tokio::test]
    async fn test_cancel_resolves_none() {
        let gate = Arc::new(ConfirmationGate::default());

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.confirm("3 manual contacts").await })
        };

        let request = wait_for_request(&gate).await;
        gate.cancel(request.id).unwrap();

        assert_eq!(waiter.await.unwrap(), Ok(None));
    }

    #[tokio::test]
    async fn test_invalid_choice_keeps_request_open() {
        let gate = Arc::new(ConfirmationGate::default());

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.confirm("leads.csv").await })
        };

        let request = wait_for_request(&gate).await;

        assert_eq!(
            gate.submit(request.id, EnrichmentChoice::default()),
            Err(GateError::Invalid(ValidationError::NoEnrichmentField))
        );
        assert!(gate.is_pending());

        gate.submit(request.id, EnrichmentChoice {
            email: false,
            phone: true,
            filename: Some("phones".to_string()),
        })
        .unwrap();

        let confirmed = waiter.await.unwrap().unwrap().unwrap();
        assert!(confirmed.config.phone());
        assert_eq!(confirmed.filename.as_deref(), Some("phones"));
    }

    #[tokio::test]
    async fn test_second_confirm_rejected() {
        let gate = Arc::new(ConfirmationGate::default());

        let first = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.confirm("first").await })
        };
        let request = wait_for_request(&gate).await;

        assert_eq!(gate.confirm("second").await, Err(GateError::AlreadyPending));

        // the first request is untouched
        assert_eq!(gate.pending().unwrap().label, "first");
        gate.cancel(request.id).unwrap();
        assert_eq!(first.await.unwrap(), Ok(None));
    }

    #[tokio::test]
    async fn test_answer_without_request() {
        let gate = ConfirmationGate::default();

        assert_eq!(gate.cancel(Uuid::new_v4()), Err(GateError::NothingPending));
        assert_eq!(
            gate.submit(Uuid::new_v4(), EnrichmentChoice {
                email: true,
                phone: false,
                filename: None,
            }),
            Err(GateError::NothingPending)
        );
    }

    #[tokio::test]
    async fn test_refresh_paused_while_open() {
        let registry = Arc::new(RefreshRegistry::new());
        let gate = Arc::new(ConfirmationGate::new(Some(registry.clone())));

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.confirm("leads.csv").await })
        };

        let request = wait_for_request(&gate).await;
        assert!(registry.is_paused());

        gate.cancel(request.id).unwrap();
        waiter.await.unwrap().unwrap();
        assert!(!registry.is_paused());
    }

    #[tokio::test]
    async fn test_dropped_confirm_releases_slot_and_resumes() {
        let registry = Arc::new(RefreshRegistry::new());
        let gate = Arc::new(ConfirmationGate::new(Some(registry.clone())));

        let abandoned = tokio::time::timeout(Duration::from_millis(20), gate.confirm("abandoned")).await;
        assert!(abandoned.is_err());

        assert!(!gate.is_pending());
        assert!(gate.pending().is_none());
        assert!(!registry.is_paused());

        // the gate is usable again
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.confirm("retry").await })
        };
        let request = wait_for_request(&gate).await;
        gate.cancel(request.id).unwrap();
        assert_eq!(waiter.await.unwrap(), Ok(None));
    }

    #[tokio::test]
    async fn test_late_answer_does_not_resolve_newer_request() {
        let gate = Arc::new(ConfirmationGate::default());

        let stale = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.confirm("500 contacts imported from HubSpot").await })
        };
        let first = wait_for_request(&gate).await;
        stale.abort();
        let _ = stale.await;
        assert!(!gate.is_pending());

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.confirm("leads.csv").await })
        };
        let mut current = gate.subscribe();
        let second = current
            .wait_for(|request| request.as_ref().map(|r| r.label == "leads.csv").unwrap_or(false))
            .await
            .unwrap()
            .clone()
            .unwrap();

        let phone = EnrichmentChoice {
            email: false,
            phone: true,
            filename: None,
        };
        assert_eq!(gate.submit(first.id, phone.clone()), Err(GateError::NothingPending));
        assert_eq!(gate.cancel(first.id), Err(GateError::NothingPending));
        assert!(gate.is_pending());
        assert_eq!(gate.pending().map(|r| r.id), Some(second.id));

        gate.submit(second.id, EnrichmentChoice {
            email: true,
            phone: false,
            filename: None,
        })
        .unwrap();

        let confirmed = waiter.await.unwrap().unwrap().unwrap();
        assert!(confirmed.config.email());
        assert!(!confirmed.config.phone());
    }

    #[tokio::test]
    async fn test_published_request_matches_slot() {
        let gate = Arc::new(ConfirmationGate::default());
        let mut current = gate.subscribe();

        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { gate.confirm("leads.csv").await })
        };

        let request = current
            .wait_for(|request| request.is_some())
            .await
            .unwrap()
            .clone()
            .unwrap();
        gate.cancel(request.id).unwrap();

        // cleared in the same step that emptied the slot
        assert!(gate.pending().is_none());
        assert!(!gate.is_pending());
        assert_eq!(waiter.await.unwrap(), Ok(None));
    }
}
