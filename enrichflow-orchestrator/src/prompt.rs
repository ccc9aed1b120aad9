use anyhow::Result;
use dialoguer::{Input, MultiSelect};
use enrichflow_orchestrator::helpers::confirmation_gate::ConfirmationGate;
use shared_types::EnrichmentChoice;
use std::sync::Arc;
use tokio::task::JoinHandle;

const FIELDS: [&str; 2] = ["Email", "Phone"];
/// The user has to pick at least one field themselves.
const INITIAL_SELECTION: [bool; 2] = [false; 2];

/// Terminal stand-in for the enrichment modal: answers every request the
/// gate opens until the gate goes away.
pub fn spawn_confirmation_prompt(gate: Arc<ConfirmationGate>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut requests = gate.subscribe();

        loop {
            let request = match requests.wait_for(|request| request.is_some()).await {
                Ok(request) => request.clone(),
                Err(_) => break,
            };
            let Some(request) = request else {
                continue;
            };

            let label = request.label.clone();
            let answer = tokio::task::spawn_blocking(move || ask(&label)).await;

            let result = match answer {
                Ok(Ok(Some(choice))) => gate.submit(request.id, choice),
                Ok(Ok(None)) => gate.cancel(request.id),
                Ok(Err(e)) => {
                    tracing::warn!("Enrichment prompt failed: {}", e);
                    gate.cancel(request.id)
                }
                Err(e) => {
                    tracing::error!("Enrichment prompt task panicked: {}", e);
                    gate.cancel(request.id)
                }
            };

            if let Err(e) = result {
                tracing::debug!("Confirmation {} already settled: {}", request.id, e);
            }
        }
    })
}

/// `None` when the user escapes out of the prompt.
fn ask(label: &str) -> Result<Option<EnrichmentChoice>> {
    loop {
        let selected = MultiSelect::new()
            .with_prompt(format!("Enrich {} with (space to toggle, esc to cancel)", label))
            .items(&FIELDS)
            .defaults(&INITIAL_SELECTION)
            .interact_opt()?;

        let Some(selected) = selected else {
            return Ok(None);
        };

        let filename: String = Input::new()
            .with_prompt("Job name (leave empty for the default)")
            .allow_empty(true)
            .interact_text()?;

        let choice = choice_from(&selected, filename);

        match choice.clone().validate() {
            Ok(_) => return Ok(Some(choice)),
            Err(e) => eprintln!("  {}", e),
        }
    }
}

fn choice_from(selected: &[usize], filename: String) -> EnrichmentChoice {
    EnrichmentChoice {
        email: selected.contains(&0),
        phone: selected.contains(&1),
        filename: Some(filename),
    }
}
