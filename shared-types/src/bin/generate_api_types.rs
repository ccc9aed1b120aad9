use shared_types::*;
use std::fs;
use std::path::Path;
use ts_rs::TS;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Generate TypeScript definitions for the dashboard
    let mut types = Vec::new();

    // Contact types
    types.push(clean_type(ContactField::export_to_string()?));
    types.push(clean_type(ContactDraft::export_to_string()?));

    // Enrichment confirmation types
    types.push(clean_type(EnrichmentConfig::export_to_string()?));
    types.push(clean_type(EnrichmentChoice::export_to_string()?));
    types.push(clean_type(ConfirmedEnrichment::export_to_string()?));
    types.push(clean_type(ConfirmationRequest::export_to_string()?));

    // Integration types
    types.push(clean_type(Provider::export_to_string()?));

    // Job types
    types.push(clean_type(JobStatus::export_to_string()?));
    types.push(clean_type(EnrichmentJob::export_to_string()?));
    types.push(clean_type(JobsResponse::export_to_string()?));

    // Credit types
    types.push(clean_type(CreditLedgerState::export_to_string()?));
    types.push(clean_type(LedgerEvent::export_to_string()?));

    // Request and response bodies
    types.push(clean_type(UploadResponse::export_to_string()?));
    types.push(clean_type(ManualImportRequest::export_to_string()?));
    types.push(clean_type(ManualImportResponse::export_to_string()?));
    types.push(clean_type(CrmImportResponse::export_to_string()?));
    types.push(clean_type(EnrichRequest::export_to_string()?));
    types.push(clean_type(CreditBalanceResponse::export_to_string()?));
    types.push(clean_type(ExportRequest::export_to_string()?));
    types.push(clean_type(ExportResponse::export_to_string()?));
    types.push(clean_type(ErrorResponse::export_to_string()?));

    let output_dir = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "../dashboard/src/api-types".to_string());
    let output_dir = Path::new(&output_dir);
    fs::create_dir_all(output_dir)?;

    let output_path = output_dir.join("types.ts");
    let output = types.join("\n\n");

    fs::write(&output_path, output)?;
    println!("Generated TypeScript types in {}", output_path.display());

    Ok(())
}

/// Strips the per-file header and imports; every definition ends up in the
/// same `types.ts`, so cross references resolve without them.
fn clean_type(type_def: String) -> String {
    let body = type_def
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.starts_with("import type")
                && !trimmed.starts_with("// This file was generated")
                && !trimmed.starts_with("/* This file was generated")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{}\n", body.trim())
}
