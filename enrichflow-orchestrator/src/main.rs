use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use enrichflow_orchestrator::config::ClientConfig;
use enrichflow_orchestrator::helpers::navigator::{MemoryNavigator, Navigator};
use enrichflow_orchestrator::jobs::launcher::describe_source;
use enrichflow_orchestrator::{ImportOrchestrator, ImportOutcome, ResumptionOutcome};
use shared_types::{ContactDraft, Provider};
use sources::ManualContactAdapter;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::prelude::*;

mod prompt;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long)]
    log_file_path: Option<String>,

    /// Config file to use instead of the one in the user config directory
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a spreadsheet (.csv, .xls, .xlsx) and enrich it
    Upload { file: PathBuf },

    /// Enrich contacts given on the command line or pasted from a CSV file
    Manual {
        /// "First,Last,Company[,Position]"; may be repeated
        #[arg(long = "contact")]
        contacts: Vec<String>,

        #[arg(long)]
        csv: Option<PathBuf>,
    },

    /// Import contacts from a CRM and enrich them
    Import { provider: Provider },

    /// Pick up an import from the address a CRM redirect returned to
    Resume { url: String },

    /// Send an enriched job's contacts to a CRM
    Export { job_id: String, provider: Provider },

    /// Show the remaining credit balance
    Credits,

    /// List recent enrichment jobs
    Jobs {
        /// Keep refreshing until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if let Some(log_path) = &args.log_file_path {
        let log_path = std::path::Path::new(log_path);
        let file_appender = tracing_appender::rolling::never(
            log_path.parent().unwrap_or(std::path::Path::new(".")),
            log_path
                .file_name()
                .unwrap_or(std::ffi::OsStr::new("enrichflow.log")),
        );
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        std::mem::forget(guard);

        tracing_subscriber::registry()
            .with(env_filter.clone())
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(true)
                    .with_writer(std::io::stderr),
            )
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let (config, config_path) = match &args.config {
        Some(path) => (ClientConfig::load_from(path)?, path.clone()),
        None => ClientConfig::load()?,
    };
    tracing::debug!("Loaded config from {}", config_path.display());

    if let Command::Config = args.command {
        println!("# {}", config_path.display());
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let orchestrator = Arc::new(ImportOrchestrator::from_config(config.clone())?);
    let prompt = prompt::spawn_confirmation_prompt(orchestrator.gate().clone());

    if let Err(e) = orchestrator.ledger().force_resync().await {
        tracing::warn!("Could not fetch credit balance: {}", e);
    }

    let result = run(&orchestrator, &config, args.command).await;

    prompt.abort();
    orchestrator.shutdown().await;
    result
}

async fn run(orchestrator: &ImportOrchestrator, config: &ClientConfig, command: Command) -> Result<()> {
    match command {
        Command::Upload { file } => {
            let outcome = orchestrator.import_file(&file).await?;
            report(orchestrator, outcome).await;
        }
        Command::Manual { contacts, csv } => {
            let mut adapter = ManualContactAdapter::new();

            for entry in &contacts {
                let draft = parse_contact(entry)?;
                if let Err(errors) = adapter.add(draft) {
                    let reasons: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
                    bail!("Invalid contact {:?}: {}", entry, reasons.join(", "));
                }
            }

            if let Some(path) = csv {
                let content = std::fs::read(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                let report = adapter.add_csv(&content)?;
                println!("Added {} contacts from {}", report.added.len(), path.display());
                for rejected in &report.rejected {
                    println!("  skipped: {}", rejected);
                }
            }

            let outcome = orchestrator.import_manual(&mut adapter).await?;
            report(orchestrator, outcome).await;
        }
        Command::Import { provider } => {
            let outcome = orchestrator.import_from_crm(provider).await?;
            report(orchestrator, outcome).await;
        }
        Command::Resume { url } => {
            let navigator = Arc::new(MemoryNavigator::parse(&url).context("Invalid URL")?);
            let resumption = orchestrator.redirect_resumption(navigator.clone());

            let Some(task) = resumption.check_and_resume() else {
                println!("Nothing to resume at {}", url);
                return Ok(());
            };
            println!("Address is now {}", navigator.current_url());

            match task.await? {
                ResumptionOutcome::Launched(handle) => {
                    report(orchestrator, ImportOutcome::Launched(handle)).await
                }
                ResumptionOutcome::Cancelled => report(orchestrator, ImportOutcome::Cancelled).await,
                ResumptionOutcome::Failed(e) => bail!(e),
                ResumptionOutcome::GateBusy => bail!("Another enrichment confirmation is open"),
            }
        }
        Command::Export { job_id, provider } => {
            let response = orchestrator.export_job(&job_id, provider).await?;
            match response.message {
                Some(message) => println!("{}", message),
                None => println!(
                    "Exported {} contacts to {}",
                    response.exported_count, provider
                ),
            }
        }
        Command::Credits => {
            let state = orchestrator.ledger().snapshot().await;
            match state.last_synced_at {
                Some(at) => println!("{} credits remaining (as of {})", state.remaining, at),
                None => bail!("Credit balance is unavailable"),
            }
        }
        Command::Jobs { watch } => {
            if !watch {
                let jobs = orchestrator.api().list_jobs(config.refresh.job_limit).await?;
                print_jobs(&jobs);
                return Ok(());
            }

            let poller = orchestrator.start_background_refresh().await;
            let mut updates = poller.subscribe();
            loop {
                tokio::select! {
                    changed = updates.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let jobs = updates.borrow_and_update().clone();
                        print_jobs(&jobs);
                    }
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Ctrl+C received, stopping");
                        break;
                    }
                }
            }
        }
        Command::Config => {}
    }

    Ok(())
}

async fn report(orchestrator: &ImportOrchestrator, outcome: ImportOutcome) {
    match outcome {
        ImportOutcome::Launched(handle) => {
            println!(
                "Started {} job {} (~{} credits)",
                describe_source(handle.source_kind),
                handle.job_id,
                handle.estimated_credits
            );
            println!(
                "Estimated balance: {} credits",
                orchestrator.ledger().remaining().await
            );
        }
        ImportOutcome::Cancelled => println!("Cancelled, nothing was enriched"),
    }
}

fn parse_contact(entry: &str) -> Result<ContactDraft> {
    let parts: Vec<&str> = entry.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [first, last, company] => Ok(ContactDraft::new(*first, *last, *company)),
        [first, last, company, position] => {
            Ok(ContactDraft::new(*first, *last, *company).with_position(*position))
        }
        _ => bail!(
            "Expected \"First,Last,Company[,Position]\", got {:?}",
            entry
        ),
    }
}

fn print_jobs(jobs: &[shared_types::EnrichmentJob]) {
    if jobs.is_empty() {
        println!("No enrichment jobs yet");
        return;
    }

    for job in jobs {
        println!(
            "{:<24} {:<10} {:>5}/{:<5} {}",
            job.id,
            format!("{:?}", job.status).to_lowercase(),
            job.enriched_contacts,
            job.total_contacts,
            job.filename.as_deref().unwrap_or("-")
        );
    }
}
