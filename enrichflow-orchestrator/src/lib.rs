pub mod config;
pub mod handlers;
pub mod helpers;
pub mod integrations;
pub mod jobs;

#[cfg(test)]
pub(crate) mod testing;

pub use config::ClientConfig;
pub use handlers::imports::{ImportError, ImportOrchestrator, ImportOutcome};
pub use handlers::redirect_resumption::{RedirectResumption, ResumptionOutcome};
