pub mod credit_poller;
pub mod job_poller;
pub mod launcher;
pub mod refresh_registry;
