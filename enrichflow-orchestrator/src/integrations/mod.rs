pub mod crm_import;
pub mod enrichment_api;
pub mod http_api;

pub use crm_import::{CrmImportAdapter, CrmImportError};
pub use enrichment_api::{ApiError, EnrichmentApi};
pub use http_api::HttpEnrichmentApi;
