//! # ridb-dl
//!
//! Paginated fetch-and-join engine for the Recreation Information Database
//! (RIDB) REST API.
//!
//! A run walks the campsite collection page by page, keeps the campsites that
//! satisfy a declarative filter (by default: RV-capable with water, 50 amp
//! electric and sewer hookups), joins each accepted campsite with its parent
//! facility and that facility's first organization, and writes the result to
//! a single CSV file.
//!
//! ## Quick Start
//!
//! ```no_run
//! use ridb_dl::{Config, Pipeline, RunOutcome};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let pipeline = Pipeline::new(config)?;
//!
//!     match pipeline.run(None).await? {
//!         RunOutcome::NoResults { source } => println!("no results at {source}"),
//!         RunOutcome::Exported { path, summary } => {
//!             println!("{} records saved to {}", summary.records.len(), path.display())
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Command-line argument handling
pub mod cli;
/// Configuration types
pub mod config;
/// Facility enrichment and key deduplication
pub mod enrichment;
/// Error types
pub mod error;
/// CSV export
pub mod export;
/// Campsite acceptance rules
pub mod filter;
/// Offset/limit page sources
pub mod pagination;
/// Run orchestration
pub mod pipeline;
/// Retry logic with exponential backoff
pub mod retry;
/// HTTP transport
pub mod transport;
/// Core record types
pub mod types;

#[cfg(test)]
mod test_helpers;

// Re-export commonly used types
pub use config::{Config, EnrichmentErrorPolicy};
pub use enrichment::{Enricher, FieldMapping, SeenKeys};
pub use error::{Error, Result, TransportError};
pub use filter::{Accept, Clause, RecordFilter};
pub use pagination::{FilePageSource, PageSource, Paginator};
pub use pipeline::{Pipeline, RunOutcome, RunSummary};
pub use transport::{HttpTransport, Transport};
pub use types::{Campsite, Facility, FacilityId, OutputRecord, Page};
