//! One fetch run: page source → filter → claim → enrich → collect → export
//!
//! Each page is filtered and enriched to completion before the next page is
//! requested. Facility keys are claimed sequentially while the page is being
//! filtered; only then are the claimed lookups started (up to
//! `enrichment.concurrency` at a time, results kept in discovery order).

use crate::config::{Config, EnrichmentErrorPolicy};
use crate::enrichment::{self, Claim, Enricher, SeenKeys};
use crate::error::{Error, Result};
use crate::export;
use crate::pagination::{FilePageSource, PageSource, Paginator};
use crate::transport::{HttpTransport, Transport};
use crate::types::{FacilityId, OutputRecord};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, trace, warn};

/// Counters and records collected by a run
#[derive(Clone, Debug, Default)]
pub struct RunSummary {
    /// Items the page source reported
    pub total_count: u64,
    /// Pages consumed
    pub pages: u64,
    /// Campsites examined
    pub scanned: u64,
    /// Campsites that passed the filter
    pub candidates: u64,
    /// Candidates dropped because their facility was already claimed
    pub duplicates: u64,
    /// Facilities whose lookup failed under the skip policy
    pub failed_facilities: Vec<FacilityId>,
    /// Enriched records in discovery order
    pub records: Vec<OutputRecord>,
}

/// How a run ended
#[derive(Debug)]
pub enum RunOutcome {
    /// The source reported no items; nothing was written
    NoResults {
        /// Resource or file that was empty
        source: String,
    },
    /// The CSV was written
    Exported {
        /// Path of the CSV
        path: PathBuf,
        /// What the run collected
        summary: RunSummary,
    },
}

/// Fetch pipeline bound to one configuration and transport
pub struct Pipeline {
    config: Config,
    transport: Arc<dyn Transport>,
    enricher: Enricher,
}

impl Pipeline {
    /// Pipeline talking to the configured RIDB endpoint over HTTP
    pub fn new(config: Config) -> Result<Self> {
        let transport = HttpTransport::new(&config.api, config.retry.clone())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Pipeline using a caller-provided transport
    ///
    /// # Errors
    /// Returns [`Error::Config`] if `config` fails [`Config::validate`].
    pub fn with_transport(config: Config, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;
        let enricher = Enricher::new(
            transport.clone(),
            config.api.clone(),
            config.enrichment.fields.clone(),
        );
        Ok(Self {
            config,
            transport,
            enricher,
        })
    }

    /// Configuration the pipeline runs with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Header written when no record was accepted
    pub fn columns(&self) -> Vec<String> {
        self.enricher.columns()
    }

    /// Fetch, enrich and export, reading campsites from `input` instead of the API when given
    ///
    /// # Errors
    /// Any transport, enrichment (under the abort policy) or export failure.
    /// An empty source is reported as [`RunOutcome::NoResults`], not an error.
    pub async fn run(&self, input: Option<&Path>) -> Result<RunOutcome> {
        let collected = match input {
            Some(path) => {
                info!(path = %path.display(), "Reading campsites from file");
                match FilePageSource::open(path, &self.config.api.records_key) {
                    Ok(mut source) => self.collect_from(&mut source).await,
                    Err(e) => Err(e),
                }
            }
            None => self.collect().await,
        };

        let summary = match collected {
            Ok(summary) => summary,
            Err(Error::EmptyResult { url }) => {
                info!(source = %url, "No results found");
                return Ok(RunOutcome::NoResults { source: url });
            }
            Err(e) => return Err(e),
        };

        let path = self.config.output.output_path(chrono::Local::now());
        export::write_csv(&summary.records, &path, &self.columns())?;
        info!(
            path = %path.display(),
            records = summary.records.len(),
            "Saved CSV"
        );

        Ok(RunOutcome::Exported { path, summary })
    }

    /// Walk the paginated campsite collection
    pub async fn collect(&self) -> Result<RunSummary> {
        let url = self.config.api.campsites_url()?;
        info!(%url, "Fetching campsites");

        let mut paginator = Paginator::start(
            self.transport.clone(),
            url,
            self.config.api.records_key.clone(),
            &self.config.pagination,
        )
        .await?;
        info!(
            total = paginator.total_count(),
            page_size = self.config.pagination.page_size,
            "Fetching {} total records, {} at a time",
            paginator.total_count(),
            self.config.pagination.page_size
        );

        self.collect_from(&mut paginator).await
    }

    /// Filter and enrich every page of `source`
    pub async fn collect_from(&self, source: &mut dyn PageSource) -> Result<RunSummary> {
        let filter = &self.config.filter;
        let enricher = &self.enricher;
        let concurrency = self.config.enrichment.concurrency.max(1);

        let mut seen = SeenKeys::new();
        let mut summary = RunSummary {
            total_count: source.total_count(),
            ..RunSummary::default()
        };

        while let Some(page) = source.next_page().await? {
            let fetched = page.items.len() as u64;
            summary.pages += 1;
            summary.scanned += fetched;

            let mut claimed = Vec::new();
            for campsite in page.items {
                if let Some(clause) = filter.first_rejection(campsite.fields()) {
                    trace!(campsite = ?campsite.id(), %clause, "Campsite rejected");
                    continue;
                }
                summary.candidates += 1;

                match enrichment::claim(&campsite, &mut seen) {
                    Claim::New(key) => claimed.push((campsite, key)),
                    Claim::Duplicate(_) => summary.duplicates += 1,
                    Claim::NoKey => {}
                }
            }

            // Consumed one result at a time so an abort stops further lookups
            let mut lookups = std::pin::pin!(
                stream::iter(claimed)
                    .map(|(campsite, key)| async move {
                        let facility = enricher.fetch_facility(&key).await;
                        (campsite, key, facility)
                    })
                    .buffered(concurrency)
            );

            while let Some((campsite, key, facility)) = lookups.next().await {
                match facility {
                    Ok(facility) => summary
                        .records
                        .push(enricher.merge(&campsite, &key, &facility)),
                    Err(e) if self.config.enrichment.on_error == EnrichmentErrorPolicy::Skip => {
                        warn!(
                            facility_id = %key,
                            error = %e,
                            "Skipping facility after failed lookup"
                        );
                        summary.failed_facilities.push(key);
                    }
                    Err(e) => return Err(e),
                }
            }

            info!(
                offset = page.offset,
                fetched,
                matches = summary.records.len(),
                "Fetched {} records ({}-{}); found {} matches so far",
                fetched,
                page.offset,
                page.offset + self.config.pagination.page_size,
                summary.records.len()
            );
        }

        Ok(summary)
    }
}
