//! Offset/limit pagination over the campsite collection
//!
//! [`Paginator`] probes the collection once for its `TOTAL_COUNT`, then walks
//! it page by page until the cursor reaches that count. [`FilePageSource`]
//! serves a local JSON dump through the same [`PageSource`] interface.

use crate::config::PaginationConfig;
use crate::error::{Error, Result};
use crate::transport::Transport;
use crate::types::{Campsite, Page};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

/// JSON pointer to the authoritative item count in a page response
const TOTAL_COUNT_POINTER: &str = "/METADATA/RESULTS/TOTAL_COUNT";

/// Something that yields campsite pages in order, exactly once
#[async_trait]
pub trait PageSource: Send {
    /// The next page, or `None` once the source is exhausted
    async fn next_page(&mut self) -> Result<Option<Page>>;

    /// Number of items the source reported
    fn total_count(&self) -> u64;
}

/// `(offset, limit, total_count)` state of a paginated walk
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageCursor {
    /// Offset of the next page to request
    pub offset: u64,
    /// Items per page
    pub limit: u64,
    /// Items to walk, read once from the probe
    pub total_count: u64,
}

impl PageCursor {
    /// Cursor at offset 0
    pub fn new(limit: u64, total_count: u64) -> Self {
        Self {
            offset: 0,
            limit,
            total_count,
        }
    }

    /// Whether every page has been requested
    pub fn is_exhausted(&self) -> bool {
        self.offset >= self.total_count
    }

    /// Pages still to request
    pub fn remaining_pages(&self) -> u64 {
        if self.is_exhausted() || self.limit == 0 {
            return 0;
        }
        (self.total_count - self.offset).div_ceil(self.limit)
    }

    fn advance(&mut self) {
        self.offset = self.offset.saturating_add(self.limit);
    }
}

/// Lazy, non-restartable walk over a paginated RIDB collection
pub struct Paginator {
    transport: Arc<dyn Transport>,
    url: Url,
    records_key: String,
    cursor: PageCursor,
    reported_total: u64,
}

impl std::fmt::Debug for Paginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Paginator")
            .field("url", &self.url.as_str())
            .field("cursor", &self.cursor)
            .finish()
    }
}

impl Paginator {
    /// Probe the collection for its total count and position the cursor at 0
    ///
    /// # Errors
    /// - [`Error::Config`] if the page size or probe limit is zero
    /// - [`Error::EmptyResult`] if the server reports no items (a missing
    ///   count counts as zero)
    /// - [`Error::Transport`] if the probe request fails
    pub async fn start(
        transport: Arc<dyn Transport>,
        url: Url,
        records_key: impl Into<String>,
        config: &PaginationConfig,
    ) -> Result<Self> {
        if config.page_size == 0 {
            return Err(Error::config(
                "pagination.page_size",
                "page size must be greater than zero",
            ));
        }
        if config.probe_limit == 0 {
            return Err(Error::config(
                "pagination.probe_limit",
                "probe limit must be greater than zero",
            ));
        }

        let probe = transport
            .get_json(
                &url,
                &[
                    ("limit", config.probe_limit.to_string()),
                    ("offset", "0".to_string()),
                ],
            )
            .await?;

        let reported_total = probe
            .pointer(TOTAL_COUNT_POINTER)
            .and_then(Value::as_u64)
            .unwrap_or(0);
        if reported_total == 0 {
            return Err(Error::EmptyResult {
                url: url.to_string(),
            });
        }

        let total = match config.max_records {
            Some(cap) if cap < reported_total => {
                debug!(reported_total, cap, "Capping record walk");
                cap
            }
            _ => reported_total,
        };

        Ok(Self {
            transport,
            url,
            records_key: records_key.into(),
            cursor: PageCursor::new(config.page_size, total),
            reported_total,
        })
    }

    /// Current cursor state
    pub fn cursor(&self) -> &PageCursor {
        &self.cursor
    }

    /// Count reported by the server, before any `max_records` cap
    pub fn reported_total(&self) -> u64 {
        self.reported_total
    }
}

#[async_trait]
impl PageSource for Paginator {
    async fn next_page(&mut self) -> Result<Option<Page>> {
        if self.cursor.is_exhausted() {
            return Ok(None);
        }

        let offset = self.cursor.offset;
        let remaining = self.cursor.total_count - offset;
        // Under a max_records cap the last request only asks for what is left
        let limit = if self.reported_total > self.cursor.total_count {
            self.cursor.limit.min(remaining)
        } else {
            self.cursor.limit
        };

        let body = self
            .transport
            .get_json(
                &self.url,
                &[("limit", limit.to_string()), ("offset", offset.to_string())],
            )
            .await?;
        self.cursor.advance();

        let mut items = campsites_from(body, &self.records_key);
        items.truncate(usize::try_from(remaining).unwrap_or(usize::MAX));
        Ok(Some(Page { offset, items }))
    }

    fn total_count(&self) -> u64 {
        self.cursor.total_count
    }
}

/// Local JSON file standing in for the paginated fetch
///
/// Accepts either an RIDB response object (items under the records key) or a
/// bare JSON array of campsites. The whole file is delivered as one page.
#[derive(Debug)]
pub struct FilePageSource {
    items: Option<Vec<Campsite>>,
    total: u64,
}

impl FilePageSource {
    /// Read and parse `path`
    ///
    /// # Errors
    /// I/O and JSON errors propagate; a file without items is [`Error::EmptyResult`].
    pub fn open(path: &Path, records_key: &str) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let items = campsites_from(serde_json::from_str(&text)?, records_key);
        if items.is_empty() {
            return Err(Error::EmptyResult {
                url: path.display().to_string(),
            });
        }
        Ok(Self {
            total: items.len() as u64,
            items: Some(items),
        })
    }
}

#[async_trait]
impl PageSource for FilePageSource {
    async fn next_page(&mut self) -> Result<Option<Page>> {
        Ok(self.items.take().map(|items| Page { offset: 0, items }))
    }

    fn total_count(&self) -> u64 {
        self.total
    }
}

/// Extract campsite objects from a response body
///
/// A missing or non-array list is an empty page. Non-object items are dropped.
fn campsites_from(body: Value, records_key: &str) -> Vec<Campsite> {
    let list = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(records_key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    list.into_iter()
        .filter_map(|item| {
            let campsite = Campsite::from_value(item);
            if campsite.is_none() {
                warn!("Dropping non-object item from page");
            }
            campsite
        })
        .collect()
}
