use abasync_core::ReportDataSet;
use moka::future::Cache;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::client::{AbacusClient, PageOutcome};
use crate::error::{AbacusError, AbacusResult};

/// Cache key for fetched datasets: (remote job id, report kind).
type CacheKey = (String, String);

const CACHE_CAPACITY: u64 = 1_000;

/// Retrieves every output page of a finished job and concatenates the rows.
///
/// Complete results are cached for `cache_ttl`; a job's output never changes
/// once it finished, so entries simply expire.
#[derive(Clone)]
pub struct PageFetcher {
    client: AbacusClient,
    cache: Cache<CacheKey, Arc<ReportDataSet>>,
}

impl PageFetcher {
    #[must_use]
    pub fn new(client: AbacusClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(client.config().cache_ttl)
            .build();
        Self { client, cache }
    }

    /// Fetches pages `1..=total_pages` sequentially.
    ///
    /// A 404 or an empty page ends the sequence early and is not an error.
    /// Any other failure aborts with [`AbacusError::FetchFailed`]; rows already
    /// collected are dropped and nothing is cached.
    #[instrument(skip(self))]
    pub async fn fetch_all(
        &self,
        job_id: &str,
        report_kind: &str,
        total_pages: u32,
    ) -> AbacusResult<Arc<ReportDataSet>> {
        let key = (job_id.to_string(), report_kind.to_string());
        if let Some(cached) = self.cache.get(&key).await {
            debug!(rows = cached.len(), "Serving dataset from cache");
            return Ok(cached);
        }

        let token = self.client.authenticate().await?;
        let mut rows = ReportDataSet::new();

        for page in 1..=total_pages {
            let outcome = self
                .client
                .fetch_page(&token, job_id, page)
                .await
                .map_err(|e| AbacusError::FetchFailed {
                    page,
                    message: e.to_string(),
                })?;

            match outcome {
                PageOutcome::Rows(page_rows) => {
                    debug!(page, rows = page_rows.len(), "Fetched page");
                    rows.extend(page_rows);
                }
                PageOutcome::NotFound => {
                    warn!(page, "Page not found, stopping");
                    break;
                }
                PageOutcome::Empty => {
                    warn!(page, "Empty page, stopping");
                    break;
                }
            }
        }

        info!(rows = rows.len(), "Fetched report data");
        let data = Arc::new(rows);
        self.cache.insert(key, Arc::clone(&data)).await;
        Ok(data)
    }
}

impl std::fmt::Debug for PageFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageFetcher")
            .field("client", &self.client)
            .field("cached_entries", &self.cache.entry_count())
            .finish()
    }
}
