//! In-memory report registry.
//!
//! The registry is the only state shared between the background pollers and
//! the request handlers. Every write replaces a full record under the write
//! lock, so readers always observe a complete record. Records are never
//! evicted; the registry lives as long as the process.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    JobState, RegistryError, RegistryResult, ReportDataSet, ReportHandle, ReportJobRecord,
    ReportSummary,
};

/// A record together with its dataset, if the job finished successfully.
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub record: ReportJobRecord,
    pub data: Option<Arc<ReportDataSet>>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    /// Handles in creation order.
    order: Vec<ReportHandle>,
    entries: HashMap<ReportHandle, RegistryEntry>,
}

impl RegistryInner {
    /// Returns the entry for `handle` if it may still be written to.
    fn running_entry(&mut self, handle: &ReportHandle) -> RegistryResult<&mut RegistryEntry> {
        let entry = self
            .entries
            .get_mut(handle)
            .ok_or(RegistryError::UnknownHandle(*handle))?;

        if entry.record.state.is_terminal() {
            return Err(RegistryError::AlreadyTerminal {
                handle: *handle,
                state: entry.record.state,
            });
        }

        Ok(entry)
    }
}

/// Thread-safe store of report records, keyed by handle.
///
/// Cloning is cheap and yields a handle to the same underlying store.
#[derive(Debug, Clone, Default)]
pub struct ReportRegistry {
    inner: Arc<RwLock<RegistryInner>>,
}

impl ReportRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a `Running` record for a new report request.
    pub async fn create(&self, mandant_id: &str, report_kind: &str) -> ReportHandle {
        let handle = ReportHandle::new();
        let record = ReportJobRecord::new(handle, mandant_id, report_kind);

        let mut inner = self.inner.write().await;
        inner.order.push(handle);
        inner
            .entries
            .insert(handle, RegistryEntry { record, data: None });

        debug!(%handle, mandant_id, report_kind, "Registered report");
        handle
    }

    /// Returns a copy of the record for `handle`.
    pub async fn get_status(&self, handle: &ReportHandle) -> Option<ReportJobRecord> {
        let inner = self.inner.read().await;
        inner.entries.get(handle).map(|e| e.record.clone())
    }

    /// Returns the dataset for `handle`. Present only once the job finished
    /// successfully.
    pub async fn get_data(&self, handle: &ReportHandle) -> Option<Arc<ReportDataSet>> {
        let inner = self.inner.read().await;
        inner.entries.get(handle).and_then(|e| e.data.clone())
    }

    /// Summaries of every record ever created, in creation order.
    pub async fn list_all(&self) -> Vec<ReportSummary> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|h| inner.entries.get(h))
            .map(|e| e.record.summary())
            .collect()
    }

    /// Consistent copy of all entries, in creation order.
    pub async fn snapshot(&self) -> Vec<RegistryEntry> {
        let inner = self.inner.read().await;
        inner
            .order
            .iter()
            .filter_map(|h| inner.entries.get(h))
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.order.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.order.is_empty()
    }

    /// Stores the job id the ERP assigned to the submission.
    pub async fn assign_remote_job(
        &self,
        handle: &ReportHandle,
        remote_job_id: &str,
    ) -> RegistryResult<()> {
        let mut inner = self.inner.write().await;
        let entry = inner.running_entry(handle)?;
        entry.record.remote_job_id = Some(remote_job_id.to_string());
        Ok(())
    }

    /// Records an intermediate poll result. The state stays `Running`.
    pub async fn record_progress(
        &self,
        handle: &ReportHandle,
        message: &str,
        total_pages: Option<u32>,
    ) -> RegistryResult<ReportJobRecord> {
        let mut inner = self.inner.write().await;
        let entry = inner.running_entry(handle)?;
        entry.record.status_message = message.to_string();
        entry.record.apply_total_pages(total_pages);
        Ok(entry.record.clone())
    }

    /// Marks the job `FinishedSuccess` and stores its dataset in one write.
    pub async fn complete_success(
        &self,
        handle: &ReportHandle,
        message: &str,
        total_pages: Option<u32>,
        data: Arc<ReportDataSet>,
    ) -> RegistryResult<()> {
        let mut inner = self.inner.write().await;
        let entry = inner.running_entry(handle)?;
        entry.record.state = JobState::FinishedSuccess;
        entry.record.status_message = message.to_string();
        entry.record.apply_total_pages(total_pages);
        entry.data = Some(data);
        Ok(())
    }

    /// Marks the job `FinishedError`, keeping `message` as the failure reason.
    pub async fn fail(&self, handle: &ReportHandle, message: &str) -> RegistryResult<()> {
        let mut inner = self.inner.write().await;
        let entry = inner.running_entry(handle)?;
        entry.record.state = JobState::FinishedError;
        entry.record.status_message = message.to_string();
        Ok(())
    }
}
