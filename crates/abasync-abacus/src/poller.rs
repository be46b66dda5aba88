//! Background polling of report jobs.
//!
//! One task per job: poll the status endpoint on a fixed interval until the
//! job is terminal, then fetch the output pages. Outcomes are only ever
//! written to the registry; nothing is returned to the code that started the
//! job.

use abasync_core::{JobState, ReportHandle, ReportRegistry};
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};

use crate::client::AbacusClient;
use crate::error::{AbacusError, AbacusResult};
use crate::fetcher::PageFetcher;

/// The job a poller task follows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollTarget {
    pub handle: ReportHandle,
    pub remote_job_id: String,
    pub report_kind: String,
}

enum Tick {
    Continue,
    Done(JobState),
}

#[derive(Debug, Clone)]
pub struct JobPoller {
    client: AbacusClient,
    fetcher: PageFetcher,
    registry: ReportRegistry,
}

impl JobPoller {
    #[must_use]
    pub fn new(client: AbacusClient, registry: ReportRegistry) -> Self {
        let fetcher = PageFetcher::new(client.clone());
        Self {
            client,
            fetcher,
            registry,
        }
    }

    #[must_use]
    pub fn fetcher(&self) -> &PageFetcher {
        &self.fetcher
    }

    /// Runs [`JobPoller::run`] on a detached task.
    pub fn spawn(&self, target: PollTarget) -> JoinHandle<JobState> {
        let poller = self.clone();
        tokio::spawn(async move { poller.run(target).await })
    }

    /// Polls until the job reaches a terminal state and returns that state.
    ///
    /// Any tick failure is fatal for the job: the record is marked
    /// `FinishedError` with the error text and polling stops.
    #[instrument(
        skip(self, target),
        fields(handle = %target.handle, job_id = %target.remote_job_id, report_kind = %target.report_kind)
    )]
    pub async fn run(&self, target: PollTarget) -> JobState {
        let interval = self.client.config().poll_interval;

        loop {
            match self.tick(&target).await {
                Ok(Tick::Continue) => tokio::time::sleep(interval).await,
                Ok(Tick::Done(state)) => return state,
                Err(e) => {
                    error!(error = %e, "Report polling failed");
                    if let Err(re) = self.registry.fail(&target.handle, &e.to_string()).await {
                        warn!(error = %re, "Could not record polling failure");
                    }
                    return JobState::FinishedError;
                }
            }
        }
    }

    async fn tick(&self, target: &PollTarget) -> AbacusResult<Tick> {
        let status = self
            .client
            .job_status(&target.remote_job_id)
            .await
            .map_err(|e| AbacusError::PollTickFailed(e.to_string()))?;

        let message = status.message();
        let total_pages = status.total_pages(self.client.config().page_size);

        match status.job_state() {
            JobState::Running => {
                self.registry
                    .record_progress(&target.handle, message, total_pages)
                    .await?;
                Ok(Tick::Continue)
            }
            JobState::FinishedError => {
                warn!(remote_message = %message, "Report finished with error");
                self.registry.fail(&target.handle, message).await?;
                Ok(Tick::Done(JobState::FinishedError))
            }
            JobState::FinishedSuccess => {
                // Stays Running until the data is in hand.
                let record = self
                    .registry
                    .record_progress(&target.handle, message, total_pages)
                    .await?;

                let data = self
                    .fetcher
                    .fetch_all(
                        &target.remote_job_id,
                        &target.report_kind,
                        record.total_pages,
                    )
                    .await?;

                let rows = data.len();
                self.registry
                    .complete_success(&target.handle, message, None, data)
                    .await?;
                info!(rows, pages = record.total_pages, "Report completed");
                Ok(Tick::Done(JobState::FinishedSuccess))
            }
        }
    }
}
