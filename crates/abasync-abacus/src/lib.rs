//! Client for the Abacus ERP reporting API.
//!
//! Reports are produced asynchronously by the ERP: a submission returns a job
//! id, the job is polled until it finishes, then its output is read page by
//! page. [`ReportManager`] drives that lifecycle and records every step in a
//! shared [`abasync_core::ReportRegistry`].

pub mod auth;
pub mod client;
pub mod error;
pub mod fetcher;
pub mod manager;
pub mod poller;

pub use client::{AbacusClient, JobStatus, PageOutcome};
pub use error::{AbacusError, AbacusResult};
pub use fetcher::PageFetcher;
pub use manager::ReportManager;
pub use poller::{JobPoller, PollTarget};
