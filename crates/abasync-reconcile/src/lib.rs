//! Record reconciliation for the Abacus to Pipedrive bridge.
//!
//! [`CombineEngine`] joins the newest successful project, address and
//! contact datasets of a [`abasync_core::ReportRegistry`] into flat
//! [`CombinedRecord`]s. [`export`] renders rows and records as CSV.

mod engine;
mod error;
pub mod export;
pub mod key;

pub use engine::{kind_prefix, CombineConfig, CombineEngine, CombinedRecord, LatestDatasets};
pub use error::{ExportError, ExportResult};
pub use export::records_to_csv;
