//! Pipedrive side of the bridge.
//!
//! - [`PipedriveClient`]: organizations, persons, deals, search and field
//!   metadata over the Pipedrive REST API
//! - [`MappingStore`]: per-company field mappings and sync settings on disk
//! - [`CrmSync`]: pushes combined records through the mappings

pub mod client;
pub mod error;
pub mod mapping;
pub mod sync;

pub use client::{CrmField, PipedriveClient, DEFAULT_API_URL};
pub use error::{PipedriveError, PipedriveResult};
pub use mapping::{IndexedMapping, MappingStore, MappingsByEntity};
pub use sync::{CrmSync, RecordReport, SyncOutcome};
