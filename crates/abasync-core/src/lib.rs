//! Shared building blocks for the Abacus ERP to Pipedrive CRM bridge.
//!
//! This crate owns the pieces every other crate in the workspace agrees on:
//!
//! - Report job types (`ReportHandle`, `JobState`, `ReportJobRecord`)
//! - Schema-less report rows (`ReportRow`, `ReportDataSet`)
//! - The in-memory [`ReportRegistry`] shared between pollers and readers
//! - Bridge configuration (`AbacusConfig`, `TenantCatalog`)
//! - CRM field mapping types (`FieldMapping`, `EntityKind`, `SyncSettings`)
//!
//! # Example
//!
//! ```no_run
//! use abasync_core::{JobState, ReportRegistry};
//!
//! # async fn example() {
//! let registry = ReportRegistry::new();
//! let handle = registry.create("19", "adr").await;
//!
//! let record = registry.get_status(&handle).await.unwrap();
//! assert_eq!(record.state, JobState::Running);
//! # }
//! ```

mod config;
mod error;
mod mapping;
mod registry;
mod types;

pub use config::{AbacusConfig, ReportDefinition, TenantCatalog, TenantConfig};
pub use error::{ConfigError, ConfigResult, RegistryError, RegistryResult};
pub use mapping::{EntityKind, FieldMapping, SyncSettings};
pub use registry::{RegistryEntry, ReportRegistry};
pub use types::{
    is_blank, JobState, ReportDataSet, ReportHandle, ReportJobRecord, ReportRow, ReportSummary,
    STATUS_FIELD, STATUS_NEW, STATUS_SYNCED,
};
