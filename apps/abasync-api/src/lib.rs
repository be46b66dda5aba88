//! HTTP service of the Abacus to Pipedrive bridge.
//!
//! Starts ERP report jobs, serves their data individually and combined, and
//! pushes combined records into the CRM through configurable field mappings.

pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
pub mod models;
pub mod rate_limit;
pub mod router;
pub mod state;

pub use config::{AppConfig, LogFormat};
pub use error::{ApiError, ApiResult, ProblemDetails, StartupError};
pub use rate_limit::CooldownLimiter;
pub use router::build_router;
pub use state::AppState;
