//! Route table of the HTTP API.

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::handlers::{self, combined, pipedrive, reports};
use crate::state::AppState;

/// Create the application router.
///
/// Report routes:
/// - POST /startAllReports, POST /startReport
/// - GET /reports, GET /reportStatus/:id
/// - GET /reportData/:id, GET /reportData/:id/csv
/// - GET /combinedData, GET /combinedData/csv
///
/// CRM routes:
/// - GET, POST /pipedrive/mappings
/// - PUT, DELETE /pipedrive/mappings/:index
/// - POST /pipedrive/settings
/// - GET /pipedrive/fields/:entity
/// - POST /pipedrive/sync
pub fn build_router(state: AppState) -> Router {
    let report_routes = Router::new()
        .route("/startAllReports", post(reports::start_all_reports))
        .route("/startReport", post(reports::start_report))
        .route("/reports", get(reports::list_reports))
        .route("/reportStatus/:id", get(reports::report_status))
        .route("/reportData/:id", get(reports::report_data))
        .route("/reportData/:id/csv", get(reports::report_data_csv))
        .route("/combinedData", get(combined::combined_data))
        .route("/combinedData/csv", get(combined::combined_data_csv));

    let crm_routes = Router::new()
        .route(
            "/mappings",
            get(pipedrive::get_mappings).post(pipedrive::add_mapping),
        )
        .route(
            "/mappings/:index",
            put(pipedrive::update_mapping).delete(pipedrive::delete_mapping),
        )
        .route("/settings", post(pipedrive::update_settings))
        .route("/fields/:entity", get(pipedrive::get_fields))
        .route("/sync", post(pipedrive::sync));

    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .merge(report_routes)
        .nest("/pipedrive", crm_routes)
        .with_state(state)
}
