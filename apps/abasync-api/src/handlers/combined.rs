//! Combined project, address and contact records.

use axum::{extract::State, response::IntoResponse, Json};

use crate::error::ApiResult;
use crate::handlers::csv_attachment;
use crate::models::CombinedDataResponse;
use crate::state::AppState;

/// GET /combinedData
pub async fn combined_data(State(state): State<AppState>) -> Json<CombinedDataResponse> {
    let combined_data = state
        .combine
        .combine_registry(state.manager.registry())
        .await;
    Json(CombinedDataResponse { combined_data })
}

/// GET /combinedData/csv
pub async fn combined_data_csv(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let records = state
        .combine
        .combine_registry(state.manager.registry())
        .await;
    let body = abasync_reconcile::records_to_csv(&records)?;
    Ok(csv_attachment("combined_data.csv", body))
}
