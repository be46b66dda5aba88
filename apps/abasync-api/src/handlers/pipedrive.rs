//! Pipedrive configuration and sync handlers.
//!
//! Mapping and settings endpoints work without a CRM key; field metadata
//! and sync need one.

use abasync_core::{EntityKind, FieldMapping, SyncSettings};
use abasync_pipedrive::{IndexedMapping, PipedriveClient};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::{
    FieldsResponse, MappingCreatedResponse, MappingDeletedResponse, MappingsResponse, SyncResponse,
};
use crate::state::AppState;

/// GET /pipedrive/mappings
pub async fn get_mappings(State(state): State<AppState>) -> Json<MappingsResponse> {
    Json(MappingsResponse {
        mappings: state.mappings.mappings_by_entity().await,
        settings: state.mappings.settings().await,
    })
}

/// POST /pipedrive/mappings
pub async fn add_mapping(
    State(state): State<AppState>,
    Json(mapping): Json<FieldMapping>,
) -> ApiResult<(StatusCode, Json<MappingCreatedResponse>)> {
    validate_mapping(&mapping)?;
    let index = state.mappings.add_mapping(mapping.clone()).await?;
    info!(index, source = %mapping.source, entity = %mapping.entity, "Mapping added");
    Ok((
        StatusCode::CREATED,
        Json(MappingCreatedResponse { index, mapping }),
    ))
}

/// PUT /pipedrive/mappings/:index
pub async fn update_mapping(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(mapping): Json<FieldMapping>,
) -> ApiResult<Json<IndexedMapping>> {
    validate_mapping(&mapping)?;
    state.mappings.update_mapping(index, mapping.clone()).await?;
    Ok(Json(IndexedMapping { index, mapping }))
}

/// DELETE /pipedrive/mappings/:index
pub async fn delete_mapping(
    State(state): State<AppState>,
    Path(index): Path<usize>,
) -> ApiResult<Json<MappingDeletedResponse>> {
    let deleted = state.mappings.delete_mapping(index).await?;
    info!(index, source = %deleted.source, "Mapping deleted");
    Ok(Json(MappingDeletedResponse { deleted }))
}

/// POST /pipedrive/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<SyncSettings>,
) -> ApiResult<Json<SyncSettings>> {
    state.mappings.update_settings(settings).await?;
    Ok(Json(settings))
}

/// GET /pipedrive/fields/:entity
pub async fn get_fields(
    State(state): State<AppState>,
    Path(entity): Path<String>,
) -> ApiResult<Json<FieldsResponse>> {
    let kind: EntityKind = entity.parse().map_err(ApiError::BadRequest)?;
    let fields = crm_client(&state)?.fields(kind).await?;
    Ok(Json(FieldsResponse {
        entity: kind.to_string(),
        fields,
    }))
}

/// POST /pipedrive/sync
///
/// Combines the current report data and pushes every record not pushed by
/// an earlier sync.
pub async fn sync(State(state): State<AppState>) -> ApiResult<Json<SyncResponse>> {
    let crm = state.crm_sync().ok_or(ApiError::CrmNotConfigured)?;

    let mut records = state
        .combine
        .combine_registry(state.manager.registry())
        .await;
    let results = crm.sync_all(&mut records).await;

    let failed = results.iter().filter(|r| r.error.is_some()).count();
    Ok(Json(SyncResponse {
        synced: results.len() - failed,
        failed,
        results,
    }))
}

fn crm_client(state: &AppState) -> ApiResult<&PipedriveClient> {
    state.pipedrive.as_ref().ok_or(ApiError::CrmNotConfigured)
}

fn validate_mapping(mapping: &FieldMapping) -> ApiResult<()> {
    if mapping.source.trim().is_empty() || mapping.target.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "Mapping source and target must not be empty".to_string(),
        ));
    }
    Ok(())
}
