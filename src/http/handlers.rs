//! Request handlers for the log API.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};

use crate::http::error::ApiError;
use crate::http::server::AppState;
use crate::http::validation::{CreateLogsRequest, QueryLogsParams};
use crate::storage::{LogPage, LogStats, StatType};

/// `POST /logs`
pub async fn upload_logs(
    State(state): State<AppState>,
    payload: Result<Json<CreateLogsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let Json(request) = payload?;
    let entries = request.validate().inspect_err(|errors| {
        tracing::debug!(errors = %errors, "Rejected log upload");
    })?;

    state
        .service
        .save(&entries)
        .await
        .map_err(|err| ApiError::from_storage("Error uploading logs", err))?;

    Ok((StatusCode::CREATED, Json(json!({ "status": "Ok" }))))
}

/// `GET /logs`
pub async fn get_logs(
    State(state): State<AppState>,
    params: Result<Query<QueryLogsParams>, QueryRejection>,
) -> Result<Json<LogPage>, ApiError> {
    let Query(params) = params?;
    tracing::info!("Retrieving logs for query params: {params:?}");
    let (filters, pagination) = params.validate()?;

    let page = state
        .service
        .get_logs(&filters, pagination)
        .await
        .map_err(|err| ApiError::from_storage("Error retrieving logs", err))?;

    Ok(Json(page))
}

/// `GET /stats/{type}`
pub async fn get_stats(
    State(state): State<AppState>,
    Path(kind): Path<String>,
) -> Result<Json<LogStats>, ApiError> {
    let stat = kind.parse::<StatType>().inspect_err(|err| {
        tracing::error!("Error retrieving stats: {err}");
    })?;

    let stats = state
        .service
        .get_stats_by_type(stat)
        .await
        .map_err(|err| ApiError::from_storage("Error retrieving stats", err))?;

    Ok(Json(stats))
}
