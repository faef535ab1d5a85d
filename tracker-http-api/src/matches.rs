use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use serde_json::Value;
use tracker_domain::{
    match_record::{MatchId, MatchRecord},
    service::Backup,
};

use crate::{ApiError, AppState, OkResponse};

pub async fn list(State(app_state): State<AppState>) -> Result<Json<Vec<MatchRecord>>, ApiError> {
    let matches = app_state.match_service.list_matches().await?;
    Ok(Json(matches))
}

pub async fn backup(State(app_state): State<AppState>) -> Result<Json<Backup>, ApiError> {
    let backup = app_state.match_service.export_backup().await?;
    Ok(Json(backup))
}

pub async fn create(
    State(app_state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<OkResponse>), ApiError> {
    let Json(body) = payload?;
    app_state
        .match_service
        .record_match(
            body.get("date").and_then(Value::as_str),
            body.get("result").and_then(Value::as_str),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(OkResponse::ok())))
}

pub async fn replace(
    State(app_state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<OkResponse>, ApiError> {
    let Json(body) = payload?;
    let count = app_state.match_service.replace_matches(&body).await?;
    Ok(Json(OkResponse::with_count(count)))
}

pub async fn remove(
    Path(id): Path<String>,
    State(app_state): State<AppState>,
) -> Result<Json<OkResponse>, ApiError> {
    app_state.match_service.delete_match(&MatchId(id)).await?;
    Ok(Json(OkResponse::ok()))
}
