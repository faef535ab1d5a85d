use axum::{Json, extract::State};
use tracker_domain::summary::Summary;

use crate::{ApiError, AppState};

pub async fn get_summary(State(app_state): State<AppState>) -> Result<Json<Summary>, ApiError> {
    let summary = app_state.match_service.summary().await?;
    Ok(Json(summary))
}
