use axum::{extract::State, Json};

use crate::{routes::models::DataResponse, services::stats::CovidStats, ApiError, AppState};

pub async fn covid_stats(
    State(state): State<AppState>,
) -> Result<Json<DataResponse<CovidStats>>, ApiError> {
    let stats = state.stats().current().await?;
    Ok(Json(DataResponse::new(stats)))
}
