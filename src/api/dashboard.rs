//! Dashboard endpoint

use axum::{extract::State, Json};

use crate::{error::AppResult, models::dashboard::DashboardStats, AppState};

use super::{success, Success};

/// Presence, traffic and lending aggregates
#[utoipa::path(
    get,
    path = "/dashboard/stats",
    tag = "dashboard",
    responses(
        (status = 200, description = "Dashboard statistics", body = DashboardStats)
    )
)]
pub async fn stats(State(state): State<AppState>) -> AppResult<Json<Success<DashboardStats>>> {
    let stats = state.services.dashboard.stats().await?;
    Ok(success(stats))
}
