//! Attendance log endpoints

use axum::{extract::State, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    models::attendance::{AttendanceLog, AttendancePage, AttendanceQuery, UpdateZone},
    AppState,
};

use super::{success, ApiPath, ApiQuery, Success, ValidatedJson};

#[derive(Serialize, ToSchema)]
pub struct TodayResponse {
    pub logs: Vec<AttendanceLog>,
    pub count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct LogResponse {
    pub log: AttendanceLog,
}

/// Query attendance logs, newest first
#[utoipa::path(
    get,
    path = "/attendance",
    tag = "attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "One page of logs", body = AttendancePage),
        (status = 400, description = "Malformed date", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_attendance(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<AttendanceQuery>,
) -> AppResult<Json<Success<AttendancePage>>> {
    let page = state.services.attendance.list(&query).await?;
    Ok(success(page))
}

/// Logs of the current UTC day
#[utoipa::path(
    get,
    path = "/attendance/today",
    tag = "attendance",
    responses(
        (status = 200, description = "Today's logs, newest first", body = TodayResponse)
    )
)]
pub async fn today_attendance(State(state): State<AppState>) -> AppResult<Json<Success<TodayResponse>>> {
    let logs = state.services.attendance.today().await?;
    Ok(success(TodayResponse {
        count: logs.len(),
        logs,
    }))
}

/// Correct the zone of a log
#[utoipa::path(
    put,
    path = "/attendance/{id}/zone",
    tag = "attendance",
    params(("id" = i64, Path, description = "Attendance log ID")),
    request_body = UpdateZone,
    responses(
        (status = 200, description = "Zone updated", body = LogResponse),
        (status = 404, description = "Log not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_zone(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<i64>,
    ValidatedJson(data): ValidatedJson<UpdateZone>,
) -> AppResult<Json<Success<LogResponse>>> {
    let log = state.services.attendance.update_zone(id, &data.zone).await?;
    Ok(success(LogResponse { log }))
}
