//! RFID scanner endpoints

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::attendance::{ScanOutcome, ScanRequest},
    services::scan_buffer::LastScan,
    AppState,
};

use super::{success, ApiQuery, Success, ValidatedJson};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LatestScanQuery {
    /// Zone to read (default: configured default zone)
    pub zone: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LatestScanResponse {
    /// Absent when nothing was scanned in the zone recently
    pub scan: Option<LastScan>,
}

/// Record a badge scan: ENTRY or EXIT is decided by the server
#[utoipa::path(
    post,
    path = "/scan",
    tag = "scan",
    request_body = ScanRequest,
    responses(
        (status = 200, description = "Scan recorded", body = ScanOutcome),
        (status = 400, description = "Missing or malformed RFID UID", body = crate::error::ErrorResponse),
        (status = 403, description = "Student account is inactive", body = crate::error::ErrorResponse)
    )
)]
pub async fn scan(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<ScanRequest>,
) -> AppResult<Json<Success<ScanOutcome>>> {
    let outcome = state.services.attendance.scan(&request).await?;
    Ok(success(outcome))
}

/// Take the latest scan of a zone; the entry is cleared once read
#[utoipa::path(
    get,
    path = "/scan/latest",
    tag = "scan",
    params(LatestScanQuery),
    responses(
        (status = 200, description = "Latest scan, if any", body = LatestScanResponse)
    )
)]
pub async fn latest_scan(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LatestScanQuery>,
) -> Json<Success<LatestScanResponse>> {
    let scan = state.services.attendance.latest_scan(query.zone.as_deref()).await;
    success(LatestScanResponse { scan })
}
