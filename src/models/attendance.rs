//! Attendance log model and scan types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::student::StudentShort;

/// Direction of a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScanAction {
    Entry,
    Exit,
}

impl ScanAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanAction::Entry => "ENTRY",
            ScanAction::Exit => "EXIT",
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            ScanAction::Entry => ScanAction::Exit,
            ScanAction::Exit => ScanAction::Entry,
        }
    }
}

impl std::fmt::Display for ScanAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScanAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ENTRY" => Ok(ScanAction::Entry),
            "EXIT" => Ok(ScanAction::Exit),
            other => Err(format!("unknown scan action: {}", other)),
        }
    }
}

/// Attendance log row joined with the student name
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceLog {
    pub id: i64,
    pub student_id: i32,
    pub student_name: Option<String>,
    pub roll_number: Option<String>,
    pub rfid_uid: String,
    /// ENTRY or EXIT
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub device_id: String,
    pub zone: String,
}

/// Scan request sent by the RFID reader
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ScanRequest {
    #[validate(length(min = 1, max = 50, message = "RFID UID required"))]
    pub rfid_uid: String,
    #[validate(length(min = 1, max = 50, message = "device_id must not be empty"))]
    pub device_id: Option<String>,
    #[validate(length(min = 1, max = 50, message = "zone must not be empty"))]
    pub zone: Option<String>,
}

/// Result of a scan
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ScanOutcome {
    pub action: ScanAction,
    pub student: StudentShort,
    pub zone: String,
    pub device_id: String,
    /// The badge was unknown and a placeholder student was created
    pub new_registration: bool,
    pub timestamp: DateTime<Utc>,
}

/// Attendance log query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    /// Day filter (YYYY-MM-DD, UTC)
    pub date: Option<String>,
    pub zone: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// One page of attendance logs
#[derive(Debug, Serialize, ToSchema)]
pub struct AttendancePage {
    pub logs: Vec<AttendanceLog>,
    pub total: i64,
    pub pages: i64,
    pub current_page: i64,
}

/// Zone correction request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateZone {
    #[validate(length(min = 1, max = 50, message = "zone is required"))]
    pub zone: String,
}
