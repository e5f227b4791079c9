//! Dashboard aggregates

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::attendance::AttendanceLog;

/// ENTRY events in one hour
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct HourlyBucket {
    /// Start of the hour
    pub hour: DateTime<Utc>,
    pub entries: i64,
}

/// Students currently inside a zone
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ZonePresence {
    pub zone: String,
    pub inside: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LendingStats {
    pub active_book_loans: i64,
    pub overdue_book_loans: i64,
    pub active_apparatus_loans: i64,
    /// Loans of either kind with a fine owed and not yet paid
    pub unpaid_fines: i64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DashboardStats {
    pub inside_count: i64,
    pub total_students: i64,
    pub today_entries: i64,
    pub today_exits: i64,
    pub recent_logs: Vec<AttendanceLog>,
    /// Last 24 hours, oldest first
    pub hourly_entries: Vec<HourlyBucket>,
    pub zones: Vec<ZonePresence>,
    pub lending: LendingStats,
}
