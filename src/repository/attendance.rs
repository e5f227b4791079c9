//! Attendance log repository

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{AppError, AppResult},
    models::attendance::{AttendanceLog, ScanAction},
};

const LOG_SELECT: &str = r#"
    SELECT a.id, a.student_id, s.name AS student_name, s.roll_number,
           a.rfid_uid, a.action, a.timestamp, a.device_id, a.zone
    FROM attendance_logs a
    LEFT JOIN students s ON s.id = a.student_id
"#;

/// Filters for a log page
#[derive(Debug, Default)]
pub struct LogFilter<'a> {
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub zone: Option<&'a str>,
}

#[derive(Clone)]
pub struct AttendanceRepository {
    pool: Pool<Postgres>,
}

impl AttendanceRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Action of the most recent log of a student in a zone.
    /// Ties on timestamp are broken by insertion order.
    pub async fn last_action_in_zone(
        &self,
        conn: &mut PgConnection,
        student_id: i32,
        zone: &str,
    ) -> AppResult<Option<ScanAction>> {
        let action: Option<String> = sqlx::query_scalar(
            r#"
            SELECT action FROM attendance_logs
            WHERE student_id = $1 AND zone = $2
            ORDER BY timestamp DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(student_id)
        .bind(zone)
        .fetch_optional(conn)
        .await?;

        action
            .map(|a| a.parse::<ScanAction>().map_err(AppError::Internal))
            .transpose()
    }

    /// Append one scan event
    pub async fn insert(
        &self,
        conn: &mut PgConnection,
        student_id: i32,
        rfid_uid: &str,
        action: ScanAction,
        device_id: &str,
        zone: &str,
        timestamp: DateTime<Utc>,
    ) -> AppResult<i64> {
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO attendance_logs (student_id, rfid_uid, action, timestamp, device_id, zone)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(student_id)
        .bind(rfid_uid)
        .bind(action.as_str())
        .bind(timestamp)
        .bind(device_id)
        .bind(zone)
        .fetch_one(conn)
        .await?;
        Ok(id)
    }

    /// Get a page of logs, newest first, with the total count of matching rows
    pub async fn list(
        &self,
        filter: &LogFilter<'_>,
        offset: i64,
        per_page: i64,
    ) -> AppResult<(Vec<AttendanceLog>, i64)> {
        let where_clause = r#"
            WHERE ($1::timestamptz IS NULL OR a.timestamp >= $1)
              AND ($2::timestamptz IS NULL OR a.timestamp < $2)
              AND ($3::text IS NULL OR a.zone = $3)
        "#;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM attendance_logs a {}",
            where_clause
        ))
        .bind(filter.from)
        .bind(filter.until)
        .bind(filter.zone)
        .fetch_one(&self.pool)
        .await?;

        let logs = sqlx::query_as::<_, AttendanceLog>(&format!(
            "{} {} ORDER BY a.timestamp DESC, a.id DESC LIMIT $4 OFFSET $5",
            LOG_SELECT, where_clause
        ))
        .bind(filter.from)
        .bind(filter.until)
        .bind(filter.zone)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((logs, total))
    }

    /// All logs in `[from, until)`, newest first
    pub async fn between(&self, from: DateTime<Utc>, until: DateTime<Utc>) -> AppResult<Vec<AttendanceLog>> {
        let logs = sqlx::query_as::<_, AttendanceLog>(&format!(
            "{} WHERE a.timestamp >= $1 AND a.timestamp < $2 ORDER BY a.timestamp DESC, a.id DESC",
            LOG_SELECT
        ))
        .bind(from)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    /// Most recent logs
    pub async fn recent(&self, limit: i64) -> AppResult<Vec<AttendanceLog>> {
        let logs = sqlx::query_as::<_, AttendanceLog>(&format!(
            "{} ORDER BY a.timestamp DESC, a.id DESC LIMIT $1",
            LOG_SELECT
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }

    /// Correct the zone of a log entry
    pub async fn update_zone(&self, id: i64, zone: &str) -> AppResult<AttendanceLog> {
        let result = sqlx::query("UPDATE attendance_logs SET zone = $2 WHERE id = $1")
            .bind(id)
            .bind(zone)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Attendance log {} not found", id)));
        }

        let log = sqlx::query_as::<_, AttendanceLog>(&format!("{} WHERE a.id = $1", LOG_SELECT))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(log)
    }

    /// Count logs with an action in `[from, until)`
    pub async fn count_action(
        &self,
        action: ScanAction,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM attendance_logs WHERE action = $1 AND timestamp >= $2 AND timestamp < $3",
        )
        .bind(action.as_str())
        .bind(from)
        .bind(until)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// ENTRY events per hour bucket starting at `from`, as (bucket index, count)
    pub async fn hourly_entries(&self, from: DateTime<Utc>, hours: i32) -> AppResult<Vec<(i32, i64)>> {
        let rows: Vec<(i32, i64)> = sqlx::query_as(
            r#"
            SELECT FLOOR(EXTRACT(EPOCH FROM (timestamp - $1)) / 3600)::int AS bucket,
                   COUNT(*) AS entries
            FROM attendance_logs
            WHERE action = 'ENTRY'
              AND timestamp >= $1
              AND timestamp < $1 + make_interval(hours => $2)
            GROUP BY bucket
            ORDER BY bucket
            "#,
        )
        .bind(from)
        .bind(hours)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Students whose latest log in each zone is an ENTRY, per zone
    pub async fn presence_by_zone(&self) -> AppResult<Vec<(String, i64)>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT zone, COUNT(*) AS inside
            FROM (
                SELECT DISTINCT ON (student_id, zone) zone, action
                FROM attendance_logs
                ORDER BY student_id, zone, timestamp DESC, id DESC
            ) latest
            WHERE action = 'ENTRY'
            GROUP BY zone
            ORDER BY zone
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
