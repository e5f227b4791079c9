//! Attendance toggle and log queries

use chrono::{Duration, NaiveDate, NaiveTime, Utc};

use crate::{
    config::{AttendanceConfig, AttendanceMode},
    error::{AppError, AppResult},
    models::{
        attendance::{AttendanceLog, AttendancePage, AttendanceQuery, ScanAction, ScanOutcome, ScanRequest},
        student::{normalize_rfid_uid, StudentShort},
    },
    repository::{attendance::LogFilter, Repository},
};

use super::{
    scan_buffer::{LastScan, ScanBuffer},
    students::StudentsService,
};

const DEFAULT_PER_PAGE: i64 = 50;
const MAX_PER_PAGE: i64 = 200;

/// Decide the direction of a scan.
///
/// In global mode the student's single presence flag is flipped. In zone
/// mode scans alternate per zone, starting with an ENTRY.
pub fn next_action(mode: AttendanceMode, is_inside: bool, last_in_zone: Option<ScanAction>) -> ScanAction {
    match mode {
        AttendanceMode::Global => {
            if is_inside {
                ScanAction::Exit
            } else {
                ScanAction::Entry
            }
        }
        AttendanceMode::Zone => last_in_zone.map_or(ScanAction::Entry, ScanAction::opposite),
    }
}

#[derive(Clone)]
pub struct AttendanceService {
    repository: Repository,
    students: StudentsService,
    scan_buffer: ScanBuffer,
    config: AttendanceConfig,
}

impl AttendanceService {
    pub fn new(
        repository: Repository,
        students: StudentsService,
        scan_buffer: ScanBuffer,
        config: AttendanceConfig,
    ) -> Self {
        Self {
            repository,
            students,
            scan_buffer,
            config,
        }
    }

    /// Record a badge scan and toggle presence
    pub async fn scan(&self, request: &ScanRequest) -> AppResult<ScanOutcome> {
        let rfid_uid = normalize_rfid_uid(&request.rfid_uid)?;
        let zone = non_blank(request.zone.as_deref()).unwrap_or(&self.config.default_zone).to_string();
        let device_id = non_blank(request.device_id.as_deref())
            .unwrap_or(&self.config.default_device)
            .to_string();

        // Placeholders are committed on their own so the log below always
        // references an existing student
        let (student, new_registration) = match self.repository.students.find_by_uid(&rfid_uid).await? {
            Some(student) => (student, false),
            None => (self.students.auto_register(&rfid_uid).await?, true),
        };
        if !student.is_active {
            return Err(AppError::Forbidden("Student account is inactive".to_string()));
        }

        let mut tx = self.repository.pool.begin().await?;

        let student = self.repository.students.lock(&mut tx, student.id).await?;
        let last_in_zone = match self.config.mode {
            AttendanceMode::Zone => {
                self.repository
                    .attendance
                    .last_action_in_zone(&mut tx, student.id, &zone)
                    .await?
            }
            AttendanceMode::Global => None,
        };
        let action = next_action(self.config.mode, student.is_inside, last_in_zone);

        let timestamp = Utc::now();
        self.repository
            .students
            .set_inside(&mut tx, student.id, action == ScanAction::Entry)
            .await?;
        self.repository
            .attendance
            .insert(&mut tx, student.id, &rfid_uid, action, &device_id, &zone, timestamp)
            .await?;

        tx.commit().await?;

        tracing::info!(
            student_id = student.id,
            rfid_uid = %rfid_uid,
            action = %action,
            zone = %zone,
            device_id = %device_id,
            "Scan recorded"
        );

        self.scan_buffer
            .record(LastScan {
                rfid_uid: rfid_uid.clone(),
                student_id: student.id,
                student_name: student.name.clone(),
                action,
                zone: zone.clone(),
                new_registration,
                scanned_at: timestamp,
            })
            .await;

        Ok(ScanOutcome {
            action,
            student: StudentShort::from(&student),
            zone,
            device_id,
            new_registration,
            timestamp,
        })
    }

    /// Take the latest buffered scan of a zone
    pub async fn latest_scan(&self, zone: Option<&str>) -> Option<LastScan> {
        let zone = non_blank(zone).unwrap_or(&self.config.default_zone);
        self.scan_buffer.take(zone, Utc::now()).await
    }

    /// Get a page of logs, newest first
    pub async fn list(&self, query: &AttendanceQuery) -> AppResult<AttendancePage> {
        let mut filter = LogFilter {
            zone: non_blank(query.zone.as_deref()),
            ..Default::default()
        };
        if let Some(raw) = non_blank(query.date.as_deref()) {
            let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|_| AppError::Validation(format!("Invalid date: {} (expected YYYY-MM-DD)", raw)))?;
            let from = day.and_time(NaiveTime::MIN).and_utc();
            filter.from = Some(from);
            filter.until = Some(from + Duration::days(1));
        }

        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE);

        let offset = page_offset(page, per_page)?;

        let (logs, total) = self.repository.attendance.list(&filter, offset, per_page).await?;

        Ok(AttendancePage {
            logs,
            total,
            pages: (total + per_page - 1) / per_page,
            current_page: page,
        })
    }

    /// All logs of the current UTC day
    pub async fn today(&self) -> AppResult<Vec<AttendanceLog>> {
        let from = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
        self.repository.attendance.between(from, from + Duration::days(1)).await
    }

    /// Correct the zone recorded on a log
    pub async fn update_zone(&self, id: i64, zone: &str) -> AppResult<AttendanceLog> {
        let zone = non_blank(Some(zone))
            .ok_or_else(|| AppError::Validation("zone is required".to_string()))?;
        let log = self.repository.attendance.update_zone(id, zone).await?;
        tracing::info!(log_id = id, zone, "Attendance zone corrected");
        Ok(log)
    }
}

/// Row offset of a 1-based page
fn page_offset(page: i64, per_page: i64) -> AppResult<i64> {
    (page - 1)
        .checked_mul(per_page)
        .ok_or_else(|| AppError::Validation("page is out of range".to_string()))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
