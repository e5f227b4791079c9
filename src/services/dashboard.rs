//! Dashboard statistics

use chrono::{DateTime, Duration, DurationRound, NaiveTime, Utc};

use crate::{
    error::{AppError, AppResult},
    models::{
        attendance::ScanAction,
        dashboard::{DashboardStats, HourlyBucket, LendingStats, ZonePresence},
    },
    repository::Repository,
};

const HISTOGRAM_HOURS: i32 = 24;
const RECENT_LOGS: i64 = 10;

#[derive(Clone)]
pub struct DashboardService {
    repository: Repository,
}

impl DashboardService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    pub async fn stats(&self) -> AppResult<DashboardStats> {
        let now = Utc::now();
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        let tomorrow = today + Duration::days(1);

        let attendance = &self.repository.attendance;
        let today_entries = attendance.count_action(ScanAction::Entry, today, tomorrow).await?;
        let today_exits = attendance.count_action(ScanAction::Exit, today, tomorrow).await?;
        let recent_logs = attendance.recent(RECENT_LOGS).await?;

        let from = histogram_start(now)?;
        let counts = attendance.hourly_entries(from, HISTOGRAM_HOURS).await?;

        let zones = attendance
            .presence_by_zone()
            .await?
            .into_iter()
            .map(|(zone, inside)| ZonePresence { zone, inside })
            .collect();

        let unpaid_fines = self.repository.book_loans.count_unpaid_fines(now).await?
            + self.repository.apparatus_loans.count_unpaid_fines(now).await?;

        Ok(DashboardStats {
            inside_count: self.repository.students.count_inside().await?,
            total_students: self.repository.students.count_active().await?,
            today_entries,
            today_exits,
            recent_logs,
            hourly_entries: fill_hours(from, HISTOGRAM_HOURS, &counts),
            zones,
            lending: LendingStats {
                active_book_loans: self.repository.book_loans.count_active().await?,
                overdue_book_loans: self.repository.book_loans.count_overdue(now).await?,
                active_apparatus_loans: self.repository.apparatus_loans.count_active().await?,
                unpaid_fines,
            },
        })
    }
}

/// Start of the oldest bucket so that the last one holds the current hour
fn histogram_start(now: DateTime<Utc>) -> AppResult<DateTime<Utc>> {
    let hour = now
        .duration_trunc(Duration::hours(1))
        .map_err(|e| AppError::Internal(format!("Cannot truncate {}: {}", now, e)))?;
    Ok(hour - Duration::hours(i64::from(HISTOGRAM_HOURS - 1)))
}

/// Expand sparse (bucket, count) rows into one bucket per hour, oldest first
fn fill_hours(from: DateTime<Utc>, hours: i32, counts: &[(i32, i64)]) -> Vec<HourlyBucket> {
    (0..hours)
        .map(|bucket| HourlyBucket {
            hour: from + Duration::hours(i64::from(bucket)),
            entries: counts
                .iter()
                .find(|(b, _)| *b == bucket)
                .map(|(_, n)| *n)
                .unwrap_or(0),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_histogram_covers_current_hour() {
        let now = Utc.with_ymd_and_hms(2024, 5, 2, 14, 37, 12).unwrap();
        let from = histogram_start(now).unwrap();
        assert_eq!(from, Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap());

        let buckets = fill_hours(from, HISTOGRAM_HOURS, &[]);
        assert_eq!(buckets.len(), 24);
        assert_eq!(buckets[23].hour, Utc.with_ymd_and_hms(2024, 5, 2, 14, 0, 0).unwrap());
    }

    #[test]
    fn test_fill_hours_places_counts() {
        let from = Utc.with_ymd_and_hms(2024, 5, 1, 15, 0, 0).unwrap();
        let buckets = fill_hours(from, 24, &[(0, 3), (22, 1), (23, 7)]);
        let entries: Vec<i64> = buckets.iter().map(|b| b.entries).collect();
        assert_eq!(entries[0], 3);
        assert_eq!(entries[1..22].iter().sum::<i64>(), 0);
        assert_eq!(entries[22], 1);
        assert_eq!(entries[23], 7);
    }
}
