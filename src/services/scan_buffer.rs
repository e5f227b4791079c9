//! Latest scan per zone, for kiosk and registration screens that poll.
//!
//! Entries are ephemeral: they expire after the configured TTL, are removed
//! when read, and are lost on restart. Attendance logs stay the record of truth.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Mutex;
use utoipa::ToSchema;

use crate::models::attendance::ScanAction;

/// Last scan seen in a zone
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LastScan {
    pub rfid_uid: String,
    pub student_id: i32,
    pub student_name: String,
    pub action: ScanAction,
    pub zone: String,
    pub new_registration: bool,
    pub scanned_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ScanBuffer {
    ttl: Duration,
    entries: Arc<Mutex<HashMap<String, LastScan>>>,
}

impl ScanBuffer {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            ttl: Duration::seconds(ttl_seconds.max(0)),
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Remember a scan, replacing the previous one of its zone.
    ///
    /// Entries that expired by the time of this scan are evicted.
    pub async fn record(&self, scan: LastScan) {
        let mut entries = self.entries.lock().await;
        entries.retain(|_, previous| scan.scanned_at - previous.scanned_at <= self.ttl);
        entries.insert(scan.zone.clone(), scan);
    }

    /// Remove and return the scan of a zone unless it has expired at `now`
    pub async fn take(&self, zone: &str, now: DateTime<Utc>) -> Option<LastScan> {
        let mut entries = self.entries.lock().await;
        let scan = entries.remove(zone)?;
        if now - scan.scanned_at > self.ttl {
            return None;
        }
        Some(scan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(zone: &str, uid: &str, at: DateTime<Utc>) -> LastScan {
        LastScan {
            rfid_uid: uid.to_string(),
            student_id: 1,
            student_name: "Asha Rao".to_string(),
            action: ScanAction::Entry,
            zone: zone.to_string(),
            new_registration: false,
            scanned_at: at,
        }
    }

    #[tokio::test]
    async fn test_take_clears_entry() {
        let buffer = ScanBuffer::new(10);
        let now = Utc::now();
        buffer.record(scan("Library", "AB12", now)).await;

        let taken = buffer.take("Library", now + Duration::seconds(2)).await;
        assert_eq!(taken.map(|s| s.rfid_uid), Some("AB12".to_string()));
        assert!(buffer.take("Library", now + Duration::seconds(3)).await.is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped() {
        let buffer = ScanBuffer::new(10);
        let now = Utc::now();
        buffer.record(scan("Library", "AB12", now)).await;
        assert!(buffer.take("Library", now + Duration::seconds(11)).await.is_none());
    }

    #[tokio::test]
    async fn test_zones_are_independent() {
        let buffer = ScanBuffer::new(10);
        let now = Utc::now();
        buffer.record(scan("Library", "AB12", now)).await;
        buffer.record(scan("Lab", "CD34", now)).await;
        buffer.record(scan("Lab", "EF56", now)).await;

        assert_eq!(buffer.take("Lab", now).await.map(|s| s.rfid_uid), Some("EF56".to_string()));
        assert_eq!(buffer.take("Library", now).await.map(|s| s.rfid_uid), Some("AB12".to_string()));
        assert!(buffer.take("Gym", now).await.is_none());
    }

    #[tokio::test]
    async fn test_record_evicts_expired_zones() {
        let buffer = ScanBuffer::new(10);
        let now = Utc::now();
        for i in 0..50 {
            buffer.record(scan(&format!("Room-{}", i), "AB12", now)).await;
        }
        buffer.record(scan("Annex", "CD34", now + Duration::seconds(5))).await;
        assert_eq!(buffer.entries.lock().await.len(), 51);

        buffer.record(scan("Library", "EF56", now + Duration::seconds(12))).await;
        assert_eq!(buffer.entries.lock().await.len(), 2);
        assert!(buffer.take("Room-0", now + Duration::seconds(12)).await.is_none());
        assert_eq!(
            buffer.take("Annex", now + Duration::seconds(12)).await.map(|s| s.rfid_uid),
            Some("CD34".to_string())
        );
    }
}
