//! services/client/src/features/habit_logs.rs
//!
//! Deleting habit log entries, one date or several at once.

use crate::app::api_client::ApiClient;
use crate::error::{error_message, ClientResult};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Per-date results of a bulk deletion. Every requested date ends up in exactly
/// one of the two lists, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkDeleteReport {
    pub deleted: Vec<NaiveDate>,
    /// Dates that could not be deleted, with the user-facing reason.
    pub failed: Vec<(NaiveDate, String)>,
}

impl BulkDeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// One line suitable for a toast.
    pub fn summary(&self) -> String {
        match (self.deleted.len(), self.failed.len()) {
            (0, 0) => "No logs selected".to_string(),
            (deleted, 0) => format!("{} log(s) deleted successfully", deleted),
            (0, failed) => format!("Failed to delete {} log(s)", failed),
            (deleted, failed) => format!("{} log(s) deleted, {} failed", deleted, failed),
        }
    }
}

pub struct HabitLogService {
    api: Arc<ApiClient>,
}

impl HabitLogService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub async fn delete(&self, habit_id: u64, date: NaiveDate) -> ClientResult<Value> {
        self.api.delete(&log_path(habit_id, date)).await
    }

    /// Deletes every date, one request each, and reports what happened to each.
    /// A failure does not stop the remaining deletions. Duplicate dates are
    /// deleted once.
    pub async fn delete_many(&self, habit_id: u64, dates: &[NaiveDate]) -> BulkDeleteReport {
        let mut report = BulkDeleteReport::default();
        let mut seen = HashSet::new();
        for &date in dates {
            if !seen.insert(date) {
                continue;
            }
            match self.delete(habit_id, date).await {
                Ok(_) => report.deleted.push(date),
                Err(e) => {
                    warn!("Failed to delete log {} of habit {}: {}", date, habit_id, e);
                    report.failed.push((date, error_message(Some(&e))));
                }
            }
        }
        info!("Bulk delete for habit {}: {}", habit_id, report.summary());
        report
    }
}

fn log_path(habit_id: u64, date: NaiveDate) -> String {
    format!("/habits/{}/logs/{}", habit_id, date.format("%Y-%m-%d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn log_paths_use_iso_dates() {
        assert_eq!(log_path(12, day(5)), "/habits/12/logs/2024-03-05");
    }

    #[test]
    fn summary_never_claims_more_than_was_deleted() {
        let partial = BulkDeleteReport {
            deleted: vec![day(1)],
            failed: vec![(day(2), "Server error: 500".into())],
        };
        assert!(!partial.is_complete());
        assert_eq!(partial.summary(), "1 log(s) deleted, 1 failed");

        let full = BulkDeleteReport {
            deleted: vec![day(1), day(2)],
            failed: vec![],
        };
        assert!(full.is_complete());
        assert_eq!(full.summary(), "2 log(s) deleted successfully");
        assert_eq!(BulkDeleteReport::default().summary(), "No logs selected");
    }
}
