use chrono::{DateTime, Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::models::AnswerPayload;

/// Cached answer plus bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Normalized question the fingerprint was derived from
    pub question: String,
    pub payload: AnswerPayload,
    pub created_at: DateTime<Utc>,
    /// None = never expires
    pub ttl_seconds: Option<u64>,
    #[serde(default)]
    pub hit_count: u64,
}

impl CacheEntry {
    pub fn new(question: String, payload: AnswerPayload, ttl: Option<Duration>) -> Self {
        Self {
            question,
            payload,
            created_at: Utc::now(),
            ttl_seconds: ttl.map(|d| d.as_secs().max(1)),
            hit_count: 0,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        let secs = i64::try_from(self.ttl_seconds?).ok()?;
        self.created_at.checked_add_signed(ChronoDuration::try_seconds(secs)?)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|at| now >= at)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Seconds left before expiry; None when the entry never expires.
    pub fn remaining_ttl_at(&self, now: DateTime<Utc>) -> Option<u64> {
        self.expires_at()
            .map(|at| (at - now).num_seconds().max(0) as u64)
    }
}

/// One row of the cache listing.
#[derive(Debug, Clone, Serialize)]
pub struct CacheEntrySummary {
    pub key: String,
    pub question: String,
    pub preview: String,
    pub ttl_seconds: Option<u64>,
    pub ttl_human: String,
    pub hit_count: u64,
    pub created_at: DateTime<Utc>,
}

impl CacheEntrySummary {
    pub fn from_entry(key: String, entry: &CacheEntry, now: DateTime<Utc>) -> Self {
        let ttl_seconds = entry.remaining_ttl_at(now);
        Self {
            key,
            question: entry.question.clone(),
            preview: entry.payload.preview(100),
            ttl_seconds,
            ttl_human: ttl_seconds
                .map(format_duration)
                .unwrap_or_else(|| "never".to_string()),
            hit_count: entry.hit_count,
            created_at: entry.created_at,
        }
    }
}

/// `H:MM:SS`
pub fn format_duration(secs: u64) -> String {
    format!("{}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2}G", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2}M", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2}K", bytes as f64 / KB as f64)
    } else {
        format!("{}B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ttl: Option<u64>) -> CacheEntry {
        CacheEntry::new(
            "q".to_string(),
            AnswerPayload::Text("a".to_string()),
            ttl.map(Duration::from_secs),
        )
    }

    #[test]
    fn test_expiry_boundaries() {
        let e = entry(Some(60));
        assert!(!e.is_expired_at(e.created_at));
        assert!(!e.is_expired_at(e.created_at + ChronoDuration::seconds(59)));
        assert!(e.is_expired_at(e.created_at + ChronoDuration::seconds(60)));
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let e = entry(None);
        assert!(!e.is_expired_at(e.created_at + ChronoDuration::days(3650)));
        assert_eq!(e.remaining_ttl_at(Utc::now()), None);
    }

    #[test]
    fn test_remaining_ttl_saturates() {
        let e = entry(Some(10));
        assert_eq!(e.remaining_ttl_at(e.created_at + ChronoDuration::seconds(4)), Some(6));
        assert_eq!(e.remaining_ttl_at(e.created_at + ChronoDuration::seconds(40)), Some(0));
    }

    #[test]
    fn test_summary_formats() {
        let e = entry(Some(3725));
        let summary = CacheEntrySummary::from_entry("k".to_string(), &e, e.created_at);
        assert_eq!(summary.ttl_seconds, Some(3725));
        assert_eq!(summary.ttl_human, "1:02:05");
        assert_eq!(summary.preview, "a");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.00K");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.00M");
    }
}
