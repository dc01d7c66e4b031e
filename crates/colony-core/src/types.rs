// SPDX-License-Identifier: AGPL-3.0
// Colony Core - Type definitions

use crate::format;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Direction of a tracked transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferKind {
    Download,
    Upload,
}

/// Lifecycle state of a tracked transfer.
///
/// `Pending` and `Cancelled` are part of the value domain but no backend
/// event currently produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Pending,
    Downloading,
    Uploading,
    Complete,
    Errored,
    Cancelled,
}

impl TransferStatus {
    /// True for states that accept no further lifecycle transitions
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Errored | Self::Cancelled)
    }

    /// True while the backend is actively moving bytes
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Downloading | Self::Uploading)
    }
}

/// One tracked upload or download, keyed by `id` in the registry.
///
/// The serialized form is the persisted snapshot shape; `elapsed_secs` and
/// `elapsed` are transient and never written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRecord {
    pub id: String,
    /// Display name, the final segment of `path`
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransferKind,
    pub path: String,
    /// Size in bytes, when the backend reported one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    /// Human-readable size, derived from `size`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_label: Option<String>,
    /// 0-100
    pub progress: u8,
    pub complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub status: TransferStatus,
    /// ISO-8601 timestamp captured at creation
    #[serde(default)]
    pub started_date: String,
    /// Seconds since the transfer started, advanced by the ticker
    #[serde(skip)]
    pub elapsed_secs: u64,
    /// `elapsed_secs` formatted as HH:MM:SS
    #[serde(skip)]
    pub elapsed: Option<String>,
}

impl TransferRecord {
    /// Build a fresh record for a `*-started` event
    pub fn started(kind: TransferKind, id: String, path: String, size: Option<u64>) -> Self {
        Self {
            name: format::display_name(&path),
            size_label: size.map(format::format_file_size),
            status: match kind {
                TransferKind::Download => TransferStatus::Downloading,
                TransferKind::Upload => TransferStatus::Uploading,
            },
            started_date: chrono::Utc::now().to_rfc3339(),
            elapsed: Some("00:00:00".to_string()),
            elapsed_secs: 0,
            progress: 0,
            complete: false,
            error: None,
            id,
            kind,
            path,
            size,
        }
    }
}

/// The registry's full view, id to record
pub type TransferMap = HashMap<String, TransferRecord>;

/// Error types for the application
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("File I/O error: {0}")]
    FileIo(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("State store error: {0}")]
    Store(String),

    #[error("Unknown event: {0}")]
    UnknownEvent(String),
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::FileIo(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_started_record_defaults() {
        let record = TransferRecord::started(
            TransferKind::Upload,
            "t1".to_string(),
            "/home/u/report.pdf".to_string(),
            Some(1_048_576),
        );
        assert_eq!(record.name, "report.pdf");
        assert_eq!(record.size_label.as_deref(), Some("1.00 MB"));
        assert_eq!(record.status, TransferStatus::Uploading);
        assert_eq!(record.progress, 0);
        assert!(!record.complete);
        assert_eq!(record.elapsed.as_deref(), Some("00:00:00"));
        assert!(!record.started_date.is_empty());
    }

    #[test]
    fn test_persisted_shape() {
        let record = TransferRecord::started(
            TransferKind::Download,
            "t2".to_string(),
            "/tmp/photo.jpg".to_string(),
            None,
        );
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "download");
        assert_eq!(json["status"], "Downloading");
        assert_eq!(json["name"], "photo.jpg");
        // Transient fields never hit disk
        assert!(json.get("elapsed").is_none());
        assert!(json.get("elapsedSecs").is_none());
        assert!(json.get("startedDate").is_some());
    }

    #[test]
    fn test_older_snapshot_tolerated() {
        // name/startedDate/size were not always persisted
        let json = serde_json::json!({
            "id": "t3",
            "type": "upload",
            "path": "/data/archive.tar",
            "progress": 40,
            "complete": false,
            "status": "Uploading",
        });
        let record: TransferRecord = serde_json::from_value(json).unwrap();
        assert_eq!(record.name, "");
        assert_eq!(record.started_date, "");
        assert_eq!(record.size, None);
        assert_eq!(record.status, TransferStatus::Uploading);
    }

    #[test]
    fn test_status_predicates() {
        assert!(TransferStatus::Complete.is_terminal());
        assert!(TransferStatus::Errored.is_terminal());
        assert!(TransferStatus::Cancelled.is_terminal());
        assert!(TransferStatus::Downloading.is_in_flight());
        assert!(TransferStatus::Uploading.is_in_flight());
        assert!(!TransferStatus::Pending.is_in_flight());
        assert!(!TransferStatus::Pending.is_terminal());
    }
}
