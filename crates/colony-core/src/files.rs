// SPDX-License-Identifier: AGPL-3.0
// Colony Core - Local file metadata

use crate::format::{display_name, format_file_size};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata for a local file picked for upload, captured before the backend
/// assigns it a network address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub uuid: String,
    pub name: String,
    pub path: String,
    pub extension: String,
    /// ISO-8601, captured at creation
    pub uploaded_date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autonomi_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl FileMetadata {
    pub fn new(path: &str, file_size: Option<u64>) -> Self {
        let extension = Path::new(path)
            .extension()
            .map(|e| e.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            name: display_name(path),
            path: path.to_string(),
            extension,
            uploaded_date: chrono::Utc::now().to_rfc3339(),
            autonomi_address: None,
            preview_cost: None,
            actual_cost: None,
            file_size,
        }
    }

    pub fn size_label(&self) -> String {
        self.file_size
            .map(format_file_size)
            .unwrap_or_else(|| "0 B".to_string())
    }
}
