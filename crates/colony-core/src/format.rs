// SPDX-License-Identifier: AGPL-3.0
// Colony Core - Human-readable formatting helpers

use std::path::Path;

const KB: u64 = 1024;
const MB: u64 = KB * 1024;
const GB: u64 = MB * 1024;

/// Format a byte count as "0 B", "512 B", "2.50 MB", "1.10 GB"
pub fn format_file_size(size: u64) -> String {
    if size == 0 {
        return "0 B".to_string();
    }
    if size >= GB {
        format!("{:.2} GB", size as f64 / GB as f64)
    } else if size >= MB {
        format!("{:.2} MB", size as f64 / MB as f64)
    } else if size >= KB {
        format!("{:.2} KB", size as f64 / KB as f64)
    } else {
        format!("{} B", size)
    }
}

/// Format a duration in seconds as zero-padded HH:MM:SS. Hours are not
/// capped, so "27:14:09" is a valid result.
pub fn format_elapsed(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Final segment of a path, for display
pub fn display_name(path: &str) -> String {
    Path::new(path)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}
