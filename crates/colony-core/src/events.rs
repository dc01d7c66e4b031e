// SPDX-License-Identifier: AGPL-3.0
// Colony Core - Backend event bridge
//
// The backend process announces transfer lifecycle transitions as named
// events with JSON payloads. For a given id, a `*-started` event is assumed
// to precede any `*-complete` / `*-error` for that id; the registry's only
// defense against out-of-order delivery is the unknown-id no-op rule.

use crate::types::AppError;
use serde::Deserialize;

pub const DOWNLOAD_STARTED: &str = "download-started";
pub const DOWNLOAD_COMPLETE: &str = "download-complete";
pub const DOWNLOAD_ERROR: &str = "download-error";
pub const UPLOAD_STARTED: &str = "upload-started";
pub const UPLOAD_COMPLETE: &str = "upload-complete";
pub const UPLOAD_ERROR: &str = "upload-error";

/// A transfer lifecycle event emitted by the backend
#[derive(Debug, Clone, PartialEq)]
pub enum TransferEvent {
    DownloadStarted {
        id: String,
        address: String,
        path: String,
        size: Option<u64>,
    },
    DownloadComplete {
        id: String,
    },
    DownloadError {
        id: String,
        message: String,
    },
    UploadStarted {
        id: String,
        path: String,
        size: Option<u64>,
    },
    UploadComplete {
        id: String,
    },
    UploadError {
        id: String,
        message: String,
    },
}

#[derive(Deserialize)]
struct DownloadStartedPayload {
    id: String,
    address: String,
    path: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Deserialize)]
struct UploadStartedPayload {
    id: String,
    path: String,
    #[serde(default)]
    size: Option<u64>,
}

#[derive(Deserialize)]
struct IdPayload {
    id: String,
}

#[derive(Deserialize)]
struct ErrorPayload {
    id: String,
    message: String,
}

impl TransferEvent {
    /// Translate a named wire event and its JSON payload
    pub fn parse(name: &str, payload: serde_json::Value) -> Result<Self, AppError> {
        match name {
            DOWNLOAD_STARTED => {
                let p: DownloadStartedPayload = serde_json::from_value(payload)?;
                Ok(Self::DownloadStarted {
                    id: p.id,
                    address: p.address,
                    path: p.path,
                    size: p.size,
                })
            }
            DOWNLOAD_COMPLETE => {
                let p: IdPayload = serde_json::from_value(payload)?;
                Ok(Self::DownloadComplete { id: p.id })
            }
            DOWNLOAD_ERROR => {
                let p: ErrorPayload = serde_json::from_value(payload)?;
                Ok(Self::DownloadError {
                    id: p.id,
                    message: p.message,
                })
            }
            UPLOAD_STARTED => {
                let p: UploadStartedPayload = serde_json::from_value(payload)?;
                Ok(Self::UploadStarted {
                    id: p.id,
                    path: p.path,
                    size: p.size,
                })
            }
            UPLOAD_COMPLETE => {
                let p: IdPayload = serde_json::from_value(payload)?;
                Ok(Self::UploadComplete { id: p.id })
            }
            UPLOAD_ERROR => {
                let p: ErrorPayload = serde_json::from_value(payload)?;
                Ok(Self::UploadError {
                    id: p.id,
                    message: p.message,
                })
            }
            other => Err(AppError::UnknownEvent(other.to_string())),
        }
    }

    /// The transfer id this event refers to
    pub fn id(&self) -> &str {
        match self {
            Self::DownloadStarted { id, .. }
            | Self::DownloadComplete { id }
            | Self::DownloadError { id, .. }
            | Self::UploadStarted { id, .. }
            | Self::UploadComplete { id }
            | Self::UploadError { id, .. } => id,
        }
    }
}

/// Channel pair carrying backend events to the registry. The sender side
/// belongs to whatever owns the backend boundary.
pub fn event_channel(
    capacity: usize,
) -> (
    async_channel::Sender<TransferEvent>,
    async_channel::Receiver<TransferEvent>,
) {
    async_channel::bounded(capacity)
}
