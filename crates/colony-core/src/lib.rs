// SPDX-License-Identifier: AGPL-3.0
// Colony Core - Shared client logic for the Colony frontends
//
// This crate provides:
// - TransferRegistry: the live view of uploads/downloads, reconciled with
//   persisted state across restarts and driven by backend events
// - StateStore: the lazily-loaded, disk-backed app state file
// - TransferEvent and the event bridge channel
// - SPARQL search result parsing for the metadata search feature
//
// UI rendering and the backend process (wallet, network client, pod
// datastore) live elsewhere; this crate only consumes their boundaries.

pub mod events;
pub mod files;
pub mod format;
pub mod registry;
pub mod sparql;
pub mod store;
mod ticker;
pub mod types;

// Re-export commonly used items
pub use events::{event_channel, TransferEvent};
pub use files::FileMetadata;
pub use format::{display_name, format_elapsed, format_file_size};
pub use registry::TransferRegistry;
pub use sparql::{parse_browse_results, parse_text_results, SearchHit};
pub use store::StateStore;
pub use types::{AppError, TransferKind, TransferMap, TransferRecord, TransferStatus};
