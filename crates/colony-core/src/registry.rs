// SPDX-License-Identifier: AGPL-3.0
// Colony Core - Transfer registry
//
// The single authoritative view of in-flight and past transfers. A worker
// task exclusively owns the id-to-record map; backend events, ticker ticks,
// and shutdown all arrive over one command channel, so every mutation runs
// to completion before the next is applied. Subscribers observe the map
// through a watch channel that replays the current snapshot on subscription.
//
// Every mutation is written through to the persisted store as a whole,
// fire-and-forget: durability is best-effort and a crash loses at most the
// last unflushed revision.

use crate::events::TransferEvent;
use crate::format::{display_name, format_elapsed, format_file_size};
use crate::store::StateStore;
use crate::ticker::TickerTable;
use crate::types::{TransferKind, TransferMap, TransferRecord, TransferStatus};
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::{AbortHandle, JoinHandle};

/// Key the snapshot is persisted under
const STORE_KEY: &str = "transferManager";

/// Error recorded on transfers found still in flight after a restart
const RESTART_ERROR: &str = "transfer interrupted by application restart";

#[derive(Debug)]
pub(crate) enum Command {
    Event(TransferEvent),
    Tick(String),
    Shutdown,
}

struct Session {
    cmd_tx: mpsc::UnboundedSender<Command>,
    worker: JoinHandle<()>,
    forwarder: AbortHandle,
}

/// Handle to the transfer registry. Construct once per application and share
/// by reference; `initialize` is idempotent while a session is active.
pub struct TransferRegistry {
    store: Arc<StateStore>,
    snapshot_tx: Arc<watch::Sender<TransferMap>>,
    session: Mutex<Option<Session>>,
}

impl TransferRegistry {
    pub fn new(store: Arc<StateStore>) -> Self {
        let (snapshot_tx, _) = watch::channel(TransferMap::new());
        Self {
            store,
            snapshot_tx: Arc::new(snapshot_tx),
            session: Mutex::new(None),
        }
    }

    /// Load the persisted snapshot, apply the restart recovery policy, and
    /// start consuming backend events. Repeated calls while a session is
    /// active are no-ops. A failure to read the store is not fatal: the
    /// registry starts empty rather than blocking the UI.
    pub async fn initialize(&self, events: async_channel::Receiver<TransferEvent>) {
        let mut session = self.session.lock().await;
        if session.is_some() {
            tracing::debug!("transfer registry already initialized");
            return;
        }

        let mut map: TransferMap = match self.store.get(STORE_KEY).await {
            Ok(Some(saved)) => saved,
            Ok(None) => TransferMap::new(),
            Err(e) => {
                tracing::warn!("failed to load persisted transfers, starting empty: {}", e);
                TransferMap::new()
            }
        };

        // Recovery: an in-progress transfer cannot have survived the restart.
        for record in map.values_mut() {
            if record.status.is_in_flight() {
                tracing::info!(id = %record.id, "reclassifying interrupted transfer as errored");
                record.status = TransferStatus::Errored;
                record.complete = false;
                record.error = Some(RESTART_ERROR.to_string());
            }
            // Backfill fields older snapshots did not carry
            if record.name.is_empty() {
                record.name = display_name(&record.path);
            }
            if record.started_date.is_empty() {
                record.started_date = chrono::Utc::now().to_rfc3339();
            }
            if record.size_label.is_none() {
                record.size_label = record.size.map(format_file_size);
            }
        }

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        // Vacuously empty after recovery; kept for any future state that
        // legitimately stays in flight across a restart.
        let mut tickers = TickerTable::new();
        for record in map.values() {
            if record.status.is_in_flight() {
                tickers.start(&record.id, cmd_tx.clone());
            }
        }

        self.snapshot_tx.send_replace(map.clone());
        persist(self.store.clone(), map.clone());

        let fwd_tx = cmd_tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Ok(event) = events.recv().await {
                if fwd_tx.send(Command::Event(event)).is_err() {
                    break;
                }
            }
        })
        .abort_handle();

        let worker = Worker {
            map,
            tickers,
            cmd_tx: cmd_tx.clone(),
            snapshot_tx: self.snapshot_tx.clone(),
            store: self.store.clone(),
        };
        let worker = tokio::spawn(worker.run(cmd_rx));

        *session = Some(Session {
            cmd_tx,
            worker,
            forwarder,
        });
        tracing::info!("transfer registry initialized");
    }

    /// Observe the registry. The receiver holds the current snapshot
    /// immediately and sees every subsequent mutation.
    pub fn subscribe(&self) -> watch::Receiver<TransferMap> {
        self.snapshot_tx.subscribe()
    }

    /// Clone of the current snapshot
    pub fn snapshot(&self) -> TransferMap {
        self.snapshot_tx.borrow().clone()
    }

    /// Stop consuming events and cancel all tickers. No further mutations
    /// occur after this returns; an in-flight persisted write may still land.
    /// Safe to call without `initialize`, and more than once.
    pub async fn teardown(&self) {
        let mut session = self.session.lock().await;
        let Some(Session {
            cmd_tx,
            worker,
            forwarder,
        }) = session.take()
        else {
            return;
        };

        forwarder.abort();
        let _ = cmd_tx.send(Command::Shutdown);
        let _ = worker.await;
        tracing::info!("transfer registry torn down");
    }
}

/// Owns the map and ticker table for the lifetime of one session
struct Worker {
    map: TransferMap,
    tickers: TickerTable,
    cmd_tx: mpsc::UnboundedSender<Command>,
    snapshot_tx: Arc<watch::Sender<TransferMap>>,
    store: Arc<StateStore>,
}

impl Worker {
    async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(cmd) = cmd_rx.recv().await {
            match cmd {
                Command::Event(event) => self.apply_event(event),
                Command::Tick(id) => self.apply_tick(&id),
                Command::Shutdown => break,
            }
        }
        self.tickers.cancel_all();
        tracing::debug!("transfer registry worker stopped");
    }

    fn apply_event(&mut self, event: TransferEvent) {
        match event {
            TransferEvent::DownloadStarted { id, path, size, .. } => {
                self.start(TransferKind::Download, id, path, size)
            }
            TransferEvent::UploadStarted { id, path, size } => {
                self.start(TransferKind::Upload, id, path, size)
            }
            TransferEvent::DownloadComplete { id } | TransferEvent::UploadComplete { id } => {
                self.finish(&id)
            }
            TransferEvent::DownloadError { id, message }
            | TransferEvent::UploadError { id, message } => self.fail(&id, message),
        }
    }

    fn start(&mut self, kind: TransferKind, id: String, path: String, size: Option<u64>) {
        if self.map.contains_key(&id) {
            // A reused id is a fresh attempt: the old record and its ticker
            // are replaced outright.
            tracing::warn!(%id, "duplicate start event, restarting transfer");
        }
        self.tickers.cancel(&id);
        let record = TransferRecord::started(kind, id.clone(), path, size);
        tracing::info!(%id, name = %record.name, ?kind, "transfer started");
        self.map.insert(id.clone(), record);
        self.tickers.start(&id, self.cmd_tx.clone());
        self.publish();
    }

    fn finish(&mut self, id: &str) {
        let Some(record) = self.map.get_mut(id) else {
            tracing::debug!(%id, "complete event for unknown transfer, ignoring");
            return;
        };
        if record.status.is_terminal() {
            tracing::debug!(%id, "complete event for settled transfer, ignoring");
            return;
        }
        self.tickers.cancel(id);
        record.progress = 100;
        record.complete = true;
        record.status = TransferStatus::Complete;
        tracing::info!(%id, "transfer complete");
        self.publish();
    }

    fn fail(&mut self, id: &str, message: String) {
        let Some(record) = self.map.get_mut(id) else {
            tracing::debug!(%id, "error event for unknown transfer, ignoring");
            return;
        };
        if record.status.is_terminal() {
            tracing::debug!(%id, "error event for settled transfer, ignoring");
            return;
        }
        self.tickers.cancel(id);
        tracing::warn!(%id, error = %message, "transfer failed");
        record.error = Some(message);
        record.complete = false;
        record.status = TransferStatus::Errored;
        self.publish();
    }

    fn apply_tick(&mut self, id: &str) {
        let Some(record) = self.map.get_mut(id) else {
            return;
        };
        if record.complete {
            return;
        }
        record.elapsed_secs += 1;
        record.elapsed = Some(format_elapsed(record.elapsed_secs));
        self.publish();
    }

    /// Notify subscribers and write the snapshot through to disk
    fn publish(&self) {
        self.snapshot_tx.send_replace(self.map.clone());
        persist(self.store.clone(), self.map.clone());
    }
}

/// Fire-and-forget write-through. A failed write is only logged: the whole
/// map is rewritten on the next mutation, so nothing is lost beyond the most
/// recent revision.
fn persist(store: Arc<StateStore>, map: TransferMap) {
    tokio::spawn(async move {
        let result = async {
            store.set(STORE_KEY, &map).await?;
            store.save().await
        }
        .await;
        if let Err(e) = result {
            tracing::warn!("transfer state write-through failed: {}", e);
        }
    });
}
