// SPDX-License-Identifier: AGPL-3.0
// Colony Core - Per-transfer elapsed-time tickers
//
// Timer handles live in a side table keyed by transfer id, never inside the
// transfer records themselves. Each ticker is an independent 1 Hz task that
// sends a tick message into the registry's command channel; the registry's
// tick handler does the actual mutation.

use crate::registry::Command;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::AbortHandle;
use tokio::time::MissedTickBehavior;

/// Side table of running tickers, id to abort handle
#[derive(Default)]
pub(crate) struct TickerTable {
    handles: HashMap<String, AbortHandle>,
}

impl TickerTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start (or restart) the ticker for a transfer
    pub fn start(&mut self, id: &str, tx: UnboundedSender<Command>) {
        self.cancel(id);

        let tick_id = id.to_string();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick fires immediately; the counter starts at +1s
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(Command::Tick(tick_id.clone())).is_err() {
                    break;
                }
            }
        });

        self.handles.insert(id.to_string(), handle.abort_handle());
    }

    pub fn cancel(&mut self, id: &str) {
        if let Some(handle) = self.handles.remove(id) {
            handle.abort();
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.handles.len()
    }
}
