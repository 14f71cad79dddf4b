//! Debounced background saving.
//!
//! Edits arrive as messages on an unbounded channel. The worker keeps a
//! mirror of the collection and, once `window` passes with no new message,
//! writes the mirror through the store on the blocking pool. Each message
//! re-arms the window, so a burst of edits becomes one write.

use crate::model::NoteRecord;
use crate::storage::NoteStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const DEFAULT_WINDOW: Duration = Duration::from_millis(300);

#[derive(Debug)]
enum SaveRequest {
    /// Full collection, in display order.
    Snapshot(Vec<NoteRecord>),
    /// One note's latest state; ignored for ids not in the mirror.
    Upsert(NoteRecord),
    /// Finish any write in progress, then exit without another.
    Stop,
}

/// Cloneable sending half handed to per-note subscriptions.
#[derive(Debug, Clone)]
pub struct SaveTrigger {
    tx: mpsc::UnboundedSender<SaveRequest>,
}

impl SaveTrigger {
    pub fn snapshot(&self, notes: Vec<NoteRecord>) {
        // The receiver is gone only after cancel(); nothing left to save then.
        let _ = self.tx.send(SaveRequest::Snapshot(notes));
    }

    pub fn upsert(&self, note: NoteRecord) {
        let _ = self.tx.send(SaveRequest::Upsert(note));
    }
}

#[derive(Debug)]
pub struct AutoSaver {
    trigger: SaveTrigger,
    worker: Option<JoinHandle<()>>,
}

impl AutoSaver {
    /// Spawns the worker seeded with the collection as currently stored;
    /// must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn NoteStore>, window: Duration, stored: Vec<NoteRecord>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_loop(store, rx, window, stored));
        AutoSaver {
            trigger: SaveTrigger { tx },
            worker: Some(worker),
        }
    }

    pub fn trigger(&self) -> SaveTrigger {
        self.trigger.clone()
    }

    /// Lets a write already in progress finish, drops any pending debounce
    /// and waits for the worker to exit. A save issued afterwards is the
    /// last one to reach the store.
    pub async fn stop(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        let _ = self.trigger.tx.send(SaveRequest::Stop);
        if let Err(err) = worker.await {
            tracing::warn!(error = %err, "autosave worker ended abnormally");
        }
        tracing::debug!("autosave stopped");
    }

    /// Drops any pending debounce. A write already handed to the blocking
    /// pool still runs to completion.
    pub fn cancel(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
            tracing::debug!("autosave cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.worker.is_none()
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }
}

impl Drop for AutoSaver {
    fn drop(&mut self) {
        self.cancel();
    }
}

async fn run_loop(
    store: Arc<dyn NoteStore>,
    mut rx: mpsc::UnboundedReceiver<SaveRequest>,
    window: Duration,
    mut mirror: Vec<NoteRecord>,
) {
    loop {
        // Wait for the first change of a burst
        match rx.recv().await {
            Some(SaveRequest::Stop) | None => break,
            Some(req) => apply(&mut mirror, req),
        }

        // Keep absorbing until the window passes quietly
        loop {
            match tokio::time::timeout(window, rx.recv()).await {
                Ok(Some(SaveRequest::Stop)) => return,
                Ok(Some(req)) => apply(&mut mirror, req),
                Ok(None) => {
                    write(&store, mirror.clone()).await;
                    return;
                }
                Err(_) => break,
            }
        }

        write(&store, mirror.clone()).await;
    }
}

fn apply(mirror: &mut Vec<NoteRecord>, req: SaveRequest) {
    match req {
        SaveRequest::Snapshot(notes) => *mirror = notes,
        SaveRequest::Upsert(note) => {
            if let Some(slot) = mirror.iter_mut().find(|n| n.id == note.id) {
                *slot = note;
            }
        }
        SaveRequest::Stop => {}
    }
}

async fn write(store: &Arc<dyn NoteStore>, notes: Vec<NoteRecord>) {
    let store = store.clone();
    let count = notes.len();
    match tokio::task::spawn_blocking(move || store.save(&notes)).await {
        Ok(Ok(())) => tracing::debug!(count, "autosaved notes"),
        Ok(Err(err)) => tracing::warn!(error = %err, "autosave failed"),
        Err(err) => tracing::warn!(error = %err, "autosave task did not finish"),
    }
}
