use crate::autosave::AutoSaver;
use crate::config::NotesConfig;
use crate::controller::{NoteController, SubscriptionId};
use crate::model::{NoteId, NoteRecord, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::placement::{self, ScreenBounds};
use crate::storage::{NoteStore, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};

/// The open set of notes: ordering, selection, filtering and saving.
pub struct NotesManager {
    notes: Vec<NoteController>,
    subscriptions: HashMap<NoteId, SubscriptionId>,
    selected: Option<NoteId>,
    search: String,
    screen: ScreenBounds,
    store: Arc<dyn NoteStore>,
    autosave: AutoSaver,
}

impl NotesManager {
    /// Loads whatever the store holds and builds the collection from it.
    pub fn load(store: Arc<dyn NoteStore>, config: &NotesConfig) -> Self {
        let records = store.load();
        Self::initialize(records, store, config)
    }

    /// Wraps `records`, repairing bad geometry and countdowns longer than
    /// their duration. An empty collection gets one fresh note. Nothing here
    /// schedules a save.
    pub fn initialize(
        records: Vec<NoteRecord>,
        store: Arc<dyn NoteStore>,
        config: &NotesConfig,
    ) -> Self {
        let screen = config.screen;
        let mut records = records;
        for record in records.iter_mut() {
            if placement::repair(record, &screen) {
                tracing::info!(note = %record.id, "repaired stored note geometry");
            }
            if record.clamp_remaining() {
                tracing::info!(note = %record.id, "repaired stored remaining time");
            }
        }
        if records.is_empty() {
            records.push(new_record(&screen));
        }

        let autosave = AutoSaver::spawn(store.clone(), config.debounce, records.clone());
        let mut manager = NotesManager {
            notes: Vec::with_capacity(records.len()),
            subscriptions: HashMap::new(),
            selected: None,
            search: String::new(),
            screen,
            store,
            autosave,
        };
        for record in records {
            manager.attach(NoteController::new(record));
        }
        tracing::debug!(count = manager.notes.len(), "notes initialized");
        manager
    }

    fn attach(&mut self, mut note: NoteController) {
        let trigger = self.autosave.trigger();
        let sub = note.subscribe(move |change| {
            if change.property.is_persisted() {
                trigger.upsert(change.record.clone());
            }
        });
        self.subscriptions.insert(note.id(), sub);
        self.notes.push(note);
    }

    pub fn schedule_save(&self) {
        self.autosave.trigger().snapshot(self.records());
    }

    pub fn create_note(&mut self) -> NoteId {
        let record = new_record(&self.screen);
        let id = record.id;
        self.attach(NoteController::new(record));
        self.selected = Some(id);
        tracing::info!(note = %id, "created note");
        self.schedule_save();
        id
    }

    /// Removes the selected note. Returns its id, or `None` when nothing was
    /// selected.
    pub fn delete_selected(&mut self) -> Option<NoteId> {
        let id = self.selected?;
        self.delete(id).then_some(id)
    }

    pub fn delete(&mut self, id: NoteId) -> bool {
        let Some(idx) = self.position(id) else {
            return false;
        };
        let mut note = self.notes.remove(idx);
        if let Some(sub) = self.subscriptions.remove(&id) {
            note.unsubscribe(sub);
        }
        if self.selected == Some(id) {
            self.selected = None;
        }
        tracing::info!(note = %id, "deleted note");
        self.schedule_save();
        true
    }

    // ---- selection ----

    pub fn select(&mut self, id: NoteId) -> bool {
        if self.position(id).is_none() {
            return false;
        }
        self.selected = Some(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected_id(&self) -> Option<NoteId> {
        self.selected
    }

    pub fn selected(&self) -> Option<&NoteController> {
        self.selected.and_then(|id| self.note(id))
    }

    pub fn selected_mut(&mut self) -> Option<&mut NoteController> {
        let id = self.selected?;
        self.note_mut(id)
    }

    // ---- filtering ----

    pub fn set_search_text(&mut self, text: impl Into<String>) {
        self.search = text.into().to_lowercase();
    }

    pub fn search_text(&self) -> &str {
        &self.search
    }

    pub fn is_visible(&self, note: &NoteController) -> bool {
        note.matches(&self.search)
    }

    pub fn visible_notes(&self) -> impl Iterator<Item = &NoteController> + '_ {
        self.notes.iter().filter(move |n| n.matches(&self.search))
    }

    // ---- access ----

    pub fn notes(&self) -> &[NoteController] {
        &self.notes
    }

    pub fn note(&self, id: NoteId) -> Option<&NoteController> {
        self.notes.iter().find(|n| n.id() == id)
    }

    pub fn note_mut(&mut self, id: NoteId) -> Option<&mut NoteController> {
        self.notes.iter_mut().find(|n| n.id() == id)
    }

    /// Finds the single note whose id starts with `prefix`.
    pub fn find_by_prefix(&self, prefix: &str) -> Option<NoteId> {
        let prefix = prefix.trim().to_lowercase();
        if prefix.is_empty() {
            return None;
        }
        let mut hits = self
            .notes
            .iter()
            .map(|n| n.id())
            .filter(|id| id.to_string().starts_with(&prefix));
        match (hits.next(), hits.next()) {
            (Some(id), None) => Some(id),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.notes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }

    pub fn records(&self) -> Vec<NoteRecord> {
        self.notes.iter().map(|n| n.record().clone()).collect()
    }

    fn position(&self, id: NoteId) -> Option<usize> {
        self.notes.iter().position(|n| n.id() == id)
    }

    // ---- time and persistence ----

    /// Advances every running timer by one second; returns notes whose
    /// countdown finished.
    pub fn tick(&mut self) -> Vec<NoteId> {
        self.notes
            .iter_mut()
            .filter_map(|n| n.tick().then(|| n.id()))
            .collect()
    }

    /// Writes the current collection right away.
    pub async fn save_all(&self) -> Result<(), StorageError> {
        let store = self.store.clone();
        let records = self.records();
        let count = records.len();
        let result = tokio::task::spawn_blocking(move || store.save(&records))
            .await
            .map_err(|e| StorageError::TaskJoin(e.to_string()))
            .and_then(|r| r);
        match &result {
            Ok(()) => tracing::debug!(count, "saved all notes"),
            Err(err) => tracing::error!(error = %err, "saving notes failed"),
        }
        result
    }

    /// Stops autosaving, waiting out any write already under way, then
    /// writes the final state.
    pub async fn shutdown(&mut self) -> Result<(), StorageError> {
        self.autosave.stop().await;
        self.save_all().await
    }
}

/// Drives [`NotesManager::tick`] from a tokio interval.
pub struct Ticker {
    interval: Interval,
}

impl Ticker {
    pub fn new() -> Self {
        Self::with_period(Duration::from_secs(1))
    }

    /// The first tick arrives one `period` after creation. Ticks missed while
    /// the caller was busy are not replayed in a burst.
    pub fn with_period(period: Duration) -> Self {
        let start = tokio::time::Instant::now() + period;
        let mut interval = tokio::time::interval_at(start, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Ticker { interval }
    }

    pub async fn wait(&mut self) {
        self.interval.tick().await;
    }

    /// Waits for the next period, then ticks every note once.
    pub async fn tick(&mut self, manager: &mut NotesManager) -> Vec<NoteId> {
        self.wait().await;
        manager.tick()
    }
}

impl Default for Ticker {
    fn default() -> Self {
        Self::new()
    }
}

fn new_record(screen: &ScreenBounds) -> NoteRecord {
    let (left, top) = placement::place_new(screen, DEFAULT_WIDTH, DEFAULT_HEIGHT);
    NoteRecord::new(left, top)
}
