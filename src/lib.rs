pub mod autosave;
pub mod config;
pub mod controller;
pub mod logging;
pub mod manager;
pub mod model;
pub mod placement;
pub mod richtext;
pub mod storage;

pub use config::NotesConfig;
pub use controller::{FocusState, NoteCommand, NoteController};
pub use manager::NotesManager;
pub use model::{Foreground, NoteColor, NoteRecord};
pub use storage::{JsonFileStore, MemoryStore, NoteStore, StorageError};
