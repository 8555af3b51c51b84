//! Scratch Notes - synchronization and reconciliation engine for a
//! local-first markdown note editor.
//!
//! Keeps an in-memory editable buffer, a debounced-write persistence path,
//! and externally-observed file changes mutually consistent: one note open
//! at a time, autosaved behind a debounce, renamed on title changes, and
//! reconciled against edits made by other processes in the same folder.

pub mod config;
pub mod error;
pub mod logging;
pub mod notes;
pub mod runtime;
pub mod watcher;

pub use config::EngineConfig;
pub use error::{ErrorSeverity, NotesError};
pub use notes::{
    Codec, Command, Effect, Event, FsNoteStore, Note, NoteId, NoteMetadata, NoteStore,
    NotesEngine, PlainTextCodec, SearchResult, Settings, StoreError,
};
pub use runtime::NotesRuntime;
pub use watcher::{NotesChangedEvent, NotesWatcher};
