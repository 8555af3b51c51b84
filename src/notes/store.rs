//! Persistence collaborator contract.
//!
//! The engine talks to storage exclusively through [`NoteStore`]; the crate
//! ships a filesystem implementation in [`super::fs_store`], and tests
//! substitute fakes. All methods are synchronous — the runtime executes them
//! on a dedicated worker thread and feeds completions back to the engine as
//! events, preserving submission order.

use thiserror::Error;

use super::model::{Note, NoteId, NoteMetadata, SearchResult, Settings};

/// Storage-layer failures surfaced to the engine.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("note not found: {0}")]
    NotFound(NoteId),

    #[error("invalid note id: {0}")]
    InvalidId(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub trait NoteStore: Send {
    /// Read a single note by id.
    fn read(&self, id: &NoteId) -> Result<Note, StoreError>;

    /// Persist content under `id`. The returned note's id MAY differ from
    /// the input when the content's title implies a rename.
    fn save(&self, id: &NoteId, content: &str) -> Result<Note, StoreError>;

    /// Create a new note from the configured name template.
    fn create(&self) -> Result<Note, StoreError>;

    fn delete(&self, id: &NoteId) -> Result<(), StoreError>;

    /// Copy a note to a `-N` suffixed sibling and return the copy.
    fn duplicate(&self, id: &NoteId) -> Result<Note, StoreError>;

    /// List all notes, pinned first, then newest first.
    fn list(&self) -> Result<Vec<NoteMetadata>, StoreError>;

    /// Authoritative ranked search. May legitimately return no hits.
    fn search(&self, query: &str) -> Result<Vec<SearchResult>, StoreError>;

    fn settings(&self) -> Result<Settings, StoreError>;

    fn update_settings(&self, settings: &Settings) -> Result<(), StoreError>;
}
