//! Note synchronization and reconciliation engine.
//!
//! Keeps three timelines consistent without locks or a server: user edits in
//! an in-memory buffer, debounced writes to per-note markdown files, and
//! asynchronous file-change notifications from a watcher. The engine itself
//! ([`NotesEngine`]) is a single-threaded state machine; all I/O is expressed
//! as commands executed by a driver (see [`crate::runtime`]) that feeds
//! completions back in as events.
//!
//! ## Pieces
//! - [`model`]: ids, note records, settings, the save fingerprint
//! - [`codec`]: the pluggable canonical-text / buffer-document boundary
//! - [`store`] / [`fs_store`]: the persistence contract and its
//!   markdown-files-in-a-folder implementation
//! - [`autosave`]: debounced save scheduling
//! - [`engine`] / [`reconcile`]: the controller, the external-change
//!   detector, the two-tier search merge, and the buffer reconciliation
//!   state machine

pub mod autosave;
pub mod codec;
pub mod engine;
pub mod fs_store;
pub mod model;
pub mod reconcile;
pub mod store;

pub use codec::{Codec, CodecError, PlainTextCodec};
pub use engine::{Command, Effect, Event, NotesEngine, RequestId};
pub use fs_store::FsNoteStore;
pub use model::{Note, NoteId, NoteMetadata, SaveFingerprint, SearchResult, Settings};
pub use store::{NoteStore, StoreError};
