//! Notes-folder file watcher.
//!
//! Watches the notes folder recursively and emits [`NotesChangedEvent`]s
//! carrying the note ids whose files changed. Events are debounced per path
//! so an editor writing a file in several syscalls produces one
//! notification. The watcher knows nothing about self-echo suppression; the
//! engine's external-change detector decides what is an external edit.

use notify::{recommended_watcher, RecursiveMode, Result as NotifyResult, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::notes::fs_store::note_id_from_path;
use crate::notes::model::NoteId;

/// Event emitted when note files change on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotesChangedEvent {
    pub changed_ids: Vec<NoteId>,
}

/// How often the pending map is swept for ids whose debounce elapsed.
const FLUSH_INTERVAL: Duration = Duration::from_millis(100);

/// Watches a notes folder and emits debounced change events
pub struct NotesWatcher {
    state: Option<(PathBuf, Duration, Sender<NotesChangedEvent>)>,
    watcher_thread: Option<thread::JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
}

impl NotesWatcher {
    /// Create a new NotesWatcher for `root` with the given per-path
    /// debounce window.
    ///
    /// Returns a tuple of (watcher, receiver) where receiver will emit
    /// NotesChangedEvent batches once changes settle.
    pub fn new(root: impl Into<PathBuf>, debounce: Duration) -> (Self, Receiver<NotesChangedEvent>) {
        let (tx, rx) = channel();
        let watcher = NotesWatcher {
            state: Some((root.into(), debounce, tx)),
            watcher_thread: None,
            shutdown: Arc::new(AtomicBool::new(false)),
        };
        (watcher, rx)
    }

    /// Start watching the notes folder for changes
    ///
    /// Spawns a background thread that owns the notify watcher, debounces
    /// raw events per note id, and sends batches through the receiver.
    pub fn start(&mut self) -> NotifyResult<()> {
        let (root, debounce, tx) = self
            .state
            .take()
            .ok_or_else(|| std::io::Error::other("watcher already started"))?;

        let shutdown = self.shutdown.clone();
        let thread_handle = thread::spawn(move || {
            if let Err(e) = Self::watch_loop(root, debounce, tx, shutdown) {
                warn!(error = %e, watcher = "notes", "Notes watcher error");
            }
        });

        self.watcher_thread = Some(thread_handle);
        Ok(())
    }

    /// Internal watch loop running in background thread
    fn watch_loop(
        root: PathBuf,
        debounce: Duration,
        tx: Sender<NotesChangedEvent>,
        shutdown: Arc<AtomicBool>,
    ) -> NotifyResult<()> {
        // Channel for raw notify events
        let (watch_tx, watch_rx) = channel();

        let mut watcher = recommended_watcher(move |res: notify::Result<notify::Event>| {
            let _ = watch_tx.send(res);
        })?;
        watcher.watch(&root, RecursiveMode::Recursive)?;

        info!(path = %root.display(), "Notes watcher started");

        // Last-seen time per note id; an id is emitted once it has been
        // quiet for the full debounce window.
        let mut pending: HashMap<NoteId, Instant> = HashMap::new();

        loop {
            if shutdown.load(Ordering::Relaxed) {
                info!(watcher = "notes", "Notes watcher shutting down");
                break;
            }
            match watch_rx.recv_timeout(FLUSH_INTERVAL) {
                Ok(Ok(event)) => {
                    if !is_relevant_kind(&event.kind) {
                        continue;
                    }
                    let now = Instant::now();
                    for id in note_ids_in(&root, &event.paths) {
                        pending.insert(id, now);
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, watcher = "notes", "File watcher error");
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    info!(watcher = "notes", "Notes watcher shutting down");
                    break;
                }
            }

            let now = Instant::now();
            let settled: Vec<NoteId> = pending
                .iter()
                .filter(|(_, seen)| now.saturating_duration_since(**seen) >= debounce)
                .map(|(id, _)| id.clone())
                .collect();
            if settled.is_empty() {
                continue;
            }
            for id in &settled {
                pending.remove(id);
            }
            debug!(count = settled.len(), "Emitting notes change batch");
            if tx.send(NotesChangedEvent { changed_ids: settled }).is_err() {
                // Receiver gone, nothing left to notify.
                break;
            }
        }

        Ok(())
    }
}

impl Drop for NotesWatcher {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Wait for watcher thread to finish
        if let Some(handle) = self.watcher_thread.take() {
            let _ = handle.join();
        }
    }
}

fn is_relevant_kind(kind: &notify::EventKind) -> bool {
    matches!(
        kind,
        notify::EventKind::Create(_) | notify::EventKind::Modify(_) | notify::EventKind::Remove(_)
    )
}

/// Map changed paths to note ids, silently dropping anything that is not a
/// note (dot-dirs, assets/, non-markdown files).
fn note_ids_in(root: &Path, paths: &[PathBuf]) -> Vec<NoteId> {
    paths
        .iter()
        .filter_map(|path| note_id_from_path(root, path))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watcher_can_be_created() {
        let dir = tempfile::tempdir().unwrap();
        let (mut watcher, _rx) = NotesWatcher::new(dir.path(), Duration::from_millis(500));
        assert!(watcher.start().is_ok());
        // Starting twice is an error, not a second thread.
        assert!(watcher.start().is_err());
    }

    #[test]
    fn paths_outside_notes_space_are_dropped() {
        let root = Path::new("/notes");
        let ids = note_ids_in(
            root,
            &[
                PathBuf::from("/notes/plan.md"),
                PathBuf::from("/notes/.scratch/settings.json"),
                PathBuf::from("/notes/assets/pic.png"),
                PathBuf::from("/elsewhere/other.md"),
            ],
        );
        assert_eq!(ids, vec![NoteId::new("plan")]);
    }

    #[test]
    fn only_file_content_kinds_are_relevant() {
        use notify::event::{AccessKind, CreateKind, EventKind, ModifyKind, RemoveKind};
        assert!(is_relevant_kind(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant_kind(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_relevant_kind(&EventKind::Remove(RemoveKind::File)));
        assert!(!is_relevant_kind(&EventKind::Access(AccessKind::Any)));
    }
}
