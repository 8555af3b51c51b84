//! Production driver for [`NotesEngine`].
//!
//! The engine is single-threaded; this module supplies the threads around
//! it: an event loop that owns the engine, a storage worker that executes
//! [`Command`]s strictly in submission order (which is what makes a flush's
//! write land before the subsequent switch read), and a bridge feeding
//! watcher notifications into the loop. Embedders talk to the runtime
//! through cheap message-sending methods and receive [`Effect`]s through a
//! callback invoked on the loop thread.

use std::path::Path;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result as AnyResult};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::notes::codec::Codec;
use crate::notes::engine::{Command, Effect, Event, NotesEngine};
use crate::notes::model::NoteId;
use crate::notes::store::NoteStore;
use crate::watcher::NotesWatcher;

/// Upper bound on loop sleep when no timer is armed.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// An operation submitted to the engine from the embedder.
pub enum Op<C: Codec> {
    SelectNote(NoteId),
    CreateNote,
    DeleteNote(NoteId),
    DuplicateNote(NoteId),
    PinNote(NoteId),
    UnpinNote(NoteId),
    Search(String),
    ClearSearch,
    ReloadCurrentNote,
    ApplyEdit(Box<dyn FnOnce(&mut C::Doc) + Send>),
    SetSourceMode(bool),
    Flush,
}

enum LoopMsg<C: Codec> {
    Op(Op<C>),
    Event(Event),
    Shutdown,
}

enum WorkerMsg {
    Command(Command),
    Shutdown,
}

/// Owns the engine loop, the storage worker, and the folder watcher.
/// Dropping the runtime flushes any dirty buffer and joins all threads.
pub struct NotesRuntime<C: Codec + Send + 'static>
where
    C::Doc: Send,
{
    tx: Sender<LoopMsg<C>>,
    loop_thread: Option<thread::JoinHandle<()>>,
    // Dropped after the loop: its Drop joins the watcher thread, which
    // closes the bridge's receiver.
    watcher: Option<NotesWatcher>,
    bridge_thread: Option<thread::JoinHandle<()>>,
}

impl<C: Codec + Send + 'static> NotesRuntime<C>
where
    C::Doc: Send,
{
    pub fn new(
        store: Box<dyn NoteStore>,
        codec: C,
        config: &EngineConfig,
        notes_dir: &Path,
        on_effect: impl FnMut(Effect) + Send + 'static,
    ) -> AnyResult<Self> {
        let (tx, rx) = channel::<LoopMsg<C>>();

        // Storage worker: executes commands FIFO, echoes completions back.
        let (worker_tx, worker_rx) = channel::<WorkerMsg>();
        let events_tx = tx.clone();
        let worker_thread = thread::spawn(move || Self::worker_loop(store, worker_rx, events_tx));

        // Watcher bridge: forward change batches into the loop.
        let (mut watcher, watch_rx) =
            NotesWatcher::new(notes_dir, config.watcher_debounce());
        watcher
            .start()
            .with_context(|| format!("failed to watch {}", notes_dir.display()))?;
        let bridge_tx = tx.clone();
        let bridge_thread = thread::spawn(move || {
            while let Ok(event) = watch_rx.recv() {
                let ids = event.changed_ids;
                if bridge_tx.send(LoopMsg::Event(Event::NotesChanged { ids })).is_err() {
                    break;
                }
            }
        });

        let mut engine = NotesEngine::new(codec, config);
        engine.start();
        let loop_thread = thread::spawn(move || {
            Self::event_loop(engine, rx, worker_tx, worker_thread, on_effect)
        });

        info!(notes_dir = %notes_dir.display(), "Notes runtime started");
        Ok(NotesRuntime {
            tx,
            loop_thread: Some(loop_thread),
            watcher: Some(watcher),
            bridge_thread: Some(bridge_thread),
        })
    }

    // ---- embedder API ----

    pub fn select_note(&self, id: NoteId) {
        self.submit(Op::SelectNote(id));
    }

    pub fn create_note(&self) {
        self.submit(Op::CreateNote);
    }

    pub fn delete_note(&self, id: NoteId) {
        self.submit(Op::DeleteNote(id));
    }

    pub fn duplicate_note(&self, id: NoteId) {
        self.submit(Op::DuplicateNote(id));
    }

    pub fn pin_note(&self, id: NoteId) {
        self.submit(Op::PinNote(id));
    }

    pub fn unpin_note(&self, id: NoteId) {
        self.submit(Op::UnpinNote(id));
    }

    pub fn search(&self, query: impl Into<String>) {
        self.submit(Op::Search(query.into()));
    }

    pub fn clear_search(&self) {
        self.submit(Op::ClearSearch);
    }

    pub fn reload_current_note(&self) {
        self.submit(Op::ReloadCurrentNote);
    }

    /// Mutate the loaded buffer document on the loop thread.
    pub fn apply_edit(&self, edit: impl FnOnce(&mut C::Doc) + Send + 'static) {
        self.submit(Op::ApplyEdit(Box::new(edit)));
    }

    pub fn set_source_mode(&self, on: bool) {
        self.submit(Op::SetSourceMode(on));
    }

    /// Persist any dirty buffer immediately.
    pub fn flush(&self) {
        self.submit(Op::Flush);
    }

    fn submit(&self, op: Op<C>) {
        if self.tx.send(LoopMsg::Op(op)).is_err() {
            warn!("Notes runtime is shut down; operation dropped");
        }
    }

    // ---- threads ----

    fn event_loop(
        mut engine: NotesEngine<C>,
        rx: Receiver<LoopMsg<C>>,
        worker_tx: Sender<WorkerMsg>,
        worker_thread: thread::JoinHandle<()>,
        mut on_effect: impl FnMut(Effect),
    ) {
        loop {
            engine.tick(Instant::now());
            Self::pump(&mut engine, &worker_tx, &mut on_effect);

            let timeout = engine
                .next_wakeup()
                .map(|wakeup| wakeup.saturating_duration_since(Instant::now()))
                .unwrap_or(IDLE_TIMEOUT);
            match rx.recv_timeout(timeout) {
                Ok(LoopMsg::Op(op)) => Self::apply_op(&mut engine, op),
                Ok(LoopMsg::Event(event)) => engine.handle_event(event, Instant::now()),
                Ok(LoopMsg::Shutdown) => {
                    debug!("Notes runtime shutting down; flushing");
                    engine.flush(Instant::now());
                    Self::pump(&mut engine, &worker_tx, &mut on_effect);
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        // The final flush's write is already queued; Shutdown lands behind it.
        let _ = worker_tx.send(WorkerMsg::Shutdown);
        drop(worker_tx);
        let _ = worker_thread.join();
    }

    fn apply_op(engine: &mut NotesEngine<C>, op: Op<C>) {
        let now = Instant::now();
        match op {
            Op::SelectNote(id) => engine.select_note(id, now),
            Op::CreateNote => engine.create_note(now),
            Op::DeleteNote(id) => engine.delete_note(id),
            Op::DuplicateNote(id) => engine.duplicate_note(id),
            Op::PinNote(id) => engine.pin_note(id),
            Op::UnpinNote(id) => engine.unpin_note(&id),
            Op::Search(query) => engine.search(&query),
            Op::ClearSearch => engine.clear_search(),
            Op::ReloadCurrentNote => engine.reload_current_note(),
            Op::ApplyEdit(edit) => engine.apply_edit(edit, now),
            Op::SetSourceMode(on) => engine.set_source_mode(on),
            Op::Flush => engine.flush(now),
        }
    }

    fn pump(
        engine: &mut NotesEngine<C>,
        worker_tx: &Sender<WorkerMsg>,
        on_effect: &mut impl FnMut(Effect),
    ) {
        for command in engine.drain_commands() {
            if worker_tx.send(WorkerMsg::Command(command)).is_err() {
                warn!("Storage worker is gone; command dropped");
            }
        }
        for effect in engine.drain_effects() {
            on_effect(effect);
        }
    }

    fn worker_loop(
        store: Box<dyn NoteStore>,
        rx: Receiver<WorkerMsg>,
        events_tx: Sender<LoopMsg<C>>,
    ) {
        while let Ok(msg) = rx.recv() {
            let command = match msg {
                WorkerMsg::Command(command) => command,
                WorkerMsg::Shutdown => break,
            };
            let event = Self::execute(store.as_ref(), command);
            if events_tx.send(LoopMsg::Event(event)).is_err() {
                break;
            }
        }
        debug!("Storage worker stopped");
    }

    fn execute(store: &dyn NoteStore, command: Command) -> Event {
        match command {
            Command::Read { req, id } => Event::ReadDone {
                req,
                result: store.read(&id),
            },
            Command::Write { req, id, content } => Event::WriteDone {
                req,
                result: store.save(&id, &content),
                id,
            },
            Command::Create { req } => Event::CreateDone {
                req,
                result: store.create(),
            },
            Command::Delete { req, id } => Event::DeleteDone {
                req,
                result: store.delete(&id),
                id,
            },
            Command::Duplicate { req, id } => Event::DuplicateDone {
                req,
                result: store.duplicate(&id),
                id,
            },
            Command::List { req } => Event::ListDone {
                req,
                result: store.list(),
            },
            Command::Search { req, query } => Event::SearchDone {
                req,
                result: store.search(&query),
            },
            Command::LoadSettings { req } => Event::SettingsLoaded {
                req,
                result: store.settings(),
            },
            Command::WriteSettings { req, settings } => Event::SettingsWritten {
                req,
                result: store.update_settings(&settings),
            },
        }
    }
}

impl<C: Codec + Send + 'static> Drop for NotesRuntime<C>
where
    C::Doc: Send,
{
    fn drop(&mut self) {
        let _ = self.tx.send(LoopMsg::Shutdown);
        if let Some(handle) = self.loop_thread.take() {
            let _ = handle.join();
        }
        // Joins the watcher thread and closes the bridge's channel.
        self.watcher = None;
        if let Some(handle) = self.bridge_thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notes::codec::PlainTextCodec;
    use crate::notes::fs_store::FsNoteStore;
    use std::sync::mpsc;
    use tempfile::{tempdir, TempDir};

    fn temp_dir() -> TempDir {
        tempdir().unwrap()
    }

    fn runtime_with_effects(
        dir: &Path,
    ) -> (NotesRuntime<PlainTextCodec>, mpsc::Receiver<Effect>) {
        let store = Box::new(FsNoteStore::new(dir).unwrap());
        let (effects_tx, effects_rx) = mpsc::channel();
        let runtime = NotesRuntime::new(
            store,
            PlainTextCodec,
            &EngineConfig::default(),
            dir,
            move |effect| {
                let _ = effects_tx.send(effect);
            },
        )
        .unwrap();
        (runtime, effects_rx)
    }

    fn wait_for(
        effects: &mpsc::Receiver<Effect>,
        mut pred: impl FnMut(&Effect) -> bool,
    ) -> Effect {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match effects.recv_timeout(remaining) {
                Ok(effect) if pred(&effect) => return effect,
                Ok(_) => continue,
                Err(e) => panic!("effect did not arrive: {:?}", e),
            }
        }
    }

    #[test]
    fn selecting_a_note_loads_it() {
        let dir = temp_dir();
        FsNoteStore::new(dir.path())
            .unwrap()
            .save(&NoteId::new("Plans"), "# Plans\nbody\n")
            .unwrap();
        let (runtime, effects) = runtime_with_effects(dir.path());

        runtime.select_note(NoteId::new("Plans"));
        wait_for(&effects, |e| matches!(e, Effect::BufferReplaced));
        drop(runtime);
    }

    #[test]
    fn selecting_a_missing_note_reports_an_error() {
        let dir = temp_dir();
        let (runtime, effects) = runtime_with_effects(dir.path());

        runtime.select_note(NoteId::new("nope"));
        wait_for(&effects, |e| matches!(e, Effect::Error(_)));
        drop(runtime);
    }

    #[test]
    fn shutdown_flushes_unsaved_edits_to_disk() {
        let dir = temp_dir();
        let store = FsNoteStore::new(dir.path()).unwrap();
        store.save(&NoteId::new("Plans"), "# Plans\n").unwrap();
        let (runtime, effects) = runtime_with_effects(dir.path());

        runtime.select_note(NoteId::new("Plans"));
        wait_for(&effects, |e| matches!(e, Effect::BufferReplaced));
        runtime.apply_edit(|doc| doc.push_str("typed right before quit\n"));
        // Dropped well inside the debounce window; Drop must flush.
        drop(runtime);

        let saved = store.read(&NoteId::new("Plans")).unwrap();
        assert!(saved.content.ends_with("typed right before quit\n"));
    }
}
