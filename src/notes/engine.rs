//! The notes engine: selection, autosave, self-echo suppression, search.
//!
//! `NotesEngine` is a plain owned state machine driven from a single thread.
//! Operations and storage completions mutate it synchronously; anything that
//! needs I/O is emitted as a [`Command`] for the driver to execute, and
//! anything the embedding UI must react to is emitted as an [`Effect`].
//! Completions come back as [`Event`]s tagged with the originating
//! [`RequestId`], and every handler re-checks that its target identity is
//! still relevant before touching visible state, so stale completions are
//! dropped instead of clobbering the buffer.
//!
//! Timers (autosave deadline, coalesced list refresh, recently-saved expiry)
//! are plain `Instant` fields polled through [`NotesEngine::tick`]; the
//! driver sleeps until [`NotesEngine::next_wakeup`].

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::NotesError;

use super::autosave::AutosaveScheduler;
use super::codec::Codec;
use super::model::{Note, NoteId, NoteMetadata, SaveFingerprint, SearchResult, Settings};
use super::reconcile::EditorView;
use super::store::StoreError;

/// Cap on synchronously computed (instant) search matches.
pub const INSTANT_SEARCH_LIMIT: usize = 20;

/// Monotonic tag for storage/search requests; used to drop stale responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestId(u64);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

/// Storage work requested by the engine, executed by the driver in
/// submission order.
#[derive(Debug)]
pub enum Command {
    Read { req: RequestId, id: NoteId },
    Write { req: RequestId, id: NoteId, content: String },
    Create { req: RequestId },
    Delete { req: RequestId, id: NoteId },
    Duplicate { req: RequestId, id: NoteId },
    List { req: RequestId },
    Search { req: RequestId, query: String },
    LoadSettings { req: RequestId },
    WriteSettings { req: RequestId, settings: Settings },
}

impl Command {
    pub fn req(&self) -> RequestId {
        match self {
            Command::Read { req, .. }
            | Command::Write { req, .. }
            | Command::Create { req }
            | Command::Delete { req, .. }
            | Command::Duplicate { req, .. }
            | Command::List { req }
            | Command::Search { req, .. }
            | Command::LoadSettings { req }
            | Command::WriteSettings { req, .. } => *req,
        }
    }
}

/// Completion of a [`Command`], or a watcher notification.
#[derive(Debug)]
pub enum Event {
    ReadDone { req: RequestId, result: Result<Note, StoreError> },
    /// `id` is the id the write was issued under; the note inside the result
    /// may carry a different id (a rename).
    WriteDone { req: RequestId, id: NoteId, result: Result<Note, StoreError> },
    CreateDone { req: RequestId, result: Result<Note, StoreError> },
    DeleteDone { req: RequestId, id: NoteId, result: Result<(), StoreError> },
    DuplicateDone { req: RequestId, id: NoteId, result: Result<Note, StoreError> },
    ListDone { req: RequestId, result: Result<Vec<NoteMetadata>, StoreError> },
    SearchDone { req: RequestId, result: Result<Vec<SearchResult>, StoreError> },
    SettingsLoaded { req: RequestId, result: Result<Settings, StoreError> },
    SettingsWritten { req: RequestId, result: Result<(), StoreError> },
    /// File-change notification from the watcher; not correlated to any
    /// request.
    NotesChanged { ids: Vec<NoteId> },
}

/// UI-facing consequence of an operation or event.
#[derive(Debug)]
pub enum Effect {
    ListChanged,
    SelectionChanged,
    /// The buffer document was replaced wholesale (load or reload).
    BufferReplaced,
    /// The buffer should drop focus/cursor anchors before its content is
    /// replaced by a different note.
    BufferBlurred,
    ScrolledToTop,
    /// The embedder should focus the editor and select all, then confirm via
    /// [`NotesEngine::confirm_autofocus`] on its next frame.
    AutofocusRequested { id: NoteId },
    SearchResultsChanged,
    /// The selected note changed on disk underneath us; the user must opt
    /// into a reload.
    ExternalChangesFlagged { id: NoteId },
    Error(NotesError),
}

/// Why a read was issued; decides how its completion is reconciled.
#[derive(Debug)]
pub(crate) enum ReadIntent {
    /// User-initiated note switch. `prev` restores selection on failure.
    Select { id: NoteId, prev: Option<NoteId> },
    /// Explicit reload of the current note at the given reload version.
    Reload { id: NoteId, version: u64 },
}

pub struct NotesEngine<C: Codec> {
    pub(crate) codec: C,
    pub(crate) notes: Vec<NoteMetadata>,
    pub(crate) selected: Option<NoteId>,
    pub(crate) view: EditorView<C::Doc>,
    pub(crate) autosave: AutosaveScheduler,
    pub(crate) settings: Settings,

    /// Ids we just wrote; watcher events for them are self-echo until the
    /// quiescence window elapses.
    pub(crate) recently_saved: HashMap<NoteId, Instant>,
    pub(crate) quiescence: Duration,
    /// Last written (issued id, content) pair, for rename-echo detection.
    pub(crate) fingerprint: Option<SaveFingerprint>,
    /// Notes flagged as changed on disk while loaded.
    pub(crate) external_changed: HashSet<NoteId>,
    /// Bumped only by explicit user reloads.
    pub(crate) reload_version: u64,

    pub(crate) pending_reads: HashMap<RequestId, ReadIntent>,
    next_req: u64,

    pub(crate) search_query: String,
    pub(crate) instant_results: Vec<SearchResult>,
    pub(crate) search_results: Option<Vec<SearchResult>>,
    pub(crate) latest_search_req: Option<RequestId>,

    /// Note awaiting its first presentation after creation (drives autofocus).
    pub(crate) pending_created: Option<NoteId>,
    pub(crate) autofocus_pending: Option<NoteId>,

    pub(crate) list_refresh_deadline: Option<Instant>,
    list_refresh_debounce: Duration,

    commands: Vec<Command>,
    pub(crate) effects: Vec<Effect>,
}

impl<C: Codec> NotesEngine<C> {
    pub fn new(codec: C, config: &EngineConfig) -> Self {
        NotesEngine {
            codec,
            notes: Vec::new(),
            selected: None,
            view: EditorView::default(),
            autosave: AutosaveScheduler::with_intervals(
                config.rich_debounce(),
                config.source_debounce(),
            ),
            settings: Settings::default(),
            recently_saved: HashMap::new(),
            quiescence: config.quiescence(),
            fingerprint: None,
            external_changed: HashSet::new(),
            reload_version: 0,
            pending_reads: HashMap::new(),
            next_req: 0,
            search_query: String::new(),
            instant_results: Vec::new(),
            search_results: None,
            latest_search_req: None,
            pending_created: None,
            autofocus_pending: None,
            list_refresh_deadline: None,
            list_refresh_debounce: config.list_refresh_debounce(),
            commands: Vec::new(),
            effects: Vec::new(),
        }
    }

    /// Issue the initial settings load and list.
    pub fn start(&mut self) {
        let req = self.next_req();
        self.commands.push(Command::LoadSettings { req });
        self.request_list();
    }

    // ---- observable state ----

    pub fn notes(&self) -> &[NoteMetadata] {
        &self.notes
    }

    pub fn selected_note_id(&self) -> Option<&NoteId> {
        self.selected.as_ref()
    }

    pub fn doc(&self) -> Option<&C::Doc> {
        self.view.doc.as_ref()
    }

    pub fn loaded_note_id(&self) -> Option<&NoteId> {
        self.view.loaded.as_ref().map(|l| &l.id)
    }

    pub fn search_results(&self) -> Option<&[SearchResult]> {
        self.search_results.as_deref()
    }

    /// Whether the currently selected note has unresolved external edits.
    pub fn has_external_changes(&self) -> bool {
        self.selected
            .as_ref()
            .is_some_and(|id| self.external_changed.contains(id))
    }

    pub fn reload_version(&self) -> u64 {
        self.reload_version
    }

    pub fn source_mode(&self) -> bool {
        self.view.source_mode
    }

    pub fn is_dirty(&self) -> bool {
        self.autosave.is_dirty()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn drain_commands(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    pub fn drain_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    // ---- operations ----

    /// Switch to `id`. Selection moves optimistically; a failed read reverts
    /// it. Any pending save for the outgoing note flushes first.
    pub fn select_note(&mut self, id: NoteId, now: Instant) {
        if self.selected.as_ref() == Some(&id) {
            return;
        }
        self.flush(now);
        let prev = self.selected.replace(id.clone());
        // A fresh read is authoritative, so the flag no longer applies.
        self.external_changed.remove(&id);
        self.effects.push(Effect::SelectionChanged);
        let req = self.next_req();
        self.pending_reads
            .insert(req, ReadIntent::Select { id: id.clone(), prev });
        self.commands.push(Command::Read { req, id });
    }

    pub fn create_note(&mut self, now: Instant) {
        self.flush(now);
        let req = self.next_req();
        self.commands.push(Command::Create { req });
    }

    pub fn delete_note(&mut self, id: NoteId) {
        if self.autosave.owner() == Some(&id) {
            self.autosave.cancel();
        }
        let req = self.next_req();
        self.commands.push(Command::Delete { req, id });
    }

    pub fn duplicate_note(&mut self, id: NoteId) {
        let req = self.next_req();
        self.commands.push(Command::Duplicate { req, id });
    }

    pub fn pin_note(&mut self, id: NoteId) {
        if self.settings.is_pinned(&id) {
            return;
        }
        self.settings.pinned_note_ids.push(id);
        self.write_settings();
        self.request_list();
    }

    pub fn unpin_note(&mut self, id: &NoteId) {
        if !self.settings.is_pinned(id) {
            return;
        }
        self.settings.pinned_note_ids.retain(|p| p != id);
        self.write_settings();
        self.request_list();
    }

    /// Re-read the selected note, replacing the buffer. This is the only
    /// path that advances the reload version.
    pub fn reload_current_note(&mut self) {
        let Some(id) = self.selected.clone() else {
            return;
        };
        self.reload_version += 1;
        let version = self.reload_version;
        info!(note_id = %id, version, "Reloading current note");
        let req = self.next_req();
        self.pending_reads
            .insert(req, ReadIntent::Reload { id: id.clone(), version });
        self.commands.push(Command::Read { req, id });
    }

    /// Mutate the buffer document and restart the autosave countdown.
    /// Serialization is deferred to save time, never per keystroke.
    pub fn apply_edit(&mut self, edit: impl FnOnce(&mut C::Doc), now: Instant) {
        let Some(owner) = self.view.loaded.as_ref().map(|l| l.id.clone()) else {
            return;
        };
        let Some(doc) = self.view.doc.as_mut() else {
            return;
        };
        edit(doc);
        self.autosave.mark_dirty(&owner, self.view.source_mode, now);
    }

    pub fn set_source_mode(&mut self, on: bool) {
        self.view.source_mode = on;
    }

    /// Serialize and persist the dirty buffer immediately, if any.
    pub fn flush(&mut self, now: Instant) {
        if let Some(owner) = self.autosave.take() {
            self.issue_write(owner, now);
        }
    }

    /// Update the instant results synchronously and request authoritative
    /// ranked results; an empty query clears everything synchronously.
    pub fn search(&mut self, query: &str) {
        if query.trim().is_empty() {
            self.clear_search();
            return;
        }
        self.search_query = query.to_string();
        let needle = query.to_lowercase();
        let instant: Vec<SearchResult> = self
            .notes
            .iter()
            .filter(|m| {
                m.title.to_lowercase().contains(&needle)
                    || m.preview.to_lowercase().contains(&needle)
            })
            .take(INSTANT_SEARCH_LIMIT)
            .map(SearchResult::instant)
            .collect();
        self.instant_results = instant.clone();
        self.search_results = Some(instant);
        self.effects.push(Effect::SearchResultsChanged);

        let req = self.next_req();
        self.latest_search_req = Some(req);
        self.commands.push(Command::Search {
            req,
            query: query.to_string(),
        });
    }

    pub fn clear_search(&mut self) {
        self.search_query.clear();
        self.instant_results.clear();
        self.latest_search_req = None;
        if self.search_results.take().is_some() {
            self.effects.push(Effect::SearchResultsChanged);
        }
    }

    // ---- timers ----

    /// Fire any due timers. The driver calls this on every loop iteration.
    pub fn tick(&mut self, now: Instant) {
        if let Some(owner) = self.autosave.take_due(now) {
            self.issue_write(owner, now);
        }
        if self
            .list_refresh_deadline
            .is_some_and(|deadline| now >= deadline)
        {
            self.list_refresh_deadline = None;
            self.request_list();
        }
        let quiescence = self.quiescence;
        self.recently_saved
            .retain(|_, at| now.saturating_duration_since(*at) < quiescence);
    }

    /// Earliest instant at which [`Self::tick`] has work to do.
    pub fn next_wakeup(&self) -> Option<Instant> {
        match (self.autosave.deadline(), self.list_refresh_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Confirm a deferred autofocus. Returns false when the loaded identity
    /// moved on since the request, in which case focus must not be applied.
    pub fn confirm_autofocus(&mut self, id: &NoteId) -> bool {
        let confirmed = self.autofocus_pending.as_ref() == Some(id)
            && self.loaded_note_id() == Some(id);
        self.autofocus_pending = None;
        confirmed
    }

    // ---- event handling ----

    pub fn handle_event(&mut self, event: Event, now: Instant) {
        match event {
            Event::ReadDone { req, result } => self.on_read_done(req, result, now),
            Event::WriteDone { req, id, result } => self.on_write_done(req, id, result, now),
            Event::CreateDone { req, result } => self.on_create_done(req, result, now),
            Event::DeleteDone { req, id, result } => self.on_delete_done(req, id, result, now),
            Event::DuplicateDone { req, id, result } => self.on_duplicate_done(req, id, result),
            Event::ListDone { req, result } => self.on_list_done(req, result),
            Event::SearchDone { req, result } => self.on_search_done(req, result),
            Event::SettingsLoaded { req, result } => self.on_settings_loaded(req, result),
            Event::SettingsWritten { req, result } => self.on_settings_written(req, result),
            Event::NotesChanged { ids } => self.on_notes_changed(ids, now),
        }
    }

    fn on_read_done(&mut self, req: RequestId, result: Result<Note, StoreError>, now: Instant) {
        let Some(intent) = self.pending_reads.remove(&req) else {
            warn!(%req, "Read completion without a pending intent");
            return;
        };
        match (intent, result) {
            (ReadIntent::Select { id, prev }, Err(e)) => {
                warn!(note_id = %id, error = %e, "Note read failed");
                // Fail soft: put selection back where it was.
                if self.selected.as_ref() == Some(&id) {
                    self.selected = prev;
                    self.effects.push(Effect::SelectionChanged);
                }
                self.effects
                    .push(Effect::Error(NotesError::ReadFailed { id, source: e }));
            }
            (ReadIntent::Select { id, .. }, Ok(note)) => {
                if self.selected.as_ref() != Some(&id) {
                    debug!(note_id = %id, "Dropping stale select read");
                    return;
                }
                let version = self.reload_version;
                self.present_note(note, version, now);
            }
            (ReadIntent::Reload { id, .. }, Err(e)) => {
                warn!(note_id = %id, error = %e, "Reload read failed");
                self.effects
                    .push(Effect::Error(NotesError::ReadFailed { id, source: e }));
            }
            (ReadIntent::Reload { id, version }, Ok(note)) => {
                if self.selected.as_ref() != Some(&id) {
                    debug!(note_id = %id, "Dropping stale reload read");
                    return;
                }
                self.external_changed.remove(&id);
                self.present_note(note, version, now);
            }
        }
    }

    fn on_write_done(
        &mut self,
        _req: RequestId,
        issued_id: NoteId,
        result: Result<Note, StoreError>,
        now: Instant,
    ) {
        let note = match result {
            Ok(note) => note,
            Err(e) => {
                warn!(note_id = %issued_id, error = %e, "Note write failed");
                // Release suppression immediately so a later legitimate
                // external change for this id is not swallowed.
                self.recently_saved.remove(&issued_id);
                if self
                    .fingerprint
                    .as_ref()
                    .is_some_and(|fp| fp.note_id == issued_id)
                {
                    self.fingerprint = None;
                }
                self.effects.push(Effect::Error(NotesError::WriteFailed {
                    id: issued_id,
                    source: e,
                }));
                return;
            }
        };

        let renamed = note.id != issued_id;
        if renamed {
            info!(old_id = %issued_id, new_id = %note.id, "Save renamed note");
            // The rename's own watcher notification must be absorbed too.
            self.recently_saved.insert(note.id.clone(), now);
            self.autosave.adopt(&issued_id, &note.id);
            self.propagate_pin(&issued_id, &note.id);
        }
        self.external_changed.remove(&issued_id);
        self.external_changed.remove(&note.id);

        if self.selected.as_ref() == Some(&issued_id) {
            if renamed {
                self.selected = Some(note.id.clone());
                self.effects.push(Effect::SelectionChanged);
            }
            let version = self.reload_version;
            self.present_note(note, version, now);
        } else {
            // Selection moved on mid-save; the save still counts, but the
            // displayed note must not be touched.
            debug!(note_id = %issued_id, "Save completed for a note no longer selected");
        }

        // Coalesce with any refresh already scheduled.
        if self.list_refresh_deadline.is_none() {
            self.list_refresh_deadline = Some(now + self.list_refresh_debounce);
        }
    }

    fn on_create_done(&mut self, _req: RequestId, result: Result<Note, StoreError>, now: Instant) {
        let note = match result {
            Ok(note) => note,
            Err(e) => {
                warn!(error = %e, "Note creation failed");
                self.effects
                    .push(Effect::Error(NotesError::CreateFailed(e)));
                return;
            }
        };
        info!(note_id = %note.id, "Created note");
        // Absorb the watcher's notification of the file we just created.
        self.recently_saved.insert(note.id.clone(), now);
        if !self.search_query.is_empty() {
            self.clear_search();
        }
        self.selected = Some(note.id.clone());
        self.effects.push(Effect::SelectionChanged);
        self.pending_created = Some(note.id.clone());
        let version = self.reload_version;
        self.present_note(note, version, now);
        self.request_list();
    }

    fn on_delete_done(
        &mut self,
        _req: RequestId,
        id: NoteId,
        result: Result<(), StoreError>,
        now: Instant,
    ) {
        if let Err(e) = result {
            warn!(note_id = %id, error = %e, "Note deletion failed");
            // The note survived, so any edits cancelled alongside the delete
            // request still need to reach disk.
            if self.view.loaded.as_ref().map(|l| &l.id) == Some(&id) {
                let source_mode = self.view.source_mode;
                self.autosave.mark_dirty(&id, source_mode, now);
            }
            self.effects
                .push(Effect::Error(NotesError::DeleteFailed { id, source: e }));
            return;
        }
        info!(note_id = %id, "Deleted note");
        self.external_changed.remove(&id);
        self.recently_saved.remove(&id);
        if self.settings.is_pinned(&id) {
            self.settings.pinned_note_ids.retain(|p| p != &id);
            self.write_settings();
        }
        if self.selected.as_ref() == Some(&id) {
            // Back to the no-note-loaded state.
            self.selected = None;
            self.view.loaded = None;
            self.view.doc = None;
            if self.autosave.owner() == Some(&id) {
                self.autosave.cancel();
            }
            self.effects.push(Effect::SelectionChanged);
        }
        self.request_list();
    }

    fn on_duplicate_done(
        &mut self,
        _req: RequestId,
        id: NoteId,
        result: Result<Note, StoreError>,
    ) {
        match result {
            Ok(copy) => {
                info!(source = %id, copy = %copy.id, "Duplicated note");
                self.request_list();
            }
            Err(e) => {
                warn!(note_id = %id, error = %e, "Note duplication failed");
                self.effects
                    .push(Effect::Error(NotesError::DuplicateFailed { id, source: e }));
            }
        }
    }

    fn on_list_done(
        &mut self,
        _req: RequestId,
        result: Result<Vec<NoteMetadata>, StoreError>,
    ) {
        match result {
            Ok(notes) => {
                debug!(count = notes.len(), "Notes list refreshed");
                self.notes = notes;
                self.effects.push(Effect::ListChanged);
            }
            Err(e) => {
                warn!(error = %e, "Notes list refresh failed");
                self.effects.push(Effect::Error(NotesError::ListFailed(e)));
            }
        }
    }

    fn on_search_done(
        &mut self,
        req: RequestId,
        result: Result<Vec<SearchResult>, StoreError>,
    ) {
        if self.latest_search_req != Some(req) {
            debug!(%req, "Dropping stale search response");
            return;
        }
        self.latest_search_req = None;
        let ranked = match result {
            Ok(ranked) => ranked,
            Err(e) => {
                warn!(error = %e, "Authoritative search failed; keeping instant results");
                self.effects
                    .push(Effect::Error(NotesError::SearchFailed(e)));
                return;
            }
        };
        if ranked.is_empty() {
            // Keep showing the local matches rather than a premature
            // "nothing found".
            debug!(query = %self.search_query, "Authoritative search empty; keeping instant results");
            return;
        }
        let mut merged = ranked;
        let seen: HashSet<NoteId> = merged.iter().map(|r| r.id.clone()).collect();
        merged.extend(
            self.instant_results
                .iter()
                .filter(|r| !seen.contains(&r.id))
                .cloned(),
        );
        self.search_results = Some(merged);
        self.effects.push(Effect::SearchResultsChanged);
    }

    fn on_settings_loaded(&mut self, _req: RequestId, result: Result<Settings, StoreError>) {
        match result {
            Ok(settings) => {
                debug!(pinned = settings.pinned_note_ids.len(), "Settings loaded");
                self.settings = settings;
            }
            Err(e) => {
                warn!(error = %e, "Settings load failed; using defaults");
                self.effects
                    .push(Effect::Error(NotesError::SettingsFailed(e)));
            }
        }
    }

    fn on_settings_written(&mut self, _req: RequestId, result: Result<(), StoreError>) {
        // Best-effort: the primary operation already succeeded, so a failed
        // settings write is reported but never rolled back.
        if let Err(e) = result {
            warn!(error = %e, "Settings write failed");
            self.effects
                .push(Effect::Error(NotesError::SettingsFailed(e)));
        }
    }

    /// External-change detector: strip self-echoes, then refresh the list
    /// and flag the selected note if it was among the real changes.
    fn on_notes_changed(&mut self, ids: Vec<NoteId>, now: Instant) {
        let remaining: Vec<NoteId> = ids
            .into_iter()
            .filter(|id| !self.is_recently_saved(id, now))
            .collect();
        if remaining.is_empty() {
            debug!("File change was entirely self-echo");
            return;
        }
        debug!(count = remaining.len(), "External file changes detected");
        self.request_list();
        if let Some(selected) = self.selected.clone() {
            if remaining.contains(&selected) {
                info!(note_id = %selected, "Selected note changed externally");
                self.external_changed.insert(selected.clone());
                self.effects
                    .push(Effect::ExternalChangesFlagged { id: selected });
            }
        }
    }

    // ---- internals ----

    pub(crate) fn next_req(&mut self) -> RequestId {
        self.next_req += 1;
        RequestId(self.next_req)
    }

    pub(crate) fn request_list(&mut self) {
        let req = self.next_req();
        self.commands.push(Command::List { req });
    }

    fn write_settings(&mut self) {
        let req = self.next_req();
        self.commands.push(Command::WriteSettings {
            req,
            settings: self.settings.clone(),
        });
    }

    fn is_recently_saved(&self, id: &NoteId, now: Instant) -> bool {
        self.recently_saved
            .get(id)
            .is_some_and(|at| now.saturating_duration_since(*at) < self.quiescence)
    }

    /// Serialize the buffer and issue a write under `owner`. The suppression
    /// mark and fingerprint are set before the command is emitted, so the
    /// watcher can never observe the write unmarked.
    pub(crate) fn issue_write(&mut self, owner: NoteId, now: Instant) {
        let content = {
            let Some(loaded) = self.view.loaded.as_ref() else {
                warn!(note_id = %owner, "Dropping save; no note loaded");
                return;
            };
            if loaded.id != owner {
                warn!(note_id = %owner, loaded = %loaded.id, "Dropping save for a note no longer loaded");
                return;
            }
            match self.view.doc.as_ref() {
                Some(doc) => self.codec.serialize(doc),
                None => return,
            }
        };
        self.recently_saved.insert(owner.clone(), now);
        self.fingerprint = Some(SaveFingerprint {
            note_id: owner.clone(),
            content: content.clone(),
        });
        debug!(note_id = %owner, bytes = content.len(), "Issuing save");
        let req = self.next_req();
        self.commands.push(Command::Write {
            req,
            id: owner,
            content,
        });
    }

    /// Move pinned status from a renamed note's old id to its new one.
    fn propagate_pin(&mut self, old: &NoteId, new: &NoteId) {
        if !self.settings.is_pinned(old) {
            return;
        }
        for pinned in &mut self.settings.pinned_note_ids {
            if pinned == old {
                *pinned = new.clone();
            }
        }
        self.write_settings();
    }
}
