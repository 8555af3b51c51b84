//! Load/reconcile state machine for the editing buffer.
//!
//! Every note presented to the buffer (a completed select read, a reload, a
//! save completion) flows through [`NotesEngine::present_note`], which keys
//! on two inputs only: the loaded identity and the reload version. Four
//! outcomes are possible:
//!
//! 1. same identity, same version: bookkeeping only, never a content reload
//!    (a save completion must not destroy cursor state or unsaved keystrokes)
//! 2. same identity, advanced version: authoritative reload, buffer replaced
//! 3. different identity matching the save fingerprint: rename echo; the new
//!    identity is adopted without touching content, and anything that became
//!    dirty during the rename flushes immediately under the new id
//! 4. different identity otherwise: a genuine switch; flush, blur, replace,
//!    reset transient view state, scroll to top

use std::time::Instant;

use tracing::{debug, warn};

use super::codec::Codec;
use super::engine::{Effect, NotesEngine};
use super::model::{Note, NoteId};

/// Identity and version bookkeeping for the note occupying the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedNote {
    pub id: NoteId,
    pub reload_version: u64,
    pub modified: i64,
}

/// The buffer-side half of the engine: what is loaded, its parsed document,
/// and the raw-source view toggle.
pub struct EditorView<D> {
    pub loaded: Option<LoadedNote>,
    pub doc: Option<D>,
    pub source_mode: bool,
}

impl<D> Default for EditorView<D> {
    fn default() -> Self {
        EditorView {
            loaded: None,
            doc: None,
            source_mode: false,
        }
    }
}

enum Presentation {
    Initial,
    Bookkeeping,
    Reload,
    RenameEcho { old: NoteId },
    Switch,
}

impl<C: Codec> NotesEngine<C> {
    /// Reconcile a presented note against the buffer. `version` is the
    /// reload version the presentation was issued under.
    pub(crate) fn present_note(&mut self, note: Note, version: u64, now: Instant) {
        let case = match self.view.loaded.as_ref() {
            None => Presentation::Initial,
            Some(loaded) if loaded.id == note.id => {
                if version > loaded.reload_version {
                    Presentation::Reload
                } else {
                    Presentation::Bookkeeping
                }
            }
            Some(loaded) => {
                let is_rename_echo = self.fingerprint.as_ref().is_some_and(|fp| {
                    fp.note_id == loaded.id && fp.content == note.content
                });
                if is_rename_echo {
                    Presentation::RenameEcho {
                        old: loaded.id.clone(),
                    }
                } else {
                    Presentation::Switch
                }
            }
        };

        match case {
            Presentation::Initial => {
                debug!(note_id = %note.id, "Loading note into empty buffer");
                self.load_note(note, version);
            }
            Presentation::Bookkeeping => {
                // Same identity, same version: only the timestamp moves. The
                // save it confirms did not rename, so the fingerprint is spent.
                self.fingerprint = None;
                if let Some(loaded) = self.view.loaded.as_mut() {
                    loaded.modified = note.modified;
                }
            }
            Presentation::Reload => {
                debug!(note_id = %note.id, version, "Authoritative reload");
                let doc = self.parse_or_raw(&note.content);
                self.view.doc = Some(doc);
                self.view.loaded = Some(LoadedNote {
                    id: note.id,
                    reload_version: version,
                    modified: note.modified,
                });
                self.effects.push(Effect::BufferReplaced);
            }
            Presentation::RenameEcho { old } => {
                debug!(old_id = %old, new_id = %note.id, "Adopting renamed identity");
                self.fingerprint = None;
                if let Some(loaded) = self.view.loaded.as_mut() {
                    loaded.id = note.id.clone();
                    loaded.modified = note.modified;
                }
                self.autosave.adopt(&old, &note.id);
                // Keystrokes that landed while the rename propagated would
                // otherwise save under the stale id.
                if self.autosave.is_dirty() {
                    self.flush(now);
                }
            }
            Presentation::Switch => {
                self.flush(now);
                self.effects.push(Effect::BufferBlurred);
                self.load_note(note, version);
            }
        }
    }

    fn load_note(&mut self, note: Note, version: u64) {
        let doc = self.parse_or_raw(&note.content);
        self.view.doc = Some(doc);
        self.view.source_mode = false;
        let id = note.id.clone();
        self.view.loaded = Some(LoadedNote {
            id: id.clone(),
            reload_version: version,
            modified: note.modified,
        });
        self.effects.push(Effect::BufferReplaced);
        self.effects.push(Effect::ScrolledToTop);

        let newly_created = self.pending_created.take().is_some_and(|c| c == id);
        if newly_created || note.content.trim().is_empty() {
            self.autofocus_pending = Some(id.clone());
            self.effects.push(Effect::AutofocusRequested { id });
        }
    }

    fn parse_or_raw(&self, content: &str) -> C::Doc {
        match self.codec.parse(content) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Codec parse failed; inserting raw text");
                self.codec.raw(content)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::super::codec::{Codec, CodecError, PlainTextCodec};
    use super::super::engine::{Command, Effect, NotesEngine};
    use super::super::model::{Note, NoteId, SaveFingerprint};
    use super::*;
    use crate::config::EngineConfig;

    fn engine() -> NotesEngine<PlainTextCodec> {
        NotesEngine::new(PlainTextCodec, &EngineConfig::default())
    }

    fn note(id: &str, content: &str) -> Note {
        Note {
            id: NoteId::new(id),
            title: content.lines().next().unwrap_or("").to_string(),
            content: content.to_string(),
            path: format!("/notes/{}.md", id),
            modified: 100,
        }
    }

    fn has_buffer_replaced(effects: &[Effect]) -> bool {
        effects.iter().any(|e| matches!(e, Effect::BufferReplaced))
    }

    #[test]
    fn initial_presentation_loads_the_buffer() {
        let mut eng = engine();
        eng.present_note(note("a", "# A\nbody"), 0, Instant::now());
        assert_eq!(eng.doc().map(String::as_str), Some("# A\nbody"));
        assert_eq!(eng.loaded_note_id(), Some(&NoteId::new("a")));
        assert!(has_buffer_replaced(&eng.drain_effects()));
    }

    #[test]
    fn same_identity_same_version_keeps_buffer_content() {
        let mut eng = engine();
        let now = Instant::now();
        eng.present_note(note("a", "original"), 0, now);
        eng.drain_effects();

        // Simulate unsaved keystrokes, then a save completion re-presenting.
        eng.apply_edit(|doc| doc.push_str(" edited"), now);
        let mut saved = note("a", "original");
        saved.modified = 200;
        eng.present_note(saved, 0, now);

        assert_eq!(eng.doc().map(String::as_str), Some("original edited"));
        assert!(!has_buffer_replaced(&eng.drain_effects()));
        assert_eq!(eng.view.loaded.as_ref().unwrap().modified, 200);
    }

    #[test]
    fn advanced_version_replaces_buffer() {
        let mut eng = engine();
        let now = Instant::now();
        eng.present_note(note("a", "old"), 0, now);
        eng.drain_effects();

        eng.present_note(note("a", "new from disk"), 1, now);
        assert_eq!(eng.doc().map(String::as_str), Some("new from disk"));
        assert_eq!(eng.view.loaded.as_ref().unwrap().reload_version, 1);
        assert!(has_buffer_replaced(&eng.drain_effects()));
    }

    #[test]
    fn rename_echo_adopts_identity_without_touching_content() {
        let mut eng = engine();
        let now = Instant::now();
        eng.present_note(note("a", "# New Title\nbody"), 0, now);
        eng.drain_effects();
        eng.fingerprint = Some(SaveFingerprint {
            note_id: NoteId::new("a"),
            content: "# New Title\nbody".to_string(),
        });

        eng.present_note(note("New Title", "# New Title\nbody"), 0, now);
        assert_eq!(eng.loaded_note_id(), Some(&NoteId::new("New Title")));
        assert_eq!(eng.doc().map(String::as_str), Some("# New Title\nbody"));
        assert!(eng.fingerprint.is_none());
        assert!(!has_buffer_replaced(&eng.drain_effects()));
    }

    #[test]
    fn rename_echo_flushes_interim_edits_under_new_id() {
        let mut eng = engine();
        let now = Instant::now();
        eng.present_note(note("a", "# New Title\nbody"), 0, now);
        eng.fingerprint = Some(SaveFingerprint {
            note_id: NoteId::new("a"),
            content: "# New Title\nbody".to_string(),
        });
        // Typing continued while the rename propagated.
        eng.apply_edit(|doc| doc.push_str(" more"), now);
        eng.drain_commands();

        eng.present_note(note("New Title", "# New Title\nbody"), 0, now);
        let commands = eng.drain_commands();
        let write = commands
            .iter()
            .find_map(|c| match c {
                Command::Write { id, content, .. } => Some((id.clone(), content.clone())),
                _ => None,
            })
            .expect("interim edits should flush");
        assert_eq!(write.0, NoteId::new("New Title"));
        assert_eq!(write.1, "# New Title\nbody more");
        assert!(!eng.is_dirty());
    }

    #[test]
    fn genuine_switch_blurs_resets_and_scrolls() {
        let mut eng = engine();
        let now = Instant::now();
        eng.present_note(note("a", "first"), 0, now);
        eng.set_source_mode(true);
        eng.drain_effects();

        eng.present_note(note("b", "second"), 0, now);
        assert_eq!(eng.doc().map(String::as_str), Some("second"));
        assert!(!eng.source_mode());
        let effects = eng.drain_effects();
        assert!(effects.iter().any(|e| matches!(e, Effect::BufferBlurred)));
        assert!(effects.iter().any(|e| matches!(e, Effect::ScrolledToTop)));
    }

    #[test]
    fn switch_flushes_pending_save_for_old_identity() {
        let mut eng = engine();
        let now = Instant::now();
        eng.present_note(note("a", "first"), 0, now);
        eng.apply_edit(|doc| doc.push_str("!"), now);
        eng.drain_commands();

        eng.present_note(note("b", "second"), 0, now + Duration::from_millis(1));
        let commands = eng.drain_commands();
        match commands.first() {
            Some(Command::Write { id, content, .. }) => {
                assert_eq!(id, &NoteId::new("a"));
                assert_eq!(content, "first!");
            }
            other => panic!("expected a flush write first, got {:?}", other),
        }
    }

    #[test]
    fn spent_fingerprint_does_not_turn_a_switch_into_a_rename_echo() {
        let mut eng = engine();
        let now = Instant::now();
        eng.present_note(note("a", "shared body"), 0, now);
        eng.drain_effects();
        eng.fingerprint = Some(SaveFingerprint {
            note_id: NoteId::new("a"),
            content: "shared body".to_string(),
        });

        // A same-identity save completion consumes the fingerprint.
        let mut saved = note("a", "shared body");
        saved.modified = 200;
        eng.present_note(saved, 0, now);
        assert!(eng.fingerprint.is_none());

        // A later switch to a note with identical content is a real switch.
        eng.present_note(note("b", "shared body"), 0, now);
        assert_eq!(eng.loaded_note_id(), Some(&NoteId::new("b")));
        let effects = eng.drain_effects();
        assert!(effects.iter().any(|e| matches!(e, Effect::BufferBlurred)));
        assert!(has_buffer_replaced(&effects));
    }

    #[test]
    fn empty_note_requests_autofocus() {
        let mut eng = engine();
        eng.present_note(note("a", ""), 0, Instant::now());
        let effects = eng.drain_effects();
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::AutofocusRequested { id } if id == &NoteId::new("a"))));
        assert!(eng.confirm_autofocus(&NoteId::new("a")));
    }

    #[test]
    fn autofocus_is_dropped_when_identity_moves_on() {
        let mut eng = engine();
        let now = Instant::now();
        eng.present_note(note("a", ""), 0, now);
        eng.present_note(note("b", "other"), 0, now);
        assert!(!eng.confirm_autofocus(&NoteId::new("a")));
    }

    struct RejectingCodec;

    impl Codec for RejectingCodec {
        type Doc = String;

        fn parse(&self, _canonical: &str) -> Result<String, CodecError> {
            Err(CodecError("malformed".to_string()))
        }

        fn serialize(&self, doc: &String) -> String {
            doc.clone()
        }

        fn raw(&self, canonical: &str) -> String {
            format!("RAW:{}", canonical)
        }
    }

    #[test]
    fn codec_failure_falls_back_to_raw_text() {
        let mut eng: NotesEngine<RejectingCodec> =
            NotesEngine::new(RejectingCodec, &EngineConfig::default());
        eng.present_note(note("a", "body"), 0, Instant::now());
        assert_eq!(eng.doc().map(String::as_str), Some("RAW:body"));
        assert!(has_buffer_replaced(&eng.drain_effects()));
    }
}
