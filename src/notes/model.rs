//! Domain records for the notes engine.
//!
//! A note's id is derived from its storage location (relative path within the
//! notes folder, POSIX separators, no `.md` extension). Because the filename
//! follows the title, an id is NOT stable across renames — a title change may
//! produce a new id for the same document.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a note, derived from its path within the notes folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    pub fn new(id: impl Into<String>) -> Self {
        NoteId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path component of the id (the filename stem).
    pub fn leaf(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Directory prefix of the id, if the note lives in a subfolder.
    pub fn dir_prefix(&self) -> Option<&str> {
        self.0.rfind('/').map(|pos| &self.0[..pos])
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(s: &str) -> Self {
        NoteId(s.to_string())
    }
}

/// Lightweight note record used for list rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteMetadata {
    pub id: NoteId,
    pub title: String,
    pub preview: String,
    /// Unix seconds of the last file modification.
    pub modified: i64,
}

/// Full note record loaded into the editing buffer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    pub title: String,
    /// Canonical serialized form (markdown text).
    pub content: String,
    /// Absolute path of the backing file.
    pub path: String,
    pub modified: i64,
}

/// Ranked search hit. Ephemeral, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub id: NoteId,
    pub title: String,
    pub preview: String,
    pub modified: i64,
    /// Relevance score; `0.0` marks a provisional (instant, non-ranked) match.
    pub score: f32,
}

impl SearchResult {
    /// Provisional local match shown before authoritative results arrive.
    pub fn instant(meta: &NoteMetadata) -> Self {
        SearchResult {
            id: meta.id.clone(),
            title: meta.title.clone(),
            preview: meta.preview.clone(),
            modified: meta.modified,
            score: 0.0,
        }
    }
}

/// Per-folder settings record, persisted as `.scratch/settings.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub pinned_note_ids: Vec<NoteId>,
    /// Filename template for new notes, e.g. `"Untitled"` or `"{date} note"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_note_name: Option<String>,
}

impl Settings {
    pub fn is_pinned(&self, id: &NoteId) -> bool {
        self.pinned_note_ids.iter().any(|p| p == id)
    }
}

/// The most recently written (id, content) pair.
///
/// Distinguishes the echo of our own id-changing save (a rename) from a truly
/// external edit. Exactly one fingerprint is retained; it is cleared once
/// consumed by the reconciler.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveFingerprint {
    /// The id the save was issued under (the pre-rename id).
    pub note_id: NoteId,
    /// The canonical content that was written.
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_id_leaf_and_prefix() {
        let root = NoteId::new("shopping-list");
        assert_eq!(root.leaf(), "shopping-list");
        assert_eq!(root.dir_prefix(), None);

        let nested = NoteId::new("work/2024/standup-notes");
        assert_eq!(nested.leaf(), "standup-notes");
        assert_eq!(nested.dir_prefix(), Some("work/2024"));
    }

    #[test]
    fn note_id_serializes_as_plain_string() {
        let id = NoteId::new("work/plan");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"work/plan\"");
        let back: NoteId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn settings_round_trip_uses_camel_case_keys() {
        let settings = Settings {
            pinned_note_ids: vec![NoteId::new("a"), NoteId::new("b/c")],
            default_note_name: Some("{date} note".to_string()),
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("pinnedNoteIds"));
        assert!(json.contains("defaultNoteName"));
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn settings_missing_fields_default() {
        let settings: Settings = serde_json::from_str("{}").unwrap();
        assert!(settings.pinned_note_ids.is_empty());
        assert!(settings.default_note_name.is_none());
    }

    #[test]
    fn instant_result_has_zero_score() {
        let meta = NoteMetadata {
            id: NoteId::new("a"),
            title: "A".to_string(),
            preview: String::new(),
            modified: 0,
        };
        assert_eq!(SearchResult::instant(&meta).score, 0.0);
    }
}
