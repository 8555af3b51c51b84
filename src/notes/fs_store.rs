//! Filesystem-backed note store.
//!
//! Notes are plain `.md` files under a notes folder; the note id is the
//! relative path without extension, using POSIX separators. Dot-directories
//! (`.scratch`, `.git`, ...) and `assets/` are invisible to the store.
//! Saving re-derives the filename from the content's title, so a title change
//! renames the file and yields a new id. Per-folder settings live in
//! `.scratch/settings.json`.

use anyhow::{Context, Result as AnyResult};
use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use super::model::{Note, NoteId, NoteMetadata, SearchResult, Settings};
use super::store::{NoteStore, StoreError};

/// Maximum directory depth when walking the notes folder.
const MAX_WALK_DEPTH: usize = 10;

/// Result cap for authoritative search.
const SEARCH_LIMIT: usize = 20;

/// Preview length in characters.
const PREVIEW_CHARS: usize = 100;

/// Title fallback length when content has no heading.
const TITLE_CHARS: usize = 50;

pub struct FsNoteStore {
    root: PathBuf,
}

impl FsNoteStore {
    /// Open (creating if necessary) a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> AnyResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create notes folder {}", root.display()))?;
        fs::create_dir_all(root.join(".scratch"))
            .with_context(|| format!("failed to create .scratch dir in {}", root.display()))?;
        info!(root = %root.display(), "Notes store opened");
        Ok(FsNoteStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn settings_path(&self) -> PathBuf {
        self.root.join(".scratch").join("settings.json")
    }

    /// Pick an unused id by appending `-N` to the leaf until the path is free.
    /// `keep` is an id that counts as free (the note's own current id).
    fn unique_id(&self, dir_prefix: Option<&str>, leaf: &str, keep: Option<&NoteId>) -> NoteId {
        let compose = |leaf: &str| match dir_prefix {
            Some(prefix) => NoteId::new(format!("{}/{}", prefix, leaf)),
            None => NoteId::new(leaf),
        };

        let mut candidate = compose(leaf);
        let mut counter = 1;
        loop {
            if keep == Some(&candidate) {
                return candidate;
            }
            match path_from_id(&self.root, &candidate) {
                Ok(path) if path.exists() => {
                    candidate = compose(&format!("{}-{}", leaf, counter));
                    counter += 1;
                }
                _ => return candidate,
            }
        }
    }

    fn note_from_file(&self, id: NoteId, path: PathBuf) -> Result<Note, StoreError> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read note {}", path.display()))?;
        let modified = file_modified_secs(&path);
        Ok(Note {
            title: extract_title(&content),
            id,
            content,
            path: path.to_string_lossy().into_owned(),
            modified,
        })
    }
}

impl NoteStore for FsNoteStore {
    fn read(&self, id: &NoteId) -> Result<Note, StoreError> {
        let path = path_from_id(&self.root, id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(id.clone()));
        }
        self.note_from_file(id.clone(), path)
    }

    fn save(&self, id: &NoteId, content: &str) -> Result<Note, StoreError> {
        let old_path = path_from_id(&self.root, id)?;
        let title = extract_title(content);
        let leaf = sanitize_filename(&title);

        // A differing leaf means the title implies a rename; keep the
        // directory prefix and find a free sibling name.
        let final_id = if leaf == id.leaf() {
            id.clone()
        } else {
            self.unique_id(id.dir_prefix(), &leaf, Some(id))
        };
        let path = path_from_id(&self.root, &final_id)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create parent of {}", path.display()))?;
        }
        fs::write(&path, content)
            .with_context(|| format!("failed to write note {}", path.display()))?;

        // Remove the old file only after the new content is safely on disk.
        if final_id != *id && old_path.exists() && old_path != path {
            if let Err(e) = fs::remove_file(&old_path) {
                warn!(
                    old_path = %old_path.display(),
                    error = %e,
                    "Failed to remove pre-rename note file"
                );
            }
        }

        if final_id != *id {
            info!(old_id = %id, new_id = %final_id, "Note renamed on save");
        } else {
            debug!(note_id = %id, bytes = content.len(), "Note saved");
        }

        let modified = file_modified_secs(&path);
        Ok(Note {
            id: final_id,
            title,
            content: content.to_string(),
            path: path.to_string_lossy().into_owned(),
            modified,
        })
    }

    fn create(&self) -> Result<Note, StoreError> {
        let template = self
            .settings()?
            .default_note_name
            .unwrap_or_else(|| "Untitled".to_string());
        let expanded = expand_note_name_template(&template);
        let sanitized = sanitize_filename(&expanded);

        // `{counter}` survives sanitization and is resolved against existing
        // files; without the tag, uniqueness falls back to a `-N` suffix.
        let has_counter = sanitized.contains("{counter}");
        let mut final_id = NoteId::new(if has_counter {
            sanitized.replace("{counter}", "1")
        } else {
            sanitized.clone()
        });
        let mut counter = 2;
        while path_from_id(&self.root, &final_id)
            .map(|p| p.exists())
            .unwrap_or(false)
        {
            final_id = NoteId::new(if has_counter {
                sanitized.replace("{counter}", &counter.to_string())
            } else {
                format!("{}-{}", sanitized, counter)
            });
            counter += 1;
        }

        let display_title = title_from_id(&final_id);
        let content = format!("# {}\n\n", display_title);
        let path = path_from_id(&self.root, &final_id)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create parent of {}", path.display()))?;
        }
        fs::write(&path, &content)
            .with_context(|| format!("failed to write note {}", path.display()))?;

        info!(note_id = %final_id, "Note created");
        let modified = file_modified_secs(&path);
        Ok(Note {
            id: final_id,
            title: display_title,
            content,
            path: path.to_string_lossy().into_owned(),
            modified,
        })
    }

    fn delete(&self, id: &NoteId) -> Result<(), StoreError> {
        let path = path_from_id(&self.root, id)?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("failed to delete note {}", path.display()))?;
        }
        info!(note_id = %id, "Note deleted");
        Ok(())
    }

    fn duplicate(&self, id: &NoteId) -> Result<Note, StoreError> {
        let source = self.read(id)?;
        let copy_id = self.unique_id(id.dir_prefix(), id.leaf(), None);
        let path = path_from_id(&self.root, &copy_id)?;
        fs::write(&path, &source.content)
            .with_context(|| format!("failed to write duplicate {}", path.display()))?;

        info!(source = %id, copy = %copy_id, "Note duplicated");
        let modified = file_modified_secs(&path);
        Ok(Note {
            id: copy_id,
            title: source.title,
            content: source.content,
            path: path.to_string_lossy().into_owned(),
            modified,
        })
    }

    fn list(&self) -> Result<Vec<NoteMetadata>, StoreError> {
        let mut notes = Vec::new();
        for entry in WalkDir::new(&self.root)
            .max_depth(MAX_WALK_DEPTH)
            .into_iter()
            .filter_entry(is_visible_entry)
            .flatten()
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(id) = note_id_from_path(&self.root, entry.path()) else {
                continue;
            };
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };
            notes.push(NoteMetadata {
                title: extract_title(&content),
                preview: generate_preview(&content),
                modified: file_modified_secs(entry.path()),
                id,
            });
        }

        let settings = self.settings().unwrap_or_default();
        let pinned: HashSet<NoteId> = settings.pinned_note_ids.into_iter().collect();

        // Pinned notes first, then newest first within each group.
        notes.sort_by(|a, b| {
            let a_pinned = pinned.contains(&a.id);
            let b_pinned = pinned.contains(&b.id);
            b_pinned
                .cmp(&a_pinned)
                .then_with(|| b.modified.cmp(&a.modified))
        });

        debug!(count = notes.len(), "Listed notes");
        Ok(notes)
    }

    fn search(&self, query: &str) -> Result<Vec<SearchResult>, StoreError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let needle = query.to_lowercase();

        let mut results = Vec::new();
        for entry in WalkDir::new(&self.root)
            .max_depth(MAX_WALK_DEPTH)
            .into_iter()
            .filter_entry(is_visible_entry)
            .flatten()
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(id) = note_id_from_path(&self.root, entry.path()) else {
                continue;
            };
            let Ok(content) = fs::read_to_string(entry.path()) else {
                continue;
            };
            let title = extract_title(&content);

            let mut score = 0.0f32;
            if title.to_lowercase().contains(&needle) {
                score += 50.0;
            }
            if content.to_lowercase().contains(&needle) {
                // Content-only hits rank below title hits.
                score += if score == 0.0 { 10.0 } else { 5.0 };
            }
            if score > 0.0 {
                results.push(SearchResult {
                    preview: generate_preview(&content),
                    modified: file_modified_secs(entry.path()),
                    id,
                    title,
                    score,
                });
            }
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(SEARCH_LIMIT);

        debug!(query = %query, count = results.len(), "Search completed");
        Ok(results)
    }

    fn settings(&self) -> Result<Settings, StoreError> {
        let path = self.settings_path();
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        match serde_json::from_str(&content) {
            Ok(settings) => Ok(settings),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed settings file, using defaults");
                Ok(Settings::default())
            }
        }
    }

    fn update_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        let path = self.settings_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create settings dir {}", parent.display()))?;
        }
        let content =
            serde_json::to_string_pretty(settings).context("failed to serialize settings")?;
        fs::write(&path, content)
            .with_context(|| format!("failed to write settings {}", path.display()))?;
        Ok(())
    }
}

// ============================================
// ID <-> PATH MAPPING
// ============================================

/// Convert an absolute file path to a note id (relative path, no `.md`
/// extension, POSIX separators). Returns `None` for paths outside the root,
/// non-`.md` files, or files inside excluded directories.
pub(crate) fn note_id_from_path(root: &Path, path: &Path) -> Option<NoteId> {
    let rel = path.strip_prefix(root).ok()?;

    for component in rel.components() {
        if let Component::Normal(name) = component {
            let name = name.to_str()?;
            if name.starts_with('.') || name == "assets" {
                return None;
            }
        }
    }

    if path.extension()?.to_str()? != "md" {
        return None;
    }

    // Trim the suffix textually: `with_extension` would mangle stems that
    // contain dots ("meeting.2024-01-15.md").
    let rel = rel.to_str()?;
    let id = rel
        .strip_suffix(".md")?
        .replace(std::path::MAIN_SEPARATOR, "/");
    if id.is_empty() {
        None
    } else {
        Some(NoteId::new(id))
    }
}

/// Convert a note id to an absolute file path, rejecting path traversal.
pub(crate) fn path_from_id(root: &Path, id: &NoteId) -> Result<PathBuf, StoreError> {
    let raw = id.as_str();
    if raw.contains('\\') {
        return Err(StoreError::InvalidId(format!(
            "{}: backslashes not allowed",
            raw
        )));
    }

    for component in Path::new(raw).components() {
        match component {
            Component::ParentDir | Component::CurDir => {
                return Err(StoreError::InvalidId(format!(
                    "{}: relative path references not allowed",
                    raw
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StoreError::InvalidId(format!(
                    "{}: absolute paths not allowed",
                    raw
                )));
            }
            Component::Normal(_) => {}
        }
    }

    // Append ".md" via OsString so dots in the stem survive.
    let mut path = root.join(raw).into_os_string();
    path.push(".md");
    let path = PathBuf::from(path);

    if !path.starts_with(root) {
        return Err(StoreError::InvalidId(format!(
            "{}: escapes the notes folder",
            raw
        )));
    }
    Ok(path)
}

/// WalkDir filter: skips dot-directories and `assets/`.
fn is_visible_entry(entry: &DirEntry) -> bool {
    if entry.file_type().is_dir() {
        let name = entry.file_name().to_str().unwrap_or("");
        // The walk root may itself be a dot-directory (e.g. a temp dir).
        return entry.depth() == 0 || (!name.starts_with('.') && name != "assets");
    }
    true
}

fn file_modified_secs(path: &Path) -> i64 {
    fs::metadata(path)
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ============================================
// TITLES, PREVIEWS, FILENAMES
// ============================================

fn is_effectively_empty(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_whitespace() || c == '\u{00A0}' || c == '\u{FEFF}')
}

/// Replace filesystem-hostile characters and fall back to "Untitled".
pub(crate) fn sanitize_filename(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .filter(|c| *c != '\u{00A0}' && *c != '\u{FEFF}')
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            _ => c,
        })
        .collect();

    let trimmed = sanitized.trim();
    if trimmed.is_empty() || is_effectively_empty(trimmed) {
        "Untitled".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Strip a leading YAML frontmatter block (`---` ... `---`).
fn strip_frontmatter(content: &str) -> &str {
    let trimmed = content.trim_start();
    if let Some(rest) = trimmed.strip_prefix("---") {
        if let Some(end) = rest.find("\n---") {
            let after = &rest[end + 4..];
            return after
                .strip_prefix("\r\n")
                .or_else(|| after.strip_prefix('\n'))
                .unwrap_or(after);
        }
    }
    content
}

/// Extract a display title: first `# ` heading, else first non-empty line.
pub(crate) fn extract_title(content: &str) -> String {
    let body = strip_frontmatter(content);
    for line in body.lines() {
        let trimmed = line.trim();
        if let Some(title) = trimmed.strip_prefix("# ") {
            let title = title.trim();
            if !is_effectively_empty(title) {
                return title.to_string();
            }
        }
        if !is_effectively_empty(trimmed) {
            return trimmed.chars().take(TITLE_CHARS).collect();
        }
    }
    "Untitled".to_string()
}

/// Build a preview from the first non-empty line after the title.
pub(crate) fn generate_preview(content: &str) -> String {
    let body = strip_frontmatter(content);
    for line in body.lines().skip(1) {
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            let stripped = strip_markdown(trimmed);
            if !stripped.is_empty() {
                return stripped.chars().take(PREVIEW_CHARS).collect();
            }
        }
    }
    String::new()
}

fn image_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[([^\]]*)\]\([^)]+\)").expect("valid image regex"))
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[([^\]]+)\]\([^)]+\)").expect("valid link regex"))
}

fn list_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\s*[-+*]|\s*\d+\.)\s+").expect("valid list marker regex"))
}

/// Remove a paired inline marker like `**`, `~~` or `` ` `` from `text`.
fn strip_paired_marker(text: &mut String, marker: &str) {
    while let Some(start) = text.find(marker) {
        let after = start + marker.len();
        match text[after..].find(marker) {
            Some(end) if end > 0 => {
                let inner = text[after..after + end].to_string();
                text.replace_range(start..after + end + marker.len(), &inner);
            }
            _ => break,
        }
    }
}

/// Strip common markdown formatting for preview display.
pub(crate) fn strip_markdown(text: &str) -> String {
    let mut result = text.to_string();

    let trimmed = result.trim_start();
    if trimmed.starts_with('#') {
        result = trimmed.trim_start_matches('#').trim_start().to_string();
    }

    // Strikethrough and bold before italic so `**` is not read as two `*`.
    strip_paired_marker(&mut result, "~~");
    strip_paired_marker(&mut result, "**");
    strip_paired_marker(&mut result, "__");
    strip_paired_marker(&mut result, "`");

    // Images before links: `![alt](url)` also matches the link pattern.
    result = image_re().replace_all(&result, "$1").to_string();
    result = link_re().replace_all(&result, "$1").to_string();

    strip_paired_marker(&mut result, "*");
    strip_paired_marker(&mut result, "_");

    result = result
        .replace("- [ ] ", "")
        .replace("- [x] ", "")
        .replace("- [X] ", "");
    result = list_marker_re().replace(&result, "").to_string();

    result.trim().to_string()
}

/// Expand `{date}`/`{time}`/`{timestamp}`/`{year}`/`{month}`/`{day}` tags in
/// a note name template, using the local timezone. `{counter}` is resolved by
/// the caller against existing files.
pub(crate) fn expand_note_name_template(template: &str) -> String {
    let now = chrono::Local::now();
    template
        .replace("{timestamp}", &now.timestamp().to_string())
        .replace("{date}", &now.format("%Y-%m-%d").to_string())
        .replace("{year}", &now.format("%Y").to_string())
        .replace("{month}", &now.format("%m").to_string())
        .replace("{day}", &now.format("%d").to_string())
        // Colons are not filename-safe, so time uses dashes.
        .replace("{time}", &now.format("%H-%M-%S").to_string())
}

/// Derive a display title from an id's filename: dashes and underscores
/// become spaces, words are title-cased.
pub(crate) fn title_from_id(id: &NoteId) -> String {
    id.leaf()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().to_string() + chars.as_str(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn temp_store() -> (TempDir, FsNoteStore) {
        let dir = tempdir().unwrap();
        let store = FsNoteStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn id_round_trips_through_path() {
        let root = Path::new("/notes");
        let id = NoteId::new("work/meeting.2024-01-15");
        let path = path_from_id(root, &id).unwrap();
        assert_eq!(path, Path::new("/notes/work/meeting.2024-01-15.md"));
        assert_eq!(note_id_from_path(root, &path), Some(id));
    }

    #[test]
    fn id_mapping_rejects_traversal() {
        let root = Path::new("/notes");
        assert!(path_from_id(root, &NoteId::new("../escape")).is_err());
        assert!(path_from_id(root, &NoteId::new("./hidden")).is_err());
        assert!(path_from_id(root, &NoteId::new("/abs")).is_err());
        assert!(path_from_id(root, &NoteId::new("a\\b")).is_err());
    }

    #[test]
    fn hidden_and_asset_paths_are_invisible() {
        let root = Path::new("/notes");
        assert_eq!(
            note_id_from_path(root, Path::new("/notes/.scratch/settings.md")),
            None
        );
        assert_eq!(
            note_id_from_path(root, Path::new("/notes/assets/pic.md")),
            None
        );
        assert_eq!(note_id_from_path(root, Path::new("/notes/plain.txt")), None);
    }

    #[test]
    fn extract_title_prefers_heading() {
        assert_eq!(extract_title("# Plans\n\nbody"), "Plans");
        assert_eq!(extract_title("no heading here\nmore"), "no heading here");
        assert_eq!(extract_title("---\ntag: x\n---\n# Real Title\n"), "Real Title");
        assert_eq!(extract_title("   \n\n"), "Untitled");
    }

    #[test]
    fn preview_skips_title_and_strips_markdown() {
        let content = "# Title\n\n**bold** and [a link](https://x) and `code`\n";
        assert_eq!(generate_preview(content), "bold and a link and code");
    }

    #[test]
    fn preview_strips_task_and_list_markers() {
        assert_eq!(generate_preview("# T\n\n- [ ] buy milk\n"), "buy milk");
        assert_eq!(generate_preview("# T\n\n1. first step\n"), "first step");
    }

    #[test]
    fn sanitize_replaces_hostile_characters() {
        assert_eq!(sanitize_filename("a/b:c*d"), "a-b-c-d");
        assert_eq!(sanitize_filename("  \u{00A0} "), "Untitled");
    }

    #[test]
    fn title_from_id_title_cases_words() {
        assert_eq!(title_from_id(&NoteId::new("my-great_note")), "My Great Note");
        assert_eq!(title_from_id(&NoteId::new("work/plan-b")), "Plan B");
    }

    #[test]
    fn save_then_read_round_trips() {
        let (_dir, store) = temp_store();
        let note = store.save(&NoteId::new("Plans"), "# Plans\n\nbody\n").unwrap();
        assert_eq!(note.id, NoteId::new("Plans"));
        let back = store.read(&note.id).unwrap();
        assert_eq!(back.content, "# Plans\n\nbody\n");
        assert_eq!(back.title, "Plans");
    }

    #[test]
    fn title_change_renames_and_removes_old_file() {
        let (_dir, store) = temp_store();
        let first = store.save(&NoteId::new("Plans"), "# Plans\n").unwrap();
        let renamed = store.save(&first.id, "# Travel Plans\n").unwrap();
        assert_eq!(renamed.id, NoteId::new("Travel Plans"));
        assert!(matches!(
            store.read(&NoteId::new("Plans")),
            Err(StoreError::NotFound(_))
        ));
        assert!(store.read(&renamed.id).is_ok());
    }

    #[test]
    fn rename_collision_appends_counter() {
        let (_dir, store) = temp_store();
        store.save(&NoteId::new("Travel Plans"), "# Travel Plans\n").unwrap();
        let other = store.save(&NoteId::new("Plans"), "# Travel Plans\nsecond\n").unwrap();
        assert_eq!(other.id, NoteId::new("Travel Plans-1"));
    }

    #[test]
    fn rename_keeps_directory_prefix() {
        let (_dir, store) = temp_store();
        let note = store.save(&NoteId::new("work/Old"), "# Old\n").unwrap();
        let renamed = store.save(&note.id, "# New Name\n").unwrap();
        assert_eq!(renamed.id, NoteId::new("work/New Name"));
    }

    #[test]
    fn saving_unchanged_title_is_not_a_rename() {
        let (_dir, store) = temp_store();
        let first = store.save(&NoteId::new("Plans"), "# Plans\none\n").unwrap();
        let second = store.save(&first.id, "# Plans\ntwo\n").unwrap();
        assert_eq!(second.id, first.id);
    }

    #[test]
    fn create_uses_template_and_counters() {
        let (_dir, store) = temp_store();
        store
            .update_settings(&Settings {
                default_note_name: Some("Daily {counter}".to_string()),
                ..Default::default()
            })
            .unwrap();
        let first = store.create().unwrap();
        let second = store.create().unwrap();
        assert_eq!(first.id, NoteId::new("Daily 1"));
        assert_eq!(second.id, NoteId::new("Daily 2"));
        assert!(first.content.starts_with("# Daily 1\n"));
    }

    #[test]
    fn create_default_appends_suffix_on_collision() {
        let (_dir, store) = temp_store();
        let first = store.create().unwrap();
        let second = store.create().unwrap();
        assert_eq!(first.id, NoteId::new("Untitled"));
        assert_eq!(second.id, NoteId::new("Untitled-2"));
    }

    #[test]
    fn duplicate_copies_content_to_sibling() {
        let (_dir, store) = temp_store();
        let note = store.save(&NoteId::new("Plans"), "# Plans\nbody\n").unwrap();
        let copy = store.duplicate(&note.id).unwrap();
        assert_eq!(copy.id, NoteId::new("Plans-1"));
        assert_eq!(copy.content, "# Plans\nbody\n");
        assert!(store.read(&note.id).is_ok());
    }

    #[test]
    fn list_sorts_pinned_first_then_newest() {
        let (_dir, store) = temp_store();
        store.save(&NoteId::new("Old"), "# Old\n").unwrap();
        store.save(&NoteId::new("Newer"), "# Newer\n").unwrap();
        store
            .update_settings(&Settings {
                pinned_note_ids: vec![NoteId::new("Old")],
                ..Default::default()
            })
            .unwrap();
        let notes = store.list().unwrap();
        assert_eq!(notes[0].id, NoteId::new("Old"));
    }

    #[test]
    fn list_skips_dot_dirs_and_assets() {
        let (_dir, store) = temp_store();
        store.save(&NoteId::new("Visible"), "# Visible\n").unwrap();
        fs::create_dir_all(store.root().join("assets")).unwrap();
        fs::write(store.root().join("assets").join("hidden.md"), "# Hidden\n").unwrap();
        fs::write(store.root().join(".scratch").join("state.md"), "x").unwrap();
        let notes = store.list().unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].id, NoteId::new("Visible"));
    }

    #[test]
    fn search_scores_title_above_content() {
        let (_dir, store) = temp_store();
        store
            .save(&NoteId::new("Rust Notes"), "# Rust Notes\nlanguage\n")
            .unwrap();
        store
            .save(&NoteId::new("Journal"), "# Journal\nlearning rust today\n")
            .unwrap();
        store.save(&NoteId::new("Misc"), "# Misc\nnothing\n").unwrap();

        let results = store.search("rust").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, NoteId::new("Rust Notes"));
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn search_empty_query_returns_nothing() {
        let (_dir, store) = temp_store();
        store.save(&NoteId::new("A"), "# A\n").unwrap();
        assert!(store.search("  ").unwrap().is_empty());
    }

    #[test]
    fn settings_round_trip() {
        let (_dir, store) = temp_store();
        let settings = Settings {
            pinned_note_ids: vec![NoteId::new("a")],
            default_note_name: Some("Note".to_string()),
        };
        store.update_settings(&settings).unwrap();
        assert_eq!(store.settings().unwrap(), settings);
    }

    #[test]
    fn malformed_settings_fall_back_to_defaults() {
        let (_dir, store) = temp_store();
        fs::write(store.root().join(".scratch").join("settings.json"), "{oops").unwrap();
        assert_eq!(store.settings().unwrap(), Settings::default());
    }
}
