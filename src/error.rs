use thiserror::Error;

use crate::notes::model::NoteId;
use crate::notes::store::StoreError;

/// Error severity for UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,    // Blue - informational
    Warning, // Yellow - recoverable
    Error,   // Red - operation failed
}

/// Domain-specific errors surfaced to the embedder.
///
/// Every engine operation converts its failure into one of these and emits it
/// as an effect; nothing propagates into the reconciliation paths.
#[derive(Error, Debug)]
pub enum NotesError {
    #[error("failed to load note '{id}': {source}")]
    ReadFailed {
        id: NoteId,
        #[source]
        source: StoreError,
    },

    #[error("failed to save note '{id}': {source}")]
    WriteFailed {
        id: NoteId,
        #[source]
        source: StoreError,
    },

    #[error("failed to create note: {0}")]
    CreateFailed(#[source] StoreError),

    #[error("failed to delete note '{id}': {source}")]
    DeleteFailed {
        id: NoteId,
        #[source]
        source: StoreError,
    },

    #[error("failed to duplicate note '{id}': {source}")]
    DuplicateFailed {
        id: NoteId,
        #[source]
        source: StoreError,
    },

    #[error("failed to list notes: {0}")]
    ListFailed(#[source] StoreError),

    #[error("search failed: {0}")]
    SearchFailed(#[source] StoreError),

    #[error("settings update failed: {0}")]
    SettingsFailed(#[source] StoreError),
}

impl NotesError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::ReadFailed { .. } => ErrorSeverity::Error,
            Self::WriteFailed { .. } => ErrorSeverity::Error,
            Self::CreateFailed(_) => ErrorSeverity::Error,
            Self::DeleteFailed { .. } => ErrorSeverity::Error,
            Self::DuplicateFailed { .. } => ErrorSeverity::Warning,
            Self::ListFailed(_) => ErrorSeverity::Warning,
            Self::SearchFailed(_) => ErrorSeverity::Warning,
            Self::SettingsFailed(_) => ErrorSeverity::Warning,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::ReadFailed { id, .. } => format!("Could not open '{}'", id),
            Self::WriteFailed { id, .. } => {
                format!("Could not save '{}'; your edits are still in the editor", id)
            }
            Self::CreateFailed(_) => "Could not create a new note".to_string(),
            Self::DeleteFailed { id, .. } => format!("Could not delete '{}'", id),
            Self::DuplicateFailed { id, .. } => format!("Could not duplicate '{}'", id),
            Self::ListFailed(_) => "Could not refresh the notes list".to_string(),
            Self::SearchFailed(_) => "Search is unavailable right now".to_string(),
            Self::SettingsFailed(_) => "Could not update notes settings".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, NotesError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn severity_distinguishes_primary_from_ambient_failures() {
        let write = NotesError::WriteFailed {
            id: NoteId::new("a"),
            source: StoreError::Other(anyhow!("disk full")),
        };
        let list = NotesError::ListFailed(StoreError::Other(anyhow!("io")));
        assert_eq!(write.severity(), ErrorSeverity::Error);
        assert_eq!(list.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn user_messages_name_the_note() {
        let err = NotesError::ReadFailed {
            id: NoteId::new("work/plan"),
            source: StoreError::NotFound(NoteId::new("work/plan")),
        };
        assert!(err.user_message().contains("work/plan"));
    }
}
