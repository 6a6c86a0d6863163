//! Error taxonomy for the resolution core and its collaborators.

use crate::knowledge::CategoryKind;

/// Errors surfaced by knowledge-base and resolution operations.
///
/// `UnknownCategory`, `KindMismatch` and `DuplicateCategory` are fatal to the
/// call that raised them and are checked before anything is mutated.
/// `NoCandidateFound` and `EmptyMention` are per-item: batch operations record
/// them and move on to the next mention.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("no canonical candidate found for '{mention}'")]
    NoCandidateFound { mention: String },

    #[error("mention is empty")]
    EmptyMention,

    #[error("category '{category}' is {found}, operation requires {expected}")]
    KindMismatch {
        category: String,
        expected: CategoryKind,
        found: CategoryKind,
    },

    #[error("category declared twice: {0}")]
    DuplicateCategory(String),
}

impl ResolveError {
    /// True for errors that abort a whole batch rather than a single item.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnknownCategory(_) | Self::KindMismatch { .. } | Self::DuplicateCategory(_)
        )
    }
}

/// Failures reported by external collaborators (oracle, search backend, translator).
///
/// The core never retries: at its boundary every variant degrades to
/// `NoCandidateFound` (oracle) or untranslated matching (translator).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    /// Temporarily unreachable, typically rate limited.
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}
