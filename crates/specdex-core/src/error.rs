//! Error kinds for parsing, resolution, and registration.
//!
//! Everything here is local and recoverable: one bad file never blocks the
//! rest of the corpus. Issues split into two classes — those that still let
//! a document register with a best-effort record (the record carries the
//! issue as an annotation) and those that keep it out of the registry
//! entirely.

use crate::spec_id::{IdError, SpecId, SpecLevel};
use std::path::PathBuf;
use thiserror::Error;

/// A condition encountered while parsing or resolving a document.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseIssue {
    /// No metadata block, or one that could not be parsed. The document is
    /// still registered with defaulted metadata, flagged with this issue.
    #[error("missing or malformed metadata block: {0}")]
    MissingOrMalformedMetadata(String),

    /// A required metadata field (`id`, `kind`) is absent or unusable.
    /// The document is not registered.
    #[error("missing required metadata field `{0}`")]
    MissingRequiredField(&'static str),

    /// The hierarchical id fails the grammar. The document is not registered.
    #[error("malformed identifier: {0}")]
    MalformedId(#[from] IdError),

    /// The declared `kind` disagrees with the id's segment letter.
    /// The document is not registered.
    #[error("metadata kind `{kind}` does not match identifier level `{level}`")]
    KindMismatch { kind: SpecLevel, level: SpecLevel },

    /// The declared parent is not (yet) registered. The document registers
    /// as a detached node, reachable by direct lookup only, until the
    /// parent appears.
    #[error("declared parent `{0}` is not registered")]
    OrphanedParent(String),

    /// The source file could not be read. The document is not registered.
    #[error("unreadable source file: {0}")]
    Unreadable(String),
}

impl ParseIssue {
    /// Whether a document carrying this issue can still be registered.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ParseIssue::MissingOrMalformedMetadata(_) | ParseIssue::OrphanedParent(_)
        )
    }
}

/// Why the registry rejected a mutation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// A different source path already owns this id. The first writer
    /// wins; registry state is left untouched.
    #[error("identifier `{id}` is already registered from `{existing}`", existing = existing.display())]
    DuplicateId { id: SpecId, existing: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_split_matches_registration_policy() {
        assert!(ParseIssue::MissingOrMalformedMetadata("x".into()).is_recoverable());
        assert!(ParseIssue::OrphanedParent("E01".into()).is_recoverable());
        assert!(!ParseIssue::MissingRequiredField("id").is_recoverable());
        assert!(!ParseIssue::MalformedId(IdError::Empty).is_recoverable());
        assert!(!ParseIssue::Unreadable("denied".into()).is_recoverable());
    }
}
