//! Persistence collaborators and their errors.
//!
//! The engine never talks to a backend itself. The host supplies a
//! `ReportStore` for final submission and a `DraftStore` for autosaved
//! working copies; both receive a complete, frozen HTML document.

use std::fmt;

/// Receives the finished document on save.
pub trait ReportStore {
    /// Submit a frozen document. `Err` carries the backend's reason.
    fn submit(&mut self, document: &str) -> Result<(), String>;
}

/// Durable local storage for autosaved drafts.
pub trait DraftStore {
    fn save_draft(&mut self, document: &str) -> Result<(), String>;
}

/// Why a save did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistError {
    /// The frozen document is larger than the configured ceiling. Nothing
    /// was submitted.
    Oversized { size: usize, limit: usize },
    /// The store refused the document.
    Rejected(String),
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersistError::Oversized { size, limit } => write!(
                f,
                "Report is too large to save: {size} bytes (limit {limit} bytes)"
            ),
            PersistError::Rejected(reason) => write!(f, "Report was not saved: {reason}"),
        }
    }
}

impl std::error::Error for PersistError {}

/// Check a frozen document against the size ceiling.
pub fn check_size(document: &str, limit: usize) -> Result<(), PersistError> {
    let size = document.len();
    if size > limit {
        return Err(PersistError::Oversized { size, limit });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_ceiling_is_inclusive() {
        assert_eq!(check_size("abcd", 4), Ok(()));
        assert_eq!(
            check_size("abcde", 4),
            Err(PersistError::Oversized { size: 5, limit: 4 })
        );
    }

    #[test]
    fn errors_read_as_sentences() {
        let err = PersistError::Oversized {
            size: 6_000_000,
            limit: 5_242_880,
        };
        assert_eq!(
            err.to_string(),
            "Report is too large to save: 6000000 bytes (limit 5242880 bytes)"
        );
        assert_eq!(
            PersistError::Rejected("HTTP 413".into()).to_string(),
            "Report was not saved: HTTP 413"
        );
    }
}
