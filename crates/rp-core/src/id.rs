use lasso::{Spur, ThreadedRodeo};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::LazyLock;

/// Global string interner for element IDs.
static INTERNER: LazyLock<ThreadedRodeo> = LazyLock::new(ThreadedRodeo::default);

/// Suffix that marks an element as the duplicate-placement copy of another.
const DUPLICATE_SUFFIX: &str = "__dup";

/// A lightweight, interned identifier for elements in the report graph.
/// Internally a 4-byte `Spur` index.
///
/// IDs double as the DOM `id` attribute of the rendered element, so the
/// rendering adapter can find the element for any node without a lookup table.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementId(Spur);

impl ElementId {
    /// Intern a string as an ElementId, or return the existing one.
    pub fn intern(s: &str) -> Self {
        ElementId(INTERNER.get_or_intern(s))
    }

    /// Resolve back to a string slice.
    pub fn as_str(&self) -> &str {
        INTERNER.resolve(&self.0)
    }

    /// Generate an ID with a role prefix (e.g. `note_4`, `block_7`).
    ///
    /// Unique within this process only. IDs added to a report go through
    /// `ReportGraph::fresh_id`, which also skips IDs a loaded document holds.
    pub fn with_prefix(prefix: &str) -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        Self::intern(&format!("{prefix}_{n}"))
    }

    /// The ID used for the copy of this element inside a duplicate section.
    ///
    /// Deterministic, so mirroring the same primary twice produces identical
    /// markup.
    pub fn duplicate(&self) -> Self {
        Self::intern(&format!("{}{DUPLICATE_SUFFIX}", self.as_str()))
    }

    /// Whether this ID names a duplicate-placement copy.
    pub fn is_duplicate(&self) -> bool {
        self.as_str().ends_with(DUPLICATE_SUFFIX)
    }
}

impl fmt::Debug for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.as_str())
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ElementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ElementId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(ElementId::intern(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_roundtrip() {
        let a = ElementId::intern("report_title");
        let b = ElementId::intern("report_title");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "report_title");
    }

    #[test]
    fn prefixed_ids_are_unique() {
        let a = ElementId::with_prefix("note");
        let b = ElementId::with_prefix("note");
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("note_"));
    }

    #[test]
    fn duplicate_ids_are_stable() {
        let primary = ElementId::intern("note_a");
        assert_eq!(primary.duplicate(), primary.duplicate());
        assert_eq!(primary.duplicate().as_str(), "note_a__dup");
        assert!(primary.duplicate().is_duplicate());
        assert!(!primary.is_duplicate());
    }
}
