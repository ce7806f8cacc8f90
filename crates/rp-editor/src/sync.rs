//! Primary → duplicate content mirroring.
//!
//! The duplicate instance of a section is never edited directly. Whenever an
//! edit touches a primary section, the editing layer reports it and the
//! duplicate's children are rebuilt as deep copies of the primary's, with
//! IDs derived from the primary IDs so mirroring is deterministic.
//! Visibility and attribute changes never reach this path; the flow is
//! one-directional.

use rp_core::NodeIndex;
use rp_core::model::*;

/// Keeps each duplicate section identical to its primary.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentSync;

impl ContentSync {
    /// Mirror the primary instance of `kind` into its duplicate.
    ///
    /// Returns `false` when either instance is missing, in which case
    /// nothing is touched.
    pub fn on_primary_edited(graph: &mut ReportGraph, kind: SectionKind) -> bool {
        let (Some(primary), Some(duplicate)) = (
            graph.section(kind, Instance::Primary),
            graph.section(kind, Instance::Duplicate),
        ) else {
            log::debug!("sync: {} has no primary/duplicate pair", kind.as_str());
            return false;
        };
        graph.copy_children(primary, duplicate);
        graph.graph[duplicate].measured_height = graph.graph[primary].measured_height;
        log::trace!("sync: mirrored {} into its duplicate", kind.as_str());
        true
    }

    /// Whether the duplicate's content matches the primary's, ignoring
    /// editing-only state and affordances.
    pub fn in_sync(graph: &ReportGraph, kind: SectionKind) -> bool {
        match (
            graph.section(kind, Instance::Primary),
            graph.section(kind, Instance::Duplicate),
        ) {
            (Some(primary), Some(duplicate)) => {
                content_outline(graph, primary) == content_outline(graph, duplicate)
            }
            _ => false,
        }
    }
}

/// Content kinds in document order, skipping affordances.
fn content_outline(graph: &ReportGraph, section: NodeIndex) -> Vec<(usize, NodeKind)> {
    fn walk(graph: &ReportGraph, idx: NodeIndex, depth: usize, out: &mut Vec<(usize, NodeKind)>) {
        for child in graph.children(idx) {
            let kind = &graph.graph[child].kind;
            if matches!(kind, NodeKind::Affordance(_)) {
                continue;
            }
            out.push((depth, kind.clone()));
            walk(graph, child, depth + 1, out);
        }
    }
    let mut out = Vec::new();
    walk(graph, section, 0, &mut out);
    out
}
