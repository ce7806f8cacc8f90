//! Overflow detection against the fixed-size content frame.
//!
//! A node overflows when its bottom edge reaches or passes either the top of
//! the page's footer mark or the bottom of the content frame minus
//! `SAFETY_BUFFER`. Anything that cannot be measured is reported as
//! overflowing, which degrades to the conservative placement (page 2).

use crate::config::SAFETY_BUFFER;
use crate::layout::ResolvedLayout;
use crate::model::*;
use petgraph::graph::NodeIndex;

/// Whether keeping `idx` at its current position would overflow its page.
pub fn section_overflows(graph: &ReportGraph, layout: &ResolvedLayout, idx: NodeIndex) -> bool {
    match measure(graph, layout, idx) {
        Some(m) => m.bottom >= m.footer_top || m.bottom >= m.frame_bottom - SAFETY_BUFFER,
        None => {
            log::debug!("overflow: missing layout anchor for {idx:?}, treating as overflow");
            true
        }
    }
}

/// Whether `idx` fits and nothing before it on the same page has already
/// overflowed. Overflow is transitive: a later section never fits once an
/// earlier displayed one is past the limit.
pub fn has_space_for(graph: &ReportGraph, layout: &ResolvedLayout, idx: NodeIndex) -> bool {
    if section_overflows(graph, layout, idx) {
        return false;
    }
    let Some(page) = graph.page_of(idx) else {
        return false;
    };

    for earlier in graph.children(page) {
        if earlier == idx {
            break;
        }
        let node = &graph.graph[earlier];
        if node.section().is_some()
            && node.visibility.flows()
            && section_overflows(graph, layout, earlier)
        {
            return false;
        }
    }
    true
}

/// Measurement anchors for one node.
#[derive(Debug, Clone, Copy)]
struct Measurement {
    bottom: f32,
    footer_top: f32,
    frame_bottom: f32,
}

fn measure(graph: &ReportGraph, layout: &ResolvedLayout, idx: NodeIndex) -> Option<Measurement> {
    let bottom = layout.bottom_of(idx)?;
    let page = graph.page_of(idx)?;
    let frame = layout.content_frame(page)?;
    let footer = graph.footer_mark(page).and_then(|f| layout.get(f))?;
    Some(Measurement {
        bottom,
        footer_top: footer.y,
        frame_bottom: frame.bottom(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ElementId;
    use crate::layout::Bounds;

    struct Fixture {
        graph: ReportGraph,
        layout: ResolvedLayout,
        page: NodeIndex,
        footer: NodeIndex,
        notes: NodeIndex,
        signatures: NodeIndex,
    }

    fn section(id: &str, kind: SectionKind) -> ReportNode {
        ReportNode::new(
            ElementId::intern(id),
            NodeKind::Section {
                kind,
                instance: Instance::Primary,
            },
        )
    }

    /// Content frame bottom at 820, footer top at 800.
    fn fixture(notes_bottom: f32, signatures_bottom: f32) -> Fixture {
        let mut graph = ReportGraph::new();
        let root = graph.root;
        let page = graph.add_node(
            root,
            ReportNode::new(ElementId::intern("o_page"), NodeKind::PageFrame { page: Page::First }),
        );
        let notes = graph.add_node(page, section("o_notes", SectionKind::Notes));
        let signatures = graph.add_node(page, section("o_sigs", SectionKind::Signatures));
        let footer = graph.add_node(
            page,
            ReportNode::new(
                ElementId::intern("o_footer"),
                NodeKind::Region {
                    role: RegionRole::FooterMark,
                    markup: String::new(),
                },
            ),
        );

        let mut layout = ResolvedLayout::default();
        layout.frames.insert(
            page,
            Bounds {
                x: 0.0,
                y: 20.0,
                width: 500.0,
                height: 800.0,
            },
        );
        layout.nodes.insert(footer, bounds_at(800.0, 15.0));
        layout.nodes.insert(notes, bounds_at(notes_bottom - 100.0, 100.0));
        layout.nodes.insert(signatures, bounds_at(signatures_bottom - 50.0, 50.0));

        Fixture {
            graph,
            layout,
            page,
            footer,
            notes,
            signatures,
        }
    }

    fn bounds_at(y: f32, height: f32) -> Bounds {
        Bounds {
            x: 0.0,
            y,
            width: 500.0,
            height,
        }
    }

    #[test]
    fn fits_above_footer() {
        let f = fixture(795.0, 790.0);
        assert!(!section_overflows(&f.graph, &f.layout, f.notes));
        assert!(has_space_for(&f.graph, &f.layout, f.notes));
    }

    #[test]
    fn touching_footer_is_overflow() {
        let f = fixture(800.0, 790.0);
        assert!(section_overflows(&f.graph, &f.layout, f.notes));
        let f = fixture(805.0, 790.0);
        assert!(section_overflows(&f.graph, &f.layout, f.notes));
    }

    #[test]
    fn safety_buffer_applies_to_frame_bottom() {
        let mut f = fixture(795.0, 790.0);
        // Move the footer out of the way; frame bottom 820 − 20 = 800 still binds.
        f.layout.nodes.insert(f.footer, bounds_at(900.0, 15.0));
        assert!(!section_overflows(&f.graph, &f.layout, f.notes));
        f.layout.nodes.insert(f.notes, bounds_at(705.0, 95.0));
        assert!(section_overflows(&f.graph, &f.layout, f.notes));
    }

    #[test]
    fn moving_footer_down_only_clears_overflow() {
        let mut f = fixture(810.0, 700.0);
        f.layout.frames.insert(
            f.page,
            Bounds {
                x: 0.0,
                y: 0.0,
                width: 500.0,
                height: 2000.0,
            },
        );
        let mut previous = true;
        for footer_top in (780..=860).step_by(5) {
            f.layout.nodes.insert(f.footer, bounds_at(footer_top as f32, 15.0));
            let now = section_overflows(&f.graph, &f.layout, f.notes);
            assert!(previous || !now, "overflow reappeared at footer top {footer_top}");
            if footer_top <= 810 {
                assert!(now, "bottom 810 at/below footer top {footer_top} must overflow");
            }
            previous = now;
        }
        assert!(!previous);
    }

    #[test]
    fn earlier_overflow_is_transitive() {
        let f = fixture(805.0, 200.0);
        assert!(!section_overflows(&f.graph, &f.layout, f.signatures));
        assert!(!has_space_for(&f.graph, &f.layout, f.signatures));
    }

    #[test]
    fn hidden_earlier_section_does_not_block() {
        let mut f = fixture(805.0, 200.0);
        f.graph.graph[f.notes].visibility = Visibility::Hidden;
        assert!(has_space_for(&f.graph, &f.layout, f.signatures));
    }

    #[test]
    fn missing_anchors_are_overflow() {
        let mut f = fixture(500.0, 400.0);
        f.layout.nodes.remove(&f.footer);
        assert!(section_overflows(&f.graph, &f.layout, f.notes));

        let f = fixture(500.0, 400.0);
        let stray = NodeIndex::new(999);
        assert!(section_overflows(&f.graph, &f.layout, stray));
        assert!(!has_space_for(&f.graph, &f.layout, stray));
    }
}
