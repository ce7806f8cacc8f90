//! Column layout solver.
//!
//! Each page frame stacks its children top to bottom inside the content
//! frame; sections stack their rows the same way. The footer mark is pinned
//! to the bottom of the content frame. Pages are stacked vertically in one
//! document coordinate space (page 2 starts one page height plus
//! `page_gap` below page 1), which is what the scroll-driven controller
//! compares against.
//!
//! Nodes that do not flow (hidden, or fading out) still get "ghost" bounds
//! at the position they would occupy if shown, without pushing later
//! content down. This lets the overflow detector answer "would the hidden
//! primary fit here" before revealing it.

use crate::config::PageGeometry;
use crate::model::*;
use petgraph::graph::NodeIndex;
use std::collections::HashMap;

/// Absolute, document-relative bounds of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Bounds {
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }
}

/// Output of `resolve_layout`.
#[derive(Debug, Clone, Default)]
pub struct ResolvedLayout {
    /// Bounds of every placed node (page frames included).
    pub nodes: HashMap<NodeIndex, Bounds>,
    /// Content frame of each page frame, keyed by the page frame index.
    pub frames: HashMap<NodeIndex, Bounds>,
}

impl ResolvedLayout {
    pub fn get(&self, idx: NodeIndex) -> Option<Bounds> {
        self.nodes.get(&idx).copied()
    }

    pub fn content_frame(&self, page_frame: NodeIndex) -> Option<Bounds> {
        self.frames.get(&page_frame).copied()
    }

    pub fn bottom_of(&self, idx: NodeIndex) -> Option<f32> {
        self.get(idx).map(|b| b.bottom())
    }
}

/// Resolve all node positions in the report.
pub fn resolve_layout(graph: &ReportGraph, geometry: &PageGeometry) -> ResolvedLayout {
    let mut layout = ResolvedLayout::default();

    for (page, page_idx) in graph.pages() {
        let origin = page_origin(page, geometry);
        let page_bounds = Bounds {
            x: 0.0,
            y: origin,
            width: geometry.width,
            height: geometry.height,
        };
        let frame = Bounds {
            x: geometry.padding,
            y: origin + geometry.padding,
            width: geometry.width - 2.0 * geometry.padding,
            height: geometry.height - 2.0 * geometry.padding,
        };
        layout.nodes.insert(page_idx, page_bounds);
        layout.frames.insert(page_idx, frame);

        let mut cursor = frame.y;
        for child in graph.children(page_idx) {
            let node = &graph.graph[child];
            let height = intrinsic_height(graph, child, geometry);

            if node.region_role() == Some(RegionRole::FooterMark) {
                let bounds = Bounds {
                    x: frame.x,
                    y: frame.bottom() - height,
                    width: frame.width,
                    height,
                };
                layout.nodes.insert(child, bounds);
                continue;
            }

            let bounds = Bounds {
                x: frame.x,
                y: cursor,
                width: frame.width,
                height,
            };
            layout.nodes.insert(child, bounds);
            place_inner(graph, child, bounds, &mut layout, geometry);

            if node.visibility.flows() && height > 0.0 {
                cursor += height + geometry.gap;
            }
        }
    }

    layout
}

/// Document-relative top of a page.
pub fn page_origin(page: Page, geometry: &PageGeometry) -> f32 {
    page.index() as f32 * (geometry.height + geometry.page_gap)
}

/// Stack the children of a container inside its bounds.
fn place_inner(
    graph: &ReportGraph,
    parent: NodeIndex,
    parent_bounds: Bounds,
    layout: &mut ResolvedLayout,
    geometry: &PageGeometry,
) {
    let children = graph.children(parent);
    if children.is_empty() {
        return;
    }

    let pad = match graph.graph[parent].kind {
        NodeKind::Section { .. } => geometry.section_padding,
        _ => 0.0,
    };
    let mut cursor = parent_bounds.y + pad;
    for child in children {
        let height = intrinsic_height(graph, child, geometry);
        let bounds = Bounds {
            x: parent_bounds.x + pad,
            y: cursor,
            width: parent_bounds.width - 2.0 * pad,
            height,
        };
        layout.nodes.insert(child, bounds);
        place_inner(graph, child, bounds, layout, geometry);
        if graph.graph[child].visibility.flows() && height > 0.0 {
            cursor += height + geometry.gap;
        }
    }
}

/// Height of a node: the adapter's measurement when present, otherwise an
/// estimate from content.
pub fn intrinsic_height(graph: &ReportGraph, idx: NodeIndex, geometry: &PageGeometry) -> f32 {
    let node = &graph.graph[idx];
    if let Some(h) = node.measured_height {
        return h;
    }

    match &node.kind {
        NodeKind::Root | NodeKind::PageFrame { .. } => geometry.height,
        NodeKind::Section { .. } => {
            let mut total = 0.0;
            let mut flowing = 0usize;
            for child in graph.children(idx) {
                if !graph.graph[child].visibility.flows() {
                    continue;
                }
                let h = intrinsic_height(graph, child, geometry);
                if h > 0.0 {
                    total += h;
                    flowing += 1;
                }
            }
            let gaps = flowing.saturating_sub(1) as f32 * geometry.gap;
            total + gaps + 2.0 * geometry.section_padding
        }
        NodeKind::Region { markup, .. } | NodeKind::NoteRow { markup, .. } | NodeKind::Block { markup } => {
            estimate_text_height(markup, geometry)
        }
        NodeKind::Image { .. } => geometry.image_height,
        NodeKind::Affordance(_) => 0.0,
    }
}

/// Wrap plain text at `chars_per_line` and count lines.
fn estimate_text_height(markup: &str, geometry: &PageGeometry) -> f32 {
    let text = plain_text(markup);
    let per_line = geometry.chars_per_line.max(1);
    let lines: usize = text
        .split('\n')
        .map(|line| line.chars().count().div_ceil(per_line).max(1))
        .sum();
    lines.max(1) as f32 * geometry.line_height
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ElementId;

    fn geometry() -> PageGeometry {
        PageGeometry {
            width: 600.0,
            height: 900.0,
            padding: 40.0,
            gap: 10.0,
            page_gap: 20.0,
            section_padding: 5.0,
            line_height: 20.0,
            chars_per_line: 10,
            image_height: 50.0,
        }
    }

    fn page_with(children: Vec<ReportNode>) -> (ReportGraph, NodeIndex, Vec<NodeIndex>) {
        let mut graph = ReportGraph::new();
        let root = graph.root;
        let page = graph.add_node(
            root,
            ReportNode::new(ElementId::intern("layout_page"), NodeKind::PageFrame { page: Page::First }),
        );
        let idxs = children.into_iter().map(|n| graph.add_node(page, n)).collect();
        (graph, page, idxs)
    }

    fn region(id: &str, role: RegionRole, height: f32) -> ReportNode {
        ReportNode::new(
            ElementId::intern(id),
            NodeKind::Region {
                role,
                markup: String::new(),
            },
        )
        .with_height(height)
    }

    #[test]
    fn column_stacks_with_gap() {
        let (graph, page, idx) = page_with(vec![
            region("l_header", RegionRole::Header, 100.0),
            region("l_table", RegionRole::Table, 200.0),
        ]);
        let layout = resolve_layout(&graph, &geometry());

        assert_eq!(layout.get(idx[0]).unwrap().y, 40.0);
        assert_eq!(layout.get(idx[1]).unwrap().y, 150.0);
        assert_eq!(layout.content_frame(page).unwrap().bottom(), 860.0);
    }

    #[test]
    fn footer_is_pinned_to_frame_bottom() {
        let (graph, _, idx) = page_with(vec![
            region("l_header2", RegionRole::Header, 100.0),
            region("l_footer", RegionRole::FooterMark, 30.0),
            region("l_after", RegionRole::Table, 50.0),
        ]);
        let layout = resolve_layout(&graph, &geometry());

        assert_eq!(layout.get(idx[1]).unwrap().y, 830.0);
        // The footer does not push the following flow item.
        assert_eq!(layout.get(idx[2]).unwrap().y, 150.0);
    }

    #[test]
    fn hidden_nodes_get_ghost_bounds_without_pushing() {
        let (graph, _, idx) = page_with(vec![
            region("l_ghost", RegionRole::Table, 100.0).hidden(),
            region("l_next", RegionRole::Table, 50.0),
        ]);
        let layout = resolve_layout(&graph, &geometry());

        assert_eq!(layout.get(idx[0]).unwrap().y, 40.0);
        assert_eq!(layout.get(idx[1]).unwrap().y, 40.0);
    }

    #[test]
    fn section_height_is_estimated_from_rows() {
        let mut graph = ReportGraph::new();
        let root = graph.root;
        let page = graph.add_node(
            root,
            ReportNode::new(ElementId::intern("l_page_s"), NodeKind::PageFrame { page: Page::First }),
        );
        let section = graph.add_node(
            page,
            ReportNode::new(
                ElementId::intern("l_notes"),
                NodeKind::Section {
                    kind: SectionKind::Notes,
                    instance: Instance::Primary,
                },
            ),
        );
        // 25 chars at 10 per line → 3 lines → 60 px.
        graph.add_node(
            section,
            ReportNode::new(
                ElementId::intern("l_row"),
                NodeKind::NoteRow {
                    number: 1,
                    markup: "a".repeat(25),
                },
            ),
        );
        graph.add_node(
            section,
            ReportNode::new(ElementId::intern("l_add"), NodeKind::Affordance(AffordanceKind::AddNote)),
        );

        let geometry = geometry();
        assert_eq!(intrinsic_height(&graph, section, &geometry), 60.0 + 10.0);
    }

    #[test]
    fn second_page_is_stacked_below_first() {
        let g = geometry();
        assert_eq!(page_origin(Page::First, &g), 0.0);
        assert_eq!(page_origin(Page::Second, &g), 920.0);
    }
}
