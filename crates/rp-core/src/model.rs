//! Report object graph.
//!
//! A rendered test report is a tree: the root owns exactly two page frames,
//! each page frame owns immovable regions (header, fields, tables, footer mark)
//! and one instance of each movable section. The Notes and Signatures
//! sections exist twice (the *primary* instance lives on page 1, the
//! *duplicate* on page 2) and only one of the two is shown at any time.
//!
//! Controllers flip visibility, the editing layer rewrites content, and the
//! emitter reads the whole tree back out as HTML. Nothing here measures:
//! positions come from `layout::resolve_layout`.

use crate::id::ElementId;
pub use crate::markup::plain_text;
use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableDiGraph;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

// ─── Time ────────────────────────────────────────────────────────────────

/// Milliseconds on a monotonic clock supplied by the host
/// (`performance.now()` in the browser). Fades, locks and debouncers all
/// compare timestamps instead of owning timers.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Timestamp(pub f64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0.0);

    /// The timestamp `ms` milliseconds after this one.
    #[must_use]
    pub fn after(self, ms: f64) -> Self {
        Timestamp(self.0 + ms)
    }

    pub fn millis(self) -> f64 {
        self.0
    }
}

// ─── Pages, sections, regions ────────────────────────────────────────────

/// One of the two print pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Page {
    First,
    Second,
}

impl Page {
    pub const ALL: [Page; 2] = [Page::First, Page::Second];

    /// 1-based page number, as written in `data-page`.
    pub fn number(self) -> u8 {
        match self {
            Page::First => 1,
            Page::Second => 2,
        }
    }

    pub fn from_number(n: u8) -> Option<Self> {
        match n {
            1 => Some(Page::First),
            2 => Some(Page::Second),
            _ => None,
        }
    }

    /// Zero-based position in the stacked document.
    pub fn index(self) -> usize {
        self.number() as usize - 1
    }
}

/// The movable section kinds. `ALL` is also the evaluation order: Notes is
/// always resolved before Signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SectionKind {
    Notes,
    Signatures,
}

impl SectionKind {
    pub const ALL: [SectionKind; 2] = [SectionKind::Notes, SectionKind::Signatures];

    pub fn as_str(self) -> &'static str {
        match self {
            SectionKind::Notes => "notes",
            SectionKind::Signatures => "signatures",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "notes" => Some(SectionKind::Notes),
            "signatures" => Some(SectionKind::Signatures),
            _ => None,
        }
    }
}

/// Which placement of a section a node is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Instance {
    Primary,
    Duplicate,
}

impl Instance {
    /// The page this instance is mounted on.
    pub fn home_page(self) -> Page {
        match self {
            Instance::Primary => Page::First,
            Instance::Duplicate => Page::Second,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Instance::Primary => "primary",
            Instance::Duplicate => "duplicate",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "primary" => Some(Instance::Primary),
            "duplicate" => Some(Instance::Duplicate),
            _ => None,
        }
    }
}

/// Role of an immovable block of report content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionRole {
    Header,
    ReportNumber,
    Title,
    Order,
    Company,
    Date,
    Product,
    TestTitle,
    Reference,
    SampleNote,
    Table,
    Logo,
    FooterMark,
    Other,
}

impl RegionRole {
    pub fn as_str(self) -> &'static str {
        match self {
            RegionRole::Header => "header",
            RegionRole::ReportNumber => "report_number",
            RegionRole::Title => "title",
            RegionRole::Order => "order",
            RegionRole::Company => "company",
            RegionRole::Date => "date",
            RegionRole::Product => "product",
            RegionRole::TestTitle => "test_title",
            RegionRole::Reference => "reference",
            RegionRole::SampleNote => "sample_note",
            RegionRole::Table => "table",
            RegionRole::Logo => "logo",
            RegionRole::FooterMark => "footer",
            RegionRole::Other => "other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "header" => RegionRole::Header,
            "report_number" => RegionRole::ReportNumber,
            "title" => RegionRole::Title,
            "order" => RegionRole::Order,
            "company" => RegionRole::Company,
            "date" => RegionRole::Date,
            "product" => RegionRole::Product,
            "test_title" => RegionRole::TestTitle,
            "reference" => RegionRole::Reference,
            "sample_note" => RegionRole::SampleNote,
            "table" => RegionRole::Table,
            "logo" => RegionRole::Logo,
            "footer" => RegionRole::FooterMark,
            "other" => RegionRole::Other,
            _ => return None,
        })
    }

    /// Regions the editing mode may open for direct text editing.
    pub fn is_editable_field(self) -> bool {
        matches!(
            self,
            RegionRole::ReportNumber
                | RegionRole::Title
                | RegionRole::Order
                | RegionRole::Company
                | RegionRole::Date
                | RegionRole::Product
                | RegionRole::TestTitle
                | RegionRole::Reference
                | RegionRole::SampleNote
        )
    }
}

// ─── Visibility ──────────────────────────────────────────────────────────

/// Display state of a node, including the short fades used when a section
/// swaps pages.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
    /// Still shown, fading to transparent; hidden once `until` passes.
    FadingOut { until: Timestamp },
    /// Shown, fading in; fully visible once `until` passes.
    FadingIn { until: Timestamp },
    /// Hidden for now; starts fading in at `at`.
    Queued { at: Timestamp },
}

impl Visibility {
    /// The state this node ends up in once in-flight fades finish.
    pub fn settled(self) -> Visibility {
        match self {
            Visibility::Visible | Visibility::FadingIn { .. } | Visibility::Queued { .. } => {
                Visibility::Visible
            }
            Visibility::Hidden | Visibility::FadingOut { .. } => Visibility::Hidden,
        }
    }

    /// Whether the node takes part in layout flow.
    pub fn flows(self) -> bool {
        self.settled() == Visibility::Visible
    }

    /// Whether the node is currently painted (possibly mid-fade).
    pub fn is_painted(self) -> bool {
        !matches!(self, Visibility::Hidden | Visibility::Queued { .. })
    }

    /// Step the fade forward to `now`.
    #[must_use]
    pub fn advance(self, now: Timestamp, fade_ms: f64) -> Visibility {
        let mut state = self;
        loop {
            let next = match state {
                Visibility::FadingOut { until } if until <= now => Visibility::Hidden,
                Visibility::Queued { at } if at <= now => Visibility::FadingIn {
                    until: at.after(fade_ms),
                },
                Visibility::FadingIn { until } if until <= now => Visibility::Visible,
                other => other,
            };
            if next == state {
                return state;
            }
            state = next;
        }
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

/// Editing-only controls layered over the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AffordanceKind {
    /// "Add note" button at the end of the primary Notes section.
    AddNote,
    /// Replace/remove buttons shown over an image on hover.
    ImageControls,
}

impl AffordanceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            AffordanceKind::AddNote => "add-note",
            AffordanceKind::ImageControls => "image-controls",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add-note" => Some(AffordanceKind::AddNote),
            "image-controls" => Some(AffordanceKind::ImageControls),
            _ => None,
        }
    }
}

/// An inline style declaration that only exists while editing
/// (outline, cursor). Stripped by the serializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDecl {
    pub property: String,
    pub value: String,
}

impl StyleDecl {
    pub fn new(property: &str, value: &str) -> Self {
        Self {
            property: property.to_string(),
            value: value.to_string(),
        }
    }
}

/// The node kinds in the report tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    Root,

    /// Fixed-size print page.
    PageFrame { page: Page },

    /// Immovable, pre-templated content.
    Region { role: RegionRole, markup: String },

    /// Movable section instance. Content lives in its children.
    Section {
        kind: SectionKind,
        instance: Instance,
    },

    /// Numbered entry of a Notes section.
    NoteRow { number: u32, markup: String },

    /// Generic content block (signature lines, stamps).
    Block { markup: String },

    Image { src: String, alt: String },

    Affordance(AffordanceKind),
}

/// A single node in the report graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportNode {
    pub id: ElementId,
    pub kind: NodeKind,
    pub visibility: Visibility,

    /// Open for direct text editing (`contenteditable`).
    pub editable: bool,

    /// Inline styles added by the editing mode.
    pub edit_styles: SmallVec<[StyleDecl; 2]>,

    /// Height reported by the rendering adapter. When absent the layout
    /// solver estimates from content.
    pub measured_height: Option<f32>,
}

impl ReportNode {
    pub fn new(id: ElementId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            visibility: Visibility::Visible,
            editable: false,
            edit_styles: SmallVec::new(),
            measured_height: None,
        }
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.visibility = Visibility::Hidden;
        self
    }

    #[must_use]
    pub fn with_height(mut self, height: f32) -> Self {
        self.measured_height = Some(height);
        self
    }

    /// Section kind and instance, if this node is a movable section.
    pub fn section(&self) -> Option<(SectionKind, Instance)> {
        match self.kind {
            NodeKind::Section { kind, instance } => Some((kind, instance)),
            _ => None,
        }
    }

    pub fn region_role(&self) -> Option<RegionRole> {
        match self.kind {
            NodeKind::Region { role, .. } => Some(role),
            _ => None,
        }
    }

    /// Text-bearing markup, for kinds that carry any.
    pub fn markup(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Region { markup, .. }
            | NodeKind::NoteRow { markup, .. }
            | NodeKind::Block { markup } => Some(markup),
            _ => None,
        }
    }

    pub fn markup_mut(&mut self) -> Option<&mut String> {
        match &mut self.kind {
            NodeKind::Region { markup, .. }
            | NodeKind::NoteRow { markup, .. }
            | NodeKind::Block { markup } => Some(markup),
            _ => None,
        }
    }
}

// ─── Report graph ────────────────────────────────────────────────────────

/// The complete report: a tree of `ReportNode` values.
///
/// Edges go from parent → child. Child order is kept explicitly because
/// note rows are inserted and removed while editing and `StableDiGraph`
/// reuses vacated indices.
#[derive(Debug, Clone)]
pub struct ReportGraph {
    /// The underlying directed graph.
    pub graph: StableDiGraph<ReportNode, ()>,

    /// The root node index.
    pub root: NodeIndex,

    /// Index from ElementId → NodeIndex for fast lookup.
    pub id_index: HashMap<ElementId, NodeIndex>,

    child_order: HashMap<NodeIndex, Vec<NodeIndex>>,
}

impl Default for ReportGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportGraph {
    /// Create an empty report with only a root node.
    #[must_use]
    pub fn new() -> Self {
        let mut graph = StableDiGraph::new();
        let root_id = ElementId::intern("report");
        let root = graph.add_node(ReportNode::new(root_id, NodeKind::Root));

        let mut id_index = HashMap::new();
        id_index.insert(root_id, root);

        Self {
            graph,
            root,
            id_index,
            child_order: HashMap::new(),
        }
    }

    /// Append a node as the last child of `parent`.
    pub fn add_node(&mut self, parent: NodeIndex, node: ReportNode) -> NodeIndex {
        let position = self.child_order.get(&parent).map_or(0, Vec::len);
        self.insert_node(parent, node, position)
    }

    /// Insert a node as child `position` of `parent` (clamped to the end).
    ///
    /// IDs are unique within the report. A node whose ID is already taken is
    /// re-identified with a fresh ID derived from it.
    pub fn insert_node(&mut self, parent: NodeIndex, mut node: ReportNode, position: usize) -> NodeIndex {
        if self.id_index.contains_key(&node.id) {
            let fresh = self.fresh_id(node.id.as_str());
            log::warn!("report: id {:?} already in use, inserting as {fresh:?}", node.id);
            node.id = fresh;
        }
        let id = node.id;
        let idx = self.graph.add_node(node);
        self.graph.add_edge(parent, idx, ());
        self.id_index.insert(id, idx);
        let order = self.child_order.entry(parent).or_default();
        let position = position.min(order.len());
        order.insert(position, idx);
        idx
    }

    /// Remove a node and everything below it, keeping indexes in sync.
    pub fn remove_subtree(&mut self, idx: NodeIndex) {
        if let Some(parent) = self.parent(idx)
            && let Some(order) = self.child_order.get_mut(&parent)
        {
            order.retain(|&c| c != idx);
        }
        let mut stack = vec![idx];
        while let Some(current) = stack.pop() {
            stack.extend(self.children(current));
            self.child_order.remove(&current);
            if let Some(removed) = self.graph.remove_node(current) {
                self.id_index.remove(&removed.id);
            }
        }
    }

    /// Remove every child of `parent` (the parent itself stays).
    pub fn clear_children(&mut self, parent: NodeIndex) {
        for child in self.children(parent) {
            self.remove_subtree(child);
        }
    }

    /// Look up a node by its ID.
    pub fn get_by_id(&self, id: ElementId) -> Option<&ReportNode> {
        self.id_index.get(&id).map(|idx| &self.graph[*idx])
    }

    /// Look up a node mutably by its ID.
    pub fn get_by_id_mut(&mut self, id: ElementId) -> Option<&mut ReportNode> {
        self.id_index
            .get(&id)
            .copied()
            .map(|idx| &mut self.graph[idx])
    }

    /// A prefixed ID (e.g. `note_12`) that no node in this report uses.
    ///
    /// Reports reloaded from a persisted document already carry prefixed
    /// IDs, so the process-wide counter alone is not enough.
    pub fn fresh_id(&self, prefix: &str) -> ElementId {
        loop {
            let id = ElementId::with_prefix(prefix);
            if !self.id_index.contains_key(&id) && !self.id_index.contains_key(&id.duplicate()) {
                return id;
            }
        }
    }

    /// Get the index for an ElementId.
    pub fn index_of(&self, id: ElementId) -> Option<NodeIndex> {
        self.id_index.get(&id).copied()
    }

    pub fn node(&self, idx: NodeIndex) -> Option<&ReportNode> {
        self.graph.node_weight(idx)
    }

    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut ReportNode> {
        self.graph.node_weight_mut(idx)
    }

    /// Get the parent index of a node.
    pub fn parent(&self, idx: NodeIndex) -> Option<NodeIndex> {
        self.graph
            .neighbors_directed(idx, petgraph::Direction::Incoming)
            .next()
    }

    /// Children of a node in document order.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.child_order.get(&idx).cloned().unwrap_or_default()
    }

    /// All nodes below `idx` in document (pre-)order, excluding `idx`.
    pub fn descendants(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeIndex> = self.children(idx).into_iter().rev().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        out
    }

    /// The two page frames in page order.
    pub fn pages(&self) -> Vec<(Page, NodeIndex)> {
        let mut pages: Vec<(Page, NodeIndex)> = self
            .children(self.root)
            .into_iter()
            .filter_map(|idx| match self.graph[idx].kind {
                NodeKind::PageFrame { page } => Some((page, idx)),
                _ => None,
            })
            .collect();
        pages.sort_by_key(|(page, _)| page.number());
        pages
    }

    pub fn page_frame(&self, page: Page) -> Option<NodeIndex> {
        self.pages()
            .into_iter()
            .find_map(|(p, idx)| (p == page).then_some(idx))
    }

    /// The page frame a node lives in.
    pub fn page_of(&self, idx: NodeIndex) -> Option<NodeIndex> {
        let mut current = idx;
        loop {
            if matches!(self.node(current)?.kind, NodeKind::PageFrame { .. }) {
                return Some(current);
            }
            current = self.parent(current)?;
        }
    }

    /// Find a section instance anywhere in the report.
    pub fn section(&self, kind: SectionKind, instance: Instance) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].section() == Some((kind, instance)))
    }

    /// First region with `role`, in document order.
    pub fn region(&self, role: RegionRole) -> Option<NodeIndex> {
        self.descendants(self.root)
            .into_iter()
            .find(|&idx| self.graph[idx].region_role() == Some(role))
    }

    /// The footer mark of a page frame.
    pub fn footer_mark(&self, page_frame: NodeIndex) -> Option<NodeIndex> {
        self.children(page_frame)
            .into_iter()
            .find(|&idx| self.graph[idx].region_role() == Some(RegionRole::FooterMark))
    }

    /// Whether an image sits anywhere inside `idx`.
    pub fn contains_image(&self, idx: NodeIndex) -> bool {
        self.descendants(idx)
            .into_iter()
            .any(|d| matches!(self.graph[d].kind, NodeKind::Image { .. }))
    }

    /// Note rows of a section, in order.
    pub fn note_rows(&self, section: NodeIndex) -> Vec<NodeIndex> {
        self.children(section)
            .into_iter()
            .filter(|&idx| matches!(self.graph[idx].kind, NodeKind::NoteRow { .. }))
            .collect()
    }

    /// Replace the children of `to` with deep copies of the children of
    /// `from`. Copies get `ElementId::duplicate` IDs and drop editing state.
    pub fn copy_children(&mut self, from: NodeIndex, to: NodeIndex) {
        self.clear_children(to);
        for child in self.children(from) {
            self.copy_subtree(child, to);
        }
    }

    fn copy_subtree(&mut self, source: NodeIndex, parent: NodeIndex) {
        let mut copy = self.graph[source].clone();
        if matches!(copy.kind, NodeKind::Affordance(_)) {
            return;
        }
        copy.id = copy.id.duplicate();
        copy.editable = false;
        copy.edit_styles.clear();
        let idx = self.add_node(parent, copy);
        for child in self.children(source) {
            self.copy_subtree(child, idx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (ReportGraph, NodeIndex) {
        let mut graph = ReportGraph::new();
        let root = graph.root;
        let page = graph.add_node(
            root,
            ReportNode::new(ElementId::intern("page_1"), NodeKind::PageFrame { page: Page::First }),
        );
        let notes = graph.add_node(
            page,
            ReportNode::new(
                ElementId::intern("notes"),
                NodeKind::Section {
                    kind: SectionKind::Notes,
                    instance: Instance::Primary,
                },
            ),
        );
        for (i, text) in ["first", "second"].iter().enumerate() {
            graph.add_node(
                notes,
                ReportNode::new(
                    ElementId::intern(&format!("model_note_{i}")),
                    NodeKind::NoteRow {
                        number: i as u32 + 1,
                        markup: text.to_string(),
                    },
                ),
            );
        }
        (graph, notes)
    }

    #[test]
    fn children_keep_insertion_order_after_removal() {
        let (mut graph, notes) = sample();
        let first = graph.note_rows(notes)[0];
        graph.remove_subtree(first);
        let third = graph.add_node(
            notes,
            ReportNode::new(
                ElementId::intern("model_note_2"),
                NodeKind::NoteRow {
                    number: 2,
                    markup: "third".into(),
                },
            ),
        );
        let rows = graph.note_rows(notes);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], third);
        assert!(graph.get_by_id(ElementId::intern("model_note_0")).is_none());
    }

    #[test]
    fn insert_at_position() {
        let (mut graph, notes) = sample();
        let front = graph.insert_node(
            notes,
            ReportNode::new(ElementId::intern("model_front"), NodeKind::Block { markup: "x".into() }),
            0,
        );
        assert_eq!(graph.children(notes)[0], front);
    }

    #[test]
    fn colliding_insert_gets_a_fresh_id() {
        let (mut graph, notes) = sample();
        let taken = ElementId::intern("model_note_0");
        let original = graph.index_of(taken).unwrap();

        let idx = graph.add_node(
            notes,
            ReportNode::new(
                taken,
                NodeKind::NoteRow {
                    number: 3,
                    markup: "third".into(),
                },
            ),
        );

        assert_ne!(graph.graph[idx].id, taken);
        assert_eq!(graph.index_of(taken), Some(original));
        assert_eq!(graph.index_of(graph.graph[idx].id), Some(idx));
        assert_eq!(graph.note_rows(notes).len(), 3);
    }

    #[test]
    fn fresh_id_skips_ids_already_in_the_report() {
        let mut graph = ReportGraph::new();
        let root = graph.root;
        for n in 0..64 {
            for id in [format!("model_fresh_{n}"), format!("model_fresh_{n}__dup")] {
                let block = NodeKind::Block {
                    markup: String::new(),
                };
                graph.add_node(root, ReportNode::new(ElementId::intern(&id), block));
            }
        }
        for _ in 0..8 {
            let id = graph.fresh_id("model_fresh");
            assert!(id.as_str().starts_with("model_fresh_"));
            assert!(graph.index_of(id).is_none());
            assert!(graph.index_of(id.duplicate()).is_none());
            graph.add_node(root, ReportNode::new(id, NodeKind::Block { markup: String::new() }));
        }
    }

    #[test]
    fn page_of_walks_up_to_frame() {
        let (graph, notes) = sample();
        let row = graph.note_rows(notes)[1];
        assert_eq!(graph.page_of(row), graph.page_frame(Page::First));
        assert_eq!(graph.page_of(graph.root), None);
    }

    #[test]
    fn copy_children_uses_duplicate_ids() {
        let (mut graph, notes) = sample();
        let page = graph.page_frame(Page::First).unwrap();
        let dup = graph.add_node(
            page,
            ReportNode::new(
                ElementId::intern("notes__dup"),
                NodeKind::Section {
                    kind: SectionKind::Notes,
                    instance: Instance::Duplicate,
                },
            ),
        );
        graph.copy_children(notes, dup);
        graph.copy_children(notes, dup);

        let copied = graph.note_rows(dup);
        assert_eq!(copied.len(), 2);
        assert_eq!(graph.graph[copied[0]].id.as_str(), "model_note_0__dup");
        assert_eq!(graph.graph[copied[1]].markup(), Some("second"));
    }

    #[test]
    fn visibility_fades_settle() {
        let fade = 300.0;
        let queued = Visibility::Queued {
            at: Timestamp(300.0),
        };
        assert_eq!(queued.settled(), Visibility::Visible);
        assert!(!queued.is_painted());
        assert_eq!(
            queued.advance(Timestamp(350.0), fade),
            Visibility::FadingIn {
                until: Timestamp(600.0)
            }
        );
        assert_eq!(queued.advance(Timestamp(700.0), fade), Visibility::Visible);

        let out = Visibility::FadingOut {
            until: Timestamp(300.0),
        };
        assert!(out.is_painted());
        assert!(!out.flows());
        assert_eq!(out.advance(Timestamp(299.0), fade), out);
        assert_eq!(out.advance(Timestamp(300.0), fade), Visibility::Hidden);
    }
}
