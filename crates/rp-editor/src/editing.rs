//! Editing mode: in-place editing affordances and content edits.
//!
//! Enabling the mode opens whitelisted text regions and the primary note
//! rows for direct editing, puts replace/remove controls on images, and
//! appends an "add note" control to the primary Notes section. Disabling
//! reverses every one of those changes, so a report frozen afterwards
//! carries no trace of the editing session.
//!
//! Edits arrive as `ReportEdit` values. Markup is sanitized with `ammonia`
//! before it enters the graph. Edits aimed at missing or non-editable
//! targets are ignored; the outcome tells the caller which primary section
//! (if any) needs mirroring into its duplicate.

use crate::timing::Debouncer;
use rp_core::id::ElementId;
use rp_core::model::*;
use rp_core::{NodeIndex, TimingConfig};

/// Inline styles marking an element as editable.
const EDIT_STYLES: [(&str, &str); 2] = [("outline", "1px dashed #9ab"), ("cursor", "text")];

/// A content edit made while editing mode is on.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportEdit {
    /// Replace the markup of an editable region.
    SetRegionMarkup { id: ElementId, markup: String },
    /// Replace the markup of a primary note row.
    SetNoteMarkup { id: ElementId, markup: String },
    /// Insert a note row after `after`, or at the end.
    AddNote {
        after: Option<ElementId>,
        markup: String,
    },
    /// Delete a primary note row (context action).
    DeleteNote { id: ElementId },
    ReplaceImage { id: ElementId, src: String, alt: String },
    /// Remove an image. Only honored once the user has confirmed.
    RemoveImage { id: ElementId, confirmed: bool },
}

/// What an edit did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Content changed. `section` names the primary section touched.
    Applied { section: Option<SectionKind> },
    /// Nothing changed.
    Ignored,
}

/// State of the editing mode.
#[derive(Debug, Clone)]
pub struct EditSession {
    enabled: bool,
    autosave: Debouncer,
}

impl EditSession {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            enabled: false,
            autosave: Debouncer::new(timing.autosave_quiet_ms),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    // ─── Mode toggling ───────────────────────────────────────────────────

    /// Turn editing mode on. Idempotent.
    pub fn enable(&mut self, graph: &mut ReportGraph) {
        if self.enabled {
            return;
        }
        self.enabled = true;

        for idx in graph.descendants(graph.root) {
            let node = &graph.graph[idx];
            let open = match &node.kind {
                NodeKind::Region { role, .. } => role.is_editable_field() && !graph.contains_image(idx),
                NodeKind::NoteRow { .. } => in_primary_section(graph, idx),
                _ => false,
            };
            if open {
                mark_editable(&mut graph.graph[idx]);
            }
        }

        let images: Vec<NodeIndex> = graph
            .descendants(graph.root)
            .into_iter()
            .filter(|&idx| matches!(graph.graph[idx].kind, NodeKind::Image { .. }))
            .filter(|&idx| !in_duplicate_section(graph, idx))
            .collect();
        for image in images {
            add_affordance(graph, image, AffordanceKind::ImageControls, "controls");
        }
        if let Some(notes) = graph.section(SectionKind::Notes, Instance::Primary) {
            add_affordance(graph, notes, AffordanceKind::AddNote, "add");
        }
        log::debug!("editing: enabled");
    }

    /// Turn editing mode off, removing every editing-only change. A pending
    /// autosave is kept.
    pub fn disable(&mut self, graph: &mut ReportGraph) {
        if !self.enabled {
            return;
        }
        self.enabled = false;

        let mut affordances = Vec::new();
        for idx in graph.descendants(graph.root) {
            let node = &mut graph.graph[idx];
            node.editable = false;
            node.edit_styles.clear();
            if matches!(node.kind, NodeKind::Affordance(_)) {
                affordances.push(idx);
            }
        }
        for idx in affordances {
            graph.remove_subtree(idx);
        }
        log::debug!("editing: disabled");
    }

    // ─── Edits ───────────────────────────────────────────────────────────

    /// Apply one edit. Applied edits re-arm the autosave debouncer.
    pub fn apply(&mut self, graph: &mut ReportGraph, edit: ReportEdit, now: Timestamp) -> EditOutcome {
        if !self.enabled {
            log::debug!("editing: ignoring {edit:?}, editing mode is off");
            return EditOutcome::Ignored;
        }
        let outcome = match edit {
            ReportEdit::SetRegionMarkup { id, markup } => set_region_markup(graph, id, &markup),
            ReportEdit::SetNoteMarkup { id, markup } => set_note_markup(graph, id, &markup),
            ReportEdit::AddNote { after, markup } => add_note(graph, after, &markup),
            ReportEdit::DeleteNote { id } => delete_note(graph, id),
            ReportEdit::ReplaceImage { id, src, alt } => replace_image(graph, id, src, alt),
            ReportEdit::RemoveImage { id, confirmed } => remove_image(graph, id, confirmed),
        };
        if outcome != EditOutcome::Ignored {
            self.autosave.arm(now);
        }
        outcome
    }

    /// Whether the autosave quiet period has just elapsed.
    pub fn autosave_due(&mut self, now: Timestamp) -> bool {
        self.autosave.fire_if_due(now)
    }

    pub fn autosave_pending(&self) -> bool {
        self.autosave.is_pending()
    }

    pub fn cancel_autosave(&mut self) {
        self.autosave.cancel();
    }
}

/// Sanitize user-entered markup before it enters the report.
pub fn sanitize(markup: &str) -> String {
    ammonia::clean(markup)
}

fn mark_editable(node: &mut ReportNode) {
    node.editable = true;
    node.edit_styles.clear();
    for (property, value) in EDIT_STYLES {
        node.edit_styles.push(StyleDecl::new(property, value));
    }
}

/// Append an affordance to `parent` unless it already carries one.
fn add_affordance(graph: &mut ReportGraph, parent: NodeIndex, kind: AffordanceKind, suffix: &str) {
    let present = graph
        .children(parent)
        .into_iter()
        .any(|c| graph.graph[c].kind == NodeKind::Affordance(kind));
    if present {
        return;
    }
    let id = ElementId::intern(&format!("{}__{suffix}", graph.graph[parent].id));
    graph.add_node(parent, ReportNode::new(id, NodeKind::Affordance(kind)));
}

/// The section a node sits in, if any.
fn enclosing_section(graph: &ReportGraph, idx: NodeIndex) -> Option<(NodeIndex, SectionKind, Instance)> {
    let mut current = graph.parent(idx)?;
    loop {
        if let Some((kind, instance)) = graph.graph[current].section() {
            return Some((current, kind, instance));
        }
        current = graph.parent(current)?;
    }
}

fn in_primary_section(graph: &ReportGraph, idx: NodeIndex) -> bool {
    matches!(enclosing_section(graph, idx), Some((_, _, Instance::Primary)))
}

fn in_duplicate_section(graph: &ReportGraph, idx: NodeIndex) -> bool {
    matches!(enclosing_section(graph, idx), Some((_, _, Instance::Duplicate)))
}

/// The primary section touched by a change at `idx`, dropping any stale
/// measurement of it.
fn touched_section(graph: &mut ReportGraph, idx: NodeIndex) -> Option<SectionKind> {
    match enclosing_section(graph, idx) {
        Some((section, kind, Instance::Primary)) => {
            graph.graph[section].measured_height = None;
            Some(kind)
        }
        _ => None,
    }
}

fn ignored(reason: &str, id: ElementId) -> EditOutcome {
    log::debug!("editing: ignoring edit of {id:?}: {reason}");
    EditOutcome::Ignored
}

fn set_region_markup(graph: &mut ReportGraph, id: ElementId, markup: &str) -> EditOutcome {
    let Some(idx) = graph.index_of(id) else {
        return ignored("no such element", id);
    };
    let node = &mut graph.graph[idx];
    if !node.editable || node.region_role().is_none() {
        return ignored("not an editable region", id);
    }
    if let Some(slot) = node.markup_mut() {
        *slot = sanitize(markup);
    }
    node.measured_height = None;
    EditOutcome::Applied { section: None }
}

fn set_note_markup(graph: &mut ReportGraph, id: ElementId, markup: &str) -> EditOutcome {
    let Some(idx) = graph.index_of(id) else {
        return ignored("no such element", id);
    };
    let node = &mut graph.graph[idx];
    if !node.editable || !matches!(node.kind, NodeKind::NoteRow { .. }) {
        return ignored("not an editable note", id);
    }
    if let Some(slot) = node.markup_mut() {
        *slot = sanitize(markup);
    }
    node.measured_height = None;
    EditOutcome::Applied {
        section: touched_section(graph, idx),
    }
}

fn add_note(graph: &mut ReportGraph, after: Option<ElementId>, markup: &str) -> EditOutcome {
    let Some(notes) = graph.section(SectionKind::Notes, Instance::Primary) else {
        log::debug!("editing: ignoring new note, report has no notes section");
        return EditOutcome::Ignored;
    };
    let rows = graph.note_rows(notes);
    let children = graph.children(notes);

    let anchor = match after {
        Some(id) => match graph.index_of(id).filter(|idx| rows.contains(idx)) {
            Some(row) => Some(row),
            None => return ignored("not a note of the primary section", id),
        },
        None => rows.last().copied(),
    };
    let position = anchor
        .and_then(|row| children.iter().position(|&c| c == row))
        .map_or(0, |p| p + 1);

    let mut row = ReportNode::new(
        graph.fresh_id("note"),
        NodeKind::NoteRow {
            number: 0,
            markup: sanitize(markup),
        },
    );
    mark_editable(&mut row);
    graph.insert_node(notes, row, position);
    renumber(graph, notes);
    graph.graph[notes].measured_height = None;
    EditOutcome::Applied {
        section: Some(SectionKind::Notes),
    }
}

fn delete_note(graph: &mut ReportGraph, id: ElementId) -> EditOutcome {
    let Some(idx) = graph.index_of(id) else {
        return ignored("no such element", id);
    };
    let Some((section, SectionKind::Notes, Instance::Primary)) = enclosing_section(graph, idx) else {
        return ignored("not a note of the primary section", id);
    };
    if !matches!(graph.graph[idx].kind, NodeKind::NoteRow { .. }) {
        return ignored("not a note row", id);
    }
    graph.remove_subtree(idx);
    renumber(graph, section);
    graph.graph[section].measured_height = None;
    EditOutcome::Applied {
        section: Some(SectionKind::Notes),
    }
}

fn replace_image(graph: &mut ReportGraph, id: ElementId, src: String, alt: String) -> EditOutcome {
    let Some(idx) = graph.index_of(id) else {
        return ignored("no such element", id);
    };
    if in_duplicate_section(graph, idx) {
        return ignored("image belongs to a duplicate section", id);
    }
    let NodeKind::Image {
        src: old_src,
        alt: old_alt,
    } = &mut graph.graph[idx].kind
    else {
        return ignored("not an image", id);
    };
    *old_src = src;
    *old_alt = alt;
    EditOutcome::Applied {
        section: touched_section(graph, idx),
    }
}

fn remove_image(graph: &mut ReportGraph, id: ElementId, confirmed: bool) -> EditOutcome {
    let Some(idx) = graph.index_of(id) else {
        return ignored("no such element", id);
    };
    if !matches!(graph.graph[idx].kind, NodeKind::Image { .. }) {
        return ignored("not an image", id);
    }
    if in_duplicate_section(graph, idx) {
        return ignored("image belongs to a duplicate section", id);
    }
    if !confirmed {
        return ignored("removal not confirmed", id);
    }
    let section = touched_section(graph, idx);
    if let Some(parent) = graph.parent(idx) {
        graph.graph[parent].measured_height = None;
    }
    graph.remove_subtree(idx);
    EditOutcome::Applied { section }
}

/// Number the note rows of `section` 1..n in order.
fn renumber(graph: &mut ReportGraph, section: NodeIndex) {
    for (i, row) in graph.note_rows(section).into_iter().enumerate() {
        if let NodeKind::NoteRow { number, .. } = &mut graph.graph[row].kind {
            *number = i as u32 + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rp_core::ReportBuilder;
    use rp_core::builder::{ImageInput, RegionInput};

    fn report() -> ReportGraph {
        ReportBuilder::new()
            .region(Page::First, RegionRole::Title, "Tensile test")
            .region(Page::First, RegionRole::Header, "Laboratory")
            .region_input(RegionInput {
                page: 1,
                role: RegionRole::Company,
                markup: "ACME".into(),
                id: Some("ed_company".into()),
                height: None,
                images: vec![ImageInput {
                    id: Some("ed_company_logo".into()),
                    src: "acme.png".into(),
                    alt: "ACME".into(),
                }],
            })
            .note("One")
            .note("Two")
            .footer("QF-12")
            .build()
    }

    fn session() -> EditSession {
        EditSession::new(&TimingConfig::default())
    }

    #[test]
    fn enable_opens_whitelisted_fields_only() {
        let mut graph = report();
        let mut session = session();
        session.enable(&mut graph);

        let title = graph.region(RegionRole::Title).unwrap();
        let header = graph.region(RegionRole::Header).unwrap();
        let company = graph.region(RegionRole::Company).unwrap();
        assert!(graph.graph[title].editable);
        assert_eq!(graph.graph[title].edit_styles.len(), 2);
        assert!(!graph.graph[header].editable);
        // Contains an image.
        assert!(!graph.graph[company].editable);

        let primary = graph.section(SectionKind::Notes, Instance::Primary).unwrap();
        let duplicate = graph.section(SectionKind::Notes, Instance::Duplicate).unwrap();
        assert!(graph.note_rows(primary).iter().all(|&r| graph.graph[r].editable));
        assert!(graph.note_rows(duplicate).iter().all(|&r| !graph.graph[r].editable));

        let add = *graph.children(primary).last().unwrap();
        assert_eq!(graph.graph[add].kind, NodeKind::Affordance(AffordanceKind::AddNote));
        let logo = graph.index_of(ElementId::intern("ed_company_logo")).unwrap();
        assert_eq!(graph.children(logo).len(), 1);
    }

    #[test]
    fn disable_reverses_enable() {
        let mut graph = report();
        let before = graph.graph.node_count();
        let mut session = session();
        session.enable(&mut graph);
        session.disable(&mut graph);

        assert_eq!(graph.graph.node_count(), before);
        for idx in graph.graph.node_indices() {
            assert!(!graph.graph[idx].editable);
            assert!(graph.graph[idx].edit_styles.is_empty());
        }
    }

    #[test]
    fn add_and_delete_renumber_notes() {
        let mut graph = report();
        let mut session = session();
        session.enable(&mut graph);
        let notes = graph.section(SectionKind::Notes, Instance::Primary).unwrap();
        let first = graph.graph[graph.note_rows(notes)[0]].id;

        let outcome = session.apply(
            &mut graph,
            ReportEdit::AddNote {
                after: Some(first),
                markup: "Inserted".into(),
            },
            Timestamp(0.0),
        );
        assert_eq!(
            outcome,
            EditOutcome::Applied {
                section: Some(SectionKind::Notes)
            }
        );
        let rows: Vec<_> = graph
            .note_rows(notes)
            .into_iter()
            .map(|r| graph.graph[r].kind.clone())
            .collect();
        assert_eq!(
            rows,
            vec![
                NodeKind::NoteRow { number: 1, markup: "One".into() },
                NodeKind::NoteRow { number: 2, markup: "Inserted".into() },
                NodeKind::NoteRow { number: 3, markup: "Two".into() },
            ]
        );

        session.apply(&mut graph, ReportEdit::DeleteNote { id: first }, Timestamp(10.0));
        let numbers: Vec<_> = graph
            .note_rows(notes)
            .into_iter()
            .map(|r| match &graph.graph[r].kind {
                NodeKind::NoteRow { number, markup } => (*number, markup.clone()),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(numbers, vec![(1, "Inserted".to_string()), (2, "Two".to_string())]);
        // The add-note control stays last.
        let last = *graph.children(notes).last().unwrap();
        assert!(matches!(graph.graph[last].kind, NodeKind::Affordance(_)));
    }

    #[test]
    fn markup_is_sanitized() {
        let mut graph = report();
        let mut session = session();
        session.enable(&mut graph);
        let title = graph.region(RegionRole::Title).unwrap();
        let id = graph.graph[title].id;

        session.apply(
            &mut graph,
            ReportEdit::SetRegionMarkup {
                id,
                markup: "Tensile <b>test</b><script>alert(1)</script>".into(),
            },
            Timestamp(0.0),
        );
        assert_eq!(graph.graph[title].markup(), Some("Tensile <b>test</b>"));
    }

    #[test]
    fn non_editable_and_missing_targets_are_ignored() {
        let mut graph = report();
        let mut session = session();
        let header = graph.graph[graph.region(RegionRole::Header).unwrap()].id;

        let edit = ReportEdit::SetRegionMarkup {
            id: header,
            markup: "x".into(),
        };
        // Editing mode off.
        assert_eq!(session.apply(&mut graph, edit.clone(), Timestamp(0.0)), EditOutcome::Ignored);
        session.enable(&mut graph);
        assert_eq!(session.apply(&mut graph, edit, Timestamp(0.0)), EditOutcome::Ignored);
        assert_eq!(
            session.apply(
                &mut graph,
                ReportEdit::DeleteNote {
                    id: ElementId::intern("ed_missing")
                },
                Timestamp(0.0)
            ),
            EditOutcome::Ignored
        );
        assert!(!session.autosave_pending());
    }

    #[test]
    fn image_removal_needs_confirmation() {
        let mut graph = report();
        let mut session = session();
        session.enable(&mut graph);
        let id = ElementId::intern("ed_company_logo");

        let unconfirmed = ReportEdit::RemoveImage { id, confirmed: false };
        assert_eq!(session.apply(&mut graph, unconfirmed, Timestamp(0.0)), EditOutcome::Ignored);
        assert!(graph.index_of(id).is_some());

        let confirmed = ReportEdit::RemoveImage { id, confirmed: true };
        assert_eq!(
            session.apply(&mut graph, confirmed, Timestamp(0.0)),
            EditOutcome::Applied { section: None }
        );
        assert!(graph.index_of(id).is_none());
        assert!(graph.index_of(ElementId::intern("ed_company_logo__controls")).is_none());
    }

    #[test]
    fn autosave_fires_after_quiet_period() {
        let mut graph = report();
        let mut session = session();
        session.enable(&mut graph);
        let title = graph.graph[graph.region(RegionRole::Title).unwrap()].id;

        for (t, text) in [(0.0, "a"), (1500.0, "ab")] {
            session.apply(
                &mut graph,
                ReportEdit::SetRegionMarkup {
                    id: title,
                    markup: text.into(),
                },
                Timestamp(t),
            );
        }
        assert!(!session.autosave_due(Timestamp(2000.0)));
        assert!(session.autosave_due(Timestamp(3500.0)));
        assert!(!session.autosave_due(Timestamp(3600.0)));
    }
}
