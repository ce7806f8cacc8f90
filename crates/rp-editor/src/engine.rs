//! Report engine: the single owner of report state.
//!
//! `ReportEngine` holds the report graph, its resolved layout, the placement
//! state machine, both layout controllers, and the editing session. The
//! rendering adapter feeds it events (mount, resize, scroll, edits, clock
//! ticks) with the current `Timestamp` and reflects the graph afterwards.

use crate::editing::{EditOutcome, EditSession, ReportEdit};
use crate::mutation::{LayoutTrigger, MutationController};
use crate::persist::{DraftStore, PersistError, ReportStore, check_size};
use crate::placement::{Moves, Placement, PlacementDriver, PlacementMachine, Placer};
use crate::scroll::ScrollController;
use crate::sync::ContentSync;
use rp_core::emitter;
use rp_core::id::ElementId;
use rp_core::layout::ResolvedLayout;
use rp_core::model::*;
use rp_core::parser::parse_report;
use rp_core::styles::StyleSheet;
use rp_core::{NodeIndex, ReportConfig};

pub struct ReportEngine {
    /// The report (single source of truth).
    pub graph: ReportGraph,

    /// Layout as of the last pass.
    pub layout: ResolvedLayout,

    config: ReportConfig,
    machine: PlacementMachine,
    mutation: MutationController,
    scroll: ScrollController,
    session: EditSession,
    sheets: Vec<StyleSheet>,
    show_logo: bool,
}

impl ReportEngine {
    /// Take ownership of an assembled report and run the initial layout pass.
    pub fn mount(mut graph: ReportGraph, config: ReportConfig, now: Timestamp) -> Self {
        let machine = PlacementMachine::from_graph(&mut graph, &config.timing);
        let show_logo = graph
            .region(RegionRole::Logo)
            .is_none_or(|idx| graph.graph[idx].visibility.flows());

        let mut engine = Self {
            graph,
            layout: ResolvedLayout::default(),
            scroll: ScrollController::new(config.thresholds, &config.timing),
            session: EditSession::new(&config.timing),
            mutation: MutationController::new(),
            machine,
            config,
            sheets: vec![StyleSheet::builtin()],
            show_logo,
        };
        engine.run_pass(LayoutTrigger::Mount, now);
        engine
    }

    /// Reload a persisted document. Placement is inferred from which
    /// section instances the document shows.
    pub fn from_persisted(html: &str, config: ReportConfig, now: Timestamp) -> Result<Self, String> {
        let graph = parse_report(html)?;
        Ok(Self::mount(graph, config, now))
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    pub fn placement(&self, kind: SectionKind) -> Placement {
        self.machine.placement(kind)
    }

    pub fn invariant_holds(&self) -> bool {
        self.machine.invariant_holds()
    }

    pub fn is_editing(&self) -> bool {
        self.session.is_enabled()
    }

    pub fn show_logo(&self) -> bool {
        self.show_logo
    }

    /// Replace the style sheets inlined on serialization.
    pub fn set_style_sheets(&mut self, sheets: Vec<StyleSheet>) {
        self.sheets = sheets;
    }

    // ─── Layout triggers ─────────────────────────────────────────────────

    /// Record the rendered height of an element. Takes effect on the next
    /// layout pass. Returns `false` for unknown ids.
    pub fn set_measured_height(&mut self, id: ElementId, height: f32) -> bool {
        match self.graph.get_by_id_mut(id) {
            Some(node) => {
                node.measured_height = Some(height);
                true
            }
            None => {
                log::debug!("engine: no element {id:?} to measure");
                false
            }
        }
    }

    pub fn on_resize(&mut self, now: Timestamp) -> Moves {
        self.run_pass(LayoutTrigger::Resize, now)
    }

    /// Re-run placement after content outside the editing session changed
    /// (e.g. a table re-rendered with new data).
    pub fn on_content_changed(&mut self, section: Option<SectionKind>, now: Timestamp) -> Moves {
        self.run_pass(LayoutTrigger::ContentChanged(section), now)
    }

    /// Throttled and direction-less events return before any layout work.
    pub fn on_scroll(&mut self, offset: f32, now: Timestamp) -> Moves {
        let Some(direction) = self.scroll.accept(offset, now) else {
            return Moves::new();
        };
        let mut placer = Placer::new(&mut self.graph, &mut self.machine, &self.config.geometry, now);
        self.scroll.drive(direction, &mut placer);
        let (layout, moves) = placer.finish();
        self.layout = layout;
        moves
    }

    fn run_pass(&mut self, trigger: LayoutTrigger, now: Timestamp) -> Moves {
        let mut placer = Placer::new(&mut self.graph, &mut self.machine, &self.config.geometry, now);
        self.mutation.drive(trigger, &mut placer);
        let (layout, moves) = placer.finish();
        self.layout = layout;
        moves
    }

    /// Complete fades that are due. Returns the sections whose visibility
    /// changed.
    pub fn advance(&mut self, now: Timestamp) -> Vec<ElementId> {
        self.machine
            .advance(&mut self.graph, now)
            .into_iter()
            .map(|idx: NodeIndex| self.graph.graph[idx].id)
            .collect()
    }

    // ─── Editing ─────────────────────────────────────────────────────────

    pub fn set_editing(&mut self, enabled: bool) {
        if enabled {
            self.session.enable(&mut self.graph);
        } else {
            self.session.disable(&mut self.graph);
        }
    }

    /// Apply an edit, mirror it into the duplicate section, and re-run
    /// placement.
    pub fn apply_edit(&mut self, edit: ReportEdit, now: Timestamp) -> EditOutcome {
        let outcome = self.session.apply(&mut self.graph, edit, now);
        if let EditOutcome::Applied { section } = outcome {
            if let Some(kind) = section {
                ContentSync::on_primary_edited(&mut self.graph, kind);
            }
            self.run_pass(LayoutTrigger::ContentChanged(section), now);
        }
        outcome
    }

    /// Hand a draft to `drafts` if the autosave quiet period has elapsed.
    /// Returns whether a draft was written.
    pub fn autosave(&mut self, drafts: &mut dyn DraftStore, now: Timestamp) -> bool {
        if !self.session.autosave_due(now) {
            return false;
        }
        match drafts.save_draft(&self.serialize()) {
            Ok(()) => true,
            Err(reason) => {
                log::warn!("engine: draft not saved: {reason}");
                false
            }
        }
    }

    /// Leave editing mode and submit the report. On failure editing mode is
    /// turned back on so nothing is lost.
    pub fn finish_editing(&mut self, store: &mut dyn ReportStore) -> Result<(), PersistError> {
        let was_editing = self.session.is_enabled();
        self.session.disable(&mut self.graph);
        match self.persist(store) {
            Ok(()) => {
                self.session.cancel_autosave();
                Ok(())
            }
            Err(err) => {
                if was_editing {
                    self.session.enable(&mut self.graph);
                }
                Err(err)
            }
        }
    }

    /// Toggle the optional logo mark, in the live view and in output.
    pub fn set_show_logo(&mut self, show: bool, now: Timestamp) -> Moves {
        self.show_logo = show;
        let logos: Vec<NodeIndex> = self
            .graph
            .descendants(self.graph.root)
            .into_iter()
            .filter(|&idx| self.graph.graph[idx].region_role() == Some(RegionRole::Logo))
            .collect();
        for idx in logos {
            self.graph.graph[idx].visibility = if show {
                Visibility::Visible
            } else {
                Visibility::Hidden
            };
        }
        self.run_pass(LayoutTrigger::ContentChanged(None), now)
    }

    // ─── Output ──────────────────────────────────────────────────────────

    /// Frozen, standalone document for persistence.
    pub fn serialize(&self) -> String {
        emitter::freeze_document(&self.graph, &self.sheets, self.show_logo)
    }

    /// Frozen document with page-break rules, for the print surface.
    pub fn print_document(&self) -> String {
        emitter::print_document(&self.graph, &self.sheets, self.show_logo)
    }

    /// Serialize and submit. Oversized documents are refused before
    /// reaching the store.
    pub fn persist(&self, store: &mut dyn ReportStore) -> Result<(), PersistError> {
        let document = self.serialize();
        check_size(&document, self.config.max_document_bytes).inspect_err(|err| {
            log::warn!("engine: {err}");
        })?;
        store.submit(&document).map_err(|reason| {
            log::warn!("engine: store rejected report: {reason}");
            PersistError::Rejected(reason)
        })
    }
}
