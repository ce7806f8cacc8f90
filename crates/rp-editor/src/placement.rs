//! Page-placement state machine for the movable sections.
//!
//! Each of Notes and Signatures is either `OnPage1` (primary shown,
//! duplicate hidden) or `OnPage2` (the reverse). This is the only place that
//! flips section visibility. Layout controllers never touch the graph
//! themselves; they implement `PlacementDriver` and issue requests through a
//! `Placer`, which re-resolves layout after every applied transition so the
//! next decision in the same batch measures the new arrangement.
//!
//! Rules:
//!
//! - `force_to_page2` is unconditional apart from the transition lock.
//!   Forcing Notes also forces Signatures in the same batch, overriding
//!   Signatures' lock, so "Signatures on page 1 ⇒ Notes on page 1" holds
//!   after every batch.
//! - `try_to_page1` needs the overflow detector to confirm space for the
//!   primary and, for Signatures, Notes to be on page 1.
//! - Every applied transition takes the section's cooldown token; requests
//!   while it is held are dropped.

use crate::sync::ContentSync;
use crate::timing::Cooldown;
use rp_core::layout::ResolvedLayout;
use rp_core::model::*;
use rp_core::{NodeIndex, PageGeometry, TimingConfig, has_space_for, resolve_layout};
use smallvec::SmallVec;

/// Where a movable section is currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placement {
    OnPage1,
    OnPage2,
}

/// Why a move to page 1 was not made.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refusal {
    /// The overflow detector reports no room for the primary.
    NoSpace,
    /// Signatures cannot precede Notes onto page 1.
    NotesOnPage2,
    /// A primary or duplicate section is missing from the report.
    MissingAnchor,
}

/// Placements applied in one batch, in order.
pub type Moves = SmallVec<[(SectionKind, Placement); 2]>;

/// Result of a placement request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    /// Already in the requested placement.
    Unchanged,
    /// Dropped because the section's cooldown token is held.
    Locked,
    Refused(Refusal),
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    placement: Placement,
    lock: Cooldown,
}

/// Placement state for both movable sections.
#[derive(Debug, Clone)]
pub struct PlacementMachine {
    notes: Slot,
    signatures: Slot,
    fade_ms: f64,
}

impl PlacementMachine {
    /// Both sections start on page 1.
    pub fn new(timing: &TimingConfig) -> Self {
        let slot = Slot {
            placement: Placement::OnPage1,
            lock: Cooldown::new(timing.lock_ms),
        };
        Self {
            notes: slot,
            signatures: slot,
            fade_ms: timing.fade_ms,
        }
    }

    /// Infer placement from a loaded report: a section whose primary is
    /// (or is settling to) hidden is on page 2.
    ///
    /// A report saved with Signatures on page 1 but Notes on page 2 is
    /// corrected on the spot by moving Signatures to page 2 without a fade.
    pub fn from_graph(graph: &mut ReportGraph, timing: &TimingConfig) -> Self {
        let mut machine = Self::new(timing);
        for kind in SectionKind::ALL {
            let shown = graph
                .section(kind, Instance::Primary)
                .is_some_and(|idx| graph.graph[idx].visibility.flows());
            if !shown {
                machine.slot_mut(kind).placement = Placement::OnPage2;
            }
        }

        if !machine.invariant_holds() {
            log::warn!("placement: loaded report shows signatures above notes, moving signatures to page 2");
            if let Some((primary, duplicate)) = anchors(graph, SectionKind::Signatures) {
                graph.graph[primary].visibility = Visibility::Hidden;
                graph.graph[duplicate].visibility = Visibility::Visible;
                ContentSync::on_primary_edited(graph, SectionKind::Signatures);
            }
            machine.signatures.placement = Placement::OnPage2;
        }
        machine
    }

    pub fn placement(&self, kind: SectionKind) -> Placement {
        self.slot(kind).placement
    }

    pub fn is_locked(&self, kind: SectionKind, now: Timestamp) -> bool {
        self.slot(kind).lock.is_held(now)
    }

    /// Signatures on page 1 implies Notes on page 1.
    pub fn invariant_holds(&self) -> bool {
        self.signatures.placement == Placement::OnPage2 || self.notes.placement == Placement::OnPage1
    }

    fn slot(&self, kind: SectionKind) -> &Slot {
        match kind {
            SectionKind::Notes => &self.notes,
            SectionKind::Signatures => &self.signatures,
        }
    }

    fn slot_mut(&mut self, kind: SectionKind) -> &mut Slot {
        match kind {
            SectionKind::Notes => &mut self.notes,
            SectionKind::Signatures => &mut self.signatures,
        }
    }

    // ─── Transitions ─────────────────────────────────────────────────────

    /// Move `kind` to page 2: mirror the primary into the duplicate, fade
    /// the primary out, then fade the duplicate in.
    pub fn force_to_page2(&mut self, graph: &mut ReportGraph, kind: SectionKind, now: Timestamp) -> Transition {
        let result = self.move_to_page2(graph, kind, now, false);
        if result == Transition::Applied && kind == SectionKind::Notes {
            let cascade = self.move_to_page2(graph, SectionKind::Signatures, now, true);
            log::trace!("placement: notes forced to page 2, signatures cascade → {cascade:?}");
        }
        debug_assert!(result != Transition::Applied || self.invariant_holds());
        result
    }

    /// Move `kind` back to page 1 if the detector confirms space.
    pub fn try_to_page1(
        &mut self,
        graph: &mut ReportGraph,
        layout: &ResolvedLayout,
        kind: SectionKind,
        now: Timestamp,
    ) -> Transition {
        if self.placement(kind) == Placement::OnPage1 {
            return Transition::Unchanged;
        }
        let Some((primary, duplicate)) = anchors(graph, kind) else {
            log::debug!("placement: {} anchors missing, staying on page 2", kind.as_str());
            return Transition::Refused(Refusal::MissingAnchor);
        };
        if kind == SectionKind::Signatures && self.notes.placement == Placement::OnPage2 {
            log::trace!("placement: signatures held on page 2 while notes is there");
            return Transition::Refused(Refusal::NotesOnPage2);
        }
        if self.is_locked(kind, now) {
            log::trace!("placement: {} locked, dropping move to page 1", kind.as_str());
            return Transition::Locked;
        }
        if !has_space_for(graph, layout, primary) {
            log::trace!("placement: no room for {} on page 1", kind.as_str());
            return Transition::Refused(Refusal::NoSpace);
        }

        let fade_ms = self.fade_ms;
        let slot = self.slot_mut(kind);
        slot.lock.force(now);
        slot.placement = Placement::OnPage1;
        graph.graph[duplicate].visibility = Visibility::FadingOut {
            until: now.after(fade_ms),
        };
        graph.graph[primary].visibility = Visibility::Queued {
            at: now.after(fade_ms),
        };
        log::trace!("placement: {} → page 1", kind.as_str());
        Transition::Applied
    }

    fn move_to_page2(
        &mut self,
        graph: &mut ReportGraph,
        kind: SectionKind,
        now: Timestamp,
        override_lock: bool,
    ) -> Transition {
        if self.placement(kind) == Placement::OnPage2 {
            return Transition::Unchanged;
        }
        let Some((primary, duplicate)) = anchors(graph, kind) else {
            log::debug!("placement: {} anchors missing, cannot move to page 2", kind.as_str());
            return Transition::Refused(Refusal::MissingAnchor);
        };

        let fade_ms = self.fade_ms;
        let slot = self.slot_mut(kind);
        if override_lock {
            slot.lock.force(now);
        } else if !slot.lock.try_acquire(now) {
            log::trace!("placement: {} locked, dropping move to page 2", kind.as_str());
            return Transition::Locked;
        }
        slot.placement = Placement::OnPage2;

        ContentSync::on_primary_edited(graph, kind);
        graph.graph[primary].visibility = Visibility::FadingOut {
            until: now.after(fade_ms),
        };
        graph.graph[duplicate].visibility = Visibility::Queued {
            at: now.after(fade_ms),
        };
        log::trace!("placement: {} → page 2", kind.as_str());
        Transition::Applied
    }

    /// Step in-flight fades of both instances of both sections to `now`.
    /// Returns the nodes whose visibility changed.
    pub fn advance(&self, graph: &mut ReportGraph, now: Timestamp) -> Vec<NodeIndex> {
        let mut changed = Vec::new();
        for kind in SectionKind::ALL {
            for instance in [Instance::Primary, Instance::Duplicate] {
                let Some(idx) = graph.section(kind, instance) else {
                    continue;
                };
                let node = &mut graph.graph[idx];
                let next = node.visibility.advance(now, self.fade_ms);
                if next != node.visibility {
                    node.visibility = next;
                    changed.push(idx);
                }
            }
        }
        changed
    }
}

/// Primary and duplicate of `kind`, if both exist.
fn anchors(graph: &ReportGraph, kind: SectionKind) -> Option<(NodeIndex, NodeIndex)> {
    Some((
        graph.section(kind, Instance::Primary)?,
        graph.section(kind, Instance::Duplicate)?,
    ))
}

// ─── Drivers ─────────────────────────────────────────────────────────────

/// One batch of placement requests against a fixed point in time.
///
/// Holds the layout the requests are judged against and refreshes it after
/// every applied transition.
pub struct Placer<'a> {
    graph: &'a mut ReportGraph,
    machine: &'a mut PlacementMachine,
    geometry: &'a PageGeometry,
    layout: ResolvedLayout,
    now: Timestamp,
    applied: Moves,
}

impl<'a> Placer<'a> {
    pub fn new(
        graph: &'a mut ReportGraph,
        machine: &'a mut PlacementMachine,
        geometry: &'a PageGeometry,
        now: Timestamp,
    ) -> Self {
        let layout = resolve_layout(&*graph, geometry);
        Self {
            graph,
            machine,
            geometry,
            layout,
            now,
            applied: Moves::new(),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.now
    }

    pub fn placement(&self, kind: SectionKind) -> Placement {
        self.machine.placement(kind)
    }

    pub fn layout(&self) -> &ResolvedLayout {
        &self.layout
    }

    /// Whether the primary of `kind` has room where it sits (or would sit).
    pub fn fits(&self, kind: SectionKind) -> bool {
        match self.graph.section(kind, Instance::Primary) {
            Some(primary) => has_space_for(&*self.graph, &self.layout, primary),
            None => false,
        }
    }

    /// Document-relative bottom edge of the primary of `kind`.
    pub fn primary_bottom(&self, kind: SectionKind) -> Option<f32> {
        self.graph
            .section(kind, Instance::Primary)
            .and_then(|idx| self.layout.bottom_of(idx))
    }

    pub fn force_to_page2(&mut self, kind: SectionKind) -> Transition {
        let before = self.placement(SectionKind::Signatures);
        let result = self.machine.force_to_page2(self.graph, kind, self.now);
        if result == Transition::Applied {
            self.applied.push((kind, Placement::OnPage2));
            if kind == SectionKind::Notes && before != self.placement(SectionKind::Signatures) {
                self.applied.push((SectionKind::Signatures, Placement::OnPage2));
            }
            self.relayout();
        }
        result
    }

    pub fn try_to_page1(&mut self, kind: SectionKind) -> Transition {
        let result = self.machine.try_to_page1(self.graph, &self.layout, kind, self.now);
        if result == Transition::Applied {
            self.applied.push((kind, Placement::OnPage1));
            self.relayout();
        }
        result
    }

    fn relayout(&mut self) {
        self.layout = resolve_layout(&*self.graph, self.geometry);
    }

    /// Transitions applied in this batch, in order.
    pub fn applied(&self) -> &[(SectionKind, Placement)] {
        &self.applied
    }

    /// Finish the batch, returning the final layout and applied transitions.
    pub fn finish(self) -> (ResolvedLayout, Moves) {
        (self.layout, self.applied)
    }
}

/// A source of placement requests (content mutations, scrolling).
pub trait PlacementDriver {
    type Event;

    /// React to one event by issuing requests through `placer`.
    fn drive(&mut self, event: Self::Event, placer: &mut Placer<'_>);
}
