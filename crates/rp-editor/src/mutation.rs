//! Mutation-driven layout controller.
//!
//! Runs on initial mount, on viewport resize, and after content edits. It
//! decides placement by direct measurement:
//!
//! 1. Notes does not fit ⇒ force Notes (and with it Signatures) to page 2.
//! 2. Otherwise bring Notes back to page 1 if it is on page 2.
//! 3. If Notes is on page 1, Signatures fits ⇒ page 1, else ⇒ page 2.

use crate::placement::{Placement, PlacementDriver, Placer, Transition};
use rp_core::SectionKind;

/// What caused a layout pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayoutTrigger {
    Mount,
    Resize,
    /// Content of a section (or of the immovable regions, `None`) changed.
    ContentChanged(Option<SectionKind>),
}

/// Places sections by measuring them after every content or size change.
#[derive(Debug, Clone, Default)]
pub struct MutationController {
    passes: u64,
}

impl MutationController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of layout passes run so far.
    pub fn passes(&self) -> u64 {
        self.passes
    }
}

impl PlacementDriver for MutationController {
    type Event = LayoutTrigger;

    fn drive(&mut self, trigger: LayoutTrigger, placer: &mut Placer<'_>) {
        self.passes += 1;
        log::trace!("mutation: pass {} on {trigger:?}", self.passes);

        if !placer.fits(SectionKind::Notes) {
            let result = placer.force_to_page2(SectionKind::Notes);
            log::trace!("mutation: notes does not fit → {result:?}");
            return;
        }

        if placer.placement(SectionKind::Notes) == Placement::OnPage2 {
            let result = placer.try_to_page1(SectionKind::Notes);
            log::trace!("mutation: notes has room again → {result:?}");
        }

        if placer.placement(SectionKind::Notes) == Placement::OnPage1 {
            let result = if placer.fits(SectionKind::Signatures) {
                placer.try_to_page1(SectionKind::Signatures)
            } else {
                placer.force_to_page2(SectionKind::Signatures)
            };
            if result != Transition::Unchanged {
                log::trace!("mutation: signatures → {result:?}");
            }
        }
    }
}
