//! Scroll-driven layout controller.
//!
//! Compares each primary section's document-relative bottom edge against a
//! fixed threshold as the user scrolls. Scrolling down past the threshold
//! sends a section to page 2; scrolling back up below it asks for page 1,
//! which the overflow detector must still confirm. Notes is checked first;
//! Signatures only while Notes is on page 1.

use crate::placement::{Placement, PlacementDriver, Placer, Transition};
use crate::timing::FrameThrottle;
use rp_core::{LayoutThresholds, SectionKind, Timestamp, TimingConfig};

/// Direction of the last scroll movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Places sections from viewport scroll position.
#[derive(Debug, Clone)]
pub struct ScrollController {
    thresholds: LayoutThresholds,
    throttle: FrameThrottle,
    last_offset: Option<f32>,
}

impl ScrollController {
    pub fn new(thresholds: LayoutThresholds, timing: &TimingConfig) -> Self {
        Self {
            thresholds,
            throttle: FrameThrottle::new(timing.frame_interval_ms),
            last_offset: None,
        }
    }

    fn threshold(&self, kind: SectionKind) -> f32 {
        match kind {
            SectionKind::Notes => self.thresholds.notes,
            SectionKind::Signatures => self.thresholds.section,
        }
    }

    /// Gate a raw scroll event. Returns the direction to evaluate, or `None`
    /// when the event falls inside the current frame or did not move.
    /// Callers resolve layout only for accepted events.
    pub fn accept(&mut self, offset: f32, now: Timestamp) -> Option<ScrollDirection> {
        if !self.throttle.allow(now) {
            return None;
        }
        self.direction(offset)
    }

    /// Record `offset` and return the direction moved since the last
    /// accepted event. The first event and zero deltas have no direction.
    fn direction(&mut self, offset: f32) -> Option<ScrollDirection> {
        let previous = self.last_offset.replace(offset)?;
        let delta = offset - previous;
        if delta > 0.0 {
            Some(ScrollDirection::Down)
        } else if delta < 0.0 {
            Some(ScrollDirection::Up)
        } else {
            None
        }
    }

    fn evaluate(&self, kind: SectionKind, direction: ScrollDirection, placer: &mut Placer<'_>) -> Transition {
        let Some(bottom) = placer.primary_bottom(kind) else {
            log::debug!("scroll: {} has no measured bottom", kind.as_str());
            return Transition::Unchanged;
        };
        let threshold = self.threshold(kind);
        match direction {
            ScrollDirection::Down => {
                if bottom > threshold || !placer.fits(kind) {
                    placer.force_to_page2(kind)
                } else {
                    Transition::Unchanged
                }
            }
            ScrollDirection::Up => {
                if bottom <= threshold && placer.placement(kind) == Placement::OnPage2 {
                    placer.try_to_page1(kind)
                } else {
                    Transition::Unchanged
                }
            }
        }
    }
}

impl PlacementDriver for ScrollController {
    /// An event already let through by [`ScrollController::accept`].
    type Event = ScrollDirection;

    fn drive(&mut self, direction: ScrollDirection, placer: &mut Placer<'_>) {
        let notes = self.evaluate(SectionKind::Notes, direction, placer);
        if notes != Transition::Unchanged {
            log::trace!("scroll: {direction:?} notes → {notes:?}");
        }
        if placer.placement(SectionKind::Notes) == Placement::OnPage1 {
            let signatures = self.evaluate(SectionKind::Signatures, direction, placer);
            if signatures != Transition::Unchanged {
                log::trace!("scroll: {direction:?} signatures → {signatures:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_follows_offset_delta() {
        let mut scroll = ScrollController::new(LayoutThresholds::default(), &TimingConfig::default());
        assert_eq!(scroll.direction(100.0), None);
        assert_eq!(scroll.direction(180.0), Some(ScrollDirection::Down));
        assert_eq!(scroll.direction(180.0), None);
        assert_eq!(scroll.direction(40.0), Some(ScrollDirection::Up));
    }

    #[test]
    fn accept_drops_events_inside_a_frame() {
        let mut scroll = ScrollController::new(LayoutThresholds::default(), &TimingConfig::default());
        assert_eq!(scroll.accept(0.0, Timestamp(1000.0)), None);
        assert_eq!(scroll.accept(250.0, Timestamp(1005.0)), None);
        assert_eq!(scroll.accept(250.0, Timestamp(1100.0)), Some(ScrollDirection::Down));
        assert_eq!(scroll.accept(250.0, Timestamp(1200.0)), None);
        assert_eq!(scroll.accept(100.0, Timestamp(1300.0)), Some(ScrollDirection::Up));
    }

    #[test]
    fn notes_uses_the_lower_threshold() {
        let scroll = ScrollController::new(LayoutThresholds::default(), &TimingConfig::default());
        assert_eq!(scroll.threshold(SectionKind::Notes), 1000.0);
        assert_eq!(scroll.threshold(SectionKind::Signatures), 1040.0);
    }
}
