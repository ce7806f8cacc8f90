//! Engine configuration: page geometry, placement thresholds, timings.
//!
//! Every struct deserializes with `#[serde(default)]`, so a host can pass a
//! partial JSON object and keep the defaults for the rest.

use serde::{Deserialize, Serialize};

/// Bottom-edge safety margin inside the content frame, in px.
pub const SAFETY_BUFFER: f32 = 20.0;

/// Size and spacing of the two print pages, in CSS px at 96 dpi.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    /// Inset of the content frame from every page edge.
    pub padding: f32,
    /// Vertical space between stacked flow items.
    pub gap: f32,
    /// Space between page 1 and page 2 in the stacked viewer.
    pub page_gap: f32,
    /// Inner padding of a section around its rows.
    pub section_padding: f32,
    /// Estimation metrics for content the adapter has not measured.
    pub line_height: f32,
    pub chars_per_line: usize,
    pub image_height: f32,
}

impl Default for PageGeometry {
    /// A4 portrait.
    fn default() -> Self {
        Self {
            width: 794.0,
            height: 1123.0,
            padding: 40.0,
            gap: 8.0,
            page_gap: 24.0,
            section_padding: 6.0,
            line_height: 18.0,
            chars_per_line: 95,
            image_height: 64.0,
        }
    }
}

/// Document-relative bottom-edge thresholds used by the scroll-driven
/// controller. Notes is checked against the lower value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutThresholds {
    pub section: f32,
    pub notes: f32,
}

impl Default for LayoutThresholds {
    fn default() -> Self {
        Self {
            section: 1040.0,
            notes: 1000.0,
        }
    }
}

/// Durations, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Length of each fade when a section swaps pages.
    pub fade_ms: f64,
    /// Minimum dwell between two transitions of the same section.
    pub lock_ms: f64,
    /// Quiet period before an autosave fires.
    pub autosave_quiet_ms: f64,
    /// Scroll handler rate limit (one display frame).
    pub frame_interval_ms: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            fade_ms: 300.0,
            lock_ms: 500.0,
            autosave_quiet_ms: 2000.0,
            frame_interval_ms: 1000.0 / 60.0,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub geometry: PageGeometry,
    pub thresholds: LayoutThresholds,
    pub timing: TimingConfig,
    /// Largest serialized document accepted for persistence, in bytes.
    pub max_document_bytes: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            geometry: PageGeometry::default(),
            thresholds: LayoutThresholds::default(),
            timing: TimingConfig::default(),
            max_document_bytes: 5 * 1024 * 1024,
        }
    }
}
