pub mod builder;
pub mod config;
pub mod emitter;
pub mod id;
pub mod layout;
pub mod markup;
pub mod model;
pub mod overflow;
pub mod parser;
pub mod styles;

pub use builder::{ReportBuilder, ReportInput};
pub use config::{LayoutThresholds, PageGeometry, ReportConfig, SAFETY_BUFFER, TimingConfig};
pub use emitter::{EmitMode, emit_live, freeze_document, print_document};
pub use id::ElementId;
pub use layout::{Bounds, ResolvedLayout, resolve_layout};
pub use markup::normalize as normalize_markup;
pub use model::*;
pub use overflow::{has_space_for, section_overflows};
pub use parser::parse_report;
pub use styles::{StyleOrigin, StyleSheet};

// Re-export petgraph types so downstream crates don't need a direct dependency
pub use petgraph::graph::NodeIndex;
