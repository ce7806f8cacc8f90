//! Assemble the two-page report skeleton from pre-templated content.
//!
//! Content values (client, test data, equipment and result tables) are
//! already substituted by the time they reach the builder; it only decides
//! where each block goes:
//!
//! ```text
//! page 1: regions…, notes (primary), signatures (primary), footer mark
//! page 2: regions…, notes (duplicate, hidden), signatures (duplicate, hidden), footer mark
//! ```

use crate::id::ElementId;
use crate::markup::normalize as normalize_markup;
use crate::model::*;
use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

// ─── JSON input ──────────────────────────────────────────────────────────

/// An image placed inside a region or the signatures section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageInput {
    pub id: Option<String>,
    pub src: String,
    pub alt: String,
}

/// One immovable region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionInput {
    #[serde(default = "first_page")]
    pub page: u8,
    pub role: RegionRole,
    #[serde(default)]
    pub markup: String,
    #[serde(default)]
    pub id: Option<String>,
    /// Pre-measured height; estimated from markup when absent.
    #[serde(default)]
    pub height: Option<f32>,
    #[serde(default)]
    pub images: Vec<ImageInput>,
}

fn first_page() -> u8 {
    1
}

/// One entry of the signatures section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignatureInput {
    pub markup: String,
    pub image: Option<ImageInput>,
}

/// Serializable form of an assembled report, as handed over by the
/// templating step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportInput {
    pub regions: Vec<RegionInput>,
    pub notes: Vec<String>,
    pub signatures: Vec<SignatureInput>,
    /// Markup of the footer mark (repeated on both pages).
    pub footer: String,
}

impl ReportInput {
    /// Build the report graph. Regions naming a page other than 1 or 2 are
    /// dropped with a warning.
    pub fn build(self) -> ReportGraph {
        let mut builder = ReportBuilder::new().footer(&self.footer);
        for region in self.regions {
            builder = builder.region_input(region);
        }
        for note in self.notes {
            builder = builder.note(&note);
        }
        for signature in self.signatures {
            builder = builder.signature_input(signature);
        }
        builder.build()
    }
}

// ─── Builder ─────────────────────────────────────────────────────────────

/// Fluent builder for a two-page report.
#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    regions: Vec<(Page, RegionInput)>,
    notes: Vec<String>,
    signatures: Vec<SignatureInput>,
    footer: String,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a region with estimated height.
    #[must_use]
    pub fn region(self, page: Page, role: RegionRole, markup: &str) -> Self {
        self.region_input(RegionInput {
            page: page.number(),
            role,
            markup: markup.to_string(),
            id: None,
            height: None,
            images: Vec::new(),
        })
    }

    /// Add a region with a known rendered height.
    #[must_use]
    pub fn region_with_height(self, page: Page, role: RegionRole, markup: &str, height: f32) -> Self {
        self.region_input(RegionInput {
            page: page.number(),
            role,
            markup: markup.to_string(),
            id: None,
            height: Some(height),
            images: Vec::new(),
        })
    }

    #[must_use]
    pub fn region_input(mut self, region: RegionInput) -> Self {
        match Page::from_number(region.page) {
            Some(page) => self.regions.push((page, region)),
            None => log::warn!(
                "builder: region {:?} names page {}, only pages 1 and 2 exist",
                region.role,
                region.page
            ),
        }
        self
    }

    #[must_use]
    pub fn note(mut self, markup: &str) -> Self {
        self.notes.push(markup.to_string());
        self
    }

    #[must_use]
    pub fn signature(self, markup: &str) -> Self {
        self.signature_input(SignatureInput {
            markup: markup.to_string(),
            image: None,
        })
    }

    #[must_use]
    pub fn signature_input(mut self, signature: SignatureInput) -> Self {
        self.signatures.push(signature);
        self
    }

    #[must_use]
    pub fn footer(mut self, markup: &str) -> Self {
        self.footer = markup.to_string();
        self
    }

    /// Build the report graph.
    pub fn build(self) -> ReportGraph {
        let mut graph = ReportGraph::new();
        let root = graph.root;

        for page in Page::ALL {
            let page_idx = graph.add_node(
                root,
                ReportNode::new(
                    ElementId::intern(&format!("page_{}", page.number())),
                    NodeKind::PageFrame { page },
                ),
            );

            for (_, region) in self.regions.iter().filter(|(p, _)| *p == page) {
                add_region(&mut graph, page_idx, page, region);
            }

            let instance = if page == Page::First {
                Instance::Primary
            } else {
                Instance::Duplicate
            };
            for kind in SectionKind::ALL {
                let base = ElementId::intern(kind.as_str());
                let id = match instance {
                    Instance::Primary => base,
                    Instance::Duplicate => base.duplicate(),
                };
                let mut node = ReportNode::new(id, NodeKind::Section { kind, instance });
                if instance == Instance::Duplicate {
                    node = node.hidden();
                }
                graph.add_node(page_idx, node);
            }

            graph.add_node(
                page_idx,
                ReportNode::new(
                    ElementId::intern(&format!("footer_{}", page.number())),
                    NodeKind::Region {
                        role: RegionRole::FooterMark,
                        markup: normalize_markup(&self.footer),
                    },
                ),
            );
        }

        if let Some(notes) = graph.section(SectionKind::Notes, Instance::Primary) {
            for (i, markup) in self.notes.iter().enumerate() {
                let id = graph.fresh_id("note");
                graph.add_node(
                    notes,
                    ReportNode::new(
                        id,
                        NodeKind::NoteRow {
                            number: i as u32 + 1,
                            markup: normalize_markup(markup),
                        },
                    ),
                );
            }
        }

        if let Some(signatures) = graph.section(SectionKind::Signatures, Instance::Primary) {
            for signature in &self.signatures {
                let id = graph.fresh_id("signature");
                graph.add_node(
                    signatures,
                    ReportNode::new(
                        id,
                        NodeKind::Block {
                            markup: normalize_markup(&signature.markup),
                        },
                    ),
                );
                if let Some(image) = &signature.image {
                    add_image(&mut graph, signatures, image);
                }
            }
        }

        for kind in SectionKind::ALL {
            if let (Some(primary), Some(duplicate)) = (
                graph.section(kind, Instance::Primary),
                graph.section(kind, Instance::Duplicate),
            ) {
                graph.copy_children(primary, duplicate);
            }
        }

        graph
    }
}

fn add_region(graph: &mut ReportGraph, page_idx: NodeIndex, page: Page, region: &RegionInput) {
    let id = match &region.id {
        Some(id) => ElementId::intern(id),
        None if page == Page::First => ElementId::intern(region.role.as_str()),
        None => ElementId::intern(&format!("{}_p{}", region.role.as_str(), page.number())),
    };
    let id = if graph.index_of(id).is_some() {
        graph.fresh_id(region.role.as_str())
    } else {
        id
    };

    let mut node = ReportNode::new(
        id,
        NodeKind::Region {
            role: region.role,
            markup: normalize_markup(&region.markup),
        },
    );
    node.measured_height = region.height;
    let idx = graph.add_node(page_idx, node);
    for image in &region.images {
        add_image(graph, idx, image);
    }
}

fn add_image(graph: &mut ReportGraph, parent: NodeIndex, image: &ImageInput) -> NodeIndex {
    let id = match image.id.as_deref().map(ElementId::intern) {
        Some(id) if graph.index_of(id).is_none() => id,
        _ => graph.fresh_id("image"),
    };
    graph.add_node(
        parent,
        ReportNode::new(
            id,
            NodeKind::Image {
                src: image.src.clone(),
                alt: image.alt.clone(),
            },
        ),
    )
}
