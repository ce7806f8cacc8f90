//! Emitter: ReportGraph → HTML.
//!
//! Two modes share one node walker:
//!
//! - **Live** markup mirrors the interactive view, including
//!   `contenteditable`, editing outlines, and mid-fade opacity.
//! - **Frozen** markup is what gets persisted and printed: the page frames
//!   are deep-copied, editing state and affordances are stripped from the
//!   copy, fades are settled, and the result is wrapped in a standalone
//!   document with every readable style rule inlined.
//!
//! Neither mode mutates the live graph. Output is deterministic, so freezing
//! twice without edits yields identical documents, and `parser::parse_report`
//! reads it back into the same two-page structure.

use crate::model::*;
use crate::styles::{PRINT_CSS, StyleSheet, collect_rules, freeze_overrides};
use petgraph::graph::NodeIndex;
use std::fmt::Write;

/// How node state is written out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmitMode {
    Live,
    Frozen,
}

/// Emit both page frames as they currently are, for mounting in the live view.
#[must_use]
pub fn emit_live(graph: &ReportGraph) -> String {
    emit_pages(graph, EmitMode::Live)
}

/// Freeze the report into a standalone, style-inlined HTML document.
#[must_use]
pub fn freeze_document(graph: &ReportGraph, sheets: &[StyleSheet], show_logo: bool) -> String {
    let mut css = collect_rules(sheets);
    css.push_str(&freeze_overrides(show_logo));
    frozen_shell(graph, &css)
}

/// Like `freeze_document`, with page-break rules for the print surface.
#[must_use]
pub fn print_document(graph: &ReportGraph, sheets: &[StyleSheet], show_logo: bool) -> String {
    let mut css = collect_rules(sheets);
    css.push_str(&freeze_overrides(show_logo));
    css.push_str(PRINT_CSS);
    frozen_shell(graph, &css)
}

/// Strip editing state and affordances from a graph copy and settle every
/// fade.
pub fn strip_editing(graph: &mut ReportGraph) {
    let indices: Vec<NodeIndex> = graph.graph.node_indices().collect();
    let mut affordances = Vec::new();
    for idx in indices {
        let node = &mut graph.graph[idx];
        node.editable = false;
        node.edit_styles.clear();
        node.visibility = node.visibility.settled();
        if matches!(node.kind, NodeKind::Affordance(_)) {
            affordances.push(idx);
        }
    }
    for idx in affordances {
        graph.remove_subtree(idx);
    }
}

fn frozen_shell(graph: &ReportGraph, css: &str) -> String {
    let mut frozen = graph.clone();
    strip_editing(&mut frozen);
    let body = emit_pages(&frozen, EmitMode::Frozen);

    let title = frozen
        .region(RegionRole::ReportNumber)
        .and_then(|idx| frozen.graph[idx].markup())
        .map(|m| plain_text(m).trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| "Report".to_string());

    let mut out = String::with_capacity(css.len() + body.len() + 256);
    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = writeln!(out, "<title>{}</title>", escape_text(&title));
    out.push_str("<style>\n");
    out.push_str(css);
    out.push_str("</style>\n</head>\n<body>\n");
    out.push_str(&body);
    out.push_str("</body>\n</html>\n");
    out
}

fn emit_pages(graph: &ReportGraph, mode: EmitMode) -> String {
    let mut out = String::with_capacity(4096);
    for (_, page) in graph.pages() {
        emit_node(&mut out, graph, page, 0, mode);
    }
    out
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn emit_node(out: &mut String, graph: &ReportGraph, idx: NodeIndex, depth: usize, mode: EmitMode) {
    let node = &graph.graph[idx];
    let id = escape_attr(node.id.as_str());
    let style = style_attr(node, mode);
    let editable = if node.editable && mode == EmitMode::Live {
        " contenteditable=\"true\""
    } else {
        ""
    };

    indent(out, depth);
    match &node.kind {
        NodeKind::Root => {}
        NodeKind::PageFrame { page } => {
            let _ = writeln!(
                out,
                "<div class=\"page\" id=\"{id}\" data-page=\"{}\"{style}>",
                page.number()
            );
            for child in graph.children(idx) {
                emit_node(out, graph, child, depth + 1, mode);
            }
            indent(out, depth);
            out.push_str("</div>\n");
        }
        NodeKind::Region { role, markup } => {
            let extra = if *role == RegionRole::Logo { " logo-mark" } else { "" };
            let _ = write!(
                out,
                "<div class=\"region region-{0}{extra}\" id=\"{id}\" data-region=\"{0}\"{editable}{style}>{markup}",
                role.as_str()
            );
            emit_inline_children(out, graph, idx, mode);
            out.push_str("</div>\n");
        }
        NodeKind::Section { kind, instance } => {
            let _ = writeln!(
                out,
                "<section class=\"section section-{0}\" id=\"{id}\" data-section=\"{0}\" data-instance=\"{1}\"{style}>",
                kind.as_str(),
                instance.as_str()
            );
            for child in graph.children(idx) {
                emit_node(out, graph, child, depth + 1, mode);
            }
            indent(out, depth);
            out.push_str("</section>\n");
        }
        NodeKind::NoteRow { number, markup } => {
            let _ = writeln!(
                out,
                "<div class=\"note-row\" id=\"{id}\" data-note=\"{number}\"{style}>\
                 <span class=\"note-number\">{number}.</span>\
                 <div class=\"note-text\"{editable}>{markup}</div></div>"
            );
        }
        NodeKind::Block { markup } => {
            let _ = writeln!(
                out,
                "<div class=\"block\" id=\"{id}\" data-block=\"true\"{editable}{style}>{markup}</div>"
            );
        }
        NodeKind::Image { .. } => {
            emit_image(out, graph, idx, mode);
            out.push('\n');
        }
        NodeKind::Affordance(kind) => {
            emit_affordance(out, &id, *kind, &style);
            out.push('\n');
        }
    }
}

/// Children of a region are written inline, after its markup, so the
/// region's text is not disturbed by indentation.
fn emit_inline_children(out: &mut String, graph: &ReportGraph, idx: NodeIndex, mode: EmitMode) {
    for child in graph.children(idx) {
        match &graph.graph[child].kind {
            NodeKind::Image { .. } => emit_image(out, graph, child, mode),
            NodeKind::Affordance(kind) => {
                let node = &graph.graph[child];
                emit_affordance(out, &escape_attr(node.id.as_str()), *kind, &style_attr(node, mode));
            }
            _ => log::debug!("emitter: skipping non-inline child {child:?} of region"),
        }
    }
}

fn emit_image(out: &mut String, graph: &ReportGraph, idx: NodeIndex, mode: EmitMode) {
    let node = &graph.graph[idx];
    let NodeKind::Image { src, alt } = &node.kind else {
        return;
    };
    let _ = write!(
        out,
        "<div class=\"image-slot\" id=\"{}\" data-image=\"true\"{}><img src=\"{}\" alt=\"{}\">",
        escape_attr(node.id.as_str()),
        style_attr(node, mode),
        escape_attr(src),
        escape_attr(alt)
    );
    for child in graph.children(idx) {
        let child_node = &graph.graph[child];
        if let NodeKind::Affordance(kind) = child_node.kind {
            emit_affordance(
                out,
                &escape_attr(child_node.id.as_str()),
                kind,
                &style_attr(child_node, mode),
            );
        }
    }
    out.push_str("</div>");
}

fn emit_affordance(out: &mut String, id: &str, kind: AffordanceKind, style: &str) {
    match kind {
        AffordanceKind::AddNote => {
            let _ = write!(
                out,
                "<button type=\"button\" class=\"add-note\" id=\"{id}\" data-affordance=\"add-note\"{style}>Add note</button>"
            );
        }
        AffordanceKind::ImageControls => {
            let _ = write!(
                out,
                "<div class=\"image-controls\" id=\"{id}\" data-affordance=\"image-controls\"{style}>\
                 <button type=\"button\" data-action=\"replace\">Replace</button>\
                 <button type=\"button\" data-action=\"remove\">Remove</button></div>"
            );
        }
    }
}

/// ` style="…"` for a node, or an empty string.
fn style_attr(node: &ReportNode, mode: EmitMode) -> String {
    let mut decls: Vec<String> = Vec::new();
    let visibility = match mode {
        EmitMode::Live => node.visibility,
        EmitMode::Frozen => node.visibility.settled(),
    };
    match visibility {
        Visibility::Visible => {}
        Visibility::Hidden | Visibility::Queued { .. } => decls.push("display: none".into()),
        Visibility::FadingOut { .. } => decls.push("opacity: 0".into()),
        Visibility::FadingIn { .. } => decls.push("opacity: 1".into()),
    }
    if mode == EmitMode::Live {
        for decl in &node.edit_styles {
            decls.push(format!("{}: {}", decl.property, decl.value));
        }
    }
    if decls.is_empty() {
        String::new()
    } else {
        format!(" style=\"{}\"", escape_attr(&decls.join("; ")))
    }
}

/// Escape text for an HTML text position.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text for a double-quoted attribute value.
pub fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}
