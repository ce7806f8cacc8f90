//! Parser for persisted report documents → ReportGraph.
//!
//! Built on `winnow` 0.7. The persisted document is the serializer's own
//! output, so only the HTML subset it writes needs to be understood:
//! elements with quoted or bare attributes, void elements, comments,
//! doctype, and raw-text `<style>`/`<script>` bodies. Elements whose end tag
//! HTML lets authors omit (`<td>`, `<li>`, `<p>`, ...) close at their parent's
//! end tag. Everything that is not a page frame is walked past; inside page
//! frames the `data-*` attributes identify regions, sections, note rows,
//! blocks, images and affordances.

use crate::id::ElementId;
use crate::model::*;
use petgraph::graph::NodeIndex;
use std::collections::HashSet;
use winnow::combinator::{delimited, opt, preceded};
use winnow::error::{AddContext, ContextError, ErrMode, StrContext};
use winnow::prelude::*;
use winnow::token::{any, take_till, take_until, take_while};

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Elements that may be left open; the enclosing end tag (or the end of
/// input) closes them.
const OPTIONAL_END_ELEMENTS: &[&str] = &[
    "p", "li", "dt", "dd", "td", "th", "tr", "thead", "tbody", "tfoot", "option", "optgroup", "colgroup",
    "caption", "rt", "rp",
];

/// Parse a persisted report document into a `ReportGraph`.
#[must_use = "parsing result should be used"]
pub fn parse_report(input: &str) -> Result<ReportGraph, String> {
    let mut rest = input;
    let nodes = parse_nodes.parse_next(&mut rest).map_err(|e| {
        format!(
            "Markup parse error at line {}: {} near: {}",
            line_of(input, rest),
            describe(e),
            preview(rest)
        )
    })?;
    if !rest.trim().is_empty() {
        return Err(format!(
            "Unexpected closing tag at line {} near: {}",
            line_of(input, rest),
            preview(rest)
        ));
    }

    let mut frames = Vec::new();
    collect_pages(&nodes, &mut frames);

    let mut graph = ReportGraph::new();
    let mut seen = HashSet::new();
    for (page, element) in frames {
        if !seen.insert(page) {
            return Err(format!("Page {} appears more than once", page.number()));
        }
        insert_page(&mut graph, page, element);
    }
    if seen.len() != Page::ALL.len() {
        return Err(format!(
            "Expected page frames 1 and 2, found {}",
            seen.len()
        ));
    }

    Ok(graph)
}

fn preview(s: &str) -> String {
    s.chars().take(40).collect()
}

/// 1-based line of `rest` within `input`.
fn line_of(input: &str, rest: &str) -> usize {
    input[..input.len() - rest.len()].matches('\n').count() + 1
}

fn describe(err: ErrMode<ContextError>) -> String {
    match err {
        ErrMode::Incomplete(_) => "incomplete input".to_string(),
        ErrMode::Backtrack(e) | ErrMode::Cut(e) => {
            let reason = e.to_string();
            if reason.is_empty() {
                "malformed markup".to_string()
            } else {
                reason
            }
        }
    }
}

// ─── Markup tree ────────────────────────────────────────────────────────

/// Internal representation during parsing before inserting into graph.
#[derive(Debug)]
enum Markup<'a> {
    Element(Element<'a>),
    Text(&'a str),
}

impl<'a> Markup<'a> {
    /// The exact input this node was parsed from.
    fn source(&self) -> &'a str {
        match self {
            Markup::Element(el) => el.source,
            Markup::Text(text) => text,
        }
    }
}

#[derive(Debug)]
struct Element<'a> {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Markup<'a>>,
    /// Input between the opening and closing tag.
    inner: &'a str,
    /// Input from `<` of the opening tag to `>` of the closing tag.
    source: &'a str,
}

impl Element<'_> {
    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v.as_str()))
    }

    fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    fn elements(&self) -> impl Iterator<Item = &Element<'_>> {
        self.children.iter().filter_map(|child| match child {
            Markup::Element(el) => Some(el),
            Markup::Text(_) => None,
        })
    }

    fn visibility(&self) -> Visibility {
        let hidden = self.attr("style").is_some_and(|style| {
            style.split(';').any(|decl| {
                let mut parts = decl.splitn(2, ':');
                let property = parts.next().unwrap_or("").trim();
                let value = parts.next().unwrap_or("").trim();
                property.eq_ignore_ascii_case("display") && value.starts_with("none")
            })
        });
        if hidden {
            Visibility::Hidden
        } else {
            Visibility::Visible
        }
    }
}

// ─── Low-level parsers ──────────────────────────────────────────────────

fn skip_ws(input: &mut &str) {
    *input = input.trim_start();
}

/// Parse sibling nodes until end of input or a closing tag.
fn parse_nodes<'a>(input: &mut &'a str) -> ModalResult<Vec<Markup<'a>>> {
    let mut nodes = Vec::new();
    loop {
        if input.is_empty() || input.starts_with("</") {
            return Ok(nodes);
        }
        if input.starts_with("<!--") {
            let _ = delimited("<!--", take_until(0.., "-->"), "-->")
                .context(StrContext::Label("comment"))
                .parse_next(input)?;
            continue;
        }
        if input.starts_with("<!") || input.starts_with("<?") {
            let _ = delimited('<', take_till(0.., '>'), '>').parse_next(input)?;
            continue;
        }
        if input.starts_with('<') && input[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
            nodes.push(Markup::Element(parse_element.parse_next(input)?));
            continue;
        }

        let start = *input;
        if input.starts_with('<') {
            // A lone `<` that opens nothing is text.
            let _ = any.parse_next(input)?;
        }
        let _ = take_till::<_, _, ContextError>(0.., '<').parse_next(input);
        nodes.push(Markup::Text(&start[..start.len() - input.len()]));
    }
}

fn parse_tag_name<'a>(input: &mut &'a str) -> ModalResult<&'a str> {
    take_while(1.., |c: char| c.is_ascii_alphanumeric() || c == '-' || c == ':').parse_next(input)
}

fn parse_element<'a>(input: &mut &'a str) -> ModalResult<Element<'a>> {
    let start = *input;
    let _ = '<'.parse_next(input)?;
    let name = parse_tag_name.parse_next(input)?.to_ascii_lowercase();

    let mut attrs = Vec::new();
    let self_closing = loop {
        skip_ws(input);
        if input.starts_with("/>") {
            *input = &input[2..];
            break true;
        }
        if input.starts_with('>') {
            *input = &input[1..];
            break false;
        }
        attrs.push(parse_attribute.parse_next(input)?);
    };

    if self_closing || VOID_ELEMENTS.contains(&name.as_str()) {
        return Ok(Element {
            name,
            attrs,
            children: Vec::new(),
            inner: "",
            source: &start[..start.len() - input.len()],
        });
    }

    let inner_start = *input;
    let children = if RAW_TEXT_ELEMENTS.contains(&name.as_str()) {
        let closing = format!("</{name}");
        let text = take_until(0.., closing.as_str())
            .context(StrContext::Label("raw text element"))
            .parse_next(input)?;
        vec![Markup::Text(text)]
    } else {
        parse_nodes(input)?
    };
    let inner = &inner_start[..inner_start.len() - input.len()];

    let close_start = *input;
    let closing = opt(preceded("</", parse_tag_name)).parse_next(input)?;
    if !closing.is_some_and(|c| c.eq_ignore_ascii_case(&name)) {
        *input = close_start;
        if OPTIONAL_END_ELEMENTS.contains(&name.as_str()) {
            return Ok(Element {
                name,
                attrs,
                children,
                inner,
                source: &start[..start.len() - input.len()],
            });
        }
        let checkpoint = input.checkpoint();
        let err = ContextError::new().add_context(&*input, &checkpoint, StrContext::Label("closing tag"));
        return Err(ErrMode::Cut(err));
    }
    skip_ws(input);
    let _ = '>'.context(StrContext::Label("closing tag")).parse_next(input)?;

    Ok(Element {
        name,
        attrs,
        children,
        inner,
        source: &start[..start.len() - input.len()],
    })
}

fn parse_attribute(input: &mut &str) -> ModalResult<(String, String)> {
    let name = take_while(1.., |c: char| {
        !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\'')
    })
    .parse_next(input)?;
    skip_ws(input);

    let value = if input.starts_with('=') {
        *input = &input[1..];
        skip_ws(input);
        if input.starts_with('"') {
            delimited('"', take_till(0.., '"'), '"')
                .context(StrContext::Label("attribute value"))
                .parse_next(input)?
        } else if input.starts_with('\'') {
            delimited('\'', take_till(0.., '\''), '\'')
                .context(StrContext::Label("attribute value"))
                .parse_next(input)?
        } else {
            take_till(1.., |c: char| c.is_whitespace() || c == '>').parse_next(input)?
        }
    } else {
        ""
    };

    Ok((name.to_ascii_lowercase(), unescape_attr(value)))
}

fn unescape_attr(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

// ─── Graph construction ─────────────────────────────────────────────────

/// Find every page frame, wherever it sits in the document.
fn collect_pages<'m, 'a>(nodes: &'m [Markup<'a>], out: &mut Vec<(Page, &'m Element<'a>)>) {
    for node in nodes {
        let Markup::Element(el) = node else {
            continue;
        };
        let page = el
            .attr("data-page")
            .and_then(|n| n.trim().parse::<u8>().ok())
            .and_then(Page::from_number);
        match page {
            Some(page) => out.push((page, el)),
            None => collect_pages(&el.children, out),
        }
    }
}

/// The element's `id`, or a fresh prefixed one when absent or taken.
fn element_id(graph: &ReportGraph, el: &Element<'_>, prefix: &str) -> ElementId {
    match el.attr("id").filter(|id| !id.is_empty()) {
        Some(id) if graph.index_of(ElementId::intern(id)).is_none() => ElementId::intern(id),
        _ => graph.fresh_id(prefix),
    }
}

fn insert_page(graph: &mut ReportGraph, page: Page, el: &Element<'_>) {
    let id = match el.attr("id").filter(|id| !id.is_empty()) {
        Some(id) => ElementId::intern(id),
        None => ElementId::intern(&format!("page_{}", page.number())),
    };
    let root = graph.root;
    let page_idx = graph.add_node(root, ReportNode::new(id, NodeKind::PageFrame { page }));

    for child in el.elements() {
        if let Some(role) = child.attr("data-region") {
            insert_region(graph, page_idx, role, child);
        } else if child.attr("data-section").is_some() {
            insert_section(graph, page_idx, child);
        } else {
            log::debug!("parser: skipping <{}> directly inside page {}", child.name, page.number());
        }
    }
}

fn insert_region(graph: &mut ReportGraph, page_idx: NodeIndex, role: &str, el: &Element<'_>) {
    let role = RegionRole::parse(role).unwrap_or_else(|| {
        log::debug!("parser: unknown region role {role:?}, reading as other");
        RegionRole::Other
    });

    // Images are nodes of their own; everything else is the region's markup.
    let markup: String = el
        .children
        .iter()
        .filter(|child| match child {
            Markup::Element(e) => e.attr("data-image").is_none() && e.attr("data-affordance").is_none(),
            Markup::Text(_) => true,
        })
        .map(Markup::source)
        .collect();

    let id = element_id(graph, el, role.as_str());
    let mut node = ReportNode::new(id, NodeKind::Region { role, markup });
    node.visibility = el.visibility();
    let idx = graph.add_node(page_idx, node);

    for child in el.elements() {
        if child.attr("data-image").is_some() {
            insert_image(graph, idx, child);
        }
    }
}

fn insert_section(graph: &mut ReportGraph, page_idx: NodeIndex, el: &Element<'_>) {
    let kind = el.attr("data-section").and_then(SectionKind::parse);
    let Some(kind) = kind else {
        log::debug!("parser: unknown section kind {:?}", el.attr("data-section"));
        return;
    };
    let instance = el
        .attr("data-instance")
        .and_then(Instance::parse)
        .unwrap_or(Instance::Primary);

    let id = element_id(graph, el, kind.as_str());
    let mut node = ReportNode::new(id, NodeKind::Section { kind, instance });
    node.visibility = el.visibility();
    let section = graph.add_node(page_idx, node);

    for child in el.elements() {
        if let Some(number) = child.attr("data-note") {
            let position = graph.note_rows(section).len() as u32 + 1;
            let number = number.trim().parse().unwrap_or(position);
            let markup = child
                .elements()
                .find(|e| e.has_class("note-text"))
                .map(|e| e.inner.to_string())
                .unwrap_or_default();
            let mut row = ReportNode::new(
                element_id(graph, child, "note"),
                NodeKind::NoteRow { number, markup },
            );
            row.visibility = child.visibility();
            graph.add_node(section, row);
        } else if child.attr("data-block").is_some() {
            let mut block = ReportNode::new(
                element_id(graph, child, "block"),
                NodeKind::Block {
                    markup: child.inner.to_string(),
                },
            );
            block.visibility = child.visibility();
            graph.add_node(section, block);
        } else if child.attr("data-image").is_some() {
            insert_image(graph, section, child);
        } else if let Some(kind) = child.attr("data-affordance").and_then(AffordanceKind::parse) {
            insert_affordance(graph, section, kind, child);
        } else {
            log::debug!("parser: skipping <{}> inside section {}", child.name, kind.as_str());
        }
    }
}

fn insert_image(graph: &mut ReportGraph, parent: NodeIndex, el: &Element<'_>) {
    let img = el.elements().find(|e| e.name == "img");
    let src = img.and_then(|i| i.attr("src")).unwrap_or("").to_string();
    let alt = img.and_then(|i| i.attr("alt")).unwrap_or("").to_string();

    let mut node = ReportNode::new(element_id(graph, el, "image"), NodeKind::Image { src, alt });
    node.visibility = el.visibility();
    let idx = graph.add_node(parent, node);

    for child in el.elements() {
        if let Some(kind) = child.attr("data-affordance").and_then(AffordanceKind::parse) {
            insert_affordance(graph, idx, kind, child);
        }
    }
}

fn insert_affordance(graph: &mut ReportGraph, parent: NodeIndex, kind: AffordanceKind, el: &Element<'_>) {
    let mut node = ReportNode::new(element_id(graph, el, kind.as_str()), NodeKind::Affordance(kind));
    node.visibility = el.visibility();
    graph.add_node(parent, node);
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"<!DOCTYPE html>
<html><head><style>.page > .region { color: red; }</style></head>
<body>
<!-- page one -->
<div class="page" id="p_page_1" data-page="1">
  <div class="region region-title" id="p_title" data-region="title">Tensile <b>test</b></div>
  <section class="section section-notes" id="p_notes" data-section="notes" data-instance="primary">
    <div class="note-row" id="p_note_a" data-note="1"><span class="note-number">1.</span><div class="note-text">First &amp; only</div></div>
  </section>
  <div class="region region-footer" id="p_footer_1" data-region="footer">QF-12</div>
</div>
<div class="page" id="p_page_2" data-page="2">
  <section class="section section-notes" id="p_notes__dup" data-section="notes" data-instance="duplicate" style="display: none">
  </section>
  <div class="region region-footer" id="p_footer_2" data-region="footer">QF-12</div>
</div>
</body></html>
"#;

    #[test]
    fn parse_minimal_document() {
        let graph = parse_report(MINIMAL).unwrap();
        assert_eq!(graph.pages().len(), 2);

        let title = graph.region(RegionRole::Title).unwrap();
        assert_eq!(graph.graph[title].markup(), Some("Tensile <b>test</b>"));

        let notes = graph.section(SectionKind::Notes, Instance::Primary).unwrap();
        let rows = graph.note_rows(notes);
        assert_eq!(rows.len(), 1);
        assert_eq!(
            graph.graph[rows[0]].kind,
            NodeKind::NoteRow {
                number: 1,
                markup: "First &amp; only".into()
            }
        );

        let dup = graph.section(SectionKind::Notes, Instance::Duplicate).unwrap();
        assert_eq!(graph.graph[dup].visibility, Visibility::Hidden);
        assert_eq!(graph.page_of(dup), graph.page_frame(Page::Second));
        for (_, page) in graph.pages() {
            assert!(graph.footer_mark(page).is_some());
        }
    }

    #[test]
    fn parse_region_with_image() {
        let doc = r#"
<div class="page" id="pi_1" data-page="1"><div class="region region-logo logo-mark" id="pi_logo" data-region="logo">Lab<div class="image-slot" id="pi_img" data-image="true"><img src="a.png?x=1&amp;y=2" alt="Logo"><div class="image-controls" id="pi_ctl" data-affordance="image-controls"><button type="button" data-action="replace">Replace</button></div></div></div></div>
<div class="page" id="pi_2" data-page="2"></div>
"#;
        let graph = parse_report(doc).unwrap();
        let logo = graph.region(RegionRole::Logo).unwrap();
        assert_eq!(graph.graph[logo].markup(), Some("Lab"));
        let image = graph.children(logo)[0];
        assert_eq!(
            graph.graph[image].kind,
            NodeKind::Image {
                src: "a.png?x=1&y=2".into(),
                alt: "Logo".into()
            }
        );
        let controls = graph.children(image)[0];
        assert_eq!(
            graph.graph[controls].kind,
            NodeKind::Affordance(AffordanceKind::ImageControls)
        );
    }

    #[test]
    fn parse_rejects_missing_page() {
        let err = parse_report(r#"<div data-page="1"></div>"#).unwrap_err();
        assert!(err.contains("page frames"), "{err}");
    }

    #[test]
    fn parse_rejects_repeated_page() {
        let err = parse_report(r#"<div data-page="1"></div><div data-page="1"></div>"#).unwrap_err();
        assert!(err.contains("more than once"), "{err}");
    }

    #[test]
    fn parse_rejects_mismatched_tags() {
        assert!(parse_report(r#"<div data-page="1"><span></div></span>"#).is_err());
        assert!(parse_report(r#"<div data-page="1">"#).is_err());
        assert!(parse_report("</div>").is_err());
    }

    #[test]
    fn omitted_end_tags_close_at_the_parent() {
        let doc = r#"<div data-page="1"><div class="region region-table" id="oe_table" data-region="table"><table><tr><td>Rm<td>512 MPa</table><p>x<p>y<ul><li>open</ul></div></div>
<div data-page="2"></div>"#;
        let graph = parse_report(doc).unwrap();
        let table = graph.region(RegionRole::Table).unwrap();
        assert_eq!(
            graph.graph[table].markup(),
            Some("<table><tr><td>Rm<td>512 MPa</table><p>x<p>y<ul><li>open</ul>")
        );
    }

    #[test]
    fn unclosed_list_item_at_end_of_input() {
        let mut input = "<li>one<li>two";
        let nodes = parse_nodes(&mut input).unwrap();
        assert!(input.is_empty());
        let [Markup::Element(first)] = nodes.as_slice() else {
            panic!("expected one top-level item, got {nodes:?}");
        };
        assert_eq!(first.name, "li");
        assert_eq!(first.source, "<li>one<li>two");
    }

    #[test]
    fn mismatched_tag_error_names_line_and_cause() {
        let err = parse_report("<div data-page=\"1\">\n<span>\n</div>").unwrap_err();
        assert!(err.contains("line 3"), "{err}");
        assert!(err.contains("invalid closing tag"), "{err}");
        assert!(err.contains("near: </div>"), "{err}");
        assert!(!err.contains("ContextError"), "{err}");
    }

    #[test]
    fn parse_attribute_forms() {
        let mut input = r#"data-x='single' data-y=bare hidden>"#;
        assert_eq!(
            parse_attribute(&mut input).unwrap(),
            ("data-x".to_string(), "single".to_string())
        );
        skip_ws(&mut input);
        assert_eq!(
            parse_attribute(&mut input).unwrap(),
            ("data-y".to_string(), "bare".to_string())
        );
        skip_ws(&mut input);
        assert_eq!(
            parse_attribute(&mut input).unwrap(),
            ("hidden".to_string(), String::new())
        );
        assert_eq!(input, ">");
    }

    #[test]
    fn stray_angle_bracket_is_text() {
        let mut input = "a < b <br> c";
        let nodes = parse_nodes(&mut input).unwrap();
        let text: String = nodes.iter().map(Markup::source).collect();
        assert_eq!(text, "a < b <br> c");
        assert!(input.is_empty());
    }
}
