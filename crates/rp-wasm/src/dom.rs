//! DOM rendering adapter.
//!
//! The live markup comes from `ReportView::live_html`; after that, state-only
//! changes (visibility, fades, editing flags) are reflected onto the
//! existing elements by id instead of re-rendering. Structural changes such
//! as added note rows or editing affordances need a fresh `live_html`.

use rp_core::model::*;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, HtmlIFrameElement};

/// Mirror the visibility and editability of every node onto its element.
/// Nodes without a rendered element are skipped.
pub fn reflect(document: &Document, graph: &ReportGraph) -> Result<(), JsValue> {
    for idx in graph.descendants(graph.root) {
        let node = &graph.graph[idx];
        let Some(element) = document.get_element_by_id(node.id.as_str()) else {
            continue;
        };
        let html: HtmlElement = element.clone().dyn_into()?;
        apply_visibility(&html, node.visibility)?;

        let target = match node.kind {
            NodeKind::NoteRow { .. } => element.query_selector(".note-text")?.unwrap_or(element),
            _ => element,
        };
        apply_editable(&target, node)?;
    }
    Ok(())
}

/// One write to an element's inline style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StyleOp {
    Set(&'static str, &'static str),
    Remove(&'static str),
    /// Read layout so the next write starts a transition.
    Reflow,
}

/// Style writes that bring an element to `visibility`. `displayed` is
/// whether the element currently takes part in rendering.
fn style_ops(visibility: Visibility, displayed: bool) -> Vec<StyleOp> {
    use StyleOp::*;
    match visibility {
        Visibility::Visible => vec![Remove("display"), Remove("opacity")],
        Visibility::Hidden | Visibility::Queued { .. } => vec![Set("display", "none"), Remove("opacity")],
        Visibility::FadingOut { .. } => vec![Remove("display"), Set("opacity", "0")],
        // Revealed at opacity 0 first, or the fade never runs.
        Visibility::FadingIn { .. } if !displayed => {
            vec![Remove("display"), Set("opacity", "0"), Reflow, Set("opacity", "1")]
        }
        Visibility::FadingIn { .. } => vec![Set("opacity", "1")],
    }
}

fn apply_visibility(element: &HtmlElement, visibility: Visibility) -> Result<(), JsValue> {
    let style = element.style();
    let displayed = style.get_property_value("display")? != "none";
    for op in style_ops(visibility, displayed) {
        match op {
            StyleOp::Set(property, value) => style.set_property(property, value)?,
            StyleOp::Remove(property) => {
                style.remove_property(property)?;
            }
            StyleOp::Reflow => {
                let _ = element.offset_height();
            }
        }
    }
    Ok(())
}

fn apply_editable(element: &Element, node: &ReportNode) -> Result<(), JsValue> {
    if node.editable {
        element.set_attribute("contenteditable", "true")?;
    } else {
        element.remove_attribute("contenteditable")?;
    }
    let Ok(html) = element.clone().dyn_into::<HtmlElement>() else {
        return Ok(());
    };
    let style = html.style();
    if node.editable {
        for decl in &node.edit_styles {
            style.set_property(&decl.property, &decl.value)?;
        }
    } else {
        style.remove_property("outline")?;
        style.remove_property("cursor")?;
    }
    Ok(())
}

/// Print a frozen document through a hidden iframe, so the live view and
/// its editing state never reach the printer.
pub fn print_frozen(document: &Document, html: &str) -> Result<(), JsValue> {
    let iframe: HtmlIFrameElement = document.create_element("iframe")?.dyn_into()?;
    let style = iframe.style();
    style.set_property("position", "fixed")?;
    style.set_property("width", "0")?;
    style.set_property("height", "0")?;
    style.set_property("border", "0")?;
    style.set_property("visibility", "hidden")?;

    let frame = iframe.clone();
    let onload = Closure::once_into_js(move || {
        match frame.content_window() {
            Some(window) => {
                if let Err(err) = window.print() {
                    log::warn!("dom: print failed: {err:?}");
                }
            }
            None => log::warn!("dom: print frame has no window"),
        }
        if let Some(parent) = frame.parent_node() {
            let _ = parent.remove_child(&frame);
        }
    });
    iframe.set_onload(Some(onload.unchecked_ref()));
    iframe.set_srcdoc(html);

    let body = document
        .body()
        .ok_or_else(|| JsValue::from_str("document has no body"))?;
    body.append_child(&iframe)?;
    Ok(())
}
