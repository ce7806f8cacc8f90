//! WASM bridge for RP. Exposes the report engine to the browser page that
//! hosts the report viewer.
//!
//! Compiled via `wasm-pack build --target web`. The host owns the clock and
//! the DOM: it passes `performance.now()` into every call, feeds measured
//! element heights back in, and calls `tick` from `requestAnimationFrame`
//! while fades are in flight.

mod dom;

use rp_core::id::ElementId;
use rp_core::styles::{REPORT_CSS, StyleOrigin, StyleSheet};
use rp_core::{ReportConfig, ReportInput, SectionKind, Timestamp};
use rp_editor::{DraftStore, Moves, Placement, ReportEdit, ReportEngine, ReportStore};
use serde::Deserialize;
use wasm_bindgen::prelude::*;

/// The report viewer controller. All interaction from the page goes
/// through this struct.
#[wasm_bindgen]
pub struct ReportView {
    engine: ReportEngine,
}

#[wasm_bindgen]
impl ReportView {
    /// Build a report from the templating step's JSON (`ReportInput`) and
    /// an optional partial `ReportConfig` (empty string for defaults).
    #[wasm_bindgen(constructor)]
    pub fn new(input_json: &str, config_json: &str, now_ms: f64) -> Result<ReportView, JsValue> {
        init_hooks();
        let input: ReportInput =
            serde_json::from_str(input_json).map_err(|e| JsValue::from_str(&format!("Invalid report input: {e}")))?;
        let config = parse_config(config_json)?;
        Ok(Self {
            engine: ReportEngine::mount(input.build(), config, Timestamp(now_ms)),
        })
    }

    /// Reload a previously saved report document.
    pub fn from_document(html: &str, config_json: &str, now_ms: f64) -> Result<ReportView, JsValue> {
        init_hooks();
        let config = parse_config(config_json)?;
        let engine = ReportEngine::from_persisted(html, config, Timestamp(now_ms)).map_err(|e| JsValue::from_str(&e))?;
        Ok(Self { engine })
    }

    // ─── Rendering ───────────────────────────────────────────────────────

    /// Markup of both page frames for the live view.
    pub fn live_html(&self) -> String {
        rp_core::emit_live(&self.engine.graph)
    }

    /// Reflect visibility and editing state onto the rendered elements.
    pub fn reflect(&self, document: &web_sys::Document) -> Result<(), JsValue> {
        dom::reflect(document, &self.engine.graph)
    }

    /// Replace the sheets inlined on save. JSON array of
    /// `{"href": string|null, "sameOrigin": bool, "rules": [string]|null}`.
    pub fn set_style_sheets(&mut self, sheets_json: &str) -> bool {
        match serde_json::from_str::<Vec<SheetWire>>(sheets_json) {
            Ok(sheets) => {
                let mut all = vec![StyleSheet::builtin()];
                all.extend(sheets.into_iter().map(SheetWire::into_sheet));
                self.engine.set_style_sheets(all);
                true
            }
            Err(e) => {
                log::warn!("wasm: invalid style sheets: {e}");
                false
            }
        }
    }

    // ─── Layout events ───────────────────────────────────────────────────

    /// Record a measured element height. Takes effect on the next event.
    pub fn set_measured_height(&mut self, id: &str, height: f32) -> bool {
        self.engine.set_measured_height(ElementId::intern(id), height)
    }

    /// Returns the placement changes as JSON.
    pub fn on_resize(&mut self, now_ms: f64) -> String {
        moves_json(&self.engine.on_resize(Timestamp(now_ms)))
    }

    /// `section` is `"notes"`, `"signatures"`, or empty when unknown.
    pub fn on_content_changed(&mut self, section: &str, now_ms: f64) -> String {
        moves_json(&self.engine.on_content_changed(SectionKind::parse(section), Timestamp(now_ms)))
    }

    pub fn on_scroll(&mut self, offset: f32, now_ms: f64) -> String {
        moves_json(&self.engine.on_scroll(offset, Timestamp(now_ms)))
    }

    /// Complete due fades. Returns the ids whose visibility changed as JSON.
    pub fn tick(&mut self, now_ms: f64) -> String {
        let ids = self.engine.advance(Timestamp(now_ms));
        let changed: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        serde_json::to_string(&changed).unwrap_or_else(|_| "[]".to_string())
    }

    /// `1` or `2`, or `0` for an unknown section name.
    pub fn page_of(&self, section: &str) -> u8 {
        match SectionKind::parse(section).map(|kind| self.engine.placement(kind)) {
            Some(Placement::OnPage1) => 1,
            Some(Placement::OnPage2) => 2,
            None => 0,
        }
    }

    // ─── Editing ─────────────────────────────────────────────────────────

    pub fn set_editing(&mut self, enabled: bool) {
        self.engine.set_editing(enabled);
    }

    pub fn is_editing(&self) -> bool {
        self.engine.is_editing()
    }

    /// Apply a JSON edit, e.g. `{"op":"set_note_markup","id":"note_3","markup":"…"}`.
    /// Returns `true` when the report changed.
    pub fn apply_edit(&mut self, edit_json: &str, now_ms: f64) -> bool {
        let edit: EditWire = match serde_json::from_str(edit_json) {
            Ok(edit) => edit,
            Err(e) => {
                log::warn!("wasm: invalid edit: {e}");
                return false;
            }
        };
        !matches!(
            self.engine.apply_edit(edit.into_edit(), Timestamp(now_ms)),
            rp_editor::EditOutcome::Ignored
        )
    }

    /// Hand a draft to `save(document)` once the autosave quiet period has
    /// passed. `save` signals failure by throwing.
    pub fn autosave(&mut self, save: &js_sys::Function, now_ms: f64) -> bool {
        self.engine.autosave(&mut JsStore(save), Timestamp(now_ms))
    }

    /// Leave editing mode and submit through `submit(document)`. Returns
    /// JSON: `{"ok":true}` or `{"ok":false,"error":"..."}`.
    pub fn finish_editing(&mut self, submit: &js_sys::Function) -> String {
        match self.engine.finish_editing(&mut JsStore(submit)) {
            Ok(()) => r#"{"ok":true}"#.to_string(),
            Err(e) => serde_json::json!({ "ok": false, "error": e.to_string() }).to_string(),
        }
    }

    pub fn set_show_logo(&mut self, show: bool, now_ms: f64) -> String {
        moves_json(&self.engine.set_show_logo(show, Timestamp(now_ms)))
    }

    // ─── Output ──────────────────────────────────────────────────────────

    /// Frozen standalone document, as it would be saved.
    pub fn serialize(&self) -> String {
        self.engine.serialize()
    }

    /// Print the frozen document from a hidden frame.
    pub fn print(&self, document: &web_sys::Document) -> Result<(), JsValue> {
        dom::print_frozen(document, &self.engine.print_document())
    }
}

// ─── Host collaborators ──────────────────────────────────────────────────

/// A JS callback standing in for the report and draft stores.
struct JsStore<'a>(&'a js_sys::Function);

impl JsStore<'_> {
    fn call(&self, document: &str) -> Result<(), String> {
        self.0
            .call1(&JsValue::NULL, &JsValue::from_str(document))
            .map(|_| ())
            .map_err(|e| e.as_string().unwrap_or_else(|| format!("{e:?}")))
    }
}

impl ReportStore for JsStore<'_> {
    fn submit(&mut self, document: &str) -> Result<(), String> {
        self.call(document)
    }
}

impl DraftStore for JsStore<'_> {
    fn save_draft(&mut self, document: &str) -> Result<(), String> {
        self.call(document)
    }
}

// ─── Wire formats ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum EditWire {
    SetRegionMarkup { id: String, markup: String },
    SetNoteMarkup { id: String, markup: String },
    AddNote {
        #[serde(default)]
        after: Option<String>,
        #[serde(default)]
        markup: String,
    },
    DeleteNote { id: String },
    ReplaceImage {
        id: String,
        src: String,
        #[serde(default)]
        alt: String,
    },
    RemoveImage {
        id: String,
        #[serde(default)]
        confirmed: bool,
    },
}

impl EditWire {
    fn into_edit(self) -> ReportEdit {
        let id = |s: &str| ElementId::intern(s);
        match self {
            EditWire::SetRegionMarkup { id: target, markup } => ReportEdit::SetRegionMarkup {
                id: id(&target),
                markup,
            },
            EditWire::SetNoteMarkup { id: target, markup } => ReportEdit::SetNoteMarkup {
                id: id(&target),
                markup,
            },
            EditWire::AddNote { after, markup } => ReportEdit::AddNote {
                after: after.as_deref().map(id),
                markup,
            },
            EditWire::DeleteNote { id: target } => ReportEdit::DeleteNote { id: id(&target) },
            EditWire::ReplaceImage { id: target, src, alt } => ReportEdit::ReplaceImage {
                id: id(&target),
                src,
                alt,
            },
            EditWire::RemoveImage { id: target, confirmed } => ReportEdit::RemoveImage {
                id: id(&target),
                confirmed,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetWire {
    #[serde(default)]
    href: Option<String>,
    #[serde(default)]
    same_origin: bool,
    #[serde(default)]
    rules: Option<Vec<String>>,
}

impl SheetWire {
    fn into_sheet(self) -> StyleSheet {
        let origin = match self.href {
            None => StyleOrigin::Inline,
            Some(href) if self.same_origin => StyleOrigin::SameOrigin { href },
            Some(href) => StyleOrigin::CrossOrigin { href },
        };
        StyleSheet {
            origin,
            rules: self.rules,
        }
    }
}

fn parse_config(json: &str) -> Result<ReportConfig, JsValue> {
    if json.trim().is_empty() {
        return Ok(ReportConfig::default());
    }
    serde_json::from_str(json).map_err(|e| JsValue::from_str(&format!("Invalid config: {e}")))
}

fn moves_json(moves: &Moves) -> String {
    let entries: Vec<serde_json::Value> = moves
        .iter()
        .map(|(kind, placement)| {
            let page = match placement {
                Placement::OnPage1 => 1,
                Placement::OnPage2 => 2,
            };
            serde_json::json!({ "section": kind.as_str(), "page": page })
        })
        .collect();
    serde_json::Value::Array(entries).to_string()
}

// ─── Console hooks ───────────────────────────────────────────────────────

struct ConsoleLogger;

impl log::Log for ConsoleLogger {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        #[cfg(target_arch = "wasm32")]
        {
            let msg = JsValue::from_str(&format!("RP {}: {}", record.level(), record.args()));
            match record.level() {
                log::Level::Error => web_sys::console::error_1(&msg),
                log::Level::Warn => web_sys::console::warn_1(&msg),
                _ => web_sys::console::log_1(&msg),
            }
        }
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger;

fn init_hooks() {
    use std::sync::Once;
    static SET_HOOK: Once = Once::new();
    SET_HOOK.call_once(|| {
        #[cfg(target_arch = "wasm32")]
        std::panic::set_hook(Box::new(|info| {
            let msg = format!("RP WASM panic: {info}");
            web_sys::console::error_1(&msg.into());
        }));
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(log::LevelFilter::Info);
        }
    });
}

// ─── Standalone functions (no view needed) ───────────────────────────────

/// Validate a saved report document. Returns JSON: `{"ok":true}` or
/// `{"ok":false,"error":"..."}`.
#[wasm_bindgen]
pub fn validate(html: &str) -> String {
    match rp_core::parse_report(html) {
        Ok(_) => r#"{"ok":true}"#.to_string(),
        Err(e) => serde_json::json!({ "ok": false, "error": e }).to_string(),
    }
}

/// Built-in report styling for the live view.
#[wasm_bindgen]
pub fn report_css() -> String {
    REPORT_CSS.to_string()
}
