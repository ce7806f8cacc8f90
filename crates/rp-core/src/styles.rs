//! Style rules inlined into serialized documents.
//!
//! The live view may pull rules from several sheets. Inline and same-origin
//! sheets are readable; cross-origin sheets cannot be introspected by the
//! host and arrive without rules. Those are skipped with a warning instead
//! of failing serialization.

// ─── Sources ─────────────────────────────────────────────────────────────

/// Where a style sheet came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleOrigin {
    /// A `<style>` block or built-in rules.
    Inline,
    /// A `<link>`ed sheet on the report's own origin.
    SameOrigin { href: String },
    /// A `<link>`ed sheet on another origin.
    CrossOrigin { href: String },
}

/// A style sheet reachable from the current view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleSheet {
    pub origin: StyleOrigin,
    /// The sheet's rules, or `None` when the host could not read them.
    pub rules: Option<Vec<String>>,
}

impl StyleSheet {
    pub fn inline(css: &str) -> Self {
        Self {
            origin: StyleOrigin::Inline,
            rules: Some(vec![css.trim().to_string()]),
        }
    }

    /// The sheet every report carries: page frames, sections, affordances.
    pub fn builtin() -> Self {
        Self::inline(REPORT_CSS)
    }
}

/// Concatenate every readable rule, in sheet order.
pub fn collect_rules(sheets: &[StyleSheet]) -> String {
    let mut out = String::new();
    for sheet in sheets {
        let label = match &sheet.origin {
            StyleOrigin::Inline => None,
            StyleOrigin::SameOrigin { href } => Some(href.as_str()),
            StyleOrigin::CrossOrigin { href } => {
                log::warn!("styles: skipping cross-origin sheet {href}");
                continue;
            }
        };
        let Some(rules) = &sheet.rules else {
            log::warn!(
                "styles: rules of {} are not readable, skipping",
                label.unwrap_or("inline sheet")
            );
            continue;
        };
        for rule in rules {
            let rule = rule.trim();
            if rule.is_empty() {
                continue;
            }
            out.push_str(rule);
            out.push('\n');
        }
    }
    out
}

/// Rules appended after the collected sheets in a frozen document: hide
/// editing-only controls and pin the logo mark to the user's choice.
pub fn freeze_overrides(show_logo: bool) -> String {
    let logo = if show_logo { "block" } else { "none" };
    format!(
        ".add-note, .image-controls {{ display: none !important; }}\n\
         .logo-mark {{ display: {logo} !important; }}\n"
    )
}

/// Page-break rules for the print surface.
pub const PRINT_CSS: &str = "\
@page { size: A4; margin: 0; }
html, body { margin: 0; padding: 0; background: #fff; }
.page { margin: 0; box-shadow: none; break-after: page; page-break-after: always; }
.page:last-child { break-after: auto; page-break-after: auto; }
";

/// Built-in report styling.
pub const REPORT_CSS: &str = r#"
.page {
    position: relative;
    box-sizing: border-box;
    width: 794px;
    height: 1123px;
    padding: 40px;
    margin: 0 auto 24px;
    overflow: hidden;
    background: #fff;
    box-shadow: 0 1px 4px rgba(0, 0, 0, 0.2);
}
.region { margin-bottom: 8px; }
.region-footer { position: absolute; left: 40px; right: 40px; bottom: 40px; font-size: 11px; }
.section { padding: 6px; margin-bottom: 8px; transition: opacity 300ms ease; }
.note-row { display: flex; gap: 6px; }
.note-number { min-width: 2em; }
.image-slot { position: relative; display: inline-block; }
.image-controls { display: none; position: absolute; top: 4px; right: 4px; }
.image-slot:hover .image-controls { display: flex; gap: 4px; }
.add-note { margin-top: 6px; }
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_cross_origin_and_unreadable_sheets() {
        let sheets = vec![
            StyleSheet::inline(".a { color: red; }"),
            StyleSheet {
                origin: StyleOrigin::CrossOrigin {
                    href: "https://cdn.example/x.css".into(),
                },
                rules: Some(vec![".x { color: blue; }".into()]),
            },
            StyleSheet {
                origin: StyleOrigin::SameOrigin {
                    href: "/app.css".into(),
                },
                rules: None,
            },
            StyleSheet {
                origin: StyleOrigin::SameOrigin {
                    href: "/report.css".into(),
                },
                rules: Some(vec![".b { margin: 0; }".into(), "  ".into()]),
            },
        ];
        assert_eq!(collect_rules(&sheets), ".a { color: red; }\n.b { margin: 0; }\n");
    }

    #[test]
    fn overrides_follow_logo_toggle() {
        assert!(freeze_overrides(true).contains(".logo-mark { display: block !important; }"));
        assert!(freeze_overrides(false).contains(".logo-mark { display: none !important; }"));
        assert!(freeze_overrides(false).contains(".add-note, .image-controls"));
    }
}
