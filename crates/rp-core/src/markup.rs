//! Markup fragments coming in from the templating step.
//!
//! Both helpers go through `ammonia` (html5ever underneath), so fragments
//! are read the way a browser reads them: implied end tags are closed,
//! entities are decoded, and the output is always well formed.

use std::collections::HashSet;

/// Attributes kept on every tag besides ammonia's defaults.
const KEPT_ATTRIBUTES: &[&str] = &["class", "style", "id", "colspan", "rowspan", "align", "width", "height"];

/// Rewrite a fragment into well-formed markup.
///
/// `<td>a<td>b` becomes `<td>a</td><td>b</td>`, an unclosed `<li>` is
/// closed, and tables gain their implied `<tbody>`. Scripts are dropped.
pub fn normalize(markup: &str) -> String {
    if !markup.contains(['<', '&']) {
        return markup.to_string();
    }
    ammonia::Builder::default()
        .add_generic_attributes(KEPT_ATTRIBUTES)
        .add_generic_attribute_prefixes(["data-"])
        .link_rel(None)
        .clean(markup)
        .to_string()
}

/// Strip tags from a markup fragment, leaving text. `<br>` becomes a newline.
pub fn plain_text(markup: &str) -> String {
    if !markup.contains(['<', '&']) {
        return markup.to_string();
    }
    let text = ammonia::Builder::empty()
        .add_tags(["br"])
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(markup)
        .to_string();
    // The serializer escapes only these.
    text.replace("<br>", "\n")
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
