//! Markdown rendering for template data fields.

use crate::config::MarkdownConfig;
use pulldown_cmark::{Event, Options, Parser, html};

/// Render Markdown text to single-line HTML.
///
/// `breaks` turns single newlines into hard breaks; with `html` off, raw
/// HTML in the source is escaped instead of passed through. The output is
/// flattened to one line so minified pages stay stable.
pub fn render(text: &str, options: MarkdownConfig) -> String {
    if text.is_empty() {
        return String::new();
    }

    let events = Parser::new_ext(text, Options::empty()).map(|event| match event {
        Event::SoftBreak if options.breaks => Event::HardBreak,
        Event::Html(raw) if !options.html => Event::Text(raw),
        Event::InlineHtml(raw) if !options.html => Event::Text(raw),
        event => event,
    });

    let mut out = String::new();
    html::push_html(&mut out, events);
    out.replace(['\r', '\n'], "")
}
