//! HTML minification for rendered pages.
//!
//! Wraps the `minify_html` crate behind the `template.pretty` switch so
//! callers never branch on configuration themselves.

use std::borrow::Cow;

/// Minify rendered HTML unless pretty output was requested.
///
/// Returns `Cow::Borrowed` when pretty output is on, `Cow::Owned` otherwise.
pub fn minify_html(html: &str, pretty: bool) -> Cow<'_, str> {
    if pretty {
        return Cow::Borrowed(html);
    }

    let mut cfg = minify_html::Cfg::new();
    cfg.keep_closing_tags = true;
    cfg.keep_html_and_head_opening_tags = true;
    cfg.keep_comments = false;
    cfg.minify_css = true;
    cfg.minify_js = true;
    cfg.remove_bangs = true;
    cfg.remove_processing_instructions = true;

    let out = minify_html::minify(html.as_bytes(), &cfg);
    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}
