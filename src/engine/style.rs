//! Style compilation.
//!
//! Compiles one aggregated style source into CSS plus a source map,
//! minified unless pretty output is requested.

use anyhow::{Result, anyhow};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};
use parcel_sourcemap::SourceMap;

/// Compiled style bundle.
pub struct CompiledStyle {
    pub css: String,
    /// Source map JSON, when one could be produced.
    pub map: Option<String>,
}

/// Compile an aggregated style source.
pub fn compile(source: &str, pretty: bool) -> Result<CompiledStyle> {
    let mut map = SourceMap::new("/");

    let stylesheet = StyleSheet::parse(source, ParserOptions::default())
        .map_err(|err| anyhow!("style compile: {err}"))?;

    let out = stylesheet
        .to_css(PrinterOptions {
            minify: !pretty,
            source_map: Some(&mut map),
            ..PrinterOptions::default()
        })
        .map_err(|err| anyhow!("style compile: {err}"))?;

    Ok(CompiledStyle {
        css: out.code,
        map: map.to_json(None).ok(),
    })
}
