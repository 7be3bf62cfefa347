//! Script minification.
//!
//! Compiles one aggregated script source into minified code plus a source
//! map. Pretty output skips compression entirely and emits the raw
//! concatenation without a map.

use anyhow::{Result, bail};
use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;
use std::path::PathBuf;

/// Compiled script bundle.
pub struct CompiledScript {
    pub code: String,
    /// Source map JSON; absent for pretty output.
    pub map: Option<String>,
}

/// Minify an aggregated script source.
pub fn compile(source: &str, pretty: bool) -> Result<CompiledScript> {
    if pretty {
        return Ok(CompiledScript {
            code: source.to_owned(),
            map: None,
        });
    }

    let allocator = Allocator::default();
    let parsed = Parser::new(&allocator, source, SourceType::mjs()).parse();
    if !parsed.errors.is_empty() {
        let messages: Vec<String> = parsed.errors.iter().map(ToString::to_string).collect();
        bail!("script compile: {}", messages.join("; "));
    }

    let mut program = parsed.program;
    let minified = Minifier::new(MinifierOptions {
        mangle: Some(MangleOptions::default()),
        compress: Some(CompressOptions::smallest()),
    })
    .minify(&allocator, &mut program);

    let out = Codegen::new()
        .with_options(CodegenOptions {
            minify: true,
            comments: CommentOptions::disabled(),
            source_map_path: Some(PathBuf::from("script.js")),
            ..CodegenOptions::default()
        })
        .with_scoping(minified.scoping)
        .build(&program);

    Ok(CompiledScript {
        code: out.code,
        map: out.map.map(|map| map.to_json_string()),
    })
}
