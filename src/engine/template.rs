//! Template compilation.
//!
//! Wraps `minijinja` behind the contract the render pipeline needs: render
//! one template file against a context and report every template file the
//! engine read along the way (the include dependency list). A fresh
//! environment per render keeps that tracking exact.

use crate::{config::SiteConfig, engine::markdown};
use anyhow::{Context, Result};
use minijinja::{AutoEscape, Environment, Value};
use parking_lot::Mutex;
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Arc,
};

/// Result of one template render.
pub struct RenderedTemplate {
    pub html: String,
    /// Every template file the engine read, the root template included.
    pub dependencies: Vec<PathBuf>,
}

/// Render a template file against a context.
///
/// Template names (and includes) resolve relative to the source root, so a
/// unit template can include shared fragments anywhere in the tree.
pub fn render(
    config: &SiteConfig,
    template: &Path,
    context: &serde_json::Value,
) -> Result<RenderedTemplate> {
    let tracked: Arc<Mutex<Vec<PathBuf>>> = Arc::new(Mutex::new(Vec::new()));

    let mut env = Environment::new();
    env.set_auto_escape_callback(|_| AutoEscape::Html);

    let markdown_options = config.markdown;
    env.add_filter("markdown", move |text: Option<String>| {
        Value::from_safe_string(markdown::render(
            text.as_deref().unwrap_or(""),
            markdown_options,
        ))
    });

    let root = config.source.clone();
    let seen = Arc::clone(&tracked);
    env.set_loader(move |name| {
        let path = root.join(name);
        match fs::read_to_string(&path) {
            Ok(source) => {
                seen.lock().push(path);
                Ok(Some(source))
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(minijinja::Error::new(
                minijinja::ErrorKind::InvalidOperation,
                format!("failed to read template `{name}`: {err}"),
            )),
        }
    });

    let name = template
        .strip_prefix(&config.source)
        .unwrap_or(template)
        .to_string_lossy()
        .replace('\\', "/");

    let html = env
        .get_template(&name)
        .and_then(|tmpl| tmpl.render(Value::from_serialize(context)))
        .with_context(|| format!("template `{name}`"))?;

    let dependencies = tracked.lock().clone();
    Ok(RenderedTemplate { html, dependencies })
}

// ============================================================================
// Tests
// ============================================================================
