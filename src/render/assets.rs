//! Asset aggregation pipeline.
//!
//! Aggregates style and script fragments into per-locale bundles
//! (`style.css` / `script.js` plus source maps) under the build root. The
//! cache keeps every fragment's source in memory so a single changed
//! fragment re-merges without re-reading untouched fragments from disk.
//!
//! A fragment `name.<locale>.ext` contributes only to that locale; an
//! unsuffixed fragment contributes to every configured locale.

use crate::{
    config::SiteConfig,
    engine::{script, style},
    locale::split_locale,
    render::deps::normalize_key,
};
use anyhow::{Context, Result};
use parking_lot::Mutex;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// The two fragment kinds the pipeline aggregates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Style,
    Script,
}

impl AssetKind {
    /// Kind of a fragment file, judged by extension.
    pub fn of(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("styl") => Some(Self::Style),
            Some("js") => Some(Self::Script),
            _ => None,
        }
    }

    /// Bundle file name under the locale directory.
    pub fn bundle_name(self) -> &'static str {
        match self {
            Self::Style => "style.css",
            Self::Script => "script.js",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Style => "styles",
            Self::Script => "scripts",
        }
    }
}

/// In-memory fragment cache, one per build session.
///
/// Keyed by fragment path in a `BTreeMap`, so aggregation order matches the
/// scanner's lexicographic discovery order. Safe for concurrent use; writes
/// to one locale's bundle stay serialized inside [`AssetCache::render`].
pub struct AssetCache {
    styles: Mutex<BTreeMap<PathBuf, String>>,
    scripts: Mutex<BTreeMap<PathBuf, String>>,
}

impl AssetCache {
    pub fn new() -> Self {
        Self {
            styles: Mutex::new(BTreeMap::new()),
            scripts: Mutex::new(BTreeMap::new()),
        }
    }

    fn fragments(&self, kind: AssetKind) -> &Mutex<BTreeMap<PathBuf, String>> {
        match kind {
            AssetKind::Style => &self.styles,
            AssetKind::Script => &self.scripts,
        }
    }

    /// Read a fragment from disk into the cache, overwriting a prior entry.
    pub fn upsert(&self, kind: AssetKind, path: &Path) -> Result<()> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.fragments(kind).lock().insert(path.to_path_buf(), source);
        Ok(())
    }

    /// Drop a deleted fragment from the cache.
    pub fn remove(&self, kind: AssetKind, path: &Path) {
        self.fragments(kind).lock().remove(path);
    }

    /// Locales a fragment contributes to.
    pub fn fragment_locales(config: &SiteConfig, path: &Path) -> Vec<String> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        match split_locale(name, &config.locales).1 {
            Some(locale) => vec![locale.to_owned()],
            None => config.locales.clone(),
        }
    }

    /// Aggregate and write bundles for every configured locale (or only the
    /// listed ones), returning build-relative output paths.
    pub fn render(
        &self,
        config: &SiteConfig,
        kind: AssetKind,
        only_locales: Option<&[String]>,
    ) -> Result<Vec<String>> {
        let mut outputs = Vec::new();

        for locale in &config.locales {
            if only_locales.is_some_and(|only| !only.contains(locale)) {
                continue;
            }

            let source = self.aggregate(config, kind, locale);
            if source.is_empty() {
                continue;
            }

            let dir = config.locale_dir(locale);
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
            let bundle = dir.join(kind.bundle_name());

            let map = match kind {
                AssetKind::Style => {
                    let out = style::compile(&source, config.style.pretty)?;
                    fs::write(&bundle, out.css)
                        .with_context(|| format!("failed to write {}", bundle.display()))?;
                    out.map
                }
                AssetKind::Script => {
                    let out = script::compile(&source, config.script.pretty)?;
                    fs::write(&bundle, out.code)
                        .with_context(|| format!("failed to write {}", bundle.display()))?;
                    out.map
                }
            };
            if let Some(map) = map {
                let mut map_path = bundle.clone().into_os_string();
                map_path.push(".map");
                fs::write(PathBuf::from(map_path), map)?;
            }

            outputs.push(normalize_key(&config.build, &bundle));
        }

        Ok(outputs)
    }

    /// Concatenate a locale's fragments in cache (= discovery) order.
    fn aggregate(&self, config: &SiteConfig, kind: AssetKind, locale: &str) -> String {
        let fragments = self.fragments(kind).lock();
        let mut parts: Vec<&str> = Vec::new();

        for (path, source) in fragments.iter() {
            let name = path
                .file_name()
                .and_then(|name| name.to_str())
                .unwrap_or_default();
            match split_locale(name, &config.locales).1 {
                Some(fragment_locale) if fragment_locale != locale => continue,
                _ => parts.push(source),
            }
        }

        parts.join("\n\n")
    }
}

impl Default for AssetCache {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
