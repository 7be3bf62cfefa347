//! Source tree scanner.
//!
//! Walks the source root and enumerates content units (directories holding
//! an `index*` template) plus the flat sets of style and script fragments.
//! Path components starting with `_` are ignored, and the walk order is
//! lexicographic so build output ordering stays deterministic.

use crate::{config::SiteConfig, log};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};
use walkdir::{DirEntry, WalkDir};

/// Everything a build pass works from.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Content unit directories, lexicographically sorted.
    pub units: Vec<PathBuf>,
    /// Style fragment files.
    pub styles: Vec<PathBuf>,
    /// Script fragment files.
    pub scripts: Vec<PathBuf>,
}

/// Scan the source tree for content units and asset fragments.
///
/// Unreadable entries are logged and skipped, never fatal.
pub fn scan_source(config: &SiteConfig) -> ScanResult {
    let mut units = BTreeSet::new();
    let mut styles = Vec::new();
    let mut scripts = Vec::new();

    let walker = WalkDir::new(&config.source)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                log!("scan"; "skipped: {err}");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if !allowed_by_dev_paths(config, path) {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        if config.is_template_file(path) {
            if let Some(parent) = path.parent() {
                units.insert(parent.to_path_buf());
            }
        } else if name.ends_with(".styl") {
            styles.push(path.to_path_buf());
        } else if name.ends_with(".js") {
            scripts.push(path.to_path_buf());
        }
    }

    ScanResult {
        units: units.into_iter().collect(),
        styles,
        scripts,
    }
}

/// Path components starting with `_` are ignored (files and directories),
/// except the source root itself.
fn is_ignored(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('_'))
}

/// Apply the `dev.paths` restriction; an empty list allows everything.
fn allowed_by_dev_paths(config: &SiteConfig, path: &Path) -> bool {
    if config.dev.paths.is_empty() {
        return true;
    }
    config
        .dev
        .paths
        .iter()
        .any(|prefix| path.starts_with(config.source.join(prefix)))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup(dir: &TempDir) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.source = dir.path().to_path_buf();
        config
    }

    fn touch(dir: &TempDir, rel: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_finds_units_and_fragments() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir);
        touch(&dir, "blog/post-1/index.pug");
        touch(&dir, "blog/post-1/data.yaml");
        touch(&dir, "blog/post-2/index.et.pug");
        touch(&dir, "blog/style.styl");
        touch(&dir, "blog/script.js");

        let result = scan_source(&config);

        assert_eq!(result.units.len(), 2);
        assert!(result.units[0].ends_with("blog/post-1"));
        assert!(result.units[1].ends_with("blog/post-2"));
        assert_eq!(result.styles.len(), 1);
        assert_eq!(result.scripts.len(), 1);
    }

    #[test]
    fn test_units_are_sorted() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir);
        touch(&dir, "zebra/index.pug");
        touch(&dir, "alpha/index.pug");
        touch(&dir, "mid/index.pug");

        let result = scan_source(&config);

        assert!(result.units[0].ends_with("alpha"));
        assert!(result.units[1].ends_with("mid"));
        assert!(result.units[2].ends_with("zebra"));
    }

    #[test]
    fn test_ignores_underscore_components() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir);
        touch(&dir, "_drafts/post/index.pug");
        touch(&dir, "blog/_index.pug");
        touch(&dir, "blog/_hidden.styl");
        touch(&dir, "blog/index.pug");

        let result = scan_source(&config);

        assert_eq!(result.units.len(), 1);
        assert!(result.units[0].ends_with("blog"));
        assert!(result.styles.is_empty());
    }

    #[test]
    fn test_dev_paths_restriction() {
        let dir = TempDir::new().unwrap();
        let mut config = setup(&dir);
        config.dev.paths = vec!["blog".into()];
        touch(&dir, "blog/post/index.pug");
        touch(&dir, "news/item/index.pug");
        touch(&dir, "news/style.styl");

        let result = scan_source(&config);

        assert_eq!(result.units.len(), 1);
        assert!(result.units[0].ends_with("blog/post"));
        assert!(result.styles.is_empty());
    }

    #[test]
    fn test_other_files_are_not_units() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir);
        touch(&dir, "blog/header.pug");
        touch(&dir, "blog/readme.md");

        let result = scan_source(&config);

        assert!(result.units.is_empty());
    }
}
