//! Dependency tracking for precise rebuilds.
//!
//! Maps a source file to the set of content-unit directories whose last
//! render read that file. Keys are normalized (source-root-relative, `/`
//! separators) so watcher-reported paths and scanner-discovered paths match.
//!
//! Edges are only ever added; a rebuild re-adds its current dependencies, so
//! stale edges cause at worst an extra rebuild, never a missed one.

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use std::path::{Path, PathBuf};

/// Normalize a file path into a graph/manifest key.
///
/// Files under the source root become relative with `/` separators; files
/// outside it keep their full path.
pub fn normalize_key(source_root: &Path, file: &Path) -> String {
    let rel = file.strip_prefix(source_root).unwrap_or(file);
    rel.to_string_lossy().replace('\\', "/")
}

/// File -> content units reverse dependency map.
///
/// Safe for concurrent read/append; one graph lives for a whole build
/// session and is shared between the build pass and the watcher.
pub struct DependencyGraph {
    source: PathBuf,
    edges: RwLock<FxHashMap<String, FxHashSet<PathBuf>>>,
}

impl DependencyGraph {
    pub fn new(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            edges: RwLock::new(FxHashMap::default()),
        }
    }

    /// Record that rendering `unit` read every file in `files`.
    pub fn add_edges<I, P>(&self, files: I, unit: &Path)
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut edges = self.edges.write();
        for file in files {
            let key = normalize_key(&self.source, file.as_ref());
            edges.entry(key).or_default().insert(unit.to_path_buf());
        }
    }

    /// Content units whose last render read `file`, sorted for determinism.
    pub fn units_for(&self, file: &Path) -> Vec<PathBuf> {
        let key = normalize_key(&self.source, file);
        let edges = self.edges.read();
        let mut units: Vec<PathBuf> = edges
            .get(&key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default();
        units.sort();
        units
    }

    /// Number of tracked files.
    pub fn len(&self) -> usize {
        self.edges.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.read().is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key_inside_root() {
        let key = normalize_key(Path::new("/src"), Path::new("/src/blog/data.yaml"));
        assert_eq!(key, "blog/data.yaml");
    }

    #[test]
    fn test_normalize_key_outside_root() {
        let key = normalize_key(Path::new("/src"), Path::new("/etc/shared.yaml"));
        assert_eq!(key, "/etc/shared.yaml");
    }

    #[test]
    fn test_add_and_lookup() {
        let graph = DependencyGraph::new(Path::new("/src"));
        graph.add_edges(
            [Path::new("/src/shared/head.pug")],
            Path::new("/src/blog/post-1"),
        );

        let units = graph.units_for(Path::new("/src/shared/head.pug"));
        assert_eq!(units, vec![PathBuf::from("/src/blog/post-1")]);
    }

    #[test]
    fn test_lookup_unknown_file() {
        let graph = DependencyGraph::new(Path::new("/src"));
        assert!(graph.units_for(Path::new("/src/x.pug")).is_empty());
    }

    #[test]
    fn test_edges_are_additive() {
        let graph = DependencyGraph::new(Path::new("/src"));
        let file = Path::new("/src/shared/head.pug");
        graph.add_edges([file], Path::new("/src/a"));
        graph.add_edges([file], Path::new("/src/b"));

        let units = graph.units_for(file);
        assert_eq!(
            units,
            vec![PathBuf::from("/src/a"), PathBuf::from("/src/b")]
        );
    }

    #[test]
    fn test_readdition_is_idempotent() {
        let graph = DependencyGraph::new(Path::new("/src"));
        let file = Path::new("/src/shared/head.pug");
        graph.add_edges([file], Path::new("/src/a"));
        graph.add_edges([file], Path::new("/src/a"));

        assert_eq!(graph.units_for(file).len(), 1);
        assert_eq!(graph.len(), 1);
    }
}
