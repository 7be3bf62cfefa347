//! File system watcher for live rebuilds.
//!
//! Subscribes to create/modify/delete events under the source root,
//! debounced to absorb editor save patterns, and maps each event to the
//! smallest rebuild: template and data events re-render their owning unit,
//! fragment events re-run the asset pipeline, and anything else consults
//! the dependency graph for affected units. Every rebuild emits one
//! structured log line; a failed rebuild is logged and watching continues.

use crate::{
    build::Session,
    log,
    render::{
        assets::{AssetCache, AssetKind},
        pages::render_unit,
    },
};
use anyhow::{Context, Result};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use rustc_hash::{FxHashMap, FxHashSet};
use std::{
    path::{Path, PathBuf},
    time::{Duration, Instant},
};

// =============================================================================
// Constants
// =============================================================================

const DEBOUNCE_MS: u64 = 300;

// =============================================================================
// Events
// =============================================================================

/// Collapsed event type, for logs and delete handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Change {
    Created,
    Modified,
    Removed,
}

impl Change {
    fn of(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Removed),
            _ => None,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Created => "CREATE",
            Self::Modified => "MODIFY",
            Self::Removed => "REMOVE",
        }
    }
}

/// Check if path is a temp/backup file (editor artifacts).
fn is_temp_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    matches!(ext, "bck" | "bak" | "backup" | "swp" | "swo" | "tmp")
        || name.ends_with('~')
        || name.starts_with('.')
}

/// Ignore-marker rule, shared with the scanner: any `_` path component.
fn is_ignored(path: &Path, source: &Path) -> bool {
    path.strip_prefix(source)
        .unwrap_or(path)
        .components()
        .any(|component| component.as_os_str().to_str().is_some_and(|c| c.starts_with('_')))
}

// =============================================================================
// Debounce State
// =============================================================================

/// Batches rapid file events; repeated events for the same file within the
/// window collapse into one rebuild (the latest event type wins).
struct Debouncer {
    pending: FxHashMap<PathBuf, Change>,
    last_event: Option<Instant>,
}

impl Debouncer {
    fn new() -> Self {
        Self {
            pending: FxHashMap::default(),
            last_event: None,
        }
    }

    fn add(&mut self, path: PathBuf, change: Change) {
        self.pending.insert(path, change);
        self.last_event = Some(Instant::now());
    }

    fn ready(&self) -> bool {
        !self.pending.is_empty()
            && self
                .last_event
                .is_some_and(|t| t.elapsed() >= Duration::from_millis(DEBOUNCE_MS))
    }

    fn take(&mut self) -> Vec<(PathBuf, Change)> {
        self.last_event = None;
        let mut changes: Vec<_> = self.pending.drain().collect();
        changes.sort_by(|a, b| a.0.cmp(&b.0));
        changes
    }

    fn timeout(&self) -> Duration {
        if self.pending.is_empty() {
            Duration::from_secs(60)
        } else {
            Duration::from_millis(DEBOUNCE_MS)
        }
    }
}

// =============================================================================
// Rebuild Mapping
// =============================================================================

/// Map one debounced change to its rebuild.
fn handle_change(
    session: &Session,
    watcher: &mut dyn Watcher,
    watched_deps: &mut FxHashSet<PathBuf>,
    path: &Path,
    change: Change,
) {
    let config = session.config;
    let rel = path.strip_prefix(&config.source).unwrap_or(path);
    let label = change.label();

    // Fragment events re-run the asset pipeline for the affected locales.
    if let Some(kind) = AssetKind::of(path) {
        let result = if change == Change::Removed {
            session.assets.remove(kind, path);
            Ok(())
        } else {
            session.assets.upsert(kind, path)
        };

        let locales = AssetCache::fragment_locales(config, path);
        match result.and_then(|()| session.assets.render(config, kind, Some(&locales))) {
            Ok(outputs) => log!("watch"; "{label} {} -> {}", rel.display(), outputs.join(", ")),
            Err(err) => log!("error"; "{label} {}: {err:#}", rel.display()),
        }
        return;
    }

    // Template and data events own their unit; everything else asks the
    // dependency graph which units read this file.
    let units: Vec<PathBuf> = if config.is_template_file(path) || config.is_data_file(path) {
        path.parent().map(Path::to_path_buf).into_iter().collect()
    } else {
        session.graph.units_for(path)
    };

    for unit in units {
        rebuild_unit(session, watcher, watched_deps, &unit, label, rel);
    }
}

/// Re-render one unit and log the structured result.
fn rebuild_unit(
    session: &Session,
    watcher: &mut dyn Watcher,
    watched_deps: &mut FxHashSet<PathBuf>,
    unit: &Path,
    label: &str,
    trigger: &Path,
) {
    let config = session.config;
    match render_unit(config, &session.graph, unit) {
        Ok(outputs) => {
            let builds: Vec<&str> = outputs.iter().map(|o| o.build.as_str()).collect();
            log!("watch"; "{label} {} -> {}", trigger.display(), builds.join(", "));
            watch_new_dependencies(config, watcher, watched_deps, &outputs);
        }
        Err(err) => log!("error"; "{label} {}: {err:#}", trigger.display()),
    }
}

/// Late-bound watching: dependencies outside the recursively-watched source
/// root get their own non-recursive watch once they have been read.
fn watch_new_dependencies(
    config: &crate::config::SiteConfig,
    watcher: &mut dyn Watcher,
    watched_deps: &mut FxHashSet<PathBuf>,
    outputs: &[crate::manifest::HtmlOutput],
) {
    for output in outputs {
        for dep in &output.dependencies {
            let path = Path::new(dep);
            if !path.is_absolute() || path.starts_with(&config.source) {
                continue;
            }
            if watched_deps.insert(path.to_path_buf())
                && let Err(err) = watcher.watch(path, RecursiveMode::NonRecursive)
            {
                log!("watch"; "can't watch {}: {err}", path.display());
            }
        }
    }
}

// =============================================================================
// Public API
// =============================================================================

/// Start the blocking file watcher with debouncing and live rebuild.
pub fn watch_blocking(session: &'static Session) -> Result<()> {
    let config = session.config;

    let (tx, rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(tx).context("Failed to create file watcher")?;
    watcher
        .watch(&config.source, RecursiveMode::Recursive)
        .with_context(|| format!("Failed to watch {}", config.source.display()))?;

    log!("watch"; "watching {}", config.source.display());

    let mut watched_deps: FxHashSet<PathBuf> = FxHashSet::default();
    let mut debouncer = Debouncer::new();

    loop {
        match rx.recv_timeout(debouncer.timeout()) {
            Ok(Ok(event)) => {
                if let Some(change) = Change::of(&event.kind) {
                    for path in filter_paths(event, config) {
                        debouncer.add(path, change);
                    }
                }
            }
            Ok(Err(err)) => log!("watch"; "error: {err}"),
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) if debouncer.ready() => {
                for (path, change) in debouncer.take() {
                    handle_change(session, &mut watcher, &mut watched_deps, &path, change);
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
            // Timeout without pending work: keep waiting.
            _ => {}
        }
    }

    Ok(())
}

/// Event paths worth acting on: not editor temp files, not ignored.
fn filter_paths(event: Event, config: &crate::config::SiteConfig) -> Vec<PathBuf> {
    event
        .paths
        .into_iter()
        .filter(|path| !is_temp_file(path) && !is_ignored(path, &config.source))
        .collect()
}

// =============================================================================
// Tests
// =============================================================================
