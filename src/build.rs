//! Build pass orchestration.
//!
//! One pass: scan -> decide work list -> render dirty units in parallel,
//! joined with the style and script aggregations -> merge the results into
//! the build manifest. The manifest is written only after every output of
//! the pass completes with zero render errors, so a crash or a bad unit
//! leaves the previous manifest intact.
//!
//! ```text
//! build_site()
//!     │
//!     ├── scan_source() ──► units / fragments
//!     ├── detect::plan() ──► full or dirty subset
//!     │
//!     ├── rayon::join ──┬── render_unit() per dirty unit
//!     │                 └── style + script bundles
//!     │
//!     └── BuildManifest::save() + cleanup (full builds only)
//! ```

use crate::{
    config::SiteConfig,
    detect::{self, ChangeLister, GitCli, WorkPlan},
    log,
    manifest::{BuildManifest, BuildOutputs, HtmlOutput, MANIFEST_FILE, now_millis},
    render::{
        assets::{AssetCache, AssetKind},
        deps::DependencyGraph,
        pages::render_unit,
    },
    scan::scan_source,
};
use anyhow::Result;
use rayon::prelude::*;
use rustc_hash::FxHashSet;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicUsize, Ordering},
    time::Instant,
};
use walkdir::WalkDir;

// ============================================================================
// Session
// ============================================================================

/// State owned by one build session.
///
/// Constructed once and shared by the build pass, the watcher and the dev
/// server; the graph and fragment caches are safe for concurrent use.
pub struct Session {
    pub config: &'static SiteConfig,
    pub graph: DependencyGraph,
    pub assets: AssetCache,
}

impl Session {
    pub fn new(config: &'static SiteConfig) -> Self {
        Self {
            config,
            graph: DependencyGraph::new(&config.source),
            assets: AssetCache::new(),
        }
    }
}

/// Counts of one finished pass.
#[derive(Debug, Default)]
pub struct BuildSummary {
    pub html: usize,
    pub css: usize,
    pub js: usize,
    /// Per-unit render errors; they never abort the pass.
    pub errors: usize,
}

// ============================================================================
// Build Pass
// ============================================================================

/// Run one build pass, full or incremental.
///
/// Per-unit render errors are logged and counted, not propagated; an `Err`
/// here means the pass itself could not run.
pub fn build_site(session: &Session, full: bool) -> Result<BuildSummary> {
    let git = GitCli::new(&session.config.source);
    build_with(session, full, &git)
}

/// Build pass with an explicit change lister, so tests can stub git away.
fn build_with(session: &Session, full: bool, lister: &dyn ChangeLister) -> Result<BuildSummary> {
    let config = session.config;
    let started = Instant::now();
    let started_at = now_millis();

    let scan = scan_source(config);
    let previous = BuildManifest::load(&config.build);
    let plan = if full {
        WorkPlan::full_build()
    } else {
        detect::plan(config, previous.as_ref(), lister)
    };

    let units: Vec<&PathBuf> = if plan.full {
        scan.units.iter().collect()
    } else {
        scan.units
            .iter()
            .filter(|unit| plan.units.contains(*unit))
            .collect()
    };
    let build_styles = plan.full || plan.styles;
    let build_scripts = plan.full || plan.scripts;

    log!("build"; "{} units to render ({}), {} style and {} script fragments",
         units.len(),
         if plan.full { "full" } else { "incremental" },
         scan.styles.len(),
         scan.scripts.len());

    // The fragment caches are cold in a fresh process; seed them from the
    // scan so a single change can re-merge later without re-reading.
    seed_fragments(session, AssetKind::Style, &scan.styles);
    seed_fragments(session, AssetKind::Script, &scan.scripts);

    let errors = AtomicUsize::new(0);

    let (html, (css, js)) = rayon::join(
        || render_units(session, &units, &errors),
        || {
            rayon::join(
                || render_bundles(session, AssetKind::Style, build_styles, previous.as_ref(), &errors),
                || render_bundles(session, AssetKind::Script, build_scripts, previous.as_ref(), &errors),
            )
        },
    );

    let summary = BuildSummary {
        html: html.len(),
        css: css.len(),
        js: js.len(),
        errors: errors.load(Ordering::Relaxed),
    };

    if summary.errors > 0 {
        log!("error"; "{} render errors - manifest not updated", summary.errors);
        return Ok(summary);
    }

    let manifest = BuildManifest {
        time: started_at,
        commit: lister.head_commit().ok(),
        ms: started.elapsed().as_millis() as u64,
        build: BuildOutputs {
            html: merge_html(config, previous.as_ref(), &plan, &units, html),
            css,
            js,
        },
    };
    manifest.save(&config.build)?;

    if plan.full && config.dev.paths.is_empty() {
        cleanup(config, &manifest);
    }

    log!("build"; "{} html, {} css, {} js files - {:.2}s",
         manifest.build.html.len(), summary.css, summary.js,
         started.elapsed().as_secs_f64());

    Ok(summary)
}

/// Load scanned fragments into the session cache; unreadable fragments are
/// logged and skipped, aggregation proceeds without them.
fn seed_fragments(session: &Session, kind: AssetKind, fragments: &[PathBuf]) {
    for path in fragments {
        if let Err(err) = session.assets.upsert(kind, path) {
            log!("error"; "{}: {err:#}", path.display());
        }
    }
}

/// Render the work list in parallel, collecting outputs and counting
/// per-unit errors without stopping sibling units.
fn render_units(session: &Session, units: &[&PathBuf], errors: &AtomicUsize) -> Vec<HtmlOutput> {
    let config = session.config;
    units
        .par_iter()
        .flat_map(|unit| match render_unit(config, &session.graph, unit) {
            Ok(outputs) => outputs,
            Err(err) => {
                let rel = unit.strip_prefix(&config.source).unwrap_or(unit);
                log!("error"; "{}: {err:#}", rel.display());
                errors.fetch_add(1, Ordering::Relaxed);
                Vec::new()
            }
        })
        .collect()
}

/// Render one asset kind, or carry the previous manifest's list forward when
/// the kind is clean this pass.
fn render_bundles(
    session: &Session,
    kind: AssetKind,
    enabled: bool,
    previous: Option<&BuildManifest>,
    errors: &AtomicUsize,
) -> Vec<String> {
    if !enabled {
        return previous
            .map(|manifest| match kind {
                AssetKind::Style => manifest.build.css.clone(),
                AssetKind::Script => manifest.build.js.clone(),
            })
            .unwrap_or_default();
    }

    match session.assets.render(session.config, kind, None) {
        Ok(outputs) => outputs,
        Err(err) => {
            log!("error"; "{}: {err:#}", kind.label());
            errors.fetch_add(1, Ordering::Relaxed);
            Vec::new()
        }
    }
}

/// Merge this pass's HTML outputs with the previous manifest: untouched
/// units' entries are carried forward so their dependency data survives
/// incremental passes.
fn merge_html(
    config: &SiteConfig,
    previous: Option<&BuildManifest>,
    plan: &WorkPlan,
    rebuilt_units: &[&PathBuf],
    new_outputs: Vec<HtmlOutput>,
) -> Vec<HtmlOutput> {
    if plan.full {
        return new_outputs;
    }

    let rebuilt: FxHashSet<&Path> = rebuilt_units.iter().map(|unit| unit.as_path()).collect();

    let mut html = Vec::new();
    if let Some(previous) = previous {
        for entry in &previous.build.html {
            let unit = Path::new(&entry.source)
                .parent()
                .map(|parent| config.source.join(parent))
                .unwrap_or_else(|| config.source.clone());
            if !rebuilt.contains(unit.as_path()) {
                html.push(entry.clone());
            }
        }
    }
    html.extend(new_outputs);
    html
}

// ============================================================================
// Cleanup
// ============================================================================

/// After a fully successful full build, delete build files the manifest does
/// not account for, then prune emptied directories. Paths under a protected
/// prefix survive. IO failures here are logged, never fatal.
fn cleanup(config: &SiteConfig, manifest: &BuildManifest) {
    let mut keep: FxHashSet<PathBuf> = FxHashSet::default();
    keep.insert(config.build.join(MANIFEST_FILE));
    for entry in &manifest.build.html {
        keep.insert(config.build.join(&entry.build));
    }
    for bundle in manifest.build.css.iter().chain(&manifest.build.js) {
        let path = config.build.join(bundle);
        let mut map = path.clone().into_os_string();
        map.push(".map");
        keep.insert(path);
        keep.insert(map.into());
    }

    let mut deleted = 0usize;
    for entry in WalkDir::new(&config.build)
        .contents_first(true)
        .into_iter()
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path == config.build || is_protected(config, path) {
            continue;
        }

        if entry.file_type().is_file() {
            if !keep.contains(path) {
                match fs::remove_file(path) {
                    Ok(()) => deleted += 1,
                    Err(err) => log!("build"; "can't delete {}: {err}", path.display()),
                }
            }
        } else if entry.file_type().is_dir()
            && fs::read_dir(path).map(|mut dir| dir.next().is_none()).unwrap_or(false)
        {
            fs::remove_dir(path).ok();
        }
    }

    if deleted > 0 {
        log!("build"; "{deleted} stale files deleted");
    }
}

fn is_protected(config: &SiteConfig, path: &Path) -> bool {
    config
        .protected_from_cleanup
        .iter()
        .any(|prefix| path.starts_with(config.build.join(prefix)))
}

// ============================================================================
// Tests
// ============================================================================
