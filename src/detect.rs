//! Incremental-vs-full build decision.
//!
//! With no usable manifest the answer is always a full build. With one, the
//! changed file list (`git diff` against the manifest commit plus untracked
//! files) is classified into dirty content units and dirty asset kinds. Any
//! git failure downgrades to a full build; a manifest entry whose output is
//! missing on disk escalates that unit alone.

use crate::{
    config::SiteConfig,
    log,
    manifest::BuildManifest,
    render::deps::normalize_key,
};
use anyhow::{Context, Result, bail};
use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
    process::Command,
};

// ============================================================================
// Change Listing
// ============================================================================

/// Lists files changed since a commit. Abstracted so tests can stub the git
/// binary away.
pub trait ChangeLister {
    fn head_commit(&self) -> Result<String>;
    /// Changed plus untracked files, as absolute paths.
    fn changed_files_since(&self, commit: &str) -> Result<Vec<PathBuf>>;
}

/// Change listing backed by the `git` binary.
pub struct GitCli {
    source: PathBuf,
}

impl GitCli {
    pub fn new(source: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
        }
    }

    fn git(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .arg("-C")
            .arg(&self.source)
            .args(args)
            .output()
            .context("failed to run git")?;

        if !output.status.success() {
            bail!(
                "git {}: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl ChangeLister for GitCli {
    fn head_commit(&self) -> Result<String> {
        Ok(self.git(&["rev-parse", "HEAD"])?.trim().to_owned())
    }

    fn changed_files_since(&self, commit: &str) -> Result<Vec<PathBuf>> {
        let toplevel = PathBuf::from(self.git(&["rev-parse", "--show-toplevel"])?.trim());

        let mut files = Vec::new();
        let changed = self.git(&["diff", "--name-only", commit])?;
        let untracked = self.git(&["ls-files", "-o", "--exclude-standard", "--full-name"])?;
        for list in [changed, untracked] {
            for line in list.lines().filter(|line| !line.is_empty()) {
                files.push(toplevel.join(line));
            }
        }
        Ok(files)
    }
}

// ============================================================================
// Work Plan
// ============================================================================

/// The work list one build pass executes.
#[derive(Debug)]
pub struct WorkPlan {
    /// A full plan rebuilds everything the scanner finds.
    pub full: bool,
    /// Dirty content unit directories (absolute), ignored when `full`.
    pub units: BTreeSet<PathBuf>,
    pub styles: bool,
    pub scripts: bool,
}

impl WorkPlan {
    pub fn full_build() -> Self {
        Self {
            full: true,
            units: BTreeSet::new(),
            styles: true,
            scripts: true,
        }
    }

    fn incremental() -> Self {
        Self {
            full: false,
            units: BTreeSet::new(),
            styles: false,
            scripts: false,
        }
    }
}

/// Decide what an incremental pass must rebuild.
pub fn plan(
    config: &SiteConfig,
    manifest: Option<&BuildManifest>,
    lister: &dyn ChangeLister,
) -> WorkPlan {
    let Some(manifest) = manifest else {
        return WorkPlan::full_build();
    };
    let Some(commit) = manifest.commit.as_deref() else {
        return WorkPlan::full_build();
    };

    let changed = match lister.changed_files_since(commit) {
        Ok(changed) => changed,
        Err(err) => {
            log!("build"; "can't list changes since last build ({err}), full build");
            return WorkPlan::full_build();
        }
    };

    let mut plan = WorkPlan::incremental();
    for file in &changed {
        if !file.starts_with(&config.source) {
            continue;
        }

        let extension = file.extension().and_then(|ext| ext.to_str());
        if extension == Some(config.template.extension.as_str()) || extension == Some("yaml") {
            if let Some(parent) = file.parent() {
                plan.units.insert(parent.to_path_buf());
            }
        }
        match extension {
            Some("styl") => plan.styles = true,
            Some("js") => plan.scripts = true,
            _ => {}
        }

        // Cross-unit includes: any recorded output depending on this file
        // dirties that output's unit too.
        let key = normalize_key(&config.source, file);
        for entry in &manifest.build.html {
            if entry.dependencies.iter().any(|dep| dep == &key) {
                plan.units.insert(unit_of(config, &entry.source));
            }
        }
    }

    // A recorded output missing on disk escalates its unit alone.
    for entry in &manifest.build.html {
        if !config.build.join(&entry.build).exists() {
            plan.units.insert(unit_of(config, &entry.source));
        }
    }

    plan
}

/// Unit directory owning a manifest source path.
fn unit_of(config: &SiteConfig, source: &str) -> PathBuf {
    match Path::new(source).parent() {
        Some(parent) => config.source.join(parent),
        None => config.source.clone(),
    }
}

// ============================================================================
// Tests
// ============================================================================
