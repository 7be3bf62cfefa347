//! Persisted build manifest.
//!
//! `build.json` records the last build: the commit it was built against and
//! every produced output with its dependency list. The change detector
//! trusts it completely, so a manifest is only written after a pass with
//! zero render errors.

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::Path,
    time::{SystemTime, UNIX_EPOCH},
};

/// Manifest file name under the build root.
pub const MANIFEST_FILE: &str = "build.json";

/// Record of the last successful build.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildManifest {
    /// Build start time, milliseconds since the epoch.
    pub time: u64,
    /// Source commit the build corresponds to, when the tree is in git.
    pub commit: Option<String>,
    /// Wall time of the pass in milliseconds.
    pub ms: u64,
    #[serde(default)]
    pub build: BuildOutputs,
}

/// Outputs of one build pass, grouped by kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildOutputs {
    #[serde(default)]
    pub html: Vec<HtmlOutput>,
    #[serde(default)]
    pub css: Vec<String>,
    #[serde(default)]
    pub js: Vec<String>,
}

/// One produced HTML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HtmlOutput {
    /// Source template, relative to the source root.
    pub source: String,
    /// Output file, relative to the build root.
    pub build: String,
    /// Whether this output is an alias of a canonical path.
    pub alias: bool,
    /// Files read while rendering, relative to the source root.
    pub dependencies: Vec<String>,
}

impl BuildManifest {
    /// Load the manifest from a build directory.
    ///
    /// Any read or parse failure means "no usable manifest" and forces a
    /// full build downstream, so this never errors.
    pub fn load(build_dir: &Path) -> Option<Self> {
        let content = fs::read_to_string(build_dir.join(MANIFEST_FILE)).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Persist the manifest into a build directory.
    pub fn save(&self, build_dir: &Path) -> anyhow::Result<()> {
        fs::create_dir_all(build_dir)?;
        let content = serde_json::to_string(self)?;
        fs::write(build_dir.join(MANIFEST_FILE), content)?;
        Ok(())
    }
}

/// Milliseconds since the epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}

// ============================================================================
// Tests
// ============================================================================
