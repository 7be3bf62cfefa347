//! Site configuration management for the YAML config file.
//!
//! # Keys
//!
//! | Key                    | Purpose                                        |
//! |------------------------|------------------------------------------------|
//! | `locales`              | Locale codes; `''` means a single unnamed one  |
//! | `defaultLocale`        | Locale whose URL prefix is dropped             |
//! | `source`/`build`/`assets` | Tree roots, relative to the config file     |
//! | `server`               | Dev server (port, assets mount prefix)         |
//! | `dev`                  | Dev filters (aliases switch, path restriction) |
//! | `protectedFromCleanup` | Build paths spared by the cleanup pass         |
//! | `markdown`/`template`/`style`/`script` | Engine switches                |
//!
//! # Example
//!
//! ```yaml
//! locales: [en, et]
//! defaultLocale: en
//! source: ./source
//! build: ./build
//! assets: ./assets
//! server:
//!   port: 4000
//! template:
//!   pretty: false
//! ```

pub mod defaults;
mod error;

pub use error::ConfigError;

use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing the site config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SiteConfig {
    /// Locale codes to render. A single empty string means no locale handling.
    #[serde(default = "defaults::locales")]
    pub locales: Vec<String>,

    /// Locale rendered without a URL prefix.
    #[serde(default)]
    pub default_locale: Option<String>,

    /// Content source tree root.
    #[serde(default = "defaults::paths::source")]
    pub source: PathBuf,

    /// Build output root.
    #[serde(default = "defaults::paths::build")]
    pub build: PathBuf,

    /// Static assets root, served but never built.
    #[serde(default = "defaults::paths::assets")]
    pub assets: PathBuf,

    /// Development server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Development filters.
    #[serde(default)]
    pub dev: DevConfig,

    /// Build paths (relative to the build root) never deleted by cleanup.
    #[serde(default)]
    pub protected_from_cleanup: Vec<String>,

    /// Markdown renderer switches.
    #[serde(default)]
    pub markdown: MarkdownConfig,

    /// Template engine settings.
    #[serde(default)]
    pub template: TemplateConfig,

    /// Style bundle settings.
    #[serde(default)]
    pub style: StyleConfig,

    /// Script bundle settings.
    #[serde(default)]
    pub script: ScriptConfig,
}

/// `server` section - development server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// URL prefix the assets root is mounted at.
    #[serde(default = "defaults::server::assets")]
    pub assets: String,

    /// HTTP port; 0 binds an ephemeral port.
    #[serde(default = "defaults::server::port")]
    pub port: u16,
}

/// `dev` section - filters for faster local iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevConfig {
    /// Render alias paths in addition to canonical paths.
    #[serde(default = "defaults::r#true")]
    pub aliases: bool,

    /// Restrict the scan to these source sub-paths (empty = everything).
    #[serde(default)]
    pub paths: Vec<String>,
}

/// `markdown` section - switches passed to the Markdown renderer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarkdownConfig {
    /// Turn single newlines into hard breaks.
    #[serde(default = "defaults::r#true")]
    pub breaks: bool,

    /// Pass raw HTML through instead of escaping it.
    #[serde(default = "defaults::r#false")]
    pub html: bool,
}

/// `template` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    /// Skip HTML minification.
    #[serde(default = "defaults::r#false")]
    pub pretty: bool,

    /// Template file extension (`index.<ext>` marks a content unit).
    #[serde(default = "defaults::template::extension")]
    pub extension: String,
}

/// `style` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StyleConfig {
    /// Skip CSS compression.
    #[serde(default = "defaults::r#false")]
    pub pretty: bool,
}

/// `script` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptConfig {
    /// Emit the raw concatenation instead of minified code.
    #[serde(default = "defaults::r#false")]
    pub pretty: bool,
}

// ============================================================================
// Defaults
// ============================================================================

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            locales: defaults::locales(),
            default_locale: None,
            source: defaults::paths::source(),
            build: defaults::paths::build(),
            assets: defaults::paths::assets(),
            server: ServerConfig::default(),
            dev: DevConfig::default(),
            protected_from_cleanup: Vec::new(),
            markdown: MarkdownConfig::default(),
            template: TemplateConfig::default(),
            style: StyleConfig::default(),
            script: ScriptConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            assets: defaults::server::assets(),
            port: defaults::server::port(),
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self {
            aliases: true,
            paths: Vec::new(),
        }
    }
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            breaks: true,
            html: false,
        }
    }
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            pretty: false,
            extension: defaults::template::extension(),
        }
    }
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self { pretty: false }
    }
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self { pretty: false }
    }
}

// ============================================================================
// Loading & Path Helpers
// ============================================================================

impl SiteConfig {
    /// Parse configuration from a YAML string.
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: SiteConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load configuration from a file path.
    ///
    /// Relative `source`/`build`/`assets` paths are resolved against the
    /// config file's directory.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;

        let dir = match path.parent() {
            Some(parent) if parent != Path::new("") => parent,
            _ => Path::new("."),
        };
        config.resolve_against(dir);

        Ok(config)
    }

    /// Resolve relative tree roots against `dir` and normalize to absolute.
    fn resolve_against(&mut self, dir: &Path) {
        for root in [&mut self.source, &mut self.build, &mut self.assets] {
            let joined = if root.is_relative() {
                dir.join(root.as_path())
            } else {
                root.clone()
            };
            *root = normalize_path(&joined);
        }
    }

    /// URL prefix segment for a locale: empty for the default locale.
    pub fn locale_prefix<'a>(&self, locale: &'a str) -> &'a str {
        if self.default_locale.as_deref() == Some(locale) {
            ""
        } else {
            locale
        }
    }

    /// URL path for a unit-relative slug in a locale: `/et/blog/post-1`,
    /// with the locale segment dropped for the default locale.
    pub fn url_path(&self, locale: &str, slug: &str) -> String {
        let prefix = self.locale_prefix(locale);
        let segments: Vec<&str> = [prefix, slug]
            .iter()
            .flat_map(|part| part.split('/'))
            .filter(|part| !part.is_empty())
            .collect();
        format!("/{}", segments.join("/"))
    }

    /// Build directory a locale's bundles land in.
    pub fn locale_dir(&self, locale: &str) -> PathBuf {
        self.build.join(self.locale_prefix(locale))
    }

    /// Template file name that marks a content unit (`index.pug`).
    pub fn template_index(&self) -> String {
        format!("index.{}", self.template.extension)
    }

    /// Is this a content-unit template file (`index.pug`, `index.et.pug`)?
    pub fn is_template_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name.starts_with("index.") && name.ends_with(&format!(".{}", self.template.extension))
    }

    /// Is this a unit data file (`data.yaml`, `data.et.yaml`)?
    pub fn is_data_file(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        name.starts_with("data.") && name.ends_with(".yaml")
    }
}

/// Normalize a path to absolute, using canonicalize if the path exists.
fn normalize_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    })
}

// ============================================================================
// Tests
// ============================================================================
