//! Locale resolution for content units.
//!
//! For one unit directory this module loads the per-locale template and
//! data records. The data file may hold a single mapping or a list; each
//! list element becomes its own [`LocaleRecord`] sharing the template.
//! Cross-locale navigation links are filled by resolving the same
//! computation for every other configured locale at the same record index.

use crate::{config::SiteConfig, locale::localized_file};
use anyhow::{Context, Result, anyhow, bail};
use serde_json::{Map, Value};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// One renderable page for one locale.
///
/// Constructed fresh per build or rebuild, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct LocaleRecord {
    pub locale: String,
    /// Template file resolved for this locale.
    pub template: PathBuf,
    /// Disabled records produce no output and no cross-locale links.
    pub disabled: bool,
    /// Canonical URL path, locale-prefixed unless the locale is the default.
    pub path: String,
    /// Extra URL paths rendering the same content.
    pub aliases: Vec<String>,
    /// Explicit redirect target overriding rendering.
    pub redirect: Option<String>,
    /// Locale -> URL path of the sibling record, for cross-locale navigation.
    pub other_locale_paths: BTreeMap<String, String>,
    /// Page fields from the data file (title etc. plus alias/redirect keys).
    pub page: Map<String, Value>,
    /// Data file fields outside `page`.
    pub data: Map<String, Value>,
    /// Custom data files, keyed by the name they were referenced under.
    pub files: Map<String, Value>,
    /// Per-locale globals from `global.yaml` at the source root.
    pub globals: Value,
    /// Every file read while producing this record.
    pub dependencies: Vec<PathBuf>,
}

/// Resolve all locales' records for a content unit.
pub fn resolve_unit(config: &SiteConfig, unit_dir: &Path) -> Result<Vec<LocaleRecord>> {
    let slug = unit_dir
        .strip_prefix(&config.source)
        .unwrap_or(unit_dir)
        .to_string_lossy()
        .replace('\\', "/");

    let mut per_locale: Vec<Vec<LocaleRecord>> = Vec::with_capacity(config.locales.len());
    for locale in &config.locales {
        per_locale.push(resolve_locale(config, unit_dir, locale, &slug)?);
    }

    // Cross-locale links join records of the same index; disabled records
    // contribute none.
    let paths: Vec<Vec<(bool, String)>> = per_locale
        .iter()
        .map(|records| {
            records
                .iter()
                .map(|r| (r.disabled, r.path.clone()))
                .collect()
        })
        .collect();

    for (li, records) in per_locale.iter_mut().enumerate() {
        for (idx, record) in records.iter_mut().enumerate() {
            for (lj, other_locale) in config.locales.iter().enumerate() {
                if li == lj {
                    continue;
                }
                if let Some((disabled, path)) = paths[lj].get(idx)
                    && !disabled
                {
                    record
                        .other_locale_paths
                        .insert(other_locale.clone(), path.clone());
                }
            }
        }
    }

    Ok(per_locale.into_iter().flatten().collect())
}

/// Resolve one locale's records for a unit.
///
/// Returns an empty list when the locale has no template, matching the
/// template fallback rule: `index.<locale>.<ext>` if present, else
/// `index.<ext>`, else nothing to render.
fn resolve_locale(
    config: &SiteConfig,
    unit_dir: &Path,
    locale: &str,
    slug: &str,
) -> Result<Vec<LocaleRecord>> {
    let Some(template) = localized_file(unit_dir, &config.template_index(), locale) else {
        return Ok(Vec::new());
    };

    let mut base_deps = vec![template.clone()];

    let data_file = localized_file(unit_dir, "data.yaml", locale);
    let items: Vec<Value> = match &data_file {
        Some(path) => {
            base_deps.push(path.clone());
            match load_yaml(path)? {
                Value::Array(items) => items,
                Value::Null => vec![Value::Object(Map::new())],
                value => vec![value],
            }
        }
        None => vec![Value::Object(Map::new())],
    };

    let (globals, global_file) = load_globals(config, locale)?;
    if let Some(path) = global_file {
        base_deps.push(path);
    }

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let Value::Object(mut data) = item else {
            bail!("{slug}: data must be a mapping or a list of mappings");
        };
        let mut page = match data.remove("page") {
            Some(Value::Object(map)) => map,
            Some(_) => bail!("{slug}: `page` must be a mapping"),
            None => Map::new(),
        };

        let disabled = page
            .get("disabled")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let page_slug = page
            .get("path")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .unwrap_or_else(|| slug.to_owned());
        let aliases = page
            .get("aliases")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let redirect = page
            .get("redirect")
            .and_then(Value::as_str)
            .map(str::to_owned);

        // Custom data files live under their own namespace so they never
        // collide with built-in page fields.
        let mut files = Map::new();
        let mut dependencies = base_deps.clone();
        if let Some(Value::Object(file_refs)) = page.remove("files") {
            for (name, file_ref) in &file_refs {
                let Some(file_name) = file_ref.as_str() else {
                    bail!("{slug}: `page.files.{name}` must be a file name");
                };
                let path = localized_file(unit_dir, file_name, locale)
                    .ok_or_else(|| anyhow!("{slug}: data file `{file_name}` not found"))?;
                files.insert(name.clone(), load_yaml(&path)?);
                dependencies.push(path);
            }
        }

        records.push(LocaleRecord {
            locale: locale.to_owned(),
            template: template.clone(),
            disabled,
            path: config.url_path(locale, &page_slug),
            aliases,
            redirect,
            other_locale_paths: BTreeMap::new(),
            page,
            data,
            files,
            globals: globals.clone(),
            dependencies,
        });
    }

    Ok(records)
}

/// Load `global.yaml` (locale-suffixed when present) from the source root.
fn load_globals(config: &SiteConfig, locale: &str) -> Result<(Value, Option<PathBuf>)> {
    match localized_file(&config.source, "global.yaml", locale) {
        Some(path) => {
            let value = load_yaml(&path)?;
            Ok((value, Some(path)))
        }
        None => Ok((Value::Object(Map::new()), None)),
    }
}

/// Parse a YAML file into a JSON value; an empty file is an empty mapping.
fn load_yaml(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }
    let yaml: serde_yaml::Value = serde_yaml::from_str(&content)
        .with_context(|| format!("invalid YAML in {}", path.display()))?;
    serde_json::to_value(yaml).with_context(|| format!("keys in {} must be strings", path.display()))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup(dir: &TempDir, locales: &[&str], default: Option<&str>) -> SiteConfig {
        let mut config = SiteConfig::default();
        config.source = dir.path().to_path_buf();
        config.locales = locales.iter().map(|l| (*l).to_owned()).collect();
        config.default_locale = default.map(str::to_owned);
        config
    }

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_template_fallback_across_locales() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &["en", "et"], Some("en"));
        write(&dir, "blog/post/index.pug", "x");

        let records = resolve_unit(&config, &dir.path().join("blog/post")).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].locale, "en");
        assert_eq!(records[0].path, "/blog/post");
        assert!(records[0].template.ends_with("index.pug"));
        assert_eq!(records[1].locale, "et");
        assert_eq!(records[1].path, "/et/blog/post");
        assert!(records[1].template.ends_with("index.pug"));
    }

    #[test]
    fn test_locale_specific_template_wins() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &["en", "et"], Some("en"));
        write(&dir, "blog/index.pug", "x");
        write(&dir, "blog/index.et.pug", "y");

        let records = resolve_unit(&config, &dir.path().join("blog")).unwrap();

        assert!(records[0].template.ends_with("index.pug"));
        assert!(records[1].template.ends_with("index.et.pug"));
    }

    #[test]
    fn test_missing_data_file_yields_empty_record() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &[""], None);
        write(&dir, "blog/index.pug", "x");

        let records = resolve_unit(&config, &dir.path().join("blog")).unwrap();

        assert_eq!(records.len(), 1);
        assert!(records[0].page.is_empty());
        assert!(records[0].data.is_empty());
    }

    #[test]
    fn test_list_data_fans_out() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &[""], None);
        write(&dir, "blog/index.pug", "x");
        write(
            &dir,
            "blog/data.yaml",
            "- page:\n    path: blog/one\n- page:\n    path: blog/two\n",
        );

        let records = resolve_unit(&config, &dir.path().join("blog")).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].path, "/blog/one");
        assert_eq!(records[1].path, "/blog/two");
    }

    #[test]
    fn test_page_fields_split_from_data() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &[""], None);
        write(&dir, "blog/index.pug", "x");
        write(
            &dir,
            "blog/data.yaml",
            "page:\n  title: Hello\nitems:\n  - a\n  - b\n",
        );

        let records = resolve_unit(&config, &dir.path().join("blog")).unwrap();

        assert_eq!(records[0].page.get("title").unwrap(), "Hello");
        assert!(records[0].data.contains_key("items"));
        assert!(!records[0].data.contains_key("page"));
    }

    #[test]
    fn test_disabled_record() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &["en", "et"], Some("en"));
        write(&dir, "blog/index.pug", "x");
        write(&dir, "blog/data.et.yaml", "page:\n  disabled: true\n");
        write(&dir, "blog/data.yaml", "page: {}\n");

        let records = resolve_unit(&config, &dir.path().join("blog")).unwrap();

        let en = records.iter().find(|r| r.locale == "en").unwrap();
        let et = records.iter().find(|r| r.locale == "et").unwrap();
        assert!(!en.disabled);
        assert!(et.disabled);
        // the disabled sibling contributes no cross-locale link
        assert!(en.other_locale_paths.is_empty());
    }

    #[test]
    fn test_other_locale_paths() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &["en", "et"], Some("en"));
        write(&dir, "about/index.pug", "x");

        let records = resolve_unit(&config, &dir.path().join("about")).unwrap();

        let en = records.iter().find(|r| r.locale == "en").unwrap();
        let et = records.iter().find(|r| r.locale == "et").unwrap();
        assert_eq!(en.other_locale_paths.get("et").unwrap(), "/et/about");
        assert_eq!(et.other_locale_paths.get("en").unwrap(), "/about");
    }

    #[test]
    fn test_aliases_and_redirect() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &[""], None);
        write(&dir, "blog/index.pug", "x");
        write(
            &dir,
            "blog/data.yaml",
            "page:\n  aliases: ['/old-blog']\n  redirect: '/target'\n",
        );

        let records = resolve_unit(&config, &dir.path().join("blog")).unwrap();

        assert_eq!(records[0].aliases, vec!["/old-blog"]);
        assert_eq!(records[0].redirect.as_deref(), Some("/target"));
    }

    #[test]
    fn test_custom_data_files() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &[""], None);
        write(&dir, "blog/index.pug", "x");
        write(&dir, "blog/team.yaml", "- name: Mari\n- name: Jaan\n");
        write(&dir, "blog/data.yaml", "page:\n  files:\n    team: team.yaml\n");

        let records = resolve_unit(&config, &dir.path().join("blog")).unwrap();

        let team = records[0].files.get("team").unwrap().as_array().unwrap();
        assert_eq!(team.len(), 2);
        assert!(
            records[0]
                .dependencies
                .iter()
                .any(|d| d.ends_with("team.yaml"))
        );
    }

    #[test]
    fn test_missing_custom_data_file_errors() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &[""], None);
        write(&dir, "blog/index.pug", "x");
        write(&dir, "blog/data.yaml", "page:\n  files:\n    team: team.yaml\n");

        assert!(resolve_unit(&config, &dir.path().join("blog")).is_err());
    }

    #[test]
    fn test_globals_loaded_per_locale() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &["en", "et"], Some("en"));
        write(&dir, "global.yaml", "siteName: My Site\n");
        write(&dir, "global.et.yaml", "siteName: Minu Sait\n");
        write(&dir, "about/index.pug", "x");

        let records = resolve_unit(&config, &dir.path().join("about")).unwrap();

        let en = records.iter().find(|r| r.locale == "en").unwrap();
        let et = records.iter().find(|r| r.locale == "et").unwrap();
        assert_eq!(en.globals.get("siteName").unwrap(), "My Site");
        assert_eq!(et.globals.get("siteName").unwrap(), "Minu Sait");
        assert!(en.dependencies.iter().any(|d| d.ends_with("global.yaml")));
    }

    #[test]
    fn test_invalid_yaml_errors() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &[""], None);
        write(&dir, "blog/index.pug", "x");
        write(&dir, "blog/data.yaml", "page: [unclosed\n");

        assert!(resolve_unit(&config, &dir.path().join("blog")).is_err());
    }

    #[test]
    fn test_dependencies_include_template_and_data() {
        let dir = TempDir::new().unwrap();
        let config = setup(&dir, &[""], None);
        write(&dir, "blog/index.pug", "x");
        write(&dir, "blog/data.yaml", "page: {}\n");

        let records = resolve_unit(&config, &dir.path().join("blog")).unwrap();

        assert!(records[0].dependencies.iter().any(|d| d.ends_with("index.pug")));
        assert!(records[0].dependencies.iter().any(|d| d.ends_with("data.yaml")));
    }
}
