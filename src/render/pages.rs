//! Page rendering for content units.
//!
//! Turns a unit's locale records into HTML files under the build root,
//! applying the alias and redirect policy, and registers every file a
//! render read in the dependency graph.

use crate::{
    config::SiteConfig,
    engine::template,
    manifest::HtmlOutput,
    render::{
        data::{LocaleRecord, resolve_unit},
        deps::{DependencyGraph, normalize_key},
    },
    utils::minify::minify_html,
};
use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::{fs, path::Path};

/// Render every locale record of a content unit.
///
/// Errors are reported for the whole unit; the caller decides whether they
/// abort anything beyond this unit (they do not).
pub fn render_unit(
    config: &SiteConfig,
    graph: &DependencyGraph,
    unit_dir: &Path,
) -> Result<Vec<HtmlOutput>> {
    let records = resolve_unit(config, unit_dir)?;

    let mut outputs = Vec::new();
    for record in records.iter().filter(|record| !record.disabled) {
        outputs.extend(render_record(config, graph, unit_dir, record)?);
    }
    Ok(outputs)
}

/// Render one record into its canonical path plus aliases.
fn render_record(
    config: &SiteConfig,
    graph: &DependencyGraph,
    unit_dir: &Path,
    record: &LocaleRecord,
) -> Result<Vec<HtmlOutput>> {
    let mut targets = vec![record.path.clone()];
    if config.dev.aliases {
        targets.extend(record.aliases.iter().cloned());
    }

    let mut dependencies = record.dependencies.clone();
    let mut outputs = Vec::new();

    for target in &targets {
        let alias = target != &record.path;

        let html = if let Some(redirect) = &record.redirect {
            // Redirects win over the normal body on every path of the record.
            redirect_page(redirect)
        } else {
            let context = build_context(record, alias.then_some(record.path.as_str()));
            let rendered = template::render(config, &record.template, &context)?;
            dependencies.extend(rendered.dependencies);
            rendered.html
        };

        let html = minify_html(&html, config.template.pretty);
        let out_path = config
            .build
            .join(target.trim_start_matches('/'))
            .join("index.html");
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&out_path, html.as_bytes())
            .with_context(|| format!("failed to write {}", out_path.display()))?;

        outputs.push(HtmlOutput {
            source: normalize_key(&config.source, &record.template),
            build: normalize_key(&config.build, &out_path),
            alias,
            dependencies: Vec::new(),
        });
    }

    dependencies.sort();
    dependencies.dedup();
    graph.add_edges(&dependencies, unit_dir);

    let keys: Vec<String> = dependencies
        .iter()
        .map(|dep| normalize_key(&config.source, dep))
        .collect();
    for output in &mut outputs {
        output.dependencies = keys.clone();
    }

    Ok(outputs)
}

/// Merge a record into the template context.
///
/// Alias renders carry `originalPath` pointing back to the canonical path
/// so templates can emit a canonical link.
fn build_context(record: &LocaleRecord, original_path: Option<&str>) -> Value {
    let mut page = record.page.clone();
    page.insert("language".into(), json!(&record.locale));
    page.insert("path".into(), json!(&record.path));
    page.insert(
        "otherLocalePaths".into(),
        json!(&record.other_locale_paths),
    );
    if let Some(original) = original_path {
        page.insert("originalPath".into(), json!(original));
    }

    json!({
        "page": page,
        "data": &record.data,
        "globals": &record.globals,
        "files": &record.files,
    })
}

/// Minimal redirect page: meta refresh plus a canonical link.
fn redirect_page(target: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <meta http-equiv=\"refresh\" content=\"0; url={target}\">\n\
         <link rel=\"canonical\" href=\"{target}\">\n</head>\n<body>\n\
         <a href=\"{target}\">{target}</a>\n</body>\n</html>\n"
    )
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        config: SiteConfig,
        graph: DependencyGraph,
    }

    fn setup(locales: &[&str], default: Option<&str>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.source = dir.path().join("source");
        config.build = dir.path().join("build");
        config.locales = locales.iter().map(|l| (*l).to_owned()).collect();
        config.default_locale = default.map(str::to_owned);
        config.template.pretty = true;
        fs::create_dir_all(&config.source).unwrap();
        let graph = DependencyGraph::new(&config.source);
        Fixture {
            _dir: dir,
            config,
            graph,
        }
    }

    fn write(config: &SiteConfig, rel: &str, content: &str) {
        let path = config.source.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn read(config: &SiteConfig, rel: &str) -> String {
        fs::read_to_string(config.build.join(rel)).unwrap()
    }

    #[test]
    fn test_render_single_unit() {
        let f = setup(&[""], None);
        write(&f.config, "blog/post-1/index.pug", "<h1>{{ page.title }}</h1>");
        write(&f.config, "blog/post-1/data.yaml", "page:\n  title: First\n");

        let outputs =
            render_unit(&f.config, &f.graph, &f.config.source.join("blog/post-1")).unwrap();

        assert_eq!(outputs.len(), 1);
        assert_eq!(outputs[0].build, "blog/post-1/index.html");
        assert!(!outputs[0].alias);
        assert_eq!(read(&f.config, "blog/post-1/index.html"), "<h1>First</h1>");
    }

    #[test]
    fn test_locale_fallback_renders_both_locales() {
        let f = setup(&["en", "et"], Some("en"));
        write(&f.config, "about/index.pug", "<p>{{ page.language }}</p>");

        let outputs = render_unit(&f.config, &f.graph, &f.config.source.join("about")).unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(read(&f.config, "about/index.html"), "<p>en</p>");
        assert_eq!(read(&f.config, "et/about/index.html"), "<p>et</p>");
    }

    #[test]
    fn test_alias_carries_original_path() {
        let f = setup(&[""], None);
        write(
            &f.config,
            "blog/index.pug",
            "{% if page.originalPath %}{{ page.originalPath }}{% else %}canonical{% endif %}",
        );
        write(
            &f.config,
            "blog/data.yaml",
            "page:\n  path: new-path\n  aliases: ['/old-path']\n",
        );

        let outputs = render_unit(&f.config, &f.graph, &f.config.source.join("blog")).unwrap();

        assert_eq!(outputs.len(), 2);
        assert!(!outputs[0].alias);
        assert!(outputs[1].alias);
        assert_eq!(read(&f.config, "new-path/index.html"), "canonical");
        assert_eq!(read(&f.config, "old-path/index.html"), "/new-path");
    }

    #[test]
    fn test_dev_aliases_off_skips_alias_outputs() {
        let mut f = setup(&[""], None);
        f.config.dev.aliases = false;
        write(&f.config, "blog/index.pug", "x");
        write(&f.config, "blog/data.yaml", "page:\n  aliases: ['/old']\n");

        let outputs = render_unit(&f.config, &f.graph, &f.config.source.join("blog")).unwrap();

        assert_eq!(outputs.len(), 1);
        assert!(!f.config.build.join("old").exists());
    }

    #[test]
    fn test_redirect_wins_on_every_path() {
        let f = setup(&[""], None);
        write(&f.config, "blog/index.pug", "normal body");
        write(
            &f.config,
            "blog/data.yaml",
            "page:\n  aliases: ['/old']\n  redirect: '/target'\n",
        );

        let outputs = render_unit(&f.config, &f.graph, &f.config.source.join("blog")).unwrap();

        assert_eq!(outputs.len(), 2);
        for rel in ["blog/index.html", "old/index.html"] {
            let html = read(&f.config, rel);
            assert!(html.contains("url=/target"));
            assert!(!html.contains("normal body"));
        }
    }

    #[test]
    fn test_disabled_record_renders_nothing() {
        let f = setup(&[""], None);
        write(&f.config, "blog/index.pug", "x");
        write(&f.config, "blog/data.yaml", "page:\n  disabled: true\n");

        let outputs = render_unit(&f.config, &f.graph, &f.config.source.join("blog")).unwrap();

        assert!(outputs.is_empty());
        assert!(!f.config.build.join("blog").exists());
    }

    #[test]
    fn test_dependencies_registered_in_graph() {
        let f = setup(&[""], None);
        write(&f.config, "shared/head.pug", "<head></head>");
        write(
            &f.config,
            "blog/index.pug",
            "{% include \"shared/head.pug\" %}",
        );
        write(&f.config, "other/index.pug", "<p>no includes</p>");

        render_unit(&f.config, &f.graph, &f.config.source.join("blog")).unwrap();
        render_unit(&f.config, &f.graph, &f.config.source.join("other")).unwrap();

        let units = f.graph.units_for(&f.config.source.join("shared/head.pug"));
        assert_eq!(units.len(), 1);
        assert!(units[0].ends_with("blog"));
    }

    #[test]
    fn test_output_dependencies_listed() {
        let f = setup(&[""], None);
        write(&f.config, "blog/index.pug", "x");
        write(&f.config, "blog/data.yaml", "page: {}\n");

        let outputs = render_unit(&f.config, &f.graph, &f.config.source.join("blog")).unwrap();

        assert!(outputs[0].dependencies.contains(&"blog/index.pug".to_owned()));
        assert!(outputs[0].dependencies.contains(&"blog/data.yaml".to_owned()));
    }

    #[test]
    fn test_bad_template_is_unit_error() {
        let f = setup(&[""], None);
        write(&f.config, "blog/index.pug", "{% endif %}");

        assert!(render_unit(&f.config, &f.graph, &f.config.source.join("blog")).is_err());
    }

    #[test]
    fn test_list_data_renders_each_record() {
        let f = setup(&[""], None);
        write(&f.config, "blog/index.pug", "{{ page.title }}");
        write(
            &f.config,
            "blog/data.yaml",
            "- page:\n    path: blog/one\n    title: One\n- page:\n    path: blog/two\n    title: Two\n",
        );

        let outputs = render_unit(&f.config, &f.graph, &f.config.source.join("blog")).unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(read(&f.config, "blog/one/index.html"), "One");
        assert_eq!(read(&f.config, "blog/two/index.html"), "Two");
    }

    #[test]
    fn test_cross_locale_links_in_context() {
        let f = setup(&["en", "et"], Some("en"));
        write(
            &f.config,
            "about/index.pug",
            "{{ page.otherLocalePaths.et }}{{ page.otherLocalePaths.en }}",
        );

        render_unit(&f.config, &f.graph, &f.config.source.join("about")).unwrap();

        assert_eq!(read(&f.config, "about/index.html"), "/et/about");
        assert_eq!(read(&f.config, "et/about/index.html"), "/about");
    }
}
