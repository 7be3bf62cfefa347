//! Locale-suffixed file name resolution.
//!
//! The same rule applies to templates, data files and style/script
//! fragments: `name.ext` becomes `name.<locale>.ext` when a locale-specific
//! variant exists, otherwise the unsuffixed file is used. This module is the
//! single home of that rule.

use std::path::{Path, PathBuf};

/// Insert a locale before the last extension segment.
///
/// `data.yaml` + `et` -> `data.et.yaml`; an empty locale returns the name
/// unchanged.
pub fn with_locale(file_name: &str, locale: &str) -> String {
    if locale.is_empty() {
        return file_name.to_owned();
    }
    match file_name.rfind('.') {
        Some(dot) => format!("{}.{}{}", &file_name[..dot], locale, &file_name[dot..]),
        None => format!("{file_name}.{locale}"),
    }
}

/// Resolve a file in `dir` for a locale, falling back to the unsuffixed name.
///
/// Returns `None` when neither variant exists.
pub fn localized_file(dir: &Path, file_name: &str, locale: &str) -> Option<PathBuf> {
    let suffixed = dir.join(with_locale(file_name, locale));
    if suffixed.is_file() {
        return Some(suffixed);
    }
    let plain = dir.join(file_name);
    plain.is_file().then_some(plain)
}

/// Split a locale suffix out of a file name: `style.et.styl` with locales
/// `[en, et]` -> `("style.styl", Some("et"))`.
///
/// The middle segment only counts as a locale when it is configured, so
/// `jquery.min.js` stays a shared fragment.
pub fn split_locale<'a>(file_name: &str, locales: &'a [String]) -> (String, Option<&'a str>) {
    let parts: Vec<&str> = file_name.split('.').collect();
    if parts.len() >= 3 {
        let candidate = parts[parts.len() - 2];
        if let Some(locale) = locales.iter().find(|l| l.as_str() == candidate) {
            let mut base = parts[..parts.len() - 2].join(".");
            base.push('.');
            base.push_str(parts[parts.len() - 1]);
            return (base, Some(locale.as_str()));
        }
    }
    (file_name.to_owned(), None)
}
