//! Directory module loader.
//!
//! Walks a directory, keeps the files accepted by the `matching` globs and not
//! rejected by the `ignoring` globs, asks a [`ModuleSource`] for the unit each
//! file stands for, runs the initializer and filter hooks, and writes the
//! survivors into a target map keyed by the case-styled file path.

pub mod json_source;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ignore::overrides::{Override, OverrideBuilder};
use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::error::BootstrapError;

pub use json_source::JsonFileSource;

/// How path segments are rendered into property names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaseStyle {
    /// `user_role.rs` -> `userRole`
    #[default]
    Camel,
    /// `user_role.rs` -> `UserRole`
    Upper,
    /// `User_role.rs` -> `userRole`
    Lower,
}

/// A file selected by the loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFile {
    /// Absolute (or base-joined) path on disk.
    pub path: PathBuf,
    /// Path relative to the scanned directory, `/`-separated.
    pub relative: String,
    /// Case-styled path segments, extension dropped.
    pub properties: Vec<String>,
}

impl ModuleFile {
    /// Relative path without extension, e.g. `admin/user_role`.
    pub fn module_path(&self) -> &str {
        match self.relative.rfind('.') {
            Some(dot) if !self.relative[dot..].contains('/') => &self.relative[..dot],
            _ => &self.relative,
        }
    }

    /// Key under which the module lands in the target map.
    pub fn key(&self) -> String {
        self.properties.join(".")
    }
}

/// Resolves a scanned file into the unit it exports.
pub trait ModuleSource {
    type Unit;

    /// `Ok(None)` means the file exports nothing and is skipped.
    fn load(&self, file: &ModuleFile) -> Result<Option<Self::Unit>, BootstrapError>;
}

type Initializer<'a, U, O> = Box<dyn FnMut(U, &ModuleFile) -> Result<O, BootstrapError> + 'a>;
type Filter<'a, O> = Box<dyn FnMut(&O) -> bool + 'a>;

pub struct Loader<'a, S: ModuleSource, O> {
    directory: PathBuf,
    matching: Vec<String>,
    ignoring: Vec<String>,
    case_style: CaseStyle,
    source: &'a S,
    initializer: Initializer<'a, S::Unit, O>,
    filter: Option<Filter<'a, O>>,
}

impl<'a, S: ModuleSource> Loader<'a, S, S::Unit> {
    /// Loader whose units are stored as-is.
    pub fn new(directory: impl Into<PathBuf>, source: &'a S) -> Self {
        Self::with_initializer(directory, source, |unit, _| Ok(unit))
    }
}

impl<'a, S: ModuleSource, O> Loader<'a, S, O> {
    pub fn with_initializer(
        directory: impl Into<PathBuf>,
        source: &'a S,
        initializer: impl FnMut(S::Unit, &ModuleFile) -> Result<O, BootstrapError> + 'a,
    ) -> Self {
        Self {
            directory: directory.into(),
            matching: Vec::new(),
            ignoring: Vec::new(),
            case_style: CaseStyle::default(),
            source,
            initializer: Box::new(initializer),
            filter: None,
        }
    }

    pub fn matching<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.matching.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn ignoring<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.ignoring.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn case_style(mut self, case_style: CaseStyle) -> Self {
        self.case_style = case_style;
        self
    }

    pub fn filter(mut self, filter: impl FnMut(&O) -> bool + 'a) -> Self {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Load every accepted module into `target`, returning how many were written.
    pub fn load(mut self, target: &mut BTreeMap<String, O>) -> Result<usize, BootstrapError> {
        if !self.directory.is_dir() {
            debug!(directory = %self.directory.display(), "loader=skip reason=missing_directory");
            return Ok(0);
        }

        let matcher = build_globs(&self.directory, &self.matching)?;
        let excluder = build_globs(&self.directory, &self.ignoring)?;
        let mut written = 0;

        for file in self.scan(&matcher, &excluder)? {
            let Some(unit) = self.source.load(&file)? else {
                trace!(file = %file.relative, "loader=skip reason=no_export");
                continue;
            };

            let value = (self.initializer)(unit, &file)?;

            if let Some(filter) = self.filter.as_mut() {
                if !filter(&value) {
                    debug!(file = %file.relative, "loader=skip reason=filtered");
                    continue;
                }
            }

            let key = file.key();
            if target.contains_key(&key) {
                return Err(BootstrapError::load(
                    &file.path,
                    format!("can't overwrite property '{key}'"),
                ));
            }
            trace!(file = %file.relative, key = %key, "loader=accept");
            target.insert(key, value);
            written += 1;
        }

        Ok(written)
    }

    fn scan(
        &self,
        matcher: &Option<Override>,
        excluder: &Option<Override>,
    ) -> Result<Vec<ModuleFile>, BootstrapError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(&self.directory).sort_by_file_name() {
            let entry = entry.map_err(|e| BootstrapError::load(&self.directory, e))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = relative_slash_path(&self.directory, path);

            if let Some(matcher) = matcher {
                if !matcher.matched(Path::new(&relative), false).is_whitelist() {
                    continue;
                }
            }
            if let Some(excluder) = excluder {
                if excluder.matched(Path::new(&relative), false).is_whitelist() {
                    debug!(file = %relative, "loader=skip reason=excluded");
                    continue;
                }
            }

            let properties = camelize(&relative, self.case_style)
                .map_err(|detail| BootstrapError::load(path, detail))?;
            files.push(ModuleFile {
                path: path.to_path_buf(),
                relative,
                properties,
            });
        }

        Ok(files)
    }
}

fn build_globs(root: &Path, patterns: &[String]) -> Result<Option<Override>, BootstrapError> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = OverrideBuilder::new(root);
    for pattern in patterns {
        builder
            .add(pattern)
            .map_err(|e| BootstrapError::config(format!("invalid glob '{pattern}': {e}")))?;
    }
    let globs = builder
        .build()
        .map_err(|e| BootstrapError::config(format!("invalid glob set: {e}")))?;
    Ok(Some(globs))
}

fn relative_slash_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Turn `admin/user_role.rs` into `["Admin", "UserRole"]` (for `CaseStyle::Upper`).
pub fn camelize(relative: &str, case_style: CaseStyle) -> Result<Vec<String>, String> {
    let stem = match relative.rfind('.') {
        Some(dot) if !relative[dot..].contains('/') => &relative[..dot],
        _ => relative,
    };

    stem.split('/')
        .map(|segment| {
            let mut chars = segment.chars();
            let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid {
                return Err(format!(
                    "{segment} is not match 'a-z0-9_-' in {relative}"
                ));
            }

            let mut out = String::with_capacity(segment.len());
            let mut chars = segment.chars().peekable();
            while let Some(c) = chars.next() {
                match chars.peek() {
                    Some(next) if (c == '_' || c == '-') && next.is_ascii_alphabetic() => {
                        out.push(next.to_ascii_uppercase());
                        chars.next();
                    }
                    _ => out.push(c),
                }
            }

            let mut chars = out.chars();
            let first = chars.next().unwrap_or_default();
            let first = match case_style {
                CaseStyle::Upper => first.to_ascii_uppercase(),
                CaseStyle::Lower => first.to_ascii_lowercase(),
                CaseStyle::Camel => first,
            };
            Ok(std::iter::once(first).chain(chars).collect())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    /// Exports the file's relative path, except for files named `empty.*`.
    struct PathSource;

    impl ModuleSource for PathSource {
        type Unit = String;

        fn load(&self, file: &ModuleFile) -> Result<Option<String>, BootstrapError> {
            if file.module_path().ends_with("empty") {
                return Ok(None);
            }
            Ok(Some(file.relative.clone()))
        }
    }

    fn write(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn camelize_follows_case_style() {
        assert_eq!(
            camelize("admin/user_role.rs", CaseStyle::Upper).unwrap(),
            vec!["Admin", "UserRole"]
        );
        assert_eq!(
            camelize("user-profile.rs", CaseStyle::Camel).unwrap(),
            vec!["userProfile"]
        );
        assert_eq!(camelize("Account.rs", CaseStyle::Lower).unwrap(), vec!["account"]);
        assert_eq!(camelize("sequelize.json", CaseStyle::Camel).unwrap(), vec!["sequelize"]);
        assert_eq!(camelize("v2_1.rs", CaseStyle::Upper).unwrap(), vec!["V2_1"]);
    }

    #[test]
    fn camelize_rejects_invalid_segments() {
        let err = camelize("1user.rs", CaseStyle::Upper).unwrap_err();
        assert!(err.contains("1user"));
        assert!(camelize("us er.rs", CaseStyle::Upper).is_err());
    }

    #[test]
    fn loads_matching_files_and_skips_excluded() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "user.rs");
        write(dir.path(), "admin/user_role.rs");
        write(dir.path(), "util/helper.rs");
        write(dir.path(), "README.md");
        write(dir.path(), "empty.rs");

        let source = PathSource;
        let mut target = BTreeMap::new();
        let written = Loader::new(dir.path(), &source)
            .matching(["**/*.rs"])
            .ignoring(["util/**"])
            .case_style(CaseStyle::Upper)
            .load(&mut target)
            .unwrap();

        assert_eq!(written, 2);
        assert_eq!(target.get("User").map(String::as_str), Some("user.rs"));
        assert_eq!(
            target.get("Admin.UserRole").map(String::as_str),
            Some("admin/user_role.rs")
        );
    }

    #[test]
    fn filter_and_initializer_hooks_apply() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.rs");
        write(dir.path(), "bb.rs");
        write(dir.path(), "ccc.rs");

        let source = PathSource;
        let mut seen = Vec::new();
        let mut target = BTreeMap::new();
        Loader::with_initializer(dir.path(), &source, |unit: String, _| Ok(unit.len()))
            .filter(|len| {
                let keep = *len > 4;
                if keep {
                    seen.push(*len);
                }
                keep
            })
            .load(&mut target)
            .unwrap();

        assert_eq!(seen, vec![5, 6]);
        assert_eq!(target.len(), 2);
        assert!(!target.contains_key("a"));
    }

    #[test]
    fn initializer_errors_propagate() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "broken.rs");

        let source = PathSource;
        let mut target: BTreeMap<String, String> = BTreeMap::new();
        let err = Loader::with_initializer(dir.path(), &source, |_, file| {
            Err(BootstrapError::load(&file.path, "factory exploded"))
        })
        .load(&mut target)
        .unwrap_err();

        assert!(err.to_string().contains("factory exploded"));
    }

    #[test]
    fn refuses_to_overwrite_existing_key() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "user.rs");

        let source = PathSource;
        let mut target = BTreeMap::new();
        target.insert("user".to_string(), "already".to_string());

        let err = Loader::new(dir.path(), &source).load(&mut target).unwrap_err();
        assert!(err.to_string().contains("can't overwrite property 'user'"));
    }

    #[test]
    fn missing_directory_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let source = PathSource;
        let mut target = BTreeMap::new();
        let written = Loader::new(dir.path().join("nope"), &source)
            .load(&mut target)
            .unwrap();
        assert_eq!(written, 0);
    }
}
