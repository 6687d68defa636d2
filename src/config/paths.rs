// src/config/paths.rs

//! Immutable path configuration handed to every task.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use globset::{Glob, GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::config::model::ConfigFile;
use crate::fs::{relative_slash, walk_files, FileSystem};

/// Source, output and watch locations of one logical resource.
#[derive(Debug, Clone)]
pub struct ResourcePaths {
    pub src: Vec<String>,
    pub dest: Option<PathBuf>,
    pub watch: Vec<String>,
    src_set: GlobSet,
    /// Normalized pattern text with its own matcher, in declaration order.
    src_matchers: Vec<(String, GlobMatcher)>,
}

impl ResourcePaths {
    /// Whether `rel_path` (relative to the project root) is one of this
    /// resource's sources.
    pub fn is_source(&self, rel_path: &str) -> bool {
        self.src_set.is_match(rel_path)
    }

    /// Where a source file lands in `dest`: its path relative to the static
    /// base of the first `src` pattern that matches it (so `js/script.js`
    /// from `js/*.js` becomes `<dest>/script.js`). A literal pattern keeps
    /// only the file name.
    pub fn output_path(&self, root: &Path, source: &Path) -> Option<PathBuf> {
        let dest = self.dest.as_ref()?;
        let rel = relative_slash(root, source)?;
        let (pattern, _) = self.src_matchers.iter().find(|(_, m)| m.is_match(&rel))?;

        let base = glob_base(pattern);
        let out_rel = if base == pattern.as_str() {
            PathBuf::from(source.file_name()?)
        } else if base.is_empty() {
            PathBuf::from(&rel)
        } else {
            PathBuf::from(rel.strip_prefix(base)?.trim_start_matches('/'))
        };
        Some(dest.join(out_rel))
    }
}

/// Leading directories of a glob pattern that contain no glob syntax.
///
/// `img/**/*.png` -> `img`, `*.html` -> ``, `js/script.js` -> `js/script.js`.
pub fn glob_base(pattern: &str) -> &str {
    let meta = pattern.find(['*', '?', '[', '{']);
    match meta {
        None => pattern,
        Some(idx) => match pattern[..idx].rfind('/') {
            Some(slash) => &pattern[..slash],
            None => "",
        },
    }
}

/// Path configuration for one project.
///
/// Created once from the config file and shared (behind an `Arc`) by every
/// task invocation. Never mutated.
#[derive(Debug, Clone)]
pub struct PathConfig {
    root: PathBuf,
    site: PathBuf,
    resources: BTreeMap<String, ResourcePaths>,
    ignore: GlobSet,
}

impl PathConfig {
    /// Build the path configuration for a project rooted at `root`.
    pub fn from_config(cfg: &ConfigFile, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let section = cfg.config_section();

        let mut resources = BTreeMap::new();
        for (key, rc) in cfg.paths() {
            let src_set = build_globset(&rc.src)
                .with_context(|| format!("building source globset for resource '{key}'"))?;
            let src_matchers = rc
                .src
                .iter()
                .map(|pat| {
                    let matcher = compile_glob(pat)?.compile_matcher();
                    Ok((normalize_pattern(pat).to_string(), matcher))
                })
                .collect::<Result<Vec<_>>>()?;
            resources.insert(
                key.clone(),
                ResourcePaths {
                    src: rc.src.clone(),
                    dest: rc.dest.as_ref().map(|d| root.join(d)),
                    watch: rc.watch.clone(),
                    src_set,
                    src_matchers,
                },
            );
        }

        let ignore = build_globset(&section.ignore).context("building ignore globset")?;

        Ok(Self {
            site: root.join(&section.site),
            root,
            resources,
            ignore,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Output root (`[config].site`), as an absolute or root-joined path.
    pub fn site_dir(&self) -> &Path {
        &self.site
    }

    pub fn resource(&self, key: &str) -> Option<&ResourcePaths> {
        self.resources.get(key)
    }

    pub fn resources(&self) -> impl Iterator<Item = (&str, &ResourcePaths)> {
        self.resources.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Whether a root-relative path must never be treated as a source or
    /// watched: anything in the site dir or matching `[config].ignore`.
    pub fn is_ignored(&self, rel_path: &str) -> bool {
        if self.ignore.is_match(rel_path) {
            return true;
        }
        match relative_slash(&self.root, &self.site) {
            Some(site) if !site.is_empty() => {
                rel_path == site || rel_path.starts_with(&format!("{site}/"))
            }
            _ => false,
        }
    }

    /// All files under the project root that are sources of resource `key`.
    pub fn sources(&self, fs: &dyn FileSystem, key: &str) -> Result<Vec<PathBuf>> {
        let res = self
            .resource(key)
            .with_context(|| format!("unknown resource '{key}'"))?;
        self.matching_files(fs, |rel| res.is_source(rel))
    }

    /// All non-ignored files under the project root whose relative path
    /// satisfies `pred`.
    pub fn matching_files(
        &self,
        fs: &dyn FileSystem,
        pred: impl Fn(&str) -> bool,
    ) -> Result<Vec<PathBuf>> {
        let skip_dir = |dir: &Path| {
            relative_slash(&self.root, dir)
                .map(|rel| self.is_ignored(&rel))
                .unwrap_or(false)
        };

        let files = walk_files(fs, &self.root, &skip_dir)?;
        Ok(files
            .into_iter()
            .filter(|p| {
                relative_slash(&self.root, p)
                    .map(|rel| !self.is_ignored(&rel) && pred(&rel))
                    .unwrap_or(false)
            })
            .collect())
    }
}

/// Strip a leading `./` so that gulp-style patterns match root-relative paths.
pub fn normalize_pattern(pattern: &str) -> &str {
    pattern.trim_start_matches("./")
}

/// Compile patterns into a `GlobSet` where `*` never crosses a `/` and `**`
/// does.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(compile_glob(pat)?);
    }
    Ok(builder.build()?)
}

pub(crate) fn compile_glob(pattern: &str) -> Result<Glob> {
    GlobBuilder::new(normalize_pattern(pattern))
        .literal_separator(true)
        .build()
        .with_context(|| format!("invalid glob pattern: {pattern}"))
}

/// `script.js` + `.min` -> `script.min.js`. Files without an extension get
/// the suffix appended.
pub fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{stem}{suffix}.{}", ext.to_string_lossy()),
        None => format!("{stem}{suffix}"),
    };
    path.with_file_name(name)
}

/// `a.jpg` + `webp-` -> `webp-a.jpg`.
pub fn with_prefix(path: &Path, prefix: &str) -> PathBuf {
    let name = path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{prefix}{name}"))
}
