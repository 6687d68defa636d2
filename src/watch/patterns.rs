// src/watch/patterns.rs

use std::fmt;
use std::path::PathBuf;

use anyhow::{Context, Result};
use globset::{GlobMatcher, GlobSet};

use crate::config::model::ConfigFile;
use crate::config::paths::{build_globset, compile_glob, normalize_pattern};
use crate::config::PathConfig;
use crate::fs::FileSystem;
use crate::types::UnitName;

/// A compiled `[watch.*]` table: which files to watch and which unit to run.
///
/// Effective patterns are the binding's own `patterns` followed by the
/// `watch` globs of its `resource`, if any. Patterns are matched against
/// root-relative paths with `/` separators.
#[derive(Clone)]
pub struct WatchBinding {
    name: String,
    target: UnitName,
    reload: bool,
    use_hash: bool,
    watch_set: GlobSet,
    exclude_set: Option<GlobSet>,
    /// Each effective pattern with its own matcher, for startup diagnostics.
    pattern_matchers: Vec<(String, GlobMatcher)>,
}

impl fmt::Debug for WatchBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchBinding")
            .field("name", &self.name)
            .field("target", &self.target)
            .field("reload", &self.reload)
            .field("use_hash", &self.use_hash)
            .finish_non_exhaustive()
    }
}

impl WatchBinding {
    pub fn new(
        name: impl Into<String>,
        target: impl Into<UnitName>,
        patterns: &[String],
        exclude: &[String],
        reload: bool,
        use_hash: bool,
    ) -> Result<Self> {
        let name = name.into();

        let watch_set = build_globset(patterns)
            .with_context(|| format!("building watch globset for binding '{name}'"))?;
        let exclude_set = if exclude.is_empty() {
            None
        } else {
            Some(
                build_globset(exclude)
                    .with_context(|| format!("building exclude globset for binding '{name}'"))?,
            )
        };
        let pattern_matchers = patterns
            .iter()
            .map(|p| Ok((p.clone(), compile_glob(p)?.compile_matcher())))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name,
            target: target.into(),
            reload,
            use_hash,
            watch_set,
            exclude_set,
            pattern_matchers,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Task or pipeline run when this binding fires.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn reload(&self) -> bool {
        self.reload
    }

    pub fn use_hash(&self) -> bool {
        self.use_hash
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.pattern_matchers.iter().map(|(p, _)| p.as_str())
    }

    /// Whether a root-relative path (e.g. `"sass/blocks/header.scss"`)
    /// should fire this binding.
    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.watch_set.is_match(rel_path) {
            return false;
        }
        !self
            .exclude_set
            .as_ref()
            .is_some_and(|ex| ex.is_match(rel_path))
    }
}

/// Compile every `[watch.*]` table of `cfg`, in name order.
pub fn build_bindings(cfg: &ConfigFile, paths: &PathConfig) -> Result<Vec<WatchBinding>> {
    let mut bindings = Vec::with_capacity(cfg.watches().len());

    for (name, wc) in cfg.watches() {
        let mut patterns = wc.patterns.clone();
        if let Some(key) = &wc.resource {
            let res = paths
                .resource(key)
                .with_context(|| format!("watch binding '{name}': unknown resource '{key}'"))?;
            patterns.extend(res.watch.iter().cloned());
        }

        bindings.push(WatchBinding::new(
            name.clone(),
            wc.run.clone(),
            &patterns,
            &wc.exclude,
            wc.reload,
            wc.use_hash,
        )?);
    }

    Ok(bindings)
}

/// All non-ignored files that currently fire `binding`. Used when hashing
/// `use_hash` bindings.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    paths: &PathConfig,
    binding: &WatchBinding,
) -> Result<Vec<PathBuf>> {
    paths.matching_files(fs, |rel| binding.matches(rel))
}

/// `(binding name, pattern)` for every pattern that matches no existing
/// file. These are reported as warnings at startup.
pub fn unmatched_patterns(
    fs: &dyn FileSystem,
    paths: &PathConfig,
    bindings: &[WatchBinding],
) -> Result<Vec<(String, String)>> {
    let files = paths.matching_files(fs, |_| true)?;
    let rels: Vec<String> = files
        .iter()
        .filter_map(|p| crate::fs::relative_slash(paths.root(), p))
        .collect();

    let mut missing = Vec::new();
    for binding in bindings {
        for (pattern, matcher) in &binding.pattern_matchers {
            if !rels.iter().any(|rel| matcher.is_match(rel)) {
                missing.push((binding.name.clone(), normalize_pattern(pattern).to_string()));
            }
        }
    }
    Ok(missing)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::config::parse_str;
    use crate::fs::MockFileSystem;

    const CONFIG: &str = r#"
[paths.style]
src = ["sass/style.scss"]
dest = "build/css"
watch = ["sass/**/*.{scss,sass}"]

[task.style]
action = "sass"
resource = "style"

[task.html]
cmd = "true"

[watch.style]
resource = "style"
run = "style"

[watch.html]
patterns = ["./*.html", "partials/*.html"]
exclude = ["partials/draft-*.html"]
run = "html"
reload = false
"#;

    fn setup() -> (ConfigFile, PathConfig) {
        let cfg = ConfigFile::try_from(parse_str(CONFIG).unwrap()).unwrap();
        let paths = PathConfig::from_config(&cfg, ".").unwrap();
        (cfg, paths)
    }

    #[test]
    fn resource_watch_globs_are_merged() {
        let (cfg, paths) = setup();
        let bindings = build_bindings(&cfg, &paths).unwrap();
        let style = bindings.iter().find(|b| b.name() == "style").unwrap();

        assert_eq!(style.target(), "style");
        assert!(style.reload());
        assert!(style.matches("sass/blocks/header.scss"));
        assert!(!style.matches("js/script.js"));
    }

    #[test]
    fn exclude_wins_over_watch() {
        let (cfg, paths) = setup();
        let bindings = build_bindings(&cfg, &paths).unwrap();
        let html = bindings.iter().find(|b| b.name() == "html").unwrap();

        assert!(html.matches("index.html"));
        assert!(html.matches("partials/header.html"));
        assert!(!html.matches("partials/draft-footer.html"));
        assert!(!html.reload());
    }

    #[test]
    fn reports_patterns_without_matches() {
        let (cfg, paths) = setup();
        let fs = MockFileSystem::new();
        fs.add_file("./index.html", "<html></html>");
        fs.add_file("./sass/style.scss", "a { color: red; }");

        let bindings = build_bindings(&cfg, &paths).unwrap();
        let missing = unmatched_patterns(&fs, &paths, &bindings).unwrap();
        assert_eq!(missing, vec![("html".to_string(), "partials/*.html".to_string())]);
    }

    #[test]
    fn collects_files_for_hashing() {
        let (cfg, paths) = setup();
        let fs = MockFileSystem::new();
        fs.add_file("./sass/style.scss", "a {}");
        fs.add_file("./sass/blocks/_nav.scss", "b {}");
        fs.add_file("./build/css/style.css", "a{}");

        let bindings = build_bindings(&cfg, &paths).unwrap();
        let style = bindings.iter().find(|b| b.name() == "style").unwrap();
        let files = collect_matching_files(&fs, &paths, style).unwrap();
        assert_eq!(
            files,
            vec![
                Path::new("./sass/blocks/_nav.scss").to_path_buf(),
                Path::new("./sass/style.scss").to_path_buf(),
            ]
        );
    }
}
