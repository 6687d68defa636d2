// src/task/builtin.rs

//! Built-in file plumbing actions.

use std::path::{Component, Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::config::model::{ActionKind, TaskConfig};
use crate::config::paths::{with_prefix, with_suffix};

use super::{Task, TaskContext, TaskFuture};

/// `@@include('path')` / `@@include("path")`, resolved relative to the
/// including file.
static INCLUDE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@@include\(\s*['"]([^'"]+)['"]\s*\)"#).expect("include regex is valid")
});

/// Nested includes deeper than this are treated as a runaway.
const MAX_INCLUDE_DEPTH: usize = 32;

/// A task backed by one of the built-in [`ActionKind`]s.
///
/// The config has already been validated, so required keys are present;
/// accessors still fail with an error instead of panicking.
#[derive(Debug, Clone)]
pub struct BuiltinTask {
    name: String,
    kind: ActionKind,
    cfg: TaskConfig,
}

impl BuiltinTask {
    pub fn new(name: impl Into<String>, kind: ActionKind, cfg: TaskConfig) -> Self {
        Self {
            name: name.into(),
            kind,
            cfg,
        }
    }

    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    fn resource_key(&self) -> Result<&str> {
        self.cfg
            .resource
            .as_deref()
            .ok_or_else(|| anyhow!("task '{}' has no resource", self.name))
    }

    fn run_blocking(&self, ctx: &TaskContext) -> Result<()> {
        match self.kind {
            ActionKind::Clean => self.clean(ctx),
            ActionKind::Copy => self.copy(ctx),
            ActionKind::Include => self.include(ctx),
            ActionKind::Sass => self.sass(ctx),
            ActionKind::RenamePrefix => self.rename_prefix(ctx),
        }
    }

    fn clean(&self, ctx: &TaskContext) -> Result<()> {
        let dir = match &self.cfg.dir {
            Some(d) => ctx.root().join(d),
            None => ctx.paths().site_dir().to_path_buf(),
        };
        if !is_strictly_inside(ctx.root(), &dir) {
            bail!("refusing to clean {:?}: not inside the project root", dir);
        }
        info!(task = %self.name, dir = ?dir, "removing output directory");
        ctx.fs().remove_dir_all(&dir)
    }

    fn copy(&self, ctx: &TaskContext) -> Result<()> {
        let site = ctx.paths().site_dir();
        let mut copied = 0usize;
        for key in self.cfg.resources.iter() {
            for src in ctx.paths().sources(ctx.fs(), key)? {
                let Ok(rel) = src.strip_prefix(ctx.root()) else {
                    continue;
                };
                let bytes = ctx.fs().read(&src)?;
                ctx.fs().write(&site.join(rel), &bytes)?;
                copied += 1;
            }
        }
        info!(task = %self.name, files = copied, "copied files into site dir");
        Ok(())
    }

    fn outputs_for(&self, ctx: &TaskContext, src: &Path) -> Result<PathBuf> {
        let key = self.resource_key()?;
        let res = ctx
            .paths()
            .resource(key)
            .ok_or_else(|| anyhow!("unknown resource '{key}'"))?;
        res.output_path(ctx.root(), src)
            .ok_or_else(|| anyhow!("cannot place {:?} in the dest of '{key}'", src))
    }

    fn include(&self, ctx: &TaskContext) -> Result<()> {
        let sources = ctx.paths().sources(ctx.fs(), self.resource_key()?)?;
        for src in sources.iter() {
            let mut stack = Vec::new();
            let expanded = expand_includes(ctx, src, &mut stack)?;
            let out = self.outputs_for(ctx, src)?;
            ctx.fs().write(&out, expanded.as_bytes())?;
            if let Some(suffix) = &self.cfg.suffix {
                ctx.fs().write(&with_suffix(&out, suffix), expanded.as_bytes())?;
            }
            debug!(task = %self.name, src = ?src, out = ?out, "expanded includes");
        }
        info!(task = %self.name, files = sources.len(), "include pass finished");
        Ok(())
    }

    fn sass(&self, ctx: &TaskContext) -> Result<()> {
        let sources = ctx.paths().sources(ctx.fs(), self.resource_key()?)?;
        let mut compiled = 0usize;
        for src in sources.iter() {
            let is_partial = src
                .file_name()
                .map(|n| n.to_string_lossy().starts_with('_'))
                .unwrap_or(false);
            if is_partial {
                continue;
            }

            let input = ctx.fs().read_to_string(src)?;
            let load_path = src.parent().unwrap_or(ctx.root()).to_path_buf();
            let out = self.outputs_for(ctx, src)?.with_extension("css");

            let expanded = compile_sass(&input, src, &load_path, grass::OutputStyle::Expanded)
                .with_context(|| format!("compiling {:?}", src))?;
            ctx.fs().write(&out, expanded.as_bytes())?;

            if let Some(suffix) = &self.cfg.suffix {
                let compressed =
                    compile_sass(&input, src, &load_path, grass::OutputStyle::Compressed)
                        .with_context(|| format!("compiling {:?}", src))?;
                ctx.fs().write(&with_suffix(&out, suffix), compressed.as_bytes())?;
            }
            compiled += 1;
        }
        info!(task = %self.name, files = compiled, "compiled stylesheets");
        Ok(())
    }

    fn rename_prefix(&self, ctx: &TaskContext) -> Result<()> {
        let prefix = self
            .cfg
            .prefix
            .as_deref()
            .ok_or_else(|| anyhow!("task '{}' has no prefix", self.name))?;
        let sources = ctx.paths().sources(ctx.fs(), self.resource_key()?)?;

        let mut renamed = 0usize;
        for src in sources {
            let already = src
                .file_name()
                .map(|n| n.to_string_lossy().starts_with(prefix))
                .unwrap_or(true);
            if already {
                continue;
            }
            let to = with_prefix(&src, prefix);
            if ctx.fs().exists(&to) {
                bail!("cannot rename {:?}: {:?} already exists", src, to);
            }
            ctx.fs().rename(&src, &to)?;
            renamed += 1;
        }
        info!(task = %self.name, files = renamed, "renamed files in place");
        Ok(())
    }
}

/// `path` lies below `root` without climbing out through `..`.
fn is_strictly_inside(root: &Path, path: &Path) -> bool {
    match path.strip_prefix(root) {
        Ok(rel) => {
            rel.components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
                && rel.components().any(|c| matches!(c, Component::Normal(_)))
        }
        Err(_) => false,
    }
}

/// Indented syntax for `.sass` files, SCSS for everything else.
fn input_syntax(src: &Path) -> grass::InputSyntax {
    match src.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("sass") => grass::InputSyntax::Sass,
        Some(ext) if ext.eq_ignore_ascii_case("css") => grass::InputSyntax::Css,
        _ => grass::InputSyntax::Scss,
    }
}

fn compile_sass(
    input: &str,
    src: &Path,
    load_path: &Path,
    style: grass::OutputStyle,
) -> Result<String> {
    let options = grass::Options::default()
        .style(style)
        .input_syntax(input_syntax(src))
        .load_path(load_path);
    grass::from_string(input.to_string(), &options).map_err(|e| anyhow!("{e}"))
}

/// Expand `@@include(...)` directives in `path`, recursively.
///
/// `stack` holds the files currently being expanded; seeing one again is
/// an include cycle.
pub fn expand_includes(ctx: &TaskContext, path: &Path, stack: &mut Vec<PathBuf>) -> Result<String> {
    if stack.iter().any(|p| p == path) {
        bail!("include cycle: {:?} includes itself via {:?}", path, stack);
    }
    if stack.len() >= MAX_INCLUDE_DEPTH {
        bail!("includes nested deeper than {MAX_INCLUDE_DEPTH} at {:?}", path);
    }

    let text = ctx.fs().read_to_string(path)?;
    let dir = path.parent().unwrap_or(ctx.root()).to_path_buf();

    stack.push(path.to_path_buf());
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for caps in INCLUDE_RE.captures_iter(&text) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&text[last..whole.start()]);
        let target = dir.join(&caps[1]);
        let nested = expand_includes(ctx, &target, stack)
            .with_context(|| format!("included from {:?}", path))?;
        out.push_str(&nested);
        last = whole.end();
    }
    out.push_str(&text[last..]);
    stack.pop();

    Ok(out)
}

impl Task for BuiltinTask {
    fn run<'a>(&'a self, ctx: &'a TaskContext) -> TaskFuture<'a> {
        let this = self.clone();
        let ctx = ctx.clone();
        Box::pin(async move {
            tokio::task::spawn_blocking(move || this.run_blocking(&ctx))
                .await
                .context("builtin action panicked")?
        })
    }

    fn describe(&self) -> String {
        let mut s = format!("action: {}", self.kind.as_str());
        if let Some(r) = &self.cfg.resource {
            s.push_str(&format!(" resource={r}"));
        }
        if !self.cfg.resources.is_empty() {
            s.push_str(&format!(" resources={:?}", self.cfg.resources));
        }
        if let Some(x) = &self.cfg.suffix {
            s.push_str(&format!(" suffix={x}"));
        }
        if let Some(x) = &self.cfg.prefix {
            s.push_str(&format!(" prefix={x}"));
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{parse_str, ConfigFile, PathConfig};
    use crate::fs::mock::MockFileSystem;
    use crate::fs::FileSystem;

    const CONFIG: &str = r#"
[config]
site = "build"

[paths.html]
src = ["*.html"]
dest = "build"

[paths.js]
src = ["js/script.js"]
dest = "build/js"

[paths.img]
src = ["img/**/*.*"]

[paths.fonts]
src = ["fonts/**/*.*"]

[paths.originals]
src = ["original-img/*.jpg"]

[paths.style]
src = ["sass/*.{scss,sass}"]
dest = "build/css"

[task.clean]
action = "clean"
"#;

    fn mock_ctx() -> (MockFileSystem, TaskContext) {
        let cfg = ConfigFile::try_from(parse_str(CONFIG).unwrap()).unwrap();
        let paths = PathConfig::from_config(&cfg, ".").unwrap();
        let fs = MockFileSystem::new();
        let ctx = TaskContext::new(Arc::new(paths), Arc::new(fs.clone()));
        (fs, ctx)
    }

    fn task(kind: ActionKind, cfg: TaskConfig) -> BuiltinTask {
        BuiltinTask::new(kind.as_str(), kind, cfg)
    }

    #[tokio::test]
    async fn clean_removes_site_dir_only() {
        let (fs, ctx) = mock_ctx();
        fs.add_file("./build/index.html", "old");
        fs.add_file("./index.html", "src");

        task(ActionKind::Clean, TaskConfig::default())
            .run(&ctx)
            .await
            .unwrap();

        assert_eq!(fs.file_paths(), vec![PathBuf::from("./index.html")]);
    }

    #[tokio::test]
    async fn copy_keeps_paths_relative_to_root() {
        let (fs, ctx) = mock_ctx();
        fs.add_file("./img/icons/a.png", "png");
        fs.add_file("./fonts/x.woff2", "font");
        fs.add_file("./build/img/stale.png", "stale");

        let cfg = TaskConfig {
            resources: vec!["img".into(), "fonts".into()],
            ..TaskConfig::default()
        };
        task(ActionKind::Copy, cfg).run(&ctx).await.unwrap();

        assert_eq!(fs.read(Path::new("./build/img/icons/a.png")).unwrap(), b"png");
        assert_eq!(fs.read(Path::new("./build/fonts/x.woff2")).unwrap(), b"font");
    }

    #[tokio::test]
    async fn include_expands_nested_and_writes_suffixed_copy() {
        let (fs, ctx) = mock_ctx();
        fs.add_file(
            "./index.html",
            "<body>@@include('partials/header.html')</body>",
        );
        fs.add_file("./partials/header.html", "<h1>@@include(\"title.txt\")</h1>");
        fs.add_file("./partials/title.txt", "Hi");

        let cfg = TaskConfig {
            resource: Some("html".into()),
            suffix: Some(".min".into()),
            ..TaskConfig::default()
        };
        task(ActionKind::Include, cfg).run(&ctx).await.unwrap();

        let expected = "<body><h1>Hi</h1></body>";
        assert_eq!(
            fs.read_to_string(Path::new("./build/index.html")).unwrap(),
            expected
        );
        assert_eq!(
            fs.read_to_string(Path::new("./build/index.min.html")).unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn include_cycle_is_an_error() {
        let (fs, ctx) = mock_ctx();
        fs.add_file("./index.html", "@@include('a.html')");
        fs.add_file("./a.html", "@@include('index.html')");

        let cfg = TaskConfig {
            resource: Some("html".into()),
            ..TaskConfig::default()
        };
        let err = task(ActionKind::Include, cfg).run(&ctx).await.unwrap_err();
        assert!(format!("{err:#}").contains("include cycle"), "{err:#}");
    }

    #[tokio::test]
    async fn literal_source_lands_in_dest_by_file_name() {
        let (fs, ctx) = mock_ctx();
        fs.add_file("./js/script.js", "console.log(1);");

        let cfg = TaskConfig {
            resource: Some("js".into()),
            suffix: Some(".min".into()),
            ..TaskConfig::default()
        };
        task(ActionKind::Include, cfg).run(&ctx).await.unwrap();

        assert!(fs.is_file(Path::new("./build/js/script.js")));
        assert!(fs.is_file(Path::new("./build/js/script.min.js")));
    }

    #[tokio::test]
    async fn sass_writes_expanded_and_compressed_css() {
        let (fs, ctx) = mock_ctx();
        fs.add_file("./sass/style.scss", "$c: red;\na { b { color: $c; } }\n");

        let cfg = TaskConfig {
            resource: Some("style".into()),
            suffix: Some(".min".into()),
            ..TaskConfig::default()
        };
        task(ActionKind::Sass, cfg).run(&ctx).await.unwrap();

        let css = fs.read_to_string(Path::new("./build/css/style.css")).unwrap();
        assert!(css.contains("a b {"), "{css}");
        let min = fs
            .read_to_string(Path::new("./build/css/style.min.css"))
            .unwrap();
        assert!(min.trim_end().ends_with("a b{color:red}"), "{min}");
    }

    #[tokio::test]
    async fn sass_indented_syntax_compiles() {
        let (fs, ctx) = mock_ctx();
        fs.add_file("./sass/style.sass", "$c: red\na\n  color: $c\n");

        let cfg = TaskConfig {
            resource: Some("style".into()),
            ..TaskConfig::default()
        };
        task(ActionKind::Sass, cfg).run(&ctx).await.unwrap();

        let css = fs.read_to_string(Path::new("./build/css/style.css")).unwrap();
        assert!(css.contains("color: red"), "{css}");
    }

    #[tokio::test]
    async fn sass_syntax_error_fails_the_task() {
        let (fs, ctx) = mock_ctx();
        fs.add_file("./sass/style.scss", "a { color: ");

        let cfg = TaskConfig {
            resource: Some("style".into()),
            ..TaskConfig::default()
        };
        assert!(task(ActionKind::Sass, cfg).run(&ctx).await.is_err());
    }

    #[tokio::test]
    async fn rename_prefix_renames_in_place_and_skips_prefixed() {
        let (fs, ctx) = mock_ctx();
        fs.add_file("./original-img/cat.jpg", "cat");
        fs.add_file("./original-img/webp-dog.jpg", "dog");

        let cfg = TaskConfig {
            resource: Some("originals".into()),
            prefix: Some("webp-".into()),
            ..TaskConfig::default()
        };
        task(ActionKind::RenamePrefix, cfg).run(&ctx).await.unwrap();

        assert_eq!(
            fs.file_paths(),
            vec![
                PathBuf::from("./original-img/webp-cat.jpg"),
                PathBuf::from("./original-img/webp-dog.jpg"),
            ]
        );
    }

    fn disk_project(site: &str) -> (tempfile::TempDir, TaskContext) {
        let tmp = tempfile::tempdir().unwrap();
        let proj = tmp.path().join("proj");
        std::fs::create_dir_all(&proj).unwrap();
        std::fs::create_dir_all(tmp.path().join("precious")).unwrap();
        std::fs::write(tmp.path().join("precious/keep.txt"), "keep").unwrap();

        let toml = format!(
            "[config]\nsite = \"{site}\"\n\n[task.clean]\naction = \"clean\"\n"
        );
        let cfg = ConfigFile::try_from(parse_str(&toml).unwrap()).unwrap();
        let paths = PathConfig::from_config(&cfg, &proj).unwrap();
        (tmp, TaskContext::real(Arc::new(paths)))
    }

    #[tokio::test]
    async fn clean_refuses_a_dir_that_climbs_out_of_the_root() {
        let (tmp, ctx) = disk_project("build");

        let cfg = TaskConfig {
            dir: Some("../precious".into()),
            ..TaskConfig::default()
        };
        let err = task(ActionKind::Clean, cfg).run(&ctx).await.unwrap_err();

        assert!(format!("{err:#}").contains("not inside the project root"), "{err:#}");
        assert!(tmp.path().join("precious/keep.txt").is_file());
    }

    #[tokio::test]
    async fn clean_refuses_a_site_dir_outside_the_root() {
        let (tmp, ctx) = disk_project("../precious");

        let err = task(ActionKind::Clean, TaskConfig::default())
            .run(&ctx)
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("not inside the project root"), "{err:#}");
        assert!(tmp.path().join("precious/keep.txt").is_file());
    }

    #[tokio::test]
    async fn clean_refuses_the_root_itself() {
        let (tmp, ctx) = disk_project("build");

        let cfg = TaskConfig {
            dir: Some(".".into()),
            ..TaskConfig::default()
        };
        assert!(task(ActionKind::Clean, cfg).run(&ctx).await.is_err());
        assert!(tmp.path().join("proj").is_dir());
    }
}
