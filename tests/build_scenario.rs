// tests/build_scenario.rs

mod common;
use crate::common::{disk_context, init_tracing, write_tree, ConfigFileBuilder, TaskConfigBuilder};

use std::sync::Arc;

use assetpipe::config::{parse_str, ActionKind, ConfigFile};
use assetpipe::errors::AssetpipeError;
use assetpipe::fs::RealFileSystem;
use assetpipe::pipeline::{Pipeline, PipelineRunner};
use assetpipe::task::{Task, TaskRegistry};
use assetpipe::watch::tree_digest;
use assetpipe::Project;

/// Strip whitespace; a stand-in for a real minifier.
fn minify(src: &str) -> String {
    src.split_whitespace().collect()
}

#[tokio::test]
async fn js_is_minified_into_site_dir() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_tree(
        dir.path(),
        &[("js/script.js", "function hello ( ) {\n  return 1 ;\n}\n")],
    );

    let cfg = ConfigFileBuilder::new()
        .with_resource("js", &["js/script.js"], Some("build/js"))
        .with_task("clean", TaskConfigBuilder::action(ActionKind::Clean).build())
        .build();
    let ctx = disk_context(&cfg, dir.path());

    let mut registry = TaskRegistry::from_config(&cfg).unwrap();
    registry
        .register_fn("js", |ctx| {
            let res = ctx.paths().resource("js").expect("js resource");
            for src in ctx.paths().sources(ctx.fs(), "js")? {
                let out = res.output_path(ctx.root(), &src).expect("dest");
                let min = assetpipe::config::with_suffix(&out, ".min");
                let code = ctx.fs().read_to_string(&src)?;
                ctx.fs().write(&min, minify(&code).as_bytes())?;
            }
            Ok(())
        })
        .unwrap();
    registry
        .add_pipeline(Pipeline::new("build", vec!["clean".into(), "js".into()]))
        .unwrap();

    let summary = PipelineRunner::new(ctx)
        .run_unit(&registry, "build")
        .await
        .unwrap();
    assert_eq!(summary.steps, vec!["clean", "js"]);

    let out = std::fs::read_to_string(dir.path().join("build/js/script.min.js")).unwrap();
    assert_eq!(out, "functionhello(){return1;}");
}

#[cfg(unix)]
#[tokio::test]
async fn failing_command_aborts_and_names_the_task() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();

    let cfg = ConfigFile::try_from(
        parse_str(
            r#"
[task.style]
cmd = "echo 'broken sass' >&2; exit 1"

[task.sprite]
cmd = "touch sprite.done"

[task.html]
cmd = "touch html.done"

[pipeline.build]
steps = ["style", "sprite", "html"]
"#,
        )
        .unwrap(),
    )
    .unwrap();

    let project = Project::from_config(cfg, dir.path()).unwrap();
    let err = project.run_unit("build").await.unwrap_err();

    let chain = format!("{err:#}");
    let err = err
        .downcast_ref::<AssetpipeError>()
        .expect("assetpipe error");
    assert_eq!(err.failed_task(), Some("style"));
    assert!(chain.starts_with("Task 'style' failed: "), "{chain}");
    assert_eq!(chain.matches("exited with code 1").count(), 1, "{chain}");
    assert!(chain.ends_with("broken sass"), "{chain}");
    assert!(!dir.path().join("sprite.done").exists());
    assert!(!dir.path().join("html.done").exists());
}

const SITE: &str = r#"
[paths.html]
src = ["*.html"]
dest = "build"

[paths.style]
src = ["sass/style.scss"]
dest = "build/css"

[paths.img]
src = ["img/**/*.png"]

[task.clean]
action = "clean"

[task.html]
action = "include"
resource = "html"

[task.style]
action = "sass"
resource = "style"
suffix = ".min"

[task.copy]
action = "copy"
resources = ["img"]

[pipeline.build]
steps = ["clean", "copy", "html", "style"]
"#;

#[tokio::test]
async fn building_twice_yields_identical_trees() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    write_tree(
        dir.path(),
        &[
            ("index.html", "<html><body>@@include('partials/nav.html')</body></html>"),
            ("partials/nav.html", "<nav>home</nav>"),
            ("sass/style.scss", "@import 'vars';\nbody { color: $fg; }\n"),
            ("sass/_vars.scss", "$fg: #333;\n"),
            ("img/icons/logo.png", "not really a png"),
        ],
    );

    let cfg = ConfigFile::try_from(parse_str(SITE).unwrap()).unwrap();
    let project = Project::from_config(cfg, dir.path()).unwrap();
    let site = project.paths.site_dir().to_path_buf();

    project.run_unit("build").await.unwrap();
    let first = tree_digest(&RealFileSystem, &site).unwrap();

    project.run_unit("build").await.unwrap();
    let second = tree_digest(&RealFileSystem, &site).unwrap();

    assert_eq!(first, second);

    let html = std::fs::read_to_string(site.join("index.html")).unwrap();
    assert_eq!(html, "<html><body><nav>home</nav></body></html>");
    assert!(site.join("css/style.css").exists());
    assert!(site.join("css/style.min.css").exists());
    assert!(site.join("img/icons/logo.png").exists());
}

#[tokio::test]
async fn registry_lists_descriptions() {
    let cfg = ConfigFile::try_from(parse_str(SITE).unwrap()).unwrap();
    let registry = Arc::new(TaskRegistry::from_config(&cfg).unwrap());

    let described: Vec<(String, String)> = registry
        .tasks()
        .map(|(name, task)| (name.to_string(), task.describe()))
        .collect();
    assert_eq!(described.len(), 4);
    assert!(described.iter().any(|(n, d)| n == "style" && d.contains("sass")));
}
