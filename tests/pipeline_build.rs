// tests/pipeline_build.rs

use std::fs;
use std::path::Path;
use std::sync::Arc;

use assetdag::config::load_and_validate;
use assetdag::errors::BuildError;
use assetdag::fs::RealFileSystem;
use assetdag::pipeline::{build_registry, PipelineContext};
use assetdag_test_utils::{init_tracing, with_timeout};

const CONFIG: &str = r#"
[paths]
src = "src"
dist = "dist"

[libs]
styles = ["vendor/normalize.css"]
scripts = ["vendor/lib.js"]

[task.clean]
kind = "clean"

[task.styles]
kind = "styles"
src = ["styles/main.scss"]
output = "assets/css/main-min.css"

[task.scripts]
kind = "scripts"
src = ["assets/js/*.js"]
output = "assets/js/main-min.js"

[task.icons]
kind = "icons"
src = "assets/svg/*.svg"
output = "assets/icons/symbol_sprite.html"
sprite_width = "50px"

[task."copy:img"]
kind = "copy"
src = "assets/img/**/*"
dest = "assets/img"

[task.build]
kind = "parallel"
tasks = ["styles", "scripts", "icons", "copy:img"]

[task.default]
kind = "sequence"
tasks = ["clean", "build"]
"#;

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap_or_else(|e| panic!("{rel}: {e}"))
}

fn project(config: &str) -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "Assetdag.toml", config);
    write(root, "vendor/normalize.css", "html { line-height: 1.15; }");
    write(root, "vendor/lib.js", "var lib = 1;");
    write(root, "src/styles/main.scss", "@import \"blocks/*.scss\";\nbody { margin: 0; }");
    write(root, "src/styles/blocks/header.scss", ".header {}");
    write(root, "src/assets/js/a.js", "console.log('a');");
    write(root, "src/assets/js/b.js", "console.log('b');");
    write(
        root,
        "src/assets/svg/logo.svg",
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" viewBox="0 0 10 10"><path d="M0 0"/></svg>"#,
    );
    write(root, "src/assets/img/photos/cat.png", "png-bytes");
    write(root, "dist/stale.html", "old");
    dir
}

async fn run_task(root: &Path, task: &str) -> assetdag::errors::Result<()> {
    let cfg = load_and_validate(root.join("Assetdag.toml"))?;
    let ctx = PipelineContext::new(root, Arc::new(RealFileSystem));
    let registry = build_registry(&cfg, &ctx)?;
    with_timeout(registry.run(task)).await
}

#[tokio::test]
async fn default_sequence_cleans_then_builds_every_asset() {
    init_tracing();
    let dir = project(CONFIG);
    let root = dir.path();

    run_task(root, "default").await.unwrap();

    assert!(!root.join("dist/stale.html").exists());

    assert_eq!(
        read(root, "dist/assets/css/main-min.css"),
        "html { line-height: 1.15; }\n@import \"blocks/header.scss\";\nbody { margin: 0; }"
    );
    assert_eq!(
        read(root, "dist/assets/js/main-min.js"),
        "var lib = 1;\nconsole.log('a');\nconsole.log('b');"
    );

    let sprite = read(root, "dist/assets/icons/symbol_sprite.html");
    assert!(sprite.starts_with("<?xml"));
    assert!(sprite.contains(r#"width="50px""#));
    assert!(sprite.contains(r#"<symbol id="icon-logo" viewBox="0 0 10 10">"#));

    assert_eq!(read(root, "dist/assets/img/photos/cat.png"), "png-bytes");
}

#[tokio::test]
async fn a_single_leaf_task_can_be_run_alone() {
    let dir = project(CONFIG);
    let root = dir.path();

    run_task(root, "scripts").await.unwrap();

    assert!(root.join("dist/assets/js/main-min.js").exists());
    assert!(root.join("dist/stale.html").exists());
    assert!(!root.join("dist/assets/css").exists());
}

#[tokio::test]
async fn broken_icon_fails_the_build_with_its_path() {
    let dir = project(CONFIG);
    let root = dir.path();
    write(root, "src/assets/svg/broken.svg", "<not-svg/>");

    let err = run_task(root, "default").await.unwrap_err();

    match err {
        BuildError::Transform { task, path, .. } => {
            assert_eq!(task, "icons");
            assert!(path.ends_with("broken.svg"), "{}", path.display());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // Parallel siblings still completed.
    assert!(root.join("dist/assets/js/main-min.js").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn external_tools_and_commands_run_from_the_project_root() {
    let config = r#"
[task.styles]
kind = "styles"
src = ["styles/main.scss"]
output = "assets/css/main-min.css"
cmd = "tr a-z A-Z"

[task.stamp]
kind = "command"
cmd = "echo built > {dist}/stamp.txt"

[task.default]
kind = "sequence"
tasks = ["styles", "stamp"]
"#;
    let dir = project(config);
    let root = dir.path();

    run_task(root, "default").await.unwrap();

    assert_eq!(
        read(root, "dist/assets/css/main-min.css"),
        "@IMPORT \"BLOCKS/HEADER.SCSS\";\nBODY { MARGIN: 0; }"
    );
    assert_eq!(read(root, "dist/stamp.txt").trim(), "built");
}

#[cfg(unix)]
#[tokio::test]
async fn failing_tool_reports_a_transform_error() {
    let config = r#"
[task.styles]
kind = "styles"
src = ["styles/main.scss"]
output = "assets/css/main-min.css"
cmd = "echo 'Invalid CSS after body' >&2; exit 1"
"#;
    let dir = project(config);
    let root = dir.path();

    let err = run_task(root, "styles").await.unwrap_err();

    match err {
        BuildError::Transform { task, message, .. } => {
            assert_eq!(task, "styles");
            assert!(message.contains("Invalid CSS"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!root.join("dist/assets/css/main-min.css").exists());
}

#[cfg(unix)]
#[tokio::test]
async fn page_file_names_reach_the_template_tool_as_one_argument() {
    let config = r#"
[task."compile:pug"]
kind = "templates"
src = "pages/*.pug"
cmd = "cat {input}"
"#;
    let dir = project(config);
    let root = dir.path();
    write(root, "src/pages/about us.pug", "<h1>about</h1>");
    write(root, "src/pages/it's.pug", "<h1>quote</h1>");
    write(root, "src/pages/$(touch pwned).pug", "<h1>dollar</h1>");

    run_task(root, "compile:pug").await.unwrap();

    assert_eq!(read(root, "dist/about us.html"), "<h1>about</h1>");
    assert_eq!(read(root, "dist/it's.html"), "<h1>quote</h1>");
    assert_eq!(read(root, "dist/$(touch pwned).html"), "<h1>dollar</h1>");
    assert!(!root.join("pwned").exists());
}
