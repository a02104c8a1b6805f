// tests/config_validation.rs

use std::path::PathBuf;

use assetdag::config::{load_and_validate, load_from_path, TaskConfig};
use assetdag::errors::BuildError;
use assetdag::types::ReloadKind;
use assetdag::watch::bindings_from_config;
use assetdag_test_utils::ConfigFileBuilder;

fn write_config(contents: &str) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Assetdag.toml");
    std::fs::write(&path, contents).unwrap();
    (dir, path)
}

fn icons(strip_attrs: &str) -> TaskConfig {
    TaskConfig::Icons {
        src: "assets/svg/*.svg".into(),
        output: "assets/img/sprite.svg".into(),
        strip_attrs: strip_attrs.into(),
        id_prefix: "icon-".into(),
        sprite_width: None,
    }
}

#[test]
fn composite_cycle_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_command("leaf", "true")
        .with_sequence("a", &["leaf", "b"])
        .with_parallel("b", &["a"])
        .try_build()
        .unwrap_err();
    assert!(matches!(err, BuildError::DagCycle(_)), "{err:?}");
}

#[test]
fn composite_including_itself_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_sequence("loop", &["loop"])
        .try_build()
        .unwrap_err();
    assert!(matches!(err, BuildError::ConfigError(ref m) if m.contains("itself")));
}

#[test]
fn unknown_child_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_command("clean", "true")
        .with_sequence("default", &["clean", "styles"])
        .try_build()
        .unwrap_err();
    assert!(matches!(err, BuildError::ConfigError(ref m) if m.contains("'styles'")));
}

#[test]
fn binding_with_unknown_or_no_tasks_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_command("styles", "true")
        .with_binding("src/**/*.scss", &["stylez"], ReloadKind::Inject)
        .try_build()
        .unwrap_err();
    assert!(matches!(err, BuildError::ConfigError(ref m) if m.contains("stylez")));

    let err = ConfigFileBuilder::new()
        .with_command("styles", "true")
        .with_binding("src/**/*.scss", &[], ReloadKind::Inject)
        .try_build()
        .unwrap_err();
    assert!(matches!(err, BuildError::ConfigError(_)));
}

#[test]
fn empty_config_is_rejected() {
    let err = ConfigFileBuilder::new().try_build().unwrap_err();
    assert!(matches!(err, BuildError::ConfigError(_)));
}

fn paths_error(src: &str, dist: &str) -> Option<BuildError> {
    ConfigFileBuilder::new()
        .with_paths(src, dist)
        .with_task("clean", TaskConfig::Clean)
        .try_build()
        .err()
}

#[test]
fn aliases_of_the_source_tree_are_rejected_as_dist() {
    for (src, dist) in [
        ("site", "site/"),
        ("./src", "src"),
        ("src", "./src/"),
        ("src", "src/."),
        ("src", "/src"),
    ] {
        let err = paths_error(src, dist);
        assert!(
            matches!(err, Some(BuildError::ConfigError(ref m)) if m.contains("overlap")),
            "src={src:?} dist={dist:?}: {err:?}"
        );
    }
}

#[test]
fn dist_may_not_contain_or_sit_inside_src() {
    for (src, dist) in [("src", "src/dist"), ("public/src", "public"), ("a/b", "a")] {
        assert!(
            matches!(paths_error(src, dist), Some(BuildError::ConfigError(_))),
            "src={src:?} dist={dist:?}"
        );
    }
}

#[test]
fn project_root_and_outside_paths_are_rejected() {
    for dist in [".", "./", "", "/", "../out", "build/../.."] {
        assert!(
            matches!(paths_error("src", dist), Some(BuildError::ConfigError(_))),
            "dist={dist:?}"
        );
    }
    assert!(matches!(paths_error(".", "dist"), Some(BuildError::ConfigError(_))));
}

#[test]
fn sibling_directories_are_accepted() {
    for (src, dist) in [("src", "dist"), ("./src", "./dist"), ("site/src", "site/dist"), ("src", "srcdist")] {
        assert!(paths_error(src, dist).is_none(), "src={src:?} dist={dist:?}");
    }
}

#[test]
fn overlapping_paths_stop_the_config_before_clean_can_run() {
    let (dir, path) = write_config(
        r#"
[paths]
src = "./src"
dist = "src"

[task.clean]
kind = "clean"
"#,
    );
    std::fs::create_dir_all(dir.path().join("src/pages")).unwrap();
    std::fs::write(dir.path().join("src/pages/index.pug"), "p hi").unwrap();

    assert!(load_and_validate(&path).is_err());
    assert!(dir.path().join("src/pages/index.pug").exists());
}

#[test]
fn invalid_strip_attrs_regex_is_rejected() {
    let err = ConfigFileBuilder::new()
        .with_task("icons", icons("^(width"))
        .try_build()
        .unwrap_err();
    assert!(matches!(err, BuildError::ConfigError(ref m) if m.contains("strip_attrs")));

    ConfigFileBuilder::new()
        .with_task("icons", icons("^(width|height)$"))
        .build();
}

#[test]
fn registration_order_puts_children_first() {
    let cfg = ConfigFileBuilder::new()
        .with_sequence("default", &["clean", "build", "serve"])
        .with_parallel("build", &["styles", "scripts"])
        .with_parallel("serve", &["watch", "server"])
        .with_command("clean", "true")
        .with_command("styles", "true")
        .with_command("scripts", "true")
        .with_task("watch", TaskConfig::Watch)
        .with_task(
            "server",
            TaskConfig::Server {
                host: "127.0.0.1".into(),
                port: 3000,
            },
        )
        .build();

    let order = cfg.registration_order();
    let pos = |n: &str| order.iter().position(|t| t == n).unwrap();
    assert_eq!(order.len(), 8);
    for (composite, children) in [
        ("default", &["clean", "build", "serve"][..]),
        ("build", &["styles", "scripts"][..]),
        ("serve", &["watch", "server"][..]),
    ] {
        for child in children {
            assert!(pos(child) < pos(composite), "{child} before {composite}");
        }
    }
}

#[test]
fn toml_with_defaults_loads() {
    let (_dir, path) = write_config(
        r#"
[task.clean]
kind = "clean"

[task.styles]
kind = "styles"
src = ["styles/main.scss"]
output = "assets/css/main-min.css"

[task.default]
kind = "sequence"
tasks = ["clean", "styles"]

[[watch.bind]]
pattern = "./src/styles/**/*.scss"
tasks = ["styles"]
reload = "inject"
"#,
    );

    let cfg = load_and_validate(&path).unwrap();
    assert_eq!(cfg.paths.src, "src");
    assert_eq!(cfg.paths.dist, "dist");
    assert_eq!(cfg.watch.debounce_ms, 200);
    assert!(!cfg.watch.use_hash);
    assert!(matches!(
        cfg.tasks().get("styles"),
        Some(TaskConfig::Styles { cmd: None, .. })
    ));
    assert_eq!(cfg.expand_placeholders("{src}/x -> {dist}/y"), "src/x -> dist/y");

    let bindings = bindings_from_config(&cfg).unwrap();
    assert_eq!(bindings.len(), 1);
    assert_eq!(bindings.matching("src/styles/blocks/header.scss"), vec![0]);
    assert_eq!(bindings.get(0).unwrap().reload(), ReloadKind::Inject);
}

#[test]
fn unknown_task_kind_is_a_toml_error() {
    let (_dir, path) = write_config(
        r#"
[task.styles]
kind = "sass"
"#,
    );
    let err = load_from_path(&path).unwrap_err();
    assert!(matches!(err, BuildError::TomlError(_)));
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();
    assert!(matches!(err, BuildError::IoError(_)));
}

#[test]
fn bundled_demo_config_is_valid() {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/Assetdag.toml");
    let cfg = load_and_validate(&path).unwrap();

    for name in ["clean", "build", "watch", "server", "serve", "default"] {
        assert!(cfg.tasks().contains_key(name), "{name}");
    }
    let bindings = bindings_from_config(&cfg).unwrap();
    assert_eq!(bindings.len(), 7);
    assert!(!bindings.matching("src/styles/blocks/header.scss").is_empty());
    assert!(!bindings.matching("src/assets/svg/logo.svg").is_empty());
}
