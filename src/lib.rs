// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod server;
pub mod types;
pub mod watch;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{config_root_dir, load_and_validate, ConfigFile};
use crate::errors::BuildError;
use crate::fs::RealFileSystem;
use crate::pipeline::{build_registry, PipelineContext};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and validation
/// - the task registry with every declared task
/// - running the requested task
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;

    if args.dry_run {
        print_dry_run(&cfg, &args.task);
        return Ok(());
    }

    if !cfg.task.contains_key(&args.task) {
        return Err(BuildError::UnknownTask(args.task).into());
    }

    let root = config_root_dir(&config_path);
    let ctx = PipelineContext::new(root, Arc::new(RealFileSystem));
    let registry = build_registry(&cfg, &ctx)?;
    debug!(?registry, "task registry ready");

    // Watch and server tasks never finish; Ctrl-C tears them down.
    tokio::select! {
        res = registry.run(&args.task) => res?,
        sig = tokio::signal::ctrl_c() => {
            sig?;
            info!("interrupted; shutting down");
        }
    }

    Ok(())
}

/// Print tasks (children first) and watch bindings without running anything.
fn print_dry_run(cfg: &ConfigFile, target: &str) {
    println!("assetdag dry-run");
    println!("  paths.src  = {}", cfg.paths.src);
    println!("  paths.dist = {}", cfg.paths.dist);
    println!("  target     = {target}");
    println!();

    println!("tasks ({}):", cfg.task.len());
    for name in cfg.registration_order() {
        let Some(task) = cfg.task.get(name) else {
            continue;
        };
        let children = task.children();
        if children.is_empty() {
            println!("  - {name} [{}]", task.kind_name());
        } else {
            println!("  - {name} [{}] -> {}", task.kind_name(), children.join(", "));
        }
    }

    if !cfg.watch.bind.is_empty() {
        println!();
        println!(
            "watch (debounce {}ms, hash {}):",
            cfg.watch.debounce_ms, cfg.watch.use_hash
        );
        for binding in &cfg.watch.bind {
            println!(
                "  - {} -> {} (reload: {:?})",
                cfg.expand_placeholders(&binding.pattern),
                binding.tasks.join(", "),
                binding.reload
            );
        }
    }

    if !cfg.task.contains_key(target) {
        println!();
        println!("warning: target task '{target}' is not defined");
    }

    debug!("dry-run complete (no execution)");
}
