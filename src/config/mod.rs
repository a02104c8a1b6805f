// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] maps the TOML file onto serde structs.
//! - [`loader`] reads a file from disk.
//! - [`validate`] turns a `RawConfigFile` into a checked `ConfigFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{config_root_dir, default_config_path, load_and_validate, load_from_path};
pub use model::{
    BindingConfig, ConfigFile, LibsSection, PathsSection, RawConfigFile, TaskConfig,
    WatchSection,
};
