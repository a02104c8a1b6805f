// src/watch/mod.rs

//! File watching and change detection.
//!
//! This module is responsible for:
//! - Compiling watch binding glob patterns.
//! - Wiring up a cross-platform filesystem watcher (`notify`) that turns OS
//!   events into [`crate::engine::ChangeEvent`]s.
//! - Content hashing, so that rewrites with identical content can be
//!   ignored.
//!
//! It does **not** know which tasks exist or how they run; the
//! [`crate::engine`] dispatcher consumes its events.

pub mod hash;
pub mod path_utils;
pub mod patterns;
pub mod watcher;

pub use hash::{compute_file_hash, ContentCache};
pub use patterns::{bindings_from_config, BindingSet, WatchBinding};
pub use watcher::{spawn_watcher, WatcherHandle};
