// src/config/mod.rs

//! Configuration loading and validation for assetpipe.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate references, pipeline cycles and task definitions (`validate.rs`).
//! - Turn the `[paths]` tables into the immutable [`PathConfig`] (`paths.rs`).

pub mod loader;
pub mod model;
pub mod paths;
pub mod validate;

pub use loader::{load_and_validate, load_from_path, parse_str, project_root};
pub use model::{
    ActionKind, ConfigFile, ConfigSection, PipelineConfig, RawConfigFile, ResourceConfig,
    ServerConfig, TaskConfig, WatchConfig,
};
pub use paths::{PathConfig, ResourcePaths, with_prefix, with_suffix};
pub use validate::validate_raw_config;
