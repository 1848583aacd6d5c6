//! Configuration module for scorekeep
//!
//! This module handles:
//! - The core configuration (`scorekeep.toml` or `.scorekeeprc.json`)
//! - Upload settings overridden from the environment
//! - Validation of slugs, refs and weights before anything runs
//! - Narrowing a config down to a subset of plugins

pub(crate) mod core_config;
mod validation;

pub use core_config::{
    apply_env_overrides, filter_plugins, load_config_file, load_core_config, CoreConfig,
    PersistConfig, PluginConfig, ScoringConfig, UploadConfig, CONFIG_FILE_NAMES,
    DEFAULT_PERSIST_FILENAME, DEFAULT_PERSIST_OUTPUT_DIR,
};
pub use validation::{is_valid_slug, validate_config};
