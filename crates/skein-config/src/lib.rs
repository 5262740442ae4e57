//! Configuration system for Skein lineage reporting.
//!
//! Provides TOML-based configuration with:
//! - Lineage server connection settings (`[client]`)
//! - The default namespace jobs and datasets are registered under
//! - Source-location settings used to build job locations (`[location]`)
//! - Layering of user config, project-local config, and environment overrides

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigLayer, LoadedConfig, apply_env, load_config, load_config_file,
    load_config_with_options, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
