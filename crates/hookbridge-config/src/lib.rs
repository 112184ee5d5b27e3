//! Configuration system for hookbridge.
//!
//! Provides TOML-based bridge settings with:
//! - A master switch and hooks directory location (`[hooks]`)
//! - Default and maximum hook timeouts
//! - Prompt-hook evaluation limits (`[prompt]`)
//! - Config file layering (user config dir + project-local overrides)

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, config_dir, load_config, load_config_file,
    load_config_with_options, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
