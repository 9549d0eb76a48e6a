//! Configuration module for Site-Mirror
//!
//! This module handles loading, parsing, and validating the mirror configuration.
//! The primary format is a flat `key=value` file (`config.txt`); TOML files are
//! accepted as well and share the same schema.
//!
//! # Example
//!
//! ```no_run
//! use site_mirror::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.txt")).unwrap();
//! println!("Mirroring {} into {}", config.start_url, config.output_dir.display());
//! ```

mod parser;
mod types;
mod validation;

pub use types::{MirrorConfig, DEFAULT_USER_AGENT};

pub use parser::{
    compute_config_hash, infer_value, load_config, load_config_with_hash,
    load_config_with_overrides, parse_flat,
};
pub use validation::validate;
