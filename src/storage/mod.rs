//! Storage module for the mirrored tree
//!
//! This module owns everything that touches the output directory:
//! - Deterministic URL to file path mapping
//! - Relative links between saved files
//! - Async file writers used by the crawl and rewrite phases

mod files;
mod paths;

pub use files::{
    copy_file, create_file, ensure_parent, finish_file, read_file, read_text, write_chunk,
    write_file,
};
pub use paths::{image_file_name, images_dir_name, relative_link, to_local_path, LocalPath};

use std::path::PathBuf;
use thiserror::Error;

/// Filesystem failures while saving or rewriting mirrored files
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}
